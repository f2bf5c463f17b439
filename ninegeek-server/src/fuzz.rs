#![cfg(test)]

use axum::{body::Body, Router};
use bolero::generator::TypeGenerator;
use ninegeek_api::{CommentId, NewComment, NewThread, Store, StoreError, Thread, ThreadId};
use ninegeek_memstore::MemStore;
use std::{cmp, ops::RangeTo, panic::AssertUnwindSafe, path::Path, sync::Arc};

use crate::{tests::call_raw, *};

fn build_pg_cluster(data: &Path) -> postgresfixture::cluster::Cluster {
    let mut runtime = None;
    let mut best_version = None;
    for r in postgresfixture::runtime::Runtime::find_on_path() {
        if let Ok(v) = r.version() {
            match (&mut runtime, &mut best_version) {
                (None, None) => {
                    runtime = Some(r);
                    best_version = Some(v);
                }
                (Some(runtime), Some(best_version)) => {
                    if *best_version < v {
                        *runtime = r;
                        *best_version = v;
                    }
                }
                _ => unreachable!(),
            }
        }
    }
    postgresfixture::cluster::Cluster::new(
        data,
        runtime.expect("postgresql seems to not be installed in path"),
    )
}

macro_rules! do_sqlx_test {
    ( $name:ident, $gen:expr, $fn:expr ) => {
        #[test]
        #[ignore = "needs postgresql in path, run with --ignored"]
        fn $name() {
            if std::env::var("RUST_LOG").is_ok() {
                let _ = tracing_subscriber::fmt::try_init();
            }
            let lockfile = tempfile::tempfile().expect("creating tempfile");
            let datadir = tempfile::tempdir().expect("creating tempdir");
            let datadir_path: &Path = datadir.as_ref();
            let cluster = build_pg_cluster(datadir_path);
            let datadir_path: &str = datadir_path.to_str().expect("tempdir is not valid utf8");
            postgresfixture::coordinate::run_and_destroy(&cluster, lockfile.into(), || {
                cluster.createdb("test_db").expect("creating test_db database");
                let runtime = AssertUnwindSafe(
                    tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .expect("failed initializing tokio runtime"),
                );
                // create test db
                let pool = AssertUnwindSafe(runtime.block_on(async move {
                    let opts = format!("postgresql://?host={}&dbname=test_db", datadir_path)
                        .parse()
                        .expect("parsing test db url");
                    let pool = create_sqlx_pool(opts).await.expect("creating sqlx pool");
                    MIGRATOR
                        .run(&pool)
                        .await
                        .expect("failed applying migrations");
                    pool
                }));
                bolero::check!()
                    .with_generator($gen)
                    .cloned()
                    .for_each(move |v| {
                        let pool = pool.clone();
                        let res = {
                            let pool = pool.clone();
                            std::panic::catch_unwind(AssertUnwindSafe(|| {
                                runtime.block_on($fn(pool, v))
                            }))
                        };
                        runtime.block_on(async move {
                            // cleanup
                            sqlx::query(include_str!("../reset-test-db.sql"))
                                .execute(&pool)
                                .await
                                .expect("failed cleaning up database");
                        });
                        // resume the panics
                        if let Err(e) = res {
                            std::panic::resume_unwind(e);
                        }
                    });
            })
            .expect("coordinating spinup and shutdown of the pg cluster");
        }
    };
}

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzOp {
    CreateThread(NewThread),
    ListThreads,
    GetThread { tid: usize },
    CreateComment { tid: usize, comment: NewComment },
    ListComments { tid: usize },
}

fn resize_int(fuzz_id: usize, RangeTo { end }: RangeTo<usize>) -> Option<usize> {
    if end == 0 {
        return None;
    }
    let bucket_size = cmp::max(1, usize::MAX / end); // in case we rounded to 0
    let id = fuzz_id / bucket_size;
    Some(cmp::min(id, end - 1)) // in case id was actually over end - 1 due to rounding
}

/// Runs the same requests against a postgres-backed app and an in-memory one
struct ComparativeFuzzer {
    pg: Router,
    mem: Router,
    num_threads: usize,
}

impl ComparativeFuzzer {
    fn new(pool: sqlx::PgPool) -> ComparativeFuzzer {
        ComparativeFuzzer {
            pg: app(Arc::new(PostgresStore::new(pool))),
            mem: app(Arc::new(MemStore::new())),
            num_threads: 0,
        }
    }

    /// Maps a fuzzed id to a thread id, that sometimes points one past
    /// either end of the existing threads
    fn thread_uri(&self, tid: usize, suffix: &str) -> String {
        let id = resize_int(tid, ..self.num_threads + 2).unwrap_or(0);
        format!("/threads/{id}{suffix}")
    }

    async fn compare(&mut self, method: &str, uri: &str, body: Option<Vec<u8>>) -> Vec<u8> {
        let to_body = || body.clone().map(Body::from).unwrap_or_else(Body::empty);
        let (pg_status, pg_body) = call_raw(&mut self.pg, method, uri, to_body()).await;
        let (mem_status, mem_body) = call_raw(&mut self.mem, method, uri, to_body()).await;
        assert_eq!(
            (pg_status, String::from_utf8_lossy(&pg_body)),
            (mem_status, String::from_utf8_lossy(&mem_body)),
            "postgres and memory stores did not return the same result for {method} {uri}"
        );
        pg_body
    }

    async fn execute_fuzz_op(&mut self, op: FuzzOp) {
        match op {
            FuzzOp::CreateThread(t) => {
                let body = serde_json::to_vec(&t).expect("serializing thread");
                let resp = self.compare("POST", "/threads", Some(body)).await;
                if serde_json::from_slice::<Thread>(&resp).is_ok() {
                    self.num_threads += 1;
                }
            }
            FuzzOp::ListThreads => {
                self.compare("GET", "/threads", None).await;
            }
            FuzzOp::GetThread { tid } => {
                let uri = self.thread_uri(tid, "");
                self.compare("GET", &uri, None).await;
            }
            FuzzOp::CreateComment { tid, comment } => {
                let uri = self.thread_uri(tid, "/comments");
                let body = serde_json::to_vec(&comment).expect("serializing comment");
                self.compare("POST", &uri, Some(body)).await;
            }
            FuzzOp::ListComments { tid } => {
                let uri = self.thread_uri(tid, "/comments");
                self.compare("GET", &uri, None).await;
            }
        }
    }
}

do_sqlx_test!(
    compare_postgres_with_memory,
    bolero::generator::gen_with::<Vec<FuzzOp>>().len(1..50usize),
    |pool, test: Vec<FuzzOp>| async move {
        let mut fuzzer = ComparativeFuzzer::new(pool);
        for op in test {
            fuzzer.execute_fuzz_op(op).await;
        }
    }
);

do_sqlx_test!(
    postgres_rejects_comments_on_missing_threads,
    bolero::generator::gen::<(NewThread, NewComment)>(),
    |pool, (thread, comment): (NewThread, NewComment)| async move {
        if thread.validate().is_err() || comment.validate().is_err() {
            return;
        }
        let store = PostgresStore::new(pool);
        let missing = ThreadId(9999);
        assert!(matches!(
            store.create_comment(missing, comment.clone()).await,
            Err(StoreError::ThreadNotFound(ThreadId(9999)))
        ));
        assert!(matches!(
            store.list_comments(missing).await,
            Err(StoreError::ThreadNotFound(ThreadId(9999)))
        ));
        assert!(matches!(
            store.get_thread(missing).await,
            Err(StoreError::ThreadNotFound(ThreadId(9999)))
        ));

        // the rejected comment did not consume an id
        let t = store.create_thread(thread).await.unwrap();
        assert_eq!(t.id, ThreadId(1));
        let c = store.create_comment(t.id, comment).await.unwrap();
        assert_eq!(c.id, CommentId(1));
        assert_eq!(store.list_comments(t.id).await.unwrap(), vec![c]);
    }
);

do_sqlx_test!(
    postgres_returns_what_was_created,
    bolero::generator::gen_with::<Vec<(NewThread, Vec<NewComment>)>>().len(1..5usize),
    |pool, test: Vec<(NewThread, Vec<NewComment>)>| async move {
        let store = PostgresStore::new(pool);
        let mut created = Vec::new();
        for (thread, comments) in test {
            if thread.validate().is_err() {
                continue;
            }
            let mut t = store.create_thread(thread).await.unwrap();
            assert!(t.comments.is_empty());
            for c in comments {
                if c.validate().is_err() {
                    continue;
                }
                let c = store.create_comment(t.id, c).await.unwrap();
                if let Some(prev) = created
                    .iter()
                    .flat_map(|t: &Thread| t.comments.iter())
                    .chain(t.comments.iter())
                    .last()
                {
                    assert!(prev.id < c.id, "comment ids must increase across threads");
                }
                t.comments.push(c);
            }
            created.push(t);
        }

        for t in &created {
            assert_eq!(&store.get_thread(t.id).await.unwrap(), t);
            assert_eq!(store.list_comments(t.id).await.unwrap(), t.comments);
        }
        let listed = store.list_threads().await.unwrap();
        assert_eq!(
            listed.iter().map(|t| t.id).collect::<Vec<_>>(),
            created.iter().map(|t| t.id).collect::<Vec<_>>()
        );
        assert!(listed.windows(2).all(|w| w[0].id < w[1].id));
        assert!(listed.iter().all(|t| t.comments.is_empty()));
    }
);
