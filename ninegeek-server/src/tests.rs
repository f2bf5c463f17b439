#![cfg(test)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{self, request, StatusCode},
    Router,
};
use anyhow::anyhow;
use ninegeek_api::{
    Comment, CommentId, Error as ApiError, LoginResponse, NewComment, NewThread, Store,
    StoreError, Thread, ThreadId,
};
use ninegeek_memstore::MemStore;
use serde_json::json;
use tower::{Service, ServiceExt};

use crate::*;

pub(crate) async fn call_raw(
    app: &mut Router,
    method: &str,
    uri: &str,
    body: Body,
) -> (StatusCode, Vec<u8>) {
    let req = request::Builder::new()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body)
        .expect("building request");
    app.ready().await.expect("waiting for app to be ready");
    let resp = app.call(req).await.expect("running request");
    let status = resp.status();
    let body = hyper::body::to_bytes(resp.into_body())
        .await
        .expect("recovering resp bytes");
    (status, body.to_vec())
}

/// Sends `body` as json, and parses the response either as `Resp` or as an
/// api error depending on the status code
pub(crate) async fn call<Req, Resp>(
    app: &mut Router,
    method: &str,
    uri: &str,
    body: &Req,
) -> Result<(StatusCode, Resp), ApiError>
where
    Req: serde::Serialize,
    Resp: for<'de> serde::Deserialize<'de>,
{
    let body = match method {
        "GET" => Body::empty(),
        _ => Body::from(serde_json::to_vec(body).expect("serializing request body to json")),
    };
    let (status, body) = call_raw(app, method, uri, body).await;
    if status.is_success() {
        let resp = serde_json::from_slice(&body).unwrap_or_else(|err| {
            panic!("failed parsing resp body {body:?} for {method} {uri}: {err}")
        });
        return Ok((status, resp));
    }
    let err = ApiError::parse(&body)
        .unwrap_or_else(|err| panic!("parsing error response body {err}, body is {body:?}"));
    assert_eq!(status, err.status_code(), "status code mismatch for {err}");
    Err(err)
}

fn mem_app() -> Router {
    app(Arc::new(MemStore::new()))
}

#[tokio::test]
async fn end_to_end_scenario() {
    let mut app = mem_app();

    let (status, thread): (_, Thread) = call(
        &mut app,
        "POST",
        "/threads",
        &json!({"title": "T1", "content": "C1", "author": "A"}),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(thread.id, ThreadId(1));
    assert_eq!(
        (&thread.title[..], &thread.content[..], &thread.author[..]),
        ("T1", "C1", "A")
    );

    let (status, comment): (_, Comment) = call(
        &mut app,
        "POST",
        "/threads/1/comments",
        &json!({"author": "B", "content": "hi"}),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        comment,
        Comment {
            id: CommentId(1),
            author: String::from("B"),
            content: String::from("hi"),
        }
    );

    let (status, comments): (_, Vec<Comment>) =
        call(&mut app, "GET", "/threads/1/comments", &()).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments, vec![comment.clone()]);

    let (_, fetched): (_, Thread) = call(&mut app, "GET", "/threads/1", &()).await.unwrap();
    assert_eq!(fetched.comments, vec![comment]);

    let (status, body) = call_raw(&mut app, "GET", "/threads/2", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&body).unwrap(),
        json!({"error": "Thread not found"})
    );
}

#[tokio::test]
async fn login_echoes_username() {
    let mut app = mem_app();
    let (status, resp): (_, LoginResponse) =
        call(&mut app, "POST", "/users/login", &json!({"username": "alice"}))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp, LoginResponse::logged_in(String::from("alice")));

    for body in [json!({}), json!({"username": ""}), json!({"username": 42})] {
        let res: Result<(_, LoginResponse), _> =
            call(&mut app, "POST", "/users/login", &body).await;
        assert_eq!(res.unwrap_err(), ApiError::InvalidRequest, "for body {body}");
    }
}

#[tokio::test]
async fn malformed_thread_bodies_are_rejected() {
    let mut app = mem_app();
    for body in [
        json!({"content": "C1"}),
        json!({"title": "T1"}),
        json!({"title": "", "content": "C1"}),
        json!({"title": "T1", "content": 3}),
    ] {
        let res: Result<(_, Thread), _> = call(&mut app, "POST", "/threads", &body).await;
        assert_eq!(res.unwrap_err(), ApiError::InvalidInput, "for body {body}");
    }

    let (status, _) = call_raw(&mut app, "POST", "/threads", Body::from("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, threads): (_, Vec<Thread>) = call(&mut app, "GET", "/threads", &()).await.unwrap();
    assert!(threads.is_empty());
}

#[tokio::test]
async fn author_is_optional_on_threads() {
    let mut app = mem_app();
    let (_, thread): (_, Thread) = call(
        &mut app,
        "POST",
        "/threads",
        &json!({"title": "T1", "content": "C1"}),
    )
    .await
    .unwrap();
    assert_eq!(thread.author, "");
}

#[tokio::test]
async fn non_integer_ids_are_rejected() {
    let mut app = mem_app();
    for (method, uri) in [
        ("GET", "/threads/abc"),
        ("GET", "/threads/abc/comments"),
        ("POST", "/threads/1.5/comments"),
    ] {
        let res: Result<(_, serde_json::Value), _> =
            call(&mut app, method, uri, &json!({"author": "B", "content": "hi"})).await;
        assert_eq!(res.unwrap_err(), ApiError::InvalidThreadId, "for {method} {uri}");
    }
}

#[tokio::test]
async fn comments_need_an_existing_thread() {
    let mut app = mem_app();
    let res: Result<(_, Comment), _> = call(
        &mut app,
        "POST",
        "/threads/9999/comments",
        &json!({"author": "B", "content": "hi"}),
    )
    .await;
    assert_eq!(res.unwrap_err(), ApiError::ThreadNotFound);

    let res: Result<(_, Vec<Comment>), _> =
        call(&mut app, "GET", "/threads/9999/comments", &()).await;
    assert_eq!(res.unwrap_err(), ApiError::ThreadNotFound);
}

#[tokio::test]
async fn malformed_comment_bodies_are_rejected() {
    let mut app = mem_app();
    let _: (_, Thread) = call(
        &mut app,
        "POST",
        "/threads",
        &json!({"title": "T1", "content": "C1"}),
    )
    .await
    .unwrap();
    for body in [
        json!({"content": "hi"}),
        json!({"author": "B"}),
        json!({"author": "B", "content": ""}),
    ] {
        let res: Result<(_, Comment), _> =
            call(&mut app, "POST", "/threads/1/comments", &body).await;
        assert_eq!(res.unwrap_err(), ApiError::InvalidInput, "for body {body}");
    }
    let (_, comments): (_, Vec<Comment>) =
        call(&mut app, "GET", "/threads/1/comments", &()).await.unwrap();
    assert!(comments.is_empty());
}

#[tokio::test]
async fn listing_threads_keeps_creation_order_without_comments() {
    let mut app = mem_app();
    for i in 1..=3 {
        let _: (_, Thread) = call(
            &mut app,
            "POST",
            "/threads",
            &json!({"title": format!("T{i}"), "content": "C"}),
        )
        .await
        .unwrap();
    }
    let _: (_, Comment) = call(
        &mut app,
        "POST",
        "/threads/2/comments",
        &json!({"author": "B", "content": "hi"}),
    )
    .await
    .unwrap();

    let (_, threads): (_, Vec<Thread>) = call(&mut app, "GET", "/threads", &()).await.unwrap();
    assert_eq!(
        threads.iter().map(|t| t.id.0).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(threads.iter().all(|t| t.comments.is_empty()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_comments_through_the_router() {
    const N: usize = 64;
    let app = mem_app();
    let _: (_, Thread) = call(
        &mut app.clone(),
        "POST",
        "/threads",
        &json!({"title": "T1", "content": "C1"}),
    )
    .await
    .unwrap();

    let tasks = (0..N)
        .map(|i| {
            let mut app = app.clone();
            tokio::spawn(async move {
                let (_, c): (_, Comment) = call(
                    &mut app,
                    "POST",
                    "/threads/1/comments",
                    &json!({"author": "B", "content": format!("c{i}")}),
                )
                .await
                .unwrap();
                c.id
            })
        })
        .collect::<Vec<_>>();
    let mut ids = Vec::new();
    for t in tasks {
        ids.push(t.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), N);

    let (_, comments): (_, Vec<Comment>) = call(&mut app.clone(), "GET", "/threads/1/comments", &())
        .await
        .unwrap();
    assert_eq!(comments.len(), N);
}

#[tokio::test]
async fn bodies_without_json_content_type_are_accepted() {
    let mut app = mem_app();
    let req = request::Builder::new()
        .method("POST")
        .uri("/threads")
        .body(Body::from(r#"{"title":"T1","content":"C1"}"#))
        .expect("building request");
    let resp = app.ready().await.unwrap().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
    let thread: Thread = serde_json::from_slice(&body).unwrap();
    assert_eq!(thread.id, ThreadId(1));
}

/// Store whose backend is always down
struct BrokenStore;

fn broken() -> StoreError {
    anyhow!("connection refused").into()
}

#[async_trait::async_trait]
impl Store for BrokenStore {
    async fn create_thread(&self, _: NewThread) -> Result<Thread, StoreError> {
        Err(broken())
    }

    async fn list_threads(&self) -> Result<Vec<Thread>, StoreError> {
        Err(broken())
    }

    async fn get_thread(&self, _: ThreadId) -> Result<Thread, StoreError> {
        Err(broken())
    }

    async fn create_comment(&self, _: ThreadId, _: NewComment) -> Result<Comment, StoreError> {
        Err(broken())
    }

    async fn list_comments(&self, _: ThreadId) -> Result<Vec<Comment>, StoreError> {
        Err(broken())
    }
}

#[tokio::test]
async fn storage_failures_are_internal_errors() {
    let mut app = app(Arc::new(BrokenStore));
    for (method, uri, body) in [
        ("GET", "/threads", json!(null)),
        ("POST", "/threads", json!({"title": "T1", "content": "C1"})),
        ("GET", "/threads/1", json!(null)),
        ("POST", "/threads/1/comments", json!({"author": "B", "content": "hi"})),
        ("GET", "/threads/1/comments", json!(null)),
    ] {
        let (status, resp) = call_raw(
            &mut app,
            method,
            uri,
            Body::from(serde_json::to_vec(&body).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "for {method} {uri}");
        match ApiError::parse(&resp).unwrap() {
            ApiError::Unknown(msg) => assert!(msg.contains("connection refused"), "got {msg}"),
            err => panic!("expected an unknown error for {method} {uri}, got {err:?}"),
        }
    }

    // validation still happens before the store is reached
    let res: Result<(_, Thread), _> =
        call(&mut app, "POST", "/threads", &json!({"title": ""})).await;
    assert_eq!(res.unwrap_err(), ApiError::InvalidInput);
}
