use anyhow::Context;
use futures::TryStreamExt;
use ninegeek_api::{
    Comment, CommentId, NewComment, NewThread, Store, StoreError, Thread, ThreadId,
};
use sqlx::Row;

/// Store backed by the `threads` and `comments` postgres tables.
///
/// Ids come from the `BIGSERIAL` sequences, so they are allocated by
/// postgres as part of each `INSERT` and survive restarts.
#[derive(Clone)]
pub struct PostgresStore {
    pool: sqlx::PgPool,
}

impl PostgresStore {
    pub fn new(pool: sqlx::PgPool) -> PostgresStore {
        PostgresStore { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ThreadRow {
    id: i64,
    title: String,
    content: String,
    author: String,
}

impl ThreadRow {
    fn into_thread(self) -> Thread {
        Thread {
            id: ThreadId(self.id),
            title: self.title,
            content: self.content,
            author: self.author,
            comments: Vec::new(),
        }
    }
}

/// Reads the comment columns out of a `threads LEFT JOIN comments` row.
///
/// Returns `None` for the single row a thread without comments produces.
fn comment_from_joined_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<Option<Comment>> {
    let id: Option<i64> = row
        .try_get("comment_id")
        .context("retrieving the comment_id field")?;
    let id = match id {
        None => return Ok(None),
        Some(id) => CommentId(id),
    };
    Ok(Some(Comment {
        id,
        author: row
            .try_get("comment_author")
            .context("retrieving the comment_author field")?,
        content: row
            .try_get("comment_content")
            .context("retrieving the comment_content field")?,
    }))
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    async fn create_thread(&self, t: NewThread) -> Result<Thread, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO threads (title, content, author) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&t.title)
        .bind(&t.content)
        .bind(&t.author)
        .fetch_one(&self.pool)
        .await
        .context("inserting thread")?;
        Ok(t.into_thread(ThreadId(id)))
    }

    async fn list_threads(&self) -> Result<Vec<Thread>, StoreError> {
        Ok(sqlx::query_as::<_, ThreadRow>(
            "SELECT id, title, content, author FROM threads ORDER BY id",
        )
        .fetch(&self.pool)
        .map_ok(ThreadRow::into_thread)
        .try_collect::<Vec<Thread>>()
        .await
        .context("querying threads table")?)
    }

    async fn get_thread(&self, id: ThreadId) -> Result<Thread, StoreError> {
        let rows = sqlx::query(
            "
                SELECT
                    t.id, t.title, t.content, t.author,
                    c.id AS comment_id,
                    c.author AS comment_author,
                    c.content AS comment_content
                FROM threads t
                LEFT JOIN comments c
                    ON c.thread_id = t.id
                WHERE t.id = $1
                ORDER BY c.id
            ",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("fetching thread {id}"))?;

        let first = rows.first().ok_or(StoreError::ThreadNotFound(id))?;
        let mut thread = Thread {
            id,
            title: first.try_get("title").context("retrieving the title field")?,
            content: first
                .try_get("content")
                .context("retrieving the content field")?,
            author: first
                .try_get("author")
                .context("retrieving the author field")?,
            comments: Vec::with_capacity(rows.len()),
        };
        for row in &rows {
            if let Some(c) = comment_from_joined_row(row)? {
                thread.comments.push(c);
            }
        }
        Ok(thread)
    }

    async fn create_comment(
        &self,
        thread: ThreadId,
        c: NewComment,
    ) -> Result<Comment, StoreError> {
        // Inserting through a SELECT on threads makes the existence check and
        // the insertion a single statement: no row is produced, and no id is
        // drawn from the sequence, when the thread is missing
        let id: Option<i64> = sqlx::query_scalar(
            "
                INSERT INTO comments (thread_id, content, author)
                SELECT id, $2, $3 FROM threads WHERE id = $1
                RETURNING id
            ",
        )
        .bind(thread.0)
        .bind(&c.content)
        .bind(&c.author)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("inserting comment on thread {thread}"))?;
        match id {
            None => Err(StoreError::ThreadNotFound(thread)),
            Some(id) => Ok(c.into_comment(CommentId(id))),
        }
    }

    async fn list_comments(&self, thread: ThreadId) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query(
            "
                SELECT
                    c.id AS comment_id,
                    c.author AS comment_author,
                    c.content AS comment_content
                FROM threads t
                LEFT JOIN comments c
                    ON c.thread_id = t.id
                WHERE t.id = $1
                ORDER BY c.id
            ",
        )
        .bind(thread.0)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("fetching comments of thread {thread}"))?;

        if rows.is_empty() {
            return Err(StoreError::ThreadNotFound(thread));
        }
        let mut comments = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(c) = comment_from_joined_row(row)? {
                comments.push(c);
            }
        }
        Ok(comments)
    }
}
