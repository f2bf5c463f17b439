use async_trait::async_trait;

use crate::{Comment, NewComment, NewThread, Thread, ThreadId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("thread {0} not found")]
    ThreadNotFound(ThreadId),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Persistence for threads and their comments.
///
/// Ids are allocated by the store, one increasing sequence per entity type.
/// Comment ids are unique across all threads. Every listing is in creation
/// order.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_thread(&self, t: NewThread) -> Result<Thread, StoreError>;

    /// Lists all threads, without their comments.
    async fn list_threads(&self) -> Result<Vec<Thread>, StoreError>;

    /// Fetches one thread, along with its comments.
    async fn get_thread(&self, id: ThreadId) -> Result<Thread, StoreError>;

    async fn create_comment(&self, thread: ThreadId, c: NewComment)
        -> Result<Comment, StoreError>;

    async fn list_comments(&self, thread: ThreadId) -> Result<Vec<Comment>, StoreError>;
}
