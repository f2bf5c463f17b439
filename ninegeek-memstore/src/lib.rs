use std::collections::BTreeMap;

use async_trait::async_trait;
use ninegeek_api::{
    Comment, CommentId, NewComment, NewThread, Store, StoreError, Thread, ThreadId,
};
use tokio::sync::RwLock;

/// Store keeping everything in process memory.
///
/// Id sequences restart from 1 whenever a new `MemStore` is built, so
/// nothing survives a server restart.
#[derive(Debug, Default)]
pub struct MemStore(RwLock<State>);

#[derive(Debug)]
struct State {
    // BTreeMap so iteration follows id order, ie. creation order
    threads: BTreeMap<ThreadId, Thread>,
    next_thread_id: ThreadId,
    next_comment_id: CommentId,
}

impl Default for State {
    fn default() -> State {
        State {
            threads: BTreeMap::new(),
            next_thread_id: ThreadId(1),
            next_comment_id: CommentId(1),
        }
    }
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore::default()
    }

    /// Return the current number of threads
    pub async fn test_num_threads(&self) -> usize {
        self.0.read().await.threads.len()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn create_thread(&self, t: NewThread) -> Result<Thread, StoreError> {
        let mut state = self.0.write().await;
        let id = state.next_thread_id;
        state.next_thread_id = ThreadId(id.0 + 1);
        let thread = t.into_thread(id);
        state.threads.insert(id, thread.clone());
        tracing::debug!(?id, "created thread");
        Ok(thread)
    }

    async fn list_threads(&self) -> Result<Vec<Thread>, StoreError> {
        Ok(self
            .0
            .read()
            .await
            .threads
            .values()
            .map(|t| Thread {
                comments: Vec::new(),
                ..t.clone()
            })
            .collect())
    }

    async fn get_thread(&self, id: ThreadId) -> Result<Thread, StoreError> {
        self.0
            .read()
            .await
            .threads
            .get(&id)
            .cloned()
            .ok_or(StoreError::ThreadNotFound(id))
    }

    async fn create_comment(
        &self,
        thread: ThreadId,
        c: NewComment,
    ) -> Result<Comment, StoreError> {
        let mut state = self.0.write().await;
        let id = state.next_comment_id;
        let t = state
            .threads
            .get_mut(&thread)
            .ok_or(StoreError::ThreadNotFound(thread))?;
        let comment = c.into_comment(id);
        t.comments.push(comment.clone());
        state.next_comment_id = CommentId(id.0 + 1);
        tracing::debug!(?thread, ?id, "created comment");
        Ok(comment)
    }

    async fn list_comments(&self, thread: ThreadId) -> Result<Vec<Comment>, StoreError> {
        self.0
            .read()
            .await
            .threads
            .get(&thread)
            .map(|t| t.comments.clone())
            .ok_or(StoreError::ThreadNotFound(thread))
    }
}
