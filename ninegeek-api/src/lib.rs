mod comment;
mod error;
mod store;
mod thread;
mod user;

pub use comment::{Comment, CommentId, NewComment};
pub use error::Error;
pub use store::{Store, StoreError};
pub use thread::{NewThread, Thread, ThreadId};
pub use user::{LoginRequest, LoginResponse};

/// Rejects strings that could not round-trip through every store.
///
/// PostgreSQL refuses null bytes in `TEXT` columns, so accepting them here
/// would make the in-memory and postgres stores disagree.
pub(crate) fn validate_string(s: &str) -> bool {
    !s.contains('\0')
}

/// Like `validate_string`, but also requires at least one character.
pub(crate) fn validate_required_string(s: &str) -> bool {
    !s.is_empty() && validate_string(s)
}
