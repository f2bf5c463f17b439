use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{rejection::BytesRejection, FromRequest, FromRequestParts, Path},
    http::{request, Request},
};
use ninegeek_api::{
    Error as ApiError, LoginRequest, NewComment, NewThread, Store, ThreadId,
};

use crate::Error;

pub type DynStore = Arc<dyn Store>;

#[derive(Clone, axum::extract::FromRef)]
pub struct AppState {
    pub store: DynStore,
}

/// A request body that must be checked before reaching the store.
pub trait Payload: serde::de::DeserializeOwned {
    fn validate(&self) -> Result<(), ApiError>;

    /// Error returned when the body is not even well-formed json for `Self`
    fn malformed() -> ApiError {
        ApiError::InvalidInput
    }
}

impl Payload for NewThread {
    fn validate(&self) -> Result<(), ApiError> {
        NewThread::validate(self)
    }
}

impl Payload for NewComment {
    fn validate(&self) -> Result<(), ApiError> {
        NewComment::validate(self)
    }
}

impl Payload for LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        LoginRequest::validate(self)
    }

    fn malformed() -> ApiError {
        ApiError::InvalidRequest
    }
}

/// Json body that parsed and passed `Payload::validate`
///
/// The body is parsed whatever its `Content-Type` header says.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, B, T> FromRequest<S, B> for ValidJson<T>
where
    Bytes: FromRequest<S, B, Rejection = BytesRejection>,
    S: Send + Sync,
    B: Send + 'static,
    T: Payload,
{
    type Rejection = Error;

    async fn from_request(req: Request<B>, state: &S) -> Result<ValidJson<T>, Error> {
        let body = Bytes::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!(%rejection, "failed reading request body");
            Error::Api(T::malformed())
        })?;
        let data: T = serde_json::from_slice(&body).map_err(|err| {
            tracing::debug!(%err, "rejecting malformed request body");
            Error::Api(T::malformed())
        })?;
        data.validate()?;
        Ok(ValidJson(data))
    }
}

/// The `:id` segment of `/threads/:id/...`
pub struct ThreadIdParam(pub ThreadId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ThreadIdParam {
    type Rejection = Error;

    async fn from_request_parts(
        req: &mut request::Parts,
        state: &S,
    ) -> Result<ThreadIdParam, Error> {
        let Path(id) = Path::<String>::from_request_parts(req, state)
            .await
            .map_err(|_| Error::invalid_thread_id())?;
        Ok(ThreadIdParam(id.parse()?))
    }
}
