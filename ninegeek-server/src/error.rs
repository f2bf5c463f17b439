use ninegeek_api::{Error as ApiError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn invalid_thread_id() -> Error {
        Error::Api(ApiError::InvalidThreadId)
    }

    pub fn thread_not_found() -> Error {
        Error::Api(ApiError::ThreadNotFound)
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Error {
        match err {
            StoreError::ThreadNotFound(_) => Error::thread_not_found(),
            StoreError::Storage(err) => Error::Anyhow(err),
        }
    }
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let err = match self {
            Error::Anyhow(err) => {
                tracing::error!(?err, "internal server error");
                #[cfg(not(test))]
                let err =
                    ApiError::Unknown(String::from("Internal server error, see logs for details"));
                #[cfg(test)]
                let err = ApiError::Unknown(format!("Internal server error: {err:?}"));
                err
            }
            Error::Api(err) => {
                tracing::info!("returning error to client: {err}");
                err
            }
        };
        (
            err.status_code(),
            [(
                axum::http::header::CONTENT_TYPE,
                axum::http::HeaderValue::from_static("application/json"),
            )],
            err.contents(),
        )
            .into_response()
    }
}
