use anyhow::{anyhow, Context};
use serde_json::json;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Unknown(String),

    #[error("Invalid input")]
    InvalidInput,

    #[error("Invalid request")]
    InvalidRequest,

    #[error("Invalid thread ID")]
    InvalidThreadId,

    #[error("Thread not found")]
    ThreadNotFound,
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidInput => StatusCode::BAD_REQUEST,
            Error::InvalidRequest => StatusCode::BAD_REQUEST,
            Error::InvalidThreadId => StatusCode::BAD_REQUEST,
            Error::ThreadNotFound => StatusCode::NOT_FOUND,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&json!({ "error": self.to_string() })).expect("serializing error")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let msg = data
            .get("error")
            .and_then(|e| e.as_str())
            .ok_or_else(|| anyhow!("error message is not a string"))?;
        Ok(match msg {
            "Invalid input" => Error::InvalidInput,
            "Invalid request" => Error::InvalidRequest,
            "Invalid thread ID" => Error::InvalidThreadId,
            "Thread not found" => Error::ThreadNotFound,
            msg => Error::Unknown(String::from(msg)),
        })
    }
}
