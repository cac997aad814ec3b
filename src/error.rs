use std::{io, path::PathBuf, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::messages::{Locale, Message};

/// Failure envelope returned by every JSON endpoint.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Maps an engine failure onto the envelope, prefixing the diagnostic with
    /// the localized name of the operation that failed.
    pub fn from_engine(locale: Locale, operation: Message, error: &EngineError) -> Self {
        match error {
            EngineError::NotInstalled(_) => Self::internal(locale.text(Message::EngineMissing)),
            error if error.is_server_fault() => Self::internal(locale.failure(operation, error)),
            error => Self::bad_request(locale.failure(operation, error)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            success: false,
            error: self.message,
        });

        (self.status, body).into_response()
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("yt-dlp binary not found at {0:?}")]
    NotInstalled(PathBuf),

    #[error("could not start yt-dlp: {0}")]
    Spawn(#[source] io::Error),

    #[error("{0}")]
    Failed(String),

    #[error("yt-dlp did not finish within {} seconds", .0.as_secs())]
    TimedOut(Duration),

    #[error("could not decode yt-dlp output: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("yt-dlp did not report the downloaded file")]
    MissingOutput,

    #[error("downloaded file {0:?} is outside the download directory")]
    OutsideRoot(PathBuf),

    #[error("file system error: {0}")]
    Io(#[from] io::Error),
}

impl EngineError {
    /// Faults of this server rather than of the requested URL.
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::NotInstalled(_) | Self::Spawn(_) | Self::OutsideRoot(_) | Self::Io(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid origin in ALLOWED_ORIGINS: {0}. Use values like https://example.com")]
    InvalidOrigin(String),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("HTTP server error: {0}")]
    Serve(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_failures_are_client_errors_with_prefix() {
        let error = EngineError::Failed("ERROR: Unable to download webpage".to_string());
        let api = ApiError::from_engine(Locale::En, Message::InfoFailed, &error);

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            api.message,
            "An error occurred while fetching video info: ERROR: Unable to download webpage"
        );
    }

    #[test]
    fn missing_binary_is_a_server_fault() {
        let error = EngineError::NotInstalled(PathBuf::from("yt-dlp"));
        let api = ApiError::from_engine(Locale::En, Message::FormatsFailed, &error);

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, Locale::En.text(Message::EngineMissing));
    }

    #[test]
    fn timeout_mentions_limit() {
        let error = EngineError::TimedOut(Duration::from_secs(90));
        assert_eq!(error.to_string(), "yt-dlp did not finish within 90 seconds");
        assert!(!error.is_server_fault());
    }
}
