//! Error taxonomy of the fetch pipeline.

use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

use super::types::RawResponse;

/// Why a fetch ended in [`FetchError::ServerError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerErrorKind {
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("redirect without a Location header")]
    EmptyLocation,

    #[error("invalid redirect scheme: {0}")]
    DisallowedScheme(String),

    #[error("too many redirects (more than {0})")]
    TooManyRedirects(u32),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not found: {url}")]
    NotFound { url: String, duration: Duration },

    #[error("server error: {kind}")]
    ServerError {
        kind: ServerErrorKind,
        response: Option<RawResponse>,
        duration: Duration,
    },

    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),
}

impl FetchError {
    pub(crate) fn server(
        kind: ServerErrorKind,
        response: Option<RawResponse>,
        duration: Duration,
    ) -> Self {
        FetchError::ServerError {
            kind,
            response,
            duration,
        }
    }

    pub(crate) fn transport<E: StdError + Send + Sync + 'static>(e: E) -> Self {
        FetchError::Transport(Box::new(e))
    }

    /// Duration of the last exchange. Transport failures carry none.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            FetchError::NotFound { duration, .. } | FetchError::ServerError { duration, .. } => {
                Some(*duration)
            }
            FetchError::Transport(_) => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::NotFound { .. } => Some(404),
            FetchError::ServerError { response, .. } => response.as_ref().map(|r| r.status),
            FetchError::Transport(_) => None,
        }
    }

    /// The offending response, kept for diagnostics when one exists.
    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            FetchError::ServerError { response, .. } => response.as_ref(),
            _ => None,
        }
    }

    pub fn server_error_kind(&self) -> Option<&ServerErrorKind> {
        match self {
            FetchError::ServerError { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}
