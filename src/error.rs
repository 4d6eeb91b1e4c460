// Error type shared by every library module. Each variant is one of the
// failure kinds a command can end in; the binary prints it and exits.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

use crate::session::ServiceKind;

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot manage analytics without being logged in to CF")]
    NotLoggedIn,

    #[error("API endpoint not specified")]
    NoApiEndpoint,

    #[error("Not predix! API endpoint {0} is not a Predix endpoint")]
    WrongApiTarget(String),

    #[error("{} service not found", .0.label())]
    ServiceNotBound(ServiceKind),

    #[error("host CLI call failed: {0}")]
    Host(String),

    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("Auth failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("request to {path} failed with status {status}: {body}")]
    Status {
        path: String,
        status: StatusCode,
        body: String,
    },

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid header {0}")]
    InvalidHeader(String),

    #[error("session state in {path} is corrupt: {source}")]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("operation did not reach a terminal status after {0} status checks")]
    PollLimit(u32),

    #[error("{0}")]
    Input(String),
}

impl CatalogError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CatalogError::Io {
            context: context.into(),
            source,
        }
    }
}
