use dockex_common::DockexError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DockerError>;

#[derive(Debug, Error)]
pub enum DockerError {
    #[error("invalid docker host {0:?}")]
    InvalidHost(String),
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build request: {0}")]
    Request(#[source] http::Error),
    #[error("http error: {0}")]
    Http(#[source] hyper::Error),
    #[error("daemon returned status {status} for {path}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },
    #[error("failed to decode response of {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<DockerError> for DockexError {
    fn from(value: DockerError) -> Self {
        DockexError::Docker(value.to_string())
    }
}
