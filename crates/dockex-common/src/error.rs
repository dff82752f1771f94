use thiserror::Error;

#[derive(Debug, Error)]
pub enum DockexError {
    #[error("docker api error: {0}")]
    Docker(String),
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),
    #[error("label mismatch for {metric}: expected {expected} values, got {got}")]
    LabelMismatch {
        metric: String,
        expected: usize,
        got: usize,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    InternalError(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DockexError {
    /// Short, stable classification used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Docker(_) => "docker",
            Self::DeadlineExceeded(_) => "deadline",
            Self::LabelMismatch { .. } => "label_mismatch",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InternalError(_) => "internal",
            Self::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, DockexError>;
