//! Error type shared by every backend operation.

pub type Result<T> = std::result::Result<T, ClientError>;

/// Coarse classification of a [`ClientError`], used by callers that only
/// need to decide how to present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A form field was empty or malformed; nothing was sent.
    Validation,
    /// Session data was missing; nothing was sent.
    Precondition,
    /// The request could not be delivered or the response never arrived.
    Transport,
    /// The backend answered with a non-success status.
    Server,
    /// The health probe failed.
    Unreachable,
    /// The backend answered with a body we could not interpret.
    Protocol,
    /// A local file could not be read.
    Io,
    /// A local image could not be decoded or re-encoded.
    Image,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),

    #[error("user id or CSRF token not found, log in first")]
    MissingSession,

    #[error("server address is not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("server {host}:{port} is unreachable: {reason}")]
    Unreachable {
        host: String,
        port: String,
        reason: String,
    },

    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::MissingSession | Self::NotConfigured => ErrorKind::Precondition,
            Self::Transport(e) if e.is_decode() => ErrorKind::Protocol,
            Self::Transport(_) | Self::Socket(_) => ErrorKind::Transport,
            Self::Server { .. } => ErrorKind::Server,
            Self::Unreachable { .. } => ErrorKind::Unreachable,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Io { .. } => ErrorKind::Io,
            Self::Image { .. } => ErrorKind::Image,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}
