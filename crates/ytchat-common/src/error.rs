use thiserror::Error;

/// Errors shared by every ytchat crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("agent error: {0}")]
    Agent(String),

    #[error("no active conversation context")]
    NoActiveContext,

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("{provider} API error: {status} {status_text}")]
    Http {
        provider: String,
        status: u16,
        status_text: String,
    },

    #[error("no response from provider ({provider})")]
    NoResponse { provider: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status carried by an upstream failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
