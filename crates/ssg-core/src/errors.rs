use std::time::Duration;

/// Core error type.
///
/// Adapter crates map their specific errors into this type so the web layer can
/// decide what to show the user and which HTTP status to answer with.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("error sending message: {0}")]
    Delivery(String),

    #[error("error opening DM channel: {0}")]
    Lookup(String),

    #[error("error fetching replies after {attempts} attempt(s): {reason}")]
    Backend { attempts: u32, reason: String },

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("{method} failed: {code}")]
    Api { method: String, code: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Machine-readable backend code, when the backend supplied one.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Error::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
