//! Error taxonomy shared by the signing engine, activation and the poll loop.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The activation code is not `<shortCode>-<hostToken>` or the host token
    /// does not decode.
    #[error("malformed activation code: {0}")]
    CodeFormat(String),

    #[error("malformed key material: {0}")]
    KeyFormat(String),

    /// The randomness source or key generator is unusable.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// The service rejected activation or returned an incomplete record.
    #[error("{message}")]
    Activation { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Parse(String),

    #[error("device store error: {0}")]
    Store(String),
}

impl Error {
    pub(crate) fn activation(message: impl Into<String>) -> Self {
        Error::Activation {
            message: message.into(),
        }
    }

    /// Network failures and non-2xx replies.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::UnexpectedStatus { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Store(e.to_string())
    }
}
