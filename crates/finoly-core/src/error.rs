//! Error types for Finoly

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The inference provider answered, but not with a usable completion
    #[error("Inference error: {0}")]
    Inference(String),

    /// A model reply could not be reduced to valid JSON
    #[error("Malformed model reply: {0}")]
    MalformedReply(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    /// Whether this error means the inference collaborator itself failed
    /// (network error or provider-side error), as opposed to a bad reply.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Inference(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
