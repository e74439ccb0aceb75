//! HTTP clients for the remote assistant backend.
//!
//! Each collaborator sits behind a trait so tests can substitute fakes. All
//! of them fail the same way: network trouble, a non-2xx status, and a
//! malformed payload surface uniformly as a [`GatewayError`] with a
//! human-readable message. No client retries; every call is at most one
//! network attempt, bounded by the configured timeout.

mod answer;
mod speech;
mod transcribe;

pub use answer::{AnswerGateway, AnswerReply, HttpAnswerGateway, SourceRef};
pub use speech::{HttpSpeechGateway, SpeechGateway};
pub use transcribe::{HttpTranscriptionGateway, TranscriptionGateway};

use std::time::Duration;
use thiserror::Error;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Uniform gateway failure. Callers get a message, never a taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub message: String,
}

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::new(err.to_string())
    }
}

pub(crate) fn build_client(timeout: Duration) -> GatewayResult<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_displays_its_message() {
        let err = GatewayError::new("upstream timeout");
        assert_eq!(err.to_string(), "upstream timeout");
    }
}
