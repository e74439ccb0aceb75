//! Client for the transcription service.

use super::{build_client, GatewayError, GatewayResult};
use crate::config::GatewayConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TranscriptionReply {
    #[serde(default)]
    transcription: String,
}

/// Transcription service boundary: opaque audio bytes in, recognized text out.
pub trait TranscriptionGateway: Send + Sync {
    fn transcribe(&self, payload: Vec<u8>, mime_hint: &str) -> GatewayResult<String>;
}

/// Production client for the `/voice/transcribe` endpoint. Uploads the
/// payload as a multipart file field named `audio`.
pub struct HttpTranscriptionGateway {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpTranscriptionGateway {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        Ok(Self {
            base_url: config.base_url.clone(),
            client: build_client(config.timeout)?,
        })
    }
}

impl TranscriptionGateway for HttpTranscriptionGateway {
    fn transcribe(&self, payload: Vec<u8>, mime_hint: &str) -> GatewayResult<String> {
        let url = format!("{}/voice/transcribe", self.base_url);
        let part = reqwest::blocking::multipart::Part::bytes(payload)
            .file_name("recording.wav")
            .mime_str(mime_hint)
            .map_err(|err| GatewayError::new(format!("invalid mime hint: {err}")))?;
        let form = reqwest::blocking::multipart::Form::new().part("audio", part);
        let res = self.client.post(&url).multipart(form).send()?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(GatewayError::new(format!(
                "transcription service error {status}: {body}"
            )));
        }
        tracing::debug!(status = %res.status(), "transcription round-trip");
        let reply = res.json::<TranscriptionReply>()?;
        Ok(reply.transcription.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_parses_transcription_field() {
        let reply: TranscriptionReply =
            serde_json::from_str(r#"{"transcription": "hello there"}"#).expect("should parse");
        assert_eq!(reply.transcription, "hello there");
    }

    #[test]
    fn reply_tolerates_missing_field() {
        let reply: TranscriptionReply = serde_json::from_str("{}").expect("should parse");
        assert!(reply.transcription.is_empty());
    }
}
