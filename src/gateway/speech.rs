//! Client for the speech-synthesis service.

use super::{build_client, GatewayError, GatewayResult};
use crate::config::GatewayConfig;

/// Speech-synthesis boundary: text in, playable audio bytes out. An empty
/// input synthesizes nothing and returns empty bytes.
pub trait SpeechGateway: Send + Sync {
    fn synthesize(&self, text: &str) -> GatewayResult<Vec<u8>>;
}

/// Production client for the `/voice/synthesize` endpoint.
pub struct HttpSpeechGateway {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpSpeechGateway {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        Ok(Self {
            base_url: config.base_url.clone(),
            client: build_client(config.timeout)?,
        })
    }
}

impl SpeechGateway for HttpSpeechGateway {
    fn synthesize(&self, text: &str) -> GatewayResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/voice/synthesize", self.base_url);
        let body = serde_json::json!({ "text": text });
        let res = self.client.post(&url).json(&body).send()?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(GatewayError::new(format!(
                "speech service error {status}: {body}"
            )));
        }
        Ok(res.bytes()?.to_vec())
    }
}
