//! Client for the answering service.

use super::{build_client, GatewayError, GatewayResult};
use crate::config::GatewayConfig;
use serde::Deserialize;

/// One retrieval citation attached to an answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceRef {
    pub title: String,
    #[serde(default)]
    pub relevance_score: f64,
}

/// Structured reply from `/chat/query`.
///
/// `confidence` and `processing_time` are optional on the wire; absent means
/// the backend did not report them, which is distinct from zero.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerReply {
    #[serde(rename = "response")]
    pub text: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub cached: bool,
    /// Backend processing time in seconds.
    #[serde(default)]
    pub processing_time: Option<f64>,
}

impl AnswerReply {
    /// Round-trip latency in whole milliseconds, when the backend reported one.
    pub fn latency_ms(&self) -> Option<u64> {
        self.processing_time
            .map(|secs| (secs * 1000.0).round().max(0.0) as u64)
    }
}

/// Answering service boundary. One call per submission, no retries.
pub trait AnswerGateway: Send + Sync {
    fn answer(&self, query: &str, use_cache: bool) -> GatewayResult<AnswerReply>;
}

/// Production client for the `/chat/query` endpoint.
pub struct HttpAnswerGateway {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpAnswerGateway {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        Ok(Self {
            base_url: config.base_url.clone(),
            client: build_client(config.timeout)?,
        })
    }
}

impl AnswerGateway for HttpAnswerGateway {
    fn answer(&self, query: &str, use_cache: bool) -> GatewayResult<AnswerReply> {
        let url = format!("{}/chat/query", self.base_url);
        let body = serde_json::json!({
            "query": query,
            "use_cache": use_cache,
        });
        let res = self.client.post(&url).json(&body).send()?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(GatewayError::new(format!(
                "answer service error {status}: {body}"
            )));
        }
        tracing::debug!(status = %res.status(), "chat query round-trip");
        Ok(res.json::<AnswerReply>()?)
    }
}
