use super::defaults::{
    MAX_GATEWAY_TIMEOUT_SECS, MAX_SUBJECT_CHARS, MAX_VOICE_CHANNEL_CAPACITY,
    MAX_VOICE_MIN_PAYLOAD_MS, MIN_GATEWAY_TIMEOUT_SECS, MIN_VOICE_CHANNEL_CAPACITY,
};
use super::{AppConfig, GatewayConfig};
use anyhow::{bail, Result};
use clap::Parser;
use std::time::Duration;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize the service URL.
    pub fn validate(&mut self) -> Result<()> {
        let url = self.service_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!(
                "--service-url must start with http:// or https://, got '{}'",
                self.service_url
            );
        }
        // A trailing slash would double up when endpoint paths are appended.
        let normalized = url.trim_end_matches('/');
        let host = normalized
            .strip_prefix("http://")
            .or_else(|| normalized.strip_prefix("https://"))
            .unwrap_or("");
        if host.is_empty() {
            bail!("--service-url '{}' has no host", self.service_url);
        }
        self.service_url = normalized.to_string();

        if self.subject.trim().is_empty() {
            bail!("--subject must not be empty");
        }
        if self.subject.chars().count() > MAX_SUBJECT_CHARS {
            bail!(
                "--subject must be at most {MAX_SUBJECT_CHARS} characters, got {}",
                self.subject.chars().count()
            );
        }
        // The subject lands in a URL path segment.
        if !self
            .subject
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        {
            bail!("--subject must contain only alphanumeric characters or '-'/'_'");
        }

        if !(MIN_GATEWAY_TIMEOUT_SECS..=MAX_GATEWAY_TIMEOUT_SECS)
            .contains(&self.gateway_timeout_secs)
        {
            bail!(
                "--gateway-timeout-secs must be between {MIN_GATEWAY_TIMEOUT_SECS} and {MAX_GATEWAY_TIMEOUT_SECS}, got {}",
                self.gateway_timeout_secs
            );
        }

        if self.voice_min_payload_ms > MAX_VOICE_MIN_PAYLOAD_MS {
            bail!(
                "--voice-min-payload-ms must be at most {MAX_VOICE_MIN_PAYLOAD_MS} ms, got {}",
                self.voice_min_payload_ms
            );
        }

        if !(MIN_VOICE_CHANNEL_CAPACITY..=MAX_VOICE_CHANNEL_CAPACITY)
            .contains(&self.voice_channel_capacity)
        {
            bail!(
                "--voice-channel-capacity must be between {MIN_VOICE_CHANNEL_CAPACITY} and {MAX_VOICE_CHANNEL_CAPACITY}, got {}",
                self.voice_channel_capacity
            );
        }

        Ok(())
    }

    /// Snapshot of the connection parameters the gateway clients need.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.service_url.clone(),
            timeout: Duration::from_secs(self.gateway_timeout_secs),
        }
    }

    /// Whether answer queries may be served from the backend cache.
    pub fn use_cache(&self) -> bool {
        !self.no_cache
    }
}
