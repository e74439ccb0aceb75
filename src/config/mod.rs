//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::{Parser, ValueEnum};
use std::time::Duration;

use defaults::{DEFAULT_SERVICE_URL, DEFAULT_SUBJECT};
pub use defaults::{
    DEFAULT_GATEWAY_TIMEOUT_SECS, DEFAULT_VITALS_DAYS, DEFAULT_VOICE_CHANNEL_CAPACITY,
    DEFAULT_VOICE_MIN_PAYLOAD_MS, MAX_VITALS_DAYS, MAX_VOICE_MIN_PAYLOAD_MS,
};

/// CLI options for the MediVox client. Validated values keep URLs and path
/// segments safe before they reach the gateway layer.
#[derive(Debug, Parser, Clone)]
#[command(about = "MediVox medical assistant client", author, version)]
pub struct AppConfig {
    /// Base URL of the assistant backend
    #[arg(
        long = "service-url",
        env = "MEDIVOX_SERVICE_URL",
        default_value = DEFAULT_SERVICE_URL
    )]
    pub service_url: String,

    /// Subject identifier for vitals queries
    #[arg(long, env = "MEDIVOX_SUBJECT", default_value = DEFAULT_SUBJECT)]
    pub subject: String,

    /// Ask the answering service to bypass its cache
    #[arg(long = "no-cache", default_value_t = false)]
    pub no_cache: bool,

    /// Timeout applied to every gateway request (seconds)
    #[arg(
        long = "gateway-timeout-secs",
        default_value_t = DEFAULT_GATEWAY_TIMEOUT_SECS
    )]
    pub gateway_timeout_secs: u64,

    /// Microphone to capture from, matched by name substring
    #[arg(long)]
    pub input_device: Option<String>,

    /// List microphones visible to this process and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Run environment diagnostics and exit
    #[arg(long = "doctor", default_value_t = false)]
    pub doctor: bool,

    /// Where transcribed speech goes: staged as editable input, or submitted
    #[arg(long = "voice-send-mode", value_enum, default_value_t = VoiceSendMode::Insert)]
    pub voice_send_mode: VoiceSendMode,

    /// Synthesize each assistant reply to an audio file
    #[arg(long = "speak-replies", default_value_t = false)]
    pub speak_replies: bool,

    /// Captures shorter than this are discarded instead of transcribed (milliseconds)
    #[arg(
        long = "voice-min-payload-ms",
        default_value_t = DEFAULT_VOICE_MIN_PAYLOAD_MS
    )]
    pub voice_min_payload_ms: u64,

    /// Frame channel capacity between the device callback and the collector
    #[arg(
        long = "voice-channel-capacity",
        default_value_t = DEFAULT_VOICE_CHANNEL_CAPACITY
    )]
    pub voice_channel_capacity: usize,

    /// Write a debug log file
    #[arg(long = "logs", env = "MEDIVOX_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Suppress every log file, overriding --logs and the log env vars
    #[arg(long = "no-logs", env = "MEDIVOX_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging utterance/transcript snippets (debug log only)
    #[arg(
        long = "log-content",
        env = "MEDIVOX_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,
}

/// Connection parameters shared by every gateway client.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout: Duration,
}

/// Routing for transcribed speech once it reaches the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VoiceSendMode {
    Insert,
    Auto,
}

impl VoiceSendMode {
    pub fn label(self) -> &'static str {
        match self {
            VoiceSendMode::Insert => "insert",
            VoiceSendMode::Auto => "auto",
        }
    }
}
