//! Shared default values and limits for CLI options.

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";
pub const DEFAULT_SUBJECT: &str = "demo_patient";

pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;
pub const MIN_GATEWAY_TIMEOUT_SECS: u64 = 1;
pub const MAX_GATEWAY_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_VOICE_MIN_PAYLOAD_MS: u64 = 300;
pub const MAX_VOICE_MIN_PAYLOAD_MS: u64 = 5_000;

pub const DEFAULT_VOICE_CHANNEL_CAPACITY: usize = 64;
pub const MIN_VOICE_CHANNEL_CAPACITY: usize = 8;
pub const MAX_VOICE_CHANNEL_CAPACITY: usize = 1_024;

pub const MAX_SUBJECT_CHARS: usize = 64;

pub const DEFAULT_VITALS_DAYS: u32 = 30;
pub const MAX_VITALS_DAYS: u32 = 365;
