use super::defaults::{
    DEFAULT_SERVICE_URL, DEFAULT_SUBJECT, MAX_GATEWAY_TIMEOUT_SECS, MAX_SUBJECT_CHARS,
    MAX_VOICE_MIN_PAYLOAD_MS,
};
use super::{AppConfig, VoiceSendMode};
use clap::Parser;
use std::time::Duration;

#[test]
fn accepts_valid_defaults() {
    let mut cfg = AppConfig::parse_from(["medivox"]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.service_url, DEFAULT_SERVICE_URL);
    assert_eq!(cfg.subject, DEFAULT_SUBJECT);
}

#[test]
fn rejects_service_url_without_scheme() {
    let mut cfg = AppConfig::parse_from(["medivox", "--service-url", "localhost:8000"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_service_url_without_host() {
    let mut cfg = AppConfig::parse_from(["medivox", "--service-url", "http://"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["medivox", "--service-url", "https:///"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn strips_trailing_slashes_from_service_url() {
    let mut cfg = AppConfig::parse_from(["medivox", "--service-url", "http://backend:8000/"]);
    cfg.validate().expect("url should be valid");
    assert_eq!(cfg.service_url, "http://backend:8000");
}

#[test]
fn accepts_https_service_url() {
    let mut cfg = AppConfig::parse_from(["medivox", "--service-url", "https://api.example.org"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_empty_subject() {
    let mut cfg = AppConfig::parse_from(["medivox", "--subject", "  "]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_subject_with_path_characters() {
    for bad in ["a/b", "a b", "name?", "x#y", "per%cent"] {
        let mut cfg = AppConfig::parse_from(["medivox", "--subject", bad]);
        assert!(cfg.validate().is_err(), "subject '{bad}' should be rejected");
    }
}

#[test]
fn rejects_subject_over_max_length() {
    let long = "p".repeat(MAX_SUBJECT_CHARS + 1);
    let mut cfg = AppConfig::parse_from(["medivox", "--subject", &long]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_subject_at_max_length() {
    let name = "p".repeat(MAX_SUBJECT_CHARS);
    let mut cfg = AppConfig::parse_from(["medivox", "--subject", &name]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_gateway_timeout_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["medivox", "--gateway-timeout-secs", "0"]);
    assert!(cfg.validate().is_err());
    let over = (MAX_GATEWAY_TIMEOUT_SECS + 1).to_string();
    let mut cfg = AppConfig::parse_from(["medivox", "--gateway-timeout-secs", &over]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_gateway_timeout_bounds() {
    let mut cfg = AppConfig::parse_from(["medivox", "--gateway-timeout-secs", "1"]);
    assert!(cfg.validate().is_ok());
    let max = MAX_GATEWAY_TIMEOUT_SECS.to_string();
    let mut cfg = AppConfig::parse_from(["medivox", "--gateway-timeout-secs", &max]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_voice_min_payload_above_max() {
    let over = (MAX_VOICE_MIN_PAYLOAD_MS + 1).to_string();
    let mut cfg = AppConfig::parse_from(["medivox", "--voice-min-payload-ms", &over]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_voice_min_payload_of_zero() {
    let mut cfg = AppConfig::parse_from(["medivox", "--voice-min-payload-ms", "0"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_voice_channel_capacity_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["medivox", "--voice-channel-capacity", "4"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["medivox", "--voice-channel-capacity", "1025"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_voice_channel_capacity_bounds() {
    let mut cfg = AppConfig::parse_from(["medivox", "--voice-channel-capacity", "8"]);
    assert!(cfg.validate().is_ok());
    let mut cfg = AppConfig::parse_from(["medivox", "--voice-channel-capacity", "1024"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn gateway_config_reflects_flags() {
    let mut cfg = AppConfig::parse_from([
        "medivox",
        "--service-url",
        "http://backend:9000",
        "--gateway-timeout-secs",
        "5",
    ]);
    cfg.validate().expect("flags should be valid");
    let gateway = cfg.gateway_config();
    assert_eq!(gateway.base_url, "http://backend:9000");
    assert_eq!(gateway.timeout, Duration::from_secs(5));
}

#[test]
fn use_cache_defaults_on_and_no_cache_disables_it() {
    let cfg = AppConfig::parse_from(["medivox"]);
    assert!(cfg.use_cache());
    let cfg = AppConfig::parse_from(["medivox", "--no-cache"]);
    assert!(!cfg.use_cache());
}

#[test]
fn voice_send_mode_labels_are_stable() {
    assert_eq!(VoiceSendMode::Insert.label(), "insert");
    assert_eq!(VoiceSendMode::Auto.label(), "auto");
}

#[test]
fn voice_send_mode_defaults_to_insert() {
    let cfg = AppConfig::parse_from(["medivox"]);
    assert_eq!(cfg.voice_send_mode, VoiceSendMode::Insert);
    let cfg = AppConfig::parse_from(["medivox", "--voice-send-mode", "auto"]);
    assert_eq!(cfg.voice_send_mode, VoiceSendMode::Auto);
}
