//! Environment diagnostics behind the `--doctor` flag.

use crate::audio::Recorder;
use crate::config::AppConfig;
use crate::logging::{crash_log_path, log_file_path};
use crate::telemetry::tracing_log_path;
use std::{env, fmt::Display};

pub struct DoctorReport {
    lines: Vec<String>,
}

impl DoctorReport {
    pub fn new(title: &str) -> Self {
        Self {
            lines: vec![title.to_string()],
        }
    }

    pub fn section(&mut self, title: &str) {
        self.lines.push(String::new());
        self.lines.push(format!("{title}:"));
    }

    pub fn push_kv(&mut self, key: &str, value: impl Display) {
        self.lines.push(format!("  {key}: {value}"));
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// Assemble the standard diagnostics: resolved config, log locations, and
/// the audio devices visible to this process.
pub fn base_doctor_report(config: &AppConfig, binary_name: &str) -> DoctorReport {
    let mut report = DoctorReport::new("MediVox Doctor");
    report.push_kv("version", env!("CARGO_PKG_VERSION"));
    report.push_kv("binary", binary_name);
    report.push_kv("os", format!("{}/{}", env::consts::OS, env::consts::ARCH));

    let mut validated = config.clone();
    let validation_result = validated.validate();
    let resolved = validation_result
        .as_ref()
        .map(|_| &validated)
        .unwrap_or(config);

    report.section("Service");
    match &validation_result {
        Ok(()) => report.push_kv("validation", "ok"),
        Err(err) => report.push_kv("validation", format!("error: {err}")),
    }
    report.push_kv("url", &resolved.service_url);
    report.push_kv("subject", &resolved.subject);
    report.push_kv("timeout", format!("{}s", resolved.gateway_timeout_secs));
    report.push_kv(
        "answer_cache",
        if resolved.no_cache { "bypassed" } else { "enabled" },
    );

    report.section("Logging");
    let logs_enabled = resolved.logs && !resolved.no_logs;
    report.push_kv("logs", if logs_enabled { "enabled" } else { "disabled" });
    report.push_kv(
        "log_content",
        if resolved.log_content {
            "enabled"
        } else {
            "disabled"
        },
    );
    report.push_kv("log_file", log_file_path().display());
    report.push_kv("crash_log", crash_log_path().display());
    report.push_kv("trace_file", tracing_log_path().display());

    report.section("Voice");
    report.push_kv(
        "input_device",
        resolved.input_device.as_deref().unwrap_or("default"),
    );
    report.push_kv("send_mode", resolved.voice_send_mode.label());
    report.push_kv("min_payload_ms", resolved.voice_min_payload_ms);
    report.push_kv("channel_capacity", resolved.voice_channel_capacity);
    match Recorder::list_devices() {
        Ok(devices) => {
            report.push_kv("device_count", devices.len());
            if devices.is_empty() {
                report.push_kv("devices", "none");
            } else {
                report.push_line("  devices:");
                for name in devices {
                    report.push_line(format!("    - {name}"));
                }
            }
        }
        Err(err) => report.push_kv("devices", format!("error: {err}")),
    }

    report
}
