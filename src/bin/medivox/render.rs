//! Plain-text rendering for answers, vitals, and the capture meter.

use medivox::audio::METER_FLOOR_DB;
use medivox::session::Utterance;
use medivox::vitals::{VitalsRecord, VitalsSummary};

const METER_SEGMENTS: usize = 10;

pub(crate) fn format_percent(value: f64) -> String {
    format!("{}%", (value * 100.0).round() as i64)
}

/// One-line input level bar, redrawn in place while capturing.
pub(crate) fn format_meter_bar(level_db: f32) -> String {
    let fraction = ((level_db - METER_FLOOR_DB) / -METER_FLOOR_DB).clamp(0.0, 1.0);
    let filled = ((fraction * METER_SEGMENTS as f32).round() as usize).min(METER_SEGMENTS);
    let mut bar = String::from("level [");
    for index in 0..METER_SEGMENTS {
        bar.push(if index < filled { '#' } else { '.' });
    }
    bar.push_str(&format!("] {level_db:>6.1} dB"));
    bar
}

/// Render one transcript entry. Assistant answers get their sources and a
/// footer line; anything without answer metadata renders as bare text.
pub(crate) fn format_answer(utterance: &Utterance) -> String {
    let mut out = format!("assistant> {}", utterance.text);
    let Some(meta) = utterance.answer.as_ref() else {
        return out;
    };
    if !meta.citations.is_empty() {
        out.push_str("\nsources:");
        for (index, citation) in meta.citations.iter().enumerate() {
            out.push_str(&format!(
                "\n  {}. {} ({} match)",
                index + 1,
                citation.title,
                format_percent(citation.relevance)
            ));
        }
    }
    let mut footer = Vec::new();
    if let Some(confidence) = meta.confidence {
        footer.push(format!("confidence: {}", format_percent(confidence)));
    }
    if meta.served_from_cache {
        footer.push("[cached]".to_string());
    }
    if let Some(latency) = meta.latency_ms {
        footer.push(format!("latency: {latency} ms"));
    }
    if !footer.is_empty() {
        out.push('\n');
        out.push_str(&footer.join("  "));
    }
    out
}

pub(crate) fn format_vitals_record(record: &VitalsRecord) -> String {
    let mut parts = Vec::new();
    if let Some(value) = record.heart_rate {
        parts.push(format!("hr {value} bpm"));
    }
    match (
        record.blood_pressure_systolic,
        record.blood_pressure_diastolic,
    ) {
        (Some(sys), Some(dia)) => parts.push(format!("bp {sys}/{dia} mmHg")),
        (Some(sys), None) => parts.push(format!("bp {sys}/- mmHg")),
        (None, Some(dia)) => parts.push(format!("bp -/{dia} mmHg")),
        (None, None) => {}
    }
    if let Some(value) = record.blood_glucose {
        parts.push(format!("glucose {value} mg/dL"));
    }
    if let Some(value) = record.temperature {
        parts.push(format!("temp {value} C"));
    }
    if let Some(value) = record.oxygen_saturation {
        parts.push(format!("spo2 {value}%"));
    }
    if let Some(value) = record.weight {
        parts.push(format!("weight {value} kg"));
    }
    if parts.is_empty() {
        parts.push("no readings".to_string());
    }
    match record.timestamp.as_deref() {
        Some(timestamp) => format!("{timestamp}  {}", parts.join(", ")),
        None => parts.join(", "),
    }
}

pub(crate) fn format_vitals_summary(summary: &VitalsSummary) -> String {
    let mut out = String::new();
    if summary.alerts.is_empty() {
        out.push_str("no active alerts");
    } else {
        out.push_str("alerts:");
        for alert in &summary.alerts {
            out.push_str(&format!("\n  ! {alert}"));
        }
    }
    if let Some(averages) = summary.averages.as_ref() {
        out.push_str("\n30-day averages:");
        if let Some(value) = averages.heart_rate {
            out.push_str(&format!("\n  hr {value:.1} bpm"));
        }
        if let Some(value) = averages.blood_pressure_systolic {
            out.push_str(&format!("\n  systolic {value:.1} mmHg"));
        }
        if let Some(value) = averages.blood_glucose {
            out.push_str(&format!("\n  glucose {value:.1} mg/dL"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use medivox::session::{AnswerMeta, Citation, Role};
    use medivox::vitals::VitalsAverages;
    use std::time::SystemTime;

    fn answered(meta: AnswerMeta) -> Utterance {
        Utterance {
            id: 3,
            role: Role::Assistant,
            text: "Common symptoms include fever, cough...".to_string(),
            created_at: SystemTime::now(),
            answer: Some(meta),
        }
    }

    #[test]
    fn answer_renders_sources_and_footer() {
        let rendered = format_answer(&answered(AnswerMeta {
            citations: vec![Citation {
                title: "CDC Flu Overview".to_string(),
                relevance: 0.92,
            }],
            confidence: Some(0.87),
            served_from_cache: false,
            latency_ms: Some(1200),
        }));
        assert!(rendered.starts_with("assistant> Common symptoms include fever, cough..."));
        assert!(rendered.contains("1. CDC Flu Overview (92% match)"));
        assert!(rendered.contains("confidence: 87%"));
        assert!(rendered.contains("latency: 1200 ms"));
        assert!(!rendered.contains("[cached]"));
    }

    #[test]
    fn cached_answer_shows_the_marker_and_skips_absent_fields() {
        let rendered = format_answer(&answered(AnswerMeta {
            citations: Vec::new(),
            confidence: None,
            served_from_cache: true,
            latency_ms: None,
        }));
        assert!(rendered.contains("[cached]"));
        assert!(!rendered.contains("sources:"));
        assert!(!rendered.contains("confidence"));
        assert!(!rendered.contains("latency"));
    }

    #[test]
    fn plain_utterance_renders_as_bare_text() {
        let utterance = Utterance {
            id: 1,
            role: Role::Assistant,
            text: "Hello!".to_string(),
            created_at: SystemTime::now(),
            answer: None,
        };
        assert_eq!(format_answer(&utterance), "assistant> Hello!");
    }

    #[test]
    fn percent_rounds_to_whole_numbers() {
        assert_eq!(format_percent(0.876), "88%");
        assert_eq!(format_percent(0.0), "0%");
        assert_eq!(format_percent(1.0), "100%");
    }

    #[test]
    fn vitals_record_lists_present_readings() {
        let record = VitalsRecord {
            heart_rate: Some(72),
            blood_pressure_systolic: Some(120),
            blood_pressure_diastolic: Some(80),
            temperature: Some(36.6),
            timestamp: Some("2025-06-01T08:30:00".to_string()),
            ..VitalsRecord::default()
        };
        let rendered = format_vitals_record(&record);
        assert_eq!(
            rendered,
            "2025-06-01T08:30:00  hr 72 bpm, bp 120/80 mmHg, temp 36.6 C"
        );
    }

    #[test]
    fn empty_vitals_record_says_so() {
        assert_eq!(format_vitals_record(&VitalsRecord::default()), "no readings");
    }

    #[test]
    fn summary_renders_alerts_and_averages() {
        let summary = VitalsSummary {
            alerts: vec!["Heart rate trending high".to_string()],
            averages: Some(VitalsAverages {
                heart_rate: Some(88.4),
                blood_pressure_systolic: Some(131.0),
                blood_glucose: None,
            }),
        };
        let rendered = format_vitals_summary(&summary);
        assert!(rendered.contains("! Heart rate trending high"));
        assert!(rendered.contains("hr 88.4 bpm"));
        assert!(rendered.contains("systolic 131.0 mmHg"));
        assert!(!rendered.contains("glucose"));
    }

    #[test]
    fn empty_summary_reports_no_alerts() {
        assert_eq!(
            format_vitals_summary(&VitalsSummary::default()),
            "no active alerts"
        );
    }

    #[test]
    fn meter_bar_spans_floor_to_full_scale() {
        assert_eq!(format_meter_bar(METER_FLOOR_DB), "level [..........]  -60.0 dB");
        assert_eq!(format_meter_bar(0.0), "level [##########]    0.0 dB");
        assert_eq!(format_meter_bar(-30.0), "level [#####.....]  -30.0 dB");
    }

    #[test]
    fn meter_bar_clamps_outside_the_range() {
        assert!(format_meter_bar(-90.0).contains("[..........]"));
        assert!(format_meter_bar(6.0).contains("[##########]"));
    }
}
