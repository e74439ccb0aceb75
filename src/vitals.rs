//! Client for the vitals store.
//!
//! Read endpoints are keyed by subject identifier; all calls are single
//! attempts that surface failures as [`GatewayError`] messages. The store's
//! summary statistics are computed backend-side and consumed as-is.

use crate::config::GatewayConfig;
use crate::gateway::{build_client, GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};

/// One vitals measurement. Every field is optional; a subject may log any
/// subset per entry.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct VitalsRecord {
    #[serde(default)]
    pub heart_rate: Option<i64>,
    #[serde(default)]
    pub blood_pressure_systolic: Option<i64>,
    #[serde(default)]
    pub blood_pressure_diastolic: Option<i64>,
    #[serde(default)]
    pub blood_glucose: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub oxygen_saturation: Option<i64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct VitalsAverages {
    #[serde(default)]
    pub heart_rate: Option<f64>,
    #[serde(default)]
    pub blood_pressure_systolic: Option<f64>,
    #[serde(default)]
    pub blood_glucose: Option<f64>,
}

/// Backend-computed overview: alert strings plus rolling averages.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct VitalsSummary {
    #[serde(default)]
    pub alerts: Vec<String>,
    #[serde(default, rename = "30_day_averages")]
    pub averages: Option<VitalsAverages>,
}

pub struct VitalsClient {
    base_url: String,
    subject: String,
    client: reqwest::blocking::Client,
}

impl VitalsClient {
    pub fn new(config: &GatewayConfig, subject: &str) -> GatewayResult<Self> {
        Ok(Self {
            base_url: config.base_url.clone(),
            subject: subject.to_string(),
            client: build_client(config.timeout)?,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Most recent measurement, or `None` when the store has nothing yet.
    pub fn latest(&self) -> GatewayResult<Option<VitalsRecord>> {
        let url = format!(
            "{}/digital-twin/vitals/{}/latest",
            self.base_url, self.subject
        );
        let res = self.client.get(&url).send()?;
        if !res.status().is_success() {
            return Err(status_error(res));
        }
        // The store answers `null` for an empty history.
        Ok(res.json::<Option<VitalsRecord>>()?)
    }

    pub fn history(&self, days: u32) -> GatewayResult<Vec<VitalsRecord>> {
        let url = format!(
            "{}/digital-twin/vitals/{}/history?days={days}",
            self.base_url, self.subject
        );
        let res = self.client.get(&url).send()?;
        if !res.status().is_success() {
            return Err(status_error(res));
        }
        Ok(res.json::<Vec<VitalsRecord>>()?)
    }

    pub fn summary(&self) -> GatewayResult<VitalsSummary> {
        let url = format!(
            "{}/digital-twin/vitals/{}/summary",
            self.base_url, self.subject
        );
        let res = self.client.get(&url).send()?;
        if !res.status().is_success() {
            return Err(status_error(res));
        }
        Ok(res.json::<VitalsSummary>()?)
    }

    /// Store one measurement for this subject.
    pub fn record(&self, record: &VitalsRecord) -> GatewayResult<()> {
        let url = format!("{}/digital-twin/vitals", self.base_url);
        let body = record_body(&self.subject, record)?;
        let res = self.client.post(&url).json(&body).send()?;
        if !res.status().is_success() {
            return Err(status_error(res));
        }
        Ok(())
    }

    /// Ask the store to synthesize `days` of demo measurements.
    pub fn generate_mock(&self, days: u32) -> GatewayResult<()> {
        let url = format!(
            "{}/digital-twin/vitals/{}/generate-mock?days={days}",
            self.base_url, self.subject
        );
        let res = self.client.post(&url).send()?;
        if !res.status().is_success() {
            return Err(status_error(res));
        }
        Ok(())
    }
}

fn record_body(subject: &str, record: &VitalsRecord) -> GatewayResult<serde_json::Value> {
    let mut body = serde_json::to_value(record)
        .map_err(|err| GatewayError::new(format!("could not encode vitals: {err}")))?;
    if let serde_json::Value::Object(ref mut map) = body {
        map.insert(
            "user_id".to_string(),
            serde_json::Value::String(subject.to_string()),
        );
    }
    Ok(body)
}

fn status_error(res: reqwest::blocking::Response) -> GatewayError {
    let status = res.status();
    let body = res.text().unwrap_or_default();
    GatewayError::new(format!("vitals service error {status}: {body}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_partial_record() {
        let json = r#"{
            "heart_rate": 72,
            "blood_pressure_systolic": 120,
            "blood_pressure_diastolic": 80,
            "blood_glucose": null,
            "timestamp": "2025-06-01T08:30:00"
        }"#;
        let record: VitalsRecord = serde_json::from_str(json).expect("record should parse");
        assert_eq!(record.heart_rate, Some(72));
        assert_eq!(record.blood_pressure_systolic, Some(120));
        assert_eq!(record.blood_glucose, None);
        assert_eq!(record.oxygen_saturation, None);
        assert_eq!(record.timestamp.as_deref(), Some("2025-06-01T08:30:00"));
    }

    #[test]
    fn null_latest_reply_means_no_data() {
        let latest: Option<VitalsRecord> = serde_json::from_str("null").expect("null parses");
        assert!(latest.is_none());
    }

    #[test]
    fn summary_reads_the_rolling_averages_key() {
        let json = r#"{
            "alerts": ["Blood pressure elevated"],
            "30_day_averages": {
                "heart_rate": 71.5,
                "blood_pressure_systolic": 124.0,
                "blood_glucose": 98.2
            }
        }"#;
        let summary: VitalsSummary = serde_json::from_str(json).expect("summary should parse");
        assert_eq!(summary.alerts, vec!["Blood pressure elevated".to_string()]);
        let averages = summary.averages.expect("averages present");
        assert_eq!(averages.heart_rate, Some(71.5));
        assert_eq!(averages.blood_glucose, Some(98.2));
    }

    #[test]
    fn empty_summary_defaults_cleanly() {
        let summary: VitalsSummary = serde_json::from_str("{}").expect("empty summary parses");
        assert!(summary.alerts.is_empty());
        assert!(summary.averages.is_none());
    }

    #[test]
    fn record_body_carries_the_subject_and_explicit_nulls() {
        let record = VitalsRecord {
            heart_rate: Some(68),
            ..VitalsRecord::default()
        };
        let body = record_body("demo_patient", &record).expect("body should encode");
        assert_eq!(body["user_id"], "demo_patient");
        assert_eq!(body["heart_rate"], 68);
        assert!(body["blood_glucose"].is_null());
        assert!(body.get("timestamp").is_none());
    }
}
