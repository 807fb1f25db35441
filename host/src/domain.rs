//! ==============================================================================
//! domain.rs - readings, history records and the /data wire payload
//! ==============================================================================
//!
//! purpose:
//!     the small set of types that travel through the pipeline:
//!
//!         sensor ──SensorSample──> server ──Payload──> poller ──HistoryRecord──> history
//!
//!     a sample is either complete (both values numeric) or it does not exist;
//!     partial readings are never built.
//!
//! ==============================================================================

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};

/// one raw measurement straight from the sensor
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorSample {
    /// temperature in celsius
    pub temperature: f64,
    /// relative humidity (0-100%)
    pub humidity: f64,
}

impl SensorSample {
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self { temperature, humidity }
    }

    /// both values rounded to one decimal place, as sent on the wire
    pub fn rounded(&self) -> Self {
        Self {
            temperature: round1(self.temperature),
            humidity: round1(self.humidity),
        }
    }
}

/// a sample stamped with the local time it was received
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub temperature: f64,
    pub humidity: f64,
    pub timestamp: NaiveDateTime,
}

impl Reading {
    pub fn now(sample: SensorSample) -> Self {
        Self::at(sample, local_now())
    }

    pub fn at(sample: SensorSample, timestamp: NaiveDateTime) -> Self {
        Self {
            temperature: sample.temperature,
            humidity: sample.humidity,
            timestamp,
        }
    }
}

/// one entry of the persisted history file
///
/// the legacy spanish keys are still accepted so older log files load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(alias = "fecha")]
    pub timestamp: NaiveDateTime,
    #[serde(alias = "temperatura")]
    pub temperature: f64,
    #[serde(alias = "humedad")]
    pub humidity: f64,
}

impl From<Reading> for HistoryRecord {
    fn from(reading: Reading) -> Self {
        Self {
            timestamp: reading.timestamp,
            temperature: reading.temperature,
            humidity: reading.humidity,
        }
    }
}

/// body of `GET /data`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Reading { temp: f64, hum: f64 },
    Error { error: bool },
}

impl Payload {
    pub fn sensor_failure() -> Self {
        Payload::Error { error: true }
    }
}

impl From<SensorSample> for Payload {
    fn from(sample: SensorSample) -> Self {
        let rounded = sample.rounded();
        Payload::Reading {
            temp: rounded.temperature,
            hum: rounded.humidity,
        }
    }
}

/// round half away from zero to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// local wall-clock time, whole seconds
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round1() {
        assert_eq!(round1(23.456), 23.5);
        assert_eq!(round1(55.21), 55.2);
        assert_eq!(round1(-4.25), -4.3);
        assert_eq!(round1(0.04), 0.0);
    }

    #[test]
    fn test_payload_json_shape() {
        let body = serde_json::to_string(&Payload::from(SensorSample::new(23.456, 55.21))).unwrap();
        assert_eq!(body, r#"{"temp":23.5,"hum":55.2}"#);

        let body = serde_json::to_string(&Payload::sensor_failure()).unwrap();
        assert_eq!(body, r#"{"error":true}"#);
    }

    #[test]
    fn test_payload_parses_error_marker() {
        let payload: Payload = serde_json::from_str(r#"{"error": true}"#).unwrap();
        assert_eq!(payload, Payload::Error { error: true });
    }

    #[test]
    fn test_history_record_accepts_legacy_keys() {
        let json = r#"{"fecha": "2025-03-01T08:15:00", "temperatura": 21.3, "humedad": 48.0}"#;
        let record: HistoryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.temperature, 21.3);
        assert_eq!(record.humidity, 48.0);
        assert_eq!(record.timestamp.to_string(), "2025-03-01 08:15:00");

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["timestamp"], "2025-03-01T08:15:00");
    }

    #[test]
    fn test_local_now_has_whole_seconds() {
        use chrono::Timelike;
        assert_eq!(local_now().nanosecond(), 0);
    }
}
