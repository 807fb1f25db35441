//! ==============================================================================
//! sensor.rs - sensor reader abstraction
//! ==============================================================================
//!
//! purpose:
//!     one interface for the single temperature/humidity sensor, whatever is
//!     behind it: the simulated sensor on a development machine, the python
//!     adafruit driver, or the native bit-banged driver on a raspberry pi.
//!
//! contract:
//!     - read() returns both values or an error. never a partial reading.
//!     - no retries here; the caller decides when to ask again.
//!     - safe to call repeatedly; pacing is the caller's job.
//!
//! relationships:
//!     - used by: server.rs (one read per request)
//!     - uses: gpio.rs (python + native drivers, frame decoding)
//!
//! ==============================================================================

use serde::Deserialize;

use crate::config::SensorConfig;
use crate::domain::SensorSample;
use crate::error::SensorError;
use crate::gpio;

pub trait SensorReader: Send {
    fn read(&mut self) -> Result<SensorSample, SensorError>;
}

/// supported single-wire sensors
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorModel {
    Dht11,
    #[serde(alias = "am2301")]
    Dht21,
    Dht22,
}

impl SensorModel {
    /// class name in the adafruit_dht python package
    pub fn driver_class(&self) -> &'static str {
        match self {
            SensorModel::Dht11 => "DHT11",
            SensorModel::Dht21 => "DHT21",
            SensorModel::Dht22 => "DHT22",
        }
    }
}

/// how the sensor is reached
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Simulated,
    Python,
    Native,
}

/// reject the non-numeric sentinel; both values or nothing
pub fn validate(temperature: f64, humidity: f64) -> Result<SensorSample, SensorError> {
    if !temperature.is_finite() || !humidity.is_finite() {
        return Err(SensorError::NotANumber);
    }
    Ok(SensorSample::new(temperature, humidity))
}

/// open the configured sensor
pub fn open(config: &SensorConfig) -> anyhow::Result<Box<dyn SensorReader>> {
    match config.driver {
        DriverKind::Simulated => {
            tracing::info!("Using SIMULATED sensor (no hardware access)");
            Ok(Box::new(SimulatedSensor::drifting()))
        }
        DriverKind::Python => {
            tracing::info!("Using python {} driver on gpio {}", config.model.driver_class(), config.gpio_pin);
            Ok(Box::new(gpio::PythonDriver::new(config.model, config.gpio_pin)))
        }
        #[cfg(feature = "hardware")]
        DriverKind::Native => {
            tracing::info!("Using native {:?} driver on gpio {} (rppal)", config.model, config.gpio_pin);
            Ok(Box::new(gpio::NativeDriver::new(config.model, config.gpio_pin)?))
        }
        #[cfg(not(feature = "hardware"))]
        DriverKind::Native => {
            anyhow::bail!("the native driver needs a build with the `hardware` feature")
        }
    }
}

// ==============================================================================================
// SIMULATED SENSOR (development machines and tests)
// ==============================================================================================

enum Source {
    Drift { tick: u64 },
    Script { values: Vec<(f64, f64)>, next: usize },
}

pub struct SimulatedSensor {
    source: Source,
}

impl SimulatedSensor {
    /// slow sinusoidal wander around 22 °C / 50 %
    pub fn drifting() -> Self {
        Self { source: Source::Drift { tick: 0 } }
    }

    /// replays `values` in order, wrapping around; `f64::NAN` models a failed read
    pub fn scripted(values: Vec<(f64, f64)>) -> Self {
        Self { source: Source::Script { values, next: 0 } }
    }

    pub fn fixed(temperature: f64, humidity: f64) -> Self {
        Self::scripted(vec![(temperature, humidity)])
    }
}

impl SensorReader for SimulatedSensor {
    fn read(&mut self) -> Result<SensorSample, SensorError> {
        let (temperature, humidity) = match &mut self.source {
            Source::Drift { tick } => {
                let phase = *tick as f64 * 0.05;
                *tick += 1;
                (22.0 + 3.0 * phase.sin(), 50.0 + 10.0 * phase.cos())
            }
            Source::Script { values, next } => {
                let Some(value) = values.get(*next % values.len().max(1)).copied() else {
                    return Err(SensorError::Driver("empty script".to_string()));
                };
                *next += 1;
                value
            }
        };
        tracing::debug!("[SIMULATED] t={} h={}", temperature, humidity);
        validate(temperature, humidity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_is_a_failed_read() {
        assert!(matches!(validate(f64::NAN, 40.0), Err(SensorError::NotANumber)));
        assert!(matches!(validate(21.0, f64::NAN), Err(SensorError::NotANumber)));
        assert!(matches!(validate(21.0, f64::INFINITY), Err(SensorError::NotANumber)));
        assert_eq!(validate(21.0, 40.0).unwrap(), SensorSample::new(21.0, 40.0));
    }

    #[test]
    fn test_scripted_sensor_wraps() {
        let mut sensor = SimulatedSensor::scripted(vec![(20.0, 40.0), (f64::NAN, 41.0)]);
        assert_eq!(sensor.read().unwrap().temperature, 20.0);
        assert!(sensor.read().is_err());
        assert_eq!(sensor.read().unwrap().humidity, 40.0);
    }

    #[test]
    fn test_empty_script_is_an_error() {
        let mut sensor = SimulatedSensor::scripted(Vec::new());
        assert!(matches!(sensor.read(), Err(SensorError::Driver(_))));
    }

    #[test]
    fn test_drifting_sensor_stays_in_range() {
        let mut sensor = SimulatedSensor::drifting();
        for _ in 0..200 {
            let sample = sensor.read().unwrap();
            assert!((19.0..=25.0).contains(&sample.temperature));
            assert!((40.0..=60.0).contains(&sample.humidity));
        }
    }

    #[test]
    fn test_model_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            model: SensorModel,
        }
        let parsed: Wrapper = toml::from_str(r#"model = "am2301""#).unwrap();
        assert_eq!(parsed.model, SensorModel::Dht21);
        assert_eq!(parsed.model.driver_class(), "DHT21");
    }

    #[test]
    fn test_open_simulated() {
        let config = SensorConfig { driver: DriverKind::Simulated, ..SensorConfig::default() };
        let mut sensor = open(&config).unwrap();
        assert!(sensor.read().is_ok());
    }
}
