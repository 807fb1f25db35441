//! ==============================================================================
//! gpio.rs - single-wire sensor drivers (dht11 / dht21 / dht22)
//! ==============================================================================
//!
//! purpose:
//!     the two ways of talking to the physical sensor:
//!
//!     - PythonDriver: runs adafruit_dht in a python3 subprocess and parses
//!       the json line it prints. works on any pi with the library installed.
//!     - NativeDriver (feature = "hardware"): bit-bangs the protocol through
//!       rppal. no python needed, but userspace timing is best-effort.
//!
//!     both end in the same validation; the 40-bit frame decoding used by the
//!     native driver lives in decode_frame() so it is testable off-target.
//!
//! relationships:
//!     - used by: sensor.rs (sensor::open picks a driver from config)
//!
//! ==============================================================================

use serde::Deserialize;
use std::process::Command;

use crate::domain::SensorSample;
use crate::error::SensorError;
use crate::sensor::{self, SensorModel, SensorReader};

// ==============================================================================
// frame decoding
// ==============================================================================

/// decode the 5 data bytes: humidity (2), temperature (2), checksum (1)
pub fn decode_frame(model: SensorModel, frame: [u8; 5]) -> Result<SensorSample, SensorError> {
    let expected = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if expected != frame[4] {
        return Err(SensorError::Checksum { expected, actual: frame[4] });
    }

    let (temperature, humidity) = match model {
        SensorModel::Dht11 => {
            let humidity = frame[0] as f64 + frame[1] as f64 / 10.0;
            let magnitude = frame[2] as f64 + (frame[3] & 0x0F) as f64 / 10.0;
            let temperature = if frame[3] & 0x80 != 0 { -magnitude } else { magnitude };
            (temperature, humidity)
        }
        SensorModel::Dht21 | SensorModel::Dht22 => {
            let humidity = u16::from_be_bytes([frame[0], frame[1]]) as f64 / 10.0;
            let magnitude = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]) as f64 / 10.0;
            // sign bit, brrr
            let temperature = if frame[2] & 0x80 != 0 { -magnitude } else { magnitude };
            (temperature, humidity)
        }
    };

    sensor::validate(temperature, humidity)
}

// ==============================================================================
// python driver - adafruit_dht via subprocess
// ==============================================================================

pub struct PythonDriver {
    model: SensorModel,
    pin: u8,
}

#[derive(Deserialize)]
struct DriverLine {
    t: Option<f64>,
    h: Option<f64>,
}

impl PythonDriver {
    pub fn new(model: SensorModel, pin: u8) -> Self {
        Self { model, pin }
    }

    fn script(&self) -> String {
        format!(
            r#"
import sys
try:
    import adafruit_dht
    import board
    import json

    dht = adafruit_dht.{class}(board.D{pin})

    try:
        t, h = dht.temperature, dht.humidity
        if t is not None and h is not None:
            print(json.dumps({{"t": t, "h": h}}))
        else:
            print("null")
    finally:
        dht.exit()
except Exception as e:
    # only the message, no traceback with paths
    print(str(e), file=sys.stderr)
    sys.exit(1)
"#,
            class = self.model.driver_class(),
            pin = self.pin
        )
    }
}

/// parse what the driver script printed on stdout
pub fn parse_driver_output(stdout: &str) -> Result<SensorSample, SensorError> {
    let stdout = stdout.trim();
    if stdout.is_empty() || stdout == "null" || stdout.contains("NaN") {
        return Err(SensorError::NotANumber);
    }

    let line: DriverLine = serde_json::from_str(stdout)
        .map_err(|e| SensorError::Driver(format!("JSON parse error: {} (got: {})", e, stdout)))?;

    match (line.t, line.h) {
        (Some(t), Some(h)) => sensor::validate(t, h),
        _ => Err(SensorError::NotANumber),
    }
}

impl SensorReader for PythonDriver {
    fn read(&mut self) -> Result<SensorSample, SensorError> {
        let output = Command::new("python3")
            .arg("-c")
            .arg(self.script())
            .output()
            .map_err(|e| SensorError::Driver(format!("failed to run python3: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SensorError::Driver(format!("python error: {}", stderr.trim())));
        }

        parse_driver_output(&String::from_utf8_lossy(&output.stdout))
    }
}

// ==============================================================================
// native driver - rppal bit-banging (raspberry pi only)
// ==============================================================================

#[cfg(feature = "hardware")]
pub use native::NativeDriver;

#[cfg(feature = "hardware")]
mod native {
    use rppal::gpio::{Gpio, IoPin, Level, Mode};
    use std::time::{Duration, Instant};

    use super::decode_frame;
    use crate::domain::SensorSample;
    use crate::error::SensorError;
    use crate::sensor::{SensorModel, SensorReader};

    pub struct NativeDriver {
        model: SensorModel,
        pin: IoPin,
    }

    impl NativeDriver {
        pub fn new(model: SensorModel, pin: u8) -> anyhow::Result<Self> {
            let gpio = Gpio::new()?;
            let pin = gpio.get(pin)?.into_io(Mode::Input);
            Ok(Self { model, pin })
        }

        /// microseconds the line stayed at `level`, or a timeout
        fn wait_while(&self, level: Level, max_us: u128) -> Result<u128, SensorError> {
            let start = Instant::now();
            while self.pin.read() == level {
                if start.elapsed().as_micros() > max_us {
                    return Err(SensorError::Timeout);
                }
            }
            Ok(start.elapsed().as_micros())
        }

        fn acquire(&mut self) -> Result<[u8; 5], SensorError> {
            let wake = match self.model {
                SensorModel::Dht11 => Duration::from_millis(18),
                SensorModel::Dht21 | SensorModel::Dht22 => Duration::from_millis(3),
            };

            // pull down to wake the sensor, then release and listen
            self.pin.set_mode(Mode::Output);
            self.pin.set_low();
            std::thread::sleep(wake);
            self.pin.set_high();
            let release = Instant::now();
            while release.elapsed() < Duration::from_micros(25) {}
            self.pin.set_mode(Mode::Input);

            // response: low 80us, high 80us
            self.wait_while(Level::High, 100)?;
            self.wait_while(Level::Low, 100)?;
            self.wait_while(Level::High, 100)?;

            let mut frame = [0u8; 5];
            for bit in 0..40 {
                self.wait_while(Level::Low, 80)?;
                // ~27us high is a 0, ~70us high is a 1
                let high = self.wait_while(Level::High, 100)?;
                if high > 40 {
                    frame[bit / 8] |= 1 << (7 - bit % 8);
                }
            }
            Ok(frame)
        }
    }

    impl SensorReader for NativeDriver {
        fn read(&mut self) -> Result<SensorSample, SensorError> {
            let frame = self.acquire();
            self.pin.set_mode(Mode::Input);
            decode_frame(self.model, frame?)
        }
    }
}
