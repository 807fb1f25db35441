//! ==============================================================================
//! poller.rs - one GET against the node's /data endpoint
//! ==============================================================================
//!
//! purpose:
//!     turns a single http round trip into a reading or a PollError:
//!
//!         connect / dns / timeout       -> PollError::Network
//!         non-2xx status                -> PollError::Status
//!         {"error": true} (any status)  -> PollError::SensorFault
//!         bad json / missing fields     -> PollError::Malformed
//!
//!     there is no retry here. a failed poll is simply the end of that cycle.
//!
//! relationships:
//!     - used by: monitor.rs (once per tick)
//!     - speaks to: server.rs on the node
//!
//! ==============================================================================

use reqwest::Client;
use std::time::Duration;

use crate::domain::{Payload, SensorSample};
use crate::error::PollError;

pub struct Poller {
    client: Client,
    url: String,
}

impl Poller {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PollError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn poll_once(&self) -> Result<SensorSample, PollError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!("<- {} {}", status, body);
        interpret(status, &body)
    }
}

/// map status + body to a reading
pub fn interpret(status: u16, body: &str) -> Result<SensorSample, PollError> {
    let payload = serde_json::from_str::<Payload>(body);

    if !(200..300).contains(&status) {
        return match payload {
            Ok(Payload::Error { error: true }) => Err(PollError::SensorFault),
            _ => Err(PollError::Status(status)),
        };
    }

    match payload.map_err(|e| PollError::Malformed(e.to_string()))? {
        Payload::Reading { temp, hum } => Ok(SensorSample::new(temp, hum)),
        Payload::Error { error: true } => Err(PollError::SensorFault),
        Payload::Error { error: false } => {
            Err(PollError::Malformed("error marker without a reading".to_string()))
        }
    }
}
