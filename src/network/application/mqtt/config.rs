//! Engine tunables.
//!
//! Defaults suit a small device talking to a LAN broker. They can be loaded
//! from a JSON document, for instance one kept in device storage; fields
//! missing from the document keep their defaults.
//!
//! ```rust
//! use libmqtt::network::application::mqtt::ClientConfig;
//!
//! let config = ClientConfig::from_json(br#"{ "response_timeout_secs": 10 }"#).unwrap();
//! assert_eq!(config.response_timeout_secs, 10);
//! assert_eq!(config.clean_margin, ClientConfig::default().clean_margin);
//! ```

use serde::Deserialize;

use super::error::Error;

/// Seconds to wait for an acknowledgment before resending.
pub const DEFAULT_RESPONSE_TIMEOUT_SECS: u32 = 30;
/// Queue usage above which [`Client::check_send_buffer`](super::Client::check_send_buffer)
/// compacts the queue.
pub const DEFAULT_CLEAN_MARGIN: usize = 15;
/// Largest non-PUBLISH body kept in filtering mode.
pub const DEFAULT_MAX_UNFILTERED_BODY: usize = 59;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct ClientConfig {
    /// Seconds to wait for CONNACK, SUBACK or PINGRESP before resending.
    pub response_timeout_secs: u32,
    /// Used queue bytes above which the queue is compacted on request.
    pub clean_margin: usize,
    /// Largest body of a non-PUBLISH message kept by a filtering reassembler.
    pub max_unfiltered_body: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            response_timeout_secs: DEFAULT_RESPONSE_TIMEOUT_SECS,
            clean_margin: DEFAULT_CLEAN_MARGIN,
            max_unfiltered_body: DEFAULT_MAX_UNFILTERED_BODY,
        }
    }
}

impl ClientConfig {
    /// Decode a configuration from JSON.
    pub fn from_json(json: &[u8]) -> Result<Self, Error> {
        let (config, _) = serde_json_core::from_slice::<Self>(json).map_err(|_| {
            warn!("config: invalid JSON document");
            Error::InvalidConfig
        })?;
        Ok(config)
    }
}
