//! Transport configuration.
//!
//! # Design
//! `TransportConfig::default()` is the process-wide configuration every
//! client starts from. Values are plain data and never mutated once a factory
//! holds them, so one `Arc<TransportConfig>` is shared by all requests and
//! worker threads.
//!
//! Timeouts (de)serialize as integer milliseconds so the struct can be
//! embedded in an application's own config file.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use ureq::http::HeaderValue;

use crate::error::ConfigError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; MSIE 9.0; Windows NT 6.1; Trident/5.0)";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Charset of every encoded request body. Rust strings are always UTF-8.
pub const CHARSET: &str = "UTF-8";

/// How server certificates and hostnames are checked on `https` requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsPolicy {
    /// Accept any certificate chain and any hostname.
    ///
    /// INSECURE: only appropriate against trusted or test endpoints. A
    /// man-in-the-middle can read and alter all traffic.
    #[default]
    TrustAll,
    /// Regular webpki chain and hostname verification.
    Verified,
}

/// Settings applied to every transport a factory creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub user_agent: String,
    #[serde(with = "millis")]
    pub connect_timeout: Duration,
    /// Bounds both waiting for the response head and reading the body.
    #[serde(with = "millis")]
    pub read_timeout: Duration,
    /// Send `Expect: 100-continue` ahead of non-empty request bodies.
    pub expect_continue: bool,
    pub tls: TlsPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            expect_continue: true,
            tls: TlsPolicy::default(),
        }
    }
}

impl TransportConfig {
    /// Check that every value can be put on the wire as configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.is_empty() || HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(ConfigError::InvalidUserAgent(self.user_agent.clone()));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout { name: "connect" });
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout { name: "read" });
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_process_constants() {
        let config = TransportConfig::default();
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert!(config.expect_continue);
        assert_eq!(config.tls, TlsPolicy::TrustAll);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserializes_partial_config_with_defaults() {
        let config: TransportConfig =
            serde_json::from_str(r#"{"read_timeout":1500,"tls":"verified"}"#).unwrap();
        assert_eq!(config.read_timeout, Duration::from_millis(1500));
        assert_eq!(config.connect_timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.tls, TlsPolicy::Verified);
    }

    #[test]
    fn serializes_timeouts_as_millis() {
        let json = serde_json::to_value(TransportConfig::default()).unwrap();
        assert_eq!(json["connect_timeout"], 30_000);
        assert_eq!(json["tls"], "trust_all");
    }

    #[test]
    fn rejects_bad_user_agent() {
        let config = TransportConfig {
            user_agent: "bad\nagent".to_string(),
            ..TransportConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUserAgent(_))));
    }

    #[test]
    fn rejects_zero_timeouts() {
        let config = TransportConfig {
            read_timeout: Duration::ZERO,
            ..TransportConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout { name: "read" })));
    }
}
