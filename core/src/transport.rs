//! Transports and the factory that configures them.
//!
//! # Design
//! A `Transport` performs a single round-trip and owns whatever connection
//! state that needs. Callers get one from a `TransportFactory` per request
//! and call `shutdown` afterwards, so no connection or pool outlives the
//! request that opened it. Reuse is given up in exchange for having no
//! shared mutable transport state between threads.
//!
//! `UreqTransport` is the production implementation. Under
//! `TlsPolicy::TrustAll` it accepts every certificate chain and hostname.
//! The read timeout is an idle limit: every wait for socket input is capped
//! at `read_timeout`, so a body that keeps arriving never times out however
//! long it takes in total.

use std::sync::Arc;
use std::time::Duration;

use tracing::{trace, warn};
use ureq::tls::TlsConfig;
use ureq::unversioned::resolver::DefaultResolver;
use ureq::unversioned::transport::time::Duration as WireDuration;
use ureq::unversioned::transport::{
    Buffers, ConnectionDetails, Connector, DefaultConnector, NextTimeout, Transport as Wire,
};
use ureq::Agent;
use url::Url;

use crate::config::{TlsPolicy, TransportConfig};
use crate::error::{ConfigError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes requests on the wire.
pub trait Transport {
    /// Send `request` and return once the response head has arrived.
    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Release connections. Further `execute` calls fail.
    fn shutdown(&mut self);
}

/// Builds a fresh, configured transport for each request.
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn Transport>, ConfigError>;
}

/// URI schemes a transport accepts, with their default ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain TCP.
    Http,
    /// TLS, verified according to the configured `TlsPolicy`.
    Https,
}

impl Scheme {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

const USER_AGENT: &str = "user-agent";
const EXPECT: &str = "expect";

/// Creates `UreqTransport`s that share one validated configuration.
#[derive(Debug, Clone)]
pub struct UreqTransportFactory {
    config: Arc<TransportConfig>,
}

impl UreqTransportFactory {
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.tls == TlsPolicy::TrustAll {
            warn!("TLS certificate and hostname verification are disabled for https requests");
        }
        Ok(Self {
            config: Arc::new(config),
        })
    }
}

impl TransportFactory for UreqTransportFactory {
    fn create(&self) -> Result<Box<dyn Transport>, ConfigError> {
        Ok(Box::new(UreqTransport::new(Arc::clone(&self.config))))
    }
}

/// A single-use ureq agent configured from a `TransportConfig`.
pub struct UreqTransport {
    agent: Option<Agent>,
    config: Arc<TransportConfig>,
}

impl UreqTransport {
    pub fn new(config: Arc<TransportConfig>) -> Self {
        let tls = TlsConfig::builder()
            .disable_verification(config.tls == TlsPolicy::TrustAll)
            .build();
        let agent_config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(config.connect_timeout))
            .tls_config(tls)
            .build();
        let connector = DefaultConnector::new().chain(IdleTimeoutConnector {
            idle: config.read_timeout,
        });
        let agent = Agent::with_parts(agent_config, connector, DefaultResolver::default());
        Self {
            agent: Some(agent),
            config,
        }
    }
}

/// Wraps every connection so no single wait for input exceeds `idle`.
#[derive(Debug)]
struct IdleTimeoutConnector {
    idle: Duration,
}

impl Connector<Box<dyn Wire>> for IdleTimeoutConnector {
    type Out = IdleTimeoutTransport;

    fn connect(
        &self,
        _details: &ConnectionDetails,
        chained: Option<Box<dyn Wire>>,
    ) -> Result<Option<Self::Out>, ureq::Error> {
        Ok(chained.map(|inner| IdleTimeoutTransport {
            inner,
            idle: self.idle,
        }))
    }
}

#[derive(Debug)]
struct IdleTimeoutTransport {
    inner: Box<dyn Wire>,
    idle: Duration,
}

impl IdleTimeoutTransport {
    fn clamp(&self, timeout: NextTimeout) -> NextTimeout {
        if *timeout.after > self.idle {
            NextTimeout {
                after: WireDuration::Exact(self.idle),
                reason: timeout.reason,
            }
        } else {
            timeout
        }
    }
}

impl Wire for IdleTimeoutTransport {
    fn buffers(&mut self) -> &mut dyn Buffers {
        self.inner.buffers()
    }

    fn transmit_output(&mut self, amount: usize, timeout: NextTimeout) -> Result<(), ureq::Error> {
        self.inner.transmit_output(amount, timeout)
    }

    fn await_input(&mut self, timeout: NextTimeout) -> Result<bool, ureq::Error> {
        let timeout = self.clamp(timeout);
        self.inner.await_input(timeout)
    }

    fn is_open(&mut self) -> bool {
        self.inner.is_open()
    }

    fn is_tls(&self) -> bool {
        self.inner.is_tls()
    }
}

impl Transport for UreqTransport {
    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.as_ref().ok_or(TransportError::Shutdown)?;

        let url = Url::parse(&request.url).map_err(|source| TransportError::InvalidUri {
            uri: request.url.clone(),
            source,
        })?;
        let scheme = Scheme::from_name(url.scheme())
            .ok_or_else(|| TransportError::UnsupportedScheme(url.scheme().to_string()))?;
        trace!(
            method = %request.method,
            host = url.host_str().unwrap_or_default(),
            port = url.port().unwrap_or(scheme.default_port()),
            "opening connection"
        );

        let mut headers: Vec<(&str, &str)> = vec![(USER_AGENT, self.config.user_agent.as_str())];
        headers.extend(request.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let response = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => {
                let mut builder = agent.get(&request.url);
                for (k, v) in headers {
                    builder = builder.header(k, v);
                }
                builder.call()
            }
            (HttpMethod::Post, Some(body)) => {
                let mut builder = agent.post(&request.url);
                for (k, v) in headers {
                    builder = builder.header(k, v);
                }
                if self.config.expect_continue && !body.is_empty() {
                    builder = builder.header(EXPECT, "100-continue");
                }
                builder.send(body)
            }
            (HttpMethod::Post, None) => {
                let mut builder = agent.post(&request.url);
                for (k, v) in headers {
                    builder = builder.header(k, v);
                }
                builder.send_empty()
            }
        }?;

        let (parts, body) = response.into_parts();
        let headers = parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        Ok(HttpResponse {
            status: parts.status.as_u16(),
            headers,
            body: Box::new(body.into_reader()),
        })
    }

    fn shutdown(&mut self) {
        if self.agent.take().is_some() {
            trace!("transport shut down");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_registry_ports() {
        assert_eq!(Scheme::from_name("http"), Some(Scheme::Http));
        assert_eq!(Scheme::from_name("https"), Some(Scheme::Https));
        assert_eq!(Scheme::from_name("ftp"), None);
        assert_eq!(Scheme::Http.default_port(), 80);
        assert_eq!(Scheme::Https.default_port(), 443);
    }

    #[test]
    fn factory_rejects_invalid_config() {
        let config = TransportConfig {
            connect_timeout: Duration::ZERO,
            ..TransportConfig::default()
        };
        assert!(matches!(
            UreqTransportFactory::new(config),
            Err(ConfigError::ZeroTimeout { name: "connect" })
        ));
    }

    #[test]
    fn unsupported_scheme_is_rejected_before_connecting() {
        let factory = UreqTransportFactory::new(TransportConfig::default()).unwrap();
        let mut transport = factory.create().unwrap();
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: "ftp://example.com/file".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let err = transport.execute(&request).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedScheme(ref s) if s == "ftp"));
    }

    #[test]
    fn trust_all_disables_certificate_verification() {
        let transport = UreqTransport::new(Arc::new(TransportConfig::default()));
        let agent = transport.agent.as_ref().unwrap();
        assert!(agent.config().tls_config().disable_verification());
    }

    #[test]
    fn verified_policy_keeps_certificate_verification() {
        let config = TransportConfig {
            tls: TlsPolicy::Verified,
            ..TransportConfig::default()
        };
        let transport = UreqTransport::new(Arc::new(config));
        let agent = transport.agent.as_ref().unwrap();
        assert!(!agent.config().tls_config().disable_verification());
    }

    #[test]
    fn read_timeout_is_not_a_whole_body_deadline() {
        let config = TransportConfig {
            connect_timeout: Duration::from_secs(5),
            ..TransportConfig::default()
        };
        let transport = UreqTransport::new(Arc::new(config));
        let timeouts = transport.agent.as_ref().unwrap().config().timeouts();
        assert_eq!(timeouts.connect, Some(Duration::from_secs(5)));
        assert_eq!(timeouts.recv_response, None);
        assert_eq!(timeouts.recv_body, None);
    }

    #[test]
    fn idle_limit_caps_longer_waits_only() {
        #[derive(Debug)]
        struct Closed;

        impl Wire for Closed {
            fn buffers(&mut self) -> &mut dyn Buffers {
                unreachable!()
            }
            fn transmit_output(&mut self, _: usize, _: NextTimeout) -> Result<(), ureq::Error> {
                Ok(())
            }
            fn await_input(&mut self, _: NextTimeout) -> Result<bool, ureq::Error> {
                Ok(false)
            }
            fn is_open(&mut self) -> bool {
                false
            }
        }

        let transport = IdleTimeoutTransport {
            inner: Box::new(Closed),
            idle: Duration::from_millis(200),
        };
        let long = NextTimeout {
            after: WireDuration::NotHappening,
            reason: ureq::Timeout::RecvBody,
        };
        assert_eq!(*transport.clamp(long).after, Duration::from_millis(200));
        assert_eq!(transport.clamp(long).reason, ureq::Timeout::RecvBody);

        let short = NextTimeout {
            after: WireDuration::Exact(Duration::from_millis(50)),
            reason: ureq::Timeout::Global,
        };
        assert_eq!(transport.clamp(short), short);
    }

    #[test]
    fn execute_after_shutdown_fails() {
        let factory = UreqTransportFactory::new(TransportConfig::default()).unwrap();
        let mut transport = factory.create().unwrap();
        transport.shutdown();
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: "http://127.0.0.1:1/".to_string(),
            headers: Vec::new(),
            body: None,
        };
        assert!(matches!(transport.execute(&request), Err(TransportError::Shutdown)));
    }
}
