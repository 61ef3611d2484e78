//! Builder for [`SocketAppender`].
//!
//! Exposes endpoint selection, TLS configuration, queue capacity, timeout
//! tuning, and backoff parameters. Token *validity* is not a build error:
//! a rejected token produces a degraded no-op appender, because a logging
//! component must never take its host application down.

use std::time::Duration;

use thiserror::Error;

use crate::formatter::{Formatter, TextFormatter};

use super::{
    config::AppenderConfig,
    handler::SocketAppender,
    transport::{SocketTransport, TcpTransport, TlsOptions},
};

/// Errors that may occur while building an appender.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid user supplied configuration.
    #[error("invalid appender configuration: {0}")]
    InvalidConfig(String),
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(BuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

#[derive(Clone, Debug, Default)]
struct TlsConfig {
    domain: Option<String>,
    insecure: bool,
}

/// Predicate deciding whether an access token is usable.
pub type TokenValidator = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Builder for constructing [`SocketAppender`] instances.
pub struct SocketAppenderBuilder {
    token: String,
    host: Option<String>,
    port: Option<u16>,
    tls: Option<TlsConfig>,
    capacity: Option<usize>,
    connect_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    min_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    formatter: Option<Box<dyn Formatter>>,
    validator: Option<TokenValidator>,
    #[cfg(any(test, feature = "test-util"))]
    mock_transport: Option<super::transport::mock::MockTransport>,
}

impl SocketAppenderBuilder {
    /// Create a builder for an appender authenticating with `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            host: None,
            port: None,
            tls: None,
            capacity: None,
            connect_timeout_ms: None,
            write_timeout_ms: None,
            min_delay_ms: None,
            max_delay_ms: None,
            formatter: None,
            validator: None,
            #[cfg(any(test, feature = "test-util"))]
            mock_transport: None,
        }
    }

    /// Point the appender at a collector endpoint.
    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = Some(host.into());
        self.port = Some(port);
        self
    }

    /// Enable TLS, using `domain` for the handshake (defaults to the host).
    pub fn with_tls(mut self, domain: Option<String>, insecure: bool) -> Self {
        self.tls = Some(TlsConfig { domain, insecure });
        self
    }

    option_setter!(
        #[doc = "Set the bounded queue capacity."]
        with_capacity,
        capacity,
        usize
    );
    option_setter!(with_connect_timeout_ms, connect_timeout_ms, u64);
    option_setter!(with_write_timeout_ms, write_timeout_ms, u64);
    option_setter!(
        #[doc = "Override the minimum reconnect delay."]
        with_min_delay_ms,
        min_delay_ms,
        u64
    );
    option_setter!(
        #[doc = "Override the maximum reconnect delay."]
        with_max_delay_ms,
        max_delay_ms,
        u64
    );

    /// Replace the default [`TextFormatter`].
    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    /// Replace the default token shape check.
    pub fn with_token_validator(
        mut self,
        validator: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Route the dispatcher through a scripted in-memory transport.
    #[cfg(any(test, feature = "test-util"))]
    pub fn with_mock_transport(
        mut self,
        transport: super::transport::mock::MockTransport,
    ) -> Self {
        self.mock_transport = Some(transport);
        self
    }

    fn validate(&self) -> Result<(), BuildError> {
        if let Some(host) = &self.host
            && host.trim().is_empty()
        {
            return Err(BuildError::InvalidConfig(
                "endpoint host must not be empty".into(),
            ));
        }
        if let Some(capacity) = self.capacity {
            ensure_positive!(capacity, "capacity")?;
        }
        if let Some(timeout) = self.connect_timeout_ms {
            ensure_positive!(timeout, "connect_timeout_ms")?;
        }
        if let Some(timeout) = self.write_timeout_ms {
            ensure_positive!(timeout, "write_timeout_ms")?;
        }
        if let Some(delay) = self.min_delay_ms {
            ensure_positive!(delay, "min_delay_ms")?;
        }
        if let Some(delay) = self.max_delay_ms {
            ensure_positive!(delay, "max_delay_ms")?;
        }
        Ok(())
    }

    fn build_config(&self) -> Result<AppenderConfig, BuildError> {
        self.validate()?;
        let mut config = AppenderConfig::default();
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(timeout) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(timeout);
        }
        if let Some(timeout) = self.write_timeout_ms {
            config.write_timeout = Duration::from_millis(timeout);
        }
        if let Some(delay) = self.min_delay_ms {
            config.backoff.min = Duration::from_millis(delay);
        }
        if let Some(delay) = self.max_delay_ms {
            config.backoff.max = Duration::from_millis(delay);
        }
        if config.backoff.min > config.backoff.max {
            return Err(BuildError::InvalidConfig(
                "minimum reconnect delay must not exceed the maximum".into(),
            ));
        }
        config.transport = self.build_transport()?;
        Ok(config)
    }

    fn build_transport(&self) -> Result<SocketTransport, BuildError> {
        #[cfg(any(test, feature = "test-util"))]
        if let Some(mock) = &self.mock_transport {
            return Ok(SocketTransport::Mock(mock.clone()));
        }
        let host = self
            .host
            .clone()
            .unwrap_or_else(|| super::config::DEFAULT_HOST.into());
        let port = self.port.unwrap_or(super::config::DEFAULT_PORT);
        let tls = self.tls.as_ref().map(|tls_cfg| {
            let domain = tls_cfg
                .domain
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| host.clone());
            TlsOptions {
                domain,
                insecure_skip_verify: tls_cfg.insecure,
            }
        });
        Ok(SocketTransport::Tcp(TcpTransport { host, port, tls }))
    }

    /// Build the appender.
    ///
    /// Fails only on invalid configuration; an unusable token instead yields
    /// a degraded no-op appender (see [`SocketAppender`]).
    pub fn build(self) -> Result<SocketAppender, BuildError> {
        let config = self.build_config()?;
        let token_valid = match &self.validator {
            Some(validator) => validator(&self.token),
            None => token_looks_valid(&self.token),
        };
        let formatter = self
            .formatter
            .unwrap_or_else(|| Box::new(TextFormatter));
        Ok(SocketAppender::from_parts(
            self.token,
            config,
            formatter,
            token_valid,
        ))
    }
}

/// Default shape check for access tokens: canonical 8-4-4-4-12 hex groups.
pub(crate) fn token_looks_valid(token: &str) -> bool {
    const GROUP_LENGTHS: [usize; 5] = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = token.split('-').collect();
    parts.len() == GROUP_LENGTHS.len()
        && parts
            .iter()
            .zip(GROUP_LENGTHS)
            .all(|(part, len)| part.len() == len && part.bytes().all(|b| b.is_ascii_hexdigit()))
}
