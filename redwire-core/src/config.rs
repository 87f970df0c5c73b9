//! Client configuration.

use crate::types::NodeAddr;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wire protocol preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// RESP2, spoken by every server version. Default.
    #[default]
    Resp2,
    /// RESP3 (Redis 6.0+), negotiated via HELLO with RESP2 fallback.
    Resp3,
}

/// Connection management strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PoolStrategy {
    /// One connection behind an actor task, shared by all callers. Default.
    #[default]
    Multiplexed,
    /// A bounded set of connections checked out per operation.
    Checkout,
}

/// Pooling knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Strategy to use.
    pub strategy: PoolStrategy,
    /// Upper bound on live connections (checkout strategy).
    pub max_size: usize,
    /// Connections opened eagerly (checkout strategy).
    pub min_idle: usize,
    /// How long an operation may wait for a free connection.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            strategy: PoolStrategy::Multiplexed,
            max_size: 10,
            min_idle: 2,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// How topology is determined at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TopologyMode {
    /// Probe the first endpoint with CLUSTER INFO. Default.
    #[default]
    Auto,
    /// Treat the deployment as a standalone server.
    Standalone,
    /// Treat the deployment as a cluster.
    Cluster,
}

/// Reconnect behavior for the multiplexed connection actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Whether the actor reconnects at all.
    pub enabled: bool,
    /// Delay before the first attempt.
    pub initial_delay: Duration,
    /// Ceiling for the backoff.
    pub max_delay: Duration,
    /// Multiplier applied per failed attempt.
    pub backoff_factor: f64,
    /// Attempt bound; `None` keeps trying.
    pub max_attempts: Option<usize>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            max_attempts: None,
        }
    }
}

/// Sentinel endpoint (`host:port`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelEndpoint {
    /// Sentinel host.
    pub host: String,
    /// Sentinel port.
    pub port: u16,
}

impl SentinelEndpoint {
    /// Build from parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The endpoint as a [`NodeAddr`].
    #[must_use]
    pub fn addr(&self) -> NodeAddr {
        NodeAddr::new(self.host.clone(), self.port)
    }
}

/// Sentinel-based master discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Name of the monitored master.
    pub master_name: String,
    /// Sentinel endpoints to query, in order.
    pub sentinels: Vec<SentinelEndpoint>,
    /// Password for the sentinels themselves (not the data nodes).
    pub password: Option<String>,
}

impl SentinelConfig {
    /// Start a sentinel configuration for the given master name.
    pub fn new(master_name: impl Into<String>) -> Self {
        Self {
            master_name: master_name.into(),
            sentinels: Vec::new(),
            password: None,
        }
    }

    /// Add a sentinel endpoint given as `host:port` (port defaults to 26379).
    #[must_use]
    pub fn sentinel(mut self, addr: impl AsRef<str>) -> Self {
        let addr = addr.as_ref();
        if let Some((host, port)) = addr.rsplit_once(':') {
            if let Ok(port) = port.parse::<u16>() {
                self.sentinels.push(SentinelEndpoint::new(host, port));
                return self;
            }
        }
        self.sentinels.push(SentinelEndpoint::new(addr, 26379));
        self
    }

    /// Set the sentinel password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// Everything needed to reach a deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Endpoint list, e.g. `redis://host:6379` or `redis://h1:7000,h2:7001`.
    pub url: String,
    /// Password sent during the handshake.
    pub password: Option<String>,
    /// Database selected after connecting (standalone only).
    pub database: u32,
    /// Deadline for establishing a TCP connection.
    pub connect_timeout: Duration,
    /// Deadline for a single request/response exchange.
    pub operation_timeout: Duration,
    /// TCP keepalive interval, if any.
    pub tcp_keepalive: Option<Duration>,
    /// Topology handling.
    pub topology: TopologyMode,
    /// Pooling knobs.
    pub pool: PoolConfig,
    /// Bound on MOVED/ASK chains per command.
    pub max_redirects: usize,
    /// Preferred wire protocol.
    pub protocol: ProtocolVersion,
    /// Sentinel discovery, when the master address is not known up front.
    pub sentinel: Option<SentinelConfig>,
    /// Reconnect behavior.
    pub reconnect: ReconnectConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            password: None,
            database: 0,
            connect_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(30),
            tcp_keepalive: Some(Duration::from_secs(60)),
            topology: TopologyMode::Auto,
            pool: PoolConfig::default(),
            max_redirects: 3,
            protocol: ProtocolVersion::default(),
            sentinel: None,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ConnectionConfig {
    /// Configuration pointing at the given endpoint list.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Configuration whose master is resolved through sentinels.
    #[must_use]
    pub fn with_sentinel(sentinel: SentinelConfig) -> Self {
        Self {
            sentinel: Some(sentinel),
            ..Default::default()
        }
    }

    /// Set the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Select a database after connecting.
    #[must_use]
    pub const fn database(mut self, database: u32) -> Self {
        self.database = database;
        self
    }

    /// Set the connect deadline.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-operation deadline.
    #[must_use]
    pub const fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Force a topology mode instead of probing.
    #[must_use]
    pub const fn topology(mut self, mode: TopologyMode) -> Self {
        self.topology = mode;
        self
    }

    /// Replace the pool configuration.
    #[must_use]
    pub const fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Bound redirect chains.
    #[must_use]
    pub const fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Prefer a wire protocol.
    #[must_use]
    pub const fn protocol(mut self, version: ProtocolVersion) -> Self {
        self.protocol = version;
        self
    }

    /// Endpoints parsed from [`ConnectionConfig::url`].
    ///
    /// Accepts an optional `redis://` or `rediss://` scheme and a
    /// comma-separated host list; a missing port defaults to 6379.
    #[must_use]
    pub fn endpoints(&self) -> Vec<NodeAddr> {
        let trimmed = self.url.trim();
        let hosts = trimmed
            .strip_prefix("redis://")
            .or_else(|| trimmed.strip_prefix("rediss://"))
            .unwrap_or(trimmed);

        hosts
            .split(',')
            .filter_map(|endpoint| {
                let endpoint = endpoint.trim();
                if endpoint.is_empty() {
                    return None;
                }
                if let Some((host, port)) = endpoint.rsplit_once(':') {
                    if let Ok(port) = port.parse::<u16>() {
                        return Some(NodeAddr::new(host, port));
                    }
                }
                Some(NodeAddr::new(endpoint, 6379))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_endpoint() {
        let config = ConnectionConfig::new("redis://example.com:7000");
        assert_eq!(config.endpoints(), vec![NodeAddr::new("example.com", 7000)]);
    }

    #[test]
    fn parses_multiple_endpoints_and_defaults_port() {
        let config = ConnectionConfig::new("redis://a:7000, b ,c:7002");
        let endpoints = config.endpoints();
        assert_eq!(endpoints.len(), 3);
        assert_eq!(endpoints[1], NodeAddr::new("b", 6379));
        assert_eq!(endpoints[2], NodeAddr::new("c", 7002));
    }

    #[test]
    fn scheme_is_optional() {
        let config = ConnectionConfig::new("localhost:6380");
        assert_eq!(config.endpoints(), vec![NodeAddr::new("localhost", 6380)]);
    }

    #[test]
    fn builder_chain() {
        let config = ConnectionConfig::new("redis://localhost:6379")
            .database(3)
            .max_redirects(5)
            .protocol(ProtocolVersion::Resp3)
            .topology(TopologyMode::Standalone);
        assert_eq!(config.database, 3);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.protocol, ProtocolVersion::Resp3);
        assert_eq!(config.topology, TopologyMode::Standalone);
    }

    #[test]
    fn sentinel_builder_parses_addresses() {
        let sentinel = SentinelConfig::new("mymaster")
            .sentinel("10.0.0.1:26379")
            .sentinel("10.0.0.2");
        assert_eq!(sentinel.sentinels.len(), 2);
        assert_eq!(sentinel.sentinels[1].port, 26379);
    }
}
