//! Sentinel-based master discovery.
//!
//! Before connecting, a sentinel-configured client asks the sentinels where
//! the monitored master currently lives (`SENTINEL GET-MASTER-ADDR-BY-NAME`)
//! and then proceeds exactly like a standalone client pointed at that
//! address. Sentinels are tried in order; the first usable answer wins.

use crate::commands::Command;
use crate::connection::Connection;
use redwire_core::{
    ConnectionConfig, Error, NodeAddr, ProtocolVersion, Result, SentinelConfig, Value,
};
use tracing::{debug, warn};

/// Ask the configured sentinels for the master's current address.
///
/// # Errors
///
/// Fails when no sentinel is reachable or none knows the master.
pub async fn resolve_master(
    sentinel: &SentinelConfig,
    config: &ConnectionConfig,
) -> Result<NodeAddr> {
    if sentinel.sentinels.is_empty() {
        return Err(Error::Config("no sentinel endpoints configured".to_string()));
    }

    // Sentinels speak plain RESP2 and have their own auth; never forward the
    // data-node password or database selection to them.
    let sentinel_config = ConnectionConfig {
        password: sentinel.password.clone(),
        database: 0,
        protocol: ProtocolVersion::Resp2,
        sentinel: None,
        ..config.clone()
    };

    let mut last_error = None;
    for endpoint in &sentinel.sentinels {
        let addr = endpoint.addr();
        match ask_one(&addr, &sentinel_config, &sentinel.master_name).await {
            Ok(Some(master)) => {
                debug!(sentinel = %addr, master = %master, "sentinel resolved master");
                return Ok(master);
            }
            Ok(None) => {
                warn!(sentinel = %addr, master = %sentinel.master_name, "sentinel does not know the master");
                last_error = Some(Error::Sentinel(format!(
                    "sentinel {addr} does not monitor '{}'",
                    sentinel.master_name
                )));
            }
            Err(e) => {
                warn!(sentinel = %addr, error = %e, "sentinel unreachable");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Sentinel("master discovery failed".to_string())))
}

async fn ask_one(
    addr: &NodeAddr,
    config: &ConnectionConfig,
    master_name: &str,
) -> Result<Option<NodeAddr>> {
    let mut conn = Connection::connect(addr, config).await?;
    let reply = conn
        .call(
            &Command::new("SENTINEL")
                .arg("GET-MASTER-ADDR-BY-NAME")
                .arg(master_name),
        )
        .await?;

    match reply {
        Value::Nil => Ok(None),
        other => {
            let mut items = other.into_items()?.into_iter();
            let (Some(host), Some(port)) = (items.next(), items.next()) else {
                return Err(Error::Sentinel(
                    "malformed GET-MASTER-ADDR-BY-NAME reply".to_string(),
                ));
            };
            let host = host.into_string()?;
            let port = u16::try_from(port.as_int()?)
                .map_err(|_| Error::Sentinel("master port out of range".to_string()))?;
            Ok(Some(NodeAddr::new(host, port)))
        }
    }
}
