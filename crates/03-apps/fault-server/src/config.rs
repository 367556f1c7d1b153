//! Command-line configuration.

use std::net::SocketAddr;
use std::num::NonZeroUsize;

use anyhow::{Context, Result};
use clap::Parser;

use fault_harness::{HarnessConfig, DEFAULT_HISTORY_CAPACITY};

#[derive(Parser, Debug)]
#[command(author, version, about = "Modbus fault injection and emulation harness")]
pub struct Args {
    /// Address to bind (ip or host)
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Injection records kept before the oldest are evicted
    #[arg(long, default_value_t = NonZeroUsize::new(DEFAULT_HISTORY_CAPACITY).unwrap_or(NonZeroUsize::MIN))]
    pub history_capacity: NonZeroUsize,
}

/// Validated runtime configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub harness: HarnessConfig,
}

impl Args {
    pub fn into_config(self) -> Result<ServerConfig> {
        let Args {
            host,
            port,
            history_capacity,
        } = self;

        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("failed to parse bind address {host}:{port}"))?;

        Ok(ServerConfig {
            addr,
            harness: HarnessConfig { history_capacity },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_localhost() {
        let config = Args::try_parse_from(["fault-server"])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.harness.history_capacity.get(), DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn zero_capacity_is_refused() {
        assert!(Args::try_parse_from(["fault-server", "--history-capacity", "0"]).is_err());
    }

    #[test]
    fn bad_host_is_reported() {
        let args = Args::try_parse_from(["fault-server", "--host", "not an ip"]).unwrap();
        assert!(args.into_config().is_err());
    }
}
