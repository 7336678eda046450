//! Voung lock server entry point.
//!
//! # Usage
//!
//! ```text
//! voung-server [OPTIONS]
//!
//! Options:
//!   --host <HOST>          Address to listen on [default: 0.0.0.0]
//!   --port <PORT>          TCP port for board connections [default: 8585]
//!   --database <PATH>      SQLite database file [default: voung.db]
//! ```
//!
//! | Variable         | Default    |
//! |------------------|------------|
//! | `VOUNG_HOST`     | `0.0.0.0`  |
//! | `VOUNG_PORT`     | `8585`     |
//! | `VOUNG_DATABASE` | `voung.db` |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::Context;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use voung_core::constants::DEFAULT_PORT;
use voung_network::{LockServer, ServerConfig};
use voung_storage::{Database, DatabaseConfig, SqliteBoardStore};

/// TCP server for Voung lock controller boards.
#[derive(Debug, Parser)]
#[command(name = "voung-server", version, about)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0", env = "VOUNG_HOST")]
    host: IpAddr,

    /// TCP port boards connect to
    #[arg(long, default_value_t = DEFAULT_PORT, env = "VOUNG_PORT")]
    port: u16,

    /// SQLite database file, created if missing
    #[arg(long, default_value = "voung.db", env = "VOUNG_DATABASE")]
    database: String,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: SocketAddr::new(self.host, self.port),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!(version = voung_core::VERSION, database = %cli.database, "Starting voung-server");

    let db = Database::new(DatabaseConfig::new(&cli.database))
        .await
        .with_context(|| format!("failed to open database '{}'", cli.database))?;
    let store = Arc::new(SqliteBoardStore::new(db.pool().clone()));

    let config = cli.server_config();
    let server = LockServer::bind(config.clone(), store)
        .await
        .with_context(|| format!("failed to listen on {}", config.bind_addr))?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("server loop failed")?;

    db.close().await;
    info!("voung-server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["voung-server"]);
        assert_eq!(cli.port, 8585);
        assert_eq!(cli.database, "voung.db");
        assert_eq!(cli.server_config().bind_addr.to_string(), "0.0.0.0:8585");
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "voung-server",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--database",
            "/tmp/locks.db",
        ]);
        assert_eq!(cli.server_config().bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(cli.database, "/tmp/locks.db");
    }

    #[test]
    fn test_rejects_bad_host() {
        assert!(Cli::try_parse_from(["voung-server", "--host", "not-an-ip"]).is_err());
    }
}
