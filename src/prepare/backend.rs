//! Reset backends
//!
//! The production backend shells out to `supervisorctl` and `psql` and
//! speaks the memcached text protocol for the cache flush.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::plan::{Connection, Statement};
use crate::config::{CacheConfig, DatabaseConfig, SupervisorConfig};
use crate::framework::locate_program;

/// Administrative operations the reset needs
#[allow(async_fn_in_trait)]
pub trait ResetBackend {
    /// Whether a service supervisor is running
    async fn supervisor_active(&mut self) -> Result<bool>;

    async fn stop_services(&mut self) -> Result<()>;

    async fn execute(&mut self, connection: &Connection, statement: &Statement) -> Result<()>;

    async fn flush_cache(&mut self) -> Result<()>;
}

/// Backend acting on the local machine
pub struct SystemBackend {
    database: DatabaseConfig,
    cache: CacheConfig,
    supervisor: SupervisorConfig,
}

impl SystemBackend {
    pub fn new(database: DatabaseConfig, cache: CacheConfig, supervisor: SupervisorConfig) -> Self {
        Self {
            database,
            cache,
            supervisor,
        }
    }

    /// psql arguments for one statement
    pub fn psql_args(&self, connection: &Connection, sql: &str) -> Vec<String> {
        let mut args = vec![
            "-X".to_string(),
            "-q".to_string(),
            "-v".to_string(),
            "ON_ERROR_STOP=1".to_string(),
        ];
        if let Some(ref host) = self.database.host {
            args.push("-h".to_string());
            args.push(host.clone());
        }
        if let Some(port) = self.database.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        args.extend([
            "-U".to_string(),
            connection.role.clone(),
            "-d".to_string(),
            connection.database.clone(),
            "-c".to_string(),
            sql.to_string(),
        ]);
        args
    }
}

impl ResetBackend for SystemBackend {
    async fn supervisor_active(&mut self) -> Result<bool> {
        let cwd = std::env::current_dir().context("Cannot determine current directory")?;
        if locate_program(&self.supervisor.program, &cwd).is_none() {
            debug!("{} not installed", self.supervisor.program);
            return Ok(false);
        }

        let output = Command::new(&self.supervisor.program)
            .arg("pid")
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", self.supervisor.program))?;

        let pid = String::from_utf8_lossy(&output.stdout);
        Ok(output.status.success() && pid.trim().parse::<u32>().is_ok())
    }

    async fn stop_services(&mut self) -> Result<()> {
        let status = Command::new(&self.supervisor.program)
            .args(["stop", "all"])
            .status()
            .await
            .with_context(|| format!("Failed to execute {}", self.supervisor.program))?;

        if !status.success() {
            anyhow::bail!("{} stop all exited with {}", self.supervisor.program, status);
        }
        Ok(())
    }

    async fn execute(&mut self, connection: &Connection, statement: &Statement) -> Result<()> {
        let sql = statement.to_sql();
        debug!("[{}@{}] {}", connection.role, connection.database, sql);

        let output = Command::new(&self.database.psql_program)
            .args(self.psql_args(connection, &sql))
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", self.database.psql_program))?;

        if !output.status.success() {
            anyhow::bail!(
                "psql failed as {} on {}: {}",
                connection.role,
                connection.database,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn flush_cache(&mut self) -> Result<()> {
        let limit = Duration::from_secs(self.cache.timeout_secs);
        let address = self.cache.address.as_str();

        let stream = timeout(limit, TcpStream::connect(address))
            .await
            .with_context(|| format!("Timed out connecting to memcached at {address}"))?
            .with_context(|| format!("Failed to connect to memcached at {address}"))?;

        let mut stream = BufReader::new(stream);
        stream
            .get_mut()
            .write_all(b"flush_all\r\n")
            .await
            .context("Failed to send flush_all")?;

        let mut reply = String::new();
        timeout(limit, stream.read_line(&mut reply))
            .await
            .context("Timed out waiting for memcached")?
            .context("Failed to read memcached reply")?;

        if reply.trim_end() != "OK" {
            anyhow::bail!("Unexpected memcached reply: {}", reply.trim_end());
        }
        info!("Flushed memcached at {}", address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn backend(address: String) -> SystemBackend {
        SystemBackend::new(
            DatabaseConfig {
                host: Some("db.internal".to_string()),
                port: Some(5433),
                ..Default::default()
            },
            CacheConfig {
                address,
                timeout_secs: 2,
            },
            SupervisorConfig::default(),
        )
    }

    #[test]
    fn test_psql_args() {
        let backend = backend("127.0.0.1:0".to_string());
        let connection = Connection {
            role: "postgres".to_string(),
            database: "postgres".to_string(),
        };
        let args = backend.psql_args(&connection, "SELECT 1;");
        assert_eq!(
            args,
            vec![
                "-X", "-q", "-v", "ON_ERROR_STOP=1", "-h", "db.internal", "-p", "5433", "-U",
                "postgres", "-d", "postgres", "-c", "SELECT 1;"
            ]
        );
    }

    async fn fake_memcached(reply: &'static [u8]) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut socket = BufReader::new(socket);
            let mut request = String::new();
            socket.read_line(&mut request).await.unwrap();
            socket.get_mut().write_all(reply).await.unwrap();
            request
        });
        (address, server)
    }

    #[tokio::test]
    async fn test_flush_cache_sends_flush_all() {
        let (address, server) = fake_memcached(b"OK\r\n").await;
        backend(address).flush_cache().await.unwrap();
        assert_eq!(server.await.unwrap(), "flush_all\r\n");
    }

    #[tokio::test]
    async fn test_flush_cache_rejects_error_reply() {
        let (address, server) = fake_memcached(b"SERVER_ERROR busy\r\n").await;
        let err = backend(address).flush_cache().await.unwrap_err();
        assert!(err.to_string().contains("SERVER_ERROR busy"));
        server.await.unwrap();
    }
}
