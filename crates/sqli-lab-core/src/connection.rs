// SPDX-License-Identifier: Apache-2.0

//! Connection acquisition with bounded retry.
//!
//! There is no pooling. Every logical operation acquires its own connection
//! through [`ConnectionManager::acquire`] and hands it back through
//! [`ConnectionManager::release`] on every exit path.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backon::Retryable;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::{debug, error, info, warn};

use crate::config::DatabaseConfig;
use crate::error::LabError;
use crate::retry::{DEFAULT_ATTEMPTS, DEFAULT_DELAY, connect_backoff};

/// Opens and closes connections to a storage backend.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connection handle produced by this backend.
    type Connection: Send;

    /// Open one connection. A failure is retried by the caller.
    async fn connect(&self) -> anyhow::Result<Self::Connection>;

    /// Close a connection previously returned by [`Connector::connect`].
    async fn close(&self, conn: Self::Connection) -> anyhow::Result<()>;
}

/// Connector for the lab's SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    options: SqliteConnectOptions,
}

impl SqliteConnector {
    /// Connector for the database at `path`, created on first connect.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .disable_statement_logging();

        Self { options }
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    type Connection = SqliteConnection;

    async fn connect(&self) -> anyhow::Result<SqliteConnection> {
        Ok(self.options.connect().await?)
    }

    async fn close(&self, conn: SqliteConnection) -> anyhow::Result<()> {
        conn.close().await?;
        Ok(())
    }
}

/// Hands out one connection per logical operation.
#[derive(Debug)]
pub struct ConnectionManager<C> {
    connector: C,
    attempts: usize,
    delay: Duration,
}

impl<C: Connector> ConnectionManager<C> {
    /// Manager with the default policy: 10 attempts, 1.5 s apart.
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self::with_policy(connector, DEFAULT_ATTEMPTS, DEFAULT_DELAY)
    }

    /// Manager with an explicit attempt count and delay.
    #[must_use]
    pub fn with_policy(connector: C, attempts: usize, delay: Duration) -> Self {
        Self {
            connector,
            attempts: attempts.max(1),
            delay,
        }
    }

    /// Manager using the attempt count and delay from configuration.
    #[must_use]
    pub fn from_config(connector: C, config: &DatabaseConfig) -> Self {
        Self::with_policy(connector, config.connect_attempts, config.retry_delay())
    }

    /// The underlying connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Acquire a connection, retrying on failure.
    ///
    /// Blocks for at most `(attempts - 1) * delay` plus the time spent in the
    /// attempts themselves.
    ///
    /// # Errors
    ///
    /// Returns `LabError::ConnectionExhausted` once every attempt has failed.
    pub async fn acquire(&self) -> Result<C::Connection, LabError> {
        let counter = AtomicUsize::new(0);
        let max_attempts = self.attempts;

        let result = (|| async {
            let attempt = counter.fetch_add(1, Ordering::Relaxed) + 1;
            self.connector.connect().await.inspect_err(|err| {
                warn!(
                    attempt,
                    max_attempts,
                    error = %err,
                    "Database connection attempt failed"
                );
            })
        })
        .retry(connect_backoff(self.attempts, self.delay))
        .notify(|_, dur| debug!(delay = ?dur, "Retrying database connection"))
        .await;

        let attempts = counter.load(Ordering::Relaxed);
        match result {
            Ok(conn) => {
                info!(attempts, "Database connection established");
                Ok(conn)
            }
            Err(err) => {
                error!(attempts, error = %err, "Failed to connect to the database");
                Err(LabError::ConnectionExhausted {
                    attempts,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Close a connection. Failures are logged, never propagated.
    pub async fn release(&self, conn: C::Connection) {
        if let Err(err) = self.connector.close(conn).await {
            warn!(error = %err, "Failed to close database connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Backend that fails until `succeed_on` attempts have been made.
    struct ScriptedConnector {
        succeed_on: Option<usize>,
        calls: AtomicUsize,
        closed: AtomicUsize,
        stamps: Mutex<Vec<Instant>>,
    }

    impl ScriptedConnector {
        fn new(succeed_on: Option<usize>) -> Self {
            Self {
                succeed_on,
                calls: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
                stamps: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        type Connection = usize;

        async fn connect(&self) -> anyhow::Result<usize> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.stamps.lock().unwrap().push(Instant::now());
            match self.succeed_on {
                Some(n) if call >= n => Ok(call),
                _ => anyhow::bail!("connection refused"),
            }
        }

        async fn close(&self, _conn: usize) -> anyhow::Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_ten_spaced_attempts() {
        let manager = ConnectionManager::new(ScriptedConnector::new(None));

        let err = manager.acquire().await.unwrap_err();

        match err {
            LabError::ConnectionExhausted { attempts, reason } => {
                assert_eq!(attempts, 10);
                assert!(reason.contains("connection refused"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(manager.connector().calls.load(Ordering::SeqCst), 10);

        let stamps = manager.connector().stamps.lock().unwrap().clone();
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(1500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_nth_attempt_without_further_retries() {
        let manager = ConnectionManager::new(ScriptedConnector::new(Some(4)));

        let conn = manager.acquire().await.expect("fourth attempt succeeds");

        assert_eq!(conn, 4);
        assert_eq!(manager.connector().calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_last_allowed_attempt() {
        let manager = ConnectionManager::new(ScriptedConnector::new(Some(10)));

        assert_eq!(manager.acquire().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn first_attempt_success_does_not_wait() {
        let manager = ConnectionManager::new(ScriptedConnector::new(Some(1)));
        let start = std::time::Instant::now();

        manager.acquire().await.unwrap();

        assert!(start.elapsed() < DEFAULT_DELAY);
        assert_eq!(manager.connector().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn release_closes_connection() {
        let manager = ConnectionManager::new(ScriptedConnector::new(Some(1)));
        let conn = manager.acquire().await.unwrap();

        manager.release(conn).await;

        assert_eq!(manager.connector().closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_policy_is_honoured() {
        let manager = ConnectionManager::with_policy(
            ScriptedConnector::new(None),
            3,
            Duration::from_millis(10),
        );

        let err = manager.acquire().await.unwrap_err();

        assert!(matches!(err, LabError::ConnectionExhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn sqlite_connector_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.db");
        let manager = ConnectionManager::new(SqliteConnector::new(&path));

        let conn = manager.acquire().await.unwrap();
        manager.release(conn).await;

        assert!(path.exists());
    }
}
