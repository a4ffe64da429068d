// SPDX-License-Identifier: Apache-2.0

//! Lab operations, one per injection surface.
//!
//! Each operation builds its query from the endpoint's [`QueryPolicy`],
//! acquires a fresh connection, executes the text as-is, releases the
//! connection, and renders failures through the endpoint's
//! [`DisclosurePolicy`]. Only `ConnectionExhausted` escapes as an error.
//!
//! [`QueryPolicy`]: crate::query::QueryPolicy

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sqlx::Executor;
use sqlx::sqlite::SqliteRow;
use tracing::{error, info, instrument};

use crate::config::LabConfig;
use crate::connection::{ConnectionManager, SqliteConnector};
use crate::disclosure::{Disclosed, DisclosurePolicy, Failure};
use crate::error::LabError;
use crate::models::{BlogRow, UserRow};
use crate::query::Endpoint;
use crate::secrets::LabSecrets;
use crate::seed::{self, SeedSummary, StorageDiagnostics};
use crate::session::{Session, SessionAuthority};

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Username or password missing; nothing was queried.
    NoInput,
    /// The query returned rows; the first one was bound.
    Authenticated(Session),
    /// The query returned no rows.
    InvalidCredentials,
    /// The query failed.
    Failed(Disclosed),
}

/// Result of a blog search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Empty search; nothing was queried.
    NoInput,
    /// Rows returned by the query, in result order.
    Results(Vec<BlogRow>),
    /// The query failed.
    Failed(Disclosed),
}

/// Result of an existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistenceOutcome {
    /// Empty search; nothing was queried.
    NoInput,
    /// The oracle bit. Failures read as not found.
    Checked {
        /// Whether any row came back.
        found: bool,
        /// Wall time of query execution alone.
        elapsed: Duration,
    },
}

impl ExistenceOutcome {
    /// Whether the check came back positive.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, ExistenceOutcome::Checked { found: true, .. })
    }
}

/// One executed query, already back from the connection.
struct Execution {
    rows: Result<Vec<SqliteRow>, LabError>,
    elapsed: Duration,
}

/// The lab's injectable operations over one database.
#[derive(Debug)]
pub struct Lab {
    manager: ConnectionManager<SqliteConnector>,
    sessions: SessionAuthority,
    escalation_disclosure: DisclosurePolicy,
}

impl Lab {
    /// Lab over an existing manager and session authority.
    #[must_use]
    pub fn new(
        manager: ConnectionManager<SqliteConnector>,
        sessions: SessionAuthority,
        escalation_disclosure: DisclosurePolicy,
    ) -> Self {
        Self {
            manager,
            sessions,
            escalation_disclosure,
        }
    }

    /// Lab wired from configuration and start-up secrets.
    #[must_use]
    pub fn from_config(config: &LabConfig, secrets: &LabSecrets) -> Self {
        let connector = SqliteConnector::new(&config.database.path);
        let manager = ConnectionManager::from_config(connector, &config.database);
        let sessions = SessionAuthority::new(
            secrets,
            Duration::from_secs(config.session.ttl_seconds),
        );
        Self::new(manager, sessions, config.escalation.disclosure)
    }

    /// Session authority used by the login operation.
    #[must_use]
    pub fn sessions(&self) -> &SessionAuthority {
        &self.sessions
    }

    /// Disclosure policy in force for `endpoint`.
    #[must_use]
    pub fn disclosure(&self, endpoint: Endpoint) -> DisclosurePolicy {
        match endpoint {
            Endpoint::EscalationSearch => self.escalation_disclosure,
            other => other.default_disclosure(),
        }
    }

    /// Recreate schema and sample data.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be acquired or seeding fails.
    pub async fn seed(&self, secrets: &LabSecrets) -> crate::Result<SeedSummary> {
        let mut conn = self.manager.acquire().await?;
        let result = seed::ensure_schema(&mut conn, secrets).await;
        self.manager.release(conn).await;
        result
    }

    /// Storage engine facts for the start-up log.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be acquired or the probe fails.
    pub async fn diagnostics(&self) -> crate::Result<StorageDiagnostics> {
        let mut conn = self.manager.acquire().await?;
        let result = seed::diagnostics(&mut conn).await;
        self.manager.release(conn).await;
        result
    }

    /// Authentication surface: both fields spliced, first row wins.
    ///
    /// # Errors
    ///
    /// Returns `LabError::ConnectionExhausted` if no connection is available.
    #[instrument(skip(self, password, now))]
    pub async fn login(
        &self,
        username: Option<&str>,
        password: Option<&str>,
        now: DateTime<Utc>,
    ) -> crate::Result<LoginOutcome> {
        let (Some(username), Some(password)) = (non_empty(username), non_empty(password)) else {
            return Ok(LoginOutcome::NoInput);
        };
        info!(username, "Login attempt");

        let endpoint = Endpoint::Authentication;
        let execution = self.execute(endpoint, &[username, password]).await?;

        let first = execution.rows.and_then(|rows| {
            rows.first()
                .map(UserRow::from_row)
                .transpose()
                .map_err(LabError::from)
        });

        let outcome = match first {
            Ok(Some(row)) => {
                info!(username = %row.username, role = ?row.role, "Query result");
                LoginOutcome::Authenticated(self.sessions.bind(&row, now))
            }
            Ok(None) => {
                info!("Query result: no rows");
                LoginOutcome::InvalidCredentials
            }
            Err(err) => LoginOutcome::Failed(self.render(endpoint, &err)),
        };
        Ok(outcome)
    }

    /// Union search surface: generic failures.
    ///
    /// # Errors
    ///
    /// Returns `LabError::ConnectionExhausted` if no connection is available.
    pub async fn union_search(&self, term: Option<&str>) -> crate::Result<SearchOutcome> {
        self.search(Endpoint::UnionSearch, term).await
    }

    /// Error-based search surface: driver text on failure.
    ///
    /// # Errors
    ///
    /// Returns `LabError::ConnectionExhausted` if no connection is available.
    pub async fn error_search(&self, term: Option<&str>) -> crate::Result<SearchOutcome> {
        self.search(Endpoint::ErrorSearch, term).await
    }

    /// Escalation search surface: the pivot toward the execution sink.
    ///
    /// # Errors
    ///
    /// Returns `LabError::ConnectionExhausted` if no connection is available.
    pub async fn escalation_search(&self, term: Option<&str>) -> crate::Result<SearchOutcome> {
        self.search(Endpoint::EscalationSearch, term).await
    }

    /// Boolean surface: found or not found, nothing else.
    ///
    /// # Errors
    ///
    /// Returns `LabError::ConnectionExhausted` if no connection is available.
    pub async fn boolean_exists(&self, term: Option<&str>) -> crate::Result<ExistenceOutcome> {
        self.exists(Endpoint::BooleanExistence, term).await
    }

    /// Timing surface: same bit as the boolean surface, plus execution time.
    ///
    /// # Errors
    ///
    /// Returns `LabError::ConnectionExhausted` if no connection is available.
    pub async fn timed_exists(&self, term: Option<&str>) -> crate::Result<ExistenceOutcome> {
        self.exists(Endpoint::TimingExistence, term).await
    }

    #[instrument(skip(self, endpoint), fields(%endpoint))]
    async fn search(&self, endpoint: Endpoint, term: Option<&str>) -> crate::Result<SearchOutcome> {
        let Some(term) = non_empty(term) else {
            return Ok(SearchOutcome::NoInput);
        };
        info!(term, "Search request");

        let execution = self.execute(endpoint, &[term]).await?;
        let blogs = execution.rows.and_then(|rows| {
            rows.iter()
                .map(BlogRow::from_row)
                .collect::<Result<Vec<_>, _>>()
                .map_err(LabError::from)
        });

        let outcome = match blogs {
            Ok(blogs) => {
                info!(count = blogs.len(), "Query returned results");
                SearchOutcome::Results(blogs)
            }
            Err(err) => SearchOutcome::Failed(self.render(endpoint, &err)),
        };
        Ok(outcome)
    }

    #[instrument(skip(self, endpoint), fields(%endpoint))]
    async fn exists(&self, endpoint: Endpoint, term: Option<&str>) -> crate::Result<ExistenceOutcome> {
        let Some(term) = non_empty(term) else {
            return Ok(ExistenceOutcome::NoInput);
        };
        info!(term, "Existence request");

        let policy = endpoint.policy();
        let execution = self.execute(endpoint, &[term]).await?;

        let found = match execution.rows {
            Ok(rows) => policy.success().is_met(rows.len()),
            Err(err) => {
                // Silent policy: the failure reads as an empty result.
                self.render(endpoint, &err);
                false
            }
        };

        if policy.success().is_timed() {
            info!(elapsed = ?execution.elapsed, "Query execution time");
        }
        info!(found, "Existence result");

        Ok(ExistenceOutcome::Checked {
            found,
            elapsed: execution.elapsed,
        })
    }

    /// Splice, acquire, execute, release.
    ///
    /// The clock wraps execution only, never acquisition.
    async fn execute(&self, endpoint: Endpoint, inputs: &[&str]) -> crate::Result<Execution> {
        let query = endpoint.policy().build(inputs);

        let mut conn = self.manager.acquire().await?;
        info!(%query, "Executing query");

        let started = Instant::now();
        let rows = Executor::fetch_all(&mut conn, sqlx::raw_sql(&query))
            .await
            .map_err(LabError::from);
        let elapsed = started.elapsed();

        self.manager.release(conn).await;

        Ok(Execution { rows, elapsed })
    }

    fn render(&self, endpoint: Endpoint, err: &LabError) -> Disclosed {
        error!(%endpoint, error = %err, "Query failed");
        let failure =
            Failure::from_error(err).unwrap_or_else(|| Failure::Unexpected(err.to_string()));
        self.disclosure(endpoint).disclose(&failure)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::session::DEFAULT_TTL;

    fn lab_at(path: &std::path::Path, escalation: DisclosurePolicy) -> Lab {
        let secrets =
            LabSecrets::from_parts("FLAG{a}".to_string(), "FLAG{b}".to_string(), b"k".to_vec());
        let manager = ConnectionManager::from_config(
            SqliteConnector::new(path),
            &DatabaseConfig {
                connect_attempts: 1,
                retry_delay_ms: 1,
                ..DatabaseConfig::default()
            },
        );
        Lab::new(
            manager,
            SessionAuthority::new(&secrets, DEFAULT_TTL),
            escalation,
        )
    }

    #[test]
    fn test_escalation_disclosure_is_configurable() {
        let lab = lab_at(std::path::Path::new("unused.db"), DisclosurePolicy::Generic);

        assert_eq!(
            lab.disclosure(Endpoint::EscalationSearch),
            DisclosurePolicy::Generic
        );
        assert_eq!(
            lab.disclosure(Endpoint::ErrorSearch),
            DisclosurePolicy::Verbose
        );
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_operation_futures_are_send() {
        let lab = lab_at(std::path::Path::new("unused.db"), DisclosurePolicy::Verbose);

        assert_send(&lab.login(Some("a"), Some("b"), Utc::now()));
        assert_send(&lab.union_search(Some("a")));
        assert_send(&lab.error_search(Some("a")));
        assert_send(&lab.escalation_search(Some("a")));
        assert_send(&lab.boolean_exists(Some("a")));
        assert_send(&lab.timed_exists(Some("a")));
    }

    #[tokio::test]
    async fn test_empty_input_does_not_connect() {
        // A directory that does not exist: any connection attempt would fail.
        let lab = lab_at(
            std::path::Path::new("/nonexistent-dir/lab.db"),
            DisclosurePolicy::Verbose,
        );

        assert_eq!(
            lab.login(Some(""), Some("x"), Utc::now()).await.unwrap(),
            LoginOutcome::NoInput
        );
        assert_eq!(
            lab.login(Some("x"), None, Utc::now()).await.unwrap(),
            LoginOutcome::NoInput
        );
        assert_eq!(
            lab.union_search(Some("")).await.unwrap(),
            SearchOutcome::NoInput
        );
        assert_eq!(lab.error_search(None).await.unwrap(), SearchOutcome::NoInput);
        assert_eq!(
            lab.boolean_exists(None).await.unwrap(),
            ExistenceOutcome::NoInput
        );
        assert_eq!(
            lab.timed_exists(Some("")).await.unwrap(),
            ExistenceOutcome::NoInput
        );
    }

    #[tokio::test]
    async fn test_exhaustion_propagates() {
        let lab = lab_at(
            std::path::Path::new("/nonexistent-dir/lab.db"),
            DisclosurePolicy::Verbose,
        );

        let err = lab.union_search(Some("Docker")).await.unwrap_err();

        assert!(matches!(err, LabError::ConnectionExhausted { attempts: 1, .. }));
    }
}
