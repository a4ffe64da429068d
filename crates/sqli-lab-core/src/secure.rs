// SPDX-License-Identifier: Apache-2.0

//! Parameterized counterparts of the lab queries.
//!
//! Same tables, same result shapes, but every value is bound and inputs are
//! validated first. Failures are logged and read as "nothing found"; no error
//! text reaches the caller.

use sqlx::sqlite::SqliteConnection;
use thiserror::Error;
use tracing::{error, instrument};

use crate::models::{BlogRow, UserRow};

/// Longest accepted search term, in characters.
pub const MAX_SEARCH_LEN: usize = 100;

/// Keywords refused in search terms, matched case-insensitively.
pub const BLOCKED_KEYWORDS: [&str; 6] = ["union", "select", "drop", "insert", "update", "delete"];

/// Why an input was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Username outside 3 to 20 characters.
    #[error("Username must be between 3 and 20 characters")]
    UsernameLength,
    /// Username with characters other than ASCII letters, digits, or `_`.
    #[error("Username may only contain letters, digits and underscores")]
    UsernameCharacters,
    /// Empty search term.
    #[error("Search term is required")]
    EmptySearch,
    /// Search term over [`MAX_SEARCH_LEN`] characters.
    #[error("Search term must be at most {MAX_SEARCH_LEN} characters")]
    SearchTooLong,
    /// Search term containing a blocked keyword.
    #[error("Search term contains a forbidden keyword: {0}")]
    ForbiddenKeyword(&'static str),
}

/// Check a username against the account naming rules.
///
/// # Errors
///
/// Returns the first rule the username breaks.
pub fn validate_username(username: &str) -> Result<(), InputError> {
    let len = username.chars().count();
    if !(3..=20).contains(&len) {
        return Err(InputError::UsernameLength);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(InputError::UsernameCharacters);
    }
    Ok(())
}

/// Check a search term.
///
/// # Errors
///
/// Returns the first rule the term breaks.
pub fn validate_search_term(term: &str) -> Result<(), InputError> {
    if term.trim().is_empty() {
        return Err(InputError::EmptySearch);
    }
    if term.chars().count() > MAX_SEARCH_LEN {
        return Err(InputError::SearchTooLong);
    }

    let lowered = term.to_lowercase();
    if let Some(keyword) = BLOCKED_KEYWORDS
        .into_iter()
        .find(|keyword| lowered.contains(keyword))
    {
        return Err(InputError::ForbiddenKeyword(keyword));
    }
    Ok(())
}

/// Look up an account by bound username and password.
#[instrument(skip(conn, password))]
pub async fn authenticate(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
) -> Option<UserRow> {
    validate_username(username).ok()?;

    let row = sqlx::query(
        "SELECT username, password, role, secret FROM users WHERE username = ? AND password = ?",
    )
    .bind(username)
    .bind(password)
    .fetch_optional(conn)
    .await;

    match row {
        Ok(row) => row.and_then(|row| {
            UserRow::from_row(&row)
                .inspect_err(|err| error!(error = %err, "Failed to decode user row"))
                .ok()
        }),
        Err(err) => {
            error!(error = %err, "Authentication query failed");
            None
        }
    }
}

/// Blog posts whose title contains `term`, ordered by title.
#[instrument(skip(conn))]
pub async fn search_blogs(conn: &mut SqliteConnection, term: &str) -> Vec<BlogRow> {
    if validate_search_term(term).is_err() {
        return Vec::new();
    }

    let rows = sqlx::query(
        "SELECT title, author_name FROM blogs WHERE title LIKE '%' || ? || '%' ORDER BY title",
    )
    .bind(term)
    .fetch_all(conn)
    .await;

    match rows {
        Ok(rows) => rows
            .iter()
            .filter_map(|row| BlogRow::from_row(row).ok())
            .collect(),
        Err(err) => {
            error!(error = %err, "Search query failed");
            Vec::new()
        }
    }
}

/// Whether an account named `username` exists.
#[instrument(skip(conn))]
pub async fn user_exists(conn: &mut SqliteConnection, username: &str) -> bool {
    if validate_username(username).is_err() {
        return false;
    }

    let count: Result<i64, _> = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(conn)
        .await;

    match count {
        Ok(count) => count > 0,
        Err(err) => {
            error!(error = %err, "Existence query failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::LabSecrets;
    use crate::seed::ensure_schema;
    use sqlx::Connection;

    async fn seeded() -> SqliteConnection {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        let secrets =
            LabSecrets::from_parts("FLAG{a}".to_string(), "FLAG{b}".to_string(), b"k".to_vec());
        ensure_schema(&mut conn, &secrets).await.unwrap();
        conn
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("user_01").is_ok());
        assert_eq!(validate_username("al"), Err(InputError::UsernameLength));
        assert_eq!(
            validate_username(&"a".repeat(21)),
            Err(InputError::UsernameLength)
        );
        assert_eq!(
            validate_username("admin' --"),
            Err(InputError::UsernameCharacters)
        );
    }

    #[test]
    fn test_validate_search_term() {
        assert!(validate_search_term("Docker").is_ok());
        assert_eq!(validate_search_term("  "), Err(InputError::EmptySearch));
        assert_eq!(
            validate_search_term(&"x".repeat(101)),
            Err(InputError::SearchTooLong)
        );
        assert_eq!(
            validate_search_term("' UNION SELECT username, password FROM users --"),
            Err(InputError::ForbiddenKeyword("union"))
        );
    }

    #[tokio::test]
    async fn test_authenticate_rejects_tautology() {
        let mut conn = seeded().await;

        assert!(authenticate(&mut conn, "admin", "' OR '1'='1").await.is_none());
        assert!(authenticate(&mut conn, "admin' --", "x").await.is_none());
    }

    #[tokio::test]
    async fn test_authenticate_with_real_password() {
        let mut conn = seeded().await;
        let password: String =
            sqlx::query_scalar("SELECT password FROM users WHERE username = 'bob'")
                .fetch_one(&mut conn)
                .await
                .unwrap();

        let row = authenticate(&mut conn, "bob", &password).await.unwrap();

        assert_eq!(row.username, "bob");
    }

    #[tokio::test]
    async fn test_search_blogs_binds_term() {
        let mut conn = seeded().await;

        let docker = search_blogs(&mut conn, "Docker").await;
        let injected = search_blogs(&mut conn, "' OR '1'='1").await;

        assert_eq!(docker.len(), 2);
        assert_eq!(docker[0].title, "Containerization with Docker and Kubernetes");
        assert!(injected.is_empty());
    }

    #[tokio::test]
    async fn test_user_exists() {
        let mut conn = seeded().await;

        assert!(user_exists(&mut conn, "admin").await);
        assert!(!user_exists(&mut conn, "mallory").await);
        assert!(!user_exists(&mut conn, "x' OR '1'='1").await);
    }
}
