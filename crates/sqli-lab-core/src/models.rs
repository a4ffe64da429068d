// SPDX-License-Identifier: Apache-2.0

//! Row types returned by the lab's queries.
//!
//! Injected queries return whatever the attacker selects, so decoding is
//! lenient: every value is read back as text regardless of its storage
//! class, and NULL maps to `None`.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, ColumnIndex, Row, TypeInfo, ValueRef};

/// Account role as stored in the `role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account.
    User,
    /// The single privileged account.
    Admin,
}

impl Role {
    /// Interpret a `role` column value. Only the exact text `admin` is admin.
    #[must_use]
    pub fn from_column(value: Option<&str>) -> Self {
        match value {
            Some("admin") => Role::Admin,
            _ => Role::User,
        }
    }

    /// Column text for this role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// One row of the `users` table, or anything shaped like it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRow {
    /// Login name.
    pub username: String,
    /// Clear-text password.
    pub password: String,
    /// Raw `role` column text.
    pub role: Option<String>,
    /// Raw `secret` column text.
    pub secret: Option<String>,
}

impl UserRow {
    /// Decode a row selected with `SELECT * FROM users ...`.
    ///
    /// # Errors
    ///
    /// Fails if a required column is missing from the result set.
    pub fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let secret = if row.columns().iter().any(|c| c.name() == "secret") {
            column_text(row, "secret")?
        } else {
            None
        };

        Ok(Self {
            username: column_text(row, "username")?.unwrap_or_default(),
            password: column_text(row, "password")?.unwrap_or_default(),
            role: column_text(row, "role")?,
            secret,
        })
    }

    /// Role derived from the row's `role` column.
    #[must_use]
    pub fn role(&self) -> Role {
        Role::from_column(self.role.as_deref())
    }
}

/// One row of a blog search: exactly two visible columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlogRow {
    /// First column (`title` for genuine rows).
    pub title: String,
    /// Second column (`author_name` for genuine rows).
    pub author_name: String,
}

impl BlogRow {
    /// Decode by position, so UNION rows with foreign column names still fit.
    ///
    /// # Errors
    ///
    /// Fails if the row has fewer than two columns.
    pub fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            title: column_text(row, 0)?.unwrap_or_default(),
            author_name: column_text(row, 1)?.unwrap_or_default(),
        })
    }
}

/// Read any column value as text.
///
/// Integers and reals are rendered by SQLite's own text conversion; blobs
/// are hex-encoded.
///
/// # Errors
///
/// Fails if the column does not exist or the text is not valid UTF-8.
pub fn column_text<I>(row: &SqliteRow, index: I) -> Result<Option<String>, sqlx::Error>
where
    I: ColumnIndex<SqliteRow> + Copy,
{
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(None);
    }

    let is_blob = raw.type_info().name() == "BLOB";
    if is_blob {
        let bytes: Vec<u8> = row.try_get_unchecked(index)?;
        return Ok(Some(hex::encode(bytes)));
    }

    row.try_get_unchecked::<String, _>(index).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::{Connection, SqliteConnection};

    async fn fetch_one(sql: &str) -> SqliteRow {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        sqlx::query(sql).fetch_one(&mut conn).await.unwrap()
    }

    #[test]
    fn role_only_admin_text_is_admin() {
        assert_eq!(Role::from_column(Some("admin")), Role::Admin);
        assert_eq!(Role::from_column(Some("Admin")), Role::User);
        assert_eq!(Role::from_column(Some("user")), Role::User);
        assert_eq!(Role::from_column(None), Role::User);
    }

    #[tokio::test]
    async fn column_text_renders_every_storage_class() {
        let row = fetch_one("SELECT 'a', 42, 1.5, NULL, x'beef'").await;

        assert_eq!(column_text(&row, 0).unwrap().as_deref(), Some("a"));
        assert_eq!(column_text(&row, 1).unwrap().as_deref(), Some("42"));
        assert_eq!(column_text(&row, 2).unwrap().as_deref(), Some("1.5"));
        assert_eq!(column_text(&row, 3).unwrap(), None);
        assert_eq!(column_text(&row, 4).unwrap().as_deref(), Some("beef"));
    }

    #[tokio::test]
    async fn blog_row_decodes_by_position() {
        let row = fetch_one("SELECT 'admin' AS username, 'hunter2' AS password").await;

        let blog = BlogRow::from_row(&row).unwrap();

        assert_eq!(blog.title, "admin");
        assert_eq!(blog.author_name, "hunter2");
    }

    #[tokio::test]
    async fn blog_row_rejects_single_column() {
        let row = fetch_one("SELECT 'only'").await;
        assert!(BlogRow::from_row(&row).is_err());
    }

    #[tokio::test]
    async fn user_row_decodes_by_name() {
        let row = fetch_one(
            "SELECT 'id-1' AS id, 'bob' AS username, 'pw' AS password, 'user' AS role, NULL AS secret",
        )
        .await;

        let user = UserRow::from_row(&row).unwrap();

        assert_eq!(user.username, "bob");
        assert_eq!(user.password, "pw");
        assert_eq!(user.role(), Role::User);
        assert_eq!(user.secret, None);
    }

    #[tokio::test]
    async fn user_row_without_secret_column() {
        let row = fetch_one("SELECT 'root' AS username, 'x' AS password, 'admin' AS role").await;

        let user = UserRow::from_row(&row).unwrap();

        assert_eq!(user.role(), Role::Admin);
        assert_eq!(user.secret, None);
    }
}
