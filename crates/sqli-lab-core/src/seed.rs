// SPDX-License-Identifier: Apache-2.0

//! Schema and sample data.
//!
//! Run once at start-up. Every run drops the three lab tables and recreates
//! them, so the lab always starts from the same shape with fresh passwords
//! and flags. Seed inserts bind their values; only the lab endpoints splice.

use secrecy::ExposeSecret;
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use sqlx::{Connection, Row};
use tracing::{info, instrument};

use crate::error::LabError;
use crate::models::Role;
use crate::secrets::{LabSecrets, random_hex};

/// Usernames of the seeded accounts. `admin` is the only privileged one.
pub const USERNAMES: [&str; 26] = [
    "alice", "bob", "charlie", "diana", "edward", "fiona", "george", "helen", "ivan", "julia",
    "kevin", "admin", "linda", "martin", "nancy", "oscar", "penny", "quincy", "rachel", "steve",
    "tina", "victor", "wendy", "xavier", "yvonne", "zack",
];

/// Searchable blog corpus: `(title, author_name)`.
pub const BLOG_POSTS: [(&str, &str); 50] = [
    ("Basic Python Programming", "alice"),
    ("Introduction to Docker", "bob"),
    ("Effective Git Usage Guide", "charlie"),
    ("5 Python Libraries for Data Science", "diana"),
    ("Getting Started with ReactJS", "edward"),
    ("How to Optimize JavaScript Performance", "fiona"),
    ("Machine Learning for Beginners", "george"),
    ("REST API with Flask and Python", "helen"),
    ("CSS Grid vs Flexbox: When to Use What?", "ivan"),
    ("Web Security: Basic Things You Need to Know", "julia"),
    ("Node.js and MongoDB: Building Fullstack Applications", "kevin"),
    ("TypeScript: Why Should You Learn It?", "linda"),
    ("Basic DevOps: CI/CD with GitHub Actions", "martin"),
    ("Vue.js 3: Notable New Features", "nancy"),
    ("SQL Injection and Prevention Methods", "oscar"),
    ("Redis: Efficient Cache and Session Store", "penny"),
    ("Design Patterns in OOP Programming", "quincy"),
    ("Microservices vs Monolith: Which Architecture to Choose?", "rachel"),
    ("Kubernetes Basics for Developers", "steve"),
    ("Clean Code: Writing Clean and Maintainable Code", "tina"),
    ("AWS Lambda: Practical Serverless Computing", "victor"),
    ("GraphQL vs REST: Detailed Comparison", "wendy"),
    ("Unit Testing with Jest and Python unittest", "xavier"),
    ("Blockchain and Smart Contract Basics", "yvonne"),
    ("Performance Testing with JMeter", "zack"),
    ("Mobile App Development with React Native", "alice"),
    ("Data Science with Pandas and NumPy", "bob"),
    ("Elasticsearch: Data Search and Analysis", "charlie"),
    ("OAuth 2.0 and JWT in Authentication", "diana"),
    ("Agile and Scrum: Methodology for Effective Teams", "edward"),
    ("Progressive Web Apps (PWA): The Future of Web", "fiona"),
    ("Apache Kafka: Message Queue for Large Systems", "george"),
    ("Code Review: Best Practices and Tools", "helen"),
    ("Cyber Security: Protecting Web Applications", "ivan"),
    ("Flutter vs React Native: Which Framework to Choose?", "julia"),
    ("Big Data with Apache Spark", "kevin"),
    ("Monitoring and Logging in Production", "linda"),
    ("API Design: RESTful Best Practices", "martin"),
    ("Git Advanced: Rebase, Cherry-pick and Hooks", "nancy"),
    ("Load Balancing and High Availability", "oscar"),
    ("Containerization with Docker and Kubernetes", "penny"),
    ("Microservices Architecture Best Practices", "quincy"),
    ("Web Security and Penetration Testing", "rachel"),
    ("Cloud Computing with AWS and Azure", "steve"),
    ("Database Optimization and Performance Tuning", "tina"),
    ("Frontend Frameworks: React vs Vue vs Angular", "victor"),
    ("Backend Development with Node.js and Express", "wendy"),
    ("Data Analysis with Python and R", "xavier"),
    ("Mobile Development: Native vs Cross-platform", "yvonne"),
    ("DevSecOps: Security in CI/CD Pipeline", "zack"),
];

const SCHEMA: [&str; 6] = [
    "DROP TABLE IF EXISTS users",
    "DROP TABLE IF EXISTS blogs",
    "DROP TABLE IF EXISTS flag",
    "CREATE TABLE users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        secret TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE blogs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        author_name TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE flag (
        flag TEXT NOT NULL
    )",
];

/// Row counts written by [`ensure_schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    /// Accounts inserted.
    pub users: usize,
    /// Blog posts inserted.
    pub blogs: usize,
    /// Flags inserted.
    pub flags: usize,
}

/// Facts about the storage engine, logged at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageDiagnostics {
    /// `sqlite_version()`.
    pub sqlite_version: String,
    /// Attached databases as `(name, file)`.
    pub databases: Vec<(String, String)>,
}

/// Drop and recreate the lab tables, then insert sample data.
///
/// Runs in a single transaction. The admin row's `secret` column carries
/// the login flag; every other row leaves it NULL.
///
/// # Errors
///
/// Returns an error if any statement fails; nothing is committed then.
#[instrument(skip_all)]
pub async fn ensure_schema(
    conn: &mut SqliteConnection,
    secrets: &LabSecrets,
) -> Result<SeedSummary, LabError> {
    info!("Dropping existing tables and creating fresh schema");
    let mut tx = conn.begin().await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    for username in USERNAMES {
        let role = if username == "admin" {
            Role::Admin
        } else {
            Role::User
        };
        let secret = match role {
            Role::Admin => Some(secrets.login_flag().expose_secret().to_owned()),
            Role::User => None,
        };

        sqlx::query(
            "INSERT INTO users (id, username, password, role, secret) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(username)
        .bind(random_hex(12))
        .bind(role.as_str())
        .bind(secret)
        .execute(&mut *tx)
        .await?;
    }
    info!(count = USERNAMES.len(), "Inserted users (including 1 admin)");

    for (title, author_name) in BLOG_POSTS {
        sqlx::query("INSERT INTO blogs (title, author_name) VALUES (?, ?)")
            .bind(title)
            .bind(author_name)
            .execute(&mut *tx)
            .await?;
    }
    info!(count = BLOG_POSTS.len(), "Inserted blog posts");

    sqlx::query("INSERT INTO flag (flag) VALUES (?)")
        .bind(secrets.storage_flag().expose_secret())
        .execute(&mut *tx)
        .await?;
    info!("Inserted storage flag");

    tx.commit().await?;

    Ok(SeedSummary {
        users: USERNAMES.len(),
        blogs: BLOG_POSTS.len(),
        flags: 1,
    })
}

/// Probe the storage engine the way an attacker would after a first foothold.
///
/// # Errors
///
/// Returns an error if the probe queries fail.
pub async fn diagnostics(conn: &mut SqliteConnection) -> Result<StorageDiagnostics, LabError> {
    let sqlite_version: String = sqlx::query_scalar("SELECT sqlite_version()")
        .fetch_one(&mut *conn)
        .await?;

    let databases = sqlx::query("PRAGMA database_list")
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(|row| {
            let name: String = row.try_get("name")?;
            let file: String = row.try_get("file")?;
            Ok((name, file))
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    Ok(StorageDiagnostics {
        sqlite_version,
        databases,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::ConnectOptions;
    use sqlx::sqlite::SqliteConnectOptions;

    async fn open() -> SqliteConnection {
        SqliteConnectOptions::new()
            .in_memory(true)
            .connect()
            .await
            .unwrap()
    }

    fn secrets() -> LabSecrets {
        LabSecrets::from_parts(
            "FLAG{login}".to_string(),
            "FLAG{storage}".to_string(),
            b"k".to_vec(),
        )
    }

    #[tokio::test]
    async fn seeds_expected_counts() {
        let mut conn = open().await;

        let summary = ensure_schema(&mut conn, &secrets()).await.unwrap();

        assert_eq!(
            summary,
            SeedSummary {
                users: 26,
                blogs: 50,
                flags: 1
            }
        );
        let blogs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blogs")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(blogs, 50);
    }

    #[tokio::test]
    async fn exactly_one_admin_holds_a_secret() {
        let mut conn = open().await;
        ensure_schema(&mut conn, &secrets()).await.unwrap();

        let admins: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT username, secret FROM users WHERE role = 'admin'")
                .fetch_all(&mut conn)
                .await
                .unwrap();
        let with_secret: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE secret IS NOT NULL")
                .fetch_one(&mut conn)
                .await
                .unwrap();

        assert_eq!(
            admins,
            vec![("admin".to_string(), Some("FLAG{login}".to_string()))]
        );
        assert_eq!(with_secret, 1);
    }

    #[tokio::test]
    async fn passwords_are_random_hex() {
        let mut conn = open().await;
        ensure_schema(&mut conn, &secrets()).await.unwrap();

        let passwords: Vec<String> = sqlx::query_scalar("SELECT password FROM users")
            .fetch_all(&mut conn)
            .await
            .unwrap();

        assert!(passwords.iter().all(|p| p.len() == 24));
        assert!(
            passwords
                .iter()
                .all(|p| p.chars().all(|c| c.is_ascii_hexdigit()))
        );
    }

    #[tokio::test]
    async fn reseeding_replaces_data() {
        let mut conn = open().await;
        ensure_schema(&mut conn, &secrets()).await.unwrap();
        ensure_schema(&mut conn, &secrets()).await.unwrap();

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        let flag: String = sqlx::query_scalar("SELECT flag FROM flag")
            .fetch_one(&mut conn)
            .await
            .unwrap();

        assert_eq!(users, 26);
        assert_eq!(flag, "FLAG{storage}");
    }

    #[tokio::test]
    async fn diagnostics_reports_version_and_main_database() {
        let mut conn = open().await;

        let diag = diagnostics(&mut conn).await.unwrap();

        assert!(diag.sqlite_version.starts_with('3'));
        assert!(diag.databases.iter().any(|(name, _)| name == "main"));
    }
}
