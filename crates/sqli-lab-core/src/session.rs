// SPDX-License-Identifier: Apache-2.0

//! Client sessions carried in a signed cookie.
//!
//! A session is either anonymous or authenticated. Login moves it to
//! authenticated with the username of the first returned row; the secret slot
//! is filled only when that row's `role` column reads `admin`. A session
//! older than its TTL reads as anonymous again.
//!
//! Cookie format: `base64url(json) "." hex(HMAC-SHA256(base64url(json)))`.
//! The payload is signed, not encrypted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretSlice, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::models::{Role, UserRow};
use crate::secrets::LabSecrets;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sqli_lab_session";

/// Username shown for anonymous visitors.
pub const GUEST: &str = "Guest";

/// Default session lifetime.
pub const DEFAULT_TTL: std::time::Duration = std::time::Duration::from_secs(300);

/// Authenticated session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Username of the row that authenticated.
    pub username: String,
    /// Flag bound at login; `None` unless the row's role was admin.
    pub secret: Option<String>,
    /// Time of the last write.
    pub issued_at: DateTime<Utc>,
}

impl Session {
    /// Check if this session is still valid based on TTL.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.issued_at) < ttl
    }
}

/// What a request's cookie resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No session, a cleared one, an expired one, or a forged one.
    Anonymous,
    /// A valid session.
    Authenticated(Session),
}

impl SessionState {
    /// Username for display, `Guest` when anonymous.
    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            SessionState::Anonymous => GUEST,
            SessionState::Authenticated(session) => &session.username,
        }
    }

    /// Bound secret, if any.
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(session) => session.secret.as_deref(),
        }
    }

    /// Whether this state is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// Issues and reads sessions.
#[derive(Debug)]
pub struct SessionAuthority {
    key: SecretSlice<u8>,
    login_flag: SecretString,
    ttl: std::time::Duration,
}

impl SessionAuthority {
    /// Authority signing with the lab's key and binding the lab's login flag.
    #[must_use]
    pub fn new(secrets: &LabSecrets, ttl: std::time::Duration) -> Self {
        Self {
            key: SecretSlice::from(secrets.signing_key().to_vec()),
            login_flag: SecretString::from(secrets.login_flag().expose_secret().to_owned()),
            ttl,
        }
    }

    /// Session lifetime.
    #[must_use]
    pub fn ttl(&self) -> std::time::Duration {
        self.ttl
    }

    /// Bind the identity of an authenticating row.
    ///
    /// The secret is gated on the row's own `role` column. A spoofed row
    /// whose role reads `admin` receives the flag.
    #[must_use]
    pub fn bind(&self, row: &UserRow, now: DateTime<Utc>) -> Session {
        let secret = match row.role() {
            Role::Admin => Some(self.login_flag.expose_secret().to_owned()),
            Role::User => None,
        };

        Session {
            username: row.username.clone(),
            secret,
            issued_at: now,
        }
    }

    /// Encode and sign a session for the cookie.
    #[must_use]
    pub fn seal(&self, session: &Session) -> String {
        // Serializing a struct of strings and a timestamp cannot fail.
        let json = serde_json::to_vec(session).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = hex::encode(self.mac(&payload).finalize().into_bytes());
        format!("{payload}.{signature}")
    }

    /// Read a cookie value.
    ///
    /// Anything malformed, forged, or expired is anonymous.
    #[must_use]
    pub fn open(&self, value: &str, now: DateTime<Utc>) -> SessionState {
        let Some((payload, signature)) = value.split_once('.') else {
            debug!("Session cookie without signature");
            return SessionState::Anonymous;
        };

        let Ok(signature) = hex::decode(signature) else {
            debug!("Session signature is not hex");
            return SessionState::Anonymous;
        };

        if self.mac(payload).verify_slice(&signature).is_err() {
            debug!("Session signature mismatch");
            return SessionState::Anonymous;
        }

        let session = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|json| serde_json::from_slice::<Session>(&json).ok());

        match session {
            Some(session) if session.is_valid(now, self.chrono_ttl()) => {
                SessionState::Authenticated(session)
            }
            Some(session) => {
                debug!(username = %session.username, "Session expired");
                SessionState::Anonymous
            }
            None => {
                debug!("Session payload could not be decoded");
                SessionState::Anonymous
            }
        }
    }

    fn mac(&self, payload: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(self.key.expose_secret()).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        mac
    }

    fn chrono_ttl(&self) -> Duration {
        Duration::from_std(self.ttl).unwrap_or(Duration::MAX)
    }
}
