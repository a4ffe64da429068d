// SPDX-License-Identifier: Apache-2.0

//! Values generated once at start-up: the two flags and the cookie key.
//!
//! Built before seeding and handed to both the seeder and the session
//! authority, so nothing reads them from global state.

use secrecy::{ExposeSecret, SecretSlice, SecretString};

use crate::config::SessionConfig;

/// Immutable secrets for one lab process.
#[derive(Debug)]
pub struct LabSecrets {
    login_flag: SecretString,
    storage_flag: SecretString,
    signing_key: SecretSlice<u8>,
}

impl LabSecrets {
    /// Generate fresh flags; take the signing key from config when present.
    #[must_use]
    pub fn generate(session: &SessionConfig) -> Self {
        let signing_key = match &session.secret_key {
            Some(key) if !key.is_empty() => key.as_bytes().to_vec(),
            _ => random_key(),
        };

        Self::from_parts(generate_flag(), generate_flag(), signing_key)
    }

    /// Build from known values.
    #[must_use]
    pub fn from_parts(login_flag: String, storage_flag: String, signing_key: Vec<u8>) -> Self {
        Self {
            login_flag: SecretString::from(login_flag),
            storage_flag: SecretString::from(storage_flag),
            signing_key: SecretSlice::from(signing_key),
        }
    }

    /// Flag handed to whoever authenticates as an admin row.
    #[must_use]
    pub fn login_flag(&self) -> &SecretString {
        &self.login_flag
    }

    /// Flag stored in the `flag` table.
    #[must_use]
    pub fn storage_flag(&self) -> &SecretString {
        &self.storage_flag
    }

    /// Key used to sign session cookies.
    #[must_use]
    pub fn signing_key(&self) -> &[u8] {
        self.signing_key.expose_secret()
    }
}

/// A flag in the lab's `FLAG{<24 hex>}` format.
#[must_use]
pub fn generate_flag() -> String {
    format!("FLAG{{{}}}", random_hex(12))
}

/// `len` random bytes, hex-encoded.
#[must_use]
pub fn random_hex(len: usize) -> String {
    let bytes: Vec<u8> = std::iter::repeat_with(|| fastrand::u8(..))
        .take(len)
        .collect();
    hex::encode(bytes)
}

/// 32 bytes from the OS generator behind `Uuid::new_v4`.
fn random_key() -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
    key.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
    key
}
