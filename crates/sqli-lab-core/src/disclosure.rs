// SPDX-License-Identifier: Apache-2.0

//! Disclosure policies: what a caller sees when a query fails.
//!
//! Identical query templates under different policies give an attacker
//! categorically different capability. `Silent` keeps a blind oracle binary,
//! `Generic` hides the failure behind a fixed message, and `Verbose` hands the
//! driver's error text straight back to the caller.

use serde::Deserialize;

use crate::error::LabError;

/// Fixed message rendered by [`DisclosurePolicy::Generic`].
pub const GENERIC_MESSAGE: &str = "Internal Server Error";

/// Label rendered by existence checks that found nothing, or failed silently.
pub const NOT_FOUND_LABEL: &str = "Not found";

/// Label rendered by existence checks that matched at least one row.
pub const FOUND_LABEL: &str = "Found";

/// How much of a failure an endpoint reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisclosurePolicy {
    /// Failure is indistinguishable from an empty result.
    Silent,
    /// Failure renders a fixed, content-free message.
    Generic,
    /// Failure renders the underlying error text verbatim.
    Verbose,
}

/// A caught per-request failure, classified for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Driver-reported failure during query execution.
    Driver(String),
    /// Any other failure while handling the request.
    Unexpected(String),
}

impl Failure {
    /// Classify a lab error.
    ///
    /// Returns `None` for errors that abort the request instead of being
    /// rendered (connection exhaustion, configuration problems).
    #[must_use]
    pub fn from_error(err: &LabError) -> Option<Self> {
        match err {
            LabError::QueryExecution(message) => Some(Failure::Driver(message.clone())),
            LabError::Unexpected(message) => Some(Failure::Unexpected(message.clone())),
            _ => None,
        }
    }
}

/// What the caller sees after a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disclosed {
    /// The same view as a legitimate empty result.
    NotFound,
    /// An error message placed in the view.
    Message(String),
}

impl Disclosed {
    /// The error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Disclosed::NotFound => None,
            Disclosed::Message(message) => Some(message),
        }
    }
}

impl DisclosurePolicy {
    /// Render a failure according to this policy.
    #[must_use]
    pub fn disclose(self, failure: &Failure) -> Disclosed {
        match (self, failure) {
            (DisclosurePolicy::Silent, _) => Disclosed::NotFound,
            (DisclosurePolicy::Generic, _) => Disclosed::Message(GENERIC_MESSAGE.to_string()),
            (DisclosurePolicy::Verbose, Failure::Driver(text)) => {
                Disclosed::Message(format!("Database error: {text}"))
            }
            (DisclosurePolicy::Verbose, Failure::Unexpected(text)) => {
                Disclosed::Message(format!("An unexpected error occurred: {text}"))
            }
        }
    }
}
