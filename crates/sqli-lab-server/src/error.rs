// SPDX-License-Identifier: Apache-2.0

//! Conversion from lab errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqli_lab_core::{GENERIC_MESSAGE, LabError};

/// A failure that escaped the lab's own disclosure handling.
///
/// In practice this is connection exhaustion; every per-query failure is
/// already rendered by the endpoint's disclosure policy.
#[derive(Debug)]
pub struct AppError(pub LabError);

impl From<LabError> for AppError {
    fn from(err: LabError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Request aborted");

        (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE).into_response()
    }
}
