// SPDX-License-Identifier: Apache-2.0

//! Route handlers.
//!
//! Each handler reads its inputs, calls one lab operation, and renders the
//! outcome. Per-query failures arrive already shaped by the endpoint's
//! disclosure policy; only connection exhaustion surfaces as [`AppError`].

use axum::Form;
use axum::extract::{Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, Html, IntoResponse, Redirect, Response};
use chrono::Utc;
use sqli_lab_core::{
    Endpoint, ExistenceOutcome, FOUND_LABEL, LoginOutcome, NOT_FOUND_LABEL, Outcome,
    SESSION_COOKIE, SearchOutcome, SessionState,
};
use tracing::{info, warn};

use crate::error::AppError;
use crate::{AppState, views};

/// Raw key/value pairs of a query string or form body, in request order.
type Pairs = Vec<(String, String)>;

/// Query string of the search and lookup pages.
#[derive(Debug, Default)]
pub struct SearchParams {
    /// Raw search input.
    pub search: Option<String>,
}

impl SearchParams {
    /// First `search` value; repeated keys after it are ignored.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            search: first(pairs, "search"),
        }
    }
}

/// Login form body.
#[derive(Debug, Default)]
pub struct LoginForm {
    /// Raw username input.
    pub username: Option<String>,
    /// Raw password input.
    pub password: Option<String>,
}

impl LoginForm {
    /// First `username` and `password` values.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            username: first(pairs, "username"),
            password: first(pairs, "password"),
        }
    }
}

/// Query string of the execution route.
#[derive(Debug, Default)]
pub struct ExecParams {
    /// Name of the file to run, without extension.
    pub file: Option<String>,
}

impl ExecParams {
    /// First `file` value.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            file: first(pairs, "file"),
        }
    }
}

/// `GET /`
pub async fn home() -> Html<String> {
    views::home()
}

/// `GET /sqli/basic`: clears the session and shows the form.
pub async fn login_form() -> impl IntoResponse {
    (AppendHeaders([(SET_COOKIE, clear_cookie())]), views::login(None))
}

/// `POST /sqli/basic`
pub async fn login(
    State(state): State<AppState>,
    Form(pairs): Form<Pairs>,
) -> Result<Response, AppError> {
    let form = LoginForm::from_pairs(&pairs);
    let outcome = state
        .lab
        .login(form.username.as_deref(), form.password.as_deref(), Utc::now())
        .await?;

    let response = match outcome {
        LoginOutcome::Authenticated(session) => {
            let cookie = session_cookie(
                &state.lab.sessions().seal(&session),
                state.lab.sessions().ttl().as_secs(),
            );
            (
                AppendHeaders([(SET_COOKIE, cookie)]),
                Redirect::to("/sqli/basic/profile"),
            )
                .into_response()
        }
        LoginOutcome::InvalidCredentials => {
            views::login(Some("Invalid credentials")).into_response()
        }
        LoginOutcome::Failed(disclosed) => {
            views::login(disclosed.message()).into_response()
        }
        LoginOutcome::NoInput => views::login(None).into_response(),
    };
    Ok(response)
}

/// `GET /sqli/basic/profile`: reads the session only, never storage.
pub async fn profile(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let session = read_session(&state, &headers);
    views::profile(session.username(), session.secret())
}

/// `GET /sqli/union`
pub async fn union_search(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
) -> Result<Html<String>, AppError> {
    let params = SearchParams::from_pairs(&pairs);
    let outcome = state.lab.union_search(params.search.as_deref()).await?;
    Ok(render_search(Endpoint::UnionSearch, "UNION-based Search", &params, outcome))
}

/// `GET /sqli/error`
pub async fn error_search(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
) -> Result<Html<String>, AppError> {
    let params = SearchParams::from_pairs(&pairs);
    let outcome = state.lab.error_search(params.search.as_deref()).await?;
    Ok(render_search(Endpoint::ErrorSearch, "Error-based Search", &params, outcome))
}

/// `GET /sqli/rce`
pub async fn escalation_search(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
) -> Result<Html<String>, AppError> {
    let params = SearchParams::from_pairs(&pairs);
    let outcome = state.lab.escalation_search(params.search.as_deref()).await?;
    Ok(render_search(
        Endpoint::EscalationSearch,
        "SQL Injection to RCE",
        &params,
        outcome,
    ))
}

/// `GET /sqli/boolean`: always shows a result line.
pub async fn boolean_lookup(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
) -> Result<Html<String>, AppError> {
    let params = SearchParams::from_pairs(&pairs);
    let outcome = state.lab.boolean_exists(params.search.as_deref()).await?;
    let label = match outcome {
        ExistenceOutcome::NoInput => NOT_FOUND_LABEL,
        checked => verdict(checked),
    };
    Ok(views::lookup(
        "Boolean-based Blind Lookup",
        Endpoint::BooleanExistence.path(),
        params.search.as_deref().unwrap_or_default(),
        Some(label),
    ))
}

/// `GET /sqli/time`: shows a result line only after a query ran.
pub async fn time_lookup(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
) -> Result<Html<String>, AppError> {
    let params = SearchParams::from_pairs(&pairs);
    let outcome = state.lab.timed_exists(params.search.as_deref()).await?;
    let label = match outcome {
        ExistenceOutcome::NoInput => None,
        checked => Some(verdict(checked)),
    };
    Ok(views::lookup(
        "Time-based Blind Lookup",
        Endpoint::TimingExistence.path(),
        params.search.as_deref().unwrap_or_default(),
        label,
    ))
}

/// `GET /sqli/rce/exec`: hands the name to the execution sink.
pub async fn execute(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
) -> (StatusCode, String) {
    let params = ExecParams::from_pairs(&pairs);
    let Some(file) = params.file.filter(|file| !file.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            "'file' parameter is required".to_string(),
        );
    };
    warn!(file, "Code execution request");

    match state.sink.execute(&file).await {
        Outcome::Executed { stdout } => {
            info!(bytes = stdout.len(), "Execution finished");
            (StatusCode::OK, "File executed successfully".to_string())
        }
        Outcome::NotFound(_) => (StatusCode::NOT_FOUND, "File not found".to_string()),
        Outcome::RuntimeError(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error executing file: {message}"),
        ),
    }
}

fn render_search(
    endpoint: Endpoint,
    title: &str,
    params: &SearchParams,
    outcome: SearchOutcome,
) -> Html<String> {
    let search = params.search.as_deref().unwrap_or_default();
    match outcome {
        SearchOutcome::NoInput => views::blogs(title, endpoint.path(), search, &[], None),
        SearchOutcome::Results(rows) => views::blogs(title, endpoint.path(), search, &rows, None),
        SearchOutcome::Failed(disclosed) => {
            views::blogs(title, endpoint.path(), search, &[], disclosed.message())
        }
    }
}

fn first(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.clone())
}

fn verdict(outcome: ExistenceOutcome) -> &'static str {
    if outcome.is_found() {
        FOUND_LABEL
    } else {
        NOT_FOUND_LABEL
    }
}

fn read_session(state: &AppState, headers: &HeaderMap) -> SessionState {
    cookie_value(headers, SESSION_COOKIE).map_or(SessionState::Anonymous, |value| {
        state.lab.sessions().open(value, Utc::now())
    })
}

/// First value of the named cookie across all `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find_map(|(key, value)| (key == name).then_some(value))
}

fn session_cookie(value: &str, max_age: u64) -> String {
    format!("{SESSION_COOKIE}={value}; Max-Age={max_age}; Path=/; HttpOnly; SameSite=Lax")
}

fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax")
}
