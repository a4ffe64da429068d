// SPDX-License-Identifier: Apache-2.0

//! Minimal HTML views.
//!
//! Every interpolated value goes through [`escape`]; the lab teaches SQL
//! injection, not markup injection.

use std::fmt::Write;

use axum::response::Html;
use sqli_lab_core::{BlogRow, Endpoint};

/// Escape text for an HTML body or a double-quoted attribute.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title} | SQLi Lab</title></head>\n\
         <body>\n<h1>{title}</h1>\n{body}\n<p><a href=\"/\">Home</a></p>\n</body>\n</html>\n",
        title = escape(title),
    ))
}

fn error_block(error: Option<&str>) -> String {
    error.map_or_else(String::new, |error| {
        format!("<p class=\"error\">{}</p>\n", escape(error))
    })
}

fn search_form(path: &str, search: &str) -> String {
    format!(
        "<form method=\"get\" action=\"{path}\">\n\
         <input type=\"text\" name=\"search\" value=\"{}\">\n\
         <button type=\"submit\">Search</button>\n</form>\n",
        escape(search)
    )
}

/// Landing page listing the lab surfaces.
#[must_use]
pub fn home() -> Html<String> {
    let mut body = String::from("<ul>\n");
    for (path, label) in [
        (Endpoint::Authentication.path(), "Login bypass"),
        (Endpoint::UnionSearch.path(), "UNION-based search"),
        (Endpoint::ErrorSearch.path(), "Error-based search"),
        (Endpoint::BooleanExistence.path(), "Boolean-based blind lookup"),
        (Endpoint::TimingExistence.path(), "Time-based blind lookup"),
        (Endpoint::EscalationSearch.path(), "SQL injection to code execution"),
    ] {
        let _ = writeln!(body, "<li><a href=\"{path}\">{label}</a></li>");
    }
    body.push_str("</ul>");
    page("SQLi Lab", &body)
}

/// Login form, with an optional error line.
#[must_use]
pub fn login(error: Option<&str>) -> Html<String> {
    let body = format!(
        "{}<form method=\"post\" action=\"{}\">\n\
         <input type=\"text\" name=\"username\" placeholder=\"Username\">\n\
         <input type=\"password\" name=\"password\" placeholder=\"Password\">\n\
         <button type=\"submit\">Login</button>\n</form>",
        error_block(error),
        Endpoint::Authentication.path(),
    );
    page("Login", &body)
}

/// Identity and secret from the session.
#[must_use]
pub fn profile(username: &str, secret: Option<&str>) -> Html<String> {
    let mut body = format!("<p>Welcome, <strong>{}</strong></p>\n", escape(username));
    if let Some(secret) = secret {
        let _ = writeln!(body, "<p>Secret: <code>{}</code></p>", escape(secret));
    }
    page("Profile", &body)
}

/// Blog search page: form, optional error, result table.
#[must_use]
pub fn blogs(
    title: &str,
    path: &str,
    search: &str,
    rows: &[BlogRow],
    error: Option<&str>,
) -> Html<String> {
    let mut body = search_form(path, search);
    body.push_str(&error_block(error));

    if !rows.is_empty() {
        body.push_str("<table>\n<tr><th>Title</th><th>Author</th></tr>\n");
        for row in rows {
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(&row.title),
                escape(&row.author_name)
            );
        }
        body.push_str("</table>\n");
    }
    page(title, &body)
}

/// User lookup page: form and an optional result label.
#[must_use]
pub fn lookup(title: &str, path: &str, search: &str, result: Option<&str>) -> Html<String> {
    let mut body = search_form(path, search);
    if let Some(result) = result {
        let _ = writeln!(body, "<p class=\"result\">Result: {}</p>", escape(result));
    }
    page(title, &body)
}
