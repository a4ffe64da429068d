// SPDX-License-Identifier: Apache-2.0

//! Query policies: how each endpoint turns untrusted input into query text.
//!
//! Every policy splices input into its template verbatim. There is no
//! escaping and no parameter binding; the endpoints differ only in the
//! predicate they build and in what counts as success.

use std::fmt;

use crate::disclosure::DisclosurePolicy;

/// Template shared by the login endpoint.
pub const AUTH_TEMPLATE: &str =
    "SELECT * FROM users WHERE username = '{0}' AND password = '{1}'";

/// Template shared by the three search endpoints.
///
/// Projects exactly two columns; a UNION payload has to match that shape.
pub const SEARCH_TEMPLATE: &str =
    "SELECT title, author_name FROM blogs WHERE title LIKE '%{0}%'";

/// Template shared by the boolean and timing existence checks.
pub const EXISTENCE_TEMPLATE: &str = "SELECT * FROM users WHERE username = '{0}'";

/// The injectable endpoints of the lab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Login form.
    Authentication,
    /// Blog search, errors hidden.
    UnionSearch,
    /// Blog search, errors exposed.
    ErrorSearch,
    /// Username lookup answering found / not found.
    BooleanExistence,
    /// Username lookup with execution time measured.
    TimingExistence,
    /// Blog search framed as the pivot towards code execution.
    EscalationSearch,
}

impl Endpoint {
    /// All endpoints, in route order.
    pub const ALL: [Endpoint; 6] = [
        Endpoint::Authentication,
        Endpoint::UnionSearch,
        Endpoint::ErrorSearch,
        Endpoint::BooleanExistence,
        Endpoint::TimingExistence,
        Endpoint::EscalationSearch,
    ];

    /// Query policy used by this endpoint.
    #[must_use]
    pub fn policy(self) -> QueryPolicy {
        match self {
            Endpoint::Authentication => QueryPolicy::new(AUTH_TEMPLATE, Success::NonEmpty),
            Endpoint::UnionSearch | Endpoint::ErrorSearch | Endpoint::EscalationSearch => {
                QueryPolicy::new(SEARCH_TEMPLATE, Success::AnyRows)
            }
            Endpoint::BooleanExistence => QueryPolicy::new(EXISTENCE_TEMPLATE, Success::NonEmpty),
            Endpoint::TimingExistence => {
                QueryPolicy::new(EXISTENCE_TEMPLATE, Success::NonEmptyTimed)
            }
        }
    }

    /// Disclosure policy this endpoint ships with.
    ///
    /// The escalation search may be reconfigured; see
    /// [`EscalationConfig::disclosure`](crate::config::EscalationConfig).
    #[must_use]
    pub fn default_disclosure(self) -> DisclosurePolicy {
        match self {
            Endpoint::Authentication | Endpoint::UnionSearch => DisclosurePolicy::Generic,
            Endpoint::ErrorSearch | Endpoint::EscalationSearch => DisclosurePolicy::Verbose,
            Endpoint::BooleanExistence | Endpoint::TimingExistence => DisclosurePolicy::Silent,
        }
    }

    /// Route path serving this endpoint.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Authentication => "/sqli/basic",
            Endpoint::UnionSearch => "/sqli/union",
            Endpoint::ErrorSearch => "/sqli/error",
            Endpoint::BooleanExistence => "/sqli/boolean",
            Endpoint::TimingExistence => "/sqli/time",
            Endpoint::EscalationSearch => "/sqli/rce",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Endpoint::Authentication => "authentication",
            Endpoint::UnionSearch => "union-search",
            Endpoint::ErrorSearch => "error-search",
            Endpoint::BooleanExistence => "boolean-existence",
            Endpoint::TimingExistence => "timing-existence",
            Endpoint::EscalationSearch => "escalation-search",
        };
        f.write_str(name)
    }
}

/// What a policy counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Success {
    /// At least one row.
    NonEmpty,
    /// Any row set, including an empty one.
    AnyRows,
    /// At least one row; wall time around execution is measured as well.
    NonEmptyTimed,
}

impl Success {
    /// Whether a result with `row_count` rows satisfies this criterion.
    #[must_use]
    pub fn is_met(self, row_count: usize) -> bool {
        match self {
            Success::AnyRows => true,
            Success::NonEmpty | Success::NonEmptyTimed => row_count > 0,
        }
    }

    /// Whether execution time is part of the observable result.
    #[must_use]
    pub fn is_timed(self) -> bool {
        matches!(self, Success::NonEmptyTimed)
    }
}

/// A query template with positional splice points `{0}`, `{1}`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPolicy {
    template: &'static str,
    success: Success,
}

impl QueryPolicy {
    /// Create a policy from a template and success criterion.
    #[must_use]
    pub const fn new(template: &'static str, success: Success) -> Self {
        Self { template, success }
    }

    /// The raw template text.
    #[must_use]
    pub fn template(&self) -> &'static str {
        self.template
    }

    /// The success criterion.
    #[must_use]
    pub fn success(&self) -> Success {
        self.success
    }

    /// Number of distinct splice points in the template.
    #[must_use]
    pub fn arity(&self) -> usize {
        let mut highest = None;
        for segment in segments(self.template) {
            if let Segment::Slot(index) = segment {
                highest = highest.max(Some(index));
            }
        }
        highest.map_or(0, |index| index + 1)
    }

    /// Splice `inputs` into the template verbatim.
    ///
    /// The template is scanned once, so input that happens to contain
    /// `{0}` is copied through untouched. A slot without a matching input
    /// is left empty.
    #[must_use]
    pub fn build(&self, inputs: &[&str]) -> String {
        debug_assert_eq!(inputs.len(), self.arity(), "input count must match template");

        let extra: usize = inputs.iter().map(|input| input.len()).sum();
        let mut query = String::with_capacity(self.template.len() + extra);
        for segment in segments(self.template) {
            match segment {
                Segment::Text(text) => query.push_str(text),
                Segment::Slot(index) => {
                    if let Some(input) = inputs.get(index) {
                        query.push_str(input);
                    }
                }
            }
        }
        query
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Slot(usize),
}

/// Split a template into literal text and `{n}` slots.
fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let slot = after
            .find('}')
            .and_then(|close| after[..close].parse::<usize>().ok().map(|n| (n, close)));

        match slot {
            Some((index, close)) => {
                if open > 0 {
                    out.push(Segment::Text(&rest[..open]));
                }
                out.push(Segment::Slot(index));
                rest = &after[close + 1..];
            }
            None => {
                // Not a slot; keep the brace as text.
                out.push(Segment::Text(&rest[..=open]));
                rest = after;
            }
        }
    }

    if !rest.is_empty() {
        out.push(Segment::Text(rest));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_splices_both_fields() {
        let query = Endpoint::Authentication.policy().build(&["alice", "secret"]);
        assert_eq!(
            query,
            "SELECT * FROM users WHERE username = 'alice' AND password = 'secret'"
        );
    }

    #[test]
    fn auth_tautology_survives_verbatim() {
        let query = Endpoint::Authentication
            .policy()
            .build(&["admin' --", "x"]);
        assert_eq!(
            query,
            "SELECT * FROM users WHERE username = 'admin' --' AND password = 'x'"
        );
    }

    #[test]
    fn search_endpoints_share_template() {
        let union = Endpoint::UnionSearch.policy();
        assert_eq!(Endpoint::ErrorSearch.policy(), union);
        assert_eq!(Endpoint::EscalationSearch.policy(), union);
        assert_eq!(
            union.build(&["Docker"]),
            "SELECT title, author_name FROM blogs WHERE title LIKE '%Docker%'"
        );
    }

    #[test]
    fn existence_endpoints_share_template() {
        let boolean = Endpoint::BooleanExistence.policy();
        let timing = Endpoint::TimingExistence.policy();
        assert_eq!(boolean.template(), timing.template());
        assert!(!boolean.success().is_timed());
        assert!(timing.success().is_timed());
    }

    #[test]
    fn placeholder_in_input_is_not_reexpanded() {
        let query = Endpoint::Authentication.policy().build(&["{1}", "pw"]);
        assert!(query.contains("username = '{1}'"));
        assert!(query.contains("password = 'pw'"));
    }

    #[test]
    fn arity_counts_slots() {
        assert_eq!(Endpoint::Authentication.policy().arity(), 2);
        assert_eq!(Endpoint::UnionSearch.policy().arity(), 1);
        assert_eq!(QueryPolicy::new("SELECT 1", Success::AnyRows).arity(), 0);
    }

    #[test]
    fn non_slot_braces_are_text() {
        let policy = QueryPolicy::new("SELECT '{x}' || '{0}'", Success::AnyRows);
        assert_eq!(policy.build(&["y"]), "SELECT '{x}' || 'y'");
    }

    #[test]
    fn success_criteria() {
        assert!(Success::AnyRows.is_met(0));
        assert!(!Success::NonEmpty.is_met(0));
        assert!(Success::NonEmpty.is_met(2));
        assert!(Success::NonEmptyTimed.is_met(1));
    }

    #[test]
    fn default_disclosure_per_endpoint() {
        assert_eq!(
            Endpoint::Authentication.default_disclosure(),
            DisclosurePolicy::Generic
        );
        assert_eq!(
            Endpoint::UnionSearch.default_disclosure(),
            DisclosurePolicy::Generic
        );
        assert_eq!(
            Endpoint::ErrorSearch.default_disclosure(),
            DisclosurePolicy::Verbose
        );
        assert_eq!(
            Endpoint::BooleanExistence.default_disclosure(),
            DisclosurePolicy::Silent
        );
        assert_eq!(
            Endpoint::TimingExistence.default_disclosure(),
            DisclosurePolicy::Silent
        );
    }
}
