// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Match outcomes.
//
// Conformance is data, not control flow: matching returns `MatchResult`
// values and never bubbles errors, so callers can aggregate, annotate and
// render every mismatch in one pass. Breadcrumbs compose root-to-leaf as
// results propagate back up the pattern tree.

use core::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Success,
    Failure(Failure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    /// Path from the root of the matched value to the mismatch, e.g.
    /// `["address", "pincodes", "[2]"]`.
    pub breadcrumbs: Vec<Arc<str>>,
    /// Nested causes; non-empty when several field mismatches were
    /// aggregated or a deeper failure was wrapped.
    pub causes: Vec<Failure>,
    /// A tolerable mismatch (e.g. an unexpected key under a lenient
    /// policy); reported but distinguishable from hard mismatches.
    pub partial: bool,
}

impl MatchResult {
    pub fn failure(message: impl Into<String>) -> MatchResult {
        MatchResult::Failure(Failure::new(message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MatchResult::Success)
    }

    /// Prepend a path element if this is a failure.
    pub fn breadcrumb(self, crumb: &str) -> MatchResult {
        match self {
            MatchResult::Success => MatchResult::Success,
            MatchResult::Failure(failure) => MatchResult::Failure(failure.breadcrumb(crumb)),
        }
    }

    /// Collapse many results into one: Success when all succeed, otherwise
    /// a single failure aggregating every constituent failure.
    pub fn from_results<I: IntoIterator<Item = MatchResult>>(results: I) -> MatchResult {
        let failures: Vec<Failure> = results
            .into_iter()
            .filter_map(|result| match result {
                MatchResult::Success => None,
                MatchResult::Failure(failure) => Some(failure),
            })
            .collect();
        MatchResult::from_failures(failures)
    }

    pub fn from_failures(failures: Vec<Failure>) -> MatchResult {
        match failures.len() {
            0 => MatchResult::Success,
            1 => MatchResult::Failure(failures.into_iter().next().unwrap_or_else(|| {
                Failure::new("internal: missing failure")
            })),
            _ => MatchResult::Failure(Failure {
                message: String::new(),
                breadcrumbs: vec![],
                causes: failures,
                partial: false,
            }),
        }
    }

    pub fn into_failure(self) -> Option<Failure> {
        match self {
            MatchResult::Success => None,
            MatchResult::Failure(failure) => Some(failure),
        }
    }
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Failure {
        Failure {
            message: message.into(),
            breadcrumbs: vec![],
            causes: vec![],
            partial: false,
        }
    }

    pub fn partial(message: impl Into<String>) -> Failure {
        Failure {
            partial: true,
            ..Failure::new(message)
        }
    }

    pub fn with_cause(message: impl Into<String>, cause: Failure) -> Failure {
        Failure {
            causes: vec![cause],
            ..Failure::new(message)
        }
    }

    pub fn breadcrumb(mut self, crumb: &str) -> Failure {
        self.breadcrumbs.insert(0, crumb.into());
        self
    }

    pub fn breadcrumb_path(&self) -> String {
        join_crumbs(&self.breadcrumbs)
    }

    /// Leaf messages with their full root-to-leaf paths.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = vec![];
        self.collect_into("", &mut out);
        out
    }

    fn collect_into(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        let path = join_under(prefix, &self.breadcrumbs);
        if self.causes.is_empty() {
            out.push((path, self.message.clone()));
            return;
        }
        if !self.message.is_empty() {
            out.push((path.clone(), self.message.clone()));
        }
        for cause in &self.causes {
            cause.collect_into(&path, out);
        }
    }

    /// Human-readable report, one `>> path` header per problem.
    pub fn report(&self) -> String {
        let mut out = String::new();
        for (path, message) in self.flatten() {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            if path.is_empty() {
                out.push_str(&message);
            } else {
                out.push_str(">> ");
                out.push_str(&path);
                out.push('\n');
                out.push_str(&message);
            }
        }
        out
    }
}

fn join_crumbs(crumbs: &[Arc<str>]) -> String {
    let mut out = String::new();
    for crumb in crumbs {
        if !out.is_empty() && !crumb.starts_with('[') {
            out.push('.');
        }
        out.push_str(crumb);
    }
    out
}

fn join_under(prefix: &str, crumbs: &[Arc<str>]) -> String {
    let tail = join_crumbs(crumbs);
    match (prefix.is_empty(), tail.is_empty()) {
        (true, _) => tail,
        (false, true) => prefix.to_string(),
        (false, false) if tail.starts_with('[') => format!("{prefix}{tail}"),
        (false, false) => format!("{prefix}.{tail}"),
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}

impl std::error::Error for Failure {}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::Success => f.write_str("Success"),
            MatchResult::Failure(failure) => f.write_str(&failure.report()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breadcrumbs_compose_root_to_leaf() {
        let result = MatchResult::failure("expected number")
            .breadcrumb("id")
            .breadcrumb("customer");
        let failure = result.into_failure().unwrap();
        assert_eq!(failure.breadcrumb_path(), "customer.id");
    }

    #[test]
    fn index_crumbs_attach_without_dot() {
        let failure = Failure::new("boom").breadcrumb("[2]").breadcrumb("pincodes");
        assert_eq!(failure.breadcrumb_path(), "pincodes[2]");
    }

    #[test]
    fn aggregation_keeps_every_cause() {
        let result = MatchResult::from_results(vec![
            MatchResult::failure("first").breadcrumb("a"),
            MatchResult::Success,
            MatchResult::failure("second").breadcrumb("b"),
        ]);
        let report = result.into_failure().unwrap().report();
        assert!(report.contains(">> a"), "{report}");
        assert!(report.contains(">> b"), "{report}");
    }

    #[test]
    fn nested_causes_extend_the_path() {
        let inner = Failure::new("expected string").breadcrumb("name");
        let outer = Failure {
            causes: vec![inner],
            ..Failure::new(String::new())
        }
        .breadcrumb("customer");
        let flattened = outer.flatten();
        assert_eq!(flattened.len(), 1);
        assert_eq!(flattened[0].0, "customer.name");
    }
}
