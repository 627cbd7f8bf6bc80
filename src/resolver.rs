// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Per-match context.
//
// A Resolver carries everything a single matching walk needs besides the
// pattern and the value: the name registry for deferred types, the
// unexpected-key policy, the mismatch-message strategy, and the set of
// type names currently being expanded (the cycle guard). Every `with_*`
// operation returns a new Resolver, so a narrowed context never leaks back
// to the caller. The registry sits behind Arc, making those copies cheap.

use core::fmt;
use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::grammar;
use crate::pattern::{is_optional_key, strip_optionality, Pattern, WILDCARD_KEY};
use crate::result::Failure;
use crate::value::Value;

/// What to do with keys the pattern does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnexpectedKeyCheck {
    #[default]
    Validate,
    Ignore,
}

/// Wording of mismatch reports. Swappable so embedders can phrase
/// request-side and response-side reports differently.
pub trait MismatchMessages {
    fn mismatch(&self, expected: &str, actual: &Value) -> String {
        format!("Expected {expected}, actual was {}", actual.displayable())
    }

    fn expected_key_was_missing(&self, key: &str) -> String {
        format!("Expected key named \"{key}\" was missing")
    }

    fn unexpected_key(&self, key: &str) -> String {
        format!("Key named \"{key}\" was unexpected")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DefaultMismatches;

impl MismatchMessages for DefaultMismatches {}

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("`{0}` is a built-in type and cannot be redefined")]
    BuiltinRedefined(String),
}

#[derive(Clone)]
pub struct Resolver {
    types: Arc<IndexMap<String, Pattern>>,
    unexpected_keys: UnexpectedKeyCheck,
    mismatches: Arc<dyn MismatchMessages>,
    in_progress: BTreeSet<Arc<str>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new()
    }
}

impl Resolver {
    pub fn new() -> Resolver {
        Resolver {
            types: Arc::new(IndexMap::new()),
            unexpected_keys: UnexpectedKeyCheck::default(),
            mismatches: Arc::new(DefaultMismatches),
            in_progress: BTreeSet::new(),
        }
    }

    /// A resolver whose registry is the given name→pattern table. Spec
    /// loaders own this table; it is validated against the built-ins.
    pub fn with_types(types: IndexMap<String, Pattern>) -> Result<Resolver, RegistryError> {
        for name in types.keys() {
            if grammar::builtin_pattern(name).is_some() {
                return Err(RegistryError::BuiltinRedefined(name.clone()));
            }
        }
        Ok(Resolver {
            types: Arc::new(types),
            ..Resolver::new()
        })
    }

    pub fn unexpected_keys(&self) -> UnexpectedKeyCheck {
        self.unexpected_keys
    }

    pub fn with_unexpected_keys(&self, check: UnexpectedKeyCheck) -> Resolver {
        Resolver {
            unexpected_keys: check,
            ..self.clone()
        }
    }

    pub fn with_unexpected_keys_ignored(&self) -> Resolver {
        self.with_unexpected_keys(UnexpectedKeyCheck::Ignore)
    }

    pub fn with_mismatch_messages(&self, mismatches: Arc<dyn MismatchMessages>) -> Resolver {
        Resolver {
            mismatches,
            ..self.clone()
        }
    }

    pub fn messages(&self) -> &dyn MismatchMessages {
        self.mismatches.as_ref()
    }

    /// Scoped null binding: inside composite matching, `(empty)` also
    /// accepts an explicit null, so a declared nullable field can be null
    /// without loosening anything outside this walk.
    pub fn with_null_type(&self) -> Resolver {
        let mut types = (*self.types).clone();
        types.insert(
            "(empty)".to_string(),
            Pattern::any_of(vec![Pattern::null(), Pattern::empty_string()]),
        );
        Resolver {
            types: Arc::new(types),
            ..self.clone()
        }
    }

    /// Look up a type token, registry first, then the built-in table.
    pub fn resolve_type(&self, token: &str) -> Result<Pattern, Failure> {
        if let Some(pattern) = self.types.get(token) {
            return Ok(pattern.clone());
        }
        let bare = token.trim_start_matches('(').trim_end_matches(')');
        if let Some(pattern) = self.types.get(bare) {
            return Ok(pattern.clone());
        }
        if let Some(pattern) = grammar::builtin_pattern(token) {
            return Ok(pattern);
        }
        Err(Failure::new(format!("Type {token} is not defined")))
    }

    /// Mark a named type as being expanded. Re-entering the same name in
    /// one walk means the schema refers to itself; that is reported as a
    /// failure rather than recursing without bound.
    pub fn with_cycle_marker(&self, token: &str) -> Result<Resolver, Failure> {
        if self.in_progress.contains(token) {
            return Err(Failure::new(format!(
                "Type {token} refers back to itself via the same path"
            )));
        }
        let mut in_progress = self.in_progress.clone();
        in_progress.insert(token.into());
        Ok(Resolver {
            in_progress,
            ..self.clone()
        })
    }

    /// Drop cycle markers. Called when a walk descends into a child value:
    /// structural progress was made, so re-expanding a name is legitimate.
    pub fn with_fresh_walk(&self) -> Resolver {
        Resolver {
            in_progress: BTreeSet::new(),
            ..self.clone()
        }
    }

    /// One pass over a composite's key sets: every missing required key and,
    /// under the validate policy, every undeclared key.
    pub fn find_key_error_list(
        &self,
        declared: &IndexMap<String, Pattern>,
        actual: &IndexMap<String, Value>,
    ) -> Vec<Failure> {
        let mut failures = vec![];

        for key in declared.keys() {
            if key == WILDCARD_KEY || is_optional_key(key) {
                continue;
            }
            if !actual.contains_key(key.as_str()) {
                failures.push(
                    Failure::new(self.messages().expected_key_was_missing(key)).breadcrumb(key),
                );
            }
        }

        let open = declared.contains_key(WILDCARD_KEY);
        if self.unexpected_keys == UnexpectedKeyCheck::Validate && !open {
            for key in actual.keys() {
                let declared_exactly = declared.contains_key(key.as_str());
                let declared_optional = declared.contains_key(&format!("{key}?"));
                if !declared_exactly && !declared_optional {
                    failures
                        .push(Failure::partial(self.messages().unexpected_key(key)).breadcrumb(key));
                }
            }
        }

        failures
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("unexpected_keys", &self.unexpected_keys)
            .field("in_progress", &self.in_progress)
            .finish()
    }
}

/// Convenience for tests and embedders: a registry from token text.
pub fn registry_from_tokens<'a, I>(entries: I) -> anyhow::Result<IndexMap<String, Pattern>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut types = IndexMap::new();
    for (name, token) in entries {
        let pattern = grammar::parsed_pattern(token, None, Some(strip_optionality(name)))?;
        types.insert(name.to_string(), pattern);
    }
    Ok(types)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup_falls_back_to_builtins() {
        let resolver = Resolver::new();
        assert_eq!(resolver.resolve_type("(number)").unwrap(), Pattern::number());
        assert!(resolver.resolve_type("(Customer)").is_err());
    }

    #[test]
    fn builtins_cannot_be_shadowed() {
        let mut types = IndexMap::new();
        types.insert("(number)".to_string(), Pattern::string());
        match Resolver::with_types(types) {
            Err(RegistryError::BuiltinRedefined(name)) => assert_eq!(name, "(number)"),
            other => panic!("Expected BuiltinRedefined, got {other:?}"),
        }
    }

    #[test]
    fn cycle_marker_trips_on_reentry() {
        let resolver = Resolver::new();
        let marked = resolver.with_cycle_marker("(Tree)").unwrap();
        let failure = marked.with_cycle_marker("(Tree)").unwrap_err();
        assert!(failure.message.contains("(Tree)"), "{}", failure.message);
    }

    #[test]
    fn policy_narrowing_does_not_leak() {
        let resolver = Resolver::new();
        let narrowed = resolver.with_unexpected_keys_ignored();
        assert_eq!(narrowed.unexpected_keys(), UnexpectedKeyCheck::Ignore);
        assert_eq!(resolver.unexpected_keys(), UnexpectedKeyCheck::Validate);
    }
}
