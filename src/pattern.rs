// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// The pattern tree.
//
// A Pattern describes the shape a payload Value must satisfy. Trees are
// built once when a specification loads and are then read-only; every
// operation here is a pure function of (pattern, value, resolver). The
// interesting operations live in three places: structural matching below,
// compatibility checking in `encompass`, and example synthesis in
// `generate`.

pub mod encompass;
pub mod generate;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::resolver::Resolver;
use crate::result::{Failure, MatchResult};
use crate::value::Value;
use crate::xml::XmlNode;

/// A `"..."` key marks an open schema: undeclared keys are permitted and
/// not individually typed.
pub const WILDCARD_KEY: &str = "...";

pub fn is_optional_key(key: &str) -> bool {
    key.ends_with('?')
}

pub fn strip_optionality(key: &str) -> &str {
    key.strip_suffix('?').unwrap_or(key)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// `(string)`, optionally `(string minLength N maxLength N)`.
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    /// `(number)`; length restrictions bound the digit count.
    Number {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Boolean,
    Null,
    /// Matches only the empty string. Under the scoped null binding the
    /// `(empty)` token widens to also accept explicit null.
    EmptyString,
    Anything,
    Date,
    DateTime,
    Uuid,
    Exact(Value),
    Object {
        entries: Arc<IndexMap<String, Pattern>>,
        type_alias: Option<Arc<str>>,
    },
    /// A JSON array declared positionally; a `(type*)` element consumes
    /// the remaining items.
    Tuple(Arc<Vec<Pattern>>),
    /// `(type*)`: any number of elements of one type.
    List(Arc<Pattern>),
    /// Inferred from a `[]` example; replaced by a concrete repeating
    /// type during convergence.
    EmptyList,
    /// `(dictionary keytype valuetype)`.
    Dictionary { key: Arc<Pattern>, value: Arc<Pattern> },
    /// A named reference like `(Customer)`, looked up in the resolver's
    /// registry at walk time.
    Deferred(Arc<str>),
    /// `(key:type)`: the value is sourced from an example row under
    /// `key` rather than from literal spec text.
    LookupRow { key: Arc<str>, inner: Arc<Pattern> },
    /// `(type in string)`: the value arrives rendered into a string.
    InString(Arc<Pattern>),
    AnyOf(Arc<Vec<Pattern>>),
    /// `(csv/type)`: comma-separated rendering of repeated values.
    Csv(Arc<Pattern>),
    Xml(Arc<XmlPattern>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlPattern {
    pub name: Arc<str>,
    pub attributes: IndexMap<String, Pattern>,
    pub children: Vec<Pattern>,
    pub type_alias: Option<Arc<str>>,
}

impl Pattern {
    pub fn string() -> Pattern {
        Pattern::String {
            min_length: None,
            max_length: None,
        }
    }

    pub fn string_with(min_length: Option<usize>, max_length: Option<usize>) -> Pattern {
        Pattern::String {
            min_length,
            max_length,
        }
    }

    pub fn number() -> Pattern {
        Pattern::Number {
            min_length: None,
            max_length: None,
        }
    }

    pub fn number_with(min_length: Option<usize>, max_length: Option<usize>) -> Pattern {
        Pattern::Number {
            min_length,
            max_length,
        }
    }

    pub fn boolean() -> Pattern {
        Pattern::Boolean
    }

    pub fn null() -> Pattern {
        Pattern::Null
    }

    pub fn empty_string() -> Pattern {
        Pattern::EmptyString
    }

    pub fn anything() -> Pattern {
        Pattern::Anything
    }

    pub fn date() -> Pattern {
        Pattern::Date
    }

    pub fn datetime() -> Pattern {
        Pattern::DateTime
    }

    pub fn uuid() -> Pattern {
        Pattern::Uuid
    }

    pub fn exact(value: Value) -> Pattern {
        Pattern::Exact(value)
    }

    pub fn object(entries: IndexMap<String, Pattern>) -> Pattern {
        Pattern::object_aliased(entries, None)
    }

    pub fn object_aliased(entries: IndexMap<String, Pattern>, alias: Option<&str>) -> Pattern {
        Pattern::Object {
            entries: Arc::new(entries),
            type_alias: alias.map(|a| a.trim_matches(['(', ')']).into()),
        }
    }

    pub fn tuple(elements: Vec<Pattern>) -> Pattern {
        Pattern::Tuple(Arc::new(elements))
    }

    pub fn list_of(element: Pattern) -> Pattern {
        Pattern::List(Arc::new(element))
    }

    pub fn empty_list() -> Pattern {
        Pattern::EmptyList
    }

    pub fn dictionary(key: Pattern, value: Pattern) -> Pattern {
        Pattern::Dictionary {
            key: Arc::new(key),
            value: Arc::new(value),
        }
    }

    pub fn deferred(token: &str) -> Pattern {
        Pattern::Deferred(token.into())
    }

    pub fn lookup_row(key: &str, inner: Pattern) -> Pattern {
        Pattern::LookupRow {
            key: key.into(),
            inner: Arc::new(inner),
        }
    }

    pub fn in_string(inner: Pattern) -> Pattern {
        Pattern::InString(Arc::new(inner))
    }

    pub fn any_of(variants: Vec<Pattern>) -> Pattern {
        Pattern::AnyOf(Arc::new(variants))
    }

    pub fn csv_of(element: Pattern) -> Pattern {
        Pattern::Csv(Arc::new(element))
    }

    pub fn xml(node: XmlPattern) -> Pattern {
        Pattern::Xml(Arc::new(node))
    }

    /// `(T?)`: the empty token or a T. The `(empty)` reference stays
    /// deferred so the scoped null binding can widen it per walk.
    pub fn optional(inner: Pattern) -> Pattern {
        Pattern::any_of(vec![Pattern::deferred("(empty)"), inner])
    }

    /// The concrete side of an `(T?)` union, if this is one.
    pub fn as_optional_inner(&self) -> Option<&Pattern> {
        match self {
            Pattern::AnyOf(variants) => match variants.as_slice() {
                [Pattern::Deferred(token), inner] if token.as_ref() == "(empty)" => Some(inner),
                _ => None,
            },
            _ => None,
        }
    }

    /// A pattern for exactly this XML node shape: attributes exact, text
    /// children through embedded-token resolution, elements recursive.
    pub fn xml_of(node: &XmlNode) -> Pattern {
        let attributes = node
            .attributes
            .iter()
            .map(|(name, text)| (name.clone(), Pattern::exact(Value::from(text.as_str()))))
            .collect();
        let children = node
            .children
            .iter()
            .map(|child| match child {
                Value::Xml(nested) => Pattern::xml_of(nested),
                other => other.exact_match_else_type(),
            })
            .collect();
        Pattern::Xml(Arc::new(XmlPattern {
            name: Arc::clone(&node.name),
            attributes,
            children,
            type_alias: None,
        }))
    }

    /// The token text for this pattern. For built-in, list, optional and
    /// dictionary forms this parses back to an equivalent pattern.
    pub fn type_name(&self) -> String {
        match self {
            Pattern::String {
                min_length,
                max_length,
            } => restricted_token("string", *min_length, *max_length),
            Pattern::Number {
                min_length,
                max_length,
            } => restricted_token("number", *min_length, *max_length),
            Pattern::Boolean => "(boolean)".into(),
            Pattern::Null => "(null)".into(),
            Pattern::EmptyString => "(empty)".into(),
            Pattern::Anything => "(anyvalue)".into(),
            Pattern::Date => "(date)".into(),
            Pattern::DateTime => "(datetime)".into(),
            Pattern::Uuid => "(uuid)".into(),
            Pattern::Exact(value) => value.displayable(),
            Pattern::Object { type_alias, .. } => match type_alias {
                Some(alias) => format!("({alias})"),
                None => "(object)".into(),
            },
            Pattern::Tuple(_) => "(list)".into(),
            Pattern::List(element) => format!("({}*)", token_body(element)),
            Pattern::EmptyList => "(emptylist)".into(),
            Pattern::Dictionary { key, value } => {
                format!("(dictionary {} {})", token_body(key), token_body(value))
            }
            Pattern::Deferred(token) => token.to_string(),
            Pattern::LookupRow { key, inner } => format!("({key}:{})", token_body(inner)),
            Pattern::InString(inner) => format!("({} in string)", token_body(inner)),
            Pattern::AnyOf(variants) => match self.as_optional_inner() {
                Some(inner) => format!("({}?)", token_body(inner)),
                None => {
                    let bodies: Vec<String> =
                        variants.iter().map(|v| token_body(v).to_string()).collect();
                    format!("({})", bodies.join(" or "))
                }
            },
            Pattern::Csv(element) => format!("(csv/{})", token_body(element)),
            Pattern::Xml(node) => match &node.type_alias {
                Some(alias) => format!("({alias})"),
                None => format!("({})", node.name),
            },
        }
    }

    /// Structural match. Failures aggregate across fields — matching never
    /// stops at the first mismatch — and each carries its breadcrumb.
    pub fn matches(&self, value: &Value, resolver: &Resolver) -> MatchResult {
        match self {
            Pattern::String {
                min_length,
                max_length,
            } => match value.as_str() {
                Some(text) => check_length("string", text.len(), *min_length, *max_length, value, resolver),
                None => mismatch("string", value, resolver),
            },
            Pattern::Number {
                min_length,
                max_length,
            } => match value {
                Value::Number(n) => {
                    let digits = n.to_literal().trim_start_matches('-').len();
                    check_length("number", digits, *min_length, *max_length, value, resolver)
                }
                _ => mismatch("number", value, resolver),
            },
            Pattern::Boolean => match value {
                Value::Bool(_) => MatchResult::Success,
                _ => mismatch("boolean", value, resolver),
            },
            Pattern::Null => match value {
                Value::Null => MatchResult::Success,
                _ => mismatch("null", value, resolver),
            },
            Pattern::EmptyString => match value.as_str() {
                Some("") => MatchResult::Success,
                _ => mismatch("empty string", value, resolver),
            },
            Pattern::Anything => MatchResult::Success,
            Pattern::Date => match value.as_str() {
                Some(text) if chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok() => {
                    MatchResult::Success
                }
                _ => mismatch("date in YYYY-MM-DD format", value, resolver),
            },
            Pattern::DateTime => match value.as_str() {
                Some(text) if chrono::DateTime::parse_from_rfc3339(text).is_ok() => {
                    MatchResult::Success
                }
                _ => mismatch("RFC3339 datetime", value, resolver),
            },
            Pattern::Uuid => match value.as_str() {
                Some(text) if uuid::Uuid::parse_str(text).is_ok() => MatchResult::Success,
                _ => mismatch("uuid", value, resolver),
            },
            Pattern::Exact(expected) => {
                if expected == value {
                    MatchResult::Success
                } else {
                    mismatch(&expected.displayable(), value, resolver)
                }
            }
            Pattern::Object { entries, .. } => self.matches_object(entries, value, resolver),
            Pattern::Tuple(elements) => match value.as_array() {
                Some(items) => match_positional(elements, items, resolver),
                None => mismatch("json array", value, resolver),
            },
            Pattern::List(element) => match value.as_array() {
                Some(items) => {
                    let element_resolver = resolver.with_fresh_walk();
                    MatchResult::from_results(items.iter().enumerate().map(|(index, item)| {
                        element
                            .matches(item, &element_resolver)
                            .breadcrumb(&format!("[{index}]"))
                    }))
                }
                None => mismatch("json array", value, resolver),
            },
            Pattern::EmptyList => match value.as_array() {
                Some(items) if items.is_empty() => MatchResult::Success,
                Some(_) => MatchResult::failure("Expected an empty array"),
                None => mismatch("empty array", value, resolver),
            },
            Pattern::Dictionary { key, value: entry } => match value.as_object() {
                Some(fields) => {
                    let entry_resolver = resolver.with_fresh_walk();
                    MatchResult::from_results(fields.iter().flat_map(|(name, field)| {
                        [
                            matches_text(key, name, &entry_resolver).breadcrumb(name),
                            entry.matches(field, &entry_resolver).breadcrumb(name),
                        ]
                    }))
                }
                None => mismatch("json object", value, resolver),
            },
            // The marker trips only if the same name is re-expanded without
            // descending into a child value; composite arms clear markers on
            // descent, so finite values always match recursive types.
            Pattern::Deferred(token) => match resolver.resolve_type(token) {
                Ok(resolved) => match resolver.with_cycle_marker(token) {
                    Ok(marked) => resolved.matches(value, &marked),
                    Err(failure) => MatchResult::Failure(failure),
                },
                Err(failure) => MatchResult::Failure(failure),
            },
            Pattern::LookupRow { inner, .. } => inner.matches(value, resolver),
            Pattern::InString(inner) => match value.as_str() {
                Some(text) => matches_text(inner, text, resolver),
                None => mismatch("string", value, resolver),
            },
            Pattern::AnyOf(variants) => match_any(variants, value, resolver, |variant| {
                variant.matches(value, resolver)
            }),
            Pattern::Csv(element) => match value.as_str() {
                Some("") => MatchResult::Success,
                Some(text) => {
                    MatchResult::from_results(text.split(',').enumerate().map(|(index, part)| {
                        matches_text(element, part, resolver).breadcrumb(&format!("[{index}]"))
                    }))
                }
                None => mismatch("comma-separated string", value, resolver),
            },
            Pattern::Xml(node) => match value {
                Value::Xml(actual) => match_xml(node, actual, resolver),
                _ => mismatch("xml node", value, resolver),
            },
        }
    }

    fn matches_object(
        &self,
        entries: &IndexMap<String, Pattern>,
        value: &Value,
        resolver: &Resolver,
    ) -> MatchResult {
        let fields = match value.as_object() {
            Some(fields) => fields,
            None => return mismatch("json object", value, resolver),
        };

        let mut results: Vec<MatchResult> = resolver
            .find_key_error_list(entries, fields)
            .into_iter()
            .map(MatchResult::Failure)
            .collect();

        // Declared nullable fields may hold an explicit null within this
        // walk, without loosening the caller's resolver.
        let field_resolver = resolver.with_fresh_walk().with_null_type();

        for (key, pattern) in entries {
            if key == WILDCARD_KEY {
                continue;
            }
            let name = strip_optionality(key);
            if let Some(field) = fields.get(name) {
                results.push(pattern.matches(field, &field_resolver).breadcrumb(name));
            }
        }

        MatchResult::from_results(results)
    }
}

fn restricted_token(base: &str, min_length: Option<usize>, max_length: Option<usize>) -> String {
    let mut token = base.to_string();
    if let Some(min) = min_length {
        token.push_str(&format!(" minLength {min}"));
    }
    if let Some(max) = max_length {
        token.push_str(&format!(" maxLength {max}"));
    }
    format!("({token})")
}

pub(crate) fn token_body(pattern: &Pattern) -> String {
    let token = pattern.type_name();
    token
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(&token)
        .to_string()
}

fn mismatch(expected: &str, actual: &Value, resolver: &Resolver) -> MatchResult {
    MatchResult::failure(resolver.messages().mismatch(expected, actual))
}

fn check_length(
    kind: &str,
    actual_length: usize,
    min_length: Option<usize>,
    max_length: Option<usize>,
    value: &Value,
    resolver: &Resolver,
) -> MatchResult {
    if let Some(min) = min_length {
        if actual_length < min {
            return mismatch(&format!("{kind} with minLength {min}"), value, resolver);
        }
    }
    if let Some(max) = max_length {
        if actual_length > max {
            return mismatch(&format!("{kind} with maxLength {max}"), value, resolver);
        }
    }
    MatchResult::Success
}

/// First matching variant wins; when none match, every variant's failure is
/// reported under one header.
fn match_any<F>(variants: &[Pattern], value: &Value, resolver: &Resolver, try_variant: F) -> MatchResult
where
    F: Fn(&Pattern) -> MatchResult,
{
    let mut failures = vec![];
    for variant in variants {
        match try_variant(variant) {
            MatchResult::Success => return MatchResult::Success,
            MatchResult::Failure(failure) => failures.push(failure),
        }
    }
    let names: Vec<String> = variants.iter().map(Pattern::type_name).collect();
    MatchResult::Failure(Failure {
        causes: failures,
        ..Failure::new(format!(
            "Expected {}, actual was {}",
            names.join(" or "),
            value.displayable()
        ))
    })
}

/// Match text that carries a rendered scalar: numbers and booleans are
/// reinterpreted before matching, so `(number)` accepts `"42"` inside
/// strings, CSV parts, XML text and dictionary keys.
pub(crate) fn matches_text(pattern: &Pattern, text: &str, resolver: &Resolver) -> MatchResult {
    match pattern {
        Pattern::Deferred(token) => match resolver.resolve_type(token) {
            Ok(resolved) => match resolver.with_cycle_marker(token) {
                Ok(marked) => matches_text(&resolved, text, &marked),
                Err(failure) => MatchResult::Failure(failure),
            },
            Err(failure) => MatchResult::Failure(failure),
        },
        Pattern::LookupRow { inner, .. } | Pattern::InString(inner) => {
            matches_text(inner, text, resolver)
        }
        Pattern::AnyOf(variants) => {
            match_any(variants, &Value::from(text), resolver, |variant| {
                matches_text(variant, text, resolver)
            })
        }
        Pattern::Number { .. } => match text.parse::<crate::number::Number>() {
            Ok(number) => pattern.matches(&Value::Number(number), resolver),
            Err(_) => pattern.matches(&Value::from(text), resolver),
        },
        Pattern::Boolean => match text {
            "true" => MatchResult::Success,
            "false" => MatchResult::Success,
            _ => pattern.matches(&Value::from(text), resolver),
        },
        Pattern::Null if text == "null" => MatchResult::Success,
        _ => pattern.matches(&Value::from(text), resolver),
    }
}

fn match_positional(patterns: &[Pattern], items: &[Value], resolver: &Resolver) -> MatchResult {
    let resolver = resolver.with_fresh_walk();
    let resolver = &resolver;
    let mut results = vec![];
    let mut item_index = 0;

    for pattern in patterns {
        if let Pattern::List(element) = pattern {
            while item_index < items.len() {
                results.push(
                    element
                        .matches(&items[item_index], resolver)
                        .breadcrumb(&format!("[{item_index}]")),
                );
                item_index += 1;
            }
            continue;
        }
        match items.get(item_index) {
            Some(item) => {
                results.push(
                    pattern
                        .matches(item, resolver)
                        .breadcrumb(&format!("[{item_index}]")),
                );
                item_index += 1;
            }
            None => {
                results.push(MatchResult::failure(format!(
                    "Expected an array of length {}, actual length {}",
                    patterns.len(),
                    items.len()
                )));
                return MatchResult::from_results(results);
            }
        }
    }

    if item_index < items.len() {
        results.push(MatchResult::failure(format!(
            "Array contained {} items, expected {}",
            items.len(),
            patterns.len()
        )));
    }
    MatchResult::from_results(results)
}

fn match_xml(pattern: &XmlPattern, actual: &XmlNode, resolver: &Resolver) -> MatchResult {
    if pattern.name != actual.name {
        return MatchResult::failure(format!(
            "Expected element <{}>, actual was <{}>",
            pattern.name, actual.name
        ));
    }

    let mut results = vec![];
    for (name, attribute) in &pattern.attributes {
        match actual.attributes.get(name) {
            Some(text) => results.push(matches_text(attribute, text, resolver).breadcrumb(name)),
            None => results.push(MatchResult::Failure(
                Failure::new(resolver.messages().expected_key_was_missing(name)).breadcrumb(name),
            )),
        }
    }

    let crumb: &str = &pattern.name;
    results.push(match_xml_children(pattern, actual, resolver).breadcrumb(crumb));
    MatchResult::from_results(results)
}

fn match_xml_children(pattern: &XmlPattern, actual: &XmlNode, resolver: &Resolver) -> MatchResult {
    let resolver = resolver.with_fresh_walk();
    let resolver = &resolver;
    let mut results = vec![];
    let mut child_index = 0;

    for declared in &pattern.children {
        if let Pattern::List(element) = declared {
            while child_index < actual.children.len() {
                results.push(match_xml_child(
                    element,
                    &actual.children[child_index],
                    resolver,
                ));
                child_index += 1;
            }
            continue;
        }
        match actual.children.get(child_index) {
            Some(child) => {
                results.push(match_xml_child(declared, child, resolver));
                child_index += 1;
            }
            None => {
                // An optional or empty-capable declared child may be
                // entirely absent in the document.
                results.push(matches_text(declared, "", resolver));
            }
        }
    }

    if child_index < actual.children.len() {
        results.push(MatchResult::failure(format!(
            "Element <{}> contained {} children, expected {}",
            pattern.name,
            actual.children.len(),
            pattern.children.len()
        )));
    }
    MatchResult::from_results(results)
}

fn match_xml_child(pattern: &Pattern, child: &Value, resolver: &Resolver) -> MatchResult {
    match child {
        Value::String(text) | Value::Cdata(text) => matches_text(pattern, text, resolver),
        other => pattern.matches(other, resolver),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parsed_pattern;
    use serde_json::json;

    fn matches_json(pattern_text: &str, value: serde_json::Value) -> MatchResult {
        let pattern = parsed_pattern(pattern_text, None, None).unwrap();
        pattern.matches(&Value::from(value), &Resolver::new())
    }

    #[test]
    fn scalars_match_their_kinds() {
        assert!(matches_json("(number)", json!(42)).is_success());
        assert!(!matches_json("(number)", json!("42")).is_success());
        assert!(matches_json("(string)", json!("hello")).is_success());
        assert!(matches_json("(boolean)", json!(true)).is_success());
        assert!(matches_json("(null)", json!(null)).is_success());
    }

    #[test]
    fn optional_token_accepts_empty_and_value() {
        assert!(matches_json("(number?)", json!("")).is_success());
        assert!(matches_json("(number?)", json!(42)).is_success());
        assert!(!matches_json("(number?)", json!("x")).is_success());
    }

    #[test]
    fn object_reports_every_field_mismatch_with_breadcrumbs() {
        let result = matches_json(
            r#"{"id": "(number)", "name": "(string)"}"#,
            json!({"id": "abc", "name": 7}),
        );
        let report = result.into_failure().unwrap().report();
        assert!(report.contains(">> id"), "{report}");
        assert!(report.contains(">> name"), "{report}");
    }

    #[test]
    fn missing_required_key_fails_with_breadcrumb() {
        let result = matches_json(r#"{"id": "(number)", "name?": "(string)"}"#, json!({"name": "x"}));
        let failure = result.into_failure().unwrap();
        let report = failure.report();
        assert!(report.contains(">> id"), "{report}");
        assert!(matches_json(r#"{"id": "(number)", "name?": "(string)"}"#, json!({"id": 1}))
            .is_success());
    }

    #[test]
    fn unexpected_key_policy_validate_vs_ignore() {
        let pattern = parsed_pattern(r#"{"id": "(number)"}"#, None, None).unwrap();
        let value = Value::from(json!({"id": 1, "extra": true}));

        let strict = Resolver::new();
        let report = pattern
            .matches(&value, &strict)
            .into_failure()
            .unwrap()
            .report();
        assert!(report.contains("extra"), "{report}");

        let lenient = strict.with_unexpected_keys_ignored();
        assert!(pattern.matches(&value, &lenient).is_success());
    }

    #[test]
    fn wildcard_key_opens_the_schema() {
        assert!(matches_json(
            r#"{"id": "(number)", "...": ""}"#,
            json!({"id": 1, "anything": [1, 2], "more": "x"}),
        )
        .is_success());
    }

    #[test]
    fn nullable_field_takes_explicit_null_inside_objects() {
        assert!(matches_json(r#"{"age": "(number?)"}"#, json!({"age": null})).is_success());
        assert!(!matches_json("(number?)", json!(null)).is_success());
    }

    #[test]
    fn list_pattern_checks_each_element() {
        assert!(matches_json("(number*)", json!([1, 2, 3])).is_success());
        let report = matches_json("(number*)", json!([1, "x", 3]))
            .into_failure()
            .unwrap()
            .report();
        assert!(report.contains("[1]"), "{report}");
    }

    #[test]
    fn tuple_with_trailing_list_consumes_the_rest() {
        assert!(matches_json(r#"["(string)", "(number*)"]"#, json!(["id", 1, 2, 3])).is_success());
        assert!(!matches_json(r#"["(string)", "(number*)"]"#, json!(["id", 1, "x"])).is_success());
    }

    #[test]
    fn dictionary_checks_keys_and_values() {
        assert!(matches_json("(dictionary string number)", json!({"a": 1, "b": 2})).is_success());
        let report = matches_json("(dictionary string number)", json!({"a": "x"}))
            .into_failure()
            .unwrap()
            .report();
        assert!(report.contains(">> a"), "{report}");
    }

    #[test]
    fn in_string_reinterprets_the_scalar() {
        assert!(matches_json("(number in string)", json!("42")).is_success());
        assert!(!matches_json("(number in string)", json!("4x2")).is_success());
        assert!(!matches_json("(number in string)", json!(42)).is_success());
    }

    #[test]
    fn csv_matches_each_part() {
        assert!(matches_json("(csv/number)", json!("1,2,3")).is_success());
        let report = matches_json("(csv/number)", json!("1,x,3"))
            .into_failure()
            .unwrap()
            .report();
        assert!(report.contains("[1]"), "{report}");
    }

    #[test]
    fn deferred_names_resolve_through_the_registry() {
        let types = crate::resolver::registry_from_tokens([("(Customer)", r#"{"id": "(number)"}"#)])
            .unwrap();
        let resolver = Resolver::with_types(types).unwrap();
        let pattern = parsed_pattern("(Customer)", None, None).unwrap();
        assert!(pattern
            .matches(&Value::from(json!({"id": 7})), &resolver)
            .is_success());

        let unregistered = Resolver::new();
        let failure = pattern
            .matches(&Value::from(json!({"id": 7})), &unregistered)
            .into_failure()
            .unwrap();
        assert!(failure.message.contains("(Customer)"), "{}", failure.message);
    }

    #[test]
    fn exact_values_match_only_themselves() {
        assert!(matches_json("sold", json!("sold")).is_success());
        assert!(!matches_json("sold", json!("pending")).is_success());
    }

    #[test]
    fn format_scalars_validate_their_format() {
        assert!(matches_json("(date)", json!("2024-02-29")).is_success());
        assert!(!matches_json("(date)", json!("29/02/2024")).is_success());
        assert!(matches_json("(datetime)", json!("2024-02-29T10:15:30Z")).is_success());
        assert!(matches_json("(uuid)", json!("8f9d4a4e-7a2b-4f0a-9b1e-3c5d6e7f8a9b")).is_success());
    }

    #[test]
    fn xml_pattern_matches_document_structure() {
        let pattern = parsed_pattern(
            r#"<person id="(number)"><name>(string)</name></person>"#,
            None,
            None,
        )
        .unwrap();
        let resolver = Resolver::new();

        let good = Value::from_xml_str(r#"<person id="10"><name>Jill</name></person>"#).unwrap();
        assert!(pattern.matches(&good, &resolver).is_success());

        let bad = Value::from_xml_str(r#"<person id="ten"><name>Jill</name></person>"#).unwrap();
        let report = pattern.matches(&bad, &resolver).into_failure().unwrap().report();
        assert!(report.contains(">> id"), "{report}");
    }

    #[test]
    fn token_text_round_trips() {
        for token in [
            "(number)",
            "(string)",
            "(boolean)",
            "(number*)",
            "(number?)",
            "(dictionary string number)",
            "(string minLength 3 maxLength 10)",
            "(csv/number)",
            "(number in string)",
        ] {
            let pattern = parsed_pattern(token, None, None).unwrap();
            let reparsed = parsed_pattern(&pattern.type_name(), None, None).unwrap();
            assert_eq!(pattern, reparsed, "{token}");
        }
    }
}
