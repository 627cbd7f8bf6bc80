// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Example synthesis.
//
// `generate` produces one payload conforming to a pattern, for stubbed
// responses and test bodies. `new_based_on` produces pattern variants with
// exact values substituted from a row of named examples; the variants feed
// combinatorial test generation. Both expand deferred names through the
// resolver, so the cycle guard turns a self-referential required field
// into a reported failure instead of unbounded recursion; a
// self-referential optional field is simply dropped from the example.

use indexmap::IndexMap;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::number::Number;
use crate::pattern::{is_optional_key, matches_text, strip_optionality, Pattern, WILDCARD_KEY};
use crate::resolver::Resolver;
use crate::result::{Failure, MatchResult};
use crate::value::Value;
use crate::xml::XmlNode;

/// A table of named example values, as found in a spec's examples section.
/// Values are kept as written (text) and typed against the field pattern
/// when substituted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    entries: IndexMap<String, String>,
}

impl Row {
    pub fn new() -> Row {
        Row::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Row {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Pattern {
    /// Synthesize one value conforming to this pattern.
    pub fn generate(&self, resolver: &Resolver) -> Result<Value, Failure> {
        match self {
            Pattern::String {
                min_length,
                max_length,
            } => {
                let length = pick_length(*min_length, *max_length, 10);
                let text: String = thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(length)
                    .map(char::from)
                    .collect();
                Ok(Value::from(text))
            }
            Pattern::Number {
                min_length,
                max_length,
            } => {
                if min_length.is_none() && max_length.is_none() {
                    return Ok(Value::from(thread_rng().gen_range(1..1000_u64)));
                }
                let digits = pick_length(*min_length, *max_length, 3).clamp(1, 18);
                let digits = digits as u32;
                let low = if digits == 1 { 0 } else { 10_u64.pow(digits - 1) };
                let high = 10_u64.pow(digits);
                Ok(Value::from(thread_rng().gen_range(low..high)))
            }
            Pattern::Boolean => Ok(Value::Bool(thread_rng().gen_bool(0.5))),
            Pattern::Null => Ok(Value::Null),
            Pattern::EmptyString => Ok(Value::from("")),
            Pattern::Anything => {
                let text: String = thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(10)
                    .map(char::from)
                    .collect();
                Ok(Value::from(text))
            }
            Pattern::Date => Ok(Value::from(
                chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string(),
            )),
            Pattern::DateTime => Ok(Value::from(
                chrono::Utc::now()
                    .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            )),
            Pattern::Uuid => Ok(Value::from(uuid::Uuid::new_v4().to_string())),
            Pattern::Exact(value) => Ok(value.clone()),
            Pattern::Object { entries, .. } => generate_object(entries, resolver),
            Pattern::Tuple(elements) => {
                let mut items = vec![];
                for (index, element) in elements.iter().enumerate() {
                    if let Pattern::List(inner) = element {
                        for _ in 0..2 {
                            items.push(
                                inner
                                    .generate(resolver)
                                    .map_err(|f| f.breadcrumb(&format!("[{index}]")))?,
                            );
                        }
                        continue;
                    }
                    items.push(
                        element
                            .generate(resolver)
                            .map_err(|f| f.breadcrumb(&format!("[{index}]")))?,
                    );
                }
                Ok(Value::from(items))
            }
            Pattern::List(element) => {
                let count = thread_rng().gen_range(1..=3);
                let mut items = vec![];
                for index in 0..count {
                    items.push(
                        element
                            .generate(resolver)
                            .map_err(|f| f.breadcrumb(&format!("[{index}]")))?,
                    );
                }
                Ok(Value::from(items))
            }
            Pattern::EmptyList => Ok(Value::new_array()),
            Pattern::Dictionary { key, value } => {
                let mut fields = IndexMap::new();
                for _ in 0..2 {
                    let name = key.generate(resolver)?.to_string_literal();
                    let field = value.generate(resolver).map_err(|f| f.breadcrumb(&name))?;
                    fields.insert(name, field);
                }
                Ok(Value::from(fields))
            }
            Pattern::Deferred(token) => {
                let resolved = resolver.resolve_type(token)?;
                let marked = resolver.with_cycle_marker(token)?;
                resolved.generate(&marked)
            }
            Pattern::LookupRow { inner, .. } => inner.generate(resolver),
            Pattern::InString(inner) => {
                Ok(Value::from(inner.generate(resolver)?.to_string_literal()))
            }
            Pattern::AnyOf(variants) => {
                if let Some(inner) = self.as_optional_inner() {
                    return inner.generate(resolver);
                }
                let mut last_failure = Failure::new("union has no variants");
                for variant in variants.iter() {
                    match variant.generate(resolver) {
                        Ok(value) => return Ok(value),
                        Err(failure) => last_failure = failure,
                    }
                }
                Err(last_failure)
            }
            Pattern::Csv(element) => {
                let parts: Vec<String> = (0..2)
                    .map(|_| element.generate(resolver).map(|v| v.to_string_literal()))
                    .collect::<Result<_, _>>()?;
                Ok(Value::from(parts.join(",")))
            }
            Pattern::Xml(node) => Ok(Value::Xml(generate_xml(node, resolver)?.into())),
        }
    }

    /// Pattern variants with exact values substituted from `row`. Optional
    /// keys the row does not pin produce presence/absence variants; the
    /// result is the cartesian combination across keys.
    pub fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, Failure> {
        match self {
            Pattern::Object { entries, type_alias } => {
                let mut per_key: Vec<(String, Vec<Option<Pattern>>)> = vec![];
                for (key, pattern) in entries.iter() {
                    if key == WILDCARD_KEY {
                        per_key.push((key.clone(), vec![Some(pattern.clone())]));
                        continue;
                    }
                    let name = strip_optionality(key);
                    let mut candidates: Vec<Option<Pattern>> = vec![];
                    if let Some(text) = row.lookup(name) {
                        let value = row_value(pattern, text, resolver)
                            .map_err(|f| f.breadcrumb(name))?;
                        candidates.push(Some(Pattern::exact(value)));
                    } else {
                        for variant in pattern.new_based_on(row, resolver)? {
                            candidates.push(Some(variant));
                        }
                        if is_optional_key(key) {
                            candidates.push(None);
                        }
                    }
                    per_key.push((name.to_string(), candidates));
                }

                let mut variants = vec![IndexMap::new()];
                for (name, candidates) in per_key {
                    let mut next = vec![];
                    for variant in &variants {
                        for candidate in &candidates {
                            let mut entries: IndexMap<String, Pattern> = variant.clone();
                            if let Some(pattern) = candidate {
                                entries.insert(name.clone(), pattern.clone());
                            }
                            next.push(entries);
                        }
                    }
                    variants = next;
                }

                Ok(variants
                    .into_iter()
                    .map(|entries| Pattern::Object {
                        entries: entries.into(),
                        type_alias: type_alias.clone(),
                    })
                    .collect())
            }
            Pattern::List(element) => Ok(element
                .new_based_on(row, resolver)?
                .into_iter()
                .map(Pattern::list_of)
                .collect()),
            Pattern::Tuple(elements) => {
                let candidate_lists = elements
                    .iter()
                    .map(|element| element.new_based_on(row, resolver))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(cartesian(&candidate_lists)
                    .into_iter()
                    .map(Pattern::tuple)
                    .collect())
            }
            Pattern::Dictionary { key, value } => {
                let keys = key.new_based_on(row, resolver)?;
                let values = value.new_based_on(row, resolver)?;
                let mut out = vec![];
                for k in &keys {
                    for v in &values {
                        out.push(Pattern::dictionary(k.clone(), v.clone()));
                    }
                }
                Ok(out)
            }
            Pattern::AnyOf(variants) => {
                let mut out = vec![];
                for variant in variants.iter() {
                    out.extend(variant.new_based_on(row, resolver)?);
                }
                Ok(out)
            }
            Pattern::Deferred(token) => {
                let resolved = resolver.resolve_type(token)?;
                let marked = resolver.with_cycle_marker(token)?;
                resolved.new_based_on(row, &marked)
            }
            Pattern::LookupRow { key, inner } => {
                if let Some(text) = row.lookup(key) {
                    let value =
                        row_value(inner, text, resolver).map_err(|f| f.breadcrumb(key))?;
                    return Ok(vec![Pattern::exact(value)]);
                }
                inner.new_based_on(row, resolver)
            }
            Pattern::InString(inner) => Ok(inner
                .new_based_on(row, resolver)?
                .into_iter()
                .map(Pattern::in_string)
                .collect()),
            Pattern::Csv(element) => Ok(element
                .new_based_on(row, resolver)?
                .into_iter()
                .map(Pattern::csv_of)
                .collect()),
            _ => Ok(vec![self.clone()]),
        }
    }

    /// The all-or-nothing companion to [`Pattern::new_based_on`]: one
    /// variant with every optional key present, one with none of them.
    pub fn new_based_on_all_or_nothing(
        &self,
        row: &Row,
        resolver: &Resolver,
    ) -> Result<Vec<Pattern>, Failure> {
        match self {
            Pattern::Object { entries, type_alias } => {
                let mut with_all = IndexMap::new();
                let mut required_only = IndexMap::new();
                for (key, pattern) in entries.iter() {
                    if key == WILDCARD_KEY {
                        continue;
                    }
                    let name = strip_optionality(key);
                    let substituted = match row.lookup(name) {
                        Some(text) => Pattern::exact(
                            row_value(pattern, text, resolver).map_err(|f| f.breadcrumb(name))?,
                        ),
                        None => pattern.clone(),
                    };
                    with_all.insert(name.to_string(), substituted.clone());
                    if !is_optional_key(key) {
                        required_only.insert(name.to_string(), substituted);
                    }
                }
                let variants = vec![
                    Pattern::Object {
                        entries: with_all.into(),
                        type_alias: type_alias.clone(),
                    },
                    Pattern::Object {
                        entries: required_only.into(),
                        type_alias: type_alias.clone(),
                    },
                ];
                Ok(variants)
            }
            Pattern::Deferred(token) => {
                let resolved = resolver.resolve_type(token)?;
                let marked = resolver.with_cycle_marker(token)?;
                resolved.new_based_on_all_or_nothing(row, &marked)
            }
            _ => Ok(vec![self.clone()]),
        }
    }
}

fn cartesian(lists: &[Vec<Pattern>]) -> Vec<Vec<Pattern>> {
    let mut combinations: Vec<Vec<Pattern>> = vec![vec![]];
    for candidates in lists {
        let mut next = vec![];
        for combination in &combinations {
            for candidate in candidates {
                let mut extended = combination.clone();
                extended.push(candidate.clone());
                next.push(extended);
            }
        }
        combinations = next;
    }
    combinations
}

fn pick_length(min_length: Option<usize>, max_length: Option<usize>, default: usize) -> usize {
    match (min_length, max_length) {
        (Some(min), _) => min.max(1),
        (None, Some(max)) => default.min(max).max(1),
        (None, None) => default,
    }
}

fn generate_object(
    entries: &IndexMap<String, Pattern>,
    resolver: &Resolver,
) -> Result<Value, Failure> {
    let field_resolver = resolver.with_null_type();
    let mut fields = IndexMap::new();
    for (key, pattern) in entries {
        if key == WILDCARD_KEY {
            continue;
        }
        let name = strip_optionality(key);
        match pattern.generate(&field_resolver) {
            Ok(value) => {
                fields.insert(name.to_string(), value);
            }
            // An optional field whose type cannot produce an example
            // (e.g. a self reference) is left out.
            Err(_) if is_optional_key(key) => {}
            Err(failure) => return Err(failure.breadcrumb(name)),
        }
    }
    Ok(Value::from(fields))
}

fn generate_xml(pattern: &crate::pattern::XmlPattern, resolver: &Resolver) -> Result<XmlNode, Failure> {
    let mut node = XmlNode::new(&pattern.name);
    for (name, attribute) in &pattern.attributes {
        let value = attribute
            .generate(resolver)
            .map_err(|f| f.breadcrumb(name))?;
        node.attributes.insert(name.clone(), value.to_string_literal());
    }
    for child in &pattern.children {
        if let Pattern::List(element) = child {
            for _ in 0..2 {
                node.children.push(xml_child_value(element.generate(resolver)?));
            }
            continue;
        }
        node.children.push(xml_child_value(child.generate(resolver)?));
    }
    Ok(node)
}

fn xml_child_value(value: Value) -> Value {
    match value {
        Value::Xml(_) | Value::String(_) | Value::Cdata(_) => value,
        other => Value::from(other.to_string_literal()),
    }
}

/// Type a row's text against the field's pattern, failing with the field
/// named when the example does not fit the declared type.
fn row_value(pattern: &Pattern, text: &str, resolver: &Resolver) -> Result<Value, Failure> {
    let resolved = resolve_concrete(pattern, resolver)?;
    let value = match &resolved {
        Pattern::Number { .. } => match text.parse::<Number>() {
            Ok(number) => Value::Number(number),
            Err(_) => Value::from(text),
        },
        Pattern::Boolean => match text {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::from(text),
        },
        Pattern::Null if text == "null" => Value::Null,
        Pattern::Object { .. }
        | Pattern::Tuple(_)
        | Pattern::List(_)
        | Pattern::EmptyList
        | Pattern::Dictionary { .. } => Value::from_json_str(text)
            .map_err(|e| Failure::new(format!("example `{text}` is not valid JSON: {e}")))?,
        Pattern::InString(_) => {
            return match matches_text(&resolved, text, resolver) {
                MatchResult::Success => Ok(Value::from(text)),
                MatchResult::Failure(failure) => Err(failure),
            };
        }
        Pattern::AnyOf(variants) => {
            let mut last_failure = Failure::new("union has no variants");
            for variant in variants.iter() {
                match row_value(variant, text, resolver) {
                    Ok(value) => return Ok(value),
                    Err(failure) => last_failure = failure,
                }
            }
            return Err(last_failure);
        }
        _ => Value::from(text),
    };
    match resolved.matches(&value, &resolver.with_null_type()) {
        MatchResult::Success => Ok(value),
        MatchResult::Failure(failure) => Err(failure),
    }
}

fn resolve_concrete(pattern: &Pattern, resolver: &Resolver) -> Result<Pattern, Failure> {
    match pattern {
        Pattern::Deferred(token) => {
            let resolved = resolver.resolve_type(token)?;
            let marked = resolver.with_cycle_marker(token)?;
            resolve_concrete(&resolved, &marked)
        }
        Pattern::LookupRow { inner, .. } => resolve_concrete(inner, resolver),
        _ => Ok(pattern.clone()),
    }
}
