// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Type inference from example payloads.
//
// Given one example value, `type_declaration_with_key` derives a pattern
// tree: scalars become primitive type references with the sample recorded
// as an example binding, objects become named composite types, arrays fold
// their element types into one repeating type. Given two inferred trees,
// `converge` merges them into a single type accepting both examples.
//
// Convergence is deliberately lenient — it synthesizes a usable contract
// from scattered examples, warning and carrying on where examples
// genuinely disagree. The strict gate for compatibility decisions is
// `Pattern::encompasses`.

use indexmap::IndexMap;
use tracing::warn;

use crate::grammar;
use crate::pattern::{is_optional_key, strip_optionality, Pattern};
use crate::pattern::generate::Row;
use crate::value::Value;

/// A synthesized type reference plus the named sub-patterns minted while
/// inferring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDeclaration {
    /// Token text referencing the inferred type, e.g. `(Person)` or
    /// `(number)`.
    pub type_value: String,
    /// Named types minted during inference, keyed by bare name.
    pub types: IndexMap<String, Pattern>,
}

/// Field-name → literal sample text, collected while inferring. Names are
/// disambiguated when the same field name appears more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExampleBindings {
    entries: IndexMap<String, String>,
}

impl ExampleBindings {
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The bindings as a row, ready for `new_based_on`.
    pub fn to_row(&self) -> Row {
        self.entries
            .iter()
            .fold(Row::new(), |row, (key, value)| row.with(key, value))
    }

    fn bind(&mut self, key: &str, literal: String) {
        let mut name = key.to_string();
        let mut suffix = 2;
        while self.entries.contains_key(&name) {
            name = format!("{key}_{suffix}");
            suffix += 1;
        }
        self.entries.insert(name, literal);
    }
}

/// Infer a pattern tree from one example value. `key` names the value in
/// its enclosing context (a field name, a query parameter) and seeds both
/// the example bindings and the names of minted composite types.
pub fn type_declaration_with_key(key: &str, value: &Value) -> (TypeDeclaration, ExampleBindings) {
    let mut types = IndexMap::new();
    let mut examples = ExampleBindings::default();
    let type_value = infer_token(Some(key), value, &mut types, &mut examples);
    (TypeDeclaration { type_value, types }, examples)
}

fn infer_token(
    key: Option<&str>,
    value: &Value,
    types: &mut IndexMap<String, Pattern>,
    examples: &mut ExampleBindings,
) -> String {
    match value {
        Value::Null => "(null)".into(),
        Value::Bool(_) => {
            bind(key, value, examples);
            "(boolean)".into()
        }
        Value::Number(_) => {
            bind(key, value, examples);
            "(number)".into()
        }
        Value::String(text) | Value::Cdata(text) => {
            // Example data may embed a type token directly.
            if grammar::is_pattern_token(text) {
                return text.to_string();
            }
            bind(key, value, examples);
            "(string)".into()
        }
        Value::Array(items) if items.is_empty() => "(emptylist)".into(),
        Value::Array(items) => {
            let mut folded: Option<String> = None;
            for item in items.iter() {
                // Scalar elements are unkeyed, so they carry no
                // field-specific example binding; composite elements still
                // take their name from the enclosing key.
                let element_key = match item {
                    Value::Object(_) | Value::Xml(_) => key,
                    _ => None,
                };
                let token = infer_token(element_key, item, types, examples);
                folded = Some(match folded {
                    None => token,
                    Some(previous) => converge_tokens(&previous, &token, types),
                });
            }
            let folded = folded.unwrap_or_else(|| "(anyvalue)".to_string());
            format!("({}*)", token_body(&folded))
        }
        Value::Object(fields) => {
            let mut entries = IndexMap::new();
            for (field_key, field) in fields.iter() {
                let token = infer_token(Some(field_key.as_str()), field, types, examples);
                let pattern = grammar::parsed_pattern(&token, Some(field_key.as_str()), None)
                    .unwrap_or_else(|_| field.default_type());
                entries.insert(field_key.clone(), pattern);
            }
            let name = mint_name(key.unwrap_or("Type"), types);
            let pattern = Pattern::object_aliased(entries, Some(&name));
            types.insert(name.clone(), pattern);
            format!("({name})")
        }
        Value::Xml(node) => {
            let name = mint_name(key.unwrap_or(&node.name), types);
            let pattern = match grammar::xml_pattern_from_node(node, Some(&name)) {
                Ok(xml) => Pattern::xml(xml),
                Err(_) => Pattern::xml_of(node),
            };
            types.insert(name.clone(), pattern);
            format!("({name})")
        }
    }
}

fn bind(key: Option<&str>, value: &Value, examples: &mut ExampleBindings) {
    if let Some(key) = key {
        examples.bind(key, value.to_string_literal());
    }
}

fn mint_name(key: &str, types: &IndexMap<String, Pattern>) -> String {
    let base = capitalize(key);
    let mut name = base.clone();
    let mut suffix = 2;
    while types.contains_key(&name) {
        name = format!("{base}_{suffix}");
        suffix += 1;
    }
    name
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Type".into(),
    }
}

fn token_body(token: &str) -> &str {
    token
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(token)
}

fn optional_token(token: &str) -> String {
    format!("({}?)", token_body(token))
}

/// Merge two element-type tokens while folding an array, converging the
/// named types they reference.
fn converge_tokens(a: &str, b: &str, types: &mut IndexMap<String, Pattern>) -> String {
    if a == b {
        return a.to_string();
    }
    if a == "(emptylist)" {
        return b.to_string();
    }
    if b == "(emptylist)" {
        return a.to_string();
    }
    if a == "(null)" {
        return optional_token(b);
    }
    if b == "(null)" {
        return optional_token(a);
    }

    let a_body = token_body(a);
    let b_body = token_body(b);
    if a_body.strip_suffix('?') == Some(b_body) {
        return a.to_string();
    }
    if b_body.strip_suffix('?') == Some(a_body) {
        return b.to_string();
    }

    let a_name = a_body.to_string();
    let b_name = b_body.to_string();
    if types.contains_key(&a_name) && types.contains_key(&b_name) {
        let merged = converge(&types[&a_name], &types[&b_name]);
        types.insert(a_name, merged);
        types.shift_remove(&b_name);
        return a.to_string();
    }

    warn!(left = a, right = b, "element types do not converge; keeping the left");
    a.to_string()
}

/// Merge two inferred patterns into one accepting both. Lenient by
/// design: genuinely conflicting base types keep the first side and warn.
pub fn converge(a: &Pattern, b: &Pattern) -> Pattern {
    if a == b {
        return a.clone();
    }

    // A null on either side makes the concrete side nullable.
    if matches!(a, Pattern::Null) {
        return make_nullable(b);
    }
    if matches!(b, Pattern::Null) {
        return make_nullable(a);
    }

    let (a_core, a_optional) = strip_nullable(a);
    let (b_core, b_optional) = strip_nullable(b);
    let wrap = |pattern: Pattern| {
        if a_optional || b_optional {
            make_nullable(&pattern)
        } else {
            pattern
        }
    };

    match (a_core, b_core) {
        // The empty-list placeholder resolves to whichever side saw
        // actual elements.
        (Pattern::EmptyList, Pattern::List(_) | Pattern::Tuple(_)) => wrap(b_core.clone()),
        (Pattern::List(_) | Pattern::Tuple(_), Pattern::EmptyList) => wrap(a_core.clone()),
        (
            Pattern::Object {
                entries: ae,
                type_alias,
            },
            Pattern::Object { entries: be, .. },
        ) => wrap(converge_objects(ae, be, type_alias.clone())),
        (Pattern::List(ax), Pattern::List(bx)) => wrap(Pattern::list_of(converge(ax, bx))),
        _ if same_base(a_core, b_core) => {
            // Prefer the side already nullable, else the second.
            if a_optional {
                a.clone()
            } else {
                b.clone()
            }
        }
        _ => {
            warn!(
                left = %a.type_name(),
                right = %b.type_name(),
                "types do not converge; keeping the left"
            );
            a.clone()
        }
    }
}

fn make_nullable(pattern: &Pattern) -> Pattern {
    if pattern.as_optional_inner().is_some() || matches!(pattern, Pattern::EmptyString) {
        return pattern.clone();
    }
    Pattern::optional(pattern.clone())
}

fn strip_nullable(pattern: &Pattern) -> (&Pattern, bool) {
    match pattern.as_optional_inner() {
        Some(inner) => (inner, true),
        None => (pattern, false),
    }
}

fn same_base(a: &Pattern, b: &Pattern) -> bool {
    core::mem::discriminant(a) == core::mem::discriminant(b)
}

fn converge_objects(
    a: &IndexMap<String, Pattern>,
    b: &IndexMap<String, Pattern>,
    type_alias: Option<std::sync::Arc<str>>,
) -> Pattern {
    let mut entries = IndexMap::new();

    for (key, a_pattern) in a {
        let name = strip_optionality(key);
        let b_entry = b
            .get(name)
            .map(|p| (false, p))
            .or_else(|| b.get(&format!("{name}?")).map(|p| (true, p)));
        match b_entry {
            Some((b_optional, b_pattern)) => {
                let merged = converge(a_pattern, b_pattern);
                let out_key = if is_optional_key(key) || b_optional {
                    format!("{name}?")
                } else {
                    name.to_string()
                };
                entries.insert(out_key, merged);
            }
            // Seen on one side only: present, but optional.
            None => {
                entries.insert(format!("{name}?"), a_pattern.clone());
            }
        }
    }

    for (key, b_pattern) in b {
        let name = strip_optionality(key);
        if !a.contains_key(name) && !a.contains_key(&format!("{name}?")) {
            entries.insert(format!("{name}?"), b_pattern.clone());
        }
    }

    Pattern::Object {
        entries: entries.into(),
        type_alias,
    }
}

/// Merge two inferred declarations: shared minted names converge pairwise,
/// the rest carry over, and the type references merge by the same rules as
/// element tokens.
pub fn converge_type_declarations(a: &TypeDeclaration, b: &TypeDeclaration) -> TypeDeclaration {
    let mut types = a.types.clone();
    for (name, b_pattern) in &b.types {
        let merged = match types.get(name) {
            Some(a_pattern) => converge(a_pattern, b_pattern),
            None => b_pattern.clone(),
        };
        types.insert(name.clone(), merged);
    }
    let type_value = converge_tokens(&a.type_value, &b.type_value, &mut types);
    TypeDeclaration { type_value, types }
}
