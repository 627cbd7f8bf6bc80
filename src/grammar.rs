// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// The compact type-token grammar.
//
// Specification authors write field types as short tokens: `(number)`,
// `(string?)`, `(csv/number)`, `{"id": "(number)"}`, `<person>...</person>`.
// This notation is persisted in spec files, so the token forms here are
// frozen: `?` optional/nullable suffix, `*` repeating suffix, `...`
// wildcard key, `key:type` lookup rows, `type in string` embedding.
//
// Malformed reserved tokens are authoring defects and fail the parse with
// the offending token named; they never become matching-time failures.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use thiserror::Error;

use crate::pattern::{Pattern, XmlPattern};
use crate::value::Value;
use crate::xml::XmlNode;

#[derive(Debug, Clone, Error)]
pub enum PatternSyntaxError {
    #[error("`{0}` is not a valid dictionary type; expected (dictionary keytype valuetype)")]
    MalformedDictionary(String),
    #[error("`{0}` is not a valid lookup row type; expected (key:type)")]
    MalformedLookupRow(String),
    #[error("`{0}` is not a valid in-string type; expected (type in string)")]
    MalformedInString(String),
    #[error("`{0}` carries a malformed length restriction; expected minLength/maxLength pairs")]
    MalformedRestriction(String),
    #[error("`{0}` names no element type; expected (csv/type)")]
    MalformedCsv(String),
    #[error("`{0}` is not a recognizable pattern token")]
    UnknownToken(String),
}

lazy_static! {
    // Process-wide, immutable after startup. Loaders may not shadow these.
    static ref BUILTINS: HashMap<&'static str, Pattern> = {
        let mut table = HashMap::new();
        table.insert("(string)", Pattern::string());
        table.insert("(number)", Pattern::number());
        table.insert("(boolean)", Pattern::boolean());
        table.insert("(null)", Pattern::null());
        table.insert("(empty)", Pattern::empty_string());
        table.insert("(emptylist)", Pattern::empty_list());
        table.insert("(anyvalue)", Pattern::anything());
        table.insert("(date)", Pattern::date());
        table.insert("(datetime)", Pattern::datetime());
        table.insert("(uuid)", Pattern::uuid());
        table
    };
}

pub fn builtin_pattern(token: &str) -> Option<Pattern> {
    BUILTINS.get(token).cloned()
}

/// Whether this text is a parenthesized type token.
pub fn is_pattern_token(text: &str) -> bool {
    text.len() > 2 && text.starts_with('(') && text.ends_with(')')
}

/// Parse pattern text: a type token, a JSON composite, an XML composite, or
/// (failing all of those) an exact string literal. `key` labels parse errors
/// with the field being parsed; `alias` names the resulting composite so a
/// loader can register it.
pub fn parsed_pattern(text: &str, key: Option<&str>, alias: Option<&str>) -> Result<Pattern> {
    let in_field = |error: anyhow::Error| match key {
        Some(key) => error.context(format!("in field `{key}`")),
        None => error,
    };

    if text.is_empty() {
        return Ok(Pattern::empty_string());
    }
    if text.starts_with('{') {
        let value = Value::from_json_str(text)
            .with_context(|| format!("`{text}` is not a JSON object"))
            .map_err(in_field)?;
        return object_pattern_from_value(&value, alias).map_err(in_field);
    }
    if text.starts_with('[') {
        let value = Value::from_json_str(text)
            .with_context(|| format!("`{text}` is not a JSON array"))
            .map_err(in_field)?;
        return tuple_pattern_from_value(&value).map_err(in_field);
    }
    if text.starts_with('<') {
        let node = XmlNode::parse(text).map_err(in_field)?;
        return Ok(Pattern::xml(xml_pattern_from_node(&node, alias)?));
    }
    if is_pattern_token(text) {
        return parsed_token(text).map_err(in_field);
    }
    Ok(Pattern::exact(Value::from(text)))
}

fn parsed_token(token: &str) -> Result<Pattern> {
    let body = token[1..token.len() - 1].trim();

    if let Some(inner) = body.strip_suffix('?') {
        return Ok(Pattern::optional(parsed_token(&format!("({inner})"))?));
    }
    if let Some(inner) = body.strip_suffix('*') {
        return Ok(Pattern::list_of(parsed_token(&format!("({inner})"))?));
    }
    if let Some(element) = body.strip_prefix("csv/") {
        if element.is_empty() || element.contains(char::is_whitespace) {
            bail!(PatternSyntaxError::MalformedCsv(token.to_string()));
        }
        return Ok(Pattern::csv_of(parsed_token(&format!("({element})"))?));
    }

    let words: Vec<&str> = body.split_whitespace().collect();
    if words.contains(&"in") {
        match words.as_slice() {
            [inner, "in", "string"] => {
                return Ok(Pattern::in_string(parsed_token(&format!("({inner})"))?));
            }
            _ => bail!(PatternSyntaxError::MalformedInString(token.to_string())),
        }
    }
    if words.first() == Some(&"dictionary") {
        match words.as_slice() {
            [_, key_type, value_type] => {
                return Ok(Pattern::dictionary(
                    parsed_token(&format!("({key_type})"))?,
                    parsed_token(&format!("({value_type})"))?,
                ));
            }
            _ => bail!(PatternSyntaxError::MalformedDictionary(token.to_string())),
        }
    }
    if matches!(words.first(), Some(&"string" | &"number")) && words.len() > 1 {
        let (min_length, max_length) = parsed_restrictions(token, &words[1..])?;
        return Ok(match words[0] {
            "string" => Pattern::string_with(min_length, max_length),
            _ => Pattern::number_with(min_length, max_length),
        });
    }
    if body.contains(':') {
        let segments: Vec<&str> = body.split(':').collect();
        match segments.as_slice() {
            [key, value_type]
                if !key.is_empty() && !value_type.is_empty() && is_identifier(key) =>
            {
                return Ok(Pattern::lookup_row(
                    key,
                    parsed_token(&format!("({value_type})"))?,
                ));
            }
            _ => bail!(PatternSyntaxError::MalformedLookupRow(token.to_string())),
        }
    }

    if let Some(builtin) = builtin_pattern(token) {
        return Ok(builtin);
    }
    if is_identifier(body) {
        // A name to be looked up in the resolver's registry at match time.
        return Ok(Pattern::deferred(token));
    }
    bail!(PatternSyntaxError::UnknownToken(token.to_string()))
}

fn parsed_restrictions(token: &str, words: &[&str]) -> Result<(Option<usize>, Option<usize>)> {
    if words.len() % 2 != 0 {
        bail!(PatternSyntaxError::MalformedRestriction(token.to_string()));
    }
    let mut min_length = None;
    let mut max_length = None;
    for pair in words.chunks(2) {
        let bound: usize = pair[1]
            .parse()
            .map_err(|_| PatternSyntaxError::MalformedRestriction(token.to_string()))?;
        match pair[0] {
            "minLength" => min_length = Some(bound),
            "maxLength" => max_length = Some(bound),
            _ => bail!(PatternSyntaxError::MalformedRestriction(token.to_string())),
        }
    }
    Ok((min_length, max_length))
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Convert a parsed JSON value into the pattern it declares: strings are
/// pattern text, composites recurse, other scalars are exact literals.
pub fn pattern_from_value(value: &Value, key: Option<&str>) -> Result<Pattern> {
    match value {
        Value::String(text) | Value::Cdata(text) => parsed_pattern(text, key, None),
        Value::Object(_) => object_pattern_from_value(value, None),
        Value::Array(_) => tuple_pattern_from_value(value),
        Value::Xml(node) => Ok(Pattern::xml(xml_pattern_from_node(node, None)?)),
        _ => Ok(Pattern::exact(value.clone())),
    }
}

fn object_pattern_from_value(value: &Value, alias: Option<&str>) -> Result<Pattern> {
    let fields = match value.as_object() {
        Some(fields) => fields,
        None => bail!("expected a JSON object, got {}", value.type_name()),
    };
    let mut entries = indexmap::IndexMap::new();
    for (key, field) in fields {
        entries.insert(key.clone(), pattern_from_value(field, Some(key.as_str()))?);
    }
    Ok(Pattern::object_aliased(entries, alias))
}

fn tuple_pattern_from_value(value: &Value) -> Result<Pattern> {
    let items = match value.as_array() {
        Some(items) => items,
        None => bail!("expected a JSON array, got {}", value.type_name()),
    };
    let elements = items
        .iter()
        .map(|item| pattern_from_value(item, None))
        .collect::<Result<Vec<_>>>()?;
    Ok(Pattern::tuple(elements))
}

pub fn xml_pattern_from_node(node: &XmlNode, alias: Option<&str>) -> Result<XmlPattern> {
    let mut attributes = indexmap::IndexMap::new();
    for (name, text) in &node.attributes {
        let pattern = if is_pattern_token(text) {
            parsed_pattern(text, Some(name.as_str()), None)?
        } else {
            Pattern::exact(Value::from(text.as_str()))
        };
        attributes.insert(name.clone(), pattern);
    }

    let mut children = vec![];
    for child in &node.children {
        match child {
            Value::Xml(nested) => {
                children.push(Pattern::xml(xml_pattern_from_node(nested, None)?));
            }
            Value::String(text) | Value::Cdata(text) => {
                children.push(parsed_pattern(text, None, None)?);
            }
            other => children.push(Pattern::exact(other.clone())),
        }
    }

    Ok(XmlPattern {
        name: Arc::clone(&node.name),
        attributes,
        children,
        type_alias: alias.map(Into::into),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_the_empty_string_pattern() {
        assert_eq!(parsed_pattern("", None, None).unwrap(), Pattern::empty_string());
    }

    #[test]
    fn builtin_tokens_parse_to_singletons() {
        assert_eq!(parsed_pattern("(number)", None, None).unwrap(), Pattern::number());
        assert_eq!(parsed_pattern("(boolean)", None, None).unwrap(), Pattern::boolean());
        assert_eq!(parsed_pattern("(uuid)", None, None).unwrap(), Pattern::uuid());
    }

    #[test]
    fn suffixes_build_optional_and_list() {
        assert_eq!(
            parsed_pattern("(number?)", None, None).unwrap(),
            Pattern::optional(Pattern::number())
        );
        assert_eq!(
            parsed_pattern("(string*)", None, None).unwrap(),
            Pattern::list_of(Pattern::string())
        );
    }

    #[test]
    fn compound_tokens_parse() {
        assert_eq!(
            parsed_pattern("(csv/number)", None, None).unwrap(),
            Pattern::csv_of(Pattern::number())
        );
        assert_eq!(
            parsed_pattern("(dictionary string number)", None, None).unwrap(),
            Pattern::dictionary(Pattern::string(), Pattern::number())
        );
        assert_eq!(
            parsed_pattern("(orderid:number)", None, None).unwrap(),
            Pattern::lookup_row("orderid", Pattern::number())
        );
        assert_eq!(
            parsed_pattern("(number in string)", None, None).unwrap(),
            Pattern::in_string(Pattern::number())
        );
    }

    #[test]
    fn restrictions_parse_in_pairs() {
        assert_eq!(
            parsed_pattern("(string minLength 3 maxLength 10)", None, None).unwrap(),
            Pattern::string_with(Some(3), Some(10))
        );
        assert_eq!(
            parsed_pattern("(number maxLength 4)", None, None).unwrap(),
            Pattern::number_with(None, Some(4))
        );
    }

    #[test]
    fn malformed_reserved_tokens_fail_naming_the_token() {
        for token in [
            "(dictionary string)",
            "(number in strings)",
            "(a:b:c)",
            "(string minLength)",
            "(string minLength x)",
            "(csv/)",
        ] {
            let error = parsed_pattern(token, None, None).unwrap_err();
            assert!(error.to_string().contains(token), "{token}: {error}");
        }
    }

    #[test]
    fn unknown_identifiers_defer_to_the_registry() {
        assert_eq!(
            parsed_pattern("(Customer)", None, None).unwrap(),
            Pattern::deferred("(Customer)")
        );
    }

    #[test]
    fn json_object_text_parses_to_an_object_pattern() {
        let pattern = parsed_pattern(r#"{"id": "(number)", "name?": "(string)"}"#, None, None)
            .unwrap();
        match pattern {
            Pattern::Object { entries, .. } => {
                assert_eq!(entries.get("id"), Some(&Pattern::number()));
                assert_eq!(entries.get("name?"), Some(&Pattern::string()));
            }
            other => panic!("Expected object pattern, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_an_exact_literal() {
        assert_eq!(
            parsed_pattern("rain check", None, None).unwrap(),
            Pattern::exact(Value::from("rain check"))
        );
    }

    #[test]
    fn xml_text_parses_to_an_xml_pattern() {
        let pattern = parsed_pattern(r#"<person id="(number)">(string)</person>"#, None, None)
            .unwrap();
        match pattern {
            Pattern::Xml(node) => {
                assert_eq!(node.name.as_ref(), "person");
                assert_eq!(node.attributes.get("id"), Some(&Pattern::number()));
                assert_eq!(node.children, vec![Pattern::string()]);
            }
            other => panic!("Expected xml pattern, got {other:?}"),
        }
    }

    #[test]
    fn parse_errors_name_the_field_being_parsed() {
        let error =
            parsed_pattern(r#"{"id": "(dictionary string)"}"#, None, None).unwrap_err();
        let chain = format!("{error:#}");
        assert!(chain.contains("id"), "{chain}");
    }
}
