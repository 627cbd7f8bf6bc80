// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Contract compatibility.
//
// `a.encompasses(b)` asks whether every payload `b` admits is also admitted
// by `a` — the check behind "can this new contract replace the old one".
// Unlike `matches`, which aggregates every field mismatch for reporting,
// compatibility is a single pass/fail decision and stops at the first
// incompatibility.
//
// Deferred names resolve through each side's own resolver. Re-expanding a
// name already on a side's cycle guard means the same pair of types is
// being compared again along this path, so it is taken as compatible —
// that is what makes `T.encompasses(T)` hold for self-referential types.

use crate::pattern::{
    is_optional_key, strip_optionality, Pattern, XmlPattern, WILDCARD_KEY,
};
use crate::resolver::Resolver;
use crate::result::{Failure, MatchResult};

impl Pattern {
    pub fn encompasses(
        &self,
        other: &Pattern,
        this_resolver: &Resolver,
        other_resolver: &Resolver,
    ) -> MatchResult {
        if let Pattern::Deferred(token) = self {
            return match this_resolver.resolve_type(token) {
                Ok(resolved) => match this_resolver.with_cycle_marker(token) {
                    Ok(marked) => resolved.encompasses(other, &marked, other_resolver),
                    Err(_) => MatchResult::Success,
                },
                Err(failure) => MatchResult::Failure(failure),
            };
        }
        if let Pattern::Deferred(token) = other {
            return match other_resolver.resolve_type(token) {
                Ok(resolved) => match other_resolver.with_cycle_marker(token) {
                    Ok(marked) => self.encompasses(&resolved, this_resolver, &marked),
                    Err(_) => MatchResult::Success,
                },
                Err(failure) => MatchResult::Failure(failure),
            };
        }
        if let Pattern::LookupRow { inner, .. } = self {
            return inner.encompasses(other, this_resolver, other_resolver);
        }
        if let Pattern::LookupRow { inner, .. } = other {
            return self.encompasses(inner, this_resolver, other_resolver);
        }

        // An exact value on the other side: whatever it is, it must simply
        // match this pattern.
        if let Pattern::Exact(value) = other {
            return self.matches(value, this_resolver);
        }

        // The other side being a union means it can produce any of its
        // variants, so each variant must fit.
        if let Pattern::AnyOf(variants) = other {
            for variant in variants.iter() {
                let result = self.encompasses(variant, this_resolver, other_resolver);
                if !result.is_success() {
                    return result;
                }
            }
            return MatchResult::Success;
        }
        if let Pattern::AnyOf(variants) = self {
            for variant in variants.iter() {
                if variant
                    .encompasses(other, this_resolver, other_resolver)
                    .is_success()
                {
                    return MatchResult::Success;
                }
            }
            return MatchResult::failure(format!(
                "{} cannot accommodate {}",
                self.type_name(),
                other.type_name()
            ));
        }

        if matches!(self, Pattern::Anything) {
            return MatchResult::Success;
        }

        match (self, other) {
            (
                Pattern::String {
                    min_length: a_min,
                    max_length: a_max,
                },
                Pattern::String {
                    min_length: b_min,
                    max_length: b_max,
                },
            ) => bounds_within("string", *a_min, *a_max, *b_min, *b_max),
            (
                Pattern::Number {
                    min_length: a_min,
                    max_length: a_max,
                },
                Pattern::Number {
                    min_length: b_min,
                    max_length: b_max,
                },
            ) => bounds_within("number", *a_min, *a_max, *b_min, *b_max),
            // Any of the string-shaped types is admissible where an
            // unrestricted string is expected.
            (
                Pattern::String {
                    min_length: None,
                    max_length: None,
                },
                Pattern::EmptyString
                | Pattern::Date
                | Pattern::DateTime
                | Pattern::Uuid
                | Pattern::InString(_)
                | Pattern::Csv(_),
            ) => MatchResult::Success,
            (Pattern::Boolean, Pattern::Boolean)
            | (Pattern::Null, Pattern::Null)
            | (Pattern::EmptyString, Pattern::EmptyString)
            | (Pattern::Date, Pattern::Date)
            | (Pattern::DateTime, Pattern::DateTime)
            | (Pattern::Uuid, Pattern::Uuid)
            | (Pattern::EmptyList, Pattern::EmptyList) => MatchResult::Success,
            (Pattern::InString(a), Pattern::InString(b)) => {
                a.encompasses(b, this_resolver, other_resolver)
            }
            (Pattern::Csv(a), Pattern::Csv(b)) => a.encompasses(b, this_resolver, other_resolver),
            (Pattern::List(a), Pattern::List(b)) => {
                a.encompasses(b, this_resolver, other_resolver)
            }
            (Pattern::List(_), Pattern::EmptyList) => MatchResult::Success,
            (Pattern::List(a), Pattern::Tuple(bs)) => {
                for (index, b) in bs.iter().enumerate() {
                    let result = a
                        .encompasses(b, this_resolver, other_resolver)
                        .breadcrumb(&format!("[{index}]"));
                    if !result.is_success() {
                        return result;
                    }
                }
                MatchResult::Success
            }
            (Pattern::Tuple(a), Pattern::Tuple(b)) => {
                encompass_elements(a, b, this_resolver, other_resolver)
            }
            (
                Pattern::Dictionary {
                    key: a_key,
                    value: a_value,
                },
                Pattern::Dictionary {
                    key: b_key,
                    value: b_value,
                },
            ) => {
                let keys = a_key.encompasses(b_key, this_resolver, other_resolver);
                if !keys.is_success() {
                    return keys;
                }
                a_value.encompasses(b_value, this_resolver, other_resolver)
            }
            (Pattern::Object { entries: a, .. }, Pattern::Object { entries: b, .. }) => {
                encompass_objects(a, b, this_resolver, other_resolver)
            }
            (Pattern::Xml(a), Pattern::Xml(b)) => {
                encompass_xml(a, b, this_resolver, other_resolver)
            }
            _ => MatchResult::failure(format!(
                "{} cannot accommodate {}",
                self.type_name(),
                other.type_name()
            )),
        }
    }
}

fn bounds_within(
    kind: &str,
    a_min: Option<usize>,
    a_max: Option<usize>,
    b_min: Option<usize>,
    b_max: Option<usize>,
) -> MatchResult {
    if let Some(min) = a_min {
        if b_min.map_or(true, |b| b < min) {
            return MatchResult::failure(format!(
                "{kind} minLength {min} is not guaranteed by the other type"
            ));
        }
    }
    if let Some(max) = a_max {
        if b_max.map_or(true, |b| b > max) {
            return MatchResult::failure(format!(
                "{kind} maxLength {max} is not guaranteed by the other type"
            ));
        }
    }
    MatchResult::Success
}

fn encompass_objects(
    a: &indexmap::IndexMap<String, Pattern>,
    b: &indexmap::IndexMap<String, Pattern>,
    this_resolver: &Resolver,
    other_resolver: &Resolver,
) -> MatchResult {
    let this_resolver = this_resolver.with_null_type();
    let other_resolver = other_resolver.with_null_type();

    // Every key this side requires must be required over there.
    for key in a.keys() {
        if key == WILDCARD_KEY || is_optional_key(key) {
            continue;
        }
        if b.contains_key(key) {
            continue;
        }
        let failure = if b.contains_key(&format!("{key}?")) {
            Failure::new(format!(
                "Key \"{key}\" is mandatory here but optional in the other type"
            ))
        } else {
            Failure::new(format!("Key \"{key}\" is missing in the other type"))
        };
        return MatchResult::Failure(failure.breadcrumb(key));
    }

    // Shared keys, optionality stripped, must be pairwise compatible.
    // A key optional here and absent there is compatible by omission.
    for (key, a_pattern) in a {
        if key == WILDCARD_KEY {
            continue;
        }
        let name = strip_optionality(key);
        let b_pattern = b.get(name).or_else(|| b.get(&format!("{name}?")));
        if let Some(b_pattern) = b_pattern {
            let result = a_pattern
                .encompasses(b_pattern, &this_resolver, &other_resolver)
                .breadcrumb(name);
            if !result.is_success() {
                return result;
            }
        }
    }

    MatchResult::Success
}

fn encompass_elements(
    a: &[Pattern],
    b: &[Pattern],
    this_resolver: &Resolver,
    other_resolver: &Resolver,
) -> MatchResult {
    match (a, b) {
        ([Pattern::List(a_element)], [Pattern::List(b_element)]) => {
            a_element.encompasses(b_element, this_resolver, other_resolver)
        }
        ([Pattern::List(a_element)], items) => {
            for (index, item) in items.iter().enumerate() {
                let result = a_element
                    .encompasses(item, this_resolver, other_resolver)
                    .breadcrumb(&format!("[{index}]"));
                if !result.is_success() {
                    return result;
                }
            }
            MatchResult::Success
        }
        _ if a.len() == b.len() => {
            for (index, (a_item, b_item)) in a.iter().zip(b.iter()).enumerate() {
                let result = a_item
                    .encompasses(b_item, this_resolver, other_resolver)
                    .breadcrumb(&format!("[{index}]"));
                if !result.is_success() {
                    return result;
                }
            }
            MatchResult::Success
        }
        _ => MatchResult::failure(format!(
            "Array of length {} cannot accommodate length {}",
            a.len(),
            b.len()
        )),
    }
}

fn encompass_xml(
    a: &XmlPattern,
    b: &XmlPattern,
    this_resolver: &Resolver,
    other_resolver: &Resolver,
) -> MatchResult {
    if a.name != b.name {
        return MatchResult::failure(format!(
            "Element <{}> cannot accommodate <{}>",
            a.name, b.name
        ));
    }
    for (name, a_attribute) in &a.attributes {
        let b_attribute = match b.attributes.get(name) {
            Some(found) => found,
            None => {
                return MatchResult::Failure(
                    Failure::new(format!("Attribute \"{name}\" is missing in the other type"))
                        .breadcrumb(name),
                );
            }
        };
        let result = a_attribute
            .encompasses(b_attribute, this_resolver, other_resolver)
            .breadcrumb(name);
        if !result.is_success() {
            return result;
        }
    }
    let crumb: &str = &a.name;
    encompass_elements(&a.children, &b.children, this_resolver, other_resolver).breadcrumb(crumb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parsed_pattern;
    use crate::resolver::registry_from_tokens;

    fn encompasses(a: &str, b: &str) -> MatchResult {
        let a = parsed_pattern(a, None, None).unwrap();
        let b = parsed_pattern(b, None, None).unwrap();
        a.encompasses(&b, &Resolver::new(), &Resolver::new())
    }

    #[test]
    fn every_pattern_encompasses_itself() {
        for token in [
            "(number)",
            "(string)",
            "(number*)",
            "(number?)",
            "(dictionary string number)",
            "(csv/number)",
            "(number in string)",
            r#"{"id": "(number)", "name?": "(string)"}"#,
            r#"<person id="(number)">(string)</person>"#,
        ] {
            assert!(encompasses(token, token).is_success(), "{token}");
        }
    }

    #[test]
    fn extra_keys_on_the_other_side_are_compatible() {
        assert!(encompasses(
            r#"{"id": "(number)", "name": "(string)"}"#,
            r#"{"id": "(number)", "name": "(string)", "extra": "(boolean)"}"#,
        )
        .is_success());
    }

    #[test]
    fn dropping_a_required_key_fails_naming_it() {
        let result = encompasses(
            r#"{"id": "(number)", "name": "(string)"}"#,
            r#"{"id": "(number)"}"#,
        );
        let failure = result.into_failure().unwrap();
        assert_eq!(failure.breadcrumb_path(), "name");
        assert!(failure.message.contains("\"name\""), "{}", failure.message);
    }

    #[test]
    fn making_a_required_key_optional_fails() {
        let result = encompasses(
            r#"{"id": "(number)"}"#,
            r#"{"id?": "(number)"}"#,
        );
        let failure = result.into_failure().unwrap();
        assert!(failure.message.contains("optional"), "{}", failure.message);
    }

    #[test]
    fn optional_here_absent_there_is_fine() {
        assert!(encompasses(
            r#"{"id": "(number)", "nickname?": "(string)"}"#,
            r#"{"id": "(number)"}"#,
        )
        .is_success());
    }

    #[test]
    fn first_incompatibility_short_circuits() {
        let result = encompasses(
            r#"{"a": "(number)", "b": "(number)"}"#,
            r#"{"a": "(string)", "b": "(boolean)"}"#,
        );
        let failure = result.into_failure().unwrap();
        assert_eq!(failure.flatten().len(), 1);
    }

    #[test]
    fn exact_values_delegate_to_matching() {
        let number = parsed_pattern("(number)", None, None).unwrap();
        let exact = Pattern::exact(crate::value::Value::from(42));
        assert!(number
            .encompasses(&exact, &Resolver::new(), &Resolver::new())
            .is_success());
        let exact_string = Pattern::exact(crate::value::Value::from("x"));
        assert!(!number
            .encompasses(&exact_string, &Resolver::new(), &Resolver::new())
            .is_success());
    }

    #[test]
    fn widening_restrictions_is_compatible_narrowing_is_not() {
        assert!(encompasses("(string)", "(string minLength 3)").is_success());
        assert!(encompasses("(string minLength 3)", "(string minLength 5)").is_success());
        assert!(!encompasses("(string minLength 5)", "(string minLength 3)").is_success());
        assert!(!encompasses("(string maxLength 5)", "(string)").is_success());
    }

    #[test]
    fn unions_distribute_over_both_sides() {
        assert!(encompasses("(number?)", "(number)").is_success());
        assert!(encompasses("(number?)", "(number?)").is_success());
        assert!(!encompasses("(number)", "(number?)").is_success());
        assert!(encompasses("(string)", "(uuid)").is_success());
        assert!(!encompasses("(uuid)", "(string)").is_success());
    }

    #[test]
    fn lists_accommodate_narrower_element_types_and_emptiness() {
        assert!(encompasses("(string*)", "(uuid*)").is_success());
        assert!(!encompasses("(uuid*)", "(string*)").is_success());
        assert!(encompasses("(number*)", "(emptylist)").is_success());
        assert!(!encompasses("(emptylist)", "(number*)").is_success());
    }

    #[test]
    fn self_referential_types_are_reflexive() {
        let types = registry_from_tokens([(
            "(Tree)",
            r#"{"value": "(number)", "left?": "(Tree)", "right?": "(Tree)"}"#,
        )])
        .unwrap();
        let resolver = Resolver::with_types(types).unwrap();
        let tree = parsed_pattern("(Tree)", None, None).unwrap();
        assert!(tree.encompasses(&tree, &resolver, &resolver).is_success());
    }
}
