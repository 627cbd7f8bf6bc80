// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// End-to-end exercises of the public API: parse → match/encompass,
// infer → converge → match, generate → match.

use pactum::{
    converge, converge_type_declarations, parsed_pattern, registry_from_tokens,
    type_declaration_with_key, MatchResult, Pattern, Resolver, Row, Value,
};

fn pattern(text: &str) -> Pattern {
    parsed_pattern(text, None, None).unwrap()
}

fn value(json: &str) -> Value {
    Value::from_json_str(json).unwrap()
}

#[test]
fn object_with_optional_key_matches_and_reports_breadcrumbs() {
    let p = pattern(r#"{"id": "(number)", "name?": "(string)"}"#);
    let resolver = Resolver::new();

    assert!(p.matches(&value(r#"{"id": 1}"#), &resolver).is_success());

    let result = p.matches(&value(r#"{"name": "x"}"#), &resolver);
    let failure = match result {
        MatchResult::Failure(failure) => failure,
        MatchResult::Success => panic!("Expected a failure"),
    };
    let report = failure.report();
    assert!(report.contains(">> id"), "{report}");
}

#[test]
fn nullable_number_token_accepts_empty_and_number() {
    let p = pattern("(number?)");
    let resolver = Resolver::new();
    assert!(p.matches(&value(r#""""#), &resolver).is_success());
    assert!(p.matches(&value("42"), &resolver).is_success());
}

#[test]
fn list_inferred_from_examples_matches_more_of_the_same() {
    let (declaration, _) = type_declaration_with_key("letters", &value(r#"["a", "b"]"#));
    let p = pattern(&declaration.type_value);
    let resolver = Resolver::new();

    assert!(p.matches(&value(r#"["a", "b", "c"]"#), &resolver).is_success());
    assert!(!p.matches(&value("[1, 2]"), &resolver).is_success());
}

#[test]
fn converged_examples_make_shared_keys_required_and_the_rest_optional() {
    let (a, _) = type_declaration_with_key("person", &value(r#"{"id": 1, "age": 30}"#));
    let (b, _) = type_declaration_with_key("person", &value(r#"{"id": 2, "city": "NYC"}"#));
    let merged = converge_type_declarations(&a, &b);

    let types = merged
        .types
        .iter()
        .map(|(name, p)| (name.clone(), p.clone()))
        .collect();
    let resolver = Resolver::with_types(types).unwrap();
    let p = pattern(&merged.type_value);

    assert!(p.matches(&value(r#"{"id": 3}"#), &resolver).is_success());
    assert!(p
        .matches(&value(r#"{"id": 1, "age": 44}"#), &resolver)
        .is_success());
    assert!(p
        .matches(&value(r#"{"id": 2, "city": "Pune"}"#), &resolver)
        .is_success());
    assert!(!p.matches(&value(r#"{"age": 44}"#), &resolver).is_success());
}

#[test]
fn contract_with_an_extra_provided_key_is_backward_compatible() {
    let older = pattern(r#"{"id": "(number)", "name": "(string)"}"#);
    let newer = pattern(r#"{"id": "(number)", "name": "(string)", "extra": "(string)"}"#);
    let resolver = Resolver::new();
    assert!(older.encompasses(&newer, &resolver, &resolver).is_success());
}

#[test]
fn dropping_a_required_key_breaks_compatibility_naming_it() {
    let older = pattern(r#"{"id": "(number)", "name": "(string)"}"#);
    let newer = pattern(r#"{"id": "(number)"}"#);
    let resolver = Resolver::new();

    let result = older.encompasses(&newer, &resolver, &resolver);
    let failure = match result {
        MatchResult::Failure(failure) => failure,
        MatchResult::Success => panic!("Expected a failure"),
    };
    assert!(failure.message.contains("\"name\""), "{}", failure.message);
    assert_eq!(failure.breadcrumb_path(), "name");
}

#[test]
fn generated_payloads_satisfy_their_own_contract() {
    let types = registry_from_tokens([
        ("(Address)", r#"{"street": "(string)", "pincode": "(number in string)"}"#),
        (
            "(Customer)",
            r#"{"id": "(uuid)", "name": "(string)", "address": "(Address)", "tags?": "(string*)"}"#,
        ),
    ])
    .unwrap();
    let resolver = Resolver::with_types(types).unwrap();
    let p = pattern("(Customer)");

    for _ in 0..5 {
        let payload = p.generate(&resolver).unwrap();
        let result = p.matches(&payload, &resolver);
        assert!(result.is_success(), "{result}\npayload: {payload}");
    }
}

#[test]
fn every_pattern_encompasses_itself_through_registries() {
    let types = registry_from_tokens([
        ("(Item)", r#"{"sku": "(string)", "price": "(number)"}"#),
        ("(Order)", r#"{"id": "(number)", "items": "(Item*)"}"#),
    ])
    .unwrap();
    let resolver = Resolver::with_types(types).unwrap();
    for token in ["(Item)", "(Order)", "(Item*)", "(number?)"] {
        let p = pattern(token);
        assert!(p.encompasses(&p, &resolver, &resolver).is_success(), "{token}");
    }
}

#[test]
fn row_driven_variants_generate_matching_examples() {
    let p = pattern(r#"{"orderid": "(number)", "status?": "(string)"}"#);
    let resolver = Resolver::new();
    let row = Row::new().with("orderid", "42");

    let variants = p.new_based_on(&row, &resolver).unwrap();
    assert_eq!(variants.len(), 2);
    for variant in &variants {
        let payload = variant.generate(&resolver).unwrap();
        assert!(p.matches(&payload, &resolver).is_success(), "{payload}");
        assert_eq!(
            payload.find_first_child_by_path("orderid"),
            Some(&Value::from(42))
        );
    }
}

#[test]
fn convergence_of_placeholder_and_concrete_list_is_the_concrete_list() {
    let concrete = Pattern::list_of(Pattern::string());
    assert_eq!(converge(&Pattern::empty_list(), &concrete), concrete);
    assert_eq!(converge(&concrete, &Pattern::empty_list()), concrete);
}

#[test]
fn xml_contract_round_trip() {
    let p = pattern(r#"<order id="(number)"><item>(string)</item><count>(number in string)</count></order>"#);
    let resolver = Resolver::new();

    let payload = p.generate(&resolver).unwrap();
    assert!(p.matches(&payload, &resolver).is_success());

    let document =
        Value::from_xml_str(r#"<order id="7"><item>pen</item><count>3</count></order>"#).unwrap();
    assert!(p.matches(&document, &resolver).is_success());

    let wrong =
        Value::from_xml_str(r#"<order id="seven"><item>pen</item><count>3</count></order>"#)
            .unwrap();
    assert!(!p.matches(&wrong, &resolver).is_success());
}

#[test]
fn unexpected_keys_fail_under_validate_and_pass_under_ignore() {
    let p = pattern(r#"{"id": "(number)"}"#);
    let payload = value(r#"{"id": 1, "debug": true}"#);

    let strict = Resolver::new();
    let result = p.matches(&payload, &strict);
    let failure = match result {
        MatchResult::Failure(failure) => failure,
        MatchResult::Success => panic!("Expected a failure"),
    };
    assert!(failure.report().contains("debug"), "{}", failure.report());

    let lenient = strict.with_unexpected_keys_ignored();
    assert!(p.matches(&payload, &lenient).is_success());
}
