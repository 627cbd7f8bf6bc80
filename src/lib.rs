// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod grammar;
mod infer;
mod number;
mod pattern;
mod resolver;
mod result;
mod value;
mod xml;

pub use grammar::{
    is_pattern_token, parsed_pattern, pattern_from_value, PatternSyntaxError,
};
pub use infer::{
    converge, converge_type_declarations, type_declaration_with_key, ExampleBindings,
    TypeDeclaration,
};
pub use number::Number;
pub use pattern::generate::Row;
pub use pattern::{is_optional_key, strip_optionality, Pattern, XmlPattern, WILDCARD_KEY};
pub use resolver::{
    registry_from_tokens, DefaultMismatches, MismatchMessages, RegistryError, Resolver,
    UnexpectedKeyCheck,
};
pub use result::{Failure, MatchResult};
pub use value::Value;
pub use xml::XmlNode;
