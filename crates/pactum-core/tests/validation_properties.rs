//! Property tests for the schema engine and the contract builder.
//!
//! These pin the behaviors every caller relies on:
//!
//! 1. Validation is idempotent - validating a validated value changes nothing
//! 2. Every supported method builds a contract with any valid path
//! 3. Anything outside the method set is rejected

use pactum_core::{Contract, ContractError, Method, Schema, ValidateOptions};
use proptest::prelude::*;
use serde_json::{json, Value};

fn user_schema() -> Schema {
    Schema::object([
        ("id", Schema::integer().minimum_int(1)),
        ("name", Schema::string().min_length(1)),
        ("active", Schema::boolean().default(true)),
        ("tags", Schema::array(Schema::string()).optional()),
        ("score", Schema::number().nullable().optional()),
    ])
}

fn method_strategy() -> impl Strategy<Value = Method> {
    prop::sample::select(vec![Method::Get, Method::Post, Method::Put, Method::Delete])
}

fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof!["[a-z]{1,8}", "[a-z]{1,8}".prop_map(|s| format!(":{s}"))],
        0..4,
    )
    .prop_map(|segments| {
        // Parameter names must be unique within a path.
        let parts: Vec<String> = segments
            .into_iter()
            .enumerate()
            .map(|(i, s)| if s.starts_with(':') { format!("{s}{i}") } else { s })
            .collect();
        format!("/{}", parts.join("/"))
    })
}

proptest! {
    #[test]
    fn validation_is_idempotent(
        id in prop_oneof![(1i64..10_000).prop_map(|n| json!(n)), (1i64..10_000).prop_map(|n| json!(n.to_string()))],
        name in "[a-zA-Z]{1,12}",
        active in prop::option::of(any::<bool>()),
        tags in prop::option::of(prop::collection::vec("[a-z]{0,5}", 0..4)),
        extra in "[a-z]{1,6}",
    ) {
        let mut input = json!({"id": id, "name": name});
        input[format!("x_{extra}")] = json!("ignored");
        if let Some(active) = active {
            input["active"] = json!(active);
        }
        if let Some(tags) = tags {
            input["tags"] = json!(tags);
        }

        let schema = user_schema();
        let once = schema.validate(&input, ValidateOptions::coercing()).unwrap();
        let twice = schema.validate(&once, ValidateOptions::coercing()).unwrap();
        prop_assert_eq!(&once, &twice);

        let strict = schema.validate(&once, ValidateOptions::strict()).unwrap();
        prop_assert_eq!(once, strict);
    }

    #[test]
    fn supported_methods_round_trip(method in method_strategy(), path in path_strategy()) {
        let contract = Contract::new().route(method, &path).unwrap();
        prop_assert_eq!(contract.method(), method);
        prop_assert_eq!(contract.path(), path.as_str());
    }

    #[test]
    fn unknown_methods_are_rejected(method in "[A-Z]{3,8}") {
        prop_assume!(!["GET", "POST", "PUT", "DELETE", "PATCH"].contains(&method.as_str()));

        let err = Contract::new().route(method.as_str(), "/").unwrap_err();
        let is_invalid_method = matches!(err, ContractError::InvalidMethod { .. });
        prop_assert!(is_invalid_method);
    }
}

#[test]
fn failed_validation_reports_every_field() {
    let err = user_schema()
        .validate(&json!({"id": 0, "name": ""}), ValidateOptions::coercing())
        .unwrap_err();

    assert_eq!(err.len(), 2);
    let tree = err.to_tree();
    assert!(tree["id"].is_array());
    assert!(tree["name"].is_array());
}

#[test]
fn unknown_fields_are_stripped() {
    let out = user_schema()
        .validate(&json!({"id": 1, "name": "a", "admin": true}), ValidateOptions::strict())
        .unwrap();

    assert_eq!(out, json!({"id": 1, "name": "a", "active": true}));
    assert!(out.get("admin").is_none());
    assert_ne!(out, Value::Null);
}
