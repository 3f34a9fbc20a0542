//! Reference resolution through stores, handlers, and anchors

use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

use jsonvet::{validator_for, Error, RefResolutionError, RefResolver, Validator};

#[test]
fn test_ref_across_prestored_documents() {
    let address = json!({
        "type": "object",
        "properties": {"zip": {"type": "string"}},
        "required": ["zip"]
    });
    let schema = json!({
        "properties": {
            "home": {"$ref": "https://example.com/address.json"}
        }
    });

    let config = validator_for(&schema);
    let resolver = Rc::new(
        RefResolver::from_schema_with(&schema, config.id_extractor())
            .with_store([("https://example.com/address.json".to_string(), address)]),
    );
    let validator = Validator::with_resolver(config, &schema, resolver);

    assert!(validator
        .is_valid(&json!({"home": {"zip": "10001"}}))
        .unwrap());
    assert!(!validator.is_valid(&json!({"home": {"zip": 10001}})).unwrap());
}

#[test]
fn test_fetch_handler_called_once_per_document() {
    let calls = Rc::new(Cell::new(0usize));
    let seen = Rc::clone(&calls);

    let schema = json!({
        "properties": {
            "a": {"$ref": "test://remote/doc.json#/defs/a"},
            "b": {"$ref": "test://remote/doc.json#/defs/b"}
        }
    });
    let config = validator_for(&schema);
    let resolver = RefResolver::from_schema_with(&schema, config.id_extractor()).with_handler(
        "test",
        Box::new(move |_uri| {
            seen.set(seen.get() + 1);
            Ok(json!({
                "defs": {
                    "a": {"type": "integer"},
                    "b": {"type": "string"}
                }
            }))
        }),
    );
    let validator = Validator::with_resolver(config, &schema, Rc::new(resolver));

    assert!(validator.is_valid(&json!({"a": 1, "b": "x"})).unwrap());
    assert!(!validator.is_valid(&json!({"a": "x"})).unwrap());
    // Both references and the re-validation hit the memoized document.
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_unresolvable_pointer_is_an_error_not_invalid() {
    let schema = json!({"$ref": "#/definitions/missing"});
    let config = validator_for(&schema);
    let validator = Validator::new(config, &schema);

    let result = validator.is_valid(&json!(1));
    match result {
        Err(Error::Resolution(RefResolutionError::UnresolvablePointer(pointer))) => {
            assert!(pointer.contains("definitions/missing"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_unsupported_scheme() {
    let schema = json!({"$ref": "ftp://example.com/schema.json"});
    let config = validator_for(&schema);
    let validator = Validator::new(config, &schema);

    assert!(matches!(
        validator.is_valid(&json!(1)),
        Err(Error::Resolution(RefResolutionError::UnsupportedScheme { .. }))
    ));
}

#[test]
fn test_anchor_resolution() {
    let schema = json!({
        "$id": "https://example.com/root.json",
        "$defs": {
            "named": {
                "$anchor": "positive",
                "type": "integer",
                "minimum": 1
            }
        },
        "properties": {
            "count": {"$ref": "#positive"}
        }
    });
    let validator = Validator::new(validator_for(&schema), &schema);
    assert!(validator.is_valid(&json!({"count": 2})).unwrap());
    assert!(!validator.is_valid(&json!({"count": 0})).unwrap());
}

#[test]
fn test_local_id_resolution_avoids_fetch() {
    // The target URI is addressable inside the referrer document, so no
    // handler is needed despite the absolute reference.
    let schema = json!({
        "$id": "https://example.com/root.json",
        "$defs": {
            "leaf": {
                "$id": "https://example.com/leaf.json",
                "type": "string"
            }
        },
        "properties": {
            "name": {"$ref": "https://example.com/leaf.json"}
        }
    });
    let validator = Validator::new(validator_for(&schema), &schema);
    assert!(validator.is_valid(&json!({"name": "ok"})).unwrap());
    assert!(!validator.is_valid(&json!({"name": 3})).unwrap());
}

#[test]
fn test_pointer_escapes_in_refs() {
    let schema = json!({
        "$defs": {
            "a/b": {"type": "integer"},
            "c~d": {"type": "string"}
        },
        "properties": {
            "x": {"$ref": "#/$defs/a~1b"},
            "y": {"$ref": "#/$defs/c~0d"}
        }
    });
    let validator = Validator::new(validator_for(&schema), &schema);
    assert!(validator.is_valid(&json!({"x": 1, "y": "s"})).unwrap());
    assert!(!validator.is_valid(&json!({"x": "s"})).unwrap());
    assert!(!validator.is_valid(&json!({"y": 1})).unwrap());
}

#[test]
fn test_recursive_ref_terminates_on_finite_instances() {
    let schema = json!({
        "$defs": {
            "node": {
                "type": "object",
                "properties": {
                    "value": {"type": "integer"},
                    "next": {"$ref": "#/$defs/node"}
                }
            }
        },
        "$ref": "#/$defs/node"
    });
    let validator = Validator::new(validator_for(&schema), &schema);
    assert!(validator
        .is_valid(&json!({"value": 1, "next": {"value": 2, "next": {"value": 3}}}))
        .unwrap());
    assert!(!validator
        .is_valid(&json!({"value": 1, "next": {"value": "two"}}))
        .unwrap());
}

#[test]
fn test_meta_schema_refs_resolve_from_builtin_store() {
    // check_schema walks the draft 7 meta-schema, whose internal "#"
    // references resolve against the registered document store.
    let config = jsonvet::by_version("draft7").unwrap();
    assert!(config
        .check_schema(&json!({
            "type": "object",
            "properties": {"a": {"items": {"type": "string"}}}
        }))
        .is_ok());
    assert!(config.check_schema(&json!({"required": "nope"})).is_err());
}
