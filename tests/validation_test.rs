//! End-to-end validation scenarios across drafts

use serde_json::json;
use std::sync::Arc;

use jsonvet::{best_match, validator_for, Error, ErrorTree, PathSegment, Validator};

#[test]
fn test_one_shot_validate() {
    let schema = json!({"type": "integer", "minimum": 0});
    assert!(jsonvet::validate(&json!(12), &schema).is_ok());

    let error = jsonvet::validate(&json!(-3), &schema).unwrap_err();
    match error {
        Error::Validation(error) => {
            assert_eq!(error.keyword.as_deref(), Some("minimum"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_one_shot_is_valid() {
    let schema = json!({"type": "integer"});
    assert!(jsonvet::is_valid(&json!(5), &schema).unwrap());
    assert!(!jsonvet::is_valid(&json!("5"), &schema).unwrap());
}

#[test]
fn test_validate_rejects_broken_schema() {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": 12
    });
    let result = jsonvet::validate(&json!(1), &schema);
    assert!(matches!(result, Err(Error::Schema(_))));
}

#[test]
fn test_type_mismatch_produces_one_diagnostic() {
    let schema = json!({"type": "integer"});
    let validator = Validator::new(validator_for(&schema), &schema);

    let errors: Vec<_> = validator
        .iter_errors(&json!("5"))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].keyword.as_deref(), Some("type"));
    assert!(errors[0].message.contains("is not of type"));
}

#[test]
fn test_ref_into_definitions() {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "definitions": {
            "positiveInt": {"type": "integer", "minimum": 1}
        },
        "properties": {
            "count": {"$ref": "#/definitions/positiveInt"}
        }
    });
    let validator = Validator::new(validator_for(&schema), &schema);

    assert!(validator.is_valid(&json!({"count": 2})).unwrap());

    let errors: Vec<_> = validator
        .iter_errors(&json!({"count": -1}))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(errors.len(), 1);
    let error = &errors[0];
    assert_eq!(error.keyword.as_deref(), Some("minimum"));
    assert_eq!(error.json_path(), "$.count");
    // The schema path walks through properties/count straight to the
    // referenced constraint; "$ref" never appears.
    assert_eq!(
        error.schema_path,
        vec![
            PathSegment::from("properties"),
            PathSegment::from("count"),
            PathSegment::from("minimum"),
        ]
    );
}

#[test]
fn test_root_level_ref() {
    // check_schema runs before validation and must release its own
    // resolver scopes; the $ref here then resolves from a clean stack.
    let schema = json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "definitions": {
            "positiveInt": {"type": "integer", "minimum": 1}
        },
        "$ref": "#/definitions/positiveInt"
    });
    assert!(jsonvet::validate(&json!(3), &schema).is_ok());

    let error = jsonvet::validate(&json!(-1), &schema).unwrap_err();
    match error {
        Error::Validation(error) => {
            assert_eq!(error.keyword.as_deref(), Some("minimum"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_any_of_nests_children() {
    let schema = json!({"anyOf": [{"minimum": 3}, {"type": "string"}]});
    let validator = Validator::new(validator_for(&schema), &schema);

    let errors: Vec<_> = validator
        .iter_errors(&json!(1))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(errors.len(), 1);

    let wrapper = &errors[0];
    assert_eq!(wrapper.keyword.as_deref(), Some("anyOf"));
    let child_keywords: Vec<_> = wrapper
        .context
        .iter()
        .map(|child| child.keyword.as_deref().unwrap().to_string())
        .collect();
    assert_eq!(child_keywords, ["minimum", "type"]);

    // best_match digs through the wrapper to a concrete child.
    let best = best_match(errors).unwrap();
    assert_ne!(best.keyword.as_deref(), Some("anyOf"));
}

#[test]
fn test_unregistered_schema_uri_degrades() {
    // Degradation is logged, not returned; surface it in test output.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let schema = json!({
        "$schema": "https://example.com/not-a-registered-draft",
        "type": "integer"
    });
    // Selection falls back to the newest draft instead of failing.
    let config = validator_for(&schema);
    assert_eq!(config.version(), Some("draft2020-12"));
    assert!(jsonvet::is_valid(&json!(5), &schema).unwrap());
    assert!(!jsonvet::is_valid(&json!("5"), &schema).unwrap());
}

#[test]
fn test_is_valid_iff_no_diagnostics() {
    let schema = json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "minLength": 1},
            "age": {"type": "integer", "minimum": 0}
        },
        "required": ["name"]
    });
    let validator = Validator::new(validator_for(&schema), &schema);

    let instances = [
        json!({"name": "ada", "age": 36}),
        json!({"name": "", "age": 36}),
        json!({"age": -1}),
        json!({"name": 3}),
        json!([]),
    ];
    for instance in &instances {
        let count = validator.iter_errors(instance).count();
        assert_eq!(
            validator.is_valid(instance).unwrap(),
            count == 0,
            "disagreement on {instance}"
        );
    }
}

#[test]
fn test_draft_selection_changes_semantics() {
    // Draft 4 rejects 1.0 as an integer; later drafts accept it.
    let draft4 = json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "type": "integer"
    });
    let draft7 = json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "integer"
    });
    assert!(!jsonvet::is_valid(&json!(1.0), &draft4).unwrap());
    assert!(jsonvet::is_valid(&json!(1.0), &draft7).unwrap());
}

#[test]
fn test_draft4_ref_erases_siblings() {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "definitions": {"anything": {}},
        "properties": {
            "x": {"$ref": "#/definitions/anything", "type": "string"}
        }
    });
    // The sibling "type" is ignored next to $ref in draft 4.
    assert!(jsonvet::is_valid(&json!({"x": 12}), &schema).unwrap());
}

#[test]
fn test_draft202012_ref_keeps_siblings() {
    let schema = json!({
        "$defs": {"anything": true},
        "properties": {
            "x": {"$ref": "#/$defs/anything", "type": "string"}
        }
    });
    assert!(!jsonvet::is_valid(&json!({"x": 12}), &schema).unwrap());
    assert!(jsonvet::is_valid(&json!({"x": "ok"}), &schema).unwrap());
}

#[test]
fn test_error_tree_groups_by_instance_path() {
    let schema = json!({
        "properties": {
            "a": {"type": "integer", "minimum": 10},
            "b": {"type": "string"}
        }
    });
    let validator = Validator::new(validator_for(&schema), &schema);
    let errors: Vec<_> = validator
        .iter_errors(&json!({"a": 3, "b": 9}))
        .collect::<Result<_, _>>()
        .unwrap();

    let tree = ErrorTree::from_errors(errors);
    assert_eq!(tree.total_errors(), 2);

    let under_a = tree.child(&PathSegment::from("a")).unwrap();
    assert!(under_a.errors.contains_key("minimum"));
    let under_b = tree.child(&PathSegment::from("b")).unwrap();
    assert!(under_b.errors.contains_key("type"));
}

#[test]
fn test_nested_ids_rebase_relative_refs() {
    let schema = json!({
        "$id": "http://example.com/schemas/root.json",
        "$defs": {
            "child": {
                "$id": "http://example.com/schemas/child.json",
                "type": "object",
                "properties": {
                    "value": {"$ref": "#/properties/other"},
                    "other": {"type": "integer"}
                }
            }
        },
        "properties": {
            "nested": {"$ref": "child.json"}
        }
    });
    let validator = Validator::new(validator_for(&schema), &schema);
    assert!(validator
        .is_valid(&json!({"nested": {"value": 1, "other": 2}}))
        .unwrap());
    assert!(!validator
        .is_valid(&json!({"nested": {"value": "x"}}))
        .unwrap());
}

#[test]
fn test_custom_variant_end_to_end() {
    fn must_be_even(
        _validator: &Validator<'_>,
        _value: &serde_json::Value,
        instance: &serde_json::Value,
        _schema: &serde_json::Value,
    ) -> Result<Vec<jsonvet::ValidationError>, Error> {
        let even = instance.as_i64().map(|n| n % 2 == 0).unwrap_or(true);
        if even {
            Ok(Vec::new())
        } else {
            Ok(vec![jsonvet::ValidationError::new(format!(
                "{instance} is not even"
            ))])
        }
    }

    let config = jsonvet::extend(
        &jsonvet::draft::DRAFT7,
        vec![("mustBeEven", must_be_even)],
        None,
        None,
    );

    let schema = json!({"mustBeEven": true, "type": "integer"});
    let validator = Validator::new(Arc::clone(&config), &schema);
    assert!(validator.is_valid(&json!(4)).unwrap());

    let errors: Vec<_> = validator
        .iter_errors(&json!(3))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].keyword.as_deref(), Some("mustBeEven"));
}
