//! Error model tests

use super::*;
use serde_json::json;

fn error_with(keyword: &str, schema_path: &[&str], path: &[PathSegment]) -> ValidationError {
    let mut error = ValidationError::new(format!("{} failed", keyword)).keyword(keyword);
    error.schema_path = schema_path.iter().map(|s| PathSegment::from(*s)).collect();
    error.path = path.iter().cloned().collect();
    error
}

#[test]
fn test_fill_details_does_not_overwrite() {
    let mut error = ValidationError::new("boom").keyword("custom");
    error.fill_details("type", &json!("integer"), &json!("5"), &json!({}));

    assert_eq!(error.keyword.as_deref(), Some("custom"));
    assert_eq!(error.keyword_value, Some(json!("integer")));
    assert_eq!(error.instance, Some(json!("5")));
}

#[test]
fn test_json_path_rendering() {
    let mut error = ValidationError::new("bad");
    error.path.push_back(PathSegment::from("items"));
    error.path.push_back(PathSegment::from(3usize));
    error.path.push_back(PathSegment::from("name"));

    assert_eq!(error.json_path(), "$.items[3].name");
}

#[test]
fn test_best_match_prefers_deeper_schema_path() {
    let shallow = error_with("anyOf", &["anyOf"], &[]);
    let deep = error_with("minimum", &["properties", "age", "minimum"], &[]);

    let best = best_match(vec![shallow, deep]).unwrap();
    assert_eq!(best.keyword.as_deref(), Some("minimum"));
}

#[test]
fn test_best_match_descends_into_context() {
    let child = error_with("type", &["type"], &[]);
    let parent = error_with("anyOf", &["anyOf"], &[]).context(vec![child]);

    let best = best_match(vec![parent]).unwrap();
    assert_eq!(best.keyword.as_deref(), Some("type"));
}

#[test]
fn test_best_match_empty() {
    assert!(best_match(Vec::new()).is_none());
}

#[test]
fn test_error_tree_groups_by_instance_path() {
    let first = error_with("type", &["type"], &[PathSegment::from(0usize)]);
    let second = error_with("minimum", &["minimum"], &[PathSegment::from(0usize)]);
    let third = error_with("required", &["required"], &[]);

    let tree = ErrorTree::from_errors(vec![first, second, third]);
    assert_eq!(tree.total_errors(), 3);
    assert!(tree.errors.contains_key("required"));

    let at_zero = tree.child(&PathSegment::from(0usize)).unwrap();
    assert!(at_zero.errors.contains_key("type"));
    assert!(at_zero.errors.contains_key("minimum"));
}
