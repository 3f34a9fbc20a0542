//! Resolver tests

use super::*;
use crate::error::{Error, RefResolutionError};
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

fn resolver_for(schema: serde_json::Value) -> RefResolver {
    RefResolver::from_schema(&schema)
}

#[test]
fn test_scope_push_pop_round_trip() {
    let resolver = resolver_for(json!({}));
    let depth = resolver.scope_depth();

    resolver.push_scope("http://example.com/schema.json");
    assert_eq!(resolver.scope_depth(), depth + 1);
    assert_eq!(
        resolver.resolution_scope(),
        "http://example.com/schema.json"
    );

    resolver.pop_scope().unwrap();
    assert_eq!(resolver.scope_depth(), depth);
}

#[test]
fn test_pop_scope_underflow_is_an_error() {
    let resolver = resolver_for(json!({}));
    resolver.pop_scope().unwrap();
    let result = resolver.pop_scope();
    assert!(matches!(
        result,
        Err(Error::Resolution(RefResolutionError::ScopeUnderflow))
    ));
}

#[test]
fn test_relative_scope_merges_into_base() {
    let resolver = resolver_for(json!({}));
    resolver.push_scope("http://example.com/root/schema.json");
    resolver.push_scope("other.json");
    assert_eq!(
        resolver.resolution_scope(),
        "http://example.com/root/other.json"
    );
}

#[test]
fn test_scope_guard_pops_on_drop() {
    let resolver = resolver_for(json!({}));
    let depth = resolver.scope_depth();
    {
        let _guard = resolver.in_scope("http://example.com/a.json");
        assert_eq!(resolver.scope_depth(), depth + 1);
    }
    assert_eq!(resolver.scope_depth(), depth);
}

#[test]
fn test_resolve_fragment_pointer() {
    let resolver = resolver_for(json!({}));
    let document = json!({"a": {"b": [10, 20, 30]}});
    let resolved = resolver.resolve_fragment(&document, "/a/b/2").unwrap();
    assert_eq!(resolved, json!(30));
}

#[test]
fn test_resolve_fragment_unescapes_reserved_sequences() {
    let resolver = resolver_for(json!({}));
    let document = json!({"slash/name": 1, "tilde~name": 2});
    assert_eq!(
        resolver.resolve_fragment(&document, "/slash~1name").unwrap(),
        json!(1)
    );
    assert_eq!(
        resolver.resolve_fragment(&document, "/tilde~0name").unwrap(),
        json!(2)
    );
}

#[test]
fn test_resolve_fragment_percent_decoding() {
    let resolver = resolver_for(json!({}));
    let document = json!({"a b": 7});
    assert_eq!(
        resolver.resolve_fragment(&document, "/a%20b").unwrap(),
        json!(7)
    );
}

#[test]
fn test_resolve_fragment_anchor() {
    let resolver = resolver_for(json!({}));
    let document = json!({
        "$defs": {
            "inner": {"$anchor": "here", "type": "integer"}
        }
    });
    let resolved = resolver.resolve_fragment(&document, "here").unwrap();
    assert_eq!(resolved, json!({"$anchor": "here", "type": "integer"}));
}

#[test]
fn test_unresolvable_pointer_names_the_fragment() {
    let resolver = resolver_for(json!({}));
    let document = json!({"a": 1});
    let result = resolver.resolve_fragment(&document, "/missing/deeper");
    match result {
        Err(Error::Resolution(RefResolutionError::UnresolvablePointer(fragment))) => {
            assert_eq!(fragment, "missing/deeper");
        }
        other => panic!("expected unresolvable pointer, got {:?}", other.err()),
    }
}

#[test]
fn test_pointer_index_out_of_range() {
    let resolver = resolver_for(json!({}));
    let document = json!([1, 2]);
    assert!(resolver.resolve_fragment(&document, "/5").is_err());
}

#[test]
fn test_pointer_round_trip() {
    let document = json!({
        "definitions": {"positiveInt": {"minimum": 0}},
        "items": [{"a": 1}, {"b": [true, false]}]
    });
    let resolver = resolver_for(json!({}));

    // Walk every reachable path, re-derive the pointer, resolve again.
    fn walk(resolver: &RefResolver, root: &serde_json::Value, node: &serde_json::Value, pointer: String) {
        let resolved = resolver.resolve_fragment(root, &pointer).unwrap();
        assert_eq!(&resolved, node);
        match node {
            serde_json::Value::Object(map) => {
                for (key, child) in map {
                    let escaped = key.replace('~', "~0").replace('/', "~1");
                    walk(resolver, root, child, format!("{}/{}", pointer, escaped));
                }
            }
            serde_json::Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    walk(resolver, root, child, format!("{}/{}", pointer, index));
                }
            }
            _ => {}
        }
    }
    walk(&resolver, &document, &document, String::new());
}

#[test]
fn test_local_resolution_by_id() {
    let schema = json!({
        "$id": "http://example.com/root.json",
        "$defs": {
            "sub": {"$id": "http://example.com/sub.json", "type": "string"}
        }
    });
    let resolver = resolver_for(schema);
    let (url, resolved) = resolver.resolve("http://example.com/sub.json").unwrap();
    assert_eq!(url, "http://example.com/sub.json");
    assert_eq!(resolved.get("type"), Some(&json!("string")));
}

#[test]
fn test_resolve_from_store() {
    let resolver = resolver_for(json!({})).with_store([(
        "http://example.com/stored.json",
        json!({"definitions": {"x": {"const": 1}}}),
    )]);
    let (_, resolved) = resolver
        .resolve("http://example.com/stored.json#/definitions/x")
        .unwrap();
    assert_eq!(*resolved, json!({"const": 1}));
}

#[test]
fn test_remote_fetch_is_performed_once() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let resolver = resolver_for(json!({})).with_handler(
        "test",
        Box::new(move |_uri| {
            counter.set(counter.get() + 1);
            Ok(json!({"a": {"const": 1}, "b": {"const": 2}}))
        }),
    );

    resolver.resolve("test://example/doc.json#/a").unwrap();
    resolver.resolve("test://example/doc.json#/b").unwrap();
    resolver.resolve("test://example/doc.json#/a").unwrap();

    // Sibling fragments reuse the cached document.
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_remote_fetch_without_caching_refetches() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let resolver = resolver_for(json!({}))
        .cache_remote(false)
        .with_handler(
            "test",
            Box::new(move |_uri| {
                counter.set(counter.get() + 1);
                Ok(json!({"a": 1, "b": 2}))
            }),
        );

    resolver.resolve("test://example/doc.json#/a").unwrap();
    resolver.resolve("test://example/doc.json#/b").unwrap();

    assert_eq!(calls.get(), 2);
}

#[test]
fn test_failing_handler_surfaces_resolution_error() {
    let resolver = resolver_for(json!({})).with_handler(
        "broken",
        Box::new(|uri| Err(anyhow::anyhow!("cannot reach {}", uri))),
    );
    let result = resolver.resolve("broken://example/doc.json");
    assert!(matches!(
        result,
        Err(Error::Resolution(RefResolutionError::Fetch { .. }))
    ));
}

#[test]
fn test_unknown_scheme_is_a_resolution_error() {
    let resolver = resolver_for(json!({}));
    let result = resolver.resolve("gopher://example/doc.json");
    assert!(matches!(
        result,
        Err(Error::Resolution(RefResolutionError::UnsupportedScheme { .. }))
    ));
}

#[test]
fn test_resolving_guard_restores_scope() {
    let schema = json!({
        "$id": "http://example.com/root.json",
        "definitions": {"positiveInt": {"minimum": 0}}
    });
    let resolver = resolver_for(schema);
    let depth = resolver.scope_depth();
    {
        let (_guard, resolved) = resolver.resolving("#/definitions/positiveInt").unwrap();
        assert_eq!(*resolved, json!({"minimum": 0}));
        assert_eq!(resolver.scope_depth(), depth + 1);
    }
    assert_eq!(resolver.scope_depth(), depth);
}

#[test]
fn test_join_uri_semantics() {
    assert_eq!(
        join_uri("http://a/b/c.json", "d.json"),
        "http://a/b/d.json"
    );
    assert_eq!(
        join_uri("http://a/b/c.json", "http://x/y.json"),
        "http://x/y.json"
    );
    assert_eq!(join_uri("", "#/definitions/x"), "#/definitions/x");
    assert_eq!(join_uri("http://a/b", ""), "http://a/b");
}

#[test]
fn test_trailing_slash_ignored_when_matching_ids() {
    let schema = json!({
        "$defs": {
            "sub": {"$id": "http://example.com/sub/", "type": "null"}
        }
    });
    let resolver = resolver_for(schema);
    let (_, resolved) = resolver.resolve("http://example.com/sub").unwrap();
    assert_eq!(resolved.get("type"), Some(&json!("null")));
}
