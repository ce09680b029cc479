use canopy_model::FieldData;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn nested() -> FieldData {
    serde_json::from_value(json!({
        "core": {"Title": "Hello", "Body": "<p>Hi</p>"},
        "a": {"b": {"c": "leaf"}}
    }))
    .unwrap()
}

// ── get ──────────────────────────────────────────────────────────

#[test]
fn get_returns_leaf_when_fully_present() {
    assert_eq!(nested().get("a.b.c"), Some(&json!("leaf")));
}

#[test]
fn get_returns_none_when_first_segment_missing() {
    assert_eq!(nested().get("x.b.c"), None);
}

#[test]
fn get_returns_none_when_middle_segment_missing() {
    assert_eq!(nested().get("a.x.c"), None);
}

#[test]
fn get_returns_none_when_leaf_missing() {
    assert_eq!(nested().get("a.b.x"), None);
}

#[test]
fn get_single_segment() {
    let data: FieldData = serde_json::from_value(json!({"title": "t"})).unwrap();
    assert_eq!(data.get("title"), Some(&json!("t")));
}

#[test]
fn get_on_empty_document() {
    assert_eq!(FieldData::new().get("core.Title"), None);
}

// ── set ──────────────────────────────────────────────────────────

#[test]
fn set_creates_intermediate_objects() {
    let mut data = FieldData::new();
    data.set("address.city", json!("Berlin"));
    assert_eq!(data.into_value(), json!({"address": {"city": "Berlin"}}));
}

#[test]
fn set_keeps_sibling_keys() {
    let mut data = nested();
    data.set("core.Date", json!("2014-01-01T00:00:00.000000000Z"));
    assert_eq!(data.get("core.Title"), Some(&json!("Hello")));
    assert_eq!(
        data.get("core.Date"),
        Some(&json!("2014-01-01T00:00:00.000000000Z"))
    );
}

#[test]
fn set_overwrites_existing_leaf() {
    let mut data = nested();
    data.set("core.Title", json!("Changed"));
    assert_eq!(data.get("core.Title"), Some(&json!("Changed")));
}

#[test]
fn serializes_as_plain_object() {
    let mut data = FieldData::new();
    data.set("core.Title", json!("T"));
    assert_eq!(
        serde_json::to_string(&data).unwrap(),
        r#"{"core":{"Title":"T"}}"#
    );
}

fn id_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-Z][a-zA-Z0-9]{0,6}", 1..5).prop_map(|parts| parts.join("."))
}

proptest! {
    #[test]
    fn set_then_get_returns_value(id in id_strategy(), value in "[ -~]{0,20}") {
        let mut data = FieldData::new();
        data.set(&id, json!(value.clone()));
        prop_assert_eq!(data.get(&id), Some(&json!(value)));
    }

    #[test]
    fn set_on_populated_document_then_get(id in id_strategy(), value in any::<i64>()) {
        let mut data = nested();
        data.set(&id, json!(value));
        prop_assert_eq!(data.get(&id), Some(&json!(value)));
    }
}
