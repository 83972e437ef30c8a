//! Shared proptest generators.

use proptest::prelude::*;
use serde_json::{Value, json};

/// Generate numeric resource ids as the providers issue them.
pub fn resource_id_strategy() -> impl Strategy<Value = String> {
    "[1-9][0-9]{0,11}"
}

/// Generate free-text field values.
pub fn text_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ._-]{0,40}"
}

/// Generate provider-only fields the consumer does not model.
pub fn extra_fields_strategy() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::vec(
        (
            "x[a-z]{2,10}",
            prop_oneof![
                any::<i64>().prop_map(Value::from),
                any::<bool>().prop_map(Value::from),
                text_strategy().prop_map(Value::from),
            ],
        ),
        0..4,
    )
}

/// Generate a provider task document, possibly with extra fields.
pub fn task_json_strategy() -> impl Strategy<Value = Value> {
    (
        resource_id_strategy(),
        text_strategy(),
        text_strategy(),
        extra_fields_strategy(),
    )
        .prop_map(|(id, title, content, extra)| {
            let mut task = json!({"id": id, "title": title, "content": content});
            extend(&mut task, extra);
            task
        })
}

/// Generate a provider user document, possibly with extra fields.
pub fn user_json_strategy() -> impl Strategy<Value = Value> {
    (resource_id_strategy(), text_strategy(), extra_fields_strategy()).prop_map(
        |(id, name, extra)| {
            let mut user = json!({"id": id, "name": name});
            extend(&mut user, extra);
            user
        },
    )
}

/// Generate role names.
pub fn role_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("jme_@task_#read".to_string()),
        Just("jme_@user_#read".to_string()),
        Just("some-unrelated-role".to_string()),
        "[a-z]{3,10}".prop_map(|name| format!("jme_@{name}_#read")),
    ]
}

/// Generate HTTP status codes the gateway must not map to a domain error.
pub fn unmapped_status_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![400u16..403, 404u16..500, 500u16..600]
}

fn extend(document: &mut Value, extra: Vec<(String, Value)>) {
    if let Value::Object(map) = document {
        for (name, value) in extra {
            map.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_task_json_has_consumer_fields() {
        let mut runner = TestRunner::default();
        for _ in 0..10 {
            let value = task_json_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert!(value["id"].is_string());
            assert!(value["title"].is_string());
            assert!(value["content"].is_string());
        }
    }

    #[test]
    fn test_unmapped_status_excludes_forbidden() {
        let mut runner = TestRunner::default();
        for _ in 0..50 {
            let value = unmapped_status_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert_ne!(value, 403);
            assert!((400..600).contains(&value));
        }
    }
}
