use crate::tools::{Echo, Tool};
use serde_json::json;

#[tokio::test]
async fn test_echo_returns_v() {
    let outcome = Echo.execute(json!({"v": "x"})).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.data, Some(json!("x")));
}

#[tokio::test]
async fn test_echo_structured_value() {
    let value = json!({"nested": [1, 2, {"k": null}]});
    let outcome = Echo.execute(json!({"v": value.clone()})).await.unwrap();
    assert_eq!(outcome.data, Some(value));
}

#[tokio::test]
async fn test_echo_missing_v_is_application_failure() {
    let outcome = Echo.execute(json!({})).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("'v'"));
}

#[test]
fn test_echo_schema() {
    let schema = Echo.parameters_schema();
    assert_eq!(schema["required"], json!(["v"]));
    assert!(schema["properties"]["v"].is_object());
}
