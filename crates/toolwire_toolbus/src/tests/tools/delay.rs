use crate::tools::{Delay, InvalidParams, Tool};
use serde_json::json;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_delay_waits_then_returns_value() {
    let start = Instant::now();
    let outcome = Delay.execute(json!({"ms": 50, "value": "late"})).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(50));
    assert!(outcome.success);
    assert_eq!(outcome.data, Some(json!("late")));
}

#[tokio::test]
async fn test_delay_without_value_returns_null() {
    let outcome = Delay.execute(json!({"ms": 0})).await.unwrap();
    assert_eq!(outcome.data, Some(json!(null)));
}

#[tokio::test]
async fn test_delay_rejects_bad_args() {
    let err = Delay.execute(json!({"ms": "soon"})).await.unwrap_err();
    assert!(err.is::<InvalidParams>());
}

#[tokio::test]
async fn test_delay_caps_duration() {
    let outcome = Delay.execute(json!({"ms": 10_000_000})).await.unwrap();
    assert!(!outcome.success);
}
