//! End-to-end dispatch through an isolated worker

use crate::test_utils::{TestDataFactory, seeded_config};
use quant_engine::QuantRouter;
use serde_json::json;
use services_common::{
    RequestEnvelope, ResponseStatus, ServiceError, UNKNOWN_KIND, Worker, WorkerHandle, decode_request,
};

fn spawn_engine() -> WorkerHandle {
    let config = seeded_config(11);
    let worker_config = config.worker.clone();
    Worker::spawn(QuantRouter::new(config), &worker_config).unwrap()
}

#[tokio::test]
async fn test_unknown_type_is_rejected_with_same_id() {
    let handle = spawn_engine();
    let response = handle
        .call(RequestEnvelope::new("abc123", "FOO", json!({})))
        .await
        .unwrap();

    assert_eq!(response.id, "abc123");
    assert_eq!(response.status, ResponseStatus::Error);
    let wire = serde_json::to_value(&response).unwrap();
    assert_eq!(wire["type"], "ERROR");
    assert!(wire.get("data").is_none());

    let snapshot = handle.metrics().snapshot();
    assert_eq!(snapshot.kinds[UNKNOWN_KIND].rejected, 1);
    assert!(!snapshot.kinds.contains_key("FOO"));
}

#[tokio::test]
async fn test_concurrent_requests_are_demultiplexed() {
    let handle = spawn_engine();

    let mut pending = Vec::new();
    for i in 0..8 {
        let request = if i % 2 == 0 {
            RequestEnvelope::new(
                format!("risk-{i}"),
                "RISK_METRICS",
                json!({"returns": TestDataFactory::noisy_returns(50, i)}),
            )
        } else {
            RequestEnvelope::new(
                format!("mc-{i}"),
                "MONTE_CARLO",
                json!({"initialValue": 100.0, "expectedReturn": 0.0, "volatility": 0.01, "timeHorizon": 10, "simulations": 50}),
            )
        };
        pending.push(handle.submit(request).await.unwrap());
    }

    // Await in reverse to make sure ordering is by id, not arrival
    for p in pending.into_iter().rev() {
        let expected = p.id().to_string();
        let response = p.wait().await.unwrap();
        assert_eq!(response.id, expected);
        assert!(response.is_success(), "{:?}", response.error);
        if expected.starts_with("risk") {
            assert!(response.data.unwrap()["valueAtRisk"].is_number());
        } else {
            assert_eq!(response.data.unwrap()["simulationCount"], 50);
        }
    }

    assert_eq!(handle.pending_count(), 0);
    let snapshot = handle.metrics().snapshot();
    assert_eq!(snapshot.total_received(), 8);
    assert_eq!(snapshot.kinds["RISK_METRICS"].resolved, 4);
    assert_eq!(snapshot.kinds["MONTE_CARLO"].resolved, 4);
}

#[tokio::test]
async fn test_duplicate_in_flight_id_refused() {
    let handle = spawn_engine();
    let heavy = json!({"initialValue": 100.0, "expectedReturn": 0.0, "volatility": 0.01, "timeHorizon": 200, "simulations": 20000});

    let first = handle
        .submit(RequestEnvelope::new("dup", "MONTE_CARLO", heavy.clone()))
        .await
        .unwrap();
    let second = handle.submit(RequestEnvelope::new("dup", "MONTE_CARLO", heavy)).await;
    assert!(matches!(second, Err(ServiceError::DuplicateRequestId(id)) if id == "dup"));

    assert!(first.wait().await.unwrap().is_success());
}

#[tokio::test]
async fn test_rejections_are_counted() {
    let handle = spawn_engine();
    let response = handle
        .call(RequestEnvelope::new("bad", "RISK_METRICS", json!({"returns": []})))
        .await
        .unwrap();
    assert_eq!(response.status, ResponseStatus::Error);
    assert_eq!(handle.metrics().snapshot().total_rejected(), 1);
}

#[tokio::test]
async fn test_raw_line_round_trip() {
    let handle = spawn_engine();
    let line = r#"{"id":"line-1","type":"TECHNICAL_INDICATORS","data":{"prices":[10,11,12,13,14],"indicators":["sma"],"smaPeriod":2}}"#;
    let request = decode_request(line).unwrap();
    let response = handle.call(request).await.unwrap();

    let encoded = serde_json::to_value(&response).unwrap();
    assert_eq!(
        encoded,
        json!({"id": "line-1", "type": "SUCCESS", "data": {"sma": [10.5, 11.5, 12.5, 13.5]}})
    );
}
