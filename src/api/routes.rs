use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::api::health::{HealthResponse, HealthState};
use crate::db::models::to_iso;
use crate::db::{SignalStore, HISTORY_LIMIT};
use crate::engine::SignalModel;
use crate::error::{AppError, Result};
use crate::types::{
    GenerateSignalRequest, GenerateSignalResponse, HistoryEntry, SignalType, GENERATE_PATH,
    HISTORY_PATH,
};

#[derive(Clone)]
pub struct ApiState {
    pub store: SignalStore,
    pub model: Arc<dyn SignalModel>,
    pub health: Arc<HealthState>,
}

impl ApiState {
    pub fn new(store: SignalStore, model: Arc<dyn SignalModel>) -> Self {
        Self {
            store,
            model,
            health: Arc::new(HealthState::new()),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route(GENERATE_PATH, post(generate_signal))
        .route(HISTORY_PATH, get(get_history))
        .route("/health", get(get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn generate_signal(
    State(state): State<ApiState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> std::result::Result<Json<GenerateSignalResponse>, AppError> {
    // An unreadable or oversized body is bad input like any other.
    let result = match body {
        Ok(body) => generate(&state, &body).await,
        Err(rejection) => Err(AppError::Validation(rejection.body_text())),
    };
    match &result {
        Ok(_) => state.health.inc_generated(),
        Err(AppError::Validation(reason)) => {
            warn!("Rejected {GENERATE_PATH} request: {reason}");
            state.health.inc_validation_failures();
        }
        Err(e) => {
            error!("Error in {GENERATE_PATH}: {e}");
            state.health.inc_internal_failures();
        }
    }
    result.map(Json)
}

/// validate -> decide -> persist -> respond. Nothing is written unless the
/// request validates; the response reuses the persisted row's values.
async fn generate(state: &ApiState, body: &[u8]) -> Result<GenerateSignalResponse> {
    let req = GenerateSignalRequest::parse(body)?;
    let decision = state.model.decide(req.pair, req.timeframe);

    let now = Utc::now();
    let record = state
        .store
        .create_signal(req.pair, req.timeframe, decision.signal_type, now)
        .await?;

    let signal_type = record.signal_type.parse::<SignalType>().map_err(|_| {
        AppError::Internal(format!(
            "signal {} stored with type {:?}",
            record.id, record.signal_type
        ))
    })?;

    info!(
        event = "SIGNAL",
        id = record.id,
        pair = %record.pair,
        timeframe = %record.timeframe,
        signal_type = %signal_type,
        confidence = decision.confidence,
        "SIGNAL | {} {} -> {} ({:.2})",
        record.pair, record.timeframe, signal_type, decision.confidence,
    );

    Ok(GenerateSignalResponse {
        signal_type,
        pair: record.pair,
        timeframe: record.timeframe,
        timestamp: to_iso(record.entry_time.unwrap_or(now)),
        confidence: decision.confidence,
    })
}

async fn get_history(State(state): State<ApiState>) -> Json<Vec<HistoryEntry>> {
    let now = Utc::now();
    let entries = state
        .store
        .recent_signals(HISTORY_LIMIT)
        .await
        .into_iter()
        .map(|r| HistoryEntry {
            id: r.id,
            pair: r.pair,
            timeframe: r.timeframe,
            signal_type: r.signal_type,
            entry_time: to_iso(r.entry_time.unwrap_or(now)),
        })
        .collect();

    Json(entries)
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let stored = match state.store.count().await {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("Health count failed: {e}");
            None
        }
    };
    Json(state.health.snapshot(stored))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::db::store::tests::{fail_inserts, fail_selects};
    use crate::engine::{confidence_band, RandomModel};
    use crate::error::{INTERNAL_ERROR_MESSAGE, INVALID_INPUT_MESSAGE};
    use crate::types::{AssetPair, Timeframe};

    async fn test_app() -> (Router, SignalStore) {
        let store = SignalStore::in_memory().await.unwrap();
        let state = ApiState::new(store.clone(), Arc::new(RandomModel::seeded(1)));
        (router(state), store)
    }

    fn post_generate(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(GENERATE_PATH)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn generate_body(pair: &str, timeframe: &str) -> String {
        serde_json::json!({ "pair": pair, "timeframe": timeframe }).to_string()
    }

    #[tokio::test]
    async fn every_valid_combination_succeeds_within_band() {
        let (app, store) = test_app().await;

        for pair in AssetPair::ALL {
            for tf in Timeframe::ALL {
                let (status, body) =
                    send(&app, post_generate(&generate_body(pair.as_str(), tf.as_str()))).await;
                assert_eq!(status, StatusCode::OK, "{pair} {tf}: {body}");

                let t = body["type"].as_str().unwrap();
                assert!(t == "CALL" || t == "PUT", "type={t}");
                assert_eq!(body["pair"], pair.as_str());
                assert_eq!(body["timeframe"], tf.as_str());

                let confidence = body["confidence"].as_f64().unwrap();
                let (low, high) = confidence_band(tf);
                assert!(confidence >= low && confidence < high, "{tf}: {confidence}");
            }
        }

        assert_eq!(store.count().await.unwrap(), 40);
    }

    #[tokio::test]
    async fn eur_usd_one_minute_scenario() {
        let (app, _store) = test_app().await;
        let (status, body) = send(&app, post_generate(&generate_body("EUR/USD OTC", "1m"))).await;

        assert_eq!(status, StatusCode::OK);
        let resp: GenerateSignalResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.pair, "EUR/USD OTC");
        assert_eq!(resp.timeframe, "1m");
        assert!(resp.confidence >= 0.85 && resp.confidence < 0.95);
        resp.validate().unwrap();
    }

    #[tokio::test]
    async fn unknown_pair_is_rejected_without_a_row() {
        let (app, store) = test_app().await;
        let (status, body) = send(&app, post_generate(&generate_body("XXX", "1m"))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "message": INVALID_INPUT_MESSAGE }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn malformed_requests_are_rejected_without_a_row() {
        let (app, store) = test_app().await;

        for raw in [
            generate_body("EUR/USD OTC", "10m"),
            r#"{"pair":"EUR/USD OTC"}"#.to_string(),
            r#"{"pair":null,"timeframe":"1m"}"#.to_string(),
            "{".to_string(),
            String::new(),
        ] {
            let (status, body) = send(&app, post_generate(&raw)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body={raw:?}");
            assert_eq!(body["message"], INVALID_INPUT_MESSAGE);
        }
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_as_invalid_input() {
        let (app, store) = test_app().await;
        let padding = "x".repeat(3 * 1024 * 1024);
        let raw = serde_json::json!({
            "pair": "EUR/USD OTC",
            "timeframe": "1m",
            "padding": padding,
        })
        .to_string();

        let (status, body) = send(&app, post_generate(&raw)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "message": INVALID_INPUT_MESSAGE }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicates_each_persist_on_file_database() {
        let path = std::env::temp_dir().join(format!(
            "signal-desk-concurrent-{}-{}.db",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let store = SignalStore::connect(path.to_str().unwrap()).await.unwrap();
        let app = router(ApiState::new(store.clone(), Arc::new(RandomModel::new())));

        const N: usize = 50;
        let mut tasks = Vec::with_capacity(N);
        for _ in 0..N {
            let app = app.clone();
            tasks.push(tokio::spawn(async move {
                send(&app, post_generate(&generate_body("EUR/USD OTC", "1m"))).await
            }));
        }

        for task in tasks {
            let (status, body) = task.await.unwrap();
            assert_eq!(status, StatusCode::OK, "{body}");
        }
        assert_eq!(store.count().await.unwrap(), N as i64);

        let (_, history) = send(&app, get_request(HISTORY_PATH)).await;
        assert_eq!(history.as_array().unwrap().len(), HISTORY_LIMIT as usize);

        drop(app);
        drop(store);
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }

    #[tokio::test]
    async fn insert_failure_returns_500_and_no_row() {
        let (app, store) = test_app().await;
        fail_inserts(&store).await;

        let (status, body) = send(&app, post_generate(&generate_body("AUD/USD OTC", "30s"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);
        assert!(body["details"].is_string());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn history_returns_min_n_10_newest_first() {
        let (app, _store) = test_app().await;

        for n in 1..=12 {
            send(&app, post_generate(&generate_body("EUR/GBP OTC", "5s"))).await;

            let (status, body) = send(&app, get_request(HISTORY_PATH)).await;
            assert_eq!(status, StatusCode::OK);
            let history: Vec<HistoryEntry> = serde_json::from_value(body).unwrap();
            assert_eq!(history.len(), n.min(10));

            for w in history.windows(2) {
                assert!(w[0].entry_time >= w[1].entry_time);
                if w[0].entry_time == w[1].entry_time {
                    assert!(w[0].id > w[1].id);
                }
            }
        }
    }

    #[tokio::test]
    async fn response_timestamp_matches_persisted_entry_time() {
        let (app, _store) = test_app().await;

        let (_, generated) = send(&app, post_generate(&generate_body("USD/CHF OTC", "5m"))).await;
        let (_, history) = send(&app, get_request(HISTORY_PATH)).await;

        assert_eq!(history[0]["entryTime"], generated["timestamp"]);
        assert_eq!(history[0]["type"], generated["type"]);
    }

    #[tokio::test]
    async fn history_read_failure_is_an_empty_list() {
        let (app, store) = test_app().await;
        send(&app, post_generate(&generate_body("EUR/JPY OTC", "1s"))).await;
        fail_selects(&store).await;

        let (status, body) = send(&app, get_request(HISTORY_PATH)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn health_counts_outcomes() {
        let (app, _store) = test_app().await;
        send(&app, post_generate(&generate_body("GBP/USD OTC", "1m"))).await;
        send(&app, post_generate(&generate_body("nope", "1m"))).await;

        let (status, body) = send(&app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["uptime_secs"].is_u64());
        assert_eq!(body["stored_signals"], 1);
        assert_eq!(body["signals_generated"], 1);
        assert_eq!(body["validation_failures"], 1);
        assert_eq!(body["internal_failures"], 0);
    }
}
