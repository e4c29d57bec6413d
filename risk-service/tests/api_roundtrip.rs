#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end test over a real socket.
//!
//!   1. Write a forest artifact into a temp `mlruns/` tree
//!   2. Start the service on an ephemeral port
//!   3. Query health, governorates, predict as an HTTP client
//!   4. Shut down through the watch channel
//!
//! A second test replays the canned scenario suites through the client, a
//! third starts without any artifact and checks the degraded mode.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio::sync::watch;
use weatherguard_service::context::AppContext;
use weatherguard_service::client::{ApiClient, ping};
use weatherguard_service::http::HttpServer;
use weatherguard_service::risk::RiskLevel;
use weatherguard_service::scenarios::{Suite, run_scenarios};

const FOREST_JSON: &str = r#"{
    "class_name": "RandomForestClassifier",
    "n_features_in": 5,
    "feature_names": ["temp_max_fb", "temp_min_fb", "humidity_percent_hist_fb", "wind_speed_kmh_hist_fb", "city_encoded"],
    "estimator": {
        "type": "random_forest",
        "trees": [{ "nodes": [
            { "feature_index": 0, "threshold": 35.0, "left": 1, "right": 2 },
            { "value": 0.1 },
            { "value": 0.9 }
        ]}]
    }
}"#;

struct RunningService {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl RunningService {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn stop(self) {
        self.shutdown.send(true).expect("send shutdown");
        tokio::time::timeout(std::time::Duration::from_secs(5), self.handle)
            .await
            .expect("server should stop promptly")
            .expect("server task");
    }
}

fn start_service(mlruns: &Path) -> RunningService {
    let context = Arc::new(AppContext::load(mlruns));
    let server = HttpServer::bind("127.0.0.1:0".parse().unwrap()).expect("bind");
    let addr = server.local_addr();
    let (shutdown, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        server.run(context, 2, shutdown_rx).await.unwrap();
    });
    RunningService {
        addr,
        shutdown,
        handle,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn predict_over_http_with_forest_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let mlruns = dir.path().join("mlruns");
    let artifact = mlruns.join("123/abc/artifacts/model.json");
    std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
    std::fs::write(&artifact, FOREST_JSON).unwrap();

    let service = start_service(&mlruns);
    let client = reqwest::Client::new();

    // Health
    let health = ping(service.addr).await.expect("ping");
    assert_eq!(health.model, "loaded");
    assert_eq!(
        serde_json::to_value(&health).unwrap(),
        serde_json::json!({ "status": "healthy", "model": "loaded", "model_type": "randomforest" })
    );

    // Root
    let root: serde_json::Value = client
        .get(service.url("/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(root["message"], "WeatherGuardTN API is running");

    // Governorates
    let names: Vec<String> = client
        .get(service.url("/api/governorates"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(names.len(), 24);
    assert_eq!(names.first().map(String::as_str), Some("Ariana"));

    // Predict: hot day in Sfax goes right of the split.
    let resp = client
        .post(service.url("/api/predict"))
        .json(&serde_json::json!({
            "city": "Sfax",
            "date": "2025-08-02",
            "temp_max": 42.0,
            "temp_min": 28.0,
            "humidity_percent": 15.0,
            "wind_speed_kmh": 25.0
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default(),
        "application/json; charset=utf-8"
    );
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["risk_level"], "red");
    assert_eq!(body["probability"], 0.9);
    assert_eq!(body["model_used"], "randomforest");
    assert_eq!(body["details"]["city_encoded"], 6);
    assert_eq!(body["details"]["date"], "2025-08-02");

    // Predict: defaults only, normal day in Tunis.
    let body: serde_json::Value = client
        .post(service.url("/api/predict"))
        .json(&serde_json::json!({ "city": "tunis", "date": "2025-07-14" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["risk_level"], "green");
    assert_eq!(body["details"]["temp_max"], 25.0);
    assert_eq!(body["details"]["city_encoded"], 1);

    // Bad date surfaces as a prediction failure.
    let resp = client
        .post(service.url("/api/predict"))
        .json(&serde_json::json!({ "city": "Tunis", "date": "yesterday" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);

    // Unknown route.
    let resp = client.get(service.url("/api/nope")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    service.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scenario_suites_all_assess_with_forest_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let mlruns = dir.path().join("mlruns");
    let artifact = mlruns.join("123/abc/artifacts/model.json");
    std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
    std::fs::write(&artifact, FOREST_JSON).unwrap();

    let service = start_service(&mlruns);
    let client = ApiClient::new(service.addr).unwrap();
    let results = run_scenarios(&client).await.expect("scenarios");

    let count = |suite: Suite| results.iter().filter(|r| r.scenario.suite == suite).count();
    assert_eq!(count(Suite::Weather), 5);
    assert_eq!(count(Suite::Governorates), 24);
    assert_eq!(count(Suite::Extremes), 5);
    assert!(results.iter().all(|r| r.outcome.assessment().is_some()));

    let find = |name: &str| {
        results
            .iter()
            .find(|r| r.scenario.name == name)
            .and_then(|r| r.outcome.assessment())
            .unwrap_or_else(|| panic!("no assessment for {name}"))
    };
    let desert = find("Desert heat");
    assert_eq!(desert.risk_level, RiskLevel::Red);
    assert_eq!(desert.details.city_encoded, 21);
    assert_eq!(find("Storm conditions").risk_level, RiskLevel::Green);
    // Accented display names fall back to the unknown-city code.
    assert_eq!(find("Gabès").details.city_encoded, 0);

    let missing = find("Missing data");
    assert_eq!(missing.details.temp_max, 25.0);
    assert_eq!(missing.details.city_encoded, 1);

    assert!(results[0].to_string().starts_with("[weather] Normal day"));

    service.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn degraded_mode_without_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let service = start_service(&dir.path().join("mlruns"));
    let client = reqwest::Client::new();

    let health = ping(service.addr).await.expect("ping");
    assert_eq!(health.model, "not_loaded");
    assert_eq!(health.model_type, None);

    let resp = client
        .post(service.url("/api/predict"))
        .json(&serde_json::json!({ "city": "Tunis" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 503);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "detail": "Model not loaded" }));

    service.stop().await;
}
