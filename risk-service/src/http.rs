//! HTTP listener and JSON routing.
//!
//! A single `tiny_http` listener is shared by a fixed pool of blocking
//! workers. Each worker receives a request, runs the handler inline
//! (inference is short and CPU-bound) and writes the reply. Routing itself
//! is a pure function over the context so it can be tested without sockets.

use std::io::{Cursor, Read};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tokio::sync::watch;

use crate::context::AppContext;
use crate::engine::{self, PredictError, PredictRequest};
use crate::governorates::sorted_governorates;
use crate::protocol::{
    DETAIL_MODEL_NOT_LOADED, DETAIL_PREDICTION_PREFIX, ErrorBody, HealthResponse, ROOT_MESSAGE,
    RootResponse,
};

pub const ROOT_PATH: &str = "/";
pub const HEALTH_PATH: &str = "/api/health";
pub const GOVERNORATES_PATH: &str = "/api/governorates";
pub const PREDICT_PATH: &str = "/api/predict";

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Largest request body accepted; a predict request is a few hundred bytes.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Status code and JSON body produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: serde_json::Value,
}

impl HttpReply {
    fn json<T: Serialize>(status: u16, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(body) => Self { status, body },
            Err(e) => Self::error(500, format!("Serialize error: {e}")),
        }
    }

    fn error(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: serde_json::to_value(ErrorBody::new(detail)).unwrap_or_default(),
        }
    }

    fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        let bytes = serde_json::to_vec(&self.body).unwrap_or_else(|_| b"{}".to_vec());
        let response = Response::from_data(bytes).with_status_code(StatusCode(self.status));
        match Header::from_bytes(&b"Content-Type"[..], JSON_CONTENT_TYPE.as_bytes()) {
            Ok(header) => response.with_header(header),
            Err(()) => response,
        }
    }
}

/// Dispatch one request. `url` may carry a query string, which is ignored.
pub fn route(context: &AppContext, method: &Method, url: &str, body: &[u8]) -> HttpReply {
    match (normalize_path(url), method) {
        (ROOT_PATH, Method::Get) => HttpReply::json(
            200,
            &RootResponse {
                message: ROOT_MESSAGE.to_string(),
            },
        ),
        (HEALTH_PATH, Method::Get) => {
            HttpReply::json(200, &HealthResponse::new(context.model_type()))
        }
        (GOVERNORATES_PATH, Method::Get) => HttpReply::json(200, &sorted_governorates()),
        (PREDICT_PATH, Method::Post) => handle_predict(context, body),
        (ROOT_PATH | HEALTH_PATH | GOVERNORATES_PATH | PREDICT_PATH, _) => {
            HttpReply::error(405, "Method Not Allowed")
        }
        _ => HttpReply::error(404, "Not Found"),
    }
}

fn normalize_path(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.trim_end_matches('/') {
        "" => ROOT_PATH,
        trimmed => trimmed,
    }
}

fn handle_predict(context: &AppContext, body: &[u8]) -> HttpReply {
    let request: PredictRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => return HttpReply::error(422, format!("Invalid request body: {e}")),
    };

    match engine::predict(context, &request) {
        Ok(assessment) => HttpReply::json(200, &assessment),
        Err(PredictError::ModelUnavailable) => HttpReply::error(503, DETAIL_MODEL_NOT_LOADED),
        Err(e) => {
            tracing::error!(city = %request.city, "Prediction error: {e:?}");
            HttpReply::error(500, format!("{DETAIL_PREDICTION_PREFIX}: {e}"))
        }
    }
}

/// Read at most `limit` bytes; anything longer is rejected with 413.
fn read_body(reader: &mut dyn Read, limit: u64) -> Result<Vec<u8>, HttpReply> {
    let mut body = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut body)
        .map_err(|e| HttpReply::error(400, format!("Failed to read request body: {e}")))?;
    if body.len() as u64 > limit {
        return Err(HttpReply::error(413, format!("Request body exceeds {limit} bytes")));
    }
    Ok(body)
}

fn handle_request(context: &AppContext, mut request: Request) {
    let method = request.method().clone();
    let url = request.url().to_string();

    let reply = match read_body(request.as_reader(), MAX_BODY_BYTES) {
        Ok(body) => route(context, &method, &url, &body),
        Err(reply) => reply,
    };
    tracing::debug!(method = ?method, url = %url, status = reply.status, "request");

    if let Err(e) = request.respond(reply.into_response()) {
        tracing::warn!("Failed to send response: {e}");
    }
}

/// The bound listener, ready to be driven by [`HttpServer::run`].
pub struct HttpServer {
    server: Arc<Server>,
    local_addr: SocketAddr,
}

impl HttpServer {
    pub fn bind(addr: SocketAddr) -> std::io::Result<Self> {
        let server = Server::http(addr).map_err(std::io::Error::other)?;
        let local_addr = server.server_addr().to_ip().unwrap_or(addr);
        Ok(Self {
            server: Arc::new(server),
            local_addr,
        })
    }

    /// Actual listening address (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `shutdown` flips to `true` (or its sender is dropped).
    pub async fn run(
        self,
        context: Arc<AppContext>,
        workers: usize,
        mut shutdown: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let workers = workers.max(1);
        let stopping = Arc::new(AtomicBool::new(false));
        tracing::info!(workers, "WeatherGuardTN API listening on http://{}", self.local_addr);

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let server = Arc::clone(&self.server);
            let context = Arc::clone(&context);
            let stopping = Arc::clone(&stopping);
            handles.push(tokio::task::spawn_blocking(move || {
                worker_loop(worker, &server, &context, &stopping);
            }));
        }

        while !*shutdown.borrow() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }

        stopping.store(true, Ordering::SeqCst);
        // Each unblock releases exactly one worker parked in recv().
        for _ in 0..workers {
            self.server.unblock();
        }
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("HTTP worker failed: {e}");
            }
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn worker_loop(worker: usize, server: &Server, context: &AppContext, stopping: &AtomicBool) {
    while !stopping.load(Ordering::SeqCst) {
        match server.recv() {
            Ok(request) => handle_request(context, request),
            Err(e) => {
                if stopping.load(Ordering::SeqCst) {
                    break;
                }
                tracing::warn!(worker, "Receive error: {e}");
            }
        }
    }
    tracing::debug!(worker, "HTTP worker exiting");
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::engine::test_support::{context_with, fixed};
    use pretty_assertions::assert_eq;
    use weatherguard_model::{ArtifactDocument, ClassifierArtifact, ModelTypeTag};

    fn unavailable() -> AppContext {
        AppContext::unavailable(PathBuf::from("mlruns"), "no model".to_string())
    }

    #[test]
    fn root_message() {
        let reply = route(&unavailable(), &Method::Get, "/", b"");
        assert_eq!(reply.status, 200);
        assert_eq!(
            reply.body,
            serde_json::json!({ "message": "WeatherGuardTN API is running" })
        );
    }

    #[test]
    fn health_before_model_then_predict_is_503() {
        let context = unavailable();
        let health = route(&context, &Method::Get, "/api/health", b"");
        assert_eq!(health.status, 200);
        assert_eq!(
            health.body,
            serde_json::json!({ "status": "healthy", "model": "not_loaded", "model_type": null })
        );

        let predict = route(&context, &Method::Post, "/api/predict", br#"{"city":"Tunis"}"#);
        assert_eq!(predict.status, 503);
        assert_eq!(predict.body, serde_json::json!({ "detail": "Model not loaded" }));
    }

    #[test]
    fn governorates_are_sorted() {
        let reply = route(&unavailable(), &Method::Get, "/api/governorates/", b"");
        assert_eq!(reply.status, 200);
        let names = reply.body.as_array().map(Vec::len);
        assert_eq!(names, Some(24));
        assert_eq!(reply.body[0], "Ariana");
        assert_eq!(reply.body[23], "Zaghouan");
    }

    #[test]
    fn predict_returns_assessment() {
        let (_, context) = fixed(vec![0.15, 0.85]);
        let body = serde_json::json!({
            "city": "Sfax",
            "date": "2025-08-02",
            "temp_max": 42.0,
            "temp_min": 28.0,
            "humidity": 15,
            "wind_speed": 25
        });
        let reply = route(
            &context,
            &Method::Post,
            "/api/predict?verbose=1",
            body.to_string().as_bytes(),
        );
        assert_eq!(reply.status, 200);
        assert_eq!(
            reply.body,
            serde_json::json!({
                "risk_level": "red",
                "probability": 0.85,
                "recommendation": "DANGER EXTRÊME - suivez les instructions des autorités",
                "model_used": "lightgbm",
                "details": {
                    "city": "Sfax",
                    "date": "2025-08-02",
                    "temp_max": 42.0,
                    "temp_min": 28.0,
                    "humidity_percent": 15.0,
                    "wind_speed_kmh": 25.0,
                    "city_encoded": 6,
                    "raw_probability": 0.85
                }
            })
        );
    }

    #[test]
    fn bad_date_is_a_500_with_message() {
        let (_, context) = fixed(vec![0.9, 0.1]);
        let reply = route(
            &context,
            &Method::Post,
            "/api/predict",
            br#"{"city":"Tunis","date":"2025-13-45"}"#,
        );
        assert_eq!(reply.status, 500);
        let detail = reply.body["detail"].as_str().unwrap_or_default();
        assert!(detail.starts_with("Erreur de prédiction: invalid date"), "{detail}");
    }

    #[test]
    fn malformed_body_is_422() {
        let (_, context) = fixed(vec![0.9, 0.1]);
        let reply = route(&context, &Method::Post, "/api/predict", br#"{"temp_max": 30}"#);
        assert_eq!(reply.status, 422);
        let reply = route(&context, &Method::Post, "/api/predict", b"not json");
        assert_eq!(reply.status, 422);
    }

    #[test]
    fn unknown_route_and_wrong_method() {
        let context = unavailable();
        assert_eq!(route(&context, &Method::Get, "/api/forecast", b"").status, 404);
        assert_eq!(route(&context, &Method::Get, "/api/predict", b"").status, 405);
        assert_eq!(route(&context, &Method::Post, "/api/health", b"").status, 405);
    }

    #[test]
    fn body_size_is_capped() {
        let small = br#"{"city":"Tunis"}"#;
        let body = read_body(&mut Cursor::new(&small[..]), 16).expect("fits exactly");
        assert_eq!(body, small.to_vec());

        let err = read_body(&mut Cursor::new(vec![b' '; 17]), 16).unwrap_err();
        assert_eq!(err.status, 413);
        assert_eq!(
            err.body,
            serde_json::json!({ "detail": "Request body exceeds 16 bytes" })
        );
    }

    #[test]
    fn narrow_model_fails_prediction_with_500() {
        let document = ArtifactDocument::from_json_str(
            r#"{
                "class_name": "LGBMClassifier",
                "n_features_in": 4,
                "estimator": { "type": "constant", "class_probabilities": [0.7, 0.3] }
            }"#,
        )
        .expect("parse");
        let context = context_with(
            ClassifierArtifact::from_document(document),
            ModelTypeTag::LightGbm,
        );

        let reply = route(&context, &Method::Post, "/api/predict", br#"{"city":"Tunis"}"#);
        assert_eq!(reply.status, 500);
        assert_eq!(
            reply.body,
            serde_json::json!({
                "detail": "Erreur de prédiction: X has 5 features, but LGBMClassifier is expecting 4 features as input"
            })
        );
    }

    #[test]
    fn api_routes_share_prefix() {
        for path in [HEALTH_PATH, GOVERNORATES_PATH, PREDICT_PATH] {
            assert!(path.starts_with(crate::API_PREFIX), "{path}");
        }
    }

    #[test]
    fn path_normalization() {
        assert_eq!(normalize_path("/api/health?x=1"), "/api/health");
        assert_eq!(normalize_path("/api/health/"), "/api/health");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/?q"), "/");
    }
}
