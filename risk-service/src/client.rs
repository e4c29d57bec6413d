//! HTTP client for a running service, used by the `ping` and `scenarios`
//! modes and by the end-to-end tests.

use std::net::SocketAddr;
use std::time::Duration;

use crate::engine::{PredictRequest, RiskAssessment};
use crate::http::{GOVERNORATES_PATH, HEALTH_PATH, PREDICT_PATH};
use crate::protocol::{ErrorBody, HealthResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Answer to one `POST /api/predict`.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictOutcome {
    Assessed(RiskAssessment),
    Rejected { status: u16, detail: String },
}

impl PredictOutcome {
    pub fn assessment(&self) -> Option<&RiskAssessment> {
        match self {
            PredictOutcome::Assessed(assessment) => Some(assessment),
            PredictOutcome::Rejected { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(addr: SocketAddr) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: format!("http://{addr}"),
            http,
        })
    }

    pub async fn health(&self) -> Result<HealthResponse, reqwest::Error> {
        self.http
            .get(format!("{}{HEALTH_PATH}", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn governorates(&self) -> Result<Vec<String>, reqwest::Error> {
        self.http
            .get(format!("{}{GOVERNORATES_PATH}", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Non-2xx answers come back as [`PredictOutcome::Rejected`], not as errors.
    pub async fn predict(&self, request: &PredictRequest) -> Result<PredictOutcome, reqwest::Error> {
        let response = self
            .http
            .post(format!("{}{PREDICT_PATH}", self.base_url))
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(PredictOutcome::Assessed(response.json().await?));
        }
        let detail = match response.json::<ErrorBody>().await {
            Ok(body) => body.detail,
            Err(e) => format!("undecodable error body: {e}"),
        };
        Ok(PredictOutcome::Rejected {
            status: status.as_u16(),
            detail,
        })
    }
}

/// Query `/api/health` on a running service.
pub async fn ping(addr: SocketAddr) -> Result<HealthResponse, reqwest::Error> {
    ApiClient::new(addr)?.health().await
}
