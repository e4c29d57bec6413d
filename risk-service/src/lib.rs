//! `weatherguard-service`: weather-danger risk API for Tunisian governorates.
//!
//! Loads the newest trained classifier from the experiment tree once at
//! startup, then answers JSON requests over HTTP under `/api`:
//!
//! - `GET  /api/health`       service and model status
//! - `GET  /api/governorates` display names of the 24 governorates
//! - `POST /api/predict`      risk tier for one city/day of weather
//!
//! A failed model load does not stop the process: the service starts in a
//! degraded state and every prediction answers 503 until restarted.

pub mod client;
pub mod config;
pub mod context;
pub mod engine;
pub mod governorates;
pub mod http;
pub mod probe;
pub mod protocol;
pub mod risk;
pub mod scenarios;

/// Prefix shared by every API route.
pub const API_PREFIX: &str = "/api";
