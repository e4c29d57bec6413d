//! Application context shared by every request handler.
//!
//! Built once at startup and handed to the server behind an `Arc`. It is
//! never mutated afterwards, so handlers read it concurrently without locks.

use std::path::{Path, PathBuf};
use std::time::Instant;

use weatherguard_model::{LoadedModel, ModelTypeTag, load_latest_model};

#[derive(Debug)]
pub struct AppContext {
    model: Option<LoadedModel>,
    /// Why the startup load failed, recorded once.
    load_error: Option<String>,
    mlruns_dir: PathBuf,
    started_at: Instant,
}

impl AppContext {
    /// Load the newest artifact under `mlruns_dir`.
    ///
    /// A failure is logged and kept; the context is then "unavailable" for
    /// the life of the process. No retry is attempted.
    pub fn load(mlruns_dir: &Path) -> Self {
        match load_latest_model(mlruns_dir) {
            Ok(model) => {
                tracing::info!(
                    model_type = %model.model_type,
                    path = %model.path.display(),
                    "Successfully loaded {} model",
                    model.model_type
                );
                Self::with_model(mlruns_dir.to_path_buf(), model)
            }
            Err(e) => {
                tracing::error!("Failed to load model: {e}");
                Self::unavailable(mlruns_dir.to_path_buf(), e.to_string())
            }
        }
    }

    pub fn with_model(mlruns_dir: PathBuf, model: LoadedModel) -> Self {
        Self {
            model: Some(model),
            load_error: None,
            mlruns_dir,
            started_at: Instant::now(),
        }
    }

    pub fn unavailable(mlruns_dir: PathBuf, reason: String) -> Self {
        Self {
            model: None,
            load_error: Some(reason),
            mlruns_dir,
            started_at: Instant::now(),
        }
    }

    pub fn model(&self) -> Option<&LoadedModel> {
        self.model.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_type(&self) -> Option<ModelTypeTag> {
        self.model.as_ref().map(|m| m.model_type)
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn mlruns_dir(&self) -> &Path {
        &self.mlruns_dir
    }

    pub fn uptime_s(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
