//! Artifact discovery in the experiment-run tree.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;
use wildmatch::WildMatch;

/// Default root of the experiment tracking output, relative to the working directory.
pub const DEFAULT_MLRUNS_DIR: &str = "mlruns";

const ARTIFACT_FILE_PATTERN: &str = "model.*";
const ARTIFACTS_DIR: &str = "artifacts";
const MODELS_DIR: &str = "models";

/// Path shapes that identify a serialized model under the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactPattern {
    /// `**/artifacts/model.*`
    RunArtifact,
    /// `**/models/**/artifacts/model.*`
    RegisteredModel,
}

impl ArtifactPattern {
    pub const ALL: [ArtifactPattern; 2] = [Self::RunArtifact, Self::RegisteredModel];

    /// Match a path relative to the search root.
    pub fn matches(self, relative: &Path) -> bool {
        let Some(file_name) = relative.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if !WildMatch::new(ARTIFACT_FILE_PATTERN).matches(file_name) {
            return false;
        }
        let Some(parent) = relative.parent() else {
            return false;
        };
        if parent.file_name().and_then(|n| n.to_str()) != Some(ARTIFACTS_DIR) {
            return false;
        }
        match self {
            Self::RunArtifact => true,
            Self::RegisteredModel => parent
                .parent()
                .is_some_and(|above| above.components().any(|c| c.as_os_str() == MODELS_DIR)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCandidate {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

/// All matching artifacts under `root`, newest first.
///
/// Equal timestamps keep path order. A missing root yields an empty list.
pub fn find_artifacts(root: &Path) -> Vec<ArtifactCandidate> {
    let mut matched: BTreeSet<PathBuf> = BTreeSet::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("skipping unreadable entry under {}: {e}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if ArtifactPattern::ALL.iter().any(|p| p.matches(relative)) {
            matched.insert(entry.path().to_path_buf());
        }
    }

    let mut candidates: Vec<ArtifactCandidate> = matched
        .into_iter()
        .filter_map(|path| match std::fs::metadata(&path) {
            Ok(meta) => Some(ArtifactCandidate {
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                size: meta.len(),
                path,
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), "cannot stat artifact: {e}");
                None
            }
        })
        .collect();

    candidates.sort_by_key(|c| std::cmp::Reverse(c.modified));
    candidates
}

/// The most recently modified artifact under `root`, if any.
pub fn find_latest_artifact(root: &Path) -> Option<ArtifactCandidate> {
    let candidates = find_artifacts(root);
    tracing::info!(
        root = %root.display(),
        "found {} model artifact(s)",
        candidates.len()
    );
    candidates.into_iter().next()
}
