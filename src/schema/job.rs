//! Optimization job files: a baseline design, a goal and optimizer settings.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{AntennaDesign, Goal, OptimizerConfig};

/// Everything needed to run one optimization.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OptimizationJob {
    /// Baseline design.
    pub design: AntennaDesign,
    /// Goal to optimize for.
    #[serde(default)]
    pub goal: Goal,
    /// Optimizer settings.
    #[serde(default)]
    pub config: OptimizerConfig,
}

/// Errors reading or writing job files.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl OptimizationJob {
    /// Load a job from a JSON file.
    pub fn load(path: &Path) -> Result<Self, JobError> {
        let text = fs::read_to_string(path).map_err(|source| JobError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| JobError::Json {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Write any serializable value as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), JobError> {
    let text = serde_json::to_string_pretty(value).map_err(|source| JobError::Json {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, text).map_err(|source| JobError::Io {
        path: path.display().to_string(),
        source,
    })
}
