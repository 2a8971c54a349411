use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::alternatives::{RankingConfig, RetrievalConfig};
use super::analyzers::AnalyzerLimits;
use super::estimator::FallbackConfig;
use super::nutrition::NutritionBands;
use super::recommendations::ComposerConfig;
use super::scoring::ScoringConfig;

/// Every overridable engine constant. Missing sections keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub nutrition: NutritionBands,
    pub analyzers: AnalyzerLimits,
    pub fallback: FallbackConfig,
    pub ranking: RankingConfig,
    pub retrieval: RetrievalConfig,
    pub composer: ComposerConfig,
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> Result<Self, EngineConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, EngineConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| EngineConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineConfigError {
    #[error("failed to read engine config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
}
