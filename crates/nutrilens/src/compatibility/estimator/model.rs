//! Stored model artifacts: a linear regressor, a standard-scaler normalizer, and the ordered
//! feature schema they were fitted against.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::features::{FeatureVector, FEATURE_SCHEMA_VERSION};

pub const MODEL_FILE: &str = "model.json";
pub const NORMALIZER_FILE: &str = "normalizer.json";
pub const SCHEMA_FILE: &str = "feature_schema.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegressor {
    pub fn predict(&self, inputs: &[f64]) -> Result<f64, EstimatorError> {
        if inputs.len() != self.coefficients.len() {
            return Err(EstimatorError::DimensionMismatch {
                expected: self.coefficients.len(),
                found: inputs.len(),
            });
        }
        let prediction = self
            .coefficients
            .iter()
            .zip(inputs)
            .fold(self.intercept, |acc, (weight, value)| acc + weight * value);
        if prediction.is_finite() {
            Ok(prediction)
        } else {
            Err(EstimatorError::NonFinite)
        }
    }
}

/// `(x - mean) / scale` per column; zero scales pass values through unscaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardNormalizer {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardNormalizer {
    pub fn transform(&self, inputs: &[f64]) -> Result<Vec<f64>, EstimatorError> {
        if inputs.len() != self.mean.len() {
            return Err(EstimatorError::DimensionMismatch {
                expected: self.mean.len(),
                found: inputs.len(),
            });
        }
        Ok(inputs
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(value, (mean, scale))| {
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (value - mean) / scale
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub columns: Vec<String>,
}

/// Validated, immutable set of artifacts. Share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBundle {
    regressor: LinearRegressor,
    normalizer: StandardNormalizer,
    schema: FeatureSchema,
}

impl ModelBundle {
    pub fn new(
        regressor: LinearRegressor,
        normalizer: StandardNormalizer,
        schema: FeatureSchema,
    ) -> Result<Self, ModelLoadError> {
        if schema.version != FEATURE_SCHEMA_VERSION {
            return Err(ModelLoadError::SchemaVersion {
                expected: FEATURE_SCHEMA_VERSION,
                found: schema.version,
            });
        }

        let width = schema.columns.len();
        if width == 0
            || regressor.coefficients.len() != width
            || normalizer.mean.len() != width
            || normalizer.scale.len() != width
        {
            return Err(ModelLoadError::Shape(format!(
                "{width} columns, {} coefficients, {} means, {} scales",
                regressor.coefficients.len(),
                normalizer.mean.len(),
                normalizer.scale.len()
            )));
        }

        let finite = regressor.intercept.is_finite()
            && regressor
                .coefficients
                .iter()
                .chain(&normalizer.mean)
                .chain(&normalizer.scale)
                .all(|value| value.is_finite());
        if !finite {
            return Err(ModelLoadError::Shape(
                "artifacts contain non-finite numbers".to_string(),
            ));
        }

        Ok(Self {
            regressor,
            normalizer,
            schema,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Raw, unclamped prediction.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, EstimatorError> {
        let aligned = features.align(&self.schema.columns);
        let scaled = self.normalizer.transform(&aligned)?;
        self.regressor.predict(&scaled)
    }
}

/// Source of model artifacts. `Ok(None)` means no model is deployed.
pub trait ModelRepository: Send + Sync {
    fn load(&self) -> Result<Option<ModelBundle>, ModelLoadError>;
}

/// Repository for deployments that ship without a model.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModel;

impl ModelRepository for NoModel {
    fn load(&self) -> Result<Option<ModelBundle>, ModelLoadError> {
        Ok(None)
    }
}

/// Reads the three JSON artifacts from one directory.
#[derive(Debug, Clone)]
pub struct FileModelRepository {
    dir: PathBuf,
}

impl FileModelRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<T, ModelLoadError> {
        let path = self.dir.join(file);
        let raw = std::fs::read_to_string(&path).map_err(|source| ModelLoadError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ModelLoadError::Parse { path, source })
    }
}

impl ModelRepository for FileModelRepository {
    fn load(&self) -> Result<Option<ModelBundle>, ModelLoadError> {
        let files = [MODEL_FILE, NORMALIZER_FILE, SCHEMA_FILE];
        let present = files
            .iter()
            .filter(|file| self.dir.join(file).is_file())
            .count();
        if present == 0 {
            return Ok(None);
        }
        if present < files.len() {
            return Err(ModelLoadError::Incomplete {
                dir: self.dir.clone(),
            });
        }

        let bundle = ModelBundle::new(
            self.read(MODEL_FILE)?,
            self.read(NORMALIZER_FILE)?,
            self.read(SCHEMA_FILE)?,
        )?;
        Ok(Some(bundle))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to read model artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact {} is malformed: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("model directory {} is missing some artifacts", .dir.display())]
    Incomplete { dir: PathBuf },
    #[error("feature schema version {found} does not match expected {expected}")]
    SchemaVersion { expected: u32, found: u32 },
    #[error("model artifacts disagree on shape: {0}")]
    Shape(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EstimatorError {
    #[error("expected {expected} inputs, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("prediction is not a finite number")]
    NonFinite,
}
