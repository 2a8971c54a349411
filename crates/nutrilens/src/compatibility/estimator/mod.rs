//! Learned 0-10 score with a deterministic rule-based fallback.

mod fallback;
mod features;
mod model;

pub use fallback::{fallback_score, ConditionAdjustment, FallbackConfig, NutrientShift};
pub use features::{build_features, FeatureVector, FEATURE_COLUMNS, FEATURE_SCHEMA_VERSION};
pub use model::{
    EstimatorError, FeatureSchema, FileModelRepository, LinearRegressor, ModelBundle,
    ModelLoadError, ModelRepository, NoModel, StandardNormalizer, MODEL_FILE, NORMALIZER_FILE,
    SCHEMA_FILE,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{ProductRecord, UserHealthProfile};
use super::nutrition::NutritionAnalysis;

/// Loaded once, shared read-only by every estimator.
pub type ModelHandle = Arc<ModelBundle>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLevel {
    Excellent,
    Good,
    Moderate,
    Poor,
    Bad,
}

impl ScoreLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 8.5 {
            ScoreLevel::Excellent
        } else if score >= 7.0 {
            ScoreLevel::Good
        } else if score >= 5.5 {
            ScoreLevel::Moderate
        } else if score >= 4.0 {
            ScoreLevel::Poor
        } else {
            ScoreLevel::Bad
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearnedScore {
    /// 0-10.
    pub value: f64,
    pub source: ScoreSource,
    pub level: ScoreLevel,
}

impl LearnedScore {
    fn new(value: f64, source: ScoreSource) -> Self {
        Self {
            value,
            source,
            level: ScoreLevel::from_score(value),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LearnedScoreEstimator {
    model: Option<ModelHandle>,
    fallback: FallbackConfig,
}

impl LearnedScoreEstimator {
    pub fn new(model: Option<ModelHandle>, fallback: FallbackConfig) -> Self {
        Self { model, fallback }
    }

    /// Loads the model handle, logging once when the fallback will be used instead.
    pub fn load_model<R>(repository: &R) -> Option<ModelHandle>
    where
        R: ModelRepository + ?Sized,
    {
        match repository.load() {
            Ok(Some(bundle)) => {
                info!(
                    schema_version = bundle.schema().version,
                    features = bundle.schema().columns.len(),
                    "learned score model loaded"
                );
                Some(Arc::new(bundle))
            }
            Ok(None) => {
                warn!("learned score model not deployed; using rule-based fallback");
                None
            }
            Err(error) => {
                warn!(%error, "learned score model failed to load; using rule-based fallback");
                None
            }
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn fallback_config(&self) -> &FallbackConfig {
        &self.fallback
    }

    pub fn estimate(
        &self,
        product: &ProductRecord,
        profile: &UserHealthProfile,
        nutrition: &NutritionAnalysis,
    ) -> LearnedScore {
        if let Some(model) = &self.model {
            let features = build_features(product, profile, nutrition);
            match model.predict(&features) {
                Ok(prediction) => {
                    return LearnedScore::new(prediction.clamp(0.0, 10.0), ScoreSource::Model)
                }
                Err(error) => {
                    debug!(%error, product = %product.code, "model prediction rejected");
                }
            }
        }

        LearnedScore::new(
            fallback_score(product, profile, nutrition.quality_rating, &self.fallback),
            ScoreSource::Fallback,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compatibility::domain::Nutrient;
    use crate::compatibility::nutrition::NutritionEvaluator;

    fn schema() -> FeatureSchema {
        FeatureSchema {
            version: FEATURE_SCHEMA_VERSION,
            columns: vec![
                "product_sugar".to_string(),
                "has_diabetes".to_string(),
                "retired_column".to_string(),
            ],
        }
    }

    fn bundle(intercept: f64) -> ModelBundle {
        ModelBundle::new(
            LinearRegressor {
                coefficients: vec![-0.1, -1.0, 3.0],
                intercept,
            },
            StandardNormalizer {
                mean: vec![10.0, 0.0, 0.0],
                scale: vec![2.0, 1.0, 0.0],
            },
            schema(),
        )
        .expect("bundle is consistent")
    }

    fn yogurt() -> ProductRecord {
        let mut product = ProductRecord::new("5001", "Plain yogurt");
        product.nutrients = product.nutrients.with(Nutrient::Sugars, 4.0);
        product
    }

    #[test]
    fn model_prediction_uses_aligned_and_scaled_features() {
        let product = yogurt();
        let nutrition = NutritionEvaluator::default().evaluate(&product);
        let estimator = LearnedScoreEstimator::new(
            Some(Arc::new(bundle(6.0))),
            FallbackConfig::default(),
        );

        let score = estimator.estimate(&product, &UserHealthProfile::default(), &nutrition);
        // sugar (4 - 10) / 2 = -3 -> 6.0 + 0.3
        assert_eq!(score.source, ScoreSource::Model);
        assert!((score.value - 6.3).abs() < 1e-9);
        assert_eq!(score.level, ScoreLevel::Moderate);
    }

    #[test]
    fn model_prediction_is_clamped() {
        let product = yogurt();
        let nutrition = NutritionEvaluator::default().evaluate(&product);
        let estimator =
            LearnedScoreEstimator::new(Some(Arc::new(bundle(42.0))), FallbackConfig::default());
        let score = estimator.estimate(&product, &UserHealthProfile::default(), &nutrition);
        assert_eq!(score.value, 10.0);
    }

    #[test]
    fn rejects_mismatched_schema_versions() {
        let mut stale = schema();
        stale.version = FEATURE_SCHEMA_VERSION + 1;
        let result = ModelBundle::new(
            LinearRegressor {
                coefficients: vec![0.0; 3],
                intercept: 0.0,
            },
            StandardNormalizer {
                mean: vec![0.0; 3],
                scale: vec![1.0; 3],
            },
            stale,
        );
        assert!(matches!(result, Err(ModelLoadError::SchemaVersion { .. })));
    }

    #[test]
    fn rejects_shape_disagreements() {
        let result = ModelBundle::new(
            LinearRegressor {
                coefficients: vec![0.0; 2],
                intercept: 0.0,
            },
            StandardNormalizer {
                mean: vec![0.0; 3],
                scale: vec![1.0; 3],
            },
            schema(),
        );
        assert!(matches!(result, Err(ModelLoadError::Shape(_))));
    }

    #[test]
    fn missing_model_degrades_to_fallback() {
        let product = yogurt();
        let nutrition = NutritionEvaluator::default().evaluate(&product);
        let estimator =
            LearnedScoreEstimator::new(LearnedScoreEstimator::load_model(&NoModel), FallbackConfig::default());
        let score = estimator.estimate(&product, &UserHealthProfile::default(), &nutrition);
        assert_eq!(score.source, ScoreSource::Fallback);
        assert_eq!(
            score.value,
            fallback_score(
                &product,
                &UserHealthProfile::default(),
                nutrition.quality_rating,
                &FallbackConfig::default()
            )
        );
    }

    #[test]
    fn feature_vector_covers_every_schema_column() {
        let product = yogurt();
        let nutrition = NutritionEvaluator::default().evaluate(&product);
        let features = build_features(&product, &UserHealthProfile::default(), &nutrition);
        assert_eq!(features.len(), FEATURE_COLUMNS.len());
        for column in FEATURE_COLUMNS {
            assert!(features.get(column).is_some(), "missing {column}");
        }
    }
}
