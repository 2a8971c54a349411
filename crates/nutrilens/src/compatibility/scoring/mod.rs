mod config;
mod policy;
mod rules;

pub use config::{ConfidenceWeights, ScoringConfig};
pub use policy::{SuitabilityDecision, UnsuitableReason};

use serde::{Deserialize, Serialize};

use super::domain::{Alert, ProductRecord, UserHealthProfile};
use super::error::CompatibilityError;
use super::nutrition::NutritionAnalysis;
use policy::decide_suitability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Baseline,
    AllergenAlerts,
    MedicalAlerts,
    DietaryAlerts,
    NutritionQuality,
}

/// Discrete contribution to the health score, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub points: f64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedScore {
    /// 0-100.
    pub health_score: u8,
    pub suitability: SuitabilityDecision,
    pub components: Vec<ScoreComponent>,
    /// 0-100.
    pub confidence_score: u8,
}

/// Blends analyzer alerts and nutrition quality into the bounded health score.
#[derive(Debug, Clone, Default)]
pub struct ScoreSynthesizer {
    config: ScoringConfig,
}

impl ScoreSynthesizer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn synthesize(
        &self,
        product: &ProductRecord,
        profile: &UserHealthProfile,
        alerts: &[Alert],
        nutrition: &NutritionAnalysis,
    ) -> Result<SynthesizedScore, CompatibilityError> {
        let (components, signals) = rules::score_alerts(alerts, nutrition, &self.config);
        if !signals.raw_score.is_finite() {
            return Err(CompatibilityError::Fatal(format!(
                "non-finite health score for product {}",
                product.code
            )));
        }

        let health_score = signals.raw_score.clamp(0.0, 100.0).trunc() as u8;
        let suitability = decide_suitability(health_score, &signals, &self.config);

        Ok(SynthesizedScore {
            health_score,
            suitability,
            components,
            confidence_score: rules::confidence_score(product, profile, &self.config),
        })
    }
}

/// Short verdict sentence for a score band.
pub fn summarize(health_score: u8, suitability: &SuitabilityDecision) -> String {
    match (suitability.is_suitable(), health_score) {
        (true, score) if score >= 80 => "Good match for your health profile".to_string(),
        (true, score) if score >= 60 => "Acceptable with some considerations".to_string(),
        (true, _) => "Consume occasionally; better options likely exist".to_string(),
        (false, _) => format!("Not recommended ({})", suitability.summary()),
    }
}
