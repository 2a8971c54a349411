use serde::{Deserialize, Serialize};

/// Overridable weights for the 0-100 health-compatibility score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_score: f64,
    pub allergen_penalty: f64,
    pub medical_penalty: f64,
    pub dietary_penalty: f64,
    /// Applied to `quality_rating * 10 - nutrition_pivot`.
    pub nutrition_multiplier: f64,
    pub nutrition_pivot: f64,
    pub suitability_floor: u8,
    pub confidence: ConfidenceWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_score: 70.0,
            allergen_penalty: 15.0,
            medical_penalty: 20.0,
            dietary_penalty: 10.0,
            nutrition_multiplier: 0.3,
            nutrition_pivot: 50.0,
            suitability_floor: 30,
            confidence: ConfidenceWeights::default(),
        }
    }
}

/// How much each available input raises the 0-100 confidence of an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub base: u8,
    pub ingredients: u8,
    pub nutrients: u8,
    pub allergen_tags: u8,
    pub per_profile_field: u8,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            base: 70,
            ingredients: 10,
            nutrients: 10,
            allergen_tags: 5,
            per_profile_field: 5,
        }
    }
}
