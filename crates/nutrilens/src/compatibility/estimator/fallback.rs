use serde::{Deserialize, Serialize};

use super::super::domain::{Nutrient, ProductRecord, UserHealthProfile};

/// Points applied when a nutrient is strictly below or above a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientShift {
    pub threshold: f64,
    pub points: f64,
}

/// Adjustment applied once when the profile declares any of `conditions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionAdjustment {
    pub conditions: Vec<String>,
    pub nutrient: Nutrient,
    #[serde(default)]
    pub below: Option<NutrientShift>,
    #[serde(default)]
    pub above: Option<NutrientShift>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub base_score: f64,
    pub quality_pivot: f64,
    pub quality_weight: f64,
    pub processing_penalty: f64,
    pub elderly_age: u32,
    pub elderly_salt_below: f64,
    pub elderly_fiber_above: f64,
    pub elderly_bonus: f64,
    pub high_bmi: f64,
    pub low_calorie_below: f64,
    pub high_bmi_low_calorie_bonus: f64,
    pub condition_adjustments: Vec<ConditionAdjustment>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        let diabetes = ["diabetes_type_1", "diabetes_type_2", "prediabetes"];
        Self {
            base_score: 5.0,
            quality_pivot: 5.0,
            quality_weight: 0.4,
            processing_penalty: 0.5,
            elderly_age: 65,
            elderly_salt_below: 0.5,
            elderly_fiber_above: 5.0,
            elderly_bonus: 0.5,
            high_bmi: 30.0,
            low_calorie_below: 200.0,
            high_bmi_low_calorie_bonus: 0.8,
            condition_adjustments: vec![
                ConditionAdjustment {
                    conditions: diabetes.iter().map(|key| key.to_string()).collect(),
                    nutrient: Nutrient::Sugars,
                    below: Some(NutrientShift {
                        threshold: 5.0,
                        points: 1.0,
                    }),
                    above: Some(NutrientShift {
                        threshold: 15.0,
                        points: -2.0,
                    }),
                },
                ConditionAdjustment {
                    conditions: vec!["hypertension".to_string()],
                    nutrient: Nutrient::Salt,
                    below: Some(NutrientShift {
                        threshold: 0.3,
                        points: 0.5,
                    }),
                    above: Some(NutrientShift {
                        threshold: 1.5,
                        points: -1.0,
                    }),
                },
                ConditionAdjustment {
                    conditions: vec!["high_cholesterol".to_string()],
                    nutrient: Nutrient::SaturatedFat,
                    below: Some(NutrientShift {
                        threshold: 1.5,
                        points: 0.5,
                    }),
                    above: Some(NutrientShift {
                        threshold: 5.0,
                        points: -1.0,
                    }),
                },
            ],
        }
    }
}

/// Deterministic 0-10 score used whenever no model is available.
pub fn fallback_score(
    product: &ProductRecord,
    profile: &UserHealthProfile,
    quality_rating: f64,
    config: &FallbackConfig,
) -> f64 {
    let nutrients = &product.nutrients;
    let mut score = config.base_score;

    score += (quality_rating - config.quality_pivot) * config.quality_weight;
    score -= (f64::from(product.processing()) - 1.0) * config.processing_penalty;

    if profile.age > config.elderly_age {
        if nutrients.get(Nutrient::Salt) < config.elderly_salt_below {
            score += config.elderly_bonus;
        }
        if nutrients.get(Nutrient::Fiber) > config.elderly_fiber_above {
            score += config.elderly_bonus;
        }
    }

    if profile.bmi > config.high_bmi && nutrients.get(Nutrient::EnergyKcal) < config.low_calorie_below
    {
        score += config.high_bmi_low_calorie_bonus;
    }

    for adjustment in &config.condition_adjustments {
        if !adjustment
            .conditions
            .iter()
            .any(|condition| profile.has_condition(condition))
        {
            continue;
        }
        let value = nutrients.get(adjustment.nutrient);
        if let Some(shift) = adjustment.below.filter(|shift| value < shift.threshold) {
            score += shift.points;
        }
        if let Some(shift) = adjustment.above.filter(|shift| value > shift.threshold) {
            score += shift.points;
        }
    }

    score.clamp(0.0, 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compatibility::nutrition::quality_rating;

    fn cereal() -> ProductRecord {
        let mut product = ProductRecord::new("4000", "Frosted cereal");
        product.nutrients = product
            .nutrients
            .with(Nutrient::EnergyKcal, 380.0)
            .with(Nutrient::Sugars, 28.0)
            .with(Nutrient::Salt, 0.9)
            .with(Nutrient::Fiber, 3.0);
        product.processing_level = 4;
        product
    }

    #[test]
    fn anonymous_profile_uses_quality_and_processing_only() {
        let product = cereal();
        let quality = quality_rating(&product.nutrients);
        let score = fallback_score(
            &product,
            &UserHealthProfile::default(),
            quality,
            &FallbackConfig::default(),
        );
        // quality: 5 + fat(+1) - sugar(2) = 4 -> 5 - 0.4 - 1.5
        assert!((score - 3.1).abs() < 1e-9);
    }

    #[test]
    fn diabetes_penalizes_sugary_products() {
        let product = cereal();
        let quality = quality_rating(&product.nutrients);
        let mut profile = UserHealthProfile::default();
        profile.medical_conditions.insert("diabetes_type_2".to_string());
        let score = fallback_score(&product, &profile, quality, &FallbackConfig::default());
        assert!((score - 1.1).abs() < 1e-9);
    }

    #[test]
    fn elderly_and_high_bmi_bonuses_stack() {
        let mut product = ProductRecord::new("4001", "Lentil soup");
        product.nutrients = product
            .nutrients
            .with(Nutrient::EnergyKcal, 90.0)
            .with(Nutrient::Salt, 0.3)
            .with(Nutrient::Fiber, 6.0)
            .with(Nutrient::Proteins, 6.0);
        product.processing_level = 1;
        let profile = UserHealthProfile {
            age: 72,
            bmi: 31.5,
            ..UserHealthProfile::default()
        };
        let quality = quality_rating(&product.nutrients);
        let score = fallback_score(&product, &profile, quality, &FallbackConfig::default());
        // quality 10 -> 5 + 2.0 + 0.5 + 0.5 + 0.8
        assert!((score - 8.8).abs() < 1e-9);
    }

    #[test]
    fn stays_within_bounds() {
        let mut product = cereal();
        product.nutrients = product.nutrients.with(Nutrient::Sugars, 90.0);
        let mut profile = UserHealthProfile::default();
        profile.medical_conditions.insert("prediabetes".to_string());
        let config = FallbackConfig {
            processing_penalty: 5.0,
            ..FallbackConfig::default()
        };
        assert_eq!(fallback_score(&product, &profile, 0.0, &config), 0.0);
    }
}
