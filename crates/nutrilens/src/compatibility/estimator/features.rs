use std::collections::BTreeMap;

use super::super::domain::{ActivityLevel, Gender, ProductRecord, UserHealthProfile};
use super::super::nutrition::{NutrientAxis, NutritionAnalysis};

/// Bumped whenever a column is added, removed, or changes meaning.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

pub const FEATURE_COLUMNS: [&str; 31] = [
    "user_age",
    "user_bmi",
    "user_gender_male",
    "user_activity_high",
    "user_activity_moderate",
    "has_diabetes",
    "has_kidney_disease",
    "has_hyperthyroidism",
    "has_osteoporosis",
    "prefers_high_protein",
    "prefers_low_fat",
    "is_vegan",
    "goal_muscle_gain",
    "goal_heart_health",
    "goal_boost_energy",
    "product_energy",
    "product_protein",
    "product_fat",
    "product_sugar",
    "product_salt",
    "product_fiber",
    "product_processing_level",
    "product_nutrition_quality",
    "product_health_score",
    "product_additives_count",
    "product_high_sugar",
    "product_high_salt",
    "product_high_fat",
    "product_high_protein",
    "product_high_fiber",
    "product_has_risky_additives",
];

const DIABETES_KEYS: [&str; 3] = ["diabetes_type_1", "diabetes_type_2", "prediabetes"];

/// Named model inputs for one (product, profile) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    values: BTreeMap<&'static str, f64>,
}

impl FeatureVector {
    fn set(&mut self, name: &'static str, value: f64) {
        self.values.insert(name, value);
    }

    fn flag(&mut self, name: &'static str, value: bool) {
        self.set(name, if value { 1.0 } else { 0.0 });
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in the stored column order; unknown columns read as 0.
    pub fn align(&self, columns: &[String]) -> Vec<f64> {
        columns
            .iter()
            .map(|column| self.get(column).unwrap_or(0.0))
            .collect()
    }
}

pub fn build_features(
    product: &ProductRecord,
    profile: &UserHealthProfile,
    nutrition: &NutritionAnalysis,
) -> FeatureVector {
    let mut features = FeatureVector::default();
    let prefers = |key: &str| profile.dietary_preferences.contains(key);
    let goal = |key: &str| profile.health_goals.contains(key);

    features.set("user_age", f64::from(profile.age));
    features.set("user_bmi", profile.bmi);
    features.flag("user_gender_male", profile.gender == Gender::Male);
    features.flag(
        "user_activity_high",
        profile.activity_level == ActivityLevel::High,
    );
    features.flag(
        "user_activity_moderate",
        profile.activity_level == ActivityLevel::Moderate,
    );
    features.flag(
        "has_diabetes",
        DIABETES_KEYS.iter().any(|key| profile.has_condition(key)),
    );
    features.flag(
        "has_kidney_disease",
        profile.has_condition("chronic_kidney_disease"),
    );
    features.flag(
        "has_hyperthyroidism",
        profile.has_condition("hyperthyroidism"),
    );
    features.flag("has_osteoporosis", profile.has_condition("osteoporosis"));
    features.flag("prefers_high_protein", prefers("high_protein"));
    features.flag("prefers_low_fat", prefers("low_fat"));
    features.flag("is_vegan", prefers("vegan"));
    features.flag("goal_muscle_gain", goal("muscle_gain"));
    features.flag("goal_heart_health", goal("heart_health"));
    features.flag("goal_boost_energy", goal("boost_energy"));

    features.set("product_energy", nutrition.value(NutrientAxis::Calories));
    features.set("product_protein", nutrition.value(NutrientAxis::Protein));
    features.set("product_fat", nutrition.value(NutrientAxis::Fat));
    features.set("product_sugar", nutrition.value(NutrientAxis::Sugar));
    features.set("product_salt", nutrition.value(NutrientAxis::Salt));
    features.set("product_fiber", nutrition.value(NutrientAxis::Fiber));
    features.set(
        "product_processing_level",
        f64::from(product.processing()),
    );
    features.set("product_nutrition_quality", nutrition.quality_rating);
    features.set("product_health_score", nutrition.health_indicator);
    features.set(
        "product_additives_count",
        f64::from(product.additive_count),
    );
    features.flag("product_high_sugar", nutrition.is_high(NutrientAxis::Sugar));
    features.flag("product_high_salt", nutrition.is_high(NutrientAxis::Salt));
    features.flag("product_high_fat", nutrition.is_high(NutrientAxis::Fat));
    features.flag(
        "product_high_protein",
        nutrition.is_high(NutrientAxis::Protein),
    );
    features.flag("product_high_fiber", nutrition.is_high(NutrientAxis::Fiber));
    features.flag("product_has_risky_additives", nutrition.risky_additives);

    features
}
