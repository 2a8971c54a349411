use super::common::*;

use crate::compatibility::domain::{Nutrient, Nutrients, ProductRecord};
use crate::compatibility::estimator::{fallback_score, ScoreSource};
use crate::compatibility::nutrition::quality_rating;
use crate::compatibility::scoring::{ScoreFactor, SuitabilityDecision, UnsuitableReason};
use crate::compatibility::{EngineConfig, ScoringConfig};

fn sugary_drink() -> ProductRecord {
    let mut product = ProductRecord::new("200", "Cola");
    product.nutrients = Nutrients::new().with(Nutrient::Sugars, 30.0);
    product
}

#[test]
fn unrestricted_profile_scores_on_nutrition_only() {
    let product = sugary_drink();
    let result = engine().analyze(&product, &empty_profile());

    let factors: Vec<ScoreFactor> = result
        .score_components
        .iter()
        .map(|component| component.factor)
        .collect();
    assert_eq!(
        factors,
        vec![ScoreFactor::Baseline, ScoreFactor::NutritionQuality]
    );

    let bonus = (quality_rating(&product.nutrients) * 10.0 - 50.0) * 0.3;
    let expected = (70.0 + bonus).clamp(0.0, 100.0).trunc() as u8;
    assert_eq!(result.health_score, expected);
    assert!(result.is_suitable);
}

#[test]
fn suitability_floor_alone_can_reject() {
    let config = EngineConfig {
        scoring: ScoringConfig {
            suitability_floor: 90,
            ..ScoringConfig::default()
        },
        ..EngineConfig::default()
    };

    let result = engine_with(config).analyze(&sugary_drink(), &empty_profile());

    assert!(!result.is_suitable);
    match result.suitability {
        SuitabilityDecision::Unsuitable { reasons } => {
            assert_eq!(reasons.len(), 1);
            assert!(matches!(reasons[0], UnsuitableReason::BelowFloor { floor: 90, .. }));
        }
        SuitabilityDecision::Suitable => panic!("expected floor rejection"),
    }
}

#[test]
fn another_critical_alert_never_raises_the_score() {
    let engine = engine();
    let mut product = cereal();
    product.allergen_tags.insert("en:milk".to_string());
    product.allergen_tags.insert("en:soybeans".to_string());

    let one = engine.analyze(&product, &profile(vec!["milk"], Vec::new(), Vec::new()));
    let two = engine.analyze(&product, &profile(vec!["milk", "soy"], Vec::new(), Vec::new()));

    assert_eq!(one.critical_alerts().count(), 1);
    assert_eq!(two.critical_alerts().count(), 2);
    assert!(two.health_score <= one.health_score);
}

#[test]
fn penalties_follow_alert_kinds() {
    let mut product = cereal();
    product.allergen_tags.insert("en:milk".to_string());

    let result = engine().analyze(
        &product,
        &profile(vec!["milk"], vec!["diabetes_type_2"], vec!["vegan"]),
    );

    let points = |factor: ScoreFactor| {
        result
            .score_components
            .iter()
            .find(|component| component.factor == factor)
            .map(|component| component.points)
    };
    assert_eq!(points(ScoreFactor::AllergenAlerts), Some(-15.0));
    assert_eq!(points(ScoreFactor::MedicalAlerts), Some(-40.0));
    assert_eq!(points(ScoreFactor::DietaryAlerts), Some(-10.0));
    assert_eq!(result.health_score, 0);
    assert!(!result.is_suitable);
}

#[test]
fn confidence_reflects_available_inputs() {
    let engine = engine();

    let bare = engine.analyze(&ProductRecord::new("201", "Mystery Snack"), &empty_profile());
    assert_eq!(bare.confidence_score, 70);

    let mut product = cereal();
    product.allergen_tags.insert("en:gluten".to_string());
    let rich = engine.analyze(
        &product,
        &profile(vec!["peanuts"], vec!["hypertension"], vec!["vegan"]),
    );
    assert_eq!(rich.confidence_score, 100);
}

#[test]
fn missing_identifier_returns_unsuitable_result_instead_of_error() {
    let product = ProductRecord::new("  ", "Nameless code");

    let result = engine().analyze(&product, &empty_profile());

    assert_eq!(result.health_score, 0);
    assert!(!result.is_suitable);
    assert!(result.nutrition_analysis.is_none());
    assert!(result.summary.contains("product code is required"));
    assert!(matches!(
        result.suitability,
        SuitabilityDecision::Unsuitable { ref reasons }
            if matches!(reasons[0], UnsuitableReason::InvalidProduct { .. })
    ));
}

#[test]
fn try_analyze_surfaces_validation_errors() {
    let product = ProductRecord::new("202", " ");

    let error = engine()
        .try_analyze(&product, &empty_profile())
        .expect_err("missing name");

    assert!(matches!(
        error,
        crate::compatibility::CompatibilityError::Validation(_)
    ));
}

#[test]
fn learned_score_without_model_matches_fallback_exactly() {
    let engine = engine();
    let product = cereal();
    let profile = profile(Vec::new(), vec!["diabetes_type_2"], Vec::new());

    let learned = engine.estimate_learned_score(&product, &profile);
    let direct = fallback_score(
        &product,
        &profile,
        quality_rating(&product.nutrients),
        &engine.config().fallback,
    );

    assert_eq!(learned.source, ScoreSource::Fallback);
    assert_eq!(learned.value.to_bits(), direct.to_bits());
    assert!((0.0..=10.0).contains(&learned.value));
}

#[test]
fn analysis_carries_learned_score_and_summary() {
    let result = engine().analyze(&oat_flakes(), &empty_profile());

    assert!(result.learned_score.is_some());
    assert!(result.health_score >= 80);
    assert_eq!(result.summary, "Good match for your health profile");
}
