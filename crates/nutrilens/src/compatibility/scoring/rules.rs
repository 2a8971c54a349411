use super::super::domain::{Alert, AlertKind, ProductRecord, UserHealthProfile};
use super::super::nutrition::NutritionAnalysis;
use super::config::ScoringConfig;
use super::{ScoreComponent, ScoreFactor};

pub(crate) struct ScoreSignals {
    pub raw_score: f64,
    pub critical_keys: Vec<String>,
}

pub(crate) fn score_alerts(
    alerts: &[Alert],
    nutrition: &NutritionAnalysis,
    config: &ScoringConfig,
) -> (Vec<ScoreComponent>, ScoreSignals) {
    let mut components = vec![ScoreComponent {
        factor: ScoreFactor::Baseline,
        points: config.base_score,
        notes: "starting score".to_string(),
    }];
    let mut raw_score = config.base_score;

    for (kind, factor, weight) in [
        (
            AlertKind::Allergen,
            ScoreFactor::AllergenAlerts,
            config.allergen_penalty,
        ),
        (
            AlertKind::Medical,
            ScoreFactor::MedicalAlerts,
            config.medical_penalty,
        ),
        (
            AlertKind::Dietary,
            ScoreFactor::DietaryAlerts,
            config.dietary_penalty,
        ),
    ] {
        let count = alerts.iter().filter(|alert| alert.kind == kind).count();
        if count == 0 {
            continue;
        }
        let penalty = weight * count as f64;
        components.push(ScoreComponent {
            factor,
            points: -penalty,
            notes: format!("{count} {} alert(s)", kind.label()),
        });
        raw_score -= penalty;
    }

    let bonus =
        (nutrition.quality_rating * 10.0 - config.nutrition_pivot) * config.nutrition_multiplier;
    components.push(ScoreComponent {
        factor: ScoreFactor::NutritionQuality,
        points: bonus,
        notes: format!("nutrition quality {:.1}/10", nutrition.quality_rating),
    });
    raw_score += bonus;

    let critical_keys = alerts
        .iter()
        .filter(|alert| alert.is_critical())
        .map(|alert| alert.source_key.clone())
        .collect();

    (
        components,
        ScoreSignals {
            raw_score,
            critical_keys,
        },
    )
}

/// How much of the picture the analysis actually saw, 0-100.
pub(crate) fn confidence_score(
    product: &ProductRecord,
    profile: &UserHealthProfile,
    config: &ScoringConfig,
) -> u8 {
    let weights = &config.confidence;
    let mut score = u32::from(weights.base);
    if !product.ingredients_text.trim().is_empty() {
        score += u32::from(weights.ingredients);
    }
    if !product.nutrients.is_empty() {
        score += u32::from(weights.nutrients);
    }
    if !product.allergen_tags.is_empty() {
        score += u32::from(weights.allergen_tags);
    }
    for populated in [
        !profile.allergies.is_empty(),
        !profile.medical_conditions.is_empty(),
        !profile.dietary_preferences.is_empty(),
    ] {
        if populated {
            score += u32::from(weights.per_profile_field);
        }
    }
    score.min(100) as u8
}
