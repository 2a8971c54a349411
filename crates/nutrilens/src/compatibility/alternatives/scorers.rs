use super::super::domain::{Nutrient, ProductRecord, UserHealthProfile};
use super::super::restrictions::RestrictionCatalog;
use super::ranker::RankingConfig;
use super::{Improvement, ImprovementKind, ScoreBreakdown};

const SIMILARITY_NUTRIENTS: [Nutrient; 6] = [
    Nutrient::EnergyKcal,
    Nutrient::Proteins,
    Nutrient::Fat,
    Nutrient::Sugars,
    Nutrient::Salt,
    Nutrient::Fiber,
];

/// Absorbs float error in `value <= original * ratio`, e.g. 11.2 * 0.8 = 8.959999...
const RATIO_TOLERANCE: f64 = 1e-9;

/// Everything a scorer may look at besides the candidate.
pub struct RankingContext<'a> {
    pub target: &'a ProductRecord,
    pub profile: &'a UserHealthProfile,
    pub restrictions: &'a RestrictionCatalog,
    pub config: &'a RankingConfig,
}

/// Running tally for one candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreCard {
    pub breakdown: ScoreBreakdown,
    pub improvements: Vec<Improvement>,
}

impl ScoreCard {
    pub fn new(baseline: f64) -> Self {
        Self {
            breakdown: ScoreBreakdown {
                baseline,
                ..ScoreBreakdown::default()
            },
            improvements: Vec::new(),
        }
    }

    fn improve(&mut self, kind: ImprovementKind, message: String) {
        if !self.improvements.iter().any(|existing| existing.kind == kind) {
            self.improvements.push(Improvement { kind, message });
        }
    }
}

/// One pluggable scoring rule.
pub trait AlternativeScorer: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, context: &RankingContext<'_>, candidate: &ProductRecord, card: &mut ScoreCard);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NutriscoreScorer;

impl AlternativeScorer for NutriscoreScorer {
    fn name(&self) -> &'static str {
        "nutriscore"
    }

    fn score(&self, context: &RankingContext<'_>, candidate: &ProductRecord, card: &mut ScoreCard) {
        if candidate.nutriscore_grade.ordinal() > context.target.nutriscore_grade.ordinal() {
            card.breakdown.nutriscore_bonus += context.config.nutriscore_bonus;
            card.improve(
                ImprovementKind::BetterNutriscore,
                "Better Nutri-Score".to_string(),
            );
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessingScorer;

impl AlternativeScorer for ProcessingScorer {
    fn name(&self) -> &'static str {
        "processing"
    }

    fn score(&self, context: &RankingContext<'_>, candidate: &ProductRecord, card: &mut ScoreCard) {
        if candidate.nova() < context.target.nova() {
            card.breakdown.processing_bonus += context.config.processing_bonus;
            card.improve(ImprovementKind::LessProcessed, "Less processed".to_string());
        }
    }
}

/// Percentage reductions (sugar, salt, saturated fat, calories) and increases (fiber, protein).
#[derive(Debug, Clone, Copy, Default)]
pub struct NutrientDeltaScorer;

impl AlternativeScorer for NutrientDeltaScorer {
    fn name(&self) -> &'static str {
        "nutrient_delta"
    }

    fn score(&self, context: &RankingContext<'_>, candidate: &ProductRecord, card: &mut ScoreCard) {
        let config = context.config;
        let reductions = [
            (
                Nutrient::Sugars,
                ImprovementKind::LessSugar,
                config.reduction_ratio,
                config.sugar_bonus,
                "less sugar",
            ),
            (
                Nutrient::Salt,
                ImprovementKind::LessSalt,
                config.reduction_ratio,
                config.salt_bonus,
                "less salt",
            ),
            (
                Nutrient::SaturatedFat,
                ImprovementKind::LessSaturatedFat,
                config.reduction_ratio,
                config.saturated_fat_bonus,
                "less saturated fat",
            ),
            (
                Nutrient::EnergyKcal,
                ImprovementKind::FewerCalories,
                config.calorie_ratio,
                config.calorie_bonus,
                "fewer calories",
            ),
        ];

        for (nutrient, kind, ratio, bonus, phrase) in reductions {
            let original = context.target.nutrients.get(nutrient);
            let value = candidate.nutrients.get(nutrient);
            if original > 0.0 && value <= original * ratio + RATIO_TOLERANCE {
                let percent = ((1.0 - value / original) * 100.0).round();
                card.breakdown.nutrition_delta_bonus += bonus;
                card.improve(kind, format!("{percent:.0}% {phrase}"));
            }
        }

        let increases = [
            (
                Nutrient::Fiber,
                ImprovementKind::MoreFiber,
                config.fiber_bonus,
                "More fiber",
            ),
            (
                Nutrient::Proteins,
                ImprovementKind::MoreProtein,
                config.protein_bonus,
                "More protein",
            ),
        ];

        for (nutrient, kind, bonus, message) in increases {
            let original = context.target.nutrients.get(nutrient);
            let value = candidate.nutrients.get(nutrient);
            if value > 0.0 && value >= original * config.increase_ratio - RATIO_TOLERANCE {
                card.breakdown.nutrition_delta_bonus += bonus;
                card.improve(kind, message.to_string());
            }
        }
    }
}

/// Dietary label matches and condition-specific nutrient bonuses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileCompatibilityScorer;

impl AlternativeScorer for ProfileCompatibilityScorer {
    fn name(&self) -> &'static str {
        "profile_compatibility"
    }

    fn score(&self, context: &RankingContext<'_>, candidate: &ProductRecord, card: &mut ScoreCard) {
        let preferences = context.restrictions.dietary_preferences();
        for rule in preferences.select(&context.profile.dietary_preferences) {
            let labelled = rule
                .definition()
                .label_tags
                .iter()
                .any(|tag| candidate.label_tags.contains(tag));
            if labelled {
                card.breakdown.profile_bonus += context.config.dietary_label_bonus;
            }
        }

        let conditions = context.restrictions.medical_conditions();
        for rule in conditions.select(&context.profile.medical_conditions) {
            for bonus in &rule.definition().compatibility_bonuses {
                if candidate.nutrients.get(bonus.nutrient) < bonus.below {
                    card.breakdown.profile_bonus += bonus.points;
                }
            }
        }
    }
}

/// Rewards candidates that stay close to the target: same category, similar nutrient profile,
/// and comparable processing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityScorer;

impl SimilarityScorer {
    pub fn similarity(target: &ProductRecord, candidate: &ProductRecord) -> f64 {
        let mut similarity = 0.0;

        let category = target.primary_category();
        if !category.is_empty() && category.eq_ignore_ascii_case(candidate.primary_category()) {
            similarity += 0.5;
        }

        let ratios: f64 = SIMILARITY_NUTRIENTS
            .iter()
            .map(|nutrient| {
                let left = target.nutrients.get(*nutrient);
                let right = candidate.nutrients.get(*nutrient);
                let high = left.max(right);
                if high <= 0.0 {
                    1.0
                } else {
                    left.min(right) / high
                }
            })
            .sum();
        similarity += ratios / SIMILARITY_NUTRIENTS.len() as f64 * 0.3;

        if target.processing().abs_diff(candidate.processing()) <= 1 {
            similarity += 0.2;
        }

        similarity.min(1.0)
    }
}

impl AlternativeScorer for SimilarityScorer {
    fn name(&self) -> &'static str {
        "similarity"
    }

    fn score(&self, context: &RankingContext<'_>, candidate: &ProductRecord, card: &mut ScoreCard) {
        card.breakdown.similarity_bonus +=
            Self::similarity(context.target, candidate) * context.config.similarity_weight;
    }
}
