use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::super::domain::{ProductRecord, UserHealthProfile};
use super::super::restrictions::RestrictionCatalog;
use super::scorers::{
    AlternativeScorer, NutrientDeltaScorer, NutriscoreScorer, ProcessingScorer,
    ProfileCompatibilityScorer, RankingContext, ScoreCard, SimilarityScorer,
};
use super::{dedupe_candidates, AlternativeCandidate, CandidateRecord, CandidateSource};

/// Additive weight for each retrieval strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceWeights {
    pub category: f64,
    pub brand: f64,
    pub dietary: f64,
    pub health: f64,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            category: 5.0,
            brand: 3.0,
            dietary: 8.0,
            health: 10.0,
        }
    }
}

impl SourceWeights {
    pub fn weight(&self, source: CandidateSource) -> f64 {
        match source {
            CandidateSource::Category => self.category,
            CandidateSource::Brand => self.brand,
            CandidateSource::Dietary => self.dietary,
            CandidateSource::Health => self.health,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub baseline: f64,
    pub nutriscore_bonus: f64,
    pub processing_bonus: f64,
    pub sugar_bonus: f64,
    pub salt_bonus: f64,
    pub saturated_fat_bonus: f64,
    pub calorie_bonus: f64,
    pub fiber_bonus: f64,
    pub protein_bonus: f64,
    /// Candidate value must be at most this share of the target to count as a reduction.
    pub reduction_ratio: f64,
    pub calorie_ratio: f64,
    /// Candidate value must be at least this multiple of the target to count as an increase.
    pub increase_ratio: f64,
    pub dietary_label_bonus: f64,
    pub similarity_weight: f64,
    pub improvement_bonus: f64,
    pub source_weights: SourceWeights,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            baseline: 50.0,
            nutriscore_bonus: 15.0,
            processing_bonus: 10.0,
            sugar_bonus: 10.0,
            salt_bonus: 10.0,
            saturated_fat_bonus: 8.0,
            calorie_bonus: 5.0,
            fiber_bonus: 8.0,
            protein_bonus: 5.0,
            reduction_ratio: 0.8,
            calorie_ratio: 0.9,
            increase_ratio: 1.2,
            dietary_label_bonus: 10.0,
            similarity_weight: 5.0,
            improvement_bonus: 2.0,
            source_weights: SourceWeights::default(),
        }
    }
}

/// Scores deduplicated candidates against the target and returns a diverse, ordered shortlist.
pub struct AlternativeRanker {
    restrictions: Arc<RestrictionCatalog>,
    config: RankingConfig,
    scorers: Vec<Box<dyn AlternativeScorer>>,
}

impl AlternativeRanker {
    pub fn new(restrictions: Arc<RestrictionCatalog>, config: RankingConfig) -> Self {
        Self::with_scorers(
            restrictions,
            config,
            vec![
                Box::new(NutriscoreScorer),
                Box::new(ProcessingScorer),
                Box::new(NutrientDeltaScorer),
                Box::new(ProfileCompatibilityScorer),
                Box::new(SimilarityScorer),
            ],
        )
    }

    pub fn with_scorers(
        restrictions: Arc<RestrictionCatalog>,
        config: RankingConfig,
        scorers: Vec<Box<dyn AlternativeScorer>>,
    ) -> Self {
        Self {
            restrictions,
            config,
            scorers,
        }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn rank(
        &self,
        target: &ProductRecord,
        profile: &UserHealthProfile,
        candidates: Vec<CandidateRecord>,
        limit: usize,
        min_score: f64,
    ) -> Vec<AlternativeCandidate> {
        if limit == 0 {
            return Vec::new();
        }

        let pool = dedupe_candidates(target, candidates, &self.config.source_weights);
        let context = RankingContext {
            target,
            profile,
            restrictions: &self.restrictions,
            config: &self.config,
        };

        let pool_size = pool.len();
        let mut ranked: Vec<AlternativeCandidate> = pool
            .into_iter()
            .filter_map(|candidate| self.evaluate(&context, candidate))
            .filter(|candidate| candidate.final_score >= min_score)
            .collect();
        ranked.sort_by(|left, right| {
            right
                .final_score
                .total_cmp(&left.final_score)
                .then_with(|| left.product.code.cmp(&right.product.code))
        });

        debug!(
            target = %target.code,
            pool = pool_size,
            qualified = ranked.len(),
            limit,
            "ranked alternatives"
        );

        diversify(ranked, limit)
    }

    fn evaluate(
        &self,
        context: &RankingContext<'_>,
        candidate: CandidateRecord,
    ) -> Option<AlternativeCandidate> {
        let mut card = ScoreCard::new(self.config.baseline);
        for scorer in &self.scorers {
            scorer.score(context, &candidate.product, &mut card);
        }

        let qualifies = !card.improvements.is_empty()
            && card.breakdown.candidate_score() > self.config.baseline;
        if !qualifies {
            return None;
        }

        card.breakdown.source_weight = self.config.source_weights.weight(candidate.source);
        card.breakdown.improvement_bonus =
            card.improvements.len() as f64 * self.config.improvement_bonus;

        Some(AlternativeCandidate {
            final_score: card.breakdown.final_score(),
            product: candidate.product,
            breakdown: card.breakdown,
            improvement_reasons: card.improvements,
            source_type: candidate.source,
        })
    }
}

/// Keeps the best candidate, admits unseen categories until half the slots are used, then fills
/// the remainder by score. Input must already be sorted by descending score; output keeps that
/// order.
fn diversify(ranked: Vec<AlternativeCandidate>, limit: usize) -> Vec<AlternativeCandidate> {
    if limit <= 1 || ranked.len() <= limit {
        return ranked.into_iter().take(limit).collect();
    }

    let half = (limit / 2).max(1);
    let mut taken = vec![false; ranked.len()];
    let mut seen = HashSet::new();
    let mut selected = 0;

    taken[0] = true;
    seen.insert(ranked[0].product.primary_category().to_lowercase());
    selected += 1;

    for (index, candidate) in ranked.iter().enumerate().skip(1) {
        if selected >= half {
            break;
        }
        if seen.insert(candidate.product.primary_category().to_lowercase()) {
            taken[index] = true;
            selected += 1;
        }
    }

    for flag in taken.iter_mut() {
        if selected >= limit {
            break;
        }
        if !*flag {
            *flag = true;
            selected += 1;
        }
    }

    ranked
        .into_iter()
        .zip(taken)
        .filter_map(|(candidate, keep)| keep.then_some(candidate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compatibility::alternatives::ScoreBreakdown;

    fn candidate(code: &str, category: &str, score: f64) -> AlternativeCandidate {
        let mut product = ProductRecord::new(code, code);
        product.category = category.to_string();
        AlternativeCandidate {
            product,
            final_score: score,
            breakdown: ScoreBreakdown::default(),
            improvement_reasons: Vec::new(),
            source_type: CandidateSource::Category,
        }
    }

    #[test]
    fn diversity_promotes_an_unseen_category_into_the_first_half() {
        let ranked = vec![
            candidate("a", "en:cereals", 90.0),
            candidate("b", "en:cereals", 85.0),
            candidate("c", "en:cereals", 80.0),
            candidate("d", "en:mueslis", 70.0),
            candidate("e", "en:cereals", 60.0),
        ];

        let picked: Vec<String> = diversify(ranked, 4)
            .into_iter()
            .map(|candidate| candidate.product.code.0)
            .collect();

        assert_eq!(picked, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn diversity_backfill_keeps_score_order_and_respects_limit() {
        let ranked = vec![
            candidate("a", "en:cereals", 90.0),
            candidate("b", "en:cereals", 85.0),
            candidate("c", "en:granola", 40.0),
            candidate("d", "en:bars", 30.0),
        ];

        let picked: Vec<String> = diversify(ranked, 2)
            .into_iter()
            .map(|candidate| candidate.product.code.0)
            .collect();

        assert_eq!(picked, vec!["a", "b"]);
    }

    #[test]
    fn diversity_with_larger_limit_swaps_in_other_categories() {
        let ranked = vec![
            candidate("a", "en:cereals", 90.0),
            candidate("b", "en:cereals", 85.0),
            candidate("c", "en:cereals", 84.0),
            candidate("d", "en:cereals", 83.0),
            candidate("e", "en:granola", 40.0),
            candidate("f", "en:bars", 30.0),
        ];

        let picked: Vec<String> = diversify(ranked, 4)
            .into_iter()
            .map(|candidate| candidate.product.code.0)
            .collect();

        assert_eq!(picked, vec!["a", "b", "c", "e"]);
    }

    #[test]
    fn zero_limit_returns_nothing() {
        let ranked = vec![candidate("a", "en:cereals", 90.0)];
        assert!(diversify(ranked, 0).is_empty());
    }
}
