//! Alternative-product search: candidate retrieval, scoring, and diversity-aware ranking.

mod ranker;
mod retrieval;
mod scorers;

pub use ranker::{AlternativeRanker, RankingConfig, SourceWeights};
pub use retrieval::{CandidateRetriever, RetrievalConfig};
pub use scorers::{
    AlternativeScorer, NutrientDeltaScorer, NutriscoreScorer, ProcessingScorer,
    ProfileCompatibilityScorer, RankingContext, ScoreCard, SimilarityScorer,
};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::domain::ProductRecord;

/// Strategy that surfaced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Category,
    Brand,
    Dietary,
    Health,
}

/// A retrieved product paired with where it came from; the catalog entity is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub product: ProductRecord,
    pub source: CandidateSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementKind {
    BetterNutriscore,
    LessProcessed,
    LessSugar,
    LessSalt,
    LessSaturatedFat,
    FewerCalories,
    MoreFiber,
    MoreProtein,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Improvement {
    pub kind: ImprovementKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub baseline: f64,
    pub nutriscore_bonus: f64,
    pub processing_bonus: f64,
    pub nutrition_delta_bonus: f64,
    pub profile_bonus: f64,
    pub similarity_bonus: f64,
    pub source_weight: f64,
    pub improvement_bonus: f64,
}

impl ScoreBreakdown {
    /// Health of the candidate relative to the target, before ranking weights.
    pub fn candidate_score(&self) -> f64 {
        self.baseline
            + self.nutriscore_bonus
            + self.processing_bonus
            + self.nutrition_delta_bonus
            + self.profile_bonus
    }

    pub fn final_score(&self) -> f64 {
        self.candidate_score() + self.similarity_bonus + self.source_weight + self.improvement_bonus
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeCandidate {
    pub product: ProductRecord,
    pub final_score: f64,
    pub breakdown: ScoreBreakdown,
    pub improvement_reasons: Vec<Improvement>,
    pub source_type: CandidateSource,
}

/// Drops the target and collapses duplicates by code (or name when the code is blank), keeping
/// the record from the highest-weighted source. First-seen order is preserved.
pub fn dedupe_candidates(
    target: &ProductRecord,
    candidates: Vec<CandidateRecord>,
    weights: &SourceWeights,
) -> Vec<CandidateRecord> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<CandidateRecord> = Vec::new();

    for candidate in candidates {
        if candidate.product.same_product(target) {
            continue;
        }
        let identity = candidate.product.identity();
        match positions.get(&identity) {
            Some(&index) => {
                if weights.weight(candidate.source) > weights.weight(merged[index].source) {
                    merged[index] = candidate;
                }
            }
            None => {
                positions.insert(identity, merged.len());
                merged.push(candidate);
            }
        }
    }

    merged
}
