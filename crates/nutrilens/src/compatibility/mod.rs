//! Health-compatibility evaluation of food products against user health profiles.
//!
//! Analyzers and the nutrition evaluator feed the score synthesizer; the learned estimator runs
//! beside it with a rule-based fallback. Alternatives are retrieved from a [`ProductCatalog`],
//! ranked, and folded into recommendations with the analysis alerts.

pub mod alternatives;
pub mod analyzers;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod nutrition;
pub mod profile;
pub mod recommendations;
pub mod repository;
pub mod restrictions;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use alternatives::{
    AlternativeCandidate, AlternativeRanker, AlternativeScorer, CandidateRecord,
    CandidateRetriever, CandidateSource, Improvement, ImprovementKind, RankingConfig,
    RetrievalConfig, ScoreBreakdown,
};
pub use analyzers::{AnalyzerLimits, AnalyzerOutcome, CompatibilityAnalyzer};
pub use config::{EngineConfig, EngineConfigError};
pub use domain::{
    ActivityLevel, Alert, AlertKind, DetectionMethod, Gender, NutriscoreGrade, Nutrient,
    Nutrients, ProductCode, ProductRecord, Severity, UserHealthProfile, UserId,
};
pub use engine::{AnalysisResult, CompatibilityEngine, QuickVerdict};
pub use error::{CompatibilityError, MissingEntity};
pub use estimator::{
    FileModelRepository, LearnedScore, LearnedScoreEstimator, ModelBundle, ModelHandle,
    ModelLoadError, ModelRepository, NoModel, ScoreLevel, ScoreSource,
};
pub use nutrition::{NutrientAxis, NutrientLevel, NutritionAnalysis, NutritionEvaluator};
pub use profile::{normalize_profile, ListInput, RawProfileInput};
pub use recommendations::{
    AlternativeSummary, ComposerConfig, Recommendation, RecommendationKind, RecommendedAction,
};
pub use repository::{
    AnalysisCache, CatalogError, Page, ProductCatalog, ProfileStore, ProfileStoreError,
    SearchFilters,
};
pub use restrictions::{RestrictionCatalog, RestrictionConfigError};
pub use router::compatibility_router;
pub use scoring::{ScoreComponent, ScoringConfig, SuitabilityDecision, UnsuitableReason};
pub use service::{CompatibilityService, ProductReport};
