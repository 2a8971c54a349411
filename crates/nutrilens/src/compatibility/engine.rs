use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::alternatives::{AlternativeCandidate, AlternativeRanker, CandidateRecord};
use super::analyzers::{AllergenAnalyzer, CompatibilityAnalyzer, DietaryAnalyzer, MedicalAnalyzer};
use super::config::EngineConfig;
use super::domain::{sort_alerts, Alert, ProductCode, ProductRecord, UserHealthProfile};
use super::error::CompatibilityError;
use super::estimator::{LearnedScore, LearnedScoreEstimator, ModelHandle};
use super::nutrition::{NutritionAnalysis, NutritionEvaluator};
use super::recommendations::{Recommendation, RecommendationComposer};
use super::restrictions::{RestrictionCatalog, RestrictionConfigError};
use super::scoring::{
    summarize, ScoreComponent, ScoreSynthesizer, SuitabilityDecision, UnsuitableReason,
};

const QUICK_TOP_ALERTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub product_code: ProductCode,
    /// 0-100.
    pub health_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learned_score: Option<LearnedScore>,
    pub is_suitable: bool,
    pub suitability: SuitabilityDecision,
    pub alerts: Vec<Alert>,
    pub nutrition_analysis: Option<NutritionAnalysis>,
    pub score_components: Vec<ScoreComponent>,
    /// 0-100.
    pub confidence_score: u8,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisResult {
    /// Safe default for a product that failed validation.
    pub fn invalid(product: &ProductRecord, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::unsuitable(
            product,
            format!("Cannot analyze product: {message}"),
            UnsuitableReason::InvalidProduct { message },
        )
    }

    /// Safe default for an internal failure.
    pub fn failed(product: &ProductRecord, error: &CompatibilityError) -> Self {
        Self::unsuitable(
            product,
            "Analysis unavailable; treat this product with caution".to_string(),
            UnsuitableReason::AnalysisFailed {
                message: error.to_string(),
            },
        )
    }

    fn unsuitable(product: &ProductRecord, summary: String, reason: UnsuitableReason) -> Self {
        Self {
            product_code: product.code.clone(),
            health_score: 0,
            learned_score: None,
            is_suitable: false,
            suitability: SuitabilityDecision::Unsuitable {
                reasons: vec![reason],
            },
            alerts: Vec::new(),
            nutrition_analysis: None,
            score_components: Vec::new(),
            confidence_score: 0,
            summary,
            timestamp: Utc::now(),
        }
    }

    pub fn critical_alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|alert| alert.is_critical())
    }
}

/// Coarse 1-5 verdict built from critical alerts only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickVerdict {
    pub product_code: ProductCode,
    pub quick_score: u8,
    pub is_suitable: bool,
    pub critical_count: usize,
    pub top_alerts: Vec<Alert>,
}

/// Stateless verdict pipeline. Every collaborator is immutable once built, so one engine can be
/// shared across concurrent requests.
pub struct CompatibilityEngine {
    restrictions: Arc<RestrictionCatalog>,
    config: EngineConfig,
    allergens: AllergenAnalyzer,
    medical: MedicalAnalyzer,
    dietary: DietaryAnalyzer,
    nutrition: NutritionEvaluator,
    synthesizer: ScoreSynthesizer,
    estimator: LearnedScoreEstimator,
    ranker: AlternativeRanker,
    composer: RecommendationComposer,
}

impl CompatibilityEngine {
    pub fn new(
        restrictions: Arc<RestrictionCatalog>,
        config: EngineConfig,
        model: Option<ModelHandle>,
    ) -> Self {
        Self {
            allergens: AllergenAnalyzer::new(restrictions.clone(), config.analyzers.clone()),
            medical: MedicalAnalyzer::new(restrictions.clone(), config.analyzers.clone()),
            dietary: DietaryAnalyzer::new(restrictions.clone(), config.analyzers.clone()),
            nutrition: NutritionEvaluator::new(config.nutrition.clone()),
            synthesizer: ScoreSynthesizer::new(config.scoring.clone()),
            estimator: LearnedScoreEstimator::new(model, config.fallback.clone()),
            ranker: AlternativeRanker::new(restrictions.clone(), config.ranking.clone()),
            composer: RecommendationComposer::new(restrictions.clone(), config.composer.clone()),
            restrictions,
            config,
        }
    }

    /// Embedded restriction tables, default constants, no learned model.
    pub fn builtin() -> Result<Self, RestrictionConfigError> {
        Ok(Self::new(
            Arc::new(RestrictionCatalog::builtin()?),
            EngineConfig::default(),
            None,
        ))
    }

    pub fn restrictions(&self) -> &Arc<RestrictionCatalog> {
        &self.restrictions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn has_model(&self) -> bool {
        self.estimator.has_model()
    }

    /// Never fails: validation problems and internal errors become unsuitable results.
    pub fn analyze(&self, product: &ProductRecord, profile: &UserHealthProfile) -> AnalysisResult {
        match self.try_analyze(product, profile) {
            Ok(result) => result,
            Err(CompatibilityError::Validation(message)) => {
                debug!(product = %product.code, %message, "product rejected");
                AnalysisResult::invalid(product, message)
            }
            Err(error) => {
                warn!(product = %product.code, %error, "analysis failed; returning safe default");
                AnalysisResult::failed(product, &error)
            }
        }
    }

    pub fn try_analyze(
        &self,
        product: &ProductRecord,
        profile: &UserHealthProfile,
    ) -> Result<AnalysisResult, CompatibilityError> {
        product.validate()?;

        let nutrition = self.nutrition.evaluate(product);
        let mut alerts = Vec::new();
        for (analyzer, keys) in self.analyzers(profile) {
            alerts.extend(analyzer.analyze(product, keys).alerts);
        }
        sort_alerts(&mut alerts);

        let synthesized = self
            .synthesizer
            .synthesize(product, profile, &alerts, &nutrition)?;
        let learned_score = self.estimator.estimate(product, profile, &nutrition);

        debug!(
            product = %product.code,
            health_score = synthesized.health_score,
            alerts = alerts.len(),
            "analysis complete"
        );

        Ok(AnalysisResult {
            product_code: product.code.clone(),
            health_score: synthesized.health_score,
            learned_score: Some(learned_score),
            is_suitable: synthesized.suitability.is_suitable(),
            summary: summarize(synthesized.health_score, &synthesized.suitability),
            suitability: synthesized.suitability,
            alerts,
            nutrition_analysis: Some(nutrition),
            score_components: synthesized.components,
            confidence_score: synthesized.confidence_score,
            timestamp: Utc::now(),
        })
    }

    /// Critical alerts from tag and threshold checks only.
    pub fn quick_check(&self, product: &ProductRecord, profile: &UserHealthProfile) -> Vec<Alert> {
        if let Err(error) = product.validate() {
            debug!(product = %product.code, %error, "quick check skipped");
            return Vec::new();
        }

        let mut alerts = Vec::new();
        for (analyzer, keys) in self.analyzers(profile) {
            alerts.extend(analyzer.quick_check(product, keys));
        }
        sort_alerts(&mut alerts);
        alerts
    }

    pub fn quick_verdict(
        &self,
        product: &ProductRecord,
        profile: &UserHealthProfile,
    ) -> QuickVerdict {
        let alerts = self.quick_check(product, profile);
        let critical_count = alerts.len();
        let penalty = u8::try_from(critical_count).unwrap_or(u8::MAX);

        QuickVerdict {
            product_code: product.code.clone(),
            quick_score: 5u8.saturating_sub(penalty).max(1),
            is_suitable: critical_count == 0,
            critical_count,
            top_alerts: alerts.into_iter().take(QUICK_TOP_ALERTS).collect(),
        }
    }

    /// 0-10; uses the model when loaded and the rule-based formula otherwise.
    pub fn estimate_learned_score(
        &self,
        product: &ProductRecord,
        profile: &UserHealthProfile,
    ) -> LearnedScore {
        let nutrition = self.nutrition.evaluate(product);
        self.estimator.estimate(product, profile, &nutrition)
    }

    pub fn rank_alternatives(
        &self,
        target: &ProductRecord,
        profile: &UserHealthProfile,
        candidates: Vec<CandidateRecord>,
        limit: usize,
        min_score: f64,
    ) -> Vec<AlternativeCandidate> {
        self.ranker
            .rank(target, profile, candidates, limit, min_score)
    }

    pub fn recommend(
        &self,
        profile: &UserHealthProfile,
        analysis: &AnalysisResult,
        alternatives: &[AlternativeCandidate],
    ) -> Vec<Recommendation> {
        let findings = analysis
            .nutrition_analysis
            .as_ref()
            .map(|nutrition| nutrition.findings.as_slice())
            .unwrap_or_default();
        self.composer
            .compose(profile, &analysis.alerts, findings, alternatives)
    }

    fn analyzers<'a>(
        &'a self,
        profile: &'a UserHealthProfile,
    ) -> [(&'a dyn CompatibilityAnalyzer, &'a BTreeSet<String>); 3] {
        [
            (&self.allergens, &profile.allergies),
            (&self.medical, &profile.medical_conditions),
            (&self.dietary, &profile.dietary_preferences),
        ]
    }
}
