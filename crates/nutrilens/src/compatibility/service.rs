use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::alternatives::{AlternativeCandidate, CandidateRetriever};
use super::domain::{Alert, ProductCode, ProductRecord, UserHealthProfile, UserId};
use super::engine::{AnalysisResult, CompatibilityEngine, QuickVerdict};
use super::error::CompatibilityError;
use super::estimator::LearnedScore;
use super::recommendations::Recommendation;
use super::repository::{AnalysisCache, ProductCatalog, ProfileStore};

/// Everything the product page needs for one (user, product) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReport {
    pub product: ProductRecord,
    pub analysis: AnalysisResult,
    pub learned_score: LearnedScore,
    pub alternatives: Vec<AlternativeCandidate>,
    pub recommendations: Vec<Recommendation>,
}

/// Engine plus the catalog and profile collaborators, with an optional report cache.
pub struct CompatibilityService<C, P> {
    engine: Arc<CompatibilityEngine>,
    catalog: Arc<C>,
    profiles: Arc<P>,
    retriever: CandidateRetriever<C>,
    cache: Option<Arc<dyn AnalysisCache>>,
    cache_ttl: Duration,
}

impl<C, P> CompatibilityService<C, P>
where
    C: ProductCatalog + 'static,
    P: ProfileStore + 'static,
{
    pub fn new(engine: Arc<CompatibilityEngine>, catalog: Arc<C>, profiles: Arc<P>) -> Self {
        let retriever = CandidateRetriever::new(
            catalog.clone(),
            engine.restrictions().clone(),
            engine.config().retrieval.clone(),
        );
        Self {
            engine,
            catalog,
            profiles,
            retriever,
            cache: None,
            cache_ttl: Duration::from_secs(300),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn AnalysisCache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    pub fn engine(&self) -> &CompatibilityEngine {
        &self.engine
    }

    pub fn analyze(&self, product: &ProductRecord, profile: &UserHealthProfile) -> AnalysisResult {
        self.engine.analyze(product, profile)
    }

    pub fn quick_check(&self, product: &ProductRecord, profile: &UserHealthProfile) -> Vec<Alert> {
        self.engine.quick_check(product, profile)
    }

    pub fn quick_verdict(
        &self,
        product: &ProductRecord,
        profile: &UserHealthProfile,
    ) -> QuickVerdict {
        self.engine.quick_verdict(product, profile)
    }

    pub fn estimate_learned_score(
        &self,
        product: &ProductRecord,
        profile: &UserHealthProfile,
    ) -> LearnedScore {
        self.engine.estimate_learned_score(product, profile)
    }

    /// Never fails; unreachable strategies simply contribute no candidates.
    pub async fn find_alternatives(
        &self,
        product: &ProductRecord,
        profile: &UserHealthProfile,
        limit: usize,
        min_score: f64,
    ) -> Vec<AlternativeCandidate> {
        if limit == 0 || product.validate().is_err() {
            return Vec::new();
        }

        let candidates = self.retriever.retrieve(product, profile).await;
        self.engine
            .rank_alternatives(product, profile, candidates, limit, min_score)
    }

    /// Full report for a product already in hand.
    pub async fn report(
        &self,
        product: ProductRecord,
        profile: &UserHealthProfile,
        limit: usize,
    ) -> ProductReport {
        let analysis = self.engine.analyze(&product, profile);
        let learned_score = match analysis.learned_score {
            Some(score) => score,
            None => self.engine.estimate_learned_score(&product, profile),
        };
        let alternatives = self.find_alternatives(&product, profile, limit, 0.0).await;
        let recommendations = self.engine.recommend(profile, &analysis, &alternatives);

        ProductReport {
            product,
            analysis,
            learned_score,
            alternatives,
            recommendations,
        }
    }

    /// Looks up both sides, then builds (or reuses) the report.
    pub async fn report_for(
        &self,
        user_id: &UserId,
        code: &ProductCode,
        limit: usize,
    ) -> Result<ProductReport, CompatibilityError> {
        let profile = self.load_profile(user_id).await?;
        let key = format!("{user_id}:{code}:{limit}:{}", profile.fingerprint());

        if let Some(cache) = &self.cache {
            if let Some(report) = cache.get(&key) {
                debug!(%user_id, %code, "report served from cache");
                return Ok(report);
            }
        }

        let product = self.load_product(code).await?;
        let report = self.report(product, &profile, limit).await;

        if let Some(cache) = &self.cache {
            cache.set(key, report.clone(), self.cache_ttl);
        }
        Ok(report)
    }

    fn lookup_timeout(&self) -> Duration {
        self.engine.config().retrieval.strategy_timeout()
    }

    async fn load_profile(&self, user_id: &UserId) -> Result<UserHealthProfile, CompatibilityError> {
        match tokio::time::timeout(self.lookup_timeout(), self.profiles.get(user_id)).await {
            Ok(Ok(Some(profile))) => Ok(profile),
            Ok(Ok(None)) => Err(CompatibilityError::profile_not_found(user_id.to_string())),
            Ok(Err(error)) => {
                warn!(%user_id, %error, "profile store failed; using anonymous profile");
                Ok(UserHealthProfile::anonymous())
            }
            Err(_) => {
                warn!(%user_id, "profile lookup timed out; using anonymous profile");
                Ok(UserHealthProfile::anonymous())
            }
        }
    }

    async fn load_product(&self, code: &ProductCode) -> Result<ProductRecord, CompatibilityError> {
        match tokio::time::timeout(self.lookup_timeout(), self.catalog.fetch(code)).await {
            Ok(Ok(Some(product))) => Ok(product),
            Ok(Ok(None)) => Err(CompatibilityError::product_not_found(code.to_string())),
            Ok(Err(error)) => Err(CompatibilityError::Transient(error.to_string())),
            Err(_) => Err(CompatibilityError::Transient(format!(
                "catalog lookup for {code} timed out"
            ))),
        }
    }
}
