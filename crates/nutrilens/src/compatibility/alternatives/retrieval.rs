use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::super::domain::{Nutrient, ProductRecord, UserHealthProfile};
use super::super::nutrition::quality_rating;
use super::super::repository::{CatalogError, Page, ProductCatalog, SearchFilters};
use super::super::restrictions::{NutrientCeiling, RestrictionCatalog};
use super::{CandidateRecord, CandidateSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub per_strategy_limit: usize,
    pub strategy_timeout_ms: u64,
    /// Upper bound on products read while ranking a category by quality.
    pub category_scan_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            per_strategy_limit: 20,
            strategy_timeout_ms: 1500,
            category_scan_limit: 1000,
        }
    }
}

impl RetrievalConfig {
    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }
}

/// Runs the four retrieval strategies concurrently against a catalog. A strategy that fails or
/// overruns its timeout contributes nothing; the others still count.
pub struct CandidateRetriever<C> {
    catalog: Arc<C>,
    restrictions: Arc<RestrictionCatalog>,
    config: RetrievalConfig,
}

impl<C> CandidateRetriever<C>
where
    C: ProductCatalog,
{
    pub fn new(
        catalog: Arc<C>,
        restrictions: Arc<RestrictionCatalog>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            catalog,
            restrictions,
            config,
        }
    }

    pub async fn retrieve(
        &self,
        target: &ProductRecord,
        profile: &UserHealthProfile,
    ) -> Vec<CandidateRecord> {
        let (category, brand, dietary, health) = tokio::join!(
            self.bounded(CandidateSource::Category, self.by_category(target)),
            self.bounded(CandidateSource::Brand, self.by_brand(target)),
            self.bounded(CandidateSource::Dietary, self.by_dietary(target, profile)),
            self.bounded(CandidateSource::Health, self.by_health(target, profile)),
        );

        let mut pool = Vec::new();
        for (source, products) in [
            (CandidateSource::Category, category),
            (CandidateSource::Brand, brand),
            (CandidateSource::Dietary, dietary),
            (CandidateSource::Health, health),
        ] {
            pool.extend(
                products
                    .into_iter()
                    .map(|product| CandidateRecord { product, source }),
            );
        }

        debug!(target = %target.code, candidates = pool.len(), "retrieved candidates");
        pool
    }

    async fn bounded<F>(&self, source: CandidateSource, strategy: F) -> Vec<ProductRecord>
    where
        F: Future<Output = Result<Vec<ProductRecord>, CatalogError>>,
    {
        match tokio::time::timeout(self.config.strategy_timeout(), strategy).await {
            Ok(Ok(products)) => products,
            Ok(Err(error)) => {
                warn!(?source, %error, "retrieval strategy failed");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    ?source,
                    timeout_ms = self.config.strategy_timeout_ms,
                    "retrieval strategy timed out"
                );
                Vec::new()
            }
        }
    }

    async fn by_category(
        &self,
        target: &ProductRecord,
    ) -> Result<Vec<ProductRecord>, CatalogError> {
        let category = target.primary_category();
        if category.is_empty() {
            return Ok(Vec::new());
        }

        let filters = SearchFilters {
            category: Some(category.to_string()),
            ..SearchFilters::default()
        };
        // Quality order needs the whole category, not the first page of it.
        let mut products = self.scan(target, &filters).await?;
        products.sort_by(|left, right| {
            quality_rating(&right.nutrients).total_cmp(&quality_rating(&left.nutrients))
        });
        products.truncate(self.config.per_strategy_limit);
        Ok(products)
    }

    async fn by_brand(&self, target: &ProductRecord) -> Result<Vec<ProductRecord>, CatalogError> {
        let brand = target.primary_brand();
        if brand.is_empty() {
            return Ok(Vec::new());
        }

        let filters = SearchFilters {
            brand: Some(brand.to_string()),
            ..SearchFilters::default()
        };
        self.search(target, &filters).await
    }

    async fn by_dietary(
        &self,
        target: &ProductRecord,
        profile: &UserHealthProfile,
    ) -> Result<Vec<ProductRecord>, CatalogError> {
        let labels: Vec<String> = self
            .restrictions
            .dietary_preferences()
            .select(&profile.dietary_preferences)
            .flat_map(|rule| rule.definition().label_tags.iter().cloned())
            .collect();
        if labels.is_empty() {
            return Ok(Vec::new());
        }

        let category = non_empty(target.primary_category());
        let mut seen = HashSet::new();
        let mut products = Vec::new();
        for label in labels {
            let filters = SearchFilters {
                category: category.clone(),
                label: Some(label),
                ..SearchFilters::default()
            };
            for product in self.search(target, &filters).await? {
                if seen.insert(product.identity()) {
                    products.push(product);
                }
            }
            if products.len() >= self.config.per_strategy_limit {
                break;
            }
        }

        products.truncate(self.config.per_strategy_limit);
        Ok(products)
    }

    async fn by_health(
        &self,
        target: &ProductRecord,
        profile: &UserHealthProfile,
    ) -> Result<Vec<ProductRecord>, CatalogError> {
        let mut strictest: BTreeMap<Nutrient, f64> = BTreeMap::new();
        for rule in self
            .restrictions
            .medical_conditions()
            .select(&profile.medical_conditions)
        {
            for ceiling in &rule.definition().search_ceilings {
                strictest
                    .entry(ceiling.nutrient)
                    .and_modify(|max| *max = max.min(ceiling.max))
                    .or_insert(ceiling.max);
            }
        }
        if strictest.is_empty() {
            return Ok(Vec::new());
        }

        let filters = SearchFilters {
            category: non_empty(target.primary_category()),
            ceilings: strictest
                .into_iter()
                .map(|(nutrient, max)| NutrientCeiling { nutrient, max })
                .collect(),
            ..SearchFilters::default()
        };
        self.search(target, &filters).await
    }

    async fn search(
        &self,
        target: &ProductRecord,
        filters: &SearchFilters,
    ) -> Result<Vec<ProductRecord>, CatalogError> {
        let filters = excluding_target(target, filters);
        let limit = self.config.per_strategy_limit;
        let products = self
            .catalog
            .search("", &filters, Page::first(limit.saturating_mul(2)))
            .await?;

        Ok(products
            .into_iter()
            .filter(|product| filters.matches(product) && !product.same_product(target))
            .take(limit)
            .collect())
    }

    /// Pages through every match, stopping at `category_scan_limit` products.
    async fn scan(
        &self,
        target: &ProductRecord,
        filters: &SearchFilters,
    ) -> Result<Vec<ProductRecord>, CatalogError> {
        let filters = excluding_target(target, filters);
        let page_size = self.config.per_strategy_limit.max(1).saturating_mul(2);
        let mut products = Vec::new();
        let mut offset = 0;

        loop {
            let batch = self
                .catalog
                .search("", &filters, Page { offset, limit: page_size })
                .await?;
            let fetched = batch.len();
            products.extend(
                batch
                    .into_iter()
                    .filter(|product| filters.matches(product) && !product.same_product(target)),
            );
            offset += fetched;
            if fetched < page_size || offset >= self.config.category_scan_limit {
                break;
            }
        }

        Ok(products)
    }
}

fn excluding_target(target: &ProductRecord, filters: &SearchFilters) -> SearchFilters {
    let mut filters = filters.clone();
    if !target.code.is_blank() {
        filters.exclude = Some(target.code.clone());
    }
    filters
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
