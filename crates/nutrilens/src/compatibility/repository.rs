use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::domain::{Nutrient, ProductCode, ProductRecord, UserHealthProfile, UserId};
use super::restrictions::NutrientCeiling;
use super::service::ProductReport;

/// Structured search constraints. Catalogs may ignore some; callers re-check with [`matches`].
///
/// [`matches`]: SearchFilters::matches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub label: Option<String>,
    #[serde(default)]
    pub ceilings: Vec<NutrientCeiling>,
    pub exclude: Option<ProductCode>,
}

impl SearchFilters {
    pub fn matches(&self, product: &ProductRecord) -> bool {
        if let Some(category) = &self.category {
            if !product.primary_category().eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(brand) = &self.brand {
            if !product.primary_brand().eq_ignore_ascii_case(brand) {
                return false;
            }
        }
        if let Some(label) = &self.label {
            if !product.label_tags.contains(label) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if &product.code == exclude {
                return false;
            }
        }
        self.ceilings
            .iter()
            .all(|ceiling| within_ceiling(product, ceiling.nutrient, ceiling.max))
    }
}

fn within_ceiling(product: &ProductRecord, nutrient: Nutrient, max: f64) -> bool {
    product.nutrients.get(nutrient) <= max
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }
}

/// Read access to the product catalog.
pub trait ProductCatalog: Send + Sync {
    fn fetch(
        &self,
        code: &ProductCode,
    ) -> impl Future<Output = Result<Option<ProductRecord>, CatalogError>> + Send;

    fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        page: Page,
    ) -> impl Future<Output = Result<Vec<ProductRecord>, CatalogError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    #[error("catalog query rejected: {0}")]
    InvalidQuery(String),
}

/// Read access to stored user profiles.
pub trait ProfileStore: Send + Sync {
    fn get(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Option<UserHealthProfile>, ProfileStoreError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileStoreError {
    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}

/// Short-lived memo of product reports, owned outside the engine.
pub trait AnalysisCache: Send + Sync {
    fn get(&self, key: &str) -> Option<ProductReport>;
    fn set(&self, key: String, report: ProductReport, ttl: Duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_check_category_label_and_ceilings() {
        let mut product = ProductRecord::new("7", "Skyr");
        product.category = "en:yogurts".to_string();
        product.label_tags.insert("en:high-protein".to_string());
        product.nutrients = product.nutrients.with(Nutrient::Sugars, 3.5);

        let filters = SearchFilters {
            category: Some("Yogurts".to_string()),
            label: Some("en:high-protein".to_string()),
            ceilings: vec![NutrientCeiling {
                nutrient: Nutrient::Sugars,
                max: 5.0,
            }],
            ..SearchFilters::default()
        };
        assert!(filters.matches(&product));

        let strict = SearchFilters {
            ceilings: vec![NutrientCeiling {
                nutrient: Nutrient::Sugars,
                max: 3.0,
            }],
            ..filters.clone()
        };
        assert!(!strict.matches(&product));

        let excluding = SearchFilters {
            exclude: Some(ProductCode("7".to_string())),
            ..filters
        };
        assert!(!excluding.matches(&product));
    }
}
