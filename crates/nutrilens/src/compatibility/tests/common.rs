use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::compatibility::domain::{
    NutriscoreGrade, Nutrient, Nutrients, ProductCode, ProductRecord, UserHealthProfile, UserId,
};
use crate::compatibility::profile::{normalize_profile, RawProfileInput};
use crate::compatibility::repository::{
    AnalysisCache, CatalogError, Page, ProductCatalog, ProfileStore, ProfileStoreError,
    SearchFilters,
};
use crate::compatibility::restrictions::RestrictionCatalog;
use crate::compatibility::service::{CompatibilityService, ProductReport};
use crate::compatibility::{CompatibilityEngine, EngineConfig};

pub(super) fn restrictions() -> Arc<RestrictionCatalog> {
    Arc::new(RestrictionCatalog::builtin().expect("builtin tables"))
}

pub(super) fn engine() -> CompatibilityEngine {
    CompatibilityEngine::builtin().expect("builtin engine")
}

pub(super) fn engine_with(config: EngineConfig) -> CompatibilityEngine {
    CompatibilityEngine::new(restrictions(), config, None)
}

pub(super) fn profile(
    allergies: Vec<&str>,
    conditions: Vec<&str>,
    preferences: Vec<&str>,
) -> UserHealthProfile {
    normalize_profile(RawProfileInput {
        allergies: allergies.into(),
        medical_conditions: conditions.into(),
        dietary_preferences: preferences.into(),
        ..RawProfileInput::default()
    })
}

pub(super) fn empty_profile() -> UserHealthProfile {
    profile(Vec::new(), Vec::new(), Vec::new())
}

/// Sugary breakfast cereal used as the usual analysis target.
pub(super) fn cereal() -> ProductRecord {
    let mut product = ProductRecord::new("3017620422003", "Choco Crunch Cereal");
    product.category = "en:breakfast-cereals".to_string();
    product.brand = "Crunchy Co".to_string();
    product.nutrients = Nutrients::new()
        .with(Nutrient::EnergyKcal, 420.0)
        .with(Nutrient::Fat, 12.0)
        .with(Nutrient::SaturatedFat, 4.0)
        .with(Nutrient::Sugars, 30.0)
        .with(Nutrient::Salt, 0.8)
        .with(Nutrient::Proteins, 7.0)
        .with(Nutrient::Fiber, 4.0)
        .with(Nutrient::Carbohydrates, 70.0);
    product.ingredients_text = "whole wheat flour, sugar, cocoa, palm oil".to_string();
    product.nutriscore_grade = NutriscoreGrade::D;
    product.nova_group = 4;
    product.processing_level = 4;
    product.additive_count = 3;
    product
}

/// Same cereal with sugar cut to the given share of the original.
pub(super) fn cereal_variant(code: &str, sugar_share: f64) -> ProductRecord {
    let mut product = cereal();
    product.code = ProductCode(code.to_string());
    product.name = format!("Choco Crunch {code}");
    product.nutrients.set(Nutrient::Sugars, 30.0 * sugar_share);
    product
}

pub(super) fn oat_flakes() -> ProductRecord {
    let mut product = ProductRecord::new("5000000000017", "Plain Oat Flakes");
    product.category = "en:breakfast-cereals".to_string();
    product.brand = "Field Mill".to_string();
    product.nutrients = Nutrients::new()
        .with(Nutrient::EnergyKcal, 370.0)
        .with(Nutrient::Fat, 7.0)
        .with(Nutrient::SaturatedFat, 1.2)
        .with(Nutrient::Sugars, 1.0)
        .with(Nutrient::Salt, 0.01)
        .with(Nutrient::Proteins, 13.0)
        .with(Nutrient::Fiber, 10.0)
        .with(Nutrient::Carbohydrates, 59.0);
    product.ingredients_text = "rolled oats".to_string();
    product.label_tags.insert("en:vegan".to_string());
    product.nutriscore_grade = NutriscoreGrade::A;
    product.nova_group = 1;
    product.processing_level = 1;
    product
}

pub(super) fn granola_bar() -> ProductRecord {
    let mut product = ProductRecord::new("5000000000024", "Honey Granola Bar");
    product.category = "en:cereal-bars".to_string();
    product.brand = "Crunchy Co".to_string();
    product.nutrients = Nutrients::new()
        .with(Nutrient::EnergyKcal, 400.0)
        .with(Nutrient::Fat, 11.0)
        .with(Nutrient::SaturatedFat, 3.0)
        .with(Nutrient::Sugars, 18.0)
        .with(Nutrient::Salt, 0.5)
        .with(Nutrient::Proteins, 8.0)
        .with(Nutrient::Fiber, 6.0);
    product.ingredients_text = "oats, honey, almonds".to_string();
    product.nutriscore_grade = NutriscoreGrade::C;
    product.nova_group = 3;
    product.processing_level = 3;
    product
}

pub(super) fn catalog_products() -> Vec<ProductRecord> {
    vec![
        cereal(),
        cereal_variant("3017620422010", 0.8),
        oat_flakes(),
        granola_bar(),
    ]
}

#[derive(Default, Clone)]
pub(super) struct MemoryCatalog {
    products: Arc<Vec<ProductRecord>>,
}

impl MemoryCatalog {
    pub(super) fn new(products: Vec<ProductRecord>) -> Self {
        Self {
            products: Arc::new(products),
        }
    }
}

impl ProductCatalog for MemoryCatalog {
    async fn fetch(&self, code: &ProductCode) -> Result<Option<ProductRecord>, CatalogError> {
        Ok(self
            .products
            .iter()
            .find(|product| &product.code == code)
            .cloned())
    }

    async fn search(
        &self,
        _query: &str,
        filters: &SearchFilters,
        page: Page,
    ) -> Result<Vec<ProductRecord>, CatalogError> {
        Ok(self
            .products
            .iter()
            .filter(|product| filters.matches(product))
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableCatalog;

impl ProductCatalog for UnavailableCatalog {
    async fn fetch(&self, _code: &ProductCode) -> Result<Option<ProductRecord>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".to_string()))
    }

    async fn search(
        &self,
        _query: &str,
        _filters: &SearchFilters,
        _page: Page,
    ) -> Result<Vec<ProductRecord>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".to_string()))
    }
}

/// Answers brand searches promptly and stalls on everything else.
pub(super) struct SlowCatalog {
    pub(super) inner: MemoryCatalog,
    pub(super) delay: Duration,
}

impl ProductCatalog for SlowCatalog {
    async fn fetch(&self, code: &ProductCode) -> Result<Option<ProductRecord>, CatalogError> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch(code).await
    }

    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        page: Page,
    ) -> Result<Vec<ProductRecord>, CatalogError> {
        if filters.brand.is_none() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.search(query, filters, page).await
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryProfiles {
    profiles: Arc<Mutex<HashMap<UserId, UserHealthProfile>>>,
}

impl MemoryProfiles {
    pub(super) fn with(self, user_id: &str, profile: UserHealthProfile) -> Self {
        self.profiles
            .lock()
            .expect("profile mutex poisoned")
            .insert(UserId(user_id.to_string()), profile);
        self
    }
}

impl ProfileStore for MemoryProfiles {
    async fn get(&self, user_id: &UserId) -> Result<Option<UserHealthProfile>, ProfileStoreError> {
        Ok(self
            .profiles
            .lock()
            .expect("profile mutex poisoned")
            .get(user_id)
            .cloned())
    }
}

pub(super) struct FailingProfiles;

impl ProfileStore for FailingProfiles {
    async fn get(&self, _user_id: &UserId) -> Result<Option<UserHealthProfile>, ProfileStoreError> {
        Err(ProfileStoreError::Unavailable("profile database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryCache {
    entries: Mutex<HashMap<String, ProductReport>>,
    hits: Mutex<usize>,
}

impl MemoryCache {
    pub(super) fn hits(&self) -> usize {
        *self.hits.lock().expect("cache mutex poisoned")
    }

    pub(super) fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }
}

impl AnalysisCache for MemoryCache {
    fn get(&self, key: &str) -> Option<ProductReport> {
        let found = self
            .entries
            .lock()
            .expect("cache mutex poisoned")
            .get(key)
            .cloned();
        if found.is_some() {
            *self.hits.lock().expect("cache mutex poisoned") += 1;
        }
        found
    }

    fn set(&self, key: String, report: ProductReport, _ttl: Duration) {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert(key, report);
    }
}

pub(super) fn build_service(
    profiles: MemoryProfiles,
) -> CompatibilityService<MemoryCatalog, MemoryProfiles> {
    CompatibilityService::new(
        Arc::new(engine()),
        Arc::new(MemoryCatalog::new(catalog_products())),
        Arc::new(profiles),
    )
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
