use metrics_exporter_prometheus::PrometheusHandle;
use nutrilens::catalog::{CsvCatalogImporter, InMemoryCatalog};
use nutrilens::compatibility::{
    AnalysisCache, CompatibilityEngine, CompatibilityService, EngineConfig, FileModelRepository,
    LearnedScoreEstimator, NoModel, ProductReport, ProfileStore, ProfileStoreError,
    RestrictionCatalog, UserHealthProfile, UserId,
};
use nutrilens::config::EngineSettings;
use nutrilens::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

pub(crate) type AppService = CompatibilityService<InMemoryCatalog, InMemoryProfileStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryProfileStore {
    profiles: Arc<RwLock<HashMap<UserId, UserHealthProfile>>>,
}

impl InMemoryProfileStore {
    pub(crate) fn upsert(&self, user_id: UserId, profile: UserHealthProfile) {
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, profile);
    }
}

impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<UserHealthProfile>, ProfileStoreError> {
        let guard = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(user_id).cloned())
    }
}

/// Report memo with per-entry expiry. Expired entries are purged on every write.
#[derive(Default)]
pub(crate) struct InMemoryAnalysisCache {
    entries: Mutex<HashMap<String, (Instant, ProductReport)>>,
}

impl InMemoryAnalysisCache {
    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl AnalysisCache for InMemoryAnalysisCache {
    fn get(&self, key: &str) -> Option<ProductReport> {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.get(key) {
            Some((expires_at, report)) if *expires_at > Instant::now() => Some(report.clone()),
            Some(_) => {
                guard.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: String, report: ProductReport, ttl: Duration) {
        let now = Instant::now();
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.retain(|_, (expires_at, _)| *expires_at > now);
        guard.insert(key, (now + ttl, report));
    }
}

/// Restriction tables, constants and the optional model, as configured.
pub(crate) fn build_engine(settings: &EngineSettings) -> Result<CompatibilityEngine, AppError> {
    let restrictions = match &settings.restrictions_path {
        Some(path) => RestrictionCatalog::from_path(path)?,
        None => RestrictionCatalog::builtin()?,
    };
    let mut config = match &settings.scoring_path {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    if let Some(timeout) = settings.strategy_timeout {
        config.retrieval.strategy_timeout_ms =
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    }

    let model = match &settings.model_dir {
        Some(dir) => LearnedScoreEstimator::load_model(&FileModelRepository::new(dir)),
        None => LearnedScoreEstimator::load_model(&NoModel),
    };

    info!(
        allergens = restrictions.allergens().len(),
        conditions = restrictions.medical_conditions().len(),
        preferences = restrictions.dietary_preferences().len(),
        version = restrictions.version(),
        model = model.is_some(),
        "compatibility engine configured"
    );
    Ok(CompatibilityEngine::new(Arc::new(restrictions), config, model))
}

pub(crate) fn load_catalog(settings: &EngineSettings) -> Result<InMemoryCatalog, AppError> {
    match &settings.catalog_csv {
        Some(path) => Ok(CsvCatalogImporter::load_catalog(path)?),
        None => Ok(InMemoryCatalog::new()),
    }
}

pub(crate) fn build_service(
    settings: &EngineSettings,
    profiles: InMemoryProfileStore,
) -> Result<AppService, AppError> {
    let engine = Arc::new(build_engine(settings)?);
    let catalog = Arc::new(load_catalog(settings)?);
    let cache: Arc<dyn AnalysisCache> = Arc::new(InMemoryAnalysisCache::default());

    Ok(
        CompatibilityService::new(engine, catalog, Arc::new(profiles))
            .with_cache(cache, settings.cache_ttl),
    )
}
