use crate::infra::{build_engine, InMemoryProfileStore};
use clap::Args;
use nutrilens::catalog::CsvCatalogImporter;
use nutrilens::compatibility::{
    normalize_profile, CompatibilityError, CompatibilityService, ListInput, ProductCatalog,
    ProductCode, ProductReport, RawProfileInput,
};
use nutrilens::config::AppConfig;
use nutrilens::error::AppError;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// Product catalog CSV export
    #[arg(long)]
    pub(crate) catalog: PathBuf,
    /// Code of the product to analyze
    #[arg(long)]
    pub(crate) code: String,
    /// Comma-delimited allergies, e.g. "milk,peanuts"
    #[arg(long)]
    pub(crate) allergies: Option<String>,
    /// Comma-delimited medical conditions
    #[arg(long)]
    pub(crate) conditions: Option<String>,
    /// Comma-delimited dietary preferences
    #[arg(long)]
    pub(crate) preferences: Option<String>,
    #[arg(long)]
    pub(crate) age: Option<u32>,
    #[arg(long)]
    pub(crate) bmi: Option<f64>,
    /// Maximum number of alternatives in the report
    #[arg(long, default_value_t = 5)]
    pub(crate) limit: usize,
}

impl AnalyzeArgs {
    fn profile_input(&self) -> RawProfileInput {
        let list = |value: &Option<String>| {
            value
                .clone()
                .map(ListInput::Text)
                .unwrap_or_default()
        };
        RawProfileInput {
            allergies: list(&self.allergies),
            medical_conditions: list(&self.conditions),
            dietary_preferences: list(&self.preferences),
            age: self.age,
            bmi: self.bmi,
            ..RawProfileInput::default()
        }
    }
}

pub(crate) async fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let report = build_report(&args).await?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &report).map_err(std::io::Error::from)?;
    writeln!(handle)?;
    Ok(())
}

async fn build_report(args: &AnalyzeArgs) -> Result<ProductReport, AppError> {
    let config = AppConfig::load()?;
    let engine = Arc::new(build_engine(&config.engine)?);
    let catalog = Arc::new(CsvCatalogImporter::load_catalog(&args.catalog)?);

    let code = ProductCode(args.code.trim().to_string());
    let product = catalog
        .fetch(&code)
        .await
        .map_err(|error| CompatibilityError::Transient(error.to_string()))?
        .ok_or_else(|| CompatibilityError::product_not_found(code.to_string()))?;

    let service = CompatibilityService::new(
        engine,
        catalog,
        Arc::new(InMemoryProfileStore::default()),
    );
    let profile = normalize_profile(args.profile_input());
    Ok(service.report(product, &profile, args.limit).await)
}
