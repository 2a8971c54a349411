//! Product catalog sources: CSV export import and an in-memory [`ProductCatalog`].
//!
//! [`ProductCatalog`]: crate::compatibility::ProductCatalog

mod memory;
mod normalizer;
mod parser;

pub use memory::InMemoryCatalog;

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::compatibility::domain::ProductRecord;

#[derive(Debug, thiserror::Error)]
pub enum CatalogImportError {
    #[error("failed to read catalog export {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Reads product-catalog CSV exports (one product per row, `*_100g` nutrient columns).
pub struct CsvCatalogImporter;

impl CsvCatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<ProductRecord>, CatalogImportError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| CatalogImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let products = Self::from_reader(file)?;
        info!(path = %path.display(), products = products.len(), "catalog imported");
        Ok(products)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<ProductRecord>, CatalogImportError> {
        Ok(parser::parse_products(reader)?)
    }

    pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<InMemoryCatalog, CatalogImportError> {
        Ok(InMemoryCatalog::from_products(Self::from_path(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reports_path() {
        let error = CsvCatalogImporter::from_path("/definitely/missing/catalog.csv")
            .expect_err("missing file");
        assert!(error.to_string().contains("/definitely/missing/catalog.csv"));
    }

    #[test]
    fn malformed_csv_is_a_csv_error() {
        let csv: &[u8] = b"code,product_name\n1,\xff\xfe\n";
        let result = CsvCatalogImporter::from_reader(csv);
        assert!(matches!(result, Err(CatalogImportError::Csv(_))));
    }
}
