use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::compatibility::domain::{ProductCode, ProductRecord};
use crate::compatibility::repository::{CatalogError, Page, ProductCatalog, SearchFilters};

/// Process-local catalog keyed by product code.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<BTreeMap<ProductCode, ProductRecord>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_products(products: impl IntoIterator<Item = ProductRecord>) -> Self {
        let catalog = Self::new();
        for product in products {
            catalog.insert(product);
        }
        catalog
    }

    /// Replaces any product with the same code.
    pub fn insert(&self, product: ProductRecord) {
        self.products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product.code.clone(), product);
    }

    pub fn len(&self) -> usize {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProductCatalog for InMemoryCatalog {
    async fn fetch(&self, code: &ProductCode) -> Result<Option<ProductRecord>, CatalogError> {
        Ok(self
            .products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code)
            .cloned())
    }

    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        page: Page,
    ) -> Result<Vec<ProductRecord>, CatalogError> {
        if page.limit == 0 {
            return Err(CatalogError::InvalidQuery("page limit must be positive".to_string()));
        }

        let needle = query.trim().to_lowercase();
        let products = self.products.read().unwrap_or_else(PoisonError::into_inner);
        Ok(products
            .values()
            .filter(|product| needle.is_empty() || product.name.to_lowercase().contains(&needle))
            .filter(|product| filters.matches(product))
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect())
    }
}
