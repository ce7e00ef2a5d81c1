//! In-memory catalog, optionally loaded from a JSON export of the store.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, instrument};

use crate::catalog::CatalogGateway;
use crate::error::{BudgetError, BudgetResult};
use crate::models::{CatalogDocument, CatalogEntry};

/// JSON files may hold one document or an array of them
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum DocumentFile {
    Many(Vec<CatalogDocument>),
    One(CatalogDocument),
}

/// Catalog held in memory, in insertion order
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entries: Vec<CatalogEntry>,
}

impl InMemoryCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Build from raw documents, applying the boundary defaults
    pub fn from_documents(documents: impl IntoIterator<Item = CatalogDocument>) -> Self {
        Self::new(
            documents
                .into_iter()
                .filter_map(CatalogDocument::into_entry)
                .collect(),
        )
    }

    /// Parse a JSON document or array of documents
    pub fn from_json_str(json: &str) -> BudgetResult<Self> {
        let file: DocumentFile = serde_json::from_str(json)
            .map_err(|e| BudgetError::CatalogUnavailable(format!("invalid catalog JSON: {e}")))?;

        Ok(match file {
            DocumentFile::Many(documents) => Self::from_documents(documents),
            DocumentFile::One(document) => Self::from_documents([document]),
        })
    }

    /// Load a catalog export from disk
    #[instrument]
    pub async fn from_json_file(path: &Path) -> BudgetResult<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            BudgetError::CatalogUnavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        let catalog = Self::from_json_str(&raw)?;
        info!(entries = catalog.len(), "Loaded catalog file");
        Ok(catalog)
    }

    /// Append another catalog's entries after this one's
    pub fn merge(&mut self, other: InMemoryCatalog) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CatalogGateway for InMemoryCatalog {
    async fn list_providers(&self) -> BudgetResult<BTreeSet<String>> {
        Ok(self
            .entries
            .iter()
            .map(|e| e.provider.clone())
            .filter(|provider| !provider.trim().is_empty())
            .collect())
    }

    async fn list_categories(&self, provider: &str) -> BudgetResult<BTreeSet<String>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.provider == provider)
            .map(|e| e.service_type.clone())
            .filter(|category| !category.trim().is_empty())
            .collect())
    }

    async fn list_resources(
        &self,
        provider: &str,
        category: &str,
    ) -> BudgetResult<Vec<CatalogEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.provider == provider && e.service_type == category)
            .cloned()
            .collect())
    }
}
