use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::error::BudgetResult;
use crate::models::CatalogEntry;

/// Read-only query interface over the resource catalog.
///
/// An empty result means "no data"; an unreachable store is
/// [`crate::BudgetError::CatalogUnavailable`]. Implementations bound every
/// call with a timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Distinct providers in the catalog
    async fn list_providers(&self) -> BudgetResult<BTreeSet<String>>;

    /// Distinct service categories offered by `provider`
    async fn list_categories(&self, provider: &str) -> BudgetResult<BTreeSet<String>>;

    /// Entries under `provider` / `category`, in store order
    async fn list_resources(
        &self,
        provider: &str,
        category: &str,
    ) -> BudgetResult<Vec<CatalogEntry>>;
}

#[async_trait]
impl<T: CatalogGateway + ?Sized> CatalogGateway for Box<T> {
    async fn list_providers(&self) -> BudgetResult<BTreeSet<String>> {
        (**self).list_providers().await
    }

    async fn list_categories(&self, provider: &str) -> BudgetResult<BTreeSet<String>> {
        (**self).list_categories(provider).await
    }

    async fn list_resources(
        &self,
        provider: &str,
        category: &str,
    ) -> BudgetResult<Vec<CatalogEntry>> {
        (**self).list_resources(provider, category).await
    }
}
