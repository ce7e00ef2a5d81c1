//! MongoDB implementation of CatalogGateway

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or};
use futures_util::TryStreamExt;
use mongodb::{
    Client, Collection,
    bson::{self, Bson, Document, doc},
    options::ClientOptions,
};
use std::collections::BTreeSet;
use std::future::IntoFuture;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::catalog::CatalogGateway;
use crate::error::{BudgetError, BudgetResult};
use crate::models::{CatalogDocument, CatalogEntry};

/// Connection settings for the pricing catalog store
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    /// Format: mongodb://[username:password@]host[:port][/database][?options]
    pub uri: String,
    pub database: String,
    pub collection: String,
    /// Bounds server selection, connection and every query
    pub timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017/".to_string(),
            database: "cloud_pricing".to_string(),
            collection: "pricing_catalog".to_string(),
            timeout: Duration::from_millis(3000),
        }
    }
}

impl FromEnv for CatalogConfig {
    /// Reads MONGO_URI, DB_NAME, COLLECTION_NAME and CATALOG_TIMEOUT_MS
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            uri: env_or_default("MONGO_URI", &defaults.uri),
            database: env_or_default("DB_NAME", &defaults.database),
            collection: env_or_default("COLLECTION_NAME", &defaults.collection),
            timeout: Duration::from_millis(env_parse_or("CATALOG_TIMEOUT_MS", 3000u64)?),
        })
    }
}

/// Catalog backed by a MongoDB collection of [`CatalogDocument`]s.
///
/// Documents are fetched raw and decoded one at a time, so a single
/// malformed document is skipped instead of failing the whole query.
pub struct MongoCatalogGateway {
    collection: Collection<Document>,
    timeout: Duration,
}

impl MongoCatalogGateway {
    /// Connect and ping the server. Any failure is `CatalogUnavailable`;
    /// there is no retry.
    #[instrument(skip(config), fields(database = %config.database, collection = %config.collection))]
    pub async fn connect(config: &CatalogConfig) -> BudgetResult<Self> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.connect_timeout = Some(config.timeout);
        options.server_selection_timeout = Some(config.timeout);
        options.app_name = Some("budget-planner".to_string());

        let client = Client::with_options(options)?;
        let database = client.database(&config.database);

        bounded(config.timeout, database.run_command(doc! { "ping": 1 })).await?;
        info!("Connected to pricing catalog");

        Ok(Self {
            collection: database.collection::<Document>(&config.collection),
            timeout: config.timeout,
        })
    }

    fn resources_filter(provider: &str, category: &str) -> Document {
        doc! { "provider": provider, "service_type": category }
    }

    async fn distinct(&self, field: &str, filter: Document) -> BudgetResult<BTreeSet<String>> {
        let values = bounded(self.timeout, self.collection.distinct(field, filter)).await?;
        Ok(distinct_strings(values))
    }
}

/// Keep the non-empty string values of a `distinct` result
fn distinct_strings(values: Vec<Bson>) -> BTreeSet<String> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Bson::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        })
        .collect()
}

/// Decode one stored document; malformed ones are logged and dropped
fn document_to_entry(document: Document) -> Option<CatalogEntry> {
    let id = document.get("_id").map(Bson::to_string).unwrap_or_default();
    match bson::from_document::<CatalogDocument>(document) {
        Ok(parsed) => parsed.into_entry(),
        Err(e) => {
            warn!(%id, error = %e, "Skipping malformed catalog document");
            None
        }
    }
}

/// Run a driver call under `timeout`
async fn bounded<T, F>(timeout: Duration, operation: F) -> BudgetResult<T>
where
    F: IntoFuture<Output = mongodb::error::Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result.map_err(BudgetError::from),
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Catalog query timed out");
            Err(BudgetError::CatalogUnavailable(format!(
                "catalog did not answer within {} ms",
                timeout.as_millis()
            )))
        }
    }
}

#[async_trait]
impl CatalogGateway for MongoCatalogGateway {
    #[instrument(skip(self))]
    async fn list_providers(&self) -> BudgetResult<BTreeSet<String>> {
        self.distinct("provider", doc! {}).await
    }

    #[instrument(skip(self))]
    async fn list_categories(&self, provider: &str) -> BudgetResult<BTreeSet<String>> {
        self.distinct("service_type", doc! { "provider": provider })
            .await
    }

    #[instrument(skip(self))]
    async fn list_resources(
        &self,
        provider: &str,
        category: &str,
    ) -> BudgetResult<Vec<CatalogEntry>> {
        let query = async {
            let cursor = self
                .collection
                .find(Self::resources_filter(provider, category))
                .sort(doc! { "_id": 1 })
                .await?;
            cursor.try_collect::<Vec<Document>>().await
        };
        let documents = bounded(self.timeout, query).await?;

        Ok(documents.into_iter().filter_map(document_to_entry).collect())
    }
}
