//! Budget Domain
//!
//! Monthly cloud cost estimation: resolve catalog entries into priced cart
//! lines, aggregate them, convert the total to a local currency with a
//! safety margin and render a PDF report.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  BudgetSession  │  ← Orchestration, all-or-nothing cart updates
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐     ┌─────────────────┐
//! │ CatalogGateway  │     │  RateProvider   │  ← TTL cache + fallback
//! └────────┬────────┘     └────────┬────────┘
//!          │                       │
//! ┌────────▼────────┐     ┌────────▼────────┐
//! │PricingCalculator│ ──► │ CartAggregator  │  ← Totals, groups, margin
//! └─────────────────┘     └────────┬────────┘
//!                                  │
//!                         ┌────────▼────────┐
//!                         │ ReportRenderer  │  ← Fixed-layout PDF
//!                         └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_budget::{
//!     BudgetSession, InMemoryCatalog, RateProvider, Selection,
//!     rates::{AwesomeApiSource, RateConfig},
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = InMemoryCatalog::from_json_file("catalog.json".as_ref()).await?;
//! let config = RateConfig::default();
//! let rates = Arc::new(RateProvider::new(Box::new(AwesomeApiSource::new(&config)), &config));
//!
//! let mut session = BudgetSession::new(catalog, rates);
//! session
//!     .add_item(&Selection {
//!         provider: "AWS".into(),
//!         service_type: "Compute".into(),
//!         name: "t3.medium".into(),
//!         quantity: 2,
//!         hours_per_month: 730,
//!         justification: None,
//!     })
//!     .await?;
//!
//! let dashboard = session.dashboard().await;
//! println!("{} USD", dashboard.total_usd);
//! # Ok(())
//! # }
//! ```

pub mod cart;
pub mod catalog;
pub mod error;
pub mod format;
pub mod memory;
pub mod models;
pub mod mongodb;
pub mod pricing;
pub mod rates;
pub mod report;
pub mod service;

// Re-export commonly used types
pub use cart::{CartAggregator, SAFETY_MARGIN_FACTOR};
pub use catalog::CatalogGateway;
pub use error::{BudgetError, BudgetResult};
pub use memory::InMemoryCatalog;
pub use models::{
    BillingUnit, Budget, CartLine, CatalogDocument, CatalogEntry, Dimension, GroupedTotals,
    Selection,
};
pub use mongodb::{CatalogConfig, MongoCatalogGateway};
pub use pricing::{DEFAULT_HOURS_PER_MONTH, PricingCalculator};
pub use rates::{RateOrigin, RateProvider, RateQuote};
pub use report::{ReportOptions, ReportRenderer};
pub use service::{BudgetSession, Dashboard};
