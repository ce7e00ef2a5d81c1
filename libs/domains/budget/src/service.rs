//! Budget session - wires catalog, pricing, cart, rates and report together

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::cart::CartAggregator;
use crate::catalog::CatalogGateway;
use crate::error::{BudgetError, BudgetResult};
use crate::models::{Budget, CartLine, CatalogEntry, Dimension, GroupedTotals, Selection};
use crate::pricing::PricingCalculator;
use crate::rates::{RateOrigin, RateProvider};
use crate::report::{ReportOptions, ReportRenderer};

/// Aggregates handed to a presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub total_usd: Decimal,
    pub exchange_rate: Decimal,
    pub rate_origin: RateOrigin,
    pub total_local: Decimal,
    pub total_local_safe: Decimal,
    /// Margin applied to reach `total_local_safe`, e.g. `10`
    pub safety_margin_percent: Decimal,
    pub by_provider: GroupedTotals,
    pub by_service_type: GroupedTotals,
    pub line_count: usize,
}

/// One budgeting session: owns its cart, shares the rate provider.
///
/// Every mutating operation is all-or-nothing; a failed `add_item`
/// leaves the cart untouched.
pub struct BudgetSession<G: CatalogGateway> {
    catalog: G,
    rates: Arc<RateProvider>,
    cart: CartAggregator,
}

impl<G: CatalogGateway> BudgetSession<G> {
    pub fn new(catalog: G, rates: Arc<RateProvider>) -> Self {
        Self {
            catalog,
            rates,
            cart: CartAggregator::new(),
        }
    }

    pub async fn providers(&self) -> BudgetResult<BTreeSet<String>> {
        self.catalog.list_providers().await
    }

    pub async fn categories(&self, provider: &str) -> BudgetResult<BTreeSet<String>> {
        self.catalog.list_categories(provider).await
    }

    pub async fn resources(&self, provider: &str, category: &str) -> BudgetResult<Vec<CatalogEntry>> {
        self.catalog.list_resources(provider, category).await
    }

    /// Resolve, price and append a selection
    #[instrument(skip(self, selection), fields(provider = %selection.provider, name = %selection.name))]
    pub async fn add_item(&mut self, selection: &Selection) -> BudgetResult<CartLine> {
        let entries = self
            .catalog
            .list_resources(&selection.provider, &selection.service_type)
            .await?;

        let entry = entries
            .iter()
            .find(|entry| entry.name == selection.name)
            .ok_or_else(|| BudgetError::ResourceNotFound {
                provider: selection.provider.clone(),
                service_type: selection.service_type.clone(),
                name: selection.name.clone(),
            })?;

        let line = PricingCalculator::price(
            entry,
            selection.quantity,
            selection.hours_per_month,
            selection.justification.as_deref().unwrap_or_default(),
        )?;

        self.cart.add_line(line.clone())?;
        info!(total_usd = %line.total_usd, "Added line to cart");
        Ok(line)
    }

    /// Empty the cart
    pub fn reset(&mut self) {
        self.cart.reset();
    }

    pub fn cart(&self) -> &CartAggregator {
        &self.cart
    }

    /// Budget at the current exchange rate
    pub async fn budget(&self) -> Budget {
        self.cart.budget(self.rates.get_rate().await)
    }

    /// Totals and per-dimension breakdowns at the current exchange rate
    pub async fn dashboard(&self) -> Dashboard {
        let quote = self.rates.get_quote().await;
        let budget = self.cart.budget(quote.rate);

        Dashboard {
            total_usd: budget.total_usd,
            exchange_rate: budget.exchange_rate,
            rate_origin: quote.origin,
            total_local: budget.total_local,
            total_local_safe: budget.total_local_safe,
            safety_margin_percent: budget.safety_margin_percent(),
            by_provider: self.cart.group_by(Dimension::Provider),
            by_service_type: self.cart.group_by(Dimension::ServiceType),
            line_count: self.cart.len(),
        }
    }

    /// PDF report of the current cart
    #[instrument(skip_all, fields(lines = self.cart.len()))]
    pub async fn render_report(&self, options: ReportOptions) -> BudgetResult<Vec<u8>> {
        let budget = self.budget().await;
        ReportRenderer::new(options).render(self.cart.lines(), &budget)
    }
}
