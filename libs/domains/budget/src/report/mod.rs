//! Fixed-layout PDF report: header banner, executive summary, itemised
//! table, methodology footnote and page footers.
//!
//! Rendering is pure. The generation timestamp is part of [`ReportOptions`],
//! so the same cart, budget and options always produce the same bytes.

mod fonts;
pub mod layout;
mod pdf;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::error::BudgetResult;
use crate::models::{Budget, CartLine};

pub use layout::{DrawOp, Page, ReportLayout};

/// Resource names longer than this are cut and end in `...`
pub const RESOURCE_LABEL_MAX: usize = 35;

pub(crate) const FOOTNOTE: &str = "Note: figures shown are estimates based on providers' public price lists. \
Taxes (e.g. IOF, ICMS) and data transfer costs (Data Transfer Out) may change the final amount.";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub title: String,
    /// Shown in every page footer next to the page number
    pub brand: String,
    pub currency_code: String,
    pub currency_symbol: String,
    pub generated_at: NaiveDateTime,
    /// Print the safety-margin budget under the summary boxes
    pub show_safe_budget: bool,
}

impl ReportOptions {
    pub fn new(generated_at: NaiveDateTime) -> Self {
        Self {
            title: "Cloud Cost Estimate".to_string(),
            brand: "Cloud Budget Master".to_string(),
            currency_code: "BRL".to_string(),
            currency_symbol: "R$".to_string(),
            generated_at,
            show_safe_budget: true,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn with_currency(mut self, code: impl Into<String>, symbol: impl Into<String>) -> Self {
        self.currency_code = code.into();
        self.currency_symbol = symbol.into();
        self
    }

    pub fn with_safe_budget(mut self, show: bool) -> Self {
        self.show_safe_budget = show;
        self
    }
}

pub struct ReportRenderer {
    options: ReportOptions,
}

impl ReportRenderer {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Page-by-page drawing instructions, before PDF encoding
    pub fn layout(&self, lines: &[CartLine], budget: &Budget) -> ReportLayout {
        layout::compose(lines, budget, &self.options)
    }

    /// Render the report as PDF bytes
    #[instrument(skip_all, fields(lines = lines.len()))]
    pub fn render(&self, lines: &[CartLine], budget: &Budget) -> BudgetResult<Vec<u8>> {
        let layout = self.layout(lines, budget);
        let bytes = pdf::encode(&layout, &self.options.title)?;
        debug!(pages = layout.page_count(), bytes = bytes.len(), "Rendered report");
        Ok(bytes)
    }
}

/// How the estimate was computed, in display order
pub fn methodology_notes(hours_per_month: u32, safety_margin_percent: Decimal) -> Vec<String> {
    vec![
        "1. Base price: public on-demand unit prices in USD from the pricing catalog.".to_string(),
        format!(
            "2. Monthly conversion: hourly resources are multiplied by {hours_per_month} hours per month; \
             per-unit resources are charged once per unit."
        ),
        "3. Exchange: the USD total is converted at the current commercial rate, \
         or a fixed fallback rate when the quote service is unreachable."
            .to_string(),
        format!(
            "4. Safety margin: {}% is added on top of the converted total to absorb \
             exchange and tax variation.",
            safety_margin_percent.normalize()
        ),
    ]
}
