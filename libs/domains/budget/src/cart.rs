//! Session cart: an append-only list of priced lines and the totals derived from it.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{BudgetError, BudgetResult};
use crate::models::{Budget, CartLine, Dimension, GroupedTotals};

/// Uplift applied to the converted total to absorb taxes and exchange variance
pub const SAFETY_MARGIN_FACTOR: Decimal = dec!(1.10);

/// Accumulates cart lines for one budgeting session.
///
/// Owned by the session; there is a single writer, so no locking.
#[derive(Debug, Clone, Default)]
pub struct CartAggregator {
    lines: Vec<CartLine>,
}

impl CartAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line. Identical lines are kept as separate entries.
    ///
    /// Rejects the line, leaving the cart unchanged, when the cart total
    /// would no longer fit in a `Decimal`.
    pub fn add_line(&mut self, line: CartLine) -> BudgetResult<()> {
        if self.total_usd().checked_add(line.total_usd).is_none() {
            return Err(BudgetError::InvalidLineInput(format!(
                "adding {} would overflow the cart total",
                line.resource_name
            )));
        }
        self.lines.push(line);
        Ok(())
    }

    /// Empty the cart
    pub fn reset(&mut self) {
        self.lines.clear();
    }

    /// Lines in insertion order
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all line totals; zero for an empty cart
    pub fn total_usd(&self) -> Decimal {
        self.lines
            .iter()
            .fold(Decimal::ZERO, |total, line| total.saturating_add(line.total_usd))
    }

    /// Monthly budget at `rate` USD -> local currency.
    ///
    /// Conversions past `Decimal::MAX` saturate instead of panicking.
    pub fn budget(&self, rate: Decimal) -> Budget {
        let total_usd = self.total_usd();
        let total_local = total_usd.saturating_mul(rate);

        Budget {
            total_usd,
            exchange_rate: rate,
            total_local,
            total_local_safe: total_local.saturating_mul(SAFETY_MARGIN_FACTOR),
            safety_margin_factor: SAFETY_MARGIN_FACTOR,
        }
    }

    /// Sum line totals per distinct value of `dimension`
    pub fn group_by(&self, dimension: Dimension) -> GroupedTotals {
        let mut totals = GroupedTotals::default();
        for line in &self.lines {
            let key = match dimension {
                Dimension::Provider => &line.provider,
                Dimension::ServiceType => &line.service_type,
            };
            totals.add(key, line.total_usd);
        }
        totals
    }
}
