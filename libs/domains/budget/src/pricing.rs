//! Turns a catalog entry plus quantity and duration into a priced cart line.

use rust_decimal::Decimal;

use crate::error::{BudgetError, BudgetResult};
use crate::models::{BillingUnit, CartLine, CatalogEntry, NOT_AVAILABLE};

/// Hours in an average month of continuous use (24 x 365 / 12)
pub const DEFAULT_HOURS_PER_MONTH: u32 = 730;

/// Stateless pricing rules
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingCalculator;

impl PricingCalculator {
    /// Factor applied to `unit_price * quantity`
    pub fn duration_multiplier(billing_unit: BillingUnit, hours_per_month: u32) -> Decimal {
        match billing_unit {
            BillingUnit::Hour => Decimal::from(hours_per_month),
            BillingUnit::Unit => Decimal::ONE,
        }
    }

    /// Price one selection of `entry`.
    ///
    /// Fails with [`BudgetError::InvalidLineInput`] when `quantity` or
    /// `hours_per_month` is below 1, or when the line total does not fit in a
    /// `Decimal`. A zero unit price is valid and yields a
    /// zero total. An empty justification becomes `"N/A"`.
    pub fn price(
        entry: &CatalogEntry,
        quantity: i64,
        hours_per_month: i64,
        justification: &str,
    ) -> BudgetResult<CartLine> {
        let quantity = validate_positive("quantity", quantity)?;
        let hours_per_month = validate_positive("hours_per_month", hours_per_month)?;

        let total_usd = entry
            .unit_price
            .checked_mul(Decimal::from(quantity))
            .and_then(|subtotal| {
                subtotal.checked_mul(Self::duration_multiplier(entry.billing_unit, hours_per_month))
            })
            .ok_or_else(|| {
                BudgetError::InvalidLineInput(format!(
                    "line total for {} x {quantity} is out of range",
                    entry.name
                ))
            })?;

        let justification = justification.trim();

        Ok(CartLine {
            provider: entry.provider.clone(),
            service_type: entry.service_type.clone(),
            resource_name: entry.name.clone(),
            quantity,
            unit_price: entry.unit_price,
            billing_unit: entry.billing_unit,
            hours_per_month,
            total_usd,
            justification: if justification.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                justification.to_string()
            },
        })
    }
}

fn validate_positive(field: &str, value: i64) -> BudgetResult<u32> {
    if value < 1 {
        return Err(BudgetError::InvalidLineInput(format!(
            "{field} must be at least 1, got {value}"
        )));
    }
    u32::try_from(value)
        .map_err(|_| BudgetError::InvalidLineInput(format!("{field} is too large: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(unit_price: Decimal, billing_unit: BillingUnit) -> CatalogEntry {
        CatalogEntry {
            provider: "AWS".to_string(),
            service_type: "Compute".to_string(),
            name: "t3.small".to_string(),
            specs: "2 vCPU, 2 GiB".to_string(),
            unit_price,
            billing_unit,
        }
    }

    #[test]
    fn test_hourly_entry_scales_with_hours() {
        let line = PricingCalculator::price(&entry(dec!(0.0520), BillingUnit::Hour), 2, 730, "")
            .unwrap();

        assert_eq!(line.total_usd, dec!(75.92));
        assert_eq!(line.quantity, 2);
        assert_eq!(line.hours_per_month, 730);
        assert_eq!(line.unit_price, dec!(0.0520));
    }

    #[test]
    fn test_unit_entry_ignores_hours() {
        let priced = entry(dec!(12.50), BillingUnit::Unit);
        for hours in [1, 100, 730, 744] {
            let line = PricingCalculator::price(&priced, 3, hours, "backups").unwrap();
            assert_eq!(line.total_usd, dec!(37.50));
        }
    }

    #[test]
    fn test_hourly_property_over_small_grid() {
        let price = dec!(0.0123);
        let priced = entry(price, BillingUnit::Hour);
        for quantity in 1..=5 {
            for hours in [1, 24, 730] {
                let line = PricingCalculator::price(&priced, quantity, hours, "").unwrap();
                assert_eq!(line.total_usd, price * Decimal::from(quantity) * Decimal::from(hours));
            }
        }
    }

    #[test]
    fn test_zero_price_is_valid() {
        let line =
            PricingCalculator::price(&entry(Decimal::ZERO, BillingUnit::Hour), 4, 730, "free tier")
                .unwrap();
        assert_eq!(line.total_usd, Decimal::ZERO);
    }

    #[test]
    fn test_empty_justification_defaults() {
        let line =
            PricingCalculator::price(&entry(dec!(1), BillingUnit::Unit), 1, 730, "   ").unwrap();
        assert_eq!(line.justification, NOT_AVAILABLE);

        let line = PricingCalculator::price(&entry(dec!(1), BillingUnit::Unit), 1, 730, " DB ")
            .unwrap();
        assert_eq!(line.justification, "DB");
    }

    #[test]
    fn test_rejects_out_of_range_input() {
        let priced = entry(dec!(1), BillingUnit::Hour);

        let err = PricingCalculator::price(&priced, 0, 730, "").unwrap_err();
        assert!(matches!(err, BudgetError::InvalidLineInput(ref msg) if msg.contains("quantity")));

        let err = PricingCalculator::price(&priced, 1, 0, "").unwrap_err();
        assert!(matches!(err, BudgetError::InvalidLineInput(ref msg) if msg.contains("hours")));

        let err = PricingCalculator::price(&priced, -3, 730, "").unwrap_err();
        assert!(matches!(err, BudgetError::InvalidLineInput(_)));
    }

    #[test]
    fn test_overflowing_total_is_rejected() {
        let priced = entry(dec!(10000000000000000000), BillingUnit::Hour);

        let err = PricingCalculator::price(&priced, 4_000_000_000, 730, "").unwrap_err();
        assert!(matches!(err, BudgetError::InvalidLineInput(ref msg) if msg.contains("out of range")));

        let err = PricingCalculator::price(&entry(Decimal::MAX, BillingUnit::Unit), 2, 730, "")
            .unwrap_err();
        assert!(matches!(err, BudgetError::InvalidLineInput(_)));
    }
}
