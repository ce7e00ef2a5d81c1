use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

use crate::pricing::DEFAULT_HOURS_PER_MONTH;

/// Placeholder used for absent free-text fields
pub const NOT_AVAILABLE: &str = "N/A";

/// Metering basis of a catalog price
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum BillingUnit {
    /// Priced per hour of use; monthly cost scales with hours per month
    Hour,
    /// Priced per discrete unit per month
    #[default]
    Unit,
}

impl BillingUnit {
    /// Interpret a raw unit label from the store. Anything other than
    /// `Hour` (any case) bills per unit.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(raw) if raw.trim().eq_ignore_ascii_case("hour") => BillingUnit::Hour,
            _ => BillingUnit::Unit,
        }
    }
}

/// A priced, named cloud resource offering. Owned by the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub provider: String,
    pub service_type: String,
    /// Unique within provider + service type
    pub name: String,
    pub specs: String,
    /// Non-negative USD price per billing unit
    pub unit_price: Decimal,
    pub billing_unit: BillingUnit,
}

/// Price as stored: the seed data mixes JSON numbers and numeric strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceValue {
    Number(f64),
    Text(String),
}

impl PriceValue {
    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            PriceValue::Number(n) => Decimal::from_f64(*n),
            PriceValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Nested pricing block of a catalog document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingDocument {
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub value_usd: Option<PriceValue>,
}

/// Raw catalog document as held by the document store.
///
/// Every field is optional; [`CatalogDocument::into_entry`] applies the
/// defaults so nothing downstream checks for field presence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub specs: Option<String>,
    #[serde(default)]
    pub pricing: Option<PricingDocument>,
}

impl CatalogDocument {
    /// Convert into a [`CatalogEntry`], or `None` when the document cannot be
    /// offered: no name, or a negative price.
    pub fn into_entry(self) -> Option<CatalogEntry> {
        let name = self.name.filter(|n| !n.trim().is_empty())?;
        let pricing = self.pricing.unwrap_or_default();

        let unit_price = match pricing.value_usd.as_ref() {
            Some(value) => value.to_decimal().unwrap_or(Decimal::ZERO),
            None => Decimal::ZERO,
        };
        if unit_price < Decimal::ZERO {
            tracing::warn!(resource = %name, price = %unit_price, "Skipping catalog entry with negative price");
            return None;
        }

        Some(CatalogEntry {
            provider: self.provider.unwrap_or_default(),
            service_type: self.service_type.unwrap_or_default(),
            name,
            specs: self
                .specs
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            unit_price,
            billing_unit: BillingUnit::from_label(pricing.unit.as_deref()),
        })
    }
}

/// One priced, quantified selection of a catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub provider: String,
    pub service_type: String,
    pub resource_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub billing_unit: BillingUnit,
    pub hours_per_month: u32,
    /// `unit_price * quantity * duration multiplier`, unrounded
    pub total_usd: Decimal,
    pub justification: String,
}

/// A request to add a catalog entry to the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub provider: String,
    pub service_type: String,
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default = "default_hours")]
    pub hours_per_month: i64,
    #[serde(default)]
    pub justification: Option<String>,
}

fn default_quantity() -> i64 {
    1
}

fn default_hours() -> i64 {
    i64::from(DEFAULT_HOURS_PER_MONTH)
}

/// Derived monthly budget for a cart at a given exchange rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub total_usd: Decimal,
    pub exchange_rate: Decimal,
    pub total_local: Decimal,
    pub total_local_safe: Decimal,
    pub safety_margin_factor: Decimal,
}

impl Budget {
    /// Margin as a whole percentage, e.g. `10` for a factor of `1.10`
    pub fn safety_margin_percent(&self) -> Decimal {
        ((self.safety_margin_factor - Decimal::ONE) * Decimal::ONE_HUNDRED).normalize()
    }
}

/// Grouping dimension for cart totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Dimension {
    #[strum(serialize = "provider")]
    Provider,
    #[strum(serialize = "service_type")]
    ServiceType,
}

/// Sum of line totals per distinct value of a [`Dimension`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupedTotals(BTreeMap<String, Decimal>);

impl GroupedTotals {
    pub(crate) fn add(&mut self, key: &str, amount: Decimal) {
        *self.0.entry(key.to_string()).or_insert(Decimal::ZERO) += amount;
    }

    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Sum across all groups
    pub fn total(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    /// Groups by descending total, ties broken alphabetically
    pub fn sorted_by_total(&self) -> Vec<(String, Decimal)> {
        let mut groups: Vec<(String, Decimal)> =
            self.0.iter().map(|(k, v)| (k.clone(), *v)).collect();
        groups.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn document(json: serde_json::Value) -> CatalogDocument {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_full_document_converts() {
        let entry = document(serde_json::json!({
            "provider": "AWS",
            "service_type": "Compute",
            "name": "t3.medium",
            "specs": "2 vCPU, 4 GiB",
            "pricing": { "unit": "Hour", "value_usd": 0.0416 }
        }))
        .into_entry()
        .unwrap();

        assert_eq!(entry.provider, "AWS");
        assert_eq!(entry.unit_price, dec!(0.0416));
        assert_eq!(entry.billing_unit, BillingUnit::Hour);
        assert_eq!(entry.specs, "2 vCPU, 4 GiB");
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let entry = document(serde_json::json!({
            "provider": "GCP",
            "service_type": "Storage",
            "name": "Standard bucket"
        }))
        .into_entry()
        .unwrap();

        assert_eq!(entry.specs, NOT_AVAILABLE);
        assert_eq!(entry.unit_price, Decimal::ZERO);
        assert_eq!(entry.billing_unit, BillingUnit::Unit);
    }

    #[test]
    fn test_price_as_string_is_parsed() {
        let entry = document(serde_json::json!({
            "name": "Blob",
            "pricing": { "unit": "GB", "value_usd": "0.0184" }
        }))
        .into_entry()
        .unwrap();

        assert_eq!(entry.unit_price, dec!(0.0184));
        assert_eq!(entry.billing_unit, BillingUnit::Unit);
    }

    #[test]
    fn test_document_without_name_is_skipped() {
        let doc = document(serde_json::json!({ "provider": "AWS", "name": "  " }));
        assert!(doc.into_entry().is_none());
    }

    #[test]
    fn test_negative_price_is_skipped() {
        let doc = document(serde_json::json!({
            "name": "broken",
            "pricing": { "value_usd": -1.0 }
        }));
        assert!(doc.into_entry().is_none());
    }

    #[test]
    fn test_billing_unit_label_is_case_insensitive() {
        assert_eq!(BillingUnit::from_label(Some("hour")), BillingUnit::Hour);
        assert_eq!(BillingUnit::from_label(Some(" HOUR ")), BillingUnit::Hour);
        assert_eq!(BillingUnit::from_label(Some("Month")), BillingUnit::Unit);
        assert_eq!(BillingUnit::from_label(None), BillingUnit::Unit);
    }

    #[test]
    fn test_selection_defaults() {
        let selection: Selection = serde_json::from_value(serde_json::json!({
            "provider": "AWS",
            "service_type": "Compute",
            "name": "t3.micro"
        }))
        .unwrap();

        assert_eq!(selection.quantity, 1);
        assert_eq!(selection.hours_per_month, 730);
        assert!(selection.justification.is_none());
    }

    #[test]
    fn test_grouped_totals_sorting() {
        let mut totals = GroupedTotals::default();
        totals.add("GCP", dec!(5));
        totals.add("AWS", dec!(10));
        totals.add("Azure", dec!(10));
        totals.add("AWS", dec!(20));

        assert_eq!(totals.len(), 3);
        assert_eq!(totals.get("AWS"), Some(dec!(30)));
        assert_eq!(totals.total(), dec!(45));
        assert_eq!(
            totals.sorted_by_total(),
            vec![
                ("AWS".to_string(), dec!(30)),
                ("Azure".to_string(), dec!(10)),
                ("GCP".to_string(), dec!(5)),
            ]
        );
    }

    #[test]
    fn test_safety_margin_percent() {
        let budget = Budget {
            total_usd: Decimal::ZERO,
            exchange_rate: Decimal::ONE,
            total_local: Decimal::ZERO,
            total_local_safe: Decimal::ZERO,
            safety_margin_factor: dec!(1.10),
        };
        assert_eq!(budget.safety_margin_percent().to_string(), "10");
    }
}
