//! Terminal tables for catalog listings, dashboards and cart details

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use domain_budget::format::{format_amount, format_money, format_rate, format_unit_price};
use domain_budget::{CartLine, CatalogEntry, Dashboard, GroupedTotals};
use serde::Serialize;
use std::fmt::Write;

/// Machine-readable estimate for `--format json`
#[derive(Debug, Serialize)]
pub struct EstimateJson<'a> {
    pub dashboard: &'a Dashboard,
    pub lines: &'a [CartLine],
}

/// Currency labels for local amounts
#[derive(Debug, Clone)]
pub struct Currency {
    pub code: String,
    pub symbol: String,
}

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    // Terminal width must not leak into assertions
    #[cfg(test)]
    table.force_no_tty();
    table
}

fn amount(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn resources(entries: &[CatalogEntry]) -> String {
    let mut table = table();
    table.set_header(vec!["Resource", "Specs", "Price"]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(&entry.name),
            Cell::new(&entry.specs),
            amount(format!(
                "$ {} / {}",
                format_unit_price(entry.unit_price),
                entry.billing_unit
            )),
        ]);
    }
    table.to_string()
}

fn grouped(title: &str, totals: &GroupedTotals) -> Option<String> {
    if totals.is_empty() {
        return None;
    }
    let mut table = table();
    table.set_header(vec![Cell::new(title), amount("Total (USD)".to_string())]);
    for (key, total) in totals.sorted_by_total() {
        table.add_row(vec![Cell::new(key), amount(format_money("$", total))]);
    }
    Some(table.to_string())
}

pub fn dashboard(dashboard: &Dashboard, currency: &Currency) -> String {
    let mut summary = table();
    summary.set_header(vec![
        Cell::new(format!("Monthly estimate ({} items)", dashboard.line_count)),
        Cell::new(""),
    ]);
    summary.add_row(vec![
        Cell::new("Total (USD)"),
        amount(format_money("$", dashboard.total_usd)),
    ]);
    summary.add_row(vec![
        Cell::new(format!("Total ({})", currency.code)),
        amount(format_money(&currency.symbol, dashboard.total_local)),
    ]);
    summary.add_row(vec![
        Cell::new(format!("Safe budget (+{}%)", dashboard.safety_margin_percent)),
        amount(format_money(&currency.symbol, dashboard.total_local_safe)),
    ]);
    summary.add_row(vec![
        Cell::new("Exchange rate"),
        amount(format!(
            "{} ({})",
            format_rate(dashboard.exchange_rate),
            dashboard.rate_origin
        )),
    ]);

    let mut sections = vec![summary.to_string()];
    sections.extend(grouped("By provider", &dashboard.by_provider));
    sections.extend(grouped("By service type", &dashboard.by_service_type));
    sections.join("\n")
}

pub fn details(lines: &[CartLine]) -> String {
    let mut table = table();
    table.set_header(vec![
        Cell::new("Provider"),
        Cell::new("Type"),
        Cell::new("Resource"),
        amount("Qty".to_string()),
        amount("Unit $".to_string()),
        amount("Total $".to_string()),
        Cell::new("Justification"),
    ]);
    for line in lines {
        table.add_row(vec![
            Cell::new(&line.provider),
            Cell::new(&line.service_type),
            Cell::new(&line.resource_name),
            amount(line.quantity.to_string()),
            amount(format_unit_price(line.unit_price)),
            amount(format_amount(line.total_usd)),
            Cell::new(&line.justification),
        ]);
    }
    table.to_string()
}

pub fn methodology(notes: &[String]) -> String {
    let mut out = String::from("Methodology\n");
    for note in notes {
        let _ = writeln!(out, "  {note}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_budget::{BillingUnit, CartAggregator, Dimension, RateOrigin};
    use rust_decimal_macros::dec;

    fn currency() -> Currency {
        Currency {
            code: "BRL".to_string(),
            symbol: "R$".to_string(),
        }
    }

    fn line() -> CartLine {
        CartLine {
            provider: "AWS".to_string(),
            service_type: "Compute".to_string(),
            resource_name: "t3.medium".to_string(),
            quantity: 2,
            unit_price: dec!(0.052),
            billing_unit: BillingUnit::Hour,
            hours_per_month: 730,
            total_usd: dec!(75.92),
            justification: "web tier".to_string(),
        }
    }

    #[test]
    fn test_resources_show_unit_price() {
        let entries = vec![CatalogEntry {
            provider: "AWS".to_string(),
            service_type: "Compute".to_string(),
            name: "t3.medium".to_string(),
            specs: "2 vCPU, 4 GiB".to_string(),
            unit_price: dec!(0.052),
            billing_unit: BillingUnit::Hour,
        }];

        let text = resources(&entries);
        assert!(text.contains("t3.medium"));
        assert!(text.contains("$ 0.0520 / Hour"));
    }

    #[test]
    fn test_dashboard_lists_totals_and_groups() {
        let mut cart = CartAggregator::new();
        cart.add_line(line()).unwrap();

        let dashboard_data = Dashboard {
            total_usd: dec!(75.92),
            exchange_rate: dec!(5.80),
            rate_origin: RateOrigin::Fallback,
            total_local: dec!(440.336),
            total_local_safe: dec!(484.3696),
            safety_margin_percent: dec!(10),
            by_provider: cart.group_by(Dimension::Provider),
            by_service_type: cart.group_by(Dimension::ServiceType),
            line_count: 1,
        };

        let text = dashboard(&dashboard_data, &currency());
        assert!(text.contains("$ 75.92"));
        assert!(text.contains("R$ 440.34"));
        assert!(text.contains("Safe budget (+10%)"));
        assert!(text.contains("R$ 484.37"));
        assert!(text.contains("5.8000 (fallback)"));
        assert!(text.contains("By provider"));
        assert!(text.contains("By service type"));
    }

    #[test]
    fn test_details_rounding() {
        let text = details(&[line()]);
        assert!(text.contains("0.0520"));
        assert!(text.contains("75.92"));
        assert!(text.contains("web tier"));
    }

    /// Positions of the column separators on every content line
    fn separator_columns(text: &str) -> Vec<Vec<usize>> {
        text.lines()
            .filter(|row| row.starts_with('│'))
            .map(|row| {
                row.chars()
                    .enumerate()
                    .filter(|(_, ch)| *ch == '│')
                    .map(|(index, _)| index)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_details_columns_stay_aligned_with_long_names() {
        let mut long = line();
        long.provider = "Azure".to_string();
        long.service_type = "Networking".to_string();
        long.resource_name = "Standard_D4s_v5 Linux Pay-As-You-Go East US 2".to_string();
        long.quantity = 12;
        long.total_usd = dec!(1234567.891);

        let text = details(&[line(), long]);
        assert!(text.contains("Networking"));
        assert!(text.contains("Standard_D4s_v5 Linux Pay-As-You-Go East US 2"));
        assert!(text.contains("1,234,567.89"));

        let widths: Vec<usize> = text.lines().map(|row| row.chars().count()).collect();
        assert!(widths.windows(2).all(|pair| pair[0] == pair[1]));

        let columns = separator_columns(&text);
        assert_eq!(columns.len(), 3);
        assert!(columns.iter().all(|row| row == &columns[0]));
        assert_eq!(columns[0].len(), 8);
    }

    #[test]
    fn test_money_columns_are_right_aligned() {
        let mut cheap = line();
        cheap.total_usd = dec!(1.5);
        let text = details(&[line(), cheap]);

        let row_ending = |needle: &str| {
            text.lines()
                .find(|row| row.contains(needle))
                .map(|row| row[..row.find(needle).unwrap()].chars().count() + needle.len())
                .unwrap()
        };
        assert_eq!(row_ending(" 75.92 "), row_ending(" 1.50 "));
    }

    #[test]
    fn test_json_shape() {
        let lines = vec![line()];
        let dashboard = Dashboard {
            total_usd: dec!(75.92),
            exchange_rate: dec!(5),
            rate_origin: RateOrigin::Live,
            total_local: dec!(379.6),
            total_local_safe: dec!(417.56),
            safety_margin_percent: dec!(10),
            by_provider: GroupedTotals::default(),
            by_service_type: GroupedTotals::default(),
            line_count: 1,
        };

        let value = serde_json::to_value(EstimateJson {
            dashboard: &dashboard,
            lines: &lines,
        })
        .unwrap();
        assert_eq!(value["dashboard"]["rate_origin"], "live");
        assert_eq!(value["lines"][0]["resource_name"], "t3.medium");
    }
}
