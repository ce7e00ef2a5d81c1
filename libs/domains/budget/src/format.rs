//! Display formatting shared by the report and the CLI.
//!
//! Rounding is half-up: two decimals for currency, four for unit prices.

use rust_decimal::{Decimal, RoundingStrategy};

/// Marker appended to truncated labels
pub const ELLIPSIS: &str = "...";

pub fn round_currency(value: Decimal) -> Decimal {
    round_half_up(value, 2)
}

pub fn round_unit_price(value: Decimal) -> Decimal {
    round_half_up(value, 4)
}

fn round_half_up(value: Decimal, places: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(places);
    rounded
}

/// `1234567.891` -> `1,234,567.89`
pub fn format_amount(value: Decimal) -> String {
    group_thousands(&round_currency(value).to_string())
}

/// Unit price with four decimals, e.g. `0.0520`
pub fn format_unit_price(value: Decimal) -> String {
    round_unit_price(value).to_string()
}

/// Exchange rate with four decimals
pub fn format_rate(value: Decimal) -> String {
    round_unit_price(value).to_string()
}

/// Currency amount prefixed by its symbol: `R$ 1,234.50`
pub fn format_money(symbol: &str, value: Decimal) -> String {
    format!("{symbol} {}", format_amount(value))
}

fn group_thousands(plain: &str) -> String {
    let (sign, digits) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain),
    };
    let (integer, fraction) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Cut `label` to at most `max_chars` characters, ending in `...` when cut
pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = label.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}
