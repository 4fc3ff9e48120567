//! Custom Askama template filters.

use std::fmt::Display;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Format a price for display, e.g. `$3.50`.
#[askama::filter_fn]
pub fn usd(value: &Decimal, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format!("${value:.2}"))
}

/// Format a date compactly, e.g. `Jan 1`.
#[askama::filter_fn]
pub fn short_date(value: &NaiveDate, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(value.format("%b %-d").to_string())
}

/// Pick the icon shown next to a deal's product category.
#[askama::filter_fn]
pub fn category_icon(value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(match value.to_string().to_lowercase().as_str() {
        "produce" => "🥬",
        "protein" => "🥩",
        "dairy" => "🥛",
        "household" => "🏠",
        "bakery" => "🍞",
        "frozen" => "❄️",
        "beverages" => "🥤",
        "snacks" => "🍿",
        _ => "🛒",
    })
}

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}
