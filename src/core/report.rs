//! Plain-text report formatting.
//!
//! This module turns summaries, stats and transactions into strings for logs and
//! notifications. Nothing here computes money; it only formats numbers produced elsewhere.

use crate::{
    config::{catalog::CardCatalog, settings::DateFormat},
    core::{analytics::DashboardStats, summary::CashbackSummary},
    entities::transaction,
};
use chrono::NaiveDate;
use std::fmt::Write;

const USAGE_BAR_WIDTH: usize = 10;

/// Renders how much of a cap or budget is used, e.g. `[▓▓▓▓▓▓····] 60%`.
///
/// Usage at or past `warning_threshold` gets a trailing `!`; from 100% on the bar reads
/// `limit reached`. The bar saturates but the printed percentage is the real one.
#[must_use]
pub fn format_usage_bar(percentage: f64, warning_threshold: f64) -> String {
    let shown = percentage.clamp(0.0, 100.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((shown / 100.0) * USAGE_BAR_WIDTH as f64).round() as usize;

    let mut bar = format!(
        "[{}{}] {percentage:.0}%",
        "▓".repeat(filled),
        "·".repeat(USAGE_BAR_WIDTH.saturating_sub(filled))
    );
    if percentage >= 100.0 {
        bar.push_str(" limit reached");
    } else if percentage >= warning_threshold {
        bar.push_str(" !");
    }
    bar
}

/// Formats an amount with the currency symbol and 2 decimals, e.g. `₹1250.00`.
#[must_use]
pub fn format_currency(amount: f64, currency: &str) -> String {
    if amount < 0.0 {
        format!("-{currency}{:.2}", amount.abs())
    } else {
        format!("{currency}{amount:.2}")
    }
}

/// Formats a date in the user's preferred layout.
#[must_use]
pub fn format_date(date: NaiveDate, format: DateFormat) -> String {
    date.format(format.pattern()).to_string()
}

/// One-line description of a transaction.
#[must_use]
pub fn format_transaction_summary(
    transaction: &transaction::Model,
    currency: &str,
    date_format: DateFormat,
) -> String {
    let mut line = format!(
        "{} | {}/{} | {} -> {} cashback",
        format_date(transaction.date, date_format),
        transaction.card_id,
        transaction.category_id,
        format_currency(transaction.amount, currency),
        format_currency(transaction.cashback_earned, currency),
    );
    if let Some(merchant) = &transaction.merchant {
        let _ = write!(line, " | {merchant}");
    }
    line
}

/// Multi-line card summary with one line per category.
///
/// Capped categories show a usage bar flagged at `warning_threshold`; uncapped ones are
/// marked as such.
#[must_use]
pub fn format_summary(
    summary: &CashbackSummary,
    catalog: &CardCatalog,
    currency: &str,
    warning_threshold: f64,
) -> String {
    let card_name = catalog
        .get_card_config(&summary.card_id)
        .map_or(summary.card_id.as_str(), |card| card.name.as_str());

    let mut out = format!(
        "{card_name} ({} - {})\n  Spent {} | Cashback {}\n",
        summary.cycle_start.format("%d %b %Y"),
        summary.cycle_end.format("%d %b %Y"),
        format_currency(summary.total_spent, currency),
        format_currency(summary.total_cashback, currency),
    );

    for entry in &summary.category_breakdown {
        let cap = match (entry.cap_limit, entry.cap_remaining) {
            (Some(limit), Some(remaining)) => format!(
                "{} of {} left {}",
                format_currency(remaining, currency),
                format_currency(limit, currency),
                format_usage_bar(entry.cap_utilization, warning_threshold)
            ),
            _ => "no cap".to_string(),
        };
        // write! into a String cannot fail
        let _ = writeln!(
            out,
            "  {}: {} spent, {} earned ({} txns) | {}",
            entry.category_name,
            format_currency(entry.spent, currency),
            format_currency(entry.cashback_earned, currency),
            entry.transaction_count,
            cap
        );
    }

    out
}

/// Short dashboard line for logs.
#[must_use]
pub fn format_dashboard_stats(stats: &DashboardStats, currency: &str) -> String {
    format!(
        "{} earned on {} spent across {} transactions (avg {}), top category {}, cycle {:.0}% elapsed",
        format_currency(stats.total_cashback, currency),
        format_currency(stats.total_spent, currency),
        stats.transaction_count,
        format_currency(stats.average_cashback, currency),
        stats.top_category,
        stats.cycle_progress
    )
}
