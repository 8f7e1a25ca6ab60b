//! Per-card cashback summaries.
//!
//! Summaries are recomputed from the full transaction list on every call. Stored
//! `cashback_earned` values are summed as recorded, never recalculated.

use crate::config::catalog::CardCatalog;
use crate::core::cycle::CycleDateRange;
use crate::entities::transaction;
use crate::errors::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Spend and cashback for one catalog category inside a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    /// Category id
    pub category_id: String,
    /// Category display name
    pub category_name: String,
    /// Total amount spent
    pub spent: f64,
    /// Total cashback credited
    pub cashback_earned: f64,
    /// Category cap, `None` if unlimited
    pub cap_limit: Option<f64>,
    /// Cap left, `None` if unlimited
    pub cap_remaining: Option<f64>,
    /// Cashback earned as a percentage of the cap, 0 if unlimited
    pub cap_utilization: f64,
    /// Number of transactions
    pub transaction_count: usize,
}

/// Totals and category breakdown for one card inside a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashbackSummary {
    /// Card the summary covers
    pub card_id: String,
    /// Total amount spent on the card
    pub total_spent: f64,
    /// Total cashback credited on the card
    pub total_cashback: f64,
    /// One entry per catalog category, in catalog order
    pub category_breakdown: Vec<CategoryBreakdown>,
    /// First day of the cycle
    pub cycle_start: NaiveDate,
    /// Last day of the cycle
    pub cycle_end: NaiveDate,
}

/// Builds the summary for `card_id` over the transactions dated inside `cycle`.
///
/// Every category of the card appears in the breakdown, including ones without
/// transactions.
///
/// # Errors
/// Returns `Error::CardNotFound` if the card is not in the catalog.
pub fn get_cashback_summary(
    catalog: &CardCatalog,
    transactions: &[transaction::Model],
    card_id: &str,
    cycle: &CycleDateRange,
) -> Result<CashbackSummary> {
    let card = catalog
        .get_card_config(card_id)
        .ok_or_else(|| Error::CardNotFound {
            card_id: card_id.to_string(),
        })?;

    let in_cycle: Vec<&transaction::Model> = transactions
        .iter()
        .filter(|t| t.card_id == card_id && cycle.contains(t.date))
        .collect();

    let category_breakdown = card
        .categories
        .iter()
        .map(|category| {
            let (spent, cashback_earned, transaction_count) = in_cycle
                .iter()
                .filter(|t| t.category_id == category.id)
                .fold((0.0, 0.0, 0_usize), |(spent, earned, count), t| {
                    (spent + t.amount, earned + t.cashback_earned, count + 1)
                });

            let cap_limit = category.cap();
            let (cap_remaining, cap_utilization) = match cap_limit {
                Some(cap) if cap > 0.0 => (
                    Some((cap - cashback_earned).max(0.0)),
                    cashback_earned / cap * 100.0,
                ),
                Some(_) => (Some(0.0), 0.0),
                None => (None, 0.0),
            };

            CategoryBreakdown {
                category_id: category.id.clone(),
                category_name: category.name.clone(),
                spent,
                cashback_earned,
                cap_limit,
                cap_remaining,
                cap_utilization,
                transaction_count,
            }
        })
        .collect();

    let total_spent = in_cycle.iter().map(|t| t.amount).sum();
    let total_cashback = in_cycle.iter().map(|t| t.cashback_earned).sum();

    Ok(CashbackSummary {
        card_id: card_id.to_string(),
        total_spent,
        total_cashback,
        category_breakdown,
        cycle_start: cycle.start,
        cycle_end: cycle.end,
    })
}
