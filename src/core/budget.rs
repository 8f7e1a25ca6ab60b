//! Spending budgets per category.
//!
//! A budget caps how much the user wants to *spend* in a category over a period, which is
//! separate from the card's cashback cap. Budgets are stored as one JSON list under the
//! `budgets` key of the `system_state` table; checking them is pure and works on an
//! in-memory transaction list.

use crate::{
    config::CardCatalog,
    core::{
        cycle::{CycleDateRange, CycleType, quarterly_cycle, statement_cycle},
        system_state::{get_value, set_value},
        validation::{validate_amount, validate_category},
    },
    entities::transaction,
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDate};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const BUDGETS_KEY: &str = "budgets";

/// Period a budget limit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    /// Statement cycle
    Monthly,
    /// Calendar quarter
    Quarterly,
    /// Calendar year
    Yearly,
}

/// A stored spending limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Identifier
    pub id: Uuid,
    /// Category the limit covers
    pub category_id: String,
    /// Restricts the budget to one card; `None` counts the category on every card
    pub card_id: Option<String>,
    /// Spend limit for the period
    pub limit: f64,
    /// Period the limit resets on
    pub period: BudgetPeriod,
    /// Percentage of the limit at which an alert is raised
    pub alert_threshold: f64,
}

/// Caller-supplied fields for a new budget.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    /// Category the limit covers
    pub category_id: String,
    /// Optional card restriction
    pub card_id: Option<String>,
    /// Spend limit for the period
    pub limit: f64,
    /// Period the limit resets on
    pub period: BudgetPeriod,
    /// Alert threshold in percent
    pub alert_threshold: f64,
}

/// Where a budget stands in its current period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    /// Budget this status belongs to
    pub budget_id: Uuid,
    /// Display name of the category
    pub category_name: String,
    /// Spent in the period
    pub spent: f64,
    /// The budget's limit
    pub limit: f64,
    /// `spent / limit` in percent
    pub percentage: f64,
    /// Limit left, negative once overspent
    pub remaining: f64,
    /// The period the numbers cover
    pub window: CycleDateRange,
    /// Whether the alert threshold is reached
    pub alert: bool,
}

/// The period window of `period` containing `date`.
///
/// Monthly budgets follow the statement cycle so they line up with monthly cashback caps.
#[must_use]
pub fn budget_window(period: BudgetPeriod, date: NaiveDate, statement_anchor_day: u32) -> CycleDateRange {
    match period {
        BudgetPeriod::Monthly => statement_cycle(date, statement_anchor_day),
        BudgetPeriod::Quarterly => quarterly_cycle(date),
        BudgetPeriod::Yearly => {
            let year = date.year();
            let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(date);
            let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(date);
            CycleDateRange {
                start,
                end,
                cycle_type: CycleType::Custom,
                label: year.to_string(),
            }
        }
    }
}

fn category_name(catalog: &CardCatalog, budget: &Budget) -> String {
    let found = match &budget.card_id {
        Some(card_id) => catalog.get_category_config(card_id, &budget.category_id),
        None => catalog
            .cards()
            .iter()
            .find_map(|card| card.category(&budget.category_id)),
    };
    found.map_or_else(|| budget.category_id.clone(), |c| c.name.clone())
}

/// Computes one budget's standing as of `today`.
#[must_use]
pub fn budget_status(
    catalog: &CardCatalog,
    budget: &Budget,
    transactions: &[transaction::Model],
    today: NaiveDate,
    statement_anchor_day: u32,
) -> BudgetStatus {
    let window = budget_window(budget.period, today, statement_anchor_day);
    let spent: f64 = transactions
        .iter()
        .filter(|t| t.category_id == budget.category_id)
        .filter(|t| budget.card_id.as_ref().is_none_or(|card| *card == t.card_id))
        .filter(|t| window.contains(t.date))
        .map(|t| t.amount)
        .sum();
    let percentage = if budget.limit > 0.0 {
        spent / budget.limit * 100.0
    } else {
        0.0
    };

    BudgetStatus {
        budget_id: budget.id,
        category_name: category_name(catalog, budget),
        spent,
        limit: budget.limit,
        percentage,
        remaining: budget.limit - spent,
        window,
        alert: percentage >= budget.alert_threshold,
    }
}

/// Standing of every budget, in the order given.
#[must_use]
pub fn check_budgets(
    catalog: &CardCatalog,
    budgets: &[Budget],
    transactions: &[transaction::Model],
    today: NaiveDate,
    statement_anchor_day: u32,
) -> Vec<BudgetStatus> {
    budgets
        .iter()
        .map(|b| budget_status(catalog, b, transactions, today, statement_anchor_day))
        .collect()
}

/// Alert messages for the budgets at or past their threshold.
#[must_use]
pub fn budget_alerts(statuses: &[BudgetStatus]) -> Vec<String> {
    statuses
        .iter()
        .filter(|s| s.alert)
        .map(|s| format!("Warning: {:.0}% of {} budget used", s.percentage, s.category_name))
        .collect()
}

/// Reads the stored budgets. A list that no longer parses is logged and treated as empty.
#[instrument(skip(db))]
pub async fn load_budgets<C>(db: &C) -> Result<Vec<Budget>>
where
    C: ConnectionTrait,
{
    let Some(raw) = get_value(db, BUDGETS_KEY).await? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(&raw) {
        Ok(budgets) => Ok(budgets),
        Err(e) => {
            warn!("Failed to parse stored budgets, ignoring them: {}", e);
            Ok(Vec::new())
        }
    }
}

async fn save_budgets<C>(db: &C, budgets: &[Budget]) -> Result<()>
where
    C: ConnectionTrait,
{
    set_value(db, BUDGETS_KEY, serde_json::to_string(budgets)?).await
}

/// Validates and stores a new budget.
///
/// # Errors
/// Returns `Error::InvalidAmount` for a non-positive limit, `Error::InvalidThreshold` for
/// a threshold outside 0-100, and `Error::CardNotFound` / `Error::CategoryNotFound` when
/// the category does not exist (on the given card, or on any card).
#[instrument(skip(db, catalog))]
pub async fn add_budget(db: &DatabaseConnection, catalog: &CardCatalog, new: NewBudget) -> Result<Budget> {
    let limit = validate_amount(new.limit)?;
    if !(0.0..=100.0).contains(&new.alert_threshold) {
        return Err(Error::InvalidThreshold {
            threshold: new.alert_threshold,
        });
    }
    match &new.card_id {
        Some(card_id) => {
            validate_category(catalog, card_id, &new.category_id)?;
        }
        None => {
            if !catalog.cards().iter().any(|c| c.category(&new.category_id).is_some()) {
                return Err(Error::CategoryNotFound {
                    card_id: "any card".to_string(),
                    category_id: new.category_id,
                });
            }
        }
    }

    let budget = Budget {
        id: Uuid::new_v4(),
        category_id: new.category_id,
        card_id: new.card_id,
        limit,
        period: new.period,
        alert_threshold: new.alert_threshold,
    };

    let txn = db.begin().await?;
    let mut budgets = load_budgets(&txn).await?;
    budgets.push(budget.clone());
    save_budgets(&txn, &budgets).await?;
    txn.commit().await?;

    info!("Added {:?} budget of {:.2} for {}", budget.period, budget.limit, budget.category_id);
    Ok(budget)
}

/// Deletes a budget.
///
/// # Errors
/// Returns `Error::BudgetNotFound` if no budget has this id.
#[instrument(skip(db))]
pub async fn remove_budget(db: &DatabaseConnection, id: Uuid) -> Result<()> {
    let txn = db.begin().await?;
    let mut budgets = load_budgets(&txn).await?;
    let before = budgets.len();
    budgets.retain(|b| b.id != id);
    if budgets.len() == before {
        return Err(Error::BudgetNotFound { id });
    }
    save_budgets(&txn, &budgets).await?;
    txn.commit().await?;
    info!("Removed budget {}", id);
    Ok(())
}
