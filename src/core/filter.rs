//! Transaction list filtering.

use crate::entities::transaction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Criteria for narrowing a transaction list. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Only this card
    pub card_id: Option<String>,
    /// Only this category
    pub category_id: Option<String>,
    /// Inclusive date bounds
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Inclusive amount bounds
    pub amount_range: Option<(f64, f64)>,
    /// Case-insensitive text matched against description, merchant and category
    pub search_term: Option<String>,
}

impl FilterOptions {
    /// Whether `t` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, t: &transaction::Model) -> bool {
        if self.card_id.as_ref().is_some_and(|card| *card != t.card_id) {
            return false;
        }
        if self
            .category_id
            .as_ref()
            .is_some_and(|category| *category != t.category_id)
        {
            return false;
        }
        if let Some((start, end)) = self.date_range {
            if t.date < start || t.date > end {
                return false;
            }
        }
        if let Some((min, max)) = self.amount_range {
            if t.amount < min || t.amount > max {
                return false;
            }
        }
        if let Some(term) = self.search_term.as_deref().filter(|s| !s.is_empty()) {
            let term = term.to_lowercase();
            let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&term));
            if !(hit(t.description.as_deref())
                || hit(t.merchant.as_deref())
                || hit(Some(t.category_id.as_str())))
            {
                return false;
            }
        }
        true
    }
}

/// Returns the transactions matching `options`, newest first.
#[must_use]
pub fn filter_transactions(
    transactions: &[transaction::Model],
    options: &FilterOptions,
) -> Vec<transaction::Model> {
    let mut filtered: Vec<transaction::Model> = transactions
        .iter()
        .filter(|t| options.matches(t))
        .cloned()
        .collect();
    filtered.sort_by(|a, b| b.date.cmp(&a.date));
    filtered
}
