//! Spend analytics - dashboard numbers, optimization hints and category suggestions.
//!
//! All functions work on an in-memory transaction list and never touch the store.

use crate::config::catalog::CardCatalog;
use crate::core::cashback::calculate_cashback;
use crate::core::cycle::CycleDateRange;
use crate::core::summary::CashbackSummary;
use crate::entities::transaction;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Headline numbers for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Cashback credited in the cycle
    pub total_cashback: f64,
    /// Amount spent in the cycle
    pub total_spent: f64,
    /// Transactions in the cycle
    pub transaction_count: usize,
    /// Mean cashback per transaction
    pub average_cashback: f64,
    /// Category id with the highest spend, `"None"` when the cycle is empty
    pub top_category: String,
    /// Percentage of the cycle elapsed
    pub cycle_progress: f64,
}

/// Computes dashboard numbers for the transactions dated inside `range`.
#[must_use]
pub fn get_dashboard_stats(
    transactions: &[transaction::Model],
    range: &CycleDateRange,
    today: chrono::NaiveDate,
) -> DashboardStats {
    let in_cycle: Vec<&transaction::Model> =
        transactions.iter().filter(|t| range.contains(t.date)).collect();

    let total_cashback: f64 = in_cycle.iter().map(|t| t.cashback_earned).sum();
    let total_spent: f64 = in_cycle.iter().map(|t| t.amount).sum();
    let transaction_count = in_cycle.len();
    #[allow(clippy::cast_precision_loss)]
    let average_cashback = if transaction_count > 0 {
        total_cashback / transaction_count as f64
    } else {
        0.0
    };

    // Keep first-seen order so ties go to the category spent on first
    let mut spend_by_category: Vec<(&str, f64)> = Vec::new();
    for t in &in_cycle {
        match spend_by_category.iter_mut().find(|(id, _)| *id == t.category_id) {
            Some((_, spent)) => *spent += t.amount,
            None => spend_by_category.push((&t.category_id, t.amount)),
        }
    }
    let top_category = spend_by_category
        .iter()
        .fold(None::<(&str, f64)>, |best, &(id, spent)| match best {
            Some((_, best_spent)) if best_spent >= spent => best,
            _ => Some((id, spent)),
        })
        .map_or_else(|| "None".to_string(), |(id, _)| id.to_string());

    DashboardStats {
        total_cashback,
        total_spent,
        transaction_count,
        average_cashback,
        top_category,
        cycle_progress: range.progress(today),
    }
}

/// Sums recorded cashback, restricted to `range` when given.
#[must_use]
pub fn calculate_total_cashback(
    transactions: &[transaction::Model],
    range: Option<&CycleDateRange>,
) -> f64 {
    transactions
        .iter()
        .filter(|t| range.is_none_or(|r| r.contains(t.date)))
        .map(|t| t.cashback_earned)
        .sum()
}

/// The category of `card_id` that would earn the most cashback on `amount` right now.
///
/// Ties, including every category earning nothing, go to the earliest category in
/// catalog order. Returns `None` for an unknown card.
#[must_use]
pub fn get_optimal_category(
    catalog: &CardCatalog,
    amount: f64,
    card_id: &str,
    existing: &[transaction::Model],
    range: &CycleDateRange,
) -> Option<String> {
    let card = catalog.get_card_config(card_id)?;
    let mut best = card.categories.first()?;
    let mut best_cashback = 0.0;

    for category in &card.categories {
        let result = calculate_cashback(catalog, amount, card_id, &category.id, existing, range);
        if result.cashback_earned > best_cashback {
            best_cashback = result.cashback_earned;
            best = category;
        }
    }
    Some(best.id.clone())
}

/// What a suggestion is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// A category is close to its cap
    CapWarning,
    /// A high-rate category has not been used
    UnusedCategory,
}

/// How urgent a suggestion is. Orders low < medium < high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Nice to know
    Low,
    /// Worth acting on
    Medium,
    /// Act soon
    High,
}

/// A hint for earning more cashback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSuggestion {
    /// Suggestion type
    pub kind: SuggestionKind,
    /// Short headline
    pub title: String,
    /// Explanation
    pub description: String,
    /// Estimated extra cashback, 0 when unknown
    pub potential_savings: f64,
    /// Urgency
    pub priority: Priority,
}

/// Unused categories at or above this rate are worth pointing out.
const UNUSED_CATEGORY_MIN_RATE: f64 = 5.0;

/// Builds suggestions from `transactions`, normally the ones in the current cycle.
///
/// Categories whose cashback sits strictly between 80% and 100% of the cap produce a
/// high-priority warning. Categories never used with a rate of at least 5% produce a
/// medium-priority hint. High priority comes first.
#[must_use]
pub fn generate_optimization_suggestions(
    catalog: &CardCatalog,
    transactions: &[transaction::Model],
    currency: &str,
) -> Vec<OptimizationSuggestion> {
    let mut cashback_by_category: HashMap<(&str, &str), f64> = HashMap::new();
    for t in transactions {
        *cashback_by_category
            .entry((t.card_id.as_str(), t.category_id.as_str()))
            .or_insert(0.0) += t.cashback_earned;
    }

    let mut suggestions = Vec::new();

    for card in &catalog.cards {
        for category in &card.categories {
            let Some(&cashback) = cashback_by_category.get(&(card.id.as_str(), category.id.as_str())) else {
                continue;
            };
            let Some(cap) = category.cap().filter(|cap| *cap > 0.0) else {
                continue;
            };
            let utilization = cashback / cap * 100.0;
            if utilization > 80.0 && utilization < 100.0 {
                suggestions.push(OptimizationSuggestion {
                    kind: SuggestionKind::CapWarning,
                    title: format!("{} nearing cap", category.name),
                    description: format!(
                        "You've used {utilization:.0}% of your {currency}{cap} cap. Consider alternative categories."
                    ),
                    potential_savings: 0.0,
                    priority: Priority::High,
                });
            }
        }
    }

    for card in &catalog.cards {
        for category in &card.categories {
            let used = cashback_by_category.contains_key(&(card.id.as_str(), category.id.as_str()));
            if !used && category.cashback_rate >= UNUSED_CATEGORY_MIN_RATE {
                suggestions.push(OptimizationSuggestion {
                    kind: SuggestionKind::UnusedCategory,
                    title: format!("Unused {}% cashback category", category.cashback_rate),
                    description: format!(
                        "{} on {} offers {}% cashback but hasn't been used.",
                        category.name, card.name, category.cashback_rate
                    ),
                    potential_savings: 0.0,
                    priority: Priority::Medium,
                });
            }
        }
    }

    suggestions.sort_by(|a, b| b.priority.cmp(&a.priority));
    suggestions
}

/// A guessed card and category for a description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    /// Suggested card
    pub card_id: String,
    /// Suggested category
    pub category_id: String,
    /// Share of the pattern's keywords found, in percent
    pub confidence: f64,
}

struct MerchantPattern {
    keywords: &'static [&'static str],
    card_id: &'static str,
    category_id: &'static str,
}

const MERCHANT_PATTERNS: &[MerchantPattern] = &[
    MerchantPattern {
        keywords: &["airtel", "mobile recharge", "prepaid", "postpaid"],
        card_id: "AXIS_AIRTEL",
        category_id: "airtel_recharge",
    },
    MerchantPattern {
        keywords: &["electricity", "power", "bescom", "mseb", "water", "gas"],
        card_id: "AXIS_AIRTEL",
        category_id: "utility_bills",
    },
    MerchantPattern {
        keywords: &["zomato", "swiggy", "bigbasket", "food", "grocery"],
        card_id: "AXIS_AIRTEL",
        category_id: "food_grocery",
    },
    MerchantPattern {
        keywords: &["flipkart", "fk", "ekart"],
        card_id: "FLIPKART_AXIS",
        category_id: "flipkart",
    },
    MerchantPattern {
        keywords: &["myntra", "fashion", "clothing"],
        card_id: "FLIPKART_AXIS",
        category_id: "myntra",
    },
    MerchantPattern {
        keywords: &["cleartrip", "flight", "hotel", "travel"],
        card_id: "FLIPKART_AXIS",
        category_id: "cleartrip",
    },
];

/// Guesses a category from keywords in the description and merchant.
///
/// Patterns are tried in a fixed order and the first with any keyword match wins.
#[must_use]
pub fn suggest_category(description: &str, merchant: Option<&str>) -> Option<CategorySuggestion> {
    let text = format!("{description} {}", merchant.unwrap_or_default()).to_lowercase();

    MERCHANT_PATTERNS.iter().find_map(|pattern| {
        let matches = pattern.keywords.iter().filter(|k| text.contains(*k)).count();
        if matches == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let confidence = matches as f64 / pattern.keywords.len() as f64 * 100.0;
        Some(CategorySuggestion {
            card_id: pattern.card_id.to_string(),
            category_id: pattern.category_id.to_string(),
            confidence,
        })
    })
}

/// A merchant needs more than this many past transactions before its category is predicted.
const MERCHANT_HISTORY_MIN: usize = 2;

/// Predicts card and category for `merchant` from past transactions.
///
/// Needs at least three earlier transactions with the same merchant (case-insensitive);
/// the most recent one decides.
#[must_use]
pub fn predict_category(transactions: &[transaction::Model], merchant: &str) -> Option<(String, String)> {
    let merchant = merchant.trim().to_lowercase();
    if merchant.is_empty() {
        return None;
    }

    let history: Vec<&transaction::Model> = transactions
        .iter()
        .filter(|t| t.merchant.as_deref().is_some_and(|m| m.to_lowercase() == merchant))
        .collect();
    if history.len() <= MERCHANT_HISTORY_MIN {
        return None;
    }

    history
        .into_iter()
        .max_by_key(|t| (t.date, t.created_at))
        .map(|t| (t.card_id.clone(), t.category_id.clone()))
}

/// Direction spend moved compared with the week before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    /// Spending more
    Up,
    /// Spending the same or less
    Down,
}

/// Spend over the last seven days against the seven days before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingTrend {
    /// Spent from six days ago through today
    pub this_week: f64,
    /// Spent in the seven days before that
    pub last_week: f64,
    /// Change in percent, 0 when nothing was spent last week
    pub change: f64,
    /// Whether spend went up
    pub direction: TrendDirection,
}

/// Week-over-week spend as of `today`. Transactions dated after `today` are ignored.
#[must_use]
pub fn spending_trend(transactions: &[transaction::Model], today: NaiveDate) -> SpendingTrend {
    let this_week_start = today - Days::new(6);
    let last_week_start = today - Days::new(13);

    let spent_between = |from: NaiveDate, to: NaiveDate| -> f64 {
        transactions
            .iter()
            .filter(|t| from <= t.date && t.date <= to)
            .map(|t| t.amount)
            .sum()
    };
    let this_week = spent_between(this_week_start, today);
    let last_week = spent_between(last_week_start, this_week_start - Days::new(1));

    let change = if last_week > 0.0 {
        (this_week - last_week) / last_week * 100.0
    } else {
        0.0
    };
    SpendingTrend {
        this_week,
        last_week,
        change,
        direction: if change > 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        },
    }
}

/// How well a card was used in a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardPerformance {
    /// Cashback as a percentage of spend
    pub rate: f64,
    /// Mean cap utilization over the capped categories, in percent
    pub utilization: f64,
    /// `rate * utilization / 100`
    pub efficiency: f64,
}

/// Scores a card summary by effective rate and cap utilization.
#[must_use]
pub fn card_performance(summary: &CashbackSummary) -> CardPerformance {
    let rate = if summary.total_spent > 0.0 {
        summary.total_cashback / summary.total_spent * 100.0
    } else {
        0.0
    };

    let capped: Vec<f64> = summary
        .category_breakdown
        .iter()
        .filter_map(|c| {
            c.cap_limit
                .filter(|cap| *cap > 0.0)
                .map(|cap| c.cashback_earned / cap * 100.0)
        })
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let utilization = if capped.is_empty() {
        0.0
    } else {
        capped.iter().sum::<f64>() / capped.len() as f64
    };

    CardPerformance {
        rate,
        utilization,
        efficiency: rate * utilization / 100.0,
    }
}
