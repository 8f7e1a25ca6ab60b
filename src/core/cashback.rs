//! Cashback calculation with per-category caps.
//!
//! These functions are pure: the result depends only on the catalog, the transaction
//! snapshot and the cycle window passed in. Unknown card or category ids produce a zero
//! result rather than an error, and reaching a cap is reported as data.

use crate::config::catalog::CardCatalog;
use crate::core::cycle::CycleDateRange;
use crate::entities::transaction;
use serde::{Deserialize, Serialize};

/// Outcome of pricing one candidate transaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashbackResult {
    /// Cashback credited to the candidate
    pub cashback_earned: f64,
    /// Whether the cap cut the cashback below the nominal rate
    pub cap_reached: bool,
    /// Cap left after the candidate, `None` for uncapped categories
    pub remaining_cap: Option<f64>,
}

impl CashbackResult {
    const NONE: Self = Self {
        cashback_earned: 0.0,
        cap_reached: false,
        remaining_cap: None,
    };
}

/// Cap usage alert for a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapWarning {
    /// Whether the caller should surface a warning
    pub is_warning: bool,
    /// Message to show, if any
    pub message: Option<String>,
    /// Cap utilization percentage (100 once the cap is reached)
    pub percentage: f64,
}

/// Cashback without any cap applied.
#[must_use]
pub fn nominal_cashback(amount: f64, cashback_rate: f64) -> f64 {
    amount * cashback_rate / 100.0
}

/// Sum of cashback already credited to `card_id`/`category_id` inside `cycle`.
#[must_use]
pub fn cap_consumed(
    card_id: &str,
    category_id: &str,
    existing: &[transaction::Model],
    cycle: &CycleDateRange,
) -> f64 {
    existing
        .iter()
        .filter(|t| t.card_id == card_id && t.category_id == category_id && cycle.contains(t.date))
        .map(|t| t.cashback_earned)
        .sum()
}

/// Computes the cashback a new transaction earns given the transactions already recorded.
///
/// Only existing transactions on the same card and category whose date falls inside
/// `cycle` count toward the cap.
#[must_use]
pub fn calculate_cashback(
    catalog: &CardCatalog,
    amount: f64,
    card_id: &str,
    category_id: &str,
    existing: &[transaction::Model],
    cycle: &CycleDateRange,
) -> CashbackResult {
    let Some(category) = catalog.get_category_config(card_id, category_id) else {
        return CashbackResult::NONE;
    };

    let potential = nominal_cashback(amount, category.cashback_rate);

    let Some(cap) = category.cap() else {
        return CashbackResult {
            cashback_earned: potential,
            cap_reached: false,
            remaining_cap: None,
        };
    };

    let consumed = cap_consumed(card_id, category_id, existing, cycle);
    if consumed >= cap {
        // A zero-amount spend does not hit the cap, it simply earns nothing
        return CashbackResult {
            cashback_earned: 0.0,
            cap_reached: potential > 0.0,
            remaining_cap: Some(0.0),
        };
    }

    let remaining_before = cap - consumed;
    let actual = potential.min(remaining_before);

    CashbackResult {
        cashback_earned: actual,
        cap_reached: actual < potential,
        remaining_cap: Some(remaining_before - actual),
    }
}

/// Checks how much of a category's cap is used inside `cycle`.
///
/// Warns once utilization reaches `warning_threshold` percent, and reports the cap as
/// reached at 100%.
#[must_use]
pub fn get_cap_warning(
    catalog: &CardCatalog,
    card_id: &str,
    category_id: &str,
    existing: &[transaction::Model],
    cycle: &CycleDateRange,
    warning_threshold: f64,
) -> CapWarning {
    let no_warning = |percentage| CapWarning {
        is_warning: false,
        message: None,
        percentage,
    };

    let Some(category) = catalog.get_category_config(card_id, category_id) else {
        return no_warning(0.0);
    };
    let Some(cap) = category.cap() else {
        return no_warning(0.0);
    };
    if cap <= 0.0 {
        return no_warning(0.0);
    }

    let percentage = cap_consumed(card_id, category_id, existing, cycle) / cap * 100.0;

    if percentage >= 100.0 {
        CapWarning {
            is_warning: true,
            message: Some(format!("Cap reached for {}", category.name)),
            percentage: 100.0,
        }
    } else if percentage >= warning_threshold {
        CapWarning {
            is_warning: true,
            message: Some(format!("{percentage:.0}% of cap used for {}", category.name)),
            percentage,
        }
    } else {
        no_warning(percentage)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::cycle::{calendar_month, quarterly_cycle, statement_cycle};
    use crate::test_utils::{make_transaction, sample_date};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_capped_category_scenario() {
        // cap 250, rate 25%
        let catalog = CardCatalog::builtin();
        let cycle = statement_cycle(d(2024, 3, 20), 12);

        let first = calculate_cashback(&catalog, 800.0, "AXIS_AIRTEL", "airtel_recharge", &[], &cycle);
        assert_eq!(first.cashback_earned, 200.0);
        assert!(!first.cap_reached);
        assert_eq!(first.remaining_cap, Some(50.0));

        let existing = vec![make_transaction(
            "AXIS_AIRTEL",
            "airtel_recharge",
            800.0,
            first.cashback_earned,
            d(2024, 3, 15),
        )];
        let second =
            calculate_cashback(&catalog, 800.0, "AXIS_AIRTEL", "airtel_recharge", &existing, &cycle);
        assert_eq!(second.cashback_earned, 50.0);
        assert!(second.cap_reached);
        assert_eq!(second.remaining_cap, Some(0.0));
    }

    #[test]
    fn test_cap_already_exhausted() {
        let catalog = CardCatalog::builtin();
        let cycle = statement_cycle(d(2024, 3, 20), 12);
        let existing = vec![make_transaction(
            "AXIS_AIRTEL",
            "airtel_recharge",
            1000.0,
            250.0,
            d(2024, 3, 14),
        )];

        let result =
            calculate_cashback(&catalog, 100.0, "AXIS_AIRTEL", "airtel_recharge", &existing, &cycle);
        assert_eq!(result.cashback_earned, 0.0);
        assert!(result.cap_reached);
        assert_eq!(result.remaining_cap, Some(0.0));
    }

    #[test]
    fn test_unlimited_category_scenario() {
        let catalog = CardCatalog::builtin();
        let cycle = calendar_month(d(2024, 3, 1));
        let existing: Vec<_> = (0..5)
            .map(|_| make_transaction("AXIS_AIRTEL", "other_spends", 10_000.0, 100.0, d(2024, 3, 2)))
            .collect();

        let result =
            calculate_cashback(&catalog, 10_000.0, "AXIS_AIRTEL", "other_spends", &existing, &cycle);
        assert_eq!(result.cashback_earned, 100.0);
        assert!(!result.cap_reached);
        assert!(result.remaining_cap.is_none());
    }

    #[test]
    fn test_unlimited_category_is_exact_nominal() {
        let catalog = CardCatalog::builtin();
        let cycle = calendar_month(d(2024, 3, 1));
        for amount in [0.01, 1.0, 333.33, 1234.56, 99_999.99] {
            let result = calculate_cashback(
                &catalog,
                amount,
                "FLIPKART_AXIS",
                "preferred_merchants",
                &[],
                &cycle,
            );
            assert_eq!(result.cashback_earned, amount * 4.0 / 100.0);
        }
    }

    #[test]
    fn test_unknown_ids_return_zero() {
        let catalog = CardCatalog::builtin();
        let cycle = calendar_month(d(2024, 3, 1));

        let unknown_category = calculate_cashback(&catalog, 500.0, "AXIS_AIRTEL", "nope", &[], &cycle);
        assert_eq!(unknown_category, CashbackResult::NONE);

        let unknown_card = calculate_cashback(&catalog, 500.0, "NOPE", "myntra", &[], &cycle);
        assert_eq!(unknown_card.cashback_earned, 0.0);
        assert!(!unknown_card.cap_reached);
        assert!(unknown_card.remaining_cap.is_none());
    }

    #[test]
    fn test_zero_amount_never_reaches_cap() {
        let catalog = CardCatalog::builtin();
        let cycle = statement_cycle(d(2024, 3, 20), 12);

        let fresh = calculate_cashback(&catalog, 0.0, "AXIS_AIRTEL", "airtel_recharge", &[], &cycle);
        assert_eq!(fresh.cashback_earned, 0.0);
        assert!(!fresh.cap_reached);
        assert_eq!(fresh.remaining_cap, Some(250.0));

        let existing = vec![make_transaction(
            "AXIS_AIRTEL",
            "airtel_recharge",
            1000.0,
            250.0,
            d(2024, 3, 14),
        )];
        let exhausted =
            calculate_cashback(&catalog, 0.0, "AXIS_AIRTEL", "airtel_recharge", &existing, &cycle);
        assert_eq!(exhausted.cashback_earned, 0.0);
        assert!(!exhausted.cap_reached);
    }

    #[test]
    fn test_only_matching_transactions_consume_cap() {
        let catalog = CardCatalog::builtin();
        let cycle = statement_cycle(d(2024, 3, 20), 12);
        let existing = vec![
            // previous cycle
            make_transaction("AXIS_AIRTEL", "airtel_recharge", 1000.0, 250.0, d(2024, 3, 11)),
            // other category
            make_transaction("AXIS_AIRTEL", "utility_bills", 1000.0, 100.0, d(2024, 3, 13)),
            // other card, same category name
            make_transaction("FLIPKART_AXIS", "airtel_recharge", 1000.0, 250.0, d(2024, 3, 13)),
        ];

        let result =
            calculate_cashback(&catalog, 400.0, "AXIS_AIRTEL", "airtel_recharge", &existing, &cycle);
        assert_eq!(result.cashback_earned, 100.0);
        assert_eq!(result.remaining_cap, Some(150.0));
    }

    #[test]
    fn test_running_total_never_exceeds_cap() {
        let catalog = CardCatalog::builtin();
        let cycle = quarterly_cycle(sample_date());
        let cap = catalog
            .get_category_config("FLIPKART_AXIS", "myntra")
            .unwrap()
            .cap()
            .unwrap();

        let mut existing = Vec::new();
        for amount in [12_000.0, 400.0, 30_000.0, 9_960.0, 40.0, 25_000.0, 7_760.0] {
            let result =
                calculate_cashback(&catalog, amount, "FLIPKART_AXIS", "myntra", &existing, &cycle);
            assert!(result.cashback_earned <= nominal_cashback(amount, 7.5));
            existing.push(make_transaction(
                "FLIPKART_AXIS",
                "myntra",
                amount,
                result.cashback_earned,
                sample_date(),
            ));
            let total = cap_consumed("FLIPKART_AXIS", "myntra", &existing, &cycle);
            assert!(total <= cap);
        }
        assert_eq!(cap_consumed("FLIPKART_AXIS", "myntra", &existing, &cycle), cap);
    }

    #[test]
    fn test_deterministic() {
        let catalog = CardCatalog::builtin();
        let cycle = statement_cycle(d(2024, 3, 20), 12);
        let existing = vec![make_transaction(
            "AXIS_AIRTEL",
            "food_grocery",
            2000.0,
            200.0,
            d(2024, 3, 14),
        )];
        let a = calculate_cashback(&catalog, 4000.0, "AXIS_AIRTEL", "food_grocery", &existing, &cycle);
        let b = calculate_cashback(&catalog, 4000.0, "AXIS_AIRTEL", "food_grocery", &existing, &cycle);
        assert_eq!(a, b);
    }

    #[test]
    fn test_cap_warning_levels() {
        let catalog = CardCatalog::builtin();
        let cycle = statement_cycle(d(2024, 3, 20), 12);

        let none = get_cap_warning(&catalog, "AXIS_AIRTEL", "airtel_recharge", &[], &cycle, 80.0);
        assert!(!none.is_warning);
        assert_eq!(none.percentage, 0.0);

        let near = vec![make_transaction(
            "AXIS_AIRTEL",
            "airtel_recharge",
            850.0,
            212.5,
            d(2024, 3, 14),
        )];
        let warning = get_cap_warning(&catalog, "AXIS_AIRTEL", "airtel_recharge", &near, &cycle, 80.0);
        assert!(warning.is_warning);
        assert_eq!(warning.percentage, 85.0);
        assert_eq!(
            warning.message.as_deref(),
            Some("85% of cap used for Airtel Recharge/Bill")
        );

        let full = vec![make_transaction(
            "AXIS_AIRTEL",
            "airtel_recharge",
            1000.0,
            250.0,
            d(2024, 3, 14),
        )];
        let reached = get_cap_warning(&catalog, "AXIS_AIRTEL", "airtel_recharge", &full, &cycle, 80.0);
        assert!(reached.is_warning);
        assert_eq!(reached.percentage, 100.0);
        assert_eq!(
            reached.message.as_deref(),
            Some("Cap reached for Airtel Recharge/Bill")
        );
    }

    #[test]
    fn test_cap_warning_ignores_uncapped() {
        let catalog = CardCatalog::builtin();
        let cycle = calendar_month(d(2024, 3, 1));
        let warning = get_cap_warning(&catalog, "AXIS_AIRTEL", "other_spends", &[], &cycle, 0.0);
        assert!(!warning.is_warning);
        assert!(warning.message.is_none());
    }
}
