//! Recurring transactions.
//!
//! A recurring definition (a monthly broadband bill, a weekly grocery order) repeats a
//! spend on a fixed frequency from its start date. Definitions live as one JSON list under
//! the `recurring_transactions` key of the `system_state` table. [`run_due_recurring`]
//! records every occurrence that has come due through the transaction store, so each one is
//! priced against the cap like a manual entry.
//!
//! Occurrence `n` is always computed from the start date, never from the previous
//! occurrence, so a definition starting on the 31st stays on month ends.

use crate::{
    config::{CardCatalog, Settings},
    core::{
        system_state::{get_value, set_value},
        transaction::{AddedTransaction, NewTransaction, add_transaction},
        validation::{validate_amount, validate_category},
    },
    errors::{Error, Result},
};
use chrono::{Days, Months, NaiveDate};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const RECURRING_KEY: &str = "recurring_transactions";

/// How often a recurring transaction repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every day
    Daily,
    /// Every 7 days
    Weekly,
    /// Same day every month, clamped to short months
    Monthly,
    /// Every 3 months
    Quarterly,
}

impl Frequency {
    /// The `n`th occurrence after `start`; `n = 0` is `start` itself.
    #[must_use]
    pub fn occurrence(self, start: NaiveDate, n: u32) -> Option<NaiveDate> {
        match self {
            Self::Daily => start.checked_add_days(Days::new(u64::from(n))),
            Self::Weekly => start.checked_add_days(Days::new(u64::from(n) * 7)),
            Self::Monthly => start.checked_add_months(Months::new(n)),
            Self::Quarterly => start.checked_add_months(Months::new(n.checked_mul(3)?)),
        }
    }
}

/// A stored recurring definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTransaction {
    /// Identifier
    pub id: Uuid,
    /// Name, used as the description of generated transactions
    pub name: String,
    /// Card to charge
    pub card_id: String,
    /// Category on the card
    pub category_id: String,
    /// Amount of each occurrence
    pub amount: f64,
    /// Repeat frequency
    pub frequency: Frequency,
    /// Day the schedule is counted from
    pub start_date: NaiveDate,
    /// Last day an occurrence may fall on
    pub end_date: Option<NaiveDate>,
    /// Paused definitions generate nothing
    pub enabled: bool,
    /// Day of the last generated occurrence
    pub last_executed: Option<NaiveDate>,
    /// Day the next occurrence falls on, `None` once the schedule is exhausted
    pub next_execution: Option<NaiveDate>,
}

/// Caller-supplied fields for a new recurring definition.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecurring {
    /// Name
    pub name: String,
    /// Card to charge
    pub card_id: String,
    /// Category on the card
    pub category_id: String,
    /// Amount of each occurrence
    pub amount: f64,
    /// Repeat frequency
    pub frequency: Frequency,
    /// Day the schedule is counted from
    pub start_date: NaiveDate,
    /// Optional last day
    pub end_date: Option<NaiveDate>,
}

/// First occurrence after `start` that falls on or after `from`, within `end`.
#[must_use]
pub fn first_occurrence_from(
    start: NaiveDate,
    frequency: Frequency,
    from: NaiveDate,
    end: Option<NaiveDate>,
) -> Option<NaiveDate> {
    (1..)
        .map_while(|n| frequency.occurrence(start, n))
        .find(|date| *date >= from)
        .filter(|date| end.is_none_or(|end| *date <= end))
}

/// The first occurrence of a new schedule: one period after its start date.
#[must_use]
pub fn calculate_next_execution(start: NaiveDate, frequency: Frequency) -> Option<NaiveDate> {
    frequency.occurrence(start, 1)
}

/// Occurrences of `recurring` that are due on or before `today`, oldest first.
///
/// Paused definitions have none.
#[must_use]
pub fn due_occurrences(recurring: &RecurringTransaction, today: NaiveDate) -> Vec<NaiveDate> {
    if !recurring.enabled {
        return Vec::new();
    }
    let mut due = Vec::new();
    let mut next = recurring.next_execution;
    while let Some(date) = next.filter(|d| *d <= today) {
        if recurring.end_date.is_some_and(|end| date > end) {
            break;
        }
        due.push(date);
        next = date.succ_opt().and_then(|from| {
            first_occurrence_from(recurring.start_date, recurring.frequency, from, recurring.end_date)
        });
    }
    due
}

/// Reads the stored definitions. A list that no longer parses is logged and treated as
/// empty.
#[instrument(skip(db))]
pub async fn load_recurring<C>(db: &C) -> Result<Vec<RecurringTransaction>>
where
    C: ConnectionTrait,
{
    let Some(raw) = get_value(db, RECURRING_KEY).await? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(&raw) {
        Ok(list) => Ok(list),
        Err(e) => {
            warn!("Failed to parse stored recurring transactions, ignoring them: {}", e);
            Ok(Vec::new())
        }
    }
}

async fn save_recurring<C>(db: &C, list: &[RecurringTransaction]) -> Result<()>
where
    C: ConnectionTrait,
{
    set_value(db, RECURRING_KEY, serde_json::to_string(list)?).await
}

/// Validates and stores a new, enabled definition.
///
/// # Errors
/// Returns `Error::InvalidAmount`, `Error::CardNotFound` / `Error::CategoryNotFound` like
/// [`add_transaction`], and `Error::InvalidDateRange` when the end date precedes the start.
#[instrument(skip(db, catalog))]
pub async fn add_recurring(
    db: &DatabaseConnection,
    catalog: &CardCatalog,
    new: NewRecurring,
) -> Result<RecurringTransaction> {
    let amount = validate_amount(new.amount)?;
    validate_category(catalog, &new.card_id, &new.category_id)?;
    if let Some(end) = new.end_date.filter(|end| *end < new.start_date) {
        return Err(Error::InvalidDateRange {
            start: new.start_date,
            end,
        });
    }

    let next_execution = calculate_next_execution(new.start_date, new.frequency)
        .filter(|date| new.end_date.is_none_or(|end| *date <= end));
    let recurring = RecurringTransaction {
        id: Uuid::new_v4(),
        name: new.name.trim().to_string(),
        card_id: new.card_id,
        category_id: new.category_id,
        amount,
        frequency: new.frequency,
        start_date: new.start_date,
        end_date: new.end_date,
        enabled: true,
        last_executed: None,
        next_execution,
    };

    let txn = db.begin().await?;
    let mut list = load_recurring(&txn).await?;
    list.push(recurring.clone());
    save_recurring(&txn, &list).await?;
    txn.commit().await?;

    info!("Added recurring transaction '{}' ({:?})", recurring.name, recurring.frequency);
    Ok(recurring)
}

/// Pauses or resumes a definition.
///
/// Occurrences that fell due while paused are skipped: resuming moves the next occurrence
/// to the first one on or after `today`.
///
/// # Errors
/// Returns `Error::RecurringNotFound` if no definition has this id.
#[instrument(skip(db))]
pub async fn set_recurring_enabled(
    db: &DatabaseConnection,
    id: Uuid,
    enabled: bool,
    today: NaiveDate,
) -> Result<RecurringTransaction> {
    let txn = db.begin().await?;
    let mut list = load_recurring(&txn).await?;
    let recurring = list
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or(Error::RecurringNotFound { id })?;

    if enabled && !recurring.enabled {
        recurring.next_execution =
            first_occurrence_from(recurring.start_date, recurring.frequency, today, recurring.end_date);
    }
    recurring.enabled = enabled;
    let updated = recurring.clone();

    save_recurring(&txn, &list).await?;
    txn.commit().await?;
    info!(
        "Recurring transaction '{}' {}",
        updated.name,
        if enabled { "resumed" } else { "paused" }
    );
    Ok(updated)
}

/// Flips a definition between active and paused.
///
/// # Errors
/// Returns `Error::RecurringNotFound` if no definition has this id.
pub async fn toggle_recurring(db: &DatabaseConnection, id: Uuid, today: NaiveDate) -> Result<RecurringTransaction> {
    let current = load_recurring(db)
        .await?
        .into_iter()
        .find(|r| r.id == id)
        .ok_or(Error::RecurringNotFound { id })?;
    set_recurring_enabled(db, id, !current.enabled, today).await
}

/// Deletes a definition. Transactions it already generated stay.
///
/// # Errors
/// Returns `Error::RecurringNotFound` if no definition has this id.
#[instrument(skip(db))]
pub async fn remove_recurring(db: &DatabaseConnection, id: Uuid) -> Result<()> {
    let txn = db.begin().await?;
    let mut list = load_recurring(&txn).await?;
    let before = list.len();
    list.retain(|r| r.id != id);
    if list.len() == before {
        return Err(Error::RecurringNotFound { id });
    }
    save_recurring(&txn, &list).await?;
    txn.commit().await?;
    info!("Removed recurring transaction {}", id);
    Ok(())
}

/// Records every occurrence due on or before `today` and advances the schedules.
///
/// A definition whose card or category has left the catalog is skipped with a warning and
/// retried on the next run.
///
/// # Errors
/// Returns database errors from the store.
#[instrument(skip(db, catalog, settings))]
pub async fn run_due_recurring(
    db: &DatabaseConnection,
    catalog: &CardCatalog,
    settings: &Settings,
    today: NaiveDate,
) -> Result<Vec<AddedTransaction>> {
    let mut list = load_recurring(db).await?;
    let mut added = Vec::new();

    for index in 0..list.len() {
        let due = due_occurrences(&list[index], today);
        if due.is_empty() {
            continue;
        }

        for date in due {
            let recurring = &mut list[index];
            let new = NewTransaction {
                card_id: recurring.card_id.clone(),
                category_id: recurring.category_id.clone(),
                amount: recurring.amount,
                date,
                description: Some(recurring.name.clone()),
                merchant: None,
            };
            match add_transaction(db, catalog, settings, new).await {
                Ok(result) => added.push(result),
                Err(e @ (Error::CardNotFound { .. } | Error::CategoryNotFound { .. })) => {
                    warn!("Skipping recurring transaction '{}': {}", recurring.name, e);
                    break;
                }
                Err(e) => return Err(e),
            }

            recurring.last_executed = Some(date);
            recurring.next_execution = date.succ_opt().and_then(|from| {
                first_occurrence_from(recurring.start_date, recurring.frequency, from, recurring.end_date)
            });
            debug!("Recorded '{}' for {}", recurring.name, date);
        }

        // Progress is persisted before the next definition runs
        save_recurring(db, &list).await?;
    }

    if !added.is_empty() {
        info!("Recorded {} recurring transactions", added.len());
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::transaction::get_all_transactions;
    use crate::test_utils::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn new_recurring(frequency: Frequency, start_date: NaiveDate) -> NewRecurring {
        NewRecurring {
            name: "Broadband".to_string(),
            card_id: "AXIS_AIRTEL".to_string(),
            category_id: "airtel_recharge".to_string(),
            amount: 499.0,
            frequency,
            start_date,
            end_date: None,
        }
    }

    #[test]
    fn test_calculate_next_execution() {
        let start = d(2024, 1, 31);
        assert_eq!(calculate_next_execution(start, Frequency::Daily), Some(d(2024, 2, 1)));
        assert_eq!(calculate_next_execution(start, Frequency::Weekly), Some(d(2024, 2, 7)));
        assert_eq!(calculate_next_execution(start, Frequency::Monthly), Some(d(2024, 2, 29)));
        assert_eq!(calculate_next_execution(start, Frequency::Quarterly), Some(d(2024, 4, 30)));
    }

    #[test]
    fn test_monthly_occurrences_do_not_drift() {
        let start = d(2024, 1, 31);
        assert_eq!(Frequency::Monthly.occurrence(start, 2), Some(d(2024, 3, 31)));
        assert_eq!(
            first_occurrence_from(start, Frequency::Monthly, d(2024, 3, 1), None),
            Some(d(2024, 3, 31))
        );
        assert_eq!(
            first_occurrence_from(start, Frequency::Monthly, d(2024, 3, 1), Some(d(2024, 3, 30))),
            None
        );
    }

    #[test]
    fn test_due_occurrences() {
        let mut recurring = RecurringTransaction {
            id: Uuid::new_v4(),
            name: "Gym".to_string(),
            card_id: "FLIPKART_AXIS".to_string(),
            category_id: "preferred_merchants".to_string(),
            amount: 100.0,
            frequency: Frequency::Weekly,
            start_date: d(2024, 5, 1),
            end_date: Some(d(2024, 5, 20)),
            enabled: true,
            last_executed: None,
            next_execution: Some(d(2024, 5, 8)),
        };

        assert!(due_occurrences(&recurring, d(2024, 5, 7)).is_empty());
        assert_eq!(due_occurrences(&recurring, d(2024, 5, 16)), [d(2024, 5, 8), d(2024, 5, 15)]);
        // end date stops the schedule
        assert_eq!(due_occurrences(&recurring, d(2024, 6, 30)), [d(2024, 5, 8), d(2024, 5, 15)]);

        recurring.enabled = false;
        assert!(due_occurrences(&recurring, d(2024, 6, 30)).is_empty());
    }

    #[tokio::test]
    async fn test_add_and_remove_recurring() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = CardCatalog::builtin();

        let added = add_recurring(&db, &catalog, new_recurring(Frequency::Monthly, d(2024, 5, 5))).await?;
        assert!(added.enabled);
        assert_eq!(added.next_execution, Some(d(2024, 6, 5)));
        assert_eq!(load_recurring(&db).await?, vec![added.clone()]);

        remove_recurring(&db, added.id).await?;
        assert!(load_recurring(&db).await?.is_empty());
        assert!(matches!(
            remove_recurring(&db, added.id).await,
            Err(Error::RecurringNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_recurring_rejects_invalid_input() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = CardCatalog::builtin();

        let mut bad_amount = new_recurring(Frequency::Daily, sample_date());
        bad_amount.amount = -1.0;
        assert!(matches!(
            add_recurring(&db, &catalog, bad_amount).await,
            Err(Error::InvalidAmount { .. })
        ));

        let mut bad_range = new_recurring(Frequency::Daily, sample_date());
        bad_range.end_date = Some(d(2024, 1, 1));
        assert!(matches!(
            add_recurring(&db, &catalog, bad_range).await,
            Err(Error::InvalidDateRange { .. })
        ));

        let mut bad_category = new_recurring(Frequency::Daily, sample_date());
        bad_category.category_id = "myntra".to_string();
        assert!(matches!(
            add_recurring(&db, &catalog, bad_category).await,
            Err(Error::CategoryNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_run_due_recurring_records_and_advances() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = CardCatalog::builtin();
        let settings = Settings::default();
        let recurring = add_recurring(&db, &catalog, new_recurring(Frequency::Monthly, d(2024, 3, 5))).await?;

        // due on 5 Apr and 5 May
        let added = run_due_recurring(&db, &catalog, &settings, d(2024, 5, 10)).await?;
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].transaction.date, d(2024, 4, 5));
        assert_eq!(added[0].transaction.description.as_deref(), Some("Broadband"));
        assert_eq!(added[0].transaction.cashback_earned, 124.75);

        let stored = load_recurring(&db).await?;
        assert_eq!(stored[0].id, recurring.id);
        assert_eq!(stored[0].last_executed, Some(d(2024, 5, 5)));
        assert_eq!(stored[0].next_execution, Some(d(2024, 6, 5)));

        // nothing new on a second run
        assert!(run_due_recurring(&db, &catalog, &settings, d(2024, 5, 10)).await?.is_empty());
        assert_eq!(get_all_transactions(&db).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_paused_occurrences_are_skipped() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = CardCatalog::builtin();
        let recurring = add_recurring(&db, &catalog, new_recurring(Frequency::Weekly, d(2024, 5, 1))).await?;

        let paused = toggle_recurring(&db, recurring.id, d(2024, 5, 2)).await?;
        assert!(!paused.enabled);
        assert!(
            run_due_recurring(&db, &catalog, &Settings::default(), d(2024, 5, 20))
                .await?
                .is_empty()
        );

        let resumed = toggle_recurring(&db, recurring.id, d(2024, 5, 20)).await?;
        assert!(resumed.enabled);
        assert_eq!(resumed.next_execution, Some(d(2024, 5, 22)));

        let added = run_due_recurring(&db, &catalog, &Settings::default(), d(2024, 5, 22)).await?;
        assert_eq!(added.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_missing_recurring() -> Result<()> {
        let db = setup_test_db().await?;
        let result = toggle_recurring(&db, Uuid::new_v4(), sample_date()).await;
        assert!(matches!(result, Err(Error::RecurringNotFound { .. })));
        Ok(())
    }
}
