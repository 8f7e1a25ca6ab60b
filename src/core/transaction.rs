//! Transaction store - recording, editing and removing transactions.
//!
//! This is the single writer of the transaction list. Adding a transaction validates the
//! input, derives the cap window from the category's cap period, prices the transaction with
//! the cashback engine against every other stored transaction and snapshots the rate.
//!
//! Edits follow one policy: changing the amount, card, category or date reprices the edited
//! transaction against all *other* stored transactions; changing only the description or
//! merchant leaves the stored cashback untouched. Other transactions are never rewritten.
//!
//! Adds and edits read, price and write inside one database transaction.

use crate::{
    config::{CardCatalog, Settings},
    core::{
        cashback::{CashbackResult, calculate_cashback},
        cycle::cap_window,
        validation::{validate_amount, validate_category},
    },
    entities::{Transaction, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument};

/// Caller-supplied fields for a new transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Card the spend was made on
    pub card_id: String,
    /// Category within the card
    pub category_id: String,
    /// Amount spent
    pub amount: f64,
    /// Day of the spend
    pub date: NaiveDate,
    /// Optional description
    pub description: Option<String>,
    /// Optional merchant
    pub merchant: Option<String>,
}

/// Field changes for an existing transaction; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionUpdate {
    /// New card
    pub card_id: Option<String>,
    /// New category
    pub category_id: Option<String>,
    /// New amount
    pub amount: Option<f64>,
    /// New date
    pub date: Option<NaiveDate>,
    /// New description; `Some(None)` clears it
    pub description: Option<Option<String>>,
    /// New merchant; `Some(None)` clears it
    pub merchant: Option<Option<String>>,
}

impl TransactionUpdate {
    /// Whether the update touches a field that affects cashback.
    #[must_use]
    pub const fn affects_cashback(&self) -> bool {
        self.card_id.is_some() || self.category_id.is_some() || self.amount.is_some() || self.date.is_some()
    }
}

/// A stored transaction together with how its cashback was priced.
#[derive(Debug, Clone, PartialEq)]
pub struct AddedTransaction {
    /// The stored record
    pub transaction: transaction::Model,
    /// Engine output for the record
    pub cashback: CashbackResult,
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Prices a spend against `others`, using the window the category's cap resets on.
fn price(
    catalog: &CardCatalog,
    settings: &Settings,
    amount: f64,
    card_id: &str,
    category_id: &str,
    date: NaiveDate,
    others: &[transaction::Model],
) -> Result<(f64, CashbackResult)> {
    let category = validate_category(catalog, card_id, category_id)?;
    let rate = category.cashback_rate;

    let cashback = match cap_window(category, date, settings.statement_anchor_day) {
        Some(window) => calculate_cashback(catalog, amount, card_id, category_id, others, &window),
        None => CashbackResult {
            cashback_earned: amount * rate / 100.0,
            cap_reached: false,
            remaining_cap: None,
        },
    };
    Ok((rate, cashback))
}

/// Retrieves every stored transaction, oldest spend first.
#[instrument(skip(db))]
pub async fn get_all_transactions<C>(db: &C) -> Result<Vec<transaction::Model>>
where
    C: ConnectionTrait,
{
    Transaction::find()
        .order_by_asc(transaction::Column::Date)
        .order_by_asc(transaction::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a transaction by id, `None` if it does not exist.
#[instrument(skip(db))]
pub async fn get_transaction_by_id<C>(db: &C, id: Uuid) -> Result<Option<transaction::Model>>
where
    C: ConnectionTrait,
{
    Transaction::find_by_id(id).one(db).await.map_err(Into::into)
}

/// Validates, prices and stores a new transaction.
///
/// # Errors
/// Returns `Error::InvalidAmount` for non-positive or non-finite amounts,
/// `Error::CardNotFound` / `Error::CategoryNotFound` for ids outside the catalog, and
/// database errors from the store.
#[instrument(skip(db, catalog, settings))]
pub async fn add_transaction(
    db: &DatabaseConnection,
    catalog: &CardCatalog,
    settings: &Settings,
    new: NewTransaction,
) -> Result<AddedTransaction> {
    let amount = validate_amount(new.amount)?;
    validate_category(catalog, &new.card_id, &new.category_id)?;

    let txn = db.begin().await?;
    let existing = get_all_transactions(&txn).await?;
    let (rate, cashback) = price(
        catalog,
        settings,
        amount,
        &new.card_id,
        &new.category_id,
        new.date,
        &existing,
    )?;

    let now = Utc::now();
    let model = transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        card_id: Set(new.card_id),
        category_id: Set(new.category_id),
        amount: Set(amount),
        cashback_rate: Set(rate),
        cashback_earned: Set(cashback.cashback_earned),
        date: Set(new.date),
        description: Set(normalize_text(new.description)),
        merchant: Set(normalize_text(new.merchant)),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let transaction = model.insert(&txn).await?;
    txn.commit().await?;
    info!(
        "Recorded transaction {} on {}/{}: amount {:.2}, cashback {:.2}{}",
        transaction.id,
        transaction.card_id,
        transaction.category_id,
        transaction.amount,
        transaction.cashback_earned,
        if cashback.cap_reached { " (cap reached)" } else { "" }
    );

    Ok(AddedTransaction {
        transaction,
        cashback,
    })
}

/// Applies `update` to a stored transaction.
///
/// When the amount, card, category or date changes the transaction is repriced against
/// every other stored transaction and its rate snapshot is refreshed.
///
/// # Errors
/// Returns `Error::TransactionNotFound` if `id` is unknown, plus the validation errors of
/// [`add_transaction`] for the changed fields.
#[instrument(skip(db, catalog, settings))]
pub async fn update_transaction(
    db: &DatabaseConnection,
    catalog: &CardCatalog,
    settings: &Settings,
    id: Uuid,
    update: TransactionUpdate,
) -> Result<transaction::Model> {
    let txn = db.begin().await?;
    let current = get_transaction_by_id(&txn, id)
        .await?
        .ok_or(Error::TransactionNotFound { id })?;

    let reprice = update.affects_cashback();
    let amount = match update.amount {
        Some(amount) => validate_amount(amount)?,
        None => current.amount,
    };
    let card_id = update.card_id.unwrap_or_else(|| current.card_id.clone());
    let category_id = update.category_id.unwrap_or_else(|| current.category_id.clone());
    let date = update.date.unwrap_or(current.date);

    let mut active_model: transaction::ActiveModel = current.into();

    if reprice {
        let others: Vec<transaction::Model> = get_all_transactions(&txn)
            .await?
            .into_iter()
            .filter(|t| t.id != id)
            .collect();
        let (rate, cashback) = price(catalog, settings, amount, &card_id, &category_id, date, &others)?;
        debug!(
            "Repriced transaction {}: cashback {:.2}",
            id, cashback.cashback_earned
        );
        active_model.cashback_rate = Set(rate);
        active_model.cashback_earned = Set(cashback.cashback_earned);
    }

    active_model.amount = Set(amount);
    active_model.card_id = Set(card_id);
    active_model.category_id = Set(category_id);
    active_model.date = Set(date);
    if let Some(description) = update.description {
        active_model.description = Set(normalize_text(description));
    }
    if let Some(merchant) = update.merchant {
        active_model.merchant = Set(normalize_text(merchant));
    }
    active_model.updated_at = Set(Utc::now());

    let updated = active_model.update(&txn).await?;
    txn.commit().await?;
    info!("Updated transaction {}", updated.id);
    Ok(updated)
}

/// Permanently deletes a transaction.
///
/// # Errors
/// Returns `Error::TransactionNotFound` if nothing was deleted.
#[instrument(skip(db))]
pub async fn delete_transaction<C>(db: &C, id: Uuid) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Transaction::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::TransactionNotFound { id });
    }
    info!("Deleted transaction {}", id);
    Ok(())
}

/// Deletes every transaction. Returns how many were removed.
#[instrument(skip(db))]
pub async fn clear_transactions<C>(db: &C) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = Transaction::delete_many().exec(db).await?;
    info!("Cleared {} transactions", result.rows_affected);
    Ok(result.rows_affected)
}

/// Inserts a transaction exactly as given, without repricing. Used by import.
#[instrument(skip(db, model), fields(id = %model.id))]
pub async fn insert_raw<C>(db: &C, model: transaction::Model) -> Result<()>
where
    C: ConnectionTrait,
{
    let active_model: transaction::ActiveModel = model.into();
    Transaction::insert(active_model).exec(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_add_transaction_prices_and_stores() -> Result<()> {
        let (db, first) = setup_with_transaction().await?;

        assert_eq!(first.amount, 800.0);
        assert_eq!(first.cashback_rate, 25.0);
        assert_eq!(first.cashback_earned, 200.0);

        let stored = get_transaction_by_id(&db, first.id).await?.unwrap();
        assert_eq!(stored, first);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_transaction_applies_cap() -> Result<()> {
        let (db, _) = setup_with_transaction().await?;

        let second = create_test_transaction(&db, "AXIS_AIRTEL", "airtel_recharge", 800.0, sample_date()).await?;
        assert_eq!(second.transaction.cashback_earned, 50.0);
        assert!(second.cashback.cap_reached);
        assert_eq!(second.cashback.remaining_cap, Some(0.0));

        let third = create_test_transaction(&db, "AXIS_AIRTEL", "airtel_recharge", 100.0, sample_date()).await?;
        assert_eq!(third.transaction.cashback_earned, 0.0);
        assert!(third.cashback.cap_reached);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_adds_share_one_cap() -> Result<()> {
        let db = setup_test_db().await?;

        let (a, b) = tokio::join!(
            create_test_transaction(&db, "AXIS_AIRTEL", "airtel_recharge", 800.0, sample_date()),
            create_test_transaction(&db, "AXIS_AIRTEL", "airtel_recharge", 800.0, sample_date()),
        );
        let (a, b) = (a?, b?);

        let mut earned = [a.transaction.cashback_earned, b.transaction.cashback_earned];
        earned.sort_by(f64::total_cmp);
        assert_eq!(earned, [50.0, 200.0]);
        assert!(a.cashback.cap_reached || b.cashback.cap_reached);

        let stored: f64 = get_all_transactions(&db)
            .await?
            .iter()
            .map(|t| t.cashback_earned)
            .sum();
        assert_eq!(stored, 250.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_add_and_update_stay_within_cap() -> Result<()> {
        let (db, first) = setup_with_transaction().await?;
        let catalog = CardCatalog::builtin();
        let settings = Settings::default();
        let update = TransactionUpdate {
            amount: Some(1000.0),
            ..Default::default()
        };

        let (updated, added) = tokio::join!(
            update_transaction(&db, &catalog, &settings, first.id, update),
            create_test_transaction(&db, "AXIS_AIRTEL", "airtel_recharge", 800.0, sample_date()),
        );
        let total = updated?.cashback_earned + added?.transaction.cashback_earned;
        assert!(total <= 250.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_monthly_cap_resets_next_statement_cycle() -> Result<()> {
        let (db, _) = setup_with_transaction().await?;
        create_test_transaction(&db, "AXIS_AIRTEL", "airtel_recharge", 800.0, sample_date()).await?;

        // sample date is 15 May; with anchor 12 the next cycle starts 12 June
        let next_cycle = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let fresh = create_test_transaction(&db, "AXIS_AIRTEL", "airtel_recharge", 800.0, next_cycle).await?;
        assert_eq!(fresh.transaction.cashback_earned, 200.0);
        assert!(!fresh.cashback.cap_reached);
        Ok(())
    }

    #[tokio::test]
    async fn test_quarterly_cap_spans_statement_cycles() -> Result<()> {
        let db = setup_test_db().await?;
        let april = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let june = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();

        // 7.5% of 50_000 = 3750 of the 4000 cap
        create_test_transaction(&db, "FLIPKART_AXIS", "myntra", 50_000.0, april).await?;
        let later = create_test_transaction(&db, "FLIPKART_AXIS", "myntra", 10_000.0, june).await?;
        assert_eq!(later.transaction.cashback_earned, 250.0);
        assert!(later.cashback.cap_reached);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_transaction_rejects_invalid_input() -> Result<()> {
        let db = setup_test_db().await?;

        let negative = create_test_transaction(&db, "AXIS_AIRTEL", "other_spends", -10.0, sample_date()).await;
        assert!(matches!(negative, Err(Error::InvalidAmount { .. })));

        let zero = create_test_transaction(&db, "AXIS_AIRTEL", "other_spends", 0.0, sample_date()).await;
        assert!(matches!(zero, Err(Error::InvalidAmount { .. })));

        let card = create_test_transaction(&db, "NOPE", "other_spends", 10.0, sample_date()).await;
        assert!(matches!(card, Err(Error::CardNotFound { .. })));

        let category = create_test_transaction(&db, "AXIS_AIRTEL", "myntra", 10.0, sample_date()).await;
        assert!(matches!(category, Err(Error::CategoryNotFound { .. })));

        assert!(get_all_transactions(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_add_transaction_normalizes_text_and_amount() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = new_transaction("AXIS_AIRTEL", "other_spends", 99.999, sample_date());
        input.description = Some("  weekly shop ".to_string());
        input.merchant = Some("   ".to_string());

        let added = add_transaction(&db, &CardCatalog::builtin(), &Settings::default(), input).await?;
        assert_eq!(added.transaction.amount, 100.0);
        assert_eq!(added.transaction.cashback_earned, 1.0);
        assert_eq!(added.transaction.description.as_deref(), Some("weekly shop"));
        assert!(added.transaction.merchant.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_get_all_transactions_ordered_by_date() -> Result<()> {
        let db = setup_test_db().await?;
        let late = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let early = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        create_test_transaction(&db, "AXIS_AIRTEL", "other_spends", 10.0, late).await?;
        create_test_transaction(&db, "AXIS_AIRTEL", "other_spends", 20.0, early).await?;

        let all = get_all_transactions(&db).await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].date, early);
        assert_eq!(all[1].date, late);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_description_keeps_cashback() -> Result<()> {
        let (db, first) = setup_with_transaction().await?;
        // Exhaust the cap with a second transaction
        create_test_transaction(&db, "AXIS_AIRTEL", "airtel_recharge", 800.0, sample_date()).await?;

        let update = TransactionUpdate {
            description: Some(Some("Broadband".to_string())),
            ..Default::default()
        };
        let updated =
            update_transaction(&db, &CardCatalog::builtin(), &Settings::default(), first.id, update).await?;
        assert_eq!(updated.description.as_deref(), Some("Broadband"));
        assert_eq!(updated.cashback_earned, 200.0);
        assert!(updated.updated_at >= first.updated_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_amount_reprices_against_others() -> Result<()> {
        let (db, first) = setup_with_transaction().await?;
        let second = create_test_transaction(&db, "AXIS_AIRTEL", "airtel_recharge", 800.0, sample_date()).await?;
        assert_eq!(second.transaction.cashback_earned, 50.0);

        // Shrinking the first transaction frees cap, but only the edited one is repriced
        let update = TransactionUpdate {
            amount: Some(400.0),
            ..Default::default()
        };
        let updated =
            update_transaction(&db, &CardCatalog::builtin(), &Settings::default(), first.id, update).await?;
        assert_eq!(updated.amount, 400.0);
        assert_eq!(updated.cashback_earned, 100.0);

        let untouched = get_transaction_by_id(&db, second.transaction.id).await?.unwrap();
        assert_eq!(untouched.cashback_earned, 50.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_category_refreshes_rate() -> Result<()> {
        let (db, first) = setup_with_transaction().await?;

        let update = TransactionUpdate {
            category_id: Some("other_spends".to_string()),
            ..Default::default()
        };
        let updated =
            update_transaction(&db, &CardCatalog::builtin(), &Settings::default(), first.id, update).await?;
        assert_eq!(updated.category_id, "other_spends");
        assert_eq!(updated.cashback_rate, 1.0);
        assert_eq!(updated.cashback_earned, 8.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_transaction() -> Result<()> {
        let db = setup_test_db().await?;
        let result = update_transaction(
            &db,
            &CardCatalog::builtin(),
            &Settings::default(),
            Uuid::new_v4(),
            TransactionUpdate::default(),
        )
        .await;
        assert!(matches!(result, Err(Error::TransactionNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_transaction() -> Result<()> {
        let (db, first) = setup_with_transaction().await?;

        delete_transaction(&db, first.id).await?;
        assert!(get_transaction_by_id(&db, first.id).await?.is_none());

        let again = delete_transaction(&db, first.id).await;
        assert!(matches!(again, Err(Error::TransactionNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_frees_cap_for_later_adds() -> Result<()> {
        let (db, first) = setup_with_transaction().await?;
        create_test_transaction(&db, "AXIS_AIRTEL", "airtel_recharge", 800.0, sample_date()).await?;
        delete_transaction(&db, first.id).await?;

        // 50 consumed by the remaining transaction
        let next = create_test_transaction(&db, "AXIS_AIRTEL", "airtel_recharge", 800.0, sample_date()).await?;
        assert_eq!(next.transaction.cashback_earned, 200.0);
        assert_eq!(next.cashback.remaining_cap, Some(0.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_transactions() -> Result<()> {
        let (db, _) = setup_with_transaction().await?;
        create_test_transaction(&db, "FLIPKART_AXIS", "flipkart", 100.0, sample_date()).await?;

        assert_eq!(clear_transactions(&db).await?, 2);
        assert!(get_all_transactions(&db).await?.is_empty());
        Ok(())
    }
}
