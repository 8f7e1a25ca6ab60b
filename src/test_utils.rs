//! Shared test utilities.
//!
//! Helpers for setting up in-memory databases and building transactions with
//! sensible defaults.

use crate::{
    config::{CardCatalog, Settings},
    core::transaction::{self, AddedTransaction, NewTransaction},
    entities,
    errors::Result,
};
use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = crate::config::database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A fixed mid-quarter date used where the exact day does not matter.
#[must_use]
pub fn sample_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 15).unwrap_or_default()
}

/// Builds an unsaved transaction with the given values.
///
/// # Defaults
/// * `cashback_rate`: the built-in catalog rate for the category, or 0
/// * `description`, `merchant`: None
/// * timestamps: 2024-01-01 00:00 UTC
#[must_use]
pub fn make_transaction(
    card_id: &str,
    category_id: &str,
    amount: f64,
    cashback_earned: f64,
    date: NaiveDate,
) -> entities::transaction::Model {
    let cashback_rate = CardCatalog::builtin()
        .get_category_config(card_id, category_id)
        .map_or(0.0, |c| c.cashback_rate);
    let timestamp = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();

    entities::transaction::Model {
        id: Uuid::new_v4(),
        card_id: card_id.to_string(),
        category_id: category_id.to_string(),
        amount,
        cashback_rate,
        cashback_earned,
        date,
        description: None,
        merchant: None,
        created_at: timestamp,
        updated_at: timestamp,
    }
}

/// Input for a new transaction with no description or merchant.
#[must_use]
pub fn new_transaction(card_id: &str, category_id: &str, amount: f64, date: NaiveDate) -> NewTransaction {
    NewTransaction {
        card_id: card_id.to_string(),
        category_id: category_id.to_string(),
        amount,
        date,
        description: None,
        merchant: None,
    }
}

/// Records a transaction through the store with the built-in catalog and default settings.
pub async fn create_test_transaction(
    db: &DatabaseConnection,
    card_id: &str,
    category_id: &str,
    amount: f64,
    date: NaiveDate,
) -> Result<AddedTransaction> {
    transaction::add_transaction(
        db,
        &CardCatalog::builtin(),
        &Settings::default(),
        new_transaction(card_id, category_id, amount, date),
    )
    .await
}

/// Sets up a database holding one recharge transaction of 800 on the sample date.
/// Returns (db, transaction) for common test scenarios.
pub async fn setup_with_transaction() -> Result<(DatabaseConnection, entities::transaction::Model)> {
    let db = setup_test_db().await?;
    let added = create_test_transaction(&db, "AXIS_AIRTEL", "airtel_recharge", 800.0, sample_date()).await?;
    Ok((db, added.transaction))
}
