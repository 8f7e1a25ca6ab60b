//! Data export, import and backups.
//!
//! A snapshot bundles every transaction with the effective settings. Snapshots serialize to
//! JSON for import and backups; the CSV export is one-way, for spreadsheets.

use crate::{
    config::{Settings, settings::DateFormat},
    core::{
        settings::{effective_settings, save_settings},
        system_state::{self, get_value, keys_with_prefix, remove_value, set_value},
        transaction::{clear_transactions, get_all_transactions, insert_raw},
    },
    entities::transaction,
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Version tag written into every snapshot.
pub const EXPORT_VERSION: &str = "1.0.0";

const LAST_BACKUP_KEY: &str = "last_backup";
const BACKUP_KEY_PREFIX: &str = "backup_";

/// Backups kept; older ones are removed when a new one is created.
pub const MAX_BACKUPS: usize = 5;

const CSV_HEADERS: [&str; 8] = [
    "Date",
    "Card",
    "Category",
    "Amount",
    "Cashback Rate",
    "Cashback Earned",
    "Description",
    "Merchant",
];

/// Everything needed to rebuild the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportData {
    /// Snapshot format version
    pub version: String,
    /// When the snapshot was taken
    pub export_date: DateTime<Utc>,
    /// Every stored transaction
    pub transactions: Vec<transaction::Model>,
    /// Settings in effect at export time
    pub settings: Settings,
}

/// Takes a snapshot of the store. `defaults` stand in for settings that were never saved.
pub async fn export_data(db: &DatabaseConnection, defaults: &Settings) -> Result<ExportData> {
    Ok(ExportData {
        version: EXPORT_VERSION.to_string(),
        export_date: Utc::now(),
        transactions: get_all_transactions(db).await?,
        settings: effective_settings(db, defaults).await?,
    })
}

/// Snapshot as pretty-printed JSON.
pub async fn export_to_json(db: &DatabaseConnection, defaults: &Settings) -> Result<String> {
    let data = export_data(db, defaults).await?;
    serde_json::to_string_pretty(&data).map_err(Into::into)
}

/// Renders transactions as CSV with every cell quoted.
///
/// Amounts have 2 decimals and the rate is written as a percentage, e.g. `25%`.
pub fn transactions_to_csv(
    transactions: &[transaction::Model],
    date_format: DateFormat,
) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADERS)?;
    for t in transactions {
        writer.write_record([
            t.date.format(date_format.pattern()).to_string(),
            t.card_id.clone(),
            t.category_id.clone(),
            format!("{:.2}", t.amount),
            format!("{}%", t.cashback_rate),
            format!("{:.2}", t.cashback_earned),
            t.description.clone().unwrap_or_default(),
            t.merchant.clone().unwrap_or_default(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Every stored transaction as CSV.
pub async fn export_to_csv(db: &DatabaseConnection, date_format: DateFormat) -> Result<String> {
    let transactions = get_all_transactions(db).await?;
    transactions_to_csv(&transactions, date_format)
}

/// Replaces all transactions and settings with the snapshot's, atomically.
///
/// Transactions are stored exactly as exported; their cashback is not recalculated.
///
/// Settings are checked with the same rules as [`save_settings`], so a snapshot never
/// stores values that would be ignored on the next load.
///
/// # Errors
/// Returns `Error::InvalidImport` if the snapshot has no version tag or its settings are
/// out of range.
pub async fn import_data(db: &DatabaseConnection, data: ExportData) -> Result<()> {
    if data.version.trim().is_empty() {
        return Err(Error::InvalidImport {
            message: "missing version".to_string(),
        });
    }
    data.settings.validate().map_err(|e| Error::InvalidImport {
        message: e.to_string(),
    })?;

    let count = data.transactions.len();
    let txn = db.begin().await?;
    clear_transactions(&txn).await?;
    for t in data.transactions {
        insert_raw(&txn, t).await?;
    }
    save_settings(&txn, &data.settings).await?;
    txn.commit().await?;

    info!("Imported {} transactions (format {})", count, data.version);
    Ok(())
}

/// Parses a JSON snapshot and imports it.
///
/// # Errors
/// Returns `Error::InvalidImport` when the document is not a snapshot.
pub async fn import_from_json(db: &DatabaseConnection, json: &str) -> Result<()> {
    let data: ExportData = serde_json::from_str(json).map_err(|e| Error::InvalidImport {
        message: e.to_string(),
    })?;
    import_data(db, data).await
}

/// Stores a snapshot under a timestamped key and remembers it as the latest backup.
///
/// Only the newest [`MAX_BACKUPS`] backups are kept.
///
/// # Returns
/// The key the backup was stored under.
pub async fn create_backup(db: &DatabaseConnection, defaults: &Settings) -> Result<String> {
    let data = export_data(db, defaults).await?;
    let key = format!("{BACKUP_KEY_PREFIX}{:013}", data.export_date.timestamp_millis());
    let json = serde_json::to_string(&data)?;

    let txn = db.begin().await?;
    set_value(&txn, &key, json).await?;
    set_value(&txn, LAST_BACKUP_KEY, key.clone()).await?;

    let keys = keys_with_prefix(&txn, BACKUP_KEY_PREFIX).await?;
    let expired = keys.len().saturating_sub(MAX_BACKUPS);
    for old in &keys[..expired] {
        remove_value(&txn, old).await?;
        debug!("Removed old backup {}", old);
    }
    txn.commit().await?;

    info!("Created backup {} with {} transactions", key, data.transactions.len());
    Ok(key)
}

/// Restores the latest backup.
///
/// # Returns
/// * `Ok(true)` - The backup was imported
/// * `Ok(false)` - No backup exists, or the stored backup is unreadable
pub async fn restore_from_backup(db: &DatabaseConnection) -> Result<bool> {
    let Some(key) = get_value(db, LAST_BACKUP_KEY).await? else {
        return Ok(false);
    };
    let Some(json) = get_value(db, &key).await? else {
        warn!("Latest backup {} is missing", key);
        return Ok(false);
    };

    match import_from_json(db, &json).await {
        Ok(()) => {
            info!("Restored backup {}", key);
            Ok(true)
        }
        Err(Error::InvalidImport { message }) => {
            warn!("Backup {} is unreadable: {}", key, message);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Deletes all transactions, settings and backups.
pub async fn clear_all_data(db: &DatabaseConnection) -> Result<()> {
    let txn = db.begin().await?;
    clear_transactions(&txn).await?;
    system_state::clear_all(&txn).await?;
    txn.commit().await?;
    warn!("All data cleared");
    Ok(())
}
