//! Unified error type for the cashback tracker.
//!
//! Pure computations (cycle resolution, cashback, summaries) never fail; errors come
//! from input validation at the store boundary, configuration loading and persistence.

use thiserror::Error;
use uuid::Uuid;

/// Every failure the crate can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read, parsed or validated
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying SeaORM / SQLite failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Transaction amount is zero, negative or not a finite number
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Card id does not resolve in the catalog
    #[error("Card not found: {card_id}")]
    CardNotFound {
        /// The unknown card id
        card_id: String,
    },

    /// Category id does not exist on the given card
    #[error("Category '{category_id}' not found on card {card_id}")]
    CategoryNotFound {
        /// Card that was searched
        card_id: String,
        /// The unknown category id
        category_id: String,
    },

    /// No stored transaction has this id
    #[error("Transaction not found: {id}")]
    TransactionNotFound {
        /// The missing transaction id
        id: Uuid,
    },

    /// No stored budget has this id
    #[error("Budget not found: {id}")]
    BudgetNotFound {
        /// The missing budget id
        id: Uuid,
    },

    /// No stored recurring transaction has this id
    #[error("Recurring transaction not found: {id}")]
    RecurringNotFound {
        /// The missing recurring transaction id
        id: Uuid,
    },

    /// Alert threshold outside 0-100
    #[error("Invalid alert threshold: {threshold}")]
    InvalidThreshold {
        /// The rejected threshold
        threshold: f64,
    },

    /// A date range ends before it starts
    #[error("Invalid date range: {start} to {end}")]
    InvalidDateRange {
        /// First day
        start: chrono::NaiveDate,
        /// Last day
        end: chrono::NaiveDate,
    },

    /// Import payload is missing required fields
    #[error("Invalid import data: {message}")]
    InvalidImport {
        /// Why the payload was rejected
        message: String,
    },

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writer failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
