//! Transaction entity - one spend event on a card.
//!
//! The cashback rate and earned cashback are snapshots taken when the transaction is
//! recorded; catalog changes never rewrite them. `date` is the calendar day of the spend and
//! is what cycle membership is tested against, not `created_at`.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier, generated at creation
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Card the spend was made on
    pub card_id: String,
    /// Category within the card
    pub category_id: String,
    /// Amount spent, rounded to 2 decimals
    pub amount: f64,
    /// Cashback percentage applied when the transaction was recorded
    pub cashback_rate: f64,
    /// Cashback credited to this transaction
    pub cashback_earned: f64,
    /// Day the spend happened
    pub date: Date,
    /// Optional free-text description
    pub description: Option<String>,
    /// Optional merchant name
    pub merchant: Option<String>,
    /// When the record was created
    pub created_at: DateTimeUtc,
    /// When the record was last modified
    pub updated_at: DateTimeUtc,
}

/// Transactions reference the catalog by id only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
