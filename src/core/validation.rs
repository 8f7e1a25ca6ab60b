//! Input checks applied before a transaction reaches the cashback engine.

use crate::config::catalog::{CardCatalog, CategoryConfig};
use crate::errors::{Error, Result};

/// Rounds a currency value to 2 decimals.
#[must_use]
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Accepts a strictly positive, finite amount and rounds it to 2 decimals.
///
/// # Errors
/// Returns `Error::InvalidAmount` for zero, negative, NaN or infinite amounts, and for
/// amounts that round to zero.
pub fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    let rounded = round_currency(amount);
    if rounded <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(rounded)
}

/// Resolves a card and category pair, failing with a typed error if either is unknown.
///
/// # Errors
/// Returns `Error::CardNotFound` or `Error::CategoryNotFound`.
pub fn validate_category<'a>(
    catalog: &'a CardCatalog,
    card_id: &str,
    category_id: &str,
) -> Result<&'a CategoryConfig> {
    let card = catalog
        .get_card_config(card_id)
        .ok_or_else(|| Error::CardNotFound {
            card_id: card_id.to_string(),
        })?;
    card.category(category_id)
        .ok_or_else(|| Error::CategoryNotFound {
            card_id: card_id.to_string(),
            category_id: category_id.to_string(),
        })
}
