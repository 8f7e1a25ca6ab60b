//! Card catalog: the cards, their categories, cashback rates and caps.
//!
//! The catalog is static for the lifetime of the process. A built-in catalog is always
//! available; `config.toml` may replace it with a `[[cards]]` list, which is validated
//! once when it is loaded.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How often a category's cap resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapPeriod {
    /// Resets every statement cycle
    Monthly,
    /// Resets every calendar quarter
    Quarterly,
    /// Never capped
    Unlimited,
}

/// A spend bucket on a card with its own rate and cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Identifier, unique within the card
    pub id: String,
    /// Display name
    pub name: String,
    /// What kind of spend falls into this category
    #[serde(default)]
    pub description: String,
    /// Percentage of spend returned as cashback (0-100)
    pub cashback_rate: f64,
    /// Maximum cashback per cap period, `None` for unlimited
    #[serde(default)]
    pub cap_amount: Option<f64>,
    /// Cap reset period
    pub cap_period: CapPeriod,
}

impl CategoryConfig {
    /// Returns the cap when the category is actually capped.
    #[must_use]
    pub fn cap(&self) -> Option<f64> {
        match self.cap_period {
            CapPeriod::Unlimited => None,
            CapPeriod::Monthly | CapPeriod::Quarterly => self.cap_amount,
        }
    }
}

/// One credit card and its ordered categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardConfig {
    /// Card identifier, e.g. `AXIS_AIRTEL`
    pub id: String,
    /// Display name
    pub name: String,
    /// Accent color as a hex string
    pub color: String,
    /// Categories in display order
    pub categories: Vec<CategoryConfig>,
}

impl CardConfig {
    /// Looks up a category on this card.
    #[must_use]
    pub fn category(&self, category_id: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.id == category_id)
    }
}

/// The full set of configured cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardCatalog {
    /// Cards in display order
    pub cards: Vec<CardConfig>,
}

impl Default for CardCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn category(
    id: &str,
    name: &str,
    description: &str,
    cashback_rate: f64,
    cap_amount: Option<f64>,
    cap_period: CapPeriod,
) -> CategoryConfig {
    CategoryConfig {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        cashback_rate,
        cap_amount,
        cap_period,
    }
}

impl CardCatalog {
    /// The catalog shipped with the application.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            cards: vec![
                CardConfig {
                    id: "AXIS_AIRTEL".to_string(),
                    name: "Axis Airtel Credit Card".to_string(),
                    color: "#FF9800".to_string(),
                    categories: vec![
                        category(
                            "airtel_recharge",
                            "Airtel Recharge/Bill",
                            "Mobile, Broadband, WiFi, DTH via Airtel Thanks app",
                            25.0,
                            Some(250.0),
                            CapPeriod::Monthly,
                        ),
                        category(
                            "utility_bills",
                            "Utility Bills",
                            "Electricity, Water, Gas via Airtel Thanks app",
                            10.0,
                            Some(250.0),
                            CapPeriod::Monthly,
                        ),
                        category(
                            "food_grocery",
                            "Zomato/Swiggy/BigBasket",
                            "Food delivery and grocery",
                            10.0,
                            Some(500.0),
                            CapPeriod::Monthly,
                        ),
                        category(
                            "other_spends",
                            "Other Spends",
                            "All other eligible transactions",
                            1.0,
                            None,
                            CapPeriod::Unlimited,
                        ),
                    ],
                },
                CardConfig {
                    id: "FLIPKART_AXIS".to_string(),
                    name: "Flipkart Axis Credit Card".to_string(),
                    color: "#9C27B0".to_string(),
                    categories: vec![
                        category(
                            "myntra",
                            "Myntra",
                            "Fashion and lifestyle shopping",
                            7.5,
                            Some(4000.0),
                            CapPeriod::Quarterly,
                        ),
                        category(
                            "flipkart",
                            "Flipkart",
                            "E-commerce purchases",
                            5.0,
                            Some(4000.0),
                            CapPeriod::Quarterly,
                        ),
                        category(
                            "cleartrip",
                            "Cleartrip",
                            "Travel bookings",
                            5.0,
                            Some(4000.0),
                            CapPeriod::Quarterly,
                        ),
                        category(
                            "preferred_merchants",
                            "Preferred Merchants",
                            "cult.fit, PVR, Swiggy, Uber",
                            4.0,
                            None,
                            CapPeriod::Unlimited,
                        ),
                        category(
                            "other_transactions",
                            "Other Transactions",
                            "All other eligible transactions",
                            1.0,
                            None,
                            CapPeriod::Unlimited,
                        ),
                    ],
                },
            ],
        }
    }

    /// All cards in display order.
    #[must_use]
    pub fn cards(&self) -> &[CardConfig] {
        &self.cards
    }

    /// Looks up a card by id.
    #[must_use]
    pub fn get_card_config(&self, card_id: &str) -> Option<&CardConfig> {
        self.cards.iter().find(|c| c.id == card_id)
    }

    /// Looks up a category on a card.
    #[must_use]
    pub fn get_category_config(&self, card_id: &str, category_id: &str) -> Option<&CategoryConfig> {
        self.get_card_config(card_id)
            .and_then(|card| card.category(category_id))
    }

    /// Checks the catalog's structural guarantees.
    ///
    /// # Errors
    /// Returns `Error::Config` if card ids or category ids within a card repeat, a rate
    /// falls outside 0-100, a cap is negative, or a capped period has no cap amount.
    pub fn validate(&self) -> Result<()> {
        let mut card_ids = HashSet::new();
        for card in &self.cards {
            if !card_ids.insert(card.id.as_str()) {
                return Err(Error::Config {
                    message: format!("Duplicate card id '{}'", card.id),
                });
            }

            let mut category_ids = HashSet::new();
            for cat in &card.categories {
                if !category_ids.insert(cat.id.as_str()) {
                    return Err(Error::Config {
                        message: format!("Duplicate category id '{}' on card {}", cat.id, card.id),
                    });
                }
                if !(0.0..=100.0).contains(&cat.cashback_rate) {
                    return Err(Error::Config {
                        message: format!(
                            "Cashback rate {} for {}/{} must be between 0 and 100",
                            cat.cashback_rate, card.id, cat.id
                        ),
                    });
                }
                match (cat.cap_period, cat.cap_amount) {
                    (_, Some(cap)) if cap < 0.0 || !cap.is_finite() => {
                        return Err(Error::Config {
                            message: format!("Cap {cap} for {}/{} is invalid", card.id, cat.id),
                        });
                    }
                    (CapPeriod::Monthly | CapPeriod::Quarterly, None) => {
                        return Err(Error::Config {
                            message: format!(
                                "Category {}/{} has a cap period but no cap amount",
                                card.id, cat.id
                            ),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Parses and validates a catalog from a TOML document containing `[[cards]]`.
    ///
    /// # Errors
    /// Returns `Error::Config` when the TOML is malformed or fails validation.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let catalog: Self = toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse card catalog: {e}"),
        })?;
        catalog.validate()?;
        Ok(catalog)
    }
}
