//! Persisted user settings.
//!
//! `config.toml` provides defaults; changes made at runtime are stored as a JSON document
//! under the `settings` key of the `system_state` table and take precedence.

use crate::{
    config::Settings,
    core::system_state::{get_value, remove_value, set_value},
    errors::Result,
};
use sea_orm::ConnectionTrait;
use tracing::{info, warn};

const SETTINGS_KEY: &str = "settings";

/// Reads the stored settings, `None` if nothing has been saved yet.
///
/// A stored document that no longer parses is logged and ignored.
pub async fn load_settings<C>(db: &C) -> Result<Option<Settings>>
where
    C: ConnectionTrait,
{
    let Some(raw) = get_value(db, SETTINGS_KEY).await? else {
        return Ok(None);
    };

    match serde_json::from_str::<Settings>(&raw) {
        Ok(settings) if settings.validate().is_ok() => Ok(Some(settings)),
        Ok(_) => {
            warn!("Stored settings are out of range, ignoring them");
            Ok(None)
        }
        Err(e) => {
            warn!("Failed to parse stored settings, ignoring them: {}", e);
            Ok(None)
        }
    }
}

/// Validates and stores `settings`.
///
/// # Errors
/// Returns `Error::Config` for out-of-range values, or a database error.
pub async fn save_settings<C>(db: &C, settings: &Settings) -> Result<()>
where
    C: ConnectionTrait,
{
    settings.validate()?;
    let json = serde_json::to_string(settings)?;
    set_value(db, SETTINGS_KEY, json).await?;
    info!("Saved settings");
    Ok(())
}

/// Forgets the stored settings so the `config.toml` defaults apply again.
pub async fn reset_settings<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    if remove_value(db, SETTINGS_KEY).await? {
        info!("Settings reset to defaults");
    }
    Ok(())
}

/// The stored settings if any, otherwise `defaults`.
pub async fn effective_settings<C>(db: &C, defaults: &Settings) -> Result<Settings>
where
    C: ConnectionTrait,
{
    Ok(load_settings(db).await?.unwrap_or_else(|| defaults.clone()))
}
