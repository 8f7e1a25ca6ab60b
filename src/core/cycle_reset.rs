//! Statement cycle rollover detection.
//!
//! Caps reset implicitly because every calculation filters by the current window, so
//! nothing has to be rewritten when a new cycle begins. This module only remembers the
//! start of the last statement cycle it saw in the `system_state` table, so callers can
//! announce the reset exactly once.

use crate::{
    config::Settings,
    core::{
        cycle::{CycleDateRange, statement_cycle},
        system_state::{get_value, set_value},
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::ConnectionTrait;
use tracing::{info, instrument, warn};

const LAST_CYCLE_START_KEY: &str = "last_cycle_start";

/// Retrieves the start date of the last statement cycle recorded.
///
/// # Returns
/// * `Ok(Some(date))` - Start of the last cycle seen
/// * `Ok(None)` - Nothing recorded yet
pub async fn get_last_cycle_start<C>(db: &C) -> Result<Option<NaiveDate>>
where
    C: ConnectionTrait,
{
    match get_value(db, LAST_CYCLE_START_KEY).await? {
        Some(value) => NaiveDate::parse_from_str(&value, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| Error::Config {
                message: format!("Failed to parse last cycle start: {e}"),
            }),
        None => Ok(None),
    }
}

async fn set_last_cycle_start<C>(db: &C, date: NaiveDate) -> Result<()>
where
    C: ConnectionTrait,
{
    set_value(db, LAST_CYCLE_START_KEY, date.format("%Y-%m-%d").to_string()).await
}

/// Checks whether `today` belongs to a statement cycle that has not been seen before.
///
/// The first call on an empty store only records the current cycle. Later calls return
/// the new cycle once, the first time they run inside it. An unreadable stored value is
/// logged and replaced as if nothing had been recorded.
///
/// # Returns
/// * `Ok(Some(cycle))` - A new cycle started since the last check
/// * `Ok(None)` - Still in the recorded cycle, or nothing was recorded before
#[instrument(skip(db, settings))]
pub async fn check_cycle_reset<C>(
    db: &C,
    settings: &Settings,
    today: NaiveDate,
) -> Result<Option<CycleDateRange>>
where
    C: ConnectionTrait,
{
    let cycle = statement_cycle(today, settings.statement_anchor_day);
    let last_start = match get_last_cycle_start(db).await {
        Ok(start) => start,
        Err(Error::Config { message }) => {
            warn!("Ignoring stored cycle start: {}", message);
            None
        }
        Err(e) => return Err(e),
    };

    if last_start == Some(cycle.start) {
        return Ok(None);
    }

    set_last_cycle_start(db, cycle.start).await?;

    match last_start {
        Some(previous) if previous < cycle.start => {
            info!("New statement cycle started: {}", cycle.label);
            Ok(Some(cycle))
        }
        _ => Ok(None),
    }
}
