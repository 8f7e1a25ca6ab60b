//! Key-value storage on top of the `system_state` table.
//!
//! Settings, the last seen statement cycle and backups all live here as strings.

use crate::{
    entities::{SystemState, system_state},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, instrument};

/// Reads the value stored under `key`.
#[instrument(skip(db))]
pub async fn get_value<C>(db: &C, key: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;
    Ok(state.map(|s| s.value))
}

/// Stores `value` under `key`, replacing any previous value.
#[instrument(skip(db, value))]
pub async fn set_value<C>(db: &C, key: &str, value: String) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(value);
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        let new_state = system_state::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            updated_at: Set(now),
            ..Default::default()
        };
        new_state.insert(db).await?;
        debug!("Created system state key {}", key);
    }

    Ok(())
}

/// Keys starting with `prefix`, in ascending order.
#[instrument(skip(db))]
pub async fn keys_with_prefix<C>(db: &C, prefix: &str) -> Result<Vec<String>>
where
    C: ConnectionTrait,
{
    let states = SystemState::find()
        .filter(system_state::Column::Key.starts_with(prefix))
        .order_by_asc(system_state::Column::Key)
        .all(db)
        .await?;
    Ok(states
        .into_iter()
        .map(|s| s.key)
        .filter(|key| key.starts_with(prefix))
        .collect())
}

/// Removes `key`. Returns whether anything was deleted.
#[instrument(skip(db))]
pub async fn remove_value<C>(db: &C, key: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = SystemState::delete_many()
        .filter(system_state::Column::Key.eq(key))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Removes every key.
#[instrument(skip(db))]
pub async fn clear_all<C>(db: &C) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = SystemState::delete_many().exec(db).await?;
    Ok(result.rows_affected)
}
