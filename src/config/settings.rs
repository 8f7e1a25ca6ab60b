//! Application settings and `config.toml` loading.
//!
//! Settings are plain typed structs. `config.toml` supplies the defaults (and optionally
//! a card catalog); user changes are persisted separately through
//! [`crate::core::settings`].

use crate::config::catalog::CardCatalog;
use crate::core::cycle::CycleType;
use crate::errors::{Error, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Display order of day and month in formatted dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    /// `DD/MM/YYYY`
    #[serde(rename = "DD/MM/YYYY")]
    DayMonthYear,
    /// `MM/DD/YYYY`
    #[serde(rename = "MM/DD/YYYY")]
    MonthDayYear,
}

impl DateFormat {
    /// The chrono format string for this layout.
    #[must_use]
    pub const fn pattern(self) -> &'static str {
        match self {
            Self::DayMonthYear => "%d/%m/%Y",
            Self::MonthDayYear => "%m/%d/%Y",
        }
    }
}

/// Color theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme
    Light,
    /// Dark theme
    Dark,
    /// Follow the system
    Auto,
}

/// Which notifications the user wants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Warn when a category approaches its cap
    pub cap_warning: bool,
    /// Utilization percentage at which the cap warning fires
    pub cap_warning_threshold: f64,
    /// Send a daily summary
    pub daily_summary: bool,
    /// Send a weekly summary
    pub weekly_summary: bool,
    /// Announce the start of a new statement cycle
    pub cycle_reset: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            cap_warning: true,
            cap_warning_threshold: 80.0,
            daily_summary: false,
            weekly_summary: false,
            cycle_reset: true,
        }
    }
}

/// Times of day for the logging reminders, as `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderSchedule {
    /// Morning reminder time
    pub morning_time: String,
    /// Evening reminder time
    pub evening_time: String,
    /// Whether the scheduler runs at all
    pub enabled: bool,
}

impl Default for ReminderSchedule {
    fn default() -> Self {
        Self {
            morning_time: "09:00".to_string(),
            evening_time: "18:00".to_string(),
            enabled: true,
        }
    }
}

impl ReminderSchedule {
    /// Parses the configured morning and evening times.
    ///
    /// # Errors
    /// Returns `Error::Config` if either time is not `HH:MM`.
    pub fn times(&self) -> Result<(NaiveTime, NaiveTime)> {
        Ok((parse_time(&self.morning_time)?, parse_time(&self.evening_time)?))
    }
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| Error::Config {
        message: format!("Invalid reminder time '{value}': {e}"),
    })
}

/// User-facing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Cycle shown when the dashboard opens
    pub default_cycle: CycleType,
    /// Day of month the card statement starts (1-31)
    pub statement_anchor_day: u32,
    /// Date display format
    pub date_format: DateFormat,
    /// Currency symbol used in messages
    pub currency: String,
    /// Color theme
    pub theme: Theme,
    /// Notification preferences
    pub notifications: NotificationSettings,
    /// Reminder times
    pub reminders: ReminderSchedule,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_cycle: CycleType::Statement,
            statement_anchor_day: 12,
            date_format: DateFormat::DayMonthYear,
            currency: "₹".to_string(),
            theme: Theme::Light,
            notifications: NotificationSettings::default(),
            reminders: ReminderSchedule::default(),
        }
    }
}

impl Settings {
    /// Checks value ranges.
    ///
    /// # Errors
    /// Returns `Error::Config` for an anchor day outside 1-31, a warning threshold
    /// outside 0-100, or malformed reminder times.
    pub fn validate(&self) -> Result<()> {
        if !(1..=31).contains(&self.statement_anchor_day) {
            return Err(Error::Config {
                message: format!(
                    "statement_anchor_day must be between 1 and 31, got {}",
                    self.statement_anchor_day
                ),
            });
        }
        let threshold = self.notifications.cap_warning_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(Error::Config {
                message: format!("cap_warning_threshold must be between 0 and 100, got {threshold}"),
            });
        }
        self.reminders.times()?;
        Ok(())
    }
}

/// Everything read from `config.toml`.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Default settings
    pub settings: Settings,
    /// Card catalog (built-in unless the file lists cards)
    pub catalog: CardCatalog,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    cards: Vec<crate::config::catalog::CardConfig>,
}

/// Parses and validates a `config.toml` document.
///
/// # Errors
/// Returns `Error::Config` when the TOML is malformed or any section fails validation.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    file.settings.validate()?;
    let catalog = if file.cards.is_empty() {
        CardCatalog::builtin()
    } else {
        let catalog = CardCatalog { cards: file.cards };
        catalog.validate()?;
        catalog
    };

    Ok(AppConfig {
        settings: file.settings,
        catalog,
    })
}

/// Loads configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads configuration from `path`, or built-in defaults when the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    if path_ref.exists() {
        load_config(path_ref)
    } else {
        tracing::warn!(
            "No config file at {}, using built-in defaults",
            path_ref.display()
        );
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.statement_anchor_day, 12);
        assert_eq!(settings.default_cycle, CycleType::Statement);
        assert_eq!(settings.notifications.cap_warning_threshold, 80.0);
    }

    #[test]
    fn test_parse_partial_settings() {
        let toml_str = r#"
            [settings]
            default_cycle = "QUARTERLY"
            statement_anchor_day = 5
            date_format = "MM/DD/YYYY"

            [settings.notifications]
            cap_warning_threshold = 90.0
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.settings.default_cycle, CycleType::Quarterly);
        assert_eq!(config.settings.statement_anchor_day, 5);
        assert_eq!(config.settings.date_format, DateFormat::MonthDayYear);
        assert_eq!(config.settings.notifications.cap_warning_threshold, 90.0);
        // untouched fields keep their defaults
        assert!(config.settings.notifications.cap_warning);
        assert_eq!(config.settings.currency, "₹");
        assert_eq!(config.catalog, CardCatalog::builtin());
    }

    #[test]
    fn test_parse_rejects_bad_anchor_day() {
        let toml_str = r#"
            [settings]
            statement_anchor_day = 0
        "#;
        assert!(matches!(parse_config(toml_str), Err(Error::Config { .. })));
    }

    #[test]
    fn test_parse_rejects_bad_reminder_time() {
        let toml_str = r#"
            [settings.reminders]
            morning_time = "9am"
        "#;
        assert!(parse_config(toml_str).is_err());
    }

    #[test]
    fn test_cards_section_replaces_builtin_catalog() {
        let toml_str = r##"
            [[cards]]
            id = "ONLY_CARD"
            name = "Only Card"
            color = "#123456"

            [[cards.categories]]
            id = "all"
            name = "All"
            cashback_rate = 2.0
            cap_period = "UNLIMITED"
        "##;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.catalog.cards.len(), 1);
        assert!(config.catalog.get_card_config("AXIS_AIRTEL").is_none());
    }

    #[test]
    fn test_reminder_times_parse() {
        let schedule = ReminderSchedule::default();
        let (morning, evening) = schedule.times().unwrap();
        assert_eq!(morning, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(evening, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config_or_default("definitely/not/here/config.toml").unwrap();
        assert_eq!(config.settings, Settings::default());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = parse_config(include_str!("../../config.toml")).unwrap();
        assert_eq!(config.settings, Settings::default());
        assert_eq!(config.catalog, CardCatalog::builtin());
    }
}
