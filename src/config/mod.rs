/// Card catalog: cards, categories, rates and caps
pub mod catalog;

/// Database connection and table creation
pub mod database;

/// Typed settings and `config.toml` loading
pub mod settings;

pub use catalog::{CapPeriod, CardCatalog, CardConfig, CategoryConfig};
pub use settings::{AppConfig, NotificationSettings, ReminderSchedule, Settings};
