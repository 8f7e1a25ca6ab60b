/// Spend analytics, optimization hints and category suggestions
pub mod analytics;
/// Per-category spending budgets
pub mod budget;
/// Cashback calculation with per-category caps
pub mod cashback;
/// Billing cycle resolution
pub mod cycle;
/// Detection of a new statement cycle
pub mod cycle_reset;
/// JSON/CSV export, import and backups
pub mod export;
/// Transaction list filtering
pub mod filter;
/// Repeating transactions on a fixed frequency
pub mod recurring;
/// Plain-text formatting of summaries and transactions
pub mod report;
/// Persisted user settings
pub mod settings;
/// Per-card cashback summaries
pub mod summary;
/// Key-value storage in the `system_state` table
pub mod system_state;
/// Transaction store
pub mod transaction;
/// Input validation at the store boundary
pub mod validation;
