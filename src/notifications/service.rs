//! Notification service - builds user-facing messages and applies the user's toggles.

use super::{Notification, Notifier};
use crate::{
    config::{CardCatalog, NotificationSettings},
    core::{report::format_currency, transaction::AddedTransaction},
};
use tracing::debug;

/// Sends notifications through a [`Notifier`], honouring [`NotificationSettings`].
///
/// Methods for optional notifications return whether anything was sent.
#[derive(Debug)]
pub struct NotificationService<N: Notifier> {
    notifier: N,
    settings: NotificationSettings,
    currency: String,
}

impl<N: Notifier> NotificationService<N> {
    /// Creates a service delivering through `notifier`.
    pub fn new(notifier: N, settings: NotificationSettings, currency: impl Into<String>) -> Self {
        Self {
            notifier,
            settings,
            currency: currency.into(),
        }
    }

    /// Current toggles.
    pub const fn settings(&self) -> &NotificationSettings {
        &self.settings
    }

    /// Replaces the toggles.
    pub fn update_settings(&mut self, settings: NotificationSettings) {
        self.settings = settings;
    }

    /// The underlying notifier.
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    fn send(&self, title: &str, body: String, tag: &str) {
        debug!("Sending {} notification", tag);
        self.notifier.notify(&Notification {
            title: title.to_string(),
            body,
            tag: tag.to_string(),
        });
    }

    /// Sends a test notification.
    pub fn test_notification(&self) {
        self.send(
            "Test Notification",
            "This is a test notification from Cashback Tracker!".to_string(),
            "test-notification",
        );
    }

    /// Reminds the user to log today's transactions.
    pub fn daily_reminder(&self) {
        self.send(
            "Track Your Spending!",
            "Don't forget to log today's transactions and maximize your cashback!".to_string(),
            "daily-reminder",
        );
    }

    /// Warns that `percentage` of a category's cap is used.
    pub fn cap_warning(&self, category_name: &str, percentage: f64) -> bool {
        if !self.settings.cap_warning {
            return false;
        }
        self.send(
            "Cashback Cap Warning",
            format!("You've used {percentage:.0}% of your {category_name} cap!"),
            "cap-warning",
        );
        true
    }

    /// Announces an unlocked achievement.
    pub fn achievement(&self, title: &str) {
        self.send(
            "Achievement Unlocked!",
            format!("Congratulations! You unlocked: {title}"),
            "achievement",
        );
    }

    /// Announces a new billing cycle.
    pub fn cycle_reset(&self) -> bool {
        if !self.settings.cycle_reset {
            return false;
        }
        self.send(
            "New Billing Cycle Started!",
            "Your cashback caps have been reset. Start tracking this cycle!".to_string(),
            "cycle-reset",
        );
        true
    }

    /// Sends the daily summary.
    pub fn daily_summary(&self, cashback: f64, transactions: usize) -> bool {
        if !self.settings.daily_summary {
            return false;
        }
        self.send(
            "Daily Summary",
            format!(
                "Today: {} cashback from {transactions} transactions",
                format_currency(cashback, &self.currency)
            ),
            "daily-summary",
        );
        true
    }

    /// Sends the weekly summary.
    pub fn weekly_summary(&self, cashback: f64, transactions: usize) -> bool {
        if !self.settings.weekly_summary {
            return false;
        }
        self.send(
            "Weekly Summary",
            format!(
                "This week: {} cashback from {transactions} transactions",
                format_currency(cashback, &self.currency)
            ),
            "weekly-summary",
        );
        true
    }
}

/// Raises a cap warning after a transaction was recorded, if warranted.
///
/// Warns when the transaction was cut by the cap, or when it pushed cap usage from below
/// the configured threshold to at or above it. Uncapped categories never warn.
pub fn notify_cap_status<N: Notifier>(
    service: &NotificationService<N>,
    catalog: &CardCatalog,
    added: &AddedTransaction,
) -> bool {
    let t = &added.transaction;
    let Some(category) = catalog.get_category_config(&t.card_id, &t.category_id) else {
        return false;
    };
    let (Some(cap), Some(remaining)) = (category.cap(), added.cashback.remaining_cap) else {
        return false;
    };
    if cap <= 0.0 {
        return false;
    }

    let used_after = (cap - remaining) / cap * 100.0;
    let used_before = (cap - remaining - added.cashback.cashback_earned) / cap * 100.0;
    let threshold = service.settings().cap_warning_threshold;

    if added.cashback.cap_reached {
        service.cap_warning(&category.name, 100.0)
    } else if used_before < threshold && used_after >= threshold {
        service.cap_warning(&category.name, used_after)
    } else {
        false
    }
}
