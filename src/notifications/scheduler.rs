//! Reminder scheduler.
//!
//! Owns one background tokio task that wakes once a minute and sends the morning and
//! evening reminders when the wall clock reaches the configured `HH:MM`. Each reminder
//! goes out at most once per day, also across restarts of the task.

use super::{Notifier, service::NotificationService};
use crate::{config::ReminderSchedule, errors::Result};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::{sync::Arc, time::Duration};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info};

const CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Which reminder is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reminder {
    /// The morning reminder
    Morning,
    /// The evening reminder
    Evening,
}

/// Days on which each reminder was last sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderState {
    /// Last day the morning reminder went out
    pub last_morning: Option<NaiveDate>,
    /// Last day the evening reminder went out
    pub last_evening: Option<NaiveDate>,
}

impl ReminderState {
    /// Records that `reminder` was sent on `date`.
    pub fn mark_sent(&mut self, reminder: Reminder, date: NaiveDate) {
        match reminder {
            Reminder::Morning => self.last_morning = Some(date),
            Reminder::Evening => self.last_evening = Some(date),
        }
    }
}

fn same_minute(a: NaiveTime, b: NaiveTime) -> bool {
    a.hour() == b.hour() && a.minute() == b.minute()
}

/// Reminders due at `now`.
///
/// A reminder is due when `now` falls in its configured minute and it has not been sent
/// today. Nothing is due when the schedule is disabled or its times do not parse.
#[must_use]
pub fn due_reminders(
    schedule: &ReminderSchedule,
    state: &ReminderState,
    now: NaiveDateTime,
) -> Vec<Reminder> {
    if !schedule.enabled {
        return Vec::new();
    }
    let Ok((morning, evening)) = schedule.times() else {
        return Vec::new();
    };

    let today = now.date();
    let time = now.time();
    let mut due = Vec::new();
    if same_minute(time, morning) && state.last_morning != Some(today) {
        due.push(Reminder::Morning);
    }
    if same_minute(time, evening) && state.last_evening != Some(today) {
        due.push(Reminder::Evening);
    }
    due
}

/// Sends whatever is due at `now` and records it. Returns what was sent.
async fn send_due<N: Notifier>(
    service: &NotificationService<N>,
    schedule: &ReminderSchedule,
    state: &Mutex<ReminderState>,
    now: NaiveDateTime,
) -> Vec<Reminder> {
    let mut state = state.lock().await;
    let due = due_reminders(schedule, &state, now);
    for reminder in &due {
        debug!("Sending {:?} reminder", reminder);
        service.daily_reminder();
        state.mark_sent(*reminder, now.date());
    }
    due
}

/// Runs the reminder task. Built explicitly and stopped explicitly (or on drop).
#[derive(Debug)]
pub struct NotificationScheduler<N: Notifier> {
    service: Arc<NotificationService<N>>,
    schedule: ReminderSchedule,
    state: Arc<Mutex<ReminderState>>,
    handle: Option<JoinHandle<()>>,
}

impl<N: Notifier> NotificationScheduler<N> {
    /// Creates a stopped scheduler.
    pub fn new(service: Arc<NotificationService<N>>, schedule: ReminderSchedule) -> Self {
        Self {
            service,
            schedule,
            state: Arc::new(Mutex::new(ReminderState::default())),
            handle: None,
        }
    }

    /// The schedule in use.
    pub const fn schedule(&self) -> &ReminderSchedule {
        &self.schedule
    }

    /// Whether the background task is running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Starts the background task, replacing any running one. Does nothing when the
    /// schedule is disabled. Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// Returns `Error::Config` if the reminder times are not `HH:MM`.
    pub fn start(&mut self) -> Result<()> {
        self.stop();
        if !self.schedule.enabled {
            info!("Reminders disabled, scheduler not started");
            return Ok(());
        }
        self.schedule.times()?;

        info!(
            "Starting notification scheduler (morning {}, evening {})",
            self.schedule.morning_time, self.schedule.evening_time
        );

        let service = Arc::clone(&self.service);
        let schedule = self.schedule.clone();
        let state = Arc::clone(&self.state);

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CHECK_INTERVAL);
            loop {
                ticker.tick().await;
                let now = Local::now().naive_local();
                send_due(&service, &schedule, &state, now).await;
            }
        }));
        Ok(())
    }

    /// Stops the background task if it is running.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Notification scheduler stopped");
        }
    }

    /// Switches to `schedule` and restarts the task.
    ///
    /// # Errors
    /// Returns `Error::Config` if the new reminder times are not `HH:MM`; the scheduler
    /// is left stopped in that case.
    pub fn reschedule(&mut self, schedule: ReminderSchedule) -> Result<()> {
        self.schedule = schedule;
        self.start()
    }

    /// Sends the morning reminder now, outside the schedule.
    pub fn trigger_morning(&self) {
        self.service.daily_reminder();
    }

    /// Sends the evening reminder now, outside the schedule.
    pub fn trigger_evening(&self) {
        self.service.daily_reminder();
    }
}

impl<N: Notifier> Drop for NotificationScheduler<N> {
    fn drop(&mut self) {
        self.stop();
    }
}
