//! Billing cycle resolution.
//!
//! A cycle is an inclusive date window used both to filter transactions for display and
//! as the boundary at which category caps reset. Everything here is a pure function of its
//! arguments; the only clock access is [`today`], which callers pass in explicitly.

use crate::config::catalog::{CapPeriod, CategoryConfig};
use crate::errors::{Error, Result};
use chrono::{Datelike, Days, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a cycle window is derived from a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleType {
    /// Card statement window anchored on a day of month
    Statement,
    /// First through last day of the calendar month
    Calendar,
    /// Caller-supplied start and end dates
    Custom,
    /// Calendar quarter
    Quarterly,
}

impl fmt::Display for CycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Statement => "STATEMENT",
            Self::Calendar => "CALENDAR",
            Self::Custom => "CUSTOM",
            Self::Quarterly => "QUARTERLY",
        };
        f.write_str(s)
    }
}

impl FromStr for CycleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STATEMENT" => Ok(Self::Statement),
            "CALENDAR" => Ok(Self::Calendar),
            "CUSTOM" => Ok(Self::Custom),
            "QUARTERLY" => Ok(Self::Quarterly),
            other => Err(Error::Config {
                message: format!("Unknown cycle type '{other}'"),
            }),
        }
    }
}

/// Calendar quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quarter {
    /// January - March
    Q1,
    /// April - June
    Q2,
    /// July - September
    Q3,
    /// October - December
    Q4,
}

impl Quarter {
    /// The quarter containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        match date.month0() / 3 {
            0 => Self::Q1,
            1 => Self::Q2,
            2 => Self::Q3,
            _ => Self::Q4,
        }
    }

    /// 1-based quarter number.
    #[must_use]
    pub const fn number(self) -> u32 {
        match self {
            Self::Q1 => 1,
            Self::Q2 => 2,
            Self::Q3 => 3,
            Self::Q4 => 4,
        }
    }

    /// Label with the month span, e.g. `Q2 (Apr-Jun)`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Q1 => "Q1 (Jan-Mar)",
            Self::Q2 => "Q2 (Apr-Jun)",
            Self::Q3 => "Q3 (Jul-Sep)",
            Self::Q4 => "Q4 (Oct-Dec)",
        }
    }
}

/// A concrete, inclusive cycle window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleDateRange {
    /// First day of the window
    pub start: NaiveDate,
    /// Last day of the window
    pub end: NaiveDate,
    /// How the window was derived
    pub cycle_type: CycleType,
    /// Human-readable summary of the window
    pub label: String,
}

impl CycleDateRange {
    /// Whether `date` falls inside the window, bounds included.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days in the window, both ends counted.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days().abs() + 1
    }

    /// Percentage of the window elapsed as of `today`.
    ///
    /// 0 before the window, 100 after it, otherwise the share of days elapsed with
    /// `today` counted as elapsed, rounded to the nearest integer.
    #[must_use]
    pub fn progress(&self, today: NaiveDate) -> f64 {
        if today < self.start {
            return 0.0;
        }
        if today > self.end {
            return 100.0;
        }
        let elapsed = (today - self.start).num_days() + 1;
        #[allow(clippy::cast_precision_loss)]
        let ratio = elapsed as f64 / self.days() as f64;
        (ratio * 100.0).round()
    }
}

/// Today's date in local time.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

fn shift_months(first: NaiveDate, delta: i32) -> NaiveDate {
    if delta >= 0 {
        first + Months::new(delta.unsigned_abs())
    } else {
        first - Months::new(delta.unsigned_abs())
    }
}

fn last_of_month(first: NaiveDate) -> NaiveDate {
    first + Months::new(1) - Days::new(1)
}

/// The anchor day inside the month starting at `first`, clamped to the month's length.
fn anchor_in_month(first: NaiveDate, anchor_day: u32) -> NaiveDate {
    let last_day = last_of_month(first).day();
    let day = anchor_day.clamp(1, last_day);
    first + Days::new(u64::from(day - 1))
}

/// Statement window containing `date` for a statement that starts on `anchor_day`.
///
/// Anchor days past the end of a short month land on that month's last day, so
/// consecutive windows always tile without gaps.
#[must_use]
pub fn statement_cycle(date: NaiveDate, anchor_day: u32) -> CycleDateRange {
    let month = first_of_month(date);
    let anchor_this_month = anchor_in_month(month, anchor_day);

    let (start, end) = if date >= anchor_this_month {
        let next = anchor_in_month(shift_months(month, 1), anchor_day);
        (anchor_this_month, next - Days::new(1))
    } else {
        let previous = anchor_in_month(shift_months(month, -1), anchor_day);
        (previous, anchor_this_month - Days::new(1))
    };

    CycleDateRange {
        start,
        end,
        cycle_type: CycleType::Statement,
        label: format!("{} - {}", start.format("%d %b"), end.format("%d %b %Y")),
    }
}

/// Calendar month containing `date`.
#[must_use]
pub fn calendar_month(date: NaiveDate) -> CycleDateRange {
    let start = first_of_month(date);
    CycleDateRange {
        start,
        end: last_of_month(start),
        cycle_type: CycleType::Calendar,
        label: date.format("%B %Y").to_string(),
    }
}

/// Calendar quarter containing `date`.
#[must_use]
pub fn quarterly_cycle(date: NaiveDate) -> CycleDateRange {
    let quarter = Quarter::of(date);
    let month = first_of_month(date);
    let start = month - Months::new(date.month0() % 3);
    let end = start + Months::new(3) - Days::new(1);

    CycleDateRange {
        start,
        end,
        cycle_type: CycleType::Quarterly,
        label: format!("Q{} {}", quarter.number(), date.year()),
    }
}

/// Exactly the supplied window.
#[must_use]
pub fn custom_cycle(start: NaiveDate, end: NaiveDate) -> CycleDateRange {
    CycleDateRange {
        start,
        end,
        cycle_type: CycleType::Custom,
        label: format!("{} - {}", start.format("%d %b %Y"), end.format("%d %b %Y")),
    }
}

/// Resolves a cycle window of the given type around `reference`.
///
/// `Custom` uses `custom_start..=custom_end`; when either bound is missing or the end lies
/// before the start it falls back to the calendar month of `reference`.
#[must_use]
pub fn resolve_cycle(
    cycle_type: CycleType,
    reference: NaiveDate,
    custom_start: Option<NaiveDate>,
    custom_end: Option<NaiveDate>,
    statement_anchor_day: u32,
) -> CycleDateRange {
    match cycle_type {
        CycleType::Statement => statement_cycle(reference, statement_anchor_day),
        CycleType::Calendar => calendar_month(reference),
        CycleType::Quarterly => quarterly_cycle(reference),
        CycleType::Custom => match (custom_start, custom_end) {
            (Some(start), Some(end)) if start <= end => custom_cycle(start, end),
            _ => {
                tracing::debug!("Custom cycle bounds incomplete, using calendar month");
                calendar_month(reference)
            }
        },
    }
}

/// Inclusive cycle membership test.
#[must_use]
pub fn is_date_in_cycle(date: NaiveDate, range: &CycleDateRange) -> bool {
    range.contains(date)
}

/// Number of days in the window, both ends counted.
#[must_use]
pub fn days_in_cycle(range: &CycleDateRange) -> i64 {
    range.days()
}

/// Percentage of the window elapsed as of `today`.
#[must_use]
pub fn cycle_progress(range: &CycleDateRange, today: NaiveDate) -> f64 {
    range.progress(today)
}

/// The window of `cycle_type` containing today's date.
#[must_use]
pub fn current_cycle(cycle_type: CycleType, statement_anchor_day: u32) -> CycleDateRange {
    resolve_cycle(cycle_type, today(), None, None, statement_anchor_day)
}

/// The window in which a category's cap accumulates for a spend on `date`.
///
/// Monthly caps follow the statement cycle, quarterly caps the calendar quarter.
/// Uncapped categories have no window.
#[must_use]
pub fn cap_window(
    category: &CategoryConfig,
    date: NaiveDate,
    statement_anchor_day: u32,
) -> Option<CycleDateRange> {
    category.cap()?;
    match category.cap_period {
        CapPeriod::Monthly => Some(statement_cycle(date, statement_anchor_day)),
        CapPeriod::Quarterly => Some(quarterly_cycle(date)),
        CapPeriod::Unlimited => None,
    }
}
