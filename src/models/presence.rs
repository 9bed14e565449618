//! Presence sessions and the attendance records derived from them.

use std::fmt;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::period::DayWindow;
use crate::error::{AppError, Result};

/// Employee as known to the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i32,
    pub name: String,
}

impl Employee {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }

    /// Placeholder for ids missing from the roster.
    pub fn unknown(id: i32) -> Self {
        Self::new(id, "Unknown")
    }
}

/// One contiguous interval an employee was detected present.
///
/// `end == None` means the session is still open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSession {
    pub employee_id: i32,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl PresenceSession {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Part of the session inside `window`; an open session runs until `now`.
    ///
    /// Returns `None` when nothing of the session falls inside the window.
    pub fn clip_to(&self, window: &DayWindow, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let end = self.end.unwrap_or(now);
        let from = self.start.max(window.start());
        let to = end.min(window.end());
        (from < to).then_some((from, to))
    }
}

/// Attendance of one employee on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPresenceRecord {
    pub employee_id: i32,
    pub employee_name: String,
    pub date: NaiveDate,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub total_minutes: u32,
    /// `total_minutes / 60`, unrounded.
    pub hours_present: f64,
}

impl DailyPresenceRecord {
    pub fn is_present(&self) -> bool {
        self.total_minutes > 0
    }
}

/// Month rollup of an employee's daily records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPresenceRecord {
    pub employee_id: i32,
    pub employee_name: String,
    pub total_hours: f64,
    pub days_present: u32,
    pub avg_hours_per_day: f64,
}

/// Rendering class of a day in the monthly detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayStatus {
    Absent,
    Partial,
    #[serde(rename = "Full day")]
    FullDay,
    Weekend,
}

impl DayStatus {
    /// Classify a day by hours worked.
    ///
    /// Every weekend day renders as `Weekend`, including worked ones; the hours
    /// themselves stay on the record. Workdays are `Full day` from
    /// `full_day_hours`, `Partial` above zero, else `Absent`.
    pub fn classify(hours: f64, is_weekend: bool, full_day_hours: f64) -> Self {
        if is_weekend {
            Self::Weekend
        } else if hours >= full_day_hours {
            Self::FullDay
        } else if hours > 0.0 {
            Self::Partial
        } else {
            Self::Absent
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Absent => "Absent",
            Self::Partial => "Partial",
            Self::FullDay => "Full day",
            Self::Weekend => "Weekend",
        }
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the monthly detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyDetail {
    pub date: NaiveDate,
    pub day_of_week: Weekday,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub hours: f64,
    pub status: DayStatus,
}

/// Per-day attendance of one employee over a month, trimmed to the active range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeMonthlyDetail {
    pub employee_id: i32,
    pub employee_name: String,
    pub year: i32,
    pub month: u32,
    pub daily_records: Vec<DailyDetail>,
    pub total_hours: f64,
    pub days_present: u32,
}

/// Real-time presence of one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeStatus {
    pub employee_id: i32,
    pub employee_name: String,
    pub is_present: bool,
    pub current_area: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Interval during which a site agent was not reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDowntime {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AgentDowntime {
    /// Create a downtime window, rejecting an end before the start.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(AppError::validation(format!("downtime ends ({end}) before it starts ({start})")));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}
