//! Daily attendance from presence sessions.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{DailyPresenceRecord, DayWindow, Employee, PresenceSession};

/// Compute one employee's attendance for the day covered by `window`.
///
/// Each session is clipped to the window (open sessions run until `now`) and
/// its duration truncated to whole minutes before summing. Sessions must
/// belong to `employee` and must not overlap.
pub fn compute_daily(
    employee: &Employee,
    sessions: &[PresenceSession],
    window: &DayWindow,
    now: DateTime<Utc>,
) -> Result<DailyPresenceRecord> {
    validate_sessions(employee.id, sessions)?;

    let mut first_seen: Option<DateTime<Utc>> = None;
    let mut last_seen: Option<DateTime<Utc>> = None;
    let mut total_minutes: u32 = 0;

    for (from, to) in sessions.iter().filter_map(|s| s.clip_to(window, now)) {
        first_seen = Some(first_seen.map_or(from, |seen| seen.min(from)));
        last_seen = Some(last_seen.map_or(to, |seen| seen.max(to)));
        total_minutes += (to - from).num_minutes() as u32;
    }

    debug!(
        employee_id = employee.id,
        date = %window.date(),
        sessions = sessions.len(),
        total_minutes,
        "computed daily presence"
    );

    Ok(DailyPresenceRecord {
        employee_id: employee.id,
        employee_name: employee.name.clone(),
        date: window.date(),
        first_seen,
        last_seen,
        total_minutes,
        hours_present: f64::from(total_minutes) / 60.0,
    })
}

/// Reject sessions of another employee, inverted sessions and overlaps.
///
/// Sessions that merely touch (`end == next.start`) are accepted. An open
/// session overlaps every session starting after it.
pub fn validate_sessions(employee_id: i32, sessions: &[PresenceSession]) -> Result<()> {
    if let Some(other) = sessions.iter().find(|s| s.employee_id != employee_id) {
        return Err(AppError::validation(format!(
            "session of employee {} passed for employee {employee_id}",
            other.employee_id
        )));
    }
    if let Some(inverted) = sessions.iter().find(|s| s.end.is_some_and(|end| end < s.start)) {
        return Err(AppError::validation(format!(
            "session starting {} ends before it starts",
            inverted.start
        )));
    }

    let mut ordered: Vec<&PresenceSession> = sessions.iter().collect();
    ordered.sort_by_key(|s| s.start);

    for pair in ordered.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let overlaps = match prev.end {
            Some(end) => end > next.start,
            None => true,
        };
        if overlaps {
            return Err(AppError::validation(format!(
                "sessions starting {} and {} overlap for employee {employee_id}",
                prev.start, next.start
            )));
        }
    }
    Ok(())
}
