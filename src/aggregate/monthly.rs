//! Monthly rollups and the per-employee monthly detail view.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::calendar::Calendar;
use crate::error::{AppError, Result};
use crate::models::{
    DailyDetail, DailyPresenceRecord, DayStatus, Employee, EmployeeMonthlyDetail, MonthlyPresenceRecord, YearMonth,
};

/// Roll up one employee's daily records for a month.
///
/// All records must belong to the same employee.
pub fn compute_monthly(records: &[DailyPresenceRecord]) -> Result<MonthlyPresenceRecord> {
    let first = records
        .first()
        .ok_or_else(|| AppError::validation("no daily records to roll up"))?;

    if let Some(other) = records.iter().find(|r| r.employee_id != first.employee_id) {
        return Err(AppError::validation(format!(
            "daily records of employees {} and {} mixed in one rollup",
            first.employee_id, other.employee_id
        )));
    }

    Ok(rollup(first.employee_id, &first.employee_name, records))
}

/// Roll up daily records of many employees, one result per employee ordered by id.
pub fn summarize_month(records: &[DailyPresenceRecord]) -> Vec<MonthlyPresenceRecord> {
    let mut by_employee: BTreeMap<i32, Vec<&DailyPresenceRecord>> = BTreeMap::new();
    for record in records {
        by_employee.entry(record.employee_id).or_default().push(record);
    }

    by_employee
        .into_iter()
        .map(|(employee_id, group)| {
            let name = group
                .first()
                .map_or_else(|| "Unknown".to_string(), |r| r.employee_name.clone());
            rollup(employee_id, &name, group)
        })
        .collect()
}

fn rollup<'a>(
    employee_id: i32,
    employee_name: &str,
    records: impl IntoIterator<Item = &'a DailyPresenceRecord>,
) -> MonthlyPresenceRecord {
    let mut total_hours = 0.0;
    let mut days_present = 0;
    for record in records {
        total_hours += record.hours_present;
        if record.is_present() {
            days_present += 1;
        }
    }

    MonthlyPresenceRecord {
        employee_id,
        employee_name: employee_name.to_string(),
        total_hours,
        days_present,
        avg_hours_per_day: if days_present > 0 {
            total_hours / f64::from(days_present)
        } else {
            0.0
        },
    }
}

/// One detail row per calendar day of `month`, in order.
///
/// Days without a record get zero hours. Records dated outside the month are ignored.
pub fn build_month_details(
    records: &[DailyPresenceRecord],
    month: YearMonth,
    calendar: &impl Calendar,
    full_day_hours: f64,
) -> Vec<DailyDetail> {
    let by_date: HashMap<_, _> = records
        .iter()
        .filter(|r| month.contains(r.date))
        .map(|r| (r.date, r))
        .collect();

    month
        .days()
        .map(|date| {
            let day = calendar.day(date);
            let record = by_date.get(&date);
            let hours = record.map_or(0.0, |r| r.hours_present);
            DailyDetail {
                date,
                day_of_week: day.day_of_week,
                first_seen: record.and_then(|r| r.first_seen),
                last_seen: record.and_then(|r| r.last_seen),
                hours,
                status: DayStatus::classify(hours, day.is_weekend, full_day_hours),
            }
        })
        .collect()
}

/// Narrow a chronological sequence to its active window.
///
/// Keeps everything from the first to the last day with `hours > 0`, both
/// inclusive. Returns an empty slice when no day is active.
pub fn trim_active_range(days: &[DailyDetail]) -> &[DailyDetail] {
    let Some(first) = days.iter().position(|d| d.hours > 0.0) else {
        return &[];
    };
    let last = days.iter().rposition(|d| d.hours > 0.0).unwrap_or(first);
    &days[first..=last]
}

/// Build the monthly detail view of one employee.
///
/// `daily_details` must be strictly chronological and dated within `month`;
/// totals cover the whole sequence, `daily_records` holds the trimmed range.
pub fn compute_employee_monthly_detail(
    employee: &Employee,
    month: YearMonth,
    daily_details: &[DailyDetail],
) -> Result<EmployeeMonthlyDetail> {
    if let Some(outside) = daily_details.iter().find(|d| !month.contains(d.date)) {
        return Err(AppError::invalid_range(format!("{} is outside {month}", outside.date)));
    }
    if let Some(pair) = daily_details.windows(2).find(|pair| pair[0].date >= pair[1].date) {
        return Err(AppError::validation(format!(
            "daily details out of order: {} then {}",
            pair[0].date, pair[1].date
        )));
    }

    let total_hours = daily_details.iter().map(|d| d.hours).sum();
    let days_present = daily_details.iter().filter(|d| d.hours > 0.0).count() as u32;
    let daily_records = trim_active_range(daily_details).to_vec();

    debug!(
        employee_id = employee.id,
        %month,
        days = daily_details.len(),
        active_days = daily_records.len(),
        "computed monthly detail"
    );

    Ok(EmployeeMonthlyDetail {
        employee_id: employee.id,
        employee_name: employee.name.clone(),
        year: month.year(),
        month: month.month(),
        daily_records,
        total_hours,
        days_present,
    })
}
