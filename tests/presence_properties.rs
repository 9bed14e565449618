use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, TimeZone, Utc};

use presence_engine::aggregate::{compute_daily, compute_monthly, navigate_month, trim_active_range};
use presence_engine::liveness::classify;
use presence_engine::models::{
    AgentHealthState, AgentSelection, DailyDetail, DailyPresenceRecord, DayStatus, DayWindow, Direction, Employee,
    HeartbeatSample, PresenceSession, Thresholds, YearMonth,
};

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, h, m, 0).unwrap()
}

fn session(start: DateTime<Utc>, end: DateTime<Utc>) -> PresenceSession {
    PresenceSession {
        employee_id: 7,
        start,
        end: Some(end),
    }
}

fn day_record(day: u32, total_minutes: u32) -> DailyPresenceRecord {
    DailyPresenceRecord {
        employee_id: 7,
        employee_name: "Dana".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
        first_seen: None,
        last_seen: None,
        total_minutes,
        hours_present: f64::from(total_minutes) / 60.0,
    }
}

fn detail(day: u32, hours: f64) -> DailyDetail {
    let date = NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
    DailyDetail {
        date,
        day_of_week: date.weekday(),
        first_seen: None,
        last_seen: None,
        hours,
        status: if hours > 0.0 { DayStatus::Partial } else { DayStatus::Absent },
    }
}

fn sample(seconds_ago: i64, now: DateTime<Utc>) -> HeartbeatSample {
    HeartbeatSample {
        site_id: "site-1".to_string(),
        last_heartbeat: Some(now - TimeDelta::seconds(seconds_ago)),
        has_last_heartbeat: true,
    }
}

#[test]
fn test_daily_total_is_sum_of_clipped_sessions() {
    let employee = Employee::new(7, "Dana");
    let window = DayWindow::in_zone(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(), &Utc).unwrap();
    let sessions = vec![
        session(at(0, 0) - TimeDelta::hours(2), at(1, 30)),
        session(at(9, 0), at(12, 15)),
        session(at(13, 0), at(17, 45)),
        session(at(23, 0), at(23, 0) + TimeDelta::hours(3)),
    ];

    let record = compute_daily(&employee, &sessions, &window, at(23, 59) + TimeDelta::days(1)).unwrap();

    assert_eq!(record.total_minutes, 90 + 195 + 285 + 60);
    assert_eq!(record.first_seen, Some(window.start()));
    assert_eq!(record.last_seen, Some(window.end()));
}

#[test]
fn test_daily_total_is_zero_without_sessions() {
    let employee = Employee::new(7, "Dana");
    let window = DayWindow::in_zone(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(), &Utc).unwrap();

    let record = compute_daily(&employee, &[], &window, at(12, 0)).unwrap();

    assert_eq!(record.total_minutes, 0);
    assert_eq!(record.hours_present, 0.0);
    assert!(record.first_seen.is_none());
}

#[test]
fn test_monthly_counts_only_present_days() {
    let records = vec![day_record(2, 480), day_record(3, 0), day_record(4, 240)];
    let summary = compute_monthly(&records).unwrap();

    assert_eq!(summary.days_present, 2);
    assert_eq!(summary.total_hours, 12.0);
    assert_eq!(summary.avg_hours_per_day, 6.0);
}

#[test]
fn test_monthly_average_is_zero_without_presence() {
    let records = vec![day_record(2, 0), day_record(3, 0)];
    let summary = compute_monthly(&records).unwrap();

    assert_eq!(summary.days_present, 0);
    assert_eq!(summary.avg_hours_per_day, 0.0);
}

#[test]
fn test_trimming_keeps_both_active_ends() {
    let hours = [0.0, 0.0, 5.0, 0.0, 3.0, 0.0, 0.0];
    let details: Vec<DailyDetail> = hours.iter().enumerate().map(|(i, h)| detail(i as u32 + 1, *h)).collect();

    let trimmed = trim_active_range(&details);
    let trimmed_hours: Vec<f64> = trimmed.iter().map(|d| d.hours).collect();

    assert_eq!(trimmed_hours, vec![5.0, 0.0, 3.0]);
    assert_eq!(trimmed.first().unwrap().date.day(), 3);
    assert_eq!(trimmed.last().unwrap().date.day(), 5);
}

#[test]
fn test_trimming_is_idempotent() {
    let details = vec![detail(3, 5.0), detail(4, 0.0), detail(5, 3.0)];
    let once = trim_active_range(&details);
    let twice = trim_active_range(once);
    assert_eq!(once, twice);
    assert_eq!(twice.len(), 3);
}

#[test]
fn test_liveness_boundaries() {
    let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
    let thresholds = Thresholds::new(350, 700).unwrap();
    let state = |secs| classify(&[sample(secs, now)], AgentSelection::First, &thresholds, now).state;

    assert_eq!(state(349), AgentHealthState::Healthy);
    assert_eq!(state(350), AgentHealthState::Degraded);
    assert_eq!(state(700), AgentHealthState::Degraded);
    assert_eq!(state(701), AgentHealthState::Offline);
    assert_eq!(state(-30), AgentHealthState::Healthy);
}

#[test]
fn test_liveness_without_data() {
    let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
    let thresholds = Thresholds::default();

    let empty = classify(&[], AgentSelection::First, &thresholds, now);
    assert_eq!(empty.state, AgentHealthState::Unknown);
    assert_eq!(empty.descriptor(), "No agent data");

    let silent = HeartbeatSample {
        site_id: "site-1".to_string(),
        last_heartbeat: None,
        has_last_heartbeat: false,
    };
    let silent = classify(&[silent], AgentSelection::First, &thresholds, now);
    assert_eq!(silent.state, AgentHealthState::Unknown);
    assert_eq!(silent.descriptor(), "No heartbeat received");
}

#[test]
fn test_month_navigation_rolls_over_years() {
    let january = YearMonth::new(2025, 1).unwrap();
    let december = YearMonth::new(2025, 12).unwrap();

    assert_eq!(
        navigate_month(january, Direction::Previous).unwrap(),
        YearMonth::new(2024, 12).unwrap()
    );
    assert_eq!(
        navigate_month(december, Direction::Next).unwrap(),
        YearMonth::new(2026, 1).unwrap()
    );
}
