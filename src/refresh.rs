//! Periodic refresh of the presence views.
//!
//! Every load is a fresh computation over its own fetched snapshot and an
//! explicit `now`. Requests are numbered per view; a result is dropped when a
//! newer one was already delivered or a navigation superseded it, so a slow
//! refresh cannot overwrite a newer one.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::aggregate::{
    build_month_details, compute_daily, compute_employee_monthly_detail, navigate_day, navigate_month, summarize_month,
};
use crate::calendar::WeekdayCalendar;
use crate::config::{AppConfig, ConfigError};
use crate::error::{AppError, Result};
use crate::liveness::{classify_each, classify_fetch};
use crate::models::{
    AgentDowntime, AgentHealth, AgentSelection, DailyPresenceRecord, DayWindow, Direction, Employee,
    EmployeeMonthlyDetail, EmployeeStatus, MonthlyPresenceRecord, PresenceSession, Thresholds, YearMonth,
};
use crate::source::{PresenceSource, SessionScope};

/// Sequence number of a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

/// Issues tickets for one view and decides which finished requests may be delivered.
///
/// A periodic refresh only issues a ticket; it does not cancel refreshes still
/// in flight, so a fetch slower than the refresh interval still lands. A
/// navigation supersedes everything issued before it. A finished request is
/// delivered unless it was superseded or a newer ticket was already delivered.
#[derive(Debug, Default)]
pub struct RequestTracker {
    issued: AtomicU64,
    floor: AtomicU64,
    delivered: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a refresh of the current target.
    pub fn issue(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Start a request for a new target, discarding all earlier ones.
    pub fn supersede(&self) -> Ticket {
        let ticket = self.issue();
        self.floor.fetch_max(ticket.0, Ordering::SeqCst);
        ticket
    }

    /// Claim delivery for a finished request. Returns false if it is stale.
    pub fn try_deliver(&self, ticket: Ticket) -> bool {
        if ticket.0 < self.floor.load(Ordering::SeqCst) {
            return false;
        }
        self.delivered.fetch_max(ticket.0, Ordering::SeqCst) < ticket.0
    }
}

/// Consumer-side view that only accepts results newer than what it shows.
#[derive(Debug)]
pub struct LatestView<T> {
    ticket: Option<Ticket>,
    value: Option<T>,
}

impl<T> Default for LatestView<T> {
    fn default() -> Self {
        Self {
            ticket: None,
            value: None,
        }
    }
}

impl<T> LatestView<T> {
    /// Replace the shown value if `ticket` is newer. Returns whether it was applied.
    pub fn apply(&mut self, ticket: Ticket, value: T) -> bool {
        if self.ticket.is_some_and(|shown| shown >= ticket) {
            return false;
        }
        self.ticket = Some(ticket);
        self.value = Some(value);
        true
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }
}

/// Settings the engine needs from configuration.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub timezone: Tz,
    pub thresholds: Thresholds,
    pub selection: AgentSelection,
    pub full_day_hours: f64,
    pub calendar: WeekdayCalendar,
    pub interval: Duration,
}

impl ReportSettings {
    pub fn from_config(config: &AppConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            timezone: config.timezone()?,
            thresholds: config.thresholds()?,
            selection: config.liveness.selection,
            full_day_hours: config.report.full_day_hours,
            calendar: WeekdayCalendar::new(config.report.weekend.clone()),
            interval: config.refresh_interval(),
        })
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            thresholds: Thresholds::default(),
            selection: AgentSelection::default(),
            full_day_hours: 8.0,
            calendar: WeekdayCalendar::default(),
            interval: Duration::from_secs(15),
        }
    }
}

/// Everything shown on the live dashboard for one date.
///
/// Sections fail independently; the agent section never fails and shows
/// `UNKNOWN` when heartbeats cannot be fetched.
#[derive(Debug)]
pub struct DashboardSnapshot {
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub current: Result<Vec<EmployeeStatus>>,
    pub daily: Result<Vec<DailyPresenceRecord>>,
    pub agent: AgentHealth,
    pub downtimes: Result<Vec<AgentDowntime>>,
}

/// Health of the site plus every reporting agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReport {
    pub overall: AgentHealth,
    pub agents: Vec<AgentHealth>,
}

/// Navigation requests from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavRequest {
    Day(Direction),
    Month(Direction),
    Refresh,
}

/// Computed view delivered to the display layer.
#[derive(Debug)]
pub enum ViewUpdate {
    Dashboard(Ticket, DashboardSnapshot),
    Monthly(Ticket, YearMonth, Result<Vec<MonthlyPresenceRecord>>),
}

/// Loads presence views from a [`PresenceSource`] and keeps them fresh.
pub struct RefreshDriver<S> {
    source: S,
    settings: ReportSettings,
    dashboard: RequestTracker,
    monthly: RequestTracker,
}

impl<S: PresenceSource + Send + Sync + 'static> RefreshDriver<S> {
    pub fn new(source: S, settings: ReportSettings) -> Self {
        Self {
            source,
            settings,
            dashboard: RequestTracker::new(),
            monthly: RequestTracker::new(),
        }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Daily records of everyone present on `date`.
    ///
    /// Only employees with presence inside the day get a record.
    pub async fn load_daily(&self, date: NaiveDate, now: DateTime<Utc>) -> Result<Vec<DailyPresenceRecord>> {
        let window = DayWindow::in_zone(date, &self.settings.timezone)?;
        let (roster, sessions) = tokio::join!(
            self.source.fetch_employees(),
            self.source.fetch_sessions(SessionScope::All, date, date)
        );
        let roster = roster?;
        let sessions = sessions?;

        let mut records = Vec::new();
        for (employee, sessions) in group_by_employee(&roster, sessions) {
            let record = compute_daily(&employee, &sessions, &window, now)?;
            if record.first_seen.is_some() {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Monthly rollup of every employee with sessions in `month`.
    pub async fn load_monthly(&self, month: YearMonth, now: DateTime<Utc>) -> Result<Vec<MonthlyPresenceRecord>> {
        let (roster, sessions) = tokio::join!(
            self.source.fetch_employees(),
            self.source
                .fetch_sessions(SessionScope::All, month.first_day(), month.last_day())
        );
        let roster = roster?;
        let sessions = sessions?;

        let mut records = Vec::new();
        for (employee, sessions) in group_by_employee(&roster, sessions) {
            records.extend(self.month_of_records(&employee, &sessions, month, now)?);
        }
        Ok(summarize_month(&records))
    }

    /// Trimmed monthly detail of one employee.
    pub async fn load_employee_detail(
        &self,
        employee_id: i32,
        month: YearMonth,
        now: DateTime<Utc>,
    ) -> Result<EmployeeMonthlyDetail> {
        let (roster, sessions) = tokio::join!(
            self.source.fetch_employees(),
            self.source
                .fetch_sessions(SessionScope::Employee(employee_id), month.first_day(), month.last_day())
        );
        let employee = roster?
            .into_iter()
            .find(|e| e.id == employee_id)
            .ok_or_else(|| AppError::unavailable(format!("employee {employee_id} is not in the roster")))?;
        let sessions = sessions?;

        let records = self.month_of_records(&employee, &sessions, month, now)?;
        let details = build_month_details(&records, month, &self.settings.calendar, self.settings.full_day_hours);
        compute_employee_monthly_detail(&employee, month, &details)
    }

    /// Classified health of the site agent.
    pub async fn load_agent_health(&self, now: DateTime<Utc>) -> AgentHealth {
        let fetched = self.source.fetch_heartbeats(None).await;
        classify_fetch(fetched, self.settings.selection, &self.settings.thresholds, now)
    }

    /// Overall and per-agent health, optionally for one site.
    ///
    /// A failed fetch yields `UNKNOWN` overall and no per-agent rows.
    pub async fn load_agents(&self, site_id: Option<&str>, now: DateTime<Utc>) -> AgentReport {
        let fetched = self.source.fetch_heartbeats(site_id).await;
        let agents = match &fetched {
            Ok(samples) => classify_each(samples, &self.settings.thresholds, now),
            Err(_) => Vec::new(),
        };
        let overall = classify_fetch(fetched, self.settings.selection, &self.settings.thresholds, now);
        AgentReport { overall, agents }
    }

    /// Load all dashboard sections concurrently.
    pub async fn load_dashboard(&self, date: NaiveDate, now: DateTime<Utc>) -> DashboardSnapshot {
        let (current, daily, agent, downtimes) = tokio::join!(
            self.source.fetch_current_status(),
            self.load_daily(date, now),
            self.load_agent_health(now),
            self.source.fetch_downtimes(date)
        );

        for (section, error) in [
            ("current status", current.as_ref().err()),
            ("daily presence", daily.as_ref().err()),
            ("downtimes", downtimes.as_ref().err()),
        ] {
            if let Some(e) = error {
                warn!("Dashboard section '{section}' failed: {e}");
            }
        }

        DashboardSnapshot {
            date,
            generated_at: now,
            current,
            daily,
            agent,
            downtimes,
        }
    }

    fn month_of_records(
        &self,
        employee: &Employee,
        sessions: &[PresenceSession],
        month: YearMonth,
        now: DateTime<Utc>,
    ) -> Result<Vec<DailyPresenceRecord>> {
        month
            .days()
            .map(|date| {
                let window = DayWindow::in_zone(date, &self.settings.timezone)?;
                compute_daily(employee, sessions, &window, now)
            })
            .collect()
    }

    /// Refresh on the configured cadence and on navigation until `nav` closes.
    pub async fn run(
        self: Arc<Self>,
        start: NaiveDate,
        mut nav: mpsc::Receiver<NavRequest>,
        updates: mpsc::UnboundedSender<ViewUpdate>,
    ) {
        let mut date = start;
        let mut month = YearMonth::of(start);
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Refresh loop started for {date} every {:?}", self.settings.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.spawn_dashboard(self.dashboard.issue(), date, &updates),
                request = nav.recv() => match request {
                    None => break,
                    Some(NavRequest::Day(direction)) => match navigate_day(date, direction) {
                        Ok(next) => {
                            date = next;
                            self.spawn_dashboard(self.dashboard.supersede(), date, &updates);
                        }
                        Err(e) => warn!("Ignoring day navigation: {e}"),
                    },
                    Some(NavRequest::Month(direction)) => match navigate_month(month, direction) {
                        Ok(next) => {
                            month = next;
                            self.spawn_monthly(self.monthly.supersede(), month, &updates);
                        }
                        Err(e) => warn!("Ignoring month navigation: {e}"),
                    },
                    Some(NavRequest::Refresh) => {
                        self.spawn_dashboard(self.dashboard.issue(), date, &updates);
                        self.spawn_monthly(self.monthly.issue(), month, &updates);
                    }
                },
            }
        }

        info!("Refresh loop stopped");
    }

    fn spawn_dashboard(self: &Arc<Self>, ticket: Ticket, date: NaiveDate, updates: &mpsc::UnboundedSender<ViewUpdate>) {
        let now = Utc::now();
        let driver = Arc::clone(self);
        let updates = updates.clone();

        tokio::spawn(async move {
            let snapshot = driver.load_dashboard(date, now).await;
            if driver.dashboard.try_deliver(ticket) {
                let _ = updates.send(ViewUpdate::Dashboard(ticket, snapshot));
            } else {
                debug!("Discarding superseded dashboard refresh for {date}");
            }
        });
    }

    fn spawn_monthly(self: &Arc<Self>, ticket: Ticket, month: YearMonth, updates: &mpsc::UnboundedSender<ViewUpdate>) {
        let now = Utc::now();
        let driver = Arc::clone(self);
        let updates = updates.clone();

        tokio::spawn(async move {
            let summary = driver.load_monthly(month, now).await;
            if driver.monthly.try_deliver(ticket) {
                let _ = updates.send(ViewUpdate::Monthly(ticket, month, summary));
            } else {
                debug!("Discarding superseded monthly refresh for {month}");
            }
        });
    }
}

/// Pair each employee id found in `sessions` with its roster entry.
fn group_by_employee(roster: &[Employee], sessions: Vec<PresenceSession>) -> Vec<(Employee, Vec<PresenceSession>)> {
    let names: HashMap<i32, &Employee> = roster.iter().map(|e| (e.id, e)).collect();

    let mut grouped: BTreeMap<i32, Vec<PresenceSession>> = BTreeMap::new();
    for session in sessions {
        grouped.entry(session.employee_id).or_default().push(session);
    }

    grouped
        .into_iter()
        .map(|(id, sessions)| {
            let employee = names.get(&id).map_or_else(|| Employee::unknown(id), |e| (*e).clone());
            (employee, sessions)
        })
        .collect()
}
