//! Data-access seam between the engine and the presence backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{AgentDowntime, Employee, EmployeeStatus, HeartbeatSample, PresenceSession};

/// Whose sessions to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionScope {
    All,
    Employee(i32),
}

/// Supplier of raw presence data.
///
/// Each query fails on its own; callers decide how a failure affects their view.
pub trait PresenceSource {
    /// Employee roster used to resolve names.
    fn fetch_employees(&self) -> impl Future<Output = Result<Vec<Employee>>> + Send;

    /// Sessions intersecting the inclusive date range `from..=to`.
    fn fetch_sessions(
        &self,
        scope: SessionScope,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Future<Output = Result<Vec<PresenceSession>>> + Send;

    /// Latest heartbeat per agent, optionally restricted to one site.
    fn fetch_heartbeats(&self, site_id: Option<&str>) -> impl Future<Output = Result<Vec<HeartbeatSample>>> + Send;

    /// Real-time presence snapshot.
    fn fetch_current_status(&self) -> impl Future<Output = Result<Vec<EmployeeStatus>>> + Send;

    /// Agent downtime windows starting on `date`.
    fn fetch_downtimes(&self, date: NaiveDate) -> impl Future<Output = Result<Vec<AgentDowntime>>> + Send;
}
