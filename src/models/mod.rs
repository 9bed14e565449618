//! Data models for presence sessions, attendance rollups and agent health.

pub mod agent;
pub mod period;
pub mod presence;

pub use agent::{AgentHealth, AgentHealthState, AgentSelection, HeartbeatSample, LastSeen, Thresholds};
pub use period::{DayWindow, Direction, YearMonth};
pub use presence::{
    AgentDowntime, DailyDetail, DailyPresenceRecord, DayStatus, Employee, EmployeeMonthlyDetail, EmployeeStatus,
    MonthlyPresenceRecord, PresenceSession,
};
