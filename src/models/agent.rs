//! Heartbeat samples and agent health states.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Latest heartbeat known for a monitoring agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatSample {
    pub site_id: String,
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// `false` when the agent never sent a heartbeat.
    pub has_last_heartbeat: bool,
}

impl HeartbeatSample {
    /// The heartbeat timestamp, if one was ever recorded.
    pub fn heartbeat(&self) -> Option<DateTime<Utc>> {
        if self.has_last_heartbeat { self.last_heartbeat } else { None }
    }
}

/// Health class of a monitoring agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentHealthState {
    Healthy,
    Degraded,
    Offline,
    Unknown,
}

impl AgentHealthState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Healthy => "HEALTHY",
            Self::Degraded => "DEGRADED",
            Self::Offline => "OFFLINE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for AgentHealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structured "last seen" value behind the health descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastSeen {
    NoAgentData,
    NoHeartbeat,
    /// Staleness in whole seconds, never negative.
    SecondsAgo(i64),
}

impl fmt::Display for LastSeen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAgentData => f.write_str("No agent data"),
            Self::NoHeartbeat => f.write_str("No heartbeat received"),
            Self::SecondsAgo(seconds) => write!(f, "{seconds} seconds ago"),
        }
    }
}

/// Result of classifying an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentHealth {
    pub site_id: Option<String>,
    pub state: AgentHealthState,
    pub last_seen: LastSeen,
}

impl AgentHealth {
    /// Health when no sample is available at all.
    pub fn no_agent_data() -> Self {
        Self {
            site_id: None,
            state: AgentHealthState::Unknown,
            last_seen: LastSeen::NoAgentData,
        }
    }

    /// Human-readable "last seen" text.
    pub fn descriptor(&self) -> String {
        self.last_seen.to_string()
    }
}

/// Staleness thresholds in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    healthy_seconds: i64,
    degraded_seconds: i64,
}

impl Thresholds {
    /// Requires `0 < healthy_seconds <= degraded_seconds`.
    pub fn new(healthy_seconds: i64, degraded_seconds: i64) -> Result<Self> {
        if healthy_seconds <= 0 {
            return Err(AppError::validation("healthy threshold must be greater than 0"));
        }
        if healthy_seconds > degraded_seconds {
            return Err(AppError::validation(format!(
                "healthy threshold ({healthy_seconds}s) exceeds degraded threshold ({degraded_seconds}s)"
            )));
        }
        Ok(Self {
            healthy_seconds,
            degraded_seconds,
        })
    }

    pub fn healthy_seconds(&self) -> i64 {
        self.healthy_seconds
    }

    pub fn degraded_seconds(&self) -> i64 {
        self.degraded_seconds
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            healthy_seconds: 350,
            degraded_seconds: 700,
        }
    }
}

/// Which sample represents a site when several agents report for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentSelection {
    /// First sample in the supplied order.
    #[default]
    First,
    /// Sample with the newest heartbeat.
    MostRecent,
}
