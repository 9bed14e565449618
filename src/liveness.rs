//! Agent liveness classification from heartbeat staleness.
//!
//! Classification is recomputed on every call from the sample and an explicit
//! `now`; nothing is carried between calls.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{AgentHealth, AgentHealthState, AgentSelection, HeartbeatSample, LastSeen, Thresholds};

/// Classify a site from its heartbeat samples.
///
/// An empty sequence is `UNKNOWN` ("No agent data"). With several samples,
/// `selection` decides which one represents the site.
pub fn classify(
    samples: &[HeartbeatSample],
    selection: AgentSelection,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> AgentHealth {
    let chosen = match selection {
        AgentSelection::First => samples.first(),
        AgentSelection::MostRecent => samples.iter().max_by_key(|s| s.heartbeat()),
    };

    match chosen {
        Some(sample) => classify_sample(sample, thresholds, now),
        None => AgentHealth::no_agent_data(),
    }
}

/// Classify every sample independently, preserving input order.
pub fn classify_each(samples: &[HeartbeatSample], thresholds: &Thresholds, now: DateTime<Utc>) -> Vec<AgentHealth> {
    samples
        .iter()
        .map(|sample| classify_sample(sample, thresholds, now))
        .collect()
}

/// Classify the outcome of a heartbeat fetch; a failed fetch degrades to `UNKNOWN`.
pub fn classify_fetch(
    fetched: Result<Vec<HeartbeatSample>>,
    selection: AgentSelection,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> AgentHealth {
    match fetched {
        Ok(samples) => classify(&samples, selection, thresholds, now),
        Err(e) => {
            warn!("Heartbeat data unavailable: {e}");
            AgentHealth::no_agent_data()
        }
    }
}

/// Classify a single agent.
pub fn classify_sample(sample: &HeartbeatSample, thresholds: &Thresholds, now: DateTime<Utc>) -> AgentHealth {
    let Some(heartbeat) = sample.heartbeat() else {
        return AgentHealth {
            site_id: Some(sample.site_id.clone()),
            state: AgentHealthState::Unknown,
            last_seen: LastSeen::NoHeartbeat,
        };
    };

    let mut seconds_ago = (now - heartbeat).num_seconds();
    if seconds_ago < 0 {
        // Future heartbeat: agent clock ahead of ours
        debug!(site_id = %sample.site_id, skew_secs = -seconds_ago, "heartbeat is in the future");
        seconds_ago = 0;
    }

    AgentHealth {
        site_id: Some(sample.site_id.clone()),
        state: state_for(seconds_ago, thresholds),
        last_seen: LastSeen::SecondsAgo(seconds_ago),
    }
}

fn state_for(seconds_ago: i64, thresholds: &Thresholds) -> AgentHealthState {
    if seconds_ago < thresholds.healthy_seconds() {
        AgentHealthState::Healthy
    } else if seconds_ago <= thresholds.degraded_seconds() {
        AgentHealthState::Degraded
    } else {
        AgentHealthState::Offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use chrono::{TimeDelta, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn sample(site: &str, seconds_ago: i64) -> HeartbeatSample {
        HeartbeatSample {
            site_id: site.to_string(),
            last_heartbeat: Some(now() - TimeDelta::seconds(seconds_ago)),
            has_last_heartbeat: true,
        }
    }

    fn state_at(seconds_ago: i64) -> AgentHealthState {
        classify_sample(&sample("site-1", seconds_ago), &Thresholds::default(), now()).state
    }

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(state_at(0), AgentHealthState::Healthy);
        assert_eq!(state_at(349), AgentHealthState::Healthy);
        assert_eq!(state_at(350), AgentHealthState::Degraded);
        assert_eq!(state_at(700), AgentHealthState::Degraded);
        assert_eq!(state_at(701), AgentHealthState::Offline);
    }

    #[test]
    fn test_descriptor_reports_seconds() {
        let health = classify_sample(&sample("site-1", 120), &Thresholds::default(), now());
        assert_eq!(health.descriptor(), "120 seconds ago");
        assert_eq!(health.site_id.as_deref(), Some("site-1"));
    }

    #[test]
    fn test_future_heartbeat_is_healthy() {
        let health = classify_sample(&sample("site-1", -90), &Thresholds::default(), now());
        assert_eq!(health.state, AgentHealthState::Healthy);
        assert_eq!(health.last_seen, LastSeen::SecondsAgo(0));
    }

    #[test]
    fn test_empty_input_is_unknown() {
        let health = classify(&[], AgentSelection::First, &Thresholds::default(), now());
        assert_eq!(health.state, AgentHealthState::Unknown);
        assert_eq!(health.descriptor(), "No agent data");
    }

    #[test]
    fn test_missing_heartbeat_is_unknown() {
        let never = HeartbeatSample {
            site_id: "site-1".to_string(),
            last_heartbeat: None,
            has_last_heartbeat: false,
        };
        let health = classify(&[never], AgentSelection::First, &Thresholds::default(), now());
        assert_eq!(health.state, AgentHealthState::Unknown);
        assert_eq!(health.descriptor(), "No heartbeat received");
    }

    #[test]
    fn test_selection_policies() {
        let samples = vec![sample("stale", 1000), sample("fresh", 10)];
        let thresholds = Thresholds::default();

        let first = classify(&samples, AgentSelection::First, &thresholds, now());
        assert_eq!(first.state, AgentHealthState::Offline);

        let recent = classify(&samples, AgentSelection::MostRecent, &thresholds, now());
        assert_eq!(recent.state, AgentHealthState::Healthy);
        assert_eq!(recent.site_id.as_deref(), Some("fresh"));
    }

    #[test]
    fn test_classify_each_keeps_order() {
        let samples = vec![sample("a", 10), sample("b", 400), sample("c", 800)];
        let states: Vec<_> = classify_each(&samples, &Thresholds::default(), now())
            .into_iter()
            .map(|h| h.state)
            .collect();
        assert_eq!(
            states,
            vec![AgentHealthState::Healthy, AgentHealthState::Degraded, AgentHealthState::Offline]
        );
    }

    #[test]
    fn test_failed_fetch_degrades_to_unknown() {
        let health = classify_fetch(
            Err(AppError::unavailable("connection refused")),
            AgentSelection::First,
            &Thresholds::default(),
            now(),
        );
        assert_eq!(health.state, AgentHealthState::Unknown);
    }
}
