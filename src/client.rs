//! Presence backend HTTP client.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{AppError, Result};
use crate::models::{AgentDowntime, Employee, EmployeeStatus, HeartbeatSample, PresenceSession};
use crate::source::{PresenceSource, SessionScope};

/// Presence backend HTTP client.
///
/// Talks to the backend's JSON API. Timestamps without an offset are
/// interpreted in the configured reporting timezone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    tz: Tz,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmployeeDto {
    employee_id: i32,
    employee_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionDto {
    employee_id: i32,
    start: String,
    end: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeartbeatDto {
    site_id: String,
    last_heartbeat: Option<String>,
    has_last_heartbeat: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusDto {
    employee_id: i32,
    employee_name: String,
    is_present: bool,
    current_area: Option<String>,
    last_seen: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DowntimeDto {
    downtime_start: String,
    downtime_end: String,
}

impl ApiClient {
    /// Create a new client instance.
    pub fn new(config: &ApiConfig, tz: Tz) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.bearer_token().map(str::to_string),
            tz,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{base}{path}", base = self.base_url);

        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::unavailable(format!("GET {path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::unavailable(format!("GET {path}: HTTP {status}")));
        }

        debug!("GET {path} -> {status}");

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::parse(format!("GET {path}: {e}")))
    }

    fn timestamp(&self, raw: &str) -> Result<DateTime<Utc>> {
        parse_timestamp(raw, &self.tz)
    }

    fn optional_timestamp(&self, raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
        raw.map(|s| self.timestamp(s)).transpose()
    }
}

impl PresenceSource for ApiClient {
    async fn fetch_employees(&self) -> Result<Vec<Employee>> {
        let rows: Vec<EmployeeDto> = self.get_json("/api/employees", &[]).await?;
        Ok(rows
            .into_iter()
            .map(|row| Employee::new(row.employee_id, row.employee_name))
            .collect())
    }

    async fn fetch_sessions(&self, scope: SessionScope, from: NaiveDate, to: NaiveDate) -> Result<Vec<PresenceSession>> {
        if to < from {
            return Err(AppError::invalid_range(format!("session range {from}..={to} is inverted")));
        }

        let mut query = vec![("from", from.to_string()), ("to", to.to_string())];
        if let SessionScope::Employee(id) = scope {
            query.push(("employeeId", id.to_string()));
        }

        let rows: Vec<SessionDto> = self.get_json("/api/sessions", &query).await?;
        rows.into_iter()
            .map(|row| {
                Ok(PresenceSession {
                    employee_id: row.employee_id,
                    start: self.timestamp(&row.start)?,
                    end: self.optional_timestamp(row.end.as_deref())?,
                })
            })
            .collect()
    }

    async fn fetch_heartbeats(&self, site_id: Option<&str>) -> Result<Vec<HeartbeatSample>> {
        let query: Vec<(&str, String)> = site_id.map(|id| ("siteId", id.to_string())).into_iter().collect();

        let rows: Vec<HeartbeatDto> = self.get_json("/api/agent-health", &query).await?;
        rows.into_iter()
            .map(|row| {
                let last_heartbeat = self.optional_timestamp(row.last_heartbeat.as_deref())?;
                Ok(HeartbeatSample {
                    site_id: row.site_id,
                    has_last_heartbeat: row.has_last_heartbeat.unwrap_or(last_heartbeat.is_some()),
                    last_heartbeat,
                })
            })
            .collect()
    }

    async fn fetch_current_status(&self) -> Result<Vec<EmployeeStatus>> {
        let rows: Vec<StatusDto> = self.get_json("/api/current", &[]).await?;
        rows.into_iter()
            .map(|row| {
                Ok(EmployeeStatus {
                    employee_id: row.employee_id,
                    employee_name: row.employee_name,
                    is_present: row.is_present,
                    current_area: row.current_area,
                    last_seen: self.optional_timestamp(row.last_seen.as_deref())?,
                })
            })
            .collect()
    }

    async fn fetch_downtimes(&self, date: NaiveDate) -> Result<Vec<AgentDowntime>> {
        let rows: Vec<DowntimeDto> = self.get_json("/api/downtimes", &[("date", date.to_string())]).await?;
        rows.into_iter()
            .map(|row| AgentDowntime::new(self.timestamp(&row.downtime_start)?, self.timestamp(&row.downtime_end)?))
            .collect()
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Values with an offset are taken as-is; values without one are local time in `tz`.
pub fn parse_timestamp(raw: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| AppError::parse(format!("Invalid timestamp '{raw}': {e}")))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AppError::parse(format!("Nonexistent local time: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::London;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: &str) -> ApiClient {
        let config = ApiConfig {
            base_url: server.uri(),
            token: token.to_string(),
            timeout_secs: 5,
        };
        ApiClient::new(&config, London).unwrap()
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        let dt = parse_timestamp("2025-07-01T09:30:00+02:00", &London).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 7, 1, 7, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_local() {
        // London is on BST (UTC+1) in July
        let dt = parse_timestamp("2025-07-01T09:30:00.125", &London).unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "08:30");

        let dt = parse_timestamp("2025-01-15 09:30:00", &London).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_invalid_timestamp() {
        assert!(parse_timestamp("invalid", &London).is_err());
        // Skipped hour on the spring-forward date
        assert!(parse_timestamp("2025-03-30T01:30:00", &London).is_err());
    }

    #[tokio::test]
    async fn test_fetch_sessions_converts_local_times() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/sessions"))
            .and(query_param("from", "2025-01-15"))
            .and(query_param("to", "2025-01-15"))
            .and(query_param("employeeId", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"employeeId": 7, "start": "2025-01-15T08:00:00", "end": "2025-01-15T12:00:00"},
                {"employeeId": 7, "start": "2025-01-15T13:00:00", "end": null}
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let sessions = client
            .fetch_sessions(SessionScope::Employee(7), date, date)
            .await
            .unwrap();

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].start, Utc.with_ymd_and_hms(2025, 1, 15, 8, 0, 0).unwrap());
        assert!(sessions[1].is_open());
    }

    #[tokio::test]
    async fn test_sends_bearer_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/employees"))
            .and(header("Authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"employeeId": 1, "employeeName": "Ana"}
            ])))
            .mount(&server)
            .await;

        let employees = client_for(&server, "secret-token").fetch_employees().await.unwrap();
        assert_eq!(employees, vec![Employee::new(1, "Ana")]);
    }

    #[tokio::test]
    async fn test_server_error_is_data_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/current"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client_for(&server, "").fetch_current_status().await;
        assert!(matches!(result, Err(AppError::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/current"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let result = client_for(&server, "").fetch_current_status().await;
        assert!(matches!(result, Err(AppError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_heartbeats_for_site() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/agent-health"))
            .and(query_param("siteId", "hq"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"siteId": "hq", "lastHeartbeat": "2025-01-15T10:00:00Z", "hasLastHeartbeat": true},
                {"siteId": "hq", "lastHeartbeat": null}
            ])))
            .mount(&server)
            .await;

        let samples = client_for(&server, "").fetch_heartbeats(Some("hq")).await.unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(
            samples[0].heartbeat(),
            Some(Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap())
        );
        assert!(!samples[1].has_last_heartbeat);
    }

    #[tokio::test]
    async fn test_fetch_downtimes() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/downtimes"))
            .and(query_param("date", "2025-01-15"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"downtimeStart": "2025-01-15T03:00:00", "downtimeEnd": "2025-01-15T03:20:00"}
            ])))
            .mount(&server)
            .await;

        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let downtimes = client_for(&server, "").fetch_downtimes(date).await.unwrap();

        assert_eq!(downtimes.len(), 1);
        assert_eq!(downtimes[0].duration(), chrono::TimeDelta::minutes(20));
    }

    #[tokio::test]
    async fn test_inverted_session_range_is_rejected() {
        let server = MockServer::start().await;
        let client = client_for(&server, "");
        let from = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 1, 14).unwrap();

        let result = client.fetch_sessions(SessionScope::All, from, to).await;
        assert!(matches!(result, Err(AppError::InvalidRange(_))));
    }
}
