use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize};

use super::{ProviderError, Row, Session, TelemetryProvider};

const RACE_SESSION_NAME: &str = "Race";

/// Telemetry backed by the public OpenF1 REST API.
#[derive(Clone)]
pub struct OpenF1Provider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Meeting {
    pub meeting_key: u64,
    #[serde(default)]
    pub meeting_name: String,
    #[serde(default)]
    pub meeting_official_name: String,
    #[serde(default)]
    pub country_name: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Deserialize, Debug)]
struct SessionEntry {
    session_key: u64,
}

#[derive(Deserialize, Debug)]
struct DriverEntry {
    driver_number: u32,
}

/// Matches an event by name the way people type it: "Australian Grand Prix",
/// "australia" and "Melbourne" all find the same meeting. Exact event names
/// win over country or location matches.
pub fn find_meeting<'a>(meetings: &'a [Meeting], race_name: &str) -> Option<&'a Meeting> {
    let wanted = race_name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    let eq = |s: &str| s.to_lowercase() == wanted;

    meetings
        .iter()
        .find(|m| eq(&m.meeting_name) || eq(&m.meeting_official_name))
        .or_else(|| meetings.iter().find(|m| eq(&m.country_name) || eq(&m.location)))
        .or_else(|| {
            meetings
                .iter()
                .find(|m| m.meeting_name.to_lowercase().contains(&wanted))
        })
}

impl OpenF1Provider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    // OpenF1 answers 404 when a filter matches nothing; that is an empty table.
    async fn get_rows<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self.client.get(&url).query(query).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            s if s.is_success() => Ok(resp.json::<Vec<T>>().await?),
            s => Err(ProviderError::Upstream(format!("HTTP {} from {}", s, url))),
        }
    }

    async fn driver_number(
        &self,
        session: &Session,
        driver_code: &str,
    ) -> Result<Option<u32>, ProviderError> {
        let drivers: Vec<DriverEntry> = self
            .get_rows(
                "drivers",
                &[
                    ("session_key", session.key.to_string()),
                    ("name_acronym", driver_code.trim().to_uppercase()),
                ],
            )
            .await?;
        Ok(drivers.first().map(|d| d.driver_number))
    }

    async fn driver_rows(
        &self,
        table: &str,
        session: &Session,
        driver_code: &str,
    ) -> Result<Vec<Row>, ProviderError> {
        let Some(number) = self.driver_number(session, driver_code).await? else {
            tracing::debug!(driver = %driver_code, session = session.key, "driver not in session");
            return Ok(Vec::new());
        };
        self.get_rows(
            table,
            &[
                ("session_key", session.key.to_string()),
                ("driver_number", number.to_string()),
            ],
        )
        .await
    }
}

#[async_trait]
impl TelemetryProvider for OpenF1Provider {
    async fn load_session(&self, year: i32, race_name: &str) -> Result<Session, ProviderError> {
        let not_found = || ProviderError::SessionNotFound {
            year,
            race_name: race_name.to_string(),
        };

        let meetings: Vec<Meeting> = self.get_rows("meetings", &[("year", year.to_string())]).await?;
        let meeting = find_meeting(&meetings, race_name).ok_or_else(not_found)?;

        let sessions: Vec<SessionEntry> = self
            .get_rows(
                "sessions",
                &[
                    ("meeting_key", meeting.meeting_key.to_string()),
                    ("session_name", RACE_SESSION_NAME.to_string()),
                ],
            )
            .await?;
        let entry = sessions.first().ok_or_else(not_found)?;

        tracing::info!(
            year,
            meeting = %meeting.meeting_name,
            session = entry.session_key,
            "loaded race session"
        );
        Ok(Session {
            key: entry.session_key,
            year,
            race_name: meeting.meeting_name.clone(),
        })
    }

    async fn laps(&self, session: &Session, driver_code: &str) -> Result<Vec<Row>, ProviderError> {
        self.driver_rows("laps", session, driver_code).await
    }

    async fn car_data(
        &self,
        session: &Session,
        driver_code: &str,
    ) -> Result<Vec<Row>, ProviderError> {
        self.driver_rows("car_data", session, driver_code).await
    }
}
