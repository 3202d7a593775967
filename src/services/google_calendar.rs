// Google Calendar collaborator
//
// Thin client over the Calendar v3 REST API. Credential handling is an
// explicit state machine: Absent -> Loaded -> (Expired) -> Refreshed. The
// refreshed token is persisted back to the token file so the next process
// start picks it up.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::CalendarApi;

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

// Refresh slightly early so a token never expires mid-request
const EXPIRY_MARGIN_SECONDS: i64 = 30;

/// Persisted OAuth token, in the authorized-user file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (None, _) => true,
            (Some(_), Some(expiry)) => expiry <= now + Duration::seconds(EXPIRY_MARGIN_SECONDS),
            (Some(_), None) => false,
        }
    }
}

#[derive(Debug)]
enum TokenState {
    Absent,
    Loaded(StoredToken),
    Refreshed(StoredToken),
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Loads the token file lazily, refreshes on expiry, persists refreshes.
pub struct TokenManager {
    path: PathBuf,
    token_url: String,
    http: reqwest::Client,
    state: Mutex<TokenState>,
}

impl TokenManager {
    pub fn new(path: PathBuf, http: reqwest::Client) -> Self {
        Self {
            path,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            http,
            state: Mutex::new(TokenState::Absent),
        }
    }

    #[cfg(test)]
    fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    fn load(&self) -> Result<StoredToken> {
        if !self.path.exists() {
            bail!(
                "Token file {} not found, authorize first to create it",
                self.path.display()
            );
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file {}", self.path.display()))?;
        let token: StoredToken = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse token file {}", self.path.display()))?;
        debug!(path = %self.path.display(), "Loaded stored token");
        Ok(token)
    }

    fn persist(&self, token: &StoredToken) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(token).context("Failed to serialize token")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to persist token file {}", self.path.display()))?;
        Ok(())
    }

    async fn refresh(&self, token: &StoredToken) -> Result<StoredToken> {
        let Some(refresh_token) = token.refresh_token.as_deref() else {
            bail!("Token expired and no refresh token available, authorize again");
        };

        info!("Token expired, refreshing");
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", token.client_id.as_str()),
                ("client_secret", token.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("Token refresh request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Token refresh rejected with status {status}");
        }
        let refreshed: RefreshResponse = response
            .json()
            .await
            .context("Failed to parse token refresh response")?;

        let mut updated = token.clone();
        updated.token = Some(refreshed.access_token);
        updated.expiry = refreshed
            .expires_in
            .map(|seconds| Utc::now() + Duration::seconds(seconds));
        Ok(updated)
    }

    /// Get a valid bearer token, running the load/refresh transitions as
    /// needed.
    pub async fn bearer(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        let current = match std::mem::replace(&mut *state, TokenState::Absent) {
            TokenState::Absent => self.load()?,
            TokenState::Loaded(token) | TokenState::Refreshed(token) => token,
        };

        if current.is_expired(Utc::now()) {
            let refreshed = self.refresh(&current).await?;
            self.persist(&refreshed)?;
            let access = refreshed
                .token
                .clone()
                .context("Refresh produced no access token")?;
            *state = TokenState::Refreshed(refreshed);
            return Ok(access);
        }

        let access = current
            .token
            .clone()
            .context("Stored token has no access token, authorize again")?;
        *state = TokenState::Loaded(current);
        Ok(access)
    }
}

/// Google Calendar v3 client.
pub struct GoogleCalendar {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenManager,
}

impl GoogleCalendar {
    pub fn new(token_path: PathBuf, base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            tokens: TokenManager::new(token_path, http.clone()),
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendar {
    async fn list_events(&self, calendar_id: &str, start: &str, end: &str) -> Result<Value> {
        info!(calendar_id, start, end, "Getting calendar events");
        let bearer = self.tokens.bearer().await?;

        let response = self
            .http
            .get(format!("{}/calendars/{}/events", self.base_url, calendar_id))
            .bearer_auth(bearer)
            .query(&[
                ("timeMin", start),
                ("timeMax", end),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await
            .context("Calendar list request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Failed to get calendar events: {status}");
        }
        response
            .json()
            .await
            .context("Failed to parse calendar list response")
    }

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<Value> {
        info!(calendar_id, event_id, "Getting calendar event");
        let bearer = self.tokens.bearer().await?;

        let response = self
            .http
            .get(format!(
                "{}/calendars/{}/events/{}",
                self.base_url, calendar_id, event_id
            ))
            .bearer_auth(bearer)
            .send()
            .await
            .context("Calendar get request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Failed to get calendar event: {status}");
        }
        response
            .json()
            .await
            .context("Failed to parse calendar event response")
    }

    async fn create_event(&self, calendar_id: &str, event: Value) -> Result<Value> {
        info!(calendar_id, "Creating calendar event");
        let bearer = self.tokens.bearer().await?;

        let response = self
            .http
            .post(format!("{}/calendars/{}/events", self.base_url, calendar_id))
            .bearer_auth(bearer)
            .json(&event)
            .send()
            .await
            .context("Calendar create request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Failed to create calendar event: {status}");
        }
        response
            .json()
            .await
            .context("Failed to parse created event response")
    }
}
