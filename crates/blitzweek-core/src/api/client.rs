//! ApiClient: async access to the event backend.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::DATE;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::error::ApiError;
use crate::registration::{RegistrationPayload, RegistrationReceipt};
use crate::stats::LiveStats;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const HEALTH: &str = "/health";
const LIVE_COUNT: &str = "/stats/live-count";
const REGISTER: &str = "/register";

/// Live counts plus the server clock reading that came with them.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveCount {
    pub stats: LiveStats,
    pub server_time: Option<DateTime<Utc>>,
}

/// Whether an identifier already has a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Registered,
    NotRegistered,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

/// Client for the backend's REST endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:5000/api`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl {
            url: base_url.clone(),
            message: e.to_string(),
        })?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                endpoint: base_url.clone(),
                source,
            })?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Backend clock, read from the `Date` header of `GET /health`.
    ///
    /// The response status and body are ignored.
    pub async fn server_time(&self) -> Result<DateTime<Utc>, ApiError> {
        let resp = self.get(HEALTH).await?;
        server_date(&resp).ok_or_else(|| ApiError::MissingDate {
            endpoint: HEALTH.into(),
        })
    }

    /// Current registration counts.
    pub async fn live_count(&self) -> Result<LiveCount, ApiError> {
        let resp = self.get(LIVE_COUNT).await?;
        let resp = ensure_success(LIVE_COUNT, resp).await?;
        let server_time = server_date(&resp);
        let envelope: Envelope<LiveStats> = read_json(LIVE_COUNT, resp).await?;
        let stats = envelope.data.ok_or_else(|| ApiError::UnexpectedBody {
            endpoint: LIVE_COUNT.into(),
            message: "missing `data`".into(),
        })?;
        Ok(LiveCount { stats, server_time })
    }

    /// `200` means registered, `404` means free; anything else is an error.
    pub async fn check_registration(
        &self,
        identifier: &str,
    ) -> Result<RegistrationStatus, ApiError> {
        let path = format!("/check-registration/{}", urlencoding::encode(identifier));
        let resp = self.get(&path).await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(RegistrationStatus::NotRegistered),
            s if s.is_success() => Ok(RegistrationStatus::Registered),
            _ => Err(rejection(&path, resp).await),
        }
    }

    /// Submit a normalized registration.
    pub async fn register(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<RegistrationReceipt, ApiError> {
        let url = self.url(REGISTER);
        tracing::debug!(%url, "POST");
        let resp = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: REGISTER.into(),
                source,
            })?;
        let resp = ensure_success(REGISTER, resp).await?;
        let envelope: Envelope<RegistrationReceipt> = read_json(REGISTER, resp).await?;
        match (envelope.success, envelope.data) {
            (Some(true), Some(receipt)) => Ok(receipt),
            _ => Err(ApiError::Rejected {
                endpoint: REGISTER.into(),
                status: StatusCode::OK.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "Failed to register. Try again.".into()),
            }),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<Response, ApiError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: path.to_string(),
                source,
            })
    }
}

fn server_date(resp: &Response) -> Option<DateTime<Utc>> {
    let raw = resp.headers().get(DATE)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

async fn ensure_success(endpoint: &str, resp: Response) -> Result<Response, ApiError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(rejection(endpoint, resp).await)
    }
}

/// Build a rejection, preferring the backend's `message` field.
async fn rejection(endpoint: &str, resp: Response) -> ApiError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(text);
    ApiError::Rejected {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        message,
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    resp: Response,
) -> Result<T, ApiError> {
    let text = resp.text().await.map_err(|source| ApiError::Transport {
        endpoint: endpoint.to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| ApiError::UnexpectedBody {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}
