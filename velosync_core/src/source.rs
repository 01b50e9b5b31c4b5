//! Source platform client (Zwift)
//!
//! Lists recorded activities and downloads their raw FIT files. The
//! processor only depends on the [`SourceClient`] trait; the Zwift
//! implementation lives here so the orchestration can be tested against a
//! scripted mock.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use log::{debug, info};
use serde::Deserialize;

use crate::error::{Result, TransferError, ValidationError};

const AUTH_URL: &str = "https://secure.zwift.com/auth/realms/zwift/protocol/openid-connect/token";
const API_BASE: &str = "https://us-or-rly101.zwift.com/api";
const CLIENT_ID: &str = "Zwift_Mobile_Link";

/// Page size used when flattening the activity listing
const PAGE_SIZE: usize = 10;
/// Ceiling on each raw-file download; exceeding it is fatal, not retried
const DOWNLOAD_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// One activity as returned by the source listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRef {
    /// Source platform activity identifier
    pub id: u64,
    /// S3 bucket holding the raw FIT file
    pub fit_file_bucket: String,
    /// S3 object key of the raw FIT file
    pub fit_file_key: String,
    /// Recording start timestamp, with the platform's UTC offset
    #[serde(deserialize_with = "deserialize_start_date")]
    pub start_date: DateTime<FixedOffset>,
}

/// Zwift renders timestamps as `2026-08-01T09:30:00.000+0000`, which is not
/// quite RFC 3339 (no colon in the offset), so chrono's default `Deserialize`
/// rejects them.
fn deserialize_start_date<'de, D>(deserializer: D) -> std::result::Result<DateTime<FixedOffset>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f%z").map_err(serde::de::Error::custom)
}

impl ActivityRef {
    /// Signed storage URL of the raw FIT file
    pub fn download_url(&self) -> String {
        format!(
            "https://{}.s3.amazonaws.com/{}",
            self.fit_file_bucket, self.fit_file_key
        )
    }
}

/// Contract the processor depends on for the source platform
#[async_trait::async_trait]
pub trait SourceClient: Send + Sync {
    /// Establish a session with the source platform
    async fn authenticate(&self) -> Result<()>;

    /// List activities, newest first, pagination flattened
    async fn list_activities(&self) -> Result<Vec<ActivityRef>>;

    /// Download one activity's raw FIT file, returning its local path
    async fn download(&self, activity: &ActivityRef) -> Result<PathBuf>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct Profile {
    id: u64,
}

/// Zwift API client
pub struct ZwiftClient {
    http: reqwest::Client,
    username: String,
    password: String,
    scratch_dir: PathBuf,
    session: tokio::sync::RwLock<Option<Session>>,
}

struct Session {
    access_token: String,
    profile_id: u64,
}

impl ZwiftClient {
    /// Create a client; `scratch_dir` receives the downloaded FIT files
    pub fn new(username: &str, password: &str, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            http: reqwest::Client::new(),
            username: username.to_string(),
            password: password.to_string(),
            scratch_dir: scratch_dir.into(),
            session: tokio::sync::RwLock::new(None),
        }
    }

    async fn session_token(&self) -> Result<(String, u64)> {
        let session = self.session.read().await;
        match session.as_ref() {
            Some(session) => Ok((session.access_token.clone(), session.profile_id)),
            None => Err(ValidationError::invalid_configuration(
                "must authenticate with Zwift before listing activities",
            )
            .into()),
        }
    }

    async fn fetch_page(
        &self,
        token: &str,
        profile_id: u64,
        start: usize,
    ) -> Result<Vec<ActivityRef>> {
        let url = format!("{API_BASE}/profiles/{profile_id}/activities");
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("start", start), ("limit", PAGE_SIZE)])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(TransferError::rate_limited("zwift", "activity listing").into());
        }
        if !status.is_success() {
            return Err(TransferError::server("zwift", status.as_u16(), "activity listing").into());
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl SourceClient for ZwiftClient {
    async fn authenticate(&self) -> Result<()> {
        info!("Authenticating with Zwift...");

        let response = self
            .http
            .post(AUTH_URL)
            .form(&[
                ("client_id", CLIENT_ID),
                ("grant_type", "password"),
                ("username", &self.username),
                ("password", &self.password),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(TransferError::authentication("zwift", "credentials rejected").into());
        }
        if !status.is_success() {
            return Err(TransferError::server("zwift", status.as_u16(), "token request").into());
        }

        let token: TokenResponse = response.json().await?;

        let profile: Profile = self
            .http
            .get(format!("{API_BASE}/profiles/me"))
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        *self.session.write().await = Some(Session {
            access_token: token.access_token,
            profile_id: profile.id,
        });

        info!("Successfully authenticated with Zwift");
        Ok(())
    }

    async fn list_activities(&self) -> Result<Vec<ActivityRef>> {
        let (token, profile_id) = self.session_token().await?;

        let mut activities = Vec::new();
        let mut start = 0;
        loop {
            let page = self.fetch_page(&token, profile_id, start).await?;
            let page_len = page.len();
            activities.extend(page);
            start += PAGE_SIZE;
            if page_len != PAGE_SIZE {
                break;
            }
        }

        info!("Activities found: {}", activities.len());
        Ok(activities)
    }

    async fn download(&self, activity: &ActivityRef) -> Result<PathBuf> {
        let url = activity.download_url();
        info!("Downloading activity {}...", activity.id);
        debug!("Download link: {url}");

        let response = self
            .http
            .get(&url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;

        let fit_path = self
            .scratch_dir
            .join(format!("zwift_activity_{}.fit", activity.id));
        tokio::fs::write(&fit_path, &body).await?;

        info!(
            "Activity {} downloaded to {}",
            activity.id,
            fit_path.display()
        );
        Ok(fit_path)
    }
}
