//! Destination platform client (Garmin Connect)
//!
//! Authenticates against Garmin Connect using a persisted OAuth token
//! (valid for up to a year), falling back to a credential login when the
//! token is missing or expired, and uploads transformed FIT files. An HTTP
//! 409 on upload means the activity is already there and is reported as
//! [`UploadOutcome::Duplicate`], not as an error.

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransferError};

const SSO_URL: &str = "https://sso.garmin.com/sso/signin";
const UPLOAD_URL: &str = "https://connectapi.garmin.com/upload-service/upload/.fit";

/// Result of a destination upload
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// The platform accepted the file; response body attached
    Accepted(serde_json::Value),
    /// The platform already has this activity (HTTP 409)
    Duplicate,
}

/// Contract the processor depends on for the destination platform
#[async_trait::async_trait]
pub trait DestinationClient: Send + Sync {
    /// Load or refresh the session token
    async fn authenticate(&self) -> Result<()>;

    /// Upload a FIT file
    async fn upload(&self, fit_path: &Path) -> Result<UploadOutcome>;
}

/// Persisted session token, stored as JSON at a fixed path across runs
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    /// Unix timestamp after which the token is considered stale
    expires_at: i64,
}

impl StoredToken {
    fn is_valid(&self) -> bool {
        self.expires_at > Utc::now().timestamp()
    }
}

/// Garmin Connect API client
pub struct GarminClient {
    http: reqwest::Client,
    username: String,
    password: String,
    token_path: PathBuf,
    token: tokio::sync::RwLock<Option<StoredToken>>,
}

impl GarminClient {
    /// Create a client persisting its session token at `token_path`
    pub fn new(username: &str, password: &str, token_path: impl Into<PathBuf>) -> Self {
        Self {
            http: reqwest::Client::new(),
            username: username.to_string(),
            password: password.to_string(),
            token_path: token_path.into(),
            token: tokio::sync::RwLock::new(None),
        }
    }

    /// Try the persisted token file; `None` when missing, unreadable, or stale
    async fn load_stored_token(&self) -> Option<StoredToken> {
        let raw = match tokio::fs::read_to_string(&self.token_path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No usable token file at {}: {e}", self.token_path.display());
                return None;
            }
        };

        match serde_json::from_str::<StoredToken>(&raw) {
            Ok(token) if token.is_valid() => Some(token),
            Ok(_) => {
                info!("Persisted Garmin token has expired");
                None
            }
            Err(e) => {
                warn!("Ignoring malformed token file: {e}");
                None
            }
        }
    }

    /// Credential login, returning a fresh token
    async fn login(&self) -> Result<StoredToken> {
        info!("Logging in to Garmin Connect with credentials...");

        let response = self
            .http
            .post(SSO_URL)
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
                ("embed", "false"),
            ])
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            401 | 403 => {
                return Err(TransferError::authentication(
                    "garmin",
                    "credentials rejected, check your username and password",
                )
                .into());
            }
            429 => {
                return Err(TransferError::rate_limited("garmin", "sign-in").into());
            }
            s if !status.is_success() => {
                return Err(TransferError::server("garmin", s, "sign-in").into());
            }
            _ => {}
        }

        #[derive(Deserialize)]
        struct LoginResponse {
            access_token: String,
            expires_in: i64,
        }

        let login: LoginResponse = response.json().await?;
        Ok(StoredToken {
            access_token: login.access_token,
            expires_at: Utc::now().timestamp() + login.expires_in,
        })
    }

    async fn persist_token(&self, token: &StoredToken) {
        if let Some(parent) = self.token_path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        match serde_json::to_string(token) {
            Ok(raw) => {
                if let Err(e) = tokio::fs::write(&self.token_path, raw).await {
                    warn!(
                        "Failed to persist Garmin token to {}: {e}",
                        self.token_path.display()
                    );
                }
            }
            Err(e) => warn!("Failed to serialize Garmin token: {e}"),
        }
    }

    async fn bearer_token(&self) -> Result<String> {
        let token = self.token.read().await;
        token
            .as_ref()
            .map(|t| t.access_token.clone())
            .ok_or_else(|| {
                TransferError::authentication("garmin", "must authenticate before uploading")
                    .into()
            })
    }
}

#[async_trait::async_trait]
impl DestinationClient for GarminClient {
    async fn authenticate(&self) -> Result<()> {
        info!("Logging in to Garmin Connect...");

        let token = match self.load_stored_token().await {
            Some(token) => token,
            None => {
                let token = self.login().await?;
                self.persist_token(&token).await;
                token
            }
        };

        *self.token.write().await = Some(token);
        info!("Successfully authenticated with Garmin Connect");
        Ok(())
    }

    async fn upload(&self, fit_path: &Path) -> Result<UploadOutcome> {
        let token = self.bearer_token().await?;

        info!("Uploading {} to Garmin Connect...", fit_path.display());

        let body = tokio::fs::read(fit_path).await.map_err(|e| {
            crate::error::IoError::from_std(e).with_path(fit_path)
        })?;
        let file_name = fit_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "activity.fit".to_string());

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(body).file_name(file_name),
        );

        let response = self
            .http
            .post(UPLOAD_URL)
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            409 => {
                info!("Activity already exists on Garmin Connect");
                Ok(UploadOutcome::Duplicate)
            }
            401 | 403 => {
                Err(TransferError::authentication("garmin", "upload rejected the session").into())
            }
            429 => Err(TransferError::rate_limited("garmin", "upload").into()),
            s if !status.is_success() => {
                let message = response.text().await.unwrap_or_default();
                Err(TransferError::Upload { status: s, message }.into())
            }
            _ => {
                let body: serde_json::Value =
                    response.json().await.unwrap_or(serde_json::Value::Null);
                info!("Upload successful");
                debug!("Upload response: {body}");
                Ok(UploadOutcome::Accepted(body))
            }
        }
    }
}
