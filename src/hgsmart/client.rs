//! HGSmart cloud API client
//!
//! Owns the session tokens and performs all vendor HTTP calls. Operations
//! return typed errors so callers can tell an expired session apart from a
//! network failure or a vendor-side error; nothing here panics on a bad
//! response.

use std::time::Duration;

use reqwest::multipart;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::hgsmart::command::FeedCommand;
use crate::models::{DeviceAttributes, DeviceRecord, FeederStats};

/// Production endpoint of the HGSmart cloud
pub const DEFAULT_BASE_URL: &str = "https://hgsmart.net/hsapi";

/// OAuth client credentials of the vendor mobile app
const CLIENT_ID: &str = "r3ptinrmmsl9rnlis6yf";
const CLIENT_SECRET: &str = "ss9Ytzb4gSceaPhwhKteAPLiVP4pmU8zxLEcWuscM6Vsnj7wMt";

const USER_AGENT: &str = "Dart/3.6 (dart:io)";
const ACCEPT_LANGUAGE: &str = "it-IT";
const ZONE_ID: &str = "Europe/Rome";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Application-level success code inside the response envelope
const CODE_OK: i64 = 200;
/// Application-level code signalling an expired access token
const CODE_UNAUTHORIZED: i64 = 401;

/// Failure classes of the vendor API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("vendor error {code}: {msg}")]
    Application { code: i64, msg: String },

    #[error("not found: {0}")]
    NotFound(String),
}

/// Response envelope common to every vendor call
#[derive(Debug, Deserialize)]
struct VendorResponse<T> {
    code: i64,
    msg: Option<String>,
    data: Option<T>,
}

impl<T> VendorResponse<T> {
    fn message(&self) -> String {
        self.msg.clone().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct TokenData {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
}

#[derive(Debug, Default)]
struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// API client for HGSmart feeder devices.
///
/// Token state is behind a lock for memory safety only; refreshes are not
/// deduplicated. Two callers observing an expired token may both refresh,
/// last write wins, and either token pair remains valid.
pub struct HgSmartClient {
    http: Client,
    base_url: String,
    username: String,
    password: Option<String>,
    tokens: RwLock<TokenState>,
}

impl HgSmartClient {
    /// Client that authenticates with username and password
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::build(base_url.into(), username.into(), Some(password.into()), None)
    }

    /// Client seeded with a persisted refresh token; the password is never
    /// held and the session is bootstrapped via `refresh_access_token`
    pub fn with_refresh_token(
        base_url: impl Into<String>,
        username: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self::build(
            base_url.into(),
            username.into(),
            None,
            Some(refresh_token.into()),
        )
    }

    fn build(
        base_url: String,
        username: String,
        password: Option<String>,
        refresh_token: Option<String>,
    ) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
            tokens: RwLock::new(TokenState {
                access_token: None,
                refresh_token,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Apply the fixed vendor header set, plus a bearer token when held
    fn request(&self, builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        let builder = builder
            .header("User-Agent", USER_AGENT)
            .header("Accept-Language", ACCEPT_LANGUAGE)
            .header("Zoneid", ZONE_ID)
            .header("Client", CLIENT_ID)
            .header("Wunit", "0")
            .header("Tunit", "0");

        match token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn access_token(&self) -> Option<String> {
        self.tokens.read().await.access_token.clone()
    }

    /// Whether an access token is currently held
    pub async fn has_access_token(&self) -> bool {
        self.tokens.read().await.access_token.is_some()
    }

    /// Establish a session: password login when a password is configured,
    /// otherwise bootstrap from the persisted refresh token
    pub async fn authenticate(&self) -> Result<(), ApiError> {
        if self.password.is_some() {
            self.login().await
        } else {
            self.refresh_access_token().await
        }
    }

    /// Login with username and password, storing both session tokens
    pub async fn login(&self) -> Result<(), ApiError> {
        let password = self
            .password
            .clone()
            .ok_or_else(|| ApiError::Auth("no password configured".to_string()))?;

        let payload = serde_json::json!({
            "account_num": self.username,
            "pwd": password,
            "captcha_uuid": "",
            "client_id": CLIENT_ID,
            "client_secret": CLIENT_SECRET,
        });

        let response: VendorResponse<TokenData> = self
            .request(self.http.post(self.url("/oauth/login")), None)
            .header("Authorization", "Bearer null")
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if response.code != CODE_OK {
            let msg = response.message();
            tracing::error!("[HGSmart] Login failed: {}", msg);
            return Err(ApiError::Auth(msg));
        }

        let data = response
            .data
            .ok_or_else(|| ApiError::Auth("login response missing token data".to_string()))?;
        self.store_tokens(data).await;
        tracing::info!("[HGSmart] Logged in as {}", self.username);
        Ok(())
    }

    /// Refresh the access token using the held refresh token.
    ///
    /// On failure the existing (stale) tokens remain, so the next call fails
    /// and may attempt refresh again.
    pub async fn refresh_access_token(&self) -> Result<(), ApiError> {
        let (access_token, refresh_token) = {
            let tokens = self.tokens.read().await;
            (tokens.access_token.clone(), tokens.refresh_token.clone())
        };
        let refresh_token =
            refresh_token.ok_or_else(|| ApiError::Auth("no refresh token held".to_string()))?;

        let payload = serde_json::json!({ "refreshtoken": refresh_token });

        let response: VendorResponse<TokenData> = self
            .request(
                self.http.post(self.url("/oauth/refreshToken")),
                access_token.as_deref(),
            )
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if response.code != CODE_OK {
            let msg = response.message();
            tracing::error!("[HGSmart] Token refresh failed: {}", msg);
            return Err(ApiError::Auth(msg));
        }

        let data = response
            .data
            .ok_or_else(|| ApiError::Auth("refresh response missing token data".to_string()))?;
        self.store_tokens(data).await;
        tracing::info!("[HGSmart] Refreshed session tokens");
        Ok(())
    }

    async fn store_tokens(&self, data: TokenData) {
        let mut tokens = self.tokens.write().await;
        tokens.access_token = Some(data.access_token);
        tokens.refresh_token = Some(data.refresh_token);
    }

    /// List all devices on the account.
    ///
    /// An expired-token response triggers exactly one refresh, and on refresh
    /// success the fetch is retried exactly once. `Ok(vec![])` means the
    /// account genuinely has zero devices.
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>, ApiError> {
        match self.fetch_devices().await {
            Err(ApiError::Auth(msg)) => {
                tracing::info!("[HGSmart] Access token expired ({}), refreshing", msg);
                self.refresh_access_token().await?;
                self.fetch_devices().await
            }
            other => other,
        }
    }

    async fn fetch_devices(&self) -> Result<Vec<DeviceRecord>, ApiError> {
        let devices: Option<Vec<DeviceRecord>> = self.call_get("/app/device/list").await?;
        Ok(devices.unwrap_or_default())
    }

    /// Feeder statistics (remaining food, desiccant expiration)
    pub async fn get_feeder_stats(&self, device_id: &str) -> Result<FeederStats, ApiError> {
        let path = format!("/app/device/feeder/summary/{}", device_id);
        self.call_get(&path)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no feeder stats for device {}", device_id)))
    }

    /// Device attributes, including the feeding schedule
    pub async fn get_device_attributes(
        &self,
        device_id: &str,
    ) -> Result<DeviceAttributes, ApiError> {
        let path = format!("/app/device/attribute/{}", device_id);
        self.call_get(&path)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no attributes for device {}", device_id)))
    }

    async fn call_get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        let token = self.access_token().await;
        let response: VendorResponse<T> = self
            .request(self.http.get(self.url(path)), token.as_deref())
            .send()
            .await?
            .json()
            .await?;

        match response.code {
            CODE_OK => Ok(response.data),
            CODE_UNAUTHORIZED => Err(ApiError::Auth(response.message())),
            code => {
                let msg = response.message();
                tracing::error!("[HGSmart] GET {} failed: {} ({})", path, msg, code);
                Err(ApiError::Application { code, msg })
            }
        }
    }

    /// Dispense `portions` from a feeder now.
    ///
    /// The command envelope is sent as a single multipart form field named
    /// `command` with content type `application/json`.
    pub async fn send_feed_command(&self, device_id: &str, portions: u8) -> Result<(), ApiError> {
        let command = FeedCommand::now(portions);
        let payload = serde_json::to_string(&command).map_err(|e| ApiError::Application {
            code: 0,
            msg: format!("failed to encode command envelope: {}", e),
        })?;

        let part = multipart::Part::text(payload).mime_str("application/json")?;
        let form = multipart::Form::new().part("command", part);

        let token = self.access_token().await;
        let url = self.url(&format!("/app/device/attribute/{}", device_id));
        let response: VendorResponse<serde_json::Value> = self
            .request(self.http.put(url), token.as_deref())
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;

        match response.code {
            CODE_OK => {
                tracing::info!(
                    "[HGSmart] Feed command sent to {} ({} portions)",
                    device_id,
                    portions
                );
                Ok(())
            }
            CODE_UNAUTHORIZED => Err(ApiError::Auth(response.message())),
            code => {
                let msg = response.message();
                tracing::error!("[HGSmart] Feed command failed: {}", msg);
                Err(ApiError::Application { code, msg })
            }
        }
    }
}
