use crate::error::{google_calendar_error, BookingResult};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Read/write access to calendars
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Lifetime requested for each signed assertion
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh this long before the token actually expires
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The fields of a service account key file that token exchange needs
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Load a key file downloaded from the Google Cloud console
    pub fn from_file(path: &Path) -> BookingResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            google_calendar_error(&format!(
                "Failed to read service account file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> BookingResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| google_calendar_error(&format!("Invalid service account file: {}", e)))
    }
}

/// Where bearer tokens come from
#[derive(Clone)]
pub enum TokenSource {
    /// A token issued elsewhere, used as is
    Static(String),
    /// Signed JWT assertions exchanged at the token endpoint
    ServiceAccount(ServiceAccountKey),
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Static(_) => f.write_str("Static(<redacted>)"),
            TokenSource::ServiceAccount(key) => f.debug_tuple("ServiceAccount").field(key).finish(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// Issues and caches access tokens for the Calendar API
pub struct TokenManager {
    source: TokenSource,
    token_url: String,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("source", &self.source)
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(source: TokenSource, token_url: &str, client: Client) -> Self {
        // Key files name their own token endpoint
        let token_url = match &source {
            TokenSource::ServiceAccount(key) => key
                .token_uri
                .clone()
                .unwrap_or_else(|| token_url.to_string()),
            TokenSource::Static(_) => token_url.to_string(),
        };

        Self {
            source,
            token_url,
            client,
            cached: Mutex::new(None),
        }
    }

    /// Get a valid access token, exchanging a new assertion when the cached one is about to expire
    pub async fn get_token(&self) -> BookingResult<String> {
        let key = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ServiceAccount(key) => key,
        };

        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();
        if let Some(token) = cached.as_ref() {
            if token.expires_at > now {
                return Ok(token.access_token.clone());
            }
            debug!("Cached calendar token expired, requesting a new one");
        }

        let token = self.exchange_assertion(key, now).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Sign a JWT for the service account
    fn sign_assertion(&self, key: &ServiceAccountKey, now: i64) -> BookingResult<String> {
        let claims = Claims {
            iss: &key.client_email,
            scope: CALENDAR_SCOPE,
            aud: &self.token_url,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| google_calendar_error(&format!("Invalid service account private key: {}", e)))?;

        encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| google_calendar_error(&format!("Failed to sign token assertion: {}", e)))
    }

    async fn exchange_assertion(&self, key: &ServiceAccountKey, now: i64) -> BookingResult<CachedToken> {
        let assertion = self.sign_assertion(key, now)?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to request token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to request token: HTTP {} - {}",
                status, error_body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse token response: {}", e)))?;

        let expires_in = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        info!("Service account {} authenticated", key.client_email);

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + expires_in - EXPIRY_MARGIN_SECS,
        })
    }
}
