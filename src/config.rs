use crate::error::{config_error, env_error, BookingResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the optional settings file
pub const DEFAULT_CONFIG_PATH: &str = "config/courtbot.toml";

/// Default address attached to calendar events
pub const DEFAULT_LOCATION: &str = "755 S Mathilda Ave, Sunnyvale, CA  94087, United States";

/// Default operational timezone of the club
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

/// What to do when the calendar duplicate check itself fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateCheckPolicy {
    /// Treat a failed check as "no duplicate" and insert anyway
    #[default]
    FailOpen,
    /// Skip the event and report it as failed
    FailClosed,
}

/// Login credentials for the booking portal
#[derive(Clone, Serialize, Deserialize)]
pub struct PortalCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for PortalCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Booking portal and WebDriver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSettings {
    /// Root URL of the club portal
    pub base_url: String,
    /// WebDriver server to drive the browser through
    pub webdriver_url: String,
    /// Run the browser without a window
    pub headless: bool,
    /// Wait bound for login, navigation and confirmation gates
    pub structural_timeout_secs: u64,
    /// Wait bound for a single slot probe
    pub slot_timeout_secs: u64,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            base_url: "https://lt.clubautomation.com".to_string(),
            webdriver_url: "http://localhost:4444".to_string(),
            headless: true,
            structural_timeout_secs: 20,
            slot_timeout_secs: 5,
        }
    }
}

impl PortalSettings {
    pub fn structural_timeout(&self) -> Duration {
        Duration::from_secs(self.structural_timeout_secs)
    }

    pub fn slot_timeout(&self) -> Duration {
        Duration::from_secs(self.slot_timeout_secs)
    }
}

/// Calendar event settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// IANA timezone the portal's times are expressed in
    pub timezone: String,
    /// Location attached to every synced event
    pub location: String,
    /// Description attached to every synced event
    pub description: String,
    /// Root of the Google Calendar v3 API
    pub api_base_url: String,
    /// OAuth token endpoint used for service account assertions
    pub token_url: String,
    pub duplicate_policy: DuplicateCheckPolicy,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            description: String::new(),
            api_base_url: "https://www.googleapis.com/calendar/v3".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            duplicate_policy: DuplicateCheckPolicy::FailOpen,
        }
    }
}

/// Optional settings file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub portal: PortalSettings,
    pub calendar: CalendarSettings,
}

impl FileSettings {
    /// Read settings from a TOML file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> BookingResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| config_error(&format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse settings from TOML text
    pub fn parse(content: &str) -> BookingResult<Self> {
        let settings: FileSettings = toml::from_str(content)?;

        if settings.portal.slot_timeout_secs == 0 {
            return Err(config_error("portal.slot_timeout_secs must be greater than zero"));
        }
        if settings.portal.structural_timeout_secs == 0 {
            return Err(config_error(
                "portal.structural_timeout_secs must be greater than zero",
            ));
        }

        Ok(settings)
    }
}

/// Google Calendar access configuration
#[derive(Debug, Clone)]
pub struct CalendarAccess {
    /// Calendar to mirror reservations into
    pub calendar_id: String,
    /// Service account key file
    pub service_account_path: Option<PathBuf>,
    /// Pre-issued bearer token, used instead of the service account when set
    pub access_token: Option<String>,
}

impl CalendarAccess {
    /// Load calendar credentials from the environment
    pub fn load() -> BookingResult<Self> {
        dotenv().ok();

        let calendar_id = env::var("CALENDAR_ID").map_err(|_| env_error("CALENDAR_ID"))?;
        let access_token = env::var("GOOGLE_ACCESS_TOKEN").ok().filter(|t| !t.is_empty());

        let service_account_path = match env::var("GOOGLE_APPLICATION_CREDENTIALS_PATH") {
            Ok(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ if access_token.is_some() => None,
            _ => return Err(env_error("GOOGLE_APPLICATION_CREDENTIALS_PATH")),
        };

        Ok(Self {
            calendar_id,
            service_account_path,
            access_token,
        })
    }
}

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: PortalCredentials,
    pub portal: PortalSettings,
    pub calendar: CalendarSettings,
    /// Parsed form of `calendar.timezone`
    pub timezone: Tz,
}

impl Config {
    /// Load configuration from environment and settings file
    pub fn load() -> BookingResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        // Credentials are required before anything touches the portal
        let username = env::var("LT_USERNAME").map_err(|_| env_error("LT_USERNAME"))?;
        let password = env::var("LT_PASSWORD").map_err(|_| env_error("LT_PASSWORD"))?;
        if username.is_empty() {
            return Err(env_error("LT_USERNAME"));
        }
        if password.is_empty() {
            return Err(env_error("LT_PASSWORD"));
        }

        let path = env::var("COURTBOT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut settings = FileSettings::load(&path)?;

        // Environment overrides
        if let Ok(url) = env::var("WEBDRIVER_URL") {
            settings.portal.webdriver_url = url;
        }
        if let Ok(tz) = env::var("TIMEZONE") {
            settings.calendar.timezone = tz;
        }

        Self::from_parts(PortalCredentials { username, password }, settings)
    }

    /// Assemble a configuration from already loaded parts
    pub fn from_parts(credentials: PortalCredentials, settings: FileSettings) -> BookingResult<Self> {
        let timezone: Tz = settings.calendar.timezone.parse().map_err(|_| {
            config_error(&format!("Invalid timezone: {}", settings.calendar.timezone))
        })?;

        Ok(Config {
            credentials,
            portal: settings.portal,
            calendar: settings.calendar,
            timezone,
        })
    }
}
