use miette::{Diagnostic, Result};
use thiserror::Error;

use crate::reservation::ReservationStage;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(
        code(courtbot::environment),
        help("Set the variable in the process environment or in a .env file")
    )]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(courtbot::config))]
    Config(String),

    #[error("Failed to reach the {stage} stage: {source}")]
    #[diagnostic(code(courtbot::stage))]
    Stage {
        stage: ReservationStage,
        #[source]
        source: Box<Error>,
    },

    #[error("Booking portal error: {0}")]
    #[diagnostic(code(courtbot::portal))]
    Portal(String),

    #[error("WebDriver session error: {0}")]
    #[diagnostic(
        code(courtbot::webdriver),
        help("Make sure a WebDriver server (e.g. chromedriver --port=4444) is running")
    )]
    WebDriver(#[from] fantoccini::error::NewSessionError),

    #[error("Parse error: {0}")]
    #[diagnostic(code(courtbot::parse))]
    Parse(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(courtbot::google_calendar))]
    GoogleCalendar(String),

    #[error("Interrupted by shutdown signal")]
    #[diagnostic(code(courtbot::interrupted))]
    Interrupted,

    #[error(transparent)]
    #[diagnostic(code(courtbot::io))]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    #[diagnostic(code(courtbot::other))]
    Other(String),
}

// Browser command failures outside of slot probing are structural
impl From<fantoccini::error::CmdError> for Error {
    fn from(err: fantoccini::error::CmdError) -> Self {
        Error::Portal(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type BookingResult<T> = Result<T, Error>;

impl Error {
    /// Attach the pipeline stage that was being entered when this error happened
    pub fn at_stage(self, stage: ReservationStage) -> Self {
        match self {
            // Keep the innermost stage
            err @ Error::Stage { .. } => err,
            err @ Error::Interrupted => err,
            err => Error::Stage {
                stage,
                source: Box::new(err),
            },
        }
    }
}

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create booking portal errors
pub fn portal_error(message: &str) -> Error {
    Error::Portal(message.to_string())
}

/// Helper to create parse errors
pub fn parse_error(message: &str) -> Error {
    Error::Parse(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}
