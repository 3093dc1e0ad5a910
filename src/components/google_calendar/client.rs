use super::models::{CalendarEvent, EventDateTime, EventsPage, NewEvent, Reminders};
use super::token::{ServiceAccountKey, TokenManager, TokenSource};
use super::CalendarService;
use crate::config::{CalendarAccess, CalendarSettings};
use crate::error::{google_calendar_error, BookingResult};
use crate::models::NormalizedEvent;
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

/// Google Calendar v3 REST client bound to one calendar
#[derive(Debug)]
pub struct GoogleCalendarClient {
    client: Client,
    base_url: String,
    calendar_id: String,
    token_manager: TokenManager,
    time_zone: String,
    description: String,
}

impl GoogleCalendarClient {
    pub fn new(
        base_url: &str,
        calendar_id: &str,
        token_manager: TokenManager,
        client: Client,
        settings: &CalendarSettings,
    ) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            calendar_id: calendar_id.to_string(),
            token_manager,
            time_zone: settings.timezone.clone(),
            description: settings.description.clone(),
        }
    }

    /// Build a client from environment credentials and calendar settings
    pub fn from_config(access: &CalendarAccess, settings: &CalendarSettings) -> BookingResult<Self> {
        let client = Client::new();

        let source = match (&access.access_token, &access.service_account_path) {
            (Some(token), _) => TokenSource::Static(token.clone()),
            (None, Some(path)) => TokenSource::ServiceAccount(ServiceAccountKey::from_file(path)?),
            (None, None) => {
                return Err(google_calendar_error("No calendar credentials configured"));
            }
        };

        let token_manager = TokenManager::new(source, &settings.token_url, client.clone());
        Ok(Self::new(
            &settings.api_base_url,
            &access.calendar_id,
            token_manager,
            client,
            settings,
        ))
    }

    /// URL of this calendar's events collection
    fn events_url(&self) -> BookingResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| google_calendar_error("Calendar API URL cannot have a path"))?
            .pop_if_empty()
            .push("calendars")
            .push(&self.calendar_id)
            .push("events");

        Ok(url)
    }

    /// Turn a response into `T`, or an error carrying the status and body
    async fn read_json<T: DeserializeOwned>(response: Response, action: &str) -> BookingResult<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to {}: HTTP {} - {}",
                action, status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse {} response: {}", action, e)))
    }
}

#[async_trait]
impl CalendarService for GoogleCalendarClient {
    async fn list_events(
        &self,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
    ) -> BookingResult<Vec<CalendarEvent>> {
        let access_token = self.token_manager.get_token().await?;
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.events_url()?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("timeMin", &start.to_rfc3339())
                    .append_pair("timeMax", &end.to_rfc3339())
                    .append_pair("singleEvents", "true")
                    .append_pair("orderBy", "startTime");
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let response = self
                .client
                .get(url)
                .bearer_auth(&access_token)
                .send()
                .await
                .map_err(|e| google_calendar_error(&format!("Failed to fetch events: {}", e)))?;

            let page: EventsPage = Self::read_json(response, "fetch events").await?;
            events.extend(page.items.into_iter().map(CalendarEvent::from));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            "Found {} existing events between {} and {}",
            events.len(),
            start.to_rfc3339(),
            end.to_rfc3339()
        );
        Ok(events)
    }

    async fn insert_event(&self, event: &NormalizedEvent) -> BookingResult<CalendarEvent> {
        let access_token = self.token_manager.get_token().await?;

        let body = NewEvent {
            summary: event.summary.clone(),
            location: event.location.clone(),
            description: self.description.clone(),
            start: EventDateTime {
                date_time: Some(event.start_rfc3339()),
                date: None,
                time_zone: Some(self.time_zone.clone()),
            },
            end: EventDateTime {
                date_time: Some(event.end_rfc3339()),
                date: None,
                time_zone: Some(self.time_zone.clone()),
            },
            reminders: Reminders::court_defaults(),
        };

        let response = self
            .client
            .post(self.events_url()?)
            .bearer_auth(&access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to create event: {}", e)))?;

        let created: super::models::ApiEvent = Self::read_json(response, "create event").await?;
        let created = CalendarEvent::from(created);
        info!(
            "Event created successfully: {}",
            created.html_link.as_deref().unwrap_or(&created.id)
        );
        Ok(created)
    }
}
