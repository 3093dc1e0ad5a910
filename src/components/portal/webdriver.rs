use super::{BookingPortal, SlotLookup};
use crate::config::{PortalCredentials, PortalSettings};
use crate::error::{portal_error, BookingResult};
use crate::utils::time::format_search_date;
use async_trait::async_trait;
use chrono::NaiveDate;
use fantoccini::elements::Element;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// WebDriver key code for Return
const RETURN_KEY: &str = "\u{E006}";

/// How often clickability is re-checked while waiting
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const RESERVATION_PATH: &str = "event/reserve-court-new";

/// Club portal driven through a WebDriver session
pub struct WebDriverPortal {
    client: Client,
    settings: PortalSettings,
}

/// Quote a string for use inside an XPath expression
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// XPath of every link whose text contains the label, including near misses like "11:00pm" for "1:00pm"
fn slot_xpath(label: &str) -> String {
    format!("//a[contains(text(), {})]", xpath_literal(label))
}

/// How well a link's text matches a wanted start time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SlotMatch {
    Exact,
    Partial,
}

/// Match link text against a label. A partial match must not be preceded by a letter or digit or followed by a
/// digit, so "1:00pm" never matches "11:00pm".
fn slot_match(text: &str, label: &str) -> Option<SlotMatch> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    if text == label {
        return Some(SlotMatch::Exact);
    }

    text.match_indices(label)
        .any(|(start, _)| {
            let before = text[..start].chars().next_back();
            let after = text[start + label.len()..].chars().next();
            !before.is_some_and(|c| c.is_alphanumeric()) && !after.is_some_and(|c| c.is_ascii_digit())
        })
        .then_some(SlotMatch::Partial)
}

/// Lookup failures that only mean the slot is not usable right now
fn is_transient(err: &CmdError) -> bool {
    match err {
        CmdError::WaitTimeout => true,
        CmdError::Standard(webdriver) => matches!(
            webdriver.error,
            ErrorStatus::NoSuchElement
                | ErrorStatus::StaleElementReference
                | ErrorStatus::ElementClickIntercepted
                | ErrorStatus::ElementNotInteractable
        ),
        _ => false,
    }
}

impl WebDriverPortal {
    /// Open a new browser session on the configured WebDriver server
    pub async fn connect(settings: &PortalSettings) -> BookingResult<Self> {
        let mut args = vec!["--window-size=1280,1024"];
        if settings.headless {
            args.push("--headless");
        }

        let mut capabilities = serde_json::Map::new();
        capabilities.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        if settings.headless {
            capabilities.insert("moz:firefoxOptions".to_string(), json!({ "args": ["-headless"] }));
        }

        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(&settings.webdriver_url)
            .await?;
        info!("Opened browser session via {}", settings.webdriver_url);

        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Wait until an element is present and interactable, `None` on timeout
    async fn find_clickable(
        &self,
        locator: Locator<'_>,
        timeout: Duration,
    ) -> Result<Option<Element>, CmdError> {
        let deadline = Instant::now() + timeout;

        let element = match self.client.wait().at_most(timeout).for_element(locator).await {
            Ok(element) => element,
            Err(CmdError::WaitTimeout) => return Ok(None),
            Err(e) => return Err(e),
        };

        loop {
            if element.is_displayed().await? && element.is_enabled().await? {
                return Ok(Some(element));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait for a structural element to be present
    async fn present(&self, locator: Locator<'_>, what: &str) -> BookingResult<Element> {
        let timeout = self.settings.structural_timeout();
        self.client
            .wait()
            .at_most(timeout)
            .for_element(locator)
            .await
            .map_err(|e| match e {
                CmdError::WaitTimeout => portal_error(&format!(
                    "{} did not appear within {}s",
                    what,
                    timeout.as_secs()
                )),
                e => portal_error(&format!("Failed to locate {}: {}", what, e)),
            })
    }

    /// Wait for a structural element to be clickable
    async fn clickable(&self, locator: Locator<'_>, what: &str) -> BookingResult<Element> {
        let timeout = self.settings.structural_timeout();
        match self.find_clickable(locator, timeout).await {
            Ok(Some(element)) => Ok(element),
            Ok(None) => Err(portal_error(&format!(
                "{} was not clickable within {}s",
                what,
                timeout.as_secs()
            ))),
            Err(e) => Err(portal_error(&format!("Failed to locate {}: {}", what, e))),
        }
    }

    /// Wait for a clickable link for `label`, preferring an exact text match over a partial one
    async fn find_slot_link(&self, label: &str, timeout: Duration) -> Result<Option<Element>, CmdError> {
        let xpath = slot_xpath(label);
        let deadline = Instant::now() + timeout;

        loop {
            let mut best: Option<(SlotMatch, Element)> = None;
            for link in self.client.find_all(Locator::XPath(&xpath)).await? {
                let Some(rank) = slot_match(&link.text().await?, label) else {
                    continue;
                };
                if best.as_ref().is_some_and(|(current, _)| *current <= rank) {
                    continue;
                }
                if link.is_displayed().await? && link.is_enabled().await? {
                    best = Some((rank, link));
                }
            }

            if let Some((_, link)) = best {
                return Ok(Some(link));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl BookingPortal for WebDriverPortal {
    async fn login(&mut self, credentials: &PortalCredentials) -> BookingResult<()> {
        self.client.goto(&self.url("")).await?;
        info!("Opened login page");

        let username_field = self.present(Locator::Css("[name='login']"), "username field").await?;
        let password_field = self.present(Locator::Id("password"), "password field").await?;

        username_field.clear().await?;
        username_field.send_keys(&credentials.username).await?;
        password_field.clear().await?;
        password_field.send_keys(&credentials.password).await?;
        password_field.send_keys(RETURN_KEY).await?;
        info!("Submitted login form");

        self.present(Locator::Id("initial-page"), "member home page").await?;
        info!("Login successful");
        Ok(())
    }

    async fn open_reservations(&mut self) -> BookingResult<()> {
        self.client.goto(&self.url(RESERVATION_PATH)).await?;
        info!("Navigated to reservation page");
        Ok(())
    }

    async fn set_search_criteria(&mut self, date: NaiveDate, duration_minutes: u32) -> BookingResult<()> {
        let date_text = format_search_date(date);
        let date_field = self.clickable(Locator::Id("date"), "date field").await?;
        date_field.clear().await?;
        date_field.send_keys(&date_text).await?;
        info!("Entered reservation date: {}", date_text);

        // The radio input is hidden behind its label, so click the parent
        let radio_id = format!("interval-{}", duration_minutes);
        let duration_radio = self
            .present(Locator::Id(&radio_id), &format!("{} minute duration option", duration_minutes))
            .await?;
        duration_radio.find(Locator::XPath("./..")).await?.click().await?;
        info!("Selected duration: {} minutes", duration_minutes);
        Ok(())
    }

    async fn search(&mut self) -> BookingResult<()> {
        self.clickable(Locator::Id("reserve-court-search"), "search button")
            .await?
            .click()
            .await?;
        info!("Clicked search button");
        Ok(())
    }

    async fn select_slot(&mut self, label: &str, timeout: Duration) -> BookingResult<SlotLookup> {
        debug!("Looking for start time {}", label);

        let link = match self.find_slot_link(label, timeout).await {
            Ok(Some(link)) => link,
            Ok(None) => return Ok(SlotLookup::NotFoundThisAttempt),
            Err(e) if is_transient(&e) => {
                warn!("Lookup of start time {} failed: {}", label, e);
                return Ok(SlotLookup::NotFoundThisAttempt);
            }
            Err(e) => return Err(portal_error(&format!("Browser session lost while looking for {}: {}", label, e))),
        };

        // The link can detach between the lookup and the click when the list re-renders
        match link.click().await {
            Ok(()) => Ok(SlotLookup::Found(label.to_string())),
            Err(e) if is_transient(&e) => {
                warn!("Start time {} disappeared before it could be clicked: {}", label, e);
                Ok(SlotLookup::NotFoundThisAttempt)
            }
            Err(e) => Err(portal_error(&format!("Browser session lost while clicking {}: {}", label, e))),
        }
    }

    async fn confirm(&mut self) -> BookingResult<()> {
        self.clickable(Locator::Id("confirm"), "confirm button")
            .await?
            .click()
            .await?;
        info!("Confirmed reservation");
        Ok(())
    }

    async fn complete(&mut self) -> BookingResult<()> {
        self.clickable(Locator::Id("button-ok"), "completion dialog")
            .await?
            .click()
            .await?;
        info!("Completed reservation");
        Ok(())
    }

    async fn reservation_table_html(&mut self) -> BookingResult<String> {
        let table = self
            .present(Locator::Id("table-reservation-list"), "reservation list")
            .await?;
        let html = table.html(false).await?;
        info!("Retrieved reservation list");
        Ok(html)
    }

    async fn close(&mut self) -> BookingResult<()> {
        self.client.clone().close().await?;
        info!("Closed browser session");
        Ok(())
    }
}
