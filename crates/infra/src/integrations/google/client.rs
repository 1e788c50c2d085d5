//! Google Calendar v3 events API behind the [`RemoteCalendar`] port.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use eventsync_core::calendar_ports::RemoteCalendar;
use eventsync_domain::{Credential, EventSyncError, RemoteEvent, Result};
use reqwest::{Method, RequestBuilder, Response};
use tracing::{debug, instrument};
use url::Url;

use super::wire::{EventList, GoogleEvent};
use crate::errors::InfraError;
use crate::http::{error_for_status, HttpClient};

const PAGE_SIZE: &str = "250";

/// Calendar handle authorized with one organisation's access token.
pub struct GoogleCalendarClient {
    http: HttpClient,
    base_url: Url,
    credential: Credential,
    default_zone: Tz,
}

impl GoogleCalendarClient {
    /// `default_zone` resolves all-day events when a response carries no
    /// calendar zone.
    pub fn new(
        http: HttpClient,
        base_url: &str,
        credential: Credential,
        default_zone: Tz,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            EventSyncError::Config(format!("invalid calendar API URL '{base_url}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(EventSyncError::Config(format!("calendar API URL '{base_url}' is not a base URL")));
        }
        Ok(Self { http, base_url, credential, default_zone })
    }

    /// `<base>/calendars/<calendar>/events[/<event>]` with each segment
    /// percent-encoded.
    fn events_url(&self, calendar_id: &str, event_id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["calendars", calendar_id, "events"]);
            if let Some(event_id) = event_id {
                segments.push(event_id);
            }
        }
        url
    }

    fn authorized(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.credential.access_token)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        error_for_status(self.http.send(request).await?).await
    }

    async fn read_event(&self, response: Response) -> Result<RemoteEvent> {
        let event: GoogleEvent =
            response.json().await.map_err(|e| EventSyncError::from(InfraError::from(e)))?;
        event.into_remote(self.default_zone)
    }
}

#[async_trait]
impl RemoteCalendar for GoogleCalendarClient {
    #[instrument(skip(self), fields(account = %self.credential.account))]
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<RemoteEvent>> {
        let url = self.events_url(calendar_id, None);
        let time_min = time_min.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = time_max.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0_usize;
        let mut skipped = 0_usize;

        loop {
            let mut query: Vec<(&str, &str)> = vec![
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("showDeleted", "true"),
                ("maxResults", PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response = self.execute(self.authorized(Method::GET, url.clone()).query(&query)).await?;
            let page: EventList =
                response.json().await.map_err(|e| EventSyncError::from(InfraError::from(e)))?;
            pages += 1;

            let zone = page
                .time_zone
                .as_deref()
                .and_then(|name| name.parse::<Tz>().ok())
                .unwrap_or(self.default_zone);
            for item in page.items {
                if !item.has_times() && !item.is_correlated() {
                    debug!(id = item.id.as_deref().unwrap_or_default(), "skipping foreign event without times");
                    skipped += 1;
                    continue;
                }
                events.push(item.into_remote(zone)?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(events = events.len(), skipped, pages, "listed remote events");
        Ok(events)
    }

    #[instrument(skip_all, fields(calendar = calendar_id, event = %event.describe()))]
    async fn insert_event(&self, calendar_id: &str, event: &RemoteEvent) -> Result<RemoteEvent> {
        let mut body = GoogleEvent::from(event);
        body.id = None;

        let url = self.events_url(calendar_id, None);
        let response = self.execute(self.authorized(Method::POST, url).json(&body)).await?;
        let created = self.read_event(response).await?;
        debug!(id = created.id.as_deref().unwrap_or_default(), "event created");
        Ok(created)
    }

    #[instrument(skip_all, fields(calendar = calendar_id, event = %event.describe()))]
    async fn update_event(&self, calendar_id: &str, event: &RemoteEvent) -> Result<RemoteEvent> {
        let Some(event_id) = event.id.as_deref() else {
            return Err(EventSyncError::InvalidInput(format!(
                "cannot update unsaved event {}",
                event.describe()
            )));
        };

        let url = self.events_url(calendar_id, Some(event_id));
        let response =
            self.execute(self.authorized(Method::PUT, url).json(&GoogleEvent::from(event))).await?;
        self.read_event(response).await
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<()> {
        let url = self.events_url(calendar_id, Some(event_id));
        match self.execute(self.authorized(Method::DELETE, url)).await {
            Ok(_) => Ok(()),
            // Already gone is the state we wanted.
            Err(EventSyncError::NotFound(detail)) => {
                debug!(%detail, "event already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
