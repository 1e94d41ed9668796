use crate::config::BasicAuth;
use crate::error::AppError;
use crate::source::{
    BATTERY_PATH, BatteryResponse, DataSource, EVENTS_PATH, EventsResponse, FetchError,
};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Fetches both sources from the backend over HTTP.
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    basic_auth: Option<BasicAuth>,
}

impl HttpSource {
    /// `timeout` of `None` keeps the transport defaults.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
        basic_auth: Option<BasicAuth>,
    ) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| AppError::HttpClient(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            basic_auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.url(path);
        let mut request = self.client.get(&url);
        if let Some(auth) = &self.basic_auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request
            .send()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))?;
        debug!(url = %url, bytes = body.len(), "Source response received");

        serde_json::from_slice(&body).map_err(|err| FetchError::Payload(err.to_string()))
    }
}

impl fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSource")
            .field("base_url", &self.base_url)
            .field("has_basic_auth", &self.basic_auth.is_some())
            .finish()
    }
}

impl DataSource for HttpSource {
    async fn fetch_events(&self) -> Result<EventsResponse, FetchError> {
        self.get_json(EVENTS_PATH).await
    }

    async fn fetch_battery(&self) -> Result<BatteryResponse, FetchError> {
        self.get_json(BATTERY_PATH).await
    }
}
