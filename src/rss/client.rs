//! HTTP client creation and the feed download.

use reqwest::header;
use std::time::Duration;
use tracing::{debug, info};

use super::parser::parse_feed;
use super::types::{FeedEntry, FEED_ACCEPT, USER_AGENT};
use crate::error::{Result, WatchError};
use crate::TARGET_WEB_REQUEST;

/// Create the client shared by the feed fetch and the webhook call.
///
/// No timeout is set unless one is configured; a hung endpoint then stalls
/// the run until the caller kills it.
pub fn create_http_client(timeout: Option<Duration>) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .gzip(true)
        .redirect(reqwest::redirect::Policy::default());

    if let Some(timeout) = timeout {
        debug!(target: TARGET_WEB_REQUEST, "Creating HTTP client with {:?} timeout", timeout);
        builder = builder.timeout(timeout);
    } else {
        debug!(target: TARGET_WEB_REQUEST, "Creating HTTP client without timeout");
    }

    builder.build()
}

/// Reads one fixed feed URL.
#[derive(Clone)]
pub struct FeedClient {
    client: reqwest::Client,
    url: String,
}

impl FeedClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Downloads and parses the feed. One request, no retries.
    pub async fn fetch(&self) -> Result<Vec<FeedEntry>> {
        info!(target: TARGET_WEB_REQUEST, "Loading RSS feed from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header(header::ACCEPT, FEED_ACCEPT)
            .send()
            .await
            .map_err(|err| WatchError::fetch(&self.url, err))?;

        let status = response.status();
        debug!(target: TARGET_WEB_REQUEST, "Request to {} returned status {}", self.url, status);
        if !status.is_success() {
            return Err(WatchError::fetch(
                &self.url,
                format!("unexpected status {}", status),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| WatchError::fetch(&self.url, format!("failed to read body: {}", err)))?;

        debug!(
            target: TARGET_WEB_REQUEST,
            "First 500 characters of response body: {}",
            String::from_utf8_lossy(&body).chars().take(500).collect::<String>()
        );

        parse_feed(&body, &self.url)
    }
}
