//! Discord webhook notifications for new advisories.

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::advisory::Advisory;
use crate::error::{Result, WatchError};
use crate::TARGET_WEB_REQUEST;

/// Red.
pub const EMBED_COLOR: u32 = 0xff0000;

// Discord rejects embeds past these lengths, and fields with empty values.
// Title, description and the three fields together stay under the 6000
// character total allowed per embed.
const MAX_EMBED_TITLE: usize = 256;
const MAX_EMBED_DESCRIPTION: usize = 2048;
const MAX_FIELD_VALUE: usize = 1024;
const EMPTY_FIELD_VALUE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    /// Left out when empty; Discord rejects `""` as an embed URL.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn new(name: &str, value: &str, inline: bool) -> Self {
        let value = if value.trim().is_empty() {
            EMPTY_FIELD_VALUE
        } else {
            value
        };
        EmbedField {
            name: name.to_string(),
            value: truncate(value, MAX_FIELD_VALUE),
            inline,
        }
    }
}

/// Cuts `text` to at most `max` characters, ending with an ellipsis when cut.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max - 1).collect();
    cut.push('…');
    cut
}

impl WebhookPayload {
    /// One embed per advisory: title, link, and tagged published/severity
    /// fields, with the sanitized description as the last field.
    pub fn for_advisory(advisory: &Advisory) -> Self {
        let embed = Embed {
            title: truncate(
                &format!("New CVE Alert: {}", advisory.identifier),
                MAX_EMBED_TITLE,
            ),
            description: truncate(&advisory.title, MAX_EMBED_DESCRIPTION),
            url: advisory.link.clone(),
            color: EMBED_COLOR,
            fields: vec![
                EmbedField::new("Published", &advisory.published, true),
                EmbedField::new("Severity", &advisory.severity, true),
                EmbedField::new("Description", &advisory.description, false),
            ],
        };
        WebhookPayload {
            embeds: vec![embed],
        }
    }
}

/// Posts advisories to a Discord webhook.
#[derive(Clone)]
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(client: Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }

    /// Sends exactly one message for `advisory`. Anything but `204 No Content`
    /// is an error.
    pub async fn send(&self, advisory: &Advisory) -> Result<()> {
        let payload = WebhookPayload::for_advisory(advisory);
        let body = serde_json::to_string(&payload)
            .map_err(|err| WatchError::notify(&advisory.identifier, err))?;

        debug!(target: TARGET_WEB_REQUEST, "Sending Discord notification with payload: {}", body);
        let response = self
            .client
            .post(&self.webhook_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| {
                // Strip the URL, it carries the webhook token.
                WatchError::notify(&advisory.identifier, err.without_url())
            })?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let error_text = response.text().await.unwrap_or_default();
            error!(target: TARGET_WEB_REQUEST, "Unexpected response from Discord: {} {}", status, error_text);
            return Err(WatchError::notify(
                &advisory.identifier,
                format!(
                    "unexpected status {}: {}",
                    status,
                    error_text.chars().take(200).collect::<String>()
                ),
            ));
        }

        info!(target: TARGET_WEB_REQUEST, "Notification sent to Discord for CVE: {}", advisory.identifier);
        Ok(())
    }
}
