//! Turns notification events into chat messages and posts them to a webhook.

use async_trait::async_trait;
use domain::{NotificationEvent, Roster};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

// Webhook URLs embed their token
impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Http(err.without_url())
    }
}

/// Transport that posts a finished message body
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn post_message(&self, body: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Discord webhook delivery
#[derive(Debug, Clone)]
pub struct DiscordWebhook {
    client: reqwest::Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Delivery for DiscordWebhook {
    async fn post_message(&self, body: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { content: body })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// A message that reached the webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub body: String,
}

/// Formats events with the roster's mention tokens and sends them
#[derive(Clone)]
pub struct Dispatcher {
    roster: Roster,
    delivery: Arc<dyn Delivery>,
}

impl Dispatcher {
    pub fn new(roster: Roster, delivery: Arc<dyn Delivery>) -> Self {
        Self { roster, delivery }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Mention tokens for `event`, in roster order.
    ///
    /// A role is mentioned when its channel published the video, and again
    /// when its username shows up in the title. Both can hold for one role.
    pub fn mention_tokens(&self, event: &NotificationEvent) -> Vec<&str> {
        let mut tokens = Vec::new();
        for (channel_id, mention) in &self.roster {
            if channel_id == &event.channel_id {
                tokens.push(mention.role_id.as_str());
            }
            let title_match = event
                .title
                .as_deref()
                .is_some_and(|title| title.contains(mention.username.as_str()));
            if title_match {
                tokens.push(mention.role_id.as_str());
            }
        }
        tokens
    }

    /// Message body: mentions on the first line, watch link on the second
    pub fn render(&self, event: &NotificationEvent) -> String {
        let tokens = self.mention_tokens(event);
        if tokens.is_empty() {
            event.watch_url()
        } else {
            format!("{}\n{}", tokens.join(" "), event.watch_url())
        }
    }

    /// Send one event. Exactly one delivery attempt is made.
    pub async fn dispatch(&self, event: &NotificationEvent) -> Result<Delivered, DeliveryError> {
        let body = self.render(event);
        match self.delivery.post_message(&body).await {
            Ok(()) => {
                tracing::info!(
                    event = "notification_sent",
                    channel_id = %event.channel_id,
                    video_id = %event.video_id,
                    body = %body,
                    "webhook sent successfully"
                );
                Ok(Delivered { body })
            }
            Err(err) => {
                tracing::error!(
                    event = "delivery_failure",
                    channel_id = %event.channel_id,
                    video_id = %event.video_id,
                    error = %err,
                    "error sending webhook"
                );
                Err(err)
            }
        }
    }

    /// Send every event in order; a failure never stops the rest.
    ///
    /// Returns how many were delivered.
    pub async fn dispatch_all(&self, events: &[NotificationEvent]) -> usize {
        let mut delivered = 0;
        for event in events {
            if self.dispatch(event).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}
