// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Best-effort push notification delivery.
//!
//! Posts to an external push gateway when one is configured. Delivery
//! failures are logged and never propagate into the request path.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
struct PushMessage<'a> {
    user_id: &'a str,
    title: &'a str,
    body: &'a str,
}

#[derive(Clone)]
pub struct NotificationService {
    client: reqwest::Client,
    gateway_url: Option<String>,
}

impl NotificationService {
    pub fn new(gateway_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url,
        }
    }

    /// Send a notification to one user. Best effort.
    pub async fn notify(&self, user_id: &str, title: &str, body: &str) {
        let Some(url) = &self.gateway_url else {
            tracing::debug!(user_id, title, "Push gateway not configured, skipping");
            return;
        };

        let message = PushMessage {
            user_id,
            title,
            body,
        };

        match self.client.post(url).json(&message).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(user_id, title, "Notification sent");
            }
            Ok(response) => {
                tracing::warn!(
                    user_id,
                    status = %response.status(),
                    "Push gateway rejected notification"
                );
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to deliver notification");
            }
        }
    }

    /// Notify several users with the same message. Best effort.
    pub async fn notify_all(&self, user_ids: &[String], title: &str, body: &str) {
        for user_id in user_ids {
            self.notify(user_id, title, body).await;
        }
    }
}
