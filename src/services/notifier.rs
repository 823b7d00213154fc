use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while delivering a notification
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Push API returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Delivery timed out after {0}ms")]
    Timeout(u64),
}

impl NotifyError {
    /// Transport failures, timeouts, throttling and 5xx responses may succeed
    /// on a later attempt; other API rejections never will.
    pub fn is_retryable(&self) -> bool {
        match self {
            NotifyError::RequestError(e) => !e.is_builder(),
            NotifyError::ApiError { status, .. } => *status >= 500 || *status == 429,
            NotifyError::Timeout(_) => true,
        }
    }
}

/// Outcome reported by a notifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryResult {
    Delivered { message_id: String },
    Skipped,
}

/// Push delivery collaborator
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        target_uid: &str,
        title: &str,
        body: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<DeliveryResult, NotifyError>;
}

/// Notifier used when push delivery is disabled
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        target_uid: &str,
        title: &str,
        _body: &str,
        _metadata: &HashMap<String, String>,
    ) -> Result<DeliveryResult, NotifyError> {
        tracing::debug!("Push disabled, skipping '{}' for {}", title, target_uid);
        Ok(DeliveryResult::Skipped)
    }
}

/// Appwrite Messaging push notifier
pub struct AppwritePushNotifier {
    base_url: String,
    api_key: String,
    project_id: String,
    client: Client,
}

impl AppwritePushNotifier {
    pub fn new(base_url: String, api_key: String, project_id: String) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            client,
        })
    }
}

#[async_trait]
impl Notifier for AppwritePushNotifier {
    async fn notify(
        &self,
        target_uid: &str,
        title: &str,
        body: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<DeliveryResult, NotifyError> {
        let url = format!("{}/messaging/messages/push", self.base_url.trim_end_matches('/'));
        let message_id = uuid::Uuid::new_v4().simple().to_string();

        let payload = serde_json::json!({
            "messageId": message_id,
            "title": title,
            "body": body,
            "users": [target_uid],
            "data": metadata,
        });

        let response = self
            .client
            .post(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(DeliveryResult::Delivered { message_id })
    }
}

/// A notification waiting to be sent
#[derive(Debug, Clone)]
pub struct Notification {
    pub target_uid: String,
    pub title: String,
    pub body: String,
    pub metadata: HashMap<String, String>,
}

impl Notification {
    pub fn new_like(liker_uid: &str, liked_uid: &str) -> Self {
        Self {
            target_uid: liked_uid.to_string(),
            title: "Someone is interested".to_string(),
            body: "A potential roommate liked your profile.".to_string(),
            metadata: HashMap::from([
                ("type".to_string(), "like".to_string()),
                ("fromUid".to_string(), liker_uid.to_string()),
            ]),
        }
    }

    pub fn new_match(liker_uid: &str, liked_uid: &str) -> Self {
        Self {
            target_uid: liked_uid.to_string(),
            title: "It's a match!".to_string(),
            body: "You and a potential roommate liked each other.".to_string(),
            metadata: HashMap::from([
                ("type".to_string(), "match".to_string()),
                ("fromUid".to_string(), liker_uid.to_string()),
            ]),
        }
    }
}

/// Fire-and-forget dispatch with a per-attempt timeout and a small retry budget
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        timeout: Duration,
        max_retries: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            notifier,
            timeout,
            max_retries,
            backoff,
        }
    }

    /// Spawn delivery on the runtime and return immediately
    pub fn dispatch(&self, notification: Notification) -> tokio::task::JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            if let Err(e) = dispatcher.deliver(&notification).await {
                tracing::warn!(
                    "Notification to {} failed permanently: {}",
                    notification.target_uid,
                    e
                );
            }
        })
    }

    /// Deliver with retries; attempts = 1 + max_retries at most.
    /// Non-retryable errors are returned after the first attempt.
    pub async fn deliver(&self, notification: &Notification) -> Result<DeliveryResult, NotifyError> {
        let mut attempt = 0;
        loop {
            let result = tokio::time::timeout(
                self.timeout,
                self.notifier.notify(
                    &notification.target_uid,
                    &notification.title,
                    &notification.body,
                    &notification.metadata,
                ),
            )
            .await
            .unwrap_or_else(|_| Err(NotifyError::Timeout(self.timeout.as_millis() as u64)));

            match result {
                Ok(delivery) => {
                    tracing::debug!(
                        "Notification delivered to {} after {} attempt(s)",
                        notification.target_uid,
                        attempt + 1
                    );
                    return Ok(delivery);
                }
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    attempt += 1;
                    tracing::debug!(
                        "Notification attempt {} to {} failed: {}",
                        attempt,
                        notification.target_uid,
                        e
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
