use std::{error::Error as _, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    api::{OrderNotifier, OrderPayload},
    domain::NotificationOutcome,
    platform::{
        config::WebhookConfig,
        retry::{RetryConfig, RetryPolicy, with_retry},
    },
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("HTTP {}", .0.as_u16())]
    Status(StatusCode),
    #[error("request timed out after {0}ms")]
    Timeout(u128),
    #[error("{0}")]
    Transport(String),
}

/// Transport failures, timeouts, 429 and 5xx are worth another attempt.
/// Other 4xx answers mean the endpoint rejected the payload.
pub struct RetryableDispatchErrors;

impl RetryPolicy<DispatchError> for RetryableDispatchErrors {
    fn is_retryable(&self, error: &DispatchError) -> bool {
        match error {
            DispatchError::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            DispatchError::Timeout(_) | DispatchError::Transport(_) => true,
        }
    }
}

/// Carries the order id on every delivery attempt so the receiver can drop
/// duplicates caused by retries after a lost response.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Posts order payloads as JSON to the fulfillment automation webhook.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    timeout: Duration,
    retry: RetryConfig,
}

impl WebhookNotifier {
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build the webhook HTTP client")?;

        Ok(Self {
            client,
            url: config.url.clone(),
            timeout: config.timeout,
            retry: RetryConfig::with_attempts(config.max_attempts, config.initial_backoff),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn dispatch(&self, payload: &OrderPayload) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(&self.url)
            .header(IDEMPOTENCY_KEY_HEADER, payload.order_id.to_string())
            .json(payload)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DispatchError::Status(status))
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> DispatchError {
        if err.is_timeout() {
            return DispatchError::Timeout(self.timeout.as_millis());
        }

        // reqwest keeps the interesting part (connection refused, DNS, ...) in the source chain.
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        DispatchError::Transport(message)
    }
}

#[async_trait]
impl OrderNotifier for WebhookNotifier {
    async fn notify(&self, payload: &OrderPayload) -> NotificationOutcome {
        let result = with_retry(&self.retry, RetryableDispatchErrors, || {
            self.dispatch(payload)
        })
        .await;

        match result {
            Ok(()) => {
                info!(order_id = %payload.order_id, "Order webhook delivered");
                NotificationOutcome::Success
            }
            Err(err) => {
                warn!(order_id = %payload.order_id, error = %err, "Order webhook failed");
                NotificationOutcome::failed(err.to_string())
            }
        }
    }
}
