//! Order intake: persistence, fulfillment notification and reconciliation of
//! the notification outcome onto the order.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use strum::{Display, EnumString};
use tokio::{
    sync::{Mutex, oneshot},
    task::JoinSet,
};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    api::{OrderNotifier, OrderPayload},
    domain::{NewOrder, NotificationOutcome, OrderStatus},
    models::{OrderEntity, OrderWithItems},
    platform::{
        app_error::AppError,
        retry::{RetryConfig, with_retry},
    },
    repositories::{OrderRepository, TransientRepositoryErrors},
};

/// When the notification runs relative to the response to the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationMode {
    /// Notify and record the outcome before answering. The customer waits for
    /// the webhook, the ledger is up to date as soon as the request returns.
    Inline,
    /// Answer right after persistence and notify in a background task. The
    /// ledger catches up once the task finishes.
    Detached,
}

/// How the notification outcome of a submission is being settled.
#[derive(Debug)]
pub enum Reconciliation {
    Completed(NotificationOutcome),
    Detached(oneshot::Receiver<NotificationOutcome>),
}

impl Reconciliation {
    /// Waits for the outcome. `None` if the background task panicked or was aborted.
    pub async fn outcome(self) -> Option<NotificationOutcome> {
        match self {
            Reconciliation::Completed(outcome) => Some(outcome),
            Reconciliation::Detached(receiver) => receiver.await.ok(),
        }
    }
}

#[derive(Debug)]
pub struct Submission {
    pub order: OrderWithItems,
    pub reconciliation: Reconciliation,
}

impl Submission {
    pub fn order_id(&self) -> Uuid {
        self.order.order.id
    }
}

pub struct OrderIntake {
    orders: Arc<dyn OrderRepository>,
    notifier: Arc<dyn OrderNotifier>,
    mode: NotificationMode,
    write_back_retry: RetryConfig,
    /// Detached notifications still in flight.
    background: Mutex<JoinSet<()>>,
}

impl OrderIntake {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        notifier: Arc<dyn OrderNotifier>,
        mode: NotificationMode,
    ) -> Self {
        Self {
            orders,
            notifier,
            mode,
            write_back_retry: RetryConfig::default(),
            background: Mutex::new(JoinSet::new()),
        }
    }

    pub fn with_write_back_retry(mut self, retry: RetryConfig) -> Self {
        self.write_back_retry = retry;
        self
    }

    /// Persists the order and settles its notification according to the mode.
    ///
    /// Fails only when the order could not be persisted; in that case nothing
    /// was stored and the notifier was not called.
    pub async fn submit(&self, order: NewOrder) -> Result<Submission> {
        let created = self
            .orders
            .create_order(order)
            .await
            .context("Failed to create order")?;

        info!(
            order_id = %created.order.id,
            order_type = %created.order.order_type,
            items = created.items.len(),
            "Order persisted"
        );

        let payload = OrderPayload::from(&created);
        let task = reconcile(
            self.orders.clone(),
            self.notifier.clone(),
            payload,
            self.write_back_retry.clone(),
        )
        .instrument(info_span!("order_notification", order_id = %created.order.id));

        let reconciliation = match self.mode {
            NotificationMode::Inline => Reconciliation::Completed(task.await),
            NotificationMode::Detached => {
                let (sender, receiver) = oneshot::channel();
                let mut background = self.background.lock().await;
                while background.try_join_next().is_some() {}
                background.spawn(async move {
                    sender.send(task.await).ok();
                });
                Reconciliation::Detached(receiver)
            }
        };

        Ok(Submission {
            order: created,
            reconciliation,
        })
    }

    /// Number of detached notifications that have not finished yet.
    pub async fn in_flight(&self) -> usize {
        let mut background = self.background.lock().await;
        while background.try_join_next().is_some() {}
        background.len()
    }

    /// Waits up to `grace` for detached notifications to finish and aborts
    /// the rest. Returns how many were aborted; their orders keep a null
    /// notification outcome.
    pub async fn drain(&self, grace: Duration) -> usize {
        let mut background = std::mem::take(&mut *self.background.lock().await);
        if background.is_empty() {
            return 0;
        }

        info!(pending = background.len(), "Waiting for order notifications");
        let finished = tokio::time::timeout(grace, async {
            while background.join_next().await.is_some() {}
        })
        .await;

        if finished.is_ok() {
            return 0;
        }

        let aborted = background.len();
        warn!(aborted, "Order notifications aborted at shutdown");
        background.shutdown().await;
        aborted
    }

    /// Operator-initiated fulfillment status change.
    ///
    /// Re-applying the current status is a no-op; any other move must be a
    /// valid transition.
    pub async fn change_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<OrderEntity, AppError> {
        let current = self.orders.get_order(order_id).await?.order;
        let current_status: OrderStatus = current
            .status
            .parse()
            .with_context(|| format!("Order {order_id} has unknown status '{}'", current.status))?;

        if current_status == next {
            return Ok(current);
        }
        if !current_status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Cannot move order from '{current_status}' to '{next}'"
            )));
        }

        let updated = self
            .orders
            .update_status(order_id, current_status, next)
            .await?;

        info!(%order_id, from = %current_status, to = %next, "Order status changed");
        Ok(updated)
    }
}

async fn reconcile(
    orders: Arc<dyn OrderRepository>,
    notifier: Arc<dyn OrderNotifier>,
    payload: OrderPayload,
    retry: RetryConfig,
) -> NotificationOutcome {
    let outcome = notifier.notify(&payload).await;
    let order_id = payload.order_id;

    let written = with_retry(&retry, TransientRepositoryErrors, || {
        orders.record_notification(order_id, &outcome)
    })
    .await;

    match written {
        Ok(()) => match &outcome {
            NotificationOutcome::Success => info!(%order_id, "Notification outcome recorded"),
            NotificationOutcome::Failed { error } => {
                warn!(%order_id, %error, "Order needs manual follow-up: notification failed")
            }
        },
        Err(err) => error!(
            %order_id,
            outcome = %outcome.status(),
            error = %err,
            "Failed to record notification outcome"
        ),
    }

    outcome
}
