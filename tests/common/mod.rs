#![allow(dead_code)]

use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode, header},
    routing::post,
};
use serde_json::Value;
use storefront_orderservice::{
    api::{OrderNotifier, OrderPayload, WebhookNotifier},
    domain::{NewOrder, NotificationOutcome, OrderStatus},
    models::{OrderEntity, OrderWithItems},
    platform::{
        app_state::AppState,
        config::{MediaConfig, WebhookConfig},
        retry::RetryConfig,
    },
    repositories::{MemoryRepository, OrderRepository, RepositoryError},
    routes,
    services::{NotificationMode, OrderIntake},
    storage::MemoryObjectStorage,
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use uuid::Uuid;

pub const MEDIA_BASE_URL: &str = "http://cdn.test/media";

/// In-process application backed by the memory repository and memory object
/// storage.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub repository: Arc<MemoryRepository>,
    pub storage: Arc<MemoryObjectStorage>,
}

impl TestApp {
    /// Application whose notifications go to `webhook_url`.
    pub fn new(webhook_url: &str, mode: NotificationMode) -> Self {
        let notifier = WebhookNotifier::new(&fast_webhook_config(webhook_url))
            .expect("build webhook notifier");
        Self::with_notifier(Arc::new(notifier), mode)
    }

    pub fn with_notifier(notifier: Arc<dyn OrderNotifier>, mode: NotificationMode) -> Self {
        let repository = Arc::new(MemoryRepository::new());
        let intake = OrderIntake::new(repository.clone(), notifier, mode);
        Self::build(repository, intake)
    }

    /// Application whose order writes go through `orders`, a wrapper around
    /// `repository`.
    pub fn with_order_repository(
        repository: Arc<MemoryRepository>,
        orders: Arc<dyn OrderRepository>,
        notifier: Arc<dyn OrderNotifier>,
    ) -> Self {
        let intake = OrderIntake::new(orders, notifier, NotificationMode::Inline)
            .with_write_back_retry(RetryConfig::with_attempts(2, Duration::from_millis(1)));
        Self::build(repository, intake)
    }

    fn build(repository: Arc<MemoryRepository>, intake: OrderIntake) -> Self {
        let storage = Arc::new(MemoryObjectStorage::new(MEDIA_BASE_URL));
        let state = AppState::with_intake(repository.clone(), intake, storage.clone());
        let media = MediaConfig {
            root_dir: std::env::temp_dir().join("storefront-orderservice-tests"),
            public_base_url: MEDIA_BASE_URL.into(),
            max_upload_bytes: 1024 * 1024,
        };
        let router = routes::app(state.clone(), &media);

        Self {
            router,
            state,
            repository,
            storage,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).expect("build request")).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn order(&self, order_id: Uuid) -> OrderWithItems {
        self.repository
            .get_order(order_id)
            .await
            .expect("order is stored")
    }

    pub async fn order_count(&self) -> usize {
        self.repository.list_orders().await.expect("list orders").len()
    }

    /// Polls until the order's notification outcome is recorded.
    pub async fn wait_for_outcome(&self, order_id: Uuid) -> NotificationOutcome {
        for _ in 0..200 {
            if let Some(outcome) = self.order(order_id).await.order.notification_outcome() {
                return outcome;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no notification outcome recorded for order {order_id}");
    }
}

/// One attempt per notification with a short timeout, so failing endpoints
/// resolve quickly.
pub fn fast_webhook_config(url: &str) -> WebhookConfig {
    WebhookConfig {
        url: url.to_string(),
        timeout: Duration::from_millis(500),
        max_attempts: 1,
        initial_backoff: Duration::from_millis(1),
    }
}

pub fn order_body() -> Value {
    serde_json::json!({
        "order_type": "retail",
        "customer_name": "Olena Kovalenko",
        "phone": "+380501234567",
        "telegram": "@olena",
        "city": "Kyiv",
        "delivery_method": "nova",
        "comment": "Call before delivery",
        "items": [
            { "product_code": "BAG-001", "color": "black", "qty": 1, "price_snapshot": 2400.0 },
            { "product_code": "BAG-007", "color": "beige", "qty": 2, "price_snapshot": 1850.5 }
        ]
    })
}

// Mock fulfillment webhook

#[derive(Default)]
struct WebhookScript {
    statuses: Mutex<VecDeque<StatusCode>>,
    delay: Mutex<Duration>,
    received: Mutex<Vec<Value>>,
    idempotency_keys: Mutex<Vec<Option<String>>>,
}

/// A local HTTP endpoint standing in for the fulfillment automation webhook.
///
/// Answers with the scripted status codes in order, then `200 OK`.
pub struct MockWebhook {
    pub addr: SocketAddr,
    script: Arc<WebhookScript>,
}

impl MockWebhook {
    pub async fn start() -> Self {
        let script = Arc::new(WebhookScript::default());
        let app = Router::new()
            .route("/webhook/orders", post(receive))
            .with_state(script.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock webhook");
        let addr = listener.local_addr().expect("mock webhook address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock webhook server");
        });

        Self { addr, script }
    }

    pub fn url(&self) -> String {
        format!("http://{}/webhook/orders", self.addr)
    }

    pub fn respond_with(&self, statuses: impl IntoIterator<Item = StatusCode>) {
        self.script.statuses.lock().unwrap().extend(statuses);
    }

    pub fn delay_responses(&self, delay: Duration) {
        *self.script.delay.lock().unwrap() = delay;
    }

    pub fn received(&self) -> Vec<Value> {
        self.script.received.lock().unwrap().clone()
    }

    /// `Idempotency-Key` header of every delivery, in arrival order.
    pub fn idempotency_keys(&self) -> Vec<Option<String>> {
        self.script.idempotency_keys.lock().unwrap().clone()
    }
}

async fn receive(
    State(script): State<Arc<WebhookScript>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> StatusCode {
    let key = headers
        .get("idempotency-key")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    script.idempotency_keys.lock().unwrap().push(key);
    script.received.lock().unwrap().push(payload);
    let delay = *script.delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    script
        .statuses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(StatusCode::OK)
}

/// URL of a local port nothing listens on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe port");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{addr}/webhook/orders")
}

// Test doubles

/// Notifier that must never be called.
pub struct PanickingNotifier;

#[async_trait]
impl OrderNotifier for PanickingNotifier {
    async fn notify(&self, payload: &OrderPayload) -> NotificationOutcome {
        panic!("notifier called for order {}", payload.order_id);
    }
}

/// Notifier answering with a fixed outcome.
pub struct FixedNotifier(pub NotificationOutcome);

#[async_trait]
impl OrderNotifier for FixedNotifier {
    async fn notify(&self, _payload: &OrderPayload) -> NotificationOutcome {
        self.0.clone()
    }
}

/// Order repository wrapping a memory repository with switchable failures.
pub struct FlakyOrders {
    pub inner: Arc<MemoryRepository>,
    pub fail_create: bool,
    pub fail_record: bool,
}

impl FlakyOrders {
    fn outage() -> RepositoryError {
        RepositoryError::Pool("connection refused".into())
    }
}

#[async_trait]
impl OrderRepository for FlakyOrders {
    async fn create_order(&self, order: NewOrder) -> Result<OrderWithItems, RepositoryError> {
        if self.fail_create {
            return Err(Self::outage());
        }
        self.inner.create_order(order).await
    }

    async fn record_notification(
        &self,
        order_id: Uuid,
        outcome: &NotificationOutcome,
    ) -> Result<(), RepositoryError> {
        if self.fail_record {
            return Err(Self::outage());
        }
        self.inner.record_notification(order_id, outcome).await
    }

    async fn list_orders(&self) -> Result<Vec<OrderWithItems>, RepositoryError> {
        self.inner.list_orders().await
    }

    async fn get_order(&self, order_id: Uuid) -> Result<OrderWithItems, RepositoryError> {
        self.inner.get_order(order_id).await
    }

    async fn update_status(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<OrderEntity, RepositoryError> {
        self.inner.update_status(order_id, expected, next).await
    }
}
