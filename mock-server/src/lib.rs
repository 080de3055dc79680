use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

pub use axum::Router;

pub const ACCEPT: &str = "application/vnd.conekta-v2.0.0+json";

#[derive(Clone, Debug)]
pub struct MockConfig {
    pub secret_key: String,
    /// Payment source tokens that `/customers` rejects with 402.
    pub declined_tokens: Vec<String>,
}

impl MockConfig {
    pub fn new(secret_key: &str) -> Self {
        Self {
            secret_key: secret_key.to_string(),
            declined_tokens: Vec::new(),
        }
    }

    pub fn decline(mut self, token: &str) -> Self {
        self.declined_tokens.push(token.to_string());
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub object: String,
    pub livemode: bool,
    pub amount: i64,
    pub currency: String,
    pub payment_status: String,
    pub created_at: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub object: String,
    pub livemode: bool,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub corporate: bool,
    pub default_payment_source_id: String,
    pub created_at: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub debug_message: String,
    pub message: String,
    pub code: String,
    pub param: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Failure {
    pub details: Vec<ErrorDetail>,
    pub object: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub log_id: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct CreateOrder {
    pub currency: String,
    pub line_items: Vec<LineItem>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct LineItem {
    pub name: String,
    pub unit_price: i64,
    pub quantity: i64,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct CreateCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub corporate: bool,
    pub payment_sources: Vec<PaymentSource>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct PaymentSource {
    pub token_id: String,
    #[serde(rename = "type")]
    pub source_type: String,
}

#[derive(Default)]
struct Store {
    orders: Vec<Order>,
    customers: Vec<Customer>,
}

#[derive(Clone)]
struct AppState {
    config: Arc<MockConfig>,
    store: Arc<RwLock<Store>>,
}

type Rejection = (StatusCode, Json<Failure>);

/// Stateful stand-in for the Conekta API.
pub fn app(config: MockConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(RwLock::new(Store::default())),
    };
    Router::new()
        .route("/orders", post(create_order))
        .route("/customers", post(create_customer))
        .with_state(state)
}

/// Answers every request with the same status and JSON body.
pub fn canned(status: u16, body: impl Into<String>) -> Router {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body: String = body.into();
    Router::new().fallback(move || {
        let body = body.clone();
        async move { (status, [(header::CONTENT_TYPE, "application/json")], body) }
    })
}

pub async fn run(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

fn failure(status: StatusCode, error_type: &str, details: Vec<ErrorDetail>) -> Rejection {
    warn!(%status, error_type, "rejecting request");
    (
        status,
        Json(Failure {
            details,
            object: "error".to_string(),
            error_type: error_type.to_string(),
            log_id: Uuid::new_v4().simple().to_string(),
        }),
    )
}

fn detail(code: &str, message: &str, param: Option<&str>) -> ErrorDetail {
    ErrorDetail {
        debug_message: message.to_string(),
        message: message.to_string(),
        code: code.to_string(),
        param: param.map(str::to_string),
    }
}

fn missing(param: &str) -> ErrorDetail {
    detail(
        "conekta.errors.parameter_validation.missing",
        &format!("The parameter {param} is required."),
        Some(param),
    )
}

/// Check the Basic credential (secret key, blank password) and the versioned
/// `Accept` header.
fn authorize(config: &MockConfig, headers: &HeaderMap) -> Result<(), Rejection> {
    let expected = format!("{}:", config.secret_key);
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded).ok())
        .is_some_and(|decoded| decoded == expected.as_bytes());
    if !authorized {
        return Err(failure(
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            vec![detail(
                "conekta.errors.authentication.missing_key",
                "Please include your access key in your request.",
                None,
            )],
        ));
    }

    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
    if accept != Some(ACCEPT) {
        return Err(failure(
            StatusCode::NOT_ACCEPTABLE,
            "invalid_request_error",
            vec![detail(
                "conekta.errors.request.unsupported_version",
                "The Accept header must name a supported API version.",
                None,
            )],
        ));
    }
    Ok(())
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateOrder>,
) -> Result<Json<Order>, Rejection> {
    authorize(&state.config, &headers)?;

    let mut details = Vec::new();
    if input.currency.is_empty() {
        details.push(missing("currency"));
    }
    if input.line_items.is_empty() {
        details.push(missing("line_items"));
    }
    if !details.is_empty() {
        return Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "parameter_validation_error",
            details,
        ));
    }

    let Some(amount) = input.line_items.iter().try_fold(0i64, |total, item| {
        item.unit_price
            .checked_mul(item.quantity)
            .and_then(|line| total.checked_add(line))
    }) else {
        return Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "parameter_validation_error",
            vec![detail(
                "conekta.errors.parameter_validation.line_items.amount_overflow",
                "The order amount is out of range.",
                Some("line_items"),
            )],
        ));
    };

    let mut store = state.store.write().await;
    let order = Order {
        id: format!("ord_{}", store.orders.len() + 1),
        object: "order".to_string(),
        livemode: false,
        amount,
        currency: input.currency,
        payment_status: "paid".to_string(),
        created_at: now(),
    };
    store.orders.push(order.clone());
    info!(id = %order.id, amount = order.amount, "order created");
    Ok(Json(order))
}

async fn create_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateCustomer>,
) -> Result<Json<Customer>, Rejection> {
    authorize(&state.config, &headers)?;

    let mut details = Vec::new();
    if input.name.is_empty() {
        details.push(missing("name"));
    }
    if input.email.is_empty() {
        details.push(missing("email"));
    }
    if !details.is_empty() {
        return Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "parameter_validation_error",
            details,
        ));
    }

    if let Some((index, source)) = input
        .payment_sources
        .iter()
        .enumerate()
        .find(|(_, s)| state.config.declined_tokens.contains(&s.token_id))
    {
        return Err(failure(
            StatusCode::PAYMENT_REQUIRED,
            "invalid_payment",
            vec![detail(
                "conekta.errors.processing.charge.card_payment.declined",
                &format!("The {} was declined.", source.source_type),
                Some(format!("payment_sources.{index}.token_id").as_str()),
            )],
        ));
    }

    let mut store = state.store.write().await;
    let n = store.customers.len() + 1;
    let customer = Customer {
        id: format!("cus_{n}"),
        object: "customer".to_string(),
        livemode: false,
        name: input.name,
        email: input.email,
        phone: input.phone,
        corporate: input.corporate,
        default_payment_source_id: if input.payment_sources.is_empty() {
            String::new()
        } else {
            format!("src_{n}")
        },
        created_at: now(),
    };
    store.customers.push(customer.clone());
    info!(id = %customer.id, "customer created");
    Ok(Json(customer))
}
