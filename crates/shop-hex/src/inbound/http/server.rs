use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post, put},
    serve, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::application::chat_service::ChatService;
use crate::application::order_service::OrderService;
use crate::errors::AppError;
use shop_types::domain::chat::SenderRole;
use shop_types::domain::order::{OrderLine, OrderStatus, PaymentMethod};
use shop_types::domain::payment::Transaction;
use shop_types::domain::views::{ConversationView, OrderCreated, OrderView};
use shop_types::envelope::Envelope;
use shop_types::ports::store::{OrderFilter, ShopStore};

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

pub struct AppState<S: ShopStore> {
    pub orders: OrderService<S>,
    pub chat: ChatService<S>,
}

pub struct HttpServer<S: ShopStore> {
    state: Arc<AppState<S>>,
    config: HttpServerConfig,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub shipping_address_id: i64,
    pub payment_method: PaymentMethod,
    pub order_items: Vec<OrderLine>,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct RecordPaymentRequest {
    pub transaction_no: String,
    pub txn_ref: String,
    pub amount: i64,
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub sender_role: SenderRole,
    pub content: String,
}

/// Explicit caller identity: the authenticated user id is carried on the
/// `x-user-id` header by the auth layer in front of this service.
fn caller_id(headers: &HeaderMap) -> Result<i64, AppError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| AppError::validation("missing_user", "x-user-id header required"))
}

impl<S> HttpServer<S>
where
    S: ShopStore + Clone,
{
    pub async fn new(store: S, config: HttpServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(AppState {
                orders: OrderService::new(store.clone()),
                chat: ChatService::new(store),
            }),
            config,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        let state = self.state.clone();
        let app = Router::new()
            .route("/health", get(health))
            .route("/api/order", post(create_order::<S>))
            .route("/api/order/get-all", get(list_all_orders::<S>))
            .route("/api/order/user/all", get(orders_for_user::<S>))
            .route("/api/order/status/{status}", get(orders_by_status::<S>))
            .route("/api/order/cancel-order/{id}", put(cancel_order::<S>))
            .route("/api/order/{id}/payment", post(record_payment::<S>))
            .route("/api/order/{id}", get(get_order::<S>).put(advance_status::<S>))
            .route("/api/chat/conversation", post(open_conversation::<S>))
            .route("/api/chat/conversations", get(list_conversations::<S>))
            .route("/api/chat/conversation/{id}", get(get_conversation::<S>))
            .route(
                "/api/chat/conversation/{id}/message",
                post(send_message::<S>),
            )
            .route("/api/chat/conversation/{id}/read", put(mark_read::<S>))
            .layer(trace_layer)
            .with_state(state);

        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

async fn health() -> (axum::http::StatusCode, Json<serde_json::Value>) {
    (
        axum::http::StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
}

fn parse_order_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|e| AppError::validation("bad_order_id", e.to_string()))
}

async fn create_order<S>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<Envelope<OrderCreated>>), AppError>
where
    S: ShopStore,
{
    let user_id = caller_id(&headers)?;
    let order = state
        .orders
        .create_order(
            user_id,
            payload.shipping_address_id,
            payload.payment_method,
            payload.order_items,
        )
        .await?;
    let body = Envelope::ok(OrderCreated {
        order_id: order.id,
        status: order.status,
    });
    Ok((axum::http::StatusCode::CREATED, Json(body)))
}

async fn list_all_orders<S>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Envelope<Vec<OrderView>>>, AppError>
where
    S: ShopStore,
{
    let views = state
        .orders
        .list_orders(OrderFilter {
            start_date: query.start_date,
            end_date: query.end_date,
            ..OrderFilter::default()
        })
        .await?;
    Ok(Json(Envelope::ok(views)))
}

async fn get_order<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<OrderView>>, AppError>
where
    S: ShopStore,
{
    let order_id = parse_order_id(&id)?;
    let view = state.orders.get_order(order_id).await?;
    Ok(Json(Envelope::ok(view)))
}

async fn advance_status<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<OrderStatus>>, AppError>
where
    S: ShopStore,
{
    let order_id = parse_order_id(&id)?;
    let status = state.orders.advance_status(order_id).await?;
    Ok(Json(Envelope::ok(status)))
}

async fn cancel_order<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<OrderStatus>>, AppError>
where
    S: ShopStore,
{
    let order_id = parse_order_id(&id)?;
    state.orders.cancel_order(order_id).await?;
    Ok(Json(Envelope::ok(OrderStatus::Cancelled)))
}

async fn record_payment<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<Json<Envelope<Transaction>>, AppError>
where
    S: ShopStore,
{
    let order_id = parse_order_id(&id)?;
    let txn = state
        .orders
        .record_payment(
            order_id,
            payload.transaction_no,
            payload.txn_ref,
            payload.amount,
        )
        .await?;
    Ok(Json(Envelope::ok(txn)))
}

async fn orders_for_user<S>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Envelope<Vec<OrderView>>>, AppError>
where
    S: ShopStore,
{
    let user_id = caller_id(&headers)?;
    let views = state.orders.orders_for_user(user_id).await?;
    Ok(Json(Envelope::ok(views)))
}

async fn orders_by_status<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(status): Path<String>,
) -> Result<Json<Envelope<Vec<OrderView>>>, AppError>
where
    S: ShopStore,
{
    let status = OrderStatus::parse(&status)
        .ok_or_else(|| AppError::validation("bad_status", format!("unknown status: {status}")))?;
    let views = state.orders.orders_by_status(status).await?;
    Ok(Json(Envelope::ok(views)))
}

async fn open_conversation<S>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Envelope<ConversationView>>, AppError>
where
    S: ShopStore,
{
    let user_id = caller_id(&headers)?;
    let view = state.chat.open_conversation(user_id).await?;
    Ok(Json(Envelope::ok(view)))
}

async fn list_conversations<S>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Envelope<Vec<ConversationView>>>, AppError>
where
    S: ShopStore,
{
    let views = state.chat.list_conversations().await?;
    Ok(Json(Envelope::ok(views)))
}

async fn get_conversation<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Envelope<ConversationView>>, AppError>
where
    S: ShopStore,
{
    let view = state.chat.conversation(id).await?;
    Ok(Json(Envelope::ok(view)))
}

async fn send_message<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<Envelope<ConversationView>>, AppError>
where
    S: ShopStore,
{
    let sender_id = caller_id(&headers)?;
    let view = state
        .chat
        .send_message(id, sender_id, payload.sender_role, payload.content)
        .await?;
    Ok(Json(Envelope::ok(view)))
}

async fn mark_read<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Envelope<()>>, AppError>
where
    S: ShopStore,
{
    state.chat.mark_read(id).await?;
    Ok(Json(Envelope::ok(())))
}
