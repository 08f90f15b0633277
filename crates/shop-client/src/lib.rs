use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shop_types::domain::chat::SenderRole;
use shop_types::domain::order::{OrderLine, OrderStatus, PaymentMethod};
use shop_types::domain::payment::Transaction;
use shop_types::domain::views::{ConversationView, OrderCreated, OrderView};
use shop_types::envelope::Envelope;

#[derive(Clone)]
pub struct ShopClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct ShopClient {
    base: Url,
    client: reqwest::Client,
}

impl ShopClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<ShopClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(ShopClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    pub async fn create_order(&self, req: CreateOrderRequest) -> anyhow::Result<OrderCreated> {
        let res = self
            .client
            .post(self.url("api/order")?)
            .json(&req)
            .send()
            .await?
            .error_for_status()?;
        unwrap_envelope(res.json().await?)
    }

    pub async fn get_order(&self, id: Uuid) -> anyhow::Result<OrderView> {
        let res = self
            .client
            .get(self.url(&format!("api/order/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        unwrap_envelope(res.json().await?)
    }

    pub async fn list_orders(&self) -> anyhow::Result<Vec<OrderView>> {
        let res = self
            .client
            .get(self.url("api/order/get-all")?)
            .send()
            .await?
            .error_for_status()?;
        unwrap_envelope(res.json().await?)
    }

    pub async fn my_orders(&self) -> anyhow::Result<Vec<OrderView>> {
        let res = self
            .client
            .get(self.url("api/order/user/all")?)
            .send()
            .await?
            .error_for_status()?;
        unwrap_envelope(res.json().await?)
    }

    pub async fn orders_by_status(&self, status: OrderStatus) -> anyhow::Result<Vec<OrderView>> {
        let res = self
            .client
            .get(self.url(&format!("api/order/status/{}", status.as_str()))?)
            .send()
            .await?
            .error_for_status()?;
        unwrap_envelope(res.json().await?)
    }

    /// Moves the order one step along its workflow and returns the new status.
    pub async fn advance_order(&self, id: Uuid) -> anyhow::Result<OrderStatus> {
        let res = self
            .client
            .put(self.url(&format!("api/order/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        unwrap_envelope(res.json().await?)
    }

    pub async fn cancel_order(&self, id: Uuid) -> anyhow::Result<OrderStatus> {
        let res = self
            .client
            .put(self.url(&format!("api/order/cancel-order/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        unwrap_envelope(res.json().await?)
    }

    pub async fn record_payment(
        &self,
        id: Uuid,
        req: RecordPaymentRequest,
    ) -> anyhow::Result<Transaction> {
        let res = self
            .client
            .post(self.url(&format!("api/order/{id}/payment"))?)
            .json(&req)
            .send()
            .await?
            .error_for_status()?;
        unwrap_envelope(res.json().await?)
    }

    pub async fn open_conversation(&self) -> anyhow::Result<ConversationView> {
        let res = self
            .client
            .post(self.url("api/chat/conversation")?)
            .send()
            .await?
            .error_for_status()?;
        unwrap_envelope(res.json().await?)
    }

    pub async fn send_message(
        &self,
        conversation_id: i64,
        sender_role: SenderRole,
        content: impl Into<String>,
    ) -> anyhow::Result<ConversationView> {
        let res = self
            .client
            .post(self.url(&format!("api/chat/conversation/{conversation_id}/message"))?)
            .json(&SendMessageRequest {
                sender_role,
                content: content.into(),
            })
            .send()
            .await?
            .error_for_status()?;
        unwrap_envelope(res.json().await?)
    }

    pub async fn mark_read(&self, conversation_id: i64) -> anyhow::Result<()> {
        self.client
            .put(self.url(&format!("api/chat/conversation/{conversation_id}/read"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> anyhow::Result<T> {
    envelope
        .data
        .with_context(|| format!("response carried no data (code: {})", envelope.code))
}

impl ShopClientBuilder {
    /// Sets the caller identity sent on every request.
    pub fn with_user(self, user_id: i64) -> anyhow::Result<Self> {
        self.with_header("x-user-id", user_id.to_string())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<ShopClient> {
        if let Some(client) = self.client {
            return Ok(ShopClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(ShopClient {
            base: self.base,
            client,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateOrderRequest {
    pub shipping_address_id: i64,
    pub payment_method: PaymentMethod,
    pub order_items: Vec<OrderLine>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RecordPaymentRequest {
    pub transaction_no: String,
    pub txn_ref: String,
    pub amount: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct SendMessageRequest {
    sender_role: SenderRole,
    content: String,
}
