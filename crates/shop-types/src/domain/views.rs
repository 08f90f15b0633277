use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::catalog::ShippingAddress;
use crate::domain::chat::ChatMessage;
use crate::domain::order::{OrderStatus, PaymentMethod};

/// Denormalized order line for API responses: order-item fields plus the
/// product name/type/first-image looked up from the variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemView {
    pub order_item_id: Uuid,
    pub product_item_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_type: String,
    pub amount: u32,
    pub price: i64,
    pub discount: i64,
    pub reviewed: bool,
    pub product_image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: Option<ShippingAddress>,
    pub total: i64,
    pub order_items: Vec<OrderItemView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: Uuid,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationView {
    pub id: i64,
    pub host_id: i64,
    pub is_read: bool,
    pub messages: Vec<ChatMessage>,
}
