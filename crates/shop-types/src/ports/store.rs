use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::catalog::{ProductItem, ShippingAddress};
use crate::domain::chat::{ChatMessage, Conversation};
use crate::domain::order::{Order, OrderItem, OrderStatus};
use crate::domain::payment::Transaction;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("db error: {0}")]
    Db(String),

    #[error("product item {0} not found")]
    VariantNotFound(i64),

    #[error("insufficient stock for product item {id}: requested {requested}, available {available}")]
    InsufficientStock {
        id: i64,
        requested: u32,
        available: i64,
    },

    #[error("conversation {0} not found")]
    ConversationNotFound(i64),
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub user_id: Option<i64>,
    pub status: Option<OrderStatus>,
}

/// Persistence port for the whole backend: catalog rows, the inventory
/// ledger, the order aggregate, payment bookkeeping and support chat.
///
/// Multi-step operations (`create_order`, `cancel_order`) are atomic in every
/// adapter: either all of their writes land or none do. Status changes go
/// through guarded compare-and-swap updates so concurrent callers cannot
/// both win the same transition, and stock decrements never drive a
/// variant's stock below zero.
#[async_trait]
pub trait ShopStore: Send + Sync + 'static {
    // Catalog (plain data store).
    async fn upsert_product_item(&self, item: ProductItem) -> Result<(), StoreError>;
    async fn get_product_item(&self, id: i64) -> Result<Option<ProductItem>, StoreError>;
    async fn upsert_shipping_address(&self, address: ShippingAddress) -> Result<(), StoreError>;
    async fn get_shipping_address(&self, id: i64)
        -> Result<Option<ShippingAddress>, StoreError>;

    // Inventory ledger. `reserve_stock` decrements atomically and fails with
    // `VariantNotFound` / `InsufficientStock`; `release_stock` increments
    // with no upper bound (there is no reservation record to check against).
    async fn reserve_stock(&self, product_item_id: i64, amount: u32) -> Result<(), StoreError>;
    async fn release_stock(&self, product_item_id: i64, amount: u32) -> Result<(), StoreError>;

    // Orders. `create_order` reserves stock for every item and persists the
    // order plus items as one unit. `advance_order` / `cancel_order` return
    // whether the guarded status transition actually moved a row;
    // `cancel_order` also releases stock per item and writes the optional
    // refund row inside the same unit.
    async fn create_order(&self, order: Order, items: Vec<OrderItem>)
        -> Result<Order, StoreError>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;
    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError>;
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError>;
    async fn advance_order(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError>;
    async fn cancel_order(&self, id: Uuid, refund: Option<Transaction>)
        -> Result<bool, StoreError>;

    // Payment bookkeeping.
    async fn insert_transaction(&self, txn: Transaction) -> Result<(), StoreError>;
    async fn find_transaction(
        &self,
        order_id: Uuid,
        command: &str,
    ) -> Result<Option<Transaction>, StoreError>;

    // Support chat.
    async fn create_conversation(&self, host_id: i64) -> Result<Conversation, StoreError>;
    async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>, StoreError>;
    async fn conversation_for_host(&self, host_id: i64)
        -> Result<Option<Conversation>, StoreError>;
    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError>;
    async fn append_message(&self, message: ChatMessage) -> Result<(), StoreError>;
    async fn conversation_messages(
        &self,
        conversation_id: i64,
    ) -> Result<Vec<ChatMessage>, StoreError>;
    async fn mark_conversation_read(&self, id: i64) -> Result<bool, StoreError>;
}
