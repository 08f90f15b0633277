use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use shop_types::domain::catalog::{ProductItem, ShippingAddress};
use shop_types::domain::chat::{ChatMessage, Conversation, SenderRole};
use shop_types::domain::order::{Order, OrderItem, OrderStatus};
use shop_types::domain::payment::Transaction;
use shop_types::ports::store::{OrderFilter, ShopStore, StoreError};

/// Order, catalog and payment tables share one mutex: `create_order` and
/// `cancel_order` mutate stock and order rows together and must be atomic
/// across tables. Chat rows are only ever touched one conversation at a
/// time, so they live in dashmaps.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    conversations: Arc<DashMap<i64, Conversation>>,
    messages: Arc<DashMap<i64, Vec<ChatMessage>>>,
    next_conversation_id: Arc<AtomicI64>,
}

#[derive(Default)]
struct Inner {
    product_items: HashMap<i64, ProductItem>,
    addresses: HashMap<i64, ShippingAddress>,
    orders: HashMap<Uuid, Order>,
    order_items: HashMap<Uuid, Vec<OrderItem>>,
    transactions: Vec<Transaction>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            conversations: Arc::new(DashMap::new()),
            messages: Arc::new(DashMap::new()),
            next_conversation_id: Arc::new(AtomicI64::new(1)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Db("store mutex poisoned".into()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_stock(inner: &Inner, product_item_id: i64, amount: u32) -> Result<(), StoreError> {
    match inner.product_items.get(&product_item_id) {
        None => Err(StoreError::VariantNotFound(product_item_id)),
        Some(pi) if pi.stock < i64::from(amount) => Err(StoreError::InsufficientStock {
            id: product_item_id,
            requested: amount,
            available: pi.stock,
        }),
        Some(_) => Ok(()),
    }
}

#[async_trait]
impl ShopStore for MemoryStore {
    async fn upsert_product_item(&self, item: ProductItem) -> Result<(), StoreError> {
        self.lock()?.product_items.insert(item.id, item);
        Ok(())
    }

    async fn get_product_item(&self, id: i64) -> Result<Option<ProductItem>, StoreError> {
        Ok(self.lock()?.product_items.get(&id).cloned())
    }

    async fn upsert_shipping_address(&self, address: ShippingAddress) -> Result<(), StoreError> {
        self.lock()?.addresses.insert(address.id, address);
        Ok(())
    }

    async fn get_shipping_address(
        &self,
        id: i64,
    ) -> Result<Option<ShippingAddress>, StoreError> {
        Ok(self.lock()?.addresses.get(&id).cloned())
    }

    async fn reserve_stock(&self, product_item_id: i64, amount: u32) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        check_stock(&inner, product_item_id, amount)?;
        if let Some(pi) = inner.product_items.get_mut(&product_item_id) {
            pi.stock -= i64::from(amount);
        }
        Ok(())
    }

    async fn release_stock(&self, product_item_id: i64, amount: u32) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        match inner.product_items.get_mut(&product_item_id) {
            Some(pi) => {
                pi.stock += i64::from(amount);
                Ok(())
            }
            None => Err(StoreError::VariantNotFound(product_item_id)),
        }
    }

    async fn create_order(
        &self,
        order: Order,
        items: Vec<OrderItem>,
    ) -> Result<Order, StoreError> {
        let mut inner = self.lock()?;
        // Validate every line before touching any stock so a failure on a
        // later line leaves earlier lines untouched.
        for item in &items {
            check_stock(&inner, item.product_item_id, item.amount)?;
        }
        for item in &items {
            if let Some(pi) = inner.product_items.get_mut(&item.product_item_id) {
                pi.stock -= i64::from(item.amount);
            }
        }
        inner.order_items.insert(order.id, items);
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.lock()?.orders.get(&id).cloned())
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        Ok(self
            .lock()?
            .order_items
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let inner = self.lock()?;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| filter.start_date.map_or(true, |d| o.order_date >= d))
            .filter(|o| filter.end_date.map_or(true, |d| o.order_date <= d))
            .filter(|o| filter.user_id.map_or(true, |u| o.user_id == u))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        Ok(orders)
    }

    async fn advance_order(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        match inner.orders.get_mut(&id) {
            Some(order) if order.status == from => {
                order.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cancel_order(
        &self,
        id: Uuid,
        refund: Option<Transaction>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        match inner.orders.get_mut(&id) {
            Some(order) if order.status == OrderStatus::Processing => {
                order.status = OrderStatus::Cancelled;
            }
            _ => return Ok(false),
        }
        let items = inner.order_items.get(&id).cloned().unwrap_or_default();
        for item in &items {
            if let Some(pi) = inner.product_items.get_mut(&item.product_item_id) {
                pi.stock += i64::from(item.amount);
            }
        }
        if let Some(refund) = refund {
            inner.transactions.push(refund);
        }
        Ok(true)
    }

    async fn insert_transaction(&self, txn: Transaction) -> Result<(), StoreError> {
        self.lock()?.transactions.push(txn);
        Ok(())
    }

    async fn find_transaction(
        &self,
        order_id: Uuid,
        command: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        Ok(self
            .lock()?
            .transactions
            .iter()
            .rev()
            .find(|t| t.order_id == order_id && t.command == command)
            .cloned())
    }

    async fn create_conversation(&self, host_id: i64) -> Result<Conversation, StoreError> {
        let id = self.next_conversation_id.fetch_add(1, Ordering::SeqCst);
        let conversation = Conversation {
            id,
            host_id,
            is_read: true,
        };
        self.conversations.insert(id, conversation.clone());
        self.messages.insert(id, Vec::new());
        Ok(conversation)
    }

    async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>, StoreError> {
        Ok(self.conversations.get(&id).map(|c| c.clone()))
    }

    async fn conversation_for_host(
        &self,
        host_id: i64,
    ) -> Result<Option<Conversation>, StoreError> {
        Ok(self
            .conversations
            .iter()
            .find(|c| c.host_id == host_id)
            .map(|c| c.clone()))
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        let mut all: Vec<Conversation> =
            self.conversations.iter().map(|c| c.clone()).collect();
        all.sort_by_key(|c| c.id);
        Ok(all)
    }

    async fn append_message(&self, message: ChatMessage) -> Result<(), StoreError> {
        let conversation_id = message.conversation_id;
        let mut conversation = self
            .conversations
            .get_mut(&conversation_id)
            .ok_or(StoreError::ConversationNotFound(conversation_id))?;
        // Customer messages flag the thread unread for staff; staff replies
        // clear the flag.
        conversation.is_read = message.sender_role == SenderRole::Staff;
        self.messages
            .entry(conversation_id)
            .or_default()
            .push(message);
        Ok(())
    }

    async fn conversation_messages(
        &self,
        conversation_id: i64,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(self
            .messages
            .get(&conversation_id)
            .map(|m| m.clone())
            .unwrap_or_default())
    }

    async fn mark_conversation_read(&self, id: i64) -> Result<bool, StoreError> {
        match self.conversations.get_mut(&id) {
            Some(mut conversation) => {
                conversation.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
