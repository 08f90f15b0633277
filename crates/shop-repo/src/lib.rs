#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a store feature: `memory` or `sqlite`.");

use async_trait::async_trait;
use uuid::Uuid;

use shop_types::domain::catalog::{ProductItem, ShippingAddress};
use shop_types::domain::chat::{ChatMessage, Conversation};
use shop_types::domain::order::{Order, OrderItem, OrderStatus};
use shop_types::domain::payment::Transaction;
use shop_types::ports::store::{OrderFilter, ShopStore, StoreError};

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Feature-selected store. With both features enabled the sqlite backend
/// wins; memory is the dev/test default.
#[derive(Clone)]
pub struct Store {
    #[cfg(all(feature = "memory", not(feature = "sqlite")))]
    memory: memory::MemoryStore,
    #[cfg(feature = "sqlite")]
    sqlite: sqlite::SqliteStore,
}

pub async fn build_store(url: Option<&str>) -> anyhow::Result<Store> {
    Store::build(url).await
}

impl Store {
    #[cfg(all(feature = "memory", not(feature = "sqlite")))]
    pub async fn build(_: Option<&str>) -> anyhow::Result<Self> {
        Ok(Self {
            memory: memory::MemoryStore::new(),
        })
    }

    #[cfg(feature = "sqlite")]
    pub async fn build(database_url: Option<&str>) -> anyhow::Result<Self> {
        let url = database_url.unwrap_or("sqlite://shop.db");
        let sqlite = sqlite::SqliteStore::new(url).await?;
        Ok(Self { sqlite })
    }

    fn backend(&self) -> &dyn ShopStore {
        #[cfg(feature = "sqlite")]
        {
            &self.sqlite
        }
        #[cfg(not(feature = "sqlite"))]
        {
            &self.memory
        }
    }
}

#[async_trait]
impl ShopStore for Store {
    async fn upsert_product_item(&self, item: ProductItem) -> Result<(), StoreError> {
        self.backend().upsert_product_item(item).await
    }

    async fn get_product_item(&self, id: i64) -> Result<Option<ProductItem>, StoreError> {
        self.backend().get_product_item(id).await
    }

    async fn upsert_shipping_address(&self, address: ShippingAddress) -> Result<(), StoreError> {
        self.backend().upsert_shipping_address(address).await
    }

    async fn get_shipping_address(
        &self,
        id: i64,
    ) -> Result<Option<ShippingAddress>, StoreError> {
        self.backend().get_shipping_address(id).await
    }

    async fn reserve_stock(&self, product_item_id: i64, amount: u32) -> Result<(), StoreError> {
        self.backend().reserve_stock(product_item_id, amount).await
    }

    async fn release_stock(&self, product_item_id: i64, amount: u32) -> Result<(), StoreError> {
        self.backend().release_stock(product_item_id, amount).await
    }

    async fn create_order(
        &self,
        order: Order,
        items: Vec<OrderItem>,
    ) -> Result<Order, StoreError> {
        self.backend().create_order(order, items).await
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        self.backend().get_order(id).await
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        self.backend().order_items(order_id).await
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        self.backend().list_orders(filter).await
    }

    async fn advance_order(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError> {
        self.backend().advance_order(id, from, to).await
    }

    async fn cancel_order(
        &self,
        id: Uuid,
        refund: Option<Transaction>,
    ) -> Result<bool, StoreError> {
        self.backend().cancel_order(id, refund).await
    }

    async fn insert_transaction(&self, txn: Transaction) -> Result<(), StoreError> {
        self.backend().insert_transaction(txn).await
    }

    async fn find_transaction(
        &self,
        order_id: Uuid,
        command: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        self.backend().find_transaction(order_id, command).await
    }

    async fn create_conversation(&self, host_id: i64) -> Result<Conversation, StoreError> {
        self.backend().create_conversation(host_id).await
    }

    async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>, StoreError> {
        self.backend().get_conversation(id).await
    }

    async fn conversation_for_host(
        &self,
        host_id: i64,
    ) -> Result<Option<Conversation>, StoreError> {
        self.backend().conversation_for_host(host_id).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        self.backend().list_conversations().await
    }

    async fn append_message(&self, message: ChatMessage) -> Result<(), StoreError> {
        self.backend().append_message(message).await
    }

    async fn conversation_messages(
        &self,
        conversation_id: i64,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        self.backend().conversation_messages(conversation_id).await
    }

    async fn mark_conversation_read(&self, id: i64) -> Result<bool, StoreError> {
        self.backend().mark_conversation_read(id).await
    }
}
