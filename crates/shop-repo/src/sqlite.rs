use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Executor, FromRow, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use shop_types::domain::catalog::{EntityStatus, ProductItem, ShippingAddress};
use shop_types::domain::chat::{ChatMessage, Conversation, SenderRole};
use shop_types::domain::order::{Order, OrderItem, OrderStatus, PaymentMethod};
use shop_types::domain::payment::Transaction;
use shop_types::ports::store::{OrderFilter, ShopStore, StoreError};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Db(e.to_string())
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(db_err)
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, StoreError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(db_err)?
        .with_timezone(&Utc))
}

#[derive(FromRow)]
struct DbOrder {
    id: String,
    user_id: i64,
    shipping_address_id: i64,
    payment_method: String,
    status: String,
    order_date: String,
}

impl DbOrder {
    fn into_order(self) -> Result<Order, StoreError> {
        Ok(Order {
            id: parse_uuid(&self.id)?,
            user_id: self.user_id,
            shipping_address_id: self.shipping_address_id,
            payment_method: PaymentMethod::parse(&self.payment_method)
                .ok_or_else(|| db_err(format!("bad payment method: {}", self.payment_method)))?,
            status: OrderStatus::parse(&self.status)
                .ok_or_else(|| db_err(format!("bad order status: {}", self.status)))?,
            order_date: parse_date(&self.order_date)?,
        })
    }
}

#[derive(FromRow)]
struct DbOrderItem {
    id: String,
    order_id: String,
    product_item_id: i64,
    price: i64,
    discount: i64,
    amount: i64,
    reviewed: bool,
}

impl DbOrderItem {
    fn into_item(self) -> Result<OrderItem, StoreError> {
        Ok(OrderItem {
            id: parse_uuid(&self.id)?,
            order_id: parse_uuid(&self.order_id)?,
            product_item_id: self.product_item_id,
            price: self.price,
            discount: self.discount,
            amount: u32::try_from(self.amount).map_err(db_err)?,
            reviewed: self.reviewed,
        })
    }
}

#[derive(FromRow)]
struct DbProductItem {
    id: i64,
    product_id: i64,
    product_name: String,
    product_type: String,
    image_url: String,
    stock: i64,
    price: i64,
    discount: i64,
    status: String,
}

impl DbProductItem {
    fn into_product_item(self) -> Result<ProductItem, StoreError> {
        Ok(ProductItem {
            id: self.id,
            product_id: self.product_id,
            product_name: self.product_name,
            product_type: self.product_type,
            image_url: self.image_url,
            stock: self.stock,
            price: self.price,
            discount: self.discount,
            status: EntityStatus::parse(&self.status)
                .ok_or_else(|| db_err(format!("bad entity status: {}", self.status)))?,
        })
    }
}

#[derive(FromRow)]
struct DbAddress {
    id: i64,
    user_id: i64,
    receiver_name: String,
    receiver_phone: String,
    location: String,
    status: String,
}

impl DbAddress {
    fn into_address(self) -> Result<ShippingAddress, StoreError> {
        Ok(ShippingAddress {
            id: self.id,
            user_id: self.user_id,
            receiver_name: self.receiver_name,
            receiver_phone: self.receiver_phone,
            location: self.location,
            status: EntityStatus::parse(&self.status)
                .ok_or_else(|| db_err(format!("bad entity status: {}", self.status)))?,
        })
    }
}

#[derive(FromRow)]
struct DbTransaction {
    id: String,
    order_id: String,
    transaction_no: String,
    txn_ref: String,
    amount: i64,
    command: String,
    pay_date: String,
}

impl DbTransaction {
    fn into_transaction(self) -> Result<Transaction, StoreError> {
        Ok(Transaction {
            id: parse_uuid(&self.id)?,
            order_id: parse_uuid(&self.order_id)?,
            transaction_no: self.transaction_no,
            txn_ref: self.txn_ref,
            amount: self.amount,
            command: self.command,
            pay_date: parse_date(&self.pay_date)?,
        })
    }
}

#[derive(FromRow)]
struct DbConversation {
    id: i64,
    host_id: i64,
    is_read: bool,
}

impl DbConversation {
    fn into_conversation(self) -> Conversation {
        Conversation {
            id: self.id,
            host_id: self.host_id,
            is_read: self.is_read,
        }
    }
}

#[derive(FromRow)]
struct DbChatMessage {
    id: String,
    conversation_id: i64,
    sender_id: i64,
    sender_role: String,
    content: String,
    sent_at: String,
}

impl DbChatMessage {
    fn into_message(self) -> Result<ChatMessage, StoreError> {
        Ok(ChatMessage {
            id: parse_uuid(&self.id)?,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            sender_role: SenderRole::parse(&self.sender_role)
                .ok_or_else(|| db_err(format!("bad sender role: {}", self.sender_role)))?,
            content: self.content,
            sent_at: parse_date(&self.sent_at)?,
        })
    }
}

impl SqliteStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_shop.sql");
        pool.execute(ddl).await?;

        Ok(Self { pool })
    }

    /// `VariantNotFound` or `InsufficientStock` for a variant whose guarded
    /// decrement matched no row.
    async fn stock_failure<'e, E>(
        executor: E,
        product_item_id: i64,
        requested: u32,
    ) -> StoreError
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let stock: Result<Option<i64>, _> =
            sqlx::query_scalar("SELECT stock FROM product_items WHERE id = ?")
                .bind(product_item_id)
                .fetch_optional(executor)
                .await;
        match stock {
            Ok(None) => StoreError::VariantNotFound(product_item_id),
            Ok(Some(available)) => StoreError::InsufficientStock {
                id: product_item_id,
                requested,
                available,
            },
            Err(e) => db_err(e),
        }
    }
}

#[async_trait]
impl ShopStore for SqliteStore {
    async fn upsert_product_item(&self, item: ProductItem) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO product_items (id, product_id, product_name, product_type, image_url, stock, price, discount, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                product_id = excluded.product_id,
                product_name = excluded.product_name,
                product_type = excluded.product_type,
                image_url = excluded.image_url,
                stock = excluded.stock,
                price = excluded.price,
                discount = excluded.discount,
                status = excluded.status",
        )
        .bind(item.id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(&item.product_type)
        .bind(&item.image_url)
        .bind(item.stock)
        .bind(item.price)
        .bind(item.discount)
        .bind(item.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_product_item(&self, id: i64) -> Result<Option<ProductItem>, StoreError> {
        let row: Option<DbProductItem> = sqlx::query_as(
            "SELECT id, product_id, product_name, product_type, image_url, stock, price, discount, status
             FROM product_items WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|r| r.into_product_item()).transpose()
    }

    async fn upsert_shipping_address(&self, address: ShippingAddress) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO shipping_addresses (id, user_id, receiver_name, receiver_phone, location, status)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                receiver_name = excluded.receiver_name,
                receiver_phone = excluded.receiver_phone,
                location = excluded.location,
                status = excluded.status",
        )
        .bind(address.id)
        .bind(address.user_id)
        .bind(&address.receiver_name)
        .bind(&address.receiver_phone)
        .bind(&address.location)
        .bind(address.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_shipping_address(
        &self,
        id: i64,
    ) -> Result<Option<ShippingAddress>, StoreError> {
        let row: Option<DbAddress> = sqlx::query_as(
            "SELECT id, user_id, receiver_name, receiver_phone, location, status
             FROM shipping_addresses WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|r| r.into_address()).transpose()
    }

    async fn reserve_stock(&self, product_item_id: i64, amount: u32) -> Result<(), StoreError> {
        let res =
            sqlx::query("UPDATE product_items SET stock = stock - ?1 WHERE id = ?2 AND stock >= ?1")
                .bind(i64::from(amount))
                .bind(product_item_id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(Self::stock_failure(&self.pool, product_item_id, amount).await);
        }
        Ok(())
    }

    async fn release_stock(&self, product_item_id: i64, amount: u32) -> Result<(), StoreError> {
        let res = sqlx::query("UPDATE product_items SET stock = stock + ? WHERE id = ?")
            .bind(i64::from(amount))
            .bind(product_item_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StoreError::VariantNotFound(product_item_id));
        }
        Ok(())
    }

    async fn create_order(
        &self,
        order: Order,
        items: Vec<OrderItem>,
    ) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Guarded decrement per line; any miss aborts the whole order and
        // the dropped transaction rolls back earlier decrements.
        for item in &items {
            let res = sqlx::query(
                "UPDATE product_items SET stock = stock - ?1 WHERE id = ?2 AND stock >= ?1",
            )
            .bind(i64::from(item.amount))
            .bind(item.product_item_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
            if res.rows_affected() == 0 {
                return Err(
                    Self::stock_failure(&mut *tx, item.product_item_id, item.amount).await,
                );
            }
        }

        sqlx::query(
            "INSERT INTO orders (id, user_id, shipping_address_id, payment_method, status, order_date)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id.to_string())
        .bind(order.user_id)
        .bind(order.shipping_address_id)
        .bind(order.payment_method.as_str())
        .bind(order.status.as_str())
        .bind(order.order_date.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for item in &items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_item_id, price, discount, amount, reviewed)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(item.id.to_string())
            .bind(item.order_id.to_string())
            .bind(item.product_item_id)
            .bind(item.price)
            .bind(item.discount)
            .bind(i64::from(item.amount))
            .bind(item.reviewed)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row: Option<DbOrder> = sqlx::query_as(
            "SELECT id, user_id, shipping_address_id, payment_method, status, order_date
             FROM orders WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|r| r.into_order()).transpose()
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        let rows: Vec<DbOrderItem> = sqlx::query_as(
            "SELECT id, order_id, product_item_id, price, discount, amount, reviewed
             FROM order_items WHERE order_id = ?",
        )
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(|r| r.into_item()).collect()
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<DbOrder> = sqlx::query_as(
            "SELECT id, user_id, shipping_address_id, payment_method, status, order_date
             FROM orders
             WHERE (?1 IS NULL OR order_date >= ?1)
               AND (?2 IS NULL OR order_date <= ?2)
               AND (?3 IS NULL OR user_id = ?3)
               AND (?4 IS NULL OR status = ?4)
             ORDER BY order_date DESC",
        )
        .bind(filter.start_date.map(|d| d.to_rfc3339()))
        .bind(filter.end_date.map(|d| d.to_rfc3339()))
        .bind(filter.user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(|r| r.into_order()).collect()
    }

    async fn advance_order(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError> {
        let res = sqlx::query("UPDATE orders SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(id.to_string())
            .bind(from.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }

    async fn cancel_order(
        &self,
        id: Uuid,
        refund: Option<Transaction>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query(
            "UPDATE orders SET status = 'Cancelled' WHERE id = ? AND status = 'Processing'",
        )
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Ok(false);
        }

        let items: Vec<DbOrderItem> = sqlx::query_as(
            "SELECT id, order_id, product_item_id, price, discount, amount, reviewed
             FROM order_items WHERE order_id = ?",
        )
        .bind(id.to_string())
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;

        for item in &items {
            sqlx::query("UPDATE product_items SET stock = stock + ? WHERE id = ?")
                .bind(item.amount)
                .bind(item.product_item_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        if let Some(refund) = refund {
            sqlx::query(
                "INSERT INTO transactions (id, order_id, transaction_no, txn_ref, amount, command, pay_date)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(refund.id.to_string())
            .bind(refund.order_id.to_string())
            .bind(&refund.transaction_no)
            .bind(&refund.txn_ref)
            .bind(refund.amount)
            .bind(&refund.command)
            .bind(refund.pay_date.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn insert_transaction(&self, txn: Transaction) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO transactions (id, order_id, transaction_no, txn_ref, amount, command, pay_date)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(txn.id.to_string())
        .bind(txn.order_id.to_string())
        .bind(&txn.transaction_no)
        .bind(&txn.txn_ref)
        .bind(txn.amount)
        .bind(&txn.command)
        .bind(txn.pay_date.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_transaction(
        &self,
        order_id: Uuid,
        command: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let row: Option<DbTransaction> = sqlx::query_as(
            "SELECT id, order_id, transaction_no, txn_ref, amount, command, pay_date
             FROM transactions WHERE order_id = ? AND command = ?
             ORDER BY pay_date DESC LIMIT 1",
        )
        .bind(order_id.to_string())
        .bind(command)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|r| r.into_transaction()).transpose()
    }

    async fn create_conversation(&self, host_id: i64) -> Result<Conversation, StoreError> {
        let res = sqlx::query("INSERT INTO conversations (host_id, is_read) VALUES (?, 1)")
            .bind(host_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(Conversation {
            id: res.last_insert_rowid(),
            host_id,
            is_read: true,
        })
    }

    async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>, StoreError> {
        let row: Option<DbConversation> =
            sqlx::query_as("SELECT id, host_id, is_read FROM conversations WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(|r| r.into_conversation()))
    }

    async fn conversation_for_host(
        &self,
        host_id: i64,
    ) -> Result<Option<Conversation>, StoreError> {
        let row: Option<DbConversation> = sqlx::query_as(
            "SELECT id, host_id, is_read FROM conversations WHERE host_id = ? LIMIT 1",
        )
        .bind(host_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(|r| r.into_conversation()))
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        let rows: Vec<DbConversation> =
            sqlx::query_as("SELECT id, host_id, is_read FROM conversations ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(rows.into_iter().map(|r| r.into_conversation()).collect())
    }

    async fn append_message(&self, message: ChatMessage) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let is_read = message.sender_role == SenderRole::Staff;
        let res = sqlx::query("UPDATE conversations SET is_read = ? WHERE id = ?")
            .bind(is_read)
            .bind(message.conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StoreError::ConversationNotFound(message.conversation_id));
        }

        sqlx::query(
            "INSERT INTO chat_messages (id, conversation_id, sender_id, sender_role, content, sent_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.sender_role.as_str())
        .bind(&message.content)
        .bind(message.sent_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn conversation_messages(
        &self,
        conversation_id: i64,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let rows: Vec<DbChatMessage> = sqlx::query_as(
            "SELECT id, conversation_id, sender_id, sender_role, content, sent_at
             FROM chat_messages WHERE conversation_id = ? ORDER BY sent_at",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(|r| r.into_message()).collect()
    }

    async fn mark_conversation_read(&self, id: i64) -> Result<bool, StoreError> {
        let res = sqlx::query("UPDATE conversations SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }
}
