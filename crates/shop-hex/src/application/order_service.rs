use uuid::Uuid;

use crate::errors::AppError;
use shop_types::domain::catalog::EntityStatus;
use shop_types::domain::order::{
    order_total, Order, OrderItem, OrderLine, OrderStatus, PaymentMethod,
};
use shop_types::domain::payment::{Transaction, COMMAND_PAY};
use shop_types::domain::views::{OrderItemView, OrderView};
use shop_types::ports::store::{OrderFilter, ShopStore};

/// Order workflow: creation with inventory reservation, the linear status
/// state machine, the cancellation branch with stock compensation and
/// refund bookkeeping, and OrderView assembly for every read path.
///
/// Caller identity is always an explicit `user_id` argument; nothing here
/// reads ambient request context.
pub struct OrderService<S: ShopStore> {
    store: S,
}

impl<S: ShopStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create_order(
        &self,
        user_id: i64,
        shipping_address_id: i64,
        payment_method: PaymentMethod,
        lines: Vec<OrderLine>,
    ) -> Result<Order, AppError> {
        if lines.is_empty() {
            return Err(AppError::validation(
                "empty_order",
                "order items cannot be empty",
            ));
        }
        if lines.iter().any(|l| l.amount == 0) {
            return Err(AppError::validation(
                "invalid_amount",
                "order item amount must be greater than zero",
            ));
        }

        let address = self
            .store
            .get_shipping_address(shipping_address_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    "shipping_address_not_found",
                    format!("shipping address {shipping_address_id} not found"),
                )
            })?;
        if address.status == EntityStatus::Inactive {
            return Err(AppError::validation(
                "shipping_address_inactive",
                format!("shipping address {shipping_address_id} is inactive"),
            ));
        }

        // Early per-line checks give precise errors; the store re-validates
        // stock under its own transaction, so a concurrent order racing us
        // here still cannot oversell.
        for line in &lines {
            let variant = self
                .store
                .get_product_item(line.product_item_id)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(
                        "variant_not_found",
                        format!("product item {} not found", line.product_item_id),
                    )
                })?;
            if i64::from(line.amount) > variant.stock {
                return Err(AppError::conflict(
                    "insufficient_stock",
                    format!(
                        "product item {}: requested {}, only {} in stock",
                        line.product_item_id, line.amount, variant.stock
                    ),
                ));
            }
        }

        let order = Order::new(user_id, shipping_address_id, payment_method);
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|l| OrderItem::from_line(order.id, l))
            .collect();
        let created = self.store.create_order(order, items).await?;
        tracing::info!(order_id = %created.id, user_id, "order created");
        Ok(created)
    }

    /// Linear advance: Processing -> Processed -> Shipping -> Completed.
    /// Terminal and cancelled orders cannot move.
    pub async fn advance_status(&self, order_id: Uuid) -> Result<OrderStatus, AppError> {
        let order = self.load_order(order_id).await?;
        let next = order.status.advance().ok_or_else(|| {
            AppError::conflict(
                "invalid_transition",
                format!("order cannot advance from {}", order.status.as_str()),
            )
        })?;
        let moved = self.store.advance_order(order_id, order.status, next).await?;
        if !moved {
            // Lost a race with another transition since we read the order.
            return Err(AppError::conflict(
                "invalid_transition",
                format!("order cannot advance from {}", order.status.as_str()),
            ));
        }
        tracing::info!(order_id = %order_id, status = next.as_str(), "order advanced");
        Ok(next)
    }

    /// Cancel a `Processing` order: restore stock for every line and, for
    /// VnPay orders, record a refund row copying the original payment. No
    /// payment gateway is called.
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<(), AppError> {
        let order = self.load_order(order_id).await?;
        if order.status != OrderStatus::Processing {
            return Err(AppError::conflict(
                "invalid_transition",
                format!("order in {} cannot be cancelled", order.status.as_str()),
            ));
        }

        let refund = match order.payment_method {
            PaymentMethod::VnPay => {
                let paid = self
                    .store
                    .find_transaction(order_id, COMMAND_PAY)
                    .await?
                    .ok_or_else(|| {
                        AppError::not_found(
                            "transaction_not_found",
                            format!("no payment transaction for order {order_id}"),
                        )
                    })?;
                Some(Transaction::refund_of(&paid))
            }
            PaymentMethod::Cod => None,
        };

        let cancelled = self.store.cancel_order(order_id, refund).await?;
        if !cancelled {
            return Err(AppError::conflict(
                "invalid_transition",
                "order is no longer in Processing",
            ));
        }
        tracing::info!(order_id = %order_id, "order cancelled");
        Ok(())
    }

    /// Checkout bookkeeping for gateway payments; the resulting `pay` row is
    /// what a later cancellation copies into its refund record.
    pub async fn record_payment(
        &self,
        order_id: Uuid,
        transaction_no: String,
        txn_ref: String,
        amount: i64,
    ) -> Result<Transaction, AppError> {
        let _ = self.load_order(order_id).await?;
        let txn = Transaction::payment(order_id, transaction_no, txn_ref, amount);
        self.store.insert_transaction(txn.clone()).await?;
        Ok(txn)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderView, AppError> {
        let order = self.load_order(order_id).await?;
        self.assemble_view(order).await
    }

    pub async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<OrderView>, AppError> {
        let orders = self.store.list_orders(filter).await?;
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            views.push(self.assemble_view(order).await?);
        }
        Ok(views)
    }

    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<OrderView>, AppError> {
        self.list_orders(OrderFilter {
            user_id: Some(user_id),
            ..OrderFilter::default()
        })
        .await
    }

    pub async fn orders_by_status(
        &self,
        status: OrderStatus,
    ) -> Result<Vec<OrderView>, AppError> {
        self.list_orders(OrderFilter {
            status: Some(status),
            ..OrderFilter::default()
        })
        .await
    }

    async fn load_order(&self, order_id: Uuid) -> Result<Order, AppError> {
        self.store.get_order(order_id).await?.ok_or_else(|| {
            AppError::not_found("order_not_found", format!("order {order_id} not found"))
        })
    }

    /// Denormalized response assembly: order fields, recomputed total and
    /// item views carrying product name/type/first image.
    async fn assemble_view(&self, order: Order) -> Result<OrderView, AppError> {
        let items = self.store.order_items(order.id).await?;
        let shipping_address = self
            .store
            .get_shipping_address(order.shipping_address_id)
            .await?;

        let mut item_views = Vec::with_capacity(items.len());
        for item in &items {
            let variant = self.store.get_product_item(item.product_item_id).await?;
            let (product_id, product_name, product_type, product_image) = match variant {
                Some(v) => (v.id, v.product_name, v.product_type, v.image_url),
                None => (0, String::new(), String::new(), String::new()),
            };
            item_views.push(OrderItemView {
                order_item_id: item.id,
                product_item_id: item.product_item_id,
                product_id,
                product_name,
                product_type,
                amount: item.amount,
                price: item.price,
                discount: item.discount,
                reviewed: item.reviewed,
                product_image,
            });
        }

        Ok(OrderView {
            order_id: order.id,
            order_date: order.order_date,
            status: order.status,
            payment_method: order.payment_method,
            shipping_address,
            total: order_total(&items),
            order_items: item_views,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_repo::memory::MemoryStore;
    use shop_types::domain::catalog::{EntityStatus, ProductItem, ShippingAddress};
    use shop_types::domain::payment::COMMAND_REFUND;

    async fn seed(store: &MemoryStore) {
        for (id, stock) in [(1_i64, 10_i64), (2, 3)] {
            store
                .upsert_product_item(ProductItem {
                    id,
                    product_id: 100 + id,
                    product_name: format!("Arabica {id}"),
                    product_type: "Whole bean".into(),
                    image_url: format!("https://cdn.example/p{id}.jpg"),
                    stock,
                    price: 55_000,
                    discount: 5_000,
                    status: EntityStatus::Active,
                })
                .await
                .unwrap();
        }
        store
            .upsert_shipping_address(ShippingAddress {
                id: 1,
                user_id: 7,
                receiver_name: "Lan".into(),
                receiver_phone: "0900000001".into(),
                location: "12 Ly Thuong Kiet, Ha Noi".into(),
                status: EntityStatus::Active,
            })
            .await
            .unwrap();
        store
            .upsert_shipping_address(ShippingAddress {
                id: 2,
                user_id: 7,
                receiver_name: "Lan".into(),
                receiver_phone: "0900000001".into(),
                location: "old address".into(),
                status: EntityStatus::Inactive,
            })
            .await
            .unwrap();
    }

    fn line(product_item_id: i64, amount: u32) -> OrderLine {
        OrderLine {
            product_item_id,
            amount,
            price: 55_000,
            discount: 5_000,
        }
    }

    async fn stock_of(store: &MemoryStore, id: i64) -> i64 {
        store.get_product_item(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn create_order_decrements_stock_per_line() {
        let store = MemoryStore::new();
        seed(&store).await;
        let svc = OrderService::new(store.clone());

        let order = svc
            .create_order(7, 1, PaymentMethod::Cod, vec![line(1, 2), line(2, 3)])
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(stock_of(&store, 1).await, 8);
        assert_eq!(stock_of(&store, 2).await, 0);

        let view = svc.get_order(order.id).await.unwrap();
        assert_eq!(view.order_items.len(), 2);
        assert_eq!(view.order_items[0].product_name, "Arabica 1");
        assert_eq!(view.total, 50_000 * 5 + 10_000);
    }

    #[tokio::test]
    async fn empty_order_is_rejected_without_stock_mutation() {
        let store = MemoryStore::new();
        seed(&store).await;
        let svc = OrderService::new(store.clone());

        let res = svc.create_order(7, 1, PaymentMethod::Cod, vec![]).await;
        assert!(matches!(res, Err(AppError::Validation { code, .. }) if code == "empty_order"));
        assert_eq!(stock_of(&store, 1).await, 10);
    }

    #[tokio::test]
    async fn zero_amount_line_is_rejected() {
        let store = MemoryStore::new();
        seed(&store).await;
        let svc = OrderService::new(store.clone());

        let res = svc
            .create_order(7, 1, PaymentMethod::Cod, vec![line(1, 0)])
            .await;
        assert!(matches!(res, Err(AppError::Validation { code, .. }) if code == "invalid_amount"));
    }

    #[tokio::test]
    async fn inactive_or_missing_address_is_rejected() {
        let store = MemoryStore::new();
        seed(&store).await;
        let svc = OrderService::new(store.clone());

        let missing = svc
            .create_order(7, 99, PaymentMethod::Cod, vec![line(1, 1)])
            .await;
        assert!(matches!(
            missing,
            Err(AppError::NotFound { code, .. }) if code == "shipping_address_not_found"
        ));

        let inactive = svc
            .create_order(7, 2, PaymentMethod::Cod, vec![line(1, 1)])
            .await;
        assert!(matches!(
            inactive,
            Err(AppError::Validation { code, .. }) if code == "shipping_address_inactive"
        ));
        assert_eq!(stock_of(&store, 1).await, 10);
    }

    #[tokio::test]
    async fn insufficient_stock_on_later_line_leaves_earlier_lines_untouched() {
        let store = MemoryStore::new();
        seed(&store).await;
        let svc = OrderService::new(store.clone());

        // Line 1 would fit, line 2 exceeds its stock of 3.
        let res = svc
            .create_order(7, 1, PaymentMethod::Cod, vec![line(1, 2), line(2, 4)])
            .await;
        assert!(matches!(res, Err(AppError::Conflict { code, .. }) if code == "insufficient_stock"));
        assert_eq!(stock_of(&store, 1).await, 10);
        assert_eq!(stock_of(&store, 2).await, 3);
    }

    #[tokio::test]
    async fn unknown_variant_is_rejected() {
        let store = MemoryStore::new();
        seed(&store).await;
        let svc = OrderService::new(store.clone());

        let res = svc
            .create_order(7, 1, PaymentMethod::Cod, vec![line(42, 1)])
            .await;
        assert!(matches!(res, Err(AppError::NotFound { code, .. }) if code == "variant_not_found"));
    }

    #[tokio::test]
    async fn status_advances_to_completed_then_refuses() {
        let store = MemoryStore::new();
        seed(&store).await;
        let svc = OrderService::new(store.clone());

        let order = svc
            .create_order(7, 1, PaymentMethod::Cod, vec![line(1, 1)])
            .await
            .unwrap();

        assert_eq!(
            svc.advance_status(order.id).await.unwrap(),
            OrderStatus::Processed
        );
        assert_eq!(
            svc.advance_status(order.id).await.unwrap(),
            OrderStatus::Shipping
        );
        assert_eq!(
            svc.advance_status(order.id).await.unwrap(),
            OrderStatus::Completed
        );

        let stuck = svc.advance_status(order.id).await;
        assert!(matches!(stuck, Err(AppError::Conflict { code, .. }) if code == "invalid_transition"));
    }

    #[tokio::test]
    async fn cancel_restores_stock_and_is_one_shot() {
        let store = MemoryStore::new();
        seed(&store).await;
        let svc = OrderService::new(store.clone());

        let order = svc
            .create_order(7, 1, PaymentMethod::Cod, vec![line(1, 4), line(2, 2)])
            .await
            .unwrap();
        assert_eq!(stock_of(&store, 1).await, 6);
        assert_eq!(stock_of(&store, 2).await, 1);

        svc.cancel_order(order.id).await.unwrap();
        assert_eq!(stock_of(&store, 1).await, 10);
        assert_eq!(stock_of(&store, 2).await, 3);

        let again = svc.cancel_order(order.id).await;
        assert!(matches!(again, Err(AppError::Conflict { code, .. }) if code == "invalid_transition"));
        assert_eq!(stock_of(&store, 1).await, 10);

        let cancelled = svc.advance_status(order.id).await;
        assert!(matches!(cancelled, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn cancel_after_processing_fails_and_keeps_stock() {
        let store = MemoryStore::new();
        seed(&store).await;
        let svc = OrderService::new(store.clone());

        let order = svc
            .create_order(7, 1, PaymentMethod::Cod, vec![line(1, 3)])
            .await
            .unwrap();
        svc.advance_status(order.id).await.unwrap();

        let res = svc.cancel_order(order.id).await;
        assert!(matches!(res, Err(AppError::Conflict { code, .. }) if code == "invalid_transition"));
        assert_eq!(stock_of(&store, 1).await, 7);
    }

    #[tokio::test]
    async fn vnpay_cancel_requires_a_payment_and_records_a_refund() {
        let store = MemoryStore::new();
        seed(&store).await;
        let svc = OrderService::new(store.clone());

        let order = svc
            .create_order(7, 1, PaymentMethod::VnPay, vec![line(1, 2)])
            .await
            .unwrap();

        // No payment row yet: cancellation must refuse.
        let res = svc.cancel_order(order.id).await;
        assert!(matches!(
            res,
            Err(AppError::NotFound { code, .. }) if code == "transaction_not_found"
        ));
        assert_eq!(stock_of(&store, 1).await, 8);

        svc.record_payment(order.id, "14352888".into(), "ref-1".into(), 110_000)
            .await
            .unwrap();
        svc.cancel_order(order.id).await.unwrap();
        assert_eq!(stock_of(&store, 1).await, 10);

        let refund = store
            .find_transaction(order.id, COMMAND_REFUND)
            .await
            .unwrap()
            .expect("refund row");
        assert_eq!(refund.transaction_no, "14352888");
        assert_eq!(refund.txn_ref, "ref-1");
        assert_eq!(refund.amount, 110_000);
    }

    #[tokio::test]
    async fn cod_cancel_records_no_refund() {
        let store = MemoryStore::new();
        seed(&store).await;
        let svc = OrderService::new(store.clone());

        let order = svc
            .create_order(7, 1, PaymentMethod::Cod, vec![line(1, 1)])
            .await
            .unwrap();
        svc.cancel_order(order.id).await.unwrap();

        let refund = store
            .find_transaction(order.id, COMMAND_REFUND)
            .await
            .unwrap();
        assert!(refund.is_none());
    }

    #[tokio::test]
    async fn read_paths_share_the_same_total() {
        let store = MemoryStore::new();
        seed(&store).await;
        let svc = OrderService::new(store.clone());

        let order = svc
            .create_order(7, 1, PaymentMethod::Cod, vec![line(1, 2)])
            .await
            .unwrap();

        let by_id = svc.get_order(order.id).await.unwrap();
        let by_user = svc.orders_for_user(7).await.unwrap();
        let by_status = svc.orders_by_status(OrderStatus::Processing).await.unwrap();
        let all = svc.list_orders(OrderFilter::default()).await.unwrap();

        let expected = (55_000 - 5_000) * 2 + 10_000;
        assert_eq!(by_id.total, expected);
        assert_eq!(by_user[0].total, expected);
        assert_eq!(by_status[0].total, expected);
        assert_eq!(all[0].total, expected);
    }

    #[tokio::test]
    async fn missing_order_paths_return_not_found() {
        let store = MemoryStore::new();
        seed(&store).await;
        let svc = OrderService::new(store.clone());
        let missing = Uuid::new_v4();

        assert!(matches!(
            svc.get_order(missing).await,
            Err(AppError::NotFound { code, .. }) if code == "order_not_found"
        ));
        assert!(matches!(
            svc.advance_status(missing).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            svc.cancel_order(missing).await,
            Err(AppError::NotFound { .. })
        ));
    }
}
