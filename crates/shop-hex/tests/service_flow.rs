use shop_hex::application::order_service::OrderService;
use shop_repo::memory::MemoryStore;
use shop_types::domain::catalog::{EntityStatus, ProductItem, ShippingAddress};
use shop_types::domain::order::{OrderLine, OrderStatus, PaymentMethod};
use shop_types::ports::store::{OrderFilter, ShopStore};

async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .upsert_product_item(ProductItem {
            id: 1,
            product_id: 101,
            product_name: "Robusta blend".into(),
            product_type: "Ground".into(),
            image_url: "https://cdn.example/robusta.jpg".into(),
            stock: 20,
            price: 70_000,
            discount: 0,
            status: EntityStatus::Active,
        })
        .await
        .unwrap();
    store
        .upsert_shipping_address(ShippingAddress {
            id: 1,
            user_id: 3,
            receiver_name: "Minh".into(),
            receiver_phone: "0911222333".into(),
            location: "5 Trang Tien, Ha Noi".into(),
            status: EntityStatus::Active,
        })
        .await
        .unwrap();
    store
}

// Full order lifecycle against the in-memory adapter.
#[tokio::test]
async fn create_advance_complete_flow() {
    let store = seeded_store().await;
    let svc = OrderService::new(store.clone());

    let order = svc
        .create_order(
            3,
            1,
            PaymentMethod::Cod,
            vec![OrderLine {
                product_item_id: 1,
                amount: 2,
                price: 70_000,
                discount: 0,
            }],
        )
        .await
        .unwrap();

    let list = svc.list_orders(OrderFilter::default()).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].order_id, order.id);
    assert_eq!(list[0].total, 70_000 * 2 + 10_000);
    assert_eq!(
        list[0].shipping_address.as_ref().map(|a| a.id),
        Some(1)
    );

    for expected in [
        OrderStatus::Processed,
        OrderStatus::Shipping,
        OrderStatus::Completed,
    ] {
        assert_eq!(svc.advance_status(order.id).await.unwrap(), expected);
    }

    let view = svc.get_order(order.id).await.unwrap();
    assert_eq!(view.status, OrderStatus::Completed);
    assert_eq!(store.get_product_item(1).await.unwrap().unwrap().stock, 18);
}

#[tokio::test]
async fn create_cancel_flow_restores_stock() {
    let store = seeded_store().await;
    let svc = OrderService::new(store.clone());

    let order = svc
        .create_order(
            3,
            1,
            PaymentMethod::Cod,
            vec![OrderLine {
                product_item_id: 1,
                amount: 5,
                price: 70_000,
                discount: 10_000,
            }],
        )
        .await
        .unwrap();
    assert_eq!(store.get_product_item(1).await.unwrap().unwrap().stock, 15);

    svc.cancel_order(order.id).await.unwrap();
    assert_eq!(store.get_product_item(1).await.unwrap().unwrap().stock, 20);

    let cancelled = svc
        .orders_by_status(OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].order_id, order.id);
}
