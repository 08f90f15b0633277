#![cfg(feature = "memory")]

use shop_repo::memory::MemoryStore;
use shop_types::domain::catalog::{EntityStatus, ProductItem, ShippingAddress};
use shop_types::domain::chat::{ChatMessage, SenderRole};
use shop_types::domain::order::{Order, OrderItem, OrderLine, OrderStatus, PaymentMethod};
use shop_types::domain::payment::{Transaction, COMMAND_PAY, COMMAND_REFUND};
use shop_types::ports::store::{OrderFilter, ShopStore, StoreError};

fn variant(id: i64, stock: i64) -> ProductItem {
    ProductItem {
        id,
        product_id: id * 10,
        product_name: format!("Blend {id}"),
        product_type: "Ground".into(),
        image_url: String::new(),
        stock,
        price: 40_000,
        discount: 0,
        status: EntityStatus::Active,
    }
}

fn order_with_items(user_id: i64, lines: &[(i64, u32)]) -> (Order, Vec<OrderItem>) {
    let order = Order::new(user_id, 1, PaymentMethod::Cod);
    let items = lines
        .iter()
        .map(|&(product_item_id, amount)| {
            OrderItem::from_line(
                order.id,
                &OrderLine {
                    product_item_id,
                    amount,
                    price: 40_000,
                    discount: 0,
                },
            )
        })
        .collect();
    (order, items)
}

#[tokio::test]
async fn reserve_and_release_adjust_stock() {
    let store = MemoryStore::new();
    store.upsert_product_item(variant(1, 5)).await.unwrap();

    store.reserve_stock(1, 3).await.unwrap();
    assert_eq!(store.get_product_item(1).await.unwrap().unwrap().stock, 2);

    store.release_stock(1, 3).await.unwrap();
    assert_eq!(store.get_product_item(1).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
async fn reserve_failures_are_typed_and_leave_stock_alone() {
    let store = MemoryStore::new();
    store.upsert_product_item(variant(1, 2)).await.unwrap();

    let missing = store.reserve_stock(9, 1).await;
    assert!(matches!(missing, Err(StoreError::VariantNotFound(9))));

    let short = store.reserve_stock(1, 3).await;
    assert!(matches!(
        short,
        Err(StoreError::InsufficientStock {
            id: 1,
            requested: 3,
            available: 2
        })
    ));
    assert_eq!(store.get_product_item(1).await.unwrap().unwrap().stock, 2);
}

#[tokio::test]
async fn concurrent_reservations_never_oversell() {
    let store = MemoryStore::new();
    store.upsert_product_item(variant(1, 3)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(
            async move { store.reserve_stock(1, 1).await },
        ));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(StoreError::InsufficientStock { id: 1, .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // Exactly as many winners as there was stock; nothing went negative.
    assert_eq!(successes, 3);
    assert_eq!(store.get_product_item(1).await.unwrap().unwrap().stock, 0);
}

#[tokio::test]
async fn create_order_is_all_or_nothing() {
    let store = MemoryStore::new();
    store.upsert_product_item(variant(1, 10)).await.unwrap();
    store.upsert_product_item(variant(2, 1)).await.unwrap();

    // Second line exceeds stock: nothing may persist, first line untouched.
    let (order, items) = order_with_items(7, &[(1, 2), (2, 5)]);
    let res = store.create_order(order.clone(), items).await;
    assert!(matches!(res, Err(StoreError::InsufficientStock { .. })));
    assert_eq!(store.get_product_item(1).await.unwrap().unwrap().stock, 10);
    assert!(store.get_order(order.id).await.unwrap().is_none());
    assert!(store.order_items(order.id).await.unwrap().is_empty());

    let (order, items) = order_with_items(7, &[(1, 2), (2, 1)]);
    store.create_order(order.clone(), items).await.unwrap();
    assert_eq!(store.get_product_item(1).await.unwrap().unwrap().stock, 8);
    assert_eq!(store.get_product_item(2).await.unwrap().unwrap().stock, 0);
    assert_eq!(store.order_items(order.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn advance_is_a_guarded_compare_and_swap() {
    let store = MemoryStore::new();
    store.upsert_product_item(variant(1, 5)).await.unwrap();
    let (order, items) = order_with_items(7, &[(1, 1)]);
    store.create_order(order.clone(), items).await.unwrap();

    let moved = store
        .advance_order(order.id, OrderStatus::Processing, OrderStatus::Processed)
        .await
        .unwrap();
    assert!(moved);

    // Same transition again: the row is no longer Processing.
    let moved = store
        .advance_order(order.id, OrderStatus::Processing, OrderStatus::Processed)
        .await
        .unwrap();
    assert!(!moved);
    assert_eq!(
        store.get_order(order.id).await.unwrap().unwrap().status,
        OrderStatus::Processed
    );
}

#[tokio::test]
async fn cancel_releases_stock_once_and_writes_refund() {
    let store = MemoryStore::new();
    store.upsert_product_item(variant(1, 5)).await.unwrap();
    let (order, items) = order_with_items(7, &[(1, 4)]);
    store.create_order(order.clone(), items).await.unwrap();
    assert_eq!(store.get_product_item(1).await.unwrap().unwrap().stock, 1);

    let paid = Transaction::payment(order.id, "990011".into(), "ref-9".into(), 170_000);
    store.insert_transaction(paid.clone()).await.unwrap();

    let refund = Transaction::refund_of(&paid);
    let cancelled = store.cancel_order(order.id, Some(refund)).await.unwrap();
    assert!(cancelled);
    assert_eq!(store.get_product_item(1).await.unwrap().unwrap().stock, 5);

    let stored_refund = store
        .find_transaction(order.id, COMMAND_REFUND)
        .await
        .unwrap()
        .expect("refund row");
    assert_eq!(stored_refund.transaction_no, "990011");

    // Re-cancel: guarded by status, no double release.
    let again = store.cancel_order(order.id, None).await.unwrap();
    assert!(!again);
    assert_eq!(store.get_product_item(1).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
async fn list_orders_filters_by_user_and_status() {
    let store = MemoryStore::new();
    store.upsert_product_item(variant(1, 50)).await.unwrap();

    let (order_a, items_a) = order_with_items(7, &[(1, 1)]);
    let (order_b, items_b) = order_with_items(8, &[(1, 1)]);
    store.create_order(order_a.clone(), items_a).await.unwrap();
    store.create_order(order_b.clone(), items_b).await.unwrap();
    store
        .advance_order(order_b.id, OrderStatus::Processing, OrderStatus::Processed)
        .await
        .unwrap();

    let for_user = store
        .list_orders(OrderFilter {
            user_id: Some(7),
            ..OrderFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(for_user.len(), 1);
    assert_eq!(for_user[0].id, order_a.id);

    let processed = store
        .list_orders(OrderFilter {
            status: Some(OrderStatus::Processed),
            ..OrderFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(processed.len(), 1);
    assert_eq!(processed[0].id, order_b.id);

    let all = store.list_orders(OrderFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn find_transaction_returns_latest_matching_command() {
    let store = MemoryStore::new();
    let (order, _) = order_with_items(7, &[]);
    let first = Transaction::payment(order.id, "111".into(), "a".into(), 100);
    let second = Transaction::payment(order.id, "222".into(), "b".into(), 200);
    store.insert_transaction(first).await.unwrap();
    store.insert_transaction(second).await.unwrap();

    let found = store
        .find_transaction(order.id, COMMAND_PAY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.transaction_no, "222");
}

#[tokio::test]
async fn catalog_upserts_overwrite() {
    let store = MemoryStore::new();
    store.upsert_product_item(variant(1, 5)).await.unwrap();
    let mut updated = variant(1, 9);
    updated.product_name = "Renamed".into();
    store.upsert_product_item(updated).await.unwrap();

    let got = store.get_product_item(1).await.unwrap().unwrap();
    assert_eq!(got.stock, 9);
    assert_eq!(got.product_name, "Renamed");

    store
        .upsert_shipping_address(ShippingAddress {
            id: 1,
            user_id: 7,
            receiver_name: "Lan".into(),
            receiver_phone: "09".into(),
            location: "somewhere".into(),
            status: EntityStatus::Active,
        })
        .await
        .unwrap();
    assert!(store.get_shipping_address(1).await.unwrap().is_some());
    assert!(store.get_shipping_address(2).await.unwrap().is_none());
}

#[tokio::test]
async fn chat_read_flag_follows_sender_role() {
    let store = MemoryStore::new();
    let conversation = store.create_conversation(7).await.unwrap();
    assert!(conversation.is_read);
    assert_eq!(
        store
            .conversation_for_host(7)
            .await
            .unwrap()
            .map(|c| c.id),
        Some(conversation.id)
    );

    store
        .append_message(ChatMessage::new(
            conversation.id,
            7,
            SenderRole::Customer,
            "hello".into(),
        ))
        .await
        .unwrap();
    assert!(!store.get_conversation(conversation.id).await.unwrap().unwrap().is_read);

    store
        .append_message(ChatMessage::new(
            conversation.id,
            1,
            SenderRole::Staff,
            "hi there".into(),
        ))
        .await
        .unwrap();
    assert!(store.get_conversation(conversation.id).await.unwrap().unwrap().is_read);

    let messages = store.conversation_messages(conversation.id).await.unwrap();
    assert_eq!(messages.len(), 2);

    let orphan = store
        .append_message(ChatMessage::new(99, 7, SenderRole::Customer, "x".into()))
        .await;
    assert!(matches!(orphan, Err(StoreError::ConversationNotFound(99))));

    assert!(store.mark_conversation_read(conversation.id).await.unwrap());
    assert!(!store.mark_conversation_read(99).await.unwrap());
}
