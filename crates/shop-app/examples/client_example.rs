///  To run :
///  cargo r --example client_example
use shop_client::{CreateOrderRequest, ShopClient};
use shop_hex::inbound::http::{HttpServer, HttpServerConfig};
use shop_repo::build_store;
use shop_types::domain::catalog::{EntityStatus, ProductItem, ShippingAddress};
use shop_types::domain::order::{OrderLine, OrderStatus, PaymentMethod};
use shop_types::ports::store::ShopStore;
use tempfile::tempdir;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Start server on an ephemeral port.
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("shop.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let store = build_store(Some(&db_url)).await?;

    // Seed a sellable variant and a shipping address for user 7.
    store
        .upsert_product_item(ProductItem {
            id: 1,
            product_id: 10,
            product_name: "House Blend".into(),
            product_type: "Ground".into(),
            image_url: "https://cdn.example/house-blend.jpg".into(),
            stock: 25,
            price: 60_000,
            discount: 5_000,
            status: EntityStatus::Active,
        })
        .await?;
    store
        .upsert_shipping_address(ShippingAddress {
            id: 1,
            user_id: 7,
            receiver_name: "Lan".into(),
            receiver_phone: "0900000001".into(),
            location: "12 Ly Thuong Kiet, Ha Noi".into(),
            status: EntityStatus::Active,
        })
        .await?;

    let server = HttpServer::new(
        store,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // Use client against the running server, identified as user 7.
    let client = ShopClient::builder(&addr)?.with_user(7)?.build()?;
    let created = client
        .create_order(CreateOrderRequest {
            shipping_address_id: 1,
            payment_method: PaymentMethod::Cod,
            order_items: vec![OrderLine {
                product_item_id: 1,
                amount: 2,
                price: 60_000,
                discount: 5_000,
            }],
        })
        .await?;
    println!("Created order id={}", created.order_id);
    assert_eq!(created.status, OrderStatus::Processing);

    let fetched = client.get_order(created.order_id).await?;
    println!("Fetched status={:?} total={}", fetched.status, fetched.total);
    assert_eq!(fetched.total, (60_000 - 5_000) * 2 + 10_000);

    let advanced = client.advance_order(created.order_id).await?;
    println!("Advanced to {:?}", advanced);
    assert_eq!(advanced, OrderStatus::Processed);

    let mine = client.my_orders().await?;
    println!("User 7 has {} order(s)", mine.len());

    // A second order demonstrates cancellation while still Processing.
    let second = client
        .create_order(CreateOrderRequest {
            shipping_address_id: 1,
            payment_method: PaymentMethod::Cod,
            order_items: vec![OrderLine {
                product_item_id: 1,
                amount: 1,
                price: 60_000,
                discount: 5_000,
            }],
        })
        .await?;
    let cancelled = client.cancel_order(second.order_id).await?;
    println!("Cancelled second order: {:?}", cancelled);
    assert_eq!(cancelled, OrderStatus::Cancelled);

    handle.abort();
    Ok(())
}
