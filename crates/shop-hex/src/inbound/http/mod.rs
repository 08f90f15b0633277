mod server;

pub use server::{
    CreateOrderRequest, HttpServer, HttpServerConfig, ListOrdersQuery, RecordPaymentRequest,
    SendMessageRequest,
};
