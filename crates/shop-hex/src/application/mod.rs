pub mod chat_service;
pub mod order_service;
