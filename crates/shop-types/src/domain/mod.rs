pub mod catalog;
pub mod chat;
pub mod order;
pub mod payment;
pub mod views;
