//! shop-hex: coffee-shop backend core (application services + inbound HTTP)

pub mod config;
pub mod errors;

pub mod application;

pub use shop_types::{domain, envelope, ports};

pub mod inbound; // HTTP adapter (server + handlers)
