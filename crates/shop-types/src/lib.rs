//! shop-types: domain model and ports for the coffee-shop order backend.

pub mod domain;
pub mod envelope;
pub mod ports;
