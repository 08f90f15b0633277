use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flat shipping fee added to every order total, in minor currency units.
pub const SHIPPING_FEE: i64 = 10_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    Processing,
    Processed,
    Shipping,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Next status along the linear fulfilment path, or `None` when the
    /// order is terminal (`Completed`, `Cancelled`).
    pub fn advance(self) -> Option<Self> {
        match self {
            Self::Processing => Some(Self::Processed),
            Self::Processed => Some(Self::Shipping),
            Self::Shipping => Some(Self::Completed),
            Self::Completed | Self::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Processed => "Processed",
            Self::Shipping => "Shipping",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Processing" => Some(Self::Processing),
            "Processed" => Some(Self::Processed),
            "Shipping" => Some(Self::Shipping),
            "Completed" => Some(Self::Completed),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    Cod,
    VnPay,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cod => "Cod",
            Self::VnPay => "VnPay",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Cod" => Some(Self::Cod),
            "VnPay" => Some(Self::VnPay),
            _ => None,
        }
    }
}

/// One requested line of a new order, as submitted by the storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_item_id: i64,
    pub amount: u32,
    pub price: i64,
    pub discount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: i64,
    pub shipping_address_id: i64,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
}

impl Order {
    pub fn new(user_id: i64, shipping_address_id: i64, payment_method: PaymentMethod) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            shipping_address_id,
            payment_method,
            status: OrderStatus::Processing,
            order_date: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_item_id: i64,
    pub price: i64,
    pub discount: i64,
    pub amount: u32,
    pub reviewed: bool,
}

impl OrderItem {
    pub fn from_line(order_id: Uuid, line: &OrderLine) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_item_id: line.product_item_id,
            price: line.price,
            discount: line.discount,
            amount: line.amount,
            reviewed: false,
        }
    }
}

/// Derived order total: sum of `(price - discount) * amount` over all lines
/// plus the flat shipping fee. Never persisted; every read path recomputes it
/// through this one function.
pub fn order_total(items: &[OrderItem]) -> i64 {
    items
        .iter()
        .map(|it| (it.price - it.discount) * i64::from(it.amount))
        .sum::<i64>()
        + SHIPPING_FEE
}
