use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntityStatus {
    Active,
    Inactive,
}

impl EntityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(Self::Active),
            "Inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// A purchasable variant (SKU) of a product. Product name, type and first
/// image are denormalized onto the variant so order views can be assembled
/// without a separate catalog join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductItem {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_type: String,
    pub image_url: String,
    pub stock: i64,
    pub price: i64,
    pub discount: i64,
    pub status: EntityStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub id: i64,
    pub user_id: i64,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub location: String,
    pub status: EntityStatus,
}
