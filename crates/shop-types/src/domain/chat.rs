use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SenderRole {
    Customer,
    Staff,
}

impl SenderRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Staff => "Staff",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Customer" => Some(Self::Customer),
            "Staff" => Some(Self::Staff),
            _ => None,
        }
    }
}

/// Support thread between one customer (the host) and shop staff. `is_read`
/// tracks whether staff have seen the latest customer message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub host_id: i64,
    pub is_read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub sender_role: SenderRole,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(conversation_id: i64, sender_id: i64, role: SenderRole, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            sender_role: role,
            content,
            sent_at: Utc::now(),
        }
    }
}
