use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const COMMAND_PAY: &str = "pay";
pub const COMMAND_REFUND: &str = "refund";

/// Payment bookkeeping row. A `pay` row is written at checkout for gateway
/// payments; cancelling a VnPay order writes a matching `refund` row. No
/// gateway call is ever made from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub order_id: Uuid,
    pub transaction_no: String,
    pub txn_ref: String,
    pub amount: i64,
    pub command: String,
    pub pay_date: DateTime<Utc>,
}

impl Transaction {
    pub fn payment(order_id: Uuid, transaction_no: String, txn_ref: String, amount: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            transaction_no,
            txn_ref,
            amount,
            command: COMMAND_PAY.to_string(),
            pay_date: Utc::now(),
        }
    }

    /// Refund record for a cancelled order: copies transaction_no, txn_ref
    /// and amount from the original payment, stamped with the current time.
    pub fn refund_of(paid: &Transaction) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: paid.order_id,
            transaction_no: paid.transaction_no.clone(),
            txn_ref: paid.txn_ref.clone(),
            amount: paid.amount,
            command: COMMAND_REFUND.to_string(),
            pay_date: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refund_copies_payment_fields() {
        let order_id = Uuid::new_v4();
        let paid = Transaction::payment(order_id, "14352888".into(), "ref-77".into(), 45_000);
        let refund = Transaction::refund_of(&paid);

        assert_eq!(refund.order_id, order_id);
        assert_eq!(refund.transaction_no, paid.transaction_no);
        assert_eq!(refund.txn_ref, paid.txn_ref);
        assert_eq!(refund.amount, paid.amount);
        assert_eq!(refund.command, COMMAND_REFUND);
        assert_ne!(refund.id, paid.id);
        assert!(refund.pay_date >= paid.pay_date);
    }
}
