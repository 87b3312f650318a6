use serde::{Deserialize, Serialize};

/// Asynchronous status callback posted by the payment gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub transaction_status: String,
    pub order_id: String,
    #[serde(default)]
    pub payment_type: String,
    #[serde(default)]
    pub fraud_status: String,
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub gross_amount: Option<String>,
    #[serde(default)]
    pub signature_key: Option<String>,
}
