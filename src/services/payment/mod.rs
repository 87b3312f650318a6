pub mod midtrans;

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemDetails {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub quantity: i64,
}

/// A hosted-payment-page request for one order.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub order_id: String,
    pub gross_amount: i64,
    pub customer: CustomerDetails,
    pub items: Vec<ItemDetails>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registers the order with the gateway and returns the URL of the page
    /// the customer pays on.
    async fn create_transaction(&self, request: &TransactionRequest) -> anyhow::Result<String>;
}
