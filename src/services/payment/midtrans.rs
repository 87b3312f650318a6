use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha512};

use super::{PaymentGateway, TransactionRequest};
use crate::models::PaymentNotification;

/// Midtrans Snap adapter. Holds no per-call state and is shared by every
/// request.
pub struct MidtransGateway {
    server_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl MidtransGateway {
    pub fn new(server_key: String, base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Midtrans HTTP client")?;

        Ok(Self {
            server_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl PaymentGateway for MidtransGateway {
    async fn create_transaction(&self, request: &TransactionRequest) -> anyhow::Result<String> {
        let body = json!({
            "transaction_details": {
                "order_id": request.order_id,
                "gross_amount": request.gross_amount,
            },
            "customer_details": request.customer,
            "item_details": request.items,
        });

        let resp = self
            .client
            .post(format!("{}/snap/v1/transactions", self.base_url))
            .basic_auth(&self.server_key, Some(""))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .context("failed to call Midtrans Snap API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse Midtrans response")?;

        if !status.is_success() {
            anyhow::bail!("Midtrans API error ({}): {}", status, data["error_messages"]);
        }

        data["redirect_url"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing redirect_url in Midtrans response"))
    }
}

/// `sha512(order_id + status_code + gross_amount + server_key)`, lowercase hex.
pub fn signature_key(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    let payload = format!("{order_id}{status_code}{gross_amount}{server_key}");
    let digest = Sha512::digest(payload.as_bytes());
    format!("{digest:x}")
}

pub fn verify_signature(notification: &PaymentNotification, server_key: &str) -> bool {
    let (Some(status_code), Some(gross_amount), Some(signature)) = (
        notification.status_code.as_deref(),
        notification.gross_amount.as_deref(),
        notification.signature_key.as_deref(),
    ) else {
        return false;
    };

    let expected = signature_key(&notification.order_id, status_code, gross_amount, server_key);
    expected.eq_ignore_ascii_case(signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(signature: Option<&str>) -> PaymentNotification {
        PaymentNotification {
            transaction_status: "settlement".to_string(),
            order_id: "Booking00001-42".to_string(),
            payment_type: "bank_transfer".to_string(),
            fraud_status: "accept".to_string(),
            status_code: Some("200".to_string()),
            gross_amount: Some("100000.00".to_string()),
            signature_key: signature.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_signature_key_known_vector() {
        assert_eq!(
            signature_key("Booking00001-42", "200", "100000.00", "server-key"),
            "5ab5a4db56d359087e1e0c5477745001018d1e9ca197d684fef1811f14f42effd5c38947a9b0cc3399dd41f66b47cb3be7f3cd95595d8876a5278f38c23d51cb"
        );
    }

    #[test]
    fn test_verify_signature() {
        let good = signature_key("Booking00001-42", "200", "100000.00", "server-key");
        assert!(verify_signature(&notification(Some(&good)), "server-key"));
        assert!(!verify_signature(&notification(Some(&good)), "other-key"));
        assert!(!verify_signature(&notification(Some("deadbeef")), "server-key"));
        assert!(!verify_signature(&notification(None), "server-key"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let gateway = MidtransGateway::new(
            "key".to_string(),
            "https://app.sandbox.midtrans.com/".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(gateway.base_url, "https://app.sandbox.midtrans.com");
    }
}
