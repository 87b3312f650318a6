use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::errors::AppError;
use crate::models::PaymentNotification;
use crate::services::payment::midtrans;
use crate::services::reconciliation::Reconciliation;
use crate::state::AppState;

// POST /api/bookings/payment/notif
pub async fn payment_notification(
    State(state): State<Arc<AppState>>,
    Json(notification): Json<PaymentNotification>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!(
        order_id = %notification.order_id,
        transaction_status = %notification.transaction_status,
        payment_type = %notification.payment_type,
        "incoming payment notification"
    );

    // Skip signature validation when no server key is configured (dev mode)
    if state.config.verify_signatures()
        && !midtrans::verify_signature(&notification, &state.config.midtrans_server_key)
    {
        tracing::warn!(order_id = %notification.order_id, "invalid notification signature");
        return Err(AppError::InvalidSignature);
    }

    let body = match state.bookings.process_notification(&notification).await? {
        Reconciliation::Applied(payment) => json!({
            "status": "applied",
            "orderId": payment.order_id,
            "paymentStatus": payment.status.payment_status().as_str(),
        }),
        Reconciliation::Ignored { reason } => json!({
            "status": "ignored",
            "orderId": notification.order_id,
            "reason": reason,
        }),
    };

    Ok(Json(body))
}
