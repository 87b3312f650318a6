//! Applies gateway notifications to payment and booking records.
//!
//! A notification is first normalized into a [`NormalizedPayment`], which
//! carries the transaction kind decoded once from the order id prefix, then
//! applied to storage as a single transaction.

use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    Booking, BookingStatus, OrderKind, Payment, PaymentNotification, PaymentStatus,
};

/// Payment state a notification moves a payment into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Pending,
    Paid,
    Cancel,
}

impl GatewayStatus {
    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            GatewayStatus::Pending => PaymentStatus::Pending,
            GatewayStatus::Paid => PaymentStatus::Paid,
            GatewayStatus::Cancel => PaymentStatus::Cancel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPayment {
    pub kind: OrderKind,
    pub order_id: String,
    pub booking_id: String,
    pub status: GatewayStatus,
    pub payment_method: String,
    /// Employee already assigned to the booking, else the payment's own user.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Applied(NormalizedPayment),
    /// Acknowledged without writing anything.
    Ignored { reason: String },
}

/// First match wins. `None` for statuses that carry no transition
/// (`deny`, `refund`, `authorize`, ...).
pub fn map_status(notification: &PaymentNotification) -> Option<GatewayStatus> {
    let is_card = matches!(notification.payment_type.as_str(), "credit-card" | "credit_card");
    if is_card
        && notification.transaction_status == "capture"
        && notification.fraud_status == "accept"
    {
        return Some(GatewayStatus::Paid);
    }

    match notification.transaction_status.as_str() {
        "settlement" => Some(GatewayStatus::Paid),
        "cancel" | "expire" => Some(GatewayStatus::Cancel),
        "pending" => Some(GatewayStatus::Pending),
        _ => None,
    }
}

pub fn normalize(
    notification: &PaymentNotification,
    payment: &Payment,
    booking: &Booking,
) -> Result<NormalizedPayment, Reconciliation> {
    let kind = OrderKind::from_order_id(&payment.order_id).ok_or_else(|| Reconciliation::Ignored {
        reason: format!("order id {} has no known prefix", payment.order_id),
    })?;

    let status = map_status(notification).ok_or_else(|| Reconciliation::Ignored {
        reason: format!(
            "unhandled transaction status '{}' (fraud status '{}')",
            notification.transaction_status, notification.fraud_status
        ),
    })?;

    // Late or repeated notifications must not walk a booking backwards.
    if kind == OrderKind::Booking && booking.status != BookingStatus::Pending {
        return Err(Reconciliation::Ignored {
            reason: format!(
                "deposit {} belongs to a booking that is already {}",
                payment.order_id,
                booking.status.as_str()
            ),
        });
    }
    if payment.status == PaymentStatus::Paid && status != GatewayStatus::Paid {
        return Err(Reconciliation::Ignored {
            reason: format!("payment {} is already paid", payment.order_id),
        });
    }

    Ok(NormalizedPayment {
        kind,
        order_id: payment.order_id.clone(),
        booking_id: payment.booking_id.clone(),
        status,
        payment_method: notification.payment_type.clone(),
        user_id: booking.employee_id.clone().or_else(|| payment.user_id.clone()),
    })
}

/// Writes the payment and booking changes of `payment` atomically.
pub fn apply(conn: &mut Connection, payment: &NormalizedPayment) -> Result<(), AppError> {
    let tx = conn.transaction()?;

    let found = match (payment.kind, payment.status) {
        (_, GatewayStatus::Pending) => {
            queries::update_payment_method(&tx, &payment.order_id, &payment.payment_method)?
        }
        (OrderKind::Booking, GatewayStatus::Paid) => {
            queries::close_payment(
                &tx,
                &payment.order_id,
                &payment.payment_method,
                PaymentStatus::Paid,
            )? && queries::update_booking_status(&tx, &payment.booking_id, BookingStatus::Booked)?
        }
        (OrderKind::Booking, GatewayStatus::Cancel) => {
            queries::delete_payment(&tx, &payment.order_id)?
                && queries::update_booking_status(&tx, &payment.booking_id, BookingStatus::Cancel)?
        }
        (OrderKind::Repayment, GatewayStatus::Paid) => {
            let closed = queries::close_payment(
                &tx,
                &payment.order_id,
                &payment.payment_method,
                PaymentStatus::Paid,
            )?;
            if let Some(employee_id) = &payment.user_id {
                queries::assign_employee(&tx, &payment.booking_id, employee_id)?;
            }
            closed && queries::update_booking_status(&tx, &payment.booking_id, BookingStatus::Done)?
        }
        // The deposit is already paid, so the booking stays booked and a new
        // repayment can be opened.
        (OrderKind::Repayment, GatewayStatus::Cancel) => queries::close_payment(
            &tx,
            &payment.order_id,
            &payment.payment_method,
            PaymentStatus::Cancel,
        )?,
    };

    if !found {
        // dropping `tx` rolls back
        return Err(AppError::NotFound(format!("payment {}", payment.order_id)));
    }

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::tests::{booking, payment, seed_court, seed_user, setup_db};

    fn notif(status: &str, payment_type: &str, fraud: &str) -> PaymentNotification {
        PaymentNotification {
            transaction_status: status.to_string(),
            order_id: "Booking00001-1".to_string(),
            payment_type: payment_type.to_string(),
            fraud_status: fraud.to_string(),
            status_code: None,
            gross_amount: None,
            signature_key: None,
        }
    }

    fn mapped(status: &str, payment_type: &str, fraud: &str) -> Option<GatewayStatus> {
        map_status(&notif(status, payment_type, fraud))
    }

    fn b1(status: BookingStatus) -> Booking {
        booking("b1", "alice", "c1", "2099-06-15", "14:00", "15:00", status)
    }

    #[test]
    fn test_status_mapping() {
        let paid = Some(GatewayStatus::Paid);
        assert_eq!(mapped("capture", "credit-card", "accept"), paid);
        assert_eq!(mapped("capture", "credit_card", "accept"), paid);
        assert_eq!(mapped("capture", "credit-card", "challenge"), None);
        assert_eq!(mapped("settlement", "gopay", ""), paid);
        assert_eq!(mapped("settlement", "bank_transfer", ""), paid);
        assert_eq!(mapped("cancel", "bank_transfer", ""), Some(GatewayStatus::Cancel));
        assert_eq!(mapped("expire", "qris", ""), Some(GatewayStatus::Cancel));
        assert_eq!(mapped("pending", "qris", ""), Some(GatewayStatus::Pending));
        assert_eq!(mapped("deny", "credit-card", "deny"), None);
        assert_eq!(mapped("refund", "gopay", ""), None);
    }

    #[test]
    fn test_normalize_carries_employee_forward() {
        let mut b = b1(BookingStatus::Booked);
        b.employee_id = Some("emp".to_string());
        let mut p = payment("p2", "b1", "Repayment00001-9");
        p.user_id = Some("someone-else".to_string());

        let normalized = normalize(&notif("settlement", "gopay", ""), &p, &b).unwrap();
        assert_eq!(normalized.kind, OrderKind::Repayment);
        assert_eq!(normalized.status, GatewayStatus::Paid);
        assert_eq!(normalized.payment_method, "gopay");
        assert_eq!(normalized.user_id.as_deref(), Some("emp"));
    }

    #[test]
    fn test_normalize_ignores_unmapped_status() {
        let b = b1(BookingStatus::Pending);
        let p = payment("p1", "b1", "Booking00001-1");

        let result = normalize(&notif("deny", "credit-card", "deny"), &p, &b);
        assert!(matches!(result, Err(Reconciliation::Ignored { .. })));
    }

    #[test]
    fn test_normalize_ignores_deposit_of_settled_booking() {
        let mut p = payment("p1", "b1", "Booking00001-1");
        p.status = PaymentStatus::Paid;

        for status in [BookingStatus::Booked, BookingStatus::Done] {
            let b = b1(status);
            for transaction in ["expire", "cancel", "settlement", "pending"] {
                let result = normalize(&notif(transaction, "bank_transfer", ""), &p, &b);
                assert!(
                    matches!(result, Err(Reconciliation::Ignored { .. })),
                    "{transaction} on a {} booking",
                    status.as_str()
                );
            }
        }
    }

    #[test]
    fn test_normalize_ignores_cancel_of_paid_repayment() {
        let b = b1(BookingStatus::Done);
        let mut p = payment("p2", "b1", "Repayment00001-2");
        p.status = PaymentStatus::Paid;

        let result = normalize(&notif("expire", "bank_transfer", ""), &p, &b);
        assert!(matches!(result, Err(Reconciliation::Ignored { .. })));

        // a repeated settlement still goes through
        let result = normalize(&notif("settlement", "bank_transfer", ""), &p, &b);
        assert!(result.is_ok());
    }

    fn seeded() -> Connection {
        let conn = setup_db();
        seed_user(&conn, "alice", "customer");
        seed_user(&conn, "emp", "employee");
        seed_court(&conn, "c1", 100_000);
        queries::insert_booking(&conn, &b1(BookingStatus::Pending)).unwrap();
        queries::insert_payment(&conn, &payment("p1", "b1", "Booking00001-1")).unwrap();
        conn
    }

    fn normalized(kind: OrderKind, order_id: &str, status: GatewayStatus) -> NormalizedPayment {
        NormalizedPayment {
            kind,
            order_id: order_id.to_string(),
            booking_id: "b1".to_string(),
            status,
            payment_method: "bank_transfer".to_string(),
            user_id: Some("emp".to_string()),
        }
    }

    fn deposit(status: GatewayStatus) -> NormalizedPayment {
        normalized(OrderKind::Booking, "Booking00001-1", status)
    }

    fn repayment(status: GatewayStatus) -> NormalizedPayment {
        normalized(OrderKind::Repayment, "Repayment00001-2", status)
    }

    fn with_open_repayment() -> Connection {
        let conn = seeded();
        queries::update_booking_status(&conn, "b1", BookingStatus::Booked).unwrap();
        queries::insert_payment(&conn, &payment("p2", "b1", "Repayment00001-2")).unwrap();
        conn
    }

    #[test]
    fn test_apply_deposit_paid_books() {
        let mut conn = seeded();
        apply(&mut conn, &deposit(GatewayStatus::Paid)).unwrap();

        let b = queries::find_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Booked);
        assert_eq!(b.payments[0].status, PaymentStatus::Paid);
        assert_eq!(b.payments[0].payment_method, "bank_transfer");
        assert!(b.payments[0].payment_url.is_empty());
    }

    #[test]
    fn test_apply_deposit_pending_only_updates_method() {
        let mut conn = seeded();
        apply(&mut conn, &deposit(GatewayStatus::Pending)).unwrap();

        let b = queries::find_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Pending);
        assert_eq!(b.payments[0].status, PaymentStatus::Unpaid);
        assert_eq!(b.payments[0].payment_method, "bank_transfer");
        assert!(!b.payments[0].payment_url.is_empty());
    }

    #[test]
    fn test_apply_deposit_cancel_removes_payment() {
        let mut conn = seeded();
        apply(&mut conn, &deposit(GatewayStatus::Cancel)).unwrap();

        let b = queries::find_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Cancel);
        assert!(b.payments.is_empty());
    }

    #[test]
    fn test_apply_repayment_paid_completes_booking() {
        let mut conn = with_open_repayment();
        apply(&mut conn, &repayment(GatewayStatus::Paid)).unwrap();

        let b = queries::find_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Done);
        assert_eq!(b.employee_id.as_deref(), Some("emp"));
        let p = queries::find_payment_by_order_id(&conn, "Repayment00001-2")
            .unwrap()
            .unwrap();
        assert_eq!(p.status, PaymentStatus::Paid);
    }

    #[test]
    fn test_apply_repayment_cancel_keeps_booking_booked() {
        let mut conn = with_open_repayment();
        apply(&mut conn, &repayment(GatewayStatus::Cancel)).unwrap();

        let b = queries::find_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Booked);
        let p = queries::find_payment_by_order_id(&conn, "Repayment00001-2")
            .unwrap()
            .unwrap();
        assert_eq!(p.status, PaymentStatus::Cancel);
        assert!(p.payment_url.is_empty());
    }

    #[test]
    fn test_apply_missing_payment_rolls_back() {
        let mut conn = seeded();
        let missing = normalized(OrderKind::Booking, "Booking09999-1", GatewayStatus::Paid);
        let result = apply(&mut conn, &missing);
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let b = queries::find_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Pending);
    }
}
