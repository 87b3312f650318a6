use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rand::Rng;

use crate::db::{self, queries, Db};
use crate::errors::AppError;
use crate::models::{
    Booking, BookingStatus, Court, CreateBookingRequest, CreateRepaymentRequest, OrderKind,
    Payment, PaymentNotification, PaymentStatus, RepaymentMethod, User, GATEWAY_METHOD,
};
use crate::services::calendar;
use crate::services::directory::{CourtLookup, UserLookup};
use crate::services::payment::{CustomerDetails, ItemDetails, PaymentGateway, TransactionRequest};
use crate::services::reconciliation::{self, Reconciliation};
use crate::services::scheduling::{self, SlotConflict};

/// A booking with its court and customer resolved.
#[derive(Debug, Clone)]
pub struct BookingDetails {
    pub booking: Booking,
    pub court: Court,
    pub customer: User,
}

pub struct BookingService {
    db: Db,
    gateway: Arc<dyn PaymentGateway>,
    users: Arc<dyn UserLookup>,
    courts: Arc<dyn CourtLookup>,
    gateway_timeout: Duration,
}

impl BookingService {
    pub fn new(
        db: Db,
        gateway: Arc<dyn PaymentGateway>,
        users: Arc<dyn UserLookup>,
        courts: Arc<dyn CourtLookup>,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            db,
            gateway,
            users,
            courts,
            gateway_timeout,
        }
    }

    pub async fn create_booking(
        &self,
        req: &CreateBookingRequest,
    ) -> Result<BookingDetails, AppError> {
        let booking_date = calendar::parse_date(&req.booking_date)?;
        let start_time = calendar::parse_time(&req.start_time)?;
        let end_time = calendar::end_time(start_time, req.hour)?;

        let (existing, pending) = {
            let conn = db::lock(&self.db);
            (
                queries::find_bookings_by_date(&conn, booking_date)?,
                queries::find_pending_booking_id(&conn, &req.customer_id)?,
            )
        };

        let availability = match pending {
            // an unpaid booking on any date blocks the customer, not only one
            // on the requested date
            Some(booking_id) => Err(SlotConflict::UnpaidBooking { booking_id }),
            None => scheduling::check_availability(
                &existing,
                &req.court_id,
                &req.customer_id,
                start_time,
                end_time,
            ),
        };

        if let Err(conflict) = availability {
            tracing::info!(
                court_id = %req.court_id,
                customer_id = %req.customer_id,
                conflicting = conflict.booking_id(),
                "booking rejected: {conflict}"
            );
            return Err(AppError::Conflict(conflict.to_string()));
        }

        let customer = self.find_user(&req.customer_id, "customer").await?;
        let court = self.find_court(&req.court_id).await?;

        let sequence = {
            let conn = db::lock(&self.db);
            queries::count_bookings_by_customer(&conn, &customer.id)? + 1
        };
        let order_id = next_order_id(OrderKind::Booking, sequence);

        let total_payment = court.price * req.hour;
        let deposit = total_payment / 2;
        let description = format!("Booking payment for {}", court.name);

        let payment_url = self
            .request_payment_url(TransactionRequest {
                order_id: order_id.clone(),
                gross_amount: deposit,
                customer: customer_details(&customer),
                items: vec![ItemDetails {
                    id: court.id.clone(),
                    name: court.name.clone(),
                    price: deposit,
                    quantity: 1,
                }],
            })
            .await?;

        let now = queries::now();
        let mut booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer.id.clone(),
            court_id: court.id.clone(),
            employee_id: None,
            booking_date,
            start_time,
            end_time,
            total_payment,
            status: BookingStatus::Pending,
            payments: vec![],
            created_at: now,
            updated_at: now,
        };
        let deposit_payment = Payment {
            id: uuid::Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            user_id: Some(customer.id.clone()),
            order_id,
            description,
            payment_method: GATEWAY_METHOD.to_string(),
            price: deposit,
            qty: req.hour,
            status: PaymentStatus::Unpaid,
            payment_url,
            created_at: now,
            updated_at: now,
        };

        {
            let mut conn = db::lock(&self.db);
            let tx = conn.transaction()?;
            queries::insert_booking(&tx, &booking).map_err(slot_taken)?;
            queries::insert_payment(&tx, &deposit_payment)?;
            tx.commit()?;
        }

        tracing::info!(
            booking_id = %booking.id,
            order_id = %deposit_payment.order_id,
            court_id = %court.id,
            date = %booking.booking_date,
            start = %booking.start_time,
            end = %booking.end_time,
            "booking created"
        );

        booking.payments.push(deposit_payment);
        Ok(BookingDetails {
            booking,
            court,
            customer,
        })
    }

    pub async fn create_repayment(
        &self,
        req: &CreateRepaymentRequest,
    ) -> Result<Payment, AppError> {
        let method = RepaymentMethod::parse(&req.payment_method).ok_or_else(|| {
            AppError::Validation(format!(
                "invalid payment method '{}', use '{GATEWAY_METHOD}' or 'cash'",
                req.payment_method
            ))
        })?;

        let booking = {
            let conn = db::lock(&self.db);
            queries::find_booking_by_id(&conn, &req.booking_id)?
        }
        .ok_or_else(|| AppError::NotFound(format!("booking {}", req.booking_id)))?;

        if booking.status != BookingStatus::Booked {
            return Err(AppError::Precondition("this booking still not booked".to_string()));
        }

        let customer = self.find_user(&booking.customer_id, "customer").await?;
        let court = self.find_court(&booking.court_id).await?;
        let employee = self.find_user(&req.employee_id, "employee").await?;

        let sequence = {
            let conn = db::lock(&self.db);
            queries::count_bookings_by_customer(&conn, &customer.id)?
        };
        let order_id = next_order_id(OrderKind::Repayment, sequence);

        let deposit = booking.total_payment / 2;
        let balance = booking.total_payment - deposit;
        let now = queries::now();

        let mut payment = Payment {
            id: uuid::Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            user_id: Some(employee.id.clone()),
            order_id,
            description: format!("Repayment for {}", court.name),
            payment_method: method.as_str().to_string(),
            price: balance,
            qty: booking.total_payment.checked_div(court.price).unwrap_or(0),
            status: PaymentStatus::Paid,
            payment_url: String::new(),
            created_at: now,
            updated_at: now,
        };

        if method == RepaymentMethod::Gateway {
            // The customer pays on the hosted page; the employee stays the
            // party responsible for the record.
            payment.payment_url = self
                .request_payment_url(TransactionRequest {
                    order_id: payment.order_id.clone(),
                    gross_amount: balance,
                    customer: customer_details(&customer),
                    items: vec![ItemDetails {
                        id: court.id.clone(),
                        name: court.name.clone(),
                        price: balance,
                        quantity: 1,
                    }],
                })
                .await?;
            payment.status = PaymentStatus::Unpaid;
        }

        {
            let mut conn = db::lock(&self.db);
            let tx = conn.transaction()?;

            let current = queries::find_booking_by_id(&tx, &booking.id)?
                .ok_or_else(|| AppError::NotFound(format!("booking {}", booking.id)))?;
            if current.status != BookingStatus::Booked {
                return Err(AppError::Precondition("this booking still not booked".to_string()));
            }

            queries::insert_payment(&tx, &payment)?;
            queries::assign_employee(&tx, &booking.id, &employee.id)?;
            if payment.status == PaymentStatus::Paid {
                queries::update_booking_status(&tx, &booking.id, BookingStatus::Done)?;
            }
            tx.commit()?;
        }

        tracing::info!(
            booking_id = %booking.id,
            order_id = %payment.order_id,
            employee_id = %employee.id,
            method = method.as_str(),
            status = payment.status.as_str(),
            "repayment created"
        );

        Ok(payment)
    }

    pub async fn process_notification(
        &self,
        notification: &PaymentNotification,
    ) -> Result<Reconciliation, AppError> {
        let mut conn = db::lock(&self.db);

        let payment = queries::find_payment_by_order_id(&conn, &notification.order_id)?
            .ok_or_else(|| AppError::NotFound(format!("payment {}", notification.order_id)))?;
        let booking = queries::find_booking_by_id(&conn, &payment.booking_id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {}", payment.booking_id)))?;

        let normalized = match reconciliation::normalize(notification, &payment, &booking) {
            Ok(normalized) => normalized,
            Err(ignored) => {
                tracing::info!(
                    order_id = %notification.order_id,
                    outcome = ?ignored,
                    "notification ignored"
                );
                return Ok(ignored);
            }
        };

        reconciliation::apply(&mut conn, &normalized)?;

        tracing::info!(
            order_id = %normalized.order_id,
            booking_id = %normalized.booking_id,
            kind = ?normalized.kind,
            status = ?normalized.status,
            "payment notification applied"
        );

        Ok(Reconciliation::Applied(normalized))
    }

    /// Active bookings on `date` with their courts.
    pub async fn find_booked_slots(
        &self,
        date: NaiveDate,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<(Booking, Court)>, AppError> {
        let bookings = {
            let conn = db::lock(&self.db);
            queries::find_booked_slots(&conn, date, limit, offset)?
        };

        let mut slots = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let court = self.find_court(&booking.court_id).await?;
            slots.push((booking, court));
        }
        Ok(slots)
    }

    /// Booked bookings on `date` still waiting for their repayment.
    pub async fn find_ending_bookings(
        &self,
        date: NaiveDate,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookingDetails>, AppError> {
        let bookings = {
            let conn = db::lock(&self.db);
            queries::find_ending_bookings(&conn, date, limit, offset)?
        };

        let mut details = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let customer = self.find_user(&booking.customer_id, "customer").await?;
            let court = self.find_court(&booking.court_id).await?;
            details.push(BookingDetails {
                booking,
                court,
                customer,
            });
        }
        Ok(details)
    }

    pub fn payment_report(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Payment>, i64), AppError> {
        let conn = db::lock(&self.db);
        Ok(queries::find_payment_report(&conn, from, to, limit, offset)?)
    }

    async fn find_user(&self, id: &str, role: &str) -> Result<User, AppError> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{role} {id}")))
    }

    async fn find_court(&self, id: &str) -> Result<Court, AppError> {
        self.courts
            .find_court(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("court {id}")))
    }

    async fn request_payment_url(&self, request: TransactionRequest) -> Result<String, AppError> {
        with_timeout(self.gateway_timeout, self.gateway.create_transaction(&request)).await
    }
}

async fn with_timeout<F>(limit: Duration, call: F) -> Result<String, AppError>
where
    F: Future<Output = anyhow::Result<String>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(url)) => Ok(url),
        Ok(Err(e)) => Err(AppError::Upstream(format!("{e:#}"))),
        Err(_) => Err(AppError::Upstream(format!(
            "no response within {}s",
            limit.as_secs()
        ))),
    }
}

fn next_order_id(kind: OrderKind, sequence: i64) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    kind.order_id(sequence, u64::from(suffix))
}

fn customer_details(customer: &User) -> CustomerDetails {
    CustomerDetails {
        first_name: customer.name.clone(),
        email: customer.email.clone(),
        phone: customer.phone_number.clone(),
    }
}

/// The storage backstop caught a slot or pending-booking race the early
/// check missed.
fn slot_taken(err: rusqlite::Error) -> AppError {
    if !db::is_constraint_violation(&err) {
        return err.into();
    }

    let conflict = match &err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("bookings.customer_id") => {
            SlotConflict::UnpaidBooking {
                booking_id: String::new(),
            }
        }
        _ => SlotConflict::StartOverlap {
            booking_id: String::new(),
        },
    };
    AppError::Conflict(conflict.to_string())
}
