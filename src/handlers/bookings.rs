use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Datelike, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{
    Booking, Court, CreateBookingRequest, CreateRepaymentRequest, Payment, ReportPeriod, User,
};
use crate::services::booking::BookingDetails;
use crate::services::calendar;
use crate::state::AppState;

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    id: String,
    order_id: String,
    description: String,
    payment_method: String,
    price: i64,
    qty: i64,
    status: String,
    payment_url: String,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            order_id: p.order_id,
            description: p.description,
            payment_method: p.payment_method,
            price: p.price,
            qty: p.qty,
            status: p.status.as_str().to_string(),
            payment_url: p.payment_url,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    id: String,
    name: String,
    phone_number: String,
    email: String,
}

impl From<User> for CustomerSummary {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            phone_number: u.phone_number,
            email: u.email,
        }
    }
}

#[derive(Serialize)]
pub struct CourtSummary {
    id: String,
    name: String,
    price: i64,
}

impl From<Court> for CourtSummary {
    fn from(c: Court) -> Self {
        Self {
            id: c.id,
            name: c.name,
            price: c.price,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    id: String,
    customer: CustomerSummary,
    court: CourtSummary,
    booking_date: String,
    start_time: String,
    end_time: String,
    total_payment: i64,
    status: String,
    payment_details: Vec<PaymentResponse>,
}

impl From<BookingDetails> for BookingResponse {
    fn from(details: BookingDetails) -> Self {
        let b = details.booking;
        Self {
            id: b.id,
            customer: details.customer.into(),
            court: details.court.into(),
            booking_date: calendar::format_date(&b.booking_date),
            start_time: calendar::format_time(&b.start_time),
            end_time: calendar::format_time(&b.end_time),
            total_payment: b.total_payment,
            status: b.status.as_str().to_string(),
            payment_details: b.payments.into_iter().map(PaymentResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotResponse {
    court_id: String,
    court_name: String,
    booking_date: String,
    start_time: String,
    end_time: String,
    status: String,
}

impl SlotResponse {
    fn new(b: Booking, court: Court) -> Self {
        Self {
            court_id: court.id,
            court_name: court.name,
            booking_date: calendar::format_date(&b.booking_date),
            start_time: calendar::format_time(&b.start_time),
            end_time: calendar::format_time(&b.end_time),
            status: b.status.as_str().to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct PageResponse<T> {
    page: i64,
    size: i64,
    data: Vec<T>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

/// `(page, size, offset)`; page defaults to 1, size to 10.
fn page_bounds(page: Option<i64>, size: Option<i64>) -> Result<(i64, i64, i64), AppError> {
    let page = page.unwrap_or(1);
    let size = size.unwrap_or(10);
    let invalid = || {
        AppError::Validation(format!(
            "invalid page or size, page starts at 1 and size is between 1 and {MAX_PAGE_SIZE}"
        ))
    };
    if page < 1 || !(1..=MAX_PAGE_SIZE).contains(&size) {
        return Err(invalid());
    }
    let offset = (page - 1).checked_mul(size).ok_or_else(invalid)?;
    Ok((page, size, offset))
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let date = calendar::parse_date(&req.booking_date)?;
    let start = calendar::parse_time(&req.start_time)?;
    calendar::ensure_not_past(date, start, Local::now().naive_local())?;

    let details = state.bookings.create_booking(&req).await?;
    Ok((StatusCode::CREATED, Json(details.into())))
}

// POST /api/bookings/repayment
pub async fn create_repayment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRepaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    let payment = state.bookings.create_repayment(&req).await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

// GET /api/bookings/check
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckQuery {
    pub booking_date: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

pub async fn check_booked(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<PageResponse<SlotResponse>>, AppError> {
    let (page, size, offset) = page_bounds(query.page, query.size)?;
    let date = match query.booking_date.as_deref() {
        Some(raw) => calendar::parse_date(raw)?,
        None => Local::now().date_naive(),
    };

    let slots = state.bookings.find_booked_slots(date, size, offset).await?;

    Ok(Json(PageResponse {
        page,
        size,
        data: slots
            .into_iter()
            .map(|(booking, court)| SlotResponse::new(booking, court))
            .collect(),
    }))
}

// GET /api/bookings/today
pub async fn ending_today(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<BookingResponse>>, AppError> {
    let (page, size, offset) = page_bounds(query.page, query.size)?;
    let today = Local::now().date_naive();

    let bookings = state.bookings.find_ending_bookings(today, size, offset).await?;

    Ok(Json(PageResponse {
        page,
        size,
        data: bookings.into_iter().map(BookingResponse::from).collect(),
    }))
}

// GET /api/bookings/report
#[derive(Deserialize)]
pub struct ReportQuery {
    pub filter: Option<String>,
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    page: i64,
    size: i64,
    total_income: i64,
    data: Vec<PaymentResponse>,
}

pub async fn payment_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse>, AppError> {
    let (page, size, offset) = page_bounds(query.page, query.size)?;
    // payment timestamps are stored in UTC
    let today = Utc::now().date_naive();

    let filter = query.filter.as_deref().unwrap_or("daily");
    let period = ReportPeriod::parse(
        filter,
        query.day.unwrap_or(today.day()),
        query.month.unwrap_or(today.month()),
        query.year.unwrap_or(today.year()),
    )
    .ok_or_else(|| {
        AppError::Validation("invalid filter, use 'daily', 'monthly' or 'yearly'".to_string())
    })?;
    let (from, to) = period
        .range()
        .ok_or_else(|| AppError::Validation("invalid day, month or year".to_string()))?;

    let (payments, total_income) = state.bookings.payment_report(from, to, size, offset)?;

    Ok(Json(ReportResponse {
        page,
        size,
        total_income,
        data: payments.into_iter().map(PaymentResponse::from).collect(),
    }))
}
