use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::Payment;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    pub court_id: String,
    pub employee_id: Option<String>,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_payment: i64,
    pub status: BookingStatus,
    pub payments: Vec<Payment>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Booked,
    Done,
    Cancel,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Booked => "booked",
            BookingStatus::Done => "done",
            BookingStatus::Cancel => "cancel",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "booked" => Some(BookingStatus::Booked),
            "done" => Some(BookingStatus::Done),
            "cancel" => Some(BookingStatus::Cancel),
            _ => None,
        }
    }

    /// Every status except `cancel` keeps the court occupied.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, BookingStatus::Cancel)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub court_id: String,
    pub booking_date: String,
    pub start_time: String,
    pub hour: i64,
    pub customer_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRepaymentRequest {
    pub booking_id: String,
    pub employee_id: String,
    pub payment_method: String,
}
