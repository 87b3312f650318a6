use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{Booking, BookingStatus, Court, Payment, PaymentStatus, User};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

const BOOKING_COLUMNS: &str = "id, customer_id, court_id, employee_id, booking_date, start_time, \
     end_time, total_payment, status, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, booking_id, user_id, order_id, description, payment_method, \
     price, qty, status, payment_url, created_at, updated_at";

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn format_time(time: &NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

// ── Users ──

pub fn insert_user(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, phone_number, email, role) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user.id, user.name, user.phone_number, user.email, user.role],
    )?;
    Ok(())
}

pub fn find_user_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, name, phone_number, email, role FROM users WHERE id = ?1",
        params![id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                phone_number: row.get(2)?,
                email: row.get(3)?,
                role: row.get(4)?,
            })
        },
    )
    .optional()
}

// ── Courts ──

pub fn insert_court(conn: &Connection, court: &Court) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO courts (id, name, price, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            court.id,
            court.name,
            court.price,
            format_datetime(&court.created_at),
            format_datetime(&court.updated_at),
        ],
    )?;
    Ok(())
}

pub fn find_court_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Court>> {
    conn.query_row(
        "SELECT id, name, price, created_at, updated_at FROM courts WHERE id = ?1",
        params![id],
        |row| {
            Ok(Court {
                id: row.get(0)?,
                name: row.get(1)?,
                price: row.get(2)?,
                created_at: parse_datetime(row, 3)?,
                updated_at: parse_datetime(row, 4)?,
            })
        },
    )
    .optional()
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            booking.id,
            booking.customer_id,
            booking.court_id,
            booking.employee_id,
            format_date(&booking.booking_date),
            format_time(&booking.start_time),
            format_time(&booking.end_time),
            booking.total_payment,
            booking.status.as_str(),
            format_datetime(&booking.created_at),
            format_datetime(&booking.updated_at),
        ],
    )?;
    Ok(())
}

/// Every booking on `date`, any court and any status, in slot order.
pub fn find_bookings_by_date(
    conn: &Connection,
    date: NaiveDate,
) -> rusqlite::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE booking_date = ?1 ORDER BY start_time ASC, created_at ASC"
    ))?;
    let rows = stmt.query_map(params![format_date(&date)], parse_booking_row)?;
    rows.collect()
}

/// Bookings still holding a slot and not yet settled (pending or booked).
pub fn find_booked_slots(
    conn: &Connection,
    date: NaiveDate,
    limit: i64,
    offset: i64,
) -> rusqlite::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE booking_date = ?1 AND status IN ('pending', 'booked')
         ORDER BY court_id ASC, start_time ASC LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(params![format_date(&date), limit, offset], parse_booking_row)?;
    rows.collect()
}

/// Booked (deposit paid) bookings on `date` that still await their repayment.
pub fn find_ending_bookings(
    conn: &Connection,
    date: NaiveDate,
    limit: i64,
    offset: i64,
) -> rusqlite::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE booking_date = ?1 AND status = 'booked'
         ORDER BY end_time ASC LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(params![format_date(&date), limit, offset], parse_booking_row)?;
    rows.collect()
}

/// Loads a booking together with its payments, oldest first.
pub fn find_booking_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Booking>> {
    let booking = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            parse_booking_row,
        )
        .optional()?;

    match booking {
        Some(mut booking) => {
            booking.payments = find_payments_for_booking(conn, &booking.id)?;
            Ok(Some(booking))
        }
        None => Ok(None),
    }
}

/// Id of the customer's unpaid booking on any date, if there is one.
pub fn find_pending_booking_id(
    conn: &Connection,
    customer_id: &str,
) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT id FROM bookings WHERE customer_id = ?1 AND status = 'pending' LIMIT 1",
        params![customer_id],
        |row| row.get(0),
    )
    .optional()
}

pub fn count_bookings_by_customer(conn: &Connection, customer_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE customer_id = ?1",
        params![customer_id],
        |row| row.get(0),
    )
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), format_datetime(&now()), id],
    )?;
    Ok(count > 0)
}

pub fn assign_employee(conn: &Connection, id: &str, employee_id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET employee_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![employee_id, format_datetime(&now()), id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &Row) -> rusqlite::Result<Booking> {
    let status_str: String = row.get(8)?;
    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| conversion_error(8, format!("unknown booking status: {status_str}")))?;

    Ok(Booking {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        court_id: row.get(2)?,
        employee_id: row.get(3)?,
        booking_date: parse_date(row, 4)?,
        start_time: parse_time(row, 5)?,
        end_time: parse_time(row, 6)?,
        total_payment: row.get(7)?,
        status,
        payments: vec![],
        created_at: parse_datetime(row, 9)?,
        updated_at: parse_datetime(row, 10)?,
    })
}

// ── Payments ──

pub fn insert_payment(conn: &Connection, payment: &Payment) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO payments ({PAYMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        params![
            payment.id,
            payment.booking_id,
            payment.user_id,
            payment.order_id,
            payment.description,
            payment.payment_method,
            payment.price,
            payment.qty,
            payment.status.as_str(),
            payment.payment_url,
            format_datetime(&payment.created_at),
            format_datetime(&payment.updated_at),
        ],
    )?;
    Ok(())
}

pub fn find_payment_by_order_id(
    conn: &Connection,
    order_id: &str,
) -> rusqlite::Result<Option<Payment>> {
    conn.query_row(
        &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ?1"),
        params![order_id],
        parse_payment_row,
    )
    .optional()
}

pub fn find_payments_for_booking(
    conn: &Connection,
    booking_id: &str,
) -> rusqlite::Result<Vec<Payment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments
         WHERE booking_id = ?1 ORDER BY created_at ASC, rowid ASC"
    ))?;
    let rows = stmt.query_map(params![booking_id], parse_payment_row)?;
    rows.collect()
}

/// Records the method the gateway reported without touching the status.
pub fn update_payment_method(
    conn: &Connection,
    order_id: &str,
    method: &str,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET payment_method = ?1, updated_at = ?2 WHERE order_id = ?3",
        params![method, format_datetime(&now()), order_id],
    )?;
    Ok(count > 0)
}

/// Sets a settled status and clears the hosted payment page, which is no
/// longer usable.
pub fn close_payment(
    conn: &Connection,
    order_id: &str,
    method: &str,
    status: PaymentStatus,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET payment_method = ?1, status = ?2, payment_url = '', updated_at = ?3
         WHERE order_id = ?4",
        params![method, status.as_str(), format_datetime(&now()), order_id],
    )?;
    Ok(count > 0)
}

pub fn delete_payment(conn: &Connection, order_id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM payments WHERE order_id = ?1", params![order_id])?;
    Ok(count > 0)
}

/// Paid payments created in `[from, to)` and their summed price.
pub fn find_payment_report(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
    limit: i64,
    offset: i64,
) -> rusqlite::Result<(Vec<Payment>, i64)> {
    let from = format_date(&from);
    let to = format_date(&to);

    let total_income: i64 = conn.query_row(
        "SELECT COALESCE(SUM(price), 0) FROM payments
         WHERE status = 'paid' AND created_at >= ?1 AND created_at < ?2",
        params![from, to],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments
         WHERE status = 'paid' AND created_at >= ?1 AND created_at < ?2
         ORDER BY created_at ASC LIMIT ?3 OFFSET ?4"
    ))?;
    let payments = stmt
        .query_map(params![from, to, limit, offset], parse_payment_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok((payments, total_income))
}

fn parse_payment_row(row: &Row) -> rusqlite::Result<Payment> {
    let status_str: String = row.get(8)?;
    let status = PaymentStatus::parse(&status_str)
        .ok_or_else(|| conversion_error(8, format!("unknown payment status: {status_str}")))?;

    Ok(Payment {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        user_id: row.get(2)?,
        order_id: row.get(3)?,
        description: row.get(4)?,
        payment_method: row.get(5)?,
        price: row.get(6)?,
        qty: row.get(7)?,
        status,
        payment_url: row.get(9)?,
        created_at: parse_datetime(row, 10)?,
        updated_at: parse_datetime(row, 11)?,
    })
}

// ── Row helpers ──

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn parse_datetime(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let s: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_time(row: &Row, idx: usize) -> rusqlite::Result<NaiveTime> {
    let s: String = row.get(idx)?;
    NaiveTime::parse_from_str(&s, TIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
