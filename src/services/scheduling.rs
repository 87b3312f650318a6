use chrono::NaiveTime;

use crate::models::{Booking, BookingStatus};
use crate::services::calendar::{in_time_span_end, in_time_span_start};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotConflict {
    /// The customer already holds a booking whose deposit is unpaid.
    UnpaidBooking { booking_id: String },
    /// The requested start falls inside an existing booking.
    StartOverlap { booking_id: String },
    /// The requested interval runs into an existing booking.
    EndOverlap { booking_id: String },
}

impl SlotConflict {
    pub fn booking_id(&self) -> &str {
        match self {
            SlotConflict::UnpaidBooking { booking_id }
            | SlotConflict::StartOverlap { booking_id }
            | SlotConflict::EndOverlap { booking_id } => booking_id,
        }
    }
}

impl std::fmt::Display for SlotConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotConflict::UnpaidBooking { .. } => {
                write!(f, "cannot book, there is still a payment to complete")
            }
            SlotConflict::StartOverlap { .. } => write!(f, "cannot book court in that time"),
            SlotConflict::EndOverlap { .. } => write!(
                f,
                "cannot book that long, because the schedule collides with another schedule"
            ),
        }
    }
}

/// Decides whether `court_id` can be booked by `customer_id` for
/// `[start, end)`, given every booking already recorded on that date.
///
/// The first offending booking, in the order given, decides the reason.
pub fn check_availability(
    existing: &[Booking],
    court_id: &str,
    customer_id: &str,
    start: NaiveTime,
    end: NaiveTime,
) -> Result<(), SlotConflict> {
    for booking in existing {
        if booking.customer_id == customer_id && booking.status == BookingStatus::Pending {
            return Err(SlotConflict::UnpaidBooking {
                booking_id: booking.id.clone(),
            });
        }

        if booking.court_id != court_id || !booking.status.occupies_slot() {
            continue;
        }

        if in_time_span_start(booking.start_time, booking.end_time, start) {
            return Err(SlotConflict::StartOverlap {
                booking_id: booking.id.clone(),
            });
        }

        // Also covers a request that swallows the existing booking whole.
        let encloses = start < booking.start_time && end > booking.end_time;
        if in_time_span_end(booking.start_time, booking.end_time, end) || encloses {
            return Err(SlotConflict::EndOverlap {
                booking_id: booking.id.clone(),
            });
        }
    }

    Ok(())
}
