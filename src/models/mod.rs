pub mod booking;
pub mod court;
pub mod notification;
pub mod payment;
pub mod user;

pub use booking::{Booking, BookingStatus, CreateBookingRequest, CreateRepaymentRequest};
pub use court::Court;
pub use notification::PaymentNotification;
pub use payment::{
    OrderKind, Payment, PaymentStatus, RepaymentMethod, ReportPeriod, CASH_METHOD, GATEWAY_METHOD,
};
pub use user::User;
