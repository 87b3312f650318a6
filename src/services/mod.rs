pub mod booking;
pub mod calendar;
pub mod directory;
pub mod payment;
pub mod reconciliation;
pub mod scheduling;
