use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Method identifier recorded for payments settled through the hosted gateway.
pub const GATEWAY_METHOD: &str = "mid";
pub const CASH_METHOD: &str = "cash";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub booking_id: String,
    pub user_id: Option<String>,
    pub order_id: String,
    pub description: String,
    pub payment_method: String,
    pub price: i64,
    pub qty: i64,
    pub status: PaymentStatus,
    pub payment_url: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Pending,
    Paid,
    Cancel,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Cancel => "cancel",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "cancel" => Some(PaymentStatus::Cancel),
            _ => None,
        }
    }
}

/// Transaction kind, encoded as the order id prefix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Booking,
    Repayment,
}

impl OrderKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            OrderKind::Booking => "Booking",
            OrderKind::Repayment => "Repayment",
        }
    }

    pub fn from_order_id(order_id: &str) -> Option<Self> {
        // "Repayment" does not start with "Booking", so the order is irrelevant
        if order_id.starts_with(OrderKind::Booking.prefix()) {
            Some(OrderKind::Booking)
        } else if order_id.starts_with(OrderKind::Repayment.prefix()) {
            Some(OrderKind::Repayment)
        } else {
            None
        }
    }

    /// `Booking00007-123456789`: zero-padded sequence plus a random suffix.
    pub fn order_id(&self, sequence: i64, suffix: u64) -> String {
        format!("{}{:05}-{}", self.prefix(), sequence, suffix)
    }
}

/// How a repayment is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepaymentMethod {
    Gateway,
    Cash,
}

impl RepaymentMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            GATEWAY_METHOD => Some(RepaymentMethod::Gateway),
            CASH_METHOD => Some(RepaymentMethod::Cash),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepaymentMethod::Gateway => GATEWAY_METHOD,
            RepaymentMethod::Cash => CASH_METHOD,
        }
    }
}

/// Reporting window for the payment report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Daily { day: u32, month: u32, year: i32 },
    Monthly { month: u32, year: i32 },
    Yearly { year: i32 },
}

impl ReportPeriod {
    pub fn parse(filter: &str, day: u32, month: u32, year: i32) -> Option<Self> {
        match filter {
            "daily" => Some(ReportPeriod::Daily { day, month, year }),
            "monthly" => Some(ReportPeriod::Monthly { month, year }),
            "yearly" => Some(ReportPeriod::Yearly { year }),
            _ => None,
        }
    }

    /// Half-open `[from, to)` range of days, or `None` for an impossible date.
    pub fn range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match *self {
            ReportPeriod::Daily { day, month, year } => {
                let from = NaiveDate::from_ymd_opt(year, month, day)?;
                Some((from, from.succ_opt()?))
            }
            ReportPeriod::Monthly { month, year } => {
                let from = NaiveDate::from_ymd_opt(year, month, 1)?;
                let to = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)?
                };
                Some((from, to))
            }
            ReportPeriod::Yearly { year } => Some((
                NaiveDate::from_ymd_opt(year, 1, 1)?,
                NaiveDate::from_ymd_opt(year + 1, 1, 1)?,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_format() {
        assert_eq!(OrderKind::Booking.order_id(7, 42), "Booking00007-42");
        assert_eq!(OrderKind::Repayment.order_id(12, 9), "Repayment00012-9");
        // padding is a display width, not a ceiling
        assert_eq!(OrderKind::Booking.order_id(123456, 1), "Booking123456-1");
    }

    #[test]
    fn test_order_kind_from_prefix() {
        assert_eq!(
            OrderKind::from_order_id("Booking00001-55"),
            Some(OrderKind::Booking)
        );
        assert_eq!(
            OrderKind::from_order_id("Repayment00001-55"),
            Some(OrderKind::Repayment)
        );
        assert_eq!(OrderKind::from_order_id("Refund00001-55"), None);
        assert_eq!(OrderKind::from_order_id("booking00001-55"), None);
    }

    #[test]
    fn test_repayment_method_parse() {
        assert_eq!(RepaymentMethod::parse("mid"), Some(RepaymentMethod::Gateway));
        assert_eq!(RepaymentMethod::parse("cash"), Some(RepaymentMethod::Cash));
        assert_eq!(RepaymentMethod::parse("card"), None);
    }

    #[test]
    fn test_report_period_ranges() {
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

        let daily = ReportPeriod::parse("daily", 31, 1, 2025).unwrap();
        assert_eq!(daily.range(), Some((d(2025, 1, 31), d(2025, 2, 1))));

        let monthly = ReportPeriod::parse("monthly", 1, 12, 2025).unwrap();
        assert_eq!(monthly.range(), Some((d(2025, 12, 1), d(2026, 1, 1))));

        let yearly = ReportPeriod::parse("yearly", 1, 1, 2024).unwrap();
        assert_eq!(yearly.range(), Some((d(2024, 1, 1), d(2025, 1, 1))));

        assert!(ReportPeriod::parse("weekly", 1, 1, 2024).is_none());
        assert!(ReportPeriod::parse("daily", 30, 2, 2024).unwrap().range().is_none());
    }
}
