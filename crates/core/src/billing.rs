//! Invoice payment states and refund eligibility.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(CoreError::Validation(format!("Unknown payment status '{other}'"))),
        }
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A refund is attempted only for a paid invoice that was never refunded.
pub fn refund_due(status: PaymentStatus, refunded: bool) -> bool {
    status == PaymentStatus::Paid && !refunded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_and_not_refunded_is_due() {
        assert!(refund_due(PaymentStatus::Paid, false));
    }

    #[test]
    fn already_refunded_is_not_due() {
        assert!(!refund_due(PaymentStatus::Paid, true));
        assert!(!refund_due(PaymentStatus::Refunded, true));
    }

    #[test]
    fn unpaid_is_not_due() {
        assert!(!refund_due(PaymentStatus::Unpaid, false));
    }

    #[test]
    fn parse_legacy_capitalisation() {
        assert_eq!("Paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert!("pending".parse::<PaymentStatus>().is_err());
    }
}
