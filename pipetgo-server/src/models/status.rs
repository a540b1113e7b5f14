//! Order status and the transitions between statuses

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Lifecycle status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    QuoteRequested,
    QuoteProvided,
    QuoteRejected,
    Pending,
    Acknowledged,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        Self::QuoteRequested,
        Self::QuoteProvided,
        Self::QuoteRejected,
        Self::Pending,
        Self::Acknowledged,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Statuses that count as an accepted quote.
    pub const ACCEPTED: [OrderStatus; 4] = [
        Self::Pending,
        Self::Acknowledged,
        Self::InProgress,
        Self::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuoteRequested => "QUOTE_REQUESTED",
            Self::QuoteProvided => "QUOTE_PROVIDED",
            Self::QuoteRejected => "QUOTE_REJECTED",
            Self::Pending => "PENDING",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Statuses reachable from this one through the generic update path.
    ///
    /// `Pending -> QuoteRequested` is not listed; it only happens through a
    /// custom quote request on a HYBRID service.
    pub fn next_statuses(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            QuoteRequested => &[QuoteProvided, Cancelled],
            QuoteProvided => &[Pending, QuoteRejected, Cancelled],
            QuoteRejected => &[Cancelled],
            Pending => &[Acknowledged, Cancelled],
            Acknowledged => &[InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.next_statuses().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_statuses().is_empty()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidVariant {
                field: "status",
                value: s.to_owned(),
            })
    }
}
