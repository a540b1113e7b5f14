//! Quote workflow input

use serde::Deserialize;

use super::validation::{number_in_range, optional_text, required_text};
use super::{ValidationError, ValidationErrors};

const MAX_QUOTE: f64 = 1_000_000.0;

/// POST /api/orders/{id}/quote body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvideQuoteRequest {
    pub quoted_price: Option<f64>,
    pub quote_notes: Option<String>,
    pub estimated_turnaround_days: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: f64,
    pub notes: Option<String>,
    pub turnaround_days: Option<i32>,
}

impl ProvideQuoteRequest {
    pub fn validate(self) -> Result<Quote, ValidationErrors> {
        let mut errs = ValidationErrors::new();

        let price = match self.quoted_price {
            Some(p) => errs.check(number_in_range("quotedPrice", p, 1.0, MAX_QUOTE)),
            None => {
                errs.push(ValidationError::Empty {
                    field: "quotedPrice",
                });
                None
            }
        };
        let notes = errs
            .check(optional_text("quoteNotes", self.quote_notes.as_deref(), 500))
            .flatten();
        let turnaround_days = match self.estimated_turnaround_days {
            None => None,
            Some(d) if d.fract() != 0.0 => {
                errs.push(ValidationError::Rule {
                    field: "estimatedTurnaroundDays",
                    message: "Turnaround must be whole days",
                });
                None
            }
            Some(d) => errs
                .check(number_in_range("estimatedTurnaroundDays", d, 1.0, 365.0))
                .map(|d| d as i32),
        };

        match price {
            Some(price) if errs.is_empty() => Ok(Quote {
                price,
                notes,
                turnaround_days,
            }),
            _ => Err(errs),
        }
    }
}

/// POST /api/orders/{id}/approve-quote body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDecisionRequest {
    pub approved: Option<bool>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuoteDecision {
    Approve,
    Reject { reason: String },
}

impl QuoteDecisionRequest {
    pub fn validate(self) -> Result<QuoteDecision, ValidationErrors> {
        match self.approved {
            None => Err(ValidationError::Rule {
                field: "approved",
                message: "Approval decision is required",
            }
            .into()),
            Some(true) => {
                // a reason sent with an approval is still length-checked
                optional_text("rejectionReason", self.rejection_reason.as_deref(), 500)?;
                Ok(QuoteDecision::Approve)
            }
            Some(false) => {
                let reason = required_text(
                    "rejectionReason",
                    self.rejection_reason.as_deref(),
                    10,
                    500,
                )
                .map_err(|e| match e {
                    ValidationError::Empty { field } => ValidationError::Rule {
                        field,
                        message: "Rejection reason is required when rejecting quote (minimum 10 characters)",
                    },
                    other => other,
                })?;
                Ok(QuoteDecision::Reject { reason })
            }
        }
    }
}

/// POST /api/orders/{id}/request-custom-quote body
#[derive(Debug, Default, Deserialize)]
pub struct CustomQuoteRequest {
    pub reason: Option<String>,
}

impl CustomQuoteRequest {
    /// Returns the trimmed reason.
    pub fn validate(self) -> Result<String, ValidationErrors> {
        Ok(required_text("reason", self.reason.as_deref(), 10, 500)?)
    }
}
