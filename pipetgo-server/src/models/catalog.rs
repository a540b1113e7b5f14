//! Catalog enums: pricing modes, service categories, attachment types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// How a lab prices a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingMode {
    /// Every order needs a custom quote from the lab
    QuoteRequired,
    /// Catalog price, no quote step
    Fixed,
    /// Catalog price, client may ask for a custom quote instead
    Hybrid,
}

impl PricingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuoteRequired => "QUOTE_REQUIRED",
            Self::Fixed => "FIXED",
            Self::Hybrid => "HYBRID",
        }
    }

    /// FIXED and HYBRID services must carry a catalog price.
    pub fn requires_price(&self) -> bool {
        matches!(self, Self::Fixed | Self::Hybrid)
    }
}

impl fmt::Display for PricingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PricingMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUOTE_REQUIRED" => Ok(Self::QuoteRequired),
            "FIXED" => Ok(Self::Fixed),
            "HYBRID" => Ok(Self::Hybrid),
            other => Err(ValidationError::InvalidVariant {
                field: "pricingMode",
                value: other.to_owned(),
            }),
        }
    }
}

/// Testing categories a service can be listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceCategory {
    #[serde(rename = "Chemical Analysis")]
    ChemicalAnalysis,
    #[serde(rename = "Microbiological Testing")]
    MicrobiologicalTesting,
    #[serde(rename = "Physical Testing")]
    PhysicalTesting,
    #[serde(rename = "Environmental Testing")]
    EnvironmentalTesting,
    #[serde(rename = "Food Safety")]
    FoodSafety,
    Other,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 6] = [
        Self::ChemicalAnalysis,
        Self::MicrobiologicalTesting,
        Self::PhysicalTesting,
        Self::EnvironmentalTesting,
        Self::FoodSafety,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChemicalAnalysis => "Chemical Analysis",
            Self::MicrobiologicalTesting => "Microbiological Testing",
            Self::PhysicalTesting => "Physical Testing",
            Self::EnvironmentalTesting => "Environmental Testing",
            Self::FoodSafety => "Food Safety",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidVariant {
                field: "category",
                value: s.to_owned(),
            })
    }
}

/// Kind of file attached to an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentType {
    Specification,
    Result,
    #[serde(rename = "accreditation_certificate")]
    Certificate,
}

impl AttachmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Specification => "specification",
            Self::Result => "result",
            Self::Certificate => "accreditation_certificate",
        }
    }
}

impl FromStr for AttachmentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "specification" => Ok(Self::Specification),
            "result" => Ok(Self::Result),
            "accreditation_certificate" => Ok(Self::Certificate),
            other => Err(ValidationError::InvalidVariant {
                field: "attachmentType",
                value: other.to_owned(),
            }),
        }
    }
}
