//! Lab service input: drafts, catalog filters, bulk actions

use serde::Deserialize;
use uuid::Uuid;

use super::validation::{number_in_range, optional_text, required_text, uuid_field};
use super::{PaginationParams, PricingMode, ServiceCategory, ValidationError, ValidationErrors};

const MAX_PRICE: f64 = 1_000_000.0;
const MAX_TURNAROUND_DAYS: i64 = 365;
const DEFAULT_UNIT_TYPE: &str = "per_sample";

/// Service create / full update body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub pricing_mode: Option<String>,
    pub price_per_unit: Option<f64>,
    pub unit_type: Option<String>,
    pub turnaround_days: Option<i64>,
    pub sample_requirements: Option<String>,
}

/// Validated service fields (the lab id always comes from ownership, never the body)
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDraft {
    pub name: String,
    pub description: Option<String>,
    pub category: ServiceCategory,
    pub pricing_mode: PricingMode,
    pub price_per_unit: Option<f64>,
    pub unit_type: String,
    pub turnaround_days: Option<i32>,
    pub sample_requirements: Option<String>,
}

impl ServiceInput {
    pub fn validate(self) -> Result<ServiceDraft, ValidationErrors> {
        let mut errs = ValidationErrors::new();

        let name = errs.check(required_text("name", self.name.as_deref(), 3, 200));
        let description = errs.check(optional_text(
            "description",
            self.description.as_deref(),
            1000,
        ));
        let category = match self.category.as_deref() {
            Some(c) => errs.check(c.parse::<ServiceCategory>()),
            None => {
                errs.push(ValidationError::Empty { field: "category" });
                None
            }
        };
        let pricing_mode = match self.pricing_mode.as_deref() {
            Some(m) => errs.check(m.parse::<PricingMode>()),
            None => {
                errs.push(ValidationError::Empty { field: "pricingMode" });
                None
            }
        };
        let price_per_unit = match self.price_per_unit {
            Some(p) if p <= 0.0 => {
                errs.push(ValidationError::Rule {
                    field: "pricePerUnit",
                    message: "Price must be positive",
                });
                None
            }
            Some(p) => errs.check(number_in_range("pricePerUnit", p, 0.0, MAX_PRICE)),
            None => None,
        };
        if let Some(mode) = pricing_mode {
            if mode.requires_price() && self.price_per_unit.is_none() {
                errs.push(ValidationError::Rule {
                    field: "pricePerUnit",
                    message: "Price is required for FIXED and HYBRID pricing modes",
                });
            }
        }
        let unit_type = self
            .unit_type
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_UNIT_TYPE.to_owned());
        let turnaround_days = match self.turnaround_days {
            Some(d) if !(1..=MAX_TURNAROUND_DAYS).contains(&d) => {
                errs.push(ValidationError::OutOfRange {
                    field: "turnaroundDays",
                    min: 1.0,
                    max: MAX_TURNAROUND_DAYS as f64,
                });
                None
            }
            Some(d) => Some(d as i32),
            None => None,
        };
        let sample_requirements = errs.check(optional_text(
            "sampleRequirements",
            self.sample_requirements.as_deref(),
            500,
        ));

        match (name, category, pricing_mode) {
            (Some(name), Some(category), Some(pricing_mode)) if errs.is_empty() => {
                Ok(ServiceDraft {
                    name,
                    description: description.flatten(),
                    category,
                    pricing_mode,
                    price_per_unit,
                    unit_type,
                    turnaround_days,
                    sample_requirements: sample_requirements.flatten(),
                })
            }
            _ => Err(errs),
        }
    }
}

/// GET /api/services query string
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub lab_id: Option<String>,
    pub active: Option<String>,
    pub format: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// Catalog filter applied by the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub lab_id: Option<Uuid>,
    /// When false, inactive services are listed too
    pub active_only: bool,
}

impl ServiceQuery {
    pub fn filter(&self) -> Result<ServiceFilter, ValidationError> {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        let lab_id = match non_empty(&self.lab_id) {
            Some(id) => Some(uuid_field("labId", Some(&id))?),
            None => None,
        };
        let search = non_empty(&self.search);
        if let Some(s) = &search {
            if s.chars().count() > 100 {
                return Err(ValidationError::TooLong {
                    field: "search",
                    max: 100,
                });
            }
        }
        Ok(ServiceFilter {
            category: non_empty(&self.category).filter(|c| c != "all"),
            search,
            lab_id,
            active_only: self.active.as_deref() != Some("all"),
        })
    }

    /// `format=legacy` asks for a bare array instead of the paginated envelope.
    pub fn legacy_format(&self) -> bool {
        self.format.as_deref() == Some("legacy")
    }
}

/// POST /api/services/bulk body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkActionRequest {
    pub service_ids: Option<Vec<String>>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Enable,
    Disable,
}

impl BulkAction {
    pub fn active(&self) -> bool {
        matches!(self, Self::Enable)
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Enable => "enabled",
            Self::Disable => "disabled",
        }
    }
}

impl BulkActionRequest {
    pub fn validate(self) -> Result<(Vec<Uuid>, BulkAction), ValidationErrors> {
        let mut errs = ValidationErrors::new();

        let ids = match self.service_ids {
            None => {
                errs.push(ValidationError::Empty { field: "serviceIds" });
                Vec::new()
            }
            Some(raw) if raw.is_empty() => {
                errs.push(ValidationError::Rule {
                    field: "serviceIds",
                    message: "At least one service must be selected",
                });
                Vec::new()
            }
            Some(raw) => raw
                .iter()
                .filter_map(|id| errs.check(uuid_field("serviceIds", Some(id))))
                .collect(),
        };
        let action = match self.action.as_deref() {
            Some("enable") => Some(BulkAction::Enable),
            Some("disable") => Some(BulkAction::Disable),
            Some(other) => {
                errs.push(ValidationError::InvalidVariant {
                    field: "action",
                    value: other.to_owned(),
                });
                None
            }
            None => {
                errs.push(ValidationError::Empty { field: "action" });
                None
            }
        };

        match action {
            Some(action) if errs.is_empty() => {
                let mut ids = ids;
                ids.sort();
                ids.dedup();
                Ok((ids, action))
            }
            _ => Err(errs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_input() -> ServiceInput {
        ServiceInput {
            name: Some("Heavy Metals Panel".into()),
            description: Some("ICP-MS screening".into()),
            category: Some("Chemical Analysis".into()),
            pricing_mode: Some("FIXED".into()),
            price_per_unit: Some(2500.0),
            unit_type: None,
            turnaround_days: Some(7),
            sample_requirements: None,
        }
    }

    #[test]
    fn valid_fixed_service() {
        let draft = fixed_input().validate().unwrap();
        assert_eq!(draft.unit_type, "per_sample");
        assert_eq!(draft.pricing_mode, PricingMode::Fixed);
        assert_eq!(draft.turnaround_days, Some(7));
    }

    #[test]
    fn fixed_and_hybrid_need_a_price() {
        for mode in ["FIXED", "HYBRID"] {
            let input = ServiceInput {
                pricing_mode: Some(mode.into()),
                price_per_unit: None,
                ..fixed_input()
            };
            let errs = input.validate().unwrap_err();
            assert_eq!(errs.errors()[0].field(), "pricePerUnit");
        }
    }

    #[test]
    fn quote_required_without_price() {
        let input = ServiceInput {
            pricing_mode: Some("QUOTE_REQUIRED".into()),
            price_per_unit: None,
            ..fixed_input()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn rejects_short_name_bad_category_negative_price() {
        let input = ServiceInput {
            name: Some("AB".into()),
            category: Some("Astrology".into()),
            price_per_unit: Some(-5.0),
            ..fixed_input()
        };
        let errs = input.validate().unwrap_err();
        let fields: Vec<_> = errs.errors().iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["name", "category", "pricePerUnit"]);
    }

    #[test]
    fn turnaround_limits() {
        let input = ServiceInput {
            turnaround_days: Some(366),
            ..fixed_input()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn filter_defaults_to_active_only() {
        let q = ServiceQuery::default();
        let f = q.filter().unwrap();
        assert!(f.active_only);

        let q = ServiceQuery {
            active: Some("all".into()),
            category: Some("all".into()),
            ..Default::default()
        };
        let f = q.filter().unwrap();
        assert!(!f.active_only);
        assert!(f.category.is_none());
    }

    #[test]
    fn filter_rejects_bad_lab_id() {
        let q = ServiceQuery {
            lab_id: Some("not-a-uuid".into()),
            ..Default::default()
        };
        assert!(q.filter().is_err());
    }

    #[test]
    fn bulk_validation() {
        let req = BulkActionRequest {
            service_ids: Some(vec![]),
            action: Some("enable".into()),
        };
        assert!(req.validate().is_err());

        let req = BulkActionRequest {
            service_ids: Some(vec!["nope".into()]),
            action: Some("enable".into()),
        };
        assert!(req.validate().is_err());

        let id = Uuid::new_v4();
        let req = BulkActionRequest {
            service_ids: Some(vec![id.to_string(), id.to_string()]),
            action: Some("toggle".into()),
        };
        assert!(req.validate().is_err());

        let req = BulkActionRequest {
            service_ids: Some(vec![id.to_string(), id.to_string()]),
            action: Some("disable".into()),
        };
        let (ids, action) = req.validate().unwrap();
        assert_eq!(ids, vec![id]);
        assert_eq!(action, BulkAction::Disable);
    }
}
