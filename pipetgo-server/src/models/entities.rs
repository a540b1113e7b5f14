//! Persisted records and the JSON views built from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AttachmentType, OrderStatus, PricingMode, ServiceCategory, UserRole};

/// Platform account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Postal address and optional coordinates of a lab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabLocation {
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Tenant organization offering testing services
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lab {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<LabLocation>,
    pub certifications: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Test offering listed by a lab
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabService {
    pub id: Uuid,
    pub lab_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: ServiceCategory,
    pub pricing_mode: PricingMode,
    pub price_per_unit: Option<f64>,
    pub unit_type: String,
    pub turnaround_days: Option<i32>,
    pub sample_requirements: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lab fields shown next to a catalog entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabCard {
    pub id: Uuid,
    pub name: String,
    pub location: Option<LabLocation>,
    pub certifications: Vec<String>,
}

impl From<&Lab> for LabCard {
    fn from(lab: &Lab) -> Self {
        Self {
            id: lab.id,
            name: lab.name.clone(),
            location: lab.location.clone(),
            certifications: lab.certifications.clone(),
        }
    }
}

/// Catalog entry: a service with its lab
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceWithLab {
    #[serde(flatten)]
    pub service: LabService,
    pub lab: LabCard,
}

/// Shipping address captured with an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub postal: String,
    pub country: String,
}

/// Snapshot of the client's contact details at submission time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetails {
    pub contact_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    pub shipping_address: ShippingAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

/// A client's request for a service
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub client_id: Uuid,
    pub lab_id: Uuid,
    pub service_id: Uuid,
    pub status: OrderStatus,
    pub client_details: ClientDetails,
    pub sample_description: String,
    pub special_instructions: Option<String>,
    pub quoted_price: Option<f64>,
    pub quoted_at: Option<DateTime<Utc>>,
    pub quote_notes: Option<String>,
    pub estimated_turnaround_days: Option<i32>,
    pub quote_approved_at: Option<DateTime<Utc>>,
    pub quote_rejected_at: Option<DateTime<Utc>>,
    pub quote_rejected_reason: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File attached to an order (URL recorded as given)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub uploaded_by_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub file_size: Option<i64>,
    pub attachment_type: AttachmentType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: Uuid,
    pub name: String,
    pub category: ServiceCategory,
    pub pricing_mode: PricingMode,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabSummary {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
}

/// Order with the related rows every order endpoint returns
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub service: ServiceSummary,
    pub lab: LabSummary,
    pub client: ClientSummary,
    pub attachments: Vec<Attachment>,
}

/// Minimal order row used by analytics
#[derive(Debug, Clone)]
pub struct OrderFact {
    pub service_id: Uuid,
    pub service_name: String,
    pub status: OrderStatus,
    pub quoted_price: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_never_serializes_password_hash() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: Some("Ana".into()),
            email: "ana@example.com".into(),
            role: UserRole::Client,
            password_hash: Some("$argon2id$secret".into()),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "CLIENT");
    }

    #[test]
    fn client_details_use_camel_case() {
        let details: ClientDetails = serde_json::from_value(serde_json::json!({
            "contactEmail": "qa@acme.ph",
            "shippingAddress": {
                "street": "1 Ayala Ave",
                "city": "Makati",
                "postal": "1226",
                "country": "Philippines"
            }
        }))
        .unwrap();
        assert_eq!(details.contact_email, "qa@acme.ph");
        assert!(details.contact_phone.is_none());
    }
}
