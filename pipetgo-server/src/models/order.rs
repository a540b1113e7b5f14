//! Order submission and lab-side update input

use serde::Deserialize;
use uuid::Uuid;

use super::credentials::Email;
use super::validation::{optional_text, required_text, uuid_field};
use super::{ClientDetails, OrderStatus, ShippingAddress, ValidationError, ValidationErrors};

const DEFAULT_COUNTRY: &str = "Philippines";

/// Statuses a lab (or admin) may set through PATCH /api/orders/{id}
const LAB_SETTABLE: [OrderStatus; 4] = [
    OrderStatus::Acknowledged,
    OrderStatus::InProgress,
    OrderStatus::Completed,
    OrderStatus::Cancelled,
];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressInput {
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetailsInput {
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub shipping_address: Option<ShippingAddressInput>,
    pub organization: Option<String>,
}

/// POST /api/orders body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub service_id: Option<String>,
    pub sample_description: Option<String>,
    pub special_instructions: Option<String>,
    pub request_custom_quote: Option<bool>,
    pub client_details: Option<ClientDetailsInput>,
}

/// Validated order submission
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSubmission {
    pub service_id: Uuid,
    pub sample_description: String,
    pub special_instructions: Option<String>,
    pub request_custom_quote: bool,
    pub client_details: ClientDetails,
}

impl ClientDetailsInput {
    fn validate(self, errs: &mut ValidationErrors) -> Option<ClientDetails> {
        let email = errs.check(Email::for_field(
            "clientDetails.contactEmail",
            self.contact_email.as_deref().unwrap_or_default(),
        ));
        let phone = errs.check(optional_text(
            "clientDetails.contactPhone",
            self.contact_phone.as_deref(),
            20,
        ));
        let organization = errs.check(optional_text(
            "clientDetails.organization",
            self.organization.as_deref(),
            200,
        ));

        let address = match self.shipping_address {
            Some(addr) => {
                let street = errs.check(required_text(
                    "clientDetails.shippingAddress.street",
                    addr.street.as_deref(),
                    1,
                    200,
                ));
                let city = errs.check(required_text(
                    "clientDetails.shippingAddress.city",
                    addr.city.as_deref(),
                    1,
                    100,
                ));
                let postal = errs.check(required_text(
                    "clientDetails.shippingAddress.postal",
                    addr.postal.as_deref(),
                    1,
                    20,
                ));
                let country = errs
                    .check(optional_text(
                        "clientDetails.shippingAddress.country",
                        addr.country.as_deref(),
                        100,
                    ))
                    .map(|c| c.unwrap_or_else(|| DEFAULT_COUNTRY.to_owned()));
                match (street, city, postal, country) {
                    (Some(street), Some(city), Some(postal), Some(country)) => {
                        Some(ShippingAddress {
                            street,
                            city,
                            postal,
                            country,
                        })
                    }
                    _ => None,
                }
            }
            None => {
                errs.push(ValidationError::Empty {
                    field: "clientDetails.shippingAddress",
                });
                None
            }
        };

        Some(ClientDetails {
            contact_email: email?.into_string(),
            contact_phone: phone?,
            shipping_address: address?,
            organization: organization?,
        })
    }
}

impl CreateOrderRequest {
    pub fn validate(self) -> Result<OrderSubmission, ValidationErrors> {
        let mut errs = ValidationErrors::new();

        let service_id = errs.check(uuid_field("serviceId", self.service_id.as_deref()));
        let sample_description = errs.check(required_text(
            "sampleDescription",
            self.sample_description.as_deref(),
            10,
            2000,
        ));
        let special_instructions = errs.check(optional_text(
            "specialInstructions",
            self.special_instructions.as_deref(),
            1000,
        ));
        let client_details = match self.client_details {
            Some(details) => details.validate(&mut errs),
            None => {
                errs.push(ValidationError::Empty {
                    field: "clientDetails",
                });
                None
            }
        };

        match (
            service_id,
            sample_description,
            special_instructions,
            client_details,
        ) {
            (Some(service_id), Some(sample_description), Some(special_instructions), Some(client_details))
                if errs.is_empty() =>
            {
                Ok(OrderSubmission {
                    service_id,
                    sample_description,
                    special_instructions,
                    request_custom_quote: self.request_custom_quote.unwrap_or(false),
                    client_details,
                })
            }
            _ => Err(errs),
        }
    }
}

/// PATCH /api/orders/{id} body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub result_file_url: Option<String>,
    pub result_file_name: Option<String>,
}

/// Result file recorded as an attachment when a lab updates an order
#[derive(Debug, Clone, PartialEq)]
pub struct ResultFile {
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdate {
    pub status: OrderStatus,
    pub result_file: Option<ResultFile>,
}

impl UpdateOrderRequest {
    pub fn validate(self) -> Result<OrderUpdate, ValidationErrors> {
        let mut errs = ValidationErrors::new();

        let status = match self.status.as_deref() {
            None => {
                errs.push(ValidationError::Empty { field: "status" });
                None
            }
            Some(raw) => match raw.parse::<OrderStatus>() {
                Ok(s) if LAB_SETTABLE.contains(&s) => Some(s),
                _ => {
                    errs.push(ValidationError::InvalidVariant {
                        field: "status",
                        value: raw.to_owned(),
                    });
                    None
                }
            },
        };

        let url = match self.result_file_url.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(u) if is_http_url(u) => Some(u.to_owned()),
            Some(_) => {
                errs.push(ValidationError::InvalidFormat {
                    field: "resultFileUrl",
                    reason: "must be an http or https URL",
                });
                None
            }
        };
        let name = errs
            .check(optional_text(
                "resultFileName",
                self.result_file_name.as_deref(),
                255,
            ))
            .flatten();

        match status {
            Some(status) if errs.is_empty() => Ok(OrderUpdate {
                status,
                // both parts are needed to record an attachment
                result_file: url.zip(name).map(|(url, name)| ResultFile { url, name }),
            }),
            _ => Err(errs),
        }
    }
}

fn is_http_url(s: &str) -> bool {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !host.is_empty() && !rest.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// GET /api/orders query string
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<String>,
}

impl OrderQuery {
    pub fn status(&self) -> Result<Option<OrderStatus>, ValidationError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateOrderRequest {
        CreateOrderRequest {
            service_id: Some(Uuid::new_v4().to_string()),
            sample_description: Some("Two liters of well water".into()),
            special_instructions: None,
            request_custom_quote: None,
            client_details: Some(ClientDetailsInput {
                contact_email: Some("QA@Acme.ph".into()),
                contact_phone: Some("+63 912 345 6789".into()),
                shipping_address: Some(ShippingAddressInput {
                    street: Some("1 Ayala Ave".into()),
                    city: Some("Makati".into()),
                    postal: Some("1226".into()),
                    country: None,
                }),
                organization: None,
            }),
        }
    }

    #[test]
    fn valid_submission_defaults_country() {
        let sub = valid_request().validate().unwrap();
        assert_eq!(sub.client_details.shipping_address.country, "Philippines");
        assert_eq!(sub.client_details.contact_email, "qa@acme.ph");
        assert!(!sub.request_custom_quote);
    }

    #[test]
    fn short_sample_description() {
        let req = CreateOrderRequest {
            sample_description: Some("water".into()),
            ..valid_request()
        };
        let errs = req.validate().unwrap_err();
        assert_eq!(errs.errors()[0].field(), "sampleDescription");
    }

    #[test]
    fn missing_client_details_and_bad_service_id() {
        let req = CreateOrderRequest {
            service_id: Some("svc-1".into()),
            client_details: None,
            ..valid_request()
        };
        let errs = req.validate().unwrap_err();
        let fields: Vec<_> = errs.errors().iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["serviceId", "clientDetails"]);
    }

    #[test]
    fn bad_contact_email_is_reported_with_path() {
        let mut req = valid_request();
        if let Some(details) = req.client_details.as_mut() {
            details.contact_email = Some("nope".into());
        }
        let errs = req.validate().unwrap_err();
        assert_eq!(errs.errors()[0].field(), "clientDetails.contactEmail");
    }

    #[test]
    fn update_only_accepts_lab_statuses() {
        let req = UpdateOrderRequest {
            status: Some("QUOTE_PROVIDED".into()),
            ..Default::default()
        };
        assert!(req.validate().is_err());

        let req = UpdateOrderRequest {
            status: Some("IN_PROGRESS".into()),
            ..Default::default()
        };
        let update = req.validate().unwrap();
        assert_eq!(update.status, OrderStatus::InProgress);
        assert!(update.result_file.is_none());
    }

    #[test]
    fn update_result_file() {
        let req = UpdateOrderRequest {
            status: Some("COMPLETED".into()),
            result_file_url: Some("https://files.example.com/r/123.pdf".into()),
            result_file_name: Some("results.pdf".into()),
        };
        let update = req.validate().unwrap();
        assert_eq!(update.result_file.unwrap().name, "results.pdf");

        let req = UpdateOrderRequest {
            status: Some("COMPLETED".into()),
            result_file_url: Some("ftp://files.example.com/r.pdf".into()),
            result_file_name: Some("results.pdf".into()),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn url_shapes() {
        assert!(is_http_url("http://a.b"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("https://a b"));
    }

    #[test]
    fn order_query_status() {
        let q = OrderQuery {
            status: Some("PENDING".into()),
        };
        assert_eq!(q.status().unwrap(), Some(OrderStatus::Pending));
        assert_eq!(OrderQuery::default().status().unwrap(), None);
        let q = OrderQuery {
            status: Some("bogus".into()),
        };
        assert!(q.status().is_err());
    }
}
