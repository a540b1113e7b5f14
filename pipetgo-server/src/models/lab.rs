//! Lab profile input

use serde::Deserialize;

use super::validation::{number_in_range, optional_text, required_text};
use super::{Coordinates, LabLocation, ValidationError, ValidationErrors};

const MAX_CERTIFICATIONS: usize = 20;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabLocationInput {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub coordinates: Option<Coordinates>,
}

/// PUT /api/labs/mine body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabProfileRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<LabLocationInput>,
    pub certifications: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabProfile {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<LabLocation>,
    pub certifications: Vec<String>,
}

impl LabLocationInput {
    fn validate(self, errs: &mut ValidationErrors) -> Option<LabLocation> {
        let address = errs.check(required_text("location.address", self.address.as_deref(), 5, 200));
        let city = errs.check(required_text("location.city", self.city.as_deref(), 2, 100));
        let state = errs.check(required_text("location.state", self.state.as_deref(), 2, 100));
        let country = errs.check(required_text("location.country", self.country.as_deref(), 2, 100));
        let postal_code = errs.check(required_text(
            "location.postalCode",
            self.postal_code.as_deref(),
            3,
            20,
        ));
        let coordinates = match self.coordinates {
            Some(c) => {
                let lat = errs.check(number_in_range("location.coordinates.lat", c.lat, -90.0, 90.0));
                let lng = errs.check(number_in_range("location.coordinates.lng", c.lng, -180.0, 180.0));
                Some(Coordinates {
                    lat: lat?,
                    lng: lng?,
                })
            }
            None => None,
        };

        Some(LabLocation {
            address: address?,
            city: city?,
            state: state?,
            country: country?,
            postal_code: postal_code?,
            coordinates,
        })
    }
}

impl LabProfileRequest {
    pub fn validate(self) -> Result<LabProfile, ValidationErrors> {
        let mut errs = ValidationErrors::new();

        let name = errs.check(required_text("name", self.name.as_deref(), 3, 200));
        let description = errs
            .check(optional_text("description", self.description.as_deref(), 2000))
            .flatten();
        let location = self.location.and_then(|loc| loc.validate(&mut errs));

        let raw_certs = self.certifications.unwrap_or_default();
        if raw_certs.len() > MAX_CERTIFICATIONS {
            errs.push(ValidationError::Rule {
                field: "certifications",
                message: "Too many accreditations",
            });
        }
        let certifications: Vec<String> = raw_certs
            .iter()
            .filter_map(|c| errs.check(optional_text("certifications", Some(c), 100)).flatten())
            .collect();

        match name {
            Some(name) if errs.is_empty() => Ok(LabProfile {
                name,
                description,
                location,
                certifications,
            }),
            _ => Err(errs),
        }
    }
}
