//! Validation of raw edit-form input.
//!
//! Screens that let a user add or edit a location collect every field as
//! text. [`LocationForm`] holds that text and turns it into a
//! [`PatientLocation`] the repository can store. The repository itself does
//! no validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::{LocationId, PatientLocation, UNASSIGNED_ID};

/// Reasons form input cannot become a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// A numeric field does not hold a usable number.
    #[error("{0} must be a valid number")]
    InvalidNumber(&'static str),
}

/// Raw field values from an add/edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationForm {
    /// Id of the record being edited, `None` when adding.
    pub existing_id: Option<LocationId>,
    /// Zone as typed.
    pub zone: String,
    /// Region as typed.
    pub region: String,
    /// Address as typed.
    pub address: String,
    /// Patient count as typed.
    pub patient_count: String,
    /// Latitude as typed.
    pub latitude: String,
    /// Longitude as typed.
    pub longitude: String,
    /// Contact name, optional.
    pub contact_name: String,
    /// Contact phone, optional.
    pub contact_phone: String,
    /// Status or notes, optional.
    pub status: String,
}

impl LocationForm {
    /// Empty form for a new record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Form pre-filled from an existing record.
    #[must_use]
    pub fn from_location(location: &PatientLocation) -> Self {
        Self {
            existing_id: Some(location.id),
            zone: location.zone.clone(),
            region: location.region.clone(),
            address: location.address.clone(),
            patient_count: location.patient_count.to_string(),
            latitude: location.latitude.to_string(),
            longitude: location.longitude.to_string(),
            contact_name: location.contact_name.clone(),
            contact_phone: location.contact_phone.clone(),
            status: location.status.clone(),
        }
    }

    /// Validate the input and build a record.
    ///
    /// Fields are checked in form order and the first problem is reported.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] for a blank zone, region or
    /// address and [`ValidationError::InvalidNumber`] for a count or
    /// coordinate that does not parse.
    pub fn into_location(self) -> Result<PatientLocation, ValidationError> {
        let zone = required("zone", &self.zone)?;
        let region = required("region", &self.region)?;
        let address = required("address", &self.address)?;

        let patient_count = self
            .patient_count
            .trim()
            .parse::<u32>()
            .map_err(|_| ValidationError::InvalidNumber("patient_count"))?;
        let latitude = coordinate("latitude", &self.latitude)?;
        let longitude = coordinate("longitude", &self.longitude)?;

        Ok(
            PatientLocation::new(zone, region, address, patient_count, latitude, longitude)
                .with_id(self.existing_id.unwrap_or(UNASSIGNED_ID))
                .with_contact(self.contact_name.trim(), self.contact_phone.trim())
                .with_status(self.status.trim()),
        )
    }
}

fn required<'a>(name: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::MissingField(name))
    } else {
        Ok(value)
    }
}

fn coordinate(name: &'static str, value: &str) -> Result<f64, ValidationError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .ok_or(ValidationError::InvalidNumber(name))
}
