//! Patient-location record type.
//!
//! A [`PatientLocation`] is one row of the tracker: where a group of patients
//! is, how many there are, and who to contact.

use serde::{Deserialize, Serialize};

/// Identifier of a record inside the repository.
pub type LocationId = u32;

/// Identifier carried by records the repository has not stored yet.
pub const UNASSIGNED_ID: LocationId = 0;

/// One patient-location entry.
///
/// `id` is owned by the repository. Callers creating a record pass
/// [`UNASSIGNED_ID`]; on upsert an unknown id is treated the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientLocation {
    /// Repository-assigned identifier, unique within the list.
    pub id: LocationId,

    /// Zone name (required).
    pub zone: String,

    /// Region within the zone (required).
    pub region: String,

    /// Street address (required).
    pub address: String,

    /// Number of patients at this location.
    pub patient_count: u32,

    /// Latitude in decimal degrees.
    pub latitude: f64,

    /// Longitude in decimal degrees.
    pub longitude: f64,

    /// Contact person, may be empty.
    #[serde(default)]
    pub contact_name: String,

    /// Contact phone number, may be empty.
    #[serde(default)]
    pub contact_phone: String,

    /// Free-form status or notes, may be empty.
    #[serde(default)]
    pub status: String,
}

impl PatientLocation {
    /// Create an unassigned record with empty contact and status fields.
    #[must_use]
    pub fn new(
        zone: impl Into<String>,
        region: impl Into<String>,
        address: impl Into<String>,
        patient_count: u32,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id: UNASSIGNED_ID,
            zone: zone.into(),
            region: region.into(),
            address: address.into(),
            patient_count,
            latitude,
            longitude,
            contact_name: String::new(),
            contact_phone: String::new(),
            status: String::new(),
        }
    }

    /// Return a copy of this record carrying `id`.
    #[must_use]
    pub fn with_id(mut self, id: LocationId) -> Self {
        self.id = id;
        self
    }

    /// Set contact details.
    #[must_use]
    pub fn with_contact(mut self, name: impl Into<String>, phone: impl Into<String>) -> Self {
        self.contact_name = name.into();
        self.contact_phone = phone.into();
        self
    }

    /// Set the status text.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Whether the repository still has to assign an id.
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        self.id == UNASSIGNED_ID
    }

    /// Short label for markers and confirmation messages, e.g. `NORTH • Gombak`.
    #[must_use]
    pub fn display_title(&self) -> String {
        format!("{} \u{2022} {}", self.zone.to_uppercase(), self.region)
    }
}
