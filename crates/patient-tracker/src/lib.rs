//! `patient-tracker` - A record repository for patient locations
//!
//! This library keeps a list of patient-location records, persists it as a
//! CSV text file, and publishes immutable snapshots to observers whenever
//! the list changes.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod error;
pub mod form;
pub mod location;
pub mod logging;
pub mod repository;
pub mod store;

pub use codec::{DecodeReport, SkipReason, SkippedLine};
pub use config::Config;
pub use error::{Error, Result};
pub use form::{LocationForm, ValidationError};
pub use location::{LocationId, PatientLocation, UNASSIGNED_ID};
pub use logging::init_logging;
pub use repository::{PatientRepository, Snapshot, Subscription};
pub use store::{FileStore, MemoryStore, RecordStore, Seed};
