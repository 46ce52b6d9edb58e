use std::fmt::{self, Debug, Display};
use std::io;

use crate::location::{LocationId, LocationType};
use crate::person::PersonId;

/// Provides `PandemicError` and maps other errors to
/// convert to a `PandemicError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum PandemicError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    UnknownLocation(LocationId),
    UnknownPerson(PersonId),
    DuplicateLocation(LocationId),
    DuplicatePerson(PersonId),
    LocationTypeMismatch {
        location: LocationId,
        registered: LocationType,
        found: LocationType,
    },
    MissingLocationType(LocationType),
    InvalidRegulation(String),
    InvalidRule(String),
    InvalidConfig(String),
    ReportError(String),
    PandemicError(String),
}

impl From<io::Error> for PandemicError {
    fn from(error: io::Error) -> Self {
        PandemicError::IoError(error)
    }
}

impl From<serde_json::Error> for PandemicError {
    fn from(error: serde_json::Error) -> Self {
        PandemicError::JsonError(error)
    }
}

impl From<csv::Error> for PandemicError {
    fn from(error: csv::Error) -> Self {
        PandemicError::CSVError(error)
    }
}

impl From<String> for PandemicError {
    fn from(error: String) -> Self {
        PandemicError::PandemicError(error)
    }
}

impl From<&str> for PandemicError {
    fn from(error: &str) -> Self {
        PandemicError::PandemicError(error.to_string())
    }
}

impl std::error::Error for PandemicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PandemicError::IoError(e) => Some(e),
            PandemicError::JsonError(e) => Some(e),
            PandemicError::CSVError(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for PandemicError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PandemicError::IoError(e) => write!(f, "I/O error: {e}"),
            PandemicError::JsonError(e) => write!(f, "JSON error: {e}"),
            PandemicError::CSVError(e) => write!(f, "CSV error: {e}"),
            PandemicError::UnknownLocation(id) => {
                write!(f, "location {id} is not present in the registry")
            }
            PandemicError::UnknownPerson(id) => {
                write!(f, "person {id} is not present in the registry")
            }
            PandemicError::DuplicateLocation(id) => write!(f, "location {id} was given twice"),
            PandemicError::DuplicatePerson(id) => write!(f, "person {id} was given twice"),
            PandemicError::LocationTypeMismatch {
                location,
                registered,
                found,
            } => write!(
                f,
                "location {location} is registered as {registered:?} but was built as {found:?}"
            ),
            PandemicError::MissingLocationType(location_type) => write!(
                f,
                "required location type {location_type:?} not found; add at least one such location"
            ),
            PandemicError::InvalidRegulation(msg) => write!(f, "invalid regulation: {msg}"),
            PandemicError::InvalidRule(msg) => write!(f, "invalid location rule: {msg}"),
            PandemicError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            PandemicError::ReportError(msg) => write!(f, "report error: {msg}"),
            PandemicError::PandemicError(msg) => write!(f, "Error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_from_str_and_string() {
        let e: PandemicError = "boom".into();
        assert!(matches!(e, PandemicError::PandemicError(ref m) if m == "boom"));
        let e: PandemicError = String::from("bang").into();
        assert_eq!(e.to_string(), "Error: bang");
    }

    #[test]
    fn io_error_has_source() {
        let e: PandemicError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(std::error::Error::source(&e).is_some());
        assert!(e.to_string().starts_with("I/O error"));
    }

    #[test]
    fn missing_location_type_message_names_type() {
        let e = PandemicError::MissingLocationType(LocationType::Hospital);
        assert!(e.to_string().contains("Hospital"));
    }
}
