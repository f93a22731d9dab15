use error_stack::Report;
use std::fmt::{Debug, Display};

use crate::database;
use crate::storage::ImageError;
use crate::util::ValidationError;

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome taxonomy at the service boundary.
///
/// Read misses are not represented here at all; read operations
/// return `Ok(None)` or an empty list. Validation and conflict
/// failures are recovered into typed values instead of leaking as raw
/// storage reports, and transient storage faults only show up as
/// `Database` after the internal retries are exhausted.
#[derive(Debug)]
pub enum Error {
    /// A write targeted a record that does not exist.
    NotFound,
    /// Input was missing, oversized or malformed; carries field-level
    /// detail.
    Validation(ValidationError),
    /// The record changed between load and save. The caller must
    /// reload and retry instead of silently overwriting.
    Conflict,
    /// The featured image failed validation or storage. The post was
    /// not mutated.
    Attachment(Report<ImageError>),
    /// Storage failed for real; never swallowed into zeroed data.
    Database(Report<database::Error>),
}

impl Error {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }

    #[must_use]
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(inner) => Some(inner),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "record not found"),
            Self::Validation(inner) => Display::fmt(inner, f),
            Self::Conflict => write!(f, "record was modified concurrently; reload and retry"),
            Self::Attachment(report) => write!(f, "featured image rejected: {report}"),
            Self::Database(report) => write!(f, "storage failure: {report}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<Report<database::Error>> for Error {
    fn from(value: Report<database::Error>) -> Self {
        Self::Database(value)
    }
}

impl From<Report<ImageError>> for Error {
    fn from(value: Report<ImageError>) -> Self {
        Self::Attachment(value)
    }
}
