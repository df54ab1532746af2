//! Error types for `qcost-core`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of a rejected submission, independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  MissingRequiredField,
  NonPositiveAmount,
  AllocationClosureViolation,
  LookupMiss,
  InvalidCatalog,
  PersistenceFailure,
  Serialization,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing required field: {0}")]
  MissingRequiredField(String),

  #[error("amount must be positive: {0}")]
  NonPositiveAmount(String),

  #[error("allocation does not close: {0}")]
  AllocationClosureViolation(String),

  #[error("catalog lookup failed: {0}")]
  LookupMiss(String),

  /// A catalog entry carries a negative or non-finite price.
  #[error("invalid catalog entry: {0}")]
  InvalidCatalog(String),

  /// The store rejected the write; the message is the store's own.
  #[error("persistence failed: {0}")]
  PersistenceFailure(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::MissingRequiredField(_) => ErrorKind::MissingRequiredField,
      Self::NonPositiveAmount(_) => ErrorKind::NonPositiveAmount,
      Self::AllocationClosureViolation(_) => {
        ErrorKind::AllocationClosureViolation
      }
      Self::LookupMiss(_) => ErrorKind::LookupMiss,
      Self::InvalidCatalog(_) => ErrorKind::InvalidCatalog,
      Self::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
      Self::Serialization(_) => ErrorKind::Serialization,
    }
  }

  pub(crate) fn missing(field: impl Into<String>) -> Self {
    Self::MissingRequiredField(field.into())
  }

  pub(crate) fn non_positive(what: impl Into<String>) -> Self {
    Self::NonPositiveAmount(what.into())
  }

  pub(crate) fn closure(detail: impl Into<String>) -> Self {
    Self::AllocationClosureViolation(detail.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
