use std::{fmt, result};

use crate::serialization;

// This is a specialized Result, similar to std::io::Result
pub type Result<T> = result::Result<T, Error>;

// This roughly corresponds to "Return codes" in DDS spec 2.2.1.1 Format and
// Conventions
#[derive(Debug)]
pub enum Error {
  // OK is not included. It is not an error.
  BadParameter,
  Unsupported,
  OutOfResources,
  NotEnabled,
  ImmutablePolicy,
  InconsistentPolicy,
  PreconditionNotMet,
  /// A blocking operation did not complete within its deadline. Also
  /// returned when a blocked operation is cut short by writer shutdown.
  Timeout,
  IllegalOperation,
  /// Payload or key serialization failed.
  Serialization(serialization::error::Error),
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::BadParameter => f.write_str("bad parameter"),
      Error::Unsupported => f.write_str("unsupported operation"),
      Error::OutOfResources => f.write_str("out of resources"),
      Error::NotEnabled => f.write_str("entity not enabled"),
      Error::ImmutablePolicy => f.write_str("attempt to change immutable QoS policy"),
      Error::InconsistentPolicy => f.write_str("inconsistent QoS policy"),
      Error::PreconditionNotMet => f.write_str("precondition not met"),
      Error::Timeout => f.write_str("operation timed out"),
      Error::IllegalOperation => f.write_str("illegal operation"),
      Error::Serialization(e) => write!(f, "serialization error: {}", e),
    }
  }
}

impl std::error::Error for Error {}

impl From<serialization::error::Error> for Error {
  fn from(e: serialization::error::Error) -> Error {
    Error::Serialization(e)
  }
}
