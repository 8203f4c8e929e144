use bytes::Bytes;

use crate::serialization::representation_identifier::RepresentationIdentifier;

/// A serialized sample payload, ready for the transport.
///
/// The payload bytes are reference-counted, so cloning a `DDSData` shares
/// the underlying buffer. The container and the transport may hold the same
/// payload at the same time without copying it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DDSData {
  pub representation_identifier: RepresentationIdentifier,
  payload: Bytes,
}

impl DDSData {
  pub fn new(representation_identifier: RepresentationIdentifier, payload: Bytes) -> DDSData {
    DDSData {
      representation_identifier,
      payload,
    }
  }

  pub fn payload(&self) -> &Bytes {
    &self.payload
  }

  pub fn len(&self) -> usize {
    self.payload.len()
  }

  pub fn is_empty(&self) -> bool {
    self.payload.is_empty()
  }
}
