/// Adapters connect serde Serializer and Deserializer implementations to
/// DataWriter and DataReader endpoints.
///
/// An endpoint cannot assume a specific serialization format, so the format
/// is given as a type parameter. For WITH_KEY topics the key must be
/// (de)serializable in addition to the data.
pub mod no_key {
  use bytes::Bytes;

  use crate::serialization::{error::Result, representation_identifier::RepresentationIdentifier};

  /// Connects a serde Deserializer implementation and a data reader
  /// together - no_key version.
  pub trait DeserializerAdapter<D> {
    /// Which data representations can the DeserializerAdapter read?
    /// See RTPS specification Section 10 and Table 10.3
    fn supported_encodings() -> &'static [RepresentationIdentifier];

    fn from_bytes(input_bytes: &[u8], encoding: RepresentationIdentifier) -> Result<D>;
  }

  /// Connects a serde Serializer implementation and a data writer
  /// together - no_key version.
  pub trait SerializerAdapter<D> {
    /// What encoding does this adapter produce?
    fn output_encoding() -> RepresentationIdentifier;

    fn to_bytes(value: &D) -> Result<Bytes>;
  }
}

pub mod with_key {
  use bytes::Bytes;

  use super::no_key;
  use crate::{
    dds::key::Keyed,
    serialization::{error::Result, representation_identifier::RepresentationIdentifier},
  };

  /// Connects a serde Deserializer implementation and a data reader
  /// together - with_key version.
  pub trait DeserializerAdapter<D>: no_key::DeserializerAdapter<D>
  where
    D: Keyed,
  {
    fn key_from_bytes(input_bytes: &[u8], encoding: RepresentationIdentifier) -> Result<D::K>;
  }

  /// Connects a serde Serializer implementation and a data writer
  /// together - with_key version.
  pub trait SerializerAdapter<D>: no_key::SerializerAdapter<D>
  where
    D: Keyed,
  {
    fn key_to_bytes(value: &D::K) -> Result<Bytes>;
  }
}
