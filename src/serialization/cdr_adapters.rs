use std::marker::PhantomData;

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
  dds::{
    adapters::{no_key, with_key},
    key::Keyed,
  },
  serialization::{
    cdr_deserializer::{deserialize_from_big_endian, deserialize_from_little_endian},
    cdr_serializer::to_bytes,
    error::{Error, Result},
    representation_identifier::RepresentationIdentifier,
  },
};

/// This type adapts [`CdrSerializer`] (which implements
/// [`serde::Serializer`]) to work as a [`no_key::SerializerAdapter`] and
/// [`with_key::SerializerAdapter`].
///
/// [`CdrSerializer`] cannot directly implement the trait itself, because
/// [`CdrSerializer`] has the type parameter BO open, and the adapter needs
/// to commit to an encoding identifier.
///
/// [`CdrSerializer`]: crate::serialization::cdr_serializer::CdrSerializer
pub struct CDRSerializerAdapter<D, BO = LittleEndian>
where
  BO: ByteOrder,
{
  phantom: PhantomData<D>,
  ghost: PhantomData<BO>,
}

impl<D, BO> no_key::SerializerAdapter<D> for CDRSerializerAdapter<D, BO>
where
  D: Serialize,
  BO: ByteOrder + EncodingIdentifies,
{
  fn output_encoding() -> RepresentationIdentifier {
    <BO as EncodingIdentifies>::REPRESENTATION_IDENTIFIER
  }

  fn to_bytes(value: &D) -> Result<Bytes> {
    to_bytes::<D, BO>(value).map(Bytes::from)
  }
}

impl<D, BO> with_key::SerializerAdapter<D> for CDRSerializerAdapter<D, BO>
where
  D: Keyed + Serialize,
  <D as Keyed>::K: Serialize,
  BO: ByteOrder + EncodingIdentifies,
{
  fn key_to_bytes(value: &D::K) -> Result<Bytes> {
    to_bytes::<D::K, BO>(value).map(Bytes::from)
  }
}

/// Maps a byte order to the RTPS encoding identifier it produces.
pub trait EncodingIdentifies {
  const REPRESENTATION_IDENTIFIER: RepresentationIdentifier;
}

impl EncodingIdentifies for byteorder::LittleEndian {
  const REPRESENTATION_IDENTIFIER: RepresentationIdentifier = RepresentationIdentifier::CDR_LE;
}

impl EncodingIdentifies for byteorder::BigEndian {
  const REPRESENTATION_IDENTIFIER: RepresentationIdentifier = RepresentationIdentifier::CDR_BE;
}

/// This type adapts [`CdrDeserializer`] (which implements
/// [`serde::Deserializer`]) to work as a [`no_key::DeserializerAdapter`] and
/// [`with_key::DeserializerAdapter`].
///
/// [`CdrDeserializer`] cannot directly implement the trait itself, because
/// [`CdrDeserializer`] has the type parameter BO open, and the adapter needs
/// to be bi-endian.
///
/// [`CdrDeserializer`]: crate::serialization::cdr_deserializer::CdrDeserializer
pub struct CDRDeserializerAdapter<D> {
  phantom: PhantomData<D>,
}

const REPR_IDS: [RepresentationIdentifier; 2] = [
  RepresentationIdentifier::CDR_BE,
  RepresentationIdentifier::CDR_LE,
];

impl<D> no_key::DeserializerAdapter<D> for CDRDeserializerAdapter<D>
where
  D: DeserializeOwned,
{
  fn supported_encodings() -> &'static [RepresentationIdentifier] {
    &REPR_IDS
  }

  fn from_bytes(input_bytes: &[u8], encoding: RepresentationIdentifier) -> Result<D> {
    match encoding {
      RepresentationIdentifier::CDR_LE => deserialize_from_little_endian(input_bytes),
      RepresentationIdentifier::CDR_BE => deserialize_from_big_endian(input_bytes),
      repr_id => Err(Error::Message(format!(
        "Unknown representation identifier {:?}.",
        repr_id
      ))),
    }
  }
}

impl<D> with_key::DeserializerAdapter<D> for CDRDeserializerAdapter<D>
where
  D: Keyed + DeserializeOwned,
  <D as Keyed>::K: DeserializeOwned,
{
  fn key_from_bytes(input_bytes: &[u8], encoding: RepresentationIdentifier) -> Result<D::K> {
    match encoding {
      RepresentationIdentifier::CDR_LE => deserialize_from_little_endian(input_bytes),
      RepresentationIdentifier::CDR_BE => deserialize_from_big_endian(input_bytes),
      repr_id => Err(Error::Message(format!(
        "Unknown representation identifier {:?}.",
        repr_id
      ))),
    }
  }
}
