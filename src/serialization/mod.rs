pub mod cdr_adapters;
pub mod cdr_deserializer;
pub mod cdr_serializer;
pub mod error;
pub mod representation_identifier;

// crate exports
pub use byteorder::{BigEndian, LittleEndian};
pub use cdr_adapters::{CDRDeserializerAdapter, CDRSerializerAdapter};
pub use cdr_deserializer::{deserialize_from_big_endian, deserialize_from_little_endian, CdrDeserializer};
pub use cdr_serializer::{serialized_size, to_bytes, CdrSerializer};
pub use representation_identifier::RepresentationIdentifier;
