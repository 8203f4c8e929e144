use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use paste::paste;
use serde::de::{
  self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
  VariantAccess, Visitor,
};

use crate::serialization::error::{Error, Result};

/// CDR deserializer, generic over byte order.
///
/// Input is a `&[u8]`, since the data is expected to sit in contiguous
/// memory buffers. A running byte count tracks alignment, which in CDR is
/// relative to the start of the payload.
pub struct CdrDeserializer<'de, BO> {
  phantom: PhantomData<BO>,
  input: &'de [u8],
  bytes_consumed: usize,
}

impl<'de, BO> CdrDeserializer<'de, BO>
where
  BO: ByteOrder,
{
  pub fn new(input: &'de [u8]) -> CdrDeserializer<'de, BO> {
    CdrDeserializer {
      phantom: PhantomData,
      input,
      bytes_consumed: 0,
    }
  }

  pub fn bytes_consumed(&self) -> usize {
    self.bytes_consumed
  }

  fn next_bytes(&mut self, count: usize) -> Result<&[u8]> {
    if count <= self.input.len() {
      let (head, tail) = self.input.split_at(count);
      self.input = tail;
      self.bytes_consumed += count;
      Ok(head)
    } else {
      Err(Error::Eof)
    }
  }

  fn skip_padding(&mut self, alignment: usize) -> Result<()> {
    let modulo = self.bytes_consumed % alignment;
    if modulo != 0 {
      self.next_bytes(alignment - modulo)?;
    }
    Ok(())
  }
}

/// Deserialize a value from little-endian CDR bytes. Trailing padding after
/// the value is permitted.
pub fn deserialize_from_little_endian<T>(s: &[u8]) -> Result<T>
where
  T: DeserializeOwned,
{
  let mut deserializer = CdrDeserializer::<LittleEndian>::new(s);
  T::deserialize(&mut deserializer)
}

/// Deserialize a value from big-endian CDR bytes. Trailing padding after
/// the value is permitted.
pub fn deserialize_from_big_endian<T>(s: &[u8]) -> Result<T>
where
  T: DeserializeOwned,
{
  let mut deserializer = CdrDeserializer::<BigEndian>::new(s);
  T::deserialize(&mut deserializer)
}

/// Macro for writing primitive number deserializers. Rust does not allow
/// declaring a macro inside an impl block, so it is here.
macro_rules! deserialize_multibyte_number {
  ($num_type:ident) => {
    paste! {
      fn [<deserialize_ $num_type>]<V>(self, visitor: V) -> Result<V::Value>
      where
        V: Visitor<'de>,
      {
        const SIZE: usize = std::mem::size_of::<$num_type>();
        self.skip_padding(SIZE)?;
        let mut bytes = self.next_bytes(SIZE)?;
        visitor.[<visit_ $num_type>](
          bytes.[<read_ $num_type>]::<BO>().map_err(Error::IOError)? )
      }
    }
  };
}

impl<'de, 'a, BO> de::Deserializer<'de> for &'a mut CdrDeserializer<'de, BO>
where
  BO: ByteOrder,
{
  type Error = Error;

  /// CDR is not a self-describing data format, so this cannot be
  /// implemented.
  fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    Err(Error::Message(
      "CDR deserialization requires a known type, deserialize_any is unsupported".to_string(),
    ))
  }

  // 15.3.1.5 Boolean: single octet, TRUE is 1, FALSE is 0.
  fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    match self.next_bytes(1)?[0] {
      0 => visitor.visit_bool(false),
      1 => visitor.visit_bool(true),
      x => Err(Error::BadBoolean(x)),
    }
  }

  deserialize_multibyte_number!(i16);
  deserialize_multibyte_number!(i32);
  deserialize_multibyte_number!(i64);

  deserialize_multibyte_number!(u16);
  deserialize_multibyte_number!(u32);
  deserialize_multibyte_number!(u64);

  deserialize_multibyte_number!(f32);
  deserialize_multibyte_number!(f64);

  // Single-byte numbers need no alignment and no endianness.
  fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    visitor.visit_i8(self.next_bytes(1)?[0] as i8)
  }

  fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    visitor.visit_u8(self.next_bytes(1)?[0])
  }

  // IDL characters are single octets.
  fn deserialize_char<V>(self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    let octet = self.next_bytes(1)?[0];
    visitor.visit_char(octet as char)
  }

  fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    self.skip_padding(4)?;
    let mut length_bytes = self.next_bytes(4)?;
    let bytes_len = length_bytes.read_u32::<BO>().map_err(Error::IOError)? as usize;
    if bytes_len == 0 {
      return Err(Error::Message("CDR string with zero length".to_string()));
    }

    let bytes = self.next_bytes(bytes_len)?; // length includes null terminator
    let bytes_without_null = &bytes[0..bytes.len() - 1];

    match std::str::from_utf8(bytes_without_null) {
      Ok(s) => visitor.visit_str(s),
      Err(utf8_err) => Err(Error::BadString(utf8_err)),
    }
  }

  fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    self.deserialize_str(visitor)
  }

  fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    self.deserialize_seq(visitor)
  }

  fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    self.deserialize_seq(visitor)
  }

  fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    self.skip_padding(4)?;
    let mut tag_bytes = self.next_bytes(4)?;
    let tag = tag_bytes.read_u32::<BO>().map_err(Error::IOError)?;
    match tag {
      0 => visitor.visit_none(),
      1 => visitor.visit_some(self),
      other => Err(Error::BadOption(other)),
    }
  }

  // Unit data is not put on the wire, to match the serializer.
  fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    visitor.visit_unit()
  }

  fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    self.deserialize_unit(visitor)
  }

  fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    visitor.visit_newtype_struct(self)
  }

  // Sequences are an unsigned long element count followed by the elements.
  fn deserialize_seq<V>(mut self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    self.skip_padding(4)?;
    let mut count_bytes = self.next_bytes(4)?;
    let element_count = count_bytes.read_u32::<BO>().map_err(Error::IOError)? as usize;
    visitor.visit_seq(SequenceHelper::new(&mut self, element_count))
  }

  // Fixed-length arrays carry no element count.
  fn deserialize_tuple<V>(mut self, len: usize, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    visitor.visit_seq(SequenceHelper::new(&mut self, len))
  }

  fn deserialize_tuple_struct<V>(
    mut self,
    _name: &'static str,
    len: usize,
    visitor: V,
  ) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    visitor.visit_seq(SequenceHelper::new(&mut self, len))
  }

  fn deserialize_map<V>(mut self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    self.skip_padding(4)?;
    let mut count_bytes = self.next_bytes(4)?;
    let element_count = count_bytes.read_u32::<BO>().map_err(Error::IOError)? as usize;
    visitor.visit_map(SequenceHelper::new(&mut self, element_count))
  }

  fn deserialize_struct<V>(
    mut self,
    _name: &'static str,
    fields: &'static [&'static str],
    visitor: V,
  ) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    visitor.visit_seq(SequenceHelper::new(&mut self, fields.len()))
  }

  // Enum values are encoded as unsigned longs, in declaration order
  // starting from zero.
  fn deserialize_enum<V>(
    mut self,
    _name: &'static str,
    _variants: &'static [&'static str],
    visitor: V,
  ) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    self.skip_padding(4)?;
    visitor.visit_enum(EnumerationHelper::<BO>::new(&mut self))
  }

  fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    self.deserialize_u32(visitor)
  }

  fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    self.deserialize_any(visitor)
  }
}

// ----------------------------------------------------------

struct EnumerationHelper<'a, 'de: 'a, BO> {
  de: &'a mut CdrDeserializer<'de, BO>,
}

impl<'a, 'de, BO> EnumerationHelper<'a, 'de, BO>
where
  BO: ByteOrder,
{
  fn new(de: &'a mut CdrDeserializer<'de, BO>) -> Self {
    EnumerationHelper::<BO> { de }
  }
}

impl<'de, 'a, BO> EnumAccess<'de> for EnumerationHelper<'a, 'de, BO>
where
  BO: ByteOrder,
{
  type Error = Error;
  type Variant = Self;

  fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
  where
    V: DeserializeSeed<'de>,
  {
    // preceding deserialize_enum aligned to 4
    let mut tag_bytes = self.de.next_bytes(4)?;
    let enum_tag = tag_bytes.read_u32::<BO>().map_err(Error::IOError)?;
    let val: Result<_> = seed.deserialize(enum_tag.into_deserializer());
    Ok((val?, self))
  }
}

impl<'de, 'a, BO> VariantAccess<'de> for EnumerationHelper<'a, 'de, BO>
where
  BO: ByteOrder,
{
  type Error = Error;

  fn unit_variant(self) -> Result<()> {
    Ok(())
  }

  fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
  where
    T: DeserializeSeed<'de>,
  {
    seed.deserialize(self.de)
  }

  fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    de::Deserializer::deserialize_tuple(self.de, len, visitor)
  }

  fn struct_variant<V>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value>
  where
    V: Visitor<'de>,
  {
    de::Deserializer::deserialize_tuple(self.de, fields.len(), visitor)
  }
}

// ----------------------------------------------------------

struct SequenceHelper<'a, 'de: 'a, BO> {
  de: &'a mut CdrDeserializer<'de, BO>,
  element_counter: usize,
  expected_count: usize,
}

impl<'a, 'de, BO> SequenceHelper<'a, 'de, BO> {
  fn new(de: &'a mut CdrDeserializer<'de, BO>, expected_count: usize) -> Self {
    SequenceHelper {
      de,
      element_counter: 0,
      expected_count,
    }
  }
}

impl<'a, 'de, BO> SeqAccess<'de> for SequenceHelper<'a, 'de, BO>
where
  BO: ByteOrder,
{
  type Error = Error;

  fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
  where
    T: DeserializeSeed<'de>,
  {
    if self.element_counter == self.expected_count {
      Ok(None)
    } else {
      self.element_counter += 1;
      seed.deserialize(&mut *self.de).map(Some)
    }
  }
}

impl<'de, 'a, BO> MapAccess<'de> for SequenceHelper<'a, 'de, BO>
where
  BO: ByteOrder,
{
  type Error = Error;

  fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
  where
    K: DeserializeSeed<'de>,
  {
    if self.element_counter == self.expected_count {
      Ok(None)
    } else {
      self.element_counter += 1;
      seed.deserialize(&mut *self.de).map(Some)
    }
  }

  fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
  where
    V: DeserializeSeed<'de>,
  {
    seed.deserialize(&mut *self.de)
  }
}

#[cfg(test)]
mod tests {
  use byteorder::LittleEndian;
  use serde::{Deserialize, Serialize};

  use crate::serialization::cdr_deserializer::{
    deserialize_from_big_endian, deserialize_from_little_endian,
  };
  use crate::serialization::cdr_serializer::to_bytes;

  #[test]
  fn cdr_deserialization_struct() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct ManyFields {
      first: u8,
      second: i8,
      third: i32,
      fourth: u64,
      fifth: bool,
      sixth: f32,
      seventh: bool,
      eighth: Vec<i32>,
      ninth: Vec<u8>,
      tenth: Vec<i16>,
      eleventh: Vec<i64>,
      twelfth: [u16; 3],
      thirteenth: String,
    }

    let value = ManyFields {
      first: 1,
      second: -3,
      third: -5000,
      fourth: 1234u64,
      fifth: true,
      sixth: -6.6f32,
      seventh: true,
      eighth: vec![1, 2],
      ninth: vec![1],
      tenth: vec![5, -4, 3, -2, 1],
      eleventh: vec![],
      twelfth: [3, 2, 1],
      thirteenth: "abc".to_string(),
    };

    let expected: Vec<u8> = vec![
      0x01, 0xfd, 0x00, 0x00, 0x78, 0xec, 0xff, 0xff, 0xd2, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00,
      0x00, 0x01, 0x00, 0x00, 0x00, 0x33, 0x33, 0xd3, 0xc0, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00,
      0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01,
      0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x05, 0x00, 0xfc, 0xff, 0x03, 0x00, 0xfe, 0xff,
      0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00,
      0x00, 0x04, 0x00, 0x00, 0x00, 0x61, 0x62, 0x63, 0x00,
    ];

    let serialized = to_bytes::<ManyFields, LittleEndian>(&value).unwrap();
    assert_eq!(serialized, expected);

    let deserialized: ManyFields = deserialize_from_little_endian(&expected).unwrap();
    assert_eq!(deserialized, value);
  }

  #[test]
  fn cdr_deserialization_user_defined_data() {
    // https://www.omg.org/spec/DDSI-RTPS/2.3/PDF
    // 10.7 Example for User-defined Topic Data
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct ShapeType {
      color: String,
      x: i32,
      y: i32,
      size: i32,
    }

    let message = ShapeType {
      color: "BLUE".to_string(),
      x: 34,
      y: 100,
      size: 24,
    };

    let expected: Vec<u8> = vec![
      0x05, 0x00, 0x00, 0x00, 0x42, 0x4c, 0x55, 0x45, 0x00, 0x00, 0x00, 0x00, 0x22, 0x00, 0x00,
      0x00, 0x64, 0x00, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00,
    ];

    let serialized = to_bytes::<ShapeType, LittleEndian>(&message).unwrap();
    assert_eq!(serialized, expected);
    let deserialized: ShapeType = deserialize_from_little_endian(&serialized).unwrap();
    assert_eq!(deserialized, message);
  }

  #[test]
  fn cdr_deserialization_example_struct() {
    // https://www.omg.org/spec/DDSI-RTPS/2.2/PDF 10.2.2 Example
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Example {
      a: u32,
      b: [u8; 4],
    }

    let o = Example {
      a: 1,
      b: [b'a', b'b', b'c', b'd'],
    };

    let serialized_le: Vec<u8> = vec![0x01, 0x00, 0x00, 0x00, 0x61, 0x62, 0x63, 0x64];
    let serialized_be: Vec<u8> = vec![0x00, 0x00, 0x00, 0x01, 0x61, 0x62, 0x63, 0x64];

    let deserialized_le: Example = deserialize_from_little_endian(&serialized_le).unwrap();
    let deserialized_be: Example = deserialize_from_big_endian(&serialized_be).unwrap();

    assert_eq!(deserialized_le, o);
    assert_eq!(deserialized_be, o);
  }

  #[test]
  fn cdr_deserialization_trailing_padding() {
    // payloads may carry trailing padding after the value
    let received: Vec<u8> = vec![
      0x07, 0x00, 0x00, 0x00, 0x53, 0x71, 0x75, 0x61, 0x72, 0x65, 0x00, 0x00,
    ];
    let deserialized: String = deserialize_from_little_endian(&received).unwrap();
    assert_eq!("Square", deserialized);
  }

  #[test]
  fn cdr_deserialization_numbers() {
    let number_u16: u16 = 35;
    let serialized = to_bytes::<u16, LittleEndian>(&number_u16).unwrap();
    let deserialized: u16 = deserialize_from_little_endian(&serialized).unwrap();
    assert_eq!(number_u16, deserialized);

    let number_i64: i64 = -3_232_323_434;
    let serialized = to_bytes::<i64, LittleEndian>(&number_i64).unwrap();
    let deserialized: i64 = deserialize_from_little_endian(&serialized).unwrap();
    assert_eq!(number_i64, deserialized);

    let number_f64: f64 = 278.35f64;
    let serialized = to_bytes::<f64, LittleEndian>(&number_f64).unwrap();
    let deserialized: f64 = deserialize_from_little_endian(&serialized).unwrap();
    assert_eq!(number_f64, deserialized);
  }

  #[test]
  fn cdr_deserialization_bool_rejects_garbage() {
    let bytes: Vec<u8> = vec![0x02];
    let result: super::Result<bool> = deserialize_from_little_endian(&bytes);
    assert!(result.is_err());
  }

  #[test]
  fn cdr_deserialization_eof() {
    let bytes: Vec<u8> = vec![0x01, 0x00];
    let result: super::Result<u32> = deserialize_from_little_endian(&bytes);
    assert!(result.is_err());
  }
}
