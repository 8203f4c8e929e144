use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use serde::{ser, Serialize};

use crate::serialization::error::{Error, Result};

/// OMG CDR (Common Data Representation) serializer, generic over byte order.
///
/// Primitive values are aligned to their natural size, counted from the
/// start of the payload. Strings carry a length prefix that includes the
/// terminating NUL, sequences a u32 element count; fixed-size arrays have
/// no count.
pub struct CdrSerializer<BO>
where
  BO: ByteOrder,
{
  buffer: Vec<u8>,
  phantom: PhantomData<BO>,
}

impl<BO> CdrSerializer<BO>
where
  BO: ByteOrder,
{
  pub fn new() -> CdrSerializer<BO> {
    CdrSerializer {
      buffer: Vec::new(),
      phantom: PhantomData,
    }
  }

  pub fn buffer(&self) -> &Vec<u8> {
    &self.buffer
  }

  // Alignment is counted from the start of the payload, so the buffer
  // length itself is the write position.
  fn pad_to(&mut self, alignment: usize) {
    let modulo = self.buffer.len() % alignment;
    if modulo != 0 {
      for _ in 0..(alignment - modulo) {
        self.buffer.push(0u8);
      }
    }
  }
}

pub fn to_bytes<T, BO>(value: &T) -> Result<Vec<u8>>
where
  T: Serialize,
  BO: ByteOrder,
{
  let mut serializer = CdrSerializer::<BO>::new();
  value.serialize(&mut serializer)?;
  Ok(serializer.buffer)
}

pub fn to_little_endian_binary<T>(value: &T) -> Result<Vec<u8>>
where
  T: Serialize,
{
  to_bytes::<T, LittleEndian>(value)
}

pub fn to_big_endian_binary<T>(value: &T) -> Result<Vec<u8>>
where
  T: Serialize,
{
  to_bytes::<T, BigEndian>(value)
}

/// The number of bytes `value` would occupy in CDR, without producing them.
///
/// Exact for any value whose `Serialize` impl is deterministic, since the
/// same padding rules are applied against a running byte count.
pub fn serialized_size<T, BO>(value: &T) -> Result<usize>
where
  T: Serialize,
  BO: ByteOrder,
{
  let mut counter = SizeCounter::<BO>::new();
  value.serialize(&mut counter)?;
  Ok(counter.count)
}

impl<'a, BO> ser::Serializer for &'a mut CdrSerializer<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  type SerializeSeq = Self;
  type SerializeTuple = Self;
  type SerializeTupleStruct = Self;
  type SerializeTupleVariant = Self;
  type SerializeMap = Self;
  type SerializeStruct = Self;
  type SerializeStructVariant = Self;

  // 15.3.1.5 Boolean: single octet, TRUE is 1, FALSE is 0.
  fn serialize_bool(self, v: bool) -> Result<()> {
    self.buffer.push(if v { 1u8 } else { 0u8 });
    Ok(())
  }

  fn serialize_u8(self, v: u8) -> Result<()> {
    self.buffer.push(v);
    Ok(())
  }

  fn serialize_u16(self, v: u16) -> Result<()> {
    self.pad_to(2);
    self.buffer.write_u16::<BO>(v)?;
    Ok(())
  }

  fn serialize_u32(self, v: u32) -> Result<()> {
    self.pad_to(4);
    self.buffer.write_u32::<BO>(v)?;
    Ok(())
  }

  fn serialize_u64(self, v: u64) -> Result<()> {
    self.pad_to(8);
    self.buffer.write_u64::<BO>(v)?;
    Ok(())
  }

  fn serialize_i8(self, v: i8) -> Result<()> {
    self.buffer.write_i8(v)?;
    Ok(())
  }

  fn serialize_i16(self, v: i16) -> Result<()> {
    self.pad_to(2);
    self.buffer.write_i16::<BO>(v)?;
    Ok(())
  }

  fn serialize_i32(self, v: i32) -> Result<()> {
    self.pad_to(4);
    self.buffer.write_i32::<BO>(v)?;
    Ok(())
  }

  fn serialize_i64(self, v: i64) -> Result<()> {
    self.pad_to(8);
    self.buffer.write_i64::<BO>(v)?;
    Ok(())
  }

  fn serialize_f32(self, v: f32) -> Result<()> {
    self.pad_to(4);
    self.buffer.write_f32::<BO>(v)?;
    Ok(())
  }

  fn serialize_f64(self, v: f64) -> Result<()> {
    self.pad_to(8);
    self.buffer.write_f64::<BO>(v)?;
    Ok(())
  }

  // An IDL character is a single octet. Codepoints beyond one octet are
  // rejected instead of silently truncated.
  fn serialize_char(self, v: char) -> Result<()> {
    let codepoint = v as u32;
    if codepoint > 0xFF {
      return Err(Error::BadChar(codepoint));
    }
    self.buffer.push(codepoint as u8);
    Ok(())
  }

  // A string is an unsigned long octet count, the octets, and a single
  // terminating NUL which the count includes. An empty string has length 1.
  fn serialize_str(self, v: &str) -> Result<()> {
    self.serialize_u32(v.len() as u32 + 1)?;
    self.buffer.extend_from_slice(v.as_bytes());
    self.buffer.push(0u8);
    Ok(())
  }

  fn serialize_bytes(self, v: &[u8]) -> Result<()> {
    self.buffer.extend_from_slice(v);
    Ok(())
  }

  // Option is encoded as a u32 presence tag followed by the value, if any.
  fn serialize_none(self) -> Result<()> {
    self.serialize_u32(0)
  }

  fn serialize_some<T>(self, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    self.serialize_u32(1)?;
    value.serialize(self)
  }

  fn serialize_unit(self) -> Result<()> {
    Ok(())
  }

  fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
    self.serialize_unit()
  }

  fn serialize_unit_variant(
    self,
    _name: &'static str,
    variant_index: u32,
    _variant: &'static str,
  ) -> Result<()> {
    self.serialize_u32(variant_index)
  }

  fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(self)
  }

  fn serialize_newtype_variant<T>(
    self,
    _name: &'static str,
    variant_index: u32,
    _variant: &'static str,
    value: &T,
  ) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    self.serialize_u32(variant_index)?;
    value.serialize(self)
  }

  // Sequences are an unsigned long element count followed by the elements.
  fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
    match len {
      None => Err(Error::SequenceLengthUnknown),
      Some(elem_count) => {
        self.serialize_u32(elem_count as u32)?;
        Ok(self)
      }
    }
  }

  // Fixed-size arrays carry no element count.
  fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
    Ok(self)
  }

  fn serialize_tuple_struct(
    self,
    _name: &'static str,
    _len: usize,
  ) -> Result<Self::SerializeTupleStruct> {
    Ok(self)
  }

  fn serialize_tuple_variant(
    self,
    _name: &'static str,
    variant_index: u32,
    _variant: &'static str,
    _len: usize,
  ) -> Result<Self::SerializeTupleVariant> {
    self.serialize_u32(variant_index)?;
    Ok(self)
  }

  fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
    Ok(self)
  }

  fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
    Ok(self)
  }

  fn serialize_struct_variant(
    self,
    _name: &'static str,
    variant_index: u32,
    _variant: &'static str,
    _len: usize,
  ) -> Result<Self::SerializeStructVariant> {
    self.serialize_u32(variant_index)?;
    Ok(self)
  }
}

impl<'a, BO> ser::SerializeSeq for &'a mut CdrSerializer<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_element<T>(&mut self, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}

impl<'a, BO> ser::SerializeTuple for &'a mut CdrSerializer<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_element<T>(&mut self, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}

impl<'a, BO> ser::SerializeTupleStruct for &'a mut CdrSerializer<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_field<T>(&mut self, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}

impl<'a, BO> ser::SerializeTupleVariant for &'a mut CdrSerializer<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_field<T>(&mut self, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}

impl<'a, BO> ser::SerializeMap for &'a mut CdrSerializer<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_key<T>(&mut self, key: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    key.serialize(&mut **self)
  }

  fn serialize_value<T>(&mut self, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}

impl<'a, BO> ser::SerializeStruct for &'a mut CdrSerializer<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_field<T>(&mut self, _key: &'static str, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}

impl<'a, BO> ser::SerializeStructVariant for &'a mut CdrSerializer<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_field<T>(&mut self, _key: &'static str, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}

// Counts the bytes serialization would produce without producing them.
// Mirrors the padding and prefix rules of CdrSerializer exactly.
struct SizeCounter<BO>
where
  BO: ByteOrder,
{
  count: usize,
  phantom: PhantomData<BO>,
}

impl<BO> SizeCounter<BO>
where
  BO: ByteOrder,
{
  fn new() -> SizeCounter<BO> {
    SizeCounter {
      count: 0,
      phantom: PhantomData,
    }
  }

  fn pad_to(&mut self, alignment: usize) {
    let modulo = self.count % alignment;
    if modulo != 0 {
      self.count += alignment - modulo;
    }
  }
}

impl<'a, BO> ser::Serializer for &'a mut SizeCounter<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  type SerializeSeq = Self;
  type SerializeTuple = Self;
  type SerializeTupleStruct = Self;
  type SerializeTupleVariant = Self;
  type SerializeMap = Self;
  type SerializeStruct = Self;
  type SerializeStructVariant = Self;

  fn serialize_bool(self, _v: bool) -> Result<()> {
    self.count += 1;
    Ok(())
  }

  fn serialize_u8(self, _v: u8) -> Result<()> {
    self.count += 1;
    Ok(())
  }

  fn serialize_u16(self, _v: u16) -> Result<()> {
    self.pad_to(2);
    self.count += 2;
    Ok(())
  }

  fn serialize_u32(self, _v: u32) -> Result<()> {
    self.pad_to(4);
    self.count += 4;
    Ok(())
  }

  fn serialize_u64(self, _v: u64) -> Result<()> {
    self.pad_to(8);
    self.count += 8;
    Ok(())
  }

  fn serialize_i8(self, _v: i8) -> Result<()> {
    self.count += 1;
    Ok(())
  }

  fn serialize_i16(self, _v: i16) -> Result<()> {
    self.pad_to(2);
    self.count += 2;
    Ok(())
  }

  fn serialize_i32(self, _v: i32) -> Result<()> {
    self.pad_to(4);
    self.count += 4;
    Ok(())
  }

  fn serialize_i64(self, _v: i64) -> Result<()> {
    self.pad_to(8);
    self.count += 8;
    Ok(())
  }

  fn serialize_f32(self, _v: f32) -> Result<()> {
    self.pad_to(4);
    self.count += 4;
    Ok(())
  }

  fn serialize_f64(self, _v: f64) -> Result<()> {
    self.pad_to(8);
    self.count += 8;
    Ok(())
  }

  fn serialize_char(self, v: char) -> Result<()> {
    let codepoint = v as u32;
    if codepoint > 0xFF {
      return Err(Error::BadChar(codepoint));
    }
    self.count += 1;
    Ok(())
  }

  fn serialize_str(self, v: &str) -> Result<()> {
    self.pad_to(4);
    self.count += 4 + v.len() + 1;
    Ok(())
  }

  fn serialize_bytes(self, v: &[u8]) -> Result<()> {
    self.count += v.len();
    Ok(())
  }

  fn serialize_none(self) -> Result<()> {
    self.serialize_u32(0)
  }

  fn serialize_some<T>(self, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    self.serialize_u32(1)?;
    value.serialize(self)
  }

  fn serialize_unit(self) -> Result<()> {
    Ok(())
  }

  fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
    Ok(())
  }

  fn serialize_unit_variant(
    self,
    _name: &'static str,
    variant_index: u32,
    _variant: &'static str,
  ) -> Result<()> {
    self.serialize_u32(variant_index)
  }

  fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(self)
  }

  fn serialize_newtype_variant<T>(
    self,
    _name: &'static str,
    variant_index: u32,
    _variant: &'static str,
    value: &T,
  ) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    self.serialize_u32(variant_index)?;
    value.serialize(self)
  }

  fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
    match len {
      None => Err(Error::SequenceLengthUnknown),
      Some(elem_count) => {
        self.serialize_u32(elem_count as u32)?;
        Ok(self)
      }
    }
  }

  fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
    Ok(self)
  }

  fn serialize_tuple_struct(
    self,
    _name: &'static str,
    _len: usize,
  ) -> Result<Self::SerializeTupleStruct> {
    Ok(self)
  }

  fn serialize_tuple_variant(
    self,
    _name: &'static str,
    variant_index: u32,
    _variant: &'static str,
    _len: usize,
  ) -> Result<Self::SerializeTupleVariant> {
    self.serialize_u32(variant_index)?;
    Ok(self)
  }

  fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
    Ok(self)
  }

  fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
    Ok(self)
  }

  fn serialize_struct_variant(
    self,
    _name: &'static str,
    variant_index: u32,
    _variant: &'static str,
    _len: usize,
  ) -> Result<Self::SerializeStructVariant> {
    self.serialize_u32(variant_index)?;
    Ok(self)
  }
}

impl<'a, BO> ser::SerializeSeq for &'a mut SizeCounter<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_element<T>(&mut self, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}

impl<'a, BO> ser::SerializeTuple for &'a mut SizeCounter<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_element<T>(&mut self, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}

impl<'a, BO> ser::SerializeTupleStruct for &'a mut SizeCounter<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_field<T>(&mut self, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}

impl<'a, BO> ser::SerializeTupleVariant for &'a mut SizeCounter<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_field<T>(&mut self, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}

impl<'a, BO> ser::SerializeMap for &'a mut SizeCounter<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_key<T>(&mut self, key: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    key.serialize(&mut **self)
  }

  fn serialize_value<T>(&mut self, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}

impl<'a, BO> ser::SerializeStruct for &'a mut SizeCounter<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_field<T>(&mut self, _key: &'static str, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}

impl<'a, BO> ser::SerializeStructVariant for &'a mut SizeCounter<BO>
where
  BO: ByteOrder,
{
  type Ok = ();
  type Error = Error;

  fn serialize_field<T>(&mut self, _key: &'static str, value: &T) -> Result<()>
  where
    T: ?Sized + Serialize,
  {
    value.serialize(&mut **self)
  }

  fn end(self) -> Result<()> {
    Ok(())
  }
}
