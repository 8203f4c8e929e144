use std;
use std::fmt::{self, Display};

use serde::{de, ser};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
  // Variants created by data structures through the `ser::Error` and
  // `de::Error` traits.
  Message(String),
  IOError(std::io::Error),
  SequenceLengthUnknown,
  // Variants created directly by the serializer and deserializer.
  Eof,
  BadBoolean(u8),
  BadString(std::str::Utf8Error), // was not valid UTF-8
  BadChar(u32),                   // invalid Unicode codepoint
  BadOption(u32),                 // Option tag was not 0 or 1
  TrailingCharacters(Vec<u8>),
}

impl ser::Error for Error {
  fn custom<T: Display>(msg: T) -> Self {
    Error::Message(msg.to_string())
  }
}

impl de::Error for Error {
  fn custom<T: Display>(msg: T) -> Self {
    Error::Message(msg.to_string())
  }
}

impl Display for Error {
  fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Error::Message(msg) => formatter.write_str(msg),
      Error::Eof => formatter.write_str("unexpected end of input"),
      Error::IOError(e) => formatter.write_fmt(format_args!("io::Error: {:?}", e)),
      Error::SequenceLengthUnknown => formatter
        .write_str("CDR serialization requires sequence length to be specified at the start."),
      Error::BadChar(e) => formatter.write_fmt(format_args!("Bad Unicode character code: {:?}", e)),
      Error::BadOption(e) => {
        formatter.write_fmt(format_args!("Expected 0 or 1 as Option tag, got: {:?}", e))
      }
      Error::BadBoolean(e) => {
        formatter.write_fmt(format_args!("Expected 0 or 1 as Boolean, got: {:?}", e))
      }
      Error::TrailingCharacters(vec) => {
        formatter.write_fmt(format_args!("Trailing garbage, {:?} bytes", vec.len()))
      }
      Error::BadString(utf_err) => formatter.write_fmt(format_args!("UTF-8 error: {:?}", utf_err)),
    }
  }
}

impl From<std::io::Error> for Error {
  fn from(ioerr: std::io::Error) -> Error {
    Error::IOError(ioerr)
  }
}

impl std::error::Error for Error {}
