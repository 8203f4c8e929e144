use std::convert::From;
use std::time::{SystemTime, UNIX_EPOCH};

use speedy::{Readable, Writable};

/// The representation of the time is the one defined by the IETF Network Time
/// Protocol (NTP) Standard (IETF RFC 1305). In this representation, time is
/// expressed in seconds and fraction of seconds using the formula:
/// time = seconds + (fraction / 2^(32))
///
/// This representation is used for sample source timestamps.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Readable, Writable, Clone, Copy)]
pub struct Time {
  seconds: i32,
  fraction: u32,
}

pub type Timestamp = Time;

const NANOS_PER_SEC: i64 = 1_000_000_000;

impl Time {
  pub const TIME_ZERO: Time = Time {
    seconds: 0,
    fraction: 0,
  };
  pub const TIME_INVALID: Time = Time {
    seconds: -1,
    fraction: 0xFFFF_FFFF,
  };
  pub const TIME_INFINITE: Time = Time {
    seconds: 0x7FFF_FFFF,
    fraction: 0xFFFF_FFFF,
  };

  pub fn now() -> Time {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
      Ok(elapsed) => Time {
        seconds: elapsed.as_secs() as i32,
        fraction: ((i64::from(elapsed.subsec_nanos()) << 32) / NANOS_PER_SEC) as u32,
      },
      // clock before the epoch, not meaningfully representable
      Err(_) => Time::TIME_INVALID,
    }
  }
}

impl From<SystemTime> for Time {
  fn from(system_time: SystemTime) -> Self {
    match system_time.duration_since(UNIX_EPOCH) {
      Ok(elapsed) => Time {
        seconds: elapsed.as_secs() as i32,
        fraction: ((i64::from(elapsed.subsec_nanos()) << 32) / NANOS_PER_SEC) as u32,
      },
      Err(_) => Time::TIME_INVALID,
    }
  }
}
