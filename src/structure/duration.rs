use std::convert::From;
use std::time::Duration as TDuration;

use serde::{Deserialize, Serialize};
use speedy::{Readable, Writable};

#[derive(
  Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Readable, Writable, Serialize, Deserialize, Copy, Clone,
)]
pub struct Duration {
  seconds: i32,
  fraction: u32,
}

impl Duration {
  pub const DURATION_ZERO: Duration = Duration {
    seconds: 0,
    fraction: 0,
  };
  pub const DURATION_INVALID: Duration = Duration {
    seconds: -1,
    fraction: 0xFFFFFFFF,
  };
  pub const DURATION_INFINITE: Duration = Duration {
    seconds: 0x7FFFFFFF,
    fraction: 0xFFFFFFFF,
  };

  pub fn from_secs(secs: i32) -> Duration {
    Duration {
      seconds: secs,
      fraction: 0,
    }
  }

  pub fn from_millis(millis: u64) -> Duration {
    TDuration::from_millis(millis).into()
  }

  pub fn is_infinite(&self) -> bool {
    *self == Duration::DURATION_INFINITE
  }
}

impl From<TDuration> for Duration {
  fn from(duration: TDuration) -> Self {
    Duration {
      seconds: duration.as_secs() as i32,
      fraction: duration.subsec_nanos() as u32,
    }
  }
}

impl From<Duration> for TDuration {
  fn from(duration: Duration) -> Self {
    TDuration::new(duration.seconds as u64, duration.fraction)
  }
}
