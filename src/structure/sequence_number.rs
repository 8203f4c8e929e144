use std::{cmp::Ordering, fmt};

use speedy::{Context, Readable, Reader, Writable, Writer};

/// DDS sample sequence number.
///
/// Stored as a split high/low pair as on the wire: a signed 32-bit high
/// word and an unsigned 32-bit low word, together representing the 64-bit
/// value `high * 2^32 + low`. The high word is serialized first in both
/// endiannesses.
///
/// Valid sequence numbers run from `MIN` (0,0) through `MAX`
/// (`i32::MAX`, `u32::MAX`); the first number a writer assigns is
/// `INITIAL` (0,1). The only representable value with a negative high
/// word is `UNKNOWN` (-1,0).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SequenceNumber {
  high: i32,
  low: u32,
}

impl SequenceNumber {
  pub const UNKNOWN: Self = Self { high: -1, low: 0 };
  pub const MIN: Self = Self { high: 0, low: 0 };
  pub const INITIAL: Self = Self { high: 0, low: 1 };
  pub const MAX: Self = Self {
    high: i32::MAX,
    low: u32::MAX,
  };

  pub fn new(high: i32, low: u32) -> Self {
    Self { high, low }
  }

  pub fn high(&self) -> i32 {
    self.high
  }

  pub fn low(&self) -> u32 {
    self.low
  }

  /// The successor in writer assignment order.
  ///
  /// Carries the low word into the high word on overflow, and wraps from
  /// `MAX` back to `INITIAL` so the 64-bit space is a cycle that skips
  /// `MIN` and `UNKNOWN`.
  pub fn next(&self) -> Self {
    if *self == Self::MAX {
      return Self::INITIAL;
    }
    match self.low.checked_add(1) {
      Some(low) => Self {
        high: self.high,
        low,
      },
      None => Self {
        high: self.high + 1,
        low: 0,
      },
    }
  }

  /// The predecessor in writer assignment order, inverse of [`next`].
  ///
  /// Borrows from the high word when the low word is zero, and wraps from
  /// `MIN` to `MAX`.
  ///
  /// [`next`]: Self::next
  pub fn previous(&self) -> Self {
    if *self == Self::MIN {
      return Self::MAX;
    }
    match self.low.checked_sub(1) {
      Some(low) => Self {
        high: self.high,
        low,
      },
      None => Self {
        high: self.high - 1,
        low: u32::MAX,
      },
    }
  }
}

impl Default for SequenceNumber {
  /// A fresh writer starts at `INITIAL`.
  fn default() -> Self {
    Self::INITIAL
  }
}

impl Ord for SequenceNumber {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .high
      .cmp(&other.high)
      .then_with(|| self.low.cmp(&other.low))
  }
}

impl PartialOrd for SequenceNumber {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl From<i64> for SequenceNumber {
  fn from(value: i64) -> Self {
    Self {
      high: (value >> 32) as i32,
      low: value as u32,
    }
  }
}

impl From<SequenceNumber> for i64 {
  fn from(sn: SequenceNumber) -> Self {
    ((sn.high as i64) << 32) | (sn.low as i64)
  }
}

impl fmt::Display for SequenceNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", i64::from(*self))
  }
}

impl<'a, C: Context> Readable<'a, C> for SequenceNumber {
  fn read_from<R: Reader<'a, C>>(reader: &mut R) -> Result<Self, C::Error> {
    let high = reader.read_i32()?;
    let low = reader.read_u32()?;
    Ok(Self { high, low })
  }
}

impl<C: Context> Writable<C> for SequenceNumber {
  fn write_to<T: ?Sized + Writer<C>>(&self, writer: &mut T) -> Result<(), C::Error> {
    writer.write_i32(self.high)?;
    writer.write_u32(self.low)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  serialization_test!( type = SequenceNumber,
  {
    sequence_number_default,
    SequenceNumber::default(),
    le = [0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00],
    be = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]
  },
  {
    sequence_number_unknown,
    SequenceNumber::UNKNOWN,
    le = [0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00],
    be = [0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00]
  },
  {
    sequence_number_non_zero,
    SequenceNumber::from(0x0011_2233_4455_6677),
    le = [0x33, 0x22, 0x11, 0x00, 0x77, 0x66, 0x55, 0x44],
    be = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]
  });

  #[test]
  fn next_carries_low_into_high() {
    let sn = SequenceNumber::new(4, u32::MAX);
    assert_eq!(sn.next(), SequenceNumber::new(5, 0));
  }

  #[test]
  fn next_wraps_max_to_initial() {
    assert_eq!(SequenceNumber::MAX.next(), SequenceNumber::INITIAL);
  }

  #[test]
  fn previous_borrows_from_high() {
    let sn = SequenceNumber::new(5, 0);
    assert_eq!(sn.previous(), SequenceNumber::new(4, u32::MAX));
  }

  #[test]
  fn previous_wraps_min_to_max() {
    assert_eq!(SequenceNumber::MIN.previous(), SequenceNumber::MAX);
  }

  #[test]
  fn next_and_previous_are_inverse() {
    // the wrap points are asymmetric (MAX.next() is INITIAL but
    // INITIAL.previous() is MIN), so only interior values are inverses
    for sn in [
      SequenceNumber::INITIAL,
      SequenceNumber::new(0, u32::MAX),
      SequenceNumber::new(7, 0),
      SequenceNumber::new(i32::MAX, u32::MAX - 1),
    ]
    .iter()
    {
      assert_eq!(sn.next().previous(), *sn);
      assert_eq!(sn.previous().next(), *sn);
    }
  }

  #[test]
  fn ordering_is_high_then_low() {
    assert!(SequenceNumber::new(1, 0) > SequenceNumber::new(0, u32::MAX));
    assert!(SequenceNumber::new(3, 4) < SequenceNumber::new(3, 5));
    assert!(SequenceNumber::UNKNOWN < SequenceNumber::MIN);
  }

  #[test]
  fn i64_round_trip() {
    for v in [0i64, 1, 0x1_0000_0000, 0x0011_2233_4455_6677, i64::from(SequenceNumber::MAX)].iter() {
      assert_eq!(i64::from(SequenceNumber::from(*v)), *v);
    }
  }
}
