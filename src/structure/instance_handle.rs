use std::fmt;

/// Opaque per-writer handle identifying a registered instance.
///
/// Handles are small integers allocated by the container. `HANDLE_NIL`
/// never identifies an instance; passing it to an operation that needs
/// an existing instance yields `Error::BadParameter`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceHandle(i32);

impl InstanceHandle {
  pub const HANDLE_NIL: InstanceHandle = InstanceHandle(0);

  pub fn new(value: i32) -> InstanceHandle {
    InstanceHandle(value)
  }

  pub fn is_nil(&self) -> bool {
    *self == InstanceHandle::HANDLE_NIL
  }

  /// The next handle in allocation order.
  pub fn next(&self) -> InstanceHandle {
    InstanceHandle(self.0.wrapping_add(1))
  }
}

impl Default for InstanceHandle {
  fn default() -> InstanceHandle {
    InstanceHandle::HANDLE_NIL
  }
}

impl fmt::Display for InstanceHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn nil_handle_is_default() {
    assert_eq!(InstanceHandle::default(), InstanceHandle::HANDLE_NIL);
    assert!(InstanceHandle::default().is_nil());
  }

  #[test]
  fn next_is_not_nil() {
    let h = InstanceHandle::HANDLE_NIL.next();
    assert!(!h.is_nil());
    assert_ne!(h, h.next());
  }
}
