use crate::structure::duration::Duration;

/// Utility for building [QosPolicies]
#[derive(Default)]
pub struct QosPolicyBuilder {
  durability: Option<policy::Durability>,
  reliability: Option<policy::Reliability>,
  history: Option<policy::History>,
  resource_limits: Option<policy::ResourceLimits>,
}

impl QosPolicyBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub const fn durability(mut self, durability: policy::Durability) -> Self {
    self.durability = Some(durability);
    self
  }

  #[must_use]
  pub const fn reliability(mut self, reliability: policy::Reliability) -> Self {
    self.reliability = Some(reliability);
    self
  }

  #[must_use]
  pub const fn history(mut self, history: policy::History) -> Self {
    self.history = Some(history);
    self
  }

  #[must_use]
  pub const fn resource_limits(mut self, resource_limits: policy::ResourceLimits) -> Self {
    self.resource_limits = Some(resource_limits);
    self
  }

  pub const fn build(self) -> QosPolicies {
    QosPolicies {
      durability: self.durability,
      reliability: self.reliability,
      history: self.history,
      resource_limits: self.resource_limits,
    }
  }
}

/// Describes the set of QoS policies a writer-side sample queue honors.
///
/// QosPolicies are constructed using a [`QosPolicyBuilder`]. A policy left
/// unset takes its DDS default: volatile durability, best-effort
/// reliability, KEEP_LAST with depth 1, and unlimited resource limits.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct QosPolicies {
  pub(crate) durability: Option<policy::Durability>,
  pub(crate) reliability: Option<policy::Reliability>,
  pub(crate) history: Option<policy::History>,
  pub(crate) resource_limits: Option<policy::ResourceLimits>,
}

impl QosPolicies {
  pub fn qos_none() -> Self {
    Self::default()
  }

  pub fn builder() -> QosPolicyBuilder {
    QosPolicyBuilder::new()
  }

  pub const fn durability(&self) -> Option<policy::Durability> {
    self.durability
  }

  pub const fn reliability(&self) -> Option<policy::Reliability> {
    self.reliability
  }

  pub fn is_reliable(&self) -> bool {
    matches!(
      self.reliability,
      Some(policy::Reliability::Reliable { .. })
    )
  }

  /// Durable writers keep delivered samples around for late joiners.
  pub fn is_durable(&self) -> bool {
    matches!(
      self.durability,
      Some(policy::Durability::TransientLocal)
        | Some(policy::Durability::Transient)
        | Some(policy::Durability::Persistent)
    )
  }

  pub const fn reliable_max_blocking_time(&self) -> Option<Duration> {
    if let Some(policy::Reliability::Reliable { max_blocking_time }) = self.reliability {
      Some(max_blocking_time)
    } else {
      None
    }
  }

  pub const fn history(&self) -> Option<policy::History> {
    self.history
  }

  pub const fn resource_limits(&self) -> Option<policy::ResourceLimits> {
    self.resource_limits
  }
}

pub mod policy {
  use std::cmp::Ordering;

  use serde::{Deserialize, Serialize};

  use crate::structure::duration::Duration;

  /// DDS 2.2.3.4 DURABILITY
  #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
  pub enum Durability {
    Volatile,
    TransientLocal,
    Transient,
    Persistent,
  }

  /// DDS 2.2.3.14 RELIABILITY
  #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
  pub enum Reliability {
    BestEffort,
    Reliable { max_blocking_time: Duration },
  }

  impl Ord for Reliability {
    // max_blocking_time is not compared.
    fn cmp(&self, other: &Self) -> Ordering {
      match (self, other) {
        (Self::BestEffort, Self::BestEffort) | (Self::Reliable { .. }, Self::Reliable { .. }) => {
          Ordering::Equal
        }
        (Self::BestEffort, Self::Reliable { .. }) => Ordering::Less,
        (Self::Reliable { .. }, Self::BestEffort) => Ordering::Greater,
      }
    }
  }

  impl PartialOrd for Reliability {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
      Some(self.cmp(other))
    }
  }

  /// DDS 2.2.3.18 HISTORY
  #[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, PartialOrd, Ord)]
  pub enum History {
    // Variants must be in this order to derive Ord correctly.
    KeepLast { depth: i32 },
    KeepAll,
  }

  /// DDS 2.2.3.19 RESOURCE_LIMITS
  ///
  /// DDS Spec v1.4 p.147 "struct ResourceLimitsQosPolicy" defines the
  /// fields as "long". Negative values encode the special value
  /// `const long LENGTH_UNLIMITED = -1`.
  #[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
  pub struct ResourceLimits {
    pub max_samples: i32,
    pub max_instances: i32,
    pub max_samples_per_instance: i32,
  }

  impl ResourceLimits {
    pub const LENGTH_UNLIMITED: i32 = -1;

    pub const fn unlimited() -> ResourceLimits {
      ResourceLimits {
        max_samples: Self::LENGTH_UNLIMITED,
        max_instances: Self::LENGTH_UNLIMITED,
        max_samples_per_instance: Self::LENGTH_UNLIMITED,
      }
    }
  }

  impl Default for ResourceLimits {
    fn default() -> ResourceLimits {
      ResourceLimits::unlimited()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{policy::*, *};

  #[test]
  fn builder_collects_policies() {
    let qos = QosPolicies::builder()
      .durability(Durability::TransientLocal)
      .reliability(Reliability::Reliable {
        max_blocking_time: Duration::from_millis(100),
      })
      .history(History::KeepLast { depth: 4 })
      .build();

    assert!(qos.is_reliable());
    assert!(qos.is_durable());
    assert_eq!(
      qos.reliable_max_blocking_time(),
      Some(Duration::from_millis(100))
    );
    assert_eq!(qos.history(), Some(History::KeepLast { depth: 4 }));
    assert_eq!(qos.resource_limits(), None);
  }

  #[test]
  fn default_qos_is_best_effort_volatile() {
    let qos = QosPolicies::qos_none();
    assert!(!qos.is_reliable());
    assert!(!qos.is_durable());
    assert_eq!(qos.reliable_max_blocking_time(), None);
  }

  #[test]
  fn history_ordering() {
    assert!(History::KeepLast { depth: 1 } < History::KeepAll);
    assert!(History::KeepLast { depth: 1 } < History::KeepLast { depth: 2 });
  }
}
