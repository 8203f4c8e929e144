use bytes::Bytes;

use crate::{
  dds::{ddsdata::DDSData, sample_element::ElementId},
  structure::{guid::GUID, instance_handle::InstanceHandle, sequence_number::SequenceNumber,
    time::Timestamp},
};

/// One sample handed to the transport for sending.
///
/// `data` shares payload storage with the retained element, so cloning this
/// is cheap and the transport may hold it across the send without copying.
#[derive(Debug, Clone)]
pub struct TransportSample {
  pub element: ElementId,
  pub handle: InstanceHandle,
  pub sequence_number: SequenceNumber,
  pub source_timestamp: Timestamp,
  pub data: DDSData,
  /// Empty means all matched readers; non-empty means a directed resend.
  pub addressed_readers: Vec<GUID>,
}

impl TransportSample {
  pub fn payload(&self) -> Bytes {
    self.data.payload().clone()
  }
}

/// The send side the container asks for buffer reclamation.
///
/// Contract: for every element the container has handed out through
/// `get_unsent_data` or a resend batch, the transport eventually reports
/// exactly one of `data_delivered` or `data_dropped` back to the
/// container. `remove_sample` must not invoke either callback
/// synchronously from within the call; the container holds its lock while
/// asking, and a refused removal is parked until the eventual callback.
pub trait TransportClient {
  /// Ask the transport to abandon a pending send. Returns `true` if the
  /// transport no longer references the element, `false` if the send is
  /// already in flight and the element must wait for its callback.
  fn remove_sample(&self, element: ElementId) -> bool;

  /// Ask the transport to abandon every pending send of this writer.
  /// When this returns, the transport references no element of the writer
  /// and will issue no further callbacks for it.
  fn remove_all_samples(&self);
}
