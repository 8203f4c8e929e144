use std::{collections::BTreeMap, marker::PhantomData, sync::Arc};

use bytes::Bytes;
use log::debug;
use serde::Serialize;

use crate::{
  dds::{
    adapters::with_key::SerializerAdapter,
    ddsdata::DDSData,
    key::{Key, Keyed},
    qos::QosPolicies,
    result::Result,
    write_data_container::{ContainerConfig, WriteDataContainer},
  },
  serialization::CDRSerializerAdapter,
  structure::{
    guid::GUID, instance_handle::InstanceHandle, sequence_number::SequenceNumber, time::Timestamp,
  },
  transport::TransportClient,
};

/// Typed writer endpoint.
///
/// Serializes application samples through the adapter `SA` and queues them
/// in a [`WriteDataContainer`] for the transport to pick up. The container
/// is shared behind an `Arc` so the transport callback side can address it
/// without going through the writer.
pub struct DataWriter<D, SA = CDRSerializerAdapter<D>>
where
  D: Keyed + Serialize,
  <D as Keyed>::K: Key,
  SA: SerializerAdapter<D>,
{
  publication_id: GUID,
  qos: QosPolicies,
  container: Arc<WriteDataContainer>,
  last_sequence_number: SequenceNumber,
  instance_handles: BTreeMap<D::K, InstanceHandle>,
  phantom: PhantomData<SA>,
}

impl<D, SA> DataWriter<D, SA>
where
  D: Keyed + Serialize,
  <D as Keyed>::K: Key,
  SA: SerializerAdapter<D>,
{
  pub fn new(publication_id: GUID, qos: QosPolicies, n_chunks: usize) -> DataWriter<D, SA> {
    let config = ContainerConfig::from_qos(&qos, n_chunks);
    DataWriter {
      publication_id,
      qos,
      container: Arc::new(WriteDataContainer::new(publication_id, config)),
      last_sequence_number: SequenceNumber::MIN,
      instance_handles: BTreeMap::new(),
      phantom: PhantomData,
    }
  }

  pub fn publication_id(&self) -> GUID {
    self.publication_id
  }

  pub fn qos(&self) -> &QosPolicies {
    &self.qos
  }

  /// The send side pumps batches out of this container and reports
  /// delivery back into it.
  pub fn container(&self) -> &Arc<WriteDataContainer> {
    &self.container
  }

  /// Serialize and queue one sample. Writing implicitly (re)registers the
  /// sample's instance. The sequence number advances only when the sample
  /// is accepted.
  pub fn write(
    &mut self,
    sample: &D,
    source_timestamp: Option<Timestamp>,
    transport: &dyn TransportClient,
  ) -> Result<()> {
    let data = DDSData::new(SA::output_encoding(), SA::to_bytes(sample)?);
    let handle = self.register_key(&sample.get_key())?;
    let element = self.container.obtain_buffer(handle, transport)?;
    let sequence_number = self.last_sequence_number.next();
    let timestamp = source_timestamp.unwrap_or_else(Timestamp::now);
    match self
      .container
      .enqueue(element, handle, data, sequence_number, timestamp)
    {
      Ok(()) => {
        self.last_sequence_number = sequence_number;
        debug!(
          "write: instance {} sn {}",
          handle, sequence_number
        );
        Ok(())
      }
      Err(e) => {
        self.container.release_buffer(element);
        Err(e)
      }
    }
  }

  pub fn register_instance(&mut self, sample: &D) -> Result<InstanceHandle> {
    self.register_key(&sample.get_key())
  }

  pub fn unregister_instance(
    &mut self,
    key: &D::K,
    transport: &dyn TransportClient,
  ) -> Result<Option<Bytes>> {
    let handle = self.lookup_handle(key)?;
    self.container.unregister(handle, transport, true)
  }

  pub fn dispose(
    &mut self,
    key: &D::K,
    transport: &dyn TransportClient,
  ) -> Result<Option<Bytes>> {
    let handle = self.lookup_handle(key)?;
    self.container.dispose(handle, transport, true)
  }

  pub fn num_samples(&self, key: &D::K) -> Result<usize> {
    let handle = self.lookup_handle(key)?;
    self.container.num_samples(handle)
  }

  pub fn lookup_instance(&self, key: &D::K) -> Option<InstanceHandle> {
    self.instance_handles.get(key).copied()
  }

  /// Queue durable history for newly matched readers.
  pub fn reenqueue_all(&self, reader_ids: &[GUID]) {
    self.container.reenqueue_all(reader_ids);
  }

  /// Block until everything queued or in flight has been resolved.
  pub fn wait_pending(&self) {
    self.container.wait_pending();
  }

  /// Tear down the container. Every retained sample is released and all
  /// blocked writes fail; the writer is unusable afterwards.
  pub fn close(&self, transport: &dyn TransportClient) {
    self.container.unregister_all(transport);
  }

  fn register_key(&mut self, key: &D::K) -> Result<InstanceHandle> {
    let key_bytes = SA::key_to_bytes(key)?;
    match self.instance_handles.get(key) {
      Some(&handle) => self.container.register_instance(Some(handle), key_bytes),
      None => {
        let handle = self.container.register_instance(None, key_bytes)?;
        debug!(
          "registered instance {} for key hash {:x}",
          handle,
          key.into_hash_key()
        );
        self.instance_handles.insert(key.clone(), handle);
        Ok(handle)
      }
    }
  }

  fn lookup_handle(&self, key: &D::K) -> Result<InstanceHandle> {
    self
      .instance_handles
      .get(key)
      .copied()
      .ok_or(crate::dds::result::Error::BadParameter)
  }
}
