use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  thread,
  time::{Duration as StdDuration, Instant},
};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use dds_writequeue::{
  dds::{
    ddsdata::DDSData,
    qos::policy::{Durability, History, Reliability, ResourceLimits},
    sample_element::ElementId,
  },
  serialization::RepresentationIdentifier,
  structure::{
    duration::Duration, guid::GUID, instance_handle::InstanceHandle, time::Timestamp,
  },
  transport::TransportClient,
  ContainerConfig, DataWriter, Error, Keyed, QosPolicies, SequenceNumber, WriteDataContainer,
};

fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

/// Transport stub that consents to sample removal and counts the requests.
struct CountingTransport {
  removals: AtomicUsize,
}

impl CountingTransport {
  fn new() -> CountingTransport {
    CountingTransport {
      removals: AtomicUsize::new(0),
    }
  }
}

impl TransportClient for CountingTransport {
  fn remove_sample(&self, _element: ElementId) -> bool {
    self.removals.fetch_add(1, Ordering::SeqCst);
    true
  }
  fn remove_all_samples(&self) {}
}

/// Transport stub that refuses removal, as if the sample were already in
/// flight on the wire.
struct BusyTransport;

impl TransportClient for BusyTransport {
  fn remove_sample(&self, _element: ElementId) -> bool {
    false
  }
  fn remove_all_samples(&self) {}
}

fn payload(tag: u8) -> DDSData {
  DDSData::new(
    RepresentationIdentifier::CDR_LE,
    Bytes::from(vec![tag, 0, 0, 0]),
  )
}

fn container_with(qos: &QosPolicies) -> WriteDataContainer {
  WriteDataContainer::new(GUID::new(), ContainerConfig::from_qos(qos, 8))
}

fn write_tag(
  container: &WriteDataContainer,
  handle: InstanceHandle,
  transport: &dyn TransportClient,
  sn: SequenceNumber,
  tag: u8,
) -> ElementId {
  let element = container.obtain_buffer(handle, transport).unwrap();
  container
    .enqueue(element, handle, payload(tag), sn, Timestamp::now())
    .unwrap();
  element
}

#[derive(Serialize, Deserialize, Clone)]
struct Reading {
  sensor: String,
  value: i32,
}

impl Keyed for Reading {
  type K = String;
  fn get_key(&self) -> String {
    self.sensor.clone()
  }
}

#[test]
fn keep_last_depth_retains_newest_in_write_order() {
  init_logger();
  let qos = QosPolicies::builder()
    .history(History::KeepLast { depth: 3 })
    .build();
  let mut writer: DataWriter<Reading> = DataWriter::new(GUID::new(), qos, 8);
  let transport = CountingTransport::new();

  for value in 1..=5 {
    let sample = Reading {
      sensor: "a".to_string(),
      value,
    };
    writer.write(&sample, None, &transport).unwrap();
  }
  assert_eq!(writer.num_samples(&"a".to_string()).unwrap(), 3);

  let (_, batch) = writer.container().get_unsent_data();
  let sns: Vec<i64> = batch.iter().map(|s| i64::from(s.sequence_number)).collect();
  // the two oldest were evicted, the survivors stay in write order
  assert_eq!(sns, vec![3, 4, 5]);
}

#[test]
fn blocked_write_resumes_on_delivery() {
  init_logger();
  let qos = QosPolicies::builder()
    .history(History::KeepAll)
    .reliability(Reliability::Reliable {
      max_blocking_time: Duration::from_millis(2000),
    })
    .resource_limits(ResourceLimits {
      max_samples: ResourceLimits::LENGTH_UNLIMITED,
      max_instances: ResourceLimits::LENGTH_UNLIMITED,
      max_samples_per_instance: 2,
    })
    .build();
  let container = Arc::new(container_with(&qos));
  let transport = CountingTransport::new();
  let handle = container
    .register_instance(None, Bytes::from_static(b"key"))
    .unwrap();

  let mut sn = SequenceNumber::default();
  write_tag(&container, handle, &transport, sn, 1);
  sn = sn.next();
  write_tag(&container, handle, &transport, sn, 2);
  sn = sn.next();
  let (_, batch) = container.get_unsent_data();
  assert_eq!(batch.len(), 2);

  let first = batch[0].element;
  let deliverer = {
    let container = Arc::clone(&container);
    thread::spawn(move || {
      thread::sleep(StdDuration::from_millis(50));
      container.data_delivered(first).unwrap();
    })
  };

  // instance is at its bound, so this write blocks until the delivery frees
  // a slot
  let start = Instant::now();
  let element = container.obtain_buffer(handle, &transport).unwrap();
  let blocked_for = start.elapsed();
  assert!(blocked_for < StdDuration::from_millis(2000));
  container
    .enqueue(element, handle, payload(3), sn, Timestamp::now())
    .unwrap();
  deliverer.join().unwrap();
  assert_eq!(container.num_samples(handle).unwrap(), 2);
}

#[test]
fn blocked_write_times_out() {
  init_logger();
  let qos = QosPolicies::builder()
    .history(History::KeepAll)
    .reliability(Reliability::Reliable {
      max_blocking_time: Duration::from_millis(100),
    })
    .resource_limits(ResourceLimits {
      max_samples: ResourceLimits::LENGTH_UNLIMITED,
      max_instances: ResourceLimits::LENGTH_UNLIMITED,
      max_samples_per_instance: 1,
    })
    .build();
  let container = container_with(&qos);
  let transport = CountingTransport::new();
  let handle = container
    .register_instance(None, Bytes::from_static(b"key"))
    .unwrap();
  write_tag(&container, handle, &transport, SequenceNumber::default(), 1);

  let start = Instant::now();
  let result = container.obtain_buffer(handle, &transport);
  assert!(matches!(result, Err(Error::Timeout)));
  assert!(start.elapsed() >= StdDuration::from_millis(100));
}

#[test]
fn shutdown_fails_blocked_writes() {
  init_logger();
  let qos = QosPolicies::builder()
    .history(History::KeepAll)
    .reliability(Reliability::Reliable {
      max_blocking_time: Duration::from_millis(10_000),
    })
    .resource_limits(ResourceLimits {
      max_samples: ResourceLimits::LENGTH_UNLIMITED,
      max_instances: ResourceLimits::LENGTH_UNLIMITED,
      max_samples_per_instance: 1,
    })
    .build();
  let container = Arc::new(container_with(&qos));
  let transport = CountingTransport::new();
  let handle = container
    .register_instance(None, Bytes::from_static(b"key"))
    .unwrap();
  write_tag(&container, handle, &transport, SequenceNumber::default(), 1);

  let blocked = {
    let container = Arc::clone(&container);
    thread::spawn(move || {
      let transport = CountingTransport::new();
      container.obtain_buffer(handle, &transport)
    })
  };
  thread::sleep(StdDuration::from_millis(50));
  container.unregister_all(&transport);
  let result = blocked.join().unwrap();
  assert!(matches!(result, Err(Error::Timeout)));
  assert_eq!(container.num_all_samples(), 0);
}

#[test]
fn unregister_keeps_registry_entry() {
  init_logger();
  let qos = QosPolicies::builder()
    .history(History::KeepLast { depth: 5 })
    .build();
  let container = container_with(&qos);
  let transport = CountingTransport::new();
  let handle = container
    .register_instance(None, Bytes::from_static(b"key"))
    .unwrap();
  write_tag(&container, handle, &transport, SequenceNumber::default(), 1);

  let key = container.unregister(handle, &transport, true).unwrap();
  assert_eq!(key, Some(Bytes::from_static(b"key")));
  // entry still answers, with an empty chain
  assert_eq!(container.num_samples(handle).unwrap(), 0);
  assert_eq!(
    container
      .register_instance(Some(handle), Bytes::from_static(b"key"))
      .unwrap(),
    handle
  );
}

#[test]
fn reenqueue_all_copies_durable_history() {
  init_logger();
  let qos = QosPolicies::builder()
    .durability(Durability::TransientLocal)
    .history(History::KeepLast { depth: 10 })
    .build();
  let container = container_with(&qos);
  let transport = CountingTransport::new();
  let handle = container
    .register_instance(None, Bytes::from_static(b"key"))
    .unwrap();

  let mut sn = SequenceNumber::default();
  write_tag(&container, handle, &transport, sn, 1);
  sn = sn.next();
  write_tag(&container, handle, &transport, sn, 2);
  let (_, batch) = container.get_unsent_data();
  for sample in &batch {
    container.data_delivered(sample.element).unwrap();
  }
  assert_eq!(container.get_sent_data().len(), 2);

  let late_reader = GUID::new();
  container.reenqueue_all(&[late_reader]);
  // copies wait on the resend list until the next batch is pulled
  let queued = container.get_resend_data();
  assert_eq!(queued.len(), 2);
  assert!(queued.iter().all(|s| s.addressed_readers == [late_reader]));
  let (_, resend) = container.get_unsent_data();
  assert!(container.get_resend_data().is_empty());
  assert_eq!(resend.len(), 2);
  for (copy, original) in resend.iter().zip(batch.iter()) {
    assert_eq!(copy.addressed_readers, vec![late_reader]);
    assert_eq!(copy.sequence_number, original.sequence_number);
    // payload storage is shared, not duplicated
    assert_eq!(
      copy.data.payload().as_ptr(),
      original.data.payload().as_ptr()
    );
  }

  // delivering the copies releases them without touching the originals
  for copy in &resend {
    container.data_delivered(copy.element).unwrap();
  }
  assert_eq!(container.get_sent_data().len(), 2);
  assert_eq!(container.num_samples(handle).unwrap(), 2);
}

#[test]
fn transaction_ids_are_monotonic() {
  init_logger();
  let qos = QosPolicies::builder()
    .history(History::KeepLast { depth: 2 })
    .build();
  let container = container_with(&qos);
  let (first, _) = container.get_unsent_data();
  let (second, _) = container.get_unsent_data();
  let (third, _) = container.get_unsent_data();
  assert!(first < second && second < third);
}

#[test]
fn dropped_sample_requeues_at_front() {
  init_logger();
  let qos = QosPolicies::builder()
    .history(History::KeepLast { depth: 5 })
    .build();
  let container = container_with(&qos);
  let transport = CountingTransport::new();
  let handle = container
    .register_instance(None, Bytes::from_static(b"key"))
    .unwrap();

  let mut sn = SequenceNumber::default();
  write_tag(&container, handle, &transport, sn, 1);
  let (_, batch) = container.get_unsent_data();
  sn = sn.next();
  write_tag(&container, handle, &transport, sn, 2);

  // the transport never got sample 1 out; it must go ahead of sample 2
  container.data_dropped(batch[0].element, false).unwrap();
  let (_, requeued) = container.get_unsent_data();
  let sns: Vec<i64> = requeued
    .iter()
    .map(|s| i64::from(s.sequence_number))
    .collect();
  assert_eq!(sns, vec![1, 2]);
}

#[test]
fn eviction_of_in_flight_sample_waits_for_callback() {
  init_logger();
  let qos = QosPolicies::builder()
    .history(History::KeepLast { depth: 1 })
    .build();
  let container = container_with(&qos);
  let transport = BusyTransport;
  let handle = container
    .register_instance(None, Bytes::from_static(b"key"))
    .unwrap();

  let mut sn = SequenceNumber::default();
  let first = write_tag(&container, handle, &transport, sn, 1);
  let (_, batch) = container.get_unsent_data();
  assert_eq!(batch[0].element, first);

  // at depth 1 this evicts the in-flight sample; the transport refuses the
  // removal, so its buffer lingers until the callback
  sn = sn.next();
  write_tag(&container, handle, &transport, sn, 2);
  assert_eq!(container.num_samples(handle).unwrap(), 1);
  assert_eq!(container.num_all_samples(), 1);

  container.data_dropped(first, false).unwrap();
  let (_, next_batch) = container.get_unsent_data();
  let sns: Vec<i64> = next_batch
    .iter()
    .map(|s| i64::from(s.sequence_number))
    .collect();
  assert_eq!(sns, vec![2]);
}

#[test]
fn wait_pending_returns_once_drained() {
  init_logger();
  let qos = QosPolicies::builder()
    .history(History::KeepLast { depth: 5 })
    .build();
  let container = Arc::new(container_with(&qos));
  let transport = CountingTransport::new();
  let handle = container
    .register_instance(None, Bytes::from_static(b"key"))
    .unwrap();
  write_tag(&container, handle, &transport, SequenceNumber::default(), 1);
  let (_, batch) = container.get_unsent_data();

  let deliverer = {
    let container = Arc::clone(&container);
    let element = batch[0].element;
    thread::spawn(move || {
      thread::sleep(StdDuration::from_millis(30));
      container.data_delivered(element).unwrap();
    })
  };
  container.wait_pending();
  assert!(container.get_sending_data().is_empty());
  deliverer.join().unwrap();
}

#[test]
fn random_write_mix_respects_depth_bounds() {
  use rand::Rng;

  init_logger();
  let qos = QosPolicies::builder()
    .history(History::KeepLast { depth: 4 })
    .build();
  let mut writer: DataWriter<Reading> = DataWriter::new(GUID::new(), qos, 8);
  let transport = CountingTransport::new();
  let mut rng = rand::thread_rng();

  for _ in 0..200 {
    let sample = Reading {
      sensor: format!("s{}", rng.gen_range(0, 5)),
      value: rng.gen(),
    };
    writer.write(&sample, None, &transport).unwrap();
  }

  let mut total = 0;
  for i in 0..5 {
    let n = writer.num_samples(&format!("s{}", i)).unwrap();
    assert!(n <= 4);
    total += n;
  }
  assert_eq!(writer.container().num_all_samples(), total);
  assert!(total <= 20);
}

#[test]
fn sequence_number_wire_image_after_low_word_wrap() {
  use speedy::{Endianness, Readable, Writable};

  let sn = SequenceNumber::new(0, 0xFFFF_FFFF);
  let next = sn.next();
  let bytes = next
    .write_to_vec_with_ctx(Endianness::BigEndian)
    .unwrap();
  // high word first, then low word
  assert_eq!(bytes, vec![0, 0, 0, 1, 0, 0, 0, 0]);
  let decoded = SequenceNumber::read_from_buffer_with_ctx(Endianness::BigEndian, &bytes).unwrap();
  assert_eq!(decoded, SequenceNumber::new(1, 0));
}
