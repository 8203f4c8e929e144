use std::{
  collections::BTreeMap,
  sync::{Condvar, Mutex, MutexGuard, PoisonError},
  time::Instant,
};

use bytes::Bytes;
use log::{debug, error};
use static_assertions::assert_impl_all;

use crate::{
  dds::{
    ddsdata::DDSData,
    qos::{policy, QosPolicies},
    result::{Error, Result},
    sample_element::{ChainKind, ElementId, SampleArena, SampleElement, SampleList, SendState},
  },
  structure::{
    duration::Duration, guid::GUID, instance_handle::InstanceHandle,
    sequence_number::SequenceNumber, time::Timestamp,
  },
  transport::{TransportClient, TransportSample},
};

/// Retention and admission parameters, distilled from QoS.
///
/// The container never inspects raw QoS policies at runtime; everything it
/// needs is computed here once at construction.
#[derive(Clone, Debug)]
pub struct ContainerConfig {
  /// Per-instance retained-sample bound. `None` means unbounded.
  pub depth: Option<usize>,
  /// RELIABLE + KEEP_ALL: block the writer at the bound instead of
  /// evicting the oldest sample.
  pub should_block: bool,
  pub max_blocking_time: Duration,
  /// Initial arena capacity hint.
  pub n_chunks: usize,
  pub max_instances: Option<usize>,
  pub max_total_samples: Option<usize>,
  /// Durable writers keep delivered samples on the sent list for late
  /// joiners; volatile writers release them on delivery.
  pub durable: bool,
}

impl ContainerConfig {
  pub fn from_qos(qos: &QosPolicies, n_chunks: usize) -> ContainerConfig {
    let history = qos
      .history()
      .unwrap_or(policy::History::KeepLast { depth: 1 });
    let limits = qos.resource_limits().unwrap_or_default();

    let per_instance_limit = if limits.max_samples_per_instance < 0 {
      None
    } else {
      Some(limits.max_samples_per_instance as usize)
    };
    let depth = match history {
      policy::History::KeepLast { depth } => {
        let d = depth.max(1) as usize;
        Some(per_instance_limit.map_or(d, |limit| d.min(limit)))
      }
      policy::History::KeepAll => per_instance_limit,
    };

    ContainerConfig {
      depth,
      should_block: qos.is_reliable() && history == policy::History::KeepAll,
      max_blocking_time: qos
        .reliable_max_blocking_time()
        .unwrap_or(Duration::DURATION_ZERO),
      n_chunks,
      max_instances: if limits.max_instances < 0 {
        None
      } else {
        Some(limits.max_instances as usize)
      },
      max_total_samples: if limits.max_samples < 0 {
        None
      } else {
        Some(limits.max_samples as usize)
      },
      durable: qos.is_durable(),
    }
  }
}

/// Registry entry for one key value.
///
/// Entries are never removed, only marked unregistered, so a handle stays
/// valid (and reusable via re-registration) for the lifetime of the
/// writer. `num_samples` on an unregistered handle reports 0.
#[derive(Debug)]
pub struct PublicationInstance {
  pub handle: InstanceHandle,
  registered_sample: Bytes,
  samples: SampleList,
  unregistered: bool,
}

impl PublicationInstance {
  fn new(handle: InstanceHandle, registered_sample: Bytes) -> PublicationInstance {
    PublicationInstance {
      handle,
      registered_sample,
      samples: SampleList::new(ChainKind::Instance),
      unregistered: false,
    }
  }
}

struct Inner {
  arena: SampleArena,
  unsent: SampleList,
  sending: SampleList,
  sent: SampleList,
  /// Elements evicted while in flight. Their payloads may still be
  /// referenced by the transport; reclaimed on the delivery callback.
  orphaned: SampleList,
  /// Directed copies queued by `reenqueue_all`, waiting for pickup.
  resend: SampleList,
  /// Writer-wide write-order chain over all retained samples.
  data_holder: SampleList,
  instances: BTreeMap<InstanceHandle, PublicationInstance>,
  next_handle: InstanceHandle,
  transaction_id: u64,
  shutdown: bool,
}

/// Writer-side sample queue: retention, admission control and transport
/// handoff for one DataWriter.
///
/// One mutex guards all lists and the instance registry, so every list
/// transition is atomic with respect to both the write path and the
/// transport callback path. Mutations run as unlocked methods on `Inner`;
/// the public methods lock once and delegate, which also lets the eviction
/// path run inside `obtain_buffer` without re-entering the lock.
pub struct WriteDataContainer {
  pub publication_id: GUID,
  config: ContainerConfig,
  inner: Mutex<Inner>,
  /// One waiter woken per freed slot.
  capacity_released: Condvar,
  pending_empty: Condvar,
}

// transport callbacks arrive from other threads
assert_impl_all!(WriteDataContainer: Send, Sync);

impl WriteDataContainer {
  pub fn new(publication_id: GUID, config: ContainerConfig) -> WriteDataContainer {
    let arena = SampleArena::with_capacity(config.n_chunks);
    WriteDataContainer {
      publication_id,
      config,
      inner: Mutex::new(Inner {
        arena,
        unsent: SampleList::new(ChainKind::Send),
        sending: SampleList::new(ChainKind::Send),
        sent: SampleList::new(ChainKind::Send),
        orphaned: SampleList::new(ChainKind::Send),
        resend: SampleList::new(ChainKind::Send),
        data_holder: SampleList::new(ChainKind::Writer),
        instances: BTreeMap::new(),
        next_handle: InstanceHandle::HANDLE_NIL,
        transaction_id: 0,
        shutdown: false,
      }),
      capacity_released: Condvar::new(),
      pending_empty: Condvar::new(),
    }
  }

  pub fn config(&self) -> &ContainerConfig {
    &self.config
  }

  fn lock(&self) -> MutexGuard<Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn signal(&self, inner: &Inner, freed: usize) {
    for _ in 0..freed {
      self.capacity_released.notify_one();
    }
    if inner.pending_is_empty() {
      self.pending_empty.notify_all();
    }
  }

  /// Register a key value, returning its instance handle. With
  /// `Some(handle)` re-registers an existing (possibly unregistered)
  /// entry; with `None` allocates a fresh entry.
  pub fn register_instance(
    &self,
    handle: Option<InstanceHandle>,
    key_sample: Bytes,
  ) -> Result<InstanceHandle> {
    let mut guard = self.lock();
    let inner = &mut *guard;
    match handle {
      Some(h) => match inner.instances.get_mut(&h) {
        Some(instance) => {
          instance.registered_sample = key_sample;
          instance.unregistered = false;
          Ok(h)
        }
        None => Err(Error::BadParameter),
      },
      None => {
        if let Some(max) = self.config.max_instances {
          // unregistered entries keep counting against the limit
          if inner.instances.len() >= max {
            return Err(Error::OutOfResources);
          }
        }
        let h = inner.next_handle.next();
        inner.next_handle = h;
        inner
          .instances
          .insert(h, PublicationInstance::new(h, key_sample));
        debug!("registered instance {}", h);
        Ok(h)
      }
    }
  }

  /// Admission control for one `write`. Returns a detached element to be
  /// filled in and passed to `enqueue`. At the retention bound this either
  /// evicts the instance's oldest sample (non-blocking QoS) or blocks the
  /// caller until capacity frees, bounded by `max_blocking_time`.
  pub fn obtain_buffer(
    &self,
    handle: InstanceHandle,
    transport: &dyn TransportClient,
  ) -> Result<ElementId> {
    let mut guard = self.lock();
    if guard.shutdown {
      return Err(Error::PreconditionNotMet);
    }
    match guard.instances.get(&handle) {
      Some(instance) if !instance.unregistered => {}
      _ => return Err(Error::BadParameter),
    }

    if self.config.should_block {
      let deadline = if self.config.max_blocking_time.is_infinite() {
        None
      } else {
        Some(Instant::now() + std::time::Duration::from(self.config.max_blocking_time))
      };
      while guard.at_capacity(&self.config, handle) {
        if guard.shutdown {
          return Err(Error::Timeout);
        }
        match guard.instances.get(&handle) {
          Some(instance) if !instance.unregistered => {}
          _ => return Err(Error::BadParameter),
        }
        // wake-and-recheck: wakeups are per freed slot, not per instance
        guard = match deadline {
          None => self
            .capacity_released
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner),
          Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
              return Err(Error::Timeout);
            }
            let (guard, _) = self
              .capacity_released
              .wait_timeout(guard, deadline - now)
              .unwrap_or_else(PoisonError::into_inner);
            guard
          }
        };
      }
    } else {
      let inner = &mut *guard;
      while inner.instance_at_depth(&self.config, handle) {
        inner.remove_oldest_sample(handle, transport)?;
      }
      while inner.total_at_bound(&self.config) {
        // cascade: evict the writer-wide oldest retained sample
        let victim = inner
          .data_holder
          .head()
          .and_then(|id| inner.arena.get(id))
          .map(|e| e.handle)
          .ok_or(Error::OutOfResources)?;
        inner.remove_oldest_sample(victim, transport)?;
      }
    }

    // state may have changed while blocked
    if guard.shutdown {
      return Err(Error::Timeout);
    }
    match guard.instances.get(&handle) {
      Some(instance) if !instance.unregistered => {}
      _ => return Err(Error::BadParameter),
    }

    let element = SampleElement::new(handle, self.publication_id);
    Ok(guard.arena.insert(element))
  }

  /// Return an element obtained from `obtain_buffer` without enqueueing
  /// it. Used when serialization or sequencing fails after admission.
  pub fn release_buffer(&self, element: ElementId) {
    let mut guard = self.lock();
    match guard.arena.get(element) {
      Some(e) if e.state == SendState::Detached => {
        guard.arena.remove(element);
      }
      _ => {
        error!("release_buffer on non-detached element {:?}", element);
        debug_assert!(false, "release_buffer on non-detached element");
      }
    }
  }

  /// Link a filled element into the pipeline: tail of `unsent`, tail of
  /// its instance chain, tail of the write-order chain.
  pub fn enqueue(
    &self,
    element: ElementId,
    handle: InstanceHandle,
    data: DDSData,
    sequence_number: SequenceNumber,
    source_timestamp: Timestamp,
  ) -> Result<()> {
    let mut guard = self.lock();
    let inner = &mut *guard;
    // validate before touching any list: a teardown may have raced in
    // between obtain_buffer and here
    if inner.shutdown {
      return Err(Error::PreconditionNotMet);
    }
    if !inner.instances.contains_key(&handle) {
      return Err(Error::BadParameter);
    }
    match inner.arena.get_mut(element) {
      Some(e) if e.state == SendState::Detached => {
        e.handle = handle;
        e.data = Some(data);
        e.sequence_number = sequence_number;
        e.source_timestamp = source_timestamp;
        e.state = SendState::Unsent;
        e.on_instance_chain = true;
        e.on_writer_chain = true;
      }
      _ => return Err(Error::PreconditionNotMet),
    }
    inner.unsent.push_back(&mut inner.arena, element);
    if let Some(instance) = inner.instances.get_mut(&handle) {
      instance.samples.push_back(&mut inner.arena, element);
    }
    inner.data_holder.push_back(&mut inner.arena, element);
    Ok(())
  }

  /// Move everything queued for sending to the `sending` list and hand it
  /// to the caller as one batch, in write order, directed resend copies
  /// last. This is the only way elements leave `unsent`. Returns the batch
  /// transaction id.
  pub fn get_unsent_data(&self) -> (u64, Vec<TransportSample>) {
    let mut guard = self.lock();
    let inner = &mut *guard;
    inner.transaction_id += 1;
    let tid = inner.transaction_id;

    let mut batch = Vec::with_capacity(inner.unsent.len() + inner.resend.len());
    while let Some(id) = inner.unsent.pop_front(&mut inner.arena) {
      inner.start_sending(id, tid);
      if let Some(sample) = inner.transport_sample(id) {
        batch.push(sample);
      }
    }
    while let Some(id) = inner.resend.pop_front(&mut inner.arena) {
      inner.start_sending(id, tid);
      if let Some(sample) = inner.transport_sample(id) {
        batch.push(sample);
      }
    }
    (tid, batch)
  }

  pub fn get_sending_data(&self) -> Vec<TransportSample> {
    let guard = self.lock();
    guard.snapshot(&guard.sending)
  }

  pub fn get_sent_data(&self) -> Vec<TransportSample> {
    let guard = self.lock();
    guard.snapshot(&guard.sent)
  }

  pub fn get_resend_data(&self) -> Vec<TransportSample> {
    let guard = self.lock();
    guard.snapshot(&guard.resend)
  }

  /// Transport callback: confirmed send. Durable writers retain the
  /// element on `sent`; volatile writers and directed resend copies
  /// release it. Orphaned elements are finalized. Wakes blocked writers.
  pub fn data_delivered(&self, element: ElementId) -> Result<()> {
    let mut guard = self.lock();
    let inner = &mut *guard;
    let (state, is_copy) = match inner.arena.get(element) {
      Some(e) => (e.state, !e.addressed_readers.is_empty()),
      None => {
        error!("data_delivered for unknown element {:?}", element);
        return Err(Error::PreconditionNotMet);
      }
    };
    let mut freed = 0;
    match state {
      SendState::Sending => {
        if self.config.durable && !is_copy {
          inner.sending.unlink(&mut inner.arena, element);
          if let Some(e) = inner.arena.get_mut(element) {
            e.state = SendState::Sent;
          }
          inner.sent.push_back(&mut inner.arena, element);
        } else {
          freed += inner.release_element(element);
        }
      }
      SendState::Orphaned => {
        freed += inner.release_element(element);
      }
      other => {
        error!(
          "data_delivered for element {:?} in state {:?}",
          element, other
        );
        debug_assert!(false, "data_delivered outside sending/orphaned");
        return Err(Error::PreconditionNotMet);
      }
    }
    self.signal(&guard, freed.max(1));
    Ok(())
  }

  /// Transport callback: failed or aborted send. With
  /// `dropped_by_transport` the element is released unconditionally.
  /// Otherwise this completes an eviction request from `obtain_buffer`:
  /// an orphaned element is finalized, and an element still on `sending`
  /// goes back to the head of `unsent`. Wakes blocked writers.
  pub fn data_dropped(&self, element: ElementId, dropped_by_transport: bool) -> Result<()> {
    let mut guard = self.lock();
    let inner = &mut *guard;
    let state = match inner.arena.get(element) {
      Some(e) => e.state,
      None => {
        error!("data_dropped for unknown element {:?}", element);
        return Err(Error::PreconditionNotMet);
      }
    };
    let mut freed = 0;
    if dropped_by_transport {
      freed += inner.release_element(element);
    } else {
      match state {
        SendState::Orphaned => {
          freed += inner.release_element(element);
        }
        SendState::Sending => {
          // never went on the wire: requeue ahead of later writes
          inner.sending.unlink(&mut inner.arena, element);
          if let Some(e) = inner.arena.get_mut(element) {
            e.state = SendState::Unsent;
          }
          inner.unsent.push_front(&mut inner.arena, element);
        }
        other => {
          error!("data_dropped for element {:?} in state {:?}", element, other);
          debug_assert!(false, "data_dropped outside sending/orphaned");
          return Err(Error::PreconditionNotMet);
        }
      }
    }
    self.signal(&guard, freed.max(1));
    Ok(())
  }

  /// Queue directed copies of every in-flight and sent sample for a newly
  /// matched reader set. Copies share payload storage with the originals
  /// and ride the next `get_unsent_data` batch; originals keep their state
  /// and position.
  pub fn reenqueue_all(&self, reader_ids: &[GUID]) {
    let mut guard = self.lock();
    let inner = &mut *guard;
    let originals: Vec<ElementId> = inner
      .data_holder
      .ids(&inner.arena)
      .into_iter()
      .filter(|id| {
        matches!(
          inner.arena.get(*id).map(|e| e.state),
          Some(SendState::Sending) | Some(SendState::Sent)
        )
      })
      .collect();
    for id in originals {
      let copy = match inner.arena.get(id) {
        Some(original) => {
          let mut copy = SampleElement::new(original.handle, original.publication_id);
          copy.sequence_number = original.sequence_number;
          copy.source_timestamp = original.source_timestamp;
          copy.data = original.data.clone();
          copy.addressed_readers = reader_ids.to_vec();
          copy.state = SendState::Resend;
          copy
        }
        None => continue,
      };
      let copy_id = inner.arena.insert(copy);
      inner.resend.push_back(&mut inner.arena, copy_id);
    }
  }

  /// Drop the instance's retained chain and mark the entry unregistered.
  /// The registry entry itself stays, so the handle remains valid for
  /// re-registration. Returns the registered key sample when `dup_sample`.
  pub fn unregister(
    &self,
    handle: InstanceHandle,
    transport: &dyn TransportClient,
    dup_sample: bool,
  ) -> Result<Option<Bytes>> {
    let mut guard = self.lock();
    let inner = &mut *guard;
    if !inner.instances.contains_key(&handle) {
      return Err(Error::BadParameter);
    }
    let freed = inner.drain_instance(handle, transport);
    let sample = match inner.instances.get_mut(&handle) {
      Some(instance) => {
        instance.unregistered = true;
        if dup_sample {
          Some(instance.registered_sample.clone())
        } else {
          None
        }
      }
      None => None,
    };
    self.signal(&guard, freed);
    Ok(sample)
  }

  /// Drop the instance's retained chain but keep it registered; further
  /// writes to the handle are allowed.
  pub fn dispose(
    &self,
    handle: InstanceHandle,
    transport: &dyn TransportClient,
    dup_sample: bool,
  ) -> Result<Option<Bytes>> {
    let mut guard = self.lock();
    let inner = &mut *guard;
    if !inner.instances.contains_key(&handle) {
      return Err(Error::BadParameter);
    }
    let freed = inner.drain_instance(handle, transport);
    let sample = inner.instances.get(&handle).and_then(|instance| {
      if dup_sample {
        Some(instance.registered_sample.clone())
      } else {
        None
      }
    });
    self.signal(&guard, freed);
    Ok(sample)
  }

  pub fn num_samples(&self, handle: InstanceHandle) -> Result<usize> {
    let guard = self.lock();
    guard
      .instances
      .get(&handle)
      .map(|instance| instance.samples.len())
      .ok_or(Error::BadParameter)
  }

  pub fn num_all_samples(&self) -> usize {
    self.lock().data_holder.len()
  }

  /// Bulk teardown at writer destruction. After this, every blocked
  /// `obtain_buffer` fails, all samples are released and all registry
  /// entries are removed. The transport must reference no element of this
  /// writer once `remove_all_samples` returns.
  pub fn unregister_all(&self, transport: &dyn TransportClient) {
    let mut guard = self.lock();
    let inner = &mut *guard;
    inner.shutdown = true;
    transport.remove_all_samples();
    while let Some(id) = inner.unsent.head() {
      inner.release_element(id);
    }
    while let Some(id) = inner.sending.head() {
      inner.release_element(id);
    }
    while let Some(id) = inner.sent.head() {
      inner.release_element(id);
    }
    while let Some(id) = inner.orphaned.head() {
      inner.release_element(id);
    }
    while let Some(id) = inner.resend.head() {
      inner.release_element(id);
    }
    // the only place registry entries are removed
    inner.instances.clear();
    self.capacity_released.notify_all();
    self.pending_empty.notify_all();
  }

  /// Block until nothing remains queued or in flight. Returns immediately
  /// after shutdown.
  pub fn wait_pending(&self) {
    let mut guard = self.lock();
    while !guard.pending_is_empty() && !guard.shutdown {
      guard = self
        .pending_empty
        .wait(guard)
        .unwrap_or_else(PoisonError::into_inner);
    }
  }
}

impl Inner {
  fn pending_is_empty(&self) -> bool {
    self.unsent.is_empty()
      && self.sending.is_empty()
      && self.resend.is_empty()
      && self.orphaned.is_empty()
  }

  fn instance_at_depth(&self, config: &ContainerConfig, handle: InstanceHandle) -> bool {
    match (config.depth, self.instances.get(&handle)) {
      (Some(depth), Some(instance)) => instance.samples.len() >= depth,
      _ => false,
    }
  }

  fn total_at_bound(&self, config: &ContainerConfig) -> bool {
    config
      .max_total_samples
      .map_or(false, |max| self.data_holder.len() >= max)
  }

  fn at_capacity(&self, config: &ContainerConfig, handle: InstanceHandle) -> bool {
    self.instance_at_depth(config, handle) || self.total_at_bound(config)
  }

  fn start_sending(&mut self, id: ElementId, transaction_id: u64) {
    if let Some(e) = self.arena.get_mut(id) {
      e.state = SendState::Sending;
      e.transaction_id = transaction_id;
    }
    self.sending.push_back(&mut self.arena, id);
  }

  fn transport_sample(&self, id: ElementId) -> Option<TransportSample> {
    let e = self.arena.get(id)?;
    let data = match &e.data {
      Some(data) => data.clone(),
      None => {
        error!("element {:?} queued without payload", id);
        debug_assert!(false, "element queued without payload");
        return None;
      }
    };
    Some(TransportSample {
      element: id,
      handle: e.handle,
      sequence_number: e.sequence_number,
      source_timestamp: e.source_timestamp,
      data,
      addressed_readers: e.addressed_readers.clone(),
    })
  }

  fn snapshot(&self, list: &SampleList) -> Vec<TransportSample> {
    list
      .ids(&self.arena)
      .into_iter()
      .filter_map(|id| self.transport_sample(id))
      .collect()
  }

  /// Unlink an element from every list and chain it is on and free its
  /// slot. Returns the number of slots freed (0 on lookup failure).
  fn release_element(&mut self, id: ElementId) -> usize {
    let (state, handle, on_instance, on_writer) = match self.arena.get(id) {
      Some(e) => (e.state, e.handle, e.on_instance_chain, e.on_writer_chain),
      None => {
        error!("releasing unknown element {:?}", id);
        debug_assert!(false, "releasing unknown element");
        return 0;
      }
    };
    match state {
      SendState::Unsent => self.unsent.unlink(&mut self.arena, id),
      SendState::Sending => self.sending.unlink(&mut self.arena, id),
      SendState::Sent => self.sent.unlink(&mut self.arena, id),
      SendState::Orphaned => self.orphaned.unlink(&mut self.arena, id),
      SendState::Resend => self.resend.unlink(&mut self.arena, id),
      SendState::Detached => {}
    }
    if on_instance {
      if let Some(instance) = self.instances.get_mut(&handle) {
        instance.samples.unlink(&mut self.arena, id);
      }
    }
    if on_writer {
      self.data_holder.unlink(&mut self.arena, id);
    }
    self.arena.remove(id);
    1
  }

  /// Detach an in-flight element from retention without freeing its
  /// payload. The slot counts as freed for admission; the element is
  /// reclaimed by the transport's eventual callback.
  fn orphan_element(&mut self, id: ElementId) {
    self.sending.unlink(&mut self.arena, id);
    let (handle, on_instance, on_writer) = match self.arena.get_mut(id) {
      Some(e) => {
        let fields = (e.handle, e.on_instance_chain, e.on_writer_chain);
        e.state = SendState::Orphaned;
        e.on_instance_chain = false;
        e.on_writer_chain = false;
        fields
      }
      None => return,
    };
    if on_instance {
      if let Some(instance) = self.instances.get_mut(&handle) {
        instance.samples.unlink(&mut self.arena, id);
      }
    }
    if on_writer {
      self.data_holder.unlink(&mut self.arena, id);
    }
    self.orphaned.push_back(&mut self.arena, id);
  }

  /// Ring-buffer eviction: drop the head of the instance's retained
  /// chain. In-flight elements are removed from the transport if it
  /// consents, orphaned otherwise.
  fn remove_oldest_sample(
    &mut self,
    handle: InstanceHandle,
    transport: &dyn TransportClient,
  ) -> Result<()> {
    let oldest = self
      .instances
      .get(&handle)
      .and_then(|instance| instance.samples.head())
      .ok_or(Error::OutOfResources)?;
    let state = match self.arena.get(oldest) {
      Some(e) => e.state,
      None => return Err(Error::PreconditionNotMet),
    };
    match state {
      SendState::Unsent | SendState::Sent => {
        self.release_element(oldest);
        Ok(())
      }
      SendState::Sending => {
        if transport.remove_sample(oldest) {
          self.release_element(oldest);
        } else {
          self.orphan_element(oldest);
        }
        Ok(())
      }
      other => {
        error!("oldest sample {:?} in unexpected state {:?}", oldest, other);
        debug_assert!(false, "oldest sample in unexpected state");
        Err(Error::PreconditionNotMet)
      }
    }
  }

  /// Release every sample on the instance's chain, orphaning the ones the
  /// transport still references. Returns the number of slots freed.
  fn drain_instance(&mut self, handle: InstanceHandle, transport: &dyn TransportClient) -> usize {
    let mut freed = 0;
    loop {
      let head = match self
        .instances
        .get(&handle)
        .and_then(|instance| instance.samples.head())
      {
        Some(id) => id,
        None => break,
      };
      let state = match self.arena.get(head) {
        Some(e) => e.state,
        None => break,
      };
      match state {
        SendState::Sending => {
          if transport.remove_sample(head) {
            freed += self.release_element(head);
          } else {
            self.orphan_element(head);
          }
        }
        _ => {
          freed += self.release_element(head);
        }
      }
    }
    freed
  }
}
