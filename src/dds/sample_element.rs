use log::error;

use crate::{
  dds::ddsdata::DDSData,
  structure::{guid::GUID, instance_handle::InstanceHandle, sequence_number::SequenceNumber,
    time::Timestamp},
};

/// Stable identifier of a sample element in its arena.
///
/// Handed to the transport as the per-sample token; the transport returns
/// it in `data_delivered` / `data_dropped`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub(crate) usize);

/// Which send-pipeline list an element currently belongs to.
///
/// Every live element is in exactly one of these states. `Detached` exists
/// only between `obtain_buffer` and `enqueue`, before the element enters
/// the pipeline. `Orphaned` holds elements whose payload is still possibly
/// referenced by an in-flight transport send; they are reclaimed when the
/// transport's completion callback arrives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SendState {
  Detached,
  Unsent,
  Sending,
  Sent,
  Orphaned,
  Resend,
}

/// Prev/next pair for one chain. An element sits on up to three chains at
/// once: the send-pipeline list, its instance chain, and the writer-wide
/// write-order chain.
#[derive(Copy, Clone, Debug, Default)]
pub struct Link {
  pub prev: Option<ElementId>,
  pub next: Option<ElementId>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChainKind {
  Send,
  Instance,
  Writer,
}

/// One retained serialized sample plus its delivery metadata.
#[derive(Debug)]
pub struct SampleElement {
  pub handle: InstanceHandle,
  pub publication_id: GUID,
  pub sequence_number: SequenceNumber,
  pub source_timestamp: Timestamp,
  pub data: Option<DDSData>,
  /// Non-empty only for directed resends: the readers this copy is
  /// addressed to.
  pub addressed_readers: Vec<GUID>,
  pub state: SendState,
  /// Identifier of the `get_unsent_data` batch this element last left in.
  pub transaction_id: u64,

  send_link: Link,
  instance_link: Link,
  writer_link: Link,
  pub on_instance_chain: bool,
  pub on_writer_chain: bool,
}

impl SampleElement {
  pub fn new(handle: InstanceHandle, publication_id: GUID) -> SampleElement {
    SampleElement {
      handle,
      publication_id,
      sequence_number: SequenceNumber::UNKNOWN,
      source_timestamp: Timestamp::TIME_INVALID,
      data: None,
      addressed_readers: Vec::new(),
      state: SendState::Detached,
      transaction_id: 0,
      send_link: Link::default(),
      instance_link: Link::default(),
      writer_link: Link::default(),
      on_instance_chain: false,
      on_writer_chain: false,
    }
  }

  pub fn link(&self, chain: ChainKind) -> &Link {
    match chain {
      ChainKind::Send => &self.send_link,
      ChainKind::Instance => &self.instance_link,
      ChainKind::Writer => &self.writer_link,
    }
  }

  pub fn link_mut(&mut self, chain: ChainKind) -> &mut Link {
    match chain {
      ChainKind::Send => &mut self.send_link,
      ChainKind::Instance => &mut self.instance_link,
      ChainKind::Writer => &mut self.writer_link,
    }
  }
}

/// Arena of sample elements.
///
/// Elements live at stable indices; freed slots are recycled. The arena
/// plus per-element link pairs realize the intrusive lists: moving an
/// element between lists relinks it, never copies payload.
#[derive(Debug, Default)]
pub struct SampleArena {
  slots: Vec<Option<SampleElement>>,
  free: Vec<usize>,
}

impl SampleArena {
  pub fn with_capacity(n_chunks: usize) -> SampleArena {
    SampleArena {
      slots: Vec::with_capacity(n_chunks),
      free: Vec::new(),
    }
  }

  pub fn insert(&mut self, element: SampleElement) -> ElementId {
    match self.free.pop() {
      Some(ix) => {
        self.slots[ix] = Some(element);
        ElementId(ix)
      }
      None => {
        self.slots.push(Some(element));
        ElementId(self.slots.len() - 1)
      }
    }
  }

  pub fn remove(&mut self, id: ElementId) -> Option<SampleElement> {
    match self.slots.get_mut(id.0).and_then(Option::take) {
      Some(element) => {
        self.free.push(id.0);
        Some(element)
      }
      None => {
        error!("removing nonexistent sample element {:?}", id);
        debug_assert!(false, "removing nonexistent sample element");
        None
      }
    }
  }

  pub fn get(&self, id: ElementId) -> Option<&SampleElement> {
    self.slots.get(id.0).and_then(Option::as_ref)
  }

  pub fn get_mut(&mut self, id: ElementId) -> Option<&mut SampleElement> {
    self.slots.get_mut(id.0).and_then(Option::as_mut)
  }

  pub fn live_count(&self) -> usize {
    self.slots.iter().filter(|s| s.is_some()).count()
  }
}

/// A doubly-linked list of elements threaded through one chain kind.
#[derive(Debug)]
pub struct SampleList {
  chain: ChainKind,
  head: Option<ElementId>,
  tail: Option<ElementId>,
  len: usize,
}

impl SampleList {
  pub fn new(chain: ChainKind) -> SampleList {
    SampleList {
      chain,
      head: None,
      tail: None,
      len: 0,
    }
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn head(&self) -> Option<ElementId> {
    self.head
  }

  pub fn tail(&self) -> Option<ElementId> {
    self.tail
  }

  pub fn push_back(&mut self, arena: &mut SampleArena, id: ElementId) {
    let chain = self.chain;
    match self.tail {
      None => {
        if let Some(e) = arena.get_mut(id) {
          *e.link_mut(chain) = Link::default();
        }
        self.head = Some(id);
        self.tail = Some(id);
      }
      Some(tail_id) => {
        if let Some(tail) = arena.get_mut(tail_id) {
          tail.link_mut(chain).next = Some(id);
        }
        if let Some(e) = arena.get_mut(id) {
          *e.link_mut(chain) = Link {
            prev: Some(tail_id),
            next: None,
          };
        }
        self.tail = Some(id);
      }
    }
    self.len += 1;
  }

  pub fn push_front(&mut self, arena: &mut SampleArena, id: ElementId) {
    let chain = self.chain;
    match self.head {
      None => {
        if let Some(e) = arena.get_mut(id) {
          *e.link_mut(chain) = Link::default();
        }
        self.head = Some(id);
        self.tail = Some(id);
      }
      Some(head_id) => {
        if let Some(head) = arena.get_mut(head_id) {
          head.link_mut(chain).prev = Some(id);
        }
        if let Some(e) = arena.get_mut(id) {
          *e.link_mut(chain) = Link {
            prev: None,
            next: Some(head_id),
          };
        }
        self.head = Some(id);
      }
    }
    self.len += 1;
  }

  pub fn pop_front(&mut self, arena: &mut SampleArena) -> Option<ElementId> {
    let head_id = self.head?;
    self.unlink(arena, head_id);
    Some(head_id)
  }

  /// Remove an arbitrary element from this list. The element must be on
  /// this list; linking errors are logged and asserted in debug builds.
  pub fn unlink(&mut self, arena: &mut SampleArena, id: ElementId) {
    let chain = self.chain;
    let link = match arena.get(id) {
      Some(e) => *e.link(chain),
      None => {
        error!("unlink of nonexistent element {:?} from {:?}", id, chain);
        debug_assert!(false, "unlink of nonexistent element");
        return;
      }
    };

    match link.prev {
      Some(prev_id) => {
        if let Some(prev) = arena.get_mut(prev_id) {
          prev.link_mut(chain).next = link.next;
        }
      }
      None => {
        self.head = link.next;
      }
    }
    match link.next {
      Some(next_id) => {
        if let Some(next) = arena.get_mut(next_id) {
          next.link_mut(chain).prev = link.prev;
        }
      }
      None => {
        self.tail = link.prev;
      }
    }
    if let Some(e) = arena.get_mut(id) {
      *e.link_mut(chain) = Link::default();
    }
    self.len -= 1;
  }

  /// Splice all of `other` onto the back of this list in order.
  pub fn append(&mut self, arena: &mut SampleArena, other: &mut SampleList) {
    debug_assert_eq!(self.chain, other.chain);
    match (self.tail, other.head) {
      (_, None) => {}
      (None, Some(_)) => {
        self.head = other.head;
        self.tail = other.tail;
        self.len = other.len;
      }
      (Some(tail_id), Some(other_head)) => {
        let chain = self.chain;
        if let Some(tail) = arena.get_mut(tail_id) {
          tail.link_mut(chain).next = Some(other_head);
        }
        if let Some(head) = arena.get_mut(other_head) {
          head.link_mut(chain).prev = Some(tail_id);
        }
        self.tail = other.tail;
        self.len += other.len;
      }
    }
    other.head = None;
    other.tail = None;
    other.len = 0;
  }

  /// Collect the element ids in list order. Used where iteration must not
  /// hold a borrow of the arena.
  pub fn ids(&self, arena: &SampleArena) -> Vec<ElementId> {
    let mut out = Vec::with_capacity(self.len);
    let mut cursor = self.head;
    while let Some(id) = cursor {
      out.push(id);
      cursor = arena.get(id).and_then(|e| e.link(self.chain).next);
    }
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_element(arena: &mut SampleArena) -> ElementId {
    arena.insert(SampleElement::new(
      InstanceHandle::new(1),
      GUID::GUID_UNKNOWN,
    ))
  }

  #[test]
  fn push_and_pop_preserve_fifo_order() {
    let mut arena = SampleArena::default();
    let mut list = SampleList::new(ChainKind::Send);

    let a = new_element(&mut arena);
    let b = new_element(&mut arena);
    let c = new_element(&mut arena);
    list.push_back(&mut arena, a);
    list.push_back(&mut arena, b);
    list.push_back(&mut arena, c);

    assert_eq!(list.len(), 3);
    assert_eq!(list.ids(&arena), vec![a, b, c]);

    assert_eq!(list.pop_front(&mut arena), Some(a));
    assert_eq!(list.pop_front(&mut arena), Some(b));
    assert_eq!(list.pop_front(&mut arena), Some(c));
    assert_eq!(list.pop_front(&mut arena), None);
    assert!(list.is_empty());
  }

  #[test]
  fn unlink_from_middle() {
    let mut arena = SampleArena::default();
    let mut list = SampleList::new(ChainKind::Instance);

    let a = new_element(&mut arena);
    let b = new_element(&mut arena);
    let c = new_element(&mut arena);
    list.push_back(&mut arena, a);
    list.push_back(&mut arena, b);
    list.push_back(&mut arena, c);

    list.unlink(&mut arena, b);
    assert_eq!(list.ids(&arena), vec![a, c]);
    assert_eq!(list.len(), 2);

    list.unlink(&mut arena, a);
    assert_eq!(list.ids(&arena), vec![c]);
    assert_eq!(list.head(), Some(c));
    assert_eq!(list.tail(), Some(c));
  }

  #[test]
  fn append_splices_lists() {
    let mut arena = SampleArena::default();
    let mut first = SampleList::new(ChainKind::Send);
    let mut second = SampleList::new(ChainKind::Send);

    let a = new_element(&mut arena);
    let b = new_element(&mut arena);
    let c = new_element(&mut arena);
    first.push_back(&mut arena, a);
    second.push_back(&mut arena, b);
    second.push_back(&mut arena, c);

    first.append(&mut arena, &mut second);
    assert_eq!(first.ids(&arena), vec![a, b, c]);
    assert_eq!(first.len(), 3);
    assert!(second.is_empty());
  }

  #[test]
  fn chains_are_independent() {
    let mut arena = SampleArena::default();
    let mut send = SampleList::new(ChainKind::Send);
    let mut instance = SampleList::new(ChainKind::Instance);

    let a = new_element(&mut arena);
    let b = new_element(&mut arena);
    send.push_back(&mut arena, a);
    send.push_back(&mut arena, b);
    instance.push_back(&mut arena, b);
    instance.push_back(&mut arena, a);

    // removal from one chain must not disturb the other
    send.unlink(&mut arena, a);
    assert_eq!(send.ids(&arena), vec![b]);
    assert_eq!(instance.ids(&arena), vec![b, a]);
  }

  #[test]
  fn arena_recycles_slots() {
    let mut arena = SampleArena::default();
    let a = new_element(&mut arena);
    assert_eq!(arena.live_count(), 1);
    arena.remove(a);
    assert_eq!(arena.live_count(), 0);
    let b = new_element(&mut arena);
    // freed slot is reused
    assert_eq!(a, b);
  }
}
