//! Identifiers and dependency edges.
//!
//! An edge links one signal to one owner. The signal side is a slot in the
//! signal's [`SubscriberList`] holding the owner's id; the owner side is an
//! [`Edge`] holding a weak handle to the signal plus the slot's position.
//! Either side can drop the link in O(1):
//!
//! - the owner unlinks its slot when it re-runs or is disposed, and the
//!   slot is reused by the next subscription;
//! - the signal swaps its whole list out when it is written, bumping its
//!   epoch so that every outstanding [`SlotRef`] stops matching.

use std::fmt;
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of an ownership context.
///
/// Ids are arena indices paired with a generation. Once an owner is disposed
/// its slot is recycled under a new generation, so a stale id never resolves
/// to a live owner again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId {
    index: u32,
    generation: u32,
}

impl OwnerId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner#{}.{}", self.index, self.generation)
    }
}

/// Unique identifier of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(u64);

impl SignalId {
    /// Generate a new unique signal ID.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signal#{}", self.0)
    }
}

/// Position of one subscription inside a [`SubscriberList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotRef {
    epoch: u64,
    slot: usize,
    tag: u32,
}

#[derive(Debug)]
struct Link {
    owner: Option<OwnerId>,
    tag: u32,
    prev: Option<usize>,
    next: Option<usize>,
}

/// The owners subscribed to one signal, in subscription order.
///
/// Slots form a doubly linked list threaded through a `Vec`. Removing a
/// subscription unlinks its slot and puts it on a free list for the next
/// insert, so storage never exceeds the peak number of live subscriptions
/// and iteration order stays the order of subscription.
#[derive(Debug, Default)]
pub(crate) struct SubscriberList {
    epoch: u64,
    links: Vec<Link>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    live: usize,
}

impl SubscriberList {
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn insert(&mut self, owner: OwnerId) -> SlotRef {
        let prev = self.tail;
        let slot = match self.free.pop() {
            Some(slot) => {
                let link = &mut self.links[slot];
                link.owner = Some(owner);
                link.tag = link.tag.wrapping_add(1);
                link.prev = prev;
                link.next = None;
                slot
            }
            None => {
                self.links.push(Link {
                    owner: Some(owner),
                    tag: 0,
                    prev,
                    next: None,
                });
                self.links.len() - 1
            }
        };

        match prev {
            Some(prev) => self.links[prev].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.live += 1;

        SlotRef {
            epoch: self.epoch,
            slot,
            tag: self.links[slot].tag,
        }
    }

    /// Unlink the slot at `at`. Returns false when the slot belongs to an
    /// earlier epoch or was already removed.
    pub(crate) fn remove(&mut self, at: SlotRef) -> bool {
        if at.epoch != self.epoch {
            return false;
        }
        let Some(link) = self.links.get_mut(at.slot).filter(|link| link.tag == at.tag) else {
            return false;
        };
        if link.owner.take().is_none() {
            return false;
        }
        let (prev, next) = (link.prev.take(), link.next.take());

        match prev {
            Some(prev) => self.links[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.links[next].prev = prev,
            None => self.tail = prev,
        }
        self.free.push(at.slot);
        self.live -= 1;
        true
    }

    /// Swap the list for an empty one and return the live owners in
    /// subscription order.
    pub(crate) fn take(&mut self) -> Vec<OwnerId> {
        let mut owners = Vec::with_capacity(self.live);
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let link = &self.links[slot];
            owners.extend(link.owner);
            cursor = link.next;
        }

        self.epoch += 1;
        self.links.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.live = 0;
        owners
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Number of slots allocated, live or free.
    pub(crate) fn capacity(&self) -> usize {
        self.links.len()
    }
}

/// The signal side of an edge, erased over the signal's value type.
pub(crate) trait Source {
    fn id(&self) -> SignalId;

    /// Current epoch of the subscriber list.
    fn epoch(&self) -> u64;

    fn subscribe(&self, owner: OwnerId) -> SlotRef;

    fn unsubscribe(&self, at: SlotRef);
}

/// The owner side of an edge.
pub(crate) struct Edge {
    source: Weak<dyn Source>,
    at: SlotRef,
}

impl Edge {
    pub(crate) fn new(source: Weak<dyn Source>, at: SlotRef) -> Self {
        Self { source, at }
    }

    /// Whether the signal has not been written since this edge was made.
    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.at.epoch == epoch
    }

    /// Remove the owner from the signal's subscriber list, if the signal is
    /// still alive.
    pub(crate) fn sever(self) {
        if let Some(source) = self.source.upgrade() {
            source.unsubscribe(self.at);
        }
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("at", &self.at)
            .field("alive", &(self.source.strong_count() > 0))
            .finish()
    }
}
