//! Ownership Contexts
//!
//! Every effect and memo runs inside an owner. An owner records three things
//! about its most recent execution:
//!
//! - the signals it read (its dependency edges),
//! - the owners created while it ran (its children),
//! - the cleanup callbacks registered while it ran.
//!
//! Re-running or disposing an owner throws all three away first, so the tree
//! only ever reflects the latest execution. Roots are owners with no parent
//! and no computation; they exist to bound the lifetime of a subtree.
//!
//! Owners live in a generational arena inside the [`Runtime`]. Handles hold
//! an [`OwnerId`], never a pointer, so a handle to a disposed owner is inert.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::runtime::Runtime;
use super::subscriber::{Edge, OwnerId, SignalId};
use crate::error::{ReactiveError, Result};

pub(crate) type Computation = Rc<dyn Fn()>;
pub(crate) type Cleanup = Box<dyn FnOnce()>;

/// Arena entry for one owner.
pub(crate) struct OwnerNode {
    pub(crate) parent: Option<OwnerId>,
    pub(crate) active: bool,
    pub(crate) computation: Option<Computation>,
    pub(crate) sources: IndexMap<SignalId, Edge>,
    pub(crate) children: SmallVec<[OwnerId; 4]>,
    pub(crate) cleanups: SmallVec<[Cleanup; 2]>,
}

impl OwnerNode {
    pub(crate) fn new(parent: Option<OwnerId>, computation: Option<Computation>) -> Self {
        Self {
            parent,
            active: true,
            computation,
            sources: IndexMap::new(),
            children: SmallVec::new(),
            cleanups: SmallVec::new(),
        }
    }
}

struct OwnerSlot {
    generation: u32,
    node: Option<OwnerNode>,
}

/// Generational storage for owners.
#[derive(Default)]
pub(crate) struct OwnerArena {
    slots: Vec<OwnerSlot>,
    free: Vec<u32>,
    live: usize,
}

impl OwnerArena {
    pub(crate) fn insert(&mut self, node: OwnerNode) -> OwnerId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return OwnerId::new(index, slot.generation);
        }

        let index = u32::try_from(self.slots.len()).expect("owner arena exhausted");
        self.slots.push(OwnerSlot {
            generation: 0,
            node: Some(node),
        });
        OwnerId::new(index, 0)
    }

    pub(crate) fn get(&self, id: OwnerId) -> Option<&OwnerNode> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: OwnerId) -> Option<&mut OwnerNode> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    /// Take the node out and retire the id.
    pub(crate) fn remove(&mut self, id: OwnerId) -> Option<OwnerNode> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index() as u32);
        self.live -= 1;
        Some(node)
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }
}

/// Handle to an ownership context.
///
/// Cloning the handle does not clone the owner.
#[derive(Clone)]
pub struct Owner {
    runtime: Runtime,
    id: OwnerId,
}

impl Owner {
    pub(crate) fn new(runtime: Runtime, id: OwnerId) -> Self {
        Self { runtime, id }
    }

    /// The owner currently executing in the current runtime, if any.
    pub fn current() -> Option<Owner> {
        Runtime::current().owner()
    }

    /// The arena id of this owner.
    pub fn id(&self) -> OwnerId {
        self.id
    }

    /// The runtime this owner belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Whether the owner is still live. False forever once disposed.
    pub fn is_active(&self) -> bool {
        self.runtime.is_active(self.id)
    }

    /// The owner that was current when this one was created.
    pub fn parent(&self) -> Option<Owner> {
        self.runtime
            .parent_of(self.id)
            .map(|id| Owner::new(self.runtime.clone(), id))
    }

    /// Number of owners created during this owner's latest execution.
    pub fn child_count(&self) -> usize {
        self.runtime.child_count(self.id)
    }

    /// Number of signals read during this owner's latest execution.
    pub fn dependency_count(&self) -> usize {
        self.runtime.dependency_count(self.id)
    }

    /// Register `cleanup` to run once at the next re-run or at disposal.
    pub fn add_cleanup<F>(&self, cleanup: F) -> Result<()>
    where
        F: FnOnce() + 'static,
    {
        self.runtime.add_cleanup(self.id, Box::new(cleanup))
    }

    /// Run `f` with this owner as the current context.
    ///
    /// Effects created inside `f` become children of this owner. Reads are
    /// tracked by this owner only if it has a computation to re-run.
    pub fn run_in<R>(&self, f: impl FnOnce() -> R) -> R {
        self.runtime.run_with(Some(self.id), f)
    }

    /// Tear this owner and its whole subtree down.
    ///
    /// Panicking cleanups do not stop the teardown; they are logged.
    pub fn dispose(&self) {
        if let Err(err) = self.try_dispose() {
            tracing::error!(owner = %self.id, error = %err, "owner teardown reported failures");
        }
    }

    /// Tear this owner and its whole subtree down, returning any cleanup
    /// panics collected on the way.
    ///
    /// Disposing an already disposed owner is a no-op.
    pub fn try_dispose(&self) -> Result<()> {
        ReactiveError::from_cleanup_failures(self.runtime.dispose(self.id))
    }
}

impl PartialEq for Owner {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.runtime.ptr_eq(&other.runtime)
    }
}

impl Eq for Owner {}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Disposes the root created by [`create_root`].
#[derive(Clone, Debug)]
pub struct Disposer {
    owner: Owner,
}

impl Disposer {
    /// Dispose the root and everything created under it.
    pub fn dispose(&self) {
        self.owner.dispose();
    }

    /// The root owner.
    pub fn owner(&self) -> &Owner {
        &self.owner
    }
}

/// Run `f` inside a new detached root.
///
/// The root is not a child of the current owner: it lives until the
/// [`Disposer`] handed to `f` is used.
///
/// # Example
///
/// ```rust
/// use rwr_core::reactive::{create_effect, create_root, create_signal};
///
/// let (count, set_count) = create_signal(0);
/// let dispose = create_root(|dispose| {
///     create_effect(move || println!("count = {}", count.get()));
///     dispose
/// });
///
/// set_count.set(1);
/// dispose.dispose();
/// set_count.set(2); // nothing printed
/// ```
pub fn create_root<R>(f: impl FnOnce(Disposer) -> R) -> R {
    let runtime = Runtime::current();
    let id = runtime.create_owner(None, None);
    let owner = Owner::new(runtime, id);
    let disposer = Disposer {
        owner: owner.clone(),
    };
    owner.run_in(move || f(disposer))
}

/// The owner currently executing, if any.
pub fn get_owner() -> Option<Owner> {
    Owner::current()
}

/// Register `cleanup` on the current owner.
///
/// Does nothing when no owner is executing.
pub fn on_cleanup<F>(cleanup: F)
where
    F: FnOnce() + 'static,
{
    if let Err(err) = try_on_cleanup(cleanup) {
        tracing::debug!(error = %err, "cleanup callback dropped");
    }
}

/// Register `cleanup` on the current owner, reporting when there is none.
pub fn try_on_cleanup<F>(cleanup: F) -> Result<()>
where
    F: FnOnce() + 'static,
{
    match Owner::current() {
        Some(owner) => owner.add_cleanup(cleanup),
        None => Err(ReactiveError::NoOwner),
    }
}
