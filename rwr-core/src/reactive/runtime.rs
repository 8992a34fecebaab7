//! Reactive Runtime
//!
//! The runtime connects signals, memos, and effects. It owns the arena of
//! ownership contexts and the stack of tracking frames, and implements the
//! execute and dispose protocols.
//!
//! # How It Works
//!
//! 1. Creating an effect allocates an owner under the current frame and
//!    executes it.
//!
//! 2. Executing an owner first resets it (children disposed, edges severed,
//!    cleanups run), then pushes it as the current frame and calls its
//!    computation.
//!
//! 3. Reading a signal while a frame is current records a two-way edge
//!    between the signal and the owner on top of the stack.
//!
//! 4. Writing a signal with a changed value swaps its subscriber list out
//!    and executes every subscriber that is still active, in subscription
//!    order. Subscriptions made during that pass go into the fresh list and
//!    wait for the next write.
//!
//! # Stack Depth
//!
//! Propagation is synchronous and recursive: a write returns only after
//! every downstream re-execution has finished, so the native stack grows
//! with the length of the dependency chain. There is no queue in between.
//!
//! # Thread Safety
//!
//! None. A runtime and everything created in it is `!Send`. Each thread has
//! a default runtime; [`Runtime::enter`] makes another one current for the
//! duration of a closure.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::context::ContextGuard;
use super::owner::{Cleanup, Computation, Owner, OwnerArena, OwnerNode};
use super::subscriber::{Edge, OwnerId, Source};
use crate::error::{panic_message, ReactiveError, Result};

thread_local! {
    static RUNTIME_STACK: RefCell<Vec<Runtime>> = const { RefCell::new(Vec::new()) };
    static DEFAULT_RUNTIME: Runtime = Runtime::new();
}

/// A reactive runtime instance.
///
/// Cloning yields another handle to the same runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RefCell<RuntimeState>>,
}

/// Weak handle kept by signals so that the runtime's arena, whose
/// computations capture signals, does not form a reference cycle.
#[derive(Clone)]
pub(crate) struct WeakRuntime(Weak<RefCell<RuntimeState>>);

impl WeakRuntime {
    pub(crate) fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }
}

#[derive(Default)]
struct RuntimeState {
    owners: OwnerArena,
    frames: Vec<Option<OwnerId>>,
}

/// Everything an owner held from its previous execution.
struct Detached {
    children: SmallVec<[OwnerId; 4]>,
    edges: Vec<Edge>,
    cleanups: SmallVec<[Cleanup; 2]>,
}

impl Runtime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RuntimeState::default())),
        }
    }

    /// The runtime that new primitives on this thread are created in.
    pub fn current() -> Runtime {
        RUNTIME_STACK
            .with(|stack| stack.borrow().last().cloned())
            .unwrap_or_else(|| DEFAULT_RUNTIME.with(Runtime::clone))
    }

    /// Run `f` with this runtime as the current one.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        struct Exit;

        impl Drop for Exit {
            fn drop(&mut self) {
                RUNTIME_STACK.with(|stack| stack.borrow_mut().pop());
            }
        }

        RUNTIME_STACK.with(|stack| stack.borrow_mut().push(self.clone()));
        let _exit = Exit;
        f()
    }

    /// Run `f` inside a fresh runtime that is dropped afterwards.
    pub fn scope<R>(f: impl FnOnce() -> R) -> R {
        Runtime::new().enter(f)
    }

    /// Whether both handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The owner currently executing in this runtime, if any.
    pub fn owner(&self) -> Option<Owner> {
        self.current_owner_id()
            .map(|id| Owner::new(self.clone(), id))
    }

    /// Check if an owner is on top of the tracking stack.
    pub fn is_tracking(&self) -> bool {
        self.current_owner_id().is_some()
    }

    /// Number of live (not yet disposed) owners.
    pub fn owner_count(&self) -> usize {
        self.inner.borrow().owners.len()
    }

    pub(crate) fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.inner))
    }

    // ------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------

    pub(crate) fn push_frame(&self, frame: Option<OwnerId>) {
        self.inner.borrow_mut().frames.push(frame);
    }

    pub(crate) fn pop_frame(&self) -> Option<Option<OwnerId>> {
        self.inner.borrow_mut().frames.pop()
    }

    pub(crate) fn current_owner_id(&self) -> Option<OwnerId> {
        self.inner.borrow().frames.last().copied().flatten()
    }

    pub(crate) fn run_with<R>(&self, frame: Option<OwnerId>, f: impl FnOnce() -> R) -> R {
        let _frame = ContextGuard::enter(self, frame);
        f()
    }

    // ------------------------------------------------------------------
    // Owners
    // ------------------------------------------------------------------

    /// Allocate an owner under `parent`.
    ///
    /// An owner created under a parent that is no longer active is retired
    /// immediately: the returned id never resolves, so it never runs.
    pub(crate) fn create_owner(
        &self,
        parent: Option<OwnerId>,
        computation: Option<Computation>,
    ) -> OwnerId {
        let mut state = self.inner.borrow_mut();
        let parent_live = parent.map_or(true, |p| state.owners.get(p).is_some_and(|n| n.active));
        let id = state.owners.insert(OwnerNode::new(parent, computation));

        if !parent_live {
            let stillborn = state.owners.remove(id);
            drop(state);
            drop(stillborn);
            tracing::debug!(owner = %id, "owner created under a disposed parent");
            return id;
        }

        if let Some(node) = parent.and_then(|p| state.owners.get_mut(p)) {
            node.children.push(id);
        }
        tracing::trace!(owner = %id, parent = ?parent, "owner created");
        id
    }

    pub(crate) fn is_active(&self, id: OwnerId) -> bool {
        self.inner
            .borrow()
            .owners
            .get(id)
            .is_some_and(|node| node.active)
    }

    pub(crate) fn parent_of(&self, id: OwnerId) -> Option<OwnerId> {
        self.inner.borrow().owners.get(id).and_then(|node| node.parent)
    }

    pub(crate) fn child_count(&self, id: OwnerId) -> usize {
        self.inner
            .borrow()
            .owners
            .get(id)
            .map_or(0, |node| node.children.len())
    }

    pub(crate) fn dependency_count(&self, id: OwnerId) -> usize {
        self.inner
            .borrow()
            .owners
            .get(id)
            .map_or(0, |node| node.sources.len())
    }

    pub(crate) fn add_cleanup(&self, id: OwnerId, cleanup: Cleanup) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        if let Some(node) = state.owners.get_mut(id).filter(|node| node.active) {
            node.cleanups.push(cleanup);
            return Ok(());
        }

        drop(state);
        drop(cleanup);
        Err(ReactiveError::Disposed(id))
    }

    /// Run or re-run an owner's computation.
    ///
    /// Owners that are disposed, or that have no computation, are skipped.
    pub(crate) fn execute(&self, id: OwnerId) {
        let computation = self
            .inner
            .borrow()
            .owners
            .get(id)
            .filter(|node| node.active)
            .and_then(|node| node.computation.clone());
        let Some(computation) = computation else {
            tracing::debug!(owner = %id, "skipping execution of inactive owner");
            return;
        };

        let failures = self.reset(id);
        report(id, &failures);

        // A cleanup may have disposed this owner.
        if !self.is_active(id) {
            return;
        }

        tracing::trace!(owner = %id, "executing owner");
        let _frame = ContextGuard::enter(self, Some(id));
        computation();
    }

    /// Dispose an owner and its subtree, returning cleanup panic messages.
    pub(crate) fn dispose(&self, id: OwnerId) -> Vec<String> {
        {
            let mut state = self.inner.borrow_mut();
            let parent = state.owners.get(id).and_then(|node| node.parent);
            if let Some(node) = parent.and_then(|p| state.owners.get_mut(p)) {
                node.children.retain(|child| *child != id);
            }
        }

        let mut failures = Vec::new();
        self.dispose_into(id, &mut failures);
        failures
    }

    /// Throw away everything from the previous execution, in order:
    /// children, edges, cleanups.
    fn reset(&self, id: OwnerId) -> Vec<String> {
        let mut failures = Vec::new();
        let Some(detached) = self.detach(id, false) else {
            return failures;
        };

        for child in detached.children {
            self.dispose_into(child, &mut failures);
        }
        for edge in detached.edges {
            edge.sever();
        }
        run_cleanups(detached.cleanups, &mut failures);
        failures
    }

    /// Children first, then own cleanups, then edges; the slot is retired
    /// last so the owner reads as inactive throughout.
    fn dispose_into(&self, id: OwnerId, failures: &mut Vec<String>) {
        let Some(detached) = self.detach(id, true) else {
            return;
        };
        tracing::trace!(owner = %id, children = detached.children.len(), "disposing owner");

        for child in detached.children {
            self.dispose_into(child, failures);
        }
        run_cleanups(detached.cleanups, failures);
        for edge in detached.edges {
            edge.sever();
        }

        let node = self.inner.borrow_mut().owners.remove(id);
        drop(node);
    }

    fn detach(&self, id: OwnerId, deactivate: bool) -> Option<Detached> {
        let mut state = self.inner.borrow_mut();
        let node = state.owners.get_mut(id)?;
        if deactivate {
            if !node.active {
                return None;
            }
            node.active = false;
        }

        Some(Detached {
            children: std::mem::take(&mut node.children),
            edges: std::mem::take(&mut node.sources).into_values().collect(),
            cleanups: std::mem::take(&mut node.cleanups),
        })
    }

    // ------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------

    /// Record that the current owner read `source`.
    ///
    /// A second read in the same execution finds a current edge and does
    /// nothing. An edge left over from before the signal's last write is
    /// replaced.
    pub(crate) fn track<S>(&self, source: &Rc<S>)
    where
        S: Source + 'static,
    {
        let Some(owner) = self.current_owner_id() else {
            return;
        };

        let mut state = self.inner.borrow_mut();
        let Some(node) = state.owners.get_mut(owner) else {
            return;
        };
        if !node.active || node.computation.is_none() {
            return;
        }

        let key = source.id();
        if node
            .sources
            .get(&key)
            .is_some_and(|edge| edge.is_current(source.epoch()))
        {
            return;
        }

        let at = source.subscribe(owner);
        let weak: Weak<S> = Rc::downgrade(source);
        let weak: Weak<dyn Source> = weak;
        node.sources.insert(key, Edge::new(weak, at));
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Runtime")
            .field("owners", &state.owners.len())
            .field("depth", &state.frames.len())
            .finish()
    }
}

fn run_cleanups(cleanups: SmallVec<[Cleanup; 2]>, failures: &mut Vec<String>) {
    for cleanup in cleanups {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cleanup)) {
            failures.push(panic_message(&*payload));
        }
    }
}

fn report(id: OwnerId, failures: &[String]) {
    for failure in failures {
        tracing::error!(owner = %id, error = %failure, "cleanup callback panicked");
    }
}
