//! Memo Implementation
//!
//! A Memo is a read-only derived value. It is built from the same two pieces
//! as everything else: an internal signal holding the last committed value
//! and an internal effect that recomputes it.
//!
//! # How Memos Work
//!
//! 1. On creation, the internal effect runs the computation and commits the
//!    result. The internal signal starts out empty, so the first result
//!    always commits.
//!
//! 2. When a dependency of the computation changes, the effect re-runs and
//!    compares the new result with the committed one.
//!
//! 3. Only a different result is written to the internal signal, which is
//!    what notifies the memo's own readers.
//!
//! A memo therefore recomputes whenever its inputs change but propagates
//! only when its output changes.
//!
//! A memo created while the current owner is already disposed computes its
//! value once, untracked, and never updates.

use std::fmt::{self, Debug};
use std::rc::Rc;

use super::context::untrack;
use super::effect::Effect;
use super::owner::Owner;
use super::signal::Signal;

/// A derived value that notifies readers only when it changes.
///
/// # Type Parameters
///
/// - `T`: The computed value. Computing a memo requires `Clone + PartialEq`:
///   `PartialEq` detects when the result actually changed.
///
/// # Example
///
/// ```rust
/// use rwr_core::reactive::{create_memo, create_signal};
///
/// let (count, set_count) = create_signal(2);
/// let doubled = create_memo(move || count.get() * 2);
/// assert_eq!(doubled.get(), 4);
///
/// set_count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Memo<T: 'static> {
    value: Signal<Option<T>>,
    owner: Owner,
}

impl<T: Clone + PartialEq + 'static> Memo<T> {
    /// Create a memo under the current owner and compute it once.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(None, move |_| compute())
    }

    /// Create a memo whose computation receives the previously committed
    /// value, starting from `initial`.
    ///
    /// If the first result equals `initial`, readers see `initial` and
    /// nothing is written.
    pub fn with_initial<F>(initial: T, compute: F) -> Self
    where
        F: Fn(&T) -> T + 'static,
    {
        Self::build(Some(initial), move |prev| {
            compute(prev.expect("memo with an initial value always has a previous value"))
        })
    }

    fn build<F>(initial: Option<T>, compute: F) -> Self
    where
        F: Fn(Option<&T>) -> T + 'static,
    {
        let compute = Rc::new(compute);
        let value = Signal::new(initial);
        let slot = value.clone();
        let tracked = compute.clone();
        let effect = Effect::new(move || {
            let previous = slot.get_untracked();
            let next = tracked(previous.as_ref());
            if previous.as_ref() != Some(&next) {
                slot.set(Some(next));
            }
        });

        // Created under a disposed owner, the effect never ran. Compute the
        // value once so reads still have something to return.
        if value.with_untracked(Option::is_none) {
            tracing::debug!(owner = %effect.owner().id(), "memo created under a disposed owner");
            let first = untrack(|| compute(None));
            value.set(Some(first));
        }

        Self {
            value,
            owner: effect.owner().clone(),
        }
    }
}

impl<T: 'static> Memo<T> {
    /// Get the current value, subscribing the executing owner.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Borrow the current value, subscribing the executing owner.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.value
            .with(|value| f(value.as_ref().expect("memo is computed on creation")))
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.value
            .with_untracked(|value| value.clone().expect("memo is computed on creation"))
    }

    /// Get the number of owners reading this memo.
    pub fn subscriber_count(&self) -> usize {
        self.value.subscriber_count()
    }

    /// The owner the memo's computation runs in.
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Stop recomputing. The last committed value stays readable.
    pub fn dispose(&self) {
        self.owner.dispose();
    }

    /// Check if the memo has been disposed.
    pub fn is_disposed(&self) -> bool {
        !self.owner.is_active()
    }
}

impl<T: 'static> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            owner: self.owner.clone(),
        }
    }
}

impl<T: Debug + 'static> Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("value", &self.value.with_untracked(|value| format!("{value:?}")))
            .field("owner", &self.owner)
            .finish()
    }
}

/// Create a memo under the current owner.
pub fn create_memo<T, F>(compute: F) -> Memo<T>
where
    T: Clone + PartialEq + 'static,
    F: Fn() -> T + 'static,
{
    Memo::new(compute)
}

/// Create a memo whose computation sees its previous value.
pub fn create_memo_with<T, F>(initial: T, compute: F) -> Memo<T>
where
    T: Clone + PartialEq + 'static,
    F: Fn(&T) -> T + 'static,
{
    Memo::with_initial(initial, compute)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
