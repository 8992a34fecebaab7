//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which owners read it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while an owner is executing, the signal
//!    subscribes that owner. Repeated reads within one execution subscribe
//!    it once.
//!
//! 2. When a write produces a value the equality predicate considers
//!    different, the signal stores it and re-executes every subscriber.
//!
//! 3. The subscriber list is swapped for an empty one before the first
//!    subscriber runs. Owners that re-subscribe while the pass is in
//!    progress are picked up by the next write, not this one.
//!
//! # Equality
//!
//! [`Signal::new`] compares with `PartialEq`. [`SignalOptions`] can install
//! a custom predicate or turn comparison off entirely with
//! [`SignalOptions::always_notify`], for signals whose writes matter more
//! than their values.
//!
//! # Memory Layout
//!
//! Each signal consists of:
//! - A unique ID (8 bytes)
//! - The value, behind `Rc<RefCell<_>>`
//! - A subscriber list (one slot per live subscription, freed slots reused)

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::runtime::{Runtime, WeakRuntime};
use super::subscriber::{OwnerId, SignalId, SlotRef, Source, SubscriberList};

type EqualsFn<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Write-time options for a signal.
pub struct SignalOptions<T> {
    equals: Option<EqualsFn<T>>,
}

impl<T> SignalOptions<T> {
    /// Treat every write as a change, even when the value is the same.
    pub fn always_notify() -> Self {
        Self { equals: None }
    }

    /// Compare values with `equals`; writes it reports as equal are ignored.
    pub fn equals<F>(equals: F) -> Self
    where
        F: Fn(&T, &T) -> bool + 'static,
    {
        Self {
            equals: Some(Rc::new(equals)),
        }
    }
}

impl<T: PartialEq + 'static> Default for SignalOptions<T> {
    fn default() -> Self {
        Self::equals(|prev: &T, next: &T| prev == next)
    }
}

impl<T> Clone for SignalOptions<T> {
    fn clone(&self) -> Self {
        Self {
            equals: self.equals.clone(),
        }
    }
}

impl<T> Debug for SignalOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalOptions")
            .field("compares", &self.equals.is_some())
            .finish()
    }
}

struct SignalInner<T> {
    id: SignalId,
    runtime: WeakRuntime,
    value: RefCell<T>,
    equals: Option<EqualsFn<T>>,
    subscribers: RefCell<SubscriberList>,
}

impl<T> SignalInner<T> {
    fn is_equal(&self, prev: &T, next: &T) -> bool {
        self.equals.as_ref().is_some_and(|equals| equals(prev, next))
    }

    fn notify(&self) {
        let subscribers = self.subscribers.borrow_mut().take();
        let Some(runtime) = self.runtime.upgrade() else {
            return;
        };

        tracing::trace!(signal = %self.id, subscribers = subscribers.len(), "propagating change");
        for owner in subscribers {
            runtime.execute(owner);
        }
    }
}

impl<T> Source for SignalInner<T> {
    fn id(&self) -> SignalId {
        self.id
    }

    fn epoch(&self) -> u64 {
        self.subscribers.borrow().epoch()
    }

    fn subscribe(&self, owner: OwnerId) -> SlotRef {
        self.subscribers.borrow_mut().insert(owner)
    }

    fn unsubscribe(&self, at: SlotRef) {
        self.subscribers.borrow_mut().remove(at);
    }
}

/// A reactive signal holding a value of type T.
///
/// Cloning the handle shares the value.
///
/// # Example
///
/// ```rust
/// use rwr_core::reactive::Signal;
///
/// let count = Signal::new(0);
///
/// // Read the value
/// assert_eq!(count.get(), 0);
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// count.update(|n| n + 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Create a new signal that ignores writes of an equal value.
    pub fn new(value: T) -> Self {
        Self::with_options(value, SignalOptions::default())
    }
}

impl<T: 'static> Signal<T> {
    /// Create a new signal with explicit options.
    pub fn with_options(value: T, options: SignalOptions<T>) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                id: SignalId::next(),
                runtime: Runtime::current().downgrade(),
                value: RefCell::new(value),
                equals: options.equals,
                subscribers: RefCell::new(SubscriberList::default()),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SignalId {
        self.inner.id
    }

    /// Get the current value, subscribing the executing owner.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Borrow the current value, subscribing the executing owner.
    ///
    /// Writing this signal from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        self.with_untracked(f)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.with_untracked(T::clone)
    }

    /// Borrow the current value without tracking dependencies.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Set a new value.
    ///
    /// If the value counts as a change, every subscriber re-executes before
    /// this returns. Returns whether it counted as a change.
    pub fn set(&self, value: T) -> bool {
        let unchanged = {
            let current = self.inner.value.borrow();
            self.inner.is_equal(&current, &value)
        };
        if unchanged {
            return false;
        }

        let previous = std::mem::replace(&mut *self.inner.value.borrow_mut(), value);
        drop(previous);
        self.inner.notify();
        true
    }

    /// Set a value computed from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(&self.inner.value.borrow());
        self.set(next)
    }

    /// Get the number of owners subscribed since the last write.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// A read-only handle to this signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            signal: self.clone(),
        }
    }

    /// Split into read and write halves.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (
            ReadSignal {
                signal: self.clone(),
            },
            WriteSignal { signal: self },
        )
    }

    fn track(&self) {
        if let Some(runtime) = self.inner.runtime.upgrade() {
            runtime.track(&self.inner);
        }
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Read half of a signal.
pub struct ReadSignal<T: 'static> {
    signal: Signal<T>,
}

impl<T: 'static> ReadSignal<T> {
    /// Get the current value, subscribing the executing owner.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.signal.get()
    }

    /// Borrow the current value, subscribing the executing owner.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.signal.get_untracked()
    }

    /// Borrow the current value without tracking dependencies.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with_untracked(f)
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SignalId {
        self.signal.id()
    }

    /// Get the number of owners subscribed since the last write.
    pub fn subscriber_count(&self) -> usize {
        self.signal.subscriber_count()
    }
}

impl<T: 'static> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T: Debug + 'static> Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.signal).finish()
    }
}

/// Write half of a signal.
pub struct WriteSignal<T: 'static> {
    signal: Signal<T>,
}

impl<T: 'static> WriteSignal<T> {
    /// Set a new value. Returns whether it counted as a change.
    pub fn set(&self, value: T) -> bool {
        self.signal.set(value)
    }

    /// Set a value computed from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        self.signal.update(f)
    }
}

impl<T: 'static> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T: 'static> Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSignal")
            .field("id", &self.signal.id())
            .finish()
    }
}

/// Create a signal and return its read and write halves.
pub fn create_signal<T: PartialEq + 'static>(value: T) -> (ReadSignal<T>, WriteSignal<T>) {
    Signal::new(value).split()
}

/// Create a signal with explicit options and return its halves.
pub fn create_signal_with<T: 'static>(
    value: T,
    options: SignalOptions<T>,
) -> (ReadSignal<T>, WriteSignal<T>) {
    Signal::with_options(value, options).split()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{create_effect, create_root, untrack};
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<i32>>, impl Fn() + Clone) {
        let count = Rc::new(Cell::new(0));
        let bump = {
            let count = count.clone();
            move || count.set(count.get() + 1)
        };
        (count, bump)
    }

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        assert!(signal.set(42));
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn read_without_owner_registers_nothing() {
        let signal = Signal::new(1);
        assert_eq!(signal.get(), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn equal_write_is_a_no_op() {
        let signal = Signal::new(3);
        let (runs, bump) = counter();
        let source = signal.clone();
        create_effect(move || {
            source.get();
            bump();
        });

        assert!(!signal.set(3));
        assert_eq!(runs.get(), 1);
        assert_eq!(signal.subscriber_count(), 1);

        assert!(signal.set(4));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn always_notify_fires_on_identical_writes() {
        let (read, write) = create_signal_with((), SignalOptions::always_notify());
        let (runs, bump) = counter();
        create_effect(move || {
            read.get();
            bump();
        });

        assert!(write.set(()));
        assert!(write.set(()));
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn custom_equality_decides_changes() {
        let signal = Signal::with_options(
            String::from("a"),
            SignalOptions::equals(|prev: &String, next: &String| {
                prev.eq_ignore_ascii_case(next)
            }),
        );

        assert!(!signal.set("A".into()));
        assert_eq!(signal.get(), "a");
        assert!(signal.set("b".into()));
        assert_eq!(signal.get(), "b");
    }

    #[test]
    fn repeated_reads_subscribe_once() {
        let signal = Signal::new(0);
        let (runs, bump) = counter();
        let source = signal.clone();
        create_effect(move || {
            for _ in 0..5 {
                source.get();
            }
            bump();
        });

        assert_eq!(signal.subscriber_count(), 1);
        signal.set(1);
        assert_eq!(runs.get(), 2);
        assert_eq!(signal.subscriber_count(), 1);
    }

    #[test]
    fn untracked_reads_do_not_subscribe() {
        let signal = Signal::new(0);
        let (runs, bump) = counter();
        let source = signal.clone();
        create_effect(move || {
            source.get_untracked();
            untrack(|| source.get());
            bump();
        });

        assert_eq!(signal.subscriber_count(), 0);
        signal.set(1);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn disposed_subscribers_are_dropped() {
        let signal = Signal::new(0);
        let (runs, bump) = counter();
        let source = signal.clone();
        let dispose = create_root(move |dispose| {
            create_effect(move || {
                source.get();
                bump();
            });
            dispose
        });

        assert_eq!(signal.subscriber_count(), 1);
        dispose.dispose();
        assert_eq!(signal.subscriber_count(), 0);

        signal.set(1);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn unwritten_signal_storage_stays_bounded() {
        let stable = Signal::new(0);
        let tick = Signal::new(0);

        let (s, t) = (stable.clone(), tick.clone());
        create_effect(move || {
            s.get();
            t.get();
        });

        for value in 1..=10_000 {
            tick.set(value);
        }

        assert_eq!(stable.subscriber_count(), 1);
        assert_eq!(stable.inner.subscribers.borrow().capacity(), 1);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);

        signal2.set(100);
        assert_eq!(signal1.get(), 100);
        assert_eq!(signal1.id(), signal2.id());
    }

    #[test]
    fn split_halves_share_state() {
        let (read, write) = create_signal(String::from("x"));
        write.update(|s| format!("{s}y"));
        assert_eq!(read.get(), "xy");
        assert_eq!(read.with(String::len), 2);
    }
}
