//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos, effects,
//! and the ownership tree that ties their lifetimes together.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while an owner is executing, the signal registers that owner as a
//! subscriber. When the signal's value changes, every subscriber re-runs.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs once on creation and
//! again whenever its dependencies change. Effects created while another
//! effect runs become its children and are torn down when it re-runs.
//!
//! ## Memos
//!
//! A Memo is a derived value. It recomputes when its inputs change and
//! notifies its readers only when the result is different.
//!
//! ## Owners
//!
//! Every effect and memo runs inside an [`Owner`]. Disposing an owner
//! disposes everything created under it, runs its cleanups, and unsubscribes
//! it from every signal, after which nothing can make it run again.
//! [`create_root`] makes a detached owner that lives until it is disposed.
//!
//! # Implementation Notes
//!
//! The current owner is the top of a stack of tracking frames kept by the
//! [`Runtime`]. Frames are pushed and popped by guards, so the stack stays
//! balanced when a computation panics.
//!
//! Propagation is synchronous: `set` returns after every affected
//! computation has re-run.

mod context;
mod effect;
mod memo;
mod owner;
mod runtime;
mod signal;
mod subscriber;

pub use context::untrack;
pub use effect::{create_effect, Effect};
pub use memo::{create_memo, create_memo_with, Memo};
pub use owner::{create_root, get_owner, on_cleanup, try_on_cleanup, Disposer, Owner};
pub use runtime::Runtime;
pub use signal::{
    create_signal, create_signal_with, ReadSignal, Signal, SignalOptions, WriteSignal,
};
pub use subscriber::{OwnerId, SignalId};
