//! RWR Core
//!
//! This crate provides a fine-grained reactive runtime: computations re-run
//! automatically when the data they read changes, with no explicit
//! subscription wiring and no tree diffing.
//!
//! It implements:
//!
//! - Reactive primitives (signals, memos, effects)
//! - An ownership tree that scopes cleanup and cancellation
//! - Untracked reads and detached roots
//!
//! Rendering layers build on these primitives; markup and mounting live
//! outside this crate.
//!
//! # Architecture
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `error`: Errors reported by ownership operations
//!
//! # Example
//!
//! ```rust
//! use rwr_core::reactive::{create_effect, create_memo, create_signal};
//!
//! // Create a signal
//! let (count, set_count) = create_signal(0);
//!
//! // Create a derived value
//! let doubled = create_memo(move || count.get() * 2);
//!
//! // Create an effect
//! create_effect(move || {
//!     println!("Doubled: {}", doubled.get());
//! });
//!
//! // Update the signal
//! set_count.set(5);
//! // Effect automatically runs, prints: "Doubled: 10"
//! ```

pub mod error;
pub mod reactive;

pub use error::{ReactiveError, Result};
