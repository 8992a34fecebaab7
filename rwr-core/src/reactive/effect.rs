//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect gets its own owner under the current one and
//!    runs immediately to establish initial dependencies.
//!
//! 2. When any dependency changes, the effect re-runs synchronously, inside
//!    the `set` call that changed it.
//!
//! 3. Before re-running, the effect disposes the effects it created last
//!    time, drops its old dependencies and runs its cleanups, then tracks
//!    new ones during execution.
//!
//! # Cleanup
//!
//! Effects register cleanup with [`on_cleanup`](super::on_cleanup). The
//! callback runs before the effect re-runs and when the effect is disposed.
//! This is useful for cleaning up resources like event listeners or timers.
//!
//! # Errors
//!
//! A panic in the effect body unwinds into whoever started the run. Edges
//! and child effects made before the panic stay registered.

use std::rc::Rc;

use super::owner::Owner;
use super::runtime::Runtime;

/// A side-effecting computation that runs when dependencies change.
///
/// Dropping the handle does not stop the effect; its owner does.
///
/// # Example
///
/// ```rust
/// use rwr_core::reactive::{create_signal, Effect};
///
/// let (count, set_count) = create_signal(0);
///
/// let effect = Effect::new(move || {
///     println!("Count is: {}", count.get());
/// });
///
/// set_count.set(5);  // Prints: "Count is: 5"
/// effect.dispose();
/// set_count.set(6);  // Prints nothing
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Effect {
    owner: Owner,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        let runtime = Runtime::current();
        let parent = runtime.current_owner_id();
        let id = runtime.create_owner(parent, Some(Rc::new(run)));
        runtime.execute(id);

        Self {
            owner: Owner::new(runtime, id),
        }
    }

    /// The owner the effect runs in.
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Dispose of the effect.
    ///
    /// After disposal, the effect will not run again.
    pub fn dispose(&self) {
        self.owner.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        !self.owner.is_active()
    }
}

/// Create an effect under the current owner and run it once.
pub fn create_effect<F>(run: F) -> Effect
where
    F: Fn() + 'static,
{
    Effect::new(run)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
