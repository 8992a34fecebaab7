//! Error types for the reactive runtime.
//!
//! Computations themselves never return errors: a panic inside an effect or
//! memo unwinds straight through the `set` or `create_*` call that started
//! it. The errors here cover the operations that can be refused or that
//! collect failures on behalf of the caller.

use std::any::Any;

use thiserror::Error;

use crate::reactive::OwnerId;

/// Errors reported by ownership operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    /// A cleanup was registered while no owner was executing.
    #[error("no reactive owner is currently executing")]
    NoOwner,

    /// The targeted owner has already been disposed.
    #[error("{0} has already been disposed")]
    Disposed(OwnerId),

    /// One or more cleanup callbacks panicked during teardown.
    ///
    /// The remaining callbacks and the rest of the teardown still ran.
    #[error("{count} cleanup callback(s) panicked during teardown; first: {first}")]
    CleanupPanicked {
        /// Number of callbacks that panicked.
        count: usize,
        /// Panic message of the first failing callback.
        first: String,
    },
}

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

impl ReactiveError {
    /// Fold collected cleanup panic messages into a result.
    pub(crate) fn from_cleanup_failures(failures: Vec<String>) -> Result<()> {
        let count = failures.len();
        match failures.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(Self::CleanupPanicked { count, first }),
        }
    }
}

/// Extract a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
