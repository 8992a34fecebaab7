//! Tracking Frames
//!
//! The runtime keeps a stack of frames recording which owner is currently
//! executing. Signals read the top frame to decide who to subscribe, and new
//! owners read it to find their parent.
//!
//! # Implementation
//!
//! Frames are pushed by [`ContextGuard::enter`] and popped when the guard is
//! dropped, so the previous frame is restored on every exit path, including
//! a panic unwinding out of a computation. An empty frame (`None`) hides the
//! enclosing owner; that is how [`untrack`] works.

use super::runtime::Runtime;
use super::subscriber::OwnerId;

/// Guard that pops its frame when dropped.
pub(crate) struct ContextGuard<'a> {
    runtime: &'a Runtime,
    frame: Option<OwnerId>,
}

impl<'a> ContextGuard<'a> {
    /// Push `frame` as the current context of `runtime`.
    pub(crate) fn enter(runtime: &'a Runtime, frame: Option<OwnerId>) -> Self {
        runtime.push_frame(frame);
        Self { runtime, frame }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.runtime.pop_frame();

        // Verify we're popping the right frame.
        debug_assert_eq!(
            popped,
            Some(self.frame),
            "tracking frame mismatch: expected {:?}, got {:?}",
            self.frame,
            popped
        );
    }
}

/// Run `f` without tracking.
///
/// Signals read inside `f` register no dependency on the enclosing owner,
/// and effects created inside `f` become roots.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    Runtime::current().run_with(None, f)
}
