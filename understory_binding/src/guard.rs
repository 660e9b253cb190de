// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reentrancy suppression for programmatic writes.
//!
//! Every change handler a coordinator installs (one on the target property,
//! one per observed source property) owns a [`ReentrancyGuard`]. Before the
//! coordinator writes that same property it enters a [`SuppressScope`]; the
//! handler checks [`ReentrancyGuard::is_suppressed`] and does nothing while
//! the scope is alive. Scopes nest, and suppression ends when the last scope
//! drops, including on early return through `?`.
//!
//! Suppression only silences the coordinator's own handler; other observers
//! of the property still see the change.

use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;

/// Suppression flag for one (object, property) handler.
///
/// ```rust
/// use understory_binding::ReentrancyGuard;
///
/// let guard = ReentrancyGuard::new();
/// assert!(!guard.is_suppressed());
/// {
///     let _outer = guard.suppress();
///     let _inner = guard.suppress();
///     assert!(guard.is_suppressed());
/// }
/// assert!(!guard.is_suppressed());
/// ```
#[derive(Clone, Default)]
pub struct ReentrancyGuard {
    depth: Rc<Cell<u32>>,
}

impl ReentrancyGuard {
    /// Creates a guard that is not suppressed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a [`SuppressScope`] is alive.
    #[must_use]
    #[inline]
    pub fn is_suppressed(&self) -> bool {
        self.depth.get() > 0
    }

    /// Suppresses the guarded handler until the returned scope drops.
    pub fn suppress(&self) -> SuppressScope {
        self.depth.set(self.depth.get() + 1);
        SuppressScope {
            depth: Rc::clone(&self.depth),
        }
    }

    /// Runs `f` with the guarded handler suppressed.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = self.suppress();
        f()
    }
}

impl fmt::Debug for ReentrancyGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReentrancyGuard")
            .field("depth", &self.depth.get())
            .finish()
    }
}

/// Live suppression of a [`ReentrancyGuard`].
#[must_use = "suppression ends when the scope is dropped"]
pub struct SuppressScope {
    depth: Rc<Cell<u32>>,
}

impl Drop for SuppressScope {
    fn drop(&mut self) {
        let depth = self.depth.get();
        debug_assert!(depth > 0, "unbalanced suppression scope");
        self.depth.set(depth.saturating_sub(1));
    }
}

impl fmt::Debug for SuppressScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuppressScope")
            .field("depth", &self.depth.get())
            .finish()
    }
}
