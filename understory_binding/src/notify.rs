// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change notification and element lifecycle hubs.
//!
//! Hosts embed a [`ChangeNotifier`] in every bindable object and an
//! [`ElementHooks`] in every element, next to their own property storage.
//! Property setters call [`ChangeNotifier::notify`] after storing a new
//! value; the host raises [`LifecycleEvent`]s through [`ElementHooks::raise`].
//!
//! Handlers are held weakly. The returned [`Subscription`] owns the handler,
//! and dropping it unsubscribes: a dropped handler never runs again, even if
//! a notification is already in flight.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::error::BindingError;
use crate::object::ObjectRef;

/// RAII handle for a registered handler.
///
/// Dropping the subscription removes the handler.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _handler: Rc<dyn Any>,
}

impl Subscription {
    fn new(handler: Rc<dyn Any>) -> Self {
        Self { _handler: handler }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

type ChangeFn = Box<dyn Fn() -> Result<(), BindingError>>;

struct ChangeSlot(ChangeFn);

/// Per-object property change observers, keyed by property name.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use understory_binding::ChangeNotifier;
///
/// let notifier = ChangeNotifier::new();
/// let hits = Rc::new(Cell::new(0));
///
/// let h = hits.clone();
/// let sub = notifier.subscribe("Width", move || {
///     h.set(h.get() + 1);
///     Ok(())
/// });
///
/// notifier.notify("Width").unwrap();
/// notifier.notify("Height").unwrap();
/// assert_eq!(hits.get(), 1);
///
/// drop(sub);
/// notifier.notify("Width").unwrap();
/// assert_eq!(hits.get(), 1);
/// ```
#[derive(Default)]
pub struct ChangeNotifier {
    handlers: RefCell<HashMap<String, SmallVec<[Weak<ChangeSlot>; 2]>>>,
}

impl ChangeNotifier {
    /// Creates a notifier with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for changes of `property`.
    pub fn subscribe(
        &self,
        property: &str,
        callback: impl Fn() -> Result<(), BindingError> + 'static,
    ) -> Subscription {
        let slot = Rc::new(ChangeSlot(Box::new(callback)));
        let mut handlers = self.handlers.borrow_mut();
        let list = handlers.entry(String::from(property)).or_default();
        list.retain(|weak| weak.strong_count() > 0);
        list.push(Rc::downgrade(&slot));
        Subscription::new(slot)
    }

    /// Delivers a change of `property` to every live observer, in
    /// registration order.
    ///
    /// Every observer runs even if an earlier one fails; the first error is
    /// returned.
    pub fn notify(&self, property: &str) -> Result<(), BindingError> {
        let snapshot = match self.handlers.borrow().get(property) {
            Some(list) => list.clone(),
            None => return Ok(()),
        };
        let mut first_error = None;
        for weak in snapshot {
            if let Some(slot) = weak.upgrade()
                && let Err(err) = (slot.0)()
            {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Number of live observers of `property`.
    #[must_use]
    pub fn subscriber_count(&self, property: &str) -> usize {
        self.handlers.borrow().get(property).map_or(0, |list| {
            list.iter().filter(|weak| weak.strong_count() > 0).count()
        })
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.borrow();
        f.debug_struct("ChangeNotifier")
            .field("properties", &handlers.len())
            .finish_non_exhaustive()
    }
}

/// Element lifecycle events that bindings react to.
#[derive(Clone)]
pub enum LifecycleEvent {
    /// The element became ready: pending bindings activate.
    Loaded,
    /// The element left the tree: its bindings are torn down.
    Unloaded,
    /// The element's ambient context object changed.
    ContextChanged {
        /// The previous context.
        old: Option<ObjectRef>,
        /// The new context.
        new: Option<ObjectRef>,
    },
}

impl fmt::Debug for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded => f.write_str("Loaded"),
            Self::Unloaded => f.write_str("Unloaded"),
            Self::ContextChanged { old, new } => f
                .debug_struct("ContextChanged")
                .field("had_old", &old.is_some())
                .field("has_new", &new.is_some())
                .finish(),
        }
    }
}

type HookFn = Box<dyn Fn(&LifecycleEvent) -> Result<(), BindingError>>;

struct HookSlot(HookFn);

/// Lifecycle event hub for one element.
///
/// Errors returned by handlers (for example a binding that fails to activate
/// on `Loaded`) surface from [`raise`](Self::raise), so the host code that
/// drove the lifecycle change sees them.
#[derive(Default)]
pub struct ElementHooks {
    loaded: Cell<bool>,
    handlers: RefCell<Vec<Weak<HookSlot>>>,
}

impl ElementHooks {
    /// Creates hooks for an element that is not loaded yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the last lifecycle transition was `Loaded`.
    #[must_use]
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    /// Registers `callback` for every lifecycle event of this element.
    pub fn subscribe(
        &self,
        callback: impl Fn(&LifecycleEvent) -> Result<(), BindingError> + 'static,
    ) -> Subscription {
        let slot = Rc::new(HookSlot(Box::new(callback)));
        let mut handlers = self.handlers.borrow_mut();
        handlers.retain(|weak| weak.strong_count() > 0);
        handlers.push(Rc::downgrade(&slot));
        Subscription::new(slot)
    }

    /// Delivers `event` to every live handler and returns the first error.
    pub fn raise(&self, event: &LifecycleEvent) -> Result<(), BindingError> {
        match event {
            LifecycleEvent::Loaded => self.loaded.set(true),
            LifecycleEvent::Unloaded => self.loaded.set(false),
            LifecycleEvent::ContextChanged { .. } => {}
        }
        let snapshot = self.handlers.borrow().clone();
        let mut first_error = None;
        for weak in snapshot {
            if let Some(slot) = weak.upgrade()
                && let Err(err) = (slot.0)(event)
            {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Number of live handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl fmt::Debug for ElementHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementHooks")
            .field("loaded", &self.loaded.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
