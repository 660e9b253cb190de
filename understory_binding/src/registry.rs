// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Active multi-bindings keyed by target element and property.
//!
//! The [`BindingRegistry`] is owned by whatever owns the element tree. It
//! guarantees at most one coordinator per `(element, property)` and ties
//! each coordinator to its element's lifecycle:
//!
//! - attaching to a loaded element activates immediately;
//! - attaching to an element that is not loaded yet leaves the coordinator
//!   [`Pending`](crate::CoordinatorState::Pending) until `Loaded`;
//! - `Unloaded` removes and tears down every coordinator of the element.

use alloc::rc::{Rc, Weak};
use alloc::string::String;
use core::cell::RefCell;
use core::fmt;

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::accessor::AccessorResolver;
use crate::binding::MultiBinding;
use crate::coordinator::{Coordinator, CoordinatorState};
use crate::error::BindingError;
use crate::notify::{LifecycleEvent, Subscription};
use crate::object::{ElementRef, ObjectKey};

type EntryKey = (ObjectKey, String);

struct RegistryEntry {
    coordinator: Coordinator,
    _lifecycle: Subscription,
}

#[derive(Default)]
struct RegistryInner {
    entries: HashMap<EntryKey, RegistryEntry>,
}

impl RegistryInner {
    fn coordinator(&self, key: &EntryKey) -> Option<Coordinator> {
        self.entries.get(key).map(|entry| entry.coordinator.clone())
    }
}

/// Registry of active multi-bindings.
///
/// # Example
///
/// ```rust
/// # use std::cell::RefCell;
/// # use std::rc::Rc;
/// # use understory_binding::*;
/// # struct Label { text: RefCell<String>, notifier: ChangeNotifier, hooks: ElementHooks }
/// # impl BindableObject for Label {
/// #     fn type_info(&self) -> Rc<TypeInfo> {
/// #         thread_local! {
/// #             static LABEL: Rc<TypeInfo> = TypeInfo::builder("Label")
/// #                 .property("Text", PropertyDef::read_write(
/// #                     |l: &Label| l.text.borrow().clone(),
/// #                     |l: &Label, t: String| { *l.text.borrow_mut() = t; l.notifier.notify("Text") },
/// #                 ))
/// #                 .build();
/// #         }
/// #         LABEL.with(Rc::clone)
/// #     }
/// #     fn notifier(&self) -> &ChangeNotifier { &self.notifier }
/// # }
/// # impl HostElement for Label {
/// #     fn hooks(&self) -> &ElementHooks { &self.hooks }
/// #     fn find_name(&self, _: &str) -> Option<ObjectRef> { None }
/// #     fn ambient_context(&self) -> Option<ObjectRef> { None }
/// # }
/// let label = Rc::new(Label {
///     text: RefCell::new(String::new()),
///     notifier: ChangeNotifier::new(),
///     hooks: ElementHooks::new(),
/// });
/// let element: ElementRef = label.clone();
/// let registry = BindingRegistry::new();
///
/// let binding = MultiBinding::builder().format("ready").build();
/// let coordinator = registry.attach(&element, "Text", binding).unwrap();
/// assert_eq!(coordinator.state(), CoordinatorState::Pending);
///
/// label.hooks.raise(&LifecycleEvent::Loaded).unwrap();
/// assert_eq!(coordinator.state(), CoordinatorState::Listening);
/// assert_eq!(*label.text.borrow(), "ready");
///
/// label.hooks.raise(&LifecycleEvent::Unloaded).unwrap();
/// assert!(registry.find(&element, "Text").is_none());
/// ```
pub struct BindingRegistry {
    inner: Rc<RefCell<RegistryInner>>,
    resolver: Rc<AccessorResolver>,
}

impl BindingRegistry {
    /// An empty registry using the default [`AccessorResolver`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_resolver(AccessorResolver::new())
    }

    /// An empty registry resolving accessors with `resolver`.
    #[must_use]
    pub fn with_resolver(resolver: AccessorResolver) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner::default())),
            resolver: Rc::new(resolver),
        }
    }

    /// The shared accessor resolver.
    #[must_use]
    pub fn resolver(&self) -> &AccessorResolver {
        &self.resolver
    }

    /// Binds `property` of `element` with `binding`.
    ///
    /// Fails with [`BindingError::AlreadyAttached`] if the property already
    /// carries a multi-binding, and with any configuration error before
    /// anything is registered. If the element is loaded the coordinator
    /// activates now and activation errors are returned; otherwise it waits
    /// for `Loaded`.
    pub fn attach(
        &self,
        element: &ElementRef,
        property: &str,
        binding: MultiBinding,
    ) -> Result<Coordinator, BindingError> {
        let key = (ObjectKey::of(element), String::from(property));
        if self.inner.borrow().entries.contains_key(&key) {
            return Err(BindingError::AlreadyAttached {
                property: String::from(property),
            });
        }
        binding.validate()?;

        let coordinator = Coordinator::new(
            Rc::clone(element),
            property,
            binding,
            Rc::clone(&self.resolver),
        );
        let lifecycle = {
            let registry = Rc::downgrade(&self.inner);
            let key = key.clone();
            element
                .hooks()
                .subscribe(move |event| on_lifecycle(&registry, &key, event))
        };
        self.inner.borrow_mut().entries.insert(
            key.clone(),
            RegistryEntry {
                coordinator: coordinator.clone(),
                _lifecycle: lifecycle,
            },
        );
        debug!(
            property,
            loaded = element.hooks().is_loaded(),
            "multi-binding attached"
        );

        if element.hooks().is_loaded()
            && let Err(err) = coordinator.activate()
        {
            let entry = self.inner.borrow_mut().entries.remove(&key);
            drop(entry);
            return Err(err);
        }
        Ok(coordinator)
    }

    /// Tears down the multi-binding on `property` of `element`.
    ///
    /// Returns whether one existed.
    pub fn detach<T: ?Sized>(&self, element: &Rc<T>, property: &str) -> bool {
        let key = (ObjectKey::of(element), String::from(property));
        let entry = self.inner.borrow_mut().entries.remove(&key);
        match entry {
            Some(entry) => {
                entry.coordinator.teardown();
                debug!(property, "multi-binding removed");
                true
            }
            None => false,
        }
    }

    /// The coordinator bound to `property` of `element`, if any.
    #[must_use]
    pub fn find<T: ?Sized>(&self, element: &Rc<T>, property: &str) -> Option<Coordinator> {
        self.inner
            .borrow()
            .coordinator(&(ObjectKey::of(element), String::from(property)))
    }

    /// Number of registered coordinators, pending or listening.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Whether no coordinator is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }
}

fn on_lifecycle(
    registry: &Weak<RefCell<RegistryInner>>,
    key: &EntryKey,
    event: &LifecycleEvent,
) -> Result<(), BindingError> {
    let Some(registry) = registry.upgrade() else {
        return Ok(());
    };
    match event {
        LifecycleEvent::Loaded => {
            let pending = registry
                .borrow()
                .coordinator(key)
                .filter(|c| c.state() == CoordinatorState::Pending);
            let Some(coordinator) = pending else {
                return Ok(());
            };
            if let Err(err) = coordinator.activate() {
                warn!(
                    property = %key.1,
                    error = %err,
                    "deferred multi-binding activation failed"
                );
                let entry = registry.borrow_mut().entries.remove(key);
                drop(entry);
                return Err(err);
            }
            Ok(())
        }
        LifecycleEvent::Unloaded => {
            let entry = registry.borrow_mut().entries.remove(key);
            if let Some(entry) = entry {
                entry.coordinator.teardown();
                debug!(property = %key.1, "element unloaded, multi-binding removed");
            }
            Ok(())
        }
        LifecycleEvent::ContextChanged { .. } => Ok(()),
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("entries", &self.len())
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
