// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host object traits.
//!
//! The binding engine never stores property values itself. It reaches the
//! host through two traits:
//!
//! - [`BindableObject`]: anything with properties. It exposes a
//!   [`TypeInfo`] for accessor resolution and a [`ChangeNotifier`] that its
//!   setters fire.
//! - [`HostElement`]: a bindable object that lives in an element tree, can
//!   find named siblings, has an ambient context object and raises lifecycle
//!   events.

use alloc::rc::Rc;
use core::any::Any;

use crate::error::BindingError;
use crate::notify::{ChangeNotifier, ElementHooks};
use crate::types::TypeInfo;

/// Shared handle to a bindable object.
pub type ObjectRef = Rc<dyn BindableObject>;

/// Shared handle to a host element.
pub type ElementRef = Rc<dyn HostElement>;

/// An object whose properties can be bound.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use understory_binding::{
///     BindableObject, BindingError, ChangeNotifier, PropertyDef, TypeInfo,
/// };
///
/// struct Counter {
///     count: Cell<i32>,
///     notifier: ChangeNotifier,
/// }
///
/// impl Counter {
///     fn set_count(&self, count: i32) -> Result<(), BindingError> {
///         self.count.set(count);
///         self.notifier.notify("Count")
///     }
/// }
///
/// thread_local! {
///     static COUNTER_TYPE: Rc<TypeInfo> = TypeInfo::builder("Counter")
///         .property(
///             "Count",
///             PropertyDef::read_write(|c: &Counter| c.count.get(), Counter::set_count),
///         )
///         .build();
/// }
///
/// impl BindableObject for Counter {
///     fn type_info(&self) -> Rc<TypeInfo> {
///         COUNTER_TYPE.with(Rc::clone)
///     }
///     fn notifier(&self) -> &ChangeNotifier {
///         &self.notifier
///     }
/// }
/// ```
pub trait BindableObject: Any {
    /// Returns the descriptor used to resolve property accessors.
    fn type_info(&self) -> Rc<TypeInfo>;

    /// Returns the notifier fired by this object's property setters.
    fn notifier(&self) -> &ChangeNotifier;
}

/// A bindable element living in a host element tree.
pub trait HostElement: BindableObject {
    /// Returns the element's lifecycle hooks.
    fn hooks(&self) -> &ElementHooks;

    /// Finds the element registered under `name` in this element's scope.
    fn find_name(&self, name: &str) -> Option<ObjectRef>;

    /// Returns the ambient context object, if any.
    fn ambient_context(&self) -> Option<ObjectRef>;
}

/// Identity of a shared object, usable as a map key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey(usize);

impl ObjectKey {
    /// Returns the identity of the object behind `object`.
    #[must_use]
    pub fn of<T: ?Sized>(object: &Rc<T>) -> Self {
        Self(Rc::as_ptr(object).cast::<()>().addr())
    }
}

/// Returns `true` if both handles point at the same object.
#[must_use]
pub fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    ObjectKey::of(a) == ObjectKey::of(b)
}

/// Downcasts `object` to its concrete type.
pub(crate) fn downcast<S: Any>(object: &dyn BindableObject) -> Result<&S, BindingError> {
    let any: &dyn Any = object;
    any.downcast_ref::<S>()
        .ok_or(BindingError::ObjectTypeMismatch {
            expected: core::any::type_name::<S>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain {
        notifier: ChangeNotifier,
    }

    impl BindableObject for Plain {
        fn type_info(&self) -> Rc<TypeInfo> {
            TypeInfo::builder("Plain").build()
        }

        fn notifier(&self) -> &ChangeNotifier {
            &self.notifier
        }
    }

    struct Other;

    #[test]
    fn object_key_tracks_identity() {
        let a: ObjectRef = Rc::new(Plain {
            notifier: ChangeNotifier::new(),
        });
        let b: ObjectRef = Rc::new(Plain {
            notifier: ChangeNotifier::new(),
        });
        let a2 = a.clone();

        assert!(same_object(&a, &a2));
        assert!(!same_object(&a, &b));
        assert_eq!(ObjectKey::of(&a), ObjectKey::of(&a2));
    }

    #[test]
    fn downcast_checks_concrete_type() {
        let plain = Plain {
            notifier: ChangeNotifier::new(),
        };
        assert!(downcast::<Plain>(&plain).is_ok());
        assert!(matches!(
            downcast::<Other>(&plain),
            Err(BindingError::ObjectTypeMismatch { .. })
        ));
    }
}
