// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Binding: multi-source property bindings.
//!
//! This crate drives one target property from several source properties,
//! the way a WinUI `MultiBinding` does. Source values are combined by a
//! [`MultiValueConverter`] or a positional format string, written to the
//! target, and for two-way bindings target edits are split back into the
//! sources. Programmatic writes are guarded so neither direction re-enters
//! itself.
//!
//! ## Core Concepts
//!
//! ### Host model
//!
//! The engine does not store property values. Hosts implement:
//!
//! - [`BindableObject`]: exposes a [`TypeInfo`] describing its properties and
//!   a [`ChangeNotifier`] its setters fire.
//! - [`HostElement`]: a bindable object with [`ElementHooks`] (lifecycle
//!   events), named-element lookup and an ambient context object.
//!
//! ### Pieces
//!
//! - [`PropertyAccessor`]: a capability-checked handle to one property,
//!   resolved once per `(type, path)` by an [`AccessorResolver`].
//! - [`SourceBinding`] / [`MultiBinding`]: the declarative description.
//! - [`Coordinator`]: the live binding for one target property.
//! - [`BindingRegistry`]: at most one coordinator per target property, torn
//!   down when the element unloads.
//! - [`ReentrancyGuard`]: scoped suppression of a change handler.
//!
//! ### Source resolution
//!
//! Each source is located by the first configured strategy: an explicit
//! object, a named element, the target itself
//! ([`RelativeSource::SelfElement`]) or the ambient context. Ambient
//! sources follow context changes.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use understory_binding::{
//!     BindableObject, BindingError, BindingRegistry, ChangeNotifier, ElementHooks, ElementRef,
//!     FnConverter, HostElement, LifecycleEvent, MultiBinding, ObjectRef, PropertyDef,
//!     SourceBinding, TypeInfo, Value,
//! };
//!
//! // A host element with two inputs and one output.
//! struct Panel {
//!     a: Cell<i32>,
//!     b: Cell<i32>,
//!     total: Cell<i32>,
//!     notifier: ChangeNotifier,
//!     hooks: ElementHooks,
//! }
//!
//! fn setter(
//!     field: fn(&Panel) -> &Cell<i32>,
//!     name: &'static str,
//! ) -> impl Fn(&Panel, i32) -> Result<(), BindingError> {
//!     move |panel, value| {
//!         field(panel).set(value);
//!         panel.notifier.notify(name)
//!     }
//! }
//!
//! impl BindableObject for Panel {
//!     fn type_info(&self) -> Rc<TypeInfo> {
//!         thread_local! {
//!             static PANEL: Rc<TypeInfo> = TypeInfo::builder("Panel")
//!                 .property("A", PropertyDef::read_write(|p: &Panel| p.a.get(), setter(|p| &p.a, "A")))
//!                 .property("B", PropertyDef::read_write(|p: &Panel| p.b.get(), setter(|p| &p.b, "B")))
//!                 .property(
//!                     "Total",
//!                     PropertyDef::read_write(|p: &Panel| p.total.get(), setter(|p| &p.total, "Total")),
//!                 )
//!                 .build();
//!         }
//!         PANEL.with(Rc::clone)
//!     }
//!     fn notifier(&self) -> &ChangeNotifier {
//!         &self.notifier
//!     }
//! }
//!
//! impl HostElement for Panel {
//!     fn hooks(&self) -> &ElementHooks {
//!         &self.hooks
//!     }
//!     fn find_name(&self, _: &str) -> Option<ObjectRef> {
//!         None
//!     }
//!     fn ambient_context(&self) -> Option<ObjectRef> {
//!         None
//!     }
//! }
//!
//! let panel = Rc::new(Panel {
//!     a: Cell::new(3),
//!     b: Cell::new(4),
//!     total: Cell::new(0),
//!     notifier: ChangeNotifier::new(),
//!     hooks: ElementHooks::new(),
//! });
//! let element: ElementRef = panel.clone();
//! let source: ObjectRef = panel.clone();
//!
//! let registry = BindingRegistry::new();
//! registry
//!     .attach(
//!         &element,
//!         "Total",
//!         MultiBinding::builder()
//!             .source(SourceBinding::path("A").source(source.clone()))
//!             .source(SourceBinding::path("B").source(source))
//!             .converter(FnConverter::new(|values| {
//!                 Value::new(values.iter().filter_map(Value::get::<i32>).sum::<i32>())
//!             }))
//!             .build(),
//!     )
//!     .unwrap();
//!
//! // Activation waits for the element to load, then synchronizes once.
//! panel.hooks.raise(&LifecycleEvent::Loaded).unwrap();
//! assert_eq!(panel.total.get(), 7);
//!
//! let set_a = setter(|p| &p.a, "A");
//! set_a(&*panel, 5).unwrap();
//! assert_eq!(panel.total.get(), 9);
//! ```
//!
//! ## Errors
//!
//! Configuration and resolution problems ([`BindingError::PropertyNotFound`],
//! [`BindingError::ElementNotFound`], [`BindingError::ModeCapability`], ...)
//! abort activation with nothing left wired. Conversion failures during
//! propagation are returned to whoever triggered the change, through
//! [`ChangeNotifier::notify`] or [`ElementHooks::raise`].
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: `debug` for activation, teardown and
//! context re-resolution, `trace` for every propagation. Installing a
//! subscriber is up to the host.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It is single-threaded: handles
//! are `Rc`-based and neither `Send` nor `Sync`.

#![no_std]

extern crate alloc;

mod accessor;
mod binding;
mod converter;
mod coordinator;
mod error;
mod guard;
mod mode;
mod notify;
mod object;
mod registry;
mod source;
#[cfg(test)]
mod testing;
mod types;
mod value;

pub use accessor::{
    Access, AccessorKind, AccessorResolver, AccessorStrategy, AttachedMethodStrategy,
    DeclaredPropertyStrategy, PropertyAccessor,
};
pub use binding::{
    MultiBinding, MultiBindingBuilder, RelativeSource, ResolutionKind, SourceBinding,
};
pub use converter::{FnConverter, MultiValueConverter, format_positional};
pub use coordinator::{Coordinator, CoordinatorState};
pub use error::BindingError;
pub use guard::{ReentrancyGuard, SuppressScope};
pub use mode::{BindingMode, UpdateSourceTrigger};
pub use notify::{ChangeNotifier, ElementHooks, LifecycleEvent, Subscription};
pub use object::{BindableObject, ElementRef, HostElement, ObjectKey, ObjectRef, same_object};
pub use registry::BindingRegistry;
pub use source::SourceState;
pub use types::{MethodDef, PropertyDef, TypeInfo, TypeInfoBuilder, Visibility};
pub use value::{ErasedValue, Value, ValueType};
