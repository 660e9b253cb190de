// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Aggregation and propagation for one bound target property.
//!
//! A [`Coordinator`] owns the source items of a [`MultiBinding`] and the
//! accessor of its target property.
//!
//! - **Source to target:** read the sources in declaration order, combine
//!   them with the format string or the converter, post-process `null` and
//!   unset results, coerce to the target type and write the target with the
//!   target handler suppressed.
//! - **Target to sources** (two-way only): read the target, convert back and
//!   write each two-way source with that source's handler suppressed.
//!
//! Activation is all or nothing: every failure tears down whatever was
//! wired and leaves the coordinator [`Detached`](CoordinatorState::Detached).

use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::accessor::{AccessorResolver, PropertyAccessor};
use crate::binding::{MultiBinding, ResolutionKind};
use crate::converter::format_positional;
use crate::error::BindingError;
use crate::guard::ReentrancyGuard;
use crate::mode::{BindingMode, UpdateSourceTrigger};
use crate::notify::Subscription;
use crate::object::{ElementRef, ObjectRef};
use crate::source::{ReadPlan, SourceItem, SourceState, WriteBack};
use crate::value::{Value, ValueType};

/// Lifecycle state of a [`Coordinator`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CoordinatorState {
    /// Registered, waiting for the target element to load.
    #[default]
    Pending,
    /// Fully wired and propagating.
    Listening,
    /// Torn down, or activation failed.
    Detached,
}

/// Which sources a source-to-target update reads again.
#[derive(Copy, Clone, Debug)]
enum Refresh {
    All,
    Item(usize),
}

impl Refresh {
    fn includes(self, index: usize) -> bool {
        match self {
            Self::All => true,
            Self::Item(i) => i == index,
        }
    }
}

struct CoordinatorInner {
    target: ElementRef,
    target_path: String,
    binding: MultiBinding,
    resolver: Rc<AccessorResolver>,
    state: Cell<CoordinatorState>,
    target_accessor: RefCell<Option<Rc<PropertyAccessor>>>,
    target_guard: ReentrancyGuard,
    target_sub: RefCell<Option<Subscription>>,
    items: RefCell<Vec<SourceItem>>,
}

/// Drives one target property from a [`MultiBinding`].
///
/// Handles are cheap to clone and share the same coordinator. Coordinators
/// are created by [`BindingRegistry::attach`](crate::BindingRegistry::attach).
#[derive(Clone)]
pub struct Coordinator {
    inner: Rc<CoordinatorInner>,
}

impl Coordinator {
    pub(crate) fn new(
        target: ElementRef,
        target_path: &str,
        binding: MultiBinding,
        resolver: Rc<AccessorResolver>,
    ) -> Self {
        let mode = binding.mode();
        let items = binding
            .sources()
            .iter()
            .map(|source| SourceItem::new(source.clone(), mode))
            .collect();
        Self {
            inner: Rc::new(CoordinatorInner {
                target,
                target_path: String::from(target_path),
                binding,
                resolver,
                state: Cell::new(CoordinatorState::Pending),
                target_accessor: RefCell::new(None),
                target_guard: ReentrancyGuard::new(),
                target_sub: RefCell::new(None),
                items: RefCell::new(items),
            }),
        }
    }

    fn from_weak(weak: &Weak<CoordinatorInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        self.inner.state.get()
    }

    /// The overall binding mode.
    #[must_use]
    pub fn mode(&self) -> BindingMode {
        self.inner.binding.mode()
    }

    /// The bound target property.
    #[must_use]
    pub fn target_path(&self) -> &str {
        &self.inner.target_path
    }

    /// The target element.
    #[must_use]
    pub fn target(&self) -> &ElementRef {
        &self.inner.target
    }

    /// The binding description this coordinator was built from.
    #[must_use]
    pub fn binding(&self) -> &MultiBinding {
        &self.inner.binding
    }

    /// Resolution state of each source, in declaration order.
    #[must_use]
    pub fn source_states(&self) -> Vec<SourceState> {
        self.inner.items.borrow().iter().map(SourceItem::state).collect()
    }

    /// Effective mode of each source, in declaration order.
    #[must_use]
    pub fn source_modes(&self) -> Vec<BindingMode> {
        self.inner.items.borrow().iter().map(SourceItem::mode).collect()
    }

    /// Resolves, validates and wires everything, then synchronizes the
    /// target once.
    pub(crate) fn activate(&self) -> Result<(), BindingError> {
        debug_assert_eq!(
            self.state(),
            CoordinatorState::Pending,
            "coordinator activated twice"
        );
        match self.try_activate() {
            Ok(()) => {
                debug!(
                    property = %self.inner.target_path,
                    mode = %self.mode(),
                    sources = self.inner.items.borrow().len(),
                    "multi-binding activated"
                );
                Ok(())
            }
            Err(err) => {
                debug!(
                    property = %self.inner.target_path,
                    error = %err,
                    "multi-binding activation failed"
                );
                self.release();
                Err(err)
            }
        }
    }

    fn try_activate(&self) -> Result<(), BindingError> {
        let inner = &*self.inner;
        let mode = inner.binding.mode();
        inner.binding.validate()?;

        let accessor = inner
            .resolver
            .resolve(&inner.target.type_info(), &inner.target_path)?;
        accessor.check_target_mode(mode)?;
        *inner.target_accessor.borrow_mut() = Some(accessor);

        for item in inner.items.borrow_mut().iter_mut() {
            item.resolve(&inner.target, &inner.resolver)?;
        }

        let weak = Rc::downgrade(&self.inner);
        let count = inner.items.borrow().len();
        for index in 0..count {
            self.listen_to_source(index);
            let mut items = inner.items.borrow_mut();
            if items[index].kind() == ResolutionKind::AmbientContext {
                let weak = weak.clone();
                items[index].watch_context(&inner.target, move |context| {
                    Self::from_weak(&weak)
                        .map_or(Ok(()), |this| this.on_context_changed(index, context))
                });
            }
        }

        if mode.writes_back() {
            let guard = inner.target_guard.clone();
            let weak = weak.clone();
            let subscription = inner.target.notifier().subscribe(&inner.target_path, move || {
                if guard.is_suppressed() {
                    return Ok(());
                }
                Self::from_weak(&weak).map_or(Ok(()), |this| this.on_target_changed())
            });
            *inner.target_sub.borrow_mut() = Some(subscription);
        }

        inner.state.set(CoordinatorState::Listening);
        self.push_to_target(Refresh::All)
    }

    fn listen_to_source(&self, index: usize) {
        let weak = Rc::downgrade(&self.inner);
        self.inner.items.borrow_mut()[index].listen(move || {
            Self::from_weak(&weak).map_or(Ok(()), |this| this.on_source_changed(index))
        });
    }

    fn on_source_changed(&self, index: usize) -> Result<(), BindingError> {
        trace!(
            property = %self.inner.target_path,
            source = index,
            "source changed"
        );
        self.push_to_target(Refresh::Item(index))
    }

    fn on_target_changed(&self) -> Result<(), BindingError> {
        match self.inner.binding.update_trigger() {
            UpdateSourceTrigger::OnPropertyChanged => self.push_to_sources(),
            UpdateSourceTrigger::Explicit => Ok(()),
        }
    }

    fn on_context_changed(
        &self,
        index: usize,
        context: Option<ObjectRef>,
    ) -> Result<(), BindingError> {
        let inner = &*self.inner;
        if self.state() != CoordinatorState::Listening
            || inner.items.borrow()[index].is_bound_to(context.as_ref())
        {
            return Ok(());
        }
        debug!(
            property = %inner.target_path,
            source = index,
            has_context = context.is_some(),
            "ambient context changed, re-resolving source"
        );
        inner.items.borrow_mut()[index].bind_to(context, &inner.resolver)?;
        self.listen_to_source(index);
        self.push_to_target(Refresh::Item(index))
    }

    /// Forces the source-to-target path, reading every observed source again.
    ///
    /// Does nothing unless the coordinator is listening.
    pub fn update_target(&self) -> Result<(), BindingError> {
        self.push_to_target(Refresh::All)
    }

    /// Forces the target-to-source path.
    ///
    /// This is how target edits reach the sources under
    /// [`UpdateSourceTrigger::Explicit`]. Does nothing unless the coordinator
    /// is listening in [`BindingMode::TwoWay`].
    pub fn update_source(&self) -> Result<(), BindingError> {
        self.push_to_sources()
    }

    fn target_accessor(&self) -> Option<Rc<PropertyAccessor>> {
        self.inner.target_accessor.borrow().clone()
    }

    fn push_to_target(&self, refresh: Refresh) -> Result<(), BindingError> {
        let inner = &*self.inner;
        if self.state() != CoordinatorState::Listening {
            return Ok(());
        }
        let Some(accessor) = self.target_accessor() else {
            debug_assert!(false, "listening coordinator without a target accessor");
            return Ok(());
        };

        let plans: SmallVec<[ReadPlan; 4]> = inner
            .items
            .borrow()
            .iter()
            .enumerate()
            .map(|(index, item)| item.plan(refresh.includes(index)))
            .collect();
        let values = plans
            .into_iter()
            .map(ReadPlan::read)
            .collect::<Result<Vec<_>, _>>()?;
        for (item, value) in inner.items.borrow_mut().iter_mut().zip(&values) {
            item.remember(value.clone());
        }

        let binding = &inner.binding;
        let target_type = accessor.value_type();
        let produced = if let Some(format) = binding.format() {
            Value::new(format_positional(format, &values)?)
        } else if let Some(converter) = binding.converter() {
            converter.convert(
                &values,
                &target_type,
                binding.parameter(),
                binding.language(),
            )
        } else {
            return Err(BindingError::MissingConversionStrategy);
        };

        let Some(value) = self.post_process(produced) else {
            trace!(
                property = %inner.target_path,
                "converter produced no value and no fallback is set"
            );
            return Ok(());
        };
        let value = value.coerce_to(&target_type)?;
        trace!(property = %inner.target_path, value = ?value, "updating target");

        let _scope = inner.target_guard.suppress();
        accessor.set(&*inner.target, value)
    }

    /// Substitutes `null` and unset results. `None` means "leave the target
    /// alone".
    fn post_process(&self, produced: Value) -> Option<Value> {
        let binding = &self.inner.binding;
        match produced {
            Value::Null => Some(
                binding
                    .null_value()
                    .or(binding.fallback_value())
                    .cloned()
                    .unwrap_or(Value::Null),
            ),
            Value::Unset => binding.fallback_value().cloned(),
            value => Some(value),
        }
    }

    fn push_to_sources(&self) -> Result<(), BindingError> {
        let inner = &*self.inner;
        if self.state() != CoordinatorState::Listening || !self.mode().writes_back() {
            return Ok(());
        }
        let (Some(accessor), Some(converter)) =
            (self.target_accessor(), inner.binding.converter().cloned())
        else {
            return Err(BindingError::MissingConversionStrategy);
        };

        let value = accessor.get(&*inner.target)?;
        let (types, writes): (SmallVec<[ValueType; 4]>, SmallVec<[Option<WriteBack>; 4]>) =
            inner
                .items
                .borrow()
                .iter()
                .map(|item| (item.value_type(), item.write_back()))
                .unzip();

        trace!(property = %inner.target_path, value = ?value, "updating sources");
        let produced = converter.convert_back(
            &value,
            &types,
            inner.binding.parameter(),
            inner.binding.language(),
        );
        if produced.len() < writes.len() {
            warn!(
                property = %inner.target_path,
                produced = produced.len(),
                sources = writes.len(),
                "convert-back produced fewer values than there are sources"
            );
        }

        for (index, (write, value)) in writes.iter().zip(produced).enumerate() {
            let Some(write) = write else {
                continue;
            };
            if value.is_unset() {
                continue;
            }
            // The write notifies synchronously, and other items observing
            // the same change must re-read this one live.
            if let Some(item) = inner.items.borrow_mut().get_mut(index) {
                item.invalidate();
            }
            write.write(value)?;
        }
        Ok(())
    }

    /// Unsubscribes everything and marks the coordinator detached.
    pub(crate) fn teardown(&self) {
        if self.state() == CoordinatorState::Detached {
            return;
        }
        self.release();
        debug!(property = %self.inner.target_path, "multi-binding detached");
    }

    fn release(&self) {
        let inner = &*self.inner;
        inner.state.set(CoordinatorState::Detached);
        let target_sub = inner.target_sub.borrow_mut().take();
        drop(target_sub);
        let mut items = inner.items.borrow_mut();
        for item in items.iter_mut() {
            item.release();
        }
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("target_path", &self.inner.target_path)
            .field("state", &self.state())
            .field("mode", &self.mode())
            .field("sources", &*self.inner.items.borrow())
            .finish_non_exhaustive()
    }
}
