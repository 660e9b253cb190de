// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-source resolution and observation.

use alloc::rc::Rc;
use alloc::string::String;
use core::fmt;

use crate::accessor::{AccessorResolver, PropertyAccessor};
use crate::binding::{RelativeSource, ResolutionKind, SourceBinding};
use crate::error::BindingError;
use crate::guard::ReentrancyGuard;
use crate::mode::BindingMode;
use crate::notify::{LifecycleEvent, Subscription};
use crate::object::{ElementRef, ObjectRef, same_object};
use crate::value::{Value, ValueType};

/// Resolution state of one source.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SourceState {
    /// Not resolved yet, or resolution failed.
    #[default]
    Unresolved,
    /// Resolution is in progress.
    Resolving,
    /// The source object and accessor are known.
    Resolved,
    /// A two-way source that is observed and accepts written-back values.
    Listening,
}

/// How the coordinator obtains an item's value without holding a borrow
/// across host code.
pub(crate) enum ReadPlan {
    Cached(Value),
    Live(ObjectRef, Rc<PropertyAccessor>),
}

impl ReadPlan {
    pub(crate) fn read(self) -> Result<Value, BindingError> {
        match self {
            Self::Cached(value) => Ok(value),
            Self::Live(object, accessor) => accessor.get(&*object),
        }
    }
}

/// Everything needed to write a value back to one source.
pub(crate) struct WriteBack {
    pub(crate) object: ObjectRef,
    pub(crate) accessor: Rc<PropertyAccessor>,
    pub(crate) guard: ReentrancyGuard,
}

impl WriteBack {
    /// Coerces `value` to the source type and writes it with the source's
    /// own change handler suppressed.
    pub(crate) fn write(&self, value: Value) -> Result<(), BindingError> {
        let value = value.coerce_to(&self.accessor.value_type())?;
        let _scope = self.guard.suppress();
        self.accessor.set(&*self.object, value)
    }
}

/// One resolved input of a coordinator.
pub(crate) struct SourceItem {
    binding: SourceBinding,
    mode: BindingMode,
    state: SourceState,
    source: Option<ObjectRef>,
    accessor: Option<Rc<PropertyAccessor>>,
    last_value: Option<Value>,
    guard: ReentrancyGuard,
    change_sub: Option<Subscription>,
    context_sub: Option<Subscription>,
}

impl SourceItem {
    pub(crate) fn new(binding: SourceBinding, coordinator_mode: BindingMode) -> Self {
        let mode = binding.effective_mode(coordinator_mode);
        Self {
            binding,
            mode,
            state: SourceState::Unresolved,
            source: None,
            accessor: None,
            last_value: None,
            guard: ReentrancyGuard::new(),
            change_sub: None,
            context_sub: None,
        }
    }

    pub(crate) fn kind(&self) -> ResolutionKind {
        self.binding.resolution_kind()
    }

    pub(crate) fn mode(&self) -> BindingMode {
        self.mode
    }

    pub(crate) fn state(&self) -> SourceState {
        self.state
    }

    pub(crate) fn path(&self) -> &str {
        self.binding.property_path()
    }

    /// Locates the source object for `target` and validates the mode.
    ///
    /// An ambient source with no context resolves to nothing; it reads as
    /// `Null` until a context appears.
    pub(crate) fn resolve(
        &mut self,
        target: &ElementRef,
        resolver: &AccessorResolver,
    ) -> Result<(), BindingError> {
        self.state = SourceState::Resolving;
        let located = match self.kind() {
            ResolutionKind::Explicit => self.binding.explicit_source().cloned(),
            ResolutionKind::NamedElement => {
                let name = self.binding.named_element().unwrap_or_default();
                match target.find_name(name) {
                    Some(element) => Some(element),
                    None => {
                        self.state = SourceState::Unresolved;
                        return Err(BindingError::ElementNotFound {
                            name: String::from(name),
                        });
                    }
                }
            }
            ResolutionKind::RelativeSelf => match self.binding.relative() {
                Some(RelativeSource::SelfElement) | None => {
                    let this: ObjectRef = target.clone();
                    Some(this)
                }
                Some(other) => {
                    self.state = SourceState::Unresolved;
                    return Err(BindingError::UnsupportedRelativeSource {
                        kind: other.kind_name(),
                    });
                }
            },
            ResolutionKind::AmbientContext => target.ambient_context(),
        };
        self.bind_to(located, resolver)
    }

    /// Points the item at `source`, resolving and checking its accessor.
    ///
    /// Drops the previous change subscription and cached value. On error
    /// the item is left unresolved.
    pub(crate) fn bind_to(
        &mut self,
        source: Option<ObjectRef>,
        resolver: &AccessorResolver,
    ) -> Result<(), BindingError> {
        self.change_sub = None;
        self.last_value = None;
        self.source = None;
        self.accessor = None;
        self.state = SourceState::Resolving;
        let Some(source) = source else {
            self.state = SourceState::Resolved;
            return Ok(());
        };
        let checked = resolver
            .resolve(&source.type_info(), self.path())
            .and_then(|accessor| {
                accessor.check_source_mode(self.mode)?;
                Ok(accessor)
            });
        match checked {
            Ok(accessor) => {
                self.source = Some(source);
                self.accessor = Some(accessor);
                self.state = SourceState::Resolved;
                Ok(())
            }
            Err(err) => {
                self.state = SourceState::Unresolved;
                Err(err)
            }
        }
    }

    /// Whether the item currently points at `candidate`.
    pub(crate) fn is_bound_to(&self, candidate: Option<&ObjectRef>) -> bool {
        match (&self.source, candidate) {
            (Some(current), Some(candidate)) => same_object(current, candidate),
            (None, None) => self.state == SourceState::Resolved,
            _ => false,
        }
    }

    /// Observes the source property. One-time items never subscribe.
    pub(crate) fn listen(&mut self, on_change: impl Fn() -> Result<(), BindingError> + 'static) {
        self.change_sub = None;
        if !self.mode.observes_source() {
            return;
        }
        let (Some(source), Some(accessor)) = (&self.source, &self.accessor) else {
            return;
        };
        let guard = self.guard.clone();
        self.change_sub = Some(source.notifier().subscribe(accessor.path(), move || {
            if guard.is_suppressed() {
                return Ok(());
            }
            on_change()
        }));
        if self.mode.writes_back() {
            self.state = SourceState::Listening;
        }
    }

    /// Observes ambient context changes on `target`.
    pub(crate) fn watch_context(
        &mut self,
        target: &ElementRef,
        on_context: impl Fn(Option<ObjectRef>) -> Result<(), BindingError> + 'static,
    ) {
        self.context_sub = Some(target.hooks().subscribe(move |event| match event {
            LifecycleEvent::ContextChanged { new, .. } => on_context(new.clone()),
            LifecycleEvent::Loaded | LifecycleEvent::Unloaded => Ok(()),
        }));
    }

    /// How to obtain the value. With `refresh` the source is read again,
    /// except one-time items that already captured a value.
    pub(crate) fn plan(&self, refresh: bool) -> ReadPlan {
        if let Some(last) = &self.last_value
            && (!refresh || self.mode == BindingMode::OneTime)
        {
            return ReadPlan::Cached(last.clone());
        }
        match (&self.source, &self.accessor) {
            (Some(source), Some(accessor)) => ReadPlan::Live(source.clone(), accessor.clone()),
            _ => ReadPlan::Cached(Value::Null),
        }
    }

    pub(crate) fn remember(&mut self, value: Value) {
        self.last_value = Some(value);
    }

    /// Forgets the cached value so the next read goes to the source.
    pub(crate) fn invalidate(&mut self) {
        if self.mode != BindingMode::OneTime {
            self.last_value = None;
        }
    }

    /// The declared type of the bound property, or `object` when unbound.
    pub(crate) fn value_type(&self) -> ValueType {
        self.accessor
            .as_ref()
            .map_or_else(ValueType::object, |accessor| accessor.value_type())
    }

    /// A write-back handle, for resolved two-way items only.
    pub(crate) fn write_back(&self) -> Option<WriteBack> {
        if !self.mode.writes_back() {
            return None;
        }
        Some(WriteBack {
            object: self.source.clone()?,
            accessor: self.accessor.clone()?,
            guard: self.guard.clone(),
        })
    }

    /// Drops every subscription and returns to the unresolved state.
    pub(crate) fn release(&mut self) {
        self.change_sub = None;
        self.context_sub = None;
        self.source = None;
        self.accessor = None;
        self.last_value = None;
        self.state = SourceState::Unresolved;
    }
}

impl fmt::Debug for SourceItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceItem")
            .field("path", &self.path())
            .field("kind", &self.kind())
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("last_value", &self.last_value)
            .field("observing", &self.change_sub.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Node;
    use core::cell::Cell;

    #[test]
    fn named_element_resolution() {
        let root = Node::new("root");
        let slider = Node::new("slider").with_int("Value", 4);
        root.add_child(&slider);
        let target: ElementRef = root.clone();
        let resolver = AccessorResolver::new();

        let mut found = SourceItem::new(
            SourceBinding::path("Value").element_name("slider"),
            BindingMode::OneWay,
        );
        found.resolve(&target, &resolver).unwrap();
        assert_eq!(found.state(), SourceState::Resolved);
        assert_eq!(found.plan(true).read().unwrap(), Value::new(4_i32));

        let mut missing = SourceItem::new(
            SourceBinding::path("Value").element_name("knob"),
            BindingMode::OneWay,
        );
        assert_eq!(
            missing.resolve(&target, &resolver),
            Err(BindingError::ElementNotFound {
                name: "knob".into()
            })
        );
        assert_eq!(missing.state(), SourceState::Unresolved);
    }

    #[test]
    fn relative_self_and_unsupported_kinds() {
        let root = Node::new("root").with_int("Value", 1);
        let target: ElementRef = root.clone();
        let resolver = AccessorResolver::new();

        let mut this = SourceItem::new(
            SourceBinding::path("Value").relative_source(RelativeSource::SelfElement),
            BindingMode::OneWay,
        );
        this.resolve(&target, &resolver).unwrap();
        let this_ref: ObjectRef = root.clone();
        assert!(this.is_bound_to(Some(&this_ref)));

        let mut parent = SourceItem::new(
            SourceBinding::path("Value").relative_source(RelativeSource::TemplatedParent),
            BindingMode::OneWay,
        );
        assert_eq!(
            parent.resolve(&target, &resolver),
            Err(BindingError::UnsupportedRelativeSource {
                kind: "TemplatedParent"
            })
        );
    }

    #[test]
    fn two_way_requires_a_writable_source() {
        let root = Node::new("root").with_readonly_int("Total", 3);
        let target: ElementRef = root.clone();
        let resolver = AccessorResolver::new();

        let mut item = SourceItem::new(
            SourceBinding::path("Total").relative_source(RelativeSource::SelfElement),
            BindingMode::TwoWay,
        );
        assert!(matches!(
            item.resolve(&target, &resolver),
            Err(BindingError::ModeCapability {
                mode: BindingMode::TwoWay,
                ..
            })
        ));
        assert_eq!(root.reads("Total"), 0);
    }

    #[test]
    fn ambient_without_context_reads_null() {
        let root = Node::new("root");
        let target: ElementRef = root.clone();
        let resolver = AccessorResolver::new();

        let mut item = SourceItem::new(SourceBinding::path("Name"), BindingMode::OneWay);
        item.resolve(&target, &resolver).unwrap();
        assert_eq!(item.state(), SourceState::Resolved);
        assert!(item.is_bound_to(None));
        assert!(item.value_type().is_object());
        assert_eq!(item.plan(true).read().unwrap(), Value::Null);
    }

    #[test]
    fn one_time_items_keep_their_capture() {
        let source = Node::new("source").with_int("Value", 1);
        let resolver = AccessorResolver::new();
        let target: ElementRef = Node::new("root");

        let obj: ObjectRef = source.clone();
        let mut item = SourceItem::new(
            SourceBinding::path("Value").source(obj),
            BindingMode::OneTime,
        );
        item.resolve(&target, &resolver).unwrap();
        item.listen(|| Ok(()));
        assert_eq!(source.notifier_count("Value"), 0);

        let first = item.plan(true).read().unwrap();
        item.remember(first);
        source.set("Value", Value::new(2_i32)).unwrap();
        item.invalidate();
        assert_eq!(item.plan(true).read().unwrap(), Value::new(1_i32));
    }

    #[test]
    fn listen_respects_the_guard() {
        let source = Node::new("source").with_int("Value", 1);
        let resolver = AccessorResolver::new();
        let target: ElementRef = Node::new("root");
        let hits = Rc::new(Cell::new(0));

        let obj: ObjectRef = source.clone();
        let mut item = SourceItem::new(
            SourceBinding::path("Value").source(obj),
            BindingMode::TwoWay,
        );
        item.resolve(&target, &resolver).unwrap();
        let h = hits.clone();
        item.listen(move || {
            h.set(h.get() + 1);
            Ok(())
        });
        assert_eq!(item.state(), SourceState::Listening);

        source.set("Value", Value::new(2_i32)).unwrap();
        assert_eq!(hits.get(), 1);

        let write = item.write_back().unwrap();
        write.write(Value::new(3_i64)).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(source.get("Value"), Value::new(3_i32));

        item.release();
        source.set("Value", Value::new(4_i32)).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(item.state(), SourceState::Unresolved);
    }
}
