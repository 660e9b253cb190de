// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capability-checked property accessors.
//!
//! An [`AccessorResolver`] turns `(type, path)` into a [`PropertyAccessor`]
//! by asking a chain of [`AccessorStrategy`] implementations in order. The
//! default chain is:
//!
//! 1. [`DeclaredPropertyStrategy`]: a [`PropertyDef`](crate::PropertyDef)
//!    declared on the type or one of its bases.
//! 2. [`AttachedMethodStrategy`]: a `Get{path}` / `Set{path}` method pair.
//!
//! Resolved accessors are cached per `(type, path)` and never change. The
//! cache holds its types weakly: entries for dropped types are pruned on the
//! next insert.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use hashbrown::HashMap;

use crate::error::BindingError;
use crate::mode::BindingMode;
use crate::object::BindableObject;
use crate::types::{GetFn, SetFn, TypeInfo, Visibility};
use crate::value::{Value, ValueType};

bitflags::bitflags! {
    /// What a binding may do with a property.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Access: u8 {
        /// A public getter exists.
        const READ  = 0b0000_0001;
        /// A public setter exists.
        const WRITE = 0b0000_0010;
    }
}

impl Access {
    /// Capability a source property needs for `mode`.
    #[must_use]
    pub fn required_by_source(mode: BindingMode) -> Self {
        match mode {
            BindingMode::OneTime | BindingMode::OneWay => Self::READ,
            BindingMode::TwoWay => Self::READ | Self::WRITE,
        }
    }

    /// Capability a target property needs for `mode`.
    #[must_use]
    pub fn required_by_target(mode: BindingMode) -> Self {
        match mode {
            BindingMode::OneTime | BindingMode::OneWay => Self::WRITE,
            BindingMode::TwoWay => Self::READ | Self::WRITE,
        }
    }
}

/// How an accessor was found.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessorKind {
    /// A declared property.
    Declared,
    /// A `Get{Name}` / `Set{Name}` method pair.
    Attached,
}

/// Read/write handle to one named property of one object type.
pub struct PropertyAccessor {
    owner: String,
    path: String,
    value_type: ValueType,
    kind: AccessorKind,
    getter: Option<GetFn>,
    setter: Option<SetFn>,
    access: Access,
}

impl PropertyAccessor {
    /// Builds an accessor. Only public accessors are retained.
    ///
    /// Mostly useful to custom [`AccessorStrategy`] implementations.
    #[must_use]
    pub fn new(
        owner: &TypeInfo,
        path: &str,
        value_type: ValueType,
        kind: AccessorKind,
        getter: Option<(GetFn, Visibility)>,
        setter: Option<(SetFn, Visibility)>,
    ) -> Self {
        let getter = getter.and_then(|(f, v)| (v == Visibility::Public).then_some(f));
        let setter = setter.and_then(|(f, v)| (v == Visibility::Public).then_some(f));
        let mut access = Access::empty();
        access.set(Access::READ, getter.is_some());
        access.set(Access::WRITE, setter.is_some());
        Self {
            owner: String::from(owner.name()),
            path: String::from(path),
            value_type,
            kind,
            getter,
            setter,
            access,
        }
    }

    /// Name of the type the accessor was resolved on.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The property path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `Owner.path`, used in diagnostics.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.owner, self.path)
    }

    /// The declared value type.
    #[must_use]
    #[inline]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// How the accessor was found.
    #[must_use]
    #[inline]
    pub fn kind(&self) -> AccessorKind {
        self.kind
    }

    /// The accessor's capability.
    #[must_use]
    #[inline]
    pub fn access(&self) -> Access {
        self.access
    }

    /// Whether the property has a public getter.
    #[must_use]
    #[inline]
    pub fn can_read(&self) -> bool {
        self.access.contains(Access::READ)
    }

    /// Whether the property has a public setter.
    #[must_use]
    #[inline]
    pub fn can_write(&self) -> bool {
        self.access.contains(Access::WRITE)
    }

    /// Reads the property from `object`.
    pub fn get(&self, object: &dyn BindableObject) -> Result<Value, BindingError> {
        let getter = self.getter.as_ref().ok_or_else(|| BindingError::NotReadable {
            property: self.qualified_name(),
        })?;
        getter(object)
    }

    /// Writes `value` to the property of `object`.
    pub fn set(&self, object: &dyn BindableObject, value: Value) -> Result<(), BindingError> {
        let setter = self.setter.as_ref().ok_or_else(|| BindingError::NotWritable {
            property: self.qualified_name(),
        })?;
        setter(object, value)
    }

    /// Fails with [`BindingError::ModeCapability`] unless this property can
    /// act as a source in `mode`.
    pub fn check_source_mode(&self, mode: BindingMode) -> Result<(), BindingError> {
        self.check(Access::required_by_source(mode), mode)
    }

    /// Fails with [`BindingError::ModeCapability`] unless this property can
    /// act as a target in `mode`.
    pub fn check_target_mode(&self, mode: BindingMode) -> Result<(), BindingError> {
        self.check(Access::required_by_target(mode), mode)
    }

    fn check(&self, required: Access, mode: BindingMode) -> Result<(), BindingError> {
        if self.access.contains(required) {
            Ok(())
        } else {
            Err(BindingError::ModeCapability {
                property: self.qualified_name(),
                mode,
            })
        }
    }
}

impl fmt::Debug for PropertyAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyAccessor")
            .field("owner", &self.owner)
            .field("path", &self.path)
            .field("value_type", &self.value_type)
            .field("kind", &self.kind)
            .field("access", &self.access)
            .finish()
    }
}

/// One way of finding a property on a type.
pub trait AccessorStrategy {
    /// Returns an accessor for `path` on `ty`, or `None` to let the next
    /// strategy try.
    fn resolve(&self, ty: &Rc<TypeInfo>, path: &str) -> Option<PropertyAccessor>;
}

/// Resolves properties declared with [`TypeInfoBuilder::property`](crate::TypeInfoBuilder::property).
#[derive(Copy, Clone, Debug, Default)]
pub struct DeclaredPropertyStrategy;

impl AccessorStrategy for DeclaredPropertyStrategy {
    fn resolve(&self, ty: &Rc<TypeInfo>, path: &str) -> Option<PropertyAccessor> {
        let def = ty.find_property(path)?;
        Some(PropertyAccessor::new(
            ty,
            path,
            def.value_type(),
            AccessorKind::Declared,
            def.getter().cloned(),
            def.setter().cloned(),
        ))
    }
}

/// Resolves attached properties from `Get{path}` / `Set{path}` methods.
///
/// The value type comes from the getter, else from the setter.
#[derive(Copy, Clone, Debug, Default)]
pub struct AttachedMethodStrategy;

impl AccessorStrategy for AttachedMethodStrategy {
    fn resolve(&self, ty: &Rc<TypeInfo>, path: &str) -> Option<PropertyAccessor> {
        let getter = ty
            .find_method(&format!("Get{path}"))
            .and_then(|m| Some((m, m.as_getter()?)));
        let setter = ty
            .find_method(&format!("Set{path}"))
            .and_then(|m| Some((m, m.as_setter()?)));
        let value_type = match (&getter, &setter) {
            (Some((m, _)), _) | (None, Some((m, _))) => m.value_type(),
            (None, None) => return None,
        };
        Some(PropertyAccessor::new(
            ty,
            path,
            value_type,
            AccessorKind::Attached,
            getter.map(|(m, f)| (Rc::clone(f), m.visibility())),
            setter.map(|(m, f)| (Rc::clone(f), m.visibility())),
        ))
    }
}

/// Resolves and caches [`PropertyAccessor`]s.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
/// use understory_binding::{AccessorResolver, BindingError, BindingMode, TypeInfo};
///
/// let ty = TypeInfo::builder("Empty").build();
/// let resolver = AccessorResolver::new();
/// assert!(matches!(
///     resolver.resolve(&ty, "Width"),
///     Err(BindingError::PropertyNotFound { .. })
/// ));
/// ```
pub struct AccessorResolver {
    strategies: Vec<Box<dyn AccessorStrategy>>,
    cache: RefCell<HashMap<(usize, String), CacheEntry>>,
}

struct CacheEntry {
    ty: Weak<TypeInfo>,
    accessor: Rc<PropertyAccessor>,
}

impl CacheEntry {
    fn is_live(&self) -> bool {
        self.ty.strong_count() > 0
    }
}

impl AccessorResolver {
    /// A resolver with the declared-property and attached-method strategies.
    #[must_use]
    pub fn new() -> Self {
        Self::empty()
            .with_strategy(DeclaredPropertyStrategy)
            .with_strategy(AttachedMethodStrategy)
    }

    /// A resolver with no strategies.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Appends a strategy to the chain.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl AccessorStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Resolves `path` on `ty`, consulting the cache first.
    pub fn resolve(
        &self,
        ty: &Rc<TypeInfo>,
        path: &str,
    ) -> Result<Rc<PropertyAccessor>, BindingError> {
        let key = (Rc::as_ptr(ty).addr(), String::from(path));
        // A dead entry may share the address of a newer type.
        if let Some(hit) = self.cache.borrow().get(&key).filter(|entry| entry.is_live()) {
            return Ok(Rc::clone(&hit.accessor));
        }
        let accessor = self
            .strategies
            .iter()
            .find_map(|strategy| strategy.resolve(ty, path))
            .map(Rc::new)
            .ok_or_else(|| BindingError::PropertyNotFound {
                owner: String::from(ty.name()),
                path: String::from(path),
            })?;
        let mut cache = self.cache.borrow_mut();
        cache.retain(|_, entry| entry.is_live());
        cache.insert(
            key,
            CacheEntry {
                ty: Rc::downgrade(ty),
                accessor: Rc::clone(&accessor),
            },
        );
        Ok(accessor)
    }

    /// Number of cached accessors whose type is still alive.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.borrow().values().filter(|entry| entry.is_live()).count()
    }
}

impl Default for AccessorResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AccessorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorResolver")
            .field("strategies", &self.strategies.len())
            .field("cached", &self.cached())
            .finish()
    }
}
