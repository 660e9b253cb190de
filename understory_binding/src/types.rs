// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type descriptors for bindable objects.
//!
//! A [`TypeInfo`] lists what an object type exposes to bindings:
//!
//! - **Declared properties** ([`PropertyDef`]) keyed by name.
//! - **Accessor methods** ([`MethodDef`]) keyed by name. A `Get{Name}` /
//!   `Set{Name}` pair makes an attached property `Name` bindable on objects
//!   that do not declare it.
//!
//! Types may name a base type; lookups walk from the most-derived type to
//! the root.

use alloc::rc::Rc;
use alloc::string::String;
use core::fmt;
use core::iter;

use hashbrown::HashMap;

use crate::error::BindingError;
use crate::object::{BindableObject, downcast};
use crate::value::{Value, ValueType};

/// Visibility of a getter or setter.
///
/// Only [`Visibility::Public`] accessors count towards a property's
/// read/write capability.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Usable by bindings.
    #[default]
    Public,
    /// Usable by the owner type and derived types only.
    Protected,
    /// Usable by the owner type only.
    Private,
}

/// Type-erased property getter.
pub(crate) type GetFn = Rc<dyn Fn(&dyn BindableObject) -> Result<Value, BindingError>>;

/// Type-erased property setter.
pub(crate) type SetFn = Rc<dyn Fn(&dyn BindableObject, Value) -> Result<(), BindingError>>;

fn erase_get<S, T>(get: impl Fn(&S) -> T + 'static) -> GetFn
where
    S: BindableObject,
    T: Clone + PartialEq + fmt::Debug + 'static,
{
    Rc::new(move |object| Ok(Value::new(get(downcast::<S>(object)?))))
}

fn erase_set<S, T>(set: impl Fn(&S, T) -> Result<(), BindingError> + 'static) -> SetFn
where
    S: BindableObject,
    T: Clone + PartialEq + fmt::Debug + 'static,
{
    Rc::new(move |object, value: Value| {
        let object = downcast::<S>(object)?;
        let value = value.get::<T>().ok_or_else(|| mismatch::<T>(&value))?;
        set(object, value)
    })
}

fn mismatch<T>(value: &Value) -> BindingError {
    BindingError::ConversionFailed {
        from: value.value_type().map_or("null", |ty| ty.name()),
        to: core::any::type_name::<T>(),
    }
}

/// A declared property: value type plus optional getter and setter.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use understory_binding::{BindableObject, ChangeNotifier, PropertyDef, TypeInfo, Visibility};
/// # use std::rc::Rc;
/// # struct Slider { value: Cell<f64>, notifier: ChangeNotifier }
/// # impl BindableObject for Slider {
/// #     fn type_info(&self) -> Rc<TypeInfo> { unimplemented!() }
/// #     fn notifier(&self) -> &ChangeNotifier { &self.notifier }
/// # }
///
/// let value = PropertyDef::read_write(
///     |s: &Slider| s.value.get(),
///     |s: &Slider, v: f64| {
///         s.value.set(v);
///         s.notifier.notify("Value")
///     },
/// )
/// .with_setter_visibility(Visibility::Protected);
///
/// assert!(value.has_getter());
/// assert_eq!(value.setter_visibility(), Some(Visibility::Protected));
/// ```
#[derive(Clone)]
pub struct PropertyDef {
    value_type: ValueType,
    getter: Option<(GetFn, Visibility)>,
    setter: Option<(SetFn, Visibility)>,
}

impl PropertyDef {
    /// A readable and writable property of type `T` on `S`.
    #[must_use]
    pub fn read_write<S, T>(
        get: impl Fn(&S) -> T + 'static,
        set: impl Fn(&S, T) -> Result<(), BindingError> + 'static,
    ) -> Self
    where
        S: BindableObject,
        T: Clone + PartialEq + fmt::Debug + 'static,
    {
        Self {
            value_type: ValueType::of::<T>(),
            getter: Some((erase_get(get), Visibility::Public)),
            setter: Some((erase_set(set), Visibility::Public)),
        }
    }

    /// A property of type `T` on `S` without a setter.
    #[must_use]
    pub fn read_only<S, T>(get: impl Fn(&S) -> T + 'static) -> Self
    where
        S: BindableObject,
        T: Clone + PartialEq + fmt::Debug + 'static,
    {
        Self {
            value_type: ValueType::of::<T>(),
            getter: Some((erase_get(get), Visibility::Public)),
            setter: None,
        }
    }

    /// A property of type `T` on `S` without a getter.
    #[must_use]
    pub fn write_only<S, T>(set: impl Fn(&S, T) -> Result<(), BindingError> + 'static) -> Self
    where
        S: BindableObject,
        T: Clone + PartialEq + fmt::Debug + 'static,
    {
        Self {
            value_type: ValueType::of::<T>(),
            getter: None,
            setter: Some((erase_set(set), Visibility::Public)),
        }
    }

    /// A property of type `T` on `S` that may hold no value.
    ///
    /// `None` is exposed as [`Value::Null`] and a written `Null` arrives as
    /// `None`.
    #[must_use]
    pub fn nullable<S, T>(
        get: impl Fn(&S) -> Option<T> + 'static,
        set: impl Fn(&S, Option<T>) -> Result<(), BindingError> + 'static,
    ) -> Self
    where
        S: BindableObject,
        T: Clone + PartialEq + fmt::Debug + 'static,
    {
        let getter: GetFn =
            Rc::new(move |object| Ok(Value::from_option(get(downcast::<S>(object)?))));
        let setter: SetFn = Rc::new(move |object, value: Value| {
            let object = downcast::<S>(object)?;
            match value {
                Value::Null | Value::Unset => set(object, None),
                value => {
                    let typed = value.get::<T>().ok_or_else(|| mismatch::<T>(&value))?;
                    set(object, Some(typed))
                }
            }
        });
        Self {
            value_type: ValueType::of::<T>(),
            getter: Some((getter, Visibility::Public)),
            setter: Some((setter, Visibility::Public)),
        }
    }

    /// A property exchanging [`Value`]s directly, declared as `value_type`.
    ///
    /// Add accessors with [`with_getter`](Self::with_getter) and
    /// [`with_setter`](Self::with_setter).
    #[must_use]
    pub fn dynamic(value_type: ValueType) -> Self {
        Self {
            value_type,
            getter: None,
            setter: None,
        }
    }

    /// Installs a [`Value`]-returning getter.
    #[must_use]
    pub fn with_getter<S: BindableObject>(mut self, get: impl Fn(&S) -> Value + 'static) -> Self {
        self.getter = Some((
            Rc::new(move |object| Ok(get(downcast::<S>(object)?))),
            Visibility::Public,
        ));
        self
    }

    /// Installs a [`Value`]-consuming setter.
    #[must_use]
    pub fn with_setter<S: BindableObject>(
        mut self,
        set: impl Fn(&S, Value) -> Result<(), BindingError> + 'static,
    ) -> Self {
        self.setter = Some((
            Rc::new(move |object, value| set(downcast::<S>(object)?, value)),
            Visibility::Public,
        ));
        self
    }

    /// Sets the getter's visibility. No-op without a getter.
    #[must_use]
    pub fn with_getter_visibility(mut self, visibility: Visibility) -> Self {
        if let Some((_, v)) = &mut self.getter {
            *v = visibility;
        }
        self
    }

    /// Sets the setter's visibility. No-op without a setter.
    #[must_use]
    pub fn with_setter_visibility(mut self, visibility: Visibility) -> Self {
        if let Some((_, v)) = &mut self.setter {
            *v = visibility;
        }
        self
    }

    /// The declared value type.
    #[must_use]
    #[inline]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Whether a getter exists, regardless of visibility.
    #[must_use]
    pub fn has_getter(&self) -> bool {
        self.getter.is_some()
    }

    /// Whether a setter exists, regardless of visibility.
    #[must_use]
    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }

    /// The getter's visibility, if there is a getter.
    #[must_use]
    pub fn getter_visibility(&self) -> Option<Visibility> {
        self.getter.as_ref().map(|(_, v)| *v)
    }

    /// The setter's visibility, if there is a setter.
    #[must_use]
    pub fn setter_visibility(&self) -> Option<Visibility> {
        self.setter.as_ref().map(|(_, v)| *v)
    }

    pub(crate) fn getter(&self) -> Option<&(GetFn, Visibility)> {
        self.getter.as_ref()
    }

    pub(crate) fn setter(&self) -> Option<&(SetFn, Visibility)> {
        self.setter.as_ref()
    }
}

impl fmt::Debug for PropertyDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDef")
            .field("value_type", &self.value_type)
            .field("getter", &self.getter_visibility())
            .field("setter", &self.setter_visibility())
            .finish()
    }
}

enum MethodKind {
    Getter(GetFn),
    Setter(SetFn),
}

/// An accessor method: a `Get{Name}` getter or a `Set{Name}` setter.
///
/// Registered on a [`TypeInfo`] with [`TypeInfoBuilder::method`] or, for a
/// matched pair, [`TypeInfoBuilder::attached`].
pub struct MethodDef {
    kind: MethodKind,
    value_type: ValueType,
    visibility: Visibility,
}

impl MethodDef {
    /// A getter method returning `T` from `S`.
    #[must_use]
    pub fn getter<S, T>(get: impl Fn(&S) -> T + 'static) -> Self
    where
        S: BindableObject,
        T: Clone + PartialEq + fmt::Debug + 'static,
    {
        Self {
            kind: MethodKind::Getter(erase_get(get)),
            value_type: ValueType::of::<T>(),
            visibility: Visibility::Public,
        }
    }

    /// A setter method storing a `T` on `S`.
    #[must_use]
    pub fn setter<S, T>(set: impl Fn(&S, T) -> Result<(), BindingError> + 'static) -> Self
    where
        S: BindableObject,
        T: Clone + PartialEq + fmt::Debug + 'static,
    {
        Self {
            kind: MethodKind::Setter(erase_set(set)),
            value_type: ValueType::of::<T>(),
            visibility: Visibility::Public,
        }
    }

    /// Sets the method's visibility.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// The getter's return type or the setter's parameter type.
    #[must_use]
    #[inline]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The method's visibility.
    #[must_use]
    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether this is a getter.
    #[must_use]
    pub fn is_getter(&self) -> bool {
        matches!(self.kind, MethodKind::Getter(_))
    }

    pub(crate) fn as_getter(&self) -> Option<&GetFn> {
        match &self.kind {
            MethodKind::Getter(get) => Some(get),
            MethodKind::Setter(_) => None,
        }
    }

    pub(crate) fn as_setter(&self) -> Option<&SetFn> {
        match &self.kind {
            MethodKind::Setter(set) => Some(set),
            MethodKind::Getter(_) => None,
        }
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("kind", &if self.is_getter() { "getter" } else { "setter" })
            .field("value_type", &self.value_type)
            .field("visibility", &self.visibility)
            .finish()
    }
}

/// Describes the bindable surface of one object type.
pub struct TypeInfo {
    name: String,
    base: Option<Rc<TypeInfo>>,
    properties: HashMap<String, PropertyDef>,
    methods: HashMap<String, MethodDef>,
}

impl TypeInfo {
    /// Starts describing a type called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TypeInfoBuilder {
        TypeInfoBuilder {
            info: Self {
                name: name.into(),
                base: None,
                properties: HashMap::new(),
                methods: HashMap::new(),
            },
        }
    }

    /// The type's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The base type, if any.
    #[must_use]
    pub fn base(&self) -> Option<&Rc<Self>> {
        self.base.as_ref()
    }

    /// This type followed by its base types, most-derived first.
    pub fn ancestors(&self) -> impl Iterator<Item = &Self> {
        iter::successors(Some(self), |ty| ty.base.as_deref())
    }

    /// Whether `other` is this type or one of its bases.
    #[must_use]
    pub fn derives_from(&self, other: &Self) -> bool {
        self.ancestors().any(|ty| core::ptr::eq(ty, other))
    }

    /// A property declared directly on this type.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    /// A method declared directly on this type.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.get(name)
    }

    /// Finds a property on this type or the nearest base declaring it.
    #[must_use]
    pub fn find_property(&self, name: &str) -> Option<&PropertyDef> {
        self.ancestors().find_map(|ty| ty.property(name))
    }

    /// Finds a method on this type or the nearest base declaring it.
    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<&MethodDef> {
        self.ancestors().find_map(|ty| ty.method(name))
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("base", &self.base.as_ref().map(|b| b.name()))
            .field("properties", &self.properties.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Builder for [`TypeInfo`].
#[derive(Debug)]
pub struct TypeInfoBuilder {
    info: TypeInfo,
}

impl TypeInfoBuilder {
    /// Sets the base type.
    #[must_use]
    pub fn base(mut self, base: Rc<TypeInfo>) -> Self {
        self.info.base = Some(base);
        self
    }

    /// Declares a property. A later declaration with the same name wins.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, def: PropertyDef) -> Self {
        self.info.properties.insert(name.into(), def);
        self
    }

    /// Declares an accessor method.
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, def: MethodDef) -> Self {
        self.info.methods.insert(name.into(), def);
        self
    }

    /// Declares the `Get{name}` / `Set{name}` pair of an attached property.
    #[must_use]
    pub fn attached<S, T>(
        self,
        name: &str,
        get: impl Fn(&S) -> T + 'static,
        set: impl Fn(&S, T) -> Result<(), BindingError> + 'static,
    ) -> Self
    where
        S: BindableObject,
        T: Clone + PartialEq + fmt::Debug + 'static,
    {
        self.method(alloc::format!("Get{name}"), MethodDef::getter(get))
            .method(alloc::format!("Set{name}"), MethodDef::setter(set))
    }

    /// Finishes the descriptor.
    #[must_use]
    pub fn build(self) -> Rc<TypeInfo> {
        Rc::new(self.info)
    }
}
