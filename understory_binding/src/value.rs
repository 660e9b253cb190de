// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased binding values.
//!
//! Bindings move values between properties of unrelated types, so everything
//! that flows through a coordinator is a [`Value`]: either `Null`, the
//! converter sentinel `Unset`, or an [`ErasedValue`] that remembers its
//! concrete type for later downcasting and coercion.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use core::any::{Any, TypeId};
use core::fmt;

use crate::error::BindingError;

/// Descriptor of a declared value type.
///
/// Accessors report the type of the property they wrap, converters receive
/// the target type, and the coordinator coerces converter output to it.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ValueType {
    type_id: TypeId,
    name: &'static str,
}

/// Marker type behind [`ValueType::object`].
struct AnyValue;

impl ValueType {
    /// The descriptor for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }

    /// A descriptor that accepts values of every type.
    #[must_use]
    pub fn object() -> Self {
        Self {
            type_id: TypeId::of::<AnyValue>(),
            name: "object",
        }
    }

    /// Returns the [`TypeId`] of the described type.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the name of the described type.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this descriptor describes `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Returns `true` for the catch-all [`ValueType::object`].
    #[must_use]
    #[inline]
    pub fn is_object(&self) -> bool {
        self.is::<AnyValue>()
    }

    /// Returns `true` if `value` can be stored without conversion.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match value {
            Value::Data(data) => self.is_object() || data.type_id() == self.type_id,
            Value::Null | Value::Unset => true,
        }
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValueType").field(&self.name).finish()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A type-erased, cloneable, comparable value.
///
/// # Example
///
/// ```rust
/// use understory_binding::ErasedValue;
///
/// let value = ErasedValue::new(42_i32);
/// assert!(value.is::<i32>());
/// assert_eq!(value.downcast_ref::<i32>(), Some(&42));
/// assert_eq!(value.clone(), ErasedValue::new(42_i32));
/// ```
pub struct ErasedValue {
    inner: Box<dyn ErasedValueTrait>,
    value_type: ValueType,
}

impl ErasedValue {
    /// Creates a new erased value from a concrete value.
    #[must_use]
    pub fn new<T: Clone + PartialEq + fmt::Debug + 'static>(value: T) -> Self {
        Self {
            value_type: ValueType::of::<T>(),
            inner: Box::new(value),
        }
    }

    /// Returns the [`TypeId`] of the contained value.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.value_type.type_id
    }

    /// Returns the descriptor of the contained value's type.
    #[must_use]
    #[inline]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Returns `true` if the contained value is of type `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.value_type.is::<T>()
    }

    /// Attempts to downcast to a reference of type `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if self.is::<T>() {
            self.inner.as_any().downcast_ref()
        } else {
            None
        }
    }
}

impl Clone for ErasedValue {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
            value_type: self.value_type,
        }
    }
}

impl PartialEq for ErasedValue {
    fn eq(&self, other: &Self) -> bool {
        self.value_type == other.value_type && self.inner.eq_dyn(other.inner.as_any())
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt_debug(f)
    }
}

/// Trait object for type-erased values that can be cloned and compared.
trait ErasedValueTrait: Any {
    fn as_any(&self) -> &dyn Any;
    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait>;
    fn eq_dyn(&self, other: &dyn Any) -> bool;
    fn fmt_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> ErasedValueTrait for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait> {
        Box::new(self.clone())
    }

    fn eq_dyn(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }

    fn fmt_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A value flowing through a binding.
#[derive(Clone, Default, PartialEq)]
pub enum Value {
    /// The absence of a value.
    #[default]
    Null,
    /// Converter sentinel: "no value was produced". The coordinator replaces
    /// it with the fallback value, and convert-back skips the source.
    Unset,
    /// A concrete value.
    Data(ErasedValue),
}

impl Value {
    /// Wraps a concrete value.
    #[must_use]
    pub fn new<T: Clone + PartialEq + fmt::Debug + 'static>(value: T) -> Self {
        Self::Data(ErasedValue::new(value))
    }

    /// Wraps `Some(value)` as data and `None` as [`Value::Null`].
    #[must_use]
    pub fn from_option<T: Clone + PartialEq + fmt::Debug + 'static>(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::new)
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for [`Value::Unset`].
    #[must_use]
    #[inline]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Returns the descriptor of the contained data, if any.
    #[must_use]
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Data(data) => Some(data.value_type()),
            Self::Null | Self::Unset => None,
        }
    }

    /// Attempts to downcast the contained data to `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Self::Data(data) => data.downcast_ref(),
            Self::Null | Self::Unset => None,
        }
    }

    /// Clones the contained data out as `T`.
    #[must_use]
    pub fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// A textual representation of the value.
    ///
    /// Strings are returned verbatim, primitives use their `Display` form,
    /// other types fall back to `Debug`. `Null` and `Unset` render empty.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Data(data) => text_of(data),
            Self::Null | Self::Unset => String::new(),
        }
    }

    /// Coerces the value to `to`.
    ///
    /// Values that are already of the requested type, `Null`, `Unset` and any
    /// value targeting [`ValueType::object`] pass through untouched. String
    /// targets take [`to_text`](Self::to_text). Numbers convert between
    /// numeric types when the value fits, and strings parse into numbers,
    /// `bool` and `char`.
    ///
    /// ```rust
    /// use understory_binding::{Value, ValueType};
    ///
    /// let seven = Value::new(7_i32).coerce_to(&ValueType::of::<f64>()).unwrap();
    /// assert_eq!(seven.get::<f64>(), Some(7.0));
    ///
    /// let text = Value::new(2.5_f64).coerce_to(&ValueType::of::<String>()).unwrap();
    /// assert_eq!(text.get::<String>().as_deref(), Some("2.5"));
    ///
    /// assert!(Value::new(2.5_f64).coerce_to(&ValueType::of::<u8>()).is_err());
    /// ```
    pub fn coerce_to(self, to: &ValueType) -> Result<Self, BindingError> {
        let Self::Data(data) = &self else {
            return Ok(self);
        };
        if to.accepts(&self) {
            return Ok(self);
        }
        if to.is::<String>() {
            return Ok(Self::new(text_of(data)));
        }
        convert_scalar(data, to)
            .map(Self::Data)
            .ok_or(BindingError::ConversionFailed {
                from: data.value_type().name(),
                to: to.name(),
            })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Unset => f.write_str("Unset"),
            Self::Data(data) => fmt::Debug::fmt(data, f),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::new(String::from(value))
    }
}

macro_rules! value_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::new(value)
                }
            }
        )*
    };
}

value_from!(String, bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

fn text_of(data: &ErasedValue) -> String {
    if let Some(s) = data.downcast_ref::<String>() {
        return s.clone();
    }
    if let Some(s) = data.downcast_ref::<&'static str>() {
        return (*s).to_string();
    }
    macro_rules! display {
        ($($ty:ty),*) => {
            $(
                if let Some(v) = data.downcast_ref::<$ty>() {
                    return v.to_string();
                }
            )*
        };
    }
    display!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);
    format!("{data:?}")
}

/// Numeric view of a primitive value.
#[derive(Copy, Clone, Debug)]
enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    fn of(data: &ErasedValue) -> Option<Self> {
        macro_rules! int {
            ($($ty:ty),*) => {
                $(
                    if let Some(v) = data.downcast_ref::<$ty>() {
                        return Some(Self::Int(i128::from(*v)));
                    }
                )*
            };
        }
        int!(i8, i16, i32, i64, u8, u16, u32, u64);
        if let Some(v) = data.downcast_ref::<isize>() {
            return i128::try_from(*v).ok().map(Self::Int);
        }
        if let Some(v) = data.downcast_ref::<usize>() {
            return i128::try_from(*v).ok().map(Self::Int);
        }
        if let Some(v) = data.downcast_ref::<f32>() {
            return Some(Self::Float(f64::from(*v)));
        }
        if let Some(v) = data.downcast_ref::<f64>() {
            return Some(Self::Float(*v));
        }
        if let Some(v) = data.downcast_ref::<bool>() {
            return Some(Self::Int(i128::from(*v)));
        }
        None
    }

    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(v) = text.parse::<i128>() {
            return Some(Self::Int(v));
        }
        text.parse::<f64>().ok().map(Self::Float)
    }

    /// The integral value, if there is one without loss.
    fn integral(self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(v),
            Self::Float(v) => {
                #[expect(clippy::cast_possible_truncation, reason = "checked by the round trip")]
                let truncated = v as i128;
                let exact = truncated as f64 == v;
                exact.then_some(truncated)
            }
        }
    }

    fn float(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    fn into_type(self, to: &ValueType) -> Option<ErasedValue> {
        macro_rules! int {
            ($($ty:ty),*) => {
                $(
                    if to.is::<$ty>() {
                        return self
                            .integral()
                            .and_then(|v| <$ty>::try_from(v).ok())
                            .map(ErasedValue::new);
                    }
                )*
            };
        }
        int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
        if to.is::<f64>() {
            return Some(ErasedValue::new(self.float()));
        }
        if to.is::<f32>() {
            #[expect(clippy::cast_possible_truncation, reason = "narrowing is the requested conversion")]
            return Some(ErasedValue::new(self.float() as f32));
        }
        if to.is::<bool>() {
            return Some(ErasedValue::new(self.float() != 0.0));
        }
        None
    }
}

fn convert_scalar(data: &ErasedValue, to: &ValueType) -> Option<ErasedValue> {
    if let Some(number) = Number::of(data) {
        return number.into_type(to);
    }
    let text = data
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| data.downcast_ref::<&'static str>().copied())?;
    if to.is::<bool>() {
        let text = text.trim();
        return if text.eq_ignore_ascii_case("true") {
            Some(ErasedValue::new(true))
        } else if text.eq_ignore_ascii_case("false") {
            Some(ErasedValue::new(false))
        } else {
            None
        };
    }
    if to.is::<char>() {
        let mut chars = text.chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) => Some(ErasedValue::new(c)),
            _ => None,
        };
    }
    Number::parse(text)?.into_type(to)
}
