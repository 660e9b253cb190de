// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-value converters and positional format strings.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::error::BindingError;
use crate::value::{Value, ValueType};

/// Combines several source values into one target value, and optionally
/// splits a target value back into source values.
pub trait MultiValueConverter {
    /// Produces the target value from `values`, in source declaration order.
    ///
    /// Return [`Value::Unset`] to make the binding use its fallback value.
    fn convert(
        &self,
        values: &[Value],
        target_type: &ValueType,
        parameter: &Value,
        language: &str,
    ) -> Value;

    /// Produces one value per source from the target `value`.
    ///
    /// Entries that are [`Value::Unset`], or missing because the result is
    /// shorter than `source_types`, leave that source untouched. The default
    /// implementation produces nothing.
    fn convert_back(
        &self,
        value: &Value,
        source_types: &[ValueType],
        parameter: &Value,
        language: &str,
    ) -> Vec<Value> {
        let _ = (value, source_types, parameter, language);
        Vec::new()
    }
}

type ConvertFn = Box<dyn Fn(&[Value]) -> Value>;
type ConvertBackFn = Box<dyn Fn(&Value, &[ValueType]) -> Vec<Value>>;

/// A [`MultiValueConverter`] built from closures.
///
/// Parameter and language tag are ignored; capture what you need instead.
///
/// # Example
///
/// ```rust
/// use understory_binding::{FnConverter, MultiValueConverter, Value, ValueType};
///
/// let sum = FnConverter::new(|values| {
///     Value::new(values.iter().filter_map(Value::get::<i32>).sum::<i32>())
/// });
/// let target = sum.convert(
///     &[Value::new(3_i32), Value::new(4_i32)],
///     &ValueType::of::<i32>(),
///     &Value::Null,
///     "",
/// );
/// assert_eq!(target, Value::new(7_i32));
/// ```
pub struct FnConverter {
    convert: ConvertFn,
    convert_back: Option<ConvertBackFn>,
}

impl FnConverter {
    /// A one-way converter.
    #[must_use]
    pub fn new(convert: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self {
            convert: Box::new(convert),
            convert_back: None,
        }
    }

    /// Adds the inverse conversion.
    #[must_use]
    pub fn with_convert_back(
        mut self,
        convert_back: impl Fn(&Value, &[ValueType]) -> Vec<Value> + 'static,
    ) -> Self {
        self.convert_back = Some(Box::new(convert_back));
        self
    }
}

impl MultiValueConverter for FnConverter {
    fn convert(&self, values: &[Value], _: &ValueType, _: &Value, _: &str) -> Value {
        (self.convert)(values)
    }

    fn convert_back(
        &self,
        value: &Value,
        source_types: &[ValueType],
        _: &Value,
        _: &str,
    ) -> Vec<Value> {
        self.convert_back
            .as_ref()
            .map_or_else(Vec::new, |back| back(value, source_types))
    }
}

impl fmt::Debug for FnConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConverter")
            .field("two_way", &self.convert_back.is_some())
            .finish_non_exhaustive()
    }
}

/// Substitutes `{N}` placeholders in `format` with the text of `args[N]`.
///
/// `{{` and `}}` produce literal braces. Null and unset values render as
/// nothing.
///
/// ```rust
/// use understory_binding::{Value, format_positional};
///
/// let text = format_positional("{1}, {0} {{x}}", &[Value::from("Ada"), Value::from("Lovelace")]);
/// assert_eq!(text.unwrap(), "Lovelace, Ada {x}");
/// ```
pub fn format_positional(format: &str, args: &[Value]) -> Result<String, BindingError> {
    let invalid = |reason| BindingError::InvalidFormat {
        format: String::from(format),
        reason,
    };
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(invalid("unmatched `}`")),
            '{' => {
                let mut index = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(d) if d.is_ascii_digit() => index.push(d),
                        Some(_) => return Err(invalid("placeholder is not an index")),
                        None => return Err(invalid("unterminated placeholder")),
                    }
                }
                let arg = index
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| args.get(i))
                    .ok_or_else(|| invalid("placeholder index out of range"))?;
                if !arg.is_null() && !arg.is_unset() {
                    out.push_str(&arg.to_text());
                }
            }
            c => out.push(c),
        }
    }
    Ok(out)
}
