// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binding errors.

use alloc::string::String;

use crate::mode::BindingMode;

/// Errors raised while activating or driving a binding.
///
/// Everything except [`ConversionFailed`](Self::ConversionFailed),
/// [`InvalidFormat`](Self::InvalidFormat), [`NotReadable`](Self::NotReadable)
/// and [`NotWritable`](Self::NotWritable) is fatal at activation time: the
/// coordinator never starts listening.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// No accessor strategy could resolve `path` on `owner`.
    #[error("property `{path}` not found on `{owner}`")]
    PropertyNotFound {
        /// Name of the type that was searched.
        owner: String,
        /// The requested property path.
        path: String,
    },
    /// A named-element source did not match any element in scope.
    #[error("element named `{name}` not found")]
    ElementNotFound {
        /// The requested element name.
        name: String,
    },
    /// Only the self relative source is supported.
    #[error("relative source `{kind}` is not supported")]
    UnsupportedRelativeSource {
        /// The rejected relative source kind.
        kind: &'static str,
    },
    /// The requested mode needs a capability the property does not have.
    #[error("unable to bind `{property}` using {mode} mode")]
    ModeCapability {
        /// Qualified name of the offending property.
        property: String,
        /// The requested mode.
        mode: BindingMode,
    },
    /// Neither a converter nor a format string was configured.
    ///
    /// Also raised for a `TwoWay` binding without a converter: a format
    /// string only works forward and cannot split a target edit back into
    /// its sources.
    #[error("multi-binding needs a converter, or a format string when not two-way")]
    MissingConversionStrategy,
    /// A mode value that the engine does not understand.
    #[error("unknown binding mode `{value}`")]
    UnknownBindingMode {
        /// The unrecognized value.
        value: String,
    },
    /// The target property already carries an active multi-binding.
    #[error("`{property}` already has a multi-binding attached")]
    AlreadyAttached {
        /// The target property path.
        property: String,
    },
    /// A value could not be coerced to the declared type.
    #[error("cannot convert `{from}` to `{to}`")]
    ConversionFailed {
        /// Name of the value's type.
        from: &'static str,
        /// Name of the requested type.
        to: &'static str,
    },
    /// A format string could not be applied.
    #[error("invalid format string `{format}`: {reason}")]
    InvalidFormat {
        /// The format string.
        format: String,
        /// What went wrong.
        reason: &'static str,
    },
    /// The accessor has no public getter.
    #[error("`{property}` is not readable")]
    NotReadable {
        /// Qualified name of the property.
        property: String,
    },
    /// The accessor has no public setter.
    #[error("`{property}` is not writable")]
    NotWritable {
        /// Qualified name of the property.
        property: String,
    },
    /// An accessor was invoked on an object of the wrong concrete type.
    #[error("accessor expects an object of type `{expected}`")]
    ObjectTypeMismatch {
        /// Name of the expected concrete type.
        expected: &'static str,
    },
}
