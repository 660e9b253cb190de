// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarative binding descriptions.
//!
//! A [`MultiBinding`] is plain configuration: the ordered source list, the
//! overall mode, how values are combined and what to do with `null`. It is
//! handed to [`BindingRegistry::attach`](crate::BindingRegistry::attach),
//! which builds a [`Coordinator`](crate::Coordinator) from it.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::converter::MultiValueConverter;
use crate::error::BindingError;
use crate::mode::{BindingMode, UpdateSourceTrigger};
use crate::object::ObjectRef;
use crate::value::Value;

/// A source located relative to the target element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelativeSource {
    /// The target element itself.
    SelfElement,
    /// The templated parent of the target element.
    TemplatedParent,
    /// An ancestor of the given type.
    FindAncestor {
        /// Name of the ancestor type.
        ancestor_type: String,
        /// How many matching ancestors to skip, starting at 1.
        level: u32,
    },
    /// The previous item of a data list.
    PreviousData,
}

impl RelativeSource {
    /// Short name used in diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::SelfElement => "Self",
            Self::TemplatedParent => "TemplatedParent",
            Self::FindAncestor { .. } => "FindAncestor",
            Self::PreviousData => "PreviousData",
        }
    }
}

/// How a source object is located, in priority order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResolutionKind {
    /// An object supplied with the binding.
    Explicit,
    /// An element found by name from the target element.
    NamedElement,
    /// A relative source; only the target element itself is supported.
    RelativeSelf,
    /// The target element's ambient context object.
    AmbientContext,
}

/// One source of a [`MultiBinding`].
///
/// ```rust
/// use understory_binding::{BindingMode, ResolutionKind, SourceBinding};
///
/// let first = SourceBinding::path("FirstName").element_name("person");
/// assert_eq!(first.resolution_kind(), ResolutionKind::NamedElement);
///
/// let age = SourceBinding::path("Age").mode(BindingMode::TwoWay);
/// assert_eq!(age.resolution_kind(), ResolutionKind::AmbientContext);
/// assert_eq!(age.effective_mode(BindingMode::OneWay), BindingMode::OneWay);
/// ```
#[derive(Clone)]
pub struct SourceBinding {
    path: String,
    source: Option<ObjectRef>,
    element_name: Option<String>,
    relative_source: Option<RelativeSource>,
    mode: Option<BindingMode>,
}

impl SourceBinding {
    /// A source reading property `path`.
    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: None,
            element_name: None,
            relative_source: None,
            mode: None,
        }
    }

    /// Reads from `source` directly.
    #[must_use]
    pub fn source(mut self, source: ObjectRef) -> Self {
        self.source = Some(source);
        self
    }

    /// Reads from the element called `name` in the target's scope.
    #[must_use]
    pub fn element_name(mut self, name: impl Into<String>) -> Self {
        self.element_name = Some(name.into());
        self
    }

    /// Reads from an element located relative to the target.
    #[must_use]
    pub fn relative_source(mut self, relative: RelativeSource) -> Self {
        self.relative_source = Some(relative);
        self
    }

    /// Requests a mode for this source. Without one, the coordinator's mode
    /// applies.
    #[must_use]
    pub fn mode(mut self, mode: BindingMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// The property path.
    #[must_use]
    pub fn property_path(&self) -> &str {
        &self.path
    }

    /// The explicit source object, if any.
    #[must_use]
    pub fn explicit_source(&self) -> Option<&ObjectRef> {
        self.source.as_ref()
    }

    /// The element name, if any.
    #[must_use]
    pub fn named_element(&self) -> Option<&str> {
        self.element_name.as_deref()
    }

    /// The relative source, if any.
    #[must_use]
    pub fn relative(&self) -> Option<&RelativeSource> {
        self.relative_source.as_ref()
    }

    /// The requested mode, if any.
    #[must_use]
    pub fn declared_mode(&self) -> Option<BindingMode> {
        self.mode
    }

    /// Which resolution strategy applies. The first configured one wins:
    /// explicit source, element name, relative source, ambient context.
    #[must_use]
    pub fn resolution_kind(&self) -> ResolutionKind {
        if self.source.is_some() {
            ResolutionKind::Explicit
        } else if self.element_name.is_some() {
            ResolutionKind::NamedElement
        } else if self.relative_source.is_some() {
            ResolutionKind::RelativeSelf
        } else {
            ResolutionKind::AmbientContext
        }
    }

    /// The mode this source runs with under a coordinator in `coordinator`
    /// mode: the declared mode, clamped to the coordinator's.
    #[must_use]
    pub fn effective_mode(&self, coordinator: BindingMode) -> BindingMode {
        self.mode
            .map_or(coordinator, |mode| mode.clamp_to(coordinator))
    }

    fn validate(&self) -> Result<(), BindingError> {
        if self.resolution_kind() == ResolutionKind::RelativeSelf
            && let Some(relative) = &self.relative_source
            && *relative != RelativeSource::SelfElement
        {
            return Err(BindingError::UnsupportedRelativeSource {
                kind: relative.kind_name(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for SourceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceBinding")
            .field("path", &self.path)
            .field("kind", &self.resolution_kind())
            .field("has_source", &self.source.is_some())
            .field("element_name", &self.element_name)
            .field("relative_source", &self.relative_source)
            .field("mode", &self.mode)
            .finish()
    }
}

/// A target property driven by several sources.
#[derive(Clone)]
pub struct MultiBinding {
    sources: Vec<SourceBinding>,
    mode: BindingMode,
    converter: Option<Rc<dyn MultiValueConverter>>,
    format: Option<String>,
    parameter: Value,
    language: String,
    null_value: Option<Value>,
    fallback_value: Option<Value>,
    update_trigger: UpdateSourceTrigger,
}

impl MultiBinding {
    /// Starts a binding description.
    ///
    /// ```rust
    /// use understory_binding::{BindingMode, MultiBinding, SourceBinding, UpdateSourceTrigger};
    ///
    /// let binding = MultiBinding::builder()
    ///     .source(SourceBinding::path("First"))
    ///     .source(SourceBinding::path("Last"))
    ///     .format("{1}, {0}")
    ///     .fallback_value("N/A")
    ///     .build();
    ///
    /// assert_eq!(binding.mode(), BindingMode::OneWay);
    /// assert_eq!(binding.update_trigger(), UpdateSourceTrigger::OnPropertyChanged);
    /// assert_eq!(binding.sources().len(), 2);
    /// assert!(binding.validate().is_ok());
    /// ```
    #[must_use]
    pub fn builder() -> MultiBindingBuilder {
        MultiBindingBuilder {
            binding: Self {
                sources: Vec::new(),
                mode: BindingMode::default(),
                converter: None,
                format: None,
                parameter: Value::Null,
                language: String::new(),
                null_value: None,
                fallback_value: None,
                update_trigger: UpdateSourceTrigger::default(),
            },
        }
    }

    /// The sources, in declaration order.
    #[must_use]
    pub fn sources(&self) -> &[SourceBinding] {
        &self.sources
    }

    /// The overall mode.
    #[must_use]
    #[inline]
    pub fn mode(&self) -> BindingMode {
        self.mode
    }

    /// The converter, if any.
    #[must_use]
    pub fn converter(&self) -> Option<&Rc<dyn MultiValueConverter>> {
        self.converter.as_ref()
    }

    /// The positional format string, if any.
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// The converter parameter.
    #[must_use]
    pub fn parameter(&self) -> &Value {
        &self.parameter
    }

    /// The language tag passed to the converter.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Substitute for a `null` conversion result.
    #[must_use]
    pub fn null_value(&self) -> Option<&Value> {
        self.null_value.as_ref()
    }

    /// Value used when no usable result is produced.
    #[must_use]
    pub fn fallback_value(&self) -> Option<&Value> {
        self.fallback_value.as_ref()
    }

    /// When target edits flow back to the sources.
    #[must_use]
    #[inline]
    pub fn update_trigger(&self) -> UpdateSourceTrigger {
        self.update_trigger
    }

    /// Checks everything that can be checked without a host.
    ///
    /// - A converter or a format string is required.
    /// - `TwoWay` requires a converter, as a format string has no inverse.
    /// - Relative sources other than [`RelativeSource::SelfElement`] are
    ///   rejected.
    pub fn validate(&self) -> Result<(), BindingError> {
        if self.converter.is_none()
            && (self.format.is_none() || self.mode == BindingMode::TwoWay)
        {
            return Err(BindingError::MissingConversionStrategy);
        }
        self.sources.iter().try_for_each(SourceBinding::validate)
    }
}

impl fmt::Debug for MultiBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiBinding")
            .field("sources", &self.sources)
            .field("mode", &self.mode)
            .field("converter", &self.converter.is_some())
            .field("format", &self.format)
            .field("parameter", &self.parameter)
            .field("language", &self.language)
            .field("null_value", &self.null_value)
            .field("fallback_value", &self.fallback_value)
            .field("update_trigger", &self.update_trigger)
            .finish()
    }
}

/// Builder for [`MultiBinding`].
#[derive(Debug)]
pub struct MultiBindingBuilder {
    binding: MultiBinding,
}

impl MultiBindingBuilder {
    /// Appends a source.
    #[must_use]
    pub fn source(mut self, source: SourceBinding) -> Self {
        self.binding.sources.push(source);
        self
    }

    /// Appends several sources.
    #[must_use]
    pub fn sources(mut self, sources: impl IntoIterator<Item = SourceBinding>) -> Self {
        self.binding.sources.extend(sources);
        self
    }

    /// Sets the overall mode.
    #[must_use]
    pub fn mode(mut self, mode: BindingMode) -> Self {
        self.binding.mode = mode;
        self
    }

    /// Sets the converter.
    #[must_use]
    pub fn converter(mut self, converter: impl MultiValueConverter + 'static) -> Self {
        self.binding.converter = Some(Rc::new(converter));
        self
    }

    /// Sets a shared converter.
    #[must_use]
    pub fn shared_converter(mut self, converter: Rc<dyn MultiValueConverter>) -> Self {
        self.binding.converter = Some(converter);
        self
    }

    /// Sets a positional format string. It takes precedence over the
    /// converter for source-to-target updates.
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.binding.format = Some(format.into());
        self
    }

    /// Sets the converter parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: impl Into<Value>) -> Self {
        self.binding.parameter = parameter.into();
        self
    }

    /// Sets the language tag.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.binding.language = language.into();
        self
    }

    /// Sets the substitute for a `null` result.
    #[must_use]
    pub fn null_value(mut self, value: impl Into<Value>) -> Self {
        self.binding.null_value = Some(value.into());
        self
    }

    /// Sets the fallback value.
    #[must_use]
    pub fn fallback_value(mut self, value: impl Into<Value>) -> Self {
        self.binding.fallback_value = Some(value.into());
        self
    }

    /// Sets the update trigger for target-to-source updates.
    #[must_use]
    pub fn update_trigger(mut self, trigger: UpdateSourceTrigger) -> Self {
        self.binding.update_trigger = trigger;
        self
    }

    /// Finishes the description. Call [`MultiBinding::validate`] to check it
    /// before attaching.
    #[must_use]
    pub fn build(self) -> MultiBinding {
        self.binding
    }
}
