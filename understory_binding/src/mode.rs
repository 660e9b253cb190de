// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binding modes and update triggers.

use alloc::string::ToString;
use core::fmt;
use core::str::FromStr;

use crate::error::BindingError;

/// Direction of data flow for a binding.
///
/// Variants are ordered by strength: `OneTime < OneWay < TwoWay`. A source
/// inside a coordinator is never stronger than the coordinator itself.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BindingMode {
    /// The target is synchronized once, at activation.
    OneTime,
    /// Source changes flow to the target.
    #[default]
    OneWay,
    /// Source changes flow to the target and target edits flow back.
    TwoWay,
}

impl BindingMode {
    /// Returns the weaker of `self` and `limit`.
    ///
    /// ```rust
    /// use understory_binding::BindingMode;
    ///
    /// assert_eq!(BindingMode::TwoWay.clamp_to(BindingMode::OneWay), BindingMode::OneWay);
    /// assert_eq!(BindingMode::OneTime.clamp_to(BindingMode::TwoWay), BindingMode::OneTime);
    /// ```
    #[must_use]
    #[inline]
    pub fn clamp_to(self, limit: Self) -> Self {
        self.min(limit)
    }

    /// Whether source changes are observed after activation.
    #[must_use]
    #[inline]
    pub fn observes_source(self) -> bool {
        self >= Self::OneWay
    }

    /// Whether target edits are written back to the source.
    #[must_use]
    #[inline]
    pub fn writes_back(self) -> bool {
        self == Self::TwoWay
    }

    /// The canonical textual name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneTime => "OneTime",
            Self::OneWay => "OneWay",
            Self::TwoWay => "TwoWay",
        }
    }
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BindingMode {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "OneTime" => Ok(Self::OneTime),
            "OneWay" => Ok(Self::OneWay),
            "TwoWay" => Ok(Self::TwoWay),
            other => Err(BindingError::UnknownBindingMode {
                value: other.to_string(),
            }),
        }
    }
}

/// When target edits are pushed back to two-way sources.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum UpdateSourceTrigger {
    /// Every target change runs the reverse path.
    #[default]
    OnPropertyChanged,
    /// The reverse path only runs on
    /// [`Coordinator::update_source`](crate::Coordinator::update_source).
    Explicit,
}

impl UpdateSourceTrigger {
    /// The canonical textual name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnPropertyChanged => "PropertyChanged",
            Self::Explicit => "Explicit",
        }
    }
}

impl fmt::Display for UpdateSourceTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateSourceTrigger {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PropertyChanged" | "Default" => Ok(Self::OnPropertyChanged),
            "Explicit" => Ok(Self::Explicit),
            other => Err(BindingError::UnknownBindingMode {
                value: other.to_string(),
            }),
        }
    }
}
