// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Following the "Newtype" pattern in Rust to ensure valid state by construction.
//! All types validate their invariants at creation time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Maximum length of a kind identifier.
const MAX_KIND_LEN: usize = 64;

/// Validated workload kind identifier.
/// Must be non-empty, alphanumeric with hyphens/underscores/dots, max 64 chars.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Kind(String);

impl Kind {
    /// Create a new Kind with validation.
    pub fn new(kind: impl Into<String>) -> Result<Self, HardValidationError> {
        let kind = kind.into();

        if kind.is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "kind",
                value: kind,
                reason: "Kind cannot be empty".to_string(),
            });
        }

        if kind.len() > MAX_KIND_LEN {
            return Err(HardValidationError::InvalidFieldValue {
                field: "kind",
                value: kind.clone(),
                reason: format!("Kind too long: {} chars (max {})", kind.len(), MAX_KIND_LEN),
            });
        }

        if !kind
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(HardValidationError::InvalidFieldValue {
                field: "kind",
                value: kind,
                reason: "Kind must contain only alphanumeric characters, hyphens, underscores, and dots".to_string(),
            });
        }

        Ok(Self(kind))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Kind {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Kind> for String {
    fn from(kind: Kind) -> Self {
        kind.0
    }
}

/// Stable instance identifier assigned by the provisioning backend.
/// Idle-hit bookkeeping is keyed by this, never by reference identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(u64);

impl InstanceId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<InstanceId> for u64 {
    fn from(id: InstanceId) -> Self {
        id.0
    }
}

/// Validated utilization fraction.
/// Must be a finite value in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Utilization(f64);

impl Utilization {
    pub const IDLE: Utilization = Utilization(0.0);
    pub const FULL: Utilization = Utilization(1.0);

    /// Create a new Utilization with bounds validation.
    pub fn new(value: f64) -> Result<Self, HardValidationError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(HardValidationError::UtilizationOutOfBounds { value });
        }
        Ok(Self(value))
    }

    /// Create without validation (for trusted constants).
    pub(crate) const fn new_unchecked(value: f64) -> Self {
        Self(value)
    }

    /// Get the inner fraction.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Utilization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}

impl TryFrom<f64> for Utilization {
    type Error = HardValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Utilization> for f64 {
    fn from(u: Utilization) -> Self {
        u.0
    }
}
