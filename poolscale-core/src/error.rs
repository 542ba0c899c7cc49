//! Custom error types for Poolscale.
//!
//! Explicit enum error types only. No `Box<dyn Error>`, no `anyhow::Result`.
//! The controller tick itself never fails; errors surface at the edges
//! (configuration, newtype validation, simulated lifecycle transitions).

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{InstanceId, Kind};

/// Top-level error type for Poolscale.
#[derive(Debug, Error)]
pub enum ScaleError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Instance Lifecycle Errors
    // =========================================================================
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(#[from] StateTransitionError),

    #[error("Kind not tracked: {0}")]
    KindNotFound(Kind),

    #[error("Kind already tracked: {0}")]
    KindAlreadyExists(Kind),

    #[error("Instance not found: {0}")]
    InstanceNotFound(InstanceId),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Hard validation errors reject a configuration before any tick runs.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Utilization out of bounds: {value} (must be within 0.0..=1.0)")]
    UtilizationOutOfBounds { value: f64 },

    #[error("Invalid scaling band #{index} [{lower}, {upper}] x{multiplier}: {reason}")]
    InvalidBand {
        index: usize,
        lower: f64,
        upper: f64,
        multiplier: f64,
        reason: String,
    },

    #[error("Duplicate kind: {kind}")]
    DuplicateKind { kind: String },

    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },
}

/// State transition errors for the simulated instance lifecycle.
#[derive(Debug, Error)]
pub enum StateTransitionError {
    #[error("Cannot transition from {from} to {to} for instance {instance}")]
    InvalidTransition {
        instance: InstanceId,
        from: &'static str,
        to: &'static str,
    },
}

/// Result type alias using ScaleError.
pub type ScaleResult<T> = Result<T, ScaleError>;
