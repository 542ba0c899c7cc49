//! Poolscale Core Library
//!
//! Tick-driven autoscaling controller for per-kind instance pools.
//! Provides the reconciliation controller, banded growth policy, idle-hit
//! tracking, configuration parsing and an in-memory simulated cloud.

pub mod config;
pub mod controller;
pub mod error;
pub mod policy;
pub mod sim;
pub mod state;
pub mod stats;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigLoader, ControllerConfig, SimulationConfig};
pub use controller::{Autoscaler, InstanceGroup, InstanceSample, Provisioner, ScalingAction};
pub use error::{HardValidationError, ScaleError, ScaleResult, StateTransitionError};
pub use policy::{ScalingBand, ScalingPolicy};
pub use sim::{SimulatedCloud, Simulation};
pub use state::{InstanceState, InstanceStateMachine};
pub use stats::{SimulationSummary, TickReport};
pub use types::{InstanceId, Kind, Utilization};
