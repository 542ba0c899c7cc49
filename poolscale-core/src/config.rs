// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Validates controller settings, the growth policy table, registered kinds
//! and the optional simulation workload at load time.
//! Any invalid field results in a HardValidationError before a tick runs.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HardValidationError, ScaleError, ScaleResult};
use crate::policy::{ScalingBand, ScalingPolicy, DEFAULT_BANDS};
use crate::types::{Kind, Utilization};

/// Raw controller configuration as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawControllerConfig {
    #[serde(default = "default_min_pool_size")]
    min_pool_size: usize,
    #[serde(default = "default_destroy_threshold")]
    destroy_threshold: f64,
    #[serde(default = "default_idle_hit_threshold")]
    idle_hit_threshold: u32,
    #[serde(default = "default_tick_interval_ms")]
    tick_interval_ms: u64,
    #[serde(default = "default_scaling_policy")]
    scaling_policy: Vec<ScalingBand>,
}

fn default_min_pool_size() -> usize {
    4
}

fn default_destroy_threshold() -> f64 {
    0.10
}

fn default_idle_hit_threshold() -> u32 {
    30
}

fn default_tick_interval_ms() -> u64 {
    120_000 // 2 minutes: 30 idle hits is one hour of grace
}

fn default_scaling_policy() -> Vec<ScalingBand> {
    DEFAULT_BANDS.to_vec()
}

impl Default for RawControllerConfig {
    fn default() -> Self {
        Self {
            min_pool_size: default_min_pool_size(),
            destroy_threshold: default_destroy_threshold(),
            idle_hit_threshold: default_idle_hit_threshold(),
            tick_interval_ms: default_tick_interval_ms(),
            scaling_policy: default_scaling_policy(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLoadPhase {
    ticks: u64,
    utilization: f64,
    #[serde(default)]
    busy: bool,
}

#[derive(Debug, Deserialize)]
struct RawWorkload {
    kind: String,
    phases: Vec<RawLoadPhase>,
}

#[derive(Debug, Deserialize)]
struct RawSimulationConfig {
    ticks: u64,
    #[serde(default = "default_boot_delay_ticks")]
    boot_delay_ticks: u64,
    #[serde(default)]
    workloads: Vec<RawWorkload>,
}

fn default_boot_delay_ticks() -> u64 {
    1
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    controller: RawControllerConfig,
    kinds: Vec<String>,
    #[serde(default)]
    simulation: Option<RawSimulationConfig>,
}

/// Validated controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerConfig {
    /// Instances kept per kind regardless of utilization.
    pub min_pool_size: usize,
    /// Idle instances below this trailing utilization are reclaimed.
    pub destroy_threshold: Utilization,
    /// Idle ticks a sole survivor is granted before destruction.
    pub idle_hit_threshold: u32,
    /// Scheduling period of the paced harness.
    pub tick_interval: Duration,
    pub policy: ScalingPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            min_pool_size: default_min_pool_size(),
            destroy_threshold: Utilization::new_unchecked(default_destroy_threshold()),
            idle_hit_threshold: default_idle_hit_threshold(),
            tick_interval: Duration::from_millis(default_tick_interval_ms()),
            policy: ScalingPolicy::default(),
        }
    }
}

/// One stretch of constant load applied to every running instance of a kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadPhase {
    pub ticks: u64,
    pub utilization: Utilization,
    pub busy: bool,
}

/// Load profile of one kind over the simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workload {
    pub kind: Kind,
    pub phases: Vec<LoadPhase>,
}

impl Workload {
    /// The phase active at `tick` (0-based). The last phase holds once the
    /// profile is exhausted.
    pub fn phase_at(&self, tick: u64) -> Option<&LoadPhase> {
        let mut start: u64 = 0;
        for phase in &self.phases {
            let end = start.saturating_add(phase.ticks);
            if tick < end {
                return Some(phase);
            }
            start = end;
        }
        self.phases.last()
    }
}

/// Validated simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationConfig {
    pub ticks: u64,
    pub boot_delay_ticks: u64,
    pub workloads: Vec<Workload>,
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub controller: ControllerConfig,
    pub kinds: Vec<Kind>,
    pub simulation: Option<SimulationConfig>,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> ScaleResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScaleError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ScaleError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> ScaleResult<Config> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| ScaleError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> ScaleResult<Config> {
        let controller = Self::validate_controller(raw.controller)?;

        let mut kinds = Vec::with_capacity(raw.kinds.len());
        let mut seen = HashSet::new();
        for name in raw.kinds {
            let kind = Kind::new(name)?;
            if !seen.insert(kind.clone()) {
                return Err(HardValidationError::DuplicateKind {
                    kind: kind.to_string(),
                }
                .into());
            }
            kinds.push(kind);
        }

        if kinds.is_empty() {
            return Err(HardValidationError::SchemaValidation {
                message: "At least one kind must be registered".to_string(),
            }
            .into());
        }

        let simulation = raw
            .simulation
            .map(|sim| Self::validate_simulation(sim, &seen))
            .transpose()?;

        Ok(Config {
            controller,
            kinds,
            simulation,
        })
    }

    fn validate_controller(raw: RawControllerConfig) -> ScaleResult<ControllerConfig> {
        if raw.min_pool_size == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "min_pool_size",
                value: "0".to_string(),
                reason: "Pool floor must be at least 1".to_string(),
            }
            .into());
        }

        let destroy_threshold = Utilization::new(raw.destroy_threshold).map_err(|e| {
            HardValidationError::InvalidFieldValue {
                field: "destroy_threshold",
                value: raw.destroy_threshold.to_string(),
                reason: e.to_string(),
            }
        })?;

        if raw.idle_hit_threshold == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "idle_hit_threshold",
                value: "0".to_string(),
                reason: "Sole survivors need at least one idle tick of grace".to_string(),
            }
            .into());
        }

        if raw.tick_interval_ms == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "tick_interval_ms",
                value: "0".to_string(),
                reason: "Tick interval must be greater than 0".to_string(),
            }
            .into());
        }

        let policy = ScalingPolicy::new(raw.scaling_policy)?;

        Ok(ControllerConfig {
            min_pool_size: raw.min_pool_size,
            destroy_threshold,
            idle_hit_threshold: raw.idle_hit_threshold,
            tick_interval: Duration::from_millis(raw.tick_interval_ms),
            policy,
        })
    }

    fn validate_simulation(
        raw: RawSimulationConfig,
        registered: &HashSet<Kind>,
    ) -> ScaleResult<SimulationConfig> {
        if raw.ticks == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "simulation.ticks",
                value: "0".to_string(),
                reason: "Simulation must run at least one tick".to_string(),
            }
            .into());
        }

        let mut workloads = Vec::with_capacity(raw.workloads.len());
        let mut seen = HashSet::new();
        for (index, raw_workload) in raw.workloads.into_iter().enumerate() {
            let kind = Kind::new(raw_workload.kind)?;
            if !registered.contains(&kind) {
                return Err(HardValidationError::SchemaValidation {
                    message: format!(
                        "Workload at index {} targets unregistered kind '{}'",
                        index, kind
                    ),
                }
                .into());
            }
            if !seen.insert(kind.clone()) {
                return Err(HardValidationError::DuplicateKind {
                    kind: kind.to_string(),
                }
                .into());
            }
            if raw_workload.phases.is_empty() {
                return Err(HardValidationError::SchemaValidation {
                    message: format!("Workload for kind '{}' has no phases", kind),
                }
                .into());
            }

            let mut phases = Vec::with_capacity(raw_workload.phases.len());
            for raw_phase in raw_workload.phases {
                if raw_phase.ticks == 0 {
                    return Err(HardValidationError::InvalidFieldValue {
                        field: "phases.ticks",
                        value: "0".to_string(),
                        reason: format!("Phase for kind '{}' must last at least one tick", kind),
                    }
                    .into());
                }
                phases.push(LoadPhase {
                    ticks: raw_phase.ticks,
                    utilization: Utilization::new(raw_phase.utilization)?,
                    busy: raw_phase.busy,
                });
            }

            workloads.push(Workload { kind, phases });
        }

        Ok(SimulationConfig {
            ticks: raw.ticks,
            boot_delay_ticks: raw.boot_delay_ticks,
            workloads,
        })
    }
}
