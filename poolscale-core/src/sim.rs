// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! In-memory cloud and tick-driven simulation.
//!
//! `SimulatedCloud` plays the provisioning and lifecycle collaborator: it
//! tracks kinds, boots requested instances after a fixed delay and reports
//! running instances with their idle flag and trailing utilization.
//! `Simulation` drives an [`Autoscaler`] against it with configured load
//! phases.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::config::{Config, ControllerConfig, SimulationConfig};
use crate::controller::{Autoscaler, InstanceGroup, InstanceSample, Provisioner};
use crate::error::{HardValidationError, ScaleError, ScaleResult};
use crate::state::{InstanceState, InstanceStateMachine};
use crate::stats::{SimulationSummary, TickReport};
use crate::types::{InstanceId, Kind, Utilization};

/// One simulated instance.
#[derive(Debug, Clone)]
pub struct SimInstance {
    pub kind: Kind,
    pub lifecycle: InstanceStateMachine,
    pub busy: bool,
    pub utilization: Utilization,
}

/// Thread-safe simulated provisioning backend.
/// Uses DashMap so the async harness can share it across tasks.
#[derive(Debug)]
pub struct SimulatedCloud {
    /// Tracked kinds and their members in request order.
    kinds: DashMap<Kind, Vec<InstanceId>>,
    instances: DashMap<InstanceId, SimInstance>,
    next_id: AtomicU64,
    clock: AtomicU64,
    boot_delay_ticks: u64,
}

impl SimulatedCloud {
    /// Create an empty cloud whose instances boot after `boot_delay_ticks`.
    pub fn new(boot_delay_ticks: u64) -> Self {
        Self {
            kinds: DashMap::new(),
            instances: DashMap::new(),
            next_id: AtomicU64::new(1),
            clock: AtomicU64::new(0),
            boot_delay_ticks,
        }
    }

    /// Create a cloud wrapped in an Arc for sharing across tasks.
    pub fn new_shared(boot_delay_ticks: u64) -> Arc<Self> {
        Arc::new(Self::new(boot_delay_ticks))
    }

    /// Start tracking a kind. Needed again after the kind was retired.
    pub fn register_kind(&self, kind: Kind) -> ScaleResult<()> {
        match self.kinds.entry(kind) {
            Entry::Occupied(entry) => Err(ScaleError::KindAlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(kind = %entry.key(), "Kind registered");
                entry.insert(Vec::new());
                Ok(())
            }
        }
    }

    pub fn is_tracked(&self, kind: &Kind) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Tracked kinds in sorted order.
    pub fn kinds(&self) -> Vec<Kind> {
        let mut kinds: Vec<Kind> = self.kinds.iter().map(|r| r.key().clone()).collect();
        kinds.sort();
        kinds
    }

    /// Current simulated tick.
    pub fn now(&self) -> u64 {
        self.clock.load(Ordering::SeqCst)
    }

    /// Move the clock forward one tick and finish booting due instances.
    pub fn advance(&self) -> u64 {
        let now = self.clock.fetch_add(1, Ordering::SeqCst) + 1;

        for mut entry in self.instances.iter_mut() {
            let lifecycle = &mut entry.value_mut().lifecycle;
            if lifecycle.state() == InstanceState::Booting
                && lifecycle.ticks_in_state(now) >= self.boot_delay_ticks
            {
                if let Err(e) = lifecycle.transition_to(InstanceState::Running, now) {
                    warn!(error = %e, "Failed to finish booting instance");
                }
            }
        }

        now
    }

    /// Apply one load level to every running instance of `kind`.
    /// Returns the number of instances updated.
    pub fn set_load(
        &self,
        kind: &Kind,
        utilization: Utilization,
        busy: bool,
    ) -> ScaleResult<usize> {
        let members = self
            .kinds
            .get(kind)
            .map(|m| m.clone())
            .ok_or_else(|| ScaleError::KindNotFound(kind.clone()))?;

        let mut updated = 0;
        for id in members {
            if let Some(mut instance) = self.instances.get_mut(&id) {
                if instance.lifecycle.is_running() {
                    instance.utilization = utilization;
                    instance.busy = busy;
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    /// Set the load of a single instance.
    pub fn set_instance_load(
        &self,
        id: InstanceId,
        utilization: Utilization,
        busy: bool,
    ) -> ScaleResult<()> {
        let mut instance = self
            .instances
            .get_mut(&id)
            .ok_or(ScaleError::InstanceNotFound(id))?;
        instance.utilization = utilization;
        instance.busy = busy;
        Ok(())
    }

    /// Lifecycle state of an instance still known to the cloud.
    pub fn state_of(&self, id: InstanceId) -> Option<InstanceState> {
        self.instances.get(&id).map(|i| i.lifecycle.state())
    }

    /// Members of `kind` in request order, booting ones included.
    pub fn members(&self, kind: &Kind) -> Vec<InstanceId> {
        self.kinds.get(kind).map(|m| m.clone()).unwrap_or_default()
    }

    /// Running instances of `kind`.
    pub fn pool_size(&self, kind: &Kind) -> usize {
        self.count_members(kind, InstanceState::Running)
    }

    /// Instances of `kind` still booting.
    pub fn pending(&self, kind: &Kind) -> usize {
        self.count_members(kind, InstanceState::Booting)
    }

    /// Running pool size of every tracked kind.
    pub fn running_sizes(&self) -> BTreeMap<Kind, usize> {
        self.kinds()
            .into_iter()
            .map(|kind| {
                let size = self.pool_size(&kind);
                (kind, size)
            })
            .collect()
    }

    fn count_members(&self, kind: &Kind, state: InstanceState) -> usize {
        self.members(kind)
            .into_iter()
            .filter(|id| self.state_of(*id) == Some(state))
            .count()
    }

    fn release(&self, id: InstanceId) -> ScaleResult<()> {
        let (_, mut instance) = self
            .instances
            .remove(&id)
            .ok_or(ScaleError::InstanceNotFound(id))?;
        instance
            .lifecycle
            .transition_to(InstanceState::Destroyed, self.now())?;
        Ok(())
    }
}

impl Provisioner for SimulatedCloud {
    fn groups_by_kind(&self) -> Vec<InstanceGroup> {
        self.kinds()
            .into_iter()
            .map(|kind| {
                let instances = self
                    .members(&kind)
                    .into_iter()
                    .filter_map(|id| {
                        let instance = self.instances.get(&id)?;
                        instance.lifecycle.is_running().then(|| InstanceSample {
                            id,
                            idle: !instance.busy,
                            utilization: instance.utilization,
                        })
                    })
                    .collect();
                InstanceGroup::new(kind, instances)
            })
            .collect()
    }

    fn request_instance(&self, kind: &Kind) {
        let Some(mut members) = self.kinds.get_mut(kind) else {
            warn!(kind = %kind, "Instance requested for untracked kind, ignoring");
            return;
        };

        let now = self.now();
        let id = InstanceId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut lifecycle = InstanceStateMachine::new(id, now);
        if self.boot_delay_ticks == 0 {
            if let Err(e) = lifecycle.transition_to(InstanceState::Running, now) {
                warn!(error = %e, "Failed to boot instance");
            }
        }

        self.instances.insert(
            id,
            SimInstance {
                kind: kind.clone(),
                lifecycle,
                busy: false,
                utilization: Utilization::IDLE,
            },
        );
        members.push(id);
        debug!(kind = %kind, instance = %id, tick = now, "Instance requested");
    }

    fn destroy_instance(&self, kind: &Kind, instance: InstanceId) {
        if let Some(mut members) = self.kinds.get_mut(kind) {
            members.retain(|id| *id != instance);
        }
        if let Err(e) = self.release(instance) {
            warn!(kind = %kind, instance = %instance, error = %e, "Destroy request failed");
        }
    }

    fn retire_kind(&self, kind: &Kind) {
        let Some((_, members)) = self.kinds.remove(kind) else {
            warn!(kind = %kind, "Retire requested for untracked kind, ignoring");
            return;
        };
        for id in members {
            if let Err(e) = self.release(id) {
                warn!(
                    kind = %kind,
                    instance = %id,
                    error = %e,
                    "Failed to release member of retired kind"
                );
            }
        }
        debug!(kind = %kind, "Kind retired");
    }
}

/// Autoscaler driven against a simulated cloud with scripted load.
#[derive(Debug)]
pub struct Simulation {
    autoscaler: Autoscaler,
    cloud: Arc<SimulatedCloud>,
    config: SimulationConfig,
}

impl Simulation {
    /// Build a simulation from a loaded configuration file.
    pub fn from_config(config: &Config) -> ScaleResult<Self> {
        let sim = config.simulation.clone().ok_or_else(|| {
            ScaleError::from(HardValidationError::SchemaValidation {
                message: "Configuration has no simulation section".to_string(),
            })
        })?;
        Self::new(config.controller.clone(), &config.kinds, sim)
    }

    pub fn new(
        controller: ControllerConfig,
        kinds: &[Kind],
        config: SimulationConfig,
    ) -> ScaleResult<Self> {
        let cloud = SimulatedCloud::new_shared(config.boot_delay_ticks);
        for kind in kinds {
            cloud.register_kind(kind.clone())?;
        }

        Ok(Self {
            autoscaler: Autoscaler::new(controller),
            cloud,
            config,
        })
    }

    pub fn cloud(&self) -> &Arc<SimulatedCloud> {
        &self.cloud
    }

    pub fn autoscaler(&self) -> &Autoscaler {
        &self.autoscaler
    }

    /// Configured number of ticks for [`Simulation::run`].
    pub fn ticks(&self) -> u64 {
        self.config.ticks
    }

    /// Apply the current load phase, run one controller tick and advance
    /// the clock.
    pub fn step(&mut self) -> TickReport {
        let now = self.cloud.now();

        for workload in &self.config.workloads {
            let Some(phase) = workload.phase_at(now) else {
                continue;
            };
            if let Err(e) = self.cloud.set_load(&workload.kind, phase.utilization, phase.busy) {
                debug!(kind = %workload.kind, error = %e, "Load not applied");
            }
        }

        let report = self.autoscaler.tick(now, self.cloud.as_ref());
        self.cloud.advance();
        report
    }

    /// Run every configured tick and summarize.
    pub fn run(&mut self) -> SimulationSummary {
        let mut summary = SimulationSummary::default();
        for _ in 0..self.config.ticks {
            let report = self.step();
            summary.absorb(&report);
        }
        summary.finish(&self.cloud.running_sizes());
        summary
    }
}
