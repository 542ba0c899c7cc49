// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::controller::{InstanceGroup, ScalingAction};
use crate::types::{InstanceId, Kind};

/// Outcome of one controller tick.
/// Pool sizes are those observed at the start of the tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub pool_sizes: BTreeMap<Kind, usize>,
    pub provisioned: BTreeMap<Kind, usize>,
    pub destroyed: BTreeMap<Kind, Vec<InstanceId>>,
    pub retired: Vec<Kind>,
}

impl TickReport {
    pub fn new(tick: u64, groups: &[InstanceGroup]) -> Self {
        Self {
            tick,
            pool_sizes: groups.iter().map(|g| (g.kind.clone(), g.len())).collect(),
            ..Default::default()
        }
    }

    /// Account for an applied action.
    pub fn record(&mut self, action: &ScalingAction) {
        match action {
            ScalingAction::Provision { kind } => {
                *self.provisioned.entry(kind.clone()).or_default() += 1;
            }
            ScalingAction::Destroy { kind, instance } => {
                self.destroyed.entry(kind.clone()).or_default().push(*instance);
            }
            ScalingAction::Retire { kind } => self.retired.push(kind.clone()),
        }
    }

    pub fn total_provisioned(&self) -> usize {
        self.provisioned.values().sum()
    }

    pub fn total_destroyed(&self) -> usize {
        self.destroyed.values().map(Vec::len).sum()
    }

    pub fn is_quiet(&self) -> bool {
        self.provisioned.is_empty() && self.destroyed.is_empty() && self.retired.is_empty()
    }
}

/// Per-kind totals over a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindSummary {
    pub provisioned: usize,
    pub destroyed: usize,
    pub peak_pool_size: usize,
    pub final_pool_size: usize,
    pub retired_at: Option<u64>,
}

/// Aggregated results of a simulation run, written as JSON by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub ticks: u64,
    pub kinds: BTreeMap<Kind, KindSummary>,
}

impl SimulationSummary {
    /// Fold one tick into the running totals.
    pub fn absorb(&mut self, report: &TickReport) {
        self.ticks += 1;

        for (kind, size) in &report.pool_sizes {
            let entry = self.kinds.entry(kind.clone()).or_default();
            entry.peak_pool_size = entry.peak_pool_size.max(*size);
        }
        for (kind, count) in &report.provisioned {
            self.kinds.entry(kind.clone()).or_default().provisioned += count;
        }
        for (kind, ids) in &report.destroyed {
            self.kinds.entry(kind.clone()).or_default().destroyed += ids.len();
        }
        for kind in &report.retired {
            self.kinds.entry(kind.clone()).or_default().retired_at = Some(report.tick);
        }
    }

    /// Record the pool sizes observed after the last tick.
    pub fn finish(&mut self, final_sizes: &BTreeMap<Kind, usize>) {
        for (kind, summary) in self.kinds.iter_mut() {
            summary.final_pool_size = final_sizes.get(kind).copied().unwrap_or(0);
            summary.peak_pool_size = summary.peak_pool_size.max(summary.final_pool_size);
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
