// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Per-tick autoscaling controller.
//!
//! Each tick visits every tracked kind once and applies, in order:
//!
//! 1. pool floor: fewer than `min_pool_size` members -> request one instance
//! 2. sole survivor: a lone idle instance accrues idle hits and is destroyed
//!    (and its kind retired) once the hit threshold is reached
//! 3. reclamation: with several members, every idle instance below the
//!    destroy threshold is destroyed
//! 4. growth: mean utilization is mapped through the [`ScalingPolicy`]
//!
//! Rules 1-3 short-circuit the remaining rules for that kind. Decisions are
//! made against a snapshot of the groups and applied after the pass.
//!
//! [`ScalingPolicy`]: crate::policy::ScalingPolicy

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ControllerConfig;
use crate::stats::TickReport;
use crate::tracker::IdleHitTracker;
use crate::types::{InstanceId, Kind, Utilization};

/// Read-only view of one instance at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstanceSample {
    pub id: InstanceId,
    /// No assigned and no pending work.
    pub idle: bool,
    /// Trailing-window average load.
    pub utilization: Utilization,
}

/// All instances of one tracked kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceGroup {
    pub kind: Kind,
    pub instances: Vec<InstanceSample>,
}

impl InstanceGroup {
    pub fn new(kind: Kind, instances: Vec<InstanceSample>) -> Self {
        Self { kind, instances }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Arithmetic mean of trailing utilization, or `None` for an empty group.
    pub fn mean_utilization(&self) -> Option<f64> {
        if self.instances.is_empty() {
            return None;
        }
        let sum: f64 = self.instances.iter().map(|i| i.utilization.value()).sum();
        Some(sum / self.instances.len() as f64)
    }
}

/// A single side effect decided during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingAction {
    /// Ask the backend for one more instance of `kind`.
    Provision { kind: Kind },
    /// Ask the backend to release `instance`.
    Destroy { kind: Kind, instance: InstanceId },
    /// Stop tracking `kind`; it must be registered again to receive instances.
    Retire { kind: Kind },
}

/// Provisioning and lifecycle collaborator.
///
/// Requests are fire-and-forget: the controller never waits for them, and
/// membership changes are only seen through later `groups_by_kind` calls.
pub trait Provisioner {
    /// Snapshot of every tracked kind and its current instances.
    fn groups_by_kind(&self) -> Vec<InstanceGroup>;

    fn request_instance(&self, kind: &Kind);

    fn destroy_instance(&self, kind: &Kind, instance: InstanceId);

    fn retire_kind(&self, kind: &Kind);
}

/// Closed-loop pool controller.
#[derive(Debug)]
pub struct Autoscaler {
    config: ControllerConfig,
    idle_hits: IdleHitTracker,
}

impl Autoscaler {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            idle_hits: IdleHitTracker::new(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Consecutive sole-survivor idle ticks recorded for `instance`.
    pub fn idle_hits(&self, instance: InstanceId) -> Option<u32> {
        self.idle_hits.hits(instance)
    }

    /// Run one reconciliation pass against `provisioner` and apply the result.
    pub fn tick<P>(&mut self, now: u64, provisioner: &P) -> TickReport
    where
        P: Provisioner + ?Sized,
    {
        let groups = provisioner.groups_by_kind();
        let actions = self.plan(&groups);

        let mut report = TickReport::new(now, &groups);
        for action in &actions {
            match action {
                ScalingAction::Provision { kind } => provisioner.request_instance(kind),
                ScalingAction::Destroy { kind, instance } => {
                    provisioner.destroy_instance(kind, *instance)
                }
                ScalingAction::Retire { kind } => provisioner.retire_kind(kind),
            }
            report.record(action);
        }

        if actions.is_empty() {
            debug!(tick = now, kinds = groups.len(), "Tick complete, pool unchanged");
        } else {
            info!(
                tick = now,
                kinds = groups.len(),
                provisioned = report.total_provisioned(),
                destroyed = report.total_destroyed(),
                retired = report.retired.len(),
                "Tick complete"
            );
        }

        report
    }

    /// Decide the actions for every group without touching the backend.
    pub fn plan(&mut self, groups: &[InstanceGroup]) -> Vec<ScalingAction> {
        let mut actions = Vec::new();
        for group in groups {
            actions.extend(self.plan_group(group));
        }

        // Instances that vanished from the backend take their streak with them.
        let live: HashSet<InstanceId> = groups
            .iter()
            .flat_map(|g| g.instances.iter().map(|i| i.id))
            .collect();
        self.idle_hits.retain(|id| live.contains(&id));

        actions
    }

    /// Decide the actions for a single kind.
    pub fn plan_group(&mut self, group: &InstanceGroup) -> Vec<ScalingAction> {
        let kind = &group.kind;
        let size = group.len();

        if size != 1 {
            for instance in &group.instances {
                self.idle_hits.clear(instance.id);
            }
        }

        if size < self.config.min_pool_size {
            debug!(
                kind = %kind,
                size,
                floor = self.config.min_pool_size,
                "Below pool floor, requesting one instance"
            );
            return vec![ScalingAction::Provision { kind: kind.clone() }];
        }

        match group.instances.as_slice() {
            [] => return Vec::new(),
            [only] => {
                if only.idle {
                    return self.sole_survivor_idle(kind, only.id);
                }
                self.idle_hits.clear(only.id);
            }
            instances => {
                let reclaimed: Vec<ScalingAction> = instances
                    .iter()
                    .filter(|i| {
                        i.idle && i.utilization.value() < self.config.destroy_threshold.value()
                    })
                    .map(|i| {
                        info!(
                            kind = %kind,
                            instance = %i.id,
                            utilization = i.utilization.value(),
                            "Reclaiming idle instance"
                        );
                        ScalingAction::Destroy {
                            kind: kind.clone(),
                            instance: i.id,
                        }
                    })
                    .collect();

                if !reclaimed.is_empty() {
                    // Growth is reassessed next tick against the smaller group.
                    return reclaimed;
                }
            }
        }

        self.grow(group)
    }

    fn sole_survivor_idle(&mut self, kind: &Kind, instance: InstanceId) -> Vec<ScalingAction> {
        let hits = self.idle_hits.record_idle(instance);
        if hits < self.config.idle_hit_threshold {
            debug!(
                kind = %kind,
                instance = %instance,
                hits,
                threshold = self.config.idle_hit_threshold,
                "Sole instance idle, keeping it"
            );
            return Vec::new();
        }

        self.idle_hits.clear(instance);
        info!(
            kind = %kind,
            instance = %instance,
            hits,
            "Sole instance idle past grace period, destroying and retiring kind"
        );
        vec![
            ScalingAction::Destroy {
                kind: kind.clone(),
                instance,
            },
            ScalingAction::Retire { kind: kind.clone() },
        ]
    }

    fn grow(&self, group: &InstanceGroup) -> Vec<ScalingAction> {
        let Some(mean) = group.mean_utilization() else {
            return Vec::new();
        };

        let extra = self.config.policy.additional_instances(mean, group.len());
        if extra > 0 {
            debug!(
                kind = %group.kind,
                size = group.len(),
                mean_utilization = mean,
                extra,
                "Utilization band matched, growing group"
            );
        }

        (0..extra)
            .map(|_| ScalingAction::Provision {
                kind: group.kind.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(name: &str) -> Kind {
        Kind::new(name).unwrap()
    }

    fn sample(id: u64, idle: bool, utilization: f64) -> InstanceSample {
        InstanceSample {
            id: InstanceId::new(id),
            idle,
            utilization: Utilization::new(utilization).unwrap(),
        }
    }

    fn group(name: &str, instances: Vec<InstanceSample>) -> InstanceGroup {
        InstanceGroup::new(kind(name), instances)
    }

    fn config_with_floor(min_pool_size: usize) -> ControllerConfig {
        ControllerConfig {
            min_pool_size,
            ..Default::default()
        }
    }

    fn count_provisions(actions: &[ScalingAction]) -> usize {
        actions
            .iter()
            .filter(|a| matches!(a, ScalingAction::Provision { .. }))
            .count()
    }

    fn count_destroys(actions: &[ScalingAction]) -> usize {
        actions
            .iter()
            .filter(|a| matches!(a, ScalingAction::Destroy { .. }))
            .count()
    }

    #[test]
    fn test_below_floor_requests_exactly_one() {
        let mut scaler = Autoscaler::new(ControllerConfig::default());
        // Busy and saturated, but the floor rule short-circuits growth.
        let g = group("web", vec![sample(1, false, 0.99), sample(2, false, 0.99)]);

        let actions = scaler.plan_group(&g);
        assert_eq!(actions, vec![ScalingAction::Provision { kind: kind("web") }]);
    }

    #[test]
    fn test_empty_group_below_floor_requests_one() {
        let mut scaler = Autoscaler::new(ControllerConfig::default());
        let actions = scaler.plan_group(&group("web", Vec::new()));
        assert_eq!(count_provisions(&actions), 1);
    }

    #[test]
    fn test_all_idle_low_utilization_destroyed() {
        let mut scaler = Autoscaler::new(ControllerConfig::default());
        let g = group("web", (1..=5).map(|id| sample(id, true, 0.05)).collect());

        let actions = scaler.plan_group(&g);
        assert_eq!(count_destroys(&actions), 5);
        assert_eq!(count_provisions(&actions), 0);
    }

    #[test]
    fn test_reclamation_suppresses_growth() {
        let mut scaler = Autoscaler::new(ControllerConfig::default());
        // Mean utilization is high, but one idle instance is under threshold.
        let g = group(
            "web",
            vec![
                sample(1, false, 1.0),
                sample(2, false, 1.0),
                sample(3, false, 1.0),
                sample(4, false, 1.0),
                sample(5, true, 0.02),
            ],
        );

        let actions = scaler.plan_group(&g);
        assert_eq!(
            actions,
            vec![ScalingAction::Destroy {
                kind: kind("web"),
                instance: InstanceId::new(5),
            }]
        );
    }

    #[test]
    fn test_reclamation_threshold_is_strict() {
        let mut scaler = Autoscaler::new(ControllerConfig::default());
        let g = group("web", (1..=4).map(|id| sample(id, true, 0.10)).collect());
        assert!(scaler.plan_group(&g).is_empty());
    }

    #[test]
    fn test_busy_low_utilization_not_reclaimed() {
        let mut scaler = Autoscaler::new(ControllerConfig::default());
        let g = group("web", (1..=4).map(|id| sample(id, false, 0.01)).collect());
        assert!(scaler.plan_group(&g).is_empty());
    }

    #[test]
    fn test_busy_sole_instance_grows() {
        let mut scaler = Autoscaler::new(config_with_floor(1));
        let g = group("web", vec![sample(1, false, 0.95)]);

        let actions = scaler.plan_group(&g);
        assert_eq!(actions, vec![ScalingAction::Provision { kind: kind("web") }]);
        assert_eq!(scaler.idle_hits(InstanceId::new(1)), None);
    }

    #[test]
    fn test_sole_survivor_grace_period() {
        let mut scaler = Autoscaler::new(config_with_floor(1));
        let g = group("batch", vec![sample(9, true, 0.0)]);

        for tick in 1..30 {
            assert!(scaler.plan_group(&g).is_empty(), "destroyed early at tick {}", tick);
            assert_eq!(scaler.idle_hits(InstanceId::new(9)), Some(tick));
        }

        let actions = scaler.plan_group(&g);
        assert_eq!(
            actions,
            vec![
                ScalingAction::Destroy {
                    kind: kind("batch"),
                    instance: InstanceId::new(9),
                },
                ScalingAction::Retire { kind: kind("batch") },
            ]
        );
        assert_eq!(scaler.idle_hits(InstanceId::new(9)), None);
    }

    #[test]
    fn test_busy_observation_resets_idle_hits() {
        let mut scaler = Autoscaler::new(config_with_floor(1));
        let idle = group("batch", vec![sample(3, true, 0.0)]);
        let busy = group("batch", vec![sample(3, false, 0.3)]);

        for _ in 0..20 {
            scaler.plan_group(&idle);
        }
        assert_eq!(scaler.idle_hits(InstanceId::new(3)), Some(20));

        assert!(scaler.plan_group(&busy).is_empty());
        assert_eq!(scaler.idle_hits(InstanceId::new(3)), None);

        for _ in 0..29 {
            assert!(scaler.plan_group(&idle).is_empty());
        }
        assert_eq!(count_destroys(&scaler.plan_group(&idle)), 1);
    }

    #[test]
    fn test_leaving_sole_status_clears_hits() {
        let mut scaler = Autoscaler::new(config_with_floor(1));
        scaler.plan_group(&group("batch", vec![sample(3, true, 0.5)]));
        assert_eq!(scaler.idle_hits(InstanceId::new(3)), Some(1));

        scaler.plan_group(&group("batch", vec![sample(3, true, 0.5), sample(4, false, 0.5)]));
        assert_eq!(scaler.idle_hits(InstanceId::new(3)), None);
    }

    #[test]
    fn test_plan_prunes_vanished_instances() {
        let mut scaler = Autoscaler::new(config_with_floor(1));
        scaler.plan(&[group("batch", vec![sample(3, true, 0.5)])]);
        assert_eq!(scaler.idle_hits(InstanceId::new(3)), Some(1));

        scaler.plan(&[group("batch", vec![sample(4, true, 0.5)])]);
        assert_eq!(scaler.idle_hits(InstanceId::new(3)), None);
        assert_eq!(scaler.idle_hits(InstanceId::new(4)), Some(1));
    }

    #[test]
    fn test_growth_uses_mean_utilization() {
        let mut scaler = Autoscaler::new(ControllerConfig::default());
        // Mean 0.75 -> x1.4 band, ceil(5 * 1.4) - 5 = 2.
        let g = group(
            "web",
            vec![
                sample(1, false, 0.75),
                sample(2, false, 0.75),
                sample(3, false, 0.75),
                sample(4, false, 0.75),
                sample(5, false, 0.75),
            ],
        );
        assert_eq!(count_provisions(&scaler.plan_group(&g)), 2);
    }

    #[test]
    fn test_kinds_are_isolated() {
        let mut scaler = Autoscaler::new(ControllerConfig::default());
        let groups = vec![
            group("web", vec![sample(1, false, 0.5)]),
            group("batch", (10..14).map(|id| sample(id, true, 0.0)).collect()),
        ];

        let actions = scaler.plan(&groups);
        assert_eq!(actions.len(), 5);
        assert_eq!(actions[0], ScalingAction::Provision { kind: kind("web") });
        assert!(actions[1..]
            .iter()
            .all(|a| matches!(a, ScalingAction::Destroy { kind: k, .. } if k.as_str() == "batch")));
    }
}
