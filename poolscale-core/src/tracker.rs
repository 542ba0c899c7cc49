// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Idle-hit bookkeeping for sole-survivor instances.
//!
//! Counts consecutive ticks an instance was observed idle while being the
//! only member of its kind. An entry exists only while that streak holds.

use std::collections::HashMap;

use crate::types::InstanceId;

/// Consecutive idle observations per instance.
#[derive(Debug, Default, Clone)]
pub struct IdleHitTracker {
    hits: HashMap<InstanceId, u32>,
}

impl IdleHitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more idle tick and return the updated count.
    /// An absent entry starts at 1.
    pub fn record_idle(&mut self, id: InstanceId) -> u32 {
        let hits = self.hits.entry(id).or_insert(0);
        *hits += 1;
        *hits
    }

    /// Drop the streak for `id`, returning the count it had reached.
    pub fn clear(&mut self, id: InstanceId) -> Option<u32> {
        self.hits.remove(&id)
    }

    /// Current streak for `id`.
    pub fn hits(&self, id: InstanceId) -> Option<u32> {
        self.hits.get(&id).copied()
    }

    /// Keep only entries whose instance satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(InstanceId) -> bool) {
        self.hits.retain(|id, _| keep(*id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_starts_at_one() {
        let mut tracker = IdleHitTracker::new();
        let id = InstanceId::new(1);
        assert_eq!(tracker.hits(id), None);
        assert_eq!(tracker.record_idle(id), 1);
        assert_eq!(tracker.record_idle(id), 2);
        assert_eq!(tracker.hits(id), Some(2));
    }

    #[test]
    fn test_clear_resets_streak() {
        let mut tracker = IdleHitTracker::new();
        let id = InstanceId::new(1);
        tracker.record_idle(id);
        tracker.record_idle(id);
        assert_eq!(tracker.clear(id), Some(2));
        assert_eq!(tracker.clear(id), None);
        assert_eq!(tracker.record_idle(id), 1);
    }

    #[test]
    fn test_retain_prunes_missing_instances() {
        let mut tracker = IdleHitTracker::new();
        tracker.record_idle(InstanceId::new(1));
        tracker.record_idle(InstanceId::new(2));
        tracker.retain(|id| id == InstanceId::new(2));
        assert_eq!(tracker.hits(InstanceId::new(1)), None);
        assert_eq!(tracker.hits(InstanceId::new(2)), Some(1));
    }
}
