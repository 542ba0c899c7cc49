// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Banded growth policy.
//!
//! Maps a group's mean trailing utilization to a growth multiplier:
//! additional = ceil(current * multiplier) - current
//!
//! Bands are checked in listed order and the first match wins. Both bounds
//! are inclusive, so a value falling between two bands (0.695 with the
//! default table) matches nothing and produces no growth.

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// One row of the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingBand {
    pub lower: f64,
    pub upper: f64,
    pub multiplier: f64,
}

impl ScalingBand {
    pub const fn new(lower: f64, upper: f64, multiplier: f64) -> Self {
        Self {
            lower,
            upper,
            multiplier,
        }
    }

    /// Check whether `utilization` falls within this band (inclusive).
    pub fn contains(&self, utilization: f64) -> bool {
        self.lower <= utilization && utilization <= self.upper
    }

    fn validate(&self, index: usize) -> Result<(), HardValidationError> {
        let reject = |reason: &str| HardValidationError::InvalidBand {
            index,
            lower: self.lower,
            upper: self.upper,
            multiplier: self.multiplier,
            reason: reason.to_string(),
        };

        if !self.lower.is_finite() || !self.upper.is_finite() || !self.multiplier.is_finite() {
            return Err(reject("values must be finite"));
        }
        if self.lower < 0.0 || self.upper > 1.0 {
            return Err(reject("bounds must lie within 0.0..=1.0"));
        }
        if self.lower > self.upper {
            return Err(reject("lower bound exceeds upper bound"));
        }
        if self.multiplier <= 1.0 {
            return Err(reject("multiplier must be greater than 1.0"));
        }
        Ok(())
    }
}

/// Default growth bands: +20%, +40%, +60% and +80%.
pub const DEFAULT_BANDS: [ScalingBand; 4] = [
    ScalingBand::new(0.60, 0.69, 1.20),
    ScalingBand::new(0.70, 0.79, 1.40),
    ScalingBand::new(0.80, 0.89, 1.60),
    ScalingBand::new(0.90, 1.00, 1.80),
];

/// Ordered, validated table of growth bands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScalingPolicy {
    bands: Vec<ScalingBand>,
}

impl ScalingPolicy {
    /// Build a policy, validating every band.
    ///
    /// An empty table is accepted and never grows a group.
    pub fn new(bands: Vec<ScalingBand>) -> Result<Self, HardValidationError> {
        for (index, band) in bands.iter().enumerate() {
            band.validate(index)?;
        }
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[ScalingBand] {
        &self.bands
    }

    /// First band containing `utilization`, if any.
    pub fn band_for(&self, utilization: f64) -> Option<&ScalingBand> {
        self.bands.iter().find(|band| band.contains(utilization))
    }

    /// Number of instances to add to a group of `current` members whose mean
    /// utilization is `utilization`. Never negative; zero when no band matches.
    pub fn additional_instances(&self, utilization: f64, current: usize) -> usize {
        if current == 0 {
            return 0;
        }

        match self.band_for(utilization) {
            Some(band) => {
                let target = (current as f64 * band.multiplier).ceil() as usize;
                target.saturating_sub(current)
            }
            None => 0,
        }
    }
}

impl Default for ScalingPolicy {
    fn default() -> Self {
        Self {
            bands: DEFAULT_BANDS.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_every_band_is_zero() {
        let policy = ScalingPolicy::default();
        for n in [1, 2, 4, 17, 100] {
            assert_eq!(policy.additional_instances(0.0, n), 0);
            assert_eq!(policy.additional_instances(0.3, n), 0);
            assert_eq!(policy.additional_instances(0.59, n), 0);
        }
    }

    #[test]
    fn test_in_band_growth_matches_formula() {
        let policy = ScalingPolicy::default();
        for band in DEFAULT_BANDS {
            for n in 1..=40usize {
                for u in [band.lower, (band.lower + band.upper) / 2.0, band.upper] {
                    let expected = (n as f64 * band.multiplier).ceil() as usize - n;
                    assert_eq!(policy.additional_instances(u, n), expected);
                }
            }
        }
    }

    #[test]
    fn test_single_instance_at_high_load() {
        let policy = ScalingPolicy::default();
        // ceil(1 * 1.8) - 1
        assert_eq!(policy.additional_instances(0.95, 1), 1);
        // ceil(4 * 1.8) - 4
        assert_eq!(policy.additional_instances(0.95, 4), 4);
        // ceil(4 * 1.2) - 4
        assert_eq!(policy.additional_instances(0.65, 4), 1);
    }

    #[test]
    fn test_gap_between_bands_is_zero() {
        let policy = ScalingPolicy::default();
        assert_eq!(policy.additional_instances(0.695, 10), 0);
        assert_eq!(policy.additional_instances(0.895, 10), 0);
        assert!(policy.band_for(0.70).is_some());
        assert!(policy.band_for(0.69).is_some());
    }

    #[test]
    fn test_first_match_wins() {
        let policy = ScalingPolicy::new(vec![
            ScalingBand::new(0.5, 1.0, 1.5),
            ScalingBand::new(0.9, 1.0, 3.0),
        ])
        .unwrap();
        assert_eq!(policy.additional_instances(0.95, 2), 1);
    }

    #[test]
    fn test_empty_group_never_grows() {
        let policy = ScalingPolicy::default();
        assert_eq!(policy.additional_instances(1.0, 0), 0);
    }

    #[test]
    fn test_empty_table_never_grows() {
        let policy = ScalingPolicy::new(Vec::new()).unwrap();
        assert_eq!(policy.additional_instances(1.0, 8), 0);
    }

    #[test]
    fn test_rejects_invalid_bands() {
        assert!(ScalingPolicy::new(vec![ScalingBand::new(0.8, 0.7, 1.5)]).is_err());
        assert!(ScalingPolicy::new(vec![ScalingBand::new(0.7, 0.8, 1.0)]).is_err());
        assert!(ScalingPolicy::new(vec![ScalingBand::new(0.7, 1.2, 1.5)]).is_err());
        assert!(ScalingPolicy::new(vec![ScalingBand::new(-0.1, 0.5, 1.5)]).is_err());
        assert!(ScalingPolicy::new(vec![ScalingBand::new(0.1, f64::NAN, 1.5)]).is_err());
    }
}
