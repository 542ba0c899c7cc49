// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Instance state machine with typed state transitions.
//!
//! Implements the simulated instance lifecycle: Booting → Running → Destroyed.
//! Invalid transitions result in StateTransitionError.

use serde::{Deserialize, Serialize};

use crate::error::StateTransitionError;
use crate::types::InstanceId;

/// Instance lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceState {
    /// Requested from the backend, not yet able to take work.
    Booting,

    /// Serving work; visible to the controller.
    Running,

    /// Released back to the infrastructure. Terminal.
    Destroyed,
}

impl InstanceState {
    /// Get the state name for error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Booting => "Booting",
            Self::Running => "Running",
            Self::Destroyed => "Destroyed",
        }
    }

    /// Check if transition to the target state is valid.
    pub fn can_transition_to(&self, target: InstanceState) -> bool {
        matches!(
            (self, target),
            (Self::Booting, Self::Running)
                | (Self::Booting, Self::Destroyed)
                | (Self::Running, Self::Destroyed)
        )
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// State machine for one instance's lifecycle.
/// Enforces valid state transitions and tracks tick-based timing.
#[derive(Debug, Clone)]
pub struct InstanceStateMachine {
    instance: InstanceId,
    current_state: InstanceState,
    entered_at: u64,
    transition_count: u64,
}

impl InstanceStateMachine {
    /// Create a new state machine for an instance requested at tick `now`.
    pub fn new(instance: InstanceId, now: u64) -> Self {
        Self {
            instance,
            current_state: InstanceState::Booting,
            entered_at: now,
            transition_count: 0,
        }
    }

    pub fn state(&self) -> InstanceState {
        self.current_state
    }

    /// Ticks spent in the current state as of `now`.
    pub fn ticks_in_state(&self, now: u64) -> u64 {
        now.saturating_sub(self.entered_at)
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Attempt to transition to a new state at tick `now`.
    pub fn transition_to(
        &mut self,
        target: InstanceState,
        now: u64,
    ) -> Result<(), StateTransitionError> {
        if !self.current_state.can_transition_to(target) {
            return Err(StateTransitionError::InvalidTransition {
                instance: self.instance,
                from: self.current_state.name(),
                to: target.name(),
            });
        }

        tracing::debug!(
            instance = %self.instance,
            from = self.current_state.name(),
            to = target.name(),
            tick = now,
            "State transition"
        );

        self.current_state = target;
        self.entered_at = now;
        self.transition_count += 1;

        Ok(())
    }

    pub fn is_running(&self) -> bool {
        matches!(self.current_state, InstanceState::Running)
    }
}
