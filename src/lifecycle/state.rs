//! Node lifecycle state machine.
//!
//! # State Transitions
//! ```text
//! Uninitialized → Validating → RegistryConnecting → PublishingServices
//!     → SubscribingConsumers → StartingNetworkServer → Running
//! Running → ShuttingDown → Stopped
//! any boot state (Validating..StartingNetworkServer) → Failed
//! ```
//!
//! `Failed` and `Stopped` are terminal.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized = 0,
    Validating = 1,
    RegistryConnecting = 2,
    PublishingServices = 3,
    SubscribingConsumers = 4,
    StartingNetworkServer = 5,
    Running = 6,
    ShuttingDown = 7,
    Stopped = 8,
    Failed = 9,
}

impl From<u8> for LifecycleState {
    fn from(val: u8) -> Self {
        match val {
            0 => LifecycleState::Uninitialized,
            1 => LifecycleState::Validating,
            2 => LifecycleState::RegistryConnecting,
            3 => LifecycleState::PublishingServices,
            4 => LifecycleState::SubscribingConsumers,
            5 => LifecycleState::StartingNetworkServer,
            6 => LifecycleState::Running,
            7 => LifecycleState::ShuttingDown,
            8 => LifecycleState::Stopped,
            _ => LifecycleState::Failed,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Validating => "validating",
            LifecycleState::RegistryConnecting => "registry_connecting",
            LifecycleState::PublishingServices => "publishing_services",
            LifecycleState::SubscribingConsumers => "subscribing_consumers",
            LifecycleState::StartingNetworkServer => "starting_network_server",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl LifecycleState {
    /// True for the states between `Uninitialized` and `Running`.
    pub fn is_booting(self) -> bool {
        matches!(
            self,
            LifecycleState::Validating
                | LifecycleState::RegistryConnecting
                | LifecycleState::PublishingServices
                | LifecycleState::SubscribingConsumers
                | LifecycleState::StartingNetworkServer
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Stopped | LifecycleState::Failed)
    }

    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, next) {
            (Uninitialized, Validating)
            | (Validating, RegistryConnecting)
            | (RegistryConnecting, PublishingServices)
            | (PublishingServices, SubscribingConsumers)
            | (SubscribingConsumers, StartingNetworkServer)
            | (StartingNetworkServer, Running)
            | (Running, ShuttingDown)
            | (ShuttingDown, Stopped) => true,
            (from, Failed) => from.is_booting(),
            _ => false,
        }
    }
}

/// Atomically held lifecycle state.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::Uninitialized as u8))
    }

    pub fn load(&self) -> LifecycleState {
        LifecycleState::from(self.0.load(Ordering::Acquire))
    }

    /// Move from the current state to `next` if the edge is allowed.
    ///
    /// On refusal returns the state the cell was actually in.
    pub fn transition(&self, next: LifecycleState) -> Result<LifecycleState, LifecycleState> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let from = LifecycleState::from(current);
            if !from.can_transition_to(next) {
                return Err(from);
            }
            match self.0.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(from),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
