use serde::{Deserialize, Serialize};
use std::fmt;

/// Run state of the active experiment.
///
/// ```text
///   Idle ──start──► Running ──pause / auto-stop──► Paused
///    ▲                 ▲                             │
///    │                 └────────────start────────────┘
///    └──────── reset / parameter edit (from any state)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SimulationState {
    #[default]
    Idle,
    Running,
    Paused,
}

impl SimulationState {
    pub const fn is_running(&self) -> bool {
        matches!(self, SimulationState::Running)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            SimulationState::Idle => "Idle",
            SimulationState::Running => "Running",
            SimulationState::Paused => "Paused",
        }
    }
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
