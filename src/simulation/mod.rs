//! Simulation control: run state, simulated time, configuration and the
//! controller that drives the active experiment frame by frame.

pub mod clock;
pub mod config;
pub mod controller;
pub mod recorder;
pub mod state;

pub use clock::{ManualClock, SimulationClock, SystemClock, WallClock};
pub use config::{ConfigLoadError, ConfigSaveError, LabConfig};
pub use controller::{FrameObserver, SimulationController, SubscriptionId};
pub use recorder::{DataRecorder, DataSample};
pub use state::SimulationState;
