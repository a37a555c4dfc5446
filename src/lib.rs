//! # Virtual Lab: Interactive Physics Experiment Engine
//!
//! Virtual Lab runs parameterized physics experiments (projectile motion, a
//! simple pendulum and a parallel resistor circuit) inside a 3D scene. Every
//! experiment follows the same lifecycle: build its objects once, update them
//! every animation frame from the simulated time, and restore them on reset.
//!
//! ## Architecture Overview
//!
//! The codebase is organized into three layers, leaves first:
//!
//! ### 1. Experiments ([`experiment`])
//!
//! Static descriptors plus the physics:
//! - [`experiment::ExperimentDescriptor`] - identity and ordered control parameters
//! - [`experiment::Experiment`] - `setup` / `simulate` / `reset` per experiment type
//! - [`experiment::ObjectBundle`] - typed scene handles of the active experiment
//! - [`experiment::ExperimentRegistry`] - validated descriptors by id
//!
//! **Key Design**: formulas are closed-form in time, so `simulate(t)` can be
//! evaluated for any `t` without integrating state.
//!
//! ### 2. Scene Host ([`scene`])
//!
//! Rendering-side ownership with no physics:
//! - [`scene::SceneGraph`] - nodes, transforms and the geometry/material pool
//! - [`scene::OrbitCamera`] - damped orbit camera
//! - [`scene::RenderBackend`] - seam to the rendering library and frame scheduler
//! - [`scene::SceneHost`] - mounts a surface, renders, tears everything down
//!
//! **Key Design**: a scene host lives exactly as long as one experiment
//! instance; switching experiments unmounts it and releases every resource.
//!
//! ### 3. Simulation Control ([`simulation`])
//!
//! - [`simulation::SimulationController`] - selection, parameters, run state, frame loop
//! - [`simulation::SimulationState`] - `Idle` / `Running` / `Paused`
//! - [`simulation::LabConfig`] - RON configuration with an embedded default
//! - [`simulation::DataRecorder`] - per-frame readouts, exported as CSV
//!
//! ## Data Flow
//!
//! ```text
//! frame token ──► SimulationController::animation_frame
//!                   │  t += wall_dt × speed        (Running only)
//!                   ▼
//!                 ObjectBundle::simulate(scene, params, t)
//!                   │  mutates transforms, trails, labels
//!                   ▼
//!                 SceneHost::render ──► RenderBackend
//!                   │
//!                   └─► request next frame, notify observers
//! ```
//!
//! Parameter edits go through [`simulation::SimulationController::set_parameter`],
//! which validates against the descriptor and always resets the run.
//!
//! ## Application Entry Point
//!
//! - [`app::run`] - headless demo: loads the config, runs one experiment on a
//!   fixed-step clock and prints the recorded data
//!
//! ## Dependencies
//!
//! - **Math**: `glam` (vectors, quaternions, matrices)
//! - **Serialization**: `serde` + `ron` (human-readable config files)
//! - **Errors**: `thiserror`
//! - **Logging**: `log` + `env_logger`

pub mod app;
pub mod error;
pub mod experiment;
pub mod scene;
pub mod simulation;

pub use error::{LabError, LabResult};
