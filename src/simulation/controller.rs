//! Simulation controller: experiment selection, parameters, run state and
//! the animation-frame loop.
//!
//! # Frame loop
//!
//! While an experiment is loaded exactly one frame request is outstanding.
//! Each delivered frame:
//!
//! 1. advances simulated time by `wall_dt × speed` (only while running)
//! 2. calls `simulate` on the object bundle; auto-stop pauses the run
//! 3. eases the camera and renders
//! 4. registers the next frame and notifies frame observers
//!
//! Frame tokens that do not match the current registration (for example a
//! callback queued before an experiment switch) are ignored.

use crate::error::{LabError, LabResult};
use crate::experiment::{
    ExperimentDescriptor, ExperimentRegistry, ObjectBundle, ParameterSet, Readout,
};
use crate::scene::backend::{FrameToken, HeadlessBackend, RenderBackend};
use crate::scene::graph::SceneGraph;
use crate::scene::host::{SceneHost, TeardownReport};
use crate::simulation::clock::{SimulationClock, SystemClock, WallClock};
use crate::simulation::config::LabConfig;
use crate::simulation::recorder::DataRecorder;
use crate::simulation::state::SimulationState;

/// Callback run after every frame with `(simulated_time, is_running)`.
pub type FrameObserver = Box<dyn FnMut(f64, bool)>;

/// Handle returned by [`SimulationController::on_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Everything that exists only while an experiment is loaded.
struct ActiveExperiment {
    descriptor: ExperimentDescriptor,
    params: ParameterSet,
    host: SceneHost,
    bundle: ObjectBundle,
}

pub struct SimulationController<B: RenderBackend, W: WallClock = SystemClock> {
    backend: B,
    wall_clock: W,
    registry: ExperimentRegistry,
    config: LabConfig,
    active: Option<ActiveExperiment>,
    state: SimulationState,
    clock: SimulationClock,
    speed: f64,
    /// Wall time of the previous simulation step; `None` when not running
    last_step_wall: Option<f64>,
    /// Wall time of the previous frame, for camera easing
    last_frame_wall: Option<f64>,
    observers: Vec<(SubscriptionId, FrameObserver)>,
    next_subscription: u64,
    recorder: DataRecorder,
}

impl<B: RenderBackend, W: WallClock> SimulationController<B, W> {
    pub fn new(backend: B, wall_clock: W, registry: ExperimentRegistry, config: LabConfig) -> Self {
        let speed = if config.speed_multiplier.is_finite() && config.speed_multiplier > 0.0 {
            config.speed_multiplier
        } else {
            log::warn!(
                "Ignoring invalid speed multiplier {} from config",
                config.speed_multiplier
            );
            1.0
        };

        Self {
            backend,
            wall_clock,
            registry,
            config,
            active: None,
            state: SimulationState::Idle,
            clock: SimulationClock::new(),
            speed,
            last_step_wall: None,
            last_frame_wall: None,
            observers: Vec::new(),
            next_subscription: 0,
            recorder: DataRecorder::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn registry(&self) -> &ExperimentRegistry {
        &self.registry
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Simulated seconds since the last reset.
    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn experiment(&self) -> Option<&ExperimentDescriptor> {
        self.active.as_ref().map(|a| &a.descriptor)
    }

    pub fn params(&self) -> Option<&ParameterSet> {
        self.active.as_ref().map(|a| &a.params)
    }

    pub fn scene(&self) -> Option<&SceneGraph> {
        self.active.as_ref().map(|a| a.host.scene())
    }

    pub fn bundle(&self) -> Option<&ObjectBundle> {
        self.active.as_ref().map(|a| &a.bundle)
    }

    pub fn host(&self) -> Option<&SceneHost> {
        self.active.as_ref().map(|a| &a.host)
    }

    pub fn recorder(&self) -> &DataRecorder {
        &self.recorder
    }

    /// Current observables of the loaded experiment.
    pub fn readouts(&self) -> Vec<Readout> {
        self.active
            .as_ref()
            .map(|a| a.bundle.readouts(&a.params))
            .unwrap_or_default()
    }

    /// Load an experiment: tear down the current one, mount a fresh host,
    /// build the objects with default parameters and reset.
    ///
    /// On failure nothing of the new experiment is left behind and another
    /// selection may be attempted.
    pub fn select_experiment(&mut self, id: &str) -> LabResult<()> {
        let descriptor = self
            .registry
            .get(id)
            .cloned()
            .ok_or_else(|| LabError::UnknownExperiment(id.to_string()))?;

        self.teardown();

        let mut host = SceneHost::mount(&mut self.backend, &self.config.host).map_err(|e| {
            log::error!("Experiment '{}' failed to load: {}", id, e);
            LabError::SetupFailed {
                id: id.to_string(),
                source: e.into(),
            }
        })?;

        let params = descriptor.default_params();
        let options = self.config.setup_options();
        let bundle = match descriptor.kind.setup(host.scene_mut(), &params, &options) {
            Ok(bundle) => bundle,
            Err(e) => {
                let report = host.unmount(&mut self.backend);
                log::error!(
                    "Experiment '{}' failed to load: {} ({} geometries released)",
                    id,
                    e,
                    report.geometries
                );
                return Err(LabError::SetupFailed {
                    id: id.to_string(),
                    source: e,
                });
            }
        };

        log::info!(
            "Loaded experiment '{}' ({} scene nodes)",
            descriptor.name,
            host.scene().node_count()
        );

        host.schedule_frame(&mut self.backend);
        self.recorder.begin(&descriptor.id);
        self.active = Some(ActiveExperiment {
            descriptor,
            params,
            host,
            bundle,
        });
        self.reset()
    }

    /// Unload the current experiment and release everything it held.
    pub fn close(&mut self) -> Option<TeardownReport> {
        self.teardown()
    }

    fn teardown(&mut self) -> Option<TeardownReport> {
        let active = self.active.take()?;
        self.state = SimulationState::Idle;
        self.clock.reset();
        self.last_step_wall = None;
        self.last_frame_wall = None;
        let report = active.host.unmount(&mut self.backend);
        log::info!(
            "Closed experiment '{}' ({} geometries, {} materials released)",
            active.descriptor.id,
            report.geometries,
            report.materials
        );
        Some(report)
    }

    /// Change a parameter. Valid edits always reset the simulation.
    pub fn set_parameter(&mut self, id: &str, value: f64) -> LabResult<()> {
        let active = self.active.as_mut().ok_or(LabError::NoExperiment)?;
        let spec = active
            .descriptor
            .param(id)
            .ok_or_else(|| LabError::UnknownParameter {
                experiment: active.descriptor.id.clone(),
                param: id.to_string(),
            })?;
        if !spec.contains(value) {
            return Err(LabError::ParameterOutOfRange {
                param: id.to_string(),
                value,
                min: spec.min,
                max: spec.max,
            });
        }

        active.params.set(id, value);
        log::debug!("Parameter '{}' = {}", id, value);
        self.reset()
    }

    /// Step a parameter by `delta`, clamped to its bounds. Returns the new value.
    pub fn nudge_parameter(&mut self, id: &str, delta: f64) -> LabResult<f64> {
        let active = self.active.as_ref().ok_or(LabError::NoExperiment)?;
        let unknown = || LabError::UnknownParameter {
            experiment: active.descriptor.id.clone(),
            param: id.to_string(),
        };
        let spec = active.descriptor.param(id).ok_or_else(unknown)?;
        let current = active.params.get(id).ok_or_else(unknown)?;
        let value = spec.clamp(current + delta);
        self.set_parameter(id, value)?;
        Ok(value)
    }

    /// Begin or resume stepping. Resuming keeps the simulated time.
    pub fn start(&mut self) -> LabResult<()> {
        if self.active.is_none() {
            return Err(LabError::NoExperiment);
        }
        if self.state.is_running() {
            return Ok(());
        }
        self.last_step_wall = Some(self.wall_clock.now());
        log::info!("Simulation {} -> Running at t = {:.3}s", self.state, self.clock.time());
        self.state = SimulationState::Running;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state.is_running() {
            self.state = SimulationState::Paused;
            self.last_step_wall = None;
            log::info!("Simulation paused at t = {:.3}s", self.clock.time());
        }
    }

    /// Start/stop button semantics.
    pub fn toggle(&mut self) -> LabResult<()> {
        if self.state.is_running() {
            self.pause();
            Ok(())
        } else {
            self.start()
        }
    }

    /// Back to Idle at t = 0, objects restored for the current parameters.
    pub fn reset(&mut self) -> LabResult<()> {
        let active = self.active.as_mut().ok_or(LabError::NoExperiment)?;
        self.state = SimulationState::Idle;
        self.clock.reset();
        self.last_step_wall = None;
        self.recorder.clear();

        let scene = active.host.scene_mut();
        active.bundle.reset(scene, &active.params)?;
        active.bundle.simulate(scene, &active.params, 0.0, false, true)?;
        active.host.render(&mut self.backend);
        log::debug!("Reset '{}'", active.descriptor.id);
        Ok(())
    }

    /// Simulated seconds per wall-clock second.
    pub fn set_speed(&mut self, multiplier: f64) -> LabResult<()> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(LabError::InvalidSpeed(multiplier));
        }
        self.speed = multiplier;
        log::debug!("Simulation speed x{}", multiplier);
        Ok(())
    }

    pub fn on_frame(&mut self, observer: impl FnMut(f64, bool) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn remove_frame_observer(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    /// Handle a frame callback from the scheduler.
    pub fn animation_frame(&mut self, token: FrameToken) {
        let Some(active) = self.active.as_mut() else {
            log::warn!("Ignoring frame {} with no experiment loaded", token.0);
            return;
        };
        if !active.host.accept_frame(token) {
            log::warn!("Ignoring stale frame {}", token.0);
            return;
        }

        let now = self.wall_clock.now();

        if self.state.is_running() {
            let dt = self.last_step_wall.map_or(0.0, |last| now - last);
            self.last_step_wall = Some(now);
            let t = self.clock.advance(dt * self.speed);

            let scene = active.host.scene_mut();
            match active.bundle.simulate(scene, &active.params, t, true, false) {
                Ok(false) => {}
                Ok(true) => {
                    self.state = SimulationState::Paused;
                    self.last_step_wall = None;
                    log::info!("'{}' finished at t = {:.3}s", active.descriptor.id, t);
                }
                Err(e) => {
                    self.state = SimulationState::Paused;
                    self.last_step_wall = None;
                    log::error!("Simulation step failed, pausing: {}", e);
                }
            }
            log::trace!("Frame t = {:.4}s (dt {:.4}s)", t, dt);

            if self.config.record_data {
                self.recorder.record(t, &active.bundle.readouts(&active.params));
            }
        }

        let frame_dt = self.last_frame_wall.map_or(0.0, |last| now - last);
        self.last_frame_wall = Some(now);
        active.host.camera_mut().update(frame_dt as f32);
        active.host.render(&mut self.backend);
        active.host.schedule_frame(&mut self.backend);

        let t = self.clock.time();
        let running = self.state.is_running();
        for (_, observer) in &mut self.observers {
            observer(t, running);
        }
    }

    /// Container resized.
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(active) = self.active.as_mut() {
            active.host.resize(&mut self.backend, width, height);
        }
    }

    /// Pointer drag over the view.
    pub fn orbit_camera(&mut self, dx: f32, dy: f32) {
        if let Some(active) = self.active.as_mut() {
            active.host.camera_mut().handle_drag(dx, dy);
        }
    }

    pub fn zoom_camera(&mut self, delta: f32) {
        if let Some(active) = self.active.as_mut() {
            active.host.camera_mut().handle_scroll(delta);
        }
    }
}

impl<W: WallClock> SimulationController<HeadlessBackend, W> {
    /// Fire the oldest scheduled frame. Returns false when none was pending.
    pub fn pump_frame(&mut self) -> bool {
        match self.backend.next_due_frame() {
            Some(token) => {
                self.animation_frame(token);
                true
            }
            None => false,
        }
    }
}

impl<B: RenderBackend, W: WallClock> Drop for SimulationController<B, W> {
    fn drop(&mut self) {
        self.teardown();
    }
}
