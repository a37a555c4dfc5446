//! Experiment descriptors and the per-experiment lifecycle.
//!
//! Each experiment is a static record ([`ExperimentDescriptor`]) plus an
//! [`Experiment`] implementation that builds, steps and resets its objects in
//! a scene graph.
//!
//! ```text
//!   ExperimentDescriptor { id, name, kind, control_params }
//!                               │
//!                               ▼
//!          ┌─────────── ExperimentKind::setup ───────────┐
//!          ▼                     ▼                       ▼
//!   ┌─────────────┐       ┌─────────────┐        ┌─────────────┐
//!   │ Projectile  │       │  Pendulum   │        │   Circuit   │
//!   └─────────────┘       └─────────────┘        └─────────────┘
//!          │                     │                       │
//!          └───────────► ObjectBundle ◄──────────────────┘
//!                  simulate(t) / reset() / readouts()
//! ```
//!
//! # Lifecycle contract
//!
//! - `setup` adds every object to the scene and returns the typed handles.
//! - `simulate(.., running = false, ..)` does nothing and returns `false`.
//! - `simulate` accepts any `t >= 0`, including a jump back to 0 after reset.
//! - `simulate` returns `true` when the experiment reached a terminal state.
//! - `reset` restores the objects for the current parameters and may be
//!   called any number of times in a row.

pub mod circuit;
pub mod params;
pub mod pendulum;
pub mod projectile;
pub mod registry;
pub mod trail;

pub use circuit::{Circuit, CircuitObjects};
pub use params::{ParameterSet, ParameterSpec};
pub use pendulum::{Pendulum, PendulumObjects};
pub use projectile::{Projectile, ProjectileObjects};
pub use registry::ExperimentRegistry;
pub use trail::TrailBuffer;

use crate::error::{DescriptorError, SceneError};
use crate::scene::graph::{Light, NodeId, SceneGraph, SceneId, Transform};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The built-in experiment implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperimentKind {
    Projectile,
    Pendulum,
    Circuit,
}

impl ExperimentKind {
    pub const fn all() -> &'static [ExperimentKind] {
        &[
            ExperimentKind::Projectile,
            ExperimentKind::Pendulum,
            ExperimentKind::Circuit,
        ]
    }

    /// Registry id of the built-in descriptor.
    pub const fn id(&self) -> &'static str {
        match self {
            ExperimentKind::Projectile => "projectile",
            ExperimentKind::Pendulum => "pendulum",
            ExperimentKind::Circuit => "circuit",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.id() == id)
    }

    /// Parameters the implementation reads; a descriptor must declare them all.
    pub const fn required_params(&self) -> &'static [&'static str] {
        match self {
            ExperimentKind::Projectile => &["angle", "velocity", "gravity", "mass"],
            ExperimentKind::Pendulum => &["length", "mass", "angle", "gravity"],
            ExperimentKind::Circuit => &["voltage", "resistance1", "resistance2", "resistance3"],
        }
    }

    /// Parameters the implementation divides by, flagged or not.
    pub const fn divisor_params(&self) -> &'static [&'static str] {
        match self {
            ExperimentKind::Projectile => &["gravity", "mass"],
            ExperimentKind::Pendulum => &["length", "gravity", "mass"],
            ExperimentKind::Circuit => &["resistance1", "resistance2", "resistance3"],
        }
    }

    pub fn descriptor(&self) -> ExperimentDescriptor {
        match self {
            ExperimentKind::Projectile => Projectile.descriptor(),
            ExperimentKind::Pendulum => Pendulum.descriptor(),
            ExperimentKind::Circuit => Circuit.descriptor(),
        }
    }

    /// Build this experiment's objects in `scene`.
    pub fn setup(
        &self,
        scene: &mut SceneGraph,
        params: &ParameterSet,
        options: &SetupOptions,
    ) -> Result<ObjectBundle, SceneError> {
        Ok(match self {
            ExperimentKind::Projectile => {
                ObjectBundle::Projectile(Projectile.setup(scene, params, options)?)
            }
            ExperimentKind::Pendulum => {
                ObjectBundle::Pendulum(Pendulum.setup(scene, params, options)?)
            }
            ExperimentKind::Circuit => ObjectBundle::Circuit(Circuit.setup(scene, params, options)?),
        })
    }
}

/// Static description of one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: ExperimentKind,
    pub control_params: Vec<ParameterSpec>,
}

impl ExperimentDescriptor {
    pub fn param(&self, id: &str) -> Option<&ParameterSpec> {
        self.control_params.iter().find(|p| p.id == id)
    }

    pub fn default_params(&self) -> ParameterSet {
        ParameterSet::from_specs(&self.control_params)
    }

    /// Check bounds, defaults, id uniqueness, divisor floors, and that every
    /// parameter the implementation reads is declared.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let mut seen = HashSet::new();
        for spec in &self.control_params {
            if !seen.insert(spec.id.as_str()) {
                return Err(DescriptorError::DuplicateParameter {
                    experiment: self.id.clone(),
                    param: spec.id.clone(),
                });
            }
            if spec.min.is_nan() || spec.max.is_nan() || spec.min > spec.max {
                return Err(DescriptorError::InvertedBounds {
                    experiment: self.id.clone(),
                    param: spec.id.clone(),
                    min: spec.min,
                    max: spec.max,
                });
            }
            if !spec.contains(spec.default) {
                return Err(DescriptorError::DefaultOutOfBounds {
                    experiment: self.id.clone(),
                    param: spec.id.clone(),
                    default: spec.default,
                    min: spec.min,
                    max: spec.max,
                });
            }
            let divides = spec.divisor || self.kind.divisor_params().contains(&spec.id.as_str());
            if divides && spec.min < 1.0 {
                return Err(DescriptorError::DivisorBelowOne {
                    experiment: self.id.clone(),
                    param: spec.id.clone(),
                    min: spec.min,
                });
            }
        }
        if let Some(missing) = self
            .kind
            .required_params()
            .iter()
            .find(|id| !seen.contains(**id))
        {
            return Err(DescriptorError::MissingParameter {
                experiment: self.id.clone(),
                param: missing.to_string(),
            });
        }
        Ok(())
    }
}

/// Options that apply to every experiment's setup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetupOptions {
    /// Maximum trail length; `None` keeps every point
    pub trail_capacity: Option<usize>,
}

/// A named observable of a running experiment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Readout {
    pub name: &'static str,
    pub value: f64,
    pub unit: &'static str,
}

impl Readout {
    pub const fn new(name: &'static str, value: f64, unit: &'static str) -> Self {
        Self { name, value, unit }
    }
}

/// Lifecycle of one experiment type.
pub trait Experiment {
    /// Typed handles to everything `setup` created.
    type Objects;

    fn descriptor(&self) -> ExperimentDescriptor;

    fn setup(
        &self,
        scene: &mut SceneGraph,
        params: &ParameterSet,
        options: &SetupOptions,
    ) -> Result<Self::Objects, SceneError>;

    /// Advance the objects to simulated time `time`. Returns `true` on auto-stop.
    fn simulate(
        &self,
        objects: &mut Self::Objects,
        scene: &mut SceneGraph,
        params: &ParameterSet,
        time: f64,
        running: bool,
        reset_trail: bool,
    ) -> Result<bool, SceneError>;

    fn reset(
        &self,
        objects: &mut Self::Objects,
        scene: &mut SceneGraph,
        params: &ParameterSet,
    ) -> Result<(), SceneError>;

    fn readouts(&self, objects: &Self::Objects, params: &ParameterSet) -> Vec<Readout>;
}

/// Objects of the active experiment, tagged by kind.
#[derive(Debug)]
pub enum ObjectBundle {
    Projectile(ProjectileObjects),
    Pendulum(PendulumObjects),
    Circuit(CircuitObjects),
}

impl ObjectBundle {
    pub fn kind(&self) -> ExperimentKind {
        match self {
            ObjectBundle::Projectile(_) => ExperimentKind::Projectile,
            ObjectBundle::Pendulum(_) => ExperimentKind::Pendulum,
            ObjectBundle::Circuit(_) => ExperimentKind::Circuit,
        }
    }

    /// The scene these objects live in.
    pub fn scene_id(&self) -> SceneId {
        match self {
            ObjectBundle::Projectile(o) => o.scene,
            ObjectBundle::Pendulum(o) => o.scene,
            ObjectBundle::Circuit(o) => o.scene,
        }
    }

    fn check_scene(&self, scene: &SceneGraph) -> Result<(), SceneError> {
        if self.scene_id() == scene.id() {
            Ok(())
        } else {
            Err(SceneError::ForeignScene)
        }
    }

    pub fn simulate(
        &mut self,
        scene: &mut SceneGraph,
        params: &ParameterSet,
        time: f64,
        running: bool,
        reset_trail: bool,
    ) -> Result<bool, SceneError> {
        self.check_scene(scene)?;
        match self {
            ObjectBundle::Projectile(o) => {
                Projectile.simulate(o, scene, params, time, running, reset_trail)
            }
            ObjectBundle::Pendulum(o) => {
                Pendulum.simulate(o, scene, params, time, running, reset_trail)
            }
            ObjectBundle::Circuit(o) => Circuit.simulate(o, scene, params, time, running, reset_trail),
        }
    }

    pub fn reset(&mut self, scene: &mut SceneGraph, params: &ParameterSet) -> Result<(), SceneError> {
        self.check_scene(scene)?;
        match self {
            ObjectBundle::Projectile(o) => Projectile.reset(o, scene, params),
            ObjectBundle::Pendulum(o) => Pendulum.reset(o, scene, params),
            ObjectBundle::Circuit(o) => Circuit.reset(o, scene, params),
        }
    }

    pub fn readouts(&self, params: &ParameterSet) -> Vec<Readout> {
        match self {
            ObjectBundle::Projectile(o) => Projectile.readouts(o, params),
            ObjectBundle::Pendulum(o) => Pendulum.readouts(o, params),
            ObjectBundle::Circuit(o) => Circuit.readouts(o, params),
        }
    }
}

/// Radius of a unit-density sphere of mass `mass`.
pub fn radius_for_mass(mass: f64) -> f64 {
    (3.0 * mass / (4.0 * std::f64::consts::PI)).cbrt()
}

/// Ambient fill plus one shadow-casting directional light.
pub(crate) fn add_lights(
    scene: &mut SceneGraph,
    ambient_intensity: f32,
    sun_position: Vec3,
) -> Result<[NodeId; 2], SceneError> {
    let ambient = scene.add_light(
        "ambient",
        Light::Ambient {
            color: 0xffffff,
            intensity: ambient_intensity,
        },
        Transform::default(),
    )?;
    let sun = scene.add_light(
        "sun",
        Light::Directional {
            color: 0xffffff,
            intensity: 0.8,
            cast_shadow: true,
        },
        Transform::at(sun_position),
    )?;
    Ok([ambient, sun])
}

/// Point the trail line at the buffer, creating the line on first use.
/// Nothing is drawn until the buffer holds two points.
pub(crate) fn sync_trail_line(
    scene: &mut SceneGraph,
    line: &mut Option<NodeId>,
    trail: &mut TrailBuffer,
    name: &str,
    color: u32,
) -> Result<(), SceneError> {
    if trail.len() < 2 {
        return Ok(());
    }
    match *line {
        Some(id) => scene.set_polyline(id, trail.as_slice()),
        None => {
            let points = trail.as_slice().to_vec();
            *line = Some(scene.add_line(
                None,
                name,
                points,
                crate::scene::resources::Material::line(color),
            )?);
            Ok(())
        }
    }
}

/// Clear the buffer and drop the line node built from it.
pub(crate) fn clear_trail(
    scene: &mut SceneGraph,
    line: &mut Option<NodeId>,
    trail: &mut TrailBuffer,
) -> Result<(), SceneError> {
    trail.clear();
    if let Some(id) = line.take() {
        scene.remove(id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn builtin_descriptors_validate() {
        for kind in ExperimentKind::all() {
            let descriptor = kind.descriptor();
            assert_eq!(descriptor.id, kind.id());
            assert_eq!(descriptor.kind, *kind);
            descriptor.validate().unwrap();
        }
    }

    #[test]
    fn kind_round_trips_through_id() {
        for kind in ExperimentKind::all() {
            assert_eq!(ExperimentKind::from_id(kind.id()), Some(*kind));
        }
        assert_eq!(ExperimentKind::from_id("optics"), None);
    }

    #[test]
    fn validate_rejects_bad_specs() {
        let mut d = ExperimentKind::Pendulum.descriptor();
        d.control_params[0].default = 50.0;
        assert!(matches!(
            d.validate(),
            Err(DescriptorError::DefaultOutOfBounds { .. })
        ));

        let mut d = ExperimentKind::Pendulum.descriptor();
        d.control_params[0].min = 0.0;
        assert!(matches!(d.validate(), Err(DescriptorError::DivisorBelowOne { .. })));

        let mut d = ExperimentKind::Pendulum.descriptor();
        d.control_params[1].min = 11.0;
        assert!(matches!(d.validate(), Err(DescriptorError::InvertedBounds { .. })));

        let mut d = ExperimentKind::Circuit.descriptor();
        let dup = d.control_params[1].clone();
        d.control_params.push(dup);
        assert!(matches!(
            d.validate(),
            Err(DescriptorError::DuplicateParameter { .. })
        ));

        let mut d = ExperimentKind::Projectile.descriptor();
        d.control_params.retain(|p| p.id != "mass");
        assert_eq!(
            d.validate(),
            Err(DescriptorError::MissingParameter {
                experiment: "projectile".into(),
                param: "mass".into(),
            })
        );
    }

    #[test]
    fn bundle_refuses_foreign_scene() {
        let mut home = SceneGraph::new();
        let mut other = SceneGraph::new();
        let kind = ExperimentKind::Circuit;
        let params = kind.descriptor().default_params();
        let mut bundle = kind.setup(&mut home, &params, &SetupOptions::default()).unwrap();

        assert_eq!(bundle.scene_id(), home.id());
        assert_eq!(
            bundle.simulate(&mut other, &params, 0.0, true, false),
            Err(SceneError::ForeignScene)
        );
        assert_eq!(bundle.reset(&mut other, &params), Err(SceneError::ForeignScene));
        assert!(bundle.simulate(&mut home, &params, 0.0, true, false).is_ok());
    }

    #[test]
    fn not_running_is_a_no_op_for_every_kind() {
        for kind in ExperimentKind::all() {
            let mut scene = SceneGraph::new();
            let params = kind.descriptor().default_params();
            let mut bundle = kind.setup(&mut scene, &params, &SetupOptions::default()).unwrap();
            let before = scene.node_count();
            assert_eq!(bundle.simulate(&mut scene, &params, 1.0, false, false), Ok(false));
            assert_eq!(scene.node_count(), before);
        }
    }

    #[test]
    fn radius_matches_unit_density_sphere() {
        let r = radius_for_mass(5.0);
        assert_relative_eq!(4.0 / 3.0 * std::f64::consts::PI * r.powi(3), 5.0, epsilon = 1e-9);
    }
}
