//! Simple pendulum hanging from a ceiling beam.
//!
//! Uses the small-angle closed form `θ(t) = θ₀·cos(√(g/L)·t)` for every
//! starting angle, so the period does not grow with amplitude.

use crate::error::SceneError;
use crate::experiment::params::{ParameterSet, ParameterSpec};
use crate::experiment::trail::TrailBuffer;
use crate::experiment::{
    add_lights, clear_trail, radius_for_mass, sync_trail_line, Experiment, ExperimentDescriptor,
    ExperimentKind, Readout, SetupOptions,
};
use crate::scene::graph::{NodeId, SceneGraph, SceneId, Transform};
use crate::scene::resources::{Geometry, Material};
use glam::{DVec3, Vec3};
use std::f64::consts::TAU;

pub const PIVOT_HEIGHT: f64 = 15.0;
/// Trail points are sampled during the first half of every 0.1 s window.
const TRAIL_SAMPLE_PERIOD: f64 = 0.1;
const TRAIL_SAMPLE_WINDOW: f64 = 0.05;
const TRAIL_COLOR: u32 = 0x0099ff;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendulumParams {
    pub length: f64,
    pub mass: f64,
    pub angle_degrees: f64,
    pub gravity: f64,
}

impl Default for PendulumParams {
    fn default() -> Self {
        Self {
            length: 10.0,
            mass: 5.0,
            angle_degrees: 30.0,
            gravity: 9.8,
        }
    }
}

impl PendulumParams {
    pub fn from_set(params: &ParameterSet) -> Self {
        let d = Self::default();
        Self {
            length: params.get_or("length", d.length),
            mass: params.get_or("mass", d.mass),
            angle_degrees: params.get_or("angle", d.angle_degrees),
            gravity: params.get_or("gravity", d.gravity),
        }
    }

    pub fn initial_angle(&self) -> f64 {
        self.angle_degrees.to_radians()
    }

    pub fn angular_frequency(&self) -> f64 {
        (self.gravity / self.length).sqrt()
    }

    pub fn period(&self) -> f64 {
        TAU * (self.length / self.gravity).sqrt()
    }

    /// Swing angle in radians at time `t` for a release from `initial_angle`.
    pub fn angle_at(&self, initial_angle: f64, t: f64) -> f64 {
        initial_angle * (self.angular_frequency() * t).cos()
    }

    /// World position of the bob for swing angle `angle`.
    pub fn bob_position(&self, angle: f64) -> DVec3 {
        DVec3::new(
            self.length * angle.sin(),
            PIVOT_HEIGHT - self.length * angle.cos(),
            0.0,
        )
    }
}

#[derive(Debug)]
pub struct PendulumObjects {
    pub scene: SceneId,
    pub ceiling: NodeId,
    pub pivot: NodeId,
    pub string: NodeId,
    pub bob: NodeId,
    pub trail_line: Option<NodeId>,
    pub trail: TrailBuffer,
    /// Release angle in radians, refreshed on reset
    pub initial_angle: f64,
    /// String length the cylinder geometry was built with
    pub built_length: f64,
    pub built_radius: f64,
    pub angle: f64,
}

pub struct Pendulum;

impl Experiment for Pendulum {
    type Objects = PendulumObjects;

    fn descriptor(&self) -> ExperimentDescriptor {
        ExperimentDescriptor {
            id: ExperimentKind::Pendulum.id().to_string(),
            name: "Pendulum Motion".to_string(),
            description: "Study the movement of a simple pendulum".to_string(),
            kind: ExperimentKind::Pendulum,
            control_params: vec![
                ParameterSpec::new("length", "String Length", 1.0, 20.0, 10.0, "m").divisor(),
                ParameterSpec::new("mass", "Mass", 1.0, 10.0, 5.0, "kg").divisor(),
                ParameterSpec::new("angle", "Initial Angle", 0.0, 90.0, 30.0, "°"),
                ParameterSpec::new("gravity", "Gravity", 1.0, 20.0, 9.8, "m/s²").divisor(),
            ],
        }
    }

    fn setup(
        &self,
        scene: &mut SceneGraph,
        params: &ParameterSet,
        options: &SetupOptions,
    ) -> Result<PendulumObjects, SceneError> {
        let p = PendulumParams::from_set(params);
        let length = p.length as f32;
        let radius = radius_for_mass(p.mass);
        let initial_angle = p.initial_angle();

        let ceiling = scene.add_mesh(
            None,
            "ceiling",
            Geometry::Box {
                width: 20.0,
                height: 0.5,
                depth: 5.0,
            },
            Material::standard(0x8b4513),
            Transform::at(Vec3::new(0.0, PIVOT_HEIGHT as f32, 0.0)),
        )?;
        let pivot = scene.add_group(
            None,
            "pivot",
            Transform::at(Vec3::new(0.0, PIVOT_HEIGHT as f32, 0.0))
                .with_rotation(Vec3::new(0.0, 0.0, initial_angle as f32)),
        )?;
        // Cylinders are centred on their origin; hang this one below the pivot
        let string = scene.add_mesh(
            Some(pivot),
            "string",
            Geometry::Cylinder {
                radius: 0.05,
                height: length,
                segments: 8,
            },
            Material::standard(0xdddddd),
            Transform::at(Vec3::new(0.0, -length / 2.0, 0.0)),
        )?;
        let bob = scene.add_mesh(
            Some(pivot),
            "bob",
            Geometry::Sphere {
                radius: radius as f32,
                segments: 32,
            },
            Material::standard(0x0066cc)
                .with_roughness(0.3)
                .with_metalness(0.6),
            Transform::at(Vec3::new(0.0, -length, 0.0)),
        )?;
        add_lights(scene, 0.6, Vec3::new(20.0, 30.0, 20.0))?;

        log::debug!(
            "Pendulum set up: L = {}, period {:.3}s",
            p.length,
            p.period()
        );

        Ok(PendulumObjects {
            scene: scene.id(),
            ceiling,
            pivot,
            string,
            bob,
            trail_line: None,
            trail: TrailBuffer::new(options.trail_capacity),
            initial_angle,
            built_length: p.length,
            built_radius: radius,
            angle: initial_angle,
        })
    }

    fn simulate(
        &self,
        objects: &mut PendulumObjects,
        scene: &mut SceneGraph,
        params: &ParameterSet,
        time: f64,
        running: bool,
        reset_trail: bool,
    ) -> Result<bool, SceneError> {
        if !running {
            return Ok(false);
        }

        let p = PendulumParams::from_set(params);
        let angle = p.angle_at(objects.initial_angle, time);
        objects.angle = angle;
        scene.transform_mut(objects.pivot)?.rotation.z = angle as f32;

        if time.rem_euclid(TRAIL_SAMPLE_PERIOD) < TRAIL_SAMPLE_WINDOW {
            objects.trail.push(p.bob_position(angle).as_vec3());
        }
        if reset_trail {
            clear_trail(scene, &mut objects.trail_line, &mut objects.trail)?;
        }
        sync_trail_line(
            scene,
            &mut objects.trail_line,
            &mut objects.trail,
            "pendulum-trail",
            TRAIL_COLOR,
        )?;
        Ok(false)
    }

    fn reset(
        &self,
        objects: &mut PendulumObjects,
        scene: &mut SceneGraph,
        params: &ParameterSet,
    ) -> Result<(), SceneError> {
        let p = PendulumParams::from_set(params);
        let length = p.length as f32;
        objects.initial_angle = p.initial_angle();
        objects.angle = objects.initial_angle;

        scene.transform_mut(objects.pivot)?.rotation.z = objects.initial_angle as f32;

        let string = scene.transform_mut(objects.string)?;
        string.scale.y = (p.length / objects.built_length) as f32;
        string.position.y = -length / 2.0;

        let bob = scene.transform_mut(objects.bob)?;
        bob.position.y = -length;
        bob.scale = Vec3::splat((radius_for_mass(p.mass) / objects.built_radius) as f32);

        clear_trail(scene, &mut objects.trail_line, &mut objects.trail)
    }

    fn readouts(&self, objects: &PendulumObjects, params: &ParameterSet) -> Vec<Readout> {
        let p = PendulumParams::from_set(params);
        let bob = p.bob_position(objects.angle);
        vec![
            Readout::new("angle", objects.angle.to_degrees(), "°"),
            Readout::new("bob_x", bob.x, "m"),
            Readout::new("bob_y", bob.y, "m"),
            Readout::new("period", p.period(), "s"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn setup(params: &ParameterSet) -> (SceneGraph, PendulumObjects) {
        let mut scene = SceneGraph::new();
        let objects = Pendulum
            .setup(&mut scene, params, &SetupOptions::default())
            .unwrap();
        (scene, objects)
    }

    #[test]
    fn default_period() {
        assert_relative_eq!(PendulumParams::default().period(), 6.347, epsilon = 1e-3);
    }

    #[test]
    fn bob_world_position_follows_pivot_rotation() {
        let params = Pendulum.descriptor().default_params();
        let (mut scene, mut objects) = setup(&params);
        let p = PendulumParams::default();

        for t in [0.0, 0.4, 1.3, 2.9] {
            Pendulum
                .simulate(&mut objects, &mut scene, &params, t, true, false)
                .unwrap();
            let expected = p.bob_position(p.angle_at(p.initial_angle(), t)).as_vec3();
            let actual = scene.world_position(objects.bob).unwrap();
            assert_relative_eq!(actual.x, expected.x, epsilon = 1e-4);
            assert_relative_eq!(actual.y, expected.y, epsilon = 1e-4);
        }
    }

    #[test]
    fn trail_samples_only_in_window() {
        let params = Pendulum.descriptor().default_params();
        let (mut scene, mut objects) = setup(&params);

        Pendulum
            .simulate(&mut objects, &mut scene, &params, 0.02, true, false)
            .unwrap();
        Pendulum
            .simulate(&mut objects, &mut scene, &params, 0.07, true, false)
            .unwrap();
        assert_eq!(objects.trail.len(), 1);
        assert!(objects.trail_line.is_none());

        Pendulum
            .simulate(&mut objects, &mut scene, &params, 0.13, true, false)
            .unwrap();
        assert_eq!(objects.trail.len(), 2);
        assert!(objects.trail_line.is_some());
    }

    #[test]
    fn never_auto_stops() {
        let params = Pendulum.descriptor().default_params();
        let (mut scene, mut objects) = setup(&params);
        for i in 0..600 {
            let stop = Pendulum
                .simulate(&mut objects, &mut scene, &params, i as f64 / 60.0, true, false)
                .unwrap();
            assert!(!stop);
        }
    }

    #[test]
    fn reset_rescales_string_and_clears_trail() {
        let params = Pendulum.descriptor().default_params();
        let (mut scene, mut objects) = setup(&params);
        for i in 0..60 {
            Pendulum
                .simulate(&mut objects, &mut scene, &params, i as f64 / 60.0, true, false)
                .unwrap();
        }
        let trail_line = objects.trail_line.unwrap();

        let mut longer = params.clone();
        longer.set("length", 15.0);
        longer.set("angle", 45.0);
        Pendulum.reset(&mut objects, &mut scene, &longer).unwrap();
        let nodes = scene.node_count();
        Pendulum.reset(&mut objects, &mut scene, &longer).unwrap();
        assert_eq!(scene.node_count(), nodes);

        assert!(!scene.contains(trail_line));
        assert!(objects.trail.is_empty());
        assert_relative_eq!(objects.initial_angle, 45f64.to_radians());

        let string = scene.node(objects.string).unwrap().transform;
        assert_relative_eq!(string.scale.y, 1.5);
        assert_relative_eq!(string.position.y, -7.5);
        let bob = scene.world_position(objects.bob).unwrap();
        let expected = PendulumParams::from_set(&longer).bob_position(45f64.to_radians());
        assert_relative_eq!(bob.x, expected.x as f32, epsilon = 1e-4);
        assert_relative_eq!(bob.y, expected.y as f32, epsilon = 1e-4);
    }

    proptest! {
        #[test]
        fn starts_at_release_angle(
            length in 1.0f64..20.0,
            gravity in 1.0f64..20.0,
            angle in 0.0f64..90.0,
        ) {
            let p = PendulumParams { length, gravity, angle_degrees: angle, mass: 5.0 };
            prop_assert_eq!(p.angle_at(p.initial_angle(), 0.0), p.initial_angle());
        }

        #[test]
        fn swing_repeats_every_period(
            length in 1.0f64..20.0,
            gravity in 1.0f64..20.0,
            angle in 0.0f64..90.0,
            t in 0.0f64..60.0,
        ) {
            let p = PendulumParams { length, gravity, angle_degrees: angle, mass: 5.0 };
            let theta0 = p.initial_angle();
            let a = p.angle_at(theta0, t);
            let b = p.angle_at(theta0, t + p.period());
            prop_assert!((a - b).abs() < 1e-9);
            prop_assert!(a.abs() <= theta0 + 1e-12);
        }
    }
}
