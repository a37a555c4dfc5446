//! Projectile motion: a ball launched from the ground at an angle.

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
use std::f64::consts::FRAC_PI_2;

pub const LAUNCH_ARROW_LENGTH: f32 = 5.0;
const BALL_COLOR: u32 = 0xe83b00;
const TRAIL_COLOR: u32 = 0xff7349;

/// Projectile parameters in SI units, angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileParams {
    pub angle_degrees: f64,
    pub velocity: f64,
    pub gravity: f64,
    pub mass: f64,
}

impl Default for ProjectileParams {
    fn default() -> Self {
        Self {
            angle_degrees: 45.0,
            velocity: 20.0,
            gravity: 9.8,
            mass: 5.0,
        }
    }
}

impl ProjectileParams {
    pub fn from_set(params: &ParameterSet) -> Self {
        let d = Self::default();
        Self {
            angle_degrees: params.get_or("angle", d.angle_degrees),
            velocity: params.get_or("velocity", d.velocity),
            gravity: params.get_or("gravity", d.gravity),
            mass: params.get_or("mass", d.mass),
        }
    }

    pub fn angle(&self) -> f64 {
        self.angle_degrees.to_radians()
    }

    /// Ball radius, which is also the launch height.
    pub fn radius(&self) -> f64 {
        radius_for_mass(self.mass)
    }

    pub fn launch_direction(&self) -> DVec3 {
        let a = self.angle();
        DVec3::new(a.cos(), a.sin(), 0.0)
    }

    /// Ball centre at time `t`, ignoring the ground.
    pub fn position_at(&self, t: f64) -> DVec3 {
        let a = self.angle();
        let x = self.velocity * a.cos() * t;
        let y = self.radius() + self.velocity * a.sin() * t - 0.5 * self.gravity * t * t;
        DVec3::new(x, y, 0.0)
    }

    /// Time until the ball is back at launch height.
    pub fn time_of_flight(&self) -> f64 {
        2.0 * self.velocity * self.angle().sin() / self.gravity
    }

    pub fn range(&self) -> f64 {
        self.velocity * self.velocity * (2.0 * self.angle()).sin() / self.gravity
    }

    /// Highest point of the ball centre above the ground.
    pub fn max_height(&self) -> f64 {
        let vy = self.velocity * self.angle().sin();
        self.radius() + vy * vy / (2.0 * self.gravity)
    }
}

#[derive(Debug)]
pub struct ProjectileObjects {
    pub scene: SceneId,
    pub ground: NodeId,
    pub grid: NodeId,
    pub ball: NodeId,
    pub launch_arrow: NodeId,
    pub trail_line: Option<NodeId>,
    pub trail: TrailBuffer,
    /// Launch point; `y` is the ball radius
    pub initial_position: DVec3,
    /// Radius the ball geometry was built with
    pub built_radius: f64,
    pub position: DVec3,
}

pub struct Projectile;

impl Experiment for Projectile {
    type Objects = ProjectileObjects;

    fn descriptor(&self) -> ExperimentDescriptor {
        ExperimentDescriptor {
            id: ExperimentKind::Projectile.id().to_string(),
            name: "Projectile Motion".to_string(),
            description: "Explore the path of an object thrown into the air".to_string(),
            kind: ExperimentKind::Projectile,
            control_params: vec![
                ParameterSpec::new("angle", "Launch Angle", 0.0, 90.0, 45.0, "°"),
                ParameterSpec::new("velocity", "Initial Velocity", 1.0, 50.0, 20.0, "m/s"),
                ParameterSpec::new("gravity", "Gravity", 1.0, 20.0, 9.8, "m/s²").divisor(),
                ParameterSpec::new("mass", "Mass", 1.0, 10.0, 5.0, "kg").divisor(),
            ],
        }
    }

    fn setup(
        &self,
        scene: &mut SceneGraph,
        params: &ParameterSet,
        options: &SetupOptions,
    ) -> Result<ProjectileObjects, SceneError> {
        let p = ProjectileParams::from_set(params);
        let radius = p.radius();
        let launch = DVec3::new(0.0, radius, 0.0);

        let ground = scene.add_mesh(
            None,
            "ground",
            Geometry::Plane {
                width: 100.0,
                height: 100.0,
            },
            Material::standard(0x90ee90).with_roughness(0.8),
            Transform::default().with_rotation(Vec3::new(-FRAC_PI_2 as f32, 0.0, 0.0)),
        )?;
        let grid = scene.add_mesh(
            None,
            "grid",
            Geometry::Grid {
                size: 100.0,
                divisions: 100,
            },
            Material::line(0x888888),
            Transform::at(Vec3::new(0.0, 0.01, 0.0)),
        )?;
        let ball = scene.add_mesh(
            None,
            "ball",
            Geometry::Sphere {
                radius: radius as f32,
                segments: 32,
            },
            Material::standard(BALL_COLOR)
                .with_roughness(0.5)
                .with_metalness(0.2),
            Transform::at(launch.as_vec3()),
        )?;
        let launch_arrow = scene.add_arrow(
            None,
            "launch-arrow",
            launch.as_vec3(),
            p.launch_direction().as_vec3(),
            LAUNCH_ARROW_LENGTH,
            TRAIL_COLOR,
            1.0,
            0.5,
        )?;
        add_lights(scene, 0.6, Vec3::new(20.0, 30.0, 20.0))?;

        log::debug!(
            "Projectile set up: radius {:.3}, time of flight {:.3}s",
            radius,
            p.time_of_flight()
        );

        Ok(ProjectileObjects {
            scene: scene.id(),
            ground,
            grid,
            ball,
            launch_arrow,
            trail_line: None,
            trail: TrailBuffer::new(options.trail_capacity),
            initial_position: launch,
            built_radius: radius,
            position: launch,
        })
    }

    fn simulate(
        &self,
        objects: &mut ProjectileObjects,
        scene: &mut SceneGraph,
        params: &ParameterSet,
        time: f64,
        running: bool,
        reset_trail: bool,
    ) -> Result<bool, SceneError> {
        if !running {
            return Ok(false);
        }

        let p = ProjectileParams::from_set(params);
        let a = p.angle();
        let launch_height = objects.initial_position.y;
        let x = p.velocity * a.cos() * time;
        let y = launch_height + p.velocity * a.sin() * time - 0.5 * p.gravity * time * time;

        if y > launch_height {
            let position = DVec3::new(x, y, 0.0);
            objects.position = position;
            scene.transform_mut(objects.ball)?.position = position.as_vec3();
            objects.trail.push(position.as_vec3());

            if reset_trail {
                clear_trail(scene, &mut objects.trail_line, &mut objects.trail)?;
            }
            sync_trail_line(
                scene,
                &mut objects.trail_line,
                &mut objects.trail,
                "projectile-trail",
                TRAIL_COLOR,
            )?;
            Ok(false)
        } else {
            // Back at launch height (or never left it, for a flat launch)
            Ok(time > 0.0)
        }
    }

    fn reset(
        &self,
        objects: &mut ProjectileObjects,
        scene: &mut SceneGraph,
        params: &ParameterSet,
    ) -> Result<(), SceneError> {
        let p = ProjectileParams::from_set(params);
        let radius = p.radius();
        objects.initial_position = DVec3::new(0.0, radius, 0.0);
        objects.position = objects.initial_position;

        let ball = scene.transform_mut(objects.ball)?;
        ball.position = objects.initial_position.as_vec3();
        ball.scale = Vec3::splat((radius / objects.built_radius) as f32);

        clear_trail(scene, &mut objects.trail_line, &mut objects.trail)?;

        scene.set_arrow(objects.launch_arrow, Some(p.launch_direction().as_vec3()), None)?;
        scene.transform_mut(objects.launch_arrow)?.position = objects.initial_position.as_vec3();
        Ok(())
    }

    fn readouts(&self, objects: &ProjectileObjects, _params: &ParameterSet) -> Vec<Readout> {
        vec![
            Readout::new("x", objects.position.x, "m"),
            Readout::new("y", objects.position.y, "m"),
            Readout::new(
                "height",
                objects.position.y - objects.initial_position.y,
                "m",
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn params_with(angle: f64, velocity: f64, gravity: f64, mass: f64) -> ParameterSet {
        let mut set = Projectile.descriptor().default_params();
        set.set("angle", angle);
        set.set("velocity", velocity);
        set.set("gravity", gravity);
        set.set("mass", mass);
        set
    }

    /// Step at `dt` until simulate reports auto-stop; returns the stop time.
    fn run_until_stop(params: &ParameterSet, dt: f64) -> (SceneGraph, ProjectileObjects, f64) {
        let mut scene = SceneGraph::new();
        let mut objects = Projectile
            .setup(&mut scene, params, &SetupOptions::default())
            .unwrap();
        let mut t = 0.0;
        loop {
            t += dt;
            if Projectile
                .simulate(&mut objects, &mut scene, params, t, true, false)
                .unwrap()
            {
                return (scene, objects, t);
            }
            assert!(t < 1000.0, "projectile never landed");
        }
    }

    #[test]
    fn default_launch_lands_at_expected_range() {
        let p = ProjectileParams::default();
        assert_relative_eq!(p.time_of_flight(), 2.886, epsilon = 1e-3);
        assert_relative_eq!(p.range(), 40.816, epsilon = 1e-3);
        assert_relative_eq!(
            p.max_height(),
            p.radius() + 10.204,
            epsilon = 1e-3
        );
    }

    #[test]
    fn auto_stop_matches_time_of_flight() {
        let params = Projectile.descriptor().default_params();
        let dt = 1.0 / 60.0;
        let (_, objects, stop) = run_until_stop(&params, dt);
        let tof = ProjectileParams::default().time_of_flight();
        assert!((stop - tof).abs() <= dt, "stopped at {stop}, expected {tof}");
        assert!(objects.trail.len() > 100);
        assert!(objects.trail_line.is_some());
    }

    #[test]
    fn flat_launch_stops_on_first_frame() {
        let params = params_with(0.0, 20.0, 9.8, 5.0);
        let (_, objects, stop) = run_until_stop(&params, 1.0 / 60.0);
        assert_relative_eq!(stop, 1.0 / 60.0);
        assert!(objects.trail.is_empty());
    }

    #[test]
    fn t_zero_never_stops() {
        let params = Projectile.descriptor().default_params();
        let mut scene = SceneGraph::new();
        let mut objects = Projectile
            .setup(&mut scene, &params, &SetupOptions::default())
            .unwrap();
        assert!(!Projectile
            .simulate(&mut objects, &mut scene, &params, 0.0, false, true)
            .unwrap());
        assert!(!Projectile
            .simulate(&mut objects, &mut scene, &params, 0.0, true, true)
            .unwrap());
    }

    #[test]
    fn reset_trail_discards_accumulated_points() {
        let params = Projectile.descriptor().default_params();
        let mut scene = SceneGraph::new();
        let mut objects = Projectile
            .setup(&mut scene, &params, &SetupOptions::default())
            .unwrap();
        for i in 1..10 {
            Projectile
                .simulate(&mut objects, &mut scene, &params, i as f64 * 0.05, true, false)
                .unwrap();
        }
        assert_eq!(objects.trail.len(), 9);
        let line = objects.trail_line.unwrap();
        assert_eq!(scene.polyline(line).unwrap().len(), 9);

        Projectile
            .simulate(&mut objects, &mut scene, &params, 0.5, true, true)
            .unwrap();
        assert!(objects.trail.is_empty());
        assert!(objects.trail_line.is_none());
        assert!(!scene.contains(line));
    }

    #[test]
    fn reset_is_idempotent_and_follows_mass() {
        let params = Projectile.descriptor().default_params();
        let mut scene = SceneGraph::new();
        let mut objects = Projectile
            .setup(&mut scene, &params, &SetupOptions::default())
            .unwrap();
        for i in 1..20 {
            Projectile
                .simulate(&mut objects, &mut scene, &params, i as f64 * 0.05, true, false)
                .unwrap();
        }

        let heavier = params_with(60.0, 20.0, 9.8, 10.0);
        Projectile.reset(&mut objects, &mut scene, &heavier).unwrap();
        let nodes = scene.node_count();
        let ball = scene.node(objects.ball).unwrap().transform;
        Projectile.reset(&mut objects, &mut scene, &heavier).unwrap();

        assert_eq!(scene.node_count(), nodes);
        assert_eq!(scene.node(objects.ball).unwrap().transform, ball);
        let r = radius_for_mass(10.0);
        assert_relative_eq!(ball.position.y, r as f32, epsilon = 1e-6);
        assert_relative_eq!(
            ball.scale.x,
            (r / radius_for_mass(5.0)) as f32,
            epsilon = 1e-6
        );
        let (dir, len) = scene.arrow(objects.launch_arrow).unwrap();
        assert_relative_eq!(dir.y, 60f32.to_radians().sin(), epsilon = 1e-6);
        assert_relative_eq!(len, LAUNCH_ARROW_LENGTH);
        assert!(objects.trail.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn height_above_launch_is_concave(
            angle in 1.0f64..90.0,
            velocity in 1.0f64..50.0,
            gravity in 1.0f64..20.0,
            mass in 1.0f64..10.0,
            t in 0.0f64..10.0,
            h in 0.001f64..1.0,
        ) {
            let p = ProjectileParams { angle_degrees: angle, velocity, gravity, mass };
            let y = |t: f64| p.position_at(t).y;
            let second_difference = y(t + 2.0 * h) - 2.0 * y(t + h) + y(t);
            prop_assert!(second_difference < 0.0);
            prop_assert!((second_difference + gravity * h * h).abs() < 1e-6);
        }

        #[test]
        fn apex_is_max_height(
            angle in 1.0f64..90.0,
            velocity in 1.0f64..50.0,
            gravity in 1.0f64..20.0,
        ) {
            let p = ProjectileParams { angle_degrees: angle, velocity, gravity, mass: 5.0 };
            let apex = p.time_of_flight() / 2.0;
            prop_assert!((p.position_at(apex).y - p.max_height()).abs() < 1e-9 * p.max_height().max(1.0));
            prop_assert!((p.position_at(p.time_of_flight()).x - p.range()).abs() < 1e-9 * p.range().max(1.0));
        }

        #[test]
        fn first_auto_stop_is_within_one_step_of_flight_time(
            angle in 5.0f64..90.0,
            velocity in 1.0f64..30.0,
            gravity in 5.0f64..20.0,
        ) {
            let params = params_with(angle, velocity, gravity, 5.0);
            let dt = 1.0 / 60.0;
            let (_, _, stop) = run_until_stop(&params, dt);
            let tof = ProjectileParams::from_set(&params).time_of_flight();
            prop_assert!((stop - tof).abs() <= dt + 1e-9);
        }
    }
}
