use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Camera settings loaded from the lab configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Fraction of the remaining orbit/zoom error removed per 60 Hz frame
    pub damping_factor: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(10.0, 15.0, 20.0),
            target: Vec3::ZERO,
            fov_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
            damping_factor: 0.05,
        }
    }
}

/// Orbit camera with damped rotation and zoom.
///
/// Drag and scroll input set targets; [`update`](Self::update) eases the
/// current rotation/distance towards them, so the camera keeps gliding for a
/// few frames after input stops.
pub struct OrbitCamera {
    pub center: Vec3,
    pub distance: f32,
    pub target_distance: f32,
    pub rotation: Quat,
    pub target_rotation: Quat,
    pub aspect: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(&CameraConfig::default(), 1.0)
    }
}

impl OrbitCamera {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        let offset = config.position - config.target;
        let distance = offset.length().max(f32::EPSILON);
        let rotation = look_rotation(offset / distance);

        Self {
            center: config.target,
            distance,
            target_distance: distance,
            rotation,
            target_rotation: rotation,
            aspect: sanitize_aspect(aspect),
            fov_degrees: config.fov_degrees,
            near: config.near,
            far: config.far,
            damping_factor: config.damping_factor.clamp(0.0, 1.0),
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            min_distance: 1.0,
            max_distance: 500.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.center + self.rotation * Vec3::Z * self.distance
    }

    /// Orbit by a pointer drag of `(dx, dy)` pixels.
    pub fn handle_drag(&mut self, dx: f32, dy: f32) {
        let yaw = Quat::from_rotation_y(-dx * self.rotate_speed);
        let pitch = Quat::from_rotation_x(-dy * self.rotate_speed);
        self.target_rotation = (yaw * self.target_rotation * pitch).normalize();
    }

    /// Zoom by scroll `delta` lines; positive zooms in.
    pub fn handle_scroll(&mut self, delta: f32) {
        let factor = 1.0 - delta * self.zoom_speed;
        self.target_distance =
            (self.target_distance * factor).clamp(self.min_distance, self.max_distance);
    }

    /// Ease towards the input targets. `dt` is wall-clock seconds.
    pub fn update(&mut self, dt: f32) {
        if self.damping_factor <= 0.0 || self.damping_factor >= 1.0 {
            self.rotation = self.target_rotation;
            self.distance = self.target_distance;
            return;
        }
        // Frame-rate independent: damping_factor is defined per 60 Hz frame
        let t = 1.0 - (1.0 - self.damping_factor).powf(dt.max(0.0) * 60.0);
        self.rotation = self.rotation.slerp(self.target_rotation, t).normalize();
        self.distance += (self.target_distance - self.distance) * t;
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = sanitize_aspect(width as f32 / height.max(1) as f32);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.center, self.rotation * Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}

/// Rotation whose local +Z points along `back` (from target to eye).
fn look_rotation(back: Vec3) -> Quat {
    let right = Vec3::Y.cross(back).try_normalize().unwrap_or(Vec3::X);
    let up = back.cross(right);
    Quat::from_mat3(&glam::Mat3::from_cols(right, up, back)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn starts_at_configured_position() {
        let camera = OrbitCamera::new(&CameraConfig::default(), 16.0 / 9.0);
        let p = camera.position();
        assert_relative_eq!(p.x, 10.0, epsilon = 1e-3);
        assert_relative_eq!(p.y, 15.0, epsilon = 1e-3);
        assert_relative_eq!(p.z, 20.0, epsilon = 1e-3);
    }

    #[test]
    fn aspect_tracks_resize_and_ignores_degenerate_sizes() {
        let mut camera = OrbitCamera::default();
        camera.set_aspect(800, 400);
        assert_relative_eq!(camera.aspect, 2.0);
        camera.set_aspect(0, 0);
        assert_relative_eq!(camera.aspect, 1.0);
    }

    #[test]
    fn zoom_is_damped_and_converges() {
        let mut camera = OrbitCamera::default();
        let start = camera.distance;
        camera.handle_scroll(2.0);
        camera.update(1.0 / 60.0);
        assert!(camera.distance < start);
        assert!(camera.distance > camera.target_distance);

        for _ in 0..600 {
            camera.update(1.0 / 60.0);
        }
        assert_relative_eq!(camera.distance, camera.target_distance, epsilon = 1e-3);
    }

    #[test]
    fn drag_keeps_distance_to_center() {
        let mut camera = OrbitCamera::default();
        camera.handle_drag(120.0, -40.0);
        for _ in 0..600 {
            camera.update(1.0 / 60.0);
        }
        let d = (camera.position() - camera.center).length();
        assert_relative_eq!(d, camera.distance, epsilon = 1e-3);
    }
}
