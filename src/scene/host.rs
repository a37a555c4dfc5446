//! Scene host: render surface, scene graph, camera and frame registration.
//!
//! The host knows nothing about physics. It is mounted once per experiment
//! instance and unmounted before the next one is set up, so each experiment
//! starts from an empty scene and a fresh surface.
//!
//! Teardown order matters:
//! 1. cancel the pending frame request (no callback may reach a dead scene)
//! 2. release every geometry and material the scene still holds
//! 3. destroy the surface

use crate::error::RenderError;
use crate::scene::backend::{FrameToken, RenderBackend, SurfaceId, SurfaceSize};
use crate::scene::camera::{CameraConfig, OrbitCamera};
use crate::scene::graph::{Released, SceneGraph};
use serde::{Deserialize, Serialize};

/// Surface and camera settings for a mounted host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    pub surface_size: SurfaceSize,
    /// 0xRRGGBB
    pub clear_color: u32,
    pub camera: CameraConfig,
    /// Refuse to build scenes with more nodes than this
    pub node_budget: Option<usize>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            surface_size: SurfaceSize::default(),
            clear_color: 0xf0f4f8,
            camera: CameraConfig::default(),
            node_budget: None,
        }
    }
}

/// Resources handed back to the backend during teardown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    pub geometries: usize,
    pub materials: usize,
    pub cancelled_frame: bool,
}

pub struct SceneHost {
    surface: Option<SurfaceId>,
    scene: SceneGraph,
    camera: OrbitCamera,
    size: SurfaceSize,
    pending_frame: Option<FrameToken>,
    /// Size of a resize the backend refused; retried on the next resize event
    failed_resize: Option<SurfaceSize>,
}

impl SceneHost {
    /// Create the render surface and an empty scene.
    pub fn mount(backend: &mut dyn RenderBackend, config: &HostConfig) -> Result<Self, RenderError> {
        let size = config.surface_size;
        let surface = backend.create_surface(size, config.clear_color)?;
        let aspect = size.width as f32 / size.height.max(1) as f32;

        log::debug!("Mounted scene host on surface {}", surface.0);

        Ok(Self {
            surface: Some(surface),
            scene: SceneGraph::with_node_budget(config.node_budget),
            camera: OrbitCamera::new(&config.camera, aspect),
            size,
            pending_frame: None,
            failed_resize: None,
        })
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn is_mounted(&self) -> bool {
        self.surface.is_some()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    pub fn resize_pending(&self) -> bool {
        self.failed_resize.is_some()
    }

    /// Register for the next animation frame unless already registered.
    pub fn schedule_frame(&mut self, backend: &mut dyn RenderBackend) {
        if self.surface.is_some() && self.pending_frame.is_none() {
            self.pending_frame = Some(backend.request_frame());
        }
    }

    /// Consume a delivered frame token. Returns false for tokens that do not
    /// belong to this host's current registration.
    pub fn accept_frame(&mut self, token: FrameToken) -> bool {
        if self.pending_frame == Some(token) {
            self.pending_frame = None;
            true
        } else {
            false
        }
    }

    fn flush_released(&mut self, backend: &mut dyn RenderBackend) -> Released {
        let released = self.scene.take_released();
        for geometry in &released.geometries {
            backend.release_geometry(*geometry);
        }
        for material in &released.materials {
            backend.release_material(*material);
        }
        released
    }

    /// Render the scene. Backend failures are logged and swallowed.
    pub fn render(&mut self, backend: &mut dyn RenderBackend) {
        let Some(surface) = self.surface else {
            return;
        };
        self.flush_released(backend);
        if let Err(e) = backend.render(surface, &self.scene, &self.camera) {
            log::warn!("Render failed: {}", e);
        }
    }

    /// Handle a container resize. Camera aspect always follows; a refused
    /// surface resize is remembered and retried on the next event.
    pub fn resize(&mut self, backend: &mut dyn RenderBackend, width: u32, height: u32) {
        let Some(surface) = self.surface else {
            return;
        };
        let size = SurfaceSize { width, height };
        self.camera.set_aspect(width, height);
        self.size = size;

        if let Some(previous) = self.failed_resize {
            log::debug!(
                "Retrying surface resize (previous {}x{} failed)",
                previous.width,
                previous.height
            );
        }

        match backend.resize_surface(surface, size) {
            Ok(()) => self.failed_resize = None,
            Err(e) => {
                log::warn!("Surface resize failed, will retry on next resize: {}", e);
                self.failed_resize = Some(size);
            }
        }
    }

    /// Tear down: cancel the frame request, release every resource, destroy
    /// the surface.
    pub fn unmount(mut self, backend: &mut dyn RenderBackend) -> TeardownReport {
        let mut report = TeardownReport::default();

        if let Some(token) = self.pending_frame.take() {
            backend.cancel_frame(token);
            report.cancelled_frame = true;
        }

        let released = self.scene.dispose();
        for geometry in &released.geometries {
            backend.release_geometry(*geometry);
        }
        for material in &released.materials {
            backend.release_material(*material);
        }
        report.geometries = released.geometries.len();
        report.materials = released.materials.len();

        if let Some(surface) = self.surface.take() {
            backend.destroy_surface(surface);
            log::debug!(
                "Unmounted surface {} ({} geometries, {} materials released)",
                surface.0,
                report.geometries,
                report.materials
            );
        }
        report
    }
}

impl Drop for SceneHost {
    fn drop(&mut self) {
        if let Some(surface) = self.surface {
            log::error!(
                "Scene host for surface {} dropped without unmount; {} nodes leaked",
                surface.0,
                self.scene.node_count()
            );
        }
    }
}
