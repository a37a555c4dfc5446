//! Render backend abstraction.
//!
//! The 3D rendering library and the host environment's frame scheduler are
//! external collaborators. [`RenderBackend`] is the seam the scene host talks
//! to; [`HeadlessBackend`] implements it without a GPU and keeps statistics
//! that the demo binary reports and the tests assert on.

use crate::error::RenderError;
use crate::scene::camera::OrbitCamera;
use crate::scene::graph::SceneGraph;
use crate::scene::resources::{GeometryId, MaterialId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// Registration of one pending animation-frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self {
            width: 960,
            height: 500,
        }
    }
}

/// Everything the engine needs from a rendering library and frame scheduler.
pub trait RenderBackend {
    /// Create a render surface (canvas/context).
    fn create_surface(&mut self, size: SurfaceSize, clear_color: u32)
        -> Result<SurfaceId, RenderError>;

    fn resize_surface(&mut self, surface: SurfaceId, size: SurfaceSize) -> Result<(), RenderError>;

    fn render(
        &mut self,
        surface: SurfaceId,
        scene: &SceneGraph,
        camera: &OrbitCamera,
    ) -> Result<(), RenderError>;

    /// Free the backend copy of a geometry.
    fn release_geometry(&mut self, geometry: GeometryId);

    /// Free the backend copy of a material.
    fn release_material(&mut self, material: MaterialId);

    /// Discard the surface itself. Called after every resource is released.
    fn destroy_surface(&mut self, surface: SurfaceId);

    /// Register interest in the next animation frame.
    fn request_frame(&mut self) -> FrameToken;

    /// Withdraw a registration made with [`request_frame`](Self::request_frame).
    fn cancel_frame(&mut self, token: FrameToken);
}

/// Counters kept by [`HeadlessBackend`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackendStats {
    pub surfaces_created: usize,
    pub surfaces_destroyed: usize,
    pub frames_rendered: usize,
    pub geometries_released: usize,
    pub materials_released: usize,
    pub frames_cancelled: usize,
    pub resize_failures: usize,
    /// Largest node count seen in a rendered scene
    pub peak_nodes: usize,
}

impl BackendStats {
    pub fn live_surfaces(&self) -> usize {
        self.surfaces_created - self.surfaces_destroyed
    }
}

/// GPU-less backend: renders nothing, schedules frames in a queue.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    live_surfaces: BTreeSet<SurfaceId>,
    pending_frames: BTreeSet<FrameToken>,
    stats: BackendStats,
    fail_next_surface: bool,
    fail_resizes: usize,
    last_size: Option<SurfaceSize>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &BackendStats {
        &self.stats
    }

    pub fn pending_frames(&self) -> usize {
        self.pending_frames.len()
    }

    pub fn live_surfaces(&self) -> usize {
        self.live_surfaces.len()
    }

    pub fn last_size(&self) -> Option<SurfaceSize> {
        self.last_size
    }

    /// Make the next `create_surface` call fail.
    pub fn fail_next_surface(&mut self) {
        self.fail_next_surface = true;
    }

    /// Make the next `count` resize calls fail.
    pub fn fail_resizes(&mut self, count: usize) {
        self.fail_resizes = count;
    }

    /// Pop the oldest registered frame, as the scheduler would fire it.
    pub fn next_due_frame(&mut self) -> Option<FrameToken> {
        self.pending_frames.pop_first()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_surface(
        &mut self,
        size: SurfaceSize,
        clear_color: u32,
    ) -> Result<SurfaceId, RenderError> {
        if std::mem::take(&mut self.fail_next_surface) {
            return Err(RenderError::SurfaceCreation("injected failure".into()));
        }
        let id = SurfaceId(self.next());
        self.live_surfaces.insert(id);
        self.stats.surfaces_created += 1;
        self.last_size = Some(size);
        log::debug!(
            "Headless surface {} created ({}x{}, clear #{:06x})",
            id.0,
            size.width,
            size.height,
            clear_color
        );
        Ok(id)
    }

    fn resize_surface(&mut self, surface: SurfaceId, size: SurfaceSize) -> Result<(), RenderError> {
        if self.fail_resizes > 0 {
            self.fail_resizes -= 1;
            self.stats.resize_failures += 1;
            return Err(RenderError::Resize {
                width: size.width,
                height: size.height,
                reason: "injected failure".into(),
            });
        }
        if !self.live_surfaces.contains(&surface) {
            return Err(RenderError::Resize {
                width: size.width,
                height: size.height,
                reason: format!("surface {} is not live", surface.0),
            });
        }
        self.last_size = Some(size);
        Ok(())
    }

    fn render(
        &mut self,
        surface: SurfaceId,
        scene: &SceneGraph,
        _camera: &OrbitCamera,
    ) -> Result<(), RenderError> {
        if !self.live_surfaces.contains(&surface) {
            return Err(RenderError::Render(format!("surface {} is not live", surface.0)));
        }
        self.stats.frames_rendered += 1;
        self.stats.peak_nodes = self.stats.peak_nodes.max(scene.node_count());
        Ok(())
    }

    fn release_geometry(&mut self, _geometry: GeometryId) {
        self.stats.geometries_released += 1;
    }

    fn release_material(&mut self, _material: MaterialId) {
        self.stats.materials_released += 1;
    }

    fn destroy_surface(&mut self, surface: SurfaceId) {
        if self.live_surfaces.remove(&surface) {
            self.stats.surfaces_destroyed += 1;
        }
    }

    fn request_frame(&mut self) -> FrameToken {
        let token = FrameToken(self.next());
        self.pending_frames.insert(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        if self.pending_frames.remove(&token) {
            self.stats.frames_cancelled += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_surface_failure_is_one_shot() {
        let mut backend = HeadlessBackend::new();
        backend.fail_next_surface();
        assert!(backend.create_surface(SurfaceSize::default(), 0).is_err());
        assert!(backend.create_surface(SurfaceSize::default(), 0).is_ok());
        assert_eq!(backend.live_surfaces(), 1);
    }

    #[test]
    fn frames_fire_in_request_order_and_cancel_cleanly() {
        let mut backend = HeadlessBackend::new();
        let a = backend.request_frame();
        let b = backend.request_frame();
        backend.cancel_frame(a);
        assert_eq!(backend.next_due_frame(), Some(b));
        assert_eq!(backend.next_due_frame(), None);
        assert_eq!(backend.stats().frames_cancelled, 1);
    }

    #[test]
    fn rendering_a_destroyed_surface_fails() {
        let mut backend = HeadlessBackend::new();
        let surface = backend.create_surface(SurfaceSize::default(), 0).unwrap();
        backend.destroy_surface(surface);
        let scene = SceneGraph::new();
        let camera = OrbitCamera::default();
        assert!(backend.render(surface, &scene, &camera).is_err());
        assert_eq!(backend.stats().live_surfaces(), 0);
    }
}
