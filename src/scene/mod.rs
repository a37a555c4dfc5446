//! Scene hosting for the Virtual Lab.
//!
//! This module owns everything render-side: the scene graph and its
//! resources, the orbit camera, the render backend seam, and the
//! [`SceneHost`] that ties them to one experiment instance.

pub mod backend;
pub mod camera;
pub mod graph;
pub mod host;
pub mod resources;

pub use backend::{FrameToken, HeadlessBackend, RenderBackend, SurfaceId, SurfaceSize};
pub use camera::{CameraConfig, OrbitCamera};
pub use graph::{Light, Node, NodeId, NodeKind, SceneGraph, SceneId, Transform};
pub use host::{HostConfig, SceneHost, TeardownReport};
pub use resources::{Geometry, GeometryId, Material, MaterialId, ResourcePool};
