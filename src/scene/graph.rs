//! Scene graph owned by the scene host.
//!
//! A scene is a forest of nodes. Each node has a local [`Transform`] and an
//! optional visual payload ([`NodeKind`]) that exclusively owns one geometry
//! and one material in the scene's [`ResourcePool`]. Removing a node releases
//! the resources of its whole subtree; released handles are queued so the
//! host can forward them to the render backend.
//!
//! ```text
//! SceneGraph
//!  ├─ roots: [ground, grid, ball, arrow, lights...]
//!  ├─ nodes: NodeId → Node { kind, transform, parent, children }
//!  └─ resources: GeometryId → Geometry, MaterialId → Material
//! ```

use crate::error::SceneError;
use crate::scene::resources::{Geometry, GeometryId, Material, MaterialId, ResourcePool};
use glam::{EulerRot, Mat4, Quat, Vec3};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one scene graph instance.
///
/// Object bundles remember the scene they were built in so they are never
/// driven against a different one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(pub u64);

/// Handle to a node within one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

/// Local transform. Rotation is XYZ Euler angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

/// Light sources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient { color: u32, intensity: f32 },
    Directional { color: u32, intensity: f32, cast_shadow: bool },
}

/// Visual payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Pure transform node (pivots, resistor assemblies)
    Group,
    Mesh {
        geometry: GeometryId,
        material: MaterialId,
    },
    Line {
        geometry: GeometryId,
        material: MaterialId,
    },
    /// Arrow helper; the shaft geometry spans `direction * length`
    Arrow {
        direction: Vec3,
        length: f32,
        head_length: f32,
        head_width: f32,
        geometry: GeometryId,
        material: MaterialId,
    },
    Label {
        geometry: GeometryId,
        material: MaterialId,
    },
    Light(Light),
}

impl NodeKind {
    fn resources(&self) -> Option<(GeometryId, MaterialId)> {
        match self {
            NodeKind::Mesh { geometry, material }
            | NodeKind::Line { geometry, material }
            | NodeKind::Arrow {
                geometry, material, ..
            }
            | NodeKind::Label { geometry, material } => Some((*geometry, *material)),
            NodeKind::Group | NodeKind::Light(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Resources freed from the scene that the backend has not yet been told about.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Released {
    pub geometries: Vec<GeometryId>,
    pub materials: Vec<MaterialId>,
}

impl Released {
    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty() && self.materials.is_empty()
    }

    fn push(&mut self, (geometry, material): (GeometryId, MaterialId)) {
        self.geometries.push(geometry);
        self.materials.push(material);
    }

    fn append(&mut self, other: &mut Released) {
        self.geometries.append(&mut other.geometries);
        self.materials.append(&mut other.materials);
    }
}

pub struct SceneGraph {
    id: SceneId,
    nodes: BTreeMap<NodeId, Node>,
    roots: Vec<NodeId>,
    resources: ResourcePool,
    next_node: u64,
    node_budget: Option<usize>,
    released: Released,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            id: SceneId(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed)),
            nodes: BTreeMap::new(),
            roots: Vec::new(),
            resources: ResourcePool::new(),
            next_node: 0,
            node_budget: None,
            released: Released::default(),
        }
    }

    /// Scene that refuses to grow past `budget` nodes.
    pub fn with_node_budget(budget: Option<usize>) -> Self {
        Self {
            node_budget: budget,
            ..Self::new()
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn resources(&self) -> &ResourcePool {
        &self.resources
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(&id).ok_or(SceneError::MissingNode(id.0))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Result<&mut Transform, SceneError> {
        self.nodes
            .get_mut(&id)
            .map(|node| &mut node.transform)
            .ok_or(SceneError::MissingNode(id.0))
    }

    fn check_budget(&self) -> Result<(), SceneError> {
        match self.node_budget {
            Some(budget) if self.nodes.len() >= budget => {
                Err(SceneError::NodeBudgetExhausted { budget })
            }
            _ => Ok(()),
        }
    }

    fn insert(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        kind: NodeKind,
        transform: Transform,
    ) -> Result<NodeId, SceneError> {
        if let Some(parent) = parent {
            if !self.nodes.contains_key(&parent) {
                return Err(SceneError::MissingNode(parent.0));
            }
        }

        self.next_node += 1;
        let id = NodeId(self.next_node);
        self.nodes.insert(
            id,
            Node {
                name: name.to_string(),
                kind,
                transform,
                parent,
                children: Vec::new(),
            },
        );

        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(parent_node) => parent_node.children.push(id),
            None => self.roots.push(id),
        }

        log::trace!("Scene {:?}: added node {} '{}'", self.id, id.0, name);
        Ok(id)
    }

    /// Allocate resources for a node only once the budget check has passed,
    /// so a refused node never strands a geometry or material.
    fn insert_with_resources(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        geometry: Geometry,
        material: Material,
        transform: Transform,
        make_kind: impl FnOnce(GeometryId, MaterialId) -> NodeKind,
    ) -> Result<NodeId, SceneError> {
        self.check_budget()?;
        let geometry = self.resources.add_geometry(geometry);
        let material = self.resources.add_material(material);
        match self.insert(parent, name, make_kind(geometry, material), transform) {
            Ok(id) => Ok(id),
            Err(e) => {
                self.resources.remove_geometry(geometry);
                self.resources.remove_material(material);
                Err(e)
            }
        }
    }

    pub fn add_group(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        transform: Transform,
    ) -> Result<NodeId, SceneError> {
        self.check_budget()?;
        self.insert(parent, name, NodeKind::Group, transform)
    }

    pub fn add_mesh(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        geometry: Geometry,
        material: Material,
        transform: Transform,
    ) -> Result<NodeId, SceneError> {
        self.insert_with_resources(parent, name, geometry, material, transform, |geometry, material| {
            NodeKind::Mesh { geometry, material }
        })
    }

    pub fn add_line(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        points: Vec<Vec3>,
        material: Material,
    ) -> Result<NodeId, SceneError> {
        self.insert_with_resources(
            parent,
            name,
            Geometry::polyline(points),
            material,
            Transform::default(),
            |geometry, material| NodeKind::Line { geometry, material },
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_arrow(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        origin: Vec3,
        direction: Vec3,
        length: f32,
        color: u32,
        head_length: f32,
        head_width: f32,
    ) -> Result<NodeId, SceneError> {
        let direction = direction.normalize_or_zero();
        self.insert_with_resources(
            parent,
            name,
            Geometry::polyline(vec![Vec3::ZERO, direction * length]),
            Material::line(color),
            Transform::at(origin),
            |geometry, material| NodeKind::Arrow {
                direction,
                length,
                head_length,
                head_width,
                geometry,
                material,
            },
        )
    }

    pub fn add_label(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        text: &str,
        transform: Transform,
    ) -> Result<NodeId, SceneError> {
        self.insert_with_resources(
            parent,
            name,
            Geometry::Label {
                width: 3.0,
                height: 1.5,
                text: text.to_string(),
            },
            Material::standard(0xffffff),
            transform,
            |geometry, material| NodeKind::Label { geometry, material },
        )
    }

    pub fn add_light(
        &mut self,
        name: &str,
        light: Light,
        transform: Transform,
    ) -> Result<NodeId, SceneError> {
        self.check_budget()?;
        self.insert(None, name, NodeKind::Light(light), transform)
    }

    fn geometry_of(&mut self, id: NodeId) -> Result<&mut Geometry, SceneError> {
        let (geometry, _) = self
            .node(id)?
            .kind
            .resources()
            .ok_or(SceneError::MissingNode(id.0))?;
        self.resources
            .geometry_mut(geometry)
            .ok_or(SceneError::MissingNode(id.0))
    }

    /// Replace the points of a line node's geometry.
    pub fn set_polyline(&mut self, id: NodeId, new_points: &[Vec3]) -> Result<(), SceneError> {
        if let Geometry::Polyline { points } = self.geometry_of(id)? {
            points.clear();
            points.extend_from_slice(new_points);
        }
        Ok(())
    }

    pub fn polyline(&self, id: NodeId) -> Result<&[Vec3], SceneError> {
        let (geometry, _) = self
            .node(id)?
            .kind
            .resources()
            .ok_or(SceneError::MissingNode(id.0))?;
        match self.resources.geometry(geometry) {
            Some(Geometry::Polyline { points }) => Ok(points.as_slice()),
            _ => Err(SceneError::MissingNode(id.0)),
        }
    }

    pub fn set_label_text(&mut self, id: NodeId, new_text: &str) -> Result<(), SceneError> {
        if let Geometry::Label { text, .. } = self.geometry_of(id)? {
            if text.as_str() != new_text {
                text.clear();
                text.push_str(new_text);
            }
        }
        Ok(())
    }

    pub fn label_text(&self, id: NodeId) -> Result<&str, SceneError> {
        let (geometry, _) = self
            .node(id)?
            .kind
            .resources()
            .ok_or(SceneError::MissingNode(id.0))?;
        match self.resources.geometry(geometry) {
            Some(Geometry::Label { text, .. }) => Ok(text.as_str()),
            _ => Err(SceneError::MissingNode(id.0)),
        }
    }

    /// Re-aim and/or resize an arrow helper.
    pub fn set_arrow(
        &mut self,
        id: NodeId,
        new_direction: Option<Vec3>,
        new_length: Option<f32>,
    ) -> Result<(), SceneError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(SceneError::MissingNode(id.0))?;
        let NodeKind::Arrow {
            direction,
            length,
            geometry,
            ..
        } = &mut node.kind
        else {
            return Err(SceneError::MissingNode(id.0));
        };

        if let Some(d) = new_direction {
            *direction = d.normalize_or_zero();
        }
        if let Some(l) = new_length {
            *length = l;
        }
        let tip = *direction * *length;
        if let Some(Geometry::Polyline { points }) = self.resources.geometry_mut(*geometry) {
            *points = vec![Vec3::ZERO, tip];
        }
        Ok(())
    }

    /// (direction, length) of an arrow node.
    pub fn arrow(&self, id: NodeId) -> Result<(Vec3, f32), SceneError> {
        match &self.node(id)?.kind {
            NodeKind::Arrow {
                direction, length, ..
            } => Ok((*direction, *length)),
            _ => Err(SceneError::MissingNode(id.0)),
        }
    }

    pub fn set_color(&mut self, id: NodeId, color: u32) -> Result<(), SceneError> {
        let (_, material) = self
            .node(id)?
            .kind
            .resources()
            .ok_or(SceneError::MissingNode(id.0))?;
        if let Some(m) = self.resources.material_mut(material) {
            m.color = color;
        }
        Ok(())
    }

    pub fn color(&self, id: NodeId) -> Result<u32, SceneError> {
        let (_, material) = self
            .node(id)?
            .kind
            .resources()
            .ok_or(SceneError::MissingNode(id.0))?;
        self.resources
            .material(material)
            .map(|m| m.color)
            .ok_or(SceneError::MissingNode(id.0))
    }

    /// Depth-first, parents before children, roots in insertion order.
    pub fn traverse(&self, mut visit: impl FnMut(NodeId, &Node)) {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                visit(id, node);
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    pub fn world_matrix(&self, id: NodeId) -> Result<Mat4, SceneError> {
        let mut node = self.node(id)?;
        let mut matrix = node.transform.matrix();
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            matrix = node.transform.matrix() * matrix;
        }
        Ok(matrix)
    }

    pub fn world_position(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.world_matrix(id)?.transform_point3(Vec3::ZERO))
    }

    /// Detach a node and release the resources of its subtree.
    pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
        let parent = self.node(id)?.parent;
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(parent_node) => parent_node.children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                if let Some((geometry, material)) = node.kind.resources() {
                    self.resources.remove_geometry(geometry);
                    self.resources.remove_material(material);
                    self.released.push((geometry, material));
                }
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    /// Resources freed by [`remove`](Self::remove) since the last call.
    pub fn take_released(&mut self) -> Released {
        std::mem::take(&mut self.released)
    }

    /// Tear the whole scene down, returning every resource it still held.
    ///
    /// Walks the graph rather than draining the pool so that a resource not
    /// reachable from any node is still reported.
    pub fn dispose(&mut self) -> Released {
        let mut released = self.take_released();
        let mut reachable = Released::default();
        self.traverse(|_, node| {
            if let Some(pair) = node.kind.resources() {
                reachable.push(pair);
            }
        });
        released.append(&mut reachable);

        for geometry in &released.geometries {
            self.resources.remove_geometry(*geometry);
        }
        for material in &released.materials {
            self.resources.remove_material(*material);
        }
        // Anything still in the pool was orphaned; release it too
        let orphan_geometries: Vec<_> = self.resources.geometry_ids().collect();
        let orphan_materials: Vec<_> = self.resources.material_ids().collect();
        for geometry in orphan_geometries {
            self.resources.remove_geometry(geometry);
            released.geometries.push(geometry);
        }
        for material in orphan_materials {
            self.resources.remove_material(material);
            released.materials.push(material);
        }

        self.nodes.clear();
        self.roots.clear();
        released
    }
}
