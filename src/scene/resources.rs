//! Geometry and material resources owned by a scene.
//!
//! Every mesh, line, arrow and label node references resources allocated
//! here. The pool tracks what is live so the scene host can release every
//! resource it created when the scene is torn down.

use glam::Vec3;
use std::collections::BTreeMap;

/// Handle to a geometry in a [`ResourcePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeometryId(pub u64);

/// Handle to a material in a [`ResourcePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(pub u64);

/// Geometry descriptions understood by render backends.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Plane { width: f32, height: f32 },
    Box { width: f32, height: f32, depth: f32 },
    Sphere { radius: f32, segments: u32 },
    Cylinder { radius: f32, height: f32, segments: u32 },
    Grid { size: f32, divisions: u32 },
    /// Connected line strip (wires, trails, arrow shafts)
    Polyline { points: Vec<Vec3> },
    /// Text quad; the backend rasterizes `text` onto it
    Label { width: f32, height: f32, text: String },
}

impl Geometry {
    pub fn polyline(points: impl Into<Vec<Vec3>>) -> Self {
        Geometry::Polyline {
            points: points.into(),
        }
    }
}

/// Surface appearance of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// 0xRRGGBB
    pub color: u32,
    pub roughness: f32,
    pub metalness: f32,
    /// Unlit line material
    pub line: bool,
}

impl Material {
    pub fn standard(color: u32) -> Self {
        Self {
            color,
            roughness: 1.0,
            metalness: 0.0,
            line: false,
        }
    }

    pub fn line(color: u32) -> Self {
        Self {
            color,
            roughness: 1.0,
            metalness: 0.0,
            line: true,
        }
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn with_metalness(mut self, metalness: f32) -> Self {
        self.metalness = metalness;
        self
    }
}

/// Live geometries and materials of one scene.
#[derive(Debug, Default)]
pub struct ResourcePool {
    next_id: u64,
    geometries: BTreeMap<GeometryId, Geometry>,
    materials: BTreeMap<MaterialId, Material>,
}

impl ResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        let id = GeometryId(self.next());
        self.geometries.insert(id, geometry);
        id
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.next());
        self.materials.insert(id, material);
        id
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(&id)
    }

    pub fn geometry_mut(&mut self, id: GeometryId) -> Option<&mut Geometry> {
        self.geometries.get_mut(&id)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(&id)
    }

    pub fn remove_geometry(&mut self, id: GeometryId) -> Option<Geometry> {
        self.geometries.remove(&id)
    }

    pub fn remove_material(&mut self, id: MaterialId) -> Option<Material> {
        self.materials.remove(&id)
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn geometry_ids(&self) -> impl Iterator<Item = GeometryId> + '_ {
        self.geometries.keys().copied()
    }

    pub fn material_ids(&self) -> impl Iterator<Item = MaterialId> + '_ {
        self.materials.keys().copied()
    }
}
