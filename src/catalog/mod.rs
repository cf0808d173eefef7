//! Built-in furniture models.
//!
//! Each entry builds a CPU-side [`ModelNode`] tree in its own natural units.
//! The mesh factory measures the tree, scales it to the record's dimensions
//! and uploads a fresh copy of every part, so nothing built here is shared
//! between scene nodes.

mod blackboard;
mod chair;
mod conditioner;
mod radiator;

use crate::engine::{Material, Transform};
use crate::render::geometry::{Aabb, Geometry, GeometryError};
use crate::scene::Vector3;
use glam::{Mat4, Quat, Vec3};
use std::sync::OnceLock;

pub type ModelBuilder = fn() -> Result<ModelNode, GeometryError>;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelPart {
    pub geometry: Geometry,
    pub material: Material,
}

/// One node of a catalog model before it is instantiated in the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    pub name: &'static str,
    pub transform: Transform,
    pub part: Option<ModelPart>,
    /// Keep the part's own material when the model is recolored.
    pub preserve_material: bool,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    pub fn group(name: &'static str) -> Self {
        Self {
            name,
            transform: Transform::IDENTITY,
            part: None,
            preserve_material: false,
            children: Vec::new(),
        }
    }

    pub fn mesh(name: &'static str, geometry: Geometry, material: Material) -> Self {
        Self {
            part: Some(ModelPart { geometry, material }),
            ..Self::group(name)
        }
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.translation = Vec3::new(x, y, z);
        self
    }

    pub fn rotated(mut self, rotation: Quat) -> Self {
        self.transform.rotation = rotation * self.transform.rotation;
        self
    }

    pub fn preserve(mut self) -> Self {
        self.preserve_material = true;
        self
    }

    pub fn with_child(mut self, child: ModelNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn add(&mut self, child: ModelNode) {
        self.children.push(child);
    }

    /// Bounds of every part in the tree, in the root's parent space.
    pub fn natural_bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        self.accumulate_bounds(Mat4::IDENTITY, &mut bounds);
        bounds
    }

    fn accumulate_bounds(&self, parent: Mat4, bounds: &mut Aabb) {
        let world = parent * self.transform.matrix();
        if let Some(part) = &self.part {
            *bounds = bounds.union(&part.geometry.bounds().transformed(&world));
        }
        for child in &self.children {
            child.accumulate_bounds(world, bounds);
        }
    }

    pub fn part_count(&self) -> usize {
        usize::from(self.part.is_some())
            + self.children.iter().map(ModelNode::part_count).sum::<usize>()
    }

    pub fn triangle_count(&self) -> usize {
        self.part
            .as_ref()
            .map_or(0, |part| part.geometry.primitive_count())
            + self
                .children
                .iter()
                .map(ModelNode::triangle_count)
                .sum::<usize>()
    }
}

/// Read-only description of a catalog model.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub key: &'static str,
    pub display_name: &'static str,
    pub width_cm: f32,
    pub depth_cm: f32,
    pub height_cm: f32,
    pub price_units: u32,
    pub preview_asset_path: &'static str,
    pub build_detailed: ModelBuilder,
    pub build_coarse: Option<ModelBuilder>,
}

impl CatalogEntry {
    /// Default record dimensions: width, height, depth.
    pub fn dimensions(&self) -> Vector3 {
        Vector3::new(self.width_cm, self.height_cm, self.depth_cm)
    }

    /// Far-distance representation; the detailed builder stands in when the
    /// entry has no coarse one.
    pub fn build_far(&self) -> Result<ModelNode, GeometryError> {
        (self.build_coarse.unwrap_or(self.build_detailed))()
    }
}

pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn builtin() -> &'static Catalog {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            Catalog::new(vec![
                conditioner::ENTRY,
                chair::ENTRY,
                blackboard::ENTRY,
                radiator::OLD_ENTRY,
                radiator::MODERN_ENTRY,
            ])
        })
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn lambert(rgb: u32) -> Material {
    Material::lambert(crate::color::Color::from_u32(rgb))
}
