//! Retained scene graph and resource pools backing the renderer.
//!
//! Nodes, geometries and materials are created and destroyed explicitly, the
//! way a native rendering engine hands out entities and buffers. A handle is
//! owned by exactly one node. Destroying something that is already gone is a
//! no-op that reports `false`.

use crate::color::Color;
use crate::render::geometry::{Aabb, Geometry};
use glam::{Mat4, Quat, Vec3};
use std::collections::HashMap;

/// Opaque scene node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(u32);

impl Entity {
    pub fn id(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryHandle(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Flat diffuse shading; the only kind catalog recoloring touches.
    Lambert,
    /// Unlit lines for overlays and helpers.
    LineBasic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub color: Color,
    pub opacity: f32,
    pub transparent: bool,
    pub double_sided: bool,
}

impl Material {
    pub fn lambert(color: Color) -> Self {
        Self {
            kind: MaterialKind::Lambert,
            color,
            opacity: 1.0,
            transparent: false,
            double_sided: false,
        }
    }

    pub fn line(color: Color) -> Self {
        Self {
            kind: MaterialKind::LineBasic,
            color,
            opacity: 1.0,
            transparent: false,
            double_sided: true,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self.transparent = opacity < 1.0;
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.double_sided = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// What a line overlay represents; disposal and picking treat them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    Outline,
    BoundsHelper,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodLevel {
    pub distance: f32,
    pub entity: Entity,
}

/// Distance-switched children. Levels are kept sorted by distance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LodLevels {
    levels: Vec<LodLevel>,
    active: usize,
}

impl LodLevels {
    pub fn push(&mut self, entity: Entity, distance: f32) {
        let index = self
            .levels
            .iter()
            .position(|level| level.distance > distance)
            .unwrap_or(self.levels.len());
        self.levels.insert(index, LodLevel { distance, entity });
    }

    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    pub fn active(&self) -> Option<Entity> {
        self.levels.get(self.active).map(|level| level.entity)
    }

    /// Picks the farthest level whose threshold is within `distance`.
    /// Returns true when the active level changed.
    pub fn select(&mut self, distance: f32) -> bool {
        let mut next = 0;
        for (index, level) in self.levels.iter().enumerate().skip(1) {
            if distance >= level.distance {
                next = index;
            } else {
                break;
            }
        }
        let changed = next != self.active;
        self.active = next;
        changed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh {
        geometry: GeometryHandle,
        materials: Vec<MaterialHandle>,
    },
    Lines {
        geometry: GeometryHandle,
        material: MaterialHandle,
        role: LineRole,
    },
    Lod(LodLevels),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub parent: Option<Entity>,
    pub children: Vec<Entity>,
    pub visible: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    /// Keeps catalog recoloring away from this node's materials.
    pub preserve_material: bool,
}

impl Node {
    fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            transform: Transform::IDENTITY,
            parent: None,
            children: Vec::new(),
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
            preserve_material: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub geometries_created: usize,
    pub geometries_destroyed: usize,
    pub materials_created: usize,
    pub materials_destroyed: usize,
    pub nodes_created: usize,
    pub nodes_destroyed: usize,
}

#[derive(Default)]
pub struct Engine {
    next_id: u32,
    nodes: HashMap<Entity, Node>,
    geometries: HashMap<GeometryHandle, Geometry>,
    materials: HashMap<MaterialHandle, Material>,
    stats: ResourceStats,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn stats(&self) -> ResourceStats {
        self.stats
    }

    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn live_nodes(&self) -> usize {
        self.nodes.len()
    }

    // --------------------------------------------------------------------
    // Resources
    // --------------------------------------------------------------------

    pub fn create_geometry(&mut self, geometry: Geometry) -> GeometryHandle {
        let handle = GeometryHandle(self.allocate_id());
        self.geometries.insert(handle, geometry);
        self.stats.geometries_created += 1;
        handle
    }

    pub fn geometry(&self, handle: GeometryHandle) -> Option<&Geometry> {
        self.geometries.get(&handle)
    }

    pub fn destroy_geometry(&mut self, handle: GeometryHandle) -> bool {
        let removed = self.geometries.remove(&handle).is_some();
        if removed {
            self.stats.geometries_destroyed += 1;
        }
        removed
    }

    pub fn create_material(&mut self, material: Material) -> MaterialHandle {
        let handle = MaterialHandle(self.allocate_id());
        self.materials.insert(handle, material);
        self.stats.materials_created += 1;
        handle
    }

    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(&handle)
    }

    pub fn material_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(&handle)
    }

    pub fn destroy_material(&mut self, handle: MaterialHandle) -> bool {
        let removed = self.materials.remove(&handle).is_some();
        if removed {
            self.stats.materials_destroyed += 1;
        }
        removed
    }

    // --------------------------------------------------------------------
    // Nodes
    // --------------------------------------------------------------------

    pub fn create_node(&mut self, name: &str, kind: NodeKind) -> Entity {
        let entity = Entity(self.allocate_id());
        self.nodes.insert(entity, Node::new(name, kind));
        self.stats.nodes_created += 1;
        entity
    }

    /// Creates a mesh node owning fresh geometry and material resources.
    pub fn create_mesh(&mut self, name: &str, geometry: Geometry, material: Material) -> Entity {
        let geometry = self.create_geometry(geometry);
        let material = self.create_material(material);
        self.create_node(
            name,
            NodeKind::Mesh {
                geometry,
                materials: vec![material],
            },
        )
    }

    pub fn create_lines(
        &mut self,
        name: &str,
        geometry: Geometry,
        material: Material,
        role: LineRole,
    ) -> Entity {
        let geometry = self.create_geometry(geometry);
        let material = self.create_material(material);
        self.create_node(
            name,
            NodeKind::Lines {
                geometry,
                material,
                role,
            },
        )
    }

    /// Swaps a mesh's geometry for a new one, releasing the old buffer.
    pub fn replace_mesh_geometry(&mut self, entity: Entity, geometry: Geometry) -> bool {
        let old = match self.nodes.get(&entity).map(|node| &node.kind) {
            Some(NodeKind::Mesh { geometry, .. }) => *geometry,
            _ => return false,
        };
        let handle = self.create_geometry(geometry);
        if let Some(Node {
            kind: NodeKind::Mesh { geometry, .. },
            ..
        }) = self.nodes.get_mut(&entity)
        {
            *geometry = handle;
        }
        self.destroy_geometry(old);
        true
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.nodes.contains_key(&entity)
    }

    pub fn node(&self, entity: Entity) -> Option<&Node> {
        self.nodes.get(&entity)
    }

    pub fn node_mut(&mut self, entity: Entity) -> Option<&mut Node> {
        self.nodes.get_mut(&entity)
    }

    pub fn set_transform(&mut self, entity: Entity, transform: Transform) -> bool {
        match self.nodes.get_mut(&entity) {
            Some(node) => {
                node.transform = transform;
                true
            }
            None => false,
        }
    }

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.nodes.get(&entity).and_then(|node| node.parent)
    }

    /// Re-parents `child` under `parent`, detaching it from any previous parent.
    pub fn add_child(&mut self, parent: Entity, child: Entity) -> bool {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return false;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        true
    }

    pub fn add_lod_level(&mut self, lod: Entity, child: Entity, distance: f32) -> bool {
        if !matches!(self.node(lod).map(|n| &n.kind), Some(NodeKind::Lod(_))) {
            return false;
        }
        if !self.add_child(lod, child) {
            return false;
        }
        if let Some(Node {
            kind: NodeKind::Lod(levels),
            ..
        }) = self.nodes.get_mut(&lod)
        {
            levels.push(child, distance);
        }
        true
    }

    pub fn detach(&mut self, child: Entity) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|&c| c != child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
        }
    }

    /// Removes a single node. Children and resources are left alone; see
    /// `render::dispose` for the recursive teardown.
    pub fn destroy_node(&mut self, entity: Entity) -> Option<Node> {
        self.detach(entity);
        let node = self.nodes.remove(&entity)?;
        for child in &node.children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = None;
            }
        }
        self.stats.nodes_destroyed += 1;
        Some(node)
    }

    /// The node followed by all of its descendants, depth first.
    pub fn descendants(&self, root: Entity) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(entity) = stack.pop() {
            let Some(node) = self.nodes.get(&entity) else {
                continue;
            };
            out.push(entity);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    pub fn world_matrix(&self, entity: Entity) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(entity);
        while let Some(e) = current {
            let Some(node) = self.nodes.get(&e) else {
                break;
            };
            matrix = node.transform.matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// World-space bounds of every geometry under `root`, LOD levels included.
    pub fn world_bounds(&self, root: Entity) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        self.visit(root, self.parent_matrix(root), false, &mut |_, node, world| {
            if let Some(handle) = node_geometry(node) {
                if let Some(geometry) = self.geometries.get(&handle) {
                    bounds = bounds.union(&geometry.bounds().transformed(&world));
                }
            }
        });
        bounds
    }

    fn parent_matrix(&self, entity: Entity) -> Mat4 {
        self.parent(entity)
            .map(|parent| self.world_matrix(parent))
            .unwrap_or(Mat4::IDENTITY)
    }

    /// Visits the subtree under `root` with world matrices. With
    /// `rendered_only`, hidden nodes and inactive LOD levels are skipped.
    pub fn visit(
        &self,
        root: Entity,
        parent_world: Mat4,
        rendered_only: bool,
        f: &mut dyn FnMut(Entity, &Node, Mat4),
    ) {
        let Some(node) = self.nodes.get(&root) else {
            return;
        };
        if rendered_only && !node.visible {
            return;
        }
        let world = parent_world * node.transform.matrix();
        f(root, node, world);
        let active = match &node.kind {
            NodeKind::Lod(levels) if rendered_only => levels.active(),
            _ => None,
        };
        for &child in &node.children {
            if let (NodeKind::Lod(levels), true) = (&node.kind, rendered_only) {
                let is_level = levels.levels().iter().any(|level| level.entity == child);
                if is_level && Some(child) != active {
                    continue;
                }
            }
            self.visit(child, world, rendered_only, f);
        }
    }
}

pub(crate) fn node_geometry(node: &Node) -> Option<GeometryHandle> {
    match &node.kind {
        NodeKind::Mesh { geometry, .. } | NodeKind::Lines { geometry, .. } => Some(*geometry),
        NodeKind::Group | NodeKind::Lod(_) => None,
    }
}

/// Root set of a renderable scene.
#[derive(Debug, Default)]
pub struct Scene {
    roots: Vec<Entity>,
    pub background: Color,
}

impl Scene {
    pub fn new(background: Color) -> Self {
        Self {
            roots: Vec::new(),
            background,
        }
    }

    pub fn add_entity(&mut self, entity: Entity) {
        if !self.roots.contains(&entity) {
            self.roots.push(entity);
        }
    }

    pub fn remove_entity(&mut self, entity: Entity) -> bool {
        let before = self.roots.len();
        self.roots.retain(|&root| root != entity);
        before != self.roots.len()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.roots.contains(&entity)
    }

    pub fn roots(&self) -> &[Entity] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }
}
