//! Furniture record to scene node.
//!
//! Primitives become a single box mesh at the node root. Catalog models
//! become a LOD node with a near and a far instance of the model, each
//! scaled so the model's natural bounds match the record's dimensions.
//! Every call allocates fresh geometry and materials; the caller owns them.

use crate::catalog::{Catalog, CatalogEntry, ModelNode};
use crate::color::Color;
use crate::config::EditorConfig;
use crate::engine::{Engine, Entity, LineRole, LodLevels, Material, MaterialKind, NodeKind, Transform};
use crate::render::geometry::{aabb_lines, box_edges, box_geometry, Aabb, GeometryError};
use crate::scene::{Furniture, FurnitureKind};
use glam::{Quat, Vec3};

const MIN_NATURAL_EXTENT: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    /// A single box mesh at the root: primitives and unresolved models.
    Box { outline: Option<Entity> },
    /// LOD root with near and far levels.
    Model {
        near: Entity,
        far: Entity,
        bounds_helper: Option<Entity>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FurnitureNode {
    pub root: Entity,
    pub shape: NodeShape,
}

impl FurnitureNode {
    pub fn is_model(&self) -> bool {
        matches!(self.shape, NodeShape::Model { .. })
    }

    /// Selection overlay currently attached, if any.
    pub fn overlay(&self) -> Option<Entity> {
        match self.shape {
            NodeShape::Box { outline } => outline,
            NodeShape::Model { bounds_helper, .. } => bounds_helper,
        }
    }
}

pub struct MeshFactory<'a> {
    catalog: &'a Catalog,
    config: &'a EditorConfig,
}

impl<'a> MeshFactory<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a EditorConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &EditorConfig {
        self.config
    }

    pub fn build(&self, engine: &mut Engine, furniture: &Furniture, selected: bool) -> FurnitureNode {
        match &furniture.kind {
            FurnitureKind::Primitive(_) => self.build_box(engine, furniture, selected, false),
            FurnitureKind::CatalogModel(key) => {
                let Some(entry) = self.catalog.get(key) else {
                    log::warn!(
                        "Unknown model type {key:?} for furniture {:?}; using a box",
                        furniture.id
                    );
                    return self.build_box(engine, furniture, selected, true);
                };
                match self.build_model(engine, furniture, entry, selected) {
                    Ok(node) => node,
                    Err(err) => {
                        log::warn!(
                            "Failed to build model {key:?} for furniture {:?}: {err}; using a box",
                            furniture.id
                        );
                        self.build_box(engine, furniture, selected, true)
                    }
                }
            }
        }
    }

    fn build_box(
        &self,
        engine: &mut Engine,
        furniture: &Furniture,
        selected: bool,
        honor_elevation: bool,
    ) -> FurnitureNode {
        let size = furniture.dimensions.to_vec3();
        let root = engine.create_mesh(
            &furniture.name,
            box_geometry(size),
            self.box_material(furniture.color, selected),
        );
        engine.set_transform(root, node_transform(furniture, honor_elevation));
        set_shadows(engine, root);
        let outline = selected.then(|| self.attach_outline(engine, root, size));
        FurnitureNode {
            root,
            shape: NodeShape::Box { outline },
        }
    }

    fn build_model(
        &self,
        engine: &mut Engine,
        furniture: &Furniture,
        entry: &CatalogEntry,
        selected: bool,
    ) -> Result<FurnitureNode, GeometryError> {
        // Build both levels before allocating anything in the engine.
        let detailed = (entry.build_detailed)()?;
        let coarse = entry.build_far()?;

        let natural = detailed.natural_bounds();
        let target = furniture.dimensions.to_vec3();
        let scale = fit_scale(&natural, target);
        let level_transform = Transform::from_translation(-natural.center() * scale).with_scale(scale);

        let root = engine.create_node(&furniture.name, NodeKind::Lod(LodLevels::default()));
        engine.set_transform(root, node_transform(furniture, true));

        let near = engine.create_node("near", NodeKind::Group);
        engine.set_transform(near, level_transform);
        let model = self.instantiate(engine, &detailed, furniture.color, selected);
        engine.add_child(near, model);

        let far = engine.create_node("far", NodeKind::Group);
        engine.set_transform(far, level_transform);
        let model = self.instantiate(engine, &coarse, furniture.color, selected);
        engine.add_child(far, model);

        engine.add_lod_level(root, near, 0.0);
        engine.add_lod_level(root, far, self.config.lod_far_distance);

        let bounds_helper = selected.then(|| {
            let helper = engine.create_lines(
                "bounds helper",
                aabb_lines(&Aabb::from_center_size(Vec3::ZERO, target)),
                Material::line(self.config.bounds_helper_color),
                LineRole::BoundsHelper,
            );
            engine.add_child(root, helper);
            helper
        });

        Ok(FurnitureNode {
            root,
            shape: NodeShape::Model {
                near,
                far,
                bounds_helper,
            },
        })
    }

    fn instantiate(&self, engine: &mut Engine, node: &ModelNode, color: Color, selected: bool) -> Entity {
        let entity = match &node.part {
            Some(part) => {
                let mut material = part.material;
                if material.kind == MaterialKind::Lambert && !node.preserve_material {
                    material.color = color;
                    material.transparent = selected;
                    material.opacity = self.opacity(selected);
                }
                let entity = engine.create_mesh(node.name, part.geometry.clone(), material);
                if let Some(created) = engine.node_mut(entity) {
                    created.cast_shadow = true;
                    created.receive_shadow = true;
                    created.preserve_material = node.preserve_material;
                }
                entity
            }
            None => engine.create_node(node.name, NodeKind::Group),
        };
        engine.set_transform(entity, node.transform);
        for child in &node.children {
            let child = self.instantiate(engine, child, color, selected);
            engine.add_child(entity, child);
        }
        entity
    }

    pub fn box_material(&self, color: Color, selected: bool) -> Material {
        let color = if selected {
            self.config.highlight_color
        } else {
            color
        };
        let mut material = Material::lambert(color).with_opacity(self.opacity(selected));
        material.transparent = true;
        material
    }

    fn opacity(&self, selected: bool) -> f32 {
        if selected {
            self.config.selected_opacity
        } else {
            self.config.unselected_opacity
        }
    }

    /// Adds the black edge overlay for a selected box.
    pub fn attach_outline(&self, engine: &mut Engine, root: Entity, size: Vec3) -> Entity {
        let outline = engine.create_lines(
            "outline",
            box_edges(size),
            Material::line(self.config.outline_color),
            LineRole::Outline,
        );
        engine.add_child(root, outline);
        outline
    }
}

/// Center of the record's box with its yaw. Primitives always stand on the
/// floor; models and their fallback honor `position.y` as an elevation.
pub fn node_transform(furniture: &Furniture, honor_elevation: bool) -> Transform {
    let p = furniture.position;
    let d = furniture.dimensions;
    let base = if honor_elevation { p.y } else { 0.0 };
    Transform::from_translation(Vec3::new(p.x + d.x / 2.0, base + d.y / 2.0, p.z + d.z / 2.0))
        .with_rotation(Quat::from_rotation_y(furniture.rotation.to_radians()))
}

fn fit_scale(natural: &Aabb, target: Vec3) -> Vec3 {
    let size = natural.size();
    let axis = |target: f32, natural: f32| {
        if natural > MIN_NATURAL_EXTENT {
            target / natural
        } else {
            1.0
        }
    };
    Vec3::new(
        axis(target.x, size.x),
        axis(target.y, size.y),
        axis(target.z, size.z),
    )
}

fn set_shadows(engine: &mut Engine, entity: Entity) {
    if let Some(node) = engine.node_mut(entity) {
        node.cast_shadow = true;
        node.receive_shadow = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{PrimitiveShape, Vector3};
    use approx::assert_relative_eq;

    fn record(kind: FurnitureKind) -> Furniture {
        Furniture {
            id: "a".into(),
            name: "item".into(),
            kind,
            position: Vector3::new(0.0, 0.0, 0.0),
            dimensions: Vector3::new(80.0, 80.0, 80.0),
            color: Color::from_u32(0x336699),
            rotation: 0.0,
        }
    }

    fn material_of(engine: &Engine, entity: Entity) -> Material {
        match &engine.node(entity).unwrap().kind {
            NodeKind::Mesh { materials, .. } => *engine.material(materials[0]).unwrap(),
            other => panic!("expected mesh, got {other:?}"),
        }
    }

    #[test]
    fn primitive_box_centered_on_its_footprint() {
        let config = EditorConfig::default();
        let factory = MeshFactory::new(Catalog::builtin(), &config);
        let mut engine = Engine::new();
        let node = factory.build(&mut engine, &record(FurnitureKind::Primitive(PrimitiveShape::Cube)), false);

        let root = engine.node(node.root).unwrap();
        assert_eq!(root.transform.translation, Vec3::new(40.0, 40.0, 40.0));
        assert!(root.cast_shadow && root.receive_shadow);
        assert_eq!(node.shape, NodeShape::Box { outline: None });

        let material = material_of(&engine, node.root);
        assert_eq!(material.color, Color::from_u32(0x336699));
        assert_relative_eq!(material.opacity, 0.9);
        assert!(material.transparent);
        assert_eq!(engine.world_bounds(node.root).size(), Vec3::splat(80.0));
    }

    #[test]
    fn primitive_ignores_elevation_and_applies_yaw() {
        let config = EditorConfig::default();
        let factory = MeshFactory::new(Catalog::builtin(), &config);
        let mut engine = Engine::new();
        let mut furniture = record(FurnitureKind::Primitive(PrimitiveShape::Rectangular));
        furniture.position = Vector3::new(10.0, 50.0, 20.0);
        furniture.rotation = 90.0;
        let node = factory.build(&mut engine, &furniture, false);
        let transform = engine.node(node.root).unwrap().transform;
        assert_eq!(transform.translation, Vec3::new(50.0, 40.0, 60.0));
        let turned = transform.rotation * Vec3::X;
        assert_relative_eq!(turned.z, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn selected_primitive_is_highlighted_with_outline() {
        let config = EditorConfig::default();
        let factory = MeshFactory::new(Catalog::builtin(), &config);
        let mut engine = Engine::new();
        let node = factory.build(&mut engine, &record(FurnitureKind::Primitive(PrimitiveShape::Cube)), true);

        let material = material_of(&engine, node.root);
        assert_eq!(material.color, Color::from_u32(0xff0000));
        assert_relative_eq!(material.opacity, 0.8);
        let NodeShape::Box { outline: Some(outline) } = node.shape else {
            panic!("missing outline");
        };
        assert!(matches!(
            engine.node(outline).unwrap().kind,
            NodeKind::Lines { role: LineRole::Outline, .. }
        ));
        assert_eq!(engine.parent(outline), Some(node.root));
    }

    #[test]
    fn catalog_model_fits_record_dimensions() {
        let config = EditorConfig::default();
        let factory = MeshFactory::new(Catalog::builtin(), &config);
        let mut engine = Engine::new();
        let mut furniture = record(FurnitureKind::CatalogModel("chair".into()));
        furniture.dimensions = Vector3::new(55.0, 50.0, 55.0);
        furniture.position = Vector3::new(100.0, 0.0, 200.0);
        let node = factory.build(&mut engine, &furniture, false);

        let NodeShape::Model { near, far, bounds_helper } = node.shape else {
            panic!("expected model");
        };
        assert!(bounds_helper.is_none());
        let near_bounds = engine.world_bounds(near);
        assert_relative_eq!(near_bounds.size().x, 55.0, epsilon = 1e-2);
        assert_relative_eq!(near_bounds.size().y, 50.0, epsilon = 1e-2);
        assert_relative_eq!(near_bounds.size().z, 55.0, epsilon = 1e-2);
        assert_relative_eq!(near_bounds.min.y, 0.0, epsilon = 1e-2);
        assert_relative_eq!(near_bounds.center().x, 127.5, epsilon = 1e-2);

        let far_bounds = engine.world_bounds(far);
        assert_relative_eq!(far_bounds.size().y, 50.0, epsilon = 0.5);

        let NodeKind::Lod(levels) = &engine.node(node.root).unwrap().kind else {
            panic!("expected lod root");
        };
        assert_eq!(levels.levels()[0].entity, near);
        assert_eq!(levels.levels()[1].entity, far);
        assert_relative_eq!(levels.levels()[1].distance, 500.0);
    }

    #[test]
    fn catalog_model_recolors_all_but_preserved_parts() {
        let config = EditorConfig::default();
        let factory = MeshFactory::new(Catalog::builtin(), &config);
        let mut engine = Engine::new();
        let mut furniture = record(FurnitureKind::CatalogModel("blackboard".into()));
        furniture.color = Color::from_u32(0x00ff00);
        let node = factory.build(&mut engine, &furniture, true);

        let mut preserved = 0;
        let mut recolored = 0;
        for entity in engine.descendants(node.root) {
            let node = engine.node(entity).unwrap();
            if let NodeKind::Mesh { materials, .. } = &node.kind {
                let material = engine.material(materials[0]).unwrap();
                if node.preserve_material {
                    preserved += 1;
                    assert_eq!(material.color, Color::BLACK);
                } else {
                    recolored += 1;
                    assert_eq!(material.color, Color::from_u32(0x00ff00));
                    assert!(material.transparent);
                }
            }
        }
        assert_eq!(preserved, 2);
        assert!(recolored > 0);
        assert!(node.overlay().is_some());
    }

    #[test]
    fn unknown_model_falls_back_to_a_box() {
        let config = EditorConfig::default();
        let factory = MeshFactory::new(Catalog::builtin(), &config);
        let mut engine = Engine::new();
        let mut furniture = record(FurnitureKind::CatalogModel("doesNotExist".into()));
        furniture.position = Vector3::new(0.0, 20.0, 0.0);
        let node = factory.build(&mut engine, &furniture, false);

        assert!(!node.is_model());
        let bounds = engine.world_bounds(node.root);
        assert_eq!(bounds.size(), Vec3::splat(80.0));
        assert_eq!(bounds.center(), Vec3::new(40.0, 60.0, 40.0));
        assert_eq!(material_of(&engine, node.root).color, furniture.color);
    }

    #[test]
    fn model_levels_do_not_share_resources() {
        let config = EditorConfig::default();
        let factory = MeshFactory::new(Catalog::builtin(), &config);
        let mut engine = Engine::new();
        let furniture = record(FurnitureKind::CatalogModel("conditioner".into()));
        let node = factory.build(&mut engine, &furniture, false);
        let mut geometries = std::collections::HashSet::new();
        for entity in engine.descendants(node.root) {
            if let NodeKind::Mesh { geometry, .. } = engine.node(entity).unwrap().kind {
                assert!(geometries.insert(geometry), "geometry shared between meshes");
            }
        }
        assert_eq!(geometries.len(), engine.live_geometries());
        assert_eq!(engine.live_geometries(), engine.live_materials());
    }
}
