use crate::engine::{Engine, Entity, NodeKind};
use glam::Vec3;

/// Selects the active level of every LOD node in `lod_roots` from its
/// distance to the camera. Returns how many nodes switched level.
///
/// Runs once per frame, so it must stay allocation free.
pub fn update_lod(
    engine: &mut Engine,
    lod_roots: impl IntoIterator<Item = Entity>,
    camera_position: Vec3,
) -> usize {
    let mut switched = 0;
    for root in lod_roots {
        let position = engine.world_matrix(root).w_axis.truncate();
        let distance = position.distance(camera_position);
        if let Some(node) = engine.node_mut(root) {
            if let NodeKind::Lod(levels) = &mut node.kind {
                if levels.select(distance) {
                    switched += 1;
                }
            }
        }
    }
    switched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::color::Color;
    use crate::config::EditorConfig;
    use crate::render::mesh_factory::{MeshFactory, NodeShape};
    use crate::scene::{Furniture, FurnitureKind, Vector3};

    fn chair_at(engine: &mut Engine, config: &EditorConfig) -> (Entity, Entity, Entity) {
        let factory = MeshFactory::new(Catalog::builtin(), config);
        let furniture = Furniture {
            id: "chair".into(),
            name: "chair".into(),
            kind: FurnitureKind::CatalogModel("chair".into()),
            position: Vector3::new(0.0, 0.0, 0.0),
            dimensions: Vector3::new(50.0, 50.0, 50.0),
            color: Color::WHITE,
            rotation: 0.0,
        };
        let node = factory.build(engine, &furniture, false);
        let NodeShape::Model { near, far, .. } = node.shape else {
            panic!("expected model");
        };
        (node.root, near, far)
    }

    fn active(engine: &Engine, root: Entity) -> Option<Entity> {
        match &engine.node(root)?.kind {
            NodeKind::Lod(levels) => levels.active(),
            _ => None,
        }
    }

    #[test]
    fn switches_to_far_level_past_threshold() {
        let config = EditorConfig::default();
        let mut engine = Engine::new();
        let (root, near, far) = chair_at(&mut engine, &config);
        let center = Vec3::new(25.0, 25.0, 25.0);

        assert_eq!(update_lod(&mut engine, [root], center + Vec3::new(0.0, 0.0, 100.0)), 0);
        assert_eq!(active(&engine, root), Some(near));

        assert_eq!(update_lod(&mut engine, [root], center + Vec3::new(0.0, 0.0, 600.0)), 1);
        assert_eq!(active(&engine, root), Some(far));

        assert_eq!(update_lod(&mut engine, [root], center + Vec3::new(0.0, 0.0, 499.0)), 1);
        assert_eq!(active(&engine, root), Some(near));
    }

    #[test]
    fn threshold_is_configurable() {
        let config = EditorConfig {
            lod_far_distance: 1000.0,
            ..EditorConfig::default()
        };
        let mut engine = Engine::new();
        let (root, near, _) = chair_at(&mut engine, &config);
        update_lod(&mut engine, [root], Vec3::new(25.0, 25.0, 825.0));
        assert_eq!(active(&engine, root), Some(near));
    }

    #[test]
    fn ignores_non_lod_and_missing_nodes() {
        let mut engine = Engine::new();
        let group = engine.create_node("group", NodeKind::Group);
        let gone = engine.create_node("gone", NodeKind::Group);
        engine.destroy_node(gone);
        assert_eq!(update_lod(&mut engine, [group, gone], Vec3::ZERO), 0);
    }
}
