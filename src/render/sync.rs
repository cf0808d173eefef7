//! Reconciliation of furniture nodes against the latest room snapshot.
//!
//! Policy:
//! 1. Nodes whose id left the list are removed from the scene and disposed.
//! 2. New ids are built and registered.
//! 3. Existing primitives are updated in place (transform, size, material,
//!    outline overlay). Catalog models, unresolved models and kind changes
//!    are disposed and rebuilt.
//! 4. Entries whose record and selection flag are unchanged are not touched,
//!    so a selection flip mutates exactly the old and the new selected node.

use crate::engine::{Engine, Entity, NodeKind, Scene};
use crate::render::dispose::{dispose, dispose_all, DisposeReport};
use crate::render::geometry::box_geometry;
use crate::render::mesh_factory::{node_transform, MeshFactory, NodeShape};
use crate::render::registry::{NodeRegistry, RegistryEntry};
use crate::scene::Furniture;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub rebuilt: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl SyncReport {
    pub fn touched(&self) -> usize {
        self.created + self.updated + self.rebuilt + self.removed
    }
}

pub fn reconcile(
    engine: &mut Engine,
    scene: &mut Scene,
    registry: &mut NodeRegistry,
    factory: &MeshFactory<'_>,
    furniture: &[Furniture],
    selected_id: Option<&str>,
) -> SyncReport {
    let mut report = SyncReport::default();

    let live: HashSet<&str> = furniture.iter().map(|item| item.id.as_str()).collect();
    let selected_id = selected_id.filter(|id| {
        let known = live.contains(id);
        if !known {
            log::debug!("Selection {id:?} is not in the room; rendering nothing selected");
        }
        known
    });

    let stale: Vec<String> = registry
        .ids()
        .filter(|id| !live.contains(id))
        .map(str::to_string)
        .collect();
    for id in stale {
        if let Some(entry) = registry.remove(&id) {
            scene.remove_entity(entry.node.root);
            dispose(engine, entry.node.root);
            report.removed += 1;
        }
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(furniture.len());
    for record in furniture {
        if !seen.insert(record.id.as_str()) {
            log::warn!("Duplicate furniture id {:?}; keeping the first record", record.id);
            report.skipped += 1;
            continue;
        }
        let selected = selected_id == Some(record.id.as_str());

        let Some(entry) = registry.get(&record.id) else {
            let node = factory.build(engine, record, selected);
            scene.add_entity(node.root);
            registry.insert(
                engine,
                RegistryEntry {
                    node,
                    record: record.clone(),
                    selected,
                },
            );
            report.created += 1;
            continue;
        };

        if entry.record == *record && entry.selected == selected {
            report.unchanged += 1;
            continue;
        }

        let in_place = record.kind.is_primitive()
            && entry.record.kind.is_primitive()
            && matches!(entry.node.shape, NodeShape::Box { .. });
        if in_place {
            update_primitive(engine, registry, factory, record, selected);
            report.updated += 1;
        } else {
            rebuild(engine, scene, registry, factory, record, selected);
            report.rebuilt += 1;
        }
    }

    log::debug!(
        "Reconciled {} furniture nodes: {} created, {} updated, {} rebuilt, {} removed",
        registry.len(),
        report.created,
        report.updated,
        report.rebuilt,
        report.removed
    );
    report
}

/// Removes and disposes every registered furniture node.
pub fn clear_all(engine: &mut Engine, scene: &mut Scene, registry: &mut NodeRegistry) -> DisposeReport {
    let roots: Vec<Entity> = registry.drain().map(|(_, entry)| entry.node.root).collect();
    for &root in &roots {
        scene.remove_entity(root);
    }
    dispose_all(engine, roots)
}

fn rebuild(
    engine: &mut Engine,
    scene: &mut Scene,
    registry: &mut NodeRegistry,
    factory: &MeshFactory<'_>,
    record: &Furniture,
    selected: bool,
) {
    if let Some(old) = registry.remove(&record.id) {
        scene.remove_entity(old.node.root);
        dispose(engine, old.node.root);
    }
    let node = factory.build(engine, record, selected);
    scene.add_entity(node.root);
    registry.insert(
        engine,
        RegistryEntry {
            node,
            record: record.clone(),
            selected,
        },
    );
}

fn update_primitive(
    engine: &mut Engine,
    registry: &mut NodeRegistry,
    factory: &MeshFactory<'_>,
    record: &Furniture,
    selected: bool,
) {
    let Some(entry) = registry.get(&record.id) else {
        return;
    };
    let root = entry.node.root;
    let mut outline = entry.node.overlay();
    let resized = entry.record.dimensions != record.dimensions;
    let size = record.dimensions.to_vec3();

    engine.set_transform(root, node_transform(record, false));
    if resized {
        engine.replace_mesh_geometry(root, box_geometry(size));
    }

    let material = factory.box_material(record.color, selected);
    let handles = match engine.node(root).map(|node| &node.kind) {
        Some(NodeKind::Mesh { materials, .. }) => materials.clone(),
        _ => Vec::new(),
    };
    for handle in handles {
        if let Some(slot) = engine.material_mut(handle) {
            *slot = material;
        }
    }

    // A resized outline is rebuilt rather than patched.
    if let Some(current) = outline {
        if !selected || resized {
            registry.untag(current);
            dispose(engine, current);
            outline = None;
        }
    }
    if selected && outline.is_none() {
        let created = factory.attach_outline(engine, root, size);
        registry.tag_subtree(engine, created, &record.id);
        outline = Some(created);
    }

    if let Some(entry) = registry.get_mut(&record.id) {
        entry.node.shape = NodeShape::Box { outline };
        entry.record = record.clone();
        entry.selected = selected;
    }
}
