use crate::engine::{Engine, Entity, LineRole, NodeKind};

/// What a disposal pass released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisposeReport {
    pub nodes: usize,
    pub meshes: usize,
    pub outlines: usize,
    pub bounds_helpers: usize,
    pub grids: usize,
    pub geometries: usize,
    pub materials: usize,
}

impl DisposeReport {
    pub fn is_empty(&self) -> bool {
        self.nodes == 0
    }

    fn merge(&mut self, other: DisposeReport) {
        self.nodes += other.nodes;
        self.meshes += other.meshes;
        self.outlines += other.outlines;
        self.bounds_helpers += other.bounds_helpers;
        self.grids += other.grids;
        self.geometries += other.geometries;
        self.materials += other.materials;
    }
}

/// Detaches `root` from its parent and releases it together with every
/// descendant and the geometry and materials they own.
///
/// Works on whatever is still present: an already disposed or unknown entity
/// yields an empty report.
pub fn dispose(engine: &mut Engine, root: Entity) -> DisposeReport {
    let mut report = DisposeReport::default();
    for entity in engine.descendants(root) {
        let Some(node) = engine.destroy_node(entity) else {
            continue;
        };
        report.nodes += 1;
        match node.kind {
            NodeKind::Mesh {
                geometry,
                materials,
            } => {
                report.meshes += 1;
                report.geometries += usize::from(engine.destroy_geometry(geometry));
                for material in materials {
                    report.materials += usize::from(engine.destroy_material(material));
                }
            }
            NodeKind::Lines {
                geometry,
                material,
                role,
            } => {
                match role {
                    LineRole::Outline => report.outlines += 1,
                    LineRole::BoundsHelper => report.bounds_helpers += 1,
                    LineRole::Grid => report.grids += 1,
                }
                report.geometries += usize::from(engine.destroy_geometry(geometry));
                report.materials += usize::from(engine.destroy_material(material));
            }
            NodeKind::Group | NodeKind::Lod(_) => {}
        }
    }
    report
}

pub fn dispose_all(engine: &mut Engine, roots: impl IntoIterator<Item = Entity>) -> DisposeReport {
    let mut report = DisposeReport::default();
    for root in roots {
        report.merge(dispose(engine, root));
    }
    report
}
