//! Ray picking of furniture nodes.
//!
//! A pointer position is normalized against the displayed surface rectangle,
//! turned into a camera ray and tested against the triangles of every
//! rendered mesh under the furniture roots. Inactive LOD levels and line
//! overlays are skipped. The nearest hit is resolved to its furniture id
//! through the registry's side table.

use crate::engine::{Engine, Entity, NodeKind};
use crate::render::camera::PerspectiveCamera;
use crate::render::geometry::Ray;
use crate::render::registry::NodeRegistry;
use glam::{Mat4, Vec2};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::MouseButton;

// ========================================================================
// Input types
// ========================================================================

/// Displayed rectangle of the render surface, in window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceBounds {
    pub origin: PhysicalPosition<f64>,
    pub size: PhysicalSize<u32>,
}

impl SurfaceBounds {
    pub fn new(left: f64, top: f64, width: u32, height: u32) -> Self {
        Self {
            origin: PhysicalPosition::new(left, top),
            size: PhysicalSize::new(width, height),
        }
    }

    pub fn from_size(size: PhysicalSize<u32>) -> Self {
        Self {
            origin: PhysicalPosition::new(0.0, 0.0),
            size,
        }
    }

    pub fn contains(&self, position: PhysicalPosition<f64>) -> bool {
        let x = position.x - self.origin.x;
        let y = position.y - self.origin.y;
        x >= 0.0 && y >= 0.0 && x <= self.size.width as f64 && y <= self.size.height as f64
    }

    /// Pointer position to normalized device coordinates, y up. `None` when
    /// the surface has no area or the pointer is outside it.
    pub fn to_ndc(&self, position: PhysicalPosition<f64>) -> Option<Vec2> {
        if self.size.width == 0 || self.size.height == 0 || !self.contains(position) {
            return None;
        }
        let x = (position.x - self.origin.x) / self.size.width as f64;
        let y = (position.y - self.origin.y) / self.size.height as f64;
        Some(Vec2::new((x * 2.0 - 1.0) as f32, (1.0 - y * 2.0) as f32))
    }

    /// Inverse of [`SurfaceBounds::to_ndc`].
    pub fn from_ndc(&self, ndc: Vec2) -> PhysicalPosition<f64> {
        PhysicalPosition::new(
            self.origin.x + (ndc.x as f64 + 1.0) * 0.5 * self.size.width as f64,
            self.origin.y + (1.0 - ndc.y as f64) * 0.5 * self.size.height as f64,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: PhysicalPosition<f64>,
    pub button: MouseButton,
}

impl PointerEvent {
    pub fn click(x: f64, y: f64) -> Self {
        Self {
            position: PhysicalPosition::new(x, y),
            button: MouseButton::Left,
        }
    }
}

// ========================================================================
// PickHit
// ========================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    pub furniture_id: String,
    pub entity: Entity,
    pub distance: f32,
}

/// Furniture id under the pointer, if any.
pub fn pick(
    event: &PointerEvent,
    bounds: &SurfaceBounds,
    camera: &PerspectiveCamera,
    engine: &Engine,
    registry: &NodeRegistry,
) -> Option<String> {
    pick_hit(event, bounds, camera, engine, registry).map(|hit| hit.furniture_id)
}

pub fn pick_hit(
    event: &PointerEvent,
    bounds: &SurfaceBounds,
    camera: &PerspectiveCamera,
    engine: &Engine,
    registry: &NodeRegistry,
) -> Option<PickHit> {
    let ndc = bounds.to_ndc(event.position)?;
    let ray = camera.ray_from_ndc(ndc);
    let (entity, distance) = nearest_hit(&ray, engine, registry.roots())?;
    let Some(owner) = registry.owner_of(engine, entity) else {
        log::debug!("Pick hit {entity:?} has no owning furniture");
        return None;
    };
    Some(PickHit {
        furniture_id: owner.to_string(),
        entity,
        distance,
    })
}

/// Nearest rendered mesh along `ray` under any of `roots`.
pub fn nearest_hit(
    ray: &Ray,
    engine: &Engine,
    roots: impl IntoIterator<Item = Entity>,
) -> Option<(Entity, f32)> {
    let mut best: Option<(Entity, f32)> = None;
    for root in roots {
        let bounds = engine.world_bounds(root);
        let Some(entry) = ray.intersect_aabb(&bounds) else {
            continue;
        };
        if best.is_some_and(|(_, t)| entry > t) {
            continue;
        }
        let parent = engine
            .parent(root)
            .map(|p| engine.world_matrix(p))
            .unwrap_or(Mat4::IDENTITY);
        engine.visit(root, parent, true, &mut |entity, node, world| {
            let NodeKind::Mesh { geometry, .. } = &node.kind else {
                return;
            };
            let Some(geometry) = engine.geometry(*geometry) else {
                return;
            };
            for tri in geometry.triangle_iter() {
                let tri = tri.map(|v| world.transform_point3(v));
                if let Some(t) = ray.intersect_triangle(tri) {
                    if best.map_or(true, |(_, best_t)| t < best_t) {
                        best = Some((entity, t));
                    }
                }
            }
        });
    }
    best
}
