use crate::config::{EditorConfig, WallVariant};
use crate::engine::{Engine, Entity, LineRole, Material, Scene, Transform};
use crate::render::dispose::{dispose_all, DisposeReport};
use crate::render::geometry::{grid_lines, plane_geometry};
use crate::scene::RoomDimensions;
use glam::{Quat, Vec3};
use std::f32::consts::{FRAC_PI_2, PI};

/// Lifts the grid above the floor plane to keep it from z-fighting.
const GRID_LIFT: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallSide {
    Back,
    Front,
    Left,
    Right,
}

impl WallSide {
    pub fn for_variant(variant: WallVariant) -> &'static [WallSide] {
        match variant {
            WallVariant::Four => &[WallSide::Back, WallSide::Front, WallSide::Left, WallSide::Right],
            WallVariant::Two => &[WallSide::Back, WallSide::Left],
        }
    }

    fn name(self) -> &'static str {
        match self {
            WallSide::Back => "back wall",
            WallSide::Front => "front wall",
            WallSide::Left => "left wall",
            WallSide::Right => "right wall",
        }
    }

    /// Plane width, placement and yaw of this wall. Walls sit half their
    /// thickness inside the room outline.
    fn placement(self, dims: RoomDimensions, thickness: f32) -> (f32, Vec3, f32) {
        let (w, d, h) = (dims.width, dims.depth, dims.height);
        let half = thickness / 2.0;
        match self {
            WallSide::Back => (w, Vec3::new(w / 2.0, h / 2.0, half), 0.0),
            WallSide::Front => (w, Vec3::new(w / 2.0, h / 2.0, d - half), PI),
            WallSide::Left => (d, Vec3::new(half, h / 2.0, d / 2.0), FRAC_PI_2),
            WallSide::Right => (d, Vec3::new(w - half, h / 2.0, d / 2.0), -FRAC_PI_2),
        }
    }
}

/// Floor, walls and grid of the current room.
#[derive(Debug, Default)]
pub struct RoomEnvelope {
    floor: Option<Entity>,
    walls: Vec<(WallSide, Entity)>,
    grid: Option<Entity>,
    dimensions: Option<RoomDimensions>,
}

impl RoomEnvelope {
    pub fn build(
        engine: &mut Engine,
        scene: &mut Scene,
        dimensions: RoomDimensions,
        config: &EditorConfig,
    ) -> Self {
        let dims = dimensions.clamped();
        let (w, d, h) = (dims.width, dims.depth, dims.height);

        let floor = engine.create_mesh(
            "floor",
            plane_geometry(w, d),
            Material::lambert(config.floor_color).double_sided(),
        );
        engine.set_transform(
            floor,
            Transform::from_translation(Vec3::new(w / 2.0, 0.0, d / 2.0))
                .with_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
        );
        if let Some(node) = engine.node_mut(floor) {
            node.receive_shadow = true;
        }
        scene.add_entity(floor);

        let wall_material = Material::lambert(config.wall_color)
            .with_opacity(config.wall_opacity)
            .double_sided();
        let mut walls = Vec::new();
        for &side in WallSide::for_variant(config.wall_variant) {
            let (width, position, yaw) = side.placement(dims, config.wall_thickness);
            let wall = engine.create_mesh(side.name(), plane_geometry(width, h), wall_material);
            engine.set_transform(
                wall,
                Transform::from_translation(position).with_rotation(Quat::from_rotation_y(yaw)),
            );
            if let Some(node) = engine.node_mut(wall) {
                node.receive_shadow = true;
            }
            scene.add_entity(wall);
            walls.push((side, wall));
        }

        let grid = engine.create_lines(
            "grid",
            grid_lines(w.max(d), config.grid_divisions as usize),
            Material::line(config.grid_color),
            LineRole::Grid,
        );
        engine.set_transform(
            grid,
            Transform::from_translation(Vec3::new(w / 2.0, GRID_LIFT, d / 2.0)),
        );
        scene.add_entity(grid);

        log::debug!(
            "Room envelope {}x{}x{} with {} walls",
            w,
            d,
            h,
            walls.len()
        );
        Self {
            floor: Some(floor),
            walls,
            grid: Some(grid),
            dimensions: Some(dims),
        }
    }

    pub fn dimensions(&self) -> Option<RoomDimensions> {
        self.dimensions
    }

    pub fn floor(&self) -> Option<Entity> {
        self.floor
    }

    pub fn grid(&self) -> Option<Entity> {
        self.grid
    }

    pub fn wall(&self, side: WallSide) -> Option<Entity> {
        self.walls
            .iter()
            .find(|(candidate, _)| *candidate == side)
            .map(|(_, entity)| *entity)
    }

    pub fn nodes(&self) -> impl Iterator<Item = Entity> + '_ {
        self.floor
            .iter()
            .copied()
            .chain(self.walls.iter().map(|(_, entity)| *entity))
            .chain(self.grid.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every envelope node from the scene and frees it. A second
    /// call finds nothing left to release.
    pub fn dispose(&mut self, engine: &mut Engine, scene: &mut Scene) -> DisposeReport {
        let nodes: Vec<Entity> = self.nodes().collect();
        for &entity in &nodes {
            scene.remove_entity(entity);
        }
        let report = dispose_all(engine, nodes);
        self.floor = None;
        self.walls.clear();
        self.grid = None;
        self.dimensions = None;
        report
    }
}
