use super::{lambert, CatalogEntry, ModelNode};
use crate::render::geometry::{
    box_geometry, cylinder_geometry, extrude_geometry, GeometryError, Path, Shape,
};
use glam::{Quat, Vec3};
use std::f32::consts::{FRAC_PI_2, TAU};

pub(super) const OLD_ENTRY: CatalogEntry = CatalogEntry {
    key: "old_radiator",
    display_name: "Чугунный радиатор",
    width_cm: 80.0,
    depth_cm: 10.0,
    height_cm: 60.0,
    price_units: 9000,
    preview_asset_path: "previews/old_radiator.png",
    build_detailed: build_old_detailed,
    build_coarse: Some(build_old_coarse),
};

pub(super) const MODERN_ENTRY: CatalogEntry = CatalogEntry {
    key: "modern_radiator",
    display_name: "Современный радиатор",
    width_cm: 100.0,
    depth_cm: 10.0,
    height_cm: 50.0,
    price_units: 15000,
    preview_asset_path: "previews/modern_radiator.png",
    build_detailed: build_modern_detailed,
    build_coarse: Some(build_modern_coarse),
};

const METAL_COLOR: u32 = 0xeae6ca;

// Cast-iron unit, natural units are centimeters.
const SECTIONS: usize = 8;
const SECTION_WIDTH: f32 = 8.0;
const SECTION_GAP: f32 = 2.0;
const SECTION_HEIGHT: f32 = 60.0;
const SECTION_DEPTH: f32 = 10.0;

fn old_total_width() -> f32 {
    SECTIONS as f32 * (SECTION_WIDTH + SECTION_GAP) - SECTION_GAP
}

/// Rounded section with two round openings.
fn section_shape() -> Shape {
    let mut shape = Shape::rounded_rect(0.0, 0.0, SECTION_WIDTH, SECTION_HEIGHT, 2.0);
    for y in [SECTION_HEIGHT * 0.35, SECTION_HEIGHT * 0.65] {
        let mut hole = Path::new();
        hole.absarc(SECTION_WIDTH / 2.0, y, 1.5, 0.0, TAU, false);
        shape.holes.push(hole);
    }
    shape
}

fn pipe(length: f32, y: f32, radial_segments: usize) -> ModelNode {
    ModelNode::mesh(
        "pipe",
        cylinder_geometry(SECTION_DEPTH / 12.0, SECTION_DEPTH / 12.0, length, radial_segments),
        lambert(METAL_COLOR),
    )
    .rotated(Quat::from_rotation_z(FRAC_PI_2))
    .at(0.0, y, SECTION_DEPTH / 2.0)
}

fn build_old_detailed() -> Result<ModelNode, GeometryError> {
    let total = old_total_width();
    let geometry = extrude_geometry(&section_shape(), SECTION_DEPTH)?;
    let mut radiator = ModelNode::group("old radiator");
    for i in 0..SECTIONS {
        let x = -total / 2.0 + i as f32 * (SECTION_WIDTH + SECTION_GAP);
        radiator.add(ModelNode::mesh("section", geometry.clone(), lambert(METAL_COLOR)).at(x, 0.0, 0.0));
    }
    radiator.add(pipe(total, 5.0, 16));
    radiator.add(pipe(total, SECTION_HEIGHT - 5.0, 16));
    Ok(radiator)
}

fn build_old_coarse() -> Result<ModelNode, GeometryError> {
    let total = old_total_width();
    Ok(ModelNode::group("old radiator")
        .with_child(
            ModelNode::mesh(
                "sections",
                box_geometry(Vec3::new(total, SECTION_HEIGHT, SECTION_DEPTH)),
                lambert(METAL_COLOR),
            )
            .at(0.0, SECTION_HEIGHT / 2.0, SECTION_DEPTH / 2.0),
        )
        .with_child(pipe(total, 5.0, 6))
        .with_child(pipe(total, SECTION_HEIGHT - 5.0, 6)))
}

// Panel unit.
const PANEL_WIDTH: f32 = 100.0;
const PANEL_HEIGHT: f32 = 50.0;
const PANEL_DEPTH: f32 = 4.0;

fn build_modern_detailed() -> Result<ModelNode, GeometryError> {
    let panel = extrude_geometry(
        &Shape::rounded_rect(-PANEL_WIDTH / 2.0, 0.0, PANEL_WIDTH, PANEL_HEIGHT, 2.0),
        PANEL_DEPTH,
    )?;
    let mut radiator = ModelNode::group("modern radiator")
        .with_child(ModelNode::mesh("panel", panel, lambert(METAL_COLOR)).at(0.0, 0.0, 6.0));
    for i in 0..12 {
        let x = -PANEL_WIDTH / 2.0 + 6.0 + i as f32 * (PANEL_WIDTH - 12.0) / 11.0;
        radiator.add(
            ModelNode::mesh("fin", box_geometry(Vec3::new(0.6, PANEL_HEIGHT - 6.0, 5.0)), lambert(METAL_COLOR))
                .at(x, PANEL_HEIGHT / 2.0, 3.5),
        );
    }
    radiator.add(
        ModelNode::mesh("valve", cylinder_geometry(1.67, 1.67, 8.0, 16), lambert(METAL_COLOR))
            .at(PANEL_WIDTH / 2.0 - 3.0, -4.0, 8.0),
    );
    Ok(radiator)
}

fn build_modern_coarse() -> Result<ModelNode, GeometryError> {
    Ok(ModelNode::group("modern radiator")
        .with_child(
            ModelNode::mesh(
                "panel",
                box_geometry(Vec3::new(PANEL_WIDTH, PANEL_HEIGHT, PANEL_DEPTH)),
                lambert(METAL_COLOR),
            )
            .at(0.0, PANEL_HEIGHT / 2.0, 8.0),
        )
        .with_child(
            ModelNode::mesh("valve", cylinder_geometry(1.67, 1.67, 8.0, 8), lambert(METAL_COLOR))
                .at(PANEL_WIDTH / 2.0 - 3.0, -4.0, 8.0),
        ))
}
