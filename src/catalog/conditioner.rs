use super::{lambert, CatalogEntry, ModelNode};
use crate::render::geometry::{box_geometry, extrude_geometry, GeometryError, Shape};
use glam::{Quat, Vec3};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

pub(super) const ENTRY: CatalogEntry = CatalogEntry {
    key: "conditioner",
    display_name: "Кондиционер",
    width_cm: 90.0,
    depth_cm: 40.0,
    height_cm: 30.0,
    price_units: 32000,
    preview_asset_path: "previews/conditioner.png",
    build_detailed: build_detailed,
    build_coarse: Some(build_coarse),
};

const BODY_COLOR: u32 = 0xd9d7d7;
const GRILLE_COLOR: u32 = 0x808287;
const LENGTH: f32 = 1.0;

/// Side profile of the indoor unit: flat back at z = 0, rounded front below.
fn body_profile() -> Shape {
    let mut shape = Shape::new();
    shape
        .outline
        .move_to(0.0, 0.0)
        .line_to(0.22, 0.0)
        .quadratic_curve_to(0.3, 0.02, 0.3, 0.12)
        .line_to(0.28, 0.3)
        .line_to(0.0, 0.3);
    shape
}

/// Extrusion runs along -X after the quarter turn; shift it back to center.
fn body() -> Result<ModelNode, GeometryError> {
    let geometry = extrude_geometry(&body_profile(), LENGTH)?;
    Ok(ModelNode::mesh("body", geometry, lambert(BODY_COLOR))
        .rotated(Quat::from_rotation_y(-FRAC_PI_2))
        .at(LENGTH / 2.0, 0.0, 0.0))
}

fn build_detailed() -> Result<ModelNode, GeometryError> {
    let mut unit = ModelNode::group("conditioner");
    unit.add(body()?);

    for i in 0..8 {
        unit.add(
            ModelNode::mesh(
                "louvre",
                box_geometry(Vec3::new(LENGTH * 0.94, 0.004, 0.03)),
                lambert(GRILLE_COLOR),
            )
            .rotated(Quat::from_rotation_x(FRAC_PI_4))
            .at(0.0, 0.03 + i as f32 * 0.008, 0.25),
        );
    }
    for i in 0..14 {
        unit.add(
            ModelNode::mesh("grille rib", box_geometry(Vec3::new(0.005, 0.025, 0.02)), lambert(GRILLE_COLOR))
                .at(-0.42 + i as f32 * 0.065, 0.06, 0.27),
        );
    }
    unit.add(
        ModelNode::mesh("front panel", box_geometry(Vec3::new(LENGTH * 0.96, 0.14, 0.01)), lambert(BODY_COLOR))
            .at(0.0, 0.2, 0.285),
    );
    Ok(unit)
}

fn build_coarse() -> Result<ModelNode, GeometryError> {
    Ok(ModelNode::group("conditioner").with_child(body()?))
}
