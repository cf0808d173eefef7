use super::{lambert, CatalogEntry, ModelNode};
use crate::render::geometry::{box_geometry, cylinder_geometry, extrude_geometry, GeometryError, Shape};
use glam::{Quat, Vec3};

pub(super) const ENTRY: CatalogEntry = CatalogEntry {
    key: "chair",
    display_name: "Стул",
    width_cm: 55.0,
    depth_cm: 55.0,
    height_cm: 50.0,
    price_units: 4500,
    preview_asset_path: "previews/chair.png",
    build_detailed: build_detailed,
    build_coarse: Some(build_coarse),
};

const LEG_COLOR: u32 = 0xd9d7d7;
const WOOD_COLOR: u32 = 0x9b8c75;
const LEG_HEIGHT: f32 = 0.45;
const LEG_INSET: f32 = 0.22;
const SEAT_THICKNESS: f32 = 0.03;

fn legs(chair: &mut ModelNode, radial_segments: usize) {
    for (x, z) in [
        (-LEG_INSET, -LEG_INSET),
        (LEG_INSET, -LEG_INSET),
        (-LEG_INSET, LEG_INSET),
        (LEG_INSET, LEG_INSET),
    ] {
        chair.add(
            ModelNode::mesh(
                "leg",
                cylinder_geometry(0.02, 0.02, LEG_HEIGHT, radial_segments),
                lambert(LEG_COLOR),
            )
            .at(x, LEG_HEIGHT / 2.0, z),
        );
    }
}

fn build_detailed() -> Result<ModelNode, GeometryError> {
    let mut chair = ModelNode::group("chair");
    legs(&mut chair, 24);

    // Seat profile is drawn in XY and laid flat.
    let seat = extrude_geometry(&Shape::rounded_rect(0.0, 0.0, 0.5, 0.48, 0.05), SEAT_THICKNESS)?;
    chair.add(
        ModelNode::mesh("seat", seat, lambert(WOOD_COLOR))
            .rotated(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2))
            .at(-0.25, LEG_HEIGHT, 0.24),
    );

    for x in [-0.2, 0.2] {
        chair.add(
            ModelNode::mesh("back post", cylinder_geometry(0.015, 0.015, 0.3, 16), lambert(LEG_COLOR))
                .at(x, LEG_HEIGHT + SEAT_THICKNESS + 0.15, -0.225),
        );
    }

    let back = extrude_geometry(&Shape::rounded_rect(0.0, 0.0, 0.45, 0.25, 0.05), SEAT_THICKNESS)?;
    chair.add(
        ModelNode::mesh("back", back, lambert(WOOD_COLOR)).at(-0.225, 0.53, -0.24),
    );
    Ok(chair)
}

fn build_coarse() -> Result<ModelNode, GeometryError> {
    let mut chair = ModelNode::group("chair");
    legs(&mut chair, 6);
    chair.add(
        ModelNode::mesh(
            "seat",
            box_geometry(Vec3::new(0.5, SEAT_THICKNESS, 0.48)),
            lambert(WOOD_COLOR),
        )
        .at(0.0, LEG_HEIGHT + SEAT_THICKNESS / 2.0, 0.0),
    );
    chair.add(
        ModelNode::mesh("back", box_geometry(Vec3::new(0.45, 0.25, SEAT_THICKNESS)), lambert(WOOD_COLOR))
            .at(0.0, 0.655, -0.225),
    );
    Ok(chair)
}
