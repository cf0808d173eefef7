use super::{lambert, CatalogEntry, ModelNode};
use crate::render::geometry::{box_geometry, extrude_geometry, GeometryError, Shape};
use glam::Vec3;

pub(super) const ENTRY: CatalogEntry = CatalogEntry {
    key: "blackboard",
    display_name: "Доска",
    width_cm: 240.0,
    depth_cm: 8.0,
    height_cm: 120.0,
    price_units: 12000,
    preview_asset_path: "previews/blackboard.png",
    build_detailed: build_detailed,
    build_coarse: Some(build_coarse),
};

const FRAME_COLOR: u32 = 0xcccccc;
const BOARD_COLOR: u32 = 0x000000;
const WIDTH: f32 = 2.4;
const HEIGHT: f32 = 1.2;
const FRAME_DEPTH: f32 = 0.04;

/// Writing surface keeps its color whatever the record says.
fn board() -> ModelNode {
    ModelNode::mesh(
        "board",
        box_geometry(Vec3::new(WIDTH - 0.2, HEIGHT - 0.2, 0.01)),
        lambert(BOARD_COLOR),
    )
    .at(0.0, HEIGHT / 2.0, FRAME_DEPTH + 0.005)
    .preserve()
}

fn build_detailed() -> Result<ModelNode, GeometryError> {
    let frame = extrude_geometry(
        &Shape::rounded_rect(-WIDTH / 2.0, 0.0, WIDTH, HEIGHT, 0.06),
        FRAME_DEPTH,
    )?;
    Ok(ModelNode::group("blackboard")
        .with_child(ModelNode::mesh("frame", frame, lambert(FRAME_COLOR)))
        .with_child(board())
        .with_child(
            ModelNode::mesh("chalk tray", box_geometry(Vec3::new(2.0, 0.02, 0.04)), lambert(FRAME_COLOR))
                .at(0.0, 0.11, FRAME_DEPTH + 0.02),
        ))
}

fn build_coarse() -> Result<ModelNode, GeometryError> {
    Ok(ModelNode::group("blackboard")
        .with_child(
            ModelNode::mesh("frame", box_geometry(Vec3::new(WIDTH, HEIGHT, FRAME_DEPTH)), lambert(FRAME_COLOR))
                .at(0.0, HEIGHT / 2.0, FRAME_DEPTH / 2.0),
        )
        .with_child(board()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_is_preserved_in_both_levels() {
        for model in [build_detailed().unwrap(), build_coarse().unwrap()] {
            let board = model
                .children
                .iter()
                .find(|child| child.name == "board")
                .unwrap();
            assert!(board.preserve_material);
            assert!(model
                .children
                .iter()
                .filter(|child| child.name != "board")
                .all(|child| !child.preserve_material));
        }
    }
}
