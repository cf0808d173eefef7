//! Top-down plan of the room.
//!
//! The plan maps room centimeters to pixels at a fixed scale with `x` to the
//! right and `z` downward. Footprints are the furniture's width × depth
//! rectangles rotated about their center, clockwise for positive yaw as seen
//! from above.

use crate::color::Color;
use crate::render::RenderError;
use crate::scene::Room;
use glam::Vec2;
use image::{Rgba, RgbaImage};
use std::path::Path;

/// Pixels per centimeter.
pub const PLAN_SCALE: f32 = 0.8;
pub const GRID_STEP_CM: f32 = 100.0;

const SELECTED_OPACITY: f32 = 0.9;
const UNSELECTED_OPACITY: f32 = 0.8;
const GRID_OPACITY: f32 = 0.2;
const RING_WIDTH_PX: f32 = 2.0;
const RING_OFFSET_PX: f32 = 2.0;
const MARGIN_PX: u32 = 32;

const BACKGROUND: Color = Color::from_u32(0xeff6ff);
const FLOOR: Color = Color::from_u32(0xf3f4f6);
const BORDER: Color = Color::from_u32(0x1f2937);
const GRID: Color = Color::from_u32(0x9ca3af);
const RING: Color = Color::from_u32(0xef4444);

#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    pub id: String,
    pub name: String,
    /// Center in plan pixels.
    pub center: Vec2,
    /// Unrotated width and depth in plan pixels.
    pub size: Vec2,
    pub rotation_deg: f32,
    pub color: Color,
    pub opacity: f32,
    pub selected: bool,
    /// Rounded footprint in centimeters, e.g. `120×60 см`.
    pub label: String,
}

impl Footprint {
    fn to_local(&self, point: Vec2) -> Vec2 {
        let (sin, cos) = self.rotation_deg.to_radians().sin_cos();
        let d = point - self.center;
        // Undo a clockwise screen rotation.
        Vec2::new(d.x * cos + d.y * sin, -d.x * sin + d.y * cos)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let local = self.to_local(point);
        let half = self.size * 0.5;
        local.x.abs() <= half.x && local.y.abs() <= half.y
    }

    /// Inside the selection ring drawn around the footprint.
    fn in_ring(&self, point: Vec2) -> bool {
        let local = self.to_local(point).abs();
        let inner = self.size * 0.5 + Vec2::splat(RING_OFFSET_PX);
        let outer = inner + Vec2::splat(RING_WIDTH_PX);
        local.x <= outer.x && local.y <= outer.y && (local.x > inner.x || local.y > inner.y)
    }

    pub fn corners(&self) -> [Vec2; 4] {
        let (sin, cos) = self.rotation_deg.to_radians().sin_cos();
        let half = self.size * 0.5;
        [
            Vec2::new(-half.x, -half.y),
            Vec2::new(half.x, -half.y),
            Vec2::new(half.x, half.y),
            Vec2::new(-half.x, half.y),
        ]
        .map(|c| self.center + Vec2::new(c.x * cos - c.y * sin, c.x * sin + c.y * cos))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanView {
    pub scale: f32,
    /// Room rectangle size in plan pixels.
    pub size: Vec2,
    /// Vertical grid lines, in plan pixels from the left wall.
    pub grid_x: Vec<f32>,
    /// Horizontal grid lines, in plan pixels from the back wall.
    pub grid_z: Vec<f32>,
    /// Paint order; the selected footprint is last so it is drawn on top.
    pub footprints: Vec<Footprint>,
    pub width_label: String,
    pub depth_label: String,
}

impl PlanView {
    pub fn new(room: &Room, selected_id: Option<&str>) -> Self {
        Self::with_scale(room, selected_id, PLAN_SCALE)
    }

    pub fn with_scale(room: &Room, selected_id: Option<&str>, scale: f32) -> Self {
        let grid = |extent: f32| -> Vec<f32> {
            let count = (extent / GRID_STEP_CM).floor().max(0.0) as usize;
            (1..=count).map(|i| i as f32 * GRID_STEP_CM * scale).collect()
        };

        let mut footprints: Vec<Footprint> = room
            .furniture
            .iter()
            .map(|item| {
                let selected = selected_id == Some(item.id.as_str());
                let p = item.position;
                let d = item.dimensions;
                Footprint {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    center: Vec2::new(p.x + d.x / 2.0, p.z + d.z / 2.0) * scale,
                    size: Vec2::new(d.x, d.z) * scale,
                    rotation_deg: item.rotation,
                    color: item.color,
                    opacity: if selected {
                        SELECTED_OPACITY
                    } else {
                        UNSELECTED_OPACITY
                    },
                    selected,
                    label: format!("{}×{} см", d.x.round(), d.z.round()),
                }
            })
            .collect();
        // Stable, so the rest keep list order.
        footprints.sort_by_key(|f| f.selected);

        Self {
            scale,
            size: Vec2::new(room.width, room.depth) * scale,
            grid_x: grid(room.width),
            grid_z: grid(room.depth),
            footprints,
            width_label: format!("← {} см →", room.width),
            depth_label: format!("↑ {} см ↓", room.depth),
        }
    }

    /// Topmost footprint under `point` (plan pixels). `None` means the click
    /// landed on the background and the selection should be cleared.
    pub fn hit_test(&self, point: Vec2) -> Option<&str> {
        self.footprints
            .iter()
            .rev()
            .find(|f| f.contains(point))
            .map(|f| f.id.as_str())
    }

    pub fn footprint(&self, id: &str) -> Option<&Footprint> {
        self.footprints.iter().find(|f| f.id == id)
    }

    /// Rasterizes the plan with a margin around the room rectangle.
    pub fn render(&self) -> RgbaImage {
        let width = self.size.x.ceil().max(1.0) as u32 + MARGIN_PX * 2;
        let height = self.size.y.ceil().max(1.0) as u32 + MARGIN_PX * 2;
        let origin = Vec2::splat(MARGIN_PX as f32);
        let mut image = RgbaImage::from_pixel(width, height, rgba(BACKGROUND));

        for (x, y, px) in image.enumerate_pixels_mut() {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - origin;
            let inside = p.x >= 0.0 && p.y >= 0.0 && p.x <= self.size.x && p.y <= self.size.y;
            if !inside {
                continue;
            }
            *px = rgba(FLOOR);
            let on_grid = self.grid_x.iter().any(|gx| (p.x - gx).abs() < 0.5)
                || self.grid_z.iter().any(|gz| (p.y - gz).abs() < 0.5);
            if on_grid {
                blend(px, GRID, GRID_OPACITY);
            }
        }

        for footprint in &self.footprints {
            let (min, max) = footprint_extent(footprint);
            let x0 = (min.x + origin.x).floor().max(0.0) as u32;
            let y0 = (min.y + origin.y).floor().max(0.0) as u32;
            let x1 = ((max.x + origin.x).ceil() as u32).min(width);
            let y1 = ((max.y + origin.y).ceil() as u32).min(height);
            for y in y0..y1 {
                for x in x0..x1 {
                    let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - origin;
                    let px = image.get_pixel_mut(x, y);
                    if footprint.contains(p) {
                        blend(px, footprint.color, footprint.opacity);
                    } else if footprint.selected && footprint.in_ring(p) {
                        *px = rgba(RING);
                    }
                }
            }
        }

        let border = rgba(BORDER);
        let (right, bottom) = (
            (origin.x + self.size.x).round() as u32,
            (origin.y + self.size.y).round() as u32,
        );
        for x in MARGIN_PX..=right.min(width - 1) {
            for y in [MARGIN_PX, bottom.min(height - 1)] {
                image.put_pixel(x, y, border);
            }
        }
        for y in MARGIN_PX..=bottom.min(height - 1) {
            for x in [MARGIN_PX, right.min(width - 1)] {
                image.put_pixel(x, y, border);
            }
        }
        image
    }

    /// Maps a pixel of [`PlanView::render`] output to plan coordinates.
    pub fn image_to_plan(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y) - Vec2::splat(MARGIN_PX as f32)
    }
}

pub fn render_plan_png(plan: &PlanView, path: &Path) -> Result<(), RenderError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| RenderError::CaptureDirectory {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }
    plan.render()
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| RenderError::Capture {
            path: path.display().to_string(),
            source,
        })?;
    log::info!("Saved plan with {} footprints to {}", plan.footprints.len(), path.display());
    Ok(())
}

fn footprint_extent(footprint: &Footprint) -> (Vec2, Vec2) {
    let pad = Vec2::splat(RING_OFFSET_PX + RING_WIDTH_PX + 1.0);
    let corners = footprint.corners();
    let min = corners.iter().copied().fold(Vec2::splat(f32::INFINITY), Vec2::min);
    let max = corners.iter().copied().fold(Vec2::splat(f32::NEG_INFINITY), Vec2::max);
    // The ring is axis aligned in footprint space, so pad by its diagonal.
    (min - pad * 1.5, max + pad * 1.5)
}

fn rgba(color: Color) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, 255])
}

fn blend(px: &mut Rgba<u8>, color: Color, alpha: f32) {
    let src = [color.r, color.g, color.b];
    for (channel, value) in src.iter().enumerate() {
        let dst = px.0[channel] as f32;
        px.0[channel] = (*value as f32 * alpha + dst * (1.0 - alpha)).round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Furniture, FurnitureKind, PrimitiveShape, Vector3};
    use approx::assert_relative_eq;

    fn item(id: &str, x: f32, z: f32, w: f32, d: f32, rotation: f32) -> Furniture {
        Furniture {
            id: id.into(),
            name: id.into(),
            kind: FurnitureKind::Primitive(PrimitiveShape::Rectangular),
            position: Vector3::new(x, 0.0, z),
            dimensions: Vector3::new(w, 60.0, d),
            color: Color::from_u32(0x0000ff),
            rotation,
        }
    }

    fn room(furniture: Vec<Furniture>) -> Room {
        Room {
            width: 800.0,
            depth: 650.0,
            height: 280.0,
            furniture,
        }
    }

    #[test]
    fn grid_lines_every_meter() {
        let plan = PlanView::new(&room(Vec::new()), None);
        assert_eq!(plan.grid_x.len(), 8);
        assert_eq!(plan.grid_z.len(), 6);
        assert_relative_eq!(plan.grid_x[0], 80.0);
        assert_relative_eq!(plan.size.x, 640.0);
        assert_eq!(plan.width_label, "← 800 см →");
    }

    #[test]
    fn footprint_geometry_and_label() {
        let plan = PlanView::new(&room(vec![item("a", 100.0, 100.0, 120.5, 60.0, 0.0)]), Some("a"));
        let f = plan.footprint("a").unwrap();
        assert_relative_eq!(f.center.x, 128.2, epsilon = 1e-3);
        assert_relative_eq!(f.center.y, 104.0, epsilon = 1e-3);
        assert_eq!(f.label, "121×60 см");
        assert_relative_eq!(f.opacity, 0.9);
        assert!(f.selected);
    }

    #[test]
    fn hit_test_respects_rotation() {
        let plan = PlanView::new(&room(vec![item("long", 100.0, 100.0, 200.0, 20.0, 90.0)]), None);
        let f = plan.footprint("long").unwrap();
        // Rotated a quarter turn the footprint runs along z.
        assert_eq!(plan.hit_test(f.center + Vec2::new(0.0, 60.0)), Some("long"));
        assert_eq!(plan.hit_test(f.center + Vec2::new(60.0, 0.0)), None);
    }

    #[test]
    fn background_click_clears() {
        let plan = PlanView::new(&room(vec![item("a", 0.0, 0.0, 50.0, 50.0, 0.0)]), Some("a"));
        assert_eq!(plan.hit_test(Vec2::new(500.0, 400.0)), None);
    }

    #[test]
    fn selected_footprint_is_on_top() {
        let furniture = vec![
            item("under", 100.0, 100.0, 100.0, 100.0, 0.0),
            item("over", 120.0, 120.0, 100.0, 100.0, 0.0),
        ];
        let overlap = Vec2::new(150.0, 150.0) * PLAN_SCALE;
        assert_eq!(PlanView::new(&room(furniture.clone()), None).hit_test(overlap), Some("over"));
        assert_eq!(
            PlanView::new(&room(furniture), Some("under")).hit_test(overlap),
            Some("under")
        );
    }

    #[test]
    fn render_writes_footprint_pixels() {
        let plan = PlanView::new(&room(vec![item("a", 100.0, 100.0, 100.0, 100.0, 0.0)]), None);
        let image = plan.render();
        assert_eq!(image.dimensions(), (640 + 64, 520 + 64));
        let center = plan.footprint("a").unwrap().center + Vec2::splat(MARGIN_PX as f32);
        let px = image.get_pixel(center.x as u32, center.y as u32);
        assert!(px.0[2] > px.0[0]);
        assert_eq!(*image.get_pixel(0, 0), rgba(BACKGROUND));
    }

    #[test]
    fn plan_png_round_trip() {
        let path = std::env::temp_dir().join(format!("roomviz_plan_{}.png", std::process::id()));
        let plan = PlanView::new(&Room::initial(), Some("1"));
        render_plan_png(&plan, &path).unwrap();
        let loaded = image::open(&path).unwrap();
        assert_eq!(loaded.width(), plan.render().width());
        let _ = std::fs::remove_file(&path);
    }
}
