//! CPU rasterizer for the editor scene.
//!
//! Draws every rendered node of a [`Scene`] into an RGBA8 color buffer with a
//! depth buffer. Opaque meshes go first, then transparent meshes back to
//! front with depth testing but no depth writes, then line overlays. Buffers
//! are sized once per viewport and reused across frames.

use super::RenderError;
use crate::color::Color;
use crate::config::EditorConfig;
use crate::engine::{Engine, Entity, Material, NodeKind, Scene};
use crate::render::camera::PerspectiveCamera;
use crate::render::geometry::Geometry;
use crate::scene::RoomDimensions;
use glam::{Mat4, Vec3, Vec4};
use std::path::Path;

/// Depth bias keeping overlay lines in front of the faces they trace.
const LINE_DEPTH_BIAS: f32 = 1e-4;

// ========================================================================
// Lighting
// ========================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    /// Directional light position; it shines toward the origin.
    pub directional_position: Vec3,
    pub shadow_map_size: u32,
    pub shadows_enabled: bool,
}

impl Lighting {
    /// Ambient fill plus a key light above and in front of the room.
    pub fn for_room(dimensions: RoomDimensions, config: &EditorConfig) -> Self {
        Self {
            ambient_intensity: config.ambient_intensity,
            directional_intensity: config.directional_intensity,
            directional_position: Vec3::new(
                dimensions.width,
                dimensions.height * 3.0,
                dimensions.depth * 2.0,
            ),
            shadow_map_size: config.shadow_map_size,
            shadows_enabled: true,
        }
    }

    fn to_light(&self) -> Vec3 {
        self.directional_position.normalize_or_zero()
    }

    fn shade(&self, normal: Vec3, double_sided: bool) -> f32 {
        let mut lambert = normal.dot(self.to_light());
        if double_sided {
            lambert = lambert.abs();
        }
        (self.ambient_intensity + self.directional_intensity * lambert.max(0.0)).min(1.0)
    }
}

// ========================================================================
// Renderer
// ========================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub meshes: usize,
    pub transparent_meshes: usize,
    pub triangles: usize,
    pub line_nodes: usize,
    pub segments: usize,
}

#[derive(Debug, Clone, Copy)]
struct DeferredDraw {
    entity: Entity,
    world: Mat4,
    view_depth: f32,
}

pub struct RasterRenderer {
    width: u32,
    height: u32,
    color: Vec<u8>,
    depth: Vec<f32>,
    clear_color: Color,
    transparent: Vec<DeferredDraw>,
    lines: Vec<DeferredDraw>,
    frames: u64,
    disposed: bool,
}

impl RasterRenderer {
    pub fn new(width: u32, height: u32, clear_color: Color) -> Result<Self, RenderError> {
        let mut renderer = Self {
            width: 0,
            height: 0,
            color: Vec::new(),
            depth: Vec::new(),
            clear_color,
            transparent: Vec::new(),
            lines: Vec::new(),
            frames: 0,
            disposed: false,
        };
        renderer.set_viewport(width, height)?;
        Ok(renderer)
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn pixels(&self) -> &[u8] {
        &self.color
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.color.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSurface { width, height });
        }
        if self.disposed || (width, height) == (self.width, self.height) {
            return Ok(());
        }
        let count = width as usize * height as usize;
        self.width = width;
        self.height = height;
        self.color.resize(count * 4, 0);
        self.depth.resize(count, 1.0);
        Ok(())
    }

    /// Releases the buffers. Later renders and captures do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.color = Vec::new();
        self.depth = Vec::new();
        self.transparent = Vec::new();
        self.lines = Vec::new();
        log::debug!("Renderer disposed after {} frames", self.frames);
    }

    pub fn render(
        &mut self,
        engine: &Engine,
        scene: &Scene,
        camera: &PerspectiveCamera,
        lighting: &Lighting,
    ) -> FrameStats {
        let mut stats = FrameStats::default();
        if self.disposed {
            return stats;
        }
        self.clear();

        let view = camera.view_matrix();
        let view_projection = camera.view_projection();
        self.transparent.clear();
        self.lines.clear();

        for &root in scene.roots() {
            engine.visit(root, Mat4::IDENTITY, true, &mut |entity, node, world| {
                match &node.kind {
                    NodeKind::Mesh {
                        geometry,
                        materials,
                    } => {
                        let Some(material) = materials.first().and_then(|m| engine.material(*m)) else {
                            return;
                        };
                        let Some(geometry) = engine.geometry(*geometry) else {
                            return;
                        };
                        stats.meshes += 1;
                        if material.transparent {
                            let center = world.transform_point3(geometry.bounds().center());
                            self.transparent.push(DeferredDraw {
                                entity,
                                world,
                                view_depth: view.transform_point3(center).z,
                            });
                        } else {
                            stats.triangles +=
                                self.draw_triangles(geometry, material, &world, &view_projection, lighting);
                        }
                    }
                    NodeKind::Lines { .. } => self.lines.push(DeferredDraw {
                        entity,
                        world,
                        view_depth: 0.0,
                    }),
                    NodeKind::Group | NodeKind::Lod(_) => {}
                }
            });
        }

        // Farthest first; view space looks down -z.
        self.transparent
            .sort_unstable_by(|a, b| a.view_depth.total_cmp(&b.view_depth));
        for index in 0..self.transparent.len() {
            let draw = self.transparent[index];
            let Some((geometry, material)) = mesh_resources(engine, draw.entity) else {
                continue;
            };
            stats.transparent_meshes += 1;
            stats.triangles += self.draw_triangles(geometry, material, &draw.world, &view_projection, lighting);
        }

        for index in 0..self.lines.len() {
            let draw = self.lines[index];
            let Some(node) = engine.node(draw.entity) else {
                continue;
            };
            let NodeKind::Lines {
                geometry, material, ..
            } = &node.kind
            else {
                continue;
            };
            let (Some(geometry), Some(material)) = (engine.geometry(*geometry), engine.material(*material))
            else {
                continue;
            };
            stats.line_nodes += 1;
            stats.segments += self.draw_lines(geometry, material, &draw.world, &view_projection);
        }

        self.frames += 1;
        stats
    }

    pub fn capture_png(&self, path: &Path) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| RenderError::CaptureDirectory {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
        image::save_buffer_with_format(
            path,
            &self.color,
            self.width,
            self.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .map_err(|source| RenderError::Capture {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Saved {}x{} capture to {}", self.width, self.height, path.display());
        Ok(())
    }

    fn clear(&mut self) {
        let Color { r, g, b } = self.clear_color;
        for px in self.color.chunks_exact_mut(4) {
            px.copy_from_slice(&[r, g, b, 255]);
        }
        self.depth.fill(1.0);
    }

    fn to_screen(&self, clip: Vec4) -> Vec3 {
        let ndc = clip.truncate() / clip.w;
        Vec3::new(
            (ndc.x + 1.0) * 0.5 * self.width as f32,
            (1.0 - ndc.y) * 0.5 * self.height as f32,
            ndc.z * 0.5 + 0.5,
        )
    }

    fn draw_triangles(
        &mut self,
        geometry: &Geometry,
        material: &Material,
        world: &Mat4,
        view_projection: &Mat4,
        lighting: &Lighting,
    ) -> usize {
        let mvp = *view_projection * *world;
        let alpha = if material.transparent {
            material.opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let base = material.color.to_f32();
        let mut drawn = 0;
        for tri in geometry.triangle_iter() {
            let (polygon, len) = clip_triangle_near(tri.map(|v| mvp * v.extend(1.0)));
            if len < 3 {
                continue;
            }
            let mut screen = [Vec3::ZERO; 4];
            for (point, clip) in screen.iter_mut().zip(&polygon[..len]) {
                *point = self.to_screen(*clip);
            }
            let world_tri = tri.map(|v| world.transform_point3(v));
            let normal = (world_tri[1] - world_tri[0])
                .cross(world_tri[2] - world_tri[0])
                .normalize_or_zero();
            let light = lighting.shade(normal, material.double_sided);
            let shaded = [base[0] * light, base[1] * light, base[2] * light];

            let mut filled = false;
            for i in 1..len - 1 {
                let fan = [screen[0], screen[i], screen[i + 1]];
                let area = edge(fan[0], fan[1], fan[2]);
                if area.abs() <= f32::EPSILON {
                    continue;
                }
                // Screen y points down, so front faces have negative area.
                if !material.double_sided && area > 0.0 {
                    continue;
                }
                self.fill_triangle(fan, area, shaded, alpha, !material.transparent);
                filled = true;
            }
            if filled {
                drawn += 1;
            }
        }
        drawn
    }

    fn fill_triangle(&mut self, s: [Vec3; 3], area: f32, rgb: [f32; 3], alpha: f32, write_depth: bool) {
        let min_x = s.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor().max(0.0) as i64;
        let max_x = s
            .iter()
            .map(|p| p.x)
            .fold(f32::NEG_INFINITY, f32::max)
            .ceil()
            .min(self.width as f32 - 1.0) as i64;
        let min_y = s.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor().max(0.0) as i64;
        let max_y = s
            .iter()
            .map(|p| p.y)
            .fold(f32::NEG_INFINITY, f32::max)
            .ceil()
            .min(self.height as f32 - 1.0) as i64;
        if min_x > max_x || min_y > max_y {
            return;
        }
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, 0.0);
                let w0 = edge(s[1], s[2], p) / area;
                let w1 = edge(s[2], s[0], p) / area;
                let w2 = edge(s[0], s[1], p) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let z = w0 * s[0].z + w1 * s[1].z + w2 * s[2].z;
                self.plot(x as u32, y as u32, z, rgb, alpha, write_depth);
            }
        }
    }

    fn draw_lines(&mut self, geometry: &Geometry, material: &Material, world: &Mat4, view_projection: &Mat4) -> usize {
        let mvp = *view_projection * *world;
        let rgb = material.color.to_f32();
        let alpha = if material.transparent { material.opacity } else { 1.0 };
        let mut drawn = 0;
        for [a, b] in geometry.segment_iter() {
            let Some((ca, cb)) = clip_segment_near(mvp * a.extend(1.0), mvp * b.extend(1.0)) else {
                continue;
            };
            let Some((a, b)) = clip_segment_viewport(
                self.to_screen(ca),
                self.to_screen(cb),
                self.width as f32,
                self.height as f32,
            ) else {
                continue;
            };
            let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).ceil().max(1.0) as usize;
            for i in 0..=steps {
                let p = a.lerp(b, i as f32 / steps as f32);
                if p.x < 0.0 || p.y < 0.0 || p.x >= self.width as f32 || p.y >= self.height as f32 {
                    continue;
                }
                self.plot(p.x as u32, p.y as u32, p.z - LINE_DEPTH_BIAS, rgb, alpha, false);
            }
            drawn += 1;
        }
        drawn
    }

    fn plot(&mut self, x: u32, y: u32, z: f32, rgb: [f32; 3], alpha: f32, write_depth: bool) {
        if !(0.0..=1.0).contains(&z) {
            return;
        }
        let index = y as usize * self.width as usize + x as usize;
        let Some(depth) = self.depth.get_mut(index) else {
            return;
        };
        if z > *depth {
            return;
        }
        if write_depth {
            *depth = z;
        }
        let px = &mut self.color[index * 4..index * 4 + 4];
        for channel in 0..3 {
            let dst = px[channel] as f32 / 255.0;
            let out = rgb[channel] * alpha + dst * (1.0 - alpha);
            px[channel] = (out.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        px[3] = 255;
    }
}

/// Signed distance to the near plane in GL clip space; visible when non-negative.
fn near_distance(clip: Vec4) -> f32 {
    clip.z + clip.w
}

/// Clips a clip-space triangle to the near plane, keeping its winding. The
/// result has zero, three or four vertices.
fn clip_triangle_near(tri: [Vec4; 3]) -> ([Vec4; 4], usize) {
    let mut out = [Vec4::ZERO; 4];
    let mut len = 0;
    for i in 0..3 {
        let (a, b) = (tri[i], tri[(i + 1) % 3]);
        let (da, db) = (near_distance(a), near_distance(b));
        if da >= 0.0 {
            out[len] = a;
            len += 1;
        }
        if (da >= 0.0) != (db >= 0.0) {
            out[len] = a.lerp(b, da / (da - db));
            len += 1;
        }
    }
    (out, len)
}

fn clip_segment_near(a: Vec4, b: Vec4) -> Option<(Vec4, Vec4)> {
    let (da, db) = (near_distance(a), near_distance(b));
    match (da >= 0.0, db >= 0.0) {
        (true, true) => Some((a, b)),
        (false, false) => None,
        (true, false) => Some((a, a.lerp(b, da / (da - db)))),
        (false, true) => Some((a.lerp(b, da / (da - db)), b)),
    }
}

/// Liang-Barsky trim of a screen-space segment to `[0, width] x [0, height]`.
fn clip_segment_viewport(a: Vec3, b: Vec3, width: f32, height: f32) -> Option<(Vec3, Vec3)> {
    let d = b - a;
    let (mut t0, mut t1) = (0.0_f32, 1.0_f32);
    for (p, q) in [(-d.x, a.x), (d.x, width - a.x), (-d.y, a.y), (d.y, height - a.y)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((a + d * t0, a + d * t1))
}

fn edge(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn mesh_resources(engine: &Engine, entity: Entity) -> Option<(&Geometry, &Material)> {
    match &engine.node(entity)?.kind {
        NodeKind::Mesh {
            geometry,
            materials,
        } => Some((
            engine.geometry(*geometry)?,
            engine.material(*materials.first()?)?,
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LineRole;
    use crate::render::geometry::box_geometry;

    fn camera_looking_at_origin() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::from_config(&EditorConfig::default(), 1.0);
        camera.look_at(Vec3::new(0.0, 0.0, 300.0), Vec3::ZERO);
        camera
    }

    fn lighting() -> Lighting {
        Lighting::for_room(RoomDimensions::new(800.0, 600.0, 280.0), &EditorConfig::default())
    }

    #[test]
    fn empty_scene_is_clear_color() {
        let engine = Engine::new();
        let scene = Scene::new(Color::from_u32(0xf0f0f0));
        let mut renderer = RasterRenderer::new(32, 32, Color::from_u32(0xf0f0f0)).unwrap();
        let stats = renderer.render(&engine, &scene, &camera_looking_at_origin(), &lighting());
        assert_eq!(stats, FrameStats::default());
        assert_eq!(renderer.pixel(16, 16), Some([0xf0, 0xf0, 0xf0, 255]));
    }

    #[test]
    fn opaque_box_covers_the_center() {
        let mut engine = Engine::new();
        let mut scene = Scene::default();
        let mesh = engine.create_mesh(
            "box",
            box_geometry(Vec3::splat(100.0)),
            Material::lambert(Color::from_u32(0x0000ff)),
        );
        scene.add_entity(mesh);
        let mut renderer = RasterRenderer::new(64, 64, Color::WHITE).unwrap();
        let stats = renderer.render(&engine, &scene, &camera_looking_at_origin(), &lighting());
        assert_eq!(stats.meshes, 1);
        assert!(stats.triangles > 0);
        let [r, g, b, _] = renderer.pixel(32, 32).unwrap();
        assert_eq!((r, g), (0, 0));
        assert!(b > 0);
        assert_eq!(renderer.pixel(0, 0), Some([255, 255, 255, 255]));
    }

    #[test]
    fn transparent_mesh_blends_with_background() {
        let mut engine = Engine::new();
        let mut scene = Scene::default();
        let mesh = engine.create_mesh(
            "glass",
            box_geometry(Vec3::splat(100.0)),
            Material::lambert(Color::BLACK).with_opacity(0.5),
        );
        scene.add_entity(mesh);
        let mut renderer = RasterRenderer::new(64, 64, Color::WHITE).unwrap();
        let stats = renderer.render(&engine, &scene, &camera_looking_at_origin(), &lighting());
        assert_eq!(stats.transparent_meshes, 1);
        let [r, _, _, a] = renderer.pixel(32, 32).unwrap();
        assert_eq!(a, 255);
        assert!(r > 0 && r < 255);
    }

    #[test]
    fn viewport_buffers_are_reused() {
        let mut renderer = RasterRenderer::new(16, 8, Color::WHITE).unwrap();
        let before = renderer.pixels().as_ptr();
        renderer.set_viewport(16, 8).unwrap();
        assert_eq!(renderer.pixels().as_ptr(), before);
        renderer.set_viewport(8, 4).unwrap();
        assert_eq!(renderer.viewport(), (8, 4));
        assert!(matches!(
            renderer.set_viewport(0, 4),
            Err(RenderError::InvalidSurface { .. })
        ));
    }

    #[test]
    fn disposed_renderer_draws_nothing() {
        let engine = Engine::new();
        let scene = Scene::default();
        let mut renderer = RasterRenderer::new(8, 8, Color::WHITE).unwrap();
        renderer.dispose();
        renderer.dispose();
        renderer.render(&engine, &scene, &camera_looking_at_origin(), &lighting());
        assert_eq!(renderer.frames_rendered(), 0);
        assert!(renderer.pixels().is_empty());
        assert!(matches!(
            renderer.capture_png(Path::new("unused.png")),
            Err(RenderError::Disposed)
        ));
    }

    fn eye_level_camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::from_config(&EditorConfig::default(), 1.0);
        camera.look_at(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, 10.0, -100.0));
        camera
    }

    fn draw_segment(a: Vec3, b: Vec3) -> (RasterRenderer, FrameStats) {
        let mut engine = Engine::new();
        let mut scene = Scene::default();
        let lines = engine.create_lines(
            "segment",
            Geometry::lines(vec![a, b], vec![0, 1]),
            Material::line(Color::BLACK),
            LineRole::Grid,
        );
        scene.add_entity(lines);
        let mut renderer = RasterRenderer::new(64, 64, Color::WHITE).unwrap();
        let stats = renderer.render(&engine, &scene, &eye_level_camera(), &lighting());
        (renderer, stats)
    }

    #[test]
    fn segment_behind_the_eye_is_clipped_not_dropped() {
        let (renderer, stats) = draw_segment(Vec3::new(0.0, 5.0, 100.0), Vec3::new(0.0, 5.0, -1000.0));
        assert_eq!(stats.segments, 1);
        assert!((33..64).any(|y| renderer.pixel(32, y) == Some([0, 0, 0, 255])));
    }

    #[test]
    fn segment_grazing_the_near_plane_stays_cheap() {
        let started = std::time::Instant::now();
        let (_, stats) = draw_segment(Vec3::new(-5000.0, 9.0, -0.05), Vec3::new(5000.0, 9.0, -50.0));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert_eq!(stats.segments, 1);

        let (_, stats) = draw_segment(Vec3::new(-5000.0, 10.0, -0.0015), Vec3::new(5000.0, 0.0, -0.0015));
        assert_eq!(stats.segments, 0);
    }

    #[test]
    fn floor_triangle_reaching_behind_the_eye_still_draws() {
        let mut engine = Engine::new();
        let mut scene = Scene::default();
        let floor = engine.create_mesh(
            "floor",
            Geometry::triangles(
                vec![
                    Vec3::new(-1000.0, 0.0, 500.0),
                    Vec3::new(1000.0, 0.0, 500.0),
                    Vec3::new(0.0, 0.0, -2000.0),
                ],
                vec![0, 1, 2],
            ),
            Material::lambert(Color::from_u32(0x0000ff)).double_sided(),
        );
        scene.add_entity(floor);
        let mut camera = PerspectiveCamera::from_config(&EditorConfig::default(), 1.0);
        camera.look_at(Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, 0.0, -200.0));
        let mut renderer = RasterRenderer::new(64, 64, Color::WHITE).unwrap();
        let stats = renderer.render(&engine, &scene, &camera, &lighting());
        assert_eq!(stats.triangles, 1);
        let [r, g, b, _] = renderer.pixel(32, 32).unwrap();
        assert_eq!((r, g), (0, 0));
        assert!(b > 0);
    }

    #[test]
    fn capture_writes_png() {
        let path = std::env::temp_dir().join(format!("roomviz_capture_{}.png", std::process::id()));
        let engine = Engine::new();
        let scene = Scene::default();
        let mut renderer = RasterRenderer::new(12, 10, Color::from_u32(0x336699)).unwrap();
        renderer.render(&engine, &scene, &camera_looking_at_origin(), &lighting());
        renderer.capture_png(&path).unwrap();

        let image = image::open(&path).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (12, 10));
        assert_eq!(image.get_pixel(3, 3).0, [0x33, 0x66, 0x99, 255]);
        let _ = std::fs::remove_file(&path);
    }
}
