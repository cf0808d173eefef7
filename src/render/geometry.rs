//! CPU-side geometry: primitive builders, extruded profiles, bounds and rays.
//!
//! Every builder returns a fresh `Geometry`; nothing here is shared between
//! scene nodes.

use glam::{Mat4, Vec2, Vec3};

const CURVE_SEGMENTS: usize = 12;
const EPSILON: f32 = 1e-6;

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("shape needs at least 3 distinct points, got {0}")]
    DegenerateShape(usize),
    #[error("failed to triangulate shape: {0}")]
    Triangulation(String),
}

/// Primitive topology of a geometry buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Lines,
    Triangles,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub primitive: PrimitiveType,
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn triangles(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        debug_assert!(indices.len() % 3 == 0);
        Self {
            primitive: PrimitiveType::Triangles,
            positions,
            indices,
        }
    }

    pub fn lines(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        debug_assert!(indices.len() % 2 == 0);
        Self {
            primitive: PrimitiveType::Lines,
            positions,
            indices,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().copied())
    }

    pub fn triangle_iter(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        let chunks = if self.primitive == PrimitiveType::Triangles {
            self.indices.chunks_exact(3)
        } else {
            self.indices[..0].chunks_exact(3)
        };
        chunks.map(|tri| {
            [
                self.positions[tri[0] as usize],
                self.positions[tri[1] as usize],
                self.positions[tri[2] as usize],
            ]
        })
    }

    pub fn segment_iter(&self) -> impl Iterator<Item = [Vec3; 2]> + '_ {
        let chunks = if self.primitive == PrimitiveType::Lines {
            self.indices.chunks_exact(2)
        } else {
            self.indices[..0].chunks_exact(2)
        };
        chunks.map(|seg| {
            [
                self.positions[seg[0] as usize],
                self.positions[seg[1] as usize],
            ]
        })
    }

    pub fn primitive_count(&self) -> usize {
        match self.primitive {
            PrimitiveType::Lines => self.indices.len() / 2,
            PrimitiveType::Triangles => self.indices.len() / 3,
        }
    }
}

// ========================================================================
// Bounds and rays
// ========================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut out = Self::EMPTY;
        for point in points {
            out.include(point);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Axis-aligned bounds of this box after an affine transform.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        Aabb::from_points(self.corners().map(|c| matrix.transform_point3(c)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test; returns the entry distance (0 when the origin is inside).
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        if aabb.is_empty() {
            return None;
        }
        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let origin = self.origin[axis];
            let dir = self.direction[axis];
            if dir.abs() < EPSILON {
                if origin < aabb.min[axis] || origin > aabb.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t0 = (aabb.min[axis] - origin) * inv;
            let mut t1 = (aabb.max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }

    /// Möller–Trumbore, double sided.
    pub fn intersect_triangle(&self, tri: [Vec3; 3]) -> Option<f32> {
        let edge1 = tri[1] - tri[0];
        let edge2 = tri[2] - tri[0];
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - tri[0];
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(q) * inv_det;
        (t > EPSILON).then_some(t)
    }
}

// ========================================================================
// Primitive builders
// ========================================================================

/// Box centered on the origin with the given full extents.
pub fn box_geometry(size: Vec3) -> Geometry {
    let corners = Aabb::from_center_size(Vec3::ZERO, size).corners();
    #[rustfmt::skip]
    let indices = vec![
        4, 5, 7, 4, 7, 6, // +z
        1, 0, 2, 1, 2, 3, // -z
        5, 1, 3, 5, 3, 7, // +x
        0, 4, 6, 0, 6, 2, // -x
        6, 7, 3, 6, 3, 2, // +y
        0, 1, 5, 0, 5, 4, // -y
    ];
    Geometry::triangles(corners.to_vec(), indices)
}

/// Plane in XY centered on the origin, facing +Z.
pub fn plane_geometry(width: f32, height: f32) -> Geometry {
    let (hw, hh) = (width * 0.5, height * 0.5);
    Geometry::triangles(
        vec![
            Vec3::new(-hw, -hh, 0.0),
            Vec3::new(hw, -hh, 0.0),
            Vec3::new(hw, hh, 0.0),
            Vec3::new(-hw, hh, 0.0),
        ],
        vec![0, 1, 2, 0, 2, 3],
    )
}

/// Capped cylinder along Y centered on the origin.
pub fn cylinder_geometry(
    radius_top: f32,
    radius_bottom: f32,
    height: f32,
    radial_segments: usize,
) -> Geometry {
    let segments = radial_segments.max(3);
    let half = height * 0.5;
    let mut positions = Vec::with_capacity(segments * 2 + 2);
    for i in 0..segments {
        let theta = i as f32 / segments as f32 * std::f32::consts::TAU;
        let (sin, cos) = theta.sin_cos();
        positions.push(Vec3::new(sin * radius_top, half, cos * radius_top));
        positions.push(Vec3::new(sin * radius_bottom, -half, cos * radius_bottom));
    }
    let top_center = positions.len() as u32;
    positions.push(Vec3::new(0.0, half, 0.0));
    let bottom_center = positions.len() as u32;
    positions.push(Vec3::new(0.0, -half, 0.0));

    let mut indices = Vec::with_capacity(segments * 12);
    for i in 0..segments {
        let next = (i + 1) % segments;
        let (top, bottom) = ((i * 2) as u32, (i * 2 + 1) as u32);
        let (top_next, bottom_next) = ((next * 2) as u32, (next * 2 + 1) as u32);
        indices.extend_from_slice(&[top, bottom, bottom_next, top, bottom_next, top_next]);
        indices.extend_from_slice(&[top_center, top, top_next]);
        indices.extend_from_slice(&[bottom_center, bottom_next, bottom]);
    }
    Geometry::triangles(positions, indices)
}

/// Outline of a centered box as 12 line segments.
pub fn box_edges(size: Vec3) -> Geometry {
    aabb_lines(&Aabb::from_center_size(Vec3::ZERO, size))
}

pub fn aabb_lines(aabb: &Aabb) -> Geometry {
    #[rustfmt::skip]
    let indices = vec![
        0, 1, 1, 3, 3, 2, 2, 0,
        4, 5, 5, 7, 7, 6, 6, 4,
        0, 4, 1, 5, 2, 6, 3, 7,
    ];
    Geometry::lines(aabb.corners().to_vec(), indices)
}

/// Square grid in the XZ plane centered on the origin.
pub fn grid_lines(size: f32, divisions: usize) -> Geometry {
    let divisions = divisions.max(1);
    let half = size * 0.5;
    let step = size / divisions as f32;
    let mut positions = Vec::with_capacity((divisions + 1) * 4);
    let mut indices = Vec::with_capacity((divisions + 1) * 4);
    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let base = positions.len() as u32;
        positions.push(Vec3::new(-half, 0.0, k));
        positions.push(Vec3::new(half, 0.0, k));
        positions.push(Vec3::new(k, 0.0, -half));
        positions.push(Vec3::new(k, 0.0, half));
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 3]);
    }
    Geometry::lines(positions, indices)
}

// ========================================================================
// 2D paths and extrusion
// ========================================================================

/// Open 2D polyline built with pen-style commands; curves are flattened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    points: Vec<Vec2>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.points.clear();
        self.points.push(Vec2::new(x, y));
        self
    }

    pub fn line_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.points.push(Vec2::new(x, y));
        self
    }

    pub fn quadratic_curve_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) -> &mut Self {
        let start = self.points.last().copied().unwrap_or(Vec2::ZERO);
        let control = Vec2::new(cx, cy);
        let end = Vec2::new(x, y);
        for i in 1..=CURVE_SEGMENTS {
            let t = i as f32 / CURVE_SEGMENTS as f32;
            let mt = 1.0 - t;
            self.points
                .push(start * (mt * mt) + control * (2.0 * mt * t) + end * (t * t));
        }
        self
    }

    /// Arc around an absolute center, counter-clockwise unless `clockwise`.
    pub fn absarc(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        start_angle: f32,
        end_angle: f32,
        clockwise: bool,
    ) -> &mut Self {
        let mut sweep = end_angle - start_angle;
        if clockwise && sweep > 0.0 {
            sweep -= std::f32::consts::TAU;
        } else if !clockwise && sweep < 0.0 {
            sweep += std::f32::consts::TAU;
        }
        for i in 0..=CURVE_SEGMENTS {
            let angle = start_angle + sweep * i as f32 / CURVE_SEGMENTS as f32;
            self.points
                .push(Vec2::new(cx + radius * angle.cos(), cy + radius * angle.sin()));
        }
        self
    }

    /// Points with consecutive duplicates and the closing repeat removed.
    pub fn points(&self) -> Vec<Vec2> {
        let mut out: Vec<Vec2> = Vec::with_capacity(self.points.len());
        for &point in &self.points {
            if out.last().map_or(true, |last| last.distance(point) > EPSILON) {
                out.push(point);
            }
        }
        while out.len() > 1 && out[0].distance(out[out.len() - 1]) <= EPSILON {
            out.pop();
        }
        out
    }
}

/// Closed outline with optional holes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    pub outline: Path,
    pub holes: Vec<Path>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rounded rectangle with its lower-left corner at `(x, y)`.
    pub fn rounded_rect(x: f32, y: f32, width: f32, height: f32, radius: f32) -> Self {
        let mut shape = Self::new();
        shape
            .outline
            .move_to(x, y + radius)
            .line_to(x, y + height - radius)
            .quadratic_curve_to(x, y + height, x + radius, y + height)
            .line_to(x + width - radius, y + height)
            .quadratic_curve_to(x + width, y + height, x + width, y + height - radius)
            .line_to(x + width, y + radius)
            .quadratic_curve_to(x + width, y, x + width - radius, y)
            .line_to(x + radius, y)
            .quadratic_curve_to(x, y, x, y + radius);
        shape
    }
}

/// Extrudes `shape` from z = 0 to z = `depth`, capping both ends.
pub fn extrude_geometry(shape: &Shape, depth: f32) -> Result<Geometry, GeometryError> {
    let outline = shape.outline.points();
    if outline.len() < 3 {
        return Err(GeometryError::DegenerateShape(outline.len()));
    }
    let holes: Vec<Vec<Vec2>> = shape
        .holes
        .iter()
        .map(Path::points)
        .filter(|points| points.len() >= 3)
        .collect();

    let mut rings: Vec<&[Vec2]> = Vec::with_capacity(holes.len() + 1);
    rings.push(&outline);
    rings.extend(holes.iter().map(Vec::as_slice));

    let mut flat = Vec::new();
    let mut hole_starts = Vec::with_capacity(holes.len());
    for (ring_index, ring) in rings.iter().enumerate() {
        if ring_index > 0 {
            hole_starts.push(flat.len() / 2);
        }
        for point in ring.iter() {
            flat.push(point.x as f64);
            flat.push(point.y as f64);
        }
    }
    let cap = earcutr::earcut(&flat, &hole_starts, 2)
        .map_err(|err| GeometryError::Triangulation(format!("{err:?}")))?;

    let ring_points: Vec<Vec2> = rings.iter().flat_map(|ring| ring.iter().copied()).collect();
    let count = ring_points.len() as u32;
    let mut positions = Vec::with_capacity(ring_points.len() * 2);
    positions.extend(ring_points.iter().map(|p| Vec3::new(p.x, p.y, 0.0)));
    positions.extend(ring_points.iter().map(|p| Vec3::new(p.x, p.y, depth)));

    let mut indices = Vec::with_capacity(cap.len() * 2 + ring_points.len() * 6);
    for tri in cap.chunks_exact(3) {
        let (a, b, c) = (tri[0] as u32, tri[1] as u32, tri[2] as u32);
        indices.extend_from_slice(&[a, c, b]);
        indices.extend_from_slice(&[a + count, b + count, c + count]);
    }
    let mut start = 0u32;
    for ring in &rings {
        let len = ring.len() as u32;
        for i in 0..len {
            let a = start + i;
            let b = start + (i + 1) % len;
            indices.extend_from_slice(&[a, b, b + count, a, b + count, a + count]);
        }
        start += len;
    }
    Ok(Geometry::triangles(positions, indices))
}
