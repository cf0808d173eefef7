use crate::config::EditorConfig;
use crate::render::geometry::Ray;
use crate::scene::RoomDimensions;
use glam::{Mat4, Vec2, Vec3};

const POLAR_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCamera {
    pub fn new(fov_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 1.0),
            target: Vec3::ZERO,
            fov_deg,
            aspect,
            near,
            far,
        }
    }

    pub fn from_config(config: &EditorConfig, aspect: f32) -> Self {
        Self::new(config.camera_fov_deg, aspect, config.camera_near, config.camera_far)
    }

    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World point to normalized device coordinates.
    pub fn project(&self, world: Vec3) -> Vec3 {
        self.view_projection().project_point3(world)
    }

    /// Ray from the eye through a point in normalized device coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let through = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.5));
        Ray::new(self.position, through - self.position)
    }
}

/// Elevated three-quarter view onto the room's volumetric center.
pub fn room_framing(dimensions: RoomDimensions) -> (Vec3, Vec3) {
    let position = Vec3::new(
        dimensions.width * 0.5,
        dimensions.height * 1.5,
        dimensions.depth * 2.0,
    );
    (position, dimensions.center())
}

/// Orbit navigation around a target point with damped motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar: f32,
    pub max_polar: f32,
    pub enabled: bool,
    theta_delta: f32,
    phi_delta: f32,
    scale: f32,
    pan_offset: Vec3,
}

impl OrbitControls {
    pub fn new(target: Vec3, damping_factor: f32, min_distance: f32, max_distance: f32) -> Self {
        Self {
            target,
            damping_factor,
            min_distance,
            max_distance,
            min_polar: 0.0,
            max_polar: std::f32::consts::PI,
            enabled: true,
            theta_delta: 0.0,
            phi_delta: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
        }
    }

    pub fn from_config(config: &EditorConfig, target: Vec3) -> Self {
        Self::new(
            target,
            config.damping_factor,
            config.min_distance,
            config.max_distance,
        )
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.theta_delta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.phi_delta -= angle;
    }

    /// Scales the orbit radius; values below one move the camera closer.
    pub fn dolly(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.scale *= factor;
        }
    }

    /// Moves the target in the camera's screen plane.
    pub fn pan(&mut self, camera: &PerspectiveCamera, right: f32, up: f32) {
        let forward = (camera.target - camera.position).normalize_or_zero();
        let right_dir = forward.cross(Vec3::Y).normalize_or_zero();
        let up_dir = right_dir.cross(forward).normalize_or_zero();
        self.pan_offset += right_dir * right + up_dir * up;
    }

    /// Drops pending motion, e.g. after the camera was reframed.
    pub fn reset_motion(&mut self) {
        self.theta_delta = 0.0;
        self.phi_delta = 0.0;
        self.scale = 1.0;
        self.pan_offset = Vec3::ZERO;
    }

    pub fn is_settled(&self) -> bool {
        self.theta_delta.abs() < 1e-6
            && self.phi_delta.abs() < 1e-6
            && (self.scale - 1.0).abs() < 1e-6
            && self.pan_offset.length_squared() < 1e-12
    }

    /// Applies one damped step to `camera`. Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let previous = camera.position;
        let offset = camera.position - self.target;
        let radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        let step = if self.damping_factor > 0.0 {
            self.damping_factor
        } else {
            1.0
        };
        if self.enabled {
            theta += self.theta_delta * step;
            phi += self.phi_delta * step;
        }
        phi = phi
            .clamp(self.min_polar, self.max_polar)
            .clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);

        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
        self.target += self.pan_offset * step;

        let sin_phi = phi.sin();
        let offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        camera.position = self.target + offset;
        camera.target = self.target;

        if step < 1.0 {
            self.theta_delta *= 1.0 - step;
            self.phi_delta *= 1.0 - step;
            self.pan_offset *= 1.0 - step;
        } else {
            self.theta_delta = 0.0;
            self.phi_delta = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        previous.distance(camera.position) > 1e-2
    }
}
