use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Fixed vertical field of view of the grid pass.
pub const GRID_FOV_Y: f32 = std::f32::consts::FRAC_PI_4;
pub const GRID_NEAR: f32 = 0.1;
pub const GRID_FAR: f32 = 10.0;

/// Camera settings as they appear in the engine config.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: [f32; 3],
    pub target: [f32; 3],
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    /// Small rotation of the scene about Y so both walls are visible.
    pub yaw_deg: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: [0.0, 0.7, 2.6],
            target: [0.0, -0.1, 0.0],
            fov_y_deg: 50.0,
            near: 0.05,
            far: 20.0,
            yaw_deg: 20.0,
        }
    }
}

/// Fixed-eye camera used for both render passes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WarpCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub yaw: f32,
}

impl Default for WarpCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl WarpCamera {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            eye: Vec3::from_array(config.eye),
            target: Vec3::from_array(config.target),
            fov_y: config.fov_y_deg.to_radians(),
            near: config.near,
            far: config.far,
            yaw: config.yaw_deg.to_radians(),
        }
    }

    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.yaw = yaw;
        self
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y) * Mat4::from_rotation_y(self.yaw)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, sanitize_aspect(aspect), self.near, self.far)
    }

    /// Simplified projection for the grid pass: only the aspect varies.
    pub fn grid_projection(aspect: f32) -> Mat4 {
        Mat4::perspective_rh(GRID_FOV_Y, sanitize_aspect(aspect), GRID_NEAR, GRID_FAR)
    }

    /// Transform uploaded to the field program.
    pub fn field_transform(&self, aspect: f32) -> Mat4 {
        compose(&self.projection_matrix(aspect), &self.view_matrix())
    }

    /// Transform uploaded to the grid program.
    pub fn grid_transform(&self, aspect: f32) -> Mat4 {
        compose(&Self::grid_projection(aspect), &self.view_matrix())
    }
}

/// `projection × view`. Returns a fresh matrix; neither input is touched.
pub fn compose(projection: &Mat4, view: &Mat4) -> Mat4 {
    projection.mul_mat4(view)
}

/// Aspect ratio of a drawable, falling back to 1 for a degenerate size.
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    if width == 0 || height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}
