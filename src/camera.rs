use cgmath::{perspective, Deg, Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Which auxiliary buffers the scene pass has to make readable for later
/// passes. The color buffer is always produced.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthTextureMode {
    #[default]
    None,
    Depth,
    DepthNormals,
}

impl DepthTextureMode {
    pub fn wants_depth(self) -> bool {
        !matches!(self, DepthTextureMode::None)
    }
}

pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fovy: Deg<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    pub depth_texture_mode: DepthTextureMode,
}

impl Camera {
    pub fn new(eye: Point3<f32>, target: Point3<f32>, aspect: f32) -> Self {
        Self {
            eye,
            target,
            up: Vector3::unit_y(),
            fovy: Deg(50.0),
            aspect,
            znear: 0.1,
            zfar: 100.0,
            depth_texture_mode: DepthTextureMode::None,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        let view = Matrix4::look_at_rh(self.eye, self.target, self.up);
        let proj = perspective(self.fovy, self.aspect, self.znear, self.zfar);
        OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    #[test]
    fn target_projects_to_screen_center_inside_depth_range() {
        let camera = Camera::new(Point3::new(0.0, 2.0, 6.0), Point3::new(0.0, 0.0, 0.0), 1.5);
        let clip = camera.view_projection() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn depth_mode_defaults_to_none() {
        let camera = Camera::new(Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, 0.0, 0.0), 1.0);
        assert!(!camera.depth_texture_mode.wants_depth());
        assert!(DepthTextureMode::Depth.wants_depth());
    }
}
