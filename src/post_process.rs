//! Screen-space depth post-process.
//!
//! [`DepthPostProcess`] decides per frame whether the configured program runs
//! or the rendered color is passed through untouched. The GPU work itself is
//! behind [`BlitEncoder`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::camera::{Camera, DepthTextureMode};

/// Records full-screen copies for one frame.
pub trait BlitEncoder {
    type Color;
    type Depth;
    type Program;

    /// Copies `src` to `dst` unchanged.
    fn copy(&mut self, src: &Self::Color, dst: &Self::Color);

    /// Runs `program` over `src` and `depth`, writing `dst`.
    fn blit(
        &mut self,
        program: &Self::Program,
        src: &Self::Color,
        depth: &Self::Depth,
        dst: &Self::Color,
    );
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PostProcessOutcome {
    Applied,
    PassThrough,
}

pub struct DepthPostProcess<P> {
    program: Option<P>,
    active: bool,
}

impl<P> DepthPostProcess<P> {
    pub fn new(program: Option<P>) -> Self {
        Self {
            program,
            active: false,
        }
    }

    pub fn program(&self) -> Option<&P> {
        self.program.as_ref()
    }

    pub fn set_program(&mut self, program: Option<P>) {
        self.program = program;
    }

    pub fn is_configured(&self) -> bool {
        self.program.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Asks the camera to keep a sampleable depth buffer.
    pub fn activate(&mut self, camera: &mut Camera) {
        camera.depth_texture_mode = DepthTextureMode::Depth;
        self.active = true;
        log::info!("Depth post-process enabled");
    }

    pub fn deactivate(&mut self, camera: &mut Camera) {
        camera.depth_texture_mode = DepthTextureMode::None;
        self.active = false;
        log::info!("Depth post-process disabled");
    }

    /// Flips between active and inactive; returns the new state.
    pub fn toggle(&mut self, camera: &mut Camera) -> bool {
        if self.active {
            self.deactivate(camera);
        } else {
            self.activate(camera);
        }
        self.active
    }

    /// Produces the final frame. Never fails: without a program or without a
    /// depth buffer the input is copied through.
    pub fn render<E>(
        &self,
        encoder: &mut E,
        src: &E::Color,
        depth: Option<&E::Depth>,
        dst: &E::Color,
    ) -> PostProcessOutcome
    where
        E: BlitEncoder<Program = P>,
    {
        match (&self.program, depth) {
            (Some(program), Some(depth)) => {
                encoder.blit(program, src, depth, dst);
                PostProcessOutcome::Applied
            }
            _ => {
                encoder.copy(src, dst);
                PostProcessOutcome::PassThrough
            }
        }
    }
}

/// Where the post-process program comes from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthEffectSource {
    /// No program: every frame passes through.
    Disabled,
    #[default]
    DepthFog,
    /// A WGSL file with `vs_main_quad` and `fs_main` and the depth fog
    /// bind group layout.
    File(PathBuf),
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthFogParams {
    /// View distance at which fog starts.
    pub fog_start: f32,
    /// View distance at which fog is fully opaque.
    pub fog_end: f32,
    pub fog_color: [f32; 3],
}

impl Default for DepthFogParams {
    fn default() -> Self {
        Self {
            fog_start: 3.0,
            fog_end: 14.0,
            fog_color: [0.55, 0.6, 0.7],
        }
    }
}

impl DepthFogParams {
    /// Converts a `[0, 1]` depth buffer sample to view distance.
    pub fn linear_depth(depth: f32, near: f32, far: f32) -> f32 {
        near * far / (far - depth * (far - near))
    }

    /// Fog amount in `[0, 1]` at view distance `distance`.
    pub fn fog_factor(&self, distance: f32) -> f32 {
        let span = (self.fog_end - self.fog_start).max(f32::EPSILON);
        ((distance - self.fog_start) / span).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;
    use std::cell::RefCell;

    type Pixels = RefCell<Vec<[f32; 3]>>;

    /// CPU stand-in: images are pixel vectors, programs are per-pixel
    /// functions of color and depth.
    #[derive(Default)]
    struct PixelEncoder {
        copies: usize,
        blits: usize,
    }

    impl BlitEncoder for PixelEncoder {
        type Color = Pixels;
        type Depth = Vec<f32>;
        type Program = fn([f32; 3], f32) -> [f32; 3];

        fn copy(&mut self, src: &Pixels, dst: &Pixels) {
            self.copies += 1;
            *dst.borrow_mut() = src.borrow().clone();
        }

        fn blit(&mut self, program: &Self::Program, src: &Pixels, depth: &Vec<f32>, dst: &Pixels) {
            self.blits += 1;
            *dst.borrow_mut() = src
                .borrow()
                .iter()
                .zip(depth)
                .map(|(&c, &d)| program(c, d))
                .collect();
        }
    }

    fn darken(color: [f32; 3], depth: f32) -> [f32; 3] {
        color.map(|c| c * (1.0 - depth))
    }

    fn frame() -> Pixels {
        RefCell::new(vec![[1.0, 0.5, 0.25], [0.0, 1.0, 0.0], [0.2, 0.2, 0.2]])
    }

    fn camera() -> Camera {
        Camera::new(Point3::new(0.0, 0.0, 5.0), Point3::new(0.0, 0.0, 0.0), 1.0)
    }

    #[test]
    fn unconfigured_pass_is_identity() {
        let post: DepthPostProcess<fn([f32; 3], f32) -> [f32; 3]> = DepthPostProcess::new(None);
        let mut encoder = PixelEncoder::default();
        let src = frame();
        let dst = RefCell::new(Vec::new());
        let depth = vec![0.5; 3];

        let outcome = post.render(&mut encoder, &src, Some(&depth), &dst);
        assert_eq!(outcome, PostProcessOutcome::PassThrough);
        assert_eq!(*dst.borrow(), *src.borrow());
        assert_eq!(encoder.blits, 0);
    }

    #[test]
    fn missing_depth_passes_through() {
        let post = DepthPostProcess::new(Some(darken as fn([f32; 3], f32) -> [f32; 3]));
        let mut encoder = PixelEncoder::default();
        let src = frame();
        let dst = RefCell::new(Vec::new());

        let outcome = post.render(&mut encoder, &src, None, &dst);
        assert_eq!(outcome, PostProcessOutcome::PassThrough);
        assert_eq!(*dst.borrow(), *src.borrow());
    }

    #[test]
    fn configured_program_runs_without_activation() {
        let post = DepthPostProcess::new(Some(darken as fn([f32; 3], f32) -> [f32; 3]));
        assert!(!post.is_active());
        let mut encoder = PixelEncoder::default();
        let src = frame();
        let dst = RefCell::new(Vec::new());
        let depth = vec![0.0, 0.5, 1.0];

        let outcome = post.render(&mut encoder, &src, Some(&depth), &dst);
        assert_eq!(outcome, PostProcessOutcome::Applied);
        assert_eq!(
            *dst.borrow(),
            vec![[1.0, 0.5, 0.25], [0.0, 0.5, 0.0], [0.0, 0.0, 0.0]]
        );
        assert_eq!((encoder.copies, encoder.blits), (0, 1));
    }

    #[test]
    fn activation_drives_camera_depth_mode() {
        let mut camera = camera();
        let mut post: DepthPostProcess<()> = DepthPostProcess::new(None);
        assert_eq!(camera.depth_texture_mode, DepthTextureMode::None);

        post.activate(&mut camera);
        assert_eq!(camera.depth_texture_mode, DepthTextureMode::Depth);
        assert!(post.is_active());

        assert!(!post.toggle(&mut camera));
        assert_eq!(camera.depth_texture_mode, DepthTextureMode::None);
        assert!(post.toggle(&mut camera));
        assert_eq!(camera.depth_texture_mode, DepthTextureMode::Depth);
    }

    #[test]
    fn linear_depth_spans_near_to_far() {
        assert!((DepthFogParams::linear_depth(0.0, 0.1, 100.0) - 0.1).abs() < 1e-5);
        assert!((DepthFogParams::linear_depth(1.0, 0.1, 100.0) - 100.0).abs() < 1e-2);
    }

    #[test]
    fn fog_factor_ramps_between_start_and_end() {
        let fog = DepthFogParams { fog_start: 2.0, fog_end: 6.0, ..Default::default() };
        assert_eq!(fog.fog_factor(1.0), 0.0);
        assert_eq!(fog.fog_factor(4.0), 0.5);
        assert_eq!(fog.fog_factor(10.0), 1.0);

        let degenerate = DepthFogParams { fog_start: 5.0, fog_end: 5.0, ..Default::default() };
        assert_eq!(degenerate.fog_factor(4.0), 0.0);
        assert_eq!(degenerate.fog_factor(6.0), 1.0);
    }

    #[test]
    fn effect_source_uses_snake_case_json() {
        let file: DepthEffectSource = serde_json::from_str(r#"{"file":"fx/edge.wgsl"}"#).unwrap();
        assert_eq!(file, DepthEffectSource::File(PathBuf::from("fx/edge.wgsl")));
        let fog: DepthEffectSource = serde_json::from_str(r#""depth_fog""#).unwrap();
        assert_eq!(fog, DepthEffectSource::DepthFog);
    }
}
