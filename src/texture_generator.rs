//! Compute-driven procedural texture.
//!
//! A [`TextureGenerator`] owns one square storage image. Each refresh binds the
//! image to the `CSMain` kernel of its compute program, optionally feeds it a
//! time-derived seed, dispatches one 8x8 workgroup per 8x8 texel tile and
//! republishes the image as the display material's `_MainTex`.

use std::fmt;

use serde::{Deserialize, Serialize};
use winit::keyboard::KeyCode;

use crate::frame::{FrameContext, FrameStep};
use crate::material::{TextureId, MAIN_TEX};
use crate::scene::{ObjectId, Scene};

/// Entry point every generator program must export.
pub const KERNEL_ENTRY_POINT: &str = "CSMain";
/// Writable output image of the kernel.
pub const RESULT_PARAM: &str = "Result";
/// Integer seed input of time-seeded kernels.
pub const RAND_OFFSET_PARAM: &str = "RandOffset";
/// Threads per workgroup along X and Y, matching `@workgroup_size(8, 8, 1)`.
pub const THREAD_GROUP_EXTENT: u32 = 8;

pub const DEFAULT_RESOLUTION: u32 = 256;
pub const DEFAULT_TRIGGER_KEY: KeyCode = KeyCode::Digit1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DispatchGrid {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchGrid {
    /// Workgroups needed for a `resolution x resolution` image. Truncates, so
    /// callers must reject resolutions that are not a multiple of
    /// [`THREAD_GROUP_EXTENT`].
    pub fn for_resolution(resolution: u32) -> Self {
        let groups = resolution / THREAD_GROUP_EXTENT;
        Self {
            x: groups,
            y: groups,
            z: 1,
        }
    }

    pub fn covered_extent(&self) -> (u32, u32) {
        (self.x * THREAD_GROUP_EXTENT, self.y * THREAD_GROUP_EXTENT)
    }

    pub fn invocations(&self) -> u64 {
        self.x as u64
            * self.y as u64
            * self.z as u64
            * (THREAD_GROUP_EXTENT * THREAD_GROUP_EXTENT) as u64
    }
}

/// Seed for `RandOffset`: hundredths of a second since the scene loaded.
pub fn time_seed(seconds_since_start: f32) -> i32 {
    (seconds_since_start * 100.0) as i32
}

/// Zero and non-multiples of [`THREAD_GROUP_EXTENT`] are rejected: the grid
/// truncates, so they would leave texels unwritten.
pub fn validate_resolution(resolution: u32) -> Result<(), GeneratorError> {
    if resolution == 0 {
        return Err(GeneratorError::InvalidResolution(resolution));
    }
    if resolution % THREAD_GROUP_EXTENT != 0 {
        return Err(GeneratorError::ResolutionNotAligned {
            resolution,
            extent: THREAD_GROUP_EXTENT,
        });
    }
    Ok(())
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Refresh once on activation, then once per release of the trigger key.
    #[default]
    OnTrigger,
    /// Refresh every frame without a seed.
    EveryFrame,
}

impl RefreshPolicy {
    pub fn is_seeded(self) -> bool {
        matches!(self, RefreshPolicy::OnTrigger)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureGeneratorConfig {
    /// Edge length of the square image in texels. Must be a positive multiple
    /// of 8.
    pub resolution: u32,
    pub policy: RefreshPolicy,
}

impl Default for TextureGeneratorConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            policy: RefreshPolicy::OnTrigger,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorError {
    MissingProgram,
    ProgramUnreadable { path: String, message: String },
    InvalidResolution(u32),
    ResolutionNotAligned { resolution: u32, extent: u32 },
    ResolutionTooLarge { resolution: u32, max: u32 },
    AlreadyActive,
    NotActive,
    ProgramCompile(String),
    KernelNotFound { name: String, message: String },
    KernelUnavailable,
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingProgram => write!(f, "no compute program configured"),
            Self::ProgramUnreadable { path, message } => {
                write!(f, "compute program {path} could not be read: {message}")
            }
            Self::InvalidResolution(resolution) => {
                write!(f, "texture resolution {resolution} is not positive")
            }
            Self::ResolutionNotAligned { resolution, extent } => write!(
                f,
                "texture resolution {resolution} is not a multiple of the workgroup extent {extent}"
            ),
            Self::ResolutionTooLarge { resolution, max } => write!(
                f,
                "texture resolution {resolution} exceeds the device limit of {max}"
            ),
            Self::AlreadyActive => write!(f, "texture generator already active"),
            Self::NotActive => write!(f, "texture generator not active"),
            Self::ProgramCompile(message) => {
                write!(f, "compute program failed to compile: {message}")
            }
            Self::KernelNotFound { name, message } => {
                write!(f, "kernel '{name}' could not be resolved: {message}")
            }
            Self::KernelUnavailable => write!(f, "kernel lookup failed earlier"),
        }
    }
}

impl std::error::Error for GeneratorError {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KernelHandle(pub usize);

pub trait ImageResource {
    fn texture_id(&self) -> TextureId;
    fn resolution(&self) -> u32;
}

/// The slice of a GPU compute API a generator needs.
///
/// Parameter setters are silent no-ops when the program declares no input of
/// that name.
pub trait ComputeBackend {
    type Image: ImageResource;

    fn create_image(&mut self, resolution: u32) -> Result<Self::Image, GeneratorError>;
    fn find_kernel(&mut self, name: &str) -> Result<KernelHandle, GeneratorError>;
    fn set_int(&mut self, name: &str, value: i32);
    fn set_image(&mut self, kernel: KernelHandle, name: &str, image: &Self::Image);
    fn dispatch(&mut self, kernel: KernelHandle, grid: DispatchGrid);
}

enum KernelSlot {
    Unresolved,
    Resolved(KernelHandle),
    Failed,
}

pub struct TextureGenerator<B: ComputeBackend> {
    label: String,
    target: ObjectId,
    config: TextureGeneratorConfig,
    trigger_key: KeyCode,
    backend: Option<B>,
    /// Why `backend` is missing, when building it failed.
    program_error: Option<GeneratorError>,
    image: Option<B::Image>,
    kernel: KernelSlot,
    refresh_count: u64,
}

impl<B: ComputeBackend> TextureGenerator<B> {
    pub fn new(
        label: impl Into<String>,
        target: ObjectId,
        config: TextureGeneratorConfig,
        backend: Option<B>,
    ) -> Self {
        Self {
            label: label.into(),
            target,
            config,
            trigger_key: DEFAULT_TRIGGER_KEY,
            backend,
            program_error: None,
            image: None,
            kernel: KernelSlot::Unresolved,
            refresh_count: 0,
        }
    }

    /// A generator whose program could not be built. Activation reports
    /// `error` and the frame step stays a no-op.
    pub fn unavailable(
        label: impl Into<String>,
        target: ObjectId,
        config: TextureGeneratorConfig,
        error: GeneratorError,
    ) -> Self {
        let mut generator = Self::new(label, target, config, None);
        generator.program_error = Some(error);
        generator
    }

    pub fn with_trigger_key(mut self, key: KeyCode) -> Self {
        self.trigger_key = key;
        self
    }

    pub fn config(&self) -> &TextureGeneratorConfig {
        &self.config
    }

    pub fn image(&self) -> Option<&B::Image> {
        self.image.as_ref()
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.image.is_some()
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    /// Allocates the output image and binds it to the target material. The
    /// on-trigger variant also runs its first refresh here; if that fails the
    /// image and the `_MainTex` binding are rolled back.
    pub fn activate(&mut self, scene: &mut Scene, since_start: f32) -> Result<(), GeneratorError> {
        if self.image.is_some() {
            return Err(GeneratorError::AlreadyActive);
        }
        let Some(backend) = self.backend.as_mut() else {
            return Err(self
                .program_error
                .clone()
                .unwrap_or(GeneratorError::MissingProgram));
        };
        let resolution = self.config.resolution;
        validate_resolution(resolution)?;

        let image = backend.create_image(resolution)?;
        log::info!(
            "{}: activated {resolution}x{resolution} image {:?} ({:?})",
            self.label,
            image.texture_id(),
            self.config.policy
        );
        let previous = scene
            .get(self.target)
            .and_then(|o| o.material.get(MAIN_TEX));
        publish(scene, self.target, &image);
        self.image = Some(image);

        if self.config.policy == RefreshPolicy::OnTrigger {
            if let Err(err) = self.refresh(scene, since_start) {
                self.image = None;
                if let Some(object) = scene.get_mut(self.target) {
                    match previous {
                        Some(value) => object.material.set(MAIN_TEX, value),
                        None => object.material.remove(MAIN_TEX),
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Runs the kernel once over the whole image and republishes it.
    pub fn refresh(&mut self, scene: &mut Scene, since_start: f32) -> Result<(), GeneratorError> {
        let (Some(backend), Some(image)) = (self.backend.as_mut(), self.image.as_ref()) else {
            return Err(GeneratorError::NotActive);
        };

        let kernel = match self.kernel {
            KernelSlot::Resolved(handle) => handle,
            KernelSlot::Failed => return Err(GeneratorError::KernelUnavailable),
            KernelSlot::Unresolved => match backend.find_kernel(KERNEL_ENTRY_POINT) {
                Ok(handle) => {
                    log::debug!("{}: resolved kernel {KERNEL_ENTRY_POINT}", self.label);
                    self.kernel = KernelSlot::Resolved(handle);
                    handle
                }
                Err(err) => {
                    self.kernel = KernelSlot::Failed;
                    return Err(err);
                }
            },
        };

        if self.config.policy.is_seeded() {
            backend.set_int(RAND_OFFSET_PARAM, time_seed(since_start));
        }
        backend.set_image(kernel, RESULT_PARAM, image);
        backend.dispatch(kernel, DispatchGrid::for_resolution(image.resolution()));
        publish(scene, self.target, image);
        self.refresh_count += 1;
        Ok(())
    }
}

fn publish<I: ImageResource>(scene: &mut Scene, target: ObjectId, image: &I) {
    if let Some(object) = scene.get_mut(target) {
        object.material.set_texture(MAIN_TEX, image.texture_id());
    }
}

impl<B: ComputeBackend> FrameStep for TextureGenerator<B> {
    fn name(&self) -> &str {
        &self.label
    }

    fn step(&mut self, ctx: &mut FrameContext<'_>) {
        if !self.is_active() {
            return;
        }
        let due = match self.config.policy {
            RefreshPolicy::EveryFrame => true,
            RefreshPolicy::OnTrigger => ctx.input.key_released(self.trigger_key),
        };
        if !due {
            return;
        }
        match self.refresh(ctx.scene, ctx.time.since_start) {
            Ok(()) => {}
            Err(GeneratorError::KernelUnavailable) => {}
            Err(err) => log::error!("{}: refresh failed: {err}", self.label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameTime;
    use crate::input::InputState;
    use crate::mesh::MeshKind;
    use crate::scene::{SceneObject, Transform};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        CreateImage(u32),
        FindKernel(String),
        SetInt(String, i32),
        SetImage(usize, String, TextureId),
        Dispatch(usize, DispatchGrid),
    }

    struct FakeImage {
        id: TextureId,
        resolution: u32,
    }

    impl ImageResource for FakeImage {
        fn texture_id(&self) -> TextureId {
            self.id
        }

        fn resolution(&self) -> u32 {
            self.resolution
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        calls: Vec<Call>,
        missing_kernel: bool,
        max_resolution: Option<u32>,
    }

    impl FakeBackend {
        fn dispatches(&self) -> Vec<DispatchGrid> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Dispatch(_, grid) => Some(*grid),
                    _ => None,
                })
                .collect()
        }

        fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| pred(c)).count()
        }
    }

    impl ComputeBackend for FakeBackend {
        type Image = FakeImage;

        fn create_image(&mut self, resolution: u32) -> Result<FakeImage, GeneratorError> {
            self.calls.push(Call::CreateImage(resolution));
            if let Some(max) = self.max_resolution {
                if resolution > max {
                    return Err(GeneratorError::ResolutionTooLarge { resolution, max });
                }
            }
            Ok(FakeImage {
                id: TextureId::next(),
                resolution,
            })
        }

        fn find_kernel(&mut self, name: &str) -> Result<KernelHandle, GeneratorError> {
            self.calls.push(Call::FindKernel(name.to_owned()));
            if self.missing_kernel {
                return Err(GeneratorError::KernelNotFound {
                    name: name.to_owned(),
                    message: "no such entry point".to_owned(),
                });
            }
            Ok(KernelHandle(7))
        }

        fn set_int(&mut self, name: &str, value: i32) {
            self.calls.push(Call::SetInt(name.to_owned(), value));
        }

        fn set_image(&mut self, kernel: KernelHandle, name: &str, image: &FakeImage) {
            self.calls
                .push(Call::SetImage(kernel.0, name.to_owned(), image.texture_id()));
        }

        fn dispatch(&mut self, kernel: KernelHandle, grid: DispatchGrid) {
            self.calls.push(Call::Dispatch(kernel.0, grid));
        }
    }

    fn scene_with_target() -> (Scene, ObjectId) {
        let mut scene = Scene::new();
        let id = scene.spawn(SceneObject::new("quad", MeshKind::Quad, Transform::default()));
        (scene, id)
    }

    fn generator(
        target: ObjectId,
        resolution: u32,
        policy: RefreshPolicy,
    ) -> TextureGenerator<FakeBackend> {
        TextureGenerator::new(
            "test",
            target,
            TextureGeneratorConfig { resolution, policy },
            Some(FakeBackend::default()),
        )
    }

    fn run_frame(
        generator: &mut TextureGenerator<FakeBackend>,
        scene: &mut Scene,
        input: &InputState,
        since_start: f32,
    ) {
        let mut ctx = FrameContext {
            scene,
            input,
            time: FrameTime { delta: 1.0 / 60.0, since_start },
        };
        generator.step(&mut ctx);
    }

    #[test]
    fn grid_covers_every_aligned_resolution() {
        for resolution in (8..=2048).step_by(8) {
            let grid = DispatchGrid::for_resolution(resolution);
            assert_eq!(grid, DispatchGrid { x: resolution / 8, y: resolution / 8, z: 1 });
            assert_eq!(grid.covered_extent(), (resolution, resolution));
            assert_eq!(grid.invocations(), resolution as u64 * resolution as u64);
        }
    }

    #[test]
    fn default_resolution_grid() {
        assert_eq!(
            DispatchGrid::for_resolution(DEFAULT_RESOLUTION),
            DispatchGrid { x: 32, y: 32, z: 1 }
        );
    }

    #[test]
    fn seed_is_truncated_hundredths() {
        assert_eq!(time_seed(0.0), 0);
        assert_eq!(time_seed(1.234), 123);
        assert_eq!(time_seed(2.999), 299);
        assert_eq!(time_seed(42.0), 4200);
    }

    #[test]
    fn activation_binds_main_texture_and_refreshes_once() {
        let (mut scene, target) = scene_with_target();
        let mut texgen = generator(target, 256, RefreshPolicy::OnTrigger);
        texgen.activate(&mut scene, 1.5).unwrap();

        let id = texgen.image().map(|i| i.texture_id());
        assert_eq!(scene.get(target).and_then(|o| o.material.texture(MAIN_TEX)), id);
        assert_eq!(texgen.refresh_count(), 1);

        let backend = texgen.backend().unwrap();
        let id = id.unwrap();
        assert_eq!(
            backend.calls,
            vec![
                Call::CreateImage(256),
                Call::FindKernel(KERNEL_ENTRY_POINT.to_owned()),
                Call::SetInt(RAND_OFFSET_PARAM.to_owned(), 150),
                Call::SetImage(7, RESULT_PARAM.to_owned(), id),
                Call::Dispatch(7, DispatchGrid { x: 32, y: 32, z: 1 }),
            ]
        );
    }

    #[test]
    fn kernel_is_resolved_once() {
        let (mut scene, target) = scene_with_target();
        let mut texgen = generator(target, 64, RefreshPolicy::OnTrigger);
        texgen.activate(&mut scene, 0.0).unwrap();
        for i in 0..5 {
            texgen.refresh(&mut scene, i as f32).unwrap();
        }
        let backend = texgen.backend().unwrap();
        assert_eq!(backend.count(|c| matches!(c, Call::FindKernel(_))), 1);
        assert_eq!(backend.dispatches().len(), 6);
    }

    #[test]
    fn manual_variant_waits_for_trigger() {
        let (mut scene, target) = scene_with_target();
        let mut texgen = generator(target, 256, RefreshPolicy::OnTrigger);
        texgen.activate(&mut scene, 0.0).unwrap();

        let mut input = InputState::new();
        for frame in 0..30 {
            run_frame(&mut texgen, &mut scene, &input, frame as f32 / 60.0);
            input.end_frame();
        }
        assert_eq!(texgen.refresh_count(), 1);

        input.press(DEFAULT_TRIGGER_KEY);
        run_frame(&mut texgen, &mut scene, &input, 1.0);
        input.end_frame();
        assert_eq!(texgen.refresh_count(), 1);
    }

    #[test]
    fn manual_variant_refreshes_once_per_trigger() {
        let (mut scene, target) = scene_with_target();
        let mut texgen = generator(target, 256, RefreshPolicy::OnTrigger);
        texgen.activate(&mut scene, 0.0).unwrap();

        let mut input = InputState::new();
        for frame in 0..10 {
            input.press(DEFAULT_TRIGGER_KEY);
            input.release(DEFAULT_TRIGGER_KEY);
            run_frame(&mut texgen, &mut scene, &input, frame as f32);
            input.end_frame();
        }
        assert_eq!(texgen.refresh_count(), 11);

        let seeds: Vec<i32> = texgen
            .backend()
            .unwrap()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::SetInt(_, v) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(seeds[1..], [0, 100, 200, 300, 400, 500, 600, 700, 800, 900]);
    }

    #[test]
    fn other_keys_do_not_trigger() {
        let (mut scene, target) = scene_with_target();
        let mut texgen =
            generator(target, 256, RefreshPolicy::OnTrigger).with_trigger_key(KeyCode::KeyR);
        texgen.activate(&mut scene, 0.0).unwrap();

        let mut input = InputState::new();
        input.release(DEFAULT_TRIGGER_KEY);
        run_frame(&mut texgen, &mut scene, &input, 0.5);
        assert_eq!(texgen.refresh_count(), 1);

        input.release(KeyCode::KeyR);
        run_frame(&mut texgen, &mut scene, &input, 0.6);
        assert_eq!(texgen.refresh_count(), 2);
    }

    #[test]
    fn every_frame_variant_is_unseeded() {
        let (mut scene, target) = scene_with_target();
        let mut texgen = generator(target, 128, RefreshPolicy::EveryFrame);
        texgen.activate(&mut scene, 0.0).unwrap();
        assert_eq!(texgen.refresh_count(), 0);

        let input = InputState::new();
        for frame in 0..4 {
            run_frame(&mut texgen, &mut scene, &input, frame as f32);
        }
        assert_eq!(texgen.refresh_count(), 4);
        let backend = texgen.backend().unwrap();
        assert_eq!(backend.count(|c| matches!(c, Call::SetInt(..))), 0);
        assert!(backend
            .dispatches()
            .iter()
            .all(|g| *g == DispatchGrid { x: 16, y: 16, z: 1 }));
    }

    #[test]
    fn activation_rejects_bad_configuration() {
        let (mut scene, target) = scene_with_target();

        let mut texgen = generator(target, 0, RefreshPolicy::OnTrigger);
        assert_eq!(texgen.activate(&mut scene, 0.0), Err(GeneratorError::InvalidResolution(0)));

        let mut texgen = generator(target, 100, RefreshPolicy::OnTrigger);
        assert_eq!(
            texgen.activate(&mut scene, 0.0),
            Err(GeneratorError::ResolutionNotAligned { resolution: 100, extent: 8 })
        );
        assert!(texgen.backend().unwrap().calls.is_empty());

        let mut texgen: TextureGenerator<FakeBackend> = TextureGenerator::new(
            "no program",
            target,
            TextureGeneratorConfig::default(),
            None,
        );
        assert_eq!(texgen.activate(&mut scene, 0.0), Err(GeneratorError::MissingProgram));

        let mut texgen = TextureGenerator::new(
            "too big",
            target,
            TextureGeneratorConfig { resolution: 8192, policy: RefreshPolicy::EveryFrame },
            Some(FakeBackend { max_resolution: Some(4096), ..Default::default() }),
        );
        assert_eq!(
            texgen.activate(&mut scene, 0.0),
            Err(GeneratorError::ResolutionTooLarge { resolution: 8192, max: 4096 })
        );
        assert!(!texgen.is_active());
        assert_eq!(scene.get(target).and_then(|o| o.material.texture(MAIN_TEX)), None);
    }

    #[test]
    fn second_activation_is_rejected() {
        let (mut scene, target) = scene_with_target();
        let mut texgen = generator(target, 32, RefreshPolicy::EveryFrame);
        texgen.activate(&mut scene, 0.0).unwrap();
        let first = texgen.image().map(|i| i.texture_id());
        assert_eq!(texgen.activate(&mut scene, 0.0), Err(GeneratorError::AlreadyActive));
        assert_eq!(texgen.image().map(|i| i.texture_id()), first);
    }

    #[test]
    fn inactive_generator_never_dispatches() {
        let (mut scene, target) = scene_with_target();
        let mut texgen = generator(target, 64, RefreshPolicy::EveryFrame);
        let input = InputState::new();
        run_frame(&mut texgen, &mut scene, &input, 0.0);
        assert_eq!(texgen.refresh(&mut scene, 0.0), Err(GeneratorError::NotActive));
        assert!(texgen.backend().unwrap().calls.is_empty());
    }

    #[test]
    fn failed_first_refresh_leaves_generator_inactive() {
        let (mut scene, target) = scene_with_target();
        let mut texgen = TextureGenerator::new(
            "broken",
            target,
            TextureGeneratorConfig::default(),
            Some(FakeBackend { missing_kernel: true, ..Default::default() }),
        );
        assert!(matches!(
            texgen.activate(&mut scene, 0.0),
            Err(GeneratorError::KernelNotFound { .. })
        ));
        assert!(!texgen.is_active());
        assert!(texgen.image().is_none());
        assert_eq!(scene.get(target).and_then(|o| o.material.texture(MAIN_TEX)), None);

        // Retrying fails on the cached lookup rather than on `AlreadyActive`.
        assert_eq!(texgen.activate(&mut scene, 0.0), Err(GeneratorError::KernelUnavailable));
        assert!(!texgen.is_active());

        let mut input = InputState::new();
        input.press(DEFAULT_TRIGGER_KEY);
        input.end_frame();
        input.release(DEFAULT_TRIGGER_KEY);
        run_frame(&mut texgen, &mut scene, &input, 1.0);
        assert!(texgen.backend().unwrap().dispatches().is_empty());
    }

    #[test]
    fn failed_first_refresh_restores_previous_texture() {
        let (mut scene, target) = scene_with_target();
        let previous = TextureId::next();
        scene
            .get_mut(target)
            .unwrap()
            .material
            .set_texture(MAIN_TEX, previous);
        let mut texgen = TextureGenerator::new(
            "broken",
            target,
            TextureGeneratorConfig::default(),
            Some(FakeBackend { missing_kernel: true, ..Default::default() }),
        );
        assert!(texgen.activate(&mut scene, 0.0).is_err());
        assert_eq!(
            scene.get(target).and_then(|o| o.material.texture(MAIN_TEX)),
            Some(previous)
        );
    }

    #[test]
    fn unavailable_program_reports_its_error() {
        let (mut scene, target) = scene_with_target();
        let error = GeneratorError::ProgramCompile("expected ';'".to_owned());
        let mut texgen: TextureGenerator<FakeBackend> = TextureGenerator::unavailable(
            "bad kernel",
            target,
            TextureGeneratorConfig::default(),
            error.clone(),
        );
        assert_eq!(texgen.activate(&mut scene, 0.0), Err(error));
        assert!(!texgen.is_active());

        let input = InputState::new();
        run_frame(&mut texgen, &mut scene, &input, 0.0);
        assert_eq!(scene.get(target).and_then(|o| o.material.texture(MAIN_TEX)), None);
    }

    #[test]
    fn failed_kernel_lookup_is_not_retried() {
        let (mut scene, target) = scene_with_target();
        let mut texgen = TextureGenerator::new(
            "broken",
            target,
            TextureGeneratorConfig { resolution: 64, policy: RefreshPolicy::EveryFrame },
            Some(FakeBackend { missing_kernel: true, ..Default::default() }),
        );
        texgen.activate(&mut scene, 0.0).unwrap();

        let input = InputState::new();
        for frame in 0..3 {
            run_frame(&mut texgen, &mut scene, &input, frame as f32);
        }
        assert_eq!(texgen.refresh(&mut scene, 0.0), Err(GeneratorError::KernelUnavailable));
        let backend = texgen.backend().unwrap();
        assert_eq!(backend.count(|c| matches!(c, Call::FindKernel(_))), 1);
        assert!(backend.dispatches().is_empty());
        assert_eq!(texgen.refresh_count(), 0);
    }
}
