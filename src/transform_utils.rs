use cgmath::{Deg, Vector3, Vector4};
use serde::{Deserialize, Serialize};

use crate::frame::{FrameContext, FrameStep};
use crate::material::SCALE;
use crate::scene::ObjectId;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotatorConfig {
    /// Degrees per second.
    pub rotate_speed: f32,
    /// World-space axis, normalized on use.
    pub axis: [f32; 3],
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self {
            rotate_speed: 90.0,
            axis: [0.0, 1.0, 0.0],
        }
    }
}

/// Spins an object about a fixed world axis at a constant rate.
pub struct ContinuousRotator {
    object: ObjectId,
    config: RotatorConfig,
}

impl ContinuousRotator {
    pub fn new(object: ObjectId, config: RotatorConfig) -> Self {
        Self { object, config }
    }

    pub fn config(&self) -> &RotatorConfig {
        &self.config
    }
}

impl FrameStep for ContinuousRotator {
    fn name(&self) -> &str {
        "continuous rotator"
    }

    fn step(&mut self, ctx: &mut FrameContext<'_>) {
        let Some(object) = ctx.scene.get_mut(self.object) else {
            return;
        };
        let angle = Deg(self.config.rotate_speed * ctx.time.delta);
        object
            .transform
            .rotate_world(Vector3::from(self.config.axis), angle);
    }
}

/// Publishes one object's x/y scale as `_Scale` on a material, which may
/// belong to the same object or a different one.
pub struct ScaleMirror {
    source: ObjectId,
    target: ObjectId,
}

impl ScaleMirror {
    pub fn new(source: ObjectId) -> Self {
        Self {
            source,
            target: source,
        }
    }

    pub fn with_target(mut self, target: ObjectId) -> Self {
        self.target = target;
        self
    }
}

impl FrameStep for ScaleMirror {
    fn name(&self) -> &str {
        "scale mirror"
    }

    fn step(&mut self, ctx: &mut FrameContext<'_>) {
        let Some(scale) = ctx.scene.get(self.source).map(|o| o.transform.scale) else {
            return;
        };
        if let Some(target) = ctx.scene.get_mut(self.target) {
            target
                .material
                .set_vector(SCALE, Vector4::new(scale.x, scale.y, 0.0, 0.0));
        }
    }
}
