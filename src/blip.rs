use cgmath::{EuclideanSpace, Point3, Vector4};
use serde::{Deserialize, Serialize};

use crate::frame::{FrameContext, FrameStep};
use crate::material::{HIT_POSITION, HIT_STRENGTH};
use crate::physics::Collision;
use crate::scene::{ObjectId, Scene};

/// Intensity below which the effect counts as idle.
pub const IDLE_THRESHOLD: f32 = 1e-3;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlipConfig {
    /// Per-frame intensity multiplier, in `[0, 1]`.
    pub decay_rate: f32,
}

impl Default for BlipConfig {
    fn default() -> Self {
        Self { decay_rate: 0.9 }
    }
}

impl BlipConfig {
    /// Clamps the decay rate into `[0, 1]`. Rates above 1 would grow the
    /// intensity without bound; negative rates would flip its sign.
    pub fn sanitized(self) -> Self {
        let decay_rate = if self.decay_rate.is_nan() {
            0.0
        } else {
            self.decay_rate.clamp(0.0, 1.0)
        };
        if decay_rate != self.decay_rate {
            log::warn!(
                "Blip decay rate {} out of range, using {decay_rate}",
                self.decay_rate
            );
        }
        Self { decay_rate }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlipState {
    Idle,
    Active,
}

/// Collision-driven glow. The first contact point of each hit is kept in the
/// object's local frame so it follows the object as it moves.
pub struct ImpactBlip {
    object: ObjectId,
    config: BlipConfig,
    local_hit: Point3<f32>,
    strength: f32,
}

impl ImpactBlip {
    pub fn new(object: ObjectId, config: BlipConfig) -> Self {
        Self {
            object,
            config: config.sanitized(),
            local_hit: Point3::origin(),
            strength: 0.0,
        }
    }

    pub fn config(&self) -> &BlipConfig {
        &self.config
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn local_hit(&self) -> Point3<f32> {
        self.local_hit
    }

    pub fn state(&self) -> BlipState {
        if self.strength < IDLE_THRESHOLD {
            BlipState::Idle
        } else {
            BlipState::Active
        }
    }

    /// Records a hit at a world-space point and restarts the glow at full
    /// intensity.
    pub fn hit(&mut self, scene: &Scene, world_point: Point3<f32>) {
        let Some(object) = scene.get(self.object) else {
            return;
        };
        self.local_hit = object.transform.inverse_transform_point(world_point);
        self.strength = 1.0;
    }
}

impl FrameStep for ImpactBlip {
    fn name(&self) -> &str {
        "impact blip"
    }

    fn on_collision_enter(&mut self, scene: &mut Scene, collision: &Collision) {
        if collision.object != self.object {
            return;
        }
        let Some(contact) = collision.contacts.first() else {
            log::trace!("Blip: collision without contact points ignored");
            return;
        };
        self.hit(scene, contact.point);
        log::debug!("Blip: hit at local {:?}", self.local_hit);
    }

    fn step(&mut self, ctx: &mut FrameContext<'_>) {
        let Some(object) = ctx.scene.get_mut(self.object) else {
            return;
        };
        let world = object.transform.transform_point(self.local_hit);
        object
            .material
            .set_vector(HIT_POSITION, Vector4::new(world.x, world.y, world.z, 1.0));
        object.material.set_float(HIT_STRENGTH, self.strength);
        self.strength *= self.config.decay_rate;
    }
}
