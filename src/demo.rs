//! The demo scene: what gets spawned where, and the behaviors that need no GPU.

use cgmath::{Point3, Vector3, Zero};

use crate::blip::ImpactBlip;
use crate::camera::Camera;
use crate::frame::FrameStep;
use crate::material::Material;
use crate::mesh::MeshKind;
use crate::physics::{DynamicBody, PhysicsWorld, StaticCollider};
use crate::scene::{ObjectId, Scene, SceneObject, Transform};
use crate::settings::DemoSettings;
use crate::transform_utils::{ContinuousRotator, ScaleMirror};

const TARGET_RADIUS: f32 = 0.75;
const BALL_RADIUS: f32 = 0.2;
const BALL_START: Vector3<f32> = Vector3::new(0.25, 4.5, 0.1);
/// The ball is relaunched once it drops below this height.
const BALL_FLOOR: f32 = -0.2;

pub struct DemoScene {
    pub scene: Scene,
    pub physics: PhysicsWorld,
    pub noise_quad: ObjectId,
    pub pattern_cube: ObjectId,
    pub target: ObjectId,
    pub ball: ObjectId,
    pub panel: ObjectId,
    ball_body: usize,
}

impl DemoScene {
    pub fn build() -> Self {
        let mut scene = Scene::new();

        scene.spawn(
            SceneObject::new(
                "floor",
                MeshKind::Cube,
                Transform::from_position(Vector3::new(0.0, -0.3, -4.0))
                    .with_scale(Vector3::new(14.0, 0.1, 20.0)),
            )
            .with_material(Material::new([0.45, 0.47, 0.5, 1.0])),
        );
        let noise_quad = scene.spawn(SceneObject::new(
            "noise quad",
            MeshKind::Quad,
            Transform::from_position(Vector3::new(-2.6, 1.2, 0.0))
                .with_scale(Vector3::new(2.0, 2.0, 1.0)),
        ));
        let pattern_cube = scene.spawn(SceneObject::new(
            "pattern cube",
            MeshKind::Cube,
            Transform::from_position(Vector3::new(2.6, 1.0, 0.0))
                .with_scale(Vector3::new(1.4, 1.4, 1.4)),
        ));
        let target = scene.spawn(
            SceneObject::new(
                "blip target",
                MeshKind::Sphere,
                Transform::from_position(Vector3::new(0.0, 0.5, 0.0))
                    .with_scale(Vector3::new(1.5, 1.5, 1.5)),
            )
            .with_material(Material::new([0.3, 0.45, 0.9, 1.0])),
        );
        let ball = scene.spawn(
            SceneObject::new(
                "ball",
                MeshKind::Sphere,
                Transform::from_position(BALL_START).with_scale(Vector3::new(0.4, 0.4, 0.4)),
            )
            .with_material(Material::new([0.95, 0.9, 0.8, 1.0])),
        );
        let panel = scene.spawn(SceneObject::new(
            "scaled panel",
            MeshKind::Quad,
            Transform::from_position(Vector3::new(0.0, 2.9, -3.0))
                .with_scale(Vector3::new(4.0, 1.5, 1.0)),
        ));

        let mut physics = PhysicsWorld::default();
        physics.add_collider(StaticCollider {
            object: target,
            radius: TARGET_RADIUS,
        });
        let ball_body = physics.add_body(DynamicBody::new(ball, BALL_RADIUS));

        Self {
            scene,
            physics,
            noise_quad,
            pattern_cube,
            target,
            ball,
            panel,
            ball_body,
        }
    }

    pub fn camera(aspect: f32) -> Camera {
        Camera::new(Point3::new(0.0, 2.5, 7.0), Point3::new(0.0, 0.8, 0.0), aspect)
    }

    /// Drops the ball from its start height again.
    pub fn relaunch_ball(&mut self) {
        self.physics
            .launch(&mut self.scene, self.ball_body, BALL_START, Vector3::zero());
        log::debug!("Ball relaunched");
    }

    pub fn relaunch_if_fallen(&mut self) {
        let fallen = self
            .scene
            .get(self.ball)
            .is_some_and(|o| o.transform.position.y < BALL_FLOOR);
        if fallen {
            self.relaunch_ball();
        }
    }

    /// Behaviors driven purely by the CPU side of the scene.
    pub fn behaviors(&self, settings: &DemoSettings) -> Vec<Box<dyn FrameStep>> {
        vec![
            Box::new(ImpactBlip::new(self.target, settings.blip)),
            Box::new(ContinuousRotator::new(self.pattern_cube, settings.rotator)),
            Box::new(ScaleMirror::new(self.panel)),
        ]
    }
}
