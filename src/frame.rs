use crate::input::InputState;
use crate::physics::Collision;
use crate::scene::Scene;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Seconds since the scene was loaded.
    pub since_start: f32,
}

pub struct FrameContext<'a> {
    pub scene: &'a mut Scene,
    pub input: &'a InputState,
    pub time: FrameTime,
}

/// A behavior driven once per rendered frame.
pub trait FrameStep {
    fn name(&self) -> &str;

    fn step(&mut self, ctx: &mut FrameContext<'_>);

    /// Called for every contact-enter event of the frame, before `step`.
    /// Implementations filter on [`Collision::object`] themselves.
    fn on_collision_enter(&mut self, _scene: &mut Scene, _collision: &Collision) {}
}

#[derive(Default)]
pub struct FrameDriver {
    steps: Vec<Box<dyn FrameStep>>,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, step: Box<dyn FrameStep>) {
        log::debug!("Frame step registered: {}", step.name());
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn dispatch_collisions(&mut self, scene: &mut Scene, collisions: &[Collision]) {
        for collision in collisions {
            for step in &mut self.steps {
                step.on_collision_enter(scene, collision);
            }
        }
    }

    /// Steps every behavior in registration order.
    pub fn step_all(&mut self, ctx: &mut FrameContext<'_>) {
        for step in &mut self.steps {
            step.step(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshKind;
    use crate::scene::{ObjectId, SceneObject, Transform};
    use cgmath::{Point3, Vector3};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        label: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl FrameStep for Recorder {
        fn name(&self) -> &str {
            self.label
        }

        fn step(&mut self, ctx: &mut FrameContext<'_>) {
            self.log
                .borrow_mut()
                .push(format!("{} step {}", self.label, ctx.time.delta));
        }

        fn on_collision_enter(&mut self, _scene: &mut Scene, collision: &Collision) {
            self.log
                .borrow_mut()
                .push(format!("{} hit {}", self.label, collision.object.index()));
        }
    }

    #[test]
    fn steps_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut driver = FrameDriver::new();
        driver.add(Box::new(Recorder { label: "a", log: log.clone() }));
        driver.add(Box::new(Recorder { label: "b", log: log.clone() }));

        let mut scene = Scene::new();
        let input = InputState::new();
        let mut ctx = FrameContext {
            scene: &mut scene,
            input: &input,
            time: FrameTime { delta: 0.5, since_start: 1.0 },
        };
        driver.step_all(&mut ctx);
        assert_eq!(*log.borrow(), vec!["a step 0.5", "b step 0.5"]);
    }

    #[test]
    fn collisions_reach_every_step() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut driver = FrameDriver::new();
        driver.add(Box::new(Recorder { label: "a", log: log.clone() }));
        driver.add(Box::new(Recorder { label: "b", log: log.clone() }));

        let mut scene = Scene::new();
        let id: ObjectId = scene.spawn(SceneObject::new("x", MeshKind::Cube, Transform::default()));
        let collision = Collision {
            object: id,
            other: id,
            contacts: vec![crate::physics::ContactPoint {
                point: Point3::new(0.0, 0.0, 0.0),
                normal: Vector3::unit_y(),
            }],
            relative_velocity: Vector3::new(0.0, 0.0, 0.0),
        };
        driver.dispatch_collisions(&mut scene, &[collision]);
        assert_eq!(*log.borrow(), vec!["a hit 0", "b hit 0"]);
        assert_eq!(driver.len(), 2);
    }
}
