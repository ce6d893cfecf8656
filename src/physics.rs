use std::collections::HashSet;

use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3, Zero};

use crate::scene::{ObjectId, Scene};

/// Gap a resting pair may open between steps and still count as touching.
const CONTACT_SLOP: f32 = 1e-3;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactPoint {
    /// World-space point on the surface of the receiving object.
    pub point: Point3<f32>,
    /// Unit normal pointing from the receiving object toward the other one.
    pub normal: Vector3<f32>,
}

/// A contact-enter event as seen from `object`.
#[derive(Clone, Debug, PartialEq)]
pub struct Collision {
    pub object: ObjectId,
    pub other: ObjectId,
    pub contacts: Vec<ContactPoint>,
    pub relative_velocity: Vector3<f32>,
}

#[derive(Copy, Clone, Debug)]
pub struct DynamicBody {
    pub object: ObjectId,
    pub radius: f32,
    pub velocity: Vector3<f32>,
    pub restitution: f32,
}

#[derive(Copy, Clone, Debug)]
pub struct StaticCollider {
    pub object: ObjectId,
    pub radius: f32,
}

/// Spheres only: dynamic bodies fall under gravity and bounce off static
/// colliders. A pair produces events only on the frame it starts touching.
pub struct PhysicsWorld {
    pub gravity: Vector3<f32>,
    bodies: Vec<DynamicBody>,
    colliders: Vec<StaticCollider>,
    touching: HashSet<(usize, usize)>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(Vector3::new(0.0, -9.81, 0.0))
    }
}

impl PhysicsWorld {
    pub fn new(gravity: Vector3<f32>) -> Self {
        Self {
            gravity,
            bodies: Vec::new(),
            colliders: Vec::new(),
            touching: HashSet::new(),
        }
    }

    pub fn add_body(&mut self, body: DynamicBody) -> usize {
        self.bodies.push(body);
        self.bodies.len() - 1
    }

    pub fn add_collider(&mut self, collider: StaticCollider) -> usize {
        self.colliders.push(collider);
        self.colliders.len() - 1
    }

    pub fn body(&self, index: usize) -> Option<&DynamicBody> {
        self.bodies.get(index)
    }

    /// Teleports a body and replaces its velocity. Any contact it had is
    /// forgotten, so touching again counts as a new contact.
    pub fn launch(
        &mut self,
        scene: &mut Scene,
        index: usize,
        position: Vector3<f32>,
        velocity: Vector3<f32>,
    ) {
        let Some(body) = self.bodies.get_mut(index) else {
            return;
        };
        body.velocity = velocity;
        if let Some(object) = scene.get_mut(body.object) {
            object.transform.position = position;
        }
        self.touching.retain(|&(b, _)| b != index);
    }

    pub fn step(&mut self, scene: &mut Scene, dt: f32) -> Vec<Collision> {
        let mut events = Vec::new();
        if dt <= 0.0 {
            return events;
        }

        for (body_index, body) in self.bodies.iter_mut().enumerate() {
            body.velocity += self.gravity * dt;
            let Some(position) = scene
                .get_mut(body.object)
                .map(|o| &mut o.transform.position)
            else {
                continue;
            };
            *position += body.velocity * dt;

            for (collider_index, collider) in self.colliders.iter().enumerate() {
                let Some(center) = scene.get(collider.object).map(|o| o.transform.position) else {
                    continue;
                };
                let Some(position) = scene
                    .get_mut(body.object)
                    .map(|o| &mut o.transform.position)
                else {
                    continue;
                };

                let key = (body_index, collider_index);
                let offset = *position - center;
                let reach = body.radius + collider.radius;
                let distance = offset.magnitude();
                if distance > reach + CONTACT_SLOP {
                    self.touching.remove(&key);
                    continue;
                }

                let normal = if distance > f32::EPSILON {
                    offset / distance
                } else {
                    Vector3::unit_y()
                };
                if distance < reach {
                    *position = center + normal * reach;
                }

                let closing = body.velocity.dot(normal);
                if closing < 0.0 {
                    body.velocity -= normal * ((1.0 + body.restitution) * closing);
                }

                if self.touching.insert(key) {
                    let surface = Point3::from_vec(center + normal * collider.radius);
                    let relative_velocity = normal * closing;
                    events.push(Collision {
                        object: collider.object,
                        other: body.object,
                        contacts: vec![ContactPoint {
                            point: surface,
                            normal,
                        }],
                        relative_velocity,
                    });
                    events.push(Collision {
                        object: body.object,
                        other: collider.object,
                        contacts: vec![ContactPoint {
                            point: surface,
                            normal: -normal,
                        }],
                        relative_velocity: -relative_velocity,
                    });
                }
            }
        }
        events
    }
}

impl DynamicBody {
    pub fn new(object: ObjectId, radius: f32) -> Self {
        Self {
            object,
            radius,
            velocity: Vector3::zero(),
            restitution: 0.6,
        }
    }
}
