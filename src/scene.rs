use cgmath::{
    Deg, ElementWise, EuclideanSpace, InnerSpace, Matrix4, Point3, Quaternion, Rotation,
    Rotation3, Vector3, Zero,
};

use crate::material::Material;
use crate::mesh::MeshKind;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }

    /// Local-to-world matrix: translate * rotate * scale.
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn transform_point(&self, local: Point3<f32>) -> Point3<f32> {
        let scaled = Vector3::new(local.x, local.y, local.z).mul_element_wise(self.scale);
        Point3::from_vec(self.position + self.rotation.rotate_vector(scaled))
    }

    /// Inverse of [`Transform::transform_point`]. A zero scale component
    /// collapses that axis to 0 instead of producing infinities.
    pub fn inverse_transform_point(&self, world: Point3<f32>) -> Point3<f32> {
        let offset = Vector3::new(world.x, world.y, world.z) - self.position;
        let unrotated = self.rotation.conjugate().rotate_vector(offset);
        let inv = |v: f32, s: f32| if s == 0.0 { 0.0 } else { v / s };
        Point3::new(
            inv(unrotated.x, self.scale.x),
            inv(unrotated.y, self.scale.y),
            inv(unrotated.z, self.scale.z),
        )
    }

    /// Rotates about a world-space axis through the object's origin.
    pub fn rotate_world(&mut self, axis: Vector3<f32>, angle: Deg<f32>) {
        if axis.magnitude2() == 0.0 {
            return;
        }
        let delta = Quaternion::from_axis_angle(axis.normalize(), angle);
        self.rotation = (delta * self.rotation).normalize();
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
pub struct SceneObject {
    pub name: String,
    pub transform: Transform,
    pub material: Material,
    pub mesh: MeshKind,
    pub visible: bool,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, mesh: MeshKind, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
            material: Material::default(),
            mesh,
            visible: true,
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }
}

/// Flat list of objects. Objects are never removed, so an [`ObjectId`] stays
/// valid for the lifetime of the scene that issued it.
#[derive(Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0)
    }

    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects.iter().position(|o| o.name == name).map(ObjectId)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().enumerate().map(|(i, o)| (ObjectId(i), o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point3<f32>, b: Point3<f32>) -> bool {
        (a - b).magnitude() < 1e-5
    }

    #[test]
    fn point_round_trips_through_local_space() {
        let mut transform = Transform::from_position(Vector3::new(1.0, -2.0, 3.0))
            .with_scale(Vector3::new(2.0, 0.5, 4.0));
        transform.rotate_world(Vector3::unit_y(), Deg(37.0));
        let world = Point3::new(0.3, 1.7, -2.2);
        let local = transform.inverse_transform_point(world);
        assert!(close(transform.transform_point(local), world));
    }

    #[test]
    fn rotate_world_quarter_turn_about_up() {
        let mut transform = Transform::default();
        transform.rotate_world(Vector3::unit_y(), Deg(90.0));
        let p = transform.transform_point(Point3::new(1.0, 0.0, 0.0));
        assert!(close(p, Point3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn matrix_agrees_with_transform_point() {
        let mut transform = Transform::from_position(Vector3::new(4.0, 0.0, 1.0))
            .with_scale(Vector3::new(1.0, 3.0, 1.0));
        transform.rotate_world(Vector3::unit_x(), Deg(20.0));
        let local = Point3::new(0.5, 0.5, -0.5);
        let via_matrix = Point3::from_homogeneous(transform.matrix() * local.to_homogeneous());
        assert!(close(via_matrix, transform.transform_point(local)));
    }

    #[test]
    fn zero_scale_axis_collapses() {
        let transform = Transform::default().with_scale(Vector3::new(0.0, 1.0, 1.0));
        let local = transform.inverse_transform_point(Point3::new(5.0, 1.0, 1.0));
        assert_eq!(local, Point3::new(0.0, 1.0, 1.0));
    }

    #[test]
    fn ids_follow_spawn_order() {
        let mut scene = Scene::new();
        let a = scene.spawn(SceneObject::new("a", MeshKind::Cube, Transform::default()));
        let b = scene.spawn(SceneObject::new("b", MeshKind::Sphere, Transform::default()));
        assert_eq!(scene.find("b"), Some(b));
        assert_eq!(scene.get(a).map(|o| o.name.as_str()), Some("a"));
        assert_eq!(scene.len(), 2);
    }
}
