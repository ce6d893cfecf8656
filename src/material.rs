use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use cgmath::Vector4;

/// Primary texture input of a display material.
pub const MAIN_TEX: &str = "_MainTex";
/// World-space contact point published by the impact blip.
pub const HIT_POSITION: &str = "hitPosition";
/// Current blip intensity.
pub const HIT_STRENGTH: &str = "hitStrength";
/// Non-uniform scale mirrored from a transform.
pub const SCALE: &str = "_Scale";

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a GPU image. Materials only ever store ids;
/// the renderer resolves them through its texture registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(u64);

impl TextureId {
    pub fn next() -> Self {
        TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MaterialValue {
    Float(f32),
    Int(i32),
    Vector(Vector4<f32>),
    Texture(TextureId),
}

/// Named shader parameters for one object.
///
/// Setting a parameter overwrites any previous value under that name, whatever
/// its kind. Reading a parameter of the wrong kind behaves like reading a
/// missing one.
#[derive(Clone, Debug)]
pub struct Material {
    pub base_color: [f32; 4],
    params: HashMap<String, MaterialValue>,
}

impl Default for Material {
    fn default() -> Self {
        Self::new([1.0, 1.0, 1.0, 1.0])
    }
}

impl Material {
    pub fn new(base_color: [f32; 4]) -> Self {
        Self {
            base_color,
            params: HashMap::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: MaterialValue) {
        match self.params.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.params.insert(name.to_owned(), value);
            }
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.params.remove(name);
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set(name, MaterialValue::Float(value));
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.set(name, MaterialValue::Int(value));
    }

    pub fn set_vector(&mut self, name: &str, value: Vector4<f32>) {
        self.set(name, MaterialValue::Vector(value));
    }

    pub fn set_texture(&mut self, name: &str, texture: TextureId) {
        self.set(name, MaterialValue::Texture(texture));
    }

    pub fn get(&self, name: &str) -> Option<MaterialValue> {
        self.params.get(name).copied()
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            MaterialValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            MaterialValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn vector(&self, name: &str) -> Option<Vector4<f32>> {
        match self.get(name)? {
            MaterialValue::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn texture(&self, name: &str) -> Option<TextureId> {
        match self.get(name)? {
            MaterialValue::Texture(id) => Some(id),
            _ => None,
        }
    }
}
