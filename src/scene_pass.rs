use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use cgmath::Vector4;
use wgpu::util::DeviceExt;

use crate::camera::{Camera, DepthTextureMode};
use crate::gpu::TextureRegistry;
use crate::material::{TextureId, HIT_POSITION, HIT_STRENGTH, MAIN_TEX, SCALE};
use crate::mesh::{MeshKind, MeshVertex};
use crate::scene::{ObjectId, Scene, SceneObject};

pub const SCENE_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const SCENE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const CAMERA_GROUP_ID: u32 = 0;
const CAMERA_BUFFER_IDX: u32 = 0;

const OBJECT_GROUP_ID: u32 = 1;
const OBJECT_BUFFER_IDX: u32 = 0;
const MAIN_TEX_IDX: u32 = 1;
const MAIN_SAMPLER_IDX: u32 = 2;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.08,
    g: 0.09,
    b: 0.12,
    a: 1.0,
};

#[repr(C)]
#[derive(Default, Copy, Clone, Debug, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
}

/// Per-object shader inputs, filled from the transform and the material.
#[repr(C)]
#[derive(Default, Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    pub hit_position: [f32; 4],
    pub scale: [f32; 4],
    pub hit_strength: f32,
    _pad: [f32; 3],
}

impl ObjectUniform {
    /// Parameters the material does not carry fall back to neutral values:
    /// no glow and a `(1, 1)` texture scale.
    pub fn from_object(object: &SceneObject) -> Self {
        let material = &object.material;
        Self {
            model: object.transform.matrix().into(),
            base_color: material.base_color,
            hit_position: material
                .vector(HIT_POSITION)
                .unwrap_or(Vector4::new(0.0, 0.0, 0.0, 1.0))
                .into(),
            scale: material
                .vector(SCALE)
                .unwrap_or(Vector4::new(1.0, 1.0, 0.0, 0.0))
                .into(),
            hit_strength: material.float(HIT_STRENGTH).unwrap_or(0.0),
            _pad: [0.0; 3],
        }
    }
}

/// Offscreen color and depth the scene is drawn into. The depth texture is
/// only sampleable when the camera asked for it.
pub struct SceneTargets {
    width: u32,
    height: u32,
    depth_mode: DepthTextureMode,
    color: wgpu::TextureView,
    depth: wgpu::TextureView,
}

impl SceneTargets {
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        depth_mode: DepthTextureMode,
    ) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Color Target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let mut depth_usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        if depth_mode.wants_depth() {
            depth_usage |= wgpu::TextureUsages::TEXTURE_BINDING;
        }
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth Target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_DEPTH_FORMAT,
            usage: depth_usage,
            view_formats: &[],
        });
        log::debug!("Scene targets {width}x{height}, depth mode {depth_mode:?}");
        Self {
            width,
            height,
            depth_mode,
            color: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth: depth.create_view(&wgpu::TextureViewDescriptor::default()),
        }
    }

    /// Recreates the targets when the size or the camera's depth mode changed.
    pub fn ensure(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
        depth_mode: DepthTextureMode,
    ) {
        if (self.width, self.height, self.depth_mode) != (width.max(1), height.max(1), depth_mode)
        {
            *self = Self::new(device, width, height, depth_mode);
        }
    }

    pub fn color(&self) -> &wgpu::TextureView {
        &self.color
    }

    /// The depth buffer, if later passes may read it this frame.
    pub fn readable_depth(&self) -> Option<&wgpu::TextureView> {
        self.depth_mode.wants_depth().then_some(&self.depth)
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct ObjectResources {
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    texture: Option<TextureId>,
}

pub struct ScenePass {
    pipeline: wgpu::RenderPipeline,
    object_bind_group_layout: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    meshes: HashMap<MeshKind, GpuMesh>,
    objects: HashMap<ObjectId, ObjectResources>,
}

impl ScenePass {
    pub fn new(device: &wgpu::Device) -> Self {
        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene: Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: CAMERA_BUFFER_IDX,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        let object_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene: Object Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: OBJECT_BUFFER_IDX,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: MAIN_TEX_IDX,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: MAIN_SAMPLER_IDX,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout, &object_bind_group_layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::include_wgsl!("shaders/scene.wgsl"));
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[MeshVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(SCENE_COLOR_FORMAT.into())],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SCENE_DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene: Camera Uniform"),
            contents: bytemuck::cast_slice(&[CameraUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene: Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: CAMERA_BUFFER_IDX,
                resource: camera_buffer.as_entire_binding(),
            }],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Scene: Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let meshes = MeshKind::ALL
            .into_iter()
            .map(|kind| {
                let data = kind.geometry();
                let mesh = GpuMesh {
                    vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Scene: Mesh Vertex Buffer"),
                        contents: bytemuck::cast_slice(&data.vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
                    index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Scene: Mesh Index Buffer"),
                        contents: bytemuck::cast_slice(&data.indices),
                        usage: wgpu::BufferUsages::INDEX,
                    }),
                    index_count: data.indices.len() as u32,
                };
                (kind, mesh)
            })
            .collect();

        Self {
            pipeline,
            object_bind_group_layout,
            camera_buffer,
            camera_bind_group,
            sampler,
            meshes,
            objects: HashMap::new(),
        }
    }

    /// Uploads camera and per-object uniforms. Bind groups are rebuilt only
    /// for objects whose `_MainTex` changed.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Scene,
        camera: &Camera,
        textures: &TextureRegistry,
    ) {
        let camera_uniform = CameraUniform {
            view_proj: camera.view_projection().into(),
            light_dir: [-0.4, -1.0, -0.6, 0.0],
        };
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[camera_uniform]));

        for (id, object) in scene.iter() {
            let texture = object.material.texture(MAIN_TEX);
            let uniform = ObjectUniform::from_object(object);
            let stale = self.objects.get(&id).map_or(true, |r| r.texture != texture);
            if stale {
                let buffer = match self.objects.remove(&id) {
                    Some(resources) => resources.uniform,
                    None => device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some("Scene: Object Uniform"),
                        size: std::mem::size_of::<ObjectUniform>() as u64,
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    }),
                };
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Scene: Object Bind Group"),
                    layout: &self.object_bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: OBJECT_BUFFER_IDX,
                            resource: buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: MAIN_TEX_IDX,
                            resource: wgpu::BindingResource::TextureView(textures.resolve(texture)),
                        },
                        wgpu::BindGroupEntry {
                            binding: MAIN_SAMPLER_IDX,
                            resource: wgpu::BindingResource::Sampler(&self.sampler),
                        },
                    ],
                });
                log::debug!("Scene: rebound '{}' to texture {texture:?}", object.name);
                self.objects.insert(
                    id,
                    ObjectResources {
                        uniform: buffer,
                        bind_group,
                        texture,
                    },
                );
            }
            if let Some(resources) = self.objects.get(&id) {
                queue.write_buffer(&resources.uniform, 0, bytemuck::cast_slice(&[uniform]));
            }
        }
    }

    /// Draws every visible object into `targets`, clearing color and depth.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &SceneTargets,
        scene: &Scene,
    ) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(CAMERA_GROUP_ID, &self.camera_bind_group, &[]);

        for (id, object) in scene.iter().filter(|(_, o)| o.visible) {
            let (Some(mesh), Some(resources)) =
                (self.meshes.get(&object.mesh), self.objects.get(&id))
            else {
                continue;
            };
            rpass.set_bind_group(OBJECT_GROUP_ID, &resources.bind_group, &[]);
            rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            rpass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::scene::Transform;
    use cgmath::Vector3;

    #[test]
    fn uniform_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 128);
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
    }

    #[test]
    fn missing_parameters_use_neutral_defaults() {
        let object = SceneObject::new("plain", MeshKind::Cube, Transform::default());
        let uniform = ObjectUniform::from_object(&object);
        assert_eq!(uniform.hit_strength, 0.0);
        assert_eq!(uniform.scale, [1.0, 1.0, 0.0, 0.0]);
        assert_eq!(uniform.base_color, Material::default().base_color);
        assert_eq!(uniform.model[3], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn published_parameters_reach_the_uniform() {
        let mut material = Material::new([0.5, 0.25, 1.0, 1.0]);
        material.set_vector(HIT_POSITION, Vector4::new(1.0, 2.0, 3.0, 1.0));
        material.set_float(HIT_STRENGTH, 0.75);
        material.set_vector(SCALE, Vector4::new(2.0, 3.0, 0.0, 0.0));
        let object = SceneObject::new(
            "lit",
            MeshKind::Sphere,
            Transform::from_position(Vector3::new(4.0, 5.0, 6.0)),
        )
        .with_material(material);

        let uniform = ObjectUniform::from_object(&object);
        assert_eq!(uniform.hit_position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(uniform.hit_strength, 0.75);
        assert_eq!(uniform.scale, [2.0, 3.0, 0.0, 0.0]);
        assert_eq!(uniform.base_color, [0.5, 0.25, 1.0, 1.0]);
        assert_eq!(uniform.model[3], [4.0, 5.0, 6.0, 1.0]);
    }
}
