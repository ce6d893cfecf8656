use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};

use crate::camera::Camera;
use crate::gpu::{validated, GpuValidationError};
use crate::post_process::{BlitEncoder, DepthEffectSource, DepthFogParams};
use crate::present_pass::{begin_fullscreen_pass, PresentBindings, PresentPass};

const EFFECT_GROUP_ID: u32 = 0;
const COLOR_IDX: u32 = 0;
const DEPTH_IDX: u32 = 1;
const SAMPLER_IDX: u32 = 2;
const PARAMS_IDX: u32 = 3;

#[repr(C)]
#[derive(Default, Copy, Clone, Debug, Pod, Zeroable)]
pub struct DepthParamsUniform {
    near: f32,
    far: f32,
    fog_start: f32,
    fog_end: f32,
    fog_color: [f32; 4],
}

impl DepthParamsUniform {
    pub fn new(camera: &Camera, fog: &DepthFogParams) -> Self {
        let [r, g, b] = fog.fog_color;
        Self {
            near: camera.znear,
            far: camera.zfar,
            fog_start: fog.fog_start,
            fog_end: fog.fog_end,
            fog_color: [r, g, b, 1.0],
        }
    }
}

/// Full-screen program reading scene color and depth.
pub struct DepthEffectPass {
    label: String,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    params: wgpu::Buffer,
}

impl DepthEffectPass {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        label: &str,
        wgsl: Cow<'_, str>,
    ) -> Result<Self, GpuValidationError> {
        let shader = validated(device, label, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(wgsl),
            })
        })?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Depth Effect: Source Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: COLOR_IDX,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: DEPTH_IDX,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: SAMPLER_IDX,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: PARAMS_IDX,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Depth Effect Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = validated(device, label, || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main_quad"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(format.into())],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Depth Effect Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Depth Effect: Params Uniform"),
            size: std::mem::size_of::<DepthParamsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::info!("Depth effect program '{label}' ready");
        Ok(Self {
            label: label.to_owned(),
            pipeline,
            bind_group_layout,
            sampler,
            params,
        })
    }

    /// Built-in distance fog.
    pub fn depth_fog(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> Result<Self, GpuValidationError> {
        Self::new(
            device,
            format,
            "Depth Fog",
            Cow::Borrowed(include_str!("shaders/depth_fog.wgsl")),
        )
    }

    /// Loads the configured program. Failures are logged and leave the
    /// effect unconfigured.
    pub fn from_source(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        source: &DepthEffectSource,
    ) -> Option<Self> {
        let result = match source {
            DepthEffectSource::Disabled => return None,
            DepthEffectSource::DepthFog => Self::depth_fog(device, format),
            DepthEffectSource::File(path) => match std::fs::read_to_string(path) {
                Ok(wgsl) => Self::new(
                    device,
                    format,
                    &path.display().to_string(),
                    Cow::Owned(wgsl),
                ),
                Err(err) => {
                    log::error!("Failed to read depth effect {}: {err}", path.display());
                    return None;
                }
            },
        };
        result
            .map_err(|err| log::error!("Depth effect unavailable: {err}"))
            .ok()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn update_params(&self, queue: &wgpu::Queue, camera: &Camera, fog: &DepthFogParams) {
        queue.write_buffer(
            &self.params,
            0,
            bytemuck::cast_slice(&[DepthParamsUniform::new(camera, fog)]),
        );
    }

    fn bind(
        &self,
        device: &wgpu::Device,
        color: &wgpu::TextureView,
        depth: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Depth Effect: Source Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: COLOR_IDX,
                    resource: wgpu::BindingResource::TextureView(color),
                },
                wgpu::BindGroupEntry {
                    binding: DEPTH_IDX,
                    resource: wgpu::BindingResource::TextureView(depth),
                },
                wgpu::BindGroupEntry {
                    binding: SAMPLER_IDX,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: PARAMS_IDX,
                    resource: self.params.as_entire_binding(),
                },
            ],
        })
    }
}

/// [`BlitEncoder`] recording into one frame's command encoder.
pub struct WgpuBlitEncoder<'a> {
    pub device: &'a wgpu::Device,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub present: &'a PresentPass,
}

impl BlitEncoder for WgpuBlitEncoder<'_> {
    type Color = wgpu::TextureView;
    type Depth = wgpu::TextureView;
    type Program = DepthEffectPass;

    fn copy(&mut self, src: &wgpu::TextureView, dst: &wgpu::TextureView) {
        let bindings = PresentBindings::new(self.device, self.present, src);
        let mut rpass = begin_fullscreen_pass(self.encoder, "Present Pass", dst);
        self.present.record(&mut rpass, &bindings);
    }

    fn blit(
        &mut self,
        program: &DepthEffectPass,
        src: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        dst: &wgpu::TextureView,
    ) {
        let bind_group = program.bind(self.device, src, depth);
        let mut rpass = begin_fullscreen_pass(self.encoder, "Depth Effect Pass", dst);
        rpass.set_pipeline(&program.pipeline);
        rpass.set_bind_group(EFFECT_GROUP_ID, &bind_group, &[]);
        rpass.draw(0..6, 0..1);
    }
}
