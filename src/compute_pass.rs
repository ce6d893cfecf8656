use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::gpu::validated;
use crate::material::TextureId;
use crate::texture_generator::{
    ComputeBackend, DispatchGrid, GeneratorError, ImageResource, KernelHandle, RAND_OFFSET_PARAM,
    RESULT_PARAM,
};

const KERNEL_BUFFER_GROUP_ID: u32 = 0;
const RESULT_IMAGE_IDX: u32 = 0;
const RAND_OFFSET_IDX: u32 = 1;

pub const GENERATOR_IMAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[repr(C)]
#[derive(Default, Copy, Clone, Debug, Pod, Zeroable)]
struct RandOffsetUniform {
    value: i32,
    _pad: [i32; 3],
}

/// WGSL source for a generator kernel plus the inputs it declares.
#[derive(Clone, Debug)]
pub struct ComputeProgramSource {
    pub label: String,
    pub wgsl: Cow<'static, str>,
    /// Whether the program declares the `RandOffset` uniform.
    pub seeded: bool,
}

impl ComputeProgramSource {
    /// Value noise reseeded from `RandOffset` on every dispatch.
    pub fn noise() -> Self {
        Self {
            label: "Noise Kernel".to_owned(),
            wgsl: Cow::Borrowed(include_str!("shaders/noise.wgsl")),
            seeded: true,
        }
    }

    /// Fixed pattern computed from texel coordinates only.
    pub fn pattern() -> Self {
        Self {
            label: "Pattern Kernel".to_owned(),
            wgsl: Cow::Borrowed(include_str!("shaders/pattern.wgsl")),
            seeded: false,
        }
    }

    pub fn from_file(path: &Path, seeded: bool) -> std::io::Result<Self> {
        let wgsl = std::fs::read_to_string(path)?;
        Ok(Self {
            label: path.display().to_string(),
            wgsl: Cow::Owned(wgsl),
            seeded,
        })
    }
}

pub struct GpuImage {
    id: TextureId,
    resolution: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl GpuImage {
    pub fn create_view(&self) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}

impl ImageResource for GpuImage {
    fn texture_id(&self) -> TextureId {
        self.id
    }

    fn resolution(&self) -> u32 {
        self.resolution
    }
}

struct Kernel {
    name: String,
    pipeline: wgpu::ComputePipeline,
    bind_group: Option<wgpu::BindGroup>,
}

/// [`ComputeBackend`] over a wgpu device. Every dispatch is recorded into its
/// own command buffer and submitted immediately, so it is ordered before any
/// command buffer the frame submits afterwards.
pub struct WgpuCompute {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    label: String,
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    bind_group_layout: wgpu::BindGroupLayout,
    rand_offset: Option<wgpu::Buffer>,
    kernels: Vec<Kernel>,
}

impl WgpuCompute {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        program: &ComputeProgramSource,
    ) -> Result<Self, GeneratorError> {
        let shader = validated(&device, &program.label, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(program.label.as_str()),
                source: wgpu::ShaderSource::Wgsl(program.wgsl.clone()),
            })
        })
        .map_err(|err| GeneratorError::ProgramCompile(err.to_string()))?;

        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            // Result
            binding: RESULT_IMAGE_IDX,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: GENERATOR_IMAGE_FORMAT,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
            count: None,
        }];
        if program.seeded {
            entries.push(wgpu::BindGroupLayoutEntry {
                // RandOffset
                binding: RAND_OFFSET_IDX,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Generator: Kernel Bind Group Layout"),
            entries: &entries,
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Generator Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let rand_offset = program.seeded.then(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Generator: RandOffset Uniform"),
                size: std::mem::size_of::<RandOffsetUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        Ok(Self {
            device,
            queue,
            label: program.label.clone(),
            shader,
            layout,
            bind_group_layout,
            rand_offset,
            kernels: Vec::new(),
        })
    }
}

impl ComputeBackend for WgpuCompute {
    type Image = GpuImage;

    fn create_image(&mut self, resolution: u32) -> Result<GpuImage, GeneratorError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if resolution > max {
            return Err(GeneratorError::ResolutionTooLarge { resolution, max });
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Generator Output Image"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: GENERATOR_IMAGE_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(GpuImage {
            id: TextureId::next(),
            resolution,
            texture,
            view,
        })
    }

    fn find_kernel(&mut self, name: &str) -> Result<KernelHandle, GeneratorError> {
        if let Some(index) = self.kernels.iter().position(|k| k.name == name) {
            return Ok(KernelHandle(index));
        }
        let pipeline = validated(&self.device, name, || {
            self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(self.label.as_str()),
                layout: Some(&self.layout),
                module: &self.shader,
                entry_point: Some(name),
                compilation_options: Default::default(),
                cache: None,
            })
        })
        .map_err(|err| GeneratorError::KernelNotFound {
            name: name.to_owned(),
            message: err.message,
        })?;
        log::info!("{}: kernel {name} ready", self.label);
        self.kernels.push(Kernel {
            name: name.to_owned(),
            pipeline,
            bind_group: None,
        });
        Ok(KernelHandle(self.kernels.len() - 1))
    }

    fn set_int(&mut self, name: &str, value: i32) {
        match (&self.rand_offset, name == RAND_OFFSET_PARAM) {
            (Some(buffer), true) => {
                let uniform = RandOffsetUniform {
                    value,
                    ..Default::default()
                };
                self.queue
                    .write_buffer(buffer, 0, bytemuck::cast_slice(&[uniform]));
            }
            _ => log::trace!("{}: no int input named {name}", self.label),
        }
    }

    fn set_image(&mut self, kernel: KernelHandle, name: &str, image: &GpuImage) {
        if name != RESULT_PARAM {
            log::trace!("{}: no image input named {name}", self.label);
            return;
        }
        let Some(slot) = self.kernels.get_mut(kernel.0) else {
            return;
        };
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: RESULT_IMAGE_IDX,
            resource: wgpu::BindingResource::TextureView(&image.view),
        }];
        if let Some(buffer) = &self.rand_offset {
            entries.push(wgpu::BindGroupEntry {
                binding: RAND_OFFSET_IDX,
                resource: buffer.as_entire_binding(),
            });
        }
        slot.bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Generator: Kernel Bind Group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        }));
    }

    fn dispatch(&mut self, kernel: KernelHandle, grid: DispatchGrid) {
        let Some(Kernel {
            pipeline,
            bind_group: Some(bind_group),
            ..
        }) = self.kernels.get(kernel.0)
        else {
            log::warn!("{}: dispatch skipped, kernel has no bound output", self.label);
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Generator Dispatch"),
            });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Generator Compute Pass"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(pipeline);
            cpass.set_bind_group(KERNEL_BUFFER_GROUP_ID, bind_group, &[]);
            cpass.dispatch_workgroups(grid.x, grid.y, grid.z);
        }
        self.queue.submit(Some(encoder.finish()));
    }
}
