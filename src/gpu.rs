use std::collections::HashMap;
use std::fmt;

use crate::material::TextureId;

#[derive(Debug, Clone, PartialEq)]
pub struct GpuValidationError {
    pub label: String,
    pub message: String,
}

impl fmt::Display for GpuValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.message)
    }
}

impl std::error::Error for GpuValidationError {}

/// Runs `create` inside a validation error scope and waits for the verdict.
///
/// wgpu reports pipeline and shader errors asynchronously through the
/// device's error sink; wrapping creation this way turns them into a plain
/// `Result` at the call site.
pub fn validated<T>(
    device: &wgpu::Device,
    label: &str,
    create: impl FnOnce() -> T,
) -> Result<T, GpuValidationError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(value),
        Some(err) => Err(GpuValidationError {
            label: label.to_owned(),
            message: err.to_string(),
        }),
    }
}

/// Maps material texture ids to views the scene pass can sample.
pub struct TextureRegistry {
    views: HashMap<TextureId, wgpu::TextureView>,
    fallback: wgpu::TextureView,
}

impl TextureRegistry {
    /// Creates the registry with a 1x1 opaque white fallback texture.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Fallback White Texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255, 255, 255, 255],
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        Self {
            views: HashMap::new(),
            fallback: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        }
    }

    pub fn insert(&mut self, id: TextureId, view: wgpu::TextureView) {
        self.views.insert(id, view);
    }

    /// Unknown or absent ids resolve to the fallback texture.
    pub fn resolve(&self, id: Option<TextureId>) -> &wgpu::TextureView {
        id.and_then(|id| self.views.get(&id))
            .unwrap_or(&self.fallback)
    }
}
