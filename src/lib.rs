pub mod blip;
pub mod camera;
pub mod compute_pass;
pub mod demo;
pub mod depth_effect_pass;
pub mod frame;
pub mod gpu;
pub mod input;
pub mod material;
pub mod mesh;
pub mod physics;
pub mod post_process;
pub mod present_pass;
pub mod scene;
pub mod scene_pass;
pub mod settings;
pub mod texture_generator;
pub mod transform_utils;

use std::sync::Arc;

use web_time::Instant;
use winit::{
    dpi::PhysicalSize,
    event::{Event, WindowEvent},
    event_loop::EventLoop,
    keyboard::KeyCode,
    window::WindowBuilder,
};

use crate::compute_pass::{ComputeProgramSource, WgpuCompute};
use crate::demo::DemoScene;
use crate::depth_effect_pass::{DepthEffectPass, WgpuBlitEncoder};
use crate::frame::{FrameContext, FrameDriver, FrameTime};
use crate::gpu::TextureRegistry;
use crate::input::InputState;
use crate::material::MAIN_TEX;
use crate::post_process::{DepthPostProcess, PostProcessOutcome};
use crate::present_pass::PresentPass;
use crate::scene::ObjectId;
use crate::scene_pass::{ScenePass, SceneTargets};
use crate::settings::{DemoSettings, GeneratorSettings};
use crate::texture_generator::{GeneratorError, ImageResource, TextureGenerator};

const TOGGLE_DEPTH_EFFECT_KEY: KeyCode = KeyCode::KeyP;
const RELAUNCH_KEY: KeyCode = KeyCode::Space;
const QUIT_KEY: KeyCode = KeyCode::Escape;

/// Builds a generator for `target`, activates it and registers its image for
/// sampling. Read, compile and activation problems are logged once; the
/// generator then stays inactive and its frame step does nothing.
fn build_generator(
    device: &Arc<wgpu::Device>,
    queue: &Arc<wgpu::Queue>,
    label: &str,
    target: ObjectId,
    settings: &GeneratorSettings,
    builtin: fn() -> ComputeProgramSource,
    demo: &mut DemoScene,
    textures: &mut TextureRegistry,
) -> TextureGenerator<WgpuCompute> {
    let program = match &settings.shader {
        Some(path) => ComputeProgramSource::from_file(path, settings.config.policy.is_seeded())
            .map_err(|err| GeneratorError::ProgramUnreadable {
                path: path.display().to_string(),
                message: err.to_string(),
            }),
        None => Ok(builtin()),
    };
    let backend =
        program.and_then(|program| WgpuCompute::new(device.clone(), queue.clone(), &program));

    let mut generator = match backend {
        Ok(backend) => TextureGenerator::new(label, target, settings.config, Some(backend)),
        Err(err) => TextureGenerator::unavailable(label, target, settings.config, err),
    };
    match generator.activate(&mut demo.scene, 0.0) {
        Ok(()) => {
            if let Some(image) = generator.image() {
                textures.insert(image.texture_id(), image.create_view());
            }
        }
        Err(err) => log::error!("{label}: activation failed: {err}"),
    }
    generator
}

async fn arun(settings: DemoSettings) {
    let event_loop = EventLoop::new().unwrap();
    let window = WindowBuilder::new()
        .with_title("Shader Playground")
        .with_inner_size(PhysicalSize::new(settings.window_width, settings.window_height))
        .build(&event_loop)
        .unwrap();

    let size = window.inner_size();

    let instance = wgpu::Instance::default();

    let surface = instance.create_surface(&window).unwrap();
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            // Request an adapter which can render to our surface
            compatible_surface: Some(&surface),
        })
        .await
        .expect("Failed to find an appropriate adapter");
    log::info!("Using adapter {:?}", adapter.get_info().name);

    // Create the logical device and command queue
    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
            },
            None,
        )
        .await
        .expect("Failed to create device");
    let device = Arc::new(device);
    let queue = Arc::new(queue);

    let swapchain_capabilities = surface.get_capabilities(&adapter);
    let swapchain_format = swapchain_capabilities.formats[0];

    let mut config = surface
        .get_default_config(&adapter, size.width.max(1), size.height.max(1))
        .unwrap();
    surface.configure(&device, &config);

    let mut demo = DemoScene::build();
    let mut camera = DemoScene::camera(config.width as f32 / config.height as f32);
    let mut textures = TextureRegistry::new(&device, &queue);

    let noise = build_generator(
        &device,
        &queue,
        "noise generator",
        demo.noise_quad,
        &settings.noise,
        ComputeProgramSource::noise,
        &mut demo,
        &mut textures,
    );
    let pattern = build_generator(
        &device,
        &queue,
        "pattern generator",
        demo.pattern_cube,
        &settings.pattern,
        ComputeProgramSource::pattern,
        &mut demo,
        &mut textures,
    );
    // The panel shows the pattern tiled by its own scale.
    if let (Some(image), Some(panel)) = (pattern.image(), demo.scene.get_mut(demo.panel)) {
        panel.material.set_texture(MAIN_TEX, image.texture_id());
    }

    let mut driver = FrameDriver::new();
    driver.add(Box::new(noise));
    driver.add(Box::new(pattern));
    for step in demo.behaviors(&settings) {
        driver.add(step);
    }

    let present_pass = PresentPass::new(&device, swapchain_format);
    let mut scene_pass = ScenePass::new(&device);
    let mut post_process = DepthPostProcess::new(DepthEffectPass::from_source(
        &device,
        swapchain_format,
        &settings.depth_effect,
    ));
    if settings.depth_effect_enabled {
        post_process.activate(&mut camera);
    }
    let mut targets = SceneTargets::new(
        &device,
        config.width,
        config.height,
        camera.depth_texture_mode,
    );

    let mut input = InputState::new();
    let start_time = Instant::now();
    let mut last_frame = start_time;
    let mut last_outcome = None;

    let window = &window;
    event_loop
        .run(move |event, target| {
            // Have the closure take ownership of the resources.
            // `event_loop.run` never returns, therefore we must do this to ensure
            // the resources are properly cleaned up.
            let _ = (&instance, &adapter);

            if let Event::AboutToWait = event {
                let now = Instant::now();
                let time = FrameTime {
                    delta: (now - last_frame).as_secs_f32(),
                    since_start: (now - start_time).as_secs_f32(),
                };
                last_frame = now;

                if input.key_pressed(TOGGLE_DEPTH_EFFECT_KEY) {
                    post_process.toggle(&mut camera);
                }
                if input.key_pressed(RELAUNCH_KEY) {
                    demo.relaunch_ball();
                }
                demo.relaunch_if_fallen();

                let collisions = demo.physics.step(&mut demo.scene, time.delta);
                driver.dispatch_collisions(&mut demo.scene, &collisions);
                {
                    let mut ctx = FrameContext {
                        scene: &mut demo.scene,
                        input: &input,
                        time,
                    };
                    driver.step_all(&mut ctx);
                }
                input.end_frame();

                targets.ensure(&device, config.width, config.height, camera.depth_texture_mode);
                scene_pass.prepare(&device, &queue, &demo.scene, &camera, &textures);
                if let Some(effect) = post_process.program() {
                    effect.update_params(&queue, &camera, &settings.depth_fog);
                }

                let frame = match surface.get_current_texture() {
                    Ok(frame) => frame,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        surface.configure(&device, &config);
                        return;
                    }
                    Err(err) => {
                        log::warn!("Skipping frame: {err}");
                        return;
                    }
                };
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                let mut encoder =
                    device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("Frame Encoder"),
                    });

                scene_pass.record(&mut encoder, &targets, &demo.scene);
                let outcome = post_process.render(
                    &mut WgpuBlitEncoder {
                        device: &device,
                        encoder: &mut encoder,
                        present: &present_pass,
                    },
                    targets.color(),
                    targets.readable_depth(),
                    &view,
                );
                if last_outcome != Some(outcome) {
                    match outcome {
                        PostProcessOutcome::Applied => log::info!(
                            "Depth effect '{}' applied",
                            post_process.program().map_or("", |p| p.label())
                        ),
                        PostProcessOutcome::PassThrough => {
                            log::info!("Depth effect passing through")
                        }
                    }
                    last_outcome = Some(outcome);
                }

                queue.submit(Some(encoder.finish()));
                frame.present();

                window.request_redraw();
            };

            if let Event::WindowEvent {
                window_id: _,
                event,
            } = event
            {
                match event {
                    WindowEvent::Resized(new_size) => {
                        // Reconfigure the surface with the new size
                        config.width = new_size.width.max(1);
                        config.height = new_size.height.max(1);
                        surface.configure(&device, &config);
                        camera.set_viewport(config.width, config.height);
                        // On macos the window needs to be redrawn manually after resizing
                        window.request_redraw();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        input.handle_key_event(&event);
                        if input.key_pressed(QUIT_KEY) {
                            target.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => {}
                    WindowEvent::CloseRequested => target.exit(),
                    _ => {}
                };
            }
        })
        .unwrap();
}

pub fn run(settings: DemoSettings) {
    pollster::block_on(arun(settings));
}
