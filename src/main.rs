use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use shader_playground::post_process::DepthEffectSource;
use shader_playground::settings::DemoSettings;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Compute-texture and depth post-process playground")]
struct Args {
    /// JSON settings file; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Noise texture resolution (positive multiple of 8)
    #[arg(long)]
    resolution: Option<u32>,

    /// Per-frame blip intensity multiplier, clamped into [0, 1]
    #[arg(long)]
    decay_rate: Option<f32>,

    /// Cube rotation speed in degrees per second
    #[arg(long)]
    rotate_speed: Option<f32>,

    /// Disable the depth post-process program entirely
    #[arg(long)]
    no_depth_effect: bool,

    /// Window width in pixels
    #[arg(long, short = 'W')]
    width: Option<u32>,

    /// Window height in pixels
    #[arg(long, short = 'H')]
    height: Option<u32>,
}

impl Args {
    fn apply_to(&self, settings: &mut DemoSettings) {
        if let Some(resolution) = self.resolution {
            settings.noise.config.resolution = resolution;
        }
        if let Some(decay_rate) = self.decay_rate {
            settings.blip.decay_rate = decay_rate;
        }
        if let Some(rotate_speed) = self.rotate_speed {
            settings.rotator.rotate_speed = rotate_speed;
        }
        if self.no_depth_effect {
            settings.depth_effect = DepthEffectSource::Disabled;
        }
        if let Some(width) = self.width {
            settings.window_width = width;
        }
        if let Some(height) = self.height {
            settings.window_height = height;
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => match DemoSettings::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                log::error!("{err}");
                return ExitCode::FAILURE;
            }
        },
        None => DemoSettings::default(),
    };
    args.apply_to(&mut settings);

    shader_playground::run(settings.sanitized());
    ExitCode::SUCCESS
}
