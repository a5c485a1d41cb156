mod capture;
mod cloak;
mod config;
mod error;
mod output;
mod pipeline;

use anyhow::{Context, Result};
use capture::WebcamCapture;
use clap::Parser;
use cloak::hsv::Hsv;
use cloak::{ColorThresholds, HsvRange};
use config::{CloakConfig, DEFAULT_ALPHA};
use error::CloakError;
use output::{CancelFlag, V4L2Output};
use pipeline::{run_pipeline, CloakPipeline, Devices, LoopOptions};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Output v4l2loopback device path for the cloaked video
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Optional second v4l2loopback device showing the cloak mask
    #[arg(long)]
    mask_device: Option<String>,

    /// Capture resolution width
    #[arg(long, default_value_t = 1280)]
    capture_width: u32,

    /// Capture resolution height
    #[arg(long, default_value_t = 720)]
    capture_height: u32,

    /// Output resolution width
    #[arg(long, default_value_t = 1280)]
    output_width: u32,

    /// Output resolution height
    #[arg(long, default_value_t = 720)]
    output_height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Background update rate, in (0, 1]
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    alpha: f32,

    /// Upper hue of the band starting at 0 (hue scale 0-180)
    #[arg(long, default_value_t = 10)]
    low_hue_max: u8,

    /// Lower hue of the band ending at 180
    #[arg(long, default_value_t = 170)]
    high_hue_min: u8,

    /// Minimum saturation for a pixel to count as cloak
    #[arg(long, default_value_t = 100)]
    sat_min: u8,

    /// Minimum value (brightness) for a pixel to count as cloak
    #[arg(long, default_value_t = 50)]
    val_min: u8,

    /// Seconds to wait before capturing the background
    #[arg(long, default_value_t = 2.0)]
    warmup_secs: f32,

    /// Do not mirror the camera image
    #[arg(long)]
    no_mirror: bool,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn cloak_config(&self) -> CloakConfig {
        let band = |lo: u8, hi: u8| {
            HsvRange::new(
                Hsv::new(lo, self.sat_min, self.val_min),
                Hsv::new(hi, u8::MAX, u8::MAX),
            )
        };

        CloakConfig {
            alpha: self.alpha,
            thresholds: ColorThresholds {
                low: band(0, self.low_hue_max),
                high: band(self.high_hue_min, 180),
            },
            mirror: !self.no_mirror,
            ..CloakConfig::default()
        }
    }

    fn loop_options(&self, show_mask: bool) -> Result<LoopOptions> {
        let warmup = Duration::try_from_secs_f32(self.warmup_secs)
            .map_err(|e| CloakError::InvalidConfig(format!("warmup: {e}")))?;

        Ok(LoopOptions {
            warmup,
            target_fps: Some(self.fps),
            max_frames: self.max_frames,
            show_mask,
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("cloak-fx starting");
    tracing::info!("Capture: {}x{}", args.capture_width, args.capture_height);
    tracing::info!("Output: {}x{}", args.output_width, args.output_height);
    tracing::info!("Target FPS: {}", args.fps);

    let config = args.cloak_config();
    tracing::info!("Alpha: {}, thresholds: {:?}", config.alpha, config.thresholds);
    let pipeline = CloakPipeline::new(config).context("Invalid cloak settings")?;

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || handler_flag.cancel())
        .context("Failed to install Ctrl+C handler")?;

    // Initialize capture
    let capture = WebcamCapture::new(
        args.input_device,
        args.capture_width,
        args.capture_height,
    )
    .map_err(|e| CloakError::DeviceUnavailable(format!("{:#}", e)))?;

    // Initialize output
    let output = V4L2Output::new(
        &args.output_device,
        args.mask_device.as_ref(),
        args.output_width,
        args.output_height,
        cancel,
    )
    .context("Failed to initialize v4l2loopback output")?;

    let options = args.loop_options(output.has_mask_window())?;

    let summary = run_pipeline(Devices::new(capture, output), pipeline, &options)?;
    tracing::info!("Done, {} frames processed", summary.frames);

    Ok(())
}
