use crate::capture::CaptureSource;
use crate::cloak::{composite, mask_to_rgb, BackgroundModel, ColorSegmenter, Mask, MaskRefiner};
use crate::config::CloakConfig;
use crate::error::CloakError;
use crate::output::{DisplaySink, Window};
use image::{imageops, RgbImage};
use std::time::{Duration, Instant};

/// Lifecycle of a cloak run. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    AwaitingBackgroundSeed,
    Running,
    Stopped,
}

impl PipelineStatus {
    fn name(self) -> &'static str {
        match self {
            PipelineStatus::AwaitingBackgroundSeed => "awaiting a background seed",
            PipelineStatus::Running => "running",
            PipelineStatus::Stopped => "stopped",
        }
    }
}

enum State {
    AwaitingBackgroundSeed,
    Running(BackgroundModel),
    Stopped,
}

/// Result of one pipeline pass
pub struct FrameOutput {
    pub composite: RgbImage,
    /// Refined cloak mask
    pub mask: Mask,
}

/// Per-frame cloak effect: segment, refine, update the background, composite.
pub struct CloakPipeline {
    config: CloakConfig,
    segmenter: ColorSegmenter,
    refiner: MaskRefiner,
    state: State,
}

impl CloakPipeline {
    pub fn new(config: CloakConfig) -> Result<Self, CloakError> {
        config.validate()?;

        Ok(Self {
            segmenter: ColorSegmenter::new(config.thresholds),
            refiner: MaskRefiner::new(
                config.kernel_radius,
                config.open_iterations,
                config.dilate_iterations,
            ),
            config,
            state: State::AwaitingBackgroundSeed,
        })
    }

    pub fn status(&self) -> PipelineStatus {
        match self.state {
            State::AwaitingBackgroundSeed => PipelineStatus::AwaitingBackgroundSeed,
            State::Running(_) => PipelineStatus::Running,
            State::Stopped => PipelineStatus::Stopped,
        }
    }

    pub fn background(&self) -> Option<&BackgroundModel> {
        match &self.state {
            State::Running(model) => Some(model),
            _ => None,
        }
    }

    /// Apply frame-level preparation (mirroring) shared by seed and live frames.
    pub fn prepare(&self, mut frame: RgbImage) -> RgbImage {
        if self.config.mirror {
            imageops::flip_horizontal_in_place(&mut frame);
        }
        frame
    }

    /// Initialise the background from a frame with nobody in it.
    pub fn seed(&mut self, frame: &RgbImage) -> Result<(), CloakError> {
        if !matches!(self.state, State::AwaitingBackgroundSeed) {
            return Err(self.invalid("seed the background"));
        }

        self.state = State::Running(BackgroundModel::from_seed(frame, self.config.alpha));
        tracing::info!("Background seeded, pipeline running");
        Ok(())
    }

    pub fn process(&mut self, frame: &RgbImage) -> Result<FrameOutput, CloakError> {
        let status = self.status();
        let State::Running(background) = &mut self.state else {
            return Err(CloakError::InvalidState {
                state: status.name(),
                operation: "process a frame",
            });
        };

        CloakError::check_dimensions(background.dimensions(), frame.dimensions())?;

        let raw = self.segmenter.segment(frame);
        let refined = self.refiner.refine(&raw);

        background.accumulate(frame, refined.inverse())?;
        let snapshot = background.snapshot();
        let composite = composite(frame, &snapshot, &refined)?;

        Ok(FrameOutput {
            composite,
            mask: refined.into_mask(),
        })
    }

    pub fn stop(&mut self) {
        if !matches!(self.state, State::Stopped) {
            tracing::debug!("Pipeline stopping ({})", self.status().name());
            self.state = State::Stopped;
        }
    }

    fn invalid(&self, operation: &'static str) -> CloakError {
        CloakError::InvalidState {
            state: self.status().name(),
            operation,
        }
    }
}

/// Camera and display owned for the duration of a run.
///
/// Both are released exactly once when this is dropped, whichever way the
/// run ends.
pub struct Devices<C: CaptureSource, D: DisplaySink> {
    capture: C,
    display: D,
}

impl<C: CaptureSource, D: DisplaySink> Devices<C, D> {
    pub fn new(capture: C, display: D) -> Self {
        Self { capture, display }
    }
}

impl<C: CaptureSource, D: DisplaySink> Drop for Devices<C, D> {
    fn drop(&mut self) {
        self.capture.release();
        self.display.release();
    }
}

/// Frame loop settings outside the effect itself
#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// Pause before grabbing the background seed
    pub warmup: Duration,
    pub target_fps: Option<u32>,
    pub max_frames: Option<u64>,
    pub show_mask: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    FrameLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames composited, not counting the seed
    pub frames: u64,
    pub stop_reason: StopReason,
}

/// Seed the background, then run the cloak until cancelled or a fatal error.
pub fn run_pipeline<C, D>(
    mut devices: Devices<C, D>,
    mut pipeline: CloakPipeline,
    options: &LoopOptions,
) -> Result<RunSummary, CloakError>
where
    C: CaptureSource,
    D: DisplaySink,
{
    let result = drive(&mut devices, &mut pipeline, options);
    pipeline.stop();

    match &result {
        Ok(summary) => tracing::info!(
            "Stopped after {} frames ({:?})",
            summary.frames,
            summary.stop_reason
        ),
        Err(e) => tracing::error!("{}", e),
    }

    result
}

fn read_frame<C: CaptureSource>(capture: &mut C, frame: u64) -> Result<RgbImage, CloakError> {
    capture
        .capture_frame()
        .map_err(|e| CloakError::FrameReadFailure {
            frame,
            reason: format!("{:#}", e),
        })
}

fn drive<C, D>(
    devices: &mut Devices<C, D>,
    pipeline: &mut CloakPipeline,
    options: &LoopOptions,
) -> Result<RunSummary, CloakError>
where
    C: CaptureSource,
    D: DisplaySink,
{
    let (width, height) = devices.capture.resolution();
    tracing::info!("Camera resolution {}x{}", width, height);

    if !options.warmup.is_zero() {
        tracing::info!(
            "Capturing background in {:.1}s, please step out of the frame",
            options.warmup.as_secs_f32()
        );
        std::thread::sleep(options.warmup);
    }

    let seed = read_frame(&mut devices.capture, 0)?;
    let seed = pipeline.prepare(seed);
    pipeline.seed(&seed)?;
    tracing::info!("Background captured. Press Ctrl+C to stop");

    let frame_duration = options
        .target_fps
        .filter(|&fps| fps > 0)
        .map(|fps| Duration::from_secs_f32(1.0 / fps as f32));
    let mut frame_count = 0u64;
    let mut total_capture_time = Duration::ZERO;
    let mut total_process_time = Duration::ZERO;
    let mut total_output_time = Duration::ZERO;

    loop {
        if devices.display.poll_cancel() {
            return Ok(RunSummary {
                frames: frame_count,
                stop_reason: StopReason::Cancelled,
            });
        }
        if options.max_frames.is_some_and(|max| frame_count >= max) {
            return Ok(RunSummary {
                frames: frame_count,
                stop_reason: StopReason::FrameLimit,
            });
        }

        let loop_start = Instant::now();

        let capture_start = Instant::now();
        let frame = read_frame(&mut devices.capture, frame_count + 1)?;
        let frame = pipeline.prepare(frame);
        total_capture_time += capture_start.elapsed();

        let process_start = Instant::now();
        let output = pipeline.process(&frame)?;
        total_process_time += process_start.elapsed();

        let output_start = Instant::now();
        devices.display.show(Window::Composite, &output.composite);
        if options.show_mask {
            devices.display.show(Window::Mask, &mask_to_rgb(&output.mask));
        }
        total_output_time += output_start.elapsed();

        frame_count += 1;

        // Log stats every 30 frames
        if frame_count % 30 == 0 {
            let avg_capture_ms = total_capture_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_process_ms = total_process_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_output_ms = total_output_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let total_ms = avg_capture_ms + avg_process_ms + avg_output_ms;

            tracing::info!(
                "Frame {}: capture={:.1}ms, cloak={:.1}ms, output={:.1}ms, total={:.1}ms, fps={:.1}",
                frame_count,
                avg_capture_ms,
                avg_process_ms,
                avg_output_ms,
                total_ms,
                1000.0 / total_ms
            );
        }

        // Frame rate limiting
        if let Some(frame_duration) = frame_duration {
            let elapsed = loop_start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }
    }
}
