mod loopback;

pub use loopback::V4L2Output;

use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Named output surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// The cloaked video
    Composite,
    /// Refined mask, for debugging thresholds
    Mask,
}

/// Trait for display destinations
pub trait DisplaySink {
    /// Hand a frame to `window`. Failures are reported by the sink itself.
    fn show(&mut self, window: Window, frame: &RgbImage);

    /// Whether the operator asked to stop. Checked once per frame.
    fn poll_cancel(&mut self) -> bool;

    /// Close all windows. Called exactly once, when the run ends.
    fn release(&mut self) {}
}

/// Cooperative stop request shared with a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
