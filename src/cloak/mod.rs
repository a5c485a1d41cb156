mod background;
mod compositor;
pub mod hsv;
mod refine;
mod segmenter;

pub use background::BackgroundModel;
pub use compositor::composite;
pub use refine::{MaskRefiner, RefinedMask};
pub use segmenter::{ColorSegmenter, ColorThresholds, HsvRange, HueBand};

use image::{GrayImage, Rgb, RgbImage};

/// Single-channel binary mask: every cell is `MASK_SET` or `MASK_CLEAR`.
pub type Mask = GrayImage;

pub const MASK_CLEAR: u8 = 0;
pub const MASK_SET: u8 = u8::MAX;

/// Expand a mask to a grey RGB frame for the debug view.
pub fn mask_to_rgb(mask: &Mask) -> RgbImage {
    let (width, height) = mask.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let value = mask.get_pixel(x, y).0[0];
        Rgb([value, value, value])
    })
}
