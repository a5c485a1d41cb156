use super::{Mask, MASK_SET};
use crate::error::CloakError;
use image::{Rgb, Rgb32FImage, RgbImage};

/// Running estimate of the static scene behind the cloak.
///
/// Stored as f32 per channel so repeated weighted updates do not drift
/// through 8-bit quantisation.
#[derive(Debug, Clone)]
pub struct BackgroundModel {
    estimate: Rgb32FImage,
    alpha: f32,
}

impl BackgroundModel {
    /// Seed the estimate from a frame assumed to contain no foreground.
    pub fn from_seed(seed: &RgbImage, alpha: f32) -> Self {
        let (width, height) = seed.dimensions();
        let estimate =
            Rgb32FImage::from_fn(width, height, |x, y| Rgb(seed.get_pixel(x, y).0.map(f32::from)));

        tracing::debug!("Background seeded at {}x{}, alpha={}", width, height, alpha);

        Self { estimate, alpha }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.estimate.dimensions()
    }

    pub fn estimate(&self) -> &Rgb32FImage {
        &self.estimate
    }

    /// Blend `frame` into the estimate wherever `update_mask` is set.
    ///
    /// `estimate = (1 - alpha) * estimate + alpha * frame`
    pub fn accumulate(&mut self, frame: &RgbImage, update_mask: &Mask) -> Result<(), CloakError> {
        let _span = tracing::debug_span!("background_update").entered();

        CloakError::check_dimensions(self.dimensions(), frame.dimensions())?;
        CloakError::check_dimensions(self.dimensions(), update_mask.dimensions())?;

        let keep = 1.0 - self.alpha;
        for ((acc, px), m) in self
            .estimate
            .pixels_mut()
            .zip(frame.pixels())
            .zip(update_mask.pixels())
        {
            if m.0[0] != MASK_SET {
                continue;
            }
            for (a, &c) in acc.0.iter_mut().zip(px.0.iter()) {
                *a = keep * *a + self.alpha * c as f32;
            }
        }
        Ok(())
    }

    /// Round and saturate the estimate back to 8 bits.
    pub fn snapshot(&self) -> RgbImage {
        let (width, height) = self.dimensions();
        RgbImage::from_fn(width, height, |x, y| {
            Rgb(self
                .estimate
                .get_pixel(x, y)
                .0
                .map(|v| v.round().clamp(0.0, 255.0) as u8))
        })
    }
}
