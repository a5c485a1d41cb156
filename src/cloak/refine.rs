use super::{Mask, MASK_CLEAR, MASK_SET};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};

/// Refined mask and its exact complement.
///
/// Built only through [`RefinedMask::from_mask`], so every pixel is set in
/// exactly one of the two.
#[derive(Debug, Clone)]
pub struct RefinedMask {
    mask: Mask,
    inverse: Mask,
}

impl RefinedMask {
    /// Binarise `mask` (any nonzero counts as set) and derive the inverse.
    pub fn from_mask(mut mask: Mask) -> Self {
        let mut inverse = Mask::new(mask.width(), mask.height());
        for (m, inv) in mask.pixels_mut().zip(inverse.pixels_mut()) {
            if m.0[0] == MASK_CLEAR {
                inv.0[0] = MASK_SET;
            } else {
                m.0[0] = MASK_SET;
                inv.0[0] = MASK_CLEAR;
            }
        }
        Self { mask, inverse }
    }

    /// Pixels covered by the cloak.
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Pixels considered background this frame.
    pub fn inverse(&self) -> &Mask {
        &self.inverse
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.mask.dimensions()
    }

    pub fn into_mask(self) -> Mask {
        self.mask
    }
}

/// Morphological cleanup: opening, then extra dilation, then inversion.
#[derive(Debug, Clone)]
pub struct MaskRefiner {
    /// Chebyshev radius of the structuring square; 1 means 3x3.
    kernel_radius: u8,
    open_iterations: u32,
    dilate_iterations: u32,
}

impl MaskRefiner {
    pub fn new(kernel_radius: u8, open_iterations: u32, dilate_iterations: u32) -> Self {
        Self {
            kernel_radius,
            open_iterations,
            dilate_iterations,
        }
    }

    pub fn refine(&self, raw: &Mask) -> RefinedMask {
        let _span = tracing::debug_span!("refine").entered();

        let mut mask = raw.clone();
        for _ in 0..self.open_iterations {
            mask = erode(&mask, Norm::LInf, self.kernel_radius);
        }
        for _ in 0..self.open_iterations + self.dilate_iterations {
            mask = dilate(&mask, Norm::LInf, self.kernel_radius);
        }

        RefinedMask::from_mask(mask)
    }
}

impl Default for MaskRefiner {
    fn default() -> Self {
        Self::new(1, 2, 1)
    }
}
