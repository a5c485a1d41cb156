use super::hsv::{rgb_to_hsv, Hsv};
use super::{Mask, MASK_CLEAR, MASK_SET};
use image::RgbImage;

/// Inclusive box in HSV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    pub const fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&hsv.h)
            && (self.lower.s..=self.upper.s).contains(&hsv.s)
            && (self.lower.v..=self.upper.v).contains(&hsv.v)
    }
}

/// The two sides of the hue wrap point that a red target straddles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HueBand {
    /// Starts at hue 0.
    Low,
    /// Ends at hue 180.
    High,
}

impl HueBand {
    pub const ALL: [HueBand; 2] = [HueBand::Low, HueBand::High];
}

/// Threshold bands for the target color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorThresholds {
    pub low: HsvRange,
    pub high: HsvRange,
}

impl ColorThresholds {
    /// Red: hue [0,10] or [170,180], saturation [100,255], value [50,255].
    pub const RED: Self = Self {
        low: HsvRange::new(Hsv::new(0, 100, 50), Hsv::new(10, 255, 255)),
        high: HsvRange::new(Hsv::new(170, 100, 50), Hsv::new(180, 255, 255)),
    };

    pub fn band(&self, band: HueBand) -> &HsvRange {
        match band {
            HueBand::Low => &self.low,
            HueBand::High => &self.high,
        }
    }

    /// True when `hsv` falls in either band.
    pub fn matches(&self, hsv: Hsv) -> bool {
        HueBand::ALL
            .iter()
            .any(|&band| self.band(band).contains(hsv))
    }
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self::RED
    }
}

/// Classifies each pixel as target-colored or not.
#[derive(Debug, Clone)]
pub struct ColorSegmenter {
    thresholds: ColorThresholds,
}

impl ColorSegmenter {
    pub fn new(thresholds: ColorThresholds) -> Self {
        Self { thresholds }
    }

    /// Produce the raw mask for `frame`.
    pub fn segment(&self, frame: &RgbImage) -> Mask {
        let _span = tracing::debug_span!("segment").entered();

        let (width, height) = frame.dimensions();
        let mut mask = Mask::new(width, height);
        for (src, dst) in frame.pixels().zip(mask.pixels_mut()) {
            dst.0[0] = if self.thresholds.matches(rgb_to_hsv(src)) {
                MASK_SET
            } else {
                MASK_CLEAR
            };
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn segmenter() -> ColorSegmenter {
        ColorSegmenter::new(ColorThresholds::RED)
    }

    #[test]
    fn both_ends_of_the_hue_circle_are_red() {
        let red = ColorThresholds::RED;
        let at_zero = Hsv::new(0, 200, 200);
        let at_180 = Hsv::new(180, 200, 200);

        assert!(red.low.contains(at_zero));
        assert!(red.high.contains(at_180));
        assert!(red.matches(at_zero));
        assert!(red.matches(at_180));

        let frame = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([255, 0, 4])
            }
        });
        let mask = segmenter().segment(&frame);
        assert_eq!(mask.get_pixel(0, 0).0[0], MASK_SET);
        assert_eq!(mask.get_pixel(1, 0).0[0], MASK_SET);
    }

    #[test]
    fn band_edges_are_inclusive() {
        let red = ColorThresholds::RED;
        assert!(red.matches(Hsv::new(10, 100, 50)));
        assert!(red.matches(Hsv::new(170, 255, 255)));
        assert!(!red.matches(Hsv::new(11, 255, 255)));
        assert!(!red.matches(Hsv::new(169, 255, 255)));
        assert!(!red.matches(Hsv::new(5, 99, 255)));
        assert!(!red.matches(Hsv::new(5, 255, 49)));
    }

    #[test]
    fn rejects_other_colors_and_dark_or_washed_out_red() {
        let frame = RgbImage::from_vec(
            5,
            1,
            vec![
                0, 200, 0, // green
                0, 0, 200, // blue
                128, 128, 128, // grey
                40, 0, 0, // too dark
                255, 200, 200, // pink, low saturation
            ],
        )
        .unwrap();
        let mask = segmenter().segment(&frame);
        assert!(mask.pixels().all(|p| p.0[0] == MASK_CLEAR));
    }

    #[test]
    fn segmentation_is_idempotent() {
        let frame = RgbImage::from_fn(16, 9, |x, y| {
            if x < 8 {
                Rgb([200, (y * 10) as u8, 0])
            } else {
                Rgb([(x * 16) as u8, (y * 28) as u8, ((x + y) * 7) as u8])
            }
        });
        let s = segmenter();
        let first = s.segment(&frame);
        let second = s.segment(&frame);
        assert_eq!(first.as_raw(), second.as_raw());
        assert!(first.pixels().any(|p| p.0[0] == MASK_SET));
    }
}
