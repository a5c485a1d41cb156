use image::Rgb;

/// Hue on a 0-180 scale (degrees halved), saturation and value on 0-255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

/// Convert an 8-bit RGB sample to 8-bit HSV.
///
/// Achromatic pixels get hue 0. A hue within half a step of 360 degrees
/// rounds up to 180, so the top of the red band is reachable.
pub fn rgb_to_hsv(pixel: &Rgb<u8>) -> Hsv {
    let [r, g, b] = pixel.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = (max - min) as f32;

    let s = if max == 0 {
        0
    } else {
        (255.0 * delta / max as f32).round() as u8
    };

    let h = if delta == 0.0 {
        0.0
    } else {
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let degrees = if max == pixel.0[0] {
            60.0 * (g - b) / delta
        } else if max == pixel.0[1] {
            120.0 + 60.0 * (b - r) / delta
        } else {
            240.0 + 60.0 * (r - g) / delta
        };
        if degrees < 0.0 {
            degrees + 360.0
        } else {
            degrees
        }
    };

    Hsv {
        h: (h / 2.0).round() as u8,
        s,
        v: max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries() {
        assert_eq!(rgb_to_hsv(&Rgb([255, 0, 0])), Hsv::new(0, 255, 255));
        assert_eq!(rgb_to_hsv(&Rgb([0, 255, 0])), Hsv::new(60, 255, 255));
        assert_eq!(rgb_to_hsv(&Rgb([0, 0, 255])), Hsv::new(120, 255, 255));
    }

    #[test]
    fn greys_have_no_hue_or_saturation() {
        assert_eq!(rgb_to_hsv(&Rgb([0, 0, 0])), Hsv::new(0, 0, 0));
        assert_eq!(rgb_to_hsv(&Rgb([128, 128, 128])), Hsv::new(0, 0, 128));
        assert_eq!(rgb_to_hsv(&Rgb([255, 255, 255])), Hsv::new(0, 0, 255));
    }

    #[test]
    fn red_with_a_hint_of_blue_wraps_to_180() {
        // 360 - 60*4/255 = 359.06 degrees -> 179.53 -> 180
        assert_eq!(rgb_to_hsv(&Rgb([255, 0, 4])).h, 180);
    }

    #[test]
    fn half_saturated_orange() {
        // max 200, min 100: s = 127.5 -> 128, hue = 60*(150-100)/100 = 30 deg
        assert_eq!(rgb_to_hsv(&Rgb([200, 150, 100])), Hsv::new(15, 128, 200));
    }
}
