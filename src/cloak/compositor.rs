use super::refine::RefinedMask;
use crate::error::CloakError;
use image::RgbImage;

/// Merge the background snapshot and the live frame.
///
/// `output = (background & mask) + (frame & inverse)`, per channel, with the
/// 0/255 masks used as bit selectors. The masks partition the frame, so this
/// picks exactly one source per pixel.
pub fn composite(
    frame: &RgbImage,
    background: &RgbImage,
    refined: &RefinedMask,
) -> Result<RgbImage, CloakError> {
    let _span = tracing::debug_span!("composite").entered();

    CloakError::check_dimensions(background.dimensions(), frame.dimensions())?;
    CloakError::check_dimensions(background.dimensions(), refined.dimensions())?;

    let (width, height) = frame.dimensions();
    let mut output = RgbImage::new(width, height);
    let sources = frame.pixels().zip(background.pixels());
    let selectors = refined.mask().pixels().zip(refined.inverse().pixels());

    for ((out, (live, bg)), (m, inv)) in output.pixels_mut().zip(sources).zip(selectors) {
        let (m, inv) = (m.0[0], inv.0[0]);
        for (o, (&b, &l)) in out.0.iter_mut().zip(bg.0.iter().zip(live.0.iter())) {
            *o = (b & m).saturating_add(l & inv);
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloak::{Mask, MASK_SET};
    use image::{Luma, Rgb};

    #[test]
    fn cloaked_pixel_shows_background() {
        let mut raw = Mask::new(2, 1);
        raw.put_pixel(0, 0, Luma([MASK_SET]));
        let refined = RefinedMask::from_mask(raw);

        let background =
            RgbImage::from_vec(2, 1, vec![10, 10, 10, 99, 99, 99]).unwrap();
        let frame = RgbImage::from_vec(2, 1, vec![200, 200, 200, 5, 5, 5]).unwrap();

        let output = composite(&frame, &background, &refined).unwrap();
        assert_eq!(output.get_pixel(0, 0), &Rgb([10, 10, 10]));
        assert_eq!(output.get_pixel(1, 0), &Rgb([5, 5, 5]));
    }

    #[test]
    fn inputs_are_not_modified() {
        let refined = RefinedMask::from_mask(Mask::from_pixel(3, 3, Luma([MASK_SET])));
        let background = RgbImage::from_pixel(3, 3, Rgb([1, 2, 3]));
        let frame = RgbImage::from_pixel(3, 3, Rgb([4, 5, 6]));
        let (bg_before, frame_before) = (background.clone(), frame.clone());

        let output = composite(&frame, &background, &refined).unwrap();
        assert_eq!(output, background);
        assert_eq!(background, bg_before);
        assert_eq!(frame, frame_before);
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let refined = RefinedMask::from_mask(Mask::new(2, 2));
        let background = RgbImage::new(2, 2);
        let frame = RgbImage::new(3, 2);
        assert!(matches!(
            composite(&frame, &background, &refined),
            Err(CloakError::DimensionMismatch { .. })
        ));
    }
}
