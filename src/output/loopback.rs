use super::{CancelFlag, DisplaySink, Window};
use anyhow::{Context, Result};
use image::RgbImage;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// One v4l2loopback device standing in for a window
struct LoopbackDevice {
    path: PathBuf,
    file: Option<File>,
}

impl LoopbackDevice {
    fn open(path: &Path, width: u32, height: u32) -> Result<Self> {
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        // Announce the frame format so readers know how to interpret the raw bytes
        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2 device at {}", path.display()))?;
        let requested = Format::new(width, height, FourCC::new(b"YUYV"));
        let negotiated = Output::set_format(&device, &requested)
            .with_context(|| format!("Failed to set YUYV format on {}", path.display()))?;
        if (negotiated.width, negotiated.height) != (width, height) {
            anyhow::bail!(
                "{} accepted {}x{} instead of {}x{}",
                path.display(),
                negotiated.width,
                negotiated.height,
                width,
                height
            );
        }

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }
}

/// Display sink writing YUYV frames to v4l2loopback devices.
///
/// The composite always goes to the main device; the mask view is only
/// produced when a second device is configured.
pub struct V4L2Output {
    composite: LoopbackDevice,
    mask: Option<LoopbackDevice>,
    width: u32,
    height: u32,
    cancel: CancelFlag,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(
        device_path: P,
        mask_device_path: Option<P>,
        width: u32,
        height: u32,
        cancel: CancelFlag,
    ) -> Result<Self> {
        let composite = LoopbackDevice::open(device_path.as_ref(), width, height)?;
        let mask = mask_device_path
            .map(|path| LoopbackDevice::open(path.as_ref(), width, height))
            .transpose()?;

        Ok(Self {
            composite,
            mask,
            width,
            height,
            cancel,
        })
    }

    pub fn has_mask_window(&self) -> bool {
        self.mask.is_some()
    }

    /// Convert RGB frame to YUV422 (YUYV) format
    fn rgb_to_yuyv(rgb_image: &RgbImage) -> Vec<u8> {
        let (width, height) = rgb_image.dimensions();
        let mut yuyv = Vec::with_capacity((width * height * 2) as usize);

        for y in 0..height {
            for x in (0..width).step_by(2) {
                let pixel1 = rgb_image.get_pixel(x, y);
                let pixel2 = if x + 1 < width {
                    rgb_image.get_pixel(x + 1, y)
                } else {
                    pixel1
                };

                let (y1, u1, v1) = rgb_to_yuv(pixel1[0], pixel1[1], pixel1[2]);
                let (y2, u2, v2) = rgb_to_yuv(pixel2[0], pixel2[1], pixel2[2]);

                // Chroma is shared by the pixel pair
                let u = ((u1 as u16 + u2 as u16) / 2) as u8;
                let v = ((v1 as u16 + v2 as u16) / 2) as u8;

                // YUYV format: Y0 U Y1 V
                yuyv.extend_from_slice(&[y1, u, y2, v]);
            }
        }

        yuyv
    }

    fn write(&mut self, window: Window, frame: &RgbImage) -> Result<()> {
        let device = match window {
            Window::Composite => &mut self.composite,
            Window::Mask => match self.mask.as_mut() {
                Some(device) => device,
                None => return Ok(()),
            },
        };
        let Some(file) = device.file.as_mut() else {
            return Ok(());
        };

        // The pipeline works at camera resolution; scale only at the sink
        let yuyv_data = if frame.dimensions() != (self.width, self.height) {
            let resized = image::imageops::resize(
                frame,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            );
            Self::rgb_to_yuyv(&resized)
        } else {
            Self::rgb_to_yuyv(frame)
        };

        file.write_all(&yuyv_data)
            .with_context(|| format!("Failed to write frame to {}", device.path.display()))
    }
}

/// Convert RGB to YUV color space
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = r as f32;
    let g = g as f32;
    let b = b as f32;

    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;

    (y, u, v)
}

impl DisplaySink for V4L2Output {
    fn show(&mut self, window: Window, frame: &RgbImage) {
        if let Err(e) = self.write(window, frame) {
            tracing::warn!("{:#}", e);
        }
    }

    fn poll_cancel(&mut self) -> bool {
        self.cancel.is_cancelled()
    }

    fn release(&mut self) {
        tracing::info!("Closing v4l2loopback devices");
        for device in std::iter::once(&mut self.composite).chain(self.mask.as_mut()) {
            if let Some(mut file) = device.file.take() {
                if let Err(e) = file.flush() {
                    tracing::warn!("Failed to flush {}: {}", device.path.display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn yuyv_packs_two_pixels_into_four_bytes() {
        let frame = RgbImage::from_fn(4, 2, |x, _| {
            if x % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let yuyv = V4L2Output::rgb_to_yuyv(&frame);
        assert_eq!(yuyv.len(), 4 * 2 * 2);
        // white then black luma, neutral chroma
        assert_eq!(yuyv[0], 255);
        assert_eq!(yuyv[2], 0);
        assert!((127..=129).contains(&yuyv[1]));
        assert!((127..=129).contains(&yuyv[3]));
    }

    #[test]
    fn odd_width_repeats_the_last_pixel() {
        let frame = RgbImage::from_pixel(3, 1, Rgb([0, 0, 0]));
        assert_eq!(V4L2Output::rgb_to_yuyv(&frame).len(), 8);
    }
}
