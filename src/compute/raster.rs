//! CPU raster operations used by the problem adapters.
//!
//! Rasters are interleaved `f32` grids indexed as
//! `(y * width + x) * channels + c`, with values nominally in `[0, 1]`.
//! When a raster has 2 or 4 channels, the last one is alpha.
//!
//! Files go through the `image` crate: any format it decodes can be opened,
//! and rasters are saved as 8-bit RGBA.

use std::path::Path;

use image::{
    DynamicImage, GenericImageView, ImageBuffer, Luma, LumaA, Pixel, Rgb, Rgba, RgbaImage,
    imageops::{self, FilterType},
};

/// Largest number of values a resize may produce.
const MAX_VALUES: usize = 1 << 30;

/// Raster construction errors.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("Raster dimensions must be non-zero (width={width}, height={height}, channels={channels})")]
    InvalidDimensions {
        width: usize,
        height: usize,
        channels: usize,
    },
    #[error("Rasters have 1 to 4 channels, found {0}")]
    Channels(usize),
    #[error("Raster data has {actual} values, expected {expected}")]
    DataLength { expected: usize, actual: usize },
    #[error("Resizing a {width}x{height} raster by {scale} exceeds the size limit")]
    TooLarge {
        width: usize,
        height: usize,
        scale: f32,
    },
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Dense image.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    data: Vec<f32>,
}

impl Raster {
    /// Zero-filled raster.
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0.0; width * height * channels],
        }
    }

    /// Wrap interleaved data.
    pub fn from_data(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<f32>,
    ) -> Result<Self, RasterError> {
        let raster = Self {
            width,
            height,
            channels,
            data,
        };
        raster.validate()?;
        Ok(raster)
    }

    /// Single-channel raster from a per-pixel function.
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            channels: 1,
            data,
        }
    }

    /// Decode an image file, keeping its gray/color and alpha layout.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RasterError> {
        let image = image::open(path)?;
        Self::from_image(&image)
    }

    /// Convert a decoded image to `f32` channels in `[0, 1]`.
    pub fn from_image(image: &DynamicImage) -> Result<Self, RasterError> {
        let (width, height) = image.dimensions();
        let color = image.color();
        let (channels, data) = match (color.has_color(), color.has_alpha()) {
            (false, false) => (1, image.to_luma32f().into_raw()),
            (false, true) => (2, image.to_luma_alpha32f().into_raw()),
            (true, false) => (3, image.to_rgb32f().into_raw()),
            (true, true) => (4, image.to_rgba32f().into_raw()),
        };
        Self::from_data(width as usize, height as usize, channels, data)
    }

    /// 8-bit RGBA copy. Gray is replicated across color channels; rasters
    /// without alpha come out opaque.
    pub fn to_rgba8(&self) -> RgbaImage {
        let last_color = self.color_channels().saturating_sub(1);
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            let color = |c: usize| to_u8(self.get(x, y, c.min(last_color)));
            Rgba([color(0), color(1), color(2), to_u8(self.alpha(x, y))])
        })
    }

    /// Save as 8-bit RGBA; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RasterError> {
        self.to_rgba8().save(path)?;
        Ok(())
    }

    /// Check dimensions, channel count and data length.
    pub fn validate(&self) -> Result<(), RasterError> {
        if self.width == 0 || self.height == 0 || self.channels == 0 {
            return Err(RasterError::InvalidDimensions {
                width: self.width,
                height: self.height,
                channels: self.channels,
            });
        }
        if self.channels > 4 {
            return Err(RasterError::Channels(self.channels));
        }
        let expected = self.width * self.height * self.channels;
        if self.data.len() != expected {
            return Err(RasterError::DataLength {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    fn index(&self, x: usize, y: usize, c: usize) -> usize {
        (y * self.width + x) * self.channels + c
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, c: usize) -> f32 {
        self.data[self.index(x, y, c)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, c: usize, value: f32) {
        let idx = self.index(x, y, c);
        self.data[idx] = value;
    }

    /// Whether the last channel is alpha.
    pub fn has_alpha(&self) -> bool {
        self.channels == 2 || self.channels == 4
    }

    /// Alpha at a pixel; opaque when the raster has no alpha channel.
    #[inline]
    pub fn alpha(&self, x: usize, y: usize) -> f32 {
        if self.has_alpha() {
            self.get(x, y, self.channels - 1)
        } else {
            1.0
        }
    }

    fn color_channels(&self) -> usize {
        if self.has_alpha() {
            self.channels - 1
        } else {
            self.channels
        }
    }

    /// Luminance raster. Color is premultiplied by alpha first, so transparent
    /// regions come out black.
    pub fn to_gray(&self) -> Raster {
        let color_channels = self.color_channels();

        let mut out = Raster::new(self.width, self.height, 1);
        for y in 0..self.height {
            for x in 0..self.width {
                let alpha = self.alpha(x, y);
                let luma = if color_channels >= 3 {
                    0.2126 * self.get(x, y, 0)
                        + 0.7152 * self.get(x, y, 1)
                        + 0.0722 * self.get(x, y, 2)
                } else {
                    self.get(x, y, 0)
                };
                out.set(x, y, 0, luma * alpha);
            }
        }
        out
    }

    /// Scale all values so the maximum becomes 1. A black raster is left as is.
    pub fn normalize_max(&mut self) {
        let max = self.data.iter().copied().fold(0.0f32, f32::max);
        if max > 1e-6 {
            self.data.iter_mut().for_each(|v| *v /= max);
        }
    }

    /// Pixels where channel 0 exceeds `threshold`, row-major.
    pub fn mask_above(&self, threshold: f32) -> Vec<bool> {
        self.data
            .chunks_exact(self.channels)
            .map(|px| px[0] > threshold)
            .collect()
    }

    /// Pixels where alpha exceeds `threshold`, row-major.
    pub fn alpha_mask(&self, threshold: f32) -> Vec<bool> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .map(|(x, y)| self.alpha(x, y) > threshold)
            .collect()
    }

    /// Bilinear sample at continuous pixel coordinates, clamped to the edges.
    pub fn sample(&self, x: f32, y: f32, c: usize) -> f32 {
        let x = x.clamp(0.0, (self.width - 1) as f32);
        let y = y.clamp(0.0, (self.height - 1) as f32);
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let top = self.get(x0, y0, c) * (1.0 - fx) + self.get(x1, y0, c) * fx;
        let bottom = self.get(x0, y1, c) * (1.0 - fx) + self.get(x1, y1, c) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// Resize by `scale` with a triangle (bilinear) filter. The result is
    /// at least 1x1.
    pub fn resize(&self, scale: f32) -> Result<Raster, RasterError> {
        self.validate()?;
        let too_large = RasterError::TooLarge {
            width: self.width,
            height: self.height,
            scale,
        };
        let (Some(width), Some(height)) =
            (scaled_len(self.width, scale), scaled_len(self.height, scale))
        else {
            return Err(too_large);
        };
        match width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(self.channels))
        {
            Some(n) if n <= MAX_VALUES => Ok(self.resize_to(width, height)),
            _ => Err(too_large),
        }
    }

    /// Resize to exact dimensions. The raster must have 1 to 4 channels.
    pub(crate) fn resize_to(&self, width: usize, height: usize) -> Raster {
        match self.channels {
            1 => self.resize_as::<Luma<f32>>(width, height),
            2 => self.resize_as::<LumaA<f32>>(width, height),
            3 => self.resize_as::<Rgb<f32>>(width, height),
            _ => self.resize_as::<Rgba<f32>>(width, height),
        }
    }

    fn resize_as<P>(&self, width: usize, height: usize) -> Raster
    where
        P: Pixel<Subpixel = f32> + 'static,
    {
        let channels = self.channels;
        let source: ImageBuffer<P, Vec<f32>> =
            ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
                let start = self.index(x as usize, y as usize, 0);
                *P::from_slice(&self.data[start..start + channels])
            });
        let resized = imageops::resize(&source, width as u32, height as u32, FilterType::Triangle);
        Raster {
            width,
            height,
            channels,
            data: resized.into_raw(),
        }
    }

    /// Rotate by `angle` radians about the center, keeping the size.
    /// Pixels mapped from outside the source are zero.
    pub fn rotate(&self, angle: f32) -> Raster {
        let (sin, cos) = angle.sin_cos();
        let cx = (self.width as f32 - 1.0) / 2.0;
        let cy = (self.height as f32 - 1.0) / 2.0;
        let max_x = self.width as f32 - 0.5;
        let max_y = self.height as f32 - 0.5;

        let mut out = Raster::new(self.width, self.height, self.channels);
        for y in 0..self.height {
            for x in 0..self.width {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let src_x = cos * dx + sin * dy + cx;
                let src_y = -sin * dx + cos * dy + cy;
                if src_x < -0.5 || src_y < -0.5 || src_x > max_x || src_y > max_y {
                    continue;
                }
                for c in 0..self.channels {
                    out.set(x, y, c, self.sample(src_x, src_y, c));
                }
            }
        }
        out
    }

    /// Median filter over a `size x size` window, edges clamped.
    pub fn median_filter(&self, size: usize) -> Raster {
        let half = (size.max(1) / 2) as isize;
        let mut out = Raster::new(self.width, self.height, self.channels);
        let mut window = Vec::with_capacity(size * size);

        for y in 0..self.height {
            for x in 0..self.width {
                for c in 0..self.channels {
                    window.clear();
                    for ky in -half..=half {
                        for kx in -half..=half {
                            let sx = (x as isize + kx).clamp(0, self.width as isize - 1) as usize;
                            let sy = (y as isize + ky).clamp(0, self.height as isize - 1) as usize;
                            window.push(self.get(sx, sy, c));
                        }
                    }
                    window.sort_by(f32::total_cmp);
                    out.set(x, y, c, window[window.len() / 2]);
                }
            }
        }
        out
    }

    /// Crop `[x0, x0 + width) x [y0, y0 + height)`, clipped to the raster.
    pub fn crop(&self, x0: usize, y0: usize, width: usize, height: usize) -> Raster {
        let x1 = (x0 + width).min(self.width);
        let y1 = (y0 + height).min(self.height);
        let width = x1.saturating_sub(x0).max(1);
        let height = y1.saturating_sub(y0).max(1);

        let mut out = Raster::new(width, height, self.channels);
        for y in 0..height {
            for x in 0..width {
                let sx = (x0 + x).min(self.width - 1);
                let sy = (y0 + y).min(self.height - 1);
                for c in 0..self.channels {
                    out.set(x, y, c, self.get(sx, sy, c));
                }
            }
        }
        out
    }

    /// Alpha-blend `foreground` with its top-left corner at `(x0, y0)`.
    ///
    /// Uses the foreground's alpha as the mask: `fg * a + bg * (1 - a)`.
    /// Color channels are matched by index; when `self` has alpha, it is
    /// composited as `a_fg + a_bg * (1 - a_fg)`. Parts falling outside are
    /// clipped.
    pub fn blend(&mut self, foreground: &Raster, x0: isize, y0: isize) {
        let fg_color = foreground.color_channels();
        let bg_color = self.color_channels();

        for fy in 0..foreground.height {
            let y = y0 + fy as isize;
            if y < 0 || y >= self.height as isize {
                continue;
            }
            for fx in 0..foreground.width {
                let x = x0 + fx as isize;
                if x < 0 || x >= self.width as isize {
                    continue;
                }
                let (x, y) = (x as usize, y as usize);
                let a = foreground.alpha(fx, fy);
                if a <= 0.0 {
                    continue;
                }
                for c in 0..bg_color {
                    let fg = foreground.get(fx, fy, c.min(fg_color - 1));
                    let bg = self.get(x, y, c);
                    self.set(x, y, c, fg * a + bg * (1.0 - a));
                }
                if self.has_alpha() {
                    let alpha_c = self.channels - 1;
                    let bg_a = self.get(x, y, alpha_c);
                    self.set(x, y, alpha_c, a + bg_a * (1.0 - a));
                }
            }
        }
    }
}

/// `len * scale` rounded, at least 1, when it fits image dimensions.
fn scaled_len(len: usize, scale: f32) -> Option<usize> {
    let scaled = (len as f64 * scale as f64).round().max(1.0);
    (scaled.is_finite() && scaled <= u32::MAX as f64).then_some(scaled as usize)
}

fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> Raster {
        Raster::from_fn(width, height, |x, _| x as f32 / (width - 1) as f32)
    }

    #[test]
    fn test_from_data_validation() {
        assert!(Raster::from_data(2, 2, 1, vec![0.0; 4]).is_ok());
        assert!(matches!(
            Raster::from_data(2, 2, 3, vec![0.0; 4]),
            Err(RasterError::DataLength {
                expected: 12,
                actual: 4
            })
        ));
        assert!(matches!(
            Raster::from_data(0, 2, 1, vec![]),
            Err(RasterError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Raster::from_data(1, 1, 5, vec![0.0; 5]),
            Err(RasterError::Channels(5))
        ));
    }

    #[test]
    fn test_from_image_keeps_layout() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(3, 2, Luma([255])));
        let raster = Raster::from_image(&gray).unwrap();
        assert_eq!((raster.width, raster.height, raster.channels), (3, 2, 1));
        assert!(raster.data().iter().all(|&v| (v - 1.0).abs() < 1e-6));

        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 255, 0, 0])));
        let raster = Raster::from_image(&rgba).unwrap();
        assert_eq!(raster.channels, 4);
        assert!((raster.get(0, 0, 1) - 1.0).abs() < 1e-6);
        assert_eq!(raster.alpha(0, 0), 0.0);
    }

    #[test]
    fn test_png_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.png");

        // Gray + alpha is widened to RGBA on save.
        let raster = Raster::from_data(2, 1, 2, vec![0.5, 1.0, 1.0, 0.0]).unwrap();
        raster.save(&path).unwrap();
        let loaded = Raster::open(&path).unwrap();

        assert_eq!((loaded.width, loaded.height, loaded.channels), (2, 1, 4));
        for c in 0..3 {
            assert!((loaded.get(0, 0, c) - 0.5).abs() < 1.0 / 255.0);
        }
        assert_eq!(loaded.alpha(0, 0), 1.0);
        assert_eq!(loaded.alpha(1, 0), 0.0);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Raster::open(dir.path().join("absent.png")),
            Err(RasterError::Image(_))
        ));
    }

    #[test]
    fn test_sample_bilinear() {
        let r = gradient(5, 3);
        assert!((r.sample(2.0, 1.0, 0) - 0.5).abs() < 1e-6);
        assert!((r.sample(1.5, 0.0, 0) - 0.375).abs() < 1e-6);
        // Clamped outside the raster.
        assert!((r.sample(-3.0, 10.0, 0)).abs() < 1e-6);
        assert!((r.sample(99.0, 0.0, 0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_to_gray_premultiplies_alpha() {
        let rgba = Raster::from_data(
            2,
            1,
            4,
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0],
        )
        .unwrap();
        let gray = rgba.to_gray();
        assert_eq!(gray.channels, 1);
        assert!((gray.get(0, 0, 0) - 1.0).abs() < 1e-5);
        assert!(gray.get(1, 0, 0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_and_mask() {
        let mut r = Raster::from_data(3, 1, 1, vec![0.0, 0.25, 0.5]).unwrap();
        r.normalize_max();
        assert_eq!(r.data(), &[0.0, 0.5, 1.0]);
        assert_eq!(r.mask_above(0.01), vec![false, true, true]);
    }

    #[test]
    fn test_resize() {
        let r = Raster::from_data(4, 4, 1, vec![1.0; 16]).unwrap();
        let half = r.resize(0.5).unwrap();
        assert_eq!((half.width, half.height), (2, 2));
        assert!(half.data().iter().all(|&v| (v - 1.0).abs() < 1e-5));

        let tiny = r.resize(0.01).unwrap();
        assert_eq!((tiny.width, tiny.height), (1, 1));

        let rgba = Raster::from_data(2, 2, 4, [0.25, 0.5, 0.75, 1.0].repeat(4)).unwrap();
        let double = rgba.resize(2.0).unwrap();
        assert_eq!((double.width, double.height, double.channels), (4, 4, 4));
        assert!((double.get(3, 3, 1) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_resize_rejects_huge_scale() {
        let r = Raster::new(4, 4, 2);
        assert!(matches!(
            r.resize(1e30),
            Err(RasterError::TooLarge { width: 4, height: 4, .. })
        ));
        assert!(matches!(r.resize(f32::INFINITY), Err(RasterError::TooLarge { .. })));
        assert!(matches!(r.resize(1e5), Err(RasterError::TooLarge { .. })));
    }

    #[test]
    fn test_rotate_half_turn() {
        let r = gradient(5, 5);
        let rotated = r.rotate(std::f32::consts::PI);
        for y in 0..5 {
            for x in 0..5 {
                assert!((rotated.get(x, y, 0) - r.get(4 - x, 4 - y, 0)).abs() < 1e-4);
            }
        }
        let same = r.rotate(0.0);
        assert_eq!(same, r);
    }

    #[test]
    fn test_median_filter_removes_speck() {
        let mut r = Raster::new(5, 5, 1);
        r.set(2, 2, 0, 1.0);
        let filtered = r.median_filter(3);
        assert!(filtered.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_crop() {
        let r = gradient(5, 2);
        let c = r.crop(3, 0, 4, 2);
        assert_eq!((c.width, c.height), (2, 2));
        assert_eq!(c.get(0, 1, 0), r.get(3, 1, 0));
    }

    #[test]
    fn test_blend_clips_and_mixes() {
        let mut canvas = Raster::new(3, 3, 4);
        let stamp = Raster::from_data(2, 1, 2, vec![1.0, 1.0, 0.5, 0.5]).unwrap();

        canvas.blend(&stamp, 2, 1);
        // Only the first stamp pixel lands inside.
        assert!((canvas.get(2, 1, 0) - 1.0).abs() < 1e-6);
        assert!((canvas.get(2, 1, 3) - 1.0).abs() < 1e-6);

        canvas.blend(&stamp, -1, 0);
        // Second stamp pixel (value 0.5, alpha 0.5) over black.
        assert!((canvas.get(0, 0, 0) - 0.25).abs() < 1e-6);
        assert!((canvas.get(0, 0, 3) - 0.5).abs() < 1e-6);
    }
}
