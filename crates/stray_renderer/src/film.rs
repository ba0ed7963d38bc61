//! Accumulation film: per-pixel running mean across render iterations.

use stray_core::hdr::HdrImage;
use stray_math::Vec3;

use crate::tonemap::Tonemap;

/// Per-pixel radiance accumulator.
///
/// Each iteration contributes one sample per pixel; the film keeps the
/// running mean via `new = sample * (1/i) + old * (1 - 1/i)`, which
/// equals the arithmetic mean of all samples so far.
#[derive(Clone, Debug)]
pub struct Film {
    width: u32,
    height: u32,
    pixels: Vec<Vec3>,
    iterations: u32,
}

impl Film {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec3::ZERO; (width * height) as usize],
            iterations: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Completed iterations.
    #[inline]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Vec3 {
        self.pixels[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn pixels(&self) -> &[Vec3] {
        &self.pixels
    }

    /// Merge one full iteration of per-pixel samples into the mean.
    ///
    /// `samples` is row-major and must cover every pixel.
    pub fn accumulate(&mut self, samples: &[Vec3]) {
        assert_eq!(samples.len(), self.pixels.len());
        self.iterations += 1;
        let w = 1.0 / self.iterations as f32;
        for (pixel, &sample) in self.pixels.iter_mut().zip(samples) {
            *pixel = sample * w + *pixel * (1.0 - w);
        }
    }

    /// Reset to an empty film.
    pub fn clear(&mut self) {
        self.pixels.fill(Vec3::ZERO);
        self.iterations = 0;
    }

    /// Tone-map and gamma-encode (gamma 2.0) to packed RGBA bytes.
    pub fn to_rgba8(&self, tonemap: Tonemap, exposure: f32) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for &pixel in &self.pixels {
            let mapped = tonemap.apply(pixel * exposure);
            out.push(encode_gamma(mapped.x));
            out.push(encode_gamma(mapped.y));
            out.push(encode_gamma(mapped.z));
            out.push(255);
        }
        out
    }

    /// The raw linear radiance as an HDR image.
    pub fn to_hdr_image(&self) -> HdrImage {
        HdrImage::from_pixels(
            self.width as usize,
            self.height as usize,
            self.pixels.clone(),
        )
    }
}

/// Gamma 2.0 encoding of a [0, 1] value to a byte.
#[inline]
fn encode_gamma(linear: f32) -> u8 {
    let encoded = if linear > 0.0 { linear.sqrt() } else { 0.0 };
    (255.0 * encoded.clamp(0.0, 1.0)) as u8
}
