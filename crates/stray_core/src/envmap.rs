//! Environment-map importance sampling.
//!
//! An [`EnvMap`] wraps an equirectangular HDR panorama with a
//! precomputed 2D piecewise-constant sampling distribution: a marginal
//! over columns and one conditional per column, built from blurred,
//! solid-angle-weighted luminance. Built once at scene-load time and
//! read-only while rendering.

use std::f32::consts::PI;

use log::debug;
use stray_math::{direction_to_spherical, luminance, spherical_to_direction, Vec3};

use crate::distribution::Distribution1D;
use crate::hdr::HdrImage;

/// Luminance floor so no texel has zero sampling probability.
const LUMINANCE_FLOOR: f32 = 1e-4;

/// Separable Gaussian blur kernel, 7 taps, sigma = 1.
const BLUR_RADIUS: isize = 3;

/// An importance-sampled equirectangular environment map.
#[derive(Debug, Clone)]
pub struct EnvMap {
    width: usize,
    height: usize,
    pixels: Vec<Vec3>,
    u_dist: Distribution1D,
    v_dists: Vec<Distribution1D>,
}

impl EnvMap {
    /// Build the sampling tables from an HDR panorama.
    pub fn from_image(image: &HdrImage) -> Self {
        let width = image.width;
        let height = image.height;
        assert!(width > 0 && height > 0, "empty environment map");

        // Blurred luminance keeps isolated hot texels from starving their
        // neighbours of sampling probability.
        let mut intensities: Vec<f32> = image
            .pixels
            .iter()
            .map(|&p| luminance(p).max(LUMINANCE_FLOOR))
            .collect();
        blur_horizontal_wrap(&mut intensities, width, height);
        blur_vertical_reflect(&mut intensities, width, height);

        // One conditional per column, each row weighted by sin(theta) to
        // compensate for the equirectangular pole stretch.
        let mut column = vec![0.0f32; height];
        let v_dists: Vec<Distribution1D> = (0..width)
            .map(|x| {
                for (y, value) in column.iter_mut().enumerate() {
                    let sin_theta = (PI * (y as f32 + 0.5) / height as f32).sin();
                    *value = intensities[y * width + x] * sin_theta;
                }
                Distribution1D::new(&column)
            })
            .collect();

        let marginal: Vec<f32> = v_dists.iter().map(|d| d.func_int()).collect();
        let u_dist = Distribution1D::new(&marginal);

        debug!(
            "built env map sampler: {}x{}, integral {:.4}",
            width,
            height,
            u_dist.func_int()
        );

        Self {
            width,
            height,
            pixels: image.pixels.clone(),
            u_dist,
            v_dists,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total emitted power: the blurred-luminance integral over the sphere.
    pub fn power(&self) -> f32 {
        2.0 * PI * PI * self.u_dist.func_int()
    }

    /// Draw a direction proportional to the map's luminance.
    ///
    /// Returns the direction and its solid-angle density.
    pub fn sample_direction(&self, u1: f32, u2: f32) -> (Vec3, f32) {
        let (fu, pdf_u) = self.u_dist.sample(u1);
        let x = (fu as usize).min(self.width - 1);
        let (fv, pdf_v) = self.v_dists[x].sample(u2);

        let theta = fv * self.v_dists[x].inv_count() * PI;
        let phi = fu * self.u_dist.inv_count() * 2.0 * PI;
        let dir = spherical_to_direction(theta, phi);

        let sin_theta = theta.sin();
        let pdf = if sin_theta > 0.0 {
            pdf_u * pdf_v / (2.0 * PI * PI * sin_theta)
        } else {
            0.0
        };
        (dir, pdf)
    }

    /// Solid-angle density of [`EnvMap::sample_direction`] producing `dir`.
    pub fn pdf(&self, dir: Vec3) -> f32 {
        let (theta, phi) = direction_to_spherical(dir);
        let sin_theta = theta.sin();
        if sin_theta <= 0.0 {
            return 0.0;
        }

        let (x, y) = self.pixel_coords(theta, phi);
        let pdf_u = self.u_dist.func(x) * self.u_dist.inv_func_int();
        let pdf_v = self.v_dists[x].func(y) * self.v_dists[x].inv_func_int();
        pdf_u * pdf_v / (2.0 * PI * PI * sin_theta)
    }

    /// Nearest-texel radiance toward `dir`.
    ///
    /// Used for light-sampled directions so the returned radiance stays
    /// aligned with the texel the distribution actually selected.
    pub fn radiance(&self, dir: Vec3) -> Vec3 {
        let (theta, phi) = direction_to_spherical(dir);
        let (x, y) = self.pixel_coords(theta, phi);
        self.pixels[y * self.width + x]
    }

    /// Bilinearly filtered radiance toward `dir`, for rays that hit the
    /// environment as background.
    pub fn radiance_bilinear(&self, dir: Vec3) -> Vec3 {
        let (theta, phi) = direction_to_spherical(dir);
        let fx = phi / (2.0 * PI) * self.width as f32 - 0.5;
        let fy = theta / PI * self.height as f32 - 0.5;

        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;

        // Longitude wraps; latitude clamps at the poles.
        let x0 = (x0 as isize).rem_euclid(self.width as isize) as usize;
        let x1 = (x0 + 1) % self.width;
        let y0 = (y0 as isize).clamp(0, self.height as isize - 1) as usize;
        let y1 = (y0 + 1).min(self.height - 1);

        let p00 = self.pixels[y0 * self.width + x0];
        let p10 = self.pixels[y0 * self.width + x1];
        let p01 = self.pixels[y1 * self.width + x0];
        let p11 = self.pixels[y1 * self.width + x1];

        let top = p00 * (1.0 - tx) + p10 * tx;
        let bottom = p01 * (1.0 - tx) + p11 * tx;
        top * (1.0 - ty) + bottom * ty
    }

    fn pixel_coords(&self, theta: f32, phi: f32) -> (usize, usize) {
        let x = (phi / (2.0 * PI) * self.width as f32) as usize;
        let y = (theta / PI * self.height as f32) as usize;
        (x.min(self.width - 1), y.min(self.height - 1))
    }
}

fn gaussian_kernel() -> [f32; 7] {
    let mut kernel = [0.0f32; 7];
    let mut sum = 0.0;
    for (i, k) in kernel.iter_mut().enumerate() {
        let d = i as f32 - BLUR_RADIUS as f32;
        *k = (-0.5 * d * d).exp(); // sigma = 1
        sum += *k;
    }
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

/// Horizontal pass: longitude wraps around.
fn blur_horizontal_wrap(values: &mut [f32], width: usize, height: usize) {
    let kernel = gaussian_kernel();
    let mut row = vec![0.0f32; width];
    for y in 0..height {
        let src = &values[y * width..(y + 1) * width];
        for (x, out) in row.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (i, &k) in kernel.iter().enumerate() {
                let dx = i as isize - BLUR_RADIUS;
                let sx = (x as isize + dx).rem_euclid(width as isize) as usize;
                acc += src[sx] * k;
            }
            *out = acc;
        }
        values[y * width..(y + 1) * width].copy_from_slice(&row);
    }
}

/// Vertical pass: reflect at the poles, no wraparound.
fn blur_vertical_reflect(values: &mut [f32], width: usize, height: usize) {
    let kernel = gaussian_kernel();
    let mut column = vec![0.0f32; height];
    for x in 0..width {
        for (y, out) in column.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (i, &k) in kernel.iter().enumerate() {
                let dy = i as isize - BLUR_RADIUS;
                let sy = reflect_index(y as isize + dy, height as isize);
                acc += values[sy * width + x] * k;
            }
            *out = acc;
        }
        for (y, &value) in column.iter().enumerate() {
            values[y * width + x] = value;
        }
    }
}

/// Mirror an out-of-range index back into [0, n): -y and 2n - y - 2.
fn reflect_index(i: isize, n: isize) -> usize {
    let i = if i < 0 { -i } else { i };
    let i = if i >= n { 2 * n - i - 2 } else { i };
    i.clamp(0, n - 1) as usize
}
