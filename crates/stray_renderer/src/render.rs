//! Per-iteration render driver.
//!
//! One iteration produces one estimator sample per pixel and merges it
//! into the film's running mean. Rows are the unit of parallel work;
//! each row gets its own generator seeded from (seed, iteration, row),
//! so a render is deterministic per seed regardless of how rayon
//! schedules the rows.

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use stray_core::Scene;
use stray_math::Vec3;

use crate::camera::Camera;
use crate::film::Film;
use crate::integrator::{estimate_radiance, RenderConfig};

/// Render one iteration into the film.
///
/// The scene and camera are read-only during the pass; the per-pixel
/// sample buffer is the only state written, and each worker owns a
/// disjoint row range of it.
pub fn render_iteration(scene: &Scene, camera: &Camera, config: &RenderConfig, film: &mut Film) {
    assert_eq!(film.width(), camera.image_width);
    assert_eq!(film.height(), camera.image_height);

    let width = camera.image_width as usize;
    let iteration = film.iterations();
    let mut samples = vec![Vec3::ZERO; width * camera.image_height as usize];

    if config.parallel {
        samples
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                let mut rng = SmallRng::seed_from_u64(row_seed(config.seed, iteration, y as u64));
                render_row(scene, camera, config, y as u32, row, &mut rng);
            });
    } else {
        // Sequential fallback: a single generator drives the whole pass.
        let mut rng = SmallRng::seed_from_u64(splitmix64(config.seed ^ iteration as u64));
        for (y, row) in samples.chunks_mut(width).enumerate() {
            render_row(scene, camera, config, y as u32, row, &mut rng);
        }
    }

    film.accumulate(&samples);
    debug!("iteration {} accumulated", film.iterations());
}

fn render_row<R: Rng + ?Sized>(
    scene: &Scene,
    camera: &Camera,
    config: &RenderConfig,
    y: u32,
    row: &mut [Vec3],
    rng: &mut R,
) {
    for (x, sample) in row.iter_mut().enumerate() {
        let jitter = (rng.gen(), rng.gen());
        let ray = camera.ray(x as u32, y, jitter);
        *sample = estimate_radiance(scene, &ray, config, rng);
    }
}

/// SplitMix64 finalizer; decorrelates nearby seed inputs.
fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn row_seed(seed: u64, iteration: u32, row: u64) -> u64 {
    splitmix64(seed ^ splitmix64((iteration as u64) << 32 | row))
}
