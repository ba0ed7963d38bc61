//! # stray
//!
//! Offline stochastic ray tracer. Renders a preset or JSON-described
//! scene with one of five estimators (light sampling, BRDF sampling,
//! an even split, multiple importance sampling, or path tracing) and
//! writes the converged image as tone-mapped PNG and/or Radiance HDR.

mod presets;
mod scene_file;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use stray_core::{hdr, EnvMap};
use stray_renderer::{render_iteration, Film, RenderConfig, RenderMode, Tonemap};

use presets::ScenePreset;

/// stray — offline stochastic ray tracer
#[derive(Parser, Debug)]
#[command(
    name = "stray",
    version,
    about = "Batch Monte Carlo renderer with light/BRDF/MIS estimators and path tracing",
    after_help = "EXAMPLES:\n  \
                  stray --scene cornell --mode mis --spp 8 --iterations 64\n  \
                  stray --scene environment --env sky.hdr --mode path-tracing\n  \
                  stray --scene-file scene.json --hdr-output render.hdr"
)]
struct Cli {
    /// Scene preset to render
    #[arg(long, value_enum, default_value_t = ScenePreset::Cornell)]
    scene: ScenePreset,

    /// JSON scene description; overrides --scene
    #[arg(long)]
    scene_file: Option<PathBuf>,

    /// Radiance .hdr panorama for the environment preset
    #[arg(long)]
    env: Option<PathBuf>,

    /// Radiance estimator
    #[arg(short, long, value_enum, default_value_t = CliMode::Mis)]
    mode: CliMode,

    /// Image width in pixels
    #[arg(short = 'W', long, default_value_t = 512)]
    width: u32,

    /// Image height in pixels
    #[arg(short = 'H', long, default_value_t = 512)]
    height: u32,

    /// Estimator samples per pixel per iteration
    #[arg(long, default_value_t = 8)]
    spp: u32,

    /// Accumulation iterations (one sample batch per pixel each)
    #[arg(short, long, default_value_t = 32)]
    iterations: u32,

    /// Maximum path length in path-tracing mode
    #[arg(long, default_value_t = 16)]
    max_bounces: u32,

    /// RNG seed; renders are reproducible per seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Worker threads (defaults to hardware concurrency)
    #[arg(long)]
    threads: Option<usize>,

    /// Render on a single thread with one generator
    #[arg(long)]
    no_parallel: bool,

    /// Tone mapping operator for the PNG output
    #[arg(short, long, value_enum, default_value_t = CliTonemap::Clamp)]
    tonemap: CliTonemap,

    /// Exposure multiplier applied before tone mapping
    #[arg(long, default_value_t = 1.0)]
    exposure: f32,

    /// Tone-mapped PNG output path
    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,

    /// Linear Radiance .hdr output path
    #[arg(long)]
    hdr_output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliMode {
    /// All samples on light sources
    Light,
    /// All samples from the BRDF
    Brdf,
    /// Half/half split, no reweighting
    Half,
    /// Multiple importance sampling (balance heuristic)
    Mis,
    /// Multi-bounce path tracing
    PathTracing,
}

impl From<CliMode> for RenderMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Light => Self::LightSource,
            CliMode::Brdf => Self::Brdf,
            CliMode::Half => Self::HalfWeight,
            CliMode::Mis => Self::MultipleImportance,
            CliMode::PathTracing => Self::PathTracing,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliTonemap {
    Clamp,
    Reinhard,
    Aces,
}

impl From<CliTonemap> for Tonemap {
    fn from(op: CliTonemap) -> Self {
        match op {
            CliTonemap::Clamp => Self::Clamp,
            CliTonemap::Reinhard => Self::Reinhard,
            CliTonemap::Aces => Self::Aces,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("configuring the worker pool")?;
    }

    let environment = match &cli.env {
        Some(path) => {
            let image =
                hdr::load_hdr(path).with_context(|| format!("loading {}", path.display()))?;
            info!(
                "environment map: {} ({}x{})",
                path.display(),
                image.width,
                image.height
            );
            Some(Arc::new(EnvMap::from_image(&image)))
        }
        None => None,
    };

    let (scene, camera) = match &cli.scene_file {
        Some(path) => scene_file::load(path)?,
        None => presets::build(cli.scene, environment),
    };
    let camera = camera.with_resolution(cli.width, cli.height);

    let mode = RenderMode::from(cli.mode);
    if scene.total_power() <= 0.0 && mode.light_weight() > 0.0 {
        bail!(
            "scene has no light source; {:?} mode cannot converge (add an emitter or use --mode brdf)",
            mode
        );
    }

    let config = RenderConfig {
        mode,
        samples_per_pixel: cli.spp,
        max_bounces: cli.max_bounces,
        seed: cli.seed,
        parallel: !cli.no_parallel,
    };

    info!(
        "rendering {}x{}, {:?}, {} spp x {} iterations, {} objects, total power {:.3}",
        cli.width,
        cli.height,
        mode,
        cli.spp,
        cli.iterations,
        scene.objects().len(),
        scene.total_power()
    );

    let start = Instant::now();
    let mut film = Film::new(cli.width, cli.height);
    for i in 0..cli.iterations {
        render_iteration(&scene, &camera, &config, &mut film);
        if (i + 1) % 8 == 0 || i + 1 == cli.iterations {
            info!(
                "iteration {}/{} ({:.1}s elapsed)",
                i + 1,
                cli.iterations,
                start.elapsed().as_secs_f32()
            );
        }
    }
    let elapsed = start.elapsed();
    info!(
        "rendered {} samples/pixel in {:.2}s",
        cli.spp * cli.iterations,
        elapsed.as_secs_f32()
    );

    let rgba = film.to_rgba8(cli.tonemap.into(), cli.exposure);
    let png = image::RgbaImage::from_raw(cli.width, cli.height, rgba)
        .context("assembling output image")?;
    png.save(&cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    info!("wrote {}", cli.output.display());

    if let Some(path) = &cli.hdr_output {
        hdr::save_hdr(path, &film.to_hdr_image())
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {}", path.display());
    }

    Ok(())
}
