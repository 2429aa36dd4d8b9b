//! # lumen
//!
//! A physically-based offline renderer. Scenes are decomposed into image
//! blocks, rendered by worker threads via Monte Carlo path tracing, and
//! reconstructed through filter-weighted atomic splatting.
//!
//! ```text
//!   L_o(p, ω_o) = L_e(p, ω_o) + ∫_Ω f(p, ω_i, ω_o) · L_i(p, ω_i) · |cos θ_i| dω_i
//! ```
//!
//! Color output is written as binary PPM, depth as PGM, and `--preview`
//! paints the finished frame into the terminal with half-block characters.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{error, info};

use lumen::driver::Driver;
use lumen::film::{Color24, RenderTarget};
use lumen::presets::{IntegratorKind, RenderOptions, SamplerKind, ScenePreset};

/// lumen — a physically-based offline renderer
#[derive(Parser, Debug)]
#[command(
    name = "lumen",
    version,
    about = "A physically-based offline renderer written in Rust 🦀",
    long_about = "Renders built-in scenes with Monte Carlo light transport: Whitted, \
                  unidirectional, and bidirectional path tracing over an SAH BVH, with \
                  multiple importance sampling and participating media.",
    after_help = "EXAMPLES:\n  \
                  lumen --scene cornell -o cornell --spp 64 -n 8\n  \
                  lumen --scene showcase -o out --integrator whitted --depth 6\n  \
                  lumen --scene fog -o fog --sampler adaptive --spp 4 --preview"
)]
struct Cli {
    /// Scene preset to render
    #[arg(short, long, value_enum, default_value_t = ScenePreset::Showcase)]
    scene: ScenePreset,

    /// Output prefix: color goes to <prefix>.ppm, depth to <prefix>.pgm
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short = 'n', long, default_value_t = 1)]
    threads: usize,

    /// Width of the work blocks the image is partitioned into; defaults to
    /// the image width
    #[arg(long)]
    block_w: Option<usize>,

    /// Height of the work blocks; defaults to the image height
    #[arg(long)]
    block_h: Option<usize>,

    /// Image width in pixels
    #[arg(short = 'W', long, default_value_t = 512)]
    width: usize,

    /// Image height in pixels
    #[arg(short = 'H', long, default_value_t = 512)]
    height: usize,

    /// Samples per pixel (minimum rate for the adaptive sampler)
    #[arg(long, default_value_t = 8)]
    spp: usize,

    /// Pixel sampling strategy
    #[arg(long, value_enum, default_value_t = SamplerKind::Ld)]
    sampler: SamplerKind,

    /// Light transport algorithm
    #[arg(long, value_enum, default_value_t = IntegratorKind::Path)]
    integrator: IntegratorKind,

    /// Maximum ray recursion / path depth
    #[arg(short = 'd', long, default_value_t = 8)]
    depth: u32,

    /// Paint the finished frame into the terminal
    #[arg(short, long)]
    preview: bool,
}

fn print_header(cli: &Cli) {
    eprintln!();
    eprintln!("  ╔═══════════════════════════════════════════════╗");
    eprintln!("  ║  lumen · physically-based offline renderer    ║");
    eprintln!("  ╚═══════════════════════════════════════════════╝");
    eprintln!();
    eprintln!("  Scene:      {}", cli.scene.name());
    eprintln!("  Resolution: {}×{}", cli.width, cli.height);
    eprintln!("  Sampling:   {:?} @ {} spp", cli.sampler, cli.spp);
    eprintln!("  Transport:  {:?}, max depth {}", cli.integrator, cli.depth);
    eprintln!("  Workers:    {}", cli.threads);
    eprintln!();
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if cli.output.is_none() && !cli.preview {
        error!("no output medium: pass -o <prefix>, --preview, or both");
        return ExitCode::FAILURE;
    }

    let opts = RenderOptions {
        width: cli.width,
        height: cli.height,
        spp: cli.spp,
        sampler: cli.sampler,
        integrator: cli.integrator,
        max_depth: cli.depth,
    };
    let scene = match cli.scene.build(&opts) {
        Ok(scene) => Arc::new(scene),
        Err(err) => {
            error!("failed to build scene: {err}");
            return ExitCode::FAILURE;
        }
    };

    print_header(&cli);
    let block_w = cli.block_w.unwrap_or(cli.width);
    let block_h = cli.block_h.unwrap_or(cli.height);
    let mut driver = Driver::new(Arc::clone(&scene), cli.threads, block_w, block_h);

    let start = Instant::now();
    driver.render();
    while !driver.done() {
        std::thread::sleep(Duration::from_millis(20));
    }
    let elapsed = start.elapsed().as_secs_f64();

    let total_rays = (cli.width * cli.height * cli.spp) as f64;
    info!(
        "rendered in {elapsed:.2}s — ≈{:.2}M camera rays, {:.2} Mrays/s",
        total_rays / 1e6,
        total_rays / elapsed / 1e6
    );

    if let Some(prefix) = &cli.output {
        let color_path = prefix.with_extension("ppm");
        let depth_path = prefix.with_extension("pgm");
        if let Err(err) = scene.render_target.save_image(&color_path) {
            error!("failed to write {}: {err}", color_path.display());
            return ExitCode::FAILURE;
        }
        if let Err(err) = scene.render_target.save_depth(&depth_path) {
            error!("failed to write {}: {err}", depth_path.display());
            return ExitCode::FAILURE;
        }
        info!(
            "wrote {} and {}",
            color_path.display(),
            depth_path.display()
        );
    }
    if cli.preview {
        display_halfblock(&scene.render_target);
    }
    ExitCode::SUCCESS
}

/// Paints the frame with half-block characters: each cell shows two vertical
/// pixels via separate foreground and background colors.
fn display_halfblock(target: &RenderTarget) {
    use crossterm::style::{self, Stylize};
    use std::io::{self, Write};

    let buf: Vec<Color24> = target.color_buffer();
    let (w, h) = (target.width(), target.height());
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    for row in 0..h / 2 {
        for x in 0..w {
            let top = buf[(row * 2) * w + x];
            let bottom = buf[(row * 2 + 1) * w + x];
            let _ = write!(
                out,
                "{}",
                "▀".with(style::Color::Rgb {
                    r: top.r,
                    g: top.g,
                    b: top.b
                })
                .on(style::Color::Rgb {
                    r: bottom.r,
                    g: bottom.g,
                    b: bottom.b
                })
            );
        }
        let _ = writeln!(out);
    }
    let _ = out.flush();
}
