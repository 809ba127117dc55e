//! Command-line front end: build a scene, render it, write the image.
//!
//! ```text
//! lumen [-n scene] [-s samples] [-ss super_samples] [-w width] [-h height]
//!       [-m pt|rt|debug] [--seed N] [-o output] [-c config.json]
//!       [--mesh model.obj] [--env sky.hdr]
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use lumen_renderer::scenes::{self, SceneAssets, SCENE_COUNT};
use lumen_renderer::{render, BvhConfig, MaterialRegistry, RenderConfig, TraceConfig};
use serde::Deserialize;

/// Contents of a `-c` JSON file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    render: RenderConfig,
    trace: TraceConfig,
    bvh: Option<BvhConfig>,
}

/// Values given on the command line; `None` keeps the file or default value.
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    scene: u32,
    output: PathBuf,
    samples: Option<u32>,
    super_samples: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    mode: Option<String>,
    seed: Option<u64>,
    assets: SceneAssets,
}

const USAGE: &str = "Usage: lumen [-n scene] [-s samples] [-ss super_samples] [-w width] \
[-h height] [-m pt|rt|debug] [--seed N] [-o output] [-c config.json] [--mesh model.obj] \
[--env sky.hdr]";

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args {
        scene: 1,
        output: PathBuf::from("result.ppm"),
        ..Args::default()
    };

    while let Some(flag) = args.next() {
        let mut value = || {
            args.next()
                .with_context(|| format!("missing value for {flag}"))
        };

        match flag.as_str() {
            "-c" | "--config" => parsed.config = Some(PathBuf::from(value()?)),
            "-n" | "--scene" => parsed.scene = value()?.parse().context("scene number")?,
            "-o" | "--output" => parsed.output = PathBuf::from(value()?),
            "-s" | "--samples" => parsed.samples = Some(value()?.parse().context("samples")?),
            "-ss" | "--super-samples" => {
                parsed.super_samples = Some(value()?.parse().context("super samples")?)
            }
            "-w" | "--width" => parsed.width = Some(value()?.parse().context("width")?),
            "-h" | "--height" => parsed.height = Some(value()?.parse().context("height")?),
            "-m" | "--mode" => parsed.mode = Some(value()?),
            "--seed" => parsed.seed = Some(value()?.parse().context("seed")?),
            "--mesh" => parsed.assets.mesh = Some(PathBuf::from(value()?)),
            "--env" => parsed.assets.environment = Some(PathBuf::from(value()?)),
            "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("unknown argument '{other}'\n{USAGE}"),
        }
    }

    Ok(parsed)
}

fn load_file_config(args: &Args) -> Result<FileConfig> {
    let Some(path) = &args.config else {
        return Ok(FileConfig::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Command-line values override the file, which overrides the defaults.
fn render_config(args: &Args, mut config: RenderConfig) -> Result<RenderConfig> {
    if let Some(samples) = args.samples {
        config.samples = samples;
    }
    if let Some(super_samples) = args.super_samples {
        config.super_samples = super_samples;
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(mode) = &args.mode {
        config.mode = mode.parse().map_err(anyhow::Error::msg)?;
    }

    if config.width == 0 || config.height == 0 {
        bail!("image size must be non-zero, got {}x{}", config.width, config.height);
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let file_config = load_file_config(&args)?;
    let config = render_config(&args, file_config.render)?;

    if !(1..=SCENE_COUNT).contains(&args.scene) {
        bail!("scene number must be between 1 and {SCENE_COUNT}, got {}", args.scene);
    }

    log::info!("Building scene {}", args.scene);
    let registry = MaterialRegistry::with_defaults();
    let mut scene = scenes::build(args.scene, &registry, &args.assets)
        .with_context(|| format!("building scene {}", args.scene))?;

    if let Some(bvh) = file_config.bvh {
        scene = scene.with_bvh_config(bvh);
        scene.construct();
    }
    scene.set_trace_config(file_config.trace);

    let image = render(&scene, &config)?;
    image
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    Ok(())
}
