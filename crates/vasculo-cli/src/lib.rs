//! # Vasculo CLI
//!
//! Command-line interface for the Vasculo vascular mesh pipeline.
//!
//! ## Commands
//! - `inspect` - Parse a VTK file and summarize its contents
//! - `build` - Run the full load pipeline against a headless surface

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use vasculo_assets::{vtk, FileFetcher, Fetcher};
use vasculo_core::PerformanceMode;
use vasculo_loader::{install_lighting, HeadlessSurface, LoadCallbacks, LoaderConfig, VtkLoader};
use vasculo_renderer::LightingRig;

/// Vasculo vascular tree CLI
#[derive(Parser)]
#[command(name = "vasculo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log through tracing, including LOD batch spans
    #[arg(long)]
    pub trace: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Performance mode flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    High,
    Medium,
    Low,
    Auto,
}

impl From<ModeArg> for PerformanceMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::High => Self::High,
            ModeArg::Medium => Self::Medium,
            ModeArg::Low => Self::Low,
            ModeArg::Auto => Self::Auto,
        }
    }
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Parse a VTK file and print a JSON summary
    Inspect {
        /// VTK polydata file
        file: PathBuf,
    },

    /// Build geometry for a VTK file and print load statistics
    Build {
        /// VTK polydata file
        file: PathBuf,

        /// Loader configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Build tapered tubes instead of lines
        #[arg(long)]
        tubes: bool,

        /// Radial tessellation of the nearest LOD level
        #[arg(long)]
        segments: Option<usize>,

        /// Target largest dimension
        #[arg(long)]
        model_size: Option<f32>,

        /// Add the wireframe overlay to line geometry
        #[arg(long)]
        wireframe: bool,

        /// Performance mode
        #[arg(short, long, value_enum)]
        performance: Option<ModeArg>,
    },
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.trace);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    let summary = match cli.command {
        Commands::Inspect { file } => runtime.block_on(inspect(&file))?,
        Commands::Build {
            file,
            config,
            tubes,
            segments,
            model_size,
            wireframe,
            performance,
        } => {
            let mut loader_config = match config {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    LoaderConfig::from_json(&text)?
                }
                None => LoaderConfig::default(),
            };
            apply_overrides(&mut loader_config, tubes, segments, model_size, wireframe, performance);
            runtime.block_on(build(&file, &loader_config))?
        }
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn init_logging(verbose: bool, trace: bool) {
    if trace {
        // Also installs the log bridge, so env_logger must stay off
        tracing_subscriber::fmt()
            .with_max_level(if verbose {
                tracing_subscriber::filter::LevelFilter::TRACE
            } else {
                tracing_subscriber::filter::LevelFilter::DEBUG
            })
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .init();
    } else if verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
}

/// Command-line flags take precedence over the configuration file
pub fn apply_overrides(
    config: &mut LoaderConfig,
    tubes: bool,
    segments: Option<usize>,
    model_size: Option<f32>,
    wireframe: bool,
    performance: Option<ModeArg>,
) {
    if tubes {
        config.use_cylinder_geometry = true;
    }
    if let Some(segments) = segments {
        config.tube_segments = segments;
    }
    if let Some(size) = model_size {
        config.model_size = size;
    }
    if wireframe {
        config.enable_wireframe = true;
    }
    if let Some(mode) = performance {
        config.performance_mode = Some(mode.into());
    }
}

async fn inspect(file: &std::path::Path) -> Result<serde_json::Value> {
    let path = file.to_string_lossy();
    let text = FileFetcher::new().fetch(&path).await?;
    let data = vtk::parse(&text, &mut |message: &str, percent: f32| {
        log::debug!("{} {:.0}%", message, percent);
    });

    let bounds = data.bounds();
    let scalars: Vec<_> = data
        .scalars
        .values()
        .map(|field| {
            json!({
                "name": field.name,
                "role": field.role(),
                "values": field.len(),
                "range": field.range(),
            })
        })
        .collect();

    Ok(json!({
        "file": path,
        "header": data.header,
        "declaredPoints": data.point_count,
        "points": data.points.len(),
        "truncated": data.is_truncated(),
        "cells": data.cells.len(),
        "segmentPairs": data.segment_pair_count(),
        "scalars": scalars,
        "bounds": (!bounds.is_empty()).then(|| json!({
            "min": bounds.min.to_array(),
            "max": bounds.max.to_array(),
        })),
        "stats": data.stats,
    }))
}

async fn build(file: &std::path::Path, config: &LoaderConfig) -> Result<serde_json::Value> {
    let path = file.to_string_lossy();
    let mut surface = HeadlessSurface::new();
    let lighting = install_lighting(&mut surface, &LightingRig::standard(config.model_size));
    let mut loader = VtkLoader::new(FileFetcher::new(), surface, lighting);

    let mut last_logged = -1.0f32;
    let mut callbacks = LoadCallbacks::new().with_progress(|message: &str, percent: f32| {
        if percent - last_logged >= 10.0 || percent >= 100.0 {
            log::info!("{} ({:.0}%)", message, percent);
            last_logged = percent;
        }
    });

    loader
        .load_file(&path, config, &mut callbacks)
        .await
        .with_context(|| format!("failed to load {path}"))?;
    drop(callbacks);

    let model = loader.current().context("loader kept no model")?;
    let summary = json!({
        "name": model.name,
        "mode": format!("{:?}", model.render_mode()).to_lowercase(),
        "isPointCloud": model.is_point_cloud(),
        "stats": model.stats,
        "radiusRange": model.radius_range,
        "pressureRange": model.pressure_range,
        "placement": model.placement,
        "camera": model.camera,
        "surfaceObjects": loader.surface().object_count(),
        "framesYielded": loader.surface().frames_yielded(),
    });
    Ok(summary)
}
