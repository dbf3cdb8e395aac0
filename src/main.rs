use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rayon::prelude::*;

use handsign::classifier::{ModelName, ModelRegistry};
use handsign::config::{Config, ASSET_DIR_VAR};
use handsign::hand::HandExtractor;
use handsign::labels::LabelTable;
use handsign::pipeline::Pipeline;
use handsign::source::{FrameDirectory, FrameSource, ImageFiles};
use handsign::timer::FpsCounter;

/// Classifies sign language gestures in images.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Directory containing labels.txt, the model artifacts, and the hand networks.
    #[arg(long, global = true, env = ASSET_DIR_VAR)]
    assets: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Annotates images with the predicted gesture.
    Classify {
        /// Model to classify with: random_forest, svm, or knn.
        #[arg(long, default_value = "random_forest")]
        model: ModelName,

        /// Directory to write annotated PNGs to.
        #[arg(long, default_value = "out")]
        out: PathBuf,

        /// Image files or directories of frames.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Lists the available models.
    Models,
}

fn main() -> anyhow::Result<()> {
    handsign::init_logger!();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.assets {
        config = config.with_asset_dir(dir);
    }

    match cli.command {
        Command::Classify { model, out, inputs } => classify(config, model, &out, &inputs),
        Command::Models => list_models(&config),
    }
}

fn load_registry(config: &Config) -> anyhow::Result<ModelRegistry> {
    Ok(ModelRegistry::load_with_input_dim(
        &ModelName::ALL,
        config.asset_dir(),
        config.feature_dim(),
    )?)
}

fn list_models(config: &Config) -> anyhow::Result<()> {
    let labels = LabelTable::load(config.labels_path())?;
    let registry = load_registry(config)?;

    for (name, model) in registry.iter() {
        println!(
            "{name:<14} {:<14} {} features",
            name.display_label(),
            model.input_dim()
        );
    }
    println!("{} labels", labels.len());
    Ok(())
}

fn classify(
    config: Config,
    model: ModelName,
    out: &Path,
    inputs: &[PathBuf],
) -> anyhow::Result<()> {
    let labels = LabelTable::load(config.labels_path())?;
    let registry = load_registry(&config)?;
    let extractor = HandExtractor::load(&config)?;
    let pipeline = Pipeline::new(labels, registry, extractor, config)?;

    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            paths.extend(FrameDirectory::open(input)?.into_paths());
        } else {
            paths.push(input.clone());
        }
    }
    if paths.is_empty() {
        bail!("no images found in {:?}", inputs);
    }
    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create output directory '{}'", out.display()))?;

    log::info!("classifying {} frames with '{model}'", paths.len());
    let mut source = ImageFiles::new(paths);
    let frames = std::iter::from_fn(|| {
        let frame = source.next_frame().transpose()?;
        let name = source.frame_name().unwrap_or_else(|| "frame".into());
        Some((name, frame))
    });

    let failures = AtomicUsize::new(0);
    let fps = Mutex::new(FpsCounter::new("classify"));
    frames.par_bridge().for_each(|(name, frame)| {
        let result = frame.map_err(anyhow::Error::from).and_then(|frame| {
            let outcome = pipeline.process_detailed(frame, model);
            match &outcome.prediction {
                Some(p) => log::info!("{name}: {} (class {})", p.label, p.class),
                None => log::info!("{name}: no gesture"),
            }

            let path = out.join(format!("{name}.png"));
            outcome.frame.into_rgb_image().save(&path)?;
            Ok(())
        });
        if let Err(e) = result {
            log::error!("{name}: {e:#}");
            failures.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut fps) = fps.lock() {
            fps.tick_with(pipeline.timers());
        }
    });

    match failures.into_inner() {
        0 => Ok(()),
        n => bail!("{n} frames failed"),
    }
}
