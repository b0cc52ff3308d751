use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use defringe_core::pipeline::run_model_pipeline;
use defringe_core::setup::{default_model_name, ModelConfig};
use tracing::debug;

use crate::progress::BarReporter;
use crate::summary::{print_model_result, print_model_summary};

#[derive(Args)]
pub struct ModelArgs {
    /// Setup file (tab-separated keys, or .toml)
    #[arg(short = 'f', long)]
    pub setup: Option<PathBuf>,

    /// Folder of exposures to sample
    #[arg(long)]
    pub folder: Option<PathBuf>,

    /// Number of samples (0 = one per image)
    #[arg(long)]
    pub samples: Option<usize>,

    /// Seed for the sample shuffle, for reproducible models
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output model file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &ModelArgs) -> Result<()> {
    let config = build_config(args)?;
    debug!(?config, "Resolved model configuration");
    print_model_summary(&config);

    let reporter = BarReporter::new()?;
    let output = run_model_pipeline(&config, &reporter).context("Model building failed")?;
    reporter.finish();

    print_model_result(&output);
    Ok(())
}

/// Setup file first, then command-line overrides.
fn build_config(args: &ModelArgs) -> Result<ModelConfig> {
    let mut config = match args.setup {
        Some(ref path) => ModelConfig::from_file(path)
            .with_context(|| format!("Invalid setup file {}", path.display()))?,
        None => ModelConfig {
            image_folder: args
                .folder
                .clone()
                .context("An image folder is required: pass --folder or --setup")?,
            sample_count: None,
            model_name: default_model_name(),
            seed: None,
        },
    };

    if let Some(ref folder) = args.folder {
        config.image_folder = folder.clone();
    }
    if args.samples.is_some() {
        config.sample_count = args.samples;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(ref output) = args.output {
        config.model_name = output.clone();
    }
    Ok(config)
}
