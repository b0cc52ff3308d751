use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use defringe_core::consts::DEFAULT_BOX_WIDTH;
use defringe_core::pipeline::run_removal_pipeline;
use defringe_core::setup::{RemovalConfig, RemovalTarget};
use tracing::debug;

use crate::progress::BarReporter;
use crate::summary::{print_removal_result, print_removal_summary};

#[derive(Args)]
pub struct RemoveArgs {
    /// Setup file (tab-separated keys, or .toml)
    #[arg(short = 'f', long)]
    pub setup: Option<PathBuf>,

    /// Single image to correct
    #[arg(long, conflicts_with = "folder")]
    pub image: Option<PathBuf>,

    /// Folder of images to correct
    #[arg(long)]
    pub folder: Option<PathBuf>,

    /// Fringe model file
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// ds9 region file with the control pairs
    #[arg(long)]
    pub pairs: Option<PathBuf>,

    /// Width of the averaging box in pixels
    #[arg(long)]
    pub box_width: Option<usize>,
}

pub fn run(args: &RemoveArgs) -> Result<()> {
    let config = build_config(args)?;
    debug!(?config, "Resolved removal configuration");
    print_removal_summary(&config);

    let reporter = BarReporter::new()?;
    let output = run_removal_pipeline(&config, &reporter).context("Fringe removal failed")?;
    reporter.finish();

    print_removal_result(&output);
    Ok(())
}

/// Setup file first, then command-line overrides.
fn build_config(args: &RemoveArgs) -> Result<RemovalConfig> {
    let cli_target = match (&args.image, &args.folder) {
        (_, Some(folder)) => Some(RemovalTarget::Folder(folder.clone())),
        (Some(image), None) => Some(RemovalTarget::Image(image.clone())),
        (None, None) => None,
    };

    let mut config = match args.setup {
        Some(ref path) => RemovalConfig::from_file(path)
            .with_context(|| format!("Invalid setup file {}", path.display()))?,
        None => {
            let (Some(target), Some(model), Some(pairs)) =
                (cli_target.clone(), args.model.clone(), args.pairs.clone())
            else {
                bail!("Without --setup, --image or --folder, --model and --pairs are required");
            };
            RemovalConfig {
                target,
                model_name: model,
                control_pairs: pairs,
                box_width: DEFAULT_BOX_WIDTH,
            }
        }
    };

    if let Some(target) = cli_target {
        config.target = target;
    }
    if let Some(ref model) = args.model {
        config.model_name = model.clone();
    }
    if let Some(ref pairs) = args.pairs {
        config.control_pairs = pairs.clone();
    }
    if let Some(width) = args.box_width {
        config.box_width = width;
    }
    Ok(config)
}
