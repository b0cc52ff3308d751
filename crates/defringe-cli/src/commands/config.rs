use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use defringe_core::consts::DEFAULT_BOX_WIDTH;
use defringe_core::setup::{default_model_name, ModelConfig, RemovalConfig, RemovalTarget};

#[derive(Clone, ValueEnum)]
pub enum ConfigKind {
    Model,
    Remove,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Which configuration to print
    #[arg(long, value_enum, default_value = "model")]
    pub kind: ConfigKind,

    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a default config as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let toml_str = match args.kind {
        ConfigKind::Model => toml::to_string_pretty(&ModelConfig {
            image_folder: PathBuf::from("images"),
            sample_count: None,
            model_name: default_model_name(),
            seed: None,
        })?,
        ConfigKind::Remove => toml::to_string_pretty(&RemovalConfig {
            target: RemovalTarget::Folder(PathBuf::from("images")),
            model_name: PathBuf::from("fringe_model.fits"),
            control_pairs: PathBuf::from("control_pairs.reg"),
            box_width: DEFAULT_BOX_WIDTH,
        })?,
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
