use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use defringe_core::consts::{MODEL_SAMPLES_KEY, MODEL_SOURCE_KEY, MODEL_VERSION_KEY, RATIO_KEY};
use defringe_core::io::fits::FitsReader;
use defringe_core::orientation::PierSide;

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let reader = FitsReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let header = &reader.header;
    let (rows, cols) = reader.shape();

    println!("File:        {}", args.file.display());
    println!("Dimensions:  {}x{}", cols, rows);
    println!("BITPIX:      {}", reader.bitpix());

    match PierSide::from_header(header, &args.file.display().to_string()) {
        Ok(side) => println!("Pier side:   {}", side),
        Err(_) => println!("Pier side:   missing"),
    }

    if let Some(version) = header.get_str(MODEL_VERSION_KEY) {
        println!("Model:       version {}", version);
        if let Some(source) = header.get_str(MODEL_SOURCE_KEY) {
            println!("  Source:    {}", source);
        }
        if let Some(samples) = header.get_int(MODEL_SAMPLES_KEY) {
            println!("  Samples:   {}", samples);
        }
    }
    if let Some(ratio) = header.get_float(RATIO_KEY) {
        println!("Fringe ratio: {:.6}", ratio);
    }

    let history: Vec<&str> = header.history().collect();
    if !history.is_empty() {
        println!("History:");
        for entry in history {
            println!("  {}", entry);
        }
    }

    Ok(())
}
