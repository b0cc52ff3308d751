use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FringeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid FITS file: {0}")]
    InvalidFits(String),

    #[error("Unsupported BITPIX: {0}")]
    UnsupportedBitpix(i64),

    #[error("Missing required FITS keyword: {0}")]
    MissingKeyword(String),

    #[error("Missing or unrecognized pier side in {image}: {found:?}")]
    MissingOrientation {
        image: String,
        found: Option<String>,
    },

    #[error("Image {name} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Empty image sequence")]
    EmptySequence,

    #[error("No control pair produced a usable ratio")]
    NoValidControlPairs,

    #[error("Malformed region at line {line}: {content:?}")]
    InvalidRegion { line: usize, content: String },

    #[error("Invalid value {value:?} for setup key '{key}' at line {line}")]
    InvalidSetup {
        line: usize,
        key: String,
        value: String,
    },

    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(#[from] toml::de::Error),

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl FringeError {
    /// Whether a batch may skip the offending image and carry on.
    ///
    /// Shape mismatches, missing inputs and malformed configuration abort
    /// the whole run; everything tied to a single artifact does not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::InvalidFits(_)
                | Self::UnsupportedBitpix(_)
                | Self::MissingKeyword(_)
                | Self::MissingOrientation { .. }
                | Self::NoValidControlPairs
                | Self::Persist { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FringeError>;
