use ndarray::Array2;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::io::fits::{FitsHeader, FitsReader};
use crate::orientation::PierSide;

/// A single exposure: pixel data plus its FITS header.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (rows, cols)
    pub data: Array2<f32>,
    /// Header cards, including the provenance log
    pub header: FitsHeader,
    /// File the frame was read from, if any
    pub source: Option<PathBuf>,
}

impl Frame {
    pub fn new(data: Array2<f32>) -> Self {
        Self {
            data,
            header: FitsHeader::default(),
            source: None,
        }
    }

    pub fn with_header(data: Array2<f32>, header: FitsHeader) -> Self {
        Self {
            data,
            header,
            source: None,
        }
    }

    /// Read the primary image and header of a FITS file.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = FitsReader::open(path)?;
        let data = reader.read_pixels()?;
        Ok(Self {
            data,
            header: reader.header,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Human-readable identifier used in logs and errors.
    pub fn name(&self) -> String {
        match &self.source {
            Some(path) => path.display().to_string(),
            None => "<memory>".to_string(),
        }
    }

    pub fn pier_side(&self) -> Result<PierSide> {
        PierSide::from_header(&self.header, &self.name())
    }
}
