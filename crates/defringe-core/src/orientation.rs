use ndarray::{Array2, Axis};

use crate::consts::PIERSIDE_KEY;
use crate::error::{FringeError, Result};
use crate::frame::Frame;
use crate::io::fits::{CardValue, FitsHeader};

/// Side of the pier the telescope was on during the exposure.
///
/// `East` is the canonical orientation. `West` images are rotated by 180°
/// relative to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PierSide {
    East,
    West,
}

impl PierSide {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            v if v.eq_ignore_ascii_case("EAST") => Some(Self::East),
            v if v.eq_ignore_ascii_case("WEST") => Some(Self::West),
            _ => None,
        }
    }

    /// Read the `PIERSIDE` card. Absent or unrecognized values are an error.
    pub fn from_header(header: &FitsHeader, image: &str) -> Result<Self> {
        let raw = header.get(PIERSIDE_KEY).map(|v| v.to_string());
        raw.as_deref()
            .and_then(Self::parse)
            .ok_or_else(|| FringeError::MissingOrientation {
                image: image.to_string(),
                found: raw,
            })
    }

    pub fn requires_flip(self) -> bool {
        self == Self::West
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::East => "EAST",
            Self::West => "WEST",
        }
    }
}

impl std::fmt::Display for PierSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rotate by 180°: the row-major pixel sequence, reversed.
pub fn flip(mut data: Array2<f32>) -> Array2<f32> {
    data.invert_axis(Axis(0));
    data.invert_axis(Axis(1));
    data.as_standard_layout().into_owned()
}

/// Bring pixels from `side` into canonical orientation.
///
/// This is an involution, so the same call also maps canonical pixels back.
pub fn normalize(data: Array2<f32>, side: PierSide) -> Array2<f32> {
    if side.requires_flip() {
        flip(data)
    } else {
        data
    }
}

/// Inverse of [`normalize`].
pub fn denormalize(data: Array2<f32>, side: PierSide) -> Array2<f32> {
    normalize(data, side)
}

/// Normalize a frame and record the change in its header.
pub fn to_canonical(mut frame: Frame) -> Result<Frame> {
    let side = frame.pier_side()?;
    if side.requires_flip() {
        frame.data = flip(frame.data);
        frame
            .header
            .set(PIERSIDE_KEY, CardValue::Str(PierSide::East.as_str().to_string()));
        frame
            .header
            .push_history("The image was returned to have an 'EAST' pierside");
    }
    Ok(frame)
}
