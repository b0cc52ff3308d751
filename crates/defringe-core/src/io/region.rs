use std::path::Path;

use crate::consts::{MAX_REGION_COORD, REGION_PREAMBLE_LINES};
use crate::error::{FringeError, Result};
use crate::ratio::{ControlPair, ControlPairs, PixelCoord};

/// Read control pairs from a ds9 region file.
pub fn read_region_file(path: &Path) -> Result<ControlPairs> {
    let text = std::fs::read_to_string(path)?;
    parse_region_list(&text, &path.display().to_string())
}

/// Parse ds9 region text.
///
/// After a three-line preamble, each line is `shape(x1,y1,x2,y2) ...` in
/// 1-indexed image coordinates, x being the column. The first point is
/// the bright end of the pair.
pub fn parse_region_list(text: &str, source: &str) -> Result<ControlPairs> {
    let mut pairs = Vec::new();

    for (idx, line) in text.lines().enumerate().skip(REGION_PREAMBLE_LINES) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let invalid = || FringeError::InvalidRegion {
            line: idx + 1,
            content: line.to_string(),
        };

        let shape = line.split_whitespace().next().ok_or_else(invalid)?;
        let args = shape
            .split_once('(')
            .and_then(|(_, rest)| rest.split_once(')'))
            .map(|(args, _)| args)
            .ok_or_else(invalid)?;

        let coords = args
            .split(',')
            .map(|c| parse_coord(c.trim()))
            .collect::<Option<Vec<usize>>>()
            .ok_or_else(invalid)?;
        if coords.len() < 4 {
            return Err(invalid());
        }

        pairs.push(ControlPair {
            bright: PixelCoord::new(coords[1], coords[0]),
            dark: PixelCoord::new(coords[3], coords[2]),
        });
    }

    if pairs.is_empty() {
        return Err(FringeError::MissingInput(format!(
            "no control pairs in {}",
            source
        )));
    }
    Ok(ControlPairs::new(pairs, source))
}

/// 1-indexed float coordinate to a 0-indexed pixel.
///
/// Values past [`MAX_REGION_COORD`] cannot address any image and are rejected.
fn parse_coord(s: &str) -> Option<usize> {
    let v: f64 = s.parse().ok()?;
    if !v.is_finite() || !(1.0..=MAX_REGION_COORD).contains(&v) {
        return None;
    }
    Some(v.trunc() as usize - 1)
}
