#![allow(dead_code)]

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use ndarray::Array2;

use defringe_core::consts::PIERSIDE_KEY;
use defringe_core::io::fits::{write_fits, CardValue, FitsHeader};
use defringe_core::orientation::{flip, PierSide};

/// Diagonal stripes with a period of 8 pixels, amplitude 1, centred on 0.
pub fn fringe_pattern(rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let phase = (r + c) as f32 * std::f32::consts::TAU / 8.0;
        phase.sin()
    })
}

/// Header carrying only a pier side.
pub fn header_with_side(side: Option<PierSide>) -> FitsHeader {
    let mut header = FitsHeader::new();
    if let Some(side) = side {
        header.set(PIERSIDE_KEY, CardValue::Str(side.as_str().to_string()));
    }
    header
}

/// Write `data` (given in canonical orientation) as it would come off the
/// telescope on `side`.
pub fn write_exposure(path: &Path, canonical: &Array2<f32>, side: PierSide) {
    let data = if side.requires_flip() {
        flip(canonical.clone())
    } else {
        canonical.clone()
    };
    write_fits_file(path, &data, &header_with_side(Some(side)));
}

pub fn write_fits_file(path: &Path, data: &Array2<f32>, header: &FitsHeader) {
    let mut w = BufWriter::new(File::create(path).unwrap());
    write_fits(&mut w, data, header).unwrap();
}

/// ds9 region text: three preamble lines, then one `line(...)` per pair.
///
/// Pairs are given as 0-indexed `(row, col)` of the bright and dark ends.
pub fn region_text(pairs: &[((usize, usize), (usize, usize))]) -> String {
    let mut text = String::from(
        "# Region file format: DS9 version 4.1\n\
         global color=green dashlist=8 3 width=1\n\
         image\n",
    );
    for ((br, bc), (dr, dc)) in pairs {
        text.push_str(&format!(
            "line({},{},{},{}) # line=0 0\n",
            bc + 1,
            br + 1,
            dc + 1,
            dr + 1
        ));
    }
    text
}

pub fn write_region_file(path: &Path, pairs: &[((usize, usize), (usize, usize))]) {
    std::fs::write(path, region_text(pairs)).unwrap();
}

/// Control pairs straddling crests and troughs of [`fringe_pattern`].
///
/// With `(r + c) % 8 == 2` on a crest and `== 6` in a trough.
pub fn stripe_pairs() -> Vec<((usize, usize), (usize, usize))> {
    vec![
        ((10, 8), (10, 12)),
        ((20, 14), (20, 18)),
        ((30, 20), (30, 24)),
        ((16, 34), (16, 38)),
    ]
}

pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}
