/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Version stamped into fringe model headers.
pub const MODEL_VERSION: &str = "1.2.0";

/// Version stamped into corrected image headers.
pub const REMOVE_VERSION: &str = "1.0.0";

/// Default width (in pixels) of the averaging box around each control-pair end.
pub const DEFAULT_BOX_WIDTH: usize = 11;

/// FITS logical record size in bytes.
pub const FITS_BLOCK_SIZE: usize = 2880;

/// FITS header card size in bytes.
pub const FITS_CARD_SIZE: usize = 80;

/// Header keyword holding the telescope pier side.
pub const PIERSIDE_KEY: &str = "PIERSIDE";

/// Model provenance: generation version.
pub const MODEL_VERSION_KEY: &str = "FRNGVER";

/// Model provenance: source image folder.
pub const MODEL_SOURCE_KEY: &str = "FRNGSRC";

/// Model provenance: number of samples.
pub const MODEL_SAMPLES_KEY: &str = "FRNGNSMP";

/// Model provenance: shuffle seed, only written when pinned.
pub const MODEL_SEED_KEY: &str = "FRNGSEED";

/// Scale ratio applied to the model when correcting an image.
pub const RATIO_KEY: &str = "FRNGRAT";

/// Suffix appended to the stem of a corrected image.
pub const CORRECTED_SUFFIX: &str = "_fringecor";

/// Number of preamble lines at the top of a ds9 region file.
pub const REGION_PREAMBLE_LINES: usize = 3;

/// Largest 1-indexed coordinate accepted from a region file.
pub const MAX_REGION_COORD: f64 = u32::MAX as f64;
