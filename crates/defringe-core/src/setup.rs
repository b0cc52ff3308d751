//! Run configuration for model building and fringe removal.
//!
//! Configs come either from TOML or from the tab-separated setup format:
//! one `key <TAB> ... <TAB> value` per line, `#` starting a comment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::DEFAULT_BOX_WIDTH;
use crate::error::{FringeError, Result};

/// Outcome of reading one setup line against a set of known keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetupLine {
    Recognized { key: String, value: String },
    Ignored,
}

/// Split a setup line. Anything that is not a known key is `Ignored`.
pub fn parse_line(line: &str, known_keys: &[&str]) -> SetupLine {
    let content = line.split('#').next().unwrap_or("").trim();
    let key = content.split('\t').next().unwrap_or("").trim();
    let value = content.split('\t').next_back().unwrap_or("").trim();

    if known_keys.contains(&key) {
        SetupLine::Recognized {
            key: key.to_string(),
            value: value.to_string(),
        }
    } else {
        SetupLine::Ignored
    }
}

type Apply<T> = fn(&mut T, &str) -> std::result::Result<(), ()>;

/// Key name to typed parser table, built per invocation.
struct KeyTable<T> {
    entries: Vec<(&'static str, Apply<T>)>,
}

impl<T> KeyTable<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn with(mut self, key: &'static str, apply: Apply<T>) -> Self {
        self.entries.push((key, apply));
        self
    }

    fn keys(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }

    fn parse(&self, text: &str, target: &mut T) -> Result<()> {
        let keys = self.keys();
        for (idx, line) in text.lines().enumerate() {
            let SetupLine::Recognized { key, value } = parse_line(line, &keys) else {
                continue;
            };
            let apply = self
                .entries
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, f)| *f)
                .ok_or_else(|| FringeError::MissingInput(key.clone()))?;
            apply(target, &value).map_err(|_| FringeError::InvalidSetup {
                line: idx + 1,
                key: key.clone(),
                value: value.clone(),
            })?;
            debug!(key = %key, value = %value, "Setup parameter set");
        }
        Ok(())
    }
}

fn parse_path(value: &str) -> std::result::Result<PathBuf, ()> {
    if value.is_empty() {
        Err(())
    } else {
        Ok(PathBuf::from(value))
    }
}

fn parse_num<N: std::str::FromStr>(value: &str) -> std::result::Result<N, ()> {
    value.parse().map_err(|_| ())
}

/// `fringe_model_YYYY-MM-DD_HH-MM-SS.fits`, stamped in UTC.
pub fn default_model_name() -> PathBuf {
    let now = chrono::Utc::now();
    PathBuf::from(format!("fringe_model_{}.fits", now.format("%Y-%m-%d_%H-%M-%S")))
}

fn default_box_width() -> usize {
    DEFAULT_BOX_WIDTH
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

/// Parameters for building a fringe model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Folder holding the exposures to sample.
    pub image_folder: PathBuf,
    /// Number of samples; absent or zero means one per image.
    #[serde(default)]
    pub sample_count: Option<usize>,
    #[serde(default = "default_model_name")]
    pub model_name: PathBuf,
    /// Pins the shuffle so the model is reproducible.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Default)]
struct ModelDraft {
    image_folder: Option<PathBuf>,
    sample_count: Option<usize>,
    model_name: Option<PathBuf>,
    seed: Option<u64>,
}

impl ModelDraft {
    fn table() -> KeyTable<Self> {
        KeyTable::<Self>::new()
            .with("image folder", |d, v| {
                d.image_folder = Some(parse_path(v)?);
                Ok(())
            })
            .with("number of samples", |d, v| {
                d.sample_count = Some(parse_num(v)?);
                Ok(())
            })
            .with("model name", |d, v| {
                d.model_name = Some(parse_path(v)?);
                Ok(())
            })
            .with("seed", |d, v| {
                d.seed = Some(parse_num(v)?);
                Ok(())
            })
    }
}

impl ModelConfig {
    pub fn parse_setup(text: &str) -> Result<Self> {
        let mut draft = ModelDraft::default();
        ModelDraft::table().parse(text, &mut draft)?;

        let image_folder = draft
            .image_folder
            .ok_or_else(|| FringeError::MissingInput("image folder".into()))?;
        Ok(Self {
            image_folder,
            sample_count: draft.sample_count,
            model_name: draft.model_name.unwrap_or_else(default_model_name),
            seed: draft.seed,
        })
    }

    /// Read a `.toml` config or a setup file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        if is_toml(path) {
            Ok(toml::from_str(&text)?)
        } else {
            Self::parse_setup(&text)
        }
    }
}

/// What a removal run corrects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalTarget {
    Image(PathBuf),
    Folder(PathBuf),
}

/// Parameters for removing fringes with an existing model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemovalConfig {
    pub target: RemovalTarget,
    pub model_name: PathBuf,
    /// ds9 region file with the control pairs.
    pub control_pairs: PathBuf,
    /// Width of the averaging box in pixels.
    #[serde(default = "default_box_width")]
    pub box_width: usize,
}

#[derive(Default)]
struct RemovalDraft {
    image_name: Option<PathBuf>,
    folder_name: Option<PathBuf>,
    model_name: Option<PathBuf>,
    control_pairs: Option<PathBuf>,
    box_width: Option<usize>,
}

impl RemovalDraft {
    fn table() -> KeyTable<Self> {
        KeyTable::<Self>::new()
            .with("image name", |d, v| {
                d.image_name = Some(parse_path(v)?);
                Ok(())
            })
            .with("folder name", |d, v| {
                d.folder_name = Some(parse_path(v)?);
                Ok(())
            })
            .with("model name", |d, v| {
                d.model_name = Some(parse_path(v)?);
                Ok(())
            })
            .with("control pairs", |d, v| {
                d.control_pairs = Some(parse_path(v)?);
                Ok(())
            })
            .with("box width", |d, v| {
                d.box_width = Some(parse_num(v)?);
                Ok(())
            })
    }
}

impl RemovalConfig {
    pub fn parse_setup(text: &str) -> Result<Self> {
        let mut draft = RemovalDraft::default();
        RemovalDraft::table().parse(text, &mut draft)?;

        let target = match (draft.image_name, draft.folder_name) {
            (Some(_), Some(folder)) => {
                info!("Both an image and a folder were given, running on the folder");
                RemovalTarget::Folder(folder)
            }
            (None, Some(folder)) => RemovalTarget::Folder(folder),
            (Some(image), None) => RemovalTarget::Image(image),
            (None, None) => {
                return Err(FringeError::MissingInput("image name or folder name".into()))
            }
        };

        Ok(Self {
            target,
            model_name: draft
                .model_name
                .ok_or_else(|| FringeError::MissingInput("model name".into()))?,
            control_pairs: draft
                .control_pairs
                .ok_or_else(|| FringeError::MissingInput("control pairs".into()))?,
            box_width: draft.box_width.unwrap_or(DEFAULT_BOX_WIDTH),
        })
    }

    /// Read a `.toml` config or a setup file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        if is_toml(path) {
            Ok(toml::from_str(&text)?)
        } else {
            Self::parse_setup(&text)
        }
    }

    /// Half-width of the averaging box.
    pub fn box_radius(&self) -> usize {
        self.box_width / 2
    }
}
