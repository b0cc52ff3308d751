use std::fs::File;
use std::io::Write;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use memmap2::Mmap;
use ndarray::Array2;

use crate::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};
use crate::error::{FringeError, Result};

/// Keywords that describe the data layout and are regenerated on write.
const STRUCTURAL_KEYWORDS: [&str; 8] = [
    "SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "EXTEND", "BSCALE", "BZERO",
];

/// Width of the free text area of a HISTORY/COMMENT card.
const COMMENTARY_WIDTH: usize = FITS_CARD_SIZE - 8;

/// Longest escaped string that fits between the quotes of one value card.
const STRING_WIDTH: usize = FITS_CARD_SIZE - 12;

/// A typed header value.
#[derive(Clone, Debug, PartialEq)]
pub enum CardValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CardValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    fn render(&self) -> String {
        match self {
            // Fixed format: strings start at column 11, padded to 8 chars inside quotes.
            Self::Str(s) => format!("{:<20}", format!("'{:<8}'", s.replace('\'', "''"))),
            Self::Int(i) => format!("{:>20}", i),
            Self::Float(f) => format!("{:>20}", format!("{:.10E}", f)),
            Self::Bool(b) => format!("{:>20}", if *b { "T" } else { "F" }),
        }
    }
}

impl std::fmt::Display for CardValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{}", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Bool(b) => write!(f, "{}", if *b { "T" } else { "F" }),
        }
    }
}

/// One 80-character header record.
#[derive(Clone, Debug, PartialEq)]
pub enum Card {
    Value {
        keyword: String,
        value: CardValue,
        comment: Option<String>,
    },
    History(String),
    Comment(String),
}

/// Ordered FITS header. Card order is preserved through read and write.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitsHeader {
    cards: Vec<Card>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, keyword: &str) -> Option<&CardValue> {
        self.cards.iter().find_map(|card| match card {
            Card::Value { keyword: k, value, .. } if k.eq_ignore_ascii_case(keyword) => {
                Some(value)
            }
            _ => None,
        })
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(CardValue::as_str)
    }

    pub fn get_int(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(CardValue::as_i64)
    }

    pub fn get_float(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(CardValue::as_f64)
    }

    /// Set a keyword, replacing an existing value in place or appending.
    pub fn set(&mut self, keyword: &str, value: CardValue) {
        let keyword = keyword.to_ascii_uppercase();
        for card in &mut self.cards {
            if let Card::Value { keyword: k, value: v, .. } = card {
                if *k == keyword {
                    *v = value;
                    return;
                }
            }
        }
        self.cards.push(Card::Value {
            keyword,
            value,
            comment: None,
        });
    }

    pub fn remove(&mut self, keyword: &str) {
        self.cards.retain(
            |card| !matches!(card, Card::Value { keyword: k, .. } if k.eq_ignore_ascii_case(keyword)),
        );
    }

    /// Append an entry to the provenance log.
    pub fn push_history(&mut self, text: impl Into<String>) {
        self.cards.push(Card::History(text.into()));
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().filter_map(|card| match card {
            Card::History(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Memory-mapped reader for the primary HDU of a FITS file.
pub struct FitsReader {
    mmap: Mmap,
    pub header: FitsHeader,
    bitpix: i64,
    rows: usize,
    cols: usize,
    data_offset: usize,
}

impl FitsReader {
    /// Open a FITS file and parse its primary header. Pixels are decoded lazily.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < FITS_BLOCK_SIZE {
            return Err(FringeError::InvalidFits(format!(
                "{}: file too small for a FITS header",
                path.display()
            )));
        }
        if !mmap.starts_with(b"SIMPLE  ") {
            return Err(FringeError::InvalidFits(format!(
                "{}: missing SIMPLE keyword",
                path.display()
            )));
        }

        let (header, header_len) = parse_header(&mmap)?;

        let bitpix = require_int(&header, "BITPIX")?;
        let naxis = require_int(&header, "NAXIS")?;
        if naxis != 2 {
            return Err(FringeError::InvalidFits(format!(
                "{}: expected a 2-D image, NAXIS = {}",
                path.display(),
                naxis
            )));
        }
        let cols = require_int(&header, "NAXIS1")?;
        let rows = require_int(&header, "NAXIS2")?;
        if cols <= 0 || rows <= 0 {
            return Err(FringeError::InvalidFits(format!(
                "{}: invalid dimensions {}x{}",
                path.display(),
                cols,
                rows
            )));
        }

        let too_large = || {
            FringeError::InvalidFits(format!(
                "{}: image of {}x{} is too large",
                path.display(),
                cols,
                rows
            ))
        };
        let data_offset = header_len.div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE;
        let reader = Self {
            mmap,
            header,
            bitpix,
            rows: usize::try_from(rows).map_err(|_| too_large())?,
            cols: usize::try_from(cols).map_err(|_| too_large())?,
            data_offset,
        };

        let expected = data_offset
            .checked_add(reader.data_byte_size()?)
            .ok_or_else(too_large)?;
        if reader.mmap.len() < expected {
            return Err(FringeError::InvalidFits(format!(
                "{}: truncated, expected at least {} bytes, got {}",
                path.display(),
                expected,
                reader.mmap.len()
            )));
        }

        Ok(reader)
    }

    /// (rows, cols) of the primary image.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn bitpix(&self) -> i64 {
        self.bitpix
    }

    fn data_byte_size(&self) -> Result<usize> {
        let bytes_per_pixel = match self.bitpix {
            8 => 1,
            16 => 2,
            32 | -32 => 4,
            64 | -64 => 8,
            other => return Err(FringeError::UnsupportedBitpix(other)),
        };
        self.rows
            .checked_mul(self.cols)
            .and_then(|n| n.checked_mul(bytes_per_pixel))
            .ok_or_else(|| {
                FringeError::InvalidFits(format!(
                    "image of {}x{} is too large",
                    self.cols, self.rows
                ))
            })
    }

    /// Decode the pixel data to f32, applying BSCALE/BZERO.
    pub fn read_pixels(&self) -> Result<Array2<f32>> {
        let size = self.data_byte_size()?;
        let raw = &self.mmap[self.data_offset..self.data_offset + size];
        let bscale = self.header.get_float("BSCALE").unwrap_or(1.0);
        let bzero = self.header.get_float("BZERO").unwrap_or(0.0);
        let scale = |v: f64| (v * bscale + bzero) as f32;

        let values: Vec<f32> = match self.bitpix {
            8 => raw.iter().map(|&b| scale(b as f64)).collect(),
            16 => raw
                .chunks_exact(2)
                .map(|c| scale(BigEndian::read_i16(c) as f64))
                .collect(),
            32 => raw
                .chunks_exact(4)
                .map(|c| scale(BigEndian::read_i32(c) as f64))
                .collect(),
            64 => raw
                .chunks_exact(8)
                .map(|c| scale(BigEndian::read_i64(c) as f64))
                .collect(),
            -32 => raw
                .chunks_exact(4)
                .map(|c| scale(BigEndian::read_f32(c) as f64))
                .collect(),
            -64 => raw
                .chunks_exact(8)
                .map(|c| scale(BigEndian::read_f64(c)))
                .collect(),
            other => return Err(FringeError::UnsupportedBitpix(other)),
        };

        Array2::from_shape_vec((self.rows, self.cols), values)
            .map_err(|e| FringeError::InvalidFits(e.to_string()))
    }
}

fn require_int(header: &FitsHeader, keyword: &str) -> Result<i64> {
    header
        .get_int(keyword)
        .ok_or_else(|| FringeError::MissingKeyword(keyword.to_string()))
}

/// Parse cards until END. Returns the header and the byte length consumed.
fn parse_header(buf: &[u8]) -> Result<(FitsHeader, usize)> {
    let mut header = FitsHeader::new();
    // Last string value ended in `&`, so a CONTINUE card may extend it.
    let mut continues = false;

    for (i, record) in buf.chunks_exact(FITS_CARD_SIZE).enumerate() {
        let record: String = record
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { '?' })
            .collect();
        let keyword = record[..8].trim_end();

        match keyword {
            "END" => return Ok((header, (i + 1) * FITS_CARD_SIZE)),
            "" => continue,
            "HISTORY" => header.cards.push(Card::History(record[8..].trim().to_string())),
            "COMMENT" => header.cards.push(Card::Comment(record[8..].trim().to_string())),
            "CONTINUE" if continues => {
                let (more, more_comment) = parse_value(&record[8..]);
                continues = match (header.cards.last_mut(), more) {
                    (
                        Some(Card::Value {
                            value: CardValue::Str(text),
                            comment,
                            ..
                        }),
                        CardValue::Str(more),
                    ) => {
                        text.pop();
                        text.push_str(&more);
                        if more_comment.is_some() {
                            *comment = more_comment;
                        }
                        more.ends_with('&')
                    }
                    _ => false,
                };
            }
            _ if &record[8..10] == "= " => {
                let (value, comment) = parse_value(&record[10..]);
                continues = matches!(&value, CardValue::Str(text) if text.ends_with('&'));
                header.cards.push(Card::Value {
                    keyword: keyword.to_string(),
                    value,
                    comment,
                });
            }
            _ => {}
        }
    }

    Err(FringeError::InvalidFits("header has no END card".into()))
}

fn parse_value(field: &str) -> (CardValue, Option<String>) {
    let field = field.trim_start();

    if let Some(rest) = field.strip_prefix('\'') {
        // Quoted string; '' is an escaped quote.
        let mut text = String::new();
        let mut chars = rest.char_indices().peekable();
        let mut tail = "";
        while let Some((idx, ch)) = chars.next() {
            if ch == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    text.push('\'');
                    chars.next();
                    continue;
                }
                tail = &rest[idx + 1..];
                break;
            }
            text.push(ch);
        }
        let value = CardValue::Str(text.trim_end().to_string());
        return (value, split_comment(tail).1);
    }

    let (value_part, comment) = split_comment(field);
    let value_part = value_part.trim();
    let value = match value_part {
        "T" => CardValue::Bool(true),
        "F" => CardValue::Bool(false),
        _ => {
            if let Ok(i) = value_part.parse::<i64>() {
                CardValue::Int(i)
            } else if let Ok(f) = value_part.replace(['D', 'd'], "E").parse::<f64>() {
                CardValue::Float(f)
            } else {
                CardValue::Str(value_part.to_string())
            }
        }
    };
    (value, comment)
}

fn split_comment(s: &str) -> (&str, Option<String>) {
    match s.find('/') {
        Some(idx) => {
            let comment = s[idx + 1..].trim();
            let comment = (!comment.is_empty()).then(|| comment.to_string());
            (&s[..idx], comment)
        }
        None => (s, None),
    }
}

/// Write a primary HDU holding `data` as 32-bit IEEE floats.
///
/// Layout keywords are regenerated; every other card of `header` is kept in order.
pub fn write_fits<W: Write + ?Sized>(
    w: &mut W,
    data: &Array2<f32>,
    header: &FitsHeader,
) -> Result<()> {
    let (rows, cols) = data.dim();
    let mut records: Vec<String> = vec![
        value_record("SIMPLE", &CardValue::Bool(true), None),
        value_record("BITPIX", &CardValue::Int(-32), None),
        value_record("NAXIS", &CardValue::Int(2), None),
        value_record("NAXIS1", &CardValue::Int(cols as i64), None),
        value_record("NAXIS2", &CardValue::Int(rows as i64), None),
    ];

    for card in &header.cards {
        match card {
            Card::Value {
                keyword,
                value,
                comment,
            } => {
                if STRUCTURAL_KEYWORDS.contains(&keyword.as_str()) {
                    continue;
                }
                value_records(&mut records, keyword, value, comment.as_deref());
            }
            Card::History(text) => commentary_records(&mut records, "HISTORY", text),
            Card::Comment(text) => commentary_records(&mut records, "COMMENT", text),
        }
    }
    records.push("END".to_string());

    for record in &records {
        w.write_all(pad_card(record).as_bytes())?;
    }
    let header_len = records.len() * FITS_CARD_SIZE;
    write_padding(w, header_len, b' ')?;

    for &v in data.iter() {
        w.write_f32::<BigEndian>(v)?;
    }
    write_padding(w, data.len() * 4, 0)?;

    Ok(())
}

fn value_record(keyword: &str, value: &CardValue, comment: Option<&str>) -> String {
    let mut record = format!("{:<8}= {}", keyword, value.render());
    if let Some(comment) = comment {
        record.push_str(" / ");
        record.push_str(comment);
    }
    record
}

fn value_records(
    records: &mut Vec<String>,
    keyword: &str,
    value: &CardValue,
    comment: Option<&str>,
) {
    match value {
        CardValue::Str(text) if escaped_width(text) > STRING_WIDTH => {
            long_string_records(records, keyword, text, comment)
        }
        _ => records.push(value_record(keyword, value, comment)),
    }
}

fn escaped_width(text: &str) -> usize {
    text.chars().map(|c| if c == '\'' { 2 } else { 1 }).sum()
}

/// Split a string over CONTINUE cards. Every card but the last ends its
/// quoted text with `&`.
fn long_string_records(
    records: &mut Vec<String>,
    keyword: &str,
    text: &str,
    comment: Option<&str>,
) {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let w = if ch == '\'' { 2 } else { 1 };
        if width + w > STRING_WIDTH - 1 {
            chunks.push(std::mem::take(&mut current));
            width = 0;
        }
        if ch == '\'' {
            current.push_str("''");
        } else {
            current.push(ch);
        }
        width += w;
    }
    chunks.push(current);

    let last = chunks.len() - 1;
    for (i, chunk) in chunks.iter().enumerate() {
        let mut record = if i == 0 {
            format!("{:<8}= '{}&'", keyword, chunk)
        } else if i < last {
            format!("CONTINUE  '{}&'", chunk)
        } else {
            format!("CONTINUE  '{}'", chunk)
        };
        if let Some(comment) = comment.filter(|_| i == last) {
            if record.len() + 3 + comment.len() <= FITS_CARD_SIZE {
                record.push_str(" / ");
                record.push_str(comment);
            }
        }
        records.push(record);
    }
}

fn commentary_records(records: &mut Vec<String>, keyword: &str, text: &str) {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        records.push(keyword.to_string());
        return;
    }
    for chunk in chars.chunks(COMMENTARY_WIDTH) {
        records.push(format!("{:<8}{}", keyword, chunk.iter().collect::<String>()));
    }
}

fn pad_card(record: &str) -> String {
    let ascii: String = record
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .take(FITS_CARD_SIZE)
        .collect();
    format!("{:<width$}", ascii, width = FITS_CARD_SIZE)
}

fn write_padding<W: Write + ?Sized>(w: &mut W, written: usize, fill: u8) -> Result<()> {
    let padding = (FITS_BLOCK_SIZE - written % FITS_BLOCK_SIZE) % FITS_BLOCK_SIZE;
    w.write_all(&vec![fill; padding])?;
    Ok(())
}
