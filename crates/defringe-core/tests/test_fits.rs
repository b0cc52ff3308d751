use byteorder::{BigEndian, WriteBytesExt};
use ndarray::Array2;

use defringe_core::consts::{FITS_BLOCK_SIZE, PIERSIDE_KEY};
use defringe_core::error::FringeError;
use defringe_core::frame::Frame;
use defringe_core::io::fits::{Card, CardValue, FitsHeader, FitsReader};

mod common;

fn card(text: &str) -> Vec<u8> {
    format!("{:<80}", text).into_bytes()
}

/// Hand-assembled header block with the given cards, END and padding.
fn header_block(cards: &[&str]) -> Vec<u8> {
    let mut buf = Vec::new();
    for c in cards {
        buf.extend(card(c));
    }
    buf.extend(card("END"));
    buf.resize(buf.len().div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE, b' ');
    buf
}

fn pad_data(buf: &mut Vec<u8>) {
    buf.resize(buf.len().div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE, 0);
}

#[test]
fn test_write_read_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("img.fits");

    let data = Array2::from_shape_fn((7, 5), |(r, c)| r as f32 * 10.0 - c as f32 * 0.25);
    let mut header = FitsHeader::new();
    header.set(PIERSIDE_KEY, CardValue::Str("WEST".into()));
    header.set("EXPTIME", CardValue::Float(120.5));
    header.set("GAIN", CardValue::Int(139));
    header.set("FLIPPED", CardValue::Bool(false));
    header.set("OBJECT", CardValue::Str("M42 'core'".into()));
    header.push_history("first step");
    common::write_fits_file(&path, &data, &header);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len() % FITS_BLOCK_SIZE, 0);

    let frame = Frame::load(&path).unwrap();
    assert_eq!(frame.data, data);
    assert_eq!(frame.header.get_str(PIERSIDE_KEY), Some("WEST"));
    assert_eq!(frame.header.get_float("EXPTIME"), Some(120.5));
    assert_eq!(frame.header.get_int("GAIN"), Some(139));
    assert_eq!(frame.header.get("FLIPPED"), Some(&CardValue::Bool(false)));
    assert_eq!(frame.header.get_str("OBJECT"), Some("M42 'core'"));
    assert_eq!(frame.header.history().collect::<Vec<_>>(), vec!["first step"]);
}

#[test]
fn test_long_history_is_wrapped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.fits");

    let text = "x".repeat(100);
    let mut header = FitsHeader::new();
    header.push_history(text.clone());
    common::write_fits_file(&path, &Array2::zeros((2, 2)), &header);

    let reader = FitsReader::open(&path).unwrap();
    let joined: String = reader.header.history().collect();
    assert_eq!(joined, text);
    assert_eq!(reader.header.history().count(), 2);
}

#[test]
fn test_long_string_uses_continue_cards() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long_str.fits");

    let long = format!("/data/observatory/{}/o'brien night/{}", "n".repeat(80), "z".repeat(60));
    let mut header = FitsHeader::new();
    header.set("FRNGSRC", CardValue::Str(long.clone()));
    header.set("GAIN", CardValue::Int(7));
    common::write_fits_file(&path, &Array2::zeros((2, 2)), &header);

    let bytes = std::fs::read(&path).unwrap();
    let cards: Vec<&[u8]> = bytes[..FITS_BLOCK_SIZE].chunks(80).collect();
    assert!(cards.iter().any(|c| c.starts_with(b"CONTINUE  '")));

    let reader = FitsReader::open(&path).unwrap();
    assert_eq!(reader.header.get_str("FRNGSRC"), Some(long.as_str()));
    assert_eq!(reader.header.get_int("GAIN"), Some(7));
}

#[test]
fn test_read_continued_string() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cont.fits");

    let mut buf = header_block(&[
        "SIMPLE  =                    T",
        "BITPIX  =                    8",
        "NAXIS   =                    2",
        "NAXIS1  =                    1",
        "NAXIS2  =                    1",
        "OBSNOTE = 'first part, &'",
        "CONTINUE  'second part, &'",
        "CONTINUE  'last part' / note",
        "TAIL    = 'ends with &'",
        "HISTORY stray",
    ]);
    buf.push(9);
    pad_data(&mut buf);
    std::fs::write(&path, buf).unwrap();

    let reader = FitsReader::open(&path).unwrap();
    assert_eq!(
        reader.header.get_str("OBSNOTE"),
        Some("first part, second part, last part")
    );
    // No CONTINUE follows: the ampersand is literal.
    assert_eq!(reader.header.get_str("TAIL"), Some("ends with &"));
    assert_eq!(reader.read_pixels().unwrap()[[0, 0]], 9.0);
}

#[test]
fn test_read_int16_with_bzero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("u16.fits");

    let mut buf = header_block(&[
        "SIMPLE  =                    T",
        "BITPIX  =                   16",
        "NAXIS   =                    2",
        "NAXIS1  =                    3",
        "NAXIS2  =                    2",
        "BSCALE  =                  1.0",
        "BZERO   =              32768.0",
        "PIERSIDE= 'EAST    '           / telescope side",
    ]);
    for v in [0u16, 1, 2, 1000, 40000, 65535] {
        buf.write_i16::<BigEndian>((v as i32 - 32768) as i16).unwrap();
    }
    pad_data(&mut buf);
    std::fs::write(&path, buf).unwrap();

    let reader = FitsReader::open(&path).unwrap();
    assert_eq!(reader.shape(), (2, 3));
    assert_eq!(reader.bitpix(), 16);
    let pixels = reader.read_pixels().unwrap();
    assert_eq!(
        pixels.iter().copied().collect::<Vec<_>>(),
        vec![0.0, 1.0, 2.0, 1000.0, 40000.0, 65535.0]
    );
    match reader.header.cards().iter().find(|c| {
        matches!(c, Card::Value { keyword, .. } if keyword == "PIERSIDE")
    }) {
        Some(Card::Value { value, comment, .. }) => {
            assert_eq!(value, &CardValue::Str("EAST".into()));
            assert_eq!(comment.as_deref(), Some("telescope side"));
        }
        other => panic!("expected PIERSIDE card, got {other:?}"),
    }
}

#[test]
fn test_read_float64() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f64.fits");

    let mut buf = header_block(&[
        "SIMPLE  =                    T",
        "BITPIX  =                  -64",
        "NAXIS   =                    2",
        "NAXIS1  =                    2",
        "NAXIS2  =                    2",
    ]);
    for v in [1.5f64, -2.25, 3.0e3, 0.0] {
        buf.write_f64::<BigEndian>(v).unwrap();
    }
    pad_data(&mut buf);
    std::fs::write(&path, buf).unwrap();

    let pixels = FitsReader::open(&path).unwrap().read_pixels().unwrap();
    assert_eq!(pixels[[0, 1]], -2.25);
    assert_eq!(pixels[[1, 0]], 3000.0);
}

#[test]
fn test_rejects_non_fits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.fits");
    std::fs::write(&path, vec![b'a'; FITS_BLOCK_SIZE]).unwrap();
    let err = FitsReader::open(&path).err().unwrap();
    assert!(matches!(err, FringeError::InvalidFits(_)));
    assert!(err.is_recoverable());
}

#[test]
fn test_rejects_truncated_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.fits");
    let mut buf = header_block(&[
        "SIMPLE  =                    T",
        "BITPIX  =                  -32",
        "NAXIS   =                    2",
        "NAXIS1  =                  100",
        "NAXIS2  =                  100",
    ]);
    buf.extend(vec![0u8; 400]);
    std::fs::write(&path, buf).unwrap();
    assert!(matches!(
        FitsReader::open(&path),
        Err(FringeError::InvalidFits(_))
    ));
}

#[test]
fn test_rejects_overflowing_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.fits");
    let mut buf = header_block(&[
        "SIMPLE  =                    T",
        "BITPIX  =                    8",
        "NAXIS   =                    2",
        "NAXIS1  =           4294967296",
        "NAXIS2  =           4294967296",
    ]);
    buf.extend(vec![0u8; FITS_BLOCK_SIZE]);
    std::fs::write(&path, buf).unwrap();

    let err = Frame::load(&path).unwrap_err();
    assert!(matches!(err, FringeError::InvalidFits(_)), "{err:?}");
    assert!(err.is_recoverable());
}

#[test]
fn test_rejects_cube() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cube.fits");
    let mut buf = header_block(&[
        "SIMPLE  =                    T",
        "BITPIX  =                    8",
        "NAXIS   =                    3",
        "NAXIS1  =                    2",
        "NAXIS2  =                    2",
        "NAXIS3  =                    2",
    ]);
    buf.extend(vec![0u8; 8]);
    pad_data(&mut buf);
    std::fs::write(&path, buf).unwrap();
    assert!(FitsReader::open(&path).is_err());
}

#[test]
fn test_header_set_replaces_in_place() {
    let mut header = FitsHeader::new();
    header.set("A", CardValue::Int(1));
    header.set("b", CardValue::Int(2));
    header.set("a", CardValue::Int(3));
    assert_eq!(header.cards().len(), 2);
    assert_eq!(header.get_int("A"), Some(3));
    assert_eq!(header.get_int("B"), Some(2));

    header.remove("A");
    assert!(header.get("A").is_none());
}
