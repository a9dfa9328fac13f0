//! 辞書の書き出しと読み込みに関するテスト
//!
//! 書き出した辞書をファイルとリーダーから読み込み、構築直後の辞書と
//! 同じように活用できることと、不正なデータが拒否されることを検証します。

use std::fs::File;

use tempfile::tempdir;

use crate::dictionary::{DATA_START, Dictionary, MODEL_MAGIC};
use crate::errors::InflectionError;

use super::build_dictionary;

fn serialize() -> Vec<u8> {
    let mut buffer = vec![];
    build_dictionary().write(&mut buffer).unwrap();
    buffer
}

fn assert_usable(dict: &Dictionary) {
    assert_eq!(dict.locale(), "en");
    assert_eq!(dict.num_words(), 12);
    assert_eq!(dict.inflect("goose", &["plural"], &[]).unwrap().as_deref(), Some("geese"));
    assert_eq!(dict.inflect("City", &["plural"], &[]).unwrap().as_deref(), Some("Cities"));
}

#[test]
fn test_header() {
    let buffer = serialize();
    assert!(buffer.starts_with(MODEL_MAGIC));
    assert!(buffer[MODEL_MAGIC.len()..DATA_START].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_read() {
    let dict = Dictionary::read(serialize().as_slice()).unwrap();
    assert!(matches!(dict, Dictionary::Archived(_)));
    assert_usable(&dict);
}

#[test]
fn test_from_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("en.dic");
    build_dictionary().write(File::create(&path).unwrap()).unwrap();

    let dict = Dictionary::from_path(&path).unwrap();
    assert_usable(&dict);

    let dict = unsafe { Dictionary::from_path_unchecked(&path).unwrap() };
    assert_usable(&dict);
}

/// アーカイブ版の辞書を書き出しても同じ辞書になります
#[test]
fn test_rewrite_archived() {
    let dict = Dictionary::read(serialize().as_slice()).unwrap();
    let mut buffer = vec![];
    dict.write(&mut buffer).unwrap();
    let dict = Dictionary::read(buffer.as_slice()).unwrap();
    assert_usable(&dict);
}

#[test]
fn test_bad_magic() {
    let mut buffer = serialize();
    buffer[0] = b'X';
    let result = Dictionary::read(buffer.as_slice());
    assert!(matches!(result, Err(InflectionError::InvalidArgument(_))));

    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.dic");
    std::fs::write(&path, &buffer).unwrap();
    let result = Dictionary::from_path(&path);
    assert!(matches!(result, Err(InflectionError::InvalidArgument(_))));
}

#[test]
fn test_truncated() {
    let buffer = serialize();
    assert!(Dictionary::read(&buffer[..MODEL_MAGIC.len() - 1]).is_err());
    assert!(Dictionary::read(&buffer[..DATA_START + 8]).is_err());
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let result = Dictionary::from_path(dir.path().join("missing.dic"));
    assert!(matches!(result, Err(InflectionError::InvalidArgument(_))));
}
