//! 辞書構築のためのビルダー
//!
//! このモジュールは、CSV形式のソースデータから [`DictionaryInner`] を構築するための
//! ビルダーを提供します。
//!
//! # 入力形式
//!
//! - `grammeme.csv`: 1行に1つの文法素 `category,value`。行の順がビット位置になります。
//! - `inflection.csv`: 1行に1つの活用パターン
//!   `identifier,frequency,品詞(空白区切り),見出し語接尾辞(空白区切り),行,...`。
//!   各行は `suffix:value value` の形式で、格納順に並べます。
//!   見出し語接尾辞の`_`は空の接尾辞を表します。
//! - `lexicon.csv`: 1行に1つの単語 `word,性質(空白区切り),パターン識別子(空白区切り)`。
//!   パターン識別子の列は省略できます。
//!
//! `#`で始まる行と空行は読み飛ばされます。

use std::io::{BufRead, BufReader, Read};

use crate::dictionary::DictionaryInner;
use crate::dictionary::inflector::{Inflector, RawPattern};
use crate::dictionary::lexicon::{Lexicon, RawLexEntry};
use crate::errors::{InflectionError, Result};
use crate::grammeme::{GrammemeTable, GrammemeView, Grammemes};
use crate::utils::parse_csv_row;

/// 見出し語接尾辞の列で空の接尾辞を表す記号
pub const EMPTY_SUFFIX_MARK: &str = "_";

/// CSVソースから [`DictionaryInner`] を構築するビルダー
pub struct DictionaryBuilder {}

/// 空行とコメント行を除いた`(行番号, フィールド)`の列を読み込みます。
fn read_rows<R: Read>(rdr: R, name: &'static str) -> Result<Vec<(usize, Vec<String>)>> {
    let mut rows = vec![];
    for (i, line) in BufReader::new(rdr).lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = parse_csv_row(line)?;
        if fields.iter().all(|f| f.trim().is_empty()) {
            log::warn!("[inflection-rkyv] {name}:{}: skipped a row without values", i + 1);
            continue;
        }
        rows.push((i + 1, fields));
    }
    Ok(rows)
}

fn combine_names(table: &GrammemeTable, names: &str, name: &'static str, line: usize) -> Result<Grammemes> {
    let names: Vec<&str> = names.split_whitespace().collect();
    table.combine(&names).map_err(|e| {
        InflectionError::invalid_argument(name, format!("line {line}: {e}"))
    })
}

impl DictionaryBuilder {
    /// パースされたコンポーネントから `DictionaryInner` を構築します。
    ///
    /// # エラー
    ///
    /// 識別子の重複、パターン自身の行にない見出し語接尾辞、
    /// 存在しないパターンへの参照がある場合にエラーを返します。
    pub fn build<S>(
        locale: S,
        grammemes: GrammemeTable,
        patterns: Vec<RawPattern>,
        entries: Vec<(String, Grammemes, Vec<String>)>,
    ) -> Result<DictionaryInner>
    where
        S: Into<String>,
    {
        let inflector = Inflector::from_patterns(patterns)?;
        let mut lex_entries = Vec::with_capacity(entries.len());
        for (word, properties, identifiers) in entries {
            let pattern_ids = identifiers
                .iter()
                .map(|identifier| -> Result<u32> {
                    let id = inflector.find_identifier(identifier).ok_or_else(|| {
                        InflectionError::invalid_argument(
                            "lexicon",
                            format!("{word}: unknown inflection pattern {identifier}"),
                        )
                    })?;
                    Ok(u32::try_from(id)?)
                })
                .collect::<Result<Vec<_>>>()?;
            lex_entries.push(RawLexEntry {
                word,
                properties,
                pattern_ids,
            });
        }
        let lexicon = Lexicon::from_entries(lex_entries)?;
        DictionaryInner::new(locale.into(), grammemes, lexicon, inflector)
    }

    /// CSV形式のソースから新しい [`DictionaryInner`] を作成します。
    ///
    /// # 引数
    ///
    ///  - `grammeme_rdr`: 文法素定義ファイル `grammeme.csv` のリーダー
    ///  - `inflection_rdr`: 活用パターンファイル `inflection.csv` のリーダー
    ///  - `lexicon_rdr`: 語彙ファイル `lexicon.csv` のリーダー
    ///  - `locale`: ロケール識別子
    ///
    /// # エラー
    ///
    /// 入力フォーマットが不正な場合、未知の文法素名が含まれる場合、
    /// 文法素が64を超える場合に [`InflectionError`] を返します。
    pub fn from_readers<G, I, L>(
        grammeme_rdr: G,
        inflection_rdr: I,
        lexicon_rdr: L,
        locale: &str,
    ) -> Result<DictionaryInner>
    where
        G: Read,
        I: Read,
        L: Read,
    {
        let grammemes = Self::parse_grammemes(grammeme_rdr)?;
        let patterns = Self::parse_patterns(inflection_rdr, &grammemes)?;
        let entries = Self::parse_lexicon(lexicon_rdr, &grammemes)?;
        let dict = Self::build(locale, grammemes, patterns, entries)?;
        log::debug!(
            "[inflection-rkyv] Built dictionary for {locale}: {} words, {} inflection patterns",
            dict.lexicon.len(),
            dict.inflector.num_patterns(),
        );
        Ok(dict)
    }

    fn parse_grammemes<R: Read>(rdr: R) -> Result<GrammemeTable> {
        let mut pairs = vec![];
        for (line, fields) in read_rows(rdr, "grammeme.csv")? {
            let [category, value] = fields.as_slice() else {
                return Err(InflectionError::invalid_format(
                    "grammeme.csv",
                    format!("line {line}: each line must be a pair of a category and a value"),
                ));
            };
            pairs.push((category.trim().to_string(), value.trim().to_string()));
        }
        GrammemeTable::new(pairs)
    }

    fn parse_patterns<R: Read>(rdr: R, grammemes: &GrammemeTable) -> Result<Vec<RawPattern>> {
        const NAME: &str = "inflection.csv";
        let mut patterns = vec![];
        for (line, fields) in read_rows(rdr, NAME)? {
            if fields.len() < 4 {
                return Err(InflectionError::invalid_format(
                    NAME,
                    format!("line {line}: a pattern needs an identifier, a frequency, parts of speech and lemma suffixes"),
                ));
            }
            let identifier = fields[0].trim().to_string();
            if identifier.is_empty() {
                return Err(InflectionError::invalid_format(
                    NAME,
                    format!("line {line}: empty identifier"),
                ));
            }
            let frequency = fields[1].trim().parse::<u32>()?;
            let parts_of_speech = combine_names(grammemes, &fields[2], NAME, line)?;
            let lemma_suffixes = fields[3]
                .split_whitespace()
                .map(|s| if s == EMPTY_SUFFIX_MARK { String::new() } else { s.to_string() })
                .collect();
            let rows = fields[4..]
                .iter()
                .map(|row| -> Result<(String, Grammemes)> {
                    let (suffix, names) = row.rsplit_once(':').ok_or_else(|| {
                        InflectionError::invalid_format(
                            NAME,
                            format!("line {line}: a row must be `suffix:grammemes`: {row}"),
                        )
                    })?;
                    Ok((suffix.to_string(), combine_names(grammemes, names, NAME, line)?))
                })
                .collect::<Result<Vec<_>>>()?;
            patterns.push(RawPattern {
                identifier,
                frequency,
                parts_of_speech,
                lemma_suffixes,
                rows,
            });
        }
        Ok(patterns)
    }

    fn parse_lexicon<R: Read>(
        rdr: R,
        grammemes: &GrammemeTable,
    ) -> Result<Vec<(String, Grammemes, Vec<String>)>> {
        const NAME: &str = "lexicon.csv";
        let mut entries = vec![];
        for (line, fields) in read_rows(rdr, NAME)? {
            let (word, properties, identifiers) = match fields.as_slice() {
                [word, properties] => (word, properties, ""),
                [word, properties, identifiers] => (word, properties, identifiers.as_str()),
                _ => {
                    return Err(InflectionError::invalid_format(
                        NAME,
                        format!("line {line}: expected `word,properties[,patterns]`"),
                    ));
                }
            };
            if word.is_empty() {
                return Err(InflectionError::invalid_format(
                    NAME,
                    format!("line {line}: empty word"),
                ));
            }
            entries.push((
                word.clone(),
                combine_names(grammemes, properties, NAME, line)?,
                identifiers.split_whitespace().map(str::to_string).collect(),
            ));
        }
        Ok(entries)
    }
}
