//! 活用パターン表
//!
//! すべての活用パターンは1本の[`PackedArray`]に連続して格納されます。
//! オフセット`o`のパターンは次の順に並びます:
//!
//! 1. 接頭ワード: 下位ビットから `num_inflections | lemma_suffixes_len | pos_idx | frequency_idx`
//! 2. `lemma_suffixes_len`個の見出し語接尾辞ID
//! 3. `num_inflections`個の行: 下位ビットから `grammemes_idx | suffix_idx | prefix_idx`
//!
//! 各フィールドのビット幅は辞書ごとに[`FieldWidths`]として保存されます。

use hashbrown::HashMap;
use rkyv::{Archive, Deserialize, Serialize};

use crate::dictionary::packed::PackedArray;
use crate::dictionary::pattern::InflectionPattern;
use crate::dictionary::posting::{Postings, PostingsBuilder};
use crate::dictionary::suffix::SuffixTable;
use crate::errors::{InflectionError, Result};
use crate::grammeme::Grammemes;
use crate::utils::{FromU32, bit_width, extract_bits, low_mask};

/// 辞書ヘッダーで宣言されるビットフィールドの幅
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct FieldWidths {
    pub grammemes_idx: u8,
    pub suffix_idx: u8,
    /// 接頭辞用に予約されています。現在は常に0が格納されます。
    pub prefix_idx: u8,
    pub num_inflections: u8,
    pub lemma_suffixes_len: u8,
    pub pos_idx: u8,
    pub frequency_idx: u8,
}

/// 復号された活用行のフィールド
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RowFields {
    pub grammemes_idx: u64,
    pub suffix_idx: u64,
    pub prefix_idx: u64,
}

/// 復号されたパターン接頭ワードのフィールド
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PrefixFields {
    pub num_inflections: u64,
    pub lemma_suffixes_len: u64,
    pub pos_idx: u64,
    pub frequency_idx: u64,
}

fn unpack<const N: usize>(value: u64, widths: [u8; N]) -> Result<[u64; N]> {
    let mut out = [0; N];
    let mut start = 0u32;
    for (slot, width) in out.iter_mut().zip(widths) {
        let width = u32::from(width);
        *slot = extract_bits(value, start, width)?;
        start += width;
    }
    Ok(out)
}

fn pack<const N: usize>(fields: [(u64, u8); N]) -> Result<u64> {
    let mut value = 0;
    let mut start = 0u32;
    for (field, width) in fields {
        let width = u32::from(width);
        if field & !low_mask(width) != 0 {
            return Err(InflectionError::invalid_argument(
                "fields",
                format!("{field} does not fit in {width} bits"),
            ));
        }
        if start + width > 64 {
            return Err(InflectionError::invalid_argument(
                "fields",
                "bit fields exceed a 64-bit word",
            ));
        }
        if width > 0 {
            value |= field << start;
        }
        start += width;
    }
    Ok(value)
}

impl FieldWidths {
    /// 活用行のビット数
    pub fn row_width(&self) -> u32 {
        [self.grammemes_idx, self.suffix_idx, self.prefix_idx]
            .into_iter()
            .map(u32::from)
            .sum()
    }

    /// 接頭ワードのビット数
    pub fn prefix_width(&self) -> u32 {
        [self.num_inflections, self.lemma_suffixes_len, self.pos_idx, self.frequency_idx]
            .into_iter()
            .map(u32::from)
            .sum()
    }

    /// 配列の1要素に必要なビット数
    pub fn word_width(&self) -> u32 {
        self.row_width()
            .max(self.prefix_width())
            .max(u32::from(self.suffix_idx))
            .max(1)
    }

    /// 行と接頭ワードがそれぞれ64ビットに収まるかを検証します。
    pub fn validate(&self) -> Result<()> {
        if self.row_width() > 64 || self.prefix_width() > 64 {
            return Err(InflectionError::invalid_format(
                "widths",
                format!(
                    "field widths exceed 64 bits: row={}, prefix={}",
                    self.row_width(),
                    self.prefix_width()
                ),
            ));
        }
        Ok(())
    }

    /// 活用行を復号します。
    pub fn decode_row(&self, value: u64) -> Result<RowFields> {
        let [grammemes_idx, suffix_idx, prefix_idx] =
            unpack(value, [self.grammemes_idx, self.suffix_idx, self.prefix_idx])?;
        Ok(RowFields {
            grammemes_idx,
            suffix_idx,
            prefix_idx,
        })
    }

    /// 活用行を符号化します。
    pub fn encode_row(&self, row: &RowFields) -> Result<u64> {
        pack([
            (row.grammemes_idx, self.grammemes_idx),
            (row.suffix_idx, self.suffix_idx),
            (row.prefix_idx, self.prefix_idx),
        ])
    }

    /// パターンの接頭ワードを復号します。
    pub fn decode_prefix(&self, value: u64) -> Result<PrefixFields> {
        let [num_inflections, lemma_suffixes_len, pos_idx, frequency_idx] = unpack(
            value,
            [self.num_inflections, self.lemma_suffixes_len, self.pos_idx, self.frequency_idx],
        )?;
        Ok(PrefixFields {
            num_inflections,
            lemma_suffixes_len,
            pos_idx,
            frequency_idx,
        })
    }

    /// パターンの接頭ワードを符号化します。
    pub fn encode_prefix(&self, prefix: &PrefixFields) -> Result<u64> {
        pack([
            (prefix.num_inflections, self.num_inflections),
            (prefix.lemma_suffixes_len, self.lemma_suffixes_len),
            (prefix.pos_idx, self.pos_idx),
            (prefix.frequency_idx, self.frequency_idx),
        ])
    }
}

impl ArchivedFieldWidths {
    /// ネイティブ形式に変換します。
    pub fn to_native(&self) -> FieldWidths {
        FieldWidths {
            grammemes_idx: self.grammemes_idx,
            suffix_idx: self.suffix_idx,
            prefix_idx: self.prefix_idx,
            num_inflections: self.num_inflections,
            lemma_suffixes_len: self.lemma_suffixes_len,
            pos_idx: self.pos_idx,
            frequency_idx: self.frequency_idx,
        }
    }
}

/// ビルダーに渡される1つの活用パターン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPattern {
    pub identifier: String,
    pub frequency: u32,
    pub parts_of_speech: Grammemes,
    pub lemma_suffixes: Vec<String>,
    /// 格納順の`(接尾辞, 文法素)`。稀な形ほど後ろに置かれます。
    pub rows: Vec<(String, Grammemes)>,
}

/// 活用パターン表
#[derive(Debug, Default, Clone, Archive, Serialize, Deserialize)]
pub struct Inflector {
    widths: FieldWidths,
    grammeme_patterns: Vec<u64>,
    suffixes: SuffixTable,
    inflections: PackedArray,
    frequencies: Vec<u32>,
    identifiers: Vec<String>,
    pattern_offsets: Vec<u32>,
    suffix_patterns: Postings,
    suffix_pattern_offsets: Vec<u32>,
}

impl Inflector {
    /// パターンのリストから表を構築します。
    ///
    /// パターンIDは識別子の昇順に割り当てられます。
    ///
    /// # エラー
    ///
    /// 識別子が重複している場合、または見出し語接尾辞がパターン自身の行に
    /// 含まれていない場合にエラーを返します。
    pub fn from_patterns(mut patterns: Vec<RawPattern>) -> Result<Self> {
        patterns.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        if let Some(w) = patterns.windows(2).find(|w| w[0].identifier == w[1].identifier) {
            return Err(InflectionError::invalid_argument(
                "patterns",
                format!("duplicated identifier: {}", w[0].identifier),
            ));
        }
        for p in &patterns {
            if let Some(s) = p
                .lemma_suffixes
                .iter()
                .find(|s| !p.rows.iter().any(|(suffix, _)| suffix == *s))
            {
                return Err(InflectionError::invalid_argument(
                    "patterns",
                    format!("lemma suffix {s:?} is not among the rows of {}", p.identifier),
                ));
            }
        }

        let mut grammeme_ids: HashMap<u64, u64> = HashMap::new();
        let mut grammeme_patterns = vec![];
        let mut intern = |g: Grammemes| -> u64 {
            *grammeme_ids.entry(g.bits()).or_insert_with(|| {
                grammeme_patterns.push(g.bits());
                (grammeme_patterns.len() - 1) as u64
            })
        };
        let interned: Vec<(u64, Vec<u64>)> = patterns
            .iter()
            .map(|p| {
                let pos = intern(p.parts_of_speech);
                (pos, p.rows.iter().map(|(_, g)| intern(*g)).collect())
            })
            .collect();

        let suffixes = SuffixTable::new(patterns.iter().flat_map(|p| p.rows.iter().map(|(s, _)| s)));

        let mut frequencies: Vec<u32> = patterns.iter().map(|p| p.frequency).collect();
        frequencies.sort_unstable();
        frequencies.dedup();

        let max_of = |f: &dyn Fn(&RawPattern) -> usize| patterns.iter().map(f).max().unwrap_or(0);
        let widths = FieldWidths {
            grammemes_idx: bit_width(grammeme_patterns.len().saturating_sub(1) as u64) as u8,
            suffix_idx: bit_width(suffixes.len().saturating_sub(1) as u64) as u8,
            prefix_idx: 0,
            num_inflections: bit_width(max_of(&|p| p.rows.len()) as u64) as u8,
            lemma_suffixes_len: bit_width(max_of(&|p| p.lemma_suffixes.len()) as u64) as u8,
            pos_idx: bit_width(grammeme_patterns.len().saturating_sub(1) as u64) as u8,
            frequency_idx: bit_width(frequencies.len().saturating_sub(1) as u64) as u8,
        };
        widths.validate()?;

        let suffix_id = |s: &str| -> Result<u64> {
            suffixes
                .find(s)
                .map(|id| id as u64)
                .ok_or_else(|| InflectionError::invalid_state("suffix table is incomplete", s))
        };

        let mut inflections = PackedArray::new(widths.word_width())?;
        let mut pattern_offsets = Vec::with_capacity(patterns.len());
        let mut patterns_by_suffix: Vec<Vec<u32>> = vec![vec![]; suffixes.len()];
        for (id, (p, (pos_idx, row_grammemes))) in patterns.iter().zip(&interned).enumerate() {
            let id = u32::try_from(id)?;
            pattern_offsets.push(u32::try_from(inflections.len())?);
            let frequency_idx = frequencies.binary_search(&p.frequency).unwrap_or_default();
            inflections.push(widths.encode_prefix(&PrefixFields {
                num_inflections: p.rows.len() as u64,
                lemma_suffixes_len: p.lemma_suffixes.len() as u64,
                pos_idx: *pos_idx,
                frequency_idx: frequency_idx as u64,
            })?)?;
            for s in &p.lemma_suffixes {
                inflections.push(suffix_id(s)?)?;
            }
            for ((suffix, _), &grammemes_idx) in p.rows.iter().zip(row_grammemes) {
                let suffix_idx = suffix_id(suffix)?;
                inflections.push(widths.encode_row(&RowFields {
                    grammemes_idx,
                    suffix_idx,
                    prefix_idx: 0,
                })?)?;
                let ids = &mut patterns_by_suffix[suffix_idx as usize];
                if ids.last() != Some(&id) {
                    ids.push(id);
                }
            }
        }

        let mut builder = PostingsBuilder::new();
        let suffix_pattern_offsets = patterns_by_suffix
            .iter()
            .map(|ids| builder.push(ids))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            widths,
            grammeme_patterns,
            suffixes,
            inflections,
            frequencies,
            identifiers: patterns.into_iter().map(|p| p.identifier).collect(),
            pattern_offsets,
            suffix_patterns: builder.build(),
            suffix_pattern_offsets,
        })
    }

    #[inline(always)]
    pub fn widths(&self) -> FieldWidths {
        self.widths
    }

    #[inline(always)]
    pub fn word(&self, idx: usize) -> Result<u64> {
        self.inflections.read(idx)
    }

    #[inline(always)]
    pub fn suffix(&self, id: usize) -> Option<&str> {
        self.suffixes.get(id)
    }

    #[inline(always)]
    pub fn find_suffix(&self, suffix: &str) -> Option<usize> {
        self.suffixes.find(suffix)
    }

    #[inline(always)]
    pub fn num_suffixes(&self) -> usize {
        self.suffixes.len()
    }

    #[inline(always)]
    pub fn grammeme_pattern(&self, idx: usize) -> Option<Grammemes> {
        self.grammeme_patterns.get(idx).map(|&g| Grammemes::new(g))
    }

    #[inline(always)]
    pub fn frequency(&self, idx: usize) -> Option<u32> {
        self.frequencies.get(idx).copied()
    }

    #[inline(always)]
    pub fn identifier(&self, id: usize) -> Option<&str> {
        self.identifiers.get(id).map(String::as_str)
    }

    #[inline(always)]
    pub fn find_identifier(&self, name: &str) -> Option<usize> {
        self.identifiers.binary_search_by(|i| i.as_str().cmp(name)).ok()
    }

    #[inline(always)]
    pub fn num_patterns(&self) -> usize {
        self.pattern_offsets.len()
    }

    #[inline(always)]
    pub fn pattern_offset(&self, id: usize) -> Option<usize> {
        self.pattern_offsets.get(id).map(|&o| usize::from_u32(o))
    }

    pub fn suffix_pattern_ids(&self, suffix_id: usize) -> Vec<u32> {
        self.suffix_pattern_offsets
            .get(suffix_id)
            .map(|&o| self.suffix_patterns.ids(usize::from_u32(o)).collect())
            .unwrap_or_default()
    }
}

impl ArchivedInflector {
    #[inline(always)]
    pub fn widths(&self) -> FieldWidths {
        self.widths.to_native()
    }

    #[inline(always)]
    pub fn word(&self, idx: usize) -> Result<u64> {
        self.inflections.read(idx)
    }

    #[inline(always)]
    pub fn suffix(&self, id: usize) -> Option<&str> {
        self.suffixes.get(id)
    }

    #[inline(always)]
    pub fn find_suffix(&self, suffix: &str) -> Option<usize> {
        self.suffixes.find(suffix)
    }

    #[inline(always)]
    pub fn num_suffixes(&self) -> usize {
        self.suffixes.len()
    }

    #[inline(always)]
    pub fn grammeme_pattern(&self, idx: usize) -> Option<Grammemes> {
        self.grammeme_patterns
            .get(idx)
            .map(|g| Grammemes::new(g.to_native()))
    }

    #[inline(always)]
    pub fn frequency(&self, idx: usize) -> Option<u32> {
        self.frequencies.get(idx).map(|f| f.to_native())
    }

    #[inline(always)]
    pub fn identifier(&self, id: usize) -> Option<&str> {
        self.identifiers.get(id).map(|i| i.as_str())
    }

    #[inline(always)]
    pub fn find_identifier(&self, name: &str) -> Option<usize> {
        self.identifiers.binary_search_by(|i| i.as_str().cmp(name)).ok()
    }

    #[inline(always)]
    pub fn num_patterns(&self) -> usize {
        self.pattern_offsets.len()
    }

    #[inline(always)]
    pub fn pattern_offset(&self, id: usize) -> Option<usize> {
        self.pattern_offsets.get(id).map(|o| usize::from_u32(o.to_native()))
    }

    pub fn suffix_pattern_ids(&self, suffix_id: usize) -> Vec<u32> {
        self.suffix_pattern_offsets
            .get(suffix_id)
            .map(|o| {
                self.suffix_patterns
                    .ids(usize::from_u32(o.to_native()))
                    .map(|id| id.to_native())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// パターン以外の構造(配列長、ソート順、逆引き表)を検証します。
    fn verify_tables(&self) -> bool {
        self.inflections.is_consistent()
            && self.inflections.width() >= self.widths().word_width()
            && self.identifiers.len() == self.pattern_offsets.len()
            && self.identifiers.windows(2).all(|w| w[0].as_str() < w[1].as_str())
            && self.suffix_pattern_offsets.len() == self.suffixes.len()
            && self.suffix_pattern_offsets.iter().all(|o| {
                let o = usize::from_u32(o.to_native());
                self.suffix_patterns.is_valid_offset(o)
                    && self
                        .suffix_patterns
                        .ids(o)
                        .all(|id| usize::from_u32(id.to_native()) < self.pattern_offsets.len())
            })
    }
}

/// 活用パターン表への参照(アーカイブ版または所有版)。
#[derive(Clone, Copy)]
pub enum InflectorRef<'a> {
    Archived(&'a ArchivedInflector),
    Owned(&'a Inflector),
}

impl<'a> InflectorRef<'a> {
    #[inline(always)]
    pub fn widths(&self) -> FieldWidths {
        match self {
            Self::Archived(i) => i.widths(),
            Self::Owned(i) => i.widths(),
        }
    }

    #[inline(always)]
    pub fn word(&self, idx: usize) -> Result<u64> {
        match self {
            Self::Archived(i) => i.word(idx),
            Self::Owned(i) => i.word(idx),
        }
    }

    #[inline(always)]
    pub fn suffix(&self, id: usize) -> Option<&'a str> {
        match *self {
            Self::Archived(i) => i.suffix(id),
            Self::Owned(i) => i.suffix(id),
        }
    }

    #[inline(always)]
    pub fn find_suffix(&self, suffix: &str) -> Option<usize> {
        match self {
            Self::Archived(i) => i.find_suffix(suffix),
            Self::Owned(i) => i.find_suffix(suffix),
        }
    }

    #[inline(always)]
    pub fn num_suffixes(&self) -> usize {
        match self {
            Self::Archived(i) => i.num_suffixes(),
            Self::Owned(i) => i.num_suffixes(),
        }
    }

    #[inline(always)]
    pub fn grammeme_pattern(&self, idx: usize) -> Option<Grammemes> {
        match self {
            Self::Archived(i) => i.grammeme_pattern(idx),
            Self::Owned(i) => i.grammeme_pattern(idx),
        }
    }

    #[inline(always)]
    pub fn frequency(&self, idx: usize) -> Option<u32> {
        match self {
            Self::Archived(i) => i.frequency(idx),
            Self::Owned(i) => i.frequency(idx),
        }
    }

    #[inline(always)]
    pub fn identifier(&self, id: usize) -> Option<&'a str> {
        match *self {
            Self::Archived(i) => i.identifier(id),
            Self::Owned(i) => i.identifier(id),
        }
    }

    #[inline(always)]
    pub fn find_identifier(&self, name: &str) -> Option<usize> {
        match self {
            Self::Archived(i) => i.find_identifier(name),
            Self::Owned(i) => i.find_identifier(name),
        }
    }

    #[inline(always)]
    pub fn num_patterns(&self) -> usize {
        match self {
            Self::Archived(i) => i.num_patterns(),
            Self::Owned(i) => i.num_patterns(),
        }
    }

    #[inline(always)]
    pub fn pattern_offset(&self, id: usize) -> Option<usize> {
        match self {
            Self::Archived(i) => i.pattern_offset(id),
            Self::Owned(i) => i.pattern_offset(id),
        }
    }

    pub fn suffix_pattern_ids(&self, suffix_id: usize) -> Vec<u32> {
        match self {
            Self::Archived(i) => i.suffix_pattern_ids(suffix_id),
            Self::Owned(i) => i.suffix_pattern_ids(suffix_id),
        }
    }

    /// 表全体の整合性を検証します。
    ///
    /// フィールド幅、すべてのパターンの接頭ワード、見出し語接尾辞ID、
    /// 行の文法素インデックスと接尾辞IDが範囲内であることを確認します。
    pub fn verify(&self) -> Result<()> {
        self.widths().validate()?;
        if let Self::Archived(i) = self
            && !i.verify_tables()
        {
            return Err(InflectionError::invalid_format(
                "inflector",
                "inconsistent inflection tables",
            ));
        }
        for id in 0..self.num_patterns() {
            InflectionPattern::new(*self, id)?.verify()?;
        }
        Ok(())
    }
}
