//! 活用パターンと活用選択エンジン
//!
//! [`InflectionPattern`]は1つの見出し語に対応する活用行の集合への軽量なビューです。
//! 行は必要になった時点で復号され、オブジェクトとして永続化されることはありません。
//!
//! 主な操作:
//!
//! - [`InflectionPattern::inflections_for_surface_form`]: 表層形に一致する行を最長接尾辞優先で検索
//! - [`InflectionPattern::select_lemma_inflection`]: 見出し語形を表す行を選択
//! - [`InflectionPattern::reinflect`]: 表層形をある文法状態から別の文法状態へ変化

use std::fmt;

use crate::dictionary::inflector::InflectorRef;
use crate::errors::{InflectionError, Result};
use crate::grammeme::{GrammemeView, Grammemes};

/// 1つの見出し語の活用パターン
///
/// 辞書への参照とオフセットだけを保持する`Copy`な値です。
#[derive(Clone, Copy)]
pub struct InflectionPattern<'a> {
    inflector: InflectorRef<'a>,
    grammemes: Option<&'a dyn GrammemeView>,
    id: usize,
    frequency: u32,
    parts_of_speech: Grammemes,
    lemma_suffixes_offset: usize,
    lemma_suffixes_len: usize,
    inflections_start: usize,
    num_inflections: usize,
}

/// 復号された活用行
#[derive(Clone, Copy)]
pub struct Inflection<'a> {
    pattern: InflectionPattern<'a>,
    suffix_id: usize,
    suffix: &'a str,
    grammemes: Grammemes,
}

// Lexicographic: optional/lemma attribute score, preserved grammemes, penalty.
type RowScore = (u64, u32, i64);

pub(crate) fn priority_score(row: Grammemes, attributes: &[Grammemes]) -> u64 {
    attributes
        .iter()
        .fold(0, |score, &attr| (score << 1) | u64::from(row.intersects(attr)))
}

impl<'a> InflectionPattern<'a> {
    /// パターン`id`を開きます。復号するのは接頭ワードだけです。
    ///
    /// 行と見出し語接尾辞の検証は[`verify`](Self::verify)で辞書の読み込み時に行われます。
    ///
    /// # エラー
    ///
    /// `id`が範囲外の場合は[`InflectionError::IndexOutOfBounds`]、
    /// 接頭ワードが壊れている場合は[`InflectionError::InvalidFormat`]を返します。
    pub(crate) fn new(inflector: InflectorRef<'a>, id: usize) -> Result<Self> {
        let offset = inflector.pattern_offset(id).ok_or_else(|| {
            InflectionError::index_out_of_bounds("inflection patterns", id, inflector.num_patterns())
        })?;
        let corrupted = |what: &str| {
            InflectionError::invalid_format("inflector", format!("pattern {id}: invalid {what}"))
        };
        let word = inflector.word(offset).map_err(|_| corrupted("pattern offset"))?;
        let prefix = inflector.widths().decode_prefix(word)?;

        let parts_of_speech = inflector
            .grammeme_pattern(prefix.pos_idx as usize)
            .ok_or_else(|| corrupted("part-of-speech index"))?;
        let frequency = inflector
            .frequency(prefix.frequency_idx as usize)
            .ok_or_else(|| corrupted("frequency index"))?;

        let lemma_suffixes_offset = offset + 1;
        let lemma_suffixes_len = prefix.lemma_suffixes_len as usize;
        let inflections_start = lemma_suffixes_offset + lemma_suffixes_len;
        let num_inflections = prefix.num_inflections as usize;

        Ok(Self {
            inflector,
            grammemes: None,
            id,
            frequency,
            parts_of_speech,
            lemma_suffixes_offset,
            lemma_suffixes_len,
            inflections_start,
            num_inflections,
        })
    }

    /// 見出し語接尾辞IDとすべての行の接尾辞ID、文法素インデックスが範囲内であることを検証します。
    ///
    /// # エラー
    ///
    /// 範囲外の値がある場合は[`InflectionError::InvalidFormat`]を返します。
    pub(crate) fn verify(&self) -> Result<()> {
        let corrupted = |what: &str| {
            InflectionError::invalid_format("inflector", format!("pattern {}: invalid {what}", self.id))
        };
        for i in 0..self.lemma_suffixes_len {
            let suffix_id = self
                .inflector
                .word(self.lemma_suffixes_offset + i)
                .map_err(|_| corrupted("lemma suffix offset"))?;
            if suffix_id as usize >= self.inflector.num_suffixes() {
                return Err(corrupted("lemma suffix id"));
            }
        }
        for i in 0..self.num_inflections {
            self.inflection_at(i).map_err(|_| corrupted("inflection row"))?;
        }
        Ok(())
    }

    /// 文法素の命名表を関連付けます。
    ///
    /// 名前による操作([`constrain`](Self::constrain)など)とトレースログで使用されます。
    pub(crate) fn with_grammemes(mut self, grammemes: &'a dyn GrammemeView) -> Self {
        self.grammemes = Some(grammemes);
        self
    }

    fn grammeme_table(&self) -> Result<&'a dyn GrammemeView> {
        self.grammemes.ok_or_else(|| {
            InflectionError::invalid_state("pattern has no grammeme table", "opened without a dictionary")
        })
    }

    /// パターンID
    #[inline(always)]
    pub fn id(&self) -> usize {
        self.id
    }

    /// パターンの識別子
    pub fn identifier(&self) -> &'a str {
        self.inflector.identifier(self.id).unwrap_or_default()
    }

    /// 出現頻度
    #[inline(always)]
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// 活用行の数
    #[inline(always)]
    pub fn num_inflections(&self) -> usize {
        self.num_inflections
    }

    /// 品詞のビットマスク
    #[inline(always)]
    pub fn parts_of_speech(&self) -> Grammemes {
        self.parts_of_speech
    }

    /// 指定された品詞をすべて含むかどうかを返します。
    ///
    /// # エラー
    ///
    /// 品詞名が未知の場合にエラーを返します。
    pub fn contains_parts_of_speech(&self, pos: &str) -> Result<bool> {
        let mask = self.grammeme_table()?.combine(&[pos])?;
        Ok(self.parts_of_speech.contains_all(mask))
    }

    /// リストのうち、このパターンが含む最初の品詞を返します。
    pub fn first_containing_part_of_speech<'s>(&self, list: &[&'s str]) -> Result<Option<&'s str>> {
        for &pos in list {
            if self.contains_parts_of_speech(pos)? {
                return Ok(Some(pos));
            }
        }
        Ok(None)
    }

    /// `idx`番目の活用行を復号します。
    ///
    /// # エラー
    ///
    /// `idx >= num_inflections()`の場合は[`InflectionError::IndexOutOfBounds`]を返します。
    pub fn inflection_at(&self, idx: usize) -> Result<Inflection<'a>> {
        if idx >= self.num_inflections {
            return Err(InflectionError::index_out_of_bounds(
                "inflections",
                idx,
                self.num_inflections,
            ));
        }
        let row = self
            .inflector
            .widths()
            .decode_row(self.inflector.word(self.inflections_start + idx)?)?;
        let suffix_id = row.suffix_idx as usize;
        let suffix = self.inflector.suffix(suffix_id).ok_or_else(|| {
            InflectionError::invalid_format("inflector", format!("unknown suffix id {suffix_id}"))
        })?;
        let grammemes = self
            .inflector
            .grammeme_pattern(row.grammemes_idx as usize)
            .ok_or_else(|| {
                InflectionError::invalid_format(
                    "inflector",
                    format!("unknown grammeme pattern {}", row.grammemes_idx),
                )
            })?;
        Ok(Inflection {
            pattern: *self,
            suffix_id,
            suffix,
            grammemes,
        })
    }

    /// 格納順にすべての活用行を返すイテレータを取得します。
    pub fn inflections(self) -> impl Iterator<Item = Inflection<'a>> {
        // Rows are verified when the dictionary is loaded.
        (0..self.num_inflections).filter_map(move |i| match self.inflection_at(i) {
            Ok(row) => Some(row),
            Err(e) => {
                log::warn!("[inflection-rkyv] pattern {}: skipped row {i}: {e}", self.id);
                None
            }
        })
    }

    /// 見出し語接尾辞を格納順に返すイテレータを取得します。
    pub fn lemma_suffixes(self) -> impl Iterator<Item = &'a str> {
        let inflector = self.inflector;
        let offset = self.lemma_suffixes_offset;
        (0..self.lemma_suffixes_len).filter_map(move |i| {
            let id = inflector.word(offset + i).ok()?;
            inflector.suffix(id as usize)
        })
    }

    /// いずれかの行の接尾辞が`suffix`と等しいかどうかを返します。
    pub fn contains_suffix(&self, suffix: &str) -> bool {
        self.inflections().any(|row| row.suffix == suffix)
    }

    /// 名前で指定された制約に適合する行を返します。
    ///
    /// `is_superset`が偽の場合は文法素が制約の部分集合である行を、
    /// 真の場合は文法素が制約の上位集合である行を返します。
    ///
    /// # エラー
    ///
    /// 未知の文法素名が含まれている場合にエラーを返します。
    pub fn constrain(&self, constraints: &[&str], is_superset: bool) -> Result<Vec<Inflection<'a>>> {
        let mask = self.grammeme_table()?.combine(constraints)?;
        Ok(self.constrain_grammemes(mask, is_superset))
    }

    /// ビットマスクで指定された制約に適合する行を返します。
    pub fn constrain_grammemes(&self, mask: Grammemes, is_superset: bool) -> Vec<Inflection<'a>> {
        self.inflections()
            .filter(|row| {
                if is_superset {
                    row.grammemes.contains_all(mask)
                } else {
                    mask.contains_all(row.grammemes)
                }
            })
            .collect()
    }

    /// 接尾辞が見出し語接尾辞のいずれかである行を返します。
    pub fn lemma_suffix_matches(&self) -> Vec<Inflection<'a>> {
        let ids: Vec<usize> = (0..self.lemma_suffixes_len)
            .filter_map(|i| self.inflector.word(self.lemma_suffixes_offset + i).ok())
            .map(|id| id as usize)
            .collect();
        self.inflections()
            .filter(|row| ids.contains(&row.suffix_id))
            .collect()
    }

    /// 表層形の末尾に一致する行を返します。
    ///
    /// `from`が空でない場合、文法素が`from`の部分集合でない行は除外されます。
    /// 残りの行のうち、表層形が末尾に持つ接尾辞で最も長いものの行だけが返されます。
    /// 短い接尾辞は長い接尾辞の一部であることが多く、誤って一致するためです。
    pub fn inflections_for_surface_form(&self, surface: &str, from: Grammemes) -> Vec<Inflection<'a>> {
        let mut results = vec![];
        let mut max_len: Option<usize> = None;
        for row in self.inflections() {
            if !from.is_empty() && !from.contains_all(row.grammemes) {
                continue;
            }
            let len = row.suffix.len();
            if max_len.is_some_and(|m| len < m) || !surface.ends_with(row.suffix) {
                continue;
            }
            if max_len.is_none_or(|m| len > m) {
                results.clear();
                max_len = Some(len);
            }
            results.push(row);
        }
        results
    }

    /// 現在`from`の文法素を持つ単語について、見出し語形を最もよく表す行を選択します。
    ///
    /// 各行を次の組で辞書式に比較し、最大のものを選びます。
    ///
    /// 1. `lemma_attributes`を優先順に畳み込んだスコア(先頭ほど支配的)
    /// 2. `from`と共通する文法素の数
    /// 3. 行の文法素の数の符号反転(有標性の低い形を優先)
    ///
    /// 同点の行は[`matching_lemma_inflection`](Self::matching_lemma_inflection)で選ばれます。
    /// 行がない場合は`None`を返します。
    pub fn select_lemma_inflection(
        &self,
        from: Grammemes,
        lemma_attributes: &[Grammemes],
    ) -> Option<Inflection<'a>> {
        let mut selected = vec![];
        let mut best: Option<RowScore> = None;
        for row in self.inflections() {
            let score = (
                priority_score(row.grammemes, lemma_attributes),
                (row.grammemes & from).count(),
                -i64::from(row.grammemes.count()),
            );
            if best.is_some_and(|b| score < b) {
                continue;
            }
            if best.is_none_or(|b| score > b) {
                best = Some(score);
                selected.clear();
            }
            selected.push(row);
        }
        self.matching_lemma_inflection(&selected)
    }

    /// 同点の候補から1つを選びます。
    ///
    /// 候補が1つならそれを返します。そうでなければ格納順に走査し、
    /// 接尾辞が見出し語接尾辞のいずれかと等しい最初の候補を返します。
    /// 一致しない場合は接尾辞が最も短い最初の候補を返します。
    /// 返り値は常に入力の要素です。
    pub fn matching_lemma_inflection(&self, candidates: &[Inflection<'a>]) -> Option<Inflection<'a>> {
        if let [only] = candidates {
            return Some(*only);
        }
        let lemma_suffixes: Vec<&str> = self.lemma_suffixes().collect();
        let mut shortest: Option<(usize, &Inflection<'a>)> = None;
        for candidate in candidates {
            if lemma_suffixes.contains(&candidate.suffix) {
                return Some(*candidate);
            }
            let len = candidate.suffix.chars().count();
            if shortest.is_none_or(|(l, _)| len < l) {
                shortest = Some((len, candidate));
            }
        }
        shortest.map(|(_, c)| *c)
    }

    /// 表層形を`from`の状態から`to`の状態へ変化させます。
    ///
    /// [`reinflect_with_optional_constraints`](Self::reinflect_with_optional_constraints)を
    /// 任意制約なしで呼び出すのと同じです。
    pub fn reinflect(&self, from: Grammemes, to: Grammemes, surface: &str) -> String {
        self.reinflect_with_optional_constraints(from, to, &[], surface)
    }

    /// 表層形を`from`の状態から`to`の状態へ変化させます。
    ///
    /// `to`が空、または`from`が`to`をすべて含む場合は表層形をそのまま返します。
    ///
    /// それ以外の場合、すべての行を一度だけ走査し、次の2つを同時に求めます。
    ///
    /// - `from`と両立する行の接尾辞のうち、表層形が末尾に持つ最長のもの(取り除く部分)
    /// - 文法素が`to`の上位集合である行のうち、
    ///   `(任意制約スコア, fromとの一致数, -(余分な文法素の数))`が最大の行(同点は先勝ち)
    ///
    /// 該当する行がない場合は空文字列を返します。これは活用できない語を意味し、エラーではありません。
    pub fn reinflect_with_optional_constraints(
        &self,
        from: Grammemes,
        to: Grammemes,
        optional: &[Grammemes],
        surface: &str,
    ) -> String {
        if to.is_empty() || from.contains_all(to) {
            return surface.to_string();
        }

        let mut strip_len = 0;
        let mut best: Option<(RowScore, &'a str)> = None;
        for row in self.inflections() {
            if (from.is_empty() || from.contains_all(row.grammemes))
                && row.suffix.len() > strip_len
                && surface.ends_with(row.suffix)
            {
                strip_len = row.suffix.len();
            }
            if !row.grammemes.contains_all(to) {
                continue;
            }
            let matches = (row.grammemes & from).count();
            let optional_score = priority_score(row.grammemes, optional);
            let unmatched = i64::from(row.grammemes.count()) - i64::from(to.count());
            let score = (optional_score, matches, -unmatched);
            log::trace!(
                "[inflection-rkyv] reinflect candidate suffix: {:?}, grammemes: {:?}, matches: {}, optional score: {}",
                row.suffix,
                self.grammemes
                    .map(|g| g.names_of(row.grammemes).join(", "))
                    .unwrap_or_else(|| format!("{:?}", row.grammemes)),
                matches,
                optional_score,
            );
            if best.is_none_or(|(b, _)| score > b) {
                best = Some((score, row.suffix));
            }
        }

        match best {
            Some((_, suffix)) => {
                let stem = &surface[..surface.len() - strip_len];
                format!("{stem}{suffix}")
            }
            None => String::new(),
        }
    }
}

impl fmt::Debug for InflectionPattern<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InflectionPattern")
            .field("id", &self.id)
            .field("identifier", &self.identifier())
            .field("num_inflections", &self.num_inflections)
            .finish()
    }
}

impl<'a> Inflection<'a> {
    /// 接尾辞文字列
    #[inline(always)]
    pub fn suffix(&self) -> &'a str {
        self.suffix
    }

    /// 文法素のビットマスク
    #[inline(always)]
    pub fn grammemes(&self) -> Grammemes {
        self.grammemes
    }

    /// 共有接尾辞テーブル内のID
    #[inline(always)]
    pub fn suffix_id(&self) -> usize {
        self.suffix_id
    }

    /// この行が属するパターン
    #[inline(always)]
    pub fn pattern(&self) -> InflectionPattern<'a> {
        self.pattern
    }
}

impl PartialEq for Inflection<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.pattern.id == other.pattern.id
            && self.suffix_id == other.suffix_id
            && self.grammemes == other.grammemes
    }
}

impl Eq for Inflection<'_> {}

impl fmt::Debug for Inflection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inflection")
            .field("pattern", &self.pattern.id)
            .field("suffix", &self.suffix)
            .field("grammemes", &self.grammemes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::inflector::{Inflector, RawPattern};
    use crate::grammeme::GrammemeTable;

    const SINGULAR: Grammemes = Grammemes::new(1 << 0);
    const PLURAL: Grammemes = Grammemes::new(1 << 1);
    const NOMINATIVE: Grammemes = Grammemes::new(1 << 2);
    const GENITIVE: Grammemes = Grammemes::new(1 << 3);
    const MASCULINE: Grammemes = Grammemes::new(1 << 4);
    const FEMININE: Grammemes = Grammemes::new(1 << 5);
    const NOUN: Grammemes = Grammemes::new(1 << 6);

    fn grammemes() -> GrammemeTable {
        GrammemeTable::new([
            ("number", "singular"),
            ("number", "plural"),
            ("case", "nominative"),
            ("case", "genitive"),
            ("gender", "masculine"),
            ("gender", "feminine"),
            ("partOfSpeech", "noun"),
        ])
        .unwrap()
    }

    fn inflector(lemma: &[&str], rows: &[(&str, Grammemes)]) -> Inflector {
        Inflector::from_patterns(vec![RawPattern {
            identifier: "p".to_string(),
            frequency: 3,
            parts_of_speech: NOUN,
            lemma_suffixes: lemma.iter().map(|s| s.to_string()).collect(),
            rows: rows.iter().map(|&(s, g)| (s.to_string(), g)).collect(),
        }])
        .unwrap()
    }

    fn open<'a>(inflector: &'a Inflector, table: &'a GrammemeTable) -> InflectionPattern<'a> {
        InflectionPattern::new(InflectorRef::Owned(inflector), 0)
            .unwrap()
            .with_grammemes(table)
    }

    #[test]
    fn test_metadata() {
        let inf = inflector(&["goose"], &[("goose", SINGULAR), ("geese", PLURAL)]);
        let table = grammemes();
        let p = open(&inf, &table);
        assert_eq!(p.identifier(), "p");
        assert_eq!(p.frequency(), 3);
        assert_eq!(p.num_inflections(), 2);
        assert_eq!(p.parts_of_speech(), NOUN);
        assert!(p.contains_parts_of_speech("noun").unwrap());
        assert!(!p.contains_parts_of_speech("plural").unwrap());
        assert!(p.contains_parts_of_speech("verb").is_err());
        assert_eq!(
            p.first_containing_part_of_speech(&["plural", "noun"]).unwrap(),
            Some("noun")
        );
        assert_eq!(p.lemma_suffixes().collect::<Vec<_>>(), vec!["goose"]);
    }

    #[test]
    fn test_inflection_at_out_of_bounds() {
        let inf = inflector(&[], &[("", SINGULAR), ("s", PLURAL)]);
        let table = grammemes();
        let p = open(&inf, &table);
        assert_eq!(p.inflection_at(1).unwrap().suffix(), "s");
        assert!(matches!(
            p.inflection_at(2),
            Err(InflectionError::IndexOutOfBounds { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn test_contains_suffix() {
        let inf = inflector(&[], &[("", SINGULAR), ("es", PLURAL)]);
        let table = grammemes();
        let p = open(&inf, &table);
        assert!(p.contains_suffix("es"));
        assert!(p.contains_suffix(""));
        assert!(!p.contains_suffix("s"));
    }

    #[test]
    fn test_constrain() {
        let inf = inflector(
            &[],
            &[
                ("", SINGULAR | NOMINATIVE),
                ("'s", SINGULAR | GENITIVE),
                ("s", PLURAL | NOMINATIVE),
                ("s'", PLURAL | GENITIVE),
            ],
        );
        let table = grammemes();
        let p = open(&inf, &table);

        let supersets = p.constrain(&["plural"], true).unwrap();
        let suffixes: Vec<_> = supersets.iter().map(|i| i.suffix()).collect();
        assert_eq!(suffixes, vec!["s", "s'"]);

        let subsets = p.constrain(&["singular", "genitive", "nominative"], false).unwrap();
        let suffixes: Vec<_> = subsets.iter().map(|i| i.suffix()).collect();
        assert_eq!(suffixes, vec!["", "'s"]);

        assert!(p.constrain(&["dual"], true).is_err());
    }

    #[test]
    fn test_lemma_suffix_matches() {
        let inf = inflector(&["a", "en"], &[("a", SINGULAR), ("an", PLURAL), ("en", PLURAL | GENITIVE)]);
        let table = grammemes();
        let p = open(&inf, &table);
        let suffixes: Vec<_> = p.lemma_suffix_matches().iter().map(|i| i.suffix()).collect();
        assert_eq!(suffixes, vec!["a", "en"]);
    }

    #[test]
    fn test_longest_suffix_wins() {
        let inf = inflector(
            &[],
            &[
                ("s", PLURAL | NOMINATIVE),
                ("es", PLURAL | NOMINATIVE),
                ("", SINGULAR | NOMINATIVE),
            ],
        );
        let table = grammemes();
        let p = open(&inf, &table);
        let rows = p.inflections_for_surface_form("boxes", Grammemes::EMPTY);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].suffix(), "es");
    }

    #[test]
    fn test_surface_form_filtered_by_from() {
        let inf = inflector(&[], &[("", SINGULAR), ("s", PLURAL)]);
        let table = grammemes();
        let p = open(&inf, &table);
        // "s" is longer but incompatible with SINGULAR.
        let rows = p.inflections_for_surface_form("bus", SINGULAR);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].suffix(), "");
        let rows = p.inflections_for_surface_form("bus", Grammemes::EMPTY);
        assert_eq!(rows[0].suffix(), "s");
    }

    #[test]
    fn test_surface_form_keeps_ties() {
        let inf = inflector(&[], &[("s", PLURAL | NOMINATIVE), ("s", PLURAL | GENITIVE)]);
        let table = grammemes();
        let p = open(&inf, &table);
        assert_eq!(p.inflections_for_surface_form("cats", Grammemes::EMPTY).len(), 2);
        assert!(p.inflections_for_surface_form("cat", Grammemes::EMPTY).is_empty());
    }

    #[test]
    fn test_select_lemma_inflection() {
        let inf = inflector(
            &[""],
            &[
                ("", SINGULAR | NOMINATIVE),
                ("'s", SINGULAR | GENITIVE),
                ("s", PLURAL | NOMINATIVE),
                ("s'", PLURAL | GENITIVE),
            ],
        );
        let table = grammemes();
        let p = open(&inf, &table);
        let lemma = p
            .select_lemma_inflection(PLURAL | GENITIVE, &[SINGULAR, NOMINATIVE])
            .unwrap();
        assert_eq!(lemma.suffix(), "");

        // The first attribute dominates the second one.
        let lemma = p.select_lemma_inflection(Grammemes::EMPTY, &[GENITIVE, PLURAL]).unwrap();
        assert_eq!(lemma.suffix(), "s'");
    }

    #[test]
    fn test_select_lemma_prefers_preserved_grammemes() {
        let inf = inflector(
            &["o"],
            &[("o", SINGULAR | MASCULINE), ("a", SINGULAR | FEMININE), ("os", PLURAL | MASCULINE)],
        );
        let table = grammemes();
        let p = open(&inf, &table);
        let lemma = p.select_lemma_inflection(PLURAL | FEMININE, &[SINGULAR]).unwrap();
        assert_eq!(lemma.suffix(), "a");
    }

    #[test]
    fn test_select_lemma_empty_pattern() {
        let inf = inflector(&[], &[]);
        let table = grammemes();
        let p = open(&inf, &table);
        assert!(p.select_lemma_inflection(SINGULAR, &[SINGULAR]).is_none());
    }

    #[test]
    fn test_matching_lemma_inflection() {
        let inf = inflector(&["um"], &[("i", PLURAL), ("", SINGULAR), ("um", SINGULAR), ("a", PLURAL)]);
        let table = grammemes();
        let p = open(&inf, &table);
        let rows: Vec<_> = p.inflections().collect();

        // Lemma suffix match wins over a shorter suffix.
        let chosen = p.matching_lemma_inflection(&rows[1..3]).unwrap();
        assert_eq!(chosen.suffix(), "um");

        // Otherwise the first shortest suffix.
        let candidates = [rows[3], rows[0]];
        let chosen = p.matching_lemma_inflection(&candidates).unwrap();
        assert_eq!(chosen.suffix(), "a");

        // A single candidate is returned as is.
        assert_eq!(p.matching_lemma_inflection(&rows[0..1]), Some(rows[0]));
        assert_eq!(p.matching_lemma_inflection(&[]), None);
    }

    #[test]
    fn test_matching_lemma_inflection_stays_in_input() {
        let inf = inflector(&["x"], &[("x", SINGULAR), ("yy", PLURAL), ("zz", PLURAL), ("w", GENITIVE)]);
        let table = grammemes();
        let p = open(&inf, &table);
        let rows: Vec<_> = p.inflections().collect();
        for start in 0..rows.len() {
            for end in start + 1..=rows.len() {
                let input = &rows[start..end];
                let chosen = p.matching_lemma_inflection(input).unwrap();
                assert!(input.contains(&chosen));
            }
        }
    }

    #[test]
    fn test_reinflect_goose() {
        let inf = inflector(&["goose"], &[("goose", SINGULAR), ("geese", PLURAL)]);
        let table = grammemes();
        let p = open(&inf, &table);
        assert_eq!(p.reinflect(SINGULAR, PLURAL, "goose"), "geese");
        assert_eq!(p.reinflect(PLURAL, SINGULAR, "geese"), "goose");
        assert_eq!(p.reinflect(PLURAL, PLURAL, "geese"), "geese");
        assert_eq!(p.reinflect(SINGULAR, Grammemes::EMPTY, "goose"), "goose");
    }

    #[test]
    fn test_reinflect_keeps_stem() {
        let inf = inflector(&[""], &[("", SINGULAR), ("es", PLURAL)]);
        let table = grammemes();
        let p = open(&inf, &table);
        assert_eq!(p.reinflect(SINGULAR, PLURAL, "box"), "boxes");
        assert_eq!(p.reinflect(PLURAL, SINGULAR, "boxes"), "box");
        assert_eq!(p.reinflect(Grammemes::EMPTY, SINGULAR, "boxes"), "box");
    }

    #[test]
    fn test_reinflect_uninflectable() {
        let inf = inflector(&[""], &[("", PLURAL)]);
        let table = grammemes();
        let p = open(&inf, &table);
        assert_eq!(p.reinflect(PLURAL, SINGULAR, "scissors"), "");
    }

    #[test]
    fn test_reinflect_penalizes_extra_grammemes() {
        let inf = inflector(&[""], &[("", SINGULAR), ("en", PLURAL | GENITIVE), ("e", PLURAL)]);
        let table = grammemes();
        let p = open(&inf, &table);
        assert_eq!(p.reinflect(SINGULAR, PLURAL, "tag"), "tage");
    }

    #[test]
    fn test_reinflect_with_optional_constraints() {
        let inf = inflector(
            &[""],
            &[("", SINGULAR), ("en", PLURAL | NOMINATIVE), ("er", PLURAL | GENITIVE)],
        );
        let table = grammemes();
        let p = open(&inf, &table);
        // Ties are broken by stored order.
        assert_eq!(p.reinflect(SINGULAR, PLURAL, "frau"), "frauen");
        assert_eq!(
            p.reinflect_with_optional_constraints(SINGULAR, PLURAL, &[GENITIVE], "frau"),
            "frauer"
        );
    }

    #[test]
    fn test_reinflect_idempotent_when_satisfied() {
        let inf = inflector(&[""], &[("", SINGULAR), ("s", PLURAL)]);
        let table = grammemes();
        let p = open(&inf, &table);
        let states = [SINGULAR, PLURAL, SINGULAR | NOMINATIVE, PLURAL | GENITIVE | MASCULINE];
        for &from in &states {
            for &to in &states {
                if from.contains_all(to) {
                    assert_eq!(p.reinflect(from, to, "anything"), "anything");
                }
            }
        }
    }
}
