//! 文法素(grammeme)のビットマスクモデル
//!
//! 各文法素(「複数」「属格」など)は固定幅の整数の1ビットに対応し、
//! 単語の文法状態はそれらのビットの論理和で表現されます。
//! カテゴリ(数、格、性など)同士は互いに素です。
//!
//! このモジュールは以下を提供します:
//!
//! - [`Grammemes`]: 集合演算(包含、交差、ビット数)を持つビットマスク
//! - [`GrammemeTable`]: 名前とビット位置を相互に変換する命名表
//! - [`GrammemeView`]: 所有版とアーカイブ版の命名表に共通する参照インターフェース

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{InflectionError, Result};

/// 1つの辞書で表現できる文法素の最大数
pub const MAX_GRAMMEMES: usize = 64;

/// 文法素の集合を表すビットマスク
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Grammemes(u64);

impl Grammemes {
    /// 空集合
    pub const EMPTY: Self = Self(0);

    /// 生のビット列からビットマスクを作成します。
    #[inline(always)]
    pub const fn new(bits: u64) -> Self {
        Self(bits)
    }

    /// 生のビット列を返します。
    #[inline(always)]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// `subset`のすべてのビットが`self`に含まれるかどうかを返します。
    ///
    /// 反射的(`a.contains_all(a)`)であり、空集合は常に含まれます。
    #[inline(always)]
    pub const fn contains_all(self, subset: Self) -> bool {
        (self.0 & subset.0) == subset.0
    }

    /// 共通のビットを1つでも持つかどうかを返します。
    #[inline(always)]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// 立っているビットの数を返します。
    #[inline(always)]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// 空集合かどうかを返します。
    #[inline(always)]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// 立っているビットの位置を昇順に返すイテレータを取得します。
    pub fn positions(self) -> impl Iterator<Item = usize> {
        let mut rest = self.0;
        std::iter::from_fn(move || {
            if rest == 0 {
                return None;
            }
            let pos = rest.trailing_zeros();
            rest &= rest - 1;
            Some(pos as usize)
        })
    }
}

impl fmt::Debug for Grammemes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grammemes({:#x})", self.0)
    }
}

impl From<u64> for Grammemes {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl BitOr for Grammemes {
    type Output = Self;

    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Grammemes {
    #[inline(always)]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Grammemes {
    type Output = Self;

    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Grammemes {
    #[inline(always)]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl FromIterator<Grammemes> for Grammemes {
    fn from_iter<I: IntoIterator<Item = Grammemes>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, |acc, g| acc | g)
    }
}

/// 命名表の1エントリ(カテゴリと値の組)
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct GrammemeEntry {
    category: String,
    value: String,
}

/// 文法素の命名表
///
/// エントリ`i`がビット`i`に対応します。値の名前は表全体で一意です。
#[derive(Debug, Default, Clone, Archive, Serialize, Deserialize)]
pub struct GrammemeTable {
    entries: Vec<GrammemeEntry>,
}

impl GrammemeTable {
    /// `(カテゴリ, 値)`の組から命名表を作成します。
    ///
    /// # エラー
    ///
    /// エントリが64を超える場合、値の名前が重複している場合、
    /// または名前が空の場合にエラーを返します。
    pub fn new<I, C, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<String>,
    {
        let mut table = Self::default();
        for (category, value) in entries {
            table.push(category.into(), value.into())?;
        }
        Ok(table)
    }

    fn push(&mut self, category: String, value: String) -> Result<()> {
        if category.is_empty() || value.is_empty() {
            return Err(InflectionError::invalid_argument(
                "entries",
                "a grammeme must have a non-empty category and value",
            ));
        }
        if self.entries.len() == MAX_GRAMMEMES {
            return Err(InflectionError::invalid_argument(
                "entries",
                format!("more than {MAX_GRAMMEMES} grammemes are defined"),
            ));
        }
        if self.entries.iter().any(|e| e.value == value) {
            return Err(InflectionError::invalid_argument(
                "entries",
                format!("duplicated grammeme value: {value}"),
            ));
        }
        self.entries.push(GrammemeEntry { category, value });
        Ok(())
    }
}

/// 命名表の参照インターフェース
///
/// 必須メソッドは[`entry`](Self::entry)と[`len`](Self::len)のみで、
/// それ以外の問い合わせはすべてこれらから導出されます。
pub trait GrammemeView {
    /// ビット位置`bit`のエントリを`(カテゴリ, 値)`として返します。
    fn entry(&self, bit: usize) -> Option<(&str, &str)>;

    /// エントリ数を返します。
    fn len(&self) -> usize;

    /// 命名表が空かどうかを返します。
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 値の名前に対応するビットを返します。
    fn value_of(&self, name: &str) -> Option<Grammemes> {
        (0..self.len())
            .find(|&bit| self.entry(bit).is_some_and(|(_, value)| value == name))
            .map(|bit| Grammemes::new(1 << bit))
    }

    /// 名前の列を1つのビットマスクに結合します。
    ///
    /// # エラー
    ///
    /// 未知の名前が含まれている場合は[`InflectionError::InvalidArgument`]を返します。
    /// 未知の名前を黙って無視することはありません。
    fn combine(&self, names: &[&str]) -> Result<Grammemes> {
        let mut mask = Grammemes::EMPTY;
        for &name in names {
            mask |= self.value_of(name).ok_or_else(|| {
                InflectionError::invalid_argument("names", format!("unknown grammeme: {name}"))
            })?;
        }
        Ok(mask)
    }

    /// ビットマスクに含まれる値の名前をビット位置の順に返します。
    fn names_of(&self, mask: Grammemes) -> Vec<&str> {
        mask.positions()
            .filter_map(|bit| self.entry(bit).map(|(_, value)| value))
            .collect()
    }

    /// 値が属するカテゴリ名を返します。
    fn category_of(&self, value: &str) -> Option<&str> {
        self.feature_alias(value).map(|(category, _)| category)
    }

    /// 値の名前を`(カテゴリ, 値)`の組に解決します。
    fn feature_alias(&self, value: &str) -> Option<(&str, &str)> {
        (0..self.len())
            .filter_map(|bit| self.entry(bit))
            .find(|&(_, v)| v == value)
    }

    /// カテゴリに属するすべての値のビットマスクを返します。
    fn category_mask(&self, category: &str) -> Grammemes {
        (0..self.len())
            .filter(|&bit| self.entry(bit).is_some_and(|(c, _)| c == category))
            .map(|bit| Grammemes::new(1 << bit))
            .collect()
    }

    /// カテゴリが定義されているかどうかを返します。
    fn has_category(&self, category: &str) -> bool {
        (0..self.len()).any(|bit| self.entry(bit).is_some_and(|(c, _)| c == category))
    }
}

impl GrammemeView for GrammemeTable {
    #[inline(always)]
    fn entry(&self, bit: usize) -> Option<(&str, &str)> {
        self.entries
            .get(bit)
            .map(|e| (e.category.as_str(), e.value.as_str()))
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl GrammemeView for ArchivedGrammemeTable {
    #[inline(always)]
    fn entry(&self, bit: usize) -> Option<(&str, &str)> {
        self.entries
            .get(bit)
            .map(|e| (e.category.as_str(), e.value.as_str()))
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> GrammemeTable {
        GrammemeTable::new([
            ("number", "singular"),
            ("number", "plural"),
            ("case", "nominative"),
            ("case", "genitive"),
            ("gender", "masculine"),
        ])
        .unwrap()
    }

    #[test]
    fn test_contains_all() {
        let a = Grammemes::new(0b1011);
        assert!(a.contains_all(a));
        assert!(a.contains_all(Grammemes::EMPTY));
        assert!(a.contains_all(Grammemes::new(0b0011)));
        assert!(!a.contains_all(Grammemes::new(0b0100)));
        assert!(Grammemes::EMPTY.contains_all(Grammemes::EMPTY));
    }

    #[test]
    fn test_contains_all_matches_definition() {
        let samples = [0u64, 1, 0b1010, 0b0110, u64::MAX, 1 << 63, 0xdead_beef];
        for &a in &samples {
            for &b in &samples {
                assert_eq!(
                    Grammemes::new(a).contains_all(Grammemes::new(b)),
                    (a & b) == b,
                    "a={a:#x} b={b:#x}",
                );
            }
        }
    }

    #[test]
    fn test_count_and_positions() {
        let g = Grammemes::new(0b1001_0010);
        assert_eq!(g.count(), 3);
        assert_eq!(g.positions().collect::<Vec<_>>(), vec![1, 4, 7]);
        assert_eq!(Grammemes::new(1 << 63).positions().collect::<Vec<_>>(), vec![63]);
    }

    #[test]
    fn test_from_iter() {
        let g: Grammemes = [Grammemes::new(1), Grammemes::new(4)].into_iter().collect();
        assert_eq!(g, Grammemes::new(5));
    }

    #[test]
    fn test_combine() {
        let t = table();
        assert_eq!(t.combine(&["plural", "genitive"]).unwrap(), Grammemes::new(0b1010));
        assert_eq!(t.combine(&[]).unwrap(), Grammemes::EMPTY);
    }

    #[test]
    fn test_combine_unknown_name() {
        let t = table();
        let result = t.combine(&["plural", "dual"]);
        assert!(matches!(result, Err(InflectionError::InvalidArgument(_))));
    }

    #[test]
    fn test_names_of() {
        let t = table();
        assert_eq!(t.names_of(Grammemes::new(0b10110)), vec!["plural", "nominative", "masculine"]);
    }

    #[test]
    fn test_categories() {
        let t = table();
        assert_eq!(t.category_of("genitive"), Some("case"));
        assert_eq!(t.category_of("dual"), None);
        assert_eq!(t.feature_alias("plural"), Some(("number", "plural")));
        assert_eq!(t.category_mask("case"), Grammemes::new(0b1100));
        assert!(t.has_category("gender"));
        assert!(!t.has_category("person"));
    }

    #[test]
    fn test_duplicated_value() {
        let result = GrammemeTable::new([("number", "plural"), ("count", "plural")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_too_many_grammemes() {
        let names: Vec<_> = (0..=MAX_GRAMMEMES).map(|i| ("c", format!("v{i}"))).collect();
        assert!(GrammemeTable::new(names).is_err());
    }
}
