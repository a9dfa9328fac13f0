//! 接尾辞テーブル
//!
//! すべての活用パターンで共有される接尾辞文字列を整数IDで参照します。

use rkyv::{Archive, Deserialize, Serialize};

/// 昇順に並べられ重複を除いた接尾辞の表
#[derive(Debug, Default, Clone, Archive, Serialize, Deserialize)]
pub struct SuffixTable {
    suffixes: Vec<String>,
}

impl SuffixTable {
    /// 接尾辞のイテレータから表を作成します。
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut suffixes: Vec<String> = suffixes
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        suffixes.sort_unstable();
        suffixes.dedup();
        Self { suffixes }
    }

    /// IDから接尾辞を取得します。
    #[inline(always)]
    pub fn get(&self, id: usize) -> Option<&str> {
        self.suffixes.get(id).map(String::as_str)
    }

    /// 接尾辞のIDを検索します。
    #[inline(always)]
    pub fn find(&self, suffix: &str) -> Option<usize> {
        self.suffixes
            .binary_search_by(|s| s.as_str().cmp(suffix))
            .ok()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.suffixes.len()
    }
}

impl ArchivedSuffixTable {
    /// IDから接尾辞を取得します（アーカイブ版）。
    #[inline(always)]
    pub fn get(&self, id: usize) -> Option<&str> {
        self.suffixes.get(id).map(|s| s.as_str())
    }

    /// 接尾辞のIDを検索します（アーカイブ版）。
    #[inline(always)]
    pub fn find(&self, suffix: &str) -> Option<usize> {
        self.suffixes
            .binary_search_by(|s| s.as_str().cmp(suffix))
            .ok()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.suffixes.len()
    }
}
