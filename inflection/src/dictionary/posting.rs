//! ポスティングリスト
//!
//! このモジュールは、活用パターンIDのポスティングリストを管理します。

use rkyv::rend::u32_le;
use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::Result;
use crate::utils::FromU32;

/// ポスティングリスト
#[derive(Debug, Default, Clone, Archive, Serialize, Deserialize)]
pub struct Postings {
    // Sets of ids are stored by interleaving their length and values.
    data: Vec<u32>,
}

impl Postings {
    /// 指定されたオフセットのIDイテレータを取得します。
    ///
    /// オフセットが不正な場合は空のイテレータを返します。
    #[inline(always)]
    pub fn ids(&'_ self, i: usize) -> impl Iterator<Item = u32> + '_ {
        let len = self.data.get(i).map_or(0, |&len| usize::from_u32(len));
        self.data
            .get(i + 1..i + 1 + len)
            .unwrap_or(&[])
            .iter()
            .cloned()
    }
}

/// ポスティングリストを構築するビルダー
#[derive(Default)]
pub struct PostingsBuilder {
    data: Vec<u32>,
}

impl PostingsBuilder {
    /// 新しいビルダーを作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// IDリストを追加し、そのオフセットを返します。
    #[inline(always)]
    pub fn push(&mut self, ids: &[u32]) -> Result<u32> {
        let offset = self.data.len().try_into()?;
        self.data.push(ids.len().try_into()?);
        self.data.extend_from_slice(ids);
        Ok(offset)
    }

    /// ポスティングリストを構築します。
    #[allow(clippy::missing_const_for_fn)]
    pub fn build(self) -> Postings {
        Postings { data: self.data }
    }
}

impl ArchivedPostings {
    /// 指定されたオフセットのIDイテレータを取得します（アーカイブ版）。
    #[inline(always)]
    pub fn ids(&'_ self, i: usize) -> impl Iterator<Item = u32_le> + '_ {
        let len = self.data.get(i).map_or(0, |len| usize::from_u32(len.to_native()));
        self.data
            .get(i + 1..i + 1 + len)
            .unwrap_or(&[])
            .iter()
            .cloned()
    }

    /// オフセット`i`のリストが配列内に収まっているかどうかを返します。
    pub fn is_valid_offset(&self, i: usize) -> bool {
        self.data
            .get(i)
            .is_some_and(|len| i + 1 + usize::from_u32(len.to_native()) <= self.data.len())
    }
}
