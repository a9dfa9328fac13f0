//! 辞書の語彙情報を管理するモジュール
//!
//! 既知の単語ごとに、単語の性質を表すビットマスク(文法素と語タグ)と、
//! その単語が属する活用パターンのIDを保持します。

use std::collections::BTreeMap;

use rkyv::{Archive, Deserialize, Serialize};

use crate::dictionary::posting::{Postings, PostingsBuilder};
use crate::errors::Result;
use crate::grammeme::Grammemes;
use crate::utils::FromU32;

/// 単語の語彙情報
#[derive(Debug, Default, Clone, Archive, Serialize, Deserialize)]
pub struct Lexicon {
    // Sorted so that lookups can use a binary search on both forms.
    words: Vec<String>,
    properties: Vec<u64>,
    pattern_offsets: Vec<u32>,
    patterns: Postings,
}

/// 生の単語エントリ
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RawLexEntry {
    pub word: String,
    pub properties: Grammemes,
    pub pattern_ids: Vec<u32>,
}

impl Lexicon {
    /// エントリのリストから新しいインスタンスを構築します。
    ///
    /// 同じ単語が複数回現れた場合、性質は論理和で、パターンIDは和集合で統合されます。
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = RawLexEntry>,
    {
        let mut map: BTreeMap<String, (Grammemes, Vec<u32>)> = BTreeMap::new();
        for e in entries {
            let slot = map.entry(e.word).or_default();
            slot.0 |= e.properties;
            for id in e.pattern_ids {
                if !slot.1.contains(&id) {
                    slot.1.push(id);
                }
            }
        }

        let mut lexicon = Self::default();
        let mut builder = PostingsBuilder::new();
        for (word, (properties, ids)) in map {
            lexicon.words.push(word);
            lexicon.properties.push(properties.bits());
            lexicon.pattern_offsets.push(builder.push(&ids)?);
        }
        lexicon.patterns = builder.build();
        Ok(lexicon)
    }

    /// 単語のIDを検索します。
    #[inline(always)]
    pub fn find(&self, word: &str) -> Option<usize> {
        self.words.binary_search_by(|w| w.as_str().cmp(word)).ok()
    }

    /// 単語の性質を取得します。
    #[inline(always)]
    pub fn properties(&self, word_id: usize) -> Grammemes {
        Grammemes::new(self.properties.get(word_id).copied().unwrap_or_default())
    }

    /// 単語が属する活用パターンのIDを取得します。
    pub fn pattern_ids(&self, word_id: usize) -> Vec<u32> {
        self.pattern_offsets
            .get(word_id)
            .map(|&o| self.patterns.ids(usize::from_u32(o)).collect())
            .unwrap_or_default()
    }

    /// 単語数を取得します。
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.words.len()
    }
}

impl ArchivedLexicon {
    /// 単語のIDを検索します（アーカイブ版）。
    #[inline(always)]
    pub fn find(&self, word: &str) -> Option<usize> {
        self.words.binary_search_by(|w| w.as_str().cmp(word)).ok()
    }

    /// 単語の性質を取得します（アーカイブ版）。
    #[inline(always)]
    pub fn properties(&self, word_id: usize) -> Grammemes {
        Grammemes::new(
            self.properties
                .get(word_id)
                .map(|p| p.to_native())
                .unwrap_or_default(),
        )
    }

    /// 単語が属する活用パターンのIDを取得します（アーカイブ版）。
    pub fn pattern_ids(&self, word_id: usize) -> Vec<u32> {
        self.pattern_offsets
            .get(word_id)
            .map(|o| {
                self.patterns
                    .ids(usize::from_u32(o.to_native()))
                    .map(|id| id.to_native())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 単語数を取得します（アーカイブ版）。
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// 配列の長さと、すべてのパターンIDが`num_patterns`未満であることを検証します。
    pub fn verify(&self, num_patterns: usize) -> bool {
        if self.properties.len() != self.words.len() || self.pattern_offsets.len() != self.words.len() {
            return false;
        }
        if self.words.windows(2).any(|w| w[0].as_str() >= w[1].as_str()) {
            return false;
        }
        self.pattern_offsets.iter().all(|o| {
            let o = usize::from_u32(o.to_native());
            self.patterns.is_valid_offset(o)
                && self
                    .patterns
                    .ids(o)
                    .all(|id| usize::from_u32(id.to_native()) < num_patterns)
        })
    }
}
