//! # Inflection-rkyv
//!
//! Inflection-rkyvは、文法的な制約に基づいて単語を活用させる形態論エンジンの実装です。
//!
//! ## 概要
//!
//! このライブラリは、見出し語と目的の文法状態(数、格、性など)から、
//! 文法的に正しい活用形を合成するための辞書とアルゴリズムを提供します。
//! 辞書はビットパックされた活用パターンの表としてrkyvフォーマットで保存され、
//! メモリマップによるゼロコピーでのデータアクセスを実現しています。
//!
//! ## 主な機能
//!
//! - **文法素のビットマスク**: 文法素の集合を64ビットのマスクとして扱う演算
//! - **活用の選択**: 接尾辞の一致と優先度スコアによる活用形の選択
//! - **制約の照合**: 候補の表記を制約マップで照合する汎用アルゴリズム
//! - **代名詞の選択**: ロケールごとの代名詞テーブルと呼応の判定
//! - **柔軟な辞書構築**: CSV形式のソースからのビルド
//!
//! ## 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use inflection_rkyv::{Dictionary, DictionaryBuilder};
//!
//! let grammeme_csv = "number,singular\nnumber,plural\npartOfSpeech,noun\n";
//! let inflection_csv = "goose,1,noun,goose,goose:singular,geese:plural\n\
//! regular,100,noun,_,:singular,s:plural\n";
//! let lexicon_csv = "goose,singular noun,goose\n\
//! geese,plural noun,goose\n\
//! cat,singular noun,regular\n";
//!
//! let dict = DictionaryBuilder::from_readers(
//!     grammeme_csv.as_bytes(),
//!     inflection_csv.as_bytes(),
//!     lexicon_csv.as_bytes(),
//!     "en",
//! )?;
//! let dict = Dictionary::from_inner(dict);
//!
//! assert_eq!(dict.inflect("goose", &["plural"], &[])?.as_deref(), Some("geese"));
//! assert_eq!(dict.inflect("Geese", &["singular"], &[])?.as_deref(), Some("Goose"));
//! assert_eq!(dict.inflect("cat", &["plural"], &[])?.as_deref(), Some("cats"));
//! assert_eq!(dict.inflect("dog", &["plural"], &[])?, None);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("`target_pointer_width` must be 32 or 64");

/// 辞書データ構造とビルダー
pub mod dictionary;

/// エラー型の定義
pub mod errors;

/// 文法素のビットマスクと命名表
pub mod grammeme;

/// 制約の照合
pub mod matcher;

/// 代名詞テーブルと代名詞の選択
pub mod pronoun;

/// 内部ユーティリティ関数
pub mod utils;


// Re-exports
pub use dictionary::{Dictionary, DictionaryBuilder, DictionaryInner, Inflection, InflectionPattern};
pub use errors::{InflectionError, Result};
pub use grammeme::{GrammemeTable, GrammemeView, Grammemes};
pub use matcher::{CandidateEntry, ConstraintMap, ReferencedConcept, SoundProperties};
pub use pronoun::{PronounConcept, PronounTable};

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
