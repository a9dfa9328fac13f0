//! 活用辞書モジュール
//!
//! このモジュールは、ロケールごとの活用辞書の読み込み、書き出し、参照を行います。
//! 主な機能として以下を提供します:
//!
//! - ゼロコピーデシリアライゼーションによる高速な辞書アクセス
//! - メモリマップドファイルによる効率的なメモリ使用
//! - 読み込み時の完全な整合性検証(破損した辞書を部分的に使うことはありません)
//! - 単語から活用パターンへの参照と、制約による単語の活用
//!
//! # 辞書の読み込み方法
//!
//! - [`Dictionary::from_path`]: ファイルパスから辞書を読み込む(推奨)
//! - [`Dictionary::read`]: リーダーから辞書を読み込む
//! - [`Dictionary::from_inner`]: 構築済みの[`DictionaryInner`]から辞書を作成する
//!
//! # 辞書のビルド
//!
//! [`DictionaryBuilder`]を使用して、CSV形式のソースデータから辞書を構築できます。
pub mod builder;
pub(crate) mod inflector;
pub(crate) mod lexicon;
pub(crate) mod packed;
pub mod pattern;
pub(crate) mod posting;
pub(crate) mod suffix;

use std::cmp::Ordering;
use std::fs::File;
use std::io::{Read, Write};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use rkyv::rancor::Error;
use rkyv::util::AlignedVec;
use rkyv::{
    Archive, Deserialize, Serialize, access, access_unchecked, api::serialize_using,
    ser::Serializer, ser::allocator::Arena, ser::sharing::Share, ser::writer::IoWriter,
    util::with_arena,
};

use crate::dictionary::inflector::{Inflector, InflectorRef};
use crate::dictionary::lexicon::Lexicon;
use crate::dictionary::pattern::priority_score;
use crate::errors::{InflectionError, Result};
use crate::grammeme::{ArchivedGrammemeTable, GrammemeTable, GrammemeView, Grammemes, MAX_GRAMMEMES};
use crate::matcher::{DefaultSoundProperties, SoundProperties};

pub use crate::dictionary::builder::DictionaryBuilder;
pub use crate::dictionary::inflector::{FieldWidths, PrefixFields, RawPattern, RowFields};
pub use crate::dictionary::lexicon::RawLexEntry;
pub use crate::dictionary::pattern::{Inflection, InflectionPattern};

/// 活用辞書を識別するマジックバイト。
///
/// この定数の"0.1"というバージョンはモデルフォーマットのバージョンを示しており、
/// クレートのセマンティックバージョンからは切り離されています。
pub const MODEL_MAGIC: &[u8] = b"InflectionRkyv 0.1\n";

const MODEL_MAGIC_LEN: usize = MODEL_MAGIC.len();
const RKYV_ALIGNMENT: usize = 16;
const PADDING_LEN: usize = (RKYV_ALIGNMENT - (MODEL_MAGIC_LEN % RKYV_ALIGNMENT)) % RKYV_ALIGNMENT;
pub(crate) const DATA_START: usize = MODEL_MAGIC_LEN + PADDING_LEN;

const VOWEL_START_TAG: &str = "vowel-start";
const CONSONANT_START_TAG: &str = "consonant-start";
const VOWEL_END_TAG: &str = "vowel-end";
const CONSONANT_END_TAGS: &[&str] = &["consonant-end", "rieul-end"];

/// [`Dictionary`]の内部データ。
///
/// ロケール、文法素の命名表、語彙、活用パターン表を保持します。
#[derive(Archive, Serialize, Deserialize)]
pub struct DictionaryInner {
    locale: String,
    grammemes: GrammemeTable,
    lexicon: Lexicon,
    inflector: Inflector,
}

/// メモリバッファ(mmapまたはヒープ)を所有し、アーカイブされた辞書へのアクセスを提供するラッパー。
#[allow(dead_code)]
enum DictBuffer {
    Mmap(Mmap),
    Aligned(AlignedVec<16>),
}

/// 読み取り専用の活用辞書。
///
/// 一度読み込まれた辞書は不変であり、`Arc<Dictionary>`としてスレッド間で共有できます。
///
/// - `Archived`: メモリマップまたはアライメント済みバッファから直接アクセスされる辞書
/// - `Owned`: ヒープ上に所有される辞書データ(ビルダーで構築した直後など)
pub enum Dictionary {
    Archived(ArchivedDictionary),
    Owned(Arc<DictionaryInner>),
}

/// アーカイブ形式の辞書。
///
/// メモリバッファとアーカイブされた辞書データへの参照を保持します。
pub struct ArchivedDictionary {
    _buffer: DictBuffer,
    data: &'static ArchivedDictionaryInner,
}

impl Deref for ArchivedDictionary {
    type Target = ArchivedDictionaryInner;
    fn deref(&self) -> &Self::Target {
        self.data
    }
}

/// 辞書内部データへの参照(アーカイブ版または所有版)。
#[derive(Clone, Copy)]
pub(crate) enum DictionaryInnerRef<'a> {
    Archived(&'a ArchivedDictionaryInner),
    Owned(&'a DictionaryInner),
}

impl DictionaryInner {
    /// 構成要素から内部データを作成します。
    ///
    /// # エラー
    ///
    /// 語彙が存在しない活用パターンを参照している場合にエラーを返します。
    pub(crate) fn new(
        locale: String,
        grammemes: GrammemeTable,
        lexicon: Lexicon,
        inflector: Inflector,
    ) -> Result<Self> {
        let num_patterns = inflector.num_patterns();
        for word_id in 0..lexicon.len() {
            if let Some(id) = lexicon
                .pattern_ids(word_id)
                .into_iter()
                .find(|&id| id as usize >= num_patterns)
            {
                return Err(InflectionError::invalid_argument(
                    "lexicon",
                    format!("word {word_id} refers to an unknown inflection pattern {id}"),
                ));
            }
        }
        Ok(Self {
            locale,
            grammemes,
            lexicon,
            inflector,
        })
    }

    /// ロケール識別子
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// 辞書データを`rkyv`フォーマットを使用してライターにシリアライズします。
    ///
    /// 出力は[`Dictionary::from_path`]や[`Dictionary::read`]が期待する形式です。
    ///
    /// # エラー
    ///
    /// この関数は以下の場合にエラーを返します:
    /// - 基礎となる`writer`への書き込みに失敗した場合(例: I/Oエラー)。
    /// - `rkyv`シリアライゼーションプロセスでエラーが発生した場合。
    pub fn write<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        wtr.write_all(MODEL_MAGIC)?;

        let padding_bytes = vec![0xFF; PADDING_LEN];
        wtr.write_all(&padding_bytes)?;

        with_arena(|arena: &mut Arena| {
            let writer = IoWriter::new(&mut wtr);
            let mut serializer = Serializer::new(writer, arena.acquire(), Share::new());
            serialize_using::<_, rkyv::rancor::Error>(self, &mut serializer)
        })
        .map_err(|e| {
            InflectionError::invalid_state("rkyv serialization failed".to_string(), e.to_string())
        })?;

        Ok(())
    }
}

impl<'a> DictionaryInnerRef<'a> {
    #[inline(always)]
    fn inflector(self) -> InflectorRef<'a> {
        match self {
            Self::Archived(d) => InflectorRef::Archived(&d.inflector),
            Self::Owned(d) => InflectorRef::Owned(&d.inflector),
        }
    }

    #[inline(always)]
    fn grammemes(self) -> &'a dyn GrammemeView {
        match self {
            Self::Archived(d) => &d.grammemes,
            Self::Owned(d) => &d.grammemes,
        }
    }

    fn locale(self) -> &'a str {
        match self {
            Self::Archived(d) => d.locale.as_str(),
            Self::Owned(d) => d.locale.as_str(),
        }
    }

    #[inline(always)]
    fn find_word(self, word: &str) -> Option<usize> {
        match self {
            Self::Archived(d) => d.lexicon.find(word),
            Self::Owned(d) => d.lexicon.find(word),
        }
    }

    #[inline(always)]
    fn word_properties(self, word_id: usize) -> Grammemes {
        match self {
            Self::Archived(d) => d.lexicon.properties(word_id),
            Self::Owned(d) => d.lexicon.properties(word_id),
        }
    }

    fn word_pattern_ids(self, word_id: usize) -> Vec<u32> {
        match self {
            Self::Archived(d) => d.lexicon.pattern_ids(word_id),
            Self::Owned(d) => d.lexicon.pattern_ids(word_id),
        }
    }

    fn num_words(self) -> usize {
        match self {
            Self::Archived(d) => d.lexicon.len(),
            Self::Owned(d) => d.lexicon.len(),
        }
    }

    fn pattern(self, id: usize) -> Result<InflectionPattern<'a>> {
        Ok(InflectionPattern::new(self.inflector(), id)?.with_grammemes(self.grammemes()))
    }

    fn patterns(self, ids: impl IntoIterator<Item = u32>) -> Result<Vec<InflectionPattern<'a>>> {
        ids.into_iter().map(|id| self.pattern(id as usize)).collect()
    }

    /// 完全一致で単語を検索し、見つからなければ小文字化して再検索します。
    fn lookup(self, word: &str) -> Option<usize> {
        self.find_word(word).or_else(|| {
            let lower = word.to_lowercase();
            if lower != word {
                self.find_word(&lower)
            } else {
                None
            }
        })
    }

    fn verify(self) -> Result<()> {
        if let Self::Archived(d) = self {
            if d.grammemes.len() > MAX_GRAMMEMES {
                return Err(InflectionError::invalid_format(
                    "dictionary",
                    format!("more than {MAX_GRAMMEMES} grammemes are defined"),
                ));
            }
            if !d.lexicon.verify(d.inflector.num_patterns()) {
                return Err(InflectionError::invalid_format(
                    "dictionary",
                    "the lexicon is inconsistent or refers to unknown patterns",
                ));
            }
        }
        self.inflector().verify()
    }
}

impl ArchivedDictionaryInner {
    /// ロケール識別子
    pub fn locale(&self) -> &str {
        self.locale.as_str()
    }

    /// 文法素の命名表への参照を取得します。
    #[inline(always)]
    pub fn grammemes(&self) -> &ArchivedGrammemeTable {
        &self.grammemes
    }
}

fn check_magic(magic: &[u8], arg: &'static str) -> Result<()> {
    if !magic.starts_with(MODEL_MAGIC) {
        return Err(InflectionError::invalid_argument(
            arg,
            "The magic number of the input model mismatches.",
        ));
    }
    Ok(())
}

fn validation_failed(e: Error) -> InflectionError {
    InflectionError::invalid_state(
        "rkyv validation failed. The dictionary file may be corrupted or incompatible.".to_string(),
        e.to_string(),
    )
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_all_upper_case(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}

/// 解決済みの活用要求
struct InflectRequest {
    to: Grammemes,
    optional: Vec<Grammemes>,
    disambiguation: Vec<Grammemes>,
}

/// 活用の候補。行のないパターンでは`row`が`None`です。
struct Candidate<'a> {
    grammemes: Grammemes,
    row: Option<Inflection<'a>>,
}

fn compare_candidates(a: &Candidate, b: &Candidate, disambiguation: &[Grammemes]) -> Ordering {
    let score_a = priority_score(a.grammemes, disambiguation);
    let score_b = priority_score(b.grammemes, disambiguation);
    score_b.cmp(&score_a).then_with(|| match (&a.row, &b.row) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(row_a), Some(row_b)) => a
            .grammemes
            .count()
            .cmp(&b.grammemes.count())
            .then_with(|| {
                row_b
                    .pattern()
                    .num_inflections()
                    .cmp(&row_a.pattern().num_inflections())
            }),
    })
}

impl Dictionary {
    /// `DictionaryInner`から辞書を作成します。
    pub fn from_inner(dict: DictionaryInner) -> Self {
        Self::Owned(Arc::new(dict))
    }

    /// 辞書データを`rkyv`フォーマットを使用してライターにシリアライズします。
    ///
    /// アーカイブ版の辞書は一度ネイティブ形式に復元してから書き出されます。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use std::fs::File;
    /// use inflection_rkyv::{Dictionary, DictionaryBuilder};
    ///
    /// let dict = DictionaryBuilder::from_readers(
    ///     "number,singular\nnumber,plural\n".as_bytes(),
    ///     "goose,1,,goose,goose:singular,geese:plural\n".as_bytes(),
    ///     "goose,singular,goose\ngeese,plural,goose\n".as_bytes(),
    ///     "en",
    /// )?;
    /// let dict = Dictionary::from_inner(dict);
    ///
    /// let mut file = File::create("en.dic")?;
    /// dict.write(&mut file)?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # エラー
    ///
    /// 書き込みまたはシリアライゼーションに失敗した場合にエラーを返します。
    pub fn write<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        match self {
            Self::Owned(dict) => dict.write(wtr),
            Self::Archived(archived) => {
                let dict = rkyv::deserialize::<DictionaryInner, Error>(archived.data)?;
                dict.write(wtr)
            }
        }
    }

    /// すべてのデータをヒープバッファに読み込むことで、リーダーから辞書を作成します。
    ///
    /// ファイルパスが利用できない場合(例: メモリ内バッファからの読み込み)のフォールバックです。
    ///
    /// # エラー
    ///
    /// この関数は以下の場合にエラーを返します:
    /// - データを読み込めない場合。
    /// - マジックナンバーが一致しない場合([`InflectionError::InvalidArgument`])。
    /// - コンテンツが破損している場合。
    pub fn read<R: Read>(mut rdr: R) -> Result<Self> {
        let mut magic = [0; MODEL_MAGIC_LEN];
        rdr.read_exact(&mut magic)?;
        check_magic(&magic, "rdr")?;

        let mut padding_buf = vec![0; PADDING_LEN];
        rdr.read_exact(&mut padding_buf)?;

        let mut buffer = Vec::new();
        rdr.read_to_end(&mut buffer)?;

        let mut aligned_bytes = AlignedVec::with_capacity(buffer.len());
        aligned_bytes.extend_from_slice(&buffer);

        let archived =
            access::<ArchivedDictionaryInner, Error>(&aligned_bytes).map_err(validation_failed)?;

        // SAFETY: AlignedVec ensures correct alignment for ArchivedDictionaryInner
        let data: &'static ArchivedDictionaryInner = unsafe { &*(archived as *const _) };

        let dict = Self::Archived(ArchivedDictionary {
            _buffer: DictBuffer::Aligned(aligned_bytes),
            data,
        });
        dict.verify()?;
        dict.log_loaded();
        Ok(dict)
    }

    /// メモリマッピングを使用してファイルパスから辞書を作成します。
    ///
    /// `rkyv`による検証に続いて[`verify`](Self::verify)による整合性検証を常に実行します。
    /// マップされた領域が検証に通らない場合(アライメントなど)は、
    /// アライメント済みのヒープバッファにコピーして再検証します。
    ///
    /// # エラー
    ///
    /// この関数は以下の場合にエラーを返します:
    /// - ファイルを開けない、または読み込めない場合。
    /// - マジックナンバーが一致しない場合([`InflectionError::InvalidArgument`])。
    /// - ファイルが破損している、または切り詰められている場合。
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            InflectionError::invalid_argument("path", format!("Failed to open dictionary file: {}", e))
        })?;
        let mut magic = [0u8; MODEL_MAGIC_LEN];
        file.read_exact(&mut magic)?;
        check_magic(&magic, "path")?;

        let mmap = unsafe { Mmap::map(&file)? };

        let Some(data_bytes) = mmap.get(DATA_START..) else {
            return Err(InflectionError::invalid_argument(
                "path",
                "Dictionary file too small or corrupted.",
            ));
        };

        let dict = match access::<ArchivedDictionaryInner, Error>(data_bytes) {
            Ok(archived) => {
                let data: &'static ArchivedDictionaryInner = unsafe { &*(archived as *const _) };
                Self::Archived(ArchivedDictionary {
                    _buffer: DictBuffer::Mmap(mmap),
                    data,
                })
            }
            Err(_) => {
                let mut aligned_bytes = AlignedVec::with_capacity(data_bytes.len());
                aligned_bytes.extend_from_slice(data_bytes);

                let archived = access::<ArchivedDictionaryInner, Error>(&aligned_bytes)
                    .map_err(validation_failed)?;

                let data: &'static ArchivedDictionaryInner = unsafe { &*(archived as *const _) };
                Self::Archived(ArchivedDictionary {
                    _buffer: DictBuffer::Aligned(aligned_bytes),
                    data,
                })
            }
        };
        dict.verify()?;
        dict.log_loaded();
        Ok(dict)
    }

    /// 検証なしでメモリマッピングを使用してファイルパスから辞書を作成します。
    ///
    /// # エラー
    ///
    /// ファイルを開けない場合、小さすぎる場合、マジックナンバーが不正な場合にエラーを返します。
    /// シリアライズされたデータ自体の整合性は検証しません。
    ///
    /// # Safety
    ///
    /// この関数は`rkyv`の検証ステップと辞書の整合性検証をバイパスして
    /// メモリマップされたデータに直接アクセスします。呼び出し側は、
    /// ファイルの内容が辞書の有効で破損していない表現であることを保証する必要があります。
    pub unsafe fn from_path_unchecked<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            InflectionError::invalid_argument("path", format!("Failed to open dictionary file: {}", e))
        })?;
        let mut magic = [0u8; MODEL_MAGIC_LEN];
        file.read_exact(&mut magic)?;
        check_magic(&magic, "path")?;

        let mmap = unsafe { Mmap::map(&file)? };

        let Some(data_bytes) = mmap.get(DATA_START..) else {
            return Err(InflectionError::invalid_argument(
                "path",
                "Dictionary file too small or corrupted.",
            ));
        };

        let archived = unsafe { access_unchecked::<ArchivedDictionaryInner>(data_bytes) };
        let data: &'static ArchivedDictionaryInner = unsafe { &*(archived as *const _) };
        Ok(Self::Archived(ArchivedDictionary {
            _buffer: DictBuffer::Mmap(mmap),
            data,
        }))
    }

    #[inline(always)]
    pub(crate) fn inner_ref(&self) -> DictionaryInnerRef<'_> {
        match self {
            Self::Archived(archived) => DictionaryInnerRef::Archived(archived.data),
            Self::Owned(dict) => DictionaryInnerRef::Owned(dict),
        }
    }

    fn log_loaded(&self) {
        let inner = self.inner_ref();
        log::debug!(
            "[inflection-rkyv] Loaded dictionary for {}: {} words, {} inflection patterns",
            inner.locale(),
            inner.num_words(),
            inner.inflector().num_patterns(),
        );
    }

    /// 辞書全体の整合性を検証します。
    ///
    /// フィールド幅が64ビットに収まること、語彙が参照するパターンID、
    /// すべてのパターンの行の接尾辞IDと文法素インデックスが範囲内であることを確認します。
    ///
    /// # エラー
    ///
    /// 不整合が見つかった場合は[`InflectionError::InvalidFormat`]などを返します。
    pub fn verify(&self) -> Result<()> {
        self.inner_ref().verify()
    }

    /// ロケール識別子
    pub fn locale(&self) -> &str {
        self.inner_ref().locale()
    }

    /// 文法素の命名表
    pub fn grammemes(&self) -> &dyn GrammemeView {
        self.inner_ref().grammemes()
    }

    /// 単語数
    pub fn num_words(&self) -> usize {
        self.inner_ref().num_words()
    }

    /// 活用パターン数
    pub fn num_patterns(&self) -> usize {
        self.inner_ref().inflector().num_patterns()
    }

    /// 単語の性質(文法素と語タグ)のビットマスクを返します。
    ///
    /// 完全一致で見つからず、単語がすべて小文字でない場合は小文字化して再検索します。
    pub fn word_grammemes(&self, word: &str) -> Option<Grammemes> {
        let inner = self.inner_ref();
        inner.lookup(word).map(|id| inner.word_properties(id))
    }

    /// IDで活用パターンを開きます。
    ///
    /// # エラー
    ///
    /// IDが範囲外の場合は[`InflectionError::IndexOutOfBounds`]を返します。
    pub fn inflection_pattern(&self, id: usize) -> Result<InflectionPattern<'_>> {
        self.inner_ref().pattern(id)
    }

    /// 識別子で活用パターンを開きます。
    pub fn inflection_pattern_by_name(&self, name: &str) -> Result<Option<InflectionPattern<'_>>> {
        let inner = self.inner_ref();
        inner
            .inflector()
            .find_identifier(name)
            .map(|id| inner.pattern(id))
            .transpose()
    }

    /// 単語が属するすべての活用パターンを返します。
    ///
    /// 単語が辞書にない場合は空のベクターを返します。
    pub fn inflection_patterns_for_word(&self, word: &str) -> Result<Vec<InflectionPattern<'_>>> {
        let inner = self.inner_ref();
        match inner.lookup(word) {
            Some(id) => inner.patterns(inner.word_pattern_ids(id)),
            None => Ok(vec![]),
        }
    }

    /// 行の接尾辞が`suffix`と等しいすべての活用パターンを返します。
    pub fn inflection_patterns_from_suffix(&self, suffix: &str) -> Result<Vec<InflectionPattern<'_>>> {
        let inner = self.inner_ref();
        let inflector = inner.inflector();
        match inflector.find_suffix(suffix) {
            Some(suffix_id) => inner.patterns(inflector.suffix_pattern_ids(suffix_id)),
            None => Ok(vec![]),
        }
    }

    /// 単語を制約で指定された文法状態に活用させます。
    ///
    /// 曖昧性解消の文法素を指定しない[`inflect_with_disambiguation`](Self::inflect_with_disambiguation)です。
    ///
    /// # エラー
    ///
    /// 未知の文法素名が含まれている場合は[`InflectionError::InvalidArgument`]を返します。
    pub fn inflect(
        &self,
        word: &str,
        constraints: &[&str],
        optional_constraints: &[&str],
    ) -> Result<Option<String>> {
        self.inflect_with_disambiguation(word, constraints, optional_constraints, &[])
    }

    /// 曖昧性解消の文法素を考慮して、単語を制約で指定された文法状態に活用させます。
    ///
    /// - 制約がすべて空の場合は単語をそのまま返します。
    /// - 単語の各活用パターンから候補を集めます。行のないパターンは行のない候補を1つ、
    ///   それ以外のパターンは表層形に一致する各行を候補とします。
    /// - 候補は、曖昧性解消の文法素との一致(先頭ほど優先)、行の有無、
    ///   文法素の少なさ、パターンの行数の多さの順に並べられ、
    ///   [`InflectionPattern::reinflect_with_optional_constraints`]で最初に得られた
    ///   空でない結果を返します。行のない候補は単語をそのまま返します。
    /// - すべて大文字の単語は小文字化して活用し、結果を大文字に戻します。
    ///   完全一致で活用できず先頭が大文字の場合は、小文字化して活用した結果の先頭を大文字にします。
    ///
    /// 単語が辞書にない、または活用できない場合は`None`を返します。
    ///
    /// # エラー
    ///
    /// 未知の文法素名が含まれている場合は[`InflectionError::InvalidArgument`]を返します。
    pub fn inflect_with_disambiguation(
        &self,
        word: &str,
        constraints: &[&str],
        optional_constraints: &[&str],
        disambiguation: &[&str],
    ) -> Result<Option<String>> {
        log::trace!(
            "[inflection-rkyv] inflect word: {:?}, constraints: [{}], optional constraints: [{}], disambiguation: [{}]",
            word,
            constraints.join(", "),
            optional_constraints.join(", "),
            disambiguation.join(", "),
        );
        let names: Vec<&str> = constraints.iter().copied().filter(|c| !c.is_empty()).collect();
        if names.is_empty() {
            return Ok(Some(word.to_string()));
        }
        let grammemes = self.grammemes();
        let single = |names: &[&str]| {
            names
                .iter()
                .map(|&c| grammemes.combine(&[c]))
                .collect::<Result<Vec<_>>>()
        };
        let request = InflectRequest {
            to: grammemes.combine(&names)?,
            optional: single(optional_constraints)?,
            disambiguation: single(disambiguation)?,
        };

        let all_caps = is_all_upper_case(word);
        if !all_caps && let Some(inflected) = self.inflect_word(word, &request) {
            return Ok(Some(inflected));
        }
        let lower = word.to_lowercase();
        let Some(inflected) = self.inflect_word(&lower, &request) else {
            return Ok(None);
        };
        if all_caps {
            Ok(Some(inflected.to_uppercase()))
        } else if word.chars().next().is_some_and(char::is_uppercase) {
            Ok(Some(capitalize_first(&inflected)))
        } else {
            Ok(Some(inflected))
        }
    }

    fn inflect_word(&self, word: &str, request: &InflectRequest) -> Option<String> {
        let inner = self.inner_ref();
        let Some(word_id) = inner.find_word(word) else {
            log::trace!("[inflection-rkyv] {word:?} is not in the dictionary");
            return None;
        };
        let word_grammemes = inner.word_properties(word_id);
        let pattern_ids = inner.word_pattern_ids(word_id);
        if pattern_ids.is_empty() {
            log::trace!("[inflection-rkyv] {word:?} has no inflection patterns");
            return None;
        }
        let mut candidates = vec![];
        for id in pattern_ids {
            // Patterns are verified when the dictionary is opened.
            let Ok(pattern) = inner.pattern(id as usize) else {
                continue;
            };
            if pattern.num_inflections() == 0 {
                candidates.push(Candidate {
                    grammemes: pattern.parts_of_speech(),
                    row: None,
                });
                continue;
            }
            for row in pattern.inflections_for_surface_form(word, word_grammemes) {
                candidates.push(Candidate {
                    grammemes: row.grammemes() | pattern.parts_of_speech(),
                    row: Some(row),
                });
            }
        }
        candidates.sort_by(|a, b| compare_candidates(a, b, &request.disambiguation));

        for candidate in candidates {
            let Some(row) = candidate.row else {
                log::trace!("[inflection-rkyv] {word:?} is invariable");
                return Some(word.to_string());
            };
            let inflected = row.pattern().reinflect_with_optional_constraints(
                row.grammemes(),
                request.to,
                &request.optional,
                word,
            );
            if !inflected.is_empty() {
                return Some(inflected);
            }
        }
        None
    }

    fn tag_mask(&self, tags: &[&str]) -> Option<Grammemes> {
        let grammemes = self.grammemes();
        let masks: Vec<Grammemes> = tags.iter().filter_map(|t| grammemes.value_of(t)).collect();
        (!masks.is_empty()).then(|| masks.into_iter().collect())
    }

    /// 語タグから母音/子音の区別を判定します。判定できない場合は`None`を返します。
    fn tagged_sound(&self, word: &str, vowel_tags: &[&str], consonant_tags: &[&str]) -> Option<bool> {
        let vowel = self.tag_mask(vowel_tags);
        let consonant = self.tag_mask(consonant_tags);
        if vowel.is_none() && consonant.is_none() {
            return None;
        }
        let types = self.word_grammemes(word)?;
        let is_vowel = vowel.is_some_and(|m| types.intersects(m));
        let is_consonant = consonant.is_some_and(|m| types.intersects(m));
        match (is_vowel, is_consonant) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        }
    }
}

impl SoundProperties for Dictionary {
    fn starts_with_vowel(&self, text: &str) -> bool {
        self.tagged_sound(text, &[VOWEL_START_TAG], &[CONSONANT_START_TAG])
            .unwrap_or_else(|| DefaultSoundProperties.starts_with_vowel(text))
    }

    fn ends_with_vowel(&self, text: &str) -> bool {
        let stripped: String = text
            .chars()
            .filter(|&c| c.is_alphanumeric() || c.is_whitespace() || c == '&')
            .collect();
        self.tagged_sound(&stripped, &[VOWEL_END_TAG], CONSONANT_END_TAGS)
            .unwrap_or_else(|| DefaultSoundProperties.ends_with_vowel(text))
    }
}
