//! 代名詞の選択
//!
//! このモジュールは、ロケールごとの代名詞テーブルと、
//! 制約に基づいて代名詞の表記を選択する [`PronounConcept`] を提供します。
//!
//! # 代名詞テーブルの形式
//!
//! 1行に1つの表記 `表記,制約,...` を記述します。制約は以下のいずれかです。
//!
//! - `value`: 命名表で定義された値。所属するカテゴリの制約になります。
//! - `feature=value`: 素性と値の組
//! - `feature`: 素性のすべての値に一致するワイルドカード
//!
//! 先頭に`dependency=`を付けた制約は、参照先の概念との呼応を表します。
//!
//! ```
//! use inflection_rkyv::GrammemeTable;
//! use inflection_rkyv::pronoun::PronounTable;
//!
//! let grammemes = GrammemeTable::new([
//!     ("person", "first"),
//!     ("person", "third"),
//!     ("number", "singular"),
//!     ("number", "plural"),
//! ])?;
//! let table = PronounTable::parse("I,first,singular\nwe,first,plural\nthey,third,number\n", &grammemes)?;
//! assert_eq!(table.len(), 3);
//! assert_eq!(table.entries()[2].constraints["number"], "");
//! # Ok::<(), inflection_rkyv::errors::InflectionError>(())
//! ```

use std::sync::{Arc, LazyLock, Mutex};

use hashbrown::HashMap;

use crate::errors::{InflectionError, Result};
use crate::grammeme::GrammemeView;
use crate::matcher::{
    self, CandidateEntry, CandidateList, ConstraintMap, ReferencedConcept, SOUND_FEATURE,
};
use crate::utils::parse_csv_row;

/// 呼応を表す制約の接頭辞
pub const DEPENDENCY_PREFIX: &str = "dependency=";

/// ロケールごとの代名詞テーブル
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PronounTable {
    entries: Vec<CandidateEntry>,
}

static PRONOUN_TABLES: LazyLock<Mutex<HashMap<String, Arc<PronounTable>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// `es_MX`から`es`のように末尾の区画を取り除いたロケールを返します。
fn parent_locale(locale: &str) -> Option<&str> {
    locale.rsplit_once(['_', '-']).map(|(parent, _)| parent)
}

impl PronounTable {
    /// テキスト形式の代名詞テーブルを解析します。
    ///
    /// # エラー
    ///
    /// 命名表にない素性が含まれる場合は
    /// [`InflectionError::InvalidConfiguration`]を返します。
    pub fn parse(text: &str, grammemes: &dyn GrammemeView) -> Result<Self> {
        let mut entries = vec![];
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let mut cells = parse_csv_row(line)?.into_iter();
            let Some(display) = cells.next() else {
                continue;
            };
            let mut constraints = ConstraintMap::new();
            for cell in cells {
                let (key, value) = Self::parse_constraint(&cell, grammemes)?;
                constraints.insert(key, value);
            }
            entries.push(CandidateEntry {
                display,
                constraints,
            });
        }
        Ok(Self { entries })
    }

    fn parse_constraint(cell: &str, grammemes: &dyn GrammemeView) -> Result<(String, String)> {
        let (dependency, constraint) = match cell.strip_prefix(DEPENDENCY_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, cell),
        };
        let (feature, value) = match grammemes.feature_alias(constraint) {
            Some((category, value)) => (category, value),
            None => {
                let (feature, value) = constraint.split_once('=').unwrap_or((constraint, ""));
                if feature != SOUND_FEATURE && !grammemes.has_category(feature) {
                    return Err(InflectionError::InvalidConfiguration(format!(
                        "Unknown constraint for PronounConcept: {feature}"
                    )));
                }
                (feature, value)
            }
        };
        let key = if dependency {
            format!("{DEPENDENCY_PREFIX}{feature}")
        } else {
            feature.to_string()
        };
        Ok((key, value.to_string()))
    }

    /// ロケールの代名詞テーブルをプロセス全体のキャッシュから取得します。
    ///
    /// 明示的なフォールバックを指定しない[`cached_with_fallbacks`](Self::cached_with_fallbacks)です。
    ///
    /// # エラー
    ///
    /// どのロケールにもテーブルがない場合は[`InflectionError::InvalidArgument`]を返します。
    pub fn cached<F>(locale: &str, grammemes: &dyn GrammemeView, loader: F) -> Result<Arc<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::cached_with_fallbacks(locale, grammemes, &[], loader)
    }

    /// ロケールの代名詞テーブルをプロセス全体のキャッシュから取得します。
    ///
    /// キャッシュにない場合は`loader`でテキストを読み込み、解析して登録します。
    /// `loader`がテキストを返さないロケールは、`fallbacks`に`(ロケール, 代替ロケール)`の組が
    /// あればその代替ロケールに(例: `zh_TW`から`zh_Hant`)、なければ末尾の区画を
    /// 取り除いたロケールにフォールバックします。
    ///
    /// # エラー
    ///
    /// どのロケールにもテーブルがない場合は[`InflectionError::InvalidArgument`]を返します。
    pub fn cached_with_fallbacks<F>(
        locale: &str,
        grammemes: &dyn GrammemeView,
        fallbacks: &[(&str, &str)],
        loader: F,
    ) -> Result<Arc<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut tables = PRONOUN_TABLES.lock().map_err(|e| {
            InflectionError::invalid_state("pronoun table cache is poisoned", e.to_string())
        })?;
        let mut visited: Vec<String> = vec![];
        let mut current = Some(locale.to_string());
        while let Some(candidate) = current {
            if visited.contains(&candidate) {
                break;
            }
            if let Some(table) = tables.get(&candidate) {
                return Ok(Arc::clone(table));
            }
            if let Some(text) = loader(&candidate) {
                let table = Arc::new(Self::parse(&text, grammemes)?);
                log::debug!(
                    "[inflection-rkyv] Loaded {} pronouns for {candidate}",
                    table.len()
                );
                tables.insert(candidate, Arc::clone(&table));
                return Ok(table);
            }
            current = fallbacks
                .iter()
                .find(|(from, _)| *from == candidate)
                .map(|(_, to)| to.to_string())
                .or_else(|| parent_locale(&candidate).map(str::to_string));
            visited.push(candidate);
        }
        Err(InflectionError::invalid_argument(
            "locale",
            format!("Unsupported language for pronouns: {locale}"),
        ))
    }

    /// テーブルの表記を返します。
    pub fn entries(&self) -> &[CandidateEntry] {
        &self.entries
    }

    /// 表記の数を返します。
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// テーブルが空かどうかを返します。
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 制約に基づいて代名詞を選択する概念
///
/// 呼び出し側が与えた表記を、共有される代名詞テーブルより先に照合します。
#[derive(Debug, Clone)]
pub struct PronounConcept {
    table: Arc<PronounTable>,
    customized: Vec<CandidateEntry>,
    default_constraints: ConstraintMap,
    constraints: ConstraintMap,
    default_index: Option<usize>,
}

impl PronounConcept {
    /// 新しい代名詞の概念を作成します。
    ///
    /// # エラー
    ///
    /// 表記が1つもない場合は[`InflectionError::InvalidArgument`]を返します。
    pub fn new(
        table: Arc<PronounTable>,
        customized: Vec<CandidateEntry>,
        default_constraints: ConstraintMap,
    ) -> Result<Self> {
        if customized.is_empty() && table.is_empty() {
            return Err(InflectionError::invalid_argument(
                "display_data",
                "Display data can not be empty.",
            ));
        }
        Ok(Self {
            table,
            customized,
            default_constraints,
            constraints: ConstraintMap::new(),
            default_index: None,
        })
    }

    /// 代名詞の表記から概念を作成します。
    ///
    /// 同じ表記(大文字小文字を区別せず、末尾の空白1つは無視)を持つすべての
    /// 項目の制約を既定の制約とし、項目間で値が食い違う制約は取り除きます。
    ///
    /// # エラー
    ///
    /// テーブルにない代名詞の場合は[`InflectionError::InvalidArgument`]を返します。
    pub fn from_initial_pronoun(table: Arc<PronounTable>, pronoun: &str) -> Result<Self> {
        let mut concept = Self::new(Arc::clone(&table), vec![], ConstraintMap::new())?;
        let pronoun = pronoun.to_lowercase();
        let mut ambiguous = vec![];
        // No customized entries, so table indices are candidate indices.
        for (idx, entry) in table.entries().iter().enumerate() {
            let display = entry.display.strip_suffix(' ').unwrap_or(&entry.display);
            if display.to_lowercase() != pronoun {
                continue;
            }
            for (name, value) in &entry.constraints {
                match concept.default_constraints.get(name) {
                    None => {
                        concept.default_constraints.insert(name.clone(), value.clone());
                    }
                    Some(stored) if stored != value => ambiguous.push(name.clone()),
                    Some(_) => {}
                }
            }
            concept.default_index.get_or_insert(idx);
        }
        if concept.default_index.is_none() {
            return Err(InflectionError::invalid_argument(
                "pronoun",
                format!("Unknown pronoun: {pronoun}"),
            ));
        }
        for name in ambiguous {
            concept.default_constraints.remove(&name);
        }
        concept.default_constraints.retain(|_, value| !value.is_empty());
        Ok(concept)
    }

    /// 制約を追加します。同じ素性の制約は置き換えられます。
    pub fn put_constraint<K, V>(&mut self, feature: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.constraints.insert(feature.into(), value.into());
    }

    /// 制約を取り除きます。
    pub fn clear_constraint(&mut self, feature: &str) {
        self.constraints.remove(feature);
    }

    /// 現在の制約
    pub fn constraints(&self) -> &ConstraintMap {
        &self.constraints
    }

    /// 既定の制約
    pub fn default_constraints(&self) -> &ConstraintMap {
        &self.default_constraints
    }

    /// 照合対象の候補(呼び出し側の表記、テーブルの表記の順)
    pub fn candidates(&self) -> CandidateList<'_> {
        CandidateList::new(&self.customized, self.table.entries())
    }

    fn is_matching_initial_pronoun(&self) -> bool {
        let Some(entry) = self.default_index.and_then(|idx| self.candidates().get(idx)) else {
            return false;
        };
        self.constraints
            .iter()
            .all(|(name, value)| entry.constraints.get(name) == Some(value))
    }

    /// 現在の制約に最もよく一致する候補を返します。
    ///
    /// 代名詞の表記から作成された概念で、参照先がなく現在の制約がその表記と
    /// 矛盾しない場合は、その表記の項目を返します。
    pub fn first_possible_value(
        &self,
        reference: Option<&dyn ReferencedConcept>,
        return_default: bool,
        match_all: bool,
    ) -> Option<&CandidateEntry> {
        if reference.is_none() && self.is_matching_initial_pronoun() {
            return self.default_index.and_then(|idx| self.candidates().get(idx));
        }
        matcher::first_possible_value(
            &self.candidates(),
            &self.constraints,
            &self.default_constraints,
            reference,
            return_default,
            match_all,
        )
    }

    /// 表記が空でない最良の候補を返します。
    pub fn current_value(
        &self,
        reference: Option<&dyn ReferencedConcept>,
        return_default: bool,
        match_all: bool,
    ) -> Option<&CandidateEntry> {
        self.first_possible_value(reference, return_default, match_all)
            .filter(|entry| !entry.display.is_empty())
    }

    /// 現在の制約に一致する表記があるかどうかを返します。
    pub fn is_exists(&self) -> bool {
        self.current_value(None, false, true).is_some()
    }

    /// 呼び出し側の表記だけで一致するかどうかを返します。
    pub fn is_custom_match(&self) -> bool {
        self.current_value(None, false, false).is_some()
    }

    /// 現在の表記が持つ素性の値を返します。
    pub fn feature_value(&self, feature: &str) -> Option<&str> {
        self.current_value(None, true, true)
            .and_then(|entry| entry.constraints.get(feature))
            .map(String::as_str)
    }

    /// 表記を返します。
    ///
    /// `reference`が与えられた場合は、その概念と呼応する表記を選択します。
    pub fn display(&self, reference: Option<&dyn ReferencedConcept>) -> Option<&str> {
        self.current_value(reference, true, true)
            .map(|entry| entry.display.as_str())
    }
}

impl PartialEq for PronounConcept {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
            && self.customized == other.customized
            && self.default_constraints == other.default_constraints
            && self.default_index == other.default_index
            && self.constraints == other.constraints
    }
}

impl ReferencedConcept for PronounConcept {
    fn display_string(&self) -> Option<String> {
        self.display(None).map(str::to_string)
    }

    fn feature_value(&self, feature: &str) -> Option<String> {
        PronounConcept::feature_value(self, feature).map(str::to_string)
    }
}
