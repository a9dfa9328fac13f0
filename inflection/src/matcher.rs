//! 汎用制約マッチャー
//!
//! 候補(表示文字列と制約マップの組)の順序付きリストから、
//! 問い合わせの制約に最もよく一致する候補を選びます。
//! 代名詞の解決と概念の表示値の解決で共有されます。
//!
//! # 例
//!
//! ```
//! use inflection_rkyv::matcher::{
//!     CandidateEntry, CandidateList, ConstraintMap, first_possible_value,
//! };
//!
//! let entries = vec![
//!     CandidateEntry::new("you", [("person", "second")]),
//!     CandidateEntry::new("they", [("person", "third"), ("number", "plural")]),
//! ];
//! let candidates = CandidateList::new(&entries, &[]);
//!
//! let to_map = |pairs: &[(&str, &str)]| -> ConstraintMap {
//!     pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
//! };
//! let empty = ConstraintMap::new();
//!
//! let query = to_map(&[("person", "second")]);
//! let value = first_possible_value(&candidates, &query, &empty, None, false, true);
//! assert_eq!(value.map(|e| e.display.as_str()), Some("you"));
//!
//! // 問い合わせの素性を持たない候補は一致しません。
//! let query = to_map(&[("person", "second"), ("number", "singular")]);
//! let value = first_possible_value(&candidates, &query, &empty, None, false, true);
//! assert!(value.is_none());
//! ```

use std::collections::BTreeMap;

/// 素性名から値への順序付きマップ
///
/// 空の値は「この素性のすべての値に適用される」ワイルドカードを表します。
pub type ConstraintMap = BTreeMap<String, String>;

/// 音韻による一致判定に使用される素性名
pub const SOUND_FEATURE: &str = "sound";

const VOWEL_START: &str = "vowel-start";
const CONSONANT_START: &str = "consonant-start";
const VOWEL_END: &str = "vowel-end";
const CONSONANT_END: &str = "consonant-end";

/// 表示文字列とその制約の組
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    /// 表示文字列
    pub display: String,

    /// この表示文字列に付随する制約
    pub constraints: ConstraintMap,
}

impl CandidateEntry {
    /// 新しい候補を作成します。
    pub fn new<D, I, K, V>(display: D, constraints: I) -> Self
    where
        D: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            display: display.into(),
            constraints: constraints
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// 呼び出し側が与えた候補と、辞書データ由来の既定の候補を連結したリスト
///
/// 呼び出し側の候補が常に先に並びます。
#[derive(Debug, Clone, Copy)]
pub struct CandidateList<'a> {
    customized: &'a [CandidateEntry],
    defaults: &'a [CandidateEntry],
}

impl<'a> CandidateList<'a> {
    pub const fn new(customized: &'a [CandidateEntry], defaults: &'a [CandidateEntry]) -> Self {
        Self {
            customized,
            defaults,
        }
    }

    /// 走査対象の候補数を返します。
    ///
    /// `match_all`が偽の場合は呼び出し側の候補だけを数えます。
    pub fn len(&self, match_all: bool) -> usize {
        if match_all {
            self.customized.len() + self.defaults.len()
        } else {
            self.customized.len()
        }
    }

    /// 候補が1つもないかどうかを返します。
    pub fn is_empty(&self) -> bool {
        self.len(true) == 0
    }

    /// 呼び出し側の候補の数
    pub fn num_customized(&self) -> usize {
        self.customized.len()
    }

    /// `idx`番目の候補を取得します。
    pub fn get(&self, idx: usize) -> Option<&'a CandidateEntry> {
        match idx.checked_sub(self.customized.len()) {
            None => self.customized.get(idx),
            Some(i) => self.defaults.get(i),
        }
    }

    /// すべての候補を順に返すイテレータを取得します。
    pub fn iter(&self) -> impl Iterator<Item = &'a CandidateEntry> {
        self.customized.iter().chain(self.defaults.iter())
    }
}

/// 1つの制約に対する一致の度合い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    /// 素性がないか、値が異なる
    NoMatch,
    /// 素性がワイルドカードとして格納されている
    GenericMatch,
    /// 値が完全に一致する
    FullMatch,
}

/// 候補の制約マップが`name=value`にどの程度一致するかを返します。
pub fn match_state(constraints: &ConstraintMap, name: &str, value: &str) -> MatchState {
    match constraints.get(name) {
        None => MatchState::NoMatch,
        Some(stored) if stored == value => MatchState::FullMatch,
        // Applies to all values, but a later entry may be more specific.
        Some(stored) if stored.is_empty() => MatchState::GenericMatch,
        Some(_) => MatchState::NoMatch,
    }
}

/// 文字列が母音で始まるか、母音で終わるかを判定するインターフェース
pub trait SoundProperties {
    fn starts_with_vowel(&self, text: &str) -> bool;

    fn ends_with_vowel(&self, text: &str) -> bool;
}

/// 既定の母音集合による判定
///
/// 文字と数字以外を読み飛ばし、最初(または最後)の文字を大文字小文字を区別せずに
/// 母音集合と比較します。語末ではさらに`y`も母音として扱います。
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSoundProperties;

// Hangul medial vowels.
const JUNGSEONG_VOWELS: std::ops::RangeInclusive<char> = '\u{1161}'..='\u{1175}';

fn base_letter(c: char) -> char {
    match c {
        'à'..='å' | 'ā' | 'ă' | 'ą' => 'a',
        'è'..='ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ì'..='ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' => 'i',
        'ò'..='ö' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ù'..='ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ý' | 'ÿ' => 'y',
        'ё' => 'е',
        'й' => 'и',
        _ => c,
    }
}

fn is_default_vowel(c: char, with_y: bool) -> bool {
    let c = c.to_lowercase().next().map_or(c, base_letter);
    "aeiouıæœøаеиоуыэюя".contains(c) || JUNGSEONG_VOWELS.contains(&c) || (with_y && c == 'y')
}

impl SoundProperties for DefaultSoundProperties {
    fn starts_with_vowel(&self, text: &str) -> bool {
        text.chars()
            .find(|c| c.is_alphanumeric())
            .is_some_and(|c| is_default_vowel(c, false))
    }

    fn ends_with_vowel(&self, text: &str) -> bool {
        text.chars()
            .rev()
            .find(|c| c.is_alphanumeric())
            .is_some_and(|c| is_default_vowel(c, true))
    }
}

/// 一致判定で参照される別の概念
///
/// 候補の制約キーが`dependency=gender`のように`=`を含む場合、
/// その候補は参照先の概念と一致(呼応)していなければなりません。
pub trait ReferencedConcept {
    /// 参照先の表示文字列
    fn display_string(&self) -> Option<String>;

    /// 参照先の素性の値
    fn feature_value(&self, feature: &str) -> Option<String>;

    /// 音韻による一致判定に使用する判定器
    fn sound_properties(&self) -> &dyn SoundProperties {
        &DefaultSoundProperties
    }
}

fn is_matching_sound(sound: &dyn SoundProperties, display: &str, match_type: &str) -> bool {
    if match_type == CONSONANT_START || match_type == VOWEL_START {
        let vowel = sound.starts_with_vowel(display);
        return !((vowel && match_type == CONSONANT_START) || (!vowel && match_type == VOWEL_START));
    }
    let vowel = sound.ends_with_vowel(display);
    !((vowel && match_type == CONSONANT_END) || (!vowel && match_type == VOWEL_END))
}

fn is_matching_feature(reference: &dyn ReferencedConcept, feature: &str, value: &str) -> bool {
    match reference.feature_value(feature) {
        None => !value.is_empty(),
        Some(actual) => actual == value,
    }
}

/// 参照先の概念との呼応をすべて満たすかどうかを返します。
fn agrees_with(entry: &CandidateEntry, reference: &dyn ReferencedConcept, display: &mut Option<Option<String>>) -> bool {
    for (name, value) in &entry.constraints {
        let Some((_, feature)) = name.split_once('=') else {
            continue;
        };
        let matched = if feature == SOUND_FEATURE {
            match display.get_or_insert_with(|| reference.display_string()) {
                Some(display) => is_matching_sound(reference.sound_properties(), display, value),
                None => true,
            }
        } else {
            is_matching_feature(reference, feature, value)
        };
        if !matched {
            return false;
        }
    }
    true
}

/// 問い合わせの制約に最もよく一致する候補を返します。
///
/// 候補はリストの順に走査されます(`match_all`が偽の場合は呼び出し側の候補のみ)。
/// 問い合わせのすべての制約が少なくとも[`MatchState::GenericMatch`]に達し、
/// `reference`が与えられた場合はその呼応チェックにも合格した候補だけが一致とみなされます。
///
/// 一致した候補のうち、ワイルドカード一致の数が少ないもの、
/// 同数なら満たさない既定制約の数が少ないものが選ばれます(同点は先勝ち)。
/// 両方が0の候補が見つかった時点で走査を終了します。
///
/// 一致がなく`return_default`が真の場合は先頭の候補を返します。
pub fn first_possible_value<'a>(
    candidates: &CandidateList<'a>,
    query: &ConstraintMap,
    defaults: &ConstraintMap,
    reference: Option<&dyn ReferencedConcept>,
    return_default: bool,
    match_all: bool,
) -> Option<&'a CandidateEntry> {
    let mut best: Option<(&'a CandidateEntry, usize, usize)> = None;
    let mut display = None;
    for idx in 0..candidates.len(match_all) {
        let Some(entry) = candidates.get(idx) else {
            break;
        };
        let mut generic = 0;
        let full_match = query.iter().all(|(name, value)| {
            match match_state(&entry.constraints, name, value) {
                MatchState::NoMatch => false,
                MatchState::GenericMatch => {
                    generic += 1;
                    true
                }
                MatchState::FullMatch => true,
            }
        });
        if !full_match || reference.is_some_and(|r| !agrees_with(entry, r, &mut display)) {
            continue;
        }
        let unmatched_defaults = defaults
            .iter()
            .filter(|(name, value)| match_state(&entry.constraints, name, value) == MatchState::NoMatch)
            .count();
        let better = match best {
            None => true,
            Some((_, g, d)) => generic < g || (generic == g && unmatched_defaults < d),
        };
        if better {
            best = Some((entry, generic, unmatched_defaults));
            if generic == 0 && unmatched_defaults == 0 {
                break;
            }
        }
    }
    match best {
        Some((entry, _, _)) => Some(entry),
        None if return_default => candidates.get(0),
        None => None,
    }
}
