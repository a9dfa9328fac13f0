use crate::grammeme::GrammemeView;
use crate::matcher::SoundProperties;

use super::build_dictionary;

/// 辞書の基本情報
#[test]
fn test_metadata() {
    let dict = build_dictionary();
    assert_eq!(dict.locale(), "en");
    assert_eq!(dict.num_words(), 12);
    assert_eq!(dict.num_patterns(), 7);
    assert_eq!(dict.grammemes().len(), 17);
    dict.verify().unwrap();
}

/// 単語の性質は大文字の入力でも小文字化して引けます
#[test]
fn test_word_grammemes() {
    let dict = build_dictionary();
    let grammemes = dict.grammemes();
    let expected = grammemes.combine(&["plural", "nominative", "noun"]).unwrap();
    assert_eq!(dict.word_grammemes("geese"), Some(expected));
    assert_eq!(dict.word_grammemes("Geese"), Some(expected));
    assert_eq!(dict.word_grammemes("dog"), None);
}

#[test]
fn test_patterns_for_word() {
    let dict = build_dictionary();
    let patterns = dict.inflection_patterns_for_word("geese").unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].identifier(), "goose");
    assert!(dict.inflection_patterns_for_word("news").unwrap().is_empty());
    assert!(dict.inflection_patterns_for_word("dog").unwrap().is_empty());
}

#[test]
fn test_pattern_by_name() {
    let dict = build_dictionary();
    let pattern = dict.inflection_pattern_by_name("y-ies").unwrap().unwrap();
    assert_eq!(pattern.frequency(), 200);
    assert_eq!(pattern.num_inflections(), 4);
    assert!(pattern.contains_parts_of_speech("noun").unwrap());
    assert!(!pattern.contains_parts_of_speech("verb").unwrap());
    assert_eq!(pattern.lemma_suffixes().collect::<Vec<_>>(), vec!["y"]);
    assert!(dict.inflection_pattern_by_name("missing").unwrap().is_none());
}

#[test]
fn test_pattern_out_of_bounds() {
    let dict = build_dictionary();
    assert!(dict.inflection_pattern(dict.num_patterns()).is_err());
}

/// 同じ接尾辞の行を持つパターンはすべて返されます
#[test]
fn test_patterns_from_suffix() {
    let dict = build_dictionary();
    let mut identifiers: Vec<&str> = dict
        .inflection_patterns_from_suffix("s")
        .unwrap()
        .iter()
        .map(|p| p.identifier())
        .collect();
    identifiers.sort_unstable();
    assert_eq!(identifiers, vec!["regular", "verb-s"]);

    let patterns = dict.inflection_patterns_from_suffix("ies").unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].identifier(), "y-ies");

    assert!(dict.inflection_patterns_from_suffix("xyz").unwrap().is_empty());
}

#[test]
fn test_constrain() {
    let dict = build_dictionary();
    let pattern = dict.inflection_pattern_by_name("regular").unwrap().unwrap();
    let plural: Vec<&str> = pattern
        .constrain(&["plural"], true)
        .unwrap()
        .iter()
        .map(|row| row.suffix())
        .collect();
    assert_eq!(plural, vec!["s", "s'"]);
    assert!(pattern.constrain(&["dual"], true).is_err());
}

/// 見出し語の行だけを持つパターンの変化
#[test]
fn test_reinflect_goose() {
    let dict = build_dictionary();
    let grammemes = dict.grammemes();
    let singular = grammemes.combine(&["singular"]).unwrap();
    let plural = grammemes.combine(&["plural"]).unwrap();
    let pattern = dict.inflection_pattern_by_name("goose-word").unwrap().unwrap();
    assert_eq!(pattern.reinflect(singular, plural, "goose"), "geese");
    assert_eq!(pattern.reinflect(plural, plural, "geese"), "geese");
}

/// 目的の形を持たないパターンは空文字列を返します
#[test]
fn test_reinflect_plurale_tantum() {
    let dict = build_dictionary();
    let grammemes = dict.grammemes();
    let singular = grammemes.combine(&["singular"]).unwrap();
    let plural = grammemes.combine(&["plural"]).unwrap();
    let pattern = dict.inflection_pattern_by_name("scissors").unwrap().unwrap();
    assert_eq!(pattern.reinflect(plural, singular, "scissors"), "");
}

#[test]
fn test_select_lemma_inflection() {
    let dict = build_dictionary();
    let grammemes = dict.grammemes();
    let from = grammemes.combine(&["plural", "genitive"]).unwrap();
    let nominative = grammemes.combine(&["nominative"]).unwrap();
    let singular = grammemes.combine(&["singular"]).unwrap();
    let pattern = dict.inflection_pattern_by_name("y-ies").unwrap().unwrap();
    let lemma = pattern
        .select_lemma_inflection(from, &[nominative, singular])
        .unwrap();
    assert_eq!(lemma.suffix(), "y");
}

/// 語タグが既定の母音判定より優先されます
#[test]
fn test_sound_properties() {
    let dict = build_dictionary();
    assert!(dict.starts_with_vowel("hour"));
    assert!(!dict.starts_with_vowel("university"));
    assert!(dict.starts_with_vowel("apple"));
    assert!(!dict.starts_with_vowel("pear"));
    assert!(dict.ends_with_vowel("city"));
    assert!(!dict.ends_with_vowel("cat"));
}
