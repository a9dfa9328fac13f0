use std::sync::Arc;

use crate::dictionary::Dictionary;
use crate::errors::InflectionError;
use crate::matcher::{ConstraintMap, ReferencedConcept, SoundProperties};
use crate::pronoun::{PronounConcept, PronounTable};

use super::build_dictionary;

const PRONOUN_EN: &str = include_str!("./resources/pronoun_en.csv");
const ARTICLES_EN: &str = include_str!("./resources/articles_en.csv");

fn pronouns(dict: &Dictionary) -> Arc<PronounTable> {
    PronounTable::cached("en_US", dict.grammemes(), |locale| {
        (locale == "en").then(|| PRONOUN_EN.to_string())
    })
    .unwrap()
}

/// 辞書の語タグで母音を判定する名詞句
struct NounPhrase<'a> {
    dict: &'a Dictionary,
    text: &'a str,
}

impl ReferencedConcept for NounPhrase<'_> {
    fn display_string(&self) -> Option<String> {
        Some(self.text.to_string())
    }

    fn feature_value(&self, feature: &str) -> Option<String> {
        let grammemes = self.dict.grammemes();
        let mask = self.dict.word_grammemes(self.text)?;
        grammemes
            .names_of(mask & grammemes.category_mask(feature))
            .first()
            .map(|name| name.to_string())
    }

    fn sound_properties(&self) -> &dyn SoundProperties {
        self.dict
    }
}

#[test]
fn test_locale_fallback() {
    let dict = build_dictionary();
    let table = pronouns(&dict);
    assert_eq!(table.len(), 12);
    assert_eq!(table.entries()[0].display, "I");
}

#[test]
fn test_select_by_constraints() {
    let dict = build_dictionary();
    let mut concept = PronounConcept::new(pronouns(&dict), vec![], ConstraintMap::new()).unwrap();
    concept.put_constraint("person", "first");
    concept.put_constraint("number", "plural");
    concept.put_constraint("case", "accusative");
    assert_eq!(concept.display(None), Some("us"));
    assert!(concept.is_exists());
    assert!(!concept.is_custom_match());

    concept.clear_constraint("case");
    assert_eq!(concept.display(None), Some("we"));
}

/// 表記から作った概念は、制約を変えると同じ人称の別の形になります
#[test]
fn test_initial_pronoun() {
    let dict = build_dictionary();
    let mut concept = PronounConcept::from_initial_pronoun(pronouns(&dict), "They").unwrap();
    assert_eq!(concept.display(None), Some("they"));
    assert_eq!(concept.feature_value("number"), Some("plural"));

    concept.put_constraint("case", "accusative");
    assert_eq!(concept.display(None), Some("them"));

    let result = PronounConcept::from_initial_pronoun(pronouns(&dict), "thee");
    assert!(matches!(result, Err(InflectionError::InvalidArgument(_))));
}

/// 冠詞は参照先の名詞句の音で選ばれます
#[test]
fn test_article_agreement() {
    let dict = build_dictionary();
    let articles = PronounTable::parse(ARTICLES_EN, dict.grammemes()).unwrap();
    let article = PronounConcept::new(Arc::new(articles), vec![], ConstraintMap::new()).unwrap();

    let phrase = |text| NounPhrase { dict: &dict, text };
    assert_eq!(article.display(Some(&phrase("apple"))), Some("an"));
    assert_eq!(article.display(Some(&phrase("hour"))), Some("an"));
    assert_eq!(article.display(Some(&phrase("university"))), Some("a"));
    assert_eq!(article.display(Some(&phrase("cat"))), Some("a"));
}

/// 参照先の素性に呼応する表記
#[test]
fn test_feature_agreement() {
    let dict = build_dictionary();
    let table = PronounTable::parse(
        "this,dependency=singular\nthese,dependency=plural\n",
        dict.grammemes(),
    )
    .unwrap();
    let demonstrative = PronounConcept::new(Arc::new(table), vec![], ConstraintMap::new()).unwrap();
    let phrase = |text| NounPhrase { dict: &dict, text };
    assert_eq!(demonstrative.display(Some(&phrase("geese"))), Some("these"));
    assert_eq!(demonstrative.display(Some(&phrase("goose"))), Some("this"));
}
