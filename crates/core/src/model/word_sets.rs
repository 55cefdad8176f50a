use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::level::Level;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WordSetsError {
    #[error("word set for level {0} is empty")]
    EmptyLevel(Level),
}

/// Words to practice, one list per difficulty level.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WordSets {
    #[serde(rename = "A", default)]
    a: Vec<String>,
    #[serde(rename = "B", default)]
    b: Vec<String>,
    #[serde(rename = "C", default)]
    c: Vec<String>,
}

impl WordSets {
    /// Build word sets, trimming entries and dropping blanks.
    ///
    /// # Errors
    ///
    /// Returns `WordSetsError::EmptyLevel` if any level ends up with no words.
    pub fn new<S: Into<String>>(
        a: impl IntoIterator<Item = S>,
        b: impl IntoIterator<Item = S>,
        c: impl IntoIterator<Item = S>,
    ) -> Result<Self, WordSetsError> {
        Self {
            a: a.into_iter().map(Into::into).collect(),
            b: b.into_iter().map(Into::into).collect(),
            c: c.into_iter().map(Into::into).collect(),
        }
        .validate()
    }

    /// Normalize and check an unvalidated value (e.g. decoded from JSON).
    ///
    /// # Errors
    ///
    /// Returns `WordSetsError::EmptyLevel` if any level has no usable words.
    pub fn validate(mut self) -> Result<Self, WordSetsError> {
        for level in Level::ALL {
            let words = self.words_mut(level);
            let cleaned: Vec<String> = words
                .drain(..)
                .map(|word| word.trim().to_owned())
                .filter(|word| !word.is_empty())
                .collect();
            if cleaned.is_empty() {
                return Err(WordSetsError::EmptyLevel(level));
            }
            *words = cleaned;
        }
        Ok(self)
    }

    #[must_use]
    pub fn words(&self, level: Level) -> &[String] {
        match level {
            Level::A => &self.a,
            Level::B => &self.b,
            Level::C => &self.c,
        }
    }

    fn words_mut(&mut self, level: Level) -> &mut Vec<String> {
        match level {
            Level::A => &mut self.a,
            Level::B => &mut self.b,
            Level::C => &mut self.c,
        }
    }

    /// Built-in Traditional Chinese word sets for offline play.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            a: to_owned(&["蘋果", "學校", "老師", "朋友", "爸爸", "媽媽", "小貓", "太陽", "花朵", "書包"]),
            b: to_owned(&["圖書館", "蝴蝶", "電腦", "游泳池", "公園", "巴士站", "動物園", "消防員", "雪糕", "天文台"]),
            c: to_owned(&["興高采烈", "一心一意", "自言自語", "五顏六色", "手舞足蹈", "井井有條", "專心致志", "津津有味", "與眾不同", "全神貫注"]),
        }
    }
}

fn to_owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_and_drops_blanks() {
        let sets = WordSets::new([" 蘋果 ", ""], ["蝴蝶"], ["興高采烈", "  "]).unwrap();
        assert_eq!(sets.words(Level::A), ["蘋果".to_owned()]);
        assert_eq!(sets.words(Level::C).len(), 1);
    }

    #[test]
    fn empty_level_is_rejected() {
        let err = WordSets::new(["蘋果"], ["  "], ["興高采烈"]).unwrap_err();
        assert_eq!(err, WordSetsError::EmptyLevel(Level::B));
    }

    #[test]
    fn decodes_classifier_shape() {
        let sets: WordSets =
            serde_json::from_str(r#"{"A":["學校"],"B":["圖書館"],"C":["一心一意"]}"#).unwrap();
        let sets = sets.validate().unwrap();
        assert_eq!(sets.words(Level::B), ["圖書館".to_owned()]);

        let missing: WordSets = serde_json::from_str(r#"{"A":["學校"],"B":["圖書館"]}"#).unwrap();
        assert_eq!(missing.validate().unwrap_err(), WordSetsError::EmptyLevel(Level::C));
    }

    #[test]
    fn builtin_sets_are_valid() {
        let sets = WordSets::builtin();
        assert_eq!(sets.clone().validate().unwrap(), sets);
    }
}
