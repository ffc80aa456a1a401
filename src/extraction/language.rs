//! 语言代码与语言集合

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, HarvestResult};

/// 支持的语言（按书写系统区分）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// 韩文
    Ko,
    /// 英文（拉丁字母）
    En,
    /// 日文（假名与汉字）
    Ja,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Ko, Language::En, Language::Ja];

    pub fn code(self) -> &'static str {
        match self {
            Language::Ko => "ko",
            Language::En => "en",
            Language::Ja => "ja",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Language::Ko => 0b001,
            Language::En => 0b010,
            Language::Ja => 0b100,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ko" => Ok(Language::Ko),
            "en" => Ok(Language::En),
            "ja" => Ok(Language::Ja),
            other => Err(HarvestError::InvalidInput(format!(
                "不支持的语言代码: {}",
                other
            ))),
        }
    }
}

/// 语言集合，常数时间的插入、查询与求交
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LanguageSet(u8);

impl LanguageSet {
    pub const fn empty() -> Self {
        LanguageSet(0)
    }

    pub fn all() -> Self {
        Language::ALL.into_iter().collect()
    }

    pub fn single(language: Language) -> Self {
        LanguageSet(language.bit())
    }

    /// 严格解析语言代码列表，遇到未知代码时报错
    pub fn parse_codes<S: AsRef<str>>(codes: &[S]) -> HarvestResult<Self> {
        codes
            .iter()
            .map(|code| code.as_ref().parse::<Language>())
            .collect()
    }

    /// 宽松解析语言代码列表，未知代码记录警告后忽略
    pub fn parse_codes_lenient<S: AsRef<str>>(codes: &[S]) -> Self {
        let mut set = LanguageSet::empty();
        for code in codes {
            match code.as_ref().parse::<Language>() {
                Ok(language) => set.insert(language),
                Err(_) => tracing::warn!("忽略未知语言代码: {}", code.as_ref()),
            }
        }
        set
    }

    pub fn insert(&mut self, language: Language) {
        self.0 |= language.bit();
    }

    pub fn contains(self, language: Language) -> bool {
        self.0 & language.bit() != 0
    }

    pub fn intersection(self, other: LanguageSet) -> LanguageSet {
        LanguageSet(self.0 & other.0)
    }

    pub fn intersects(self, other: LanguageSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// 按 `Language::ALL` 的固定顺序遍历
    pub fn iter(self) -> impl Iterator<Item = Language> {
        Language::ALL
            .into_iter()
            .filter(move |language| self.contains(*language))
    }

    pub fn codes(self) -> Vec<&'static str> {
        self.iter().map(Language::code).collect()
    }
}

impl FromIterator<Language> for LanguageSet {
    fn from_iter<I: IntoIterator<Item = Language>>(iter: I) -> Self {
        let mut set = LanguageSet::empty();
        for language in iter {
            set.insert(language);
        }
        set
    }
}

impl fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.codes().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        assert_eq!("KO".parse::<Language>().unwrap(), Language::Ko);
        assert_eq!(Language::Ja.to_string(), "ja");
        assert!("jp".parse::<Language>().is_err());
    }

    #[test]
    fn test_set_operations() {
        let mut set = LanguageSet::single(Language::Ko);
        set.insert(Language::Ja);
        assert!(set.contains(Language::Ko));
        assert!(!set.contains(Language::En));
        assert_eq!(set.len(), 2);
        assert_eq!(set.codes(), vec!["ko", "ja"]);

        let other = LanguageSet::single(Language::En);
        assert!(!set.intersects(other));
        assert!(set.intersection(LanguageSet::all()) == set);
    }

    #[test]
    fn test_lenient_parsing_skips_unknown() {
        let set = LanguageSet::parse_codes_lenient(&["en", "fr", "ja"]);
        assert_eq!(set.codes(), vec!["en", "ja"]);
        assert!(LanguageSet::parse_codes(&["en", "fr"]).is_err());
    }
}
