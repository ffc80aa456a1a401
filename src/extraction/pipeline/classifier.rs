//! 文本分类器模块
//!
//! 判断文本片段是否为真实的自然语言内容，并检测其中出现的书写系统

use std::sync::OnceLock;

use regex::Regex;

use crate::extraction::config::constants;
use crate::extraction::language::{Language, LanguageSet};

/// 文本被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// 去除首尾空白后为空
    Empty,
    /// 只包含数字
    DigitsOnly,
    /// 只包含固定集合中的标点
    PunctuationOnly,
    /// 形如程序标识符（例如 `backgroundColor`）
    IdentifierLike,
    /// 未检测到任何请求的书写系统
    NoRequestedScript,
}

/// 单个文本片段的分析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextAnalysis {
    pub trimmed: String,
    pub scripts: LanguageSet,
    pub rejection: Option<Rejection>,
}

impl TextAnalysis {
    pub fn is_eligible(&self) -> bool {
        self.rejection.is_none()
    }
}

/// 正则表达式缓存
struct RegexCache {
    digits_only: OnceLock<Regex>,
    identifier_like: OnceLock<Regex>,
    hangul: OnceLock<Regex>,
    latin: OnceLock<Regex>,
    japanese: OnceLock<Regex>,
}

static REGEX_CACHE: RegexCache = RegexCache {
    digits_only: OnceLock::new(),
    identifier_like: OnceLock::new(),
    hangul: OnceLock::new(),
    latin: OnceLock::new(),
    japanese: OnceLock::new(),
};

fn cached<'a>(cell: &'a OnceLock<Regex>, pattern: &str) -> &'a Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap_or_else(|_| unreachable!("静态正则表达式无效: {}", pattern)))
}

fn digits_only() -> &'static Regex {
    cached(&REGEX_CACHE.digits_only, r"^[0-9]+$")
}

fn is_punctuation_only(trimmed: &str) -> bool {
    trimmed.chars().all(|c| constants::PUNCTUATION_SET.contains(c))
}

fn identifier_like() -> &'static Regex {
    cached(&REGEX_CACHE.identifier_like, r"^[a-zA-Z]+[A-Z][a-zA-Z]*$")
}

fn script_regex(language: Language) -> &'static Regex {
    match language {
        Language::Ko => cached(
            &REGEX_CACHE.hangul,
            r"[\x{3131}-\x{314E}\x{314F}-\x{3163}\x{AC00}-\x{D7A3}]",
        ),
        Language::En => cached(&REGEX_CACHE.latin, r"[a-zA-Z]"),
        Language::Ja => cached(
            &REGEX_CACHE.japanese,
            r"[\x{3040}-\x{309F}\x{30A0}-\x{30FF}\x{4E00}-\x{9FAF}]",
        ),
    }
}

/// 检查文本是否为可提取的真实内容（与请求的语言无关）
pub fn is_eligible(text: &str) -> bool {
    eligibility(text.trim()).is_none()
}

fn eligibility(trimmed: &str) -> Option<Rejection> {
    if trimmed.is_empty() {
        return Some(Rejection::Empty);
    }
    if digits_only().is_match(trimmed) {
        return Some(Rejection::DigitsOnly);
    }
    if is_punctuation_only(trimmed) {
        return Some(Rejection::PunctuationOnly);
    }
    if identifier_like().is_match(trimmed) {
        return Some(Rejection::IdentifierLike);
    }
    None
}

/// 检测文本中出现的书写系统（独立判断，可以同时属于多个）
pub fn detect_scripts(text: &str) -> LanguageSet {
    Language::ALL
        .into_iter()
        .filter(|language| script_regex(*language).is_match(text))
        .collect()
}

/// 在请求的语言集合下，文本是否可提取
pub fn is_valid_for(text: &str, requested: LanguageSet) -> bool {
    analyze(text, requested).is_eligible()
}

/// 完整分析文本片段
pub fn analyze(text: &str, requested: LanguageSet) -> TextAnalysis {
    let trimmed = text.trim();
    let scripts = detect_scripts(trimmed);
    let rejection = eligibility(trimmed).or_else(|| {
        if scripts.intersects(requested) {
            None
        } else {
            Some(Rejection::NoRequestedScript)
        }
    });

    TextAnalysis {
        trimmed: trimmed.to_string(),
        scripts,
        rejection,
    }
}
