//! 键生成模块
//!
//! 把文本片段映射为短小、稳定的键。不同片段规范化后得到相同的键时
//! 视为同一条目，这正是去重机制。
//!
//! 三种方言并存，互不兼容：
//!
//! - `Extraction`：提取引擎使用，保留韩文、假名、汉字，`_` 分隔，最长 50 字符
//! - `Overlay`：高亮层使用，只保留 ASCII 字母数字，`-` 分隔，不截断
//! - `Slug`：只保留 ASCII 字母数字，`_` 分隔，不截断

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::HarvestError;
use crate::extraction::config::constants;

static EXTRACTION_DISALLOWED: OnceLock<Regex> = OnceLock::new();
static ASCII_DISALLOWED: OnceLock<Regex> = OnceLock::new();

fn extraction_disallowed() -> &'static Regex {
    EXTRACTION_DISALLOWED.get_or_init(|| {
        Regex::new(r"[^a-z0-9\x{AC00}-\x{D7A3}\x{3041}-\x{3093}\x{30A1}-\x{30F3}\x{4E00}-\x{9FAF}]+")
            .unwrap_or_else(|_| unreachable!("静态正则表达式无效"))
    })
}

fn ascii_disallowed() -> &'static Regex {
    ASCII_DISALLOWED
        .get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap_or_else(|_| unreachable!("静态正则表达式无效")))
}

/// 键生成方言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDialect {
    #[default]
    Extraction,
    Overlay,
    Slug,
}

impl KeyDialect {
    pub fn make(self, text: &str) -> String {
        match self {
            KeyDialect::Extraction => make_key(text),
            KeyDialect::Overlay => overlay_key(text),
            KeyDialect::Slug => slug_key(text),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyDialect::Extraction => "extraction",
            KeyDialect::Overlay => "overlay",
            KeyDialect::Slug => "slug",
        }
    }
}

impl fmt::Display for KeyDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyDialect {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extraction" => Ok(KeyDialect::Extraction),
            "overlay" => Ok(KeyDialect::Overlay),
            "slug" => Ok(KeyDialect::Slug),
            other => Err(HarvestError::InvalidInput(format!("未知的键方言: {}", other))),
        }
    }
}

/// 提取引擎的键：小写化，非允许字符的连续段替换为单个 `_`，
/// 去掉首尾 `_` 后截断到 50 个字符。
///
/// # 示例
///
/// ```
/// use i18n_harvest::extraction::pipeline::keys::make_key;
///
/// assert_eq!(make_key("  Hello, World! "), "hello_world");
/// assert_eq!(make_key("안녕하세요 여러분"), "안녕하세요_여러분");
/// ```
pub fn make_key(text: &str) -> String {
    let lowered = text.to_lowercase();
    let replaced = extraction_disallowed().replace_all(&lowered, "_");
    replaced
        .trim_matches(constants::KEY_SEPARATOR)
        .chars()
        .take(constants::MAX_KEY_LENGTH)
        .collect()
}

/// 高亮层的键：只保留 ASCII 字母数字，其余连续段替换为 `-`
pub fn overlay_key(text: &str) -> String {
    let lowered = text.to_lowercase();
    ascii_disallowed()
        .replace_all(&lowered, "-")
        .trim_matches(constants::OVERLAY_KEY_SEPARATOR)
        .to_string()
}

/// ASCII 形式的键，用 `_` 分隔
pub fn slug_key(text: &str) -> String {
    let lowered = text.to_lowercase();
    ascii_disallowed()
        .replace_all(&lowered, "_")
        .trim_matches(constants::KEY_SEPARATOR)
        .to_string()
}
