//! 翻译库数据模型
//!
//! `TranslationStore` 是键到 `TranslationEntry` 的完整映射，序列化为扁平 JSON 对象：
//!
//! ```json
//! { "안녕하세요": { "ko": "안녕하세요", "sourceUrl": "https://example.com/" } }
//! ```
//!
//! 条目字段只会被添加或覆盖，提取过程中从不清除；键只能被显式重置删除。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HarvestError, HarvestResult};
use crate::extraction::language::{Language, LanguageSet};

/// 单个键对应的各语言文本与来源
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ko: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ja: Option<String>,
    #[serde(
        rename = "sourceUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_url: Option<String>,
    /// 存储中出现的未知字段，原样保留
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TranslationEntry {
    /// 只带来源地址的新条目
    pub fn with_source(source_url: Option<&str>) -> Self {
        Self {
            source_url: source_url.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn get(&self, language: Language) -> Option<&str> {
        match language {
            Language::Ko => self.ko.as_deref(),
            Language::En => self.en.as_deref(),
            Language::Ja => self.ja.as_deref(),
        }
    }

    pub fn set(&mut self, language: Language, text: impl Into<String>) {
        let slot = match language {
            Language::Ko => &mut self.ko,
            Language::En => &mut self.en,
            Language::Ja => &mut self.ja,
        };
        *slot = Some(text.into());
    }

    /// 已设置的语言字段（空字符串也算已设置）
    pub fn languages(&self) -> LanguageSet {
        Language::ALL
            .into_iter()
            .filter(|language| self.get(*language).is_some())
            .collect()
    }

    /// 是否至少带有一个语言字段
    pub fn has_language(&self) -> bool {
        !self.languages().is_empty()
    }
}

/// 一次写入的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// 是否新建了条目
    pub created: bool,
    /// 写入的语言字段数
    pub fields_written: usize,
}

/// 键到条目的完整映射
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationStore {
    entries: BTreeMap<String, TranslationEntry>,
}

impl TranslationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从存储中读出的 JSON 值构建，`None` 视为空映射
    pub fn from_value(value: Option<Value>) -> HarvestResult<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::new()),
            Some(value @ Value::Object(_)) => Ok(serde_json::from_value(value)?),
            Some(other) => Err(HarvestError::Serialization(format!(
                "翻译库必须是 JSON 对象，实际为: {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn to_value(&self) -> HarvestResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&TranslationEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TranslationEntry)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// 插入或替换整个条目
    pub fn insert(&mut self, key: impl Into<String>, entry: TranslationEntry) {
        self.entries.insert(key.into(), entry);
    }

    /// 记录一次文本出现
    ///
    /// 键不存在时先创建只带来源地址的条目，然后把 `languages` 中的每个语言字段
    /// 设为 `text`（后写者胜出）。
    pub fn record(
        &mut self,
        key: &str,
        text: &str,
        languages: LanguageSet,
        source_url: Option<&str>,
    ) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        let entry = self.entries.entry(key.to_string()).or_insert_with(|| {
            outcome.created = true;
            TranslationEntry::with_source(source_url)
        });

        for language in languages.iter() {
            entry.set(language, text);
            outcome.fields_written += 1;
        }

        outcome
    }

    /// 至少带有一个语言字段的条目数
    pub fn processed_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.has_language())
            .count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
