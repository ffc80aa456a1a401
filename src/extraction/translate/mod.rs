//! 机器翻译协作方与翻译库补全流程
//!
//! - `google`: 基于 HTTP 的 `GoogleTranslator`
//! - `orchestrator`: 对韩文条目依次补全英文与日文

pub mod google;
pub mod orchestrator;

use async_trait::async_trait;

use crate::extraction::language::Language;

pub use google::GoogleTranslator;
pub use orchestrator::{translate_page, translate_store, TranslateReport};

/// 翻译协作方
///
/// 实现方不返回错误：任何失败都应回退为原文。
#[async_trait(?Send)]
pub trait Translator {
    async fn translate(&self, text: &str, from: Language, to: Language) -> String;
}
