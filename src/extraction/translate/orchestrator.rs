//! 翻译库补全
//!
//! 先按韩文提取，再对每个带韩文的条目依次请求英文和日文译文。
//! 英文译文原样作为新键；新键已存在时跳过，不覆盖已有翻译。
//! 全部请求顺序执行，不重试，结束后整体写回一次。

use serde::Serialize;
use tracing::{debug, info, warn};

use super::Translator;
use crate::error::{HarvestError, HarvestResult};
use crate::extraction::engine::{ExtractionContext, PassReport};
use crate::extraction::language::{Language, LanguageSet};
use crate::extraction::storage::Storage;
use crate::extraction::store::{TranslationEntry, TranslationStore};

/// 一次补全的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateReport {
    /// 带非空韩文的条目数
    pub candidates: usize,
    /// 新增的三语条目数
    pub created: usize,
    /// 新键已存在而跳过的条目数
    pub skipped_existing: usize,
    /// 英文译文为空而跳过的条目数
    pub skipped_empty_key: usize,
    /// 发出的翻译请求数
    pub requests: usize,
}

/// 对存储中的翻译库执行补全
pub async fn translate_store(
    storage: &dyn Storage,
    storage_key: &str,
    translator: &dyn Translator,
) -> HarvestResult<TranslateReport> {
    let mut store = TranslationStore::from_value(
        storage
            .get(storage_key)
            .await
            .map_err(|e| e.with_context("读取翻译库"))?,
    )?;
    let mut report = TranslateReport::default();

    let korean: Vec<TranslationEntry> = store
        .iter()
        .filter(|(_, entry)| entry.ko.as_deref().map_or(false, |ko| !ko.trim().is_empty()))
        .map(|(_, entry)| entry.clone())
        .collect();
    report.candidates = korean.len();
    info!("开始补全翻译，共 {} 个韩文条目", report.candidates);

    for (index, entry) in korean.iter().enumerate() {
        let Some(ko) = entry.ko.as_deref() else {
            continue;
        };

        let en = translator.translate(ko, Language::Ko, Language::En).await;
        report.requests += 1;

        if en.trim().is_empty() {
            warn!("韩文 {:?} 的英文译文为空，跳过", ko);
            report.skipped_empty_key += 1;
            continue;
        }
        let key = en.clone();
        if store.contains_key(&key) {
            debug!("键 {} 已存在，跳过", key);
            report.skipped_existing += 1;
            continue;
        }

        let ja = translator.translate(ko, Language::Ko, Language::Ja).await;
        report.requests += 1;

        let mut translated = TranslationEntry::with_source(entry.source_url.as_deref());
        translated.set(Language::Ko, ko);
        translated.set(Language::En, en);
        translated.set(Language::Ja, ja);
        store.insert(key, translated);
        report.created += 1;

        debug!("翻译进度 {}/{}", index + 1, report.candidates);
    }

    storage
        .set(storage_key, store.to_value()?)
        .await
        .map_err(|e| e.with_context("写回翻译库"))?;

    info!(
        "翻译补全完成: 新增 {}，已存在 {}，请求 {} 次",
        report.created, report.skipped_existing, report.requests
    );
    Ok(report)
}

/// 提取韩文后补全翻译，并刷新上下文中的翻译库
pub async fn translate_page(
    context: &mut ExtractionContext,
    translator: &dyn Translator,
) -> HarvestResult<(PassReport, TranslateReport)> {
    let pass = context
        .extract_page(LanguageSet::single(Language::Ko))
        .await;
    if let Some(e) = &pass.error {
        return Err(HarvestError::Storage(format!("韩文提取失败: {}", e)));
    }

    let storage = context.storage();
    let report = translate_store(storage.as_ref(), context.storage_key(), translator).await?;
    context.reload().await?;

    Ok((pass, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::storage::MemoryStorage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::cell::RefCell;

    /// 按固定表翻译，并记录请求
    struct TableTranslator {
        calls: RefCell<Vec<(String, Language)>>,
    }

    impl TableTranslator {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    #[async_trait(?Send)]
    impl Translator for TableTranslator {
        async fn translate(&self, text: &str, _from: Language, to: Language) -> String {
            self.calls.borrow_mut().push((text.to_string(), to));
            match (text, to) {
                ("저장", Language::En) => "Save".to_string(),
                ("저장", Language::Ja) => "保存".to_string(),
                ("취소", Language::En) => "Cancel".to_string(),
                ("취소", Language::Ja) => "キャンセル".to_string(),
                _ => text.to_string(),
            }
        }
    }

    #[tokio::test]
    async fn test_translate_store_creates_trilingual_entries() {
        let storage = MemoryStorage::with_value(
            "translations",
            json!({
                "저장": {"ko": "저장", "sourceUrl": "https://a.test/"},
                "Cancel": {"en": "Cancel"},
                "취소": {"ko": "취소"},
                "blank": {"ko": "  "}
            }),
        );
        let translator = TableTranslator::new();

        let report = translate_store(&storage, "translations", &translator)
            .await
            .unwrap();

        assert_eq!(report.candidates, 2);
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped_existing, 1);
        // 취소 的英文 Cancel 已是现有键，只请求了英文
        assert_eq!(report.requests, 3);

        let saved = storage.snapshot("translations").unwrap();
        assert_eq!(
            saved["Save"],
            json!({"ko": "저장", "en": "Save", "ja": "保存", "sourceUrl": "https://a.test/"})
        );
        assert_eq!(saved["Cancel"], json!({"en": "Cancel"}));
        // 新键是译文原文，不经过提取键规则
        assert!(saved.get("save").is_none());
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test]
    async fn test_translate_empty_store_persists_empty_object() {
        let storage = MemoryStorage::new();
        let report = translate_store(&storage, "translations", &TableTranslator::new())
            .await
            .unwrap();
        assert_eq!(report, TranslateReport::default());
        assert_eq!(storage.snapshot("translations"), Some(json!({})));
    }
}
