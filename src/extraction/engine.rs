//! 提取引擎
//!
//! `ExtractionContext` 是每个文档一份的显式上下文，持有翻译库、已处理集合、
//! 当前请求的语言和最近一次统计。所有入口（整页提取、变更批次、统计查询）
//! 都需要 `&mut self`，因此同一文档上的两次处理不可能重叠。
//!
//! 一次提取过程：
//!
//! 1. 从存储加载翻译库（不存在视为空），重放尚未持久化的记录
//! 2. 遍历根节点下（含 Shadow Root）的文本叶子
//! 3. 对未处理且可提取的叶子生成键、写入语言字段、标记为已处理
//! 4. 整体替换写回存储
//! 5. 重新计算统计
//!
//! 第 1、4 步的失败会中止本次过程并记录日志，不会向调用方抛出。

use std::rc::Rc;

use markup5ever_rcdom::{Handle, NodeData};
use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, HarvestResult};
use crate::extraction::config::constants;
use crate::extraction::language::LanguageSet;
use crate::extraction::pipeline::classifier;
use crate::extraction::pipeline::keys::KeyDialect;
use crate::extraction::pipeline::selector::{count_text_leaves, text_leaves, TextLeaf};
use crate::extraction::processed::ProcessedSet;
use crate::extraction::storage::Storage;
use crate::extraction::store::TranslationStore;
use crate::extraction::watcher::MutationRecord;
use crate::parsers::html::dom::get_body;

/// 进度统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// 至少带有一个语言字段的条目数
    pub processed_count: usize,
    /// 当前可发现的合格叶子数减去已处理条目数（不小于 0）
    pub remaining_count: usize,
}

impl Stats {
    pub fn compute(total_candidates: usize, processed_count: usize) -> Self {
        Self {
            processed_count,
            remaining_count: total_candidates.saturating_sub(processed_count),
        }
    }
}

/// 单次处理（整页提取或变更批次）的明细
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// 遍历到的候选叶子数
    pub candidates: usize,
    /// 本次新标记为已处理的叶子数
    pub processed_leaves: usize,
    /// 新建的条目数
    pub entries_created: usize,
    /// 写入的语言字段数
    pub fields_written: usize,
    /// 不可提取而跳过的叶子数（未标记，之后仍可处理）
    pub skipped_invalid: usize,
    /// 生成的键为空而跳过的叶子数
    pub skipped_empty_key: usize,
    /// 此前已处理过的叶子数
    pub already_processed: usize,
    /// 处理结束后的统计
    pub stats: Stats,
    /// 导致本次处理中止的错误
    pub error: Option<HarvestError>,
}

impl PassReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// 尚未持久化的一次写入，加载新的翻译库后按顺序重放
#[derive(Debug, Clone)]
struct PendingRecord {
    key: String,
    text: String,
    languages: LanguageSet,
}

/// 每个文档一份的提取上下文
pub struct ExtractionContext {
    body: Handle,
    storage: Rc<dyn Storage>,
    storage_key: String,
    source_url: Option<String>,
    key_dialect: KeyDialect,
    store: TranslationStore,
    processed: ProcessedSet,
    requested: Option<LanguageSet>,
    pending: Vec<PendingRecord>,
    stats: Stats,
}

impl ExtractionContext {
    /// 以 BODY（或任意子树根）创建上下文
    pub fn new(body: Handle, storage: Rc<dyn Storage>) -> Self {
        Self {
            body,
            storage,
            storage_key: constants::STORE_KEY.to_string(),
            source_url: None,
            key_dialect: KeyDialect::Extraction,
            store: TranslationStore::new(),
            processed: ProcessedSet::new(),
            requested: None,
            pending: Vec::new(),
            stats: Stats::default(),
        }
    }

    /// 以整个文档创建上下文，自动定位 BODY
    pub fn for_document(document: &Handle, storage: Rc<dyn Storage>) -> HarvestResult<Self> {
        let body = get_body(document)
            .ok_or_else(|| HarvestError::Traversal("文档中没有 BODY 元素".to_string()))?;
        Ok(Self::new(body, storage))
    }

    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = Some(source_url.into());
        self
    }

    pub fn with_storage_key(mut self, storage_key: impl Into<String>) -> Self {
        self.storage_key = storage_key.into();
        self
    }

    pub fn with_key_dialect(mut self, key_dialect: KeyDialect) -> Self {
        self.key_dialect = key_dialect;
        self
    }

    pub fn body(&self) -> &Handle {
        &self.body
    }

    pub fn storage(&self) -> Rc<dyn Storage> {
        Rc::clone(&self.storage)
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn store(&self) -> &TranslationStore {
        &self.store
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    /// 最近一次提取请求的语言，尚未提取时为 `None`
    pub fn requested(&self) -> Option<LanguageSet> {
        self.requested
    }

    /// 是否有尚未写回存储的记录
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// 最近一次计算的统计
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// 按当前 DOM 与内存中的翻译库重新计算统计
    pub fn get_stats(&mut self) -> Stats {
        self.refresh_stats();
        self.stats
    }

    /// 对整个 BODY 执行一次提取
    pub async fn extract_page(&mut self, requested: LanguageSet) -> PassReport {
        let body = self.body.clone();
        self.run_extraction(&body, requested).await
    }

    /// 对指定根节点执行一次提取
    ///
    /// 失败时记录日志并返回带有 `error` 的报告，不会向调用方抛出。
    pub async fn run_extraction(&mut self, root: &Handle, requested: LanguageSet) -> PassReport {
        self.requested = Some(requested);
        let mut report = PassReport::default();

        tracing::info!("开始提取，请求语言: {}", requested);

        match self.run_pass(root, requested, &mut report).await {
            Ok(()) => {
                self.refresh_stats();
                tracing::info!(
                    "提取完成: 候选 {}，新处理 {}，新建条目 {}，已处理条目 {}，剩余 {}",
                    report.candidates,
                    report.processed_leaves,
                    report.entries_created,
                    self.stats.processed_count,
                    self.stats.remaining_count
                );
            }
            Err(e) => {
                tracing::error!("提取过程中止: {}", e);
                report.error = Some(e);
            }
        }

        report.stats = self.stats;
        report
    }

    async fn run_pass(
        &mut self,
        root: &Handle,
        requested: LanguageSet,
        report: &mut PassReport,
    ) -> HarvestResult<()> {
        let pruned = self.processed.prune();
        if pruned > 0 {
            tracing::debug!("清理已释放的节点记录: {}", pruned);
        }

        self.load_store().await?;

        for leaf in text_leaves(root) {
            self.process_leaf(&leaf, requested, report);
        }

        self.persist_store().await
    }

    /// 处理一个候选叶子（整页提取与变更批次共用）
    fn process_leaf(&mut self, leaf: &TextLeaf, requested: LanguageSet, report: &mut PassReport) {
        report.candidates += 1;

        if self.processed.contains(&leaf.node) {
            report.already_processed += 1;
            return;
        }

        let analysis = classifier::analyze(&leaf.text, requested);
        if !analysis.is_eligible() {
            tracing::trace!("跳过文本 {:?}: {:?}", analysis.trimmed, analysis.rejection);
            report.skipped_invalid += 1;
            return;
        }

        let key = self.key_dialect.make(&analysis.trimmed);
        if key.is_empty() {
            tracing::debug!("文本 {:?} 生成的键为空，跳过", analysis.trimmed);
            report.skipped_empty_key += 1;
            return;
        }

        let languages = analysis.scripts.intersection(requested);
        let outcome = self.store.record(
            &key,
            &analysis.trimmed,
            languages,
            self.source_url.as_deref(),
        );
        self.pending.push(PendingRecord {
            key,
            text: analysis.trimmed,
            languages,
        });

        self.processed.mark(&leaf.node);
        report.processed_leaves += 1;
        report.fields_written += outcome.fields_written;
        if outcome.created {
            report.entries_created += 1;
        }
    }

    /// 处理一批 DOM 变更
    ///
    /// 新插入的元素节点以自身为根重新选择叶子，走与整页提取相同的判定与合并路径，
    /// 叶子同步标记为已处理。结果只写入内存，由下一次提取或 `flush` 持久化。
    /// 在第一次提取设定请求语言之前不做任何处理。
    pub fn on_mutation_batch(&mut self, records: &[MutationRecord]) -> PassReport {
        let mut report = PassReport::default();

        let requested = match self.requested {
            Some(requested) => requested,
            None => {
                tracing::trace!("尚未设定提取语言，忽略 {} 条变更", records.len());
                report.stats = self.stats;
                return report;
            }
        };

        for record in records {
            match record {
                MutationRecord::ChildList { added, .. } => {
                    for node in added {
                        if !matches!(node.data, NodeData::Element { .. }) {
                            continue;
                        }
                        for leaf in text_leaves(node) {
                            self.process_leaf(&leaf, requested, &mut report);
                        }
                    }
                }
                MutationRecord::CharacterData { .. } => {
                    tracing::trace!("忽略文本内容变更");
                }
            }
        }

        if report.processed_leaves > 0 {
            tracing::debug!(
                "变更批次处理了 {} 个叶子，待写回 {} 条记录",
                report.processed_leaves,
                self.pending.len()
            );
        }

        self.refresh_stats();
        report.stats = self.stats;
        report
    }

    /// 把尚未持久化的记录写回存储，没有待写记录时返回 `false`
    pub async fn flush(&mut self) -> HarvestResult<bool> {
        if self.pending.is_empty() {
            return Ok(false);
        }
        self.load_store().await?;
        self.persist_store().await?;
        self.refresh_stats();
        Ok(true)
    }

    /// 从存储重新加载翻译库（未写回的记录会重放到新加载的库上）
    pub async fn reload(&mut self) -> HarvestResult<Stats> {
        self.load_store().await?;
        self.refresh_stats();
        Ok(self.stats)
    }

    /// 显式重置：删除存储中的翻译库并清空内存中的条目
    ///
    /// 已处理集合保持不变，已处理过的节点不会被重新读取。
    pub async fn clear_data(&mut self) -> HarvestResult<()> {
        self.storage.remove(&[self.storage_key.as_str()]).await?;
        self.store.clear();
        self.pending.clear();
        self.refresh_stats();
        tracing::info!("已清除翻译数据");
        Ok(())
    }

    /// 切换到新文档：丢弃所有尚未持久化的内存状态
    pub fn reset_document(&mut self, body: Handle) {
        if !self.pending.is_empty() {
            tracing::warn!("切换文档，丢弃 {} 条未写回的记录", self.pending.len());
        }
        self.body = body;
        self.store.clear();
        self.processed.clear();
        self.pending.clear();
        self.requested = None;
        self.stats = Stats::default();
    }

    async fn load_store(&mut self) -> HarvestResult<()> {
        let value = self
            .storage
            .get(&self.storage_key)
            .await
            .map_err(|e| e.with_context("读取翻译库"))?;
        let mut store = TranslationStore::from_value(value)?;

        for record in &self.pending {
            store.record(
                &record.key,
                &record.text,
                record.languages,
                self.source_url.as_deref(),
            );
        }

        self.store = store;
        Ok(())
    }

    async fn persist_store(&mut self) -> HarvestResult<()> {
        let value = self.store.to_value()?;
        self.storage
            .set(&self.storage_key, value)
            .await
            .map_err(|e| e.with_context("写入翻译库"))?;
        self.pending.clear();
        Ok(())
    }

    fn refresh_stats(&mut self) {
        let total = count_text_leaves(&self.body);
        self.stats = Stats::compute(total, self.store.processed_count());
    }
}
