//! 多语言文本提取
//!
//! ## 模块组织
//!
//! - `pipeline` - 文本选择、分类与键生成
//! - `engine` - 每个文档一份的提取上下文
//! - `watcher` - DOM 变更记录
//! - `overlay` - 高亮标注层
//! - `store` / `storage` - 翻译库数据模型与持久化后端
//! - `export` - 按语言导出
//! - `translate` - 机器翻译补全
//! - `agent` - 消息分发
//! - `config` - 配置管理

pub mod agent;
pub mod config;
pub mod engine;
pub mod export;
pub mod language;
pub mod overlay;
pub mod pipeline;
pub mod processed;
pub mod storage;
pub mod store;
pub mod translate;
pub mod watcher;

pub use agent::{PageAgent, Request, Response};
pub use config::{ConfigManager, HarvestConfig};
pub use engine::{ExtractionContext, PassReport, Stats};
pub use export::{export_by_language, export_files, write_to_dir, ExportFile, LanguageExport};
pub use language::{Language, LanguageSet};
pub use overlay::HighlightOverlay;
pub use processed::ProcessedSet;
pub use storage::{MemoryStorage, RedbStorage, Storage};
pub use store::{MergeOutcome, TranslationEntry, TranslationStore};
pub use translate::{translate_page, translate_store, GoogleTranslator, TranslateReport, Translator};
pub use watcher::{MutationRecord, MutationWatcher};
