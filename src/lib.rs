//! # i18n_harvest
//!
//! 从 HTML 文档树中提取可本地化的文本片段，按书写系统分类，生成稳定的去重键，
//! 并增量合并到持久化的“键 → 各语言文本”映射中。
//!
//! ## 模块组织
//!
//! - `core` - 文档加载与一次性提取入口
//! - `extraction` - 提取引擎、变更观察、高亮层、导出与翻译补全
//! - `parsers` - HTML 解析、DOM 操作与内联样式解析
//! - `env` - 环境变量
//! - `error` - 统一错误类型

pub mod core;
pub mod env;
pub mod error;
pub mod extraction;
pub mod parsers;

pub use crate::core::{harvest_document, load_document, read_document, HarvestOptions};
pub use error::{HarvestError, HarvestResult};
pub use extraction::*;
