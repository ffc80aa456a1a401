//! 文本提取流水线
//!
//! 选择器产出文本叶子，分类器判断是否可提取以及属于哪些书写系统，
//! 键生成器把文本规范化为去重键。三者都是无状态的纯函数。

pub mod classifier;
pub mod keys;
pub mod selector;

pub use classifier::{analyze, detect_scripts, is_eligible, is_valid_for, Rejection, TextAnalysis};
pub use keys::{make_key, overlay_key, slug_key, KeyDialect};
pub use selector::{
    count_text_leaves, scan_text_nodes, text_leaves, ScannedText, SkipReason, TextLeaf,
};
