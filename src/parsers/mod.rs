//! # 解析器模块
//!
//! 文档解析与 DOM 操作：
//!
//! - HTML解析和DOM操作
//! - 内联样式解析
//!
//! # 模块组织
//!
//! - `html` - HTML文档解析、DOM操作、Shadow Root、序列化

pub mod html;

pub use html::{get_body, html_to_dom, serialize_document};
