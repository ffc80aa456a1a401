//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作（解析、属性、节点增删、Shadow Root）
//! - `style`: 内联样式解析，用于判断节点可见性
//! - `serializer`: 序列化功能

pub mod dom;
pub mod serializer;
pub mod style;

pub use dom::{
    append_child, attach_shadow, create_element, create_text, find_elements_by_class,
    find_first_element, get_body,
    get_child_node_by_name, get_head, get_node_attr, get_node_name, get_parent_element,
    get_parent_node, get_shadow_root, get_text, has_class, has_node_attr, html_to_dom, insert_before,
    remove_from_parent, replace_node, set_node_attr, set_text, text_content,
};
pub use serializer::{outer_html, serialize_document};
pub use style::{InlineStyle, Visibility};
