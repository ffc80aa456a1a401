use std::collections::VecDeque;
use std::io;

use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::QualName;
use markup5ever_rcdom::{Handle, NodeData};

use crate::error::{HarvestError, HarvestResult};

/// 可序列化的节点句柄
///
/// 与 `SerializableHandle` 相同，但 `<template>` 输出的是其内容片段，
/// 声明式 Shadow Root 中的节点因此会出现在结果中。
pub struct SerializableNode(Handle);

impl From<Handle> for SerializableNode {
    fn from(handle: Handle) -> Self {
        SerializableNode(handle)
    }
}

enum SerializeOp {
    Open(Handle),
    Close(QualName),
}

/// `<template>` 的子节点位于内容片段中
fn serialized_children(handle: &Handle) -> Vec<Handle> {
    if let NodeData::Element {
        template_contents, ..
    } = &handle.data
    {
        if let Some(contents) = template_contents.borrow().as_ref() {
            return contents.children.borrow().clone();
        }
    }
    handle.children.borrow().clone()
}

impl Serialize for SerializableNode {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let mut ops = VecDeque::new();
        match traversal_scope {
            TraversalScope::IncludeNode => ops.push_back(SerializeOp::Open(self.0.clone())),
            TraversalScope::ChildrenOnly(_) => ops.extend(
                serialized_children(&self.0)
                    .into_iter()
                    .map(SerializeOp::Open),
            ),
        }

        while let Some(op) = ops.pop_front() {
            match op {
                SerializeOp::Open(handle) => match &handle.data {
                    NodeData::Element { name, attrs, .. } => {
                        serializer.start_elem(
                            name.clone(),
                            attrs.borrow().iter().map(|at| (&at.name, &at.value[..])),
                        )?;
                        ops.push_front(SerializeOp::Close(name.clone()));
                        for child in serialized_children(&handle).into_iter().rev() {
                            ops.push_front(SerializeOp::Open(child));
                        }
                    }
                    NodeData::Doctype { name, .. } => serializer.write_doctype(name)?,
                    NodeData::Text { contents } => serializer.write_text(&contents.borrow())?,
                    NodeData::Comment { contents } => serializer.write_comment(contents)?,
                    NodeData::ProcessingInstruction { target, contents } => {
                        serializer.write_processing_instruction(target, contents)?
                    }
                    NodeData::Document => {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidInput,
                            "无法单独序列化文档节点",
                        ))
                    }
                },
                SerializeOp::Close(name) => serializer.end_elem(name)?,
            }
        }

        Ok(())
    }
}

/// 序列化整个文档
pub fn serialize_document(document: &Handle) -> HarvestResult<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableNode = document.clone().into();

    serialize(&mut buf, &serializable, SerializeOpts::default())
        .map_err(|e| HarvestError::Io(format!("序列化 DOM 失败: {}", e)))?;

    Ok(buf)
}

/// 序列化节点本身及其子树（相当于 outerHTML）
pub fn outer_html(node: &Handle) -> HarvestResult<String> {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableNode = node.clone().into();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };

    serialize(&mut buf, &serializable, opts)
        .map_err(|e| HarvestError::Io(format!("序列化节点失败: {}", e)))?;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{
        append_child, attach_shadow, create_element, create_text, find_first_element, html_to_dom,
    };

    #[test]
    fn test_outer_html_includes_node() {
        let span = create_element("span", &[("class", "i18n-highlight")]);
        append_child(&span, &create_text("안녕"));
        assert_eq!(
            outer_html(&span).unwrap(),
            "<span class=\"i18n-highlight\">안녕</span>"
        );
    }

    #[test]
    fn test_declarative_shadow_root_is_serialized() {
        let html = "<div id=\"host\"><template shadowrootmode=\"open\"><p>inside</p></template></div>";
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let host = find_first_element(&dom.document, "div").unwrap();
        assert_eq!(outer_html(&host).unwrap(), html);
    }

    #[test]
    fn test_attached_shadow_is_serialized() {
        let host = create_element("my-card", &[]);
        let shadow = attach_shadow(&host, "open").unwrap();
        append_child(&shadow, &create_text("안"));
        assert_eq!(
            outer_html(&host).unwrap(),
            "<my-card><template shadowrootmode=\"open\">안</template></my-card>"
        );
    }
}
