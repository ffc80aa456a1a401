use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{
    Attribute, ElementFlags, NextParserState, NodeOrText, QualName, QuirksMode, TreeSink,
};
use html5ever::parse_document;
use html5ever::tendril::{format_tendril, StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, ExpandedName, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use crate::error::{HarvestError, HarvestResult};

/// 声明式 Shadow DOM 使用的模板属性
pub const SHADOW_ROOT_ATTRS: &[&str] = &["shadowrootmode", "shadowroot"];

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> HarvestResult<RcDom> {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.into_owned()
        }
        None => String::from_utf8_lossy(data).into_owned(),
    };

    let dom = parse_document(ShadowTemplateSink::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())?;

    Ok(dom)
}

/// 保留声明式 Shadow Root 模板的解析目标
///
/// `RcDom` 不支持挂载声明式 Shadow Root，html5ever 会丢弃
/// `<template shadowrootmode>` 并把其内容当作宿主的普通子节点插入。
/// 这里拒绝声明式挂载，使模板连同 `template_contents` 片段一起保留，
/// 由 [`get_shadow_root`] 读取。其余操作全部交给 `RcDom`。
#[derive(Default)]
struct ShadowTemplateSink(RcDom);

impl TreeSink for ShadowTemplateSink {
    type Handle = Handle;
    type Output = RcDom;
    type ElemName<'a> = ExpandedName<'a> where Self: 'a;

    fn finish(self) -> RcDom {
        self.0
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.0.parse_error(msg)
    }

    fn get_document(&self) -> Handle {
        self.0.get_document()
    }

    fn elem_name<'a>(&'a self, target: &'a Handle) -> ExpandedName<'a> {
        self.0.elem_name(target)
    }

    fn create_element(&self, name: QualName, attrs: Vec<Attribute>, flags: ElementFlags) -> Handle {
        self.0.create_element(name, attrs, flags)
    }

    fn create_comment(&self, text: StrTendril) -> Handle {
        self.0.create_comment(text)
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Handle {
        self.0.create_pi(target, data)
    }

    fn append(&self, parent: &Handle, child: NodeOrText<Handle>) {
        self.0.append(parent, child)
    }

    fn append_based_on_parent_node(
        &self,
        element: &Handle,
        prev_element: &Handle,
        child: NodeOrText<Handle>,
    ) {
        self.0.append_based_on_parent_node(element, prev_element, child)
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        self.0.append_doctype_to_document(name, public_id, system_id)
    }

    fn mark_script_already_started(&self, node: &Handle) {
        self.0.mark_script_already_started(node)
    }

    fn pop(&self, node: &Handle) {
        self.0.pop(node)
    }

    fn get_template_contents(&self, target: &Handle) -> Handle {
        self.0.get_template_contents(target)
    }

    fn same_node(&self, x: &Handle, y: &Handle) -> bool {
        self.0.same_node(x, y)
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        self.0.set_quirks_mode(mode)
    }

    fn append_before_sibling(&self, sibling: &Handle, new_node: NodeOrText<Handle>) {
        self.0.append_before_sibling(sibling, new_node)
    }

    fn add_attrs_if_missing(&self, target: &Handle, attrs: Vec<Attribute>) {
        self.0.add_attrs_if_missing(target, attrs)
    }

    fn remove_from_parent(&self, target: &Handle) {
        self.0.remove_from_parent(target)
    }

    fn reparent_children(&self, node: &Handle, new_parent: &Handle) {
        self.0.reparent_children(node, new_parent)
    }

    fn is_mathml_annotation_xml_integration_point(&self, handle: &Handle) -> bool {
        self.0.is_mathml_annotation_xml_integration_point(handle)
    }

    fn set_current_line(&self, line_number: u64) {
        self.0.set_current_line(line_number)
    }

    fn complete_script(&self, node: &Handle) -> NextParserState {
        self.0.complete_script(node)
    }

    fn allow_declarative_shadow_roots(&self, _intended_parent: &Handle) -> bool {
        false
    }
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// 按文档顺序查找第一个指定名称的元素
pub fn find_first_element(root: &Handle, node_name: &str) -> Option<Handle> {
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        if get_node_name(&node) == Some(node_name) {
            return Some(node);
        }
        for child in node.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
    }

    None
}

/// 获取文档的 BODY 元素
pub fn get_body(document: &Handle) -> Option<Handle> {
    get_child_node_by_name(document, "html")
        .and_then(|html| get_child_node_by_name(&html, "body"))
        .or_else(|| find_first_element(document, "body"))
}

/// 获取文档的 HEAD 元素
pub fn get_head(document: &Handle) -> Option<Handle> {
    get_child_node_by_name(document, "html")
        .and_then(|html| get_child_node_by_name(&html, "head"))
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 判断节点是否带有指定属性（不关心属性值）
pub fn has_node_attr(node: &Handle, attr_name: &str) -> bool {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .any(|attr| &*attr.name.local == attr_name),
        _ => false,
    }
}

/// 判断元素的 class 列表是否包含指定类名
pub fn has_class(node: &Handle, class_name: &str) -> bool {
    get_node_attr(node, "class")
        .map(|classes| classes.split_ascii_whitespace().any(|class| class == class_name))
        .unwrap_or(false)
}

/// 按文档顺序查找子树中带有指定类名的元素（不进入 Shadow Root）
pub fn find_elements_by_class(root: &Handle, class_name: &str) -> Vec<Handle> {
    let mut found = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        if has_class(&node, class_name) {
            found.push(node.clone());
        }
        for child in node.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
    }

    found
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点
///
/// `parent` 是 `Cell<Option<WeakHandle>>`，读取时必须把值放回去。
/// 节点已分离或父节点已被释放时返回 `None`。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    child.parent.set(weak.clone());
    weak.and_then(|node| node.upgrade())
}

/// 获取父元素（父节点是文档或片段时返回 `None`）
pub fn get_parent_element(child: &Handle) -> Option<Handle> {
    get_parent_node(child).filter(|parent| matches!(parent.data, NodeData::Element { .. }))
}

/// 设置节点属性，`attr_value` 为 `None` 时移除该属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.as_deref() {
                    attrs_mut[i].value.clear();
                    attrs_mut[i].value.push_slice(attr_value);
                } else {
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            if let Some(attr_value) = attr_value {
                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}

/// 创建一个未挂载的 HTML 元素
pub fn create_element(tag_name: &str, attributes: &[(&str, &str)]) -> Handle {
    let attrs = attributes
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: format_tendril!("{}", value),
        })
        .collect();

    let template_contents = if tag_name == "template" {
        Some(Node::new(NodeData::Document))
    } else {
        None
    };

    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag_name)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(template_contents),
        mathml_annotation_xml_integration_point: false,
    })
}

/// 创建一个未挂载的文本节点
pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(text.into()),
    })
}

/// 读取文本节点的内容
pub fn get_text(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 改写文本节点的内容，非文本节点返回 `false`
pub fn set_text(node: &Handle, text: &str) -> bool {
    match &node.data {
        NodeData::Text { contents } => {
            let mut contents = contents.borrow_mut();
            contents.clear();
            contents.push_slice(text);
            true
        }
        _ => false,
    }
}

/// 拼接子树中所有文本节点的内容
pub fn text_content(node: &Handle) -> String {
    let mut result = String::new();
    let mut stack = vec![node.clone()];

    while let Some(current) = stack.pop() {
        if let NodeData::Text { contents } = &current.data {
            result.push_str(&contents.borrow());
        }
        for child in current.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
    }

    result
}

/// 将节点从父节点中移除，返回节点原来的位置
pub fn remove_from_parent(node: &Handle) -> Option<(Handle, usize)> {
    let parent = get_parent_node(node)?;
    let index = {
        let mut children = parent.children.borrow_mut();
        let index = children.iter().position(|child| Rc::ptr_eq(child, node))?;
        children.remove(index);
        index
    };
    node.parent.set(None);
    Some((parent, index))
}

/// 将节点追加为 `parent` 的最后一个子节点（会先从原位置移除）
pub fn append_child(parent: &Handle, child: &Handle) {
    remove_from_parent(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

/// 将节点插入到 `reference` 之前，`reference` 不是 `parent` 的子节点时报错
pub fn insert_before(parent: &Handle, child: &Handle, reference: &Handle) -> HarvestResult<()> {
    if Rc::ptr_eq(child, reference) {
        return Ok(());
    }
    remove_from_parent(child);

    let mut children = parent.children.borrow_mut();
    let index = children
        .iter()
        .position(|node| Rc::ptr_eq(node, reference))
        .ok_or_else(|| HarvestError::Traversal("参考节点不是目标父节点的子节点".to_string()))?;

    child.parent.set(Some(Rc::downgrade(parent)));
    children.insert(index, child.clone());
    Ok(())
}

/// 用 `replacement` 替换 `node` 在树中的位置
pub fn replace_node(node: &Handle, replacement: &Handle) -> HarvestResult<()> {
    let (parent, index) = remove_from_parent(node)
        .ok_or_else(|| HarvestError::Traversal("待替换节点已分离".to_string()))?;

    remove_from_parent(replacement);
    replacement.parent.set(Some(Rc::downgrade(&parent)));
    let mut children = parent.children.borrow_mut();
    let index = index.min(children.len());
    children.insert(index, replacement.clone());
    Ok(())
}

/// 判断元素是否为声明式 Shadow Root 模板
pub fn is_shadow_root_template(node: &Handle) -> bool {
    get_node_name(node) == Some("template")
        && SHADOW_ROOT_ATTRS.iter().any(|attr| has_node_attr(node, attr))
}

/// 获取宿主元素挂载的 Shadow Root 片段
pub fn get_shadow_root(host: &Handle) -> Option<Handle> {
    if !matches!(host.data, NodeData::Element { .. }) {
        return None;
    }

    let children = host.children.borrow();
    children
        .iter()
        .find(|child| is_shadow_root_template(child))
        .and_then(|template| match &template.data {
            NodeData::Element {
                template_contents, ..
            } => template_contents.borrow().clone(),
            _ => None,
        })
}

/// 为宿主元素挂载一个新的 Shadow Root 并返回其片段节点
///
/// 宿主已有 Shadow Root 时直接返回已有的片段。
pub fn attach_shadow(host: &Handle, mode: &str) -> HarvestResult<Handle> {
    if !matches!(host.data, NodeData::Element { .. }) {
        return Err(HarvestError::InvalidInput(
            "只能为元素节点挂载 Shadow Root".to_string(),
        ));
    }
    if let Some(existing) = get_shadow_root(host) {
        return Ok(existing);
    }

    let template = create_element("template", &[("shadowrootmode", mode)]);
    let fragment = match &template.data {
        NodeData::Element {
            template_contents, ..
        } => template_contents.borrow().clone(),
        _ => None,
    }
    .ok_or_else(|| HarvestError::Traversal("模板缺少内容片段".to_string()))?;

    let first_child = host.children.borrow().first().cloned();
    match first_child {
        Some(first) => insert_before(host, &template, &first)?,
        None => append_child(host, &template),
    }

    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").unwrap()
    }

    #[test]
    fn test_parent_lookup_is_repeatable() {
        let dom = parse("<html><body><p>hello</p></body></html>");
        let p = find_first_element(&dom.document, "p").unwrap();
        let text = p.children.borrow()[0].clone();

        let first = get_parent_node(&text).unwrap();
        let second = get_parent_node(&text).unwrap();
        assert!(Rc::ptr_eq(&first, &p));
        assert!(Rc::ptr_eq(&second, &p));
    }

    #[test]
    fn test_set_and_remove_attr() {
        let node = create_element("span", &[("class", "a")]);
        set_node_attr(&node, "class", Some("b".to_string()));
        set_node_attr(&node, "data-x", Some("1".to_string()));
        assert_eq!(get_node_attr(&node, "class").as_deref(), Some("b"));
        assert_eq!(get_node_attr(&node, "data-x").as_deref(), Some("1"));

        set_node_attr(&node, "class", None);
        assert!(!has_node_attr(&node, "class"));
    }

    #[test]
    fn test_insert_and_replace_keep_parent_links() {
        let parent = create_element("div", &[]);
        let a = create_text("a");
        let b = create_text("b");
        append_child(&parent, &a);
        insert_before(&parent, &b, &a).unwrap();
        assert_eq!(text_content(&parent), "ba");

        let c = create_element("span", &[]);
        replace_node(&a, &c).unwrap();
        assert!(get_parent_node(&a).is_none());
        assert!(Rc::ptr_eq(&get_parent_node(&c).unwrap(), &parent));
        assert_eq!(parent.children.borrow().len(), 2);
    }

    #[test]
    fn test_declarative_shadow_root_is_found() {
        let dom = parse(
            "<html><body><div id=\"host\"><template shadowrootmode=\"open\"><p>inside</p></template></div></body></html>",
        );
        let host = find_first_element(&dom.document, "div").unwrap();
        let shadow = get_shadow_root(&host).unwrap();
        assert_eq!(text_content(&shadow), "inside");
    }

    #[test]
    fn test_declarative_template_is_not_flattened() {
        let dom = parse(
            "<html><body><div id=\"host\"><template shadowrootmode=\"open\">그림자 직속 텍스트<p>inside</p></template></div></body></html>",
        );
        let host = find_first_element(&dom.document, "div").unwrap();
        let children: Vec<String> = host
            .children
            .borrow()
            .iter()
            .filter_map(|child| get_node_name(child).map(str::to_string))
            .collect();
        assert_eq!(children, vec!["template".to_string()]);
        assert!(is_shadow_root_template(&host.children.borrow()[0]));
        assert_eq!(text_content(&host), "");

        let shadow = get_shadow_root(&host).unwrap();
        assert!(matches!(shadow.data, NodeData::Document));
        assert_eq!(shadow.children.borrow().len(), 2);
    }

    #[test]
    fn test_attach_shadow_reuses_existing_root() {
        let host = create_element("div", &[]);
        let first = attach_shadow(&host, "open").unwrap();
        let second = attach_shadow(&host, "closed").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_find_elements_by_class() {
        let dom = parse(
            "<html><body><span class=\"a i18n-wrapper\">x</span><p class=\"i18n-wrapper-not\">y</p></body></html>",
        );
        let found = find_elements_by_class(&dom.document, "i18n-wrapper");
        assert_eq!(found.len(), 1);
        assert_eq!(get_node_name(&found[0]), Some("span"));
    }

    #[test]
    fn test_legacy_charset_is_decoded() {
        let bytes = b"<html><body><p>caf\xe9</p></body></html>";
        let dom = html_to_dom(bytes, "windows-1252").unwrap();
        let p = find_first_element(&dom.document, "p").unwrap();
        assert_eq!(text_content(&p), "café");
    }
}
