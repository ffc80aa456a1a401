//! 文本节点选择器
//!
//! 从给定根节点出发，惰性地产出满足结构与可见性条件的文本叶子。
//! 先产出常规树（light tree）中的叶子，再依次遍历其中发现的每个 Shadow Root；
//! 嵌套的 Shadow Root 紧跟在宿主所在的树之后处理。
//!
//! 遍历使用显式栈而非递归，极深的 DOM 也不会耗尽调用栈。
//! 每次调用都会重新遍历，结果始终反映树的当前状态。

use std::collections::VecDeque;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, NodeData};

use crate::extraction::config::constants;
use crate::parsers::html::dom::{
    get_node_attr, get_node_name, get_parent_element, get_parent_node, get_shadow_root,
    has_node_attr,
};
use crate::parsers::html::style::{InlineStyle, Visibility};

/// 一个原子文本节点的引用
#[derive(Debug, Clone)]
pub struct TextLeaf {
    /// DOM 节点（身份仅用于“是否已处理”判断）
    pub node: Handle,
    /// 原始文本内容（未去除空白）
    pub text: String,
    /// 直接容器元素的标签名
    pub container_tag: String,
    /// 容器的计算可见性
    pub visibility: Visibility,
    /// 是否位于 Shadow Tree 中
    pub in_shadow_tree: bool,
}

impl TextLeaf {
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

/// 文本节点被跳过的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// 没有父元素（位于文档或片段根部，或已分离）
    NoContainer,
    /// 容器标签在排除列表中
    ExcludedContainer,
    /// 容器 `display: none`
    DisplayNone,
    /// 容器的继承可见性为 hidden
    VisibilityHidden,
    /// 容器带有 `hidden` 属性
    HiddenAttribute,
    /// 容器带有框架内部标记
    FrameworkMarker,
    /// 去除空白后为空
    BlankText,
}

/// 遍历到的每个文本节点及其判定结果
#[derive(Debug, Clone)]
pub struct ScannedText {
    pub leaf: TextLeaf,
    pub verdict: Result<(), SkipReason>,
}

/// 栈帧：待访问节点与其父级上下文的继承可见性
struct Frame {
    node: Handle,
    inherited: Visibility,
}

/// 惰性遍历器，产出根节点下的所有文本节点及判定结果
pub struct TextScan {
    root: Handle,
    stack: Vec<Frame>,
    discovered_shadows: Vec<Frame>,
    pending_shadows: VecDeque<Frame>,
    in_shadow_tree: bool,
}

impl TextScan {
    pub fn new(root: &Handle) -> Self {
        let inherited = inherited_visibility_above(root);

        Self {
            root: root.clone(),
            stack: vec![Frame {
                node: root.clone(),
                inherited,
            }],
            discovered_shadows: Vec::new(),
            pending_shadows: VecDeque::new(),
            in_shadow_tree: is_inside_shadow_tree(root),
        }
    }

    /// 当前树遍历完毕后，切换到下一个 Shadow Root
    fn advance_tree(&mut self) -> bool {
        // 当前树中发现的 Shadow Root 要排在之前挂起的之前
        for frame in self.discovered_shadows.drain(..).rev() {
            self.pending_shadows.push_front(frame);
        }

        match self.pending_shadows.pop_front() {
            Some(frame) => {
                self.stack.push(frame);
                self.in_shadow_tree = true;
                true
            }
            None => false,
        }
    }

    fn visit_text(&self, node: &Handle, text: &str, inherited: Visibility) -> ScannedText {
        let container = get_parent_element(node);
        let container_tag = container
            .as_ref()
            .and_then(|element| get_node_name(element).map(str::to_string))
            .unwrap_or_default();

        let leaf = TextLeaf {
            node: node.clone(),
            text: text.to_string(),
            container_tag,
            visibility: inherited,
            in_shadow_tree: self.in_shadow_tree,
        };

        let verdict = match container {
            Some(element) => check_container(&element, &leaf),
            None => Err(SkipReason::NoContainer),
        };

        ScannedText { leaf, verdict }
    }
}

impl Iterator for TextScan {
    type Item = ScannedText;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Frame { node, inherited } = match self.stack.pop() {
                Some(frame) => frame,
                None => {
                    if self.advance_tree() {
                        continue;
                    }
                    return None;
                }
            };

            match &node.data {
                NodeData::Text { contents } => {
                    let text = contents.borrow().to_string();
                    return Some(self.visit_text(&node, &text, inherited));
                }
                NodeData::Element { .. } => {
                    let visibility = own_visibility(&node).unwrap_or(inherited);

                    if !Rc::ptr_eq(&node, &self.root) {
                        if let Some(shadow) = get_shadow_root(&node) {
                            self.discovered_shadows.push(Frame {
                                node: shadow,
                                inherited: visibility,
                            });
                        }
                    }

                    for child in node.children.borrow().iter().rev() {
                        self.stack.push(Frame {
                            node: child.clone(),
                            inherited: visibility,
                        });
                    }
                }
                NodeData::Document => {
                    for child in node.children.borrow().iter().rev() {
                        self.stack.push(Frame {
                            node: child.clone(),
                            inherited,
                        });
                    }
                }
                _ => {}
            }
        }
    }
}

/// 只产出合格文本叶子的惰性序列
pub struct TextLeaves {
    scan: TextScan,
}

impl Iterator for TextLeaves {
    type Item = TextLeaf;

    fn next(&mut self) -> Option<Self::Item> {
        self.scan
            .by_ref()
            .find(|scanned| scanned.verdict.is_ok())
            .map(|scanned| scanned.leaf)
    }
}

/// 获取根节点下（含 Shadow Root）的合格文本叶子
///
/// # 参数
///
/// * `root` - 遍历的根节点，可以是文档、元素或 Shadow Root 片段
///
/// # 返回值
///
/// 惰性迭代器，每次调用都反映树的当前状态
pub fn text_leaves(root: &Handle) -> TextLeaves {
    TextLeaves {
        scan: TextScan::new(root),
    }
}

/// 获取根节点下所有文本节点（包括被跳过的）及判定原因
pub fn scan_text_nodes(root: &Handle) -> TextScan {
    TextScan::new(root)
}

/// 统计合格文本叶子的数量
pub fn count_text_leaves(root: &Handle) -> usize {
    text_leaves(root).count()
}

fn check_container(element: &Handle, leaf: &TextLeaf) -> Result<(), SkipReason> {
    if constants::EXCLUDED_CONTAINERS.contains(&leaf.container_tag.as_str()) {
        return Err(SkipReason::ExcludedContainer);
    }

    if is_hidden_by_default(element, &leaf.container_tag) {
        return Err(SkipReason::DisplayNone);
    }

    if let Some(style) = get_node_attr(element, "style") {
        if InlineStyle::parse(&style).is_display_none() {
            return Err(SkipReason::DisplayNone);
        }
    }

    if leaf.visibility.is_hidden() {
        return Err(SkipReason::VisibilityHidden);
    }

    if has_node_attr(element, "hidden") {
        return Err(SkipReason::HiddenAttribute);
    }

    if constants::FRAMEWORK_MARKER_ATTRS
        .iter()
        .any(|attr| has_node_attr(element, attr))
    {
        return Err(SkipReason::FrameworkMarker);
    }

    if leaf.text.trim().is_empty() {
        return Err(SkipReason::BlankText);
    }

    Ok(())
}

/// 默认样式表隐藏的容器（未打开的 `<dialog>` 同样不显示）
fn is_hidden_by_default(element: &Handle, tag: &str) -> bool {
    constants::UA_HIDDEN_CONTAINERS.contains(&tag)
        || (tag == "dialog" && !has_node_attr(element, "open"))
}

fn own_visibility(element: &Handle) -> Option<Visibility> {
    get_node_attr(element, "style").and_then(|style| InlineStyle::parse(&style).visibility())
}

/// 根节点之上最近一个显式声明 `visibility` 的祖先决定继承可见性
fn inherited_visibility_above(root: &Handle) -> Visibility {
    let mut current = get_parent_node(root);
    while let Some(node) = current {
        if let Some(visibility) = own_visibility(&node) {
            return visibility;
        }
        current = get_parent_node(&node);
    }
    Visibility::Visible
}

/// 根节点所在树的顶层是否为 Shadow Root 片段
///
/// 主文档的顶层是含 `<html>` 的 Document，Shadow Root 片段的顶层是不含 `<html>` 的 Document。
fn is_inside_shadow_tree(root: &Handle) -> bool {
    let mut top = root.clone();
    while let Some(parent) = get_parent_node(&top) {
        top = parent;
    }

    matches!(top.data, NodeData::Document)
        && !top
            .children
            .borrow()
            .iter()
            .any(|child| get_node_name(child) == Some("html"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{
        append_child, attach_shadow, create_element, create_text, find_first_element, html_to_dom,
    };
    use markup5ever_rcdom::RcDom;

    fn parse(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").unwrap()
    }

    fn texts(root: &Handle) -> Vec<String> {
        text_leaves(root)
            .map(|leaf| leaf.trimmed_text().to_string())
            .collect()
    }

    #[test]
    fn test_excluded_containers_are_skipped() {
        let dom = parse(
            "<html><body><p>Keep</p><a href=\"#\">Link</a><button>Press</button>\
             <table><tr><td>Cell</td></tr></table><script>var x;</script>\
             <style>p{}</style><span>Also</span></body></html>",
        );
        assert_eq!(texts(&dom.document), vec!["Keep", "Also"]);
    }

    #[test]
    fn test_hidden_containers_are_skipped() {
        let dom = parse(
            "<html><body>\
             <p style=\"display:none\">NoneDisplay</p>\
             <p hidden>HiddenAttr</p>\
             <div style=\"visibility:hidden\"><p>Inherited</p><p style=\"visibility:visible\">Shown</p></div>\
             <div style=\"display:none\"><p>Child of display none</p></div>\
             <div data-reactroot=\"\">React</div>\
             <p>   </p>\
             </body></html>",
        );
        // display:none 不继承：子元素自身的计算值不是 none
        assert_eq!(texts(&dom.document), vec!["Shown", "Child of display none"]);
    }

    #[test]
    fn test_default_hidden_containers_are_skipped() {
        let dom = parse(
            "<html><body>\
             <noscript>자바스크립트를 켜세요</noscript>\
             <dialog>닫힌 대화상자</dialog>\
             <dialog open>열린 대화상자</dialog>\
             <ruby>漢<rp>(</rp><rt>かん</rt><rp>)</rp></ruby>\
             </body></html>",
        );
        assert_eq!(texts(&dom.document), vec!["열린 대화상자", "漢", "かん"]);

        let reasons: Vec<(String, SkipReason)> = scan_text_nodes(&dom.document)
            .filter_map(|scanned| {
                scanned
                    .verdict
                    .err()
                    .map(|reason| (scanned.leaf.container_tag.clone(), reason))
            })
            .collect();
        assert!(reasons.contains(&("noscript".to_string(), SkipReason::DisplayNone)));
    }

    #[test]
    fn test_skip_reasons_are_reported() {
        let dom = parse("<html><body><p hidden>x</p><button>y</button></body></html>");
        let reasons: Vec<_> = scan_text_nodes(&dom.document)
            .filter_map(|scanned| scanned.verdict.err())
            .collect();
        assert!(reasons.contains(&SkipReason::HiddenAttribute));
        assert!(reasons.contains(&SkipReason::ExcludedContainer));
    }

    #[test]
    fn test_shadow_roots_follow_light_tree() {
        let dom = parse(
            "<html><body>\
             <div id=\"a\"><template shadowrootmode=\"open\"><p>Shadow A</p></template></div>\
             <p>Light One</p>\
             <div id=\"b\"><template shadowrootmode=\"open\"><p>Shadow B</p></template></div>\
             <p>Light Two</p>\
             </body></html>",
        );
        let leaves: Vec<TextLeaf> = text_leaves(&dom.document).collect();
        let names: Vec<&str> = leaves.iter().map(|leaf| leaf.trimmed_text()).collect();
        assert_eq!(names, vec!["Light One", "Light Two", "Shadow A", "Shadow B"]);
        assert!(!leaves[0].in_shadow_tree);
        assert!(leaves[2].in_shadow_tree);
    }

    #[test]
    fn test_text_directly_under_parsed_shadow_root_is_rejected() {
        let dom = parse(
            "<html><body><div><template shadowrootmode=\"open\">그림자 직속 텍스트<p>감싼 텍스트</p></template></div></body></html>",
        );
        let scanned: Vec<ScannedText> = scan_text_nodes(&dom.document).collect();
        let direct = scanned
            .iter()
            .find(|item| item.leaf.trimmed_text() == "그림자 직속 텍스트")
            .unwrap();
        assert_eq!(direct.verdict, Err(SkipReason::NoContainer));
        assert!(direct.leaf.in_shadow_tree);
        assert_eq!(direct.leaf.container_tag, "");

        let leaves: Vec<TextLeaf> = text_leaves(&dom.document).collect();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].trimmed_text(), "감싼 텍스트");
        assert_eq!(leaves[0].container_tag, "p");
        assert!(leaves[0].in_shadow_tree);
    }

    #[test]
    fn test_nested_shadow_roots_are_traversed() {
        let host = create_element("div", &[]);
        let shadow = attach_shadow(&host, "open").unwrap();
        let inner_host = create_element("section", &[]);
        append_child(&shadow, &inner_host);
        let p = create_element("p", &[]);
        append_child(&p, &create_text("Outer shadow"));
        append_child(&shadow, &p);

        let inner_shadow = attach_shadow(&inner_host, "closed").unwrap();
        let q = create_element("p", &[]);
        append_child(&q, &create_text("Inner shadow"));
        append_child(&inner_shadow, &q);

        let body = create_element("body", &[]);
        append_child(&body, &host);

        assert_eq!(texts(&body), vec!["Outer shadow", "Inner shadow"]);
    }

    #[test]
    fn test_sequence_reflects_current_tree() {
        let dom = parse("<html><body><p>First</p></body></html>");
        let body = find_first_element(&dom.document, "body").unwrap();
        assert_eq!(count_text_leaves(&body), 1);

        let p = create_element("p", &[]);
        append_child(&p, &create_text("Second"));
        append_child(&body, &p);
        assert_eq!(count_text_leaves(&body), 2);
    }

    #[test]
    fn test_scoped_root_inherits_ancestor_visibility() {
        let dom = parse(
            "<html><body><div style=\"visibility: hidden\"><section><p>Hidden</p></section></div></body></html>",
        );
        let section = find_first_element(&dom.document, "section").unwrap();
        assert_eq!(count_text_leaves(&section), 0);
    }

    #[test]
    fn test_text_without_parent_element_is_rejected() {
        let text = create_text("orphan");
        let scanned: Vec<ScannedText> = scan_text_nodes(&text).collect();
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].verdict, Err(SkipReason::NoContainer));
    }

    #[test]
    fn test_regular_template_contents_are_inert() {
        let dom = parse("<html><body><template><p>Inert</p></template><p>Live</p></body></html>");
        assert_eq!(texts(&dom.document), vec!["Live"]);
    }
}
