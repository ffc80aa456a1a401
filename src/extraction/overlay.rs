//! 高亮标注层
//!
//! 对启动时的文本叶子快照逐个包裹：
//!
//! ```html
//! <span class="i18n-wrapper">
//!   <span class="i18n-highlight" data-original-text="..." data-i18n-key="...">text</span>
//! </span>
//! ```
//!
//! 点击高亮会在 `i18n-translations` 存储项下写入 `{ko, en: "", ja: ""}` 占位条目，
//! 并把该高亮标记为已处理。高亮层与提取引擎的翻译库互不影响。

use std::rc::Rc;

use markup5ever_rcdom::Handle;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{HarvestError, HarvestResult};
use crate::extraction::config::constants;
use crate::extraction::engine::Stats;
use crate::extraction::export::ExportFile;
use crate::extraction::language::Language;
use crate::extraction::pipeline::keys::overlay_key;
use crate::extraction::pipeline::selector::{text_leaves, TextLeaf};
use crate::extraction::storage::Storage;
use crate::extraction::store::{TranslationEntry, TranslationStore};
use crate::parsers::html::dom::{
    append_child, create_element, create_text, get_body, get_head, get_node_attr,
    get_parent_node, has_class, insert_before, remove_from_parent, replace_node, set_node_attr,
};
use crate::parsers::html::style::InlineStyle;

/// 一个已包裹的文本叶子
#[derive(Debug, Clone)]
struct Wrapped {
    wrapper: Handle,
    highlight: Handle,
}

/// 高亮标注层
pub struct HighlightOverlay {
    body: Handle,
    head: Option<Handle>,
    storage: Rc<dyn Storage>,
    storage_key: String,
    style: Option<Handle>,
    wrapped: Vec<Wrapped>,
}

impl HighlightOverlay {
    pub fn new(body: Handle, head: Option<Handle>, storage: Rc<dyn Storage>) -> Self {
        Self {
            body,
            head,
            storage,
            storage_key: constants::OVERLAY_STORE_KEY.to_string(),
            style: None,
            wrapped: Vec::new(),
        }
    }

    pub fn for_document(document: &Handle, storage: Rc<dyn Storage>) -> HarvestResult<Self> {
        let body = get_body(document)
            .ok_or_else(|| HarvestError::Traversal("文档中没有 BODY 元素".to_string()))?;
        Ok(Self::new(body, get_head(document), storage))
    }

    pub fn with_storage_key(mut self, storage_key: impl Into<String>) -> Self {
        self.storage_key = storage_key.into();
        self
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn is_active(&self) -> bool {
        self.style.is_some()
    }

    /// 当前所有高亮元素，按包裹顺序
    pub fn highlights(&self) -> Vec<Handle> {
        self.wrapped
            .iter()
            .map(|wrapped| wrapped.highlight.clone())
            .collect()
    }

    /// 按键查找第一个高亮元素
    pub fn find_highlight(&self, key: &str) -> Option<Handle> {
        self.wrapped
            .iter()
            .find(|wrapped| get_node_attr(&wrapped.highlight, constants::KEY_ATTR).as_deref() == Some(key))
            .map(|wrapped| wrapped.highlight.clone())
    }

    /// 包裹当前的文本叶子并注入样式，返回包裹的叶子数
    ///
    /// 已启动时什么也不做。
    pub fn start(&mut self) -> usize {
        if self.is_active() {
            debug!("高亮层已启动，忽略重复启动");
            return 0;
        }

        // 先取快照，包裹过程中不会再次看到新插入的节点
        let leaves: Vec<TextLeaf> = text_leaves(&self.body).collect();
        for leaf in &leaves {
            match wrap_leaf(leaf) {
                Ok(wrapped) => self.wrapped.push(wrapped),
                Err(e) => warn!("跳过无法包裹的文本节点: {}", e),
            }
        }

        let style = create_element("style", &[(constants::STYLE_MARKER_ATTR, "")]);
        append_child(&style, &create_text(constants::HIGHLIGHT_CSS));
        append_child(self.head.as_ref().unwrap_or(&self.body), &style);
        self.style = Some(style);

        info!("高亮层已启动，包裹了 {} 个文本节点", self.wrapped.len());
        self.wrapped.len()
    }

    /// 记录一次点击：写入占位条目并标记高亮为已处理
    pub async fn click(&mut self, highlight: &Handle) -> HarvestResult<Stats> {
        if !has_class(highlight, constants::HIGHLIGHT_CLASS) {
            return Err(HarvestError::InvalidInput(
                "点击目标不是高亮元素".to_string(),
            ));
        }
        let text = get_node_attr(highlight, constants::ORIGINAL_TEXT_ATTR).ok_or_else(|| {
            HarvestError::InvalidInput(format!("高亮元素缺少 {}", constants::ORIGINAL_TEXT_ATTR))
        })?;
        let key = get_node_attr(highlight, constants::KEY_ATTR).ok_or_else(|| {
            HarvestError::InvalidInput(format!("高亮元素缺少 {}", constants::KEY_ATTR))
        })?;

        let mut stubs = TranslationStore::from_value(self.storage.get(&self.storage_key).await?)?;
        let mut stub = TranslationEntry::default();
        stub.set(Language::Ko, text);
        stub.set(Language::En, "");
        stub.set(Language::Ja, "");
        stubs.insert(key.clone(), stub);
        self.storage.set(&self.storage_key, stubs.to_value()?).await?;

        set_node_attr(
            highlight,
            "style",
            Some(format!("background-color: {}", constants::PROCESSED_BACKGROUND)),
        );
        debug!("已标注高亮: {}", key);

        Ok(self.stats())
    }

    /// 按键点击第一个匹配的高亮
    pub async fn click_key(&mut self, key: &str) -> HarvestResult<Stats> {
        let highlight = self
            .find_highlight(key)
            .ok_or_else(|| HarvestError::InvalidInput(format!("找不到键为 {} 的高亮", key)))?;
        self.click(&highlight).await
    }

    /// 高亮统计：已点击的高亮数与剩余数
    pub fn stats(&self) -> Stats {
        let processed = self
            .wrapped
            .iter()
            .filter(|wrapped| is_marked(&wrapped.highlight))
            .count();
        Stats::compute(self.wrapped.len(), processed)
    }

    /// 拆除所有包裹，把文本节点放回原位并移除样式，返回拆除的包裹数
    pub fn stop(&mut self) -> HarvestResult<usize> {
        let mut unwrapped = 0;
        for wrapped in std::mem::take(&mut self.wrapped) {
            let Some(parent) = get_parent_node(&wrapped.wrapper) else {
                // 包裹已被宿主移除
                continue;
            };
            let children: Vec<Handle> = wrapped.highlight.children.borrow().clone();
            for child in &children {
                insert_before(&parent, child, &wrapped.wrapper)?;
            }
            remove_from_parent(&wrapped.wrapper);
            unwrapped += 1;
        }

        if let Some(style) = self.style.take() {
            remove_from_parent(&style);
        }

        info!("高亮层已停止，还原了 {} 个文本节点", unwrapped);
        Ok(unwrapped)
    }

    /// 导出占位条目映射为 `translations.json`
    pub async fn export(&self) -> HarvestResult<ExportFile> {
        let value = self
            .storage
            .get(&self.storage_key)
            .await?
            .unwrap_or_else(|| Value::Object(Map::new()));
        ExportFile::json(constants::OVERLAY_EXPORT_FILE, &value)
    }
}

fn wrap_leaf(leaf: &TextLeaf) -> HarvestResult<Wrapped> {
    let text = leaf.trimmed_text();
    let key = overlay_key(text);

    let wrapper = create_element("span", &[("class", constants::WRAPPER_CLASS)]);
    let highlight = create_element(
        "span",
        &[
            ("class", constants::HIGHLIGHT_CLASS),
            (constants::ORIGINAL_TEXT_ATTR, text),
            (constants::KEY_ATTR, &key),
        ],
    );

    replace_node(&leaf.node, &wrapper)?;
    append_child(&wrapper, &highlight);
    append_child(&highlight, &leaf.node);

    Ok(Wrapped { wrapper, highlight })
}

fn is_marked(highlight: &Handle) -> bool {
    get_node_attr(highlight, "style")
        .map(|style| {
            InlineStyle::parse(&style).get("background-color") == Some(constants::PROCESSED_BACKGROUND)
        })
        .unwrap_or(false)
}
