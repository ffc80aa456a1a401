//! DOM 变更观察
//!
//! `MutationWatcher` 代替宿主执行 DOM 修改，并为观察子树内的目标记录变更，
//! 效果等同于在 BODY 上以 `childList + subtree + characterData` 注册的观察者。
//! 与浏览器的观察者一致，记录不会跨越 Shadow Root 边界。
//!
//! 取出的记录批次交给 `ExtractionContext::on_mutation_batch` 处理。

use std::rc::Rc;

use markup5ever_rcdom::Handle;

use crate::error::{HarvestError, HarvestResult};
use crate::parsers::html::dom::{self, get_parent_node};

/// 一条 DOM 变更记录
#[derive(Debug, Clone)]
pub enum MutationRecord {
    /// 子节点列表变化
    ChildList {
        target: Handle,
        added: Vec<Handle>,
        removed: Vec<Handle>,
    },
    /// 文本节点内容变化
    CharacterData { target: Handle, old_value: String },
}

impl MutationRecord {
    pub fn target(&self) -> &Handle {
        match self {
            MutationRecord::ChildList { target, .. } => target,
            MutationRecord::CharacterData { target, .. } => target,
        }
    }
}

/// 记录式 DOM 修改器
pub struct MutationWatcher {
    root: Handle,
    records: Vec<MutationRecord>,
    connected: bool,
}

impl MutationWatcher {
    /// 开始观察以 `root` 为根的子树
    pub fn observe(root: &Handle) -> Self {
        Self {
            root: root.clone(),
            records: Vec::new(),
            connected: true,
        }
    }

    pub fn root(&self) -> &Handle {
        &self.root
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// 停止记录并丢弃尚未取出的记录
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.records.clear();
    }

    /// 取出当前累积的记录批次
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn pending_records(&self) -> usize {
        self.records.len()
    }

    /// 节点是否位于观察的子树内（含根节点本身）
    pub fn is_observed(&self, node: &Handle) -> bool {
        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if Rc::ptr_eq(&candidate, &self.root) {
                return true;
            }
            current = get_parent_node(&candidate);
        }
        false
    }

    /// 追加子节点
    pub fn append_child(&mut self, parent: &Handle, child: &Handle) {
        self.record_detach(child);
        dom::append_child(parent, child);
        self.record_child_list(parent, vec![child.clone()], Vec::new());
    }

    /// 在参考节点之前插入子节点
    pub fn insert_before(
        &mut self,
        parent: &Handle,
        child: &Handle,
        reference: &Handle,
    ) -> HarvestResult<()> {
        if !parent
            .children
            .borrow()
            .iter()
            .any(|node| Rc::ptr_eq(node, reference))
        {
            return Err(HarvestError::Traversal(
                "参考节点不是目标父节点的子节点".to_string(),
            ));
        }

        self.record_detach(child);
        dom::insert_before(parent, child, reference)?;
        self.record_child_list(parent, vec![child.clone()], Vec::new());
        Ok(())
    }

    /// 移除节点，返回原来的父节点
    pub fn remove_child(&mut self, child: &Handle) -> Option<Handle> {
        let observed = get_parent_node(child).filter(|parent| self.is_observed(parent));
        let (parent, _) = dom::remove_from_parent(child)?;
        if observed.is_some() {
            self.record_child_list(&parent, Vec::new(), vec![child.clone()]);
        }
        Some(parent)
    }

    /// 修改文本节点内容
    pub fn set_text(&mut self, node: &Handle, text: &str) -> bool {
        let old_value = match dom::get_text(node) {
            Some(old_value) => old_value,
            None => return false,
        };
        dom::set_text(node, text);

        if self.connected && self.is_observed(node) {
            self.records.push(MutationRecord::CharacterData {
                target: node.clone(),
                old_value,
            });
        }
        true
    }

    fn record_detach(&mut self, child: &Handle) {
        if let Some(old_parent) = get_parent_node(child) {
            if self.is_observed(&old_parent) {
                self.record_child_list(&old_parent, Vec::new(), vec![child.clone()]);
            }
        }
    }

    fn record_child_list(&mut self, parent: &Handle, added: Vec<Handle>, removed: Vec<Handle>) {
        if !self.connected || !self.is_observed(parent) {
            return;
        }
        self.records.push(MutationRecord::ChildList {
            target: parent.clone(),
            added,
            removed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{attach_shadow, create_element, create_text};

    #[test]
    fn test_records_insertions_inside_root() {
        let body = create_element("body", &[]);
        let mut watcher = MutationWatcher::observe(&body);

        let div = create_element("div", &[]);
        watcher.append_child(&body, &div);
        let text = create_text("hello");
        watcher.append_child(&div, &text);

        let records = watcher.take_records();
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[0], MutationRecord::ChildList { added, .. } if added.len() == 1));
        assert_eq!(watcher.pending_records(), 0);
    }

    #[test]
    fn test_ignores_detached_and_shadow_targets() {
        let body = create_element("body", &[]);
        let mut watcher = MutationWatcher::observe(&body);

        let detached = create_element("div", &[]);
        watcher.append_child(&detached, &create_text("x"));

        let host = create_element("div", &[]);
        watcher.append_child(&body, &host);
        let shadow = attach_shadow(&host, "open").unwrap();
        watcher.append_child(&shadow, &create_element("p", &[]));

        // 只有把宿主挂到 body 上的那一次被记录
        assert_eq!(watcher.take_records().len(), 1);
    }

    #[test]
    fn test_move_records_removal_and_addition() {
        let body = create_element("body", &[]);
        let a = create_element("div", &[]);
        let b = create_element("div", &[]);
        let mut watcher = MutationWatcher::observe(&body);
        watcher.append_child(&body, &a);
        watcher.append_child(&body, &b);
        let span = create_element("span", &[]);
        watcher.append_child(&a, &span);
        watcher.take_records();

        watcher.append_child(&b, &span);
        let records = watcher.take_records();
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[0], MutationRecord::ChildList { removed, .. } if removed.len() == 1));
        assert!(Rc::ptr_eq(records[1].target(), &b));
    }

    #[test]
    fn test_character_data_and_disconnect() {
        let body = create_element("body", &[]);
        let text = create_text("before");
        let mut watcher = MutationWatcher::observe(&body);
        watcher.append_child(&body, &text);
        watcher.take_records();

        assert!(watcher.set_text(&text, "after"));
        let records = watcher.take_records();
        assert!(matches!(&records[0], MutationRecord::CharacterData { old_value, .. } if old_value == "before"));

        watcher.disconnect();
        watcher.append_child(&body, &create_element("p", &[]));
        assert_eq!(watcher.take_records().len(), 0);
        assert!(!watcher.set_text(&body, "not a text node"));
    }

    #[test]
    fn test_insert_before_rejects_foreign_reference() {
        let body = create_element("body", &[]);
        let stranger = create_element("p", &[]);
        let mut watcher = MutationWatcher::observe(&body);
        assert!(watcher
            .insert_before(&body, &create_element("div", &[]), &stranger)
            .is_err());
        assert_eq!(watcher.pending_records(), 0);
    }
}
