//! 已处理节点集合
//!
//! 以节点地址为键、弱引用为值的身份映射。弱引用不延长节点的生命周期，
//! 但会保住节点的内存分配，因此记录期间地址不会被新节点复用。

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, Node};

#[derive(Debug, Default)]
pub struct ProcessedSet {
    nodes: HashMap<*const Node, Weak<Node>>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 标记节点为已处理，返回该节点此前是否未被标记
    pub fn mark(&mut self, node: &Handle) -> bool {
        let key = Rc::as_ptr(node);
        match self.nodes.get(&key) {
            Some(existing) if existing.strong_count() > 0 => false,
            _ => {
                self.nodes.insert(key, Rc::downgrade(node));
                true
            }
        }
    }

    pub fn contains(&self, node: &Handle) -> bool {
        self.nodes
            .get(&Rc::as_ptr(node))
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// 清理已被释放的节点，返回清理的数量
    pub fn prune(&mut self) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|_, weak| weak.strong_count() > 0);
        before - self.nodes.len()
    }

    /// 记录中的节点数（可能包含尚未清理的已释放节点）
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::create_text;

    #[test]
    fn test_mark_is_idempotent() {
        let mut set = ProcessedSet::new();
        let node = create_text("안녕");
        assert!(set.mark(&node));
        assert!(!set.mark(&node));
        assert!(set.contains(&node));
        assert!(!set.contains(&create_text("안녕")));
    }

    #[test]
    fn test_set_does_not_keep_nodes_alive() {
        let mut set = ProcessedSet::new();
        let node = create_text("temporary");
        let weak = Rc::downgrade(&node);
        set.mark(&node);
        assert_eq!(Rc::strong_count(&node), 1);

        drop(node);
        assert!(weak.upgrade().is_none());
        assert_eq!(set.prune(), 1);
        assert!(set.is_empty());
    }
}
