use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use super::Storage;
use crate::error::HarvestResult;

/// 进程内存储
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RefCell<HashMap<String, Value>>,
    writes: RefCell<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一个值（不计入写入次数）
    pub fn with_value(key: &str, value: Value) -> Self {
        let storage = Self::new();
        storage.values.borrow_mut().insert(key.to_string(), value);
        storage
    }

    /// 同步读取当前值的副本
    pub fn snapshot(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    /// 累计 `set` 调用次数
    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }
}

#[async_trait(?Send)]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> HarvestResult<Option<Value>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> HarvestResult<()> {
        self.values.borrow_mut().insert(key.to_string(), value);
        *self.writes.borrow_mut() += 1;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> HarvestResult<()> {
        let mut values = self.values.borrow_mut();
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }
}
