//! 基于 redb 的磁盘存储
//!
//! 所有键放在同一张表中，值以 JSON 文本保存。每次写入都在单独的写事务中完成，
//! 提交成功前旧值保持可见。

use std::path::Path;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition, TableError};
use serde_json::Value;

use super::Storage;
use crate::error::{HarvestError, HarvestResult};

const STORAGE_TABLE: TableDefinition<&str, &str> = TableDefinition::new("storage");

fn storage_error(error: impl Into<redb::Error>) -> HarvestError {
    HarvestError::Storage(error.into().to_string())
}

/// 磁盘存储
pub struct RedbStorage {
    db: Database,
}

impl RedbStorage {
    /// 打开或创建数据库文件
    pub fn open(path: impl AsRef<Path>) -> HarvestResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::create(path).map_err(|e| {
            storage_error(e).with_context(format!("打开数据库 {}", path.display()))
        })?;
        tracing::debug!("打开存储数据库: {}", path.display());

        Ok(Self { db })
    }

    /// 列出所有已存储的键
    pub fn keys(&self) -> HarvestResult<Vec<String>> {
        let read_txn = self.db.begin_read().map_err(storage_error)?;
        let table = match read_txn.open_table(STORAGE_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(storage_error(e)),
        };

        let mut keys = Vec::new();
        for item in table.iter().map_err(storage_error)? {
            let (key, _) = item.map_err(storage_error)?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }

    fn read(&self, key: &str) -> HarvestResult<Option<Value>> {
        let read_txn = self.db.begin_read().map_err(storage_error)?;
        let table = match read_txn.open_table(STORAGE_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(storage_error(e)),
        };

        match table.get(key).map_err(storage_error)? {
            Some(guard) => {
                let value = serde_json::from_str(guard.value())
                    .map_err(|e| HarvestError::from(e).with_context(key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, value: &Value) -> HarvestResult<()> {
        let serialized = serde_json::to_string(value)?;

        let write_txn = self.db.begin_write().map_err(storage_error)?;
        {
            let mut table = write_txn.open_table(STORAGE_TABLE).map_err(storage_error)?;
            table
                .insert(key, serialized.as_str())
                .map_err(storage_error)?;
        }
        write_txn.commit().map_err(storage_error)?;

        tracing::trace!("写入存储键 {} ({} 字节)", key, serialized.len());
        Ok(())
    }

    fn delete(&self, keys: &[&str]) -> HarvestResult<()> {
        let write_txn = self.db.begin_write().map_err(storage_error)?;
        {
            let mut table = write_txn.open_table(STORAGE_TABLE).map_err(storage_error)?;
            for key in keys {
                table.remove(*key).map_err(storage_error)?;
            }
        }
        write_txn.commit().map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl Storage for RedbStorage {
    async fn get(&self, key: &str) -> HarvestResult<Option<Value>> {
        self.read(key)
    }

    async fn set(&self, key: &str, value: Value) -> HarvestResult<()> {
        self.write(key, &value)
    }

    async fn remove(&self, keys: &[&str]) -> HarvestResult<()> {
        self.delete(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.redb");

        {
            let storage = RedbStorage::open(&path).unwrap();
            assert!(storage.get("translations").await.unwrap().is_none());
            storage
                .set("translations", json!({"안녕": {"ko": "안녕"}}))
                .await
                .unwrap();
        }

        let storage = RedbStorage::open(&path).unwrap();
        assert_eq!(
            storage.get("translations").await.unwrap(),
            Some(json!({"안녕": {"ko": "안녕"}}))
        );
        assert_eq!(storage.keys().unwrap(), vec!["translations".to_string()]);

        storage.remove(&["translations"]).await.unwrap();
        assert!(storage.get("translations").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("store.redb");
        let storage = RedbStorage::open(&path).unwrap();
        storage.set("k", json!(1)).await.unwrap();
        assert!(path.exists());
    }
}
