//! 持久化存储模块
//!
//! 提取引擎只依赖 `Storage` 特性：`get`、`set`、`remove` 三个异步操作，
//! 值为任意 JSON。`set` 是整值替换。
//!
//! - `memory`: 进程内存储，适合测试与嵌入
//! - `disk`: 基于 redb 的磁盘存储，每次 `set` 一个写事务

pub mod memory;
pub mod disk;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HarvestResult;

pub use self::memory::MemoryStorage;
pub use self::disk::RedbStorage;

/// 键值持久化协作方
#[async_trait(?Send)]
pub trait Storage {
    /// 读取键对应的值，不存在时返回 `None`
    async fn get(&self, key: &str) -> HarvestResult<Option<Value>>;

    /// 以原子替换的方式写入键
    async fn set(&self, key: &str, value: Value) -> HarvestResult<()>;

    /// 删除一组键，不存在的键被忽略
    async fn remove(&self, keys: &[&str]) -> HarvestResult<()>;
}
