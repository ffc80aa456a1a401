//! 统一错误处理
//!
//! 提供结构化错误类型和错误分类机制

use std::fmt;

use thiserror::Error;

use crate::env::EnvError;

/// 提取引擎错误类型
#[derive(Error, Debug, Clone)]
pub enum HarvestError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 持久化存储错误
    #[error("存储错误: {0}")]
    Storage(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// DOM遍历错误（节点已分离或结构异常）
    #[error("DOM遍历错误: {0}")]
    Traversal(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 文件读写错误
    #[error("IO错误: {0}")]
    Io(String),
}

impl HarvestError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            HarvestError::Storage(_) => true,
            HarvestError::Network(_) => true,
            HarvestError::Io(_) => true,
            HarvestError::Config(_) => false,
            HarvestError::Serialization(_) => false,
            HarvestError::Traversal(_) => false,
            HarvestError::InvalidInput(_) => false,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarvestError::Config(_) => ErrorCategory::Configuration,
            HarvestError::Storage(_) => ErrorCategory::Persistence,
            HarvestError::Serialization(_) => ErrorCategory::Persistence,
            HarvestError::Io(_) => ErrorCategory::Persistence,
            HarvestError::Traversal(_) => ErrorCategory::Traversal,
            HarvestError::Network(_) => ErrorCategory::ExternalService,
            HarvestError::InvalidInput(_) => ErrorCategory::Input,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        let new_msg = |msg: String| format!("{} (上下文: {})", msg, context);

        match self {
            HarvestError::Config(msg) => HarvestError::Config(new_msg(msg)),
            HarvestError::Storage(msg) => HarvestError::Storage(new_msg(msg)),
            HarvestError::Serialization(msg) => HarvestError::Serialization(new_msg(msg)),
            HarvestError::Traversal(msg) => HarvestError::Traversal(new_msg(msg)),
            HarvestError::Network(msg) => HarvestError::Network(new_msg(msg)),
            HarvestError::InvalidInput(msg) => HarvestError::InvalidInput(new_msg(msg)),
            HarvestError::Io(msg) => HarvestError::Io(new_msg(msg)),
        }
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Persistence,
    Traversal,
    ExternalService,
    Input,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Persistence => "persistence",
            ErrorCategory::Traversal => "traversal",
            ErrorCategory::ExternalService => "external-service",
            ErrorCategory::Input => "input",
        };
        f.write_str(name)
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(error: serde_json::Error) -> Self {
        HarvestError::Serialization(error.to_string())
    }
}

impl From<std::io::Error> for HarvestError {
    fn from(error: std::io::Error) -> Self {
        HarvestError::Io(error.to_string())
    }
}

impl From<toml::de::Error> for HarvestError {
    fn from(error: toml::de::Error) -> Self {
        HarvestError::Config(format!("解析TOML配置失败: {}", error))
    }
}

impl From<toml::ser::Error> for HarvestError {
    fn from(error: toml::ser::Error) -> Self {
        HarvestError::Config(format!("序列化配置失败: {}", error))
    }
}

impl From<EnvError> for HarvestError {
    fn from(error: EnvError) -> Self {
        HarvestError::Config(error.to_string())
    }
}

/// 结果类型别名
pub type HarvestResult<T> = Result<T, HarvestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            HarvestError::Storage("disk full".to_string()).category(),
            ErrorCategory::Persistence
        );
        assert_eq!(
            HarvestError::Traversal("detached".to_string()).category(),
            ErrorCategory::Traversal
        );
        assert!(HarvestError::Network("timeout".to_string()).is_retryable());
        assert!(!HarvestError::InvalidInput("xx".to_string()).is_retryable());
    }

    #[test]
    fn test_with_context_keeps_variant() {
        let err = HarvestError::Storage("write failed".to_string()).with_context("translations");
        assert!(matches!(err, HarvestError::Storage(_)));
        assert!(err.to_string().contains("translations"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: HarvestError = parse.unwrap_err().into();
        assert_eq!(err.category(), ErrorCategory::Persistence);
    }
}
