//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::error::{HarvestError, HarvestResult};
use crate::extraction::language::{Language, LanguageSet};

/// 提取引擎配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HarvestConfig {
    // 存储配置
    pub store_path: String,
    pub storage_key: String,
    pub overlay_storage_key: String,
    pub export_dir: String,

    // 提取配置
    pub default_languages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    // 翻译配置
    pub translate_enabled: bool,
    pub translate_api_url: String,
    pub translate_timeout_secs: u64,

    // 日志配置
    pub log_level: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            store_path: constants::DEFAULT_STORE_PATH.to_string(),
            storage_key: constants::STORE_KEY.to_string(),
            overlay_storage_key: constants::OVERLAY_STORE_KEY.to_string(),
            export_dir: ".".to_string(),

            default_languages: vec![Language::Ko.code().to_string()],
            source_url: None,

            translate_enabled: true,
            translate_api_url: constants::DEFAULT_TRANSLATE_API_URL.to_string(),
            translate_timeout_secs: constants::DEFAULT_TRANSLATE_TIMEOUT_SECS,

            log_level: "info".to_string(),
        }
    }
}

impl HarvestConfig {
    /// 验证配置
    pub fn validate(&self) -> HarvestResult<()> {
        if self.store_path.trim().is_empty() {
            return Err(HarvestError::Config("存储路径不能为空".to_string()));
        }

        if self.storage_key.is_empty() || self.overlay_storage_key.is_empty() {
            return Err(HarvestError::Config("存储键不能为空".to_string()));
        }

        if self.storage_key == self.overlay_storage_key {
            return Err(HarvestError::Config(
                "提取存储键与高亮存储键不能相同".to_string(),
            ));
        }

        LanguageSet::parse_codes(&self.default_languages)
            .map_err(|e| HarvestError::Config(e.to_string()))?;

        if self.translate_timeout_secs == 0 {
            return Err(HarvestError::Config("翻译超时时间必须大于0".to_string()));
        }

        if !(self.translate_api_url.starts_with("http://")
            || self.translate_api_url.starts_with("https://"))
        {
            return Err(HarvestError::Config(format!(
                "翻译 API URL 无效: {}",
                self.translate_api_url
            )));
        }

        Ok(())
    }

    /// 应用环境变量覆盖（使用类型安全环境变量系统）
    ///
    /// 只有显式设置的变量才会覆盖文件中的值，设置了但无法解析的变量会报错。
    pub fn apply_env_overrides(&mut self) -> HarvestResult<()> {
        use crate::env::{core, extraction, storage, translation, EnvVar};

        if let Some(level) = core::LogLevel::get_if_set() {
            self.log_level = level?;
        }

        if let Some(path) = storage::StorePath::get_if_set() {
            self.store_path = path?;
            tracing::info!("环境变量覆盖存储路径: {}", self.store_path);
        }

        if let Some(dir) = storage::ExportDir::get_if_set() {
            self.export_dir = dir?;
        }

        if let Some(languages) = extraction::Languages::get_if_set() {
            self.default_languages = languages?;
        }

        if let Some(source_url) = extraction::SourceUrl::get_if_set() {
            self.source_url = Some(source_url?);
        }

        if let Some(enabled) = translation::Enabled::get_if_set() {
            self.translate_enabled = enabled?;
        }

        if let Some(api_url) = translation::ApiUrl::get_if_set() {
            self.translate_api_url = api_url?;
            tracing::info!("环境变量覆盖翻译 API URL: {}", self.translate_api_url);
        }

        if let Some(timeout) = translation::Timeout::get_if_set() {
            self.translate_timeout_secs = timeout?.as_secs();
        }

        Ok(())
    }

    /// 默认提取语言集合
    pub fn languages(&self) -> LanguageSet {
        LanguageSet::parse_codes_lenient(&self.default_languages)
    }

    pub fn translate_timeout(&self) -> Duration {
        Duration::from_secs(self.translate_timeout_secs)
    }

    /// 展开 `~` 之后的存储路径
    pub fn expanded_store_path(&self) -> String {
        shellexpand::tilde(&self.store_path).into_owned()
    }

    pub fn expanded_export_dir(&self) -> String {
        shellexpand::tilde(&self.export_dir).into_owned()
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: HarvestConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器（搜索默认配置路径）
    pub fn new() -> HarvestResult<Self> {
        Self::load_dotenv();
        let config = Self::load_config()?;
        Self::finish(config)
    }

    /// 从指定文件创建配置管理器
    pub fn from_path(path: &str) -> HarvestResult<Self> {
        Self::load_dotenv();
        let expanded_path = shellexpand::tilde(path);
        tracing::info!("加载配置文件: {}", expanded_path);
        let config = Self::load_from_file(&expanded_path)?;
        Self::finish(config)
    }

    /// 不读取任何文件，仅使用默认值和环境变量
    pub fn from_env() -> HarvestResult<Self> {
        Self::finish(HarvestConfig::default())
    }

    fn finish(mut config: HarvestConfig) -> HarvestResult<Self> {
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &HarvestConfig {
        &self.config
    }

    pub fn into_config(self) -> HarvestConfig {
        self.config
    }

    /// 从默认搜索路径加载配置
    fn load_config() -> HarvestResult<HarvestConfig> {
        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(HarvestConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &str) -> HarvestResult<HarvestConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HarvestError::Config(format!("读取配置文件失败: {}", e)))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .map_err(|e| HarvestError::Config(format!("解析JSON配置失败: {}", e)))
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        for env_file in constants::DOTENV_FILES {
            if Path::new(env_file).exists() {
                if dotenv::from_filename(env_file).is_ok() {
                    tracing::info!("已加载环境变量文件: {}", env_file);
                    break;
                }
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> HarvestResult<()> {
        let config = HarvestConfig::default();
        let content = toml::to_string_pretty(&config)?;

        std::fs::write(path, content)
            .map_err(|e| HarvestError::Config(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HarvestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.languages().codes(), vec!["ko"]);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = HarvestConfig::default();
        config.default_languages = vec!["xx".to_string()];
        assert!(config.validate().is_err());

        let mut config = HarvestConfig::default();
        config.overlay_storage_key = config.storage_key.clone();
        assert!(config.validate().is_err());

        let mut config = HarvestConfig::default();
        config.translate_api_url = "translate.local".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: HarvestConfig =
            toml::from_str("store_path = \"/tmp/store.redb\"\ndefault_languages = [\"en\", \"ja\"]\n")
                .unwrap();
        assert_eq!(config.store_path, "/tmp/store.redb");
        assert_eq!(config.languages().codes(), vec!["en", "ja"]);
        assert_eq!(config.storage_key, constants::STORE_KEY);
    }

    #[test]
    fn test_example_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("i18n-harvest.toml");
        let path = path.to_str().unwrap();

        ConfigManager::generate_example_config(path).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        let config: HarvestConfig = toml::from_str(&content).unwrap();
        assert_eq!(config.storage_key, constants::STORE_KEY);
        assert_eq!(config.translate_timeout_secs, constants::DEFAULT_TRANSLATE_TIMEOUT_SECS);
    }
}
