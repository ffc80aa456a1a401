//! 提取配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, HarvestConfig};

/// 配置常量
pub mod constants {
    // 选择器相关
    /// 不承载可本地化文本的容器元素
    pub const EXCLUDED_CONTAINERS: &[&str] = &[
        "td", "input", "textarea", "select", "option", "button", "a", "script", "style",
    ];

    /// 浏览器默认样式表中计算为 `display: none` 的容器元素
    pub const UA_HIDDEN_CONTAINERS: &[&str] = &["noscript", "template", "title", "rp", "datalist"];

    /// 框架内部使用的根节点标记属性
    pub const FRAMEWORK_MARKER_ATTRS: &[&str] = &["data-reactroot", "data-reactid"];

    // 分类器相关
    /// 纯标点文本的字符集合
    pub const PUNCTUATION_SET: &str = "!@#$%^&*(),.?\":{}|<>";

    // 键生成相关
    pub const MAX_KEY_LENGTH: usize = 50;
    pub const KEY_SEPARATOR: char = '_';
    pub const OVERLAY_KEY_SEPARATOR: char = '-';

    // 存储相关
    pub const STORE_KEY: &str = "translations";
    pub const OVERLAY_STORE_KEY: &str = "i18n-translations";
    pub const DEFAULT_STORE_PATH: &str = "i18n-harvest.redb";

    // 高亮层相关
    pub const WRAPPER_CLASS: &str = "i18n-wrapper";
    pub const HIGHLIGHT_CLASS: &str = "i18n-highlight";
    pub const ORIGINAL_TEXT_ATTR: &str = "data-original-text";
    pub const KEY_ATTR: &str = "data-i18n-key";
    pub const STYLE_MARKER_ATTR: &str = "data-i18n-overlay";
    pub const PROCESSED_BACKGROUND: &str = "#e8f5e9";
    pub const HIGHLIGHT_CSS: &str = ".i18n-highlight {\n  background-color: #fff3e0;\n  cursor: pointer;\n  padding: 2px 4px;\n  border-radius: 2px;\n}\n.i18n-highlight:hover {\n  background-color: #ffe0b2;\n}\n";
    pub const OVERLAY_EXPORT_FILE: &str = "translations.json";

    // 翻译相关
    pub const DEFAULT_TRANSLATE_API_URL: &str = "https://translate.googleapis.com/translate_a/single";
    pub const DEFAULT_TRANSLATE_TIMEOUT_SECS: u64 = 30;

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "i18n-harvest.toml",
        ".i18n-harvest.toml",
        "i18n-harvest.json",
        "~/.config/i18n-harvest/config.toml",
        "/etc/i18n-harvest/config.toml",
    ];

    // 环境变量文件
    pub const DOTENV_FILES: &[&str] = &[".env.local", ".env"];
}
