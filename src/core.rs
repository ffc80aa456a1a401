//! 文档加载与一次性提取
//!
//! 把输入字节解析为 DOM（按 `<meta>` 声明的字符集重新解码），
//! 并提供对整份文档执行一次提取的便捷入口。

use std::fs;
use std::path::Path;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, RcDom};
use url::Url;

use crate::error::{HarvestError, HarvestResult};
use crate::extraction::config::{constants, HarvestConfig};
use crate::extraction::engine::{ExtractionContext, PassReport};
use crate::extraction::language::LanguageSet;
use crate::extraction::pipeline::keys::KeyDialect;
use crate::extraction::storage::Storage;
use crate::parsers::html::dom::{find_first_element, get_head, get_node_attr, html_to_dom};

const DEFAULT_ENCODING: &str = "utf-8";

/// 单次提取的选项
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// 输入编码，未指定时按文档声明的字符集解码
    pub encoding: Option<String>,
    /// 写入新条目的来源地址
    pub source_url: Option<String>,
    pub languages: LanguageSet,
    pub key_dialect: KeyDialect,
    pub storage_key: String,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            encoding: None,
            source_url: None,
            languages: LanguageSet::all(),
            key_dialect: KeyDialect::default(),
            storage_key: constants::STORE_KEY.to_string(),
        }
    }
}

impl HarvestOptions {
    /// 以配置中的默认值构建
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            encoding: None,
            source_url: config.source_url.clone(),
            languages: config.languages(),
            key_dialect: KeyDialect::default(),
            storage_key: config.storage_key.clone(),
        }
    }
}

/// 解析 `Content-Type` 形式的字符串，返回 (媒体类型, 字符集)
pub fn parse_content_type(content_type: &str) -> (String, String) {
    let mut parts = content_type.split(';');
    let media_type = parts
        .next()
        .map(|part| part.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let charset = parts
        .map(str::trim)
        .find_map(|part| {
            part.strip_prefix("charset=")
                .map(|value| value.trim_matches('"').to_string())
        })
        .unwrap_or_default();

    (media_type, charset)
}

/// 读取文档在 `<meta>` 中声明的字符集
pub fn get_charset(document: &Handle) -> Option<String> {
    let head = get_head(document)?;
    let mut stack = vec![head];

    while let Some(node) = stack.pop() {
        if let Some(charset) = get_node_attr(&node, "charset") {
            return Some(charset);
        }
        if get_node_attr(&node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
        {
            if let Some(content) = get_node_attr(&node, "content") {
                let (_, charset) = parse_content_type(&content);
                if !charset.is_empty() {
                    return Some(charset);
                }
            }
        }
        for child in node.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
    }

    None
}

/// 把字节解析为 DOM
///
/// 指定了编码时直接使用；否则先按 UTF-8 解析，若文档声明了其他字符集则重新解码。
pub fn load_document(input: &[u8], encoding: Option<&str>) -> HarvestResult<RcDom> {
    if let Some(encoding) = encoding {
        return html_to_dom(input, encoding);
    }

    let dom = html_to_dom(input, DEFAULT_ENCODING)?;
    match get_charset(&dom.document) {
        Some(charset)
            if !charset.is_empty() && !charset.eq_ignore_ascii_case(DEFAULT_ENCODING) =>
        {
            tracing::debug!("按文档声明的字符集 {} 重新解码", charset);
            html_to_dom(input, &charset)
        }
        _ => Ok(dom),
    }
}

/// 从本地文件读取文档
pub fn read_document(path: &Path, encoding: Option<&str>) -> HarvestResult<RcDom> {
    let data = fs::read(path)
        .map_err(|e| HarvestError::Io(format!("无法读取 {}: {}", path.display(), e)))?;
    load_document(&data, encoding)
}

/// 本地文件对应的 `file://` 地址
pub fn source_url_for_path(path: &Path) -> Option<String> {
    let absolute = fs::canonicalize(path).ok()?;
    Url::from_file_path(absolute).ok().map(String::from)
}

/// 对整份文档执行一次提取，返回上下文以便继续观察变更或查询统计
pub async fn harvest_document(
    dom: &RcDom,
    storage: Rc<dyn Storage>,
    options: &HarvestOptions,
) -> HarvestResult<(ExtractionContext, PassReport)> {
    if find_first_element(&dom.document, "body").is_none() {
        return Err(HarvestError::Traversal("文档中没有 BODY 元素".to_string()));
    }

    let mut context = ExtractionContext::for_document(&dom.document, storage)?
        .with_storage_key(options.storage_key.clone())
        .with_key_dialect(options.key_dialect);
    if let Some(source_url) = &options.source_url {
        context = context.with_source_url(source_url.clone());
    }

    let report = context.extract_page(options.languages).await;
    Ok((context, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::storage::MemoryStorage;

    #[test]
    fn test_parse_content_type() {
        assert_eq!(
            parse_content_type("text/html; charset=\"EUC-KR\""),
            ("text/html".to_string(), "EUC-KR".to_string())
        );
        assert_eq!(
            parse_content_type("text/plain"),
            ("text/plain".to_string(), String::new())
        );
    }

    #[test]
    fn test_declared_charset_is_used() {
        let (encoded, _, _) = encoding_rs::EUC_KR.encode(
            "<html><head><meta charset=\"euc-kr\"></head><body><p>안녕하세요</p></body></html>",
        );
        let dom = load_document(&encoded, None).unwrap();
        let p = find_first_element(&dom.document, "p").unwrap();
        assert_eq!(crate::parsers::html::dom::text_content(&p), "안녕하세요");
    }

    #[test]
    fn test_http_equiv_charset() {
        let dom = load_document(
            b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\"></head></html>",
            None,
        )
        .unwrap();
        assert_eq!(get_charset(&dom.document).as_deref(), Some("utf-8"));
    }

    #[tokio::test]
    async fn test_harvest_document_with_options() {
        let dom = load_document("<p>안녕하세요</p><p>Hello there</p>".as_bytes(), None).unwrap();
        let storage = Rc::new(MemoryStorage::new());
        let options = HarvestOptions {
            source_url: Some("https://a.test/".to_string()),
            storage_key: "custom".to_string(),
            ..Default::default()
        };

        let (context, report) = harvest_document(&dom, storage.clone(), &options)
            .await
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.entries_created, 2);
        assert_eq!(context.stats().processed_count, 2);

        let saved = storage.snapshot("custom").unwrap();
        assert_eq!(saved["hello_there"]["en"], "Hello there");
        assert_eq!(saved["안녕하세요"]["sourceUrl"], "https://a.test/");
    }
}
