use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{trace, warn};
use url::Url;

use super::Translator;
use crate::error::{HarvestError, HarvestResult};
use crate::extraction::config::constants;
use crate::extraction::language::Language;

/// 调用 `translate_a/single` 接口的翻译器
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    api_url: Url,
    client: Client,
}

impl GoogleTranslator {
    pub fn new(api_url: &str, timeout: Duration) -> HarvestResult<Self> {
        let api_url = Url::parse(api_url)
            .map_err(|e| HarvestError::Config(format!("无效的翻译 API 地址 {}: {}", api_url, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HarvestError::Network(format!("无法创建 HTTP 客户端: {}", e)))?;

        Ok(Self { api_url, client })
    }

    pub fn with_defaults() -> HarvestResult<Self> {
        Self::new(
            constants::DEFAULT_TRANSLATE_API_URL,
            Duration::from_secs(constants::DEFAULT_TRANSLATE_TIMEOUT_SECS),
        )
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// 构造请求地址
    pub fn request_url(&self, text: &str, from: Language, to: Language) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("client", "gtx")
            .append_pair("sl", from.code())
            .append_pair("tl", to.code())
            .append_pair("dt", "t")
            .append_pair("q", text);
        url
    }

    async fn request(&self, text: &str, from: Language, to: Language) -> HarvestResult<String> {
        let url = self.request_url(text, from, to);
        trace!("请求翻译: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HarvestError::Network(format!("翻译请求失败: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Network(format!("翻译接口返回状态 {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| HarvestError::Serialization(format!("翻译响应不是合法 JSON: {}", e)))?;

        first_segment(&body)
            .map(str::to_string)
            .ok_or_else(|| HarvestError::Serialization("翻译响应中没有译文".to_string()))
    }
}

#[async_trait(?Send)]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, from: Language, to: Language) -> String {
        match self.request(text, from, to).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!("翻译 {} -> {} 失败，保留原文: {}", from, to, e);
                text.to_string()
            }
        }
    }
}

/// 取响应 `[0][0][0]` 处的译文，空字符串视为缺失
fn first_segment(body: &Value) -> Option<&str> {
    body.get(0)?
        .get(0)?
        .get(0)?
        .as_str()
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_url_encodes_query() {
        let translator = GoogleTranslator::with_defaults().unwrap();
        let url = translator.request_url("저장 & 닫기", Language::Ko, Language::En);

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs[0], ("client".to_string(), "gtx".to_string()));
        assert_eq!(pairs[1], ("sl".to_string(), "ko".to_string()));
        assert_eq!(pairs[2], ("tl".to_string(), "en".to_string()));
        assert_eq!(pairs[4], ("q".to_string(), "저장 & 닫기".to_string()));
        assert!(url.as_str().starts_with(constants::DEFAULT_TRANSLATE_API_URL));
    }

    #[test]
    fn test_first_segment() {
        let body = json!([[["Save", "저장", null, null, 10]], null, "ko"]);
        assert_eq!(first_segment(&body), Some("Save"));
        assert_eq!(first_segment(&json!([[[""]]])), None);
        assert_eq!(first_segment(&json!({"error": 1})), None);
    }

    #[test]
    fn test_invalid_api_url() {
        assert!(matches!(
            GoogleTranslator::new("not a url", Duration::from_secs(1)),
            Err(HarvestError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_echoes_original() {
        // 端口 9 (discard) 在测试环境中不会有 HTTP 服务
        let translator =
            GoogleTranslator::new("http://127.0.0.1:9/translate", Duration::from_secs(2)).unwrap();
        let result = translator.translate("안녕하세요", Language::Ko, Language::En).await;
        assert_eq!(result, "안녕하세요");
    }
}
