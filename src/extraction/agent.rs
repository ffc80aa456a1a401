//! 页面代理
//!
//! 持有一个文档的提取上下文和高亮层，把按 `action` 区分的 JSON 消息分发到对应操作：
//!
//! ```json
//! {"action": "extractPage", "languages": ["ko", "en"]}
//! {"action": "getStats"}
//! ```

use std::rc::Rc;

use markup5ever_rcdom::Handle;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::HarvestResult;
use crate::extraction::engine::{ExtractionContext, Stats};
use crate::extraction::export::{export_files, ExportFile};
use crate::extraction::language::LanguageSet;
use crate::extraction::overlay::HighlightOverlay;
use crate::extraction::storage::Storage;
use crate::extraction::store::TranslationStore;

/// 传入消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// 整页提取；未给出语言时提取全部语言
    ExtractPage {
        #[serde(default)]
        languages: Option<Vec<String>>,
    },
    GetStats,
    StartHighlight,
    StopHighlight,
    /// 导出高亮层的占位条目
    ExportTranslations,
    /// 按语言导出翻译库
    ExportLanguages {
        #[serde(default)]
        languages: Option<Vec<String>>,
    },
    /// 标注指定键的高亮
    AnnotateHighlight { key: String },
    ClearData,
}

/// 返回消息
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Stats(Stats),
    Highlight { success: bool, highlighted: usize, stats: Stats },
    Export { success: bool, files: Vec<ExportFile> },
    Ack { success: bool },
    Error { success: bool, error: String },
}

impl Response {
    pub fn ok() -> Self {
        Response::Ack { success: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            success: false,
            error: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Response::Stats(_) => true,
            Response::Highlight { success, .. }
            | Response::Export { success, .. }
            | Response::Ack { success }
            | Response::Error { success, .. } => *success,
        }
    }
}

/// 单个文档的消息处理器
pub struct PageAgent {
    context: ExtractionContext,
    overlay: HighlightOverlay,
}

impl PageAgent {
    pub fn new(document: &Handle, storage: Rc<dyn Storage>) -> HarvestResult<Self> {
        let context = ExtractionContext::for_document(document, Rc::clone(&storage))?;
        let overlay = HighlightOverlay::for_document(document, storage)?;
        Ok(Self { context, overlay })
    }

    pub fn from_parts(context: ExtractionContext, overlay: HighlightOverlay) -> Self {
        Self { context, overlay }
    }

    /// 读取已持久化的翻译库，使后续 `getStats` 反映已有条目
    pub async fn load_existing(&mut self) -> HarvestResult<Stats> {
        let stats = self.context.reload().await?;
        debug!("已载入翻译库: {} 条已处理", stats.processed_count);
        Ok(stats)
    }

    pub fn context(&self) -> &ExtractionContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ExtractionContext {
        &mut self.context
    }

    pub fn overlay(&self) -> &HighlightOverlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut HighlightOverlay {
        &mut self.overlay
    }

    /// 处理一条消息，错误转换为 `{success: false, error}`
    pub async fn handle(&mut self, request: Request) -> Response {
        debug!("处理消息: {:?}", request);

        match request {
            Request::ExtractPage { languages } => {
                let requested = requested_languages(languages.as_deref());
                let report = self.context.extract_page(requested).await;
                match report.error {
                    None => Response::ok(),
                    Some(e) => Response::error(e.to_string()),
                }
            }
            Request::GetStats => Response::Stats(self.context.get_stats()),
            Request::StartHighlight => {
                let highlighted = self.overlay.start();
                Response::Highlight {
                    success: true,
                    highlighted,
                    stats: self.overlay.stats(),
                }
            }
            Request::StopHighlight => match self.overlay.stop() {
                Ok(_) => Response::ok(),
                Err(e) => Response::error(e.to_string()),
            },
            Request::ExportTranslations => match self.overlay.export().await {
                Ok(file) => Response::Export {
                    success: true,
                    files: vec![file],
                },
                Err(e) => Response::error(e.to_string()),
            },
            Request::ExportLanguages { languages } => {
                let languages = requested_languages(languages.as_deref());
                match self.export_languages(languages).await {
                    Ok(files) => Response::Export {
                        success: true,
                        files,
                    },
                    Err(e) => Response::error(e.to_string()),
                }
            }
            Request::AnnotateHighlight { key } => match self.overlay.click_key(&key).await {
                Ok(stats) => Response::Highlight {
                    success: true,
                    highlighted: self.overlay.highlights().len(),
                    stats,
                },
                Err(e) => Response::error(e.to_string()),
            },
            Request::ClearData => match self.context.clear_data().await {
                Ok(()) => Response::ok(),
                Err(e) => Response::error(e.to_string()),
            },
        }
    }

    /// 解析 JSON 消息并返回 JSON 应答
    pub async fn handle_json(&mut self, raw: &str) -> String {
        let response = match serde_json::from_str::<Request>(raw) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                warn!("无法解析消息: {}", e);
                Response::error(format!("无法解析消息: {}", e))
            }
        };

        serde_json::to_string(&response).unwrap_or_else(|e| {
            format!("{{\"success\":false,\"error\":\"无法序列化应答: {}\"}}", e)
        })
    }

    async fn export_languages(&mut self, languages: LanguageSet) -> HarvestResult<Vec<ExportFile>> {
        let storage = self.context.storage();
        let store = TranslationStore::from_value(storage.get(self.context.storage_key()).await?)?;
        export_files(&store, languages)
    }
}

fn requested_languages(codes: Option<&[String]>) -> LanguageSet {
    match codes {
        Some(codes) => LanguageSet::parse_codes_lenient(codes),
        None => LanguageSet::all(),
    }
}
