// 集成测试公共模块
//
// 提供测试辅助工具和共享功能

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use markup5ever_rcdom::{Handle, RcDom};
use serde_json::Value;

use i18n_harvest::error::{HarvestError, HarvestResult};
use i18n_harvest::extraction::language::Language;
use i18n_harvest::extraction::storage::{MemoryStorage, Storage};
use i18n_harvest::extraction::translate::Translator;
use i18n_harvest::extraction::ExtractionContext;
use i18n_harvest::parsers::html::dom::{find_first_element, html_to_dom};

/// HTML 测试辅助工具
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    /// 创建测试用的DOM
    pub fn create_test_dom(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").expect("测试 HTML 应能解析")
    }

    /// 查找第一个指定名称的元素
    pub fn element(dom: &RcDom, name: &str) -> Handle {
        find_first_element(&dom.document, name).expect("测试 HTML 中应有该元素")
    }

    /// 10 个合格叶子，生成 6 个不同的键
    pub fn create_ten_leaf_page() -> String {
        r#"<html><body>
            <h1>안녕하세요</h1>
            <p>안녕하세요</p>
            <p>Hello World</p>
            <p>hello   world</p>
            <span>ありがとう</span>
            <span>ありがとう</span>
            <div>저장하기</div>
            <div>Sign up now</div>
            <li>Contact us</li>
            <li>Contact Us</li>
            <button>Click</button>
            <input value="ignored">
        </body></html>"#
            .to_string()
    }

    /// 混合语言与不可提取文本的页面
    pub fn create_mixed_language_page() -> String {
        r#"<html><head><title>Mixed</title></head><body>
            <h1>Welcome 환영합니다</h1>
            <p>12345</p>
            <p>!!!</p>
            <p>XMLHttpRequest</p>
            <p style="display:none">숨김 텍스트</p>
            <div hidden>Hidden text</div>
            <a href="/">링크</a>
            <p>東京タワー</p>
        </body></html>"#
            .to_string()
    }

    /// 带声明式 Shadow Root 的页面
    pub fn create_shadow_page() -> String {
        r#"<html><body>
            <p>Light text</p>
            <my-card>
                <template shadowrootmode="open"><p>그림자 안의 텍스트</p></template>
            </my-card>
        </body></html>"#
            .to_string()
    }
}

/// 创建内存存储
pub fn memory_storage() -> Rc<MemoryStorage> {
    Rc::new(MemoryStorage::new())
}

/// 以整个文档创建提取上下文
pub fn context_for(dom: &RcDom, storage: Rc<dyn Storage>) -> ExtractionContext {
    ExtractionContext::for_document(&dom.document, storage).expect("文档应有 BODY")
}

/// 按固定表翻译的模拟翻译器，未登记的文本原样返回
#[derive(Default)]
pub struct MockTranslator {
    table: HashMap<(String, Language), String>,
    calls: Cell<usize>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, to: Language, translated: &str) -> Self {
        self.table
            .insert((text.to_string(), to), translated.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

#[async_trait(?Send)]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, _from: Language, to: Language) -> String {
        self.calls.set(self.calls.get() + 1);
        self.table
            .get(&(text.to_string(), to))
            .cloned()
            .unwrap_or_else(|| text.to_string())
    }
}

/// 可按需让读写失败的存储
#[derive(Default)]
pub struct FailingStorage {
    inner: MemoryStorage,
    pub fail_reads: Cell<bool>,
    pub fail_writes: Cell<bool>,
    pub log: RefCell<Vec<String>>,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, key: &str) -> Option<Value> {
        self.inner.snapshot(key)
    }
}

#[async_trait(?Send)]
impl Storage for FailingStorage {
    async fn get(&self, key: &str) -> HarvestResult<Option<Value>> {
        self.log.borrow_mut().push(format!("get {}", key));
        if self.fail_reads.get() {
            return Err(HarvestError::Storage("模拟读取失败".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> HarvestResult<()> {
        self.log.borrow_mut().push(format!("set {}", key));
        if self.fail_writes.get() {
            return Err(HarvestError::Storage("模拟写入失败".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, keys: &[&str]) -> HarvestResult<()> {
        self.log.borrow_mut().push(format!("remove {}", keys.join(",")));
        self.inner.remove(keys).await
    }
}
