//! 高亮标注层集成测试

use i18n_harvest::extraction::config::constants;
use i18n_harvest::extraction::language::LanguageSet;
use i18n_harvest::extraction::HighlightOverlay;
use i18n_harvest::parsers::html::dom::{find_elements_by_class, get_node_attr};
use i18n_harvest::parsers::html::serialize_document;

mod common {
    include!("common/mod.rs");
}

use common::{context_for, memory_storage, HtmlTestHelper};

#[tokio::test]
async fn test_overlay_is_independent_of_extraction_store() {
    let dom = HtmlTestHelper::create_test_dom(&HtmlTestHelper::create_ten_leaf_page());
    let storage = memory_storage();
    let mut overlay = HighlightOverlay::for_document(&dom.document, storage.clone()).unwrap();

    assert_eq!(overlay.start(), 10);
    let stats = overlay.click_key("sign-up-now").await.unwrap();
    assert_eq!(stats.processed_count, 1);
    assert_eq!(stats.remaining_count, 9);

    assert!(storage.snapshot(constants::STORE_KEY).is_none());
    let stubs = storage.snapshot(constants::OVERLAY_STORE_KEY).unwrap();
    assert_eq!(stubs["sign-up-now"]["ko"], "Sign up now");
    assert_eq!(stubs["sign-up-now"]["en"], "");
}

#[tokio::test]
async fn test_extraction_sees_highlighted_text() {
    let dom = HtmlTestHelper::create_test_dom(&HtmlTestHelper::create_ten_leaf_page());
    let storage = memory_storage();
    let mut overlay = HighlightOverlay::for_document(&dom.document, storage.clone()).unwrap();
    overlay.start();

    let mut context = context_for(&dom, storage.clone());
    let report = context.extract_page(LanguageSet::all()).await;
    assert_eq!(report.entries_created, 6);
}

#[test]
fn test_keys_use_overlay_dialect() {
    let dom = HtmlTestHelper::create_test_dom("<html><body><p>Hello, World!</p></body></html>");
    let mut overlay = HighlightOverlay::for_document(&dom.document, memory_storage()).unwrap();
    overlay.start();

    let highlights = find_elements_by_class(&dom.document, constants::HIGHLIGHT_CLASS);
    assert_eq!(highlights.len(), 1);
    assert_eq!(
        get_node_attr(&highlights[0], constants::KEY_ATTR).as_deref(),
        Some("hello-world")
    );
    assert_eq!(
        get_node_attr(&highlights[0], constants::ORIGINAL_TEXT_ATTR).as_deref(),
        Some("Hello, World!")
    );
}

#[test]
fn test_stop_then_start_again() {
    let dom = HtmlTestHelper::create_test_dom("<html><body><p>Hello there</p></body></html>");
    let before = serialize_document(&dom.document).unwrap();
    let mut overlay = HighlightOverlay::for_document(&dom.document, memory_storage()).unwrap();

    overlay.start();
    overlay.stop().unwrap();
    assert_eq!(serialize_document(&dom.document).unwrap(), before);

    assert_eq!(overlay.start(), 1);
    assert_eq!(overlay.stats().remaining_count, 1);
}
