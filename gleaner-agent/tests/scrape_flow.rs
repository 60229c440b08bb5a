mod common;

use common::{init_test_tracing, quick_scraper, FakeBrowser, ScriptedLlm};
use gleaner_agent::{ScrapeConfig, ScrapeStatus};
use gleaner_drivers::{ErrorCode, ToolError};
use serde_json::json;
use std::sync::Arc;

const LINKS_PAGE: &str = r#"<html><body>
<a href="https://a.example">Alpha</a>
<a href="https://b.example">Beta</a>
<a href="https://c.example">Gamma</a>
</body></html>"#;

fn links_job(options: serde_json::Value) -> ScrapeConfig {
    serde_json::from_value(json!({
        "url": "https://links.example",
        "schema": { "links": [{ "title": "string", "url": "string" }] },
        "options": options
    }))
    .unwrap()
}

fn product_job(options: serde_json::Value) -> ScrapeConfig {
    serde_json::from_value(json!({
        "url": "https://shop.example/list",
        "schema": { "products": [{ "name": "string", "price": "number" }] },
        "options": options
    }))
    .unwrap()
}

fn products_reply(names: &[&str]) -> String {
    let items: Vec<_> = names
        .iter()
        .map(|n| json!({ "name": n, "price": "$10.00" }))
        .collect();
    json!({ "items": items }).to_string()
}

#[tokio::test]
async fn extracts_three_links_completely() {
    init_test_tracing();
    let llm = Arc::new(ScriptedLlm::new().extraction_reply(
        "```json\n{\"items\": [\
         {\"title\": \"Alpha\", \"url\": \"https://a.example\"},\
         {\"title\": \"Beta\", \"url\": \"https://b.example\"},\
         {\"title\": \"Gamma\", \"url\": \"https://c.example\"}]}\n```",
    ));
    let browser = FakeBrowser::with_pages([LINKS_PAGE]);

    let result = quick_scraper(llm.clone())
        .scrape(browser.clone(), &links_job(json!({})))
        .await;

    assert_eq!(result.status, ScrapeStatus::Success);
    assert_eq!(result.quality_report.total_items, 3);
    assert_eq!(result.quality_report.complete_items, 3);
    assert_eq!(result.quality_report.completion_rate, 1.0);
    assert!(result.quality_report.errors.is_empty());
    assert_eq!(result.items()[1], json!({ "title": "Beta", "url": "https://b.example" }));
    assert!(result.error_message.is_none());
    assert_eq!(llm.pagination_calls(), 0);
    assert!(llm.prompts()[0].contains("Alpha"));
    assert!(browser.is_closed());
}

#[tokio::test]
async fn sentinel_on_first_page_stops_pagination() {
    init_test_tracing();
    let llm = Arc::new(
        ScriptedLlm::new()
            .extraction_reply(products_reply(&["a", "b"]))
            .pagination_reply("NO_PAGINATION"),
    );
    let browser = FakeBrowser::with_pages(["<p>1</p>", "<p>2</p>"]).next_selector(".next");

    let result = quick_scraper(llm.clone())
        .scrape(
            browser.clone(),
            &product_job(json!({ "pagination": true, "max_pages": 5 })),
        )
        .await;

    assert_eq!(result.status, ScrapeStatus::Success);
    assert_eq!(result.quality_report.total_items, 2);
    assert_eq!(llm.extraction_calls(), 1);
    assert_eq!(llm.pagination_calls(), 1);
    assert!(browser.clicks().is_empty());
}

#[tokio::test]
async fn navigation_failure_is_fatal() {
    init_test_tracing();
    let llm = Arc::new(ScriptedLlm::new().extraction_reply(products_reply(&["never"])));
    let browser = FakeBrowser::with_pages(["<p>1</p>"]).failing_navigation(ToolError::new(
        ErrorCode::NetworkError,
        "net::ERR_NAME_NOT_RESOLVED",
    ));

    let result = quick_scraper(llm.clone())
        .scrape(browser.clone(), &product_job(json!({ "pagination": true, "max_pages": 3 })))
        .await;

    assert_eq!(result.status, ScrapeStatus::Error);
    assert!(result.items().is_empty());
    assert_eq!(result.quality_report.total_items, 0);
    assert_eq!(result.quality_report.completion_rate, 0.0);
    assert_eq!(
        result.error_message.as_deref(),
        Some("NETWORK_ERROR: net::ERR_NAME_NOT_RESOLVED")
    );
    assert!(llm.prompts().is_empty());
    assert!(browser.is_closed());
}

#[tokio::test]
async fn second_page_failure_keeps_first_page() {
    init_test_tracing();
    let llm = Arc::new(
        ScriptedLlm::new()
            .extraction_reply(products_reply(&["a", "b", "c"]))
            .extraction_reply("Sorry, I cannot help with that.")
            .pagination_reply("`.next`"),
    );
    let browser = FakeBrowser::with_pages(["<p>1</p>", "<p>2</p>"]).next_selector(".next");

    let result = quick_scraper(llm.clone())
        .scrape(
            browser.clone(),
            &product_job(json!({ "pagination": true, "max_pages": 5 })),
        )
        .await;

    assert_eq!(result.status, ScrapeStatus::PartialSuccess);
    assert_eq!(result.quality_report.total_items, 3);
    assert_eq!(result.quality_report.errors.len(), 1);
    assert!(result.quality_report.errors[0].starts_with("page 2:"));
    assert_eq!(result.error_message.as_ref(), result.quality_report.errors.first());
    assert_eq!(browser.clicks(), vec![".next".to_string()]);
}

#[tokio::test]
async fn pagination_off_reads_one_page_whatever_max_pages_says() {
    init_test_tracing();
    let llm = Arc::new(
        ScriptedLlm::new()
            .extraction_reply(products_reply(&["a"]))
            .pagination_reply(".next"),
    );
    let browser =
        FakeBrowser::with_pages(["<p>1</p>", "<p>2</p>", "<p>3</p>"]).next_selector(".next");

    let result = quick_scraper(llm.clone())
        .scrape(
            browser.clone(),
            &product_job(json!({ "pagination": false, "maxPages": 5 })),
        )
        .await;

    assert_eq!(result.status, ScrapeStatus::Success);
    assert_eq!(llm.extraction_calls(), 1);
    assert_eq!(llm.pagination_calls(), 0);
    assert!(browser.clicks().is_empty());
}

#[tokio::test]
async fn follows_next_control_up_to_page_limit() {
    init_test_tracing();
    let llm = Arc::new(
        ScriptedLlm::new()
            .extraction_reply(products_reply(&["a"]))
            .extraction_reply(products_reply(&["b"]))
            .extraction_reply(products_reply(&["c"]))
            .pagination_reply("a.next")
            .pagination_reply("a.next"),
    );
    let browser =
        FakeBrowser::with_pages(["<p>1</p>", "<p>2</p>", "<p>3</p>"]).next_selector("a.next");

    let result = quick_scraper(llm.clone())
        .scrape(
            browser.clone(),
            &product_job(json!({ "pagination": true, "max_pages": 2 })),
        )
        .await;

    assert_eq!(result.status, ScrapeStatus::Success);
    let names: Vec<_> = result.items().iter().map(|i| i["name"].clone()).collect();
    assert_eq!(names, vec![json!("a"), json!("b")]);
    assert_eq!(result.items()[0]["price"], json!(10.0));
    assert_eq!(llm.extraction_calls(), 2);
    assert_eq!(llm.pagination_calls(), 1);
}

#[tokio::test]
async fn unclickable_next_control_ends_quietly() {
    init_test_tracing();
    let llm = Arc::new(
        ScriptedLlm::new()
            .extraction_reply(products_reply(&["a"]))
            .pagination_reply("li.next:not(.disabled) a"),
    );
    let browser = FakeBrowser::with_pages(["<p>1</p>"]).next_selector(".next");

    let result = quick_scraper(llm)
        .scrape(
            browser.clone(),
            &product_job(json!({ "pagination": true, "max_pages": 4 })),
        )
        .await;

    assert_eq!(result.status, ScrapeStatus::Success);
    assert!(result.warnings.is_empty());
    assert_eq!(browser.clicks(), vec!["li.next:not(.disabled) a".to_string()]);
}

#[tokio::test]
async fn detector_failure_is_a_warning() {
    init_test_tracing();
    let llm = Arc::new(
        ScriptedLlm::new()
            .extraction_reply(products_reply(&["a"]))
            .pagination_failure("rate limited"),
    );
    let browser = FakeBrowser::with_pages(["<p>1</p>", "<p>2</p>"]).next_selector(".next");

    let result = quick_scraper(llm)
        .scrape(
            browser.clone(),
            &product_job(json!({ "pagination": true, "max_pages": 3 })),
        )
        .await;

    assert_eq!(result.status, ScrapeStatus::Success);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("rate limited"));
    assert!(result.quality_report.errors.is_empty());
}

#[tokio::test]
async fn next_control_that_does_not_change_the_page_stops() {
    init_test_tracing();
    let llm = Arc::new(
        ScriptedLlm::new()
            .extraction_reply(products_reply(&["a"]))
            .extraction_reply(products_reply(&["duplicate"]))
            .pagination_reply(".next"),
    );
    let browser = FakeBrowser::with_pages(["<p>1</p>", "<p>2</p>"])
        .next_selector(".next")
        .next_does_not_advance();

    let result = quick_scraper(llm.clone())
        .scrape(
            browser.clone(),
            &product_job(json!({ "pagination": true, "max_pages": 3 })),
        )
        .await;

    assert_eq!(result.status, ScrapeStatus::Success);
    assert_eq!(result.quality_report.total_items, 1);
    assert_eq!(llm.extraction_calls(), 1);
    assert_eq!(browser.clicks().len(), 1);
}

#[tokio::test]
async fn first_page_failure_is_an_error() {
    init_test_tracing();
    let llm = Arc::new(ScriptedLlm::new().extraction_reply("{\"products\": []}"));
    let browser = FakeBrowser::with_pages(["<p>1</p>"]);

    let result = quick_scraper(llm)
        .scrape(browser, &product_job(json!({})))
        .await;

    assert_eq!(result.status, ScrapeStatus::Error);
    assert!(result.items().is_empty());
    assert_eq!(result.quality_report.errors.len(), 1);
    assert!(result.error_message.unwrap().contains("items"));
}

#[tokio::test]
async fn markup_failure_on_a_later_page_is_page_fatal() {
    init_test_tracing();
    let llm = Arc::new(
        ScriptedLlm::new()
            .extraction_reply(products_reply(&["a", "b"]))
            .pagination_reply(".next"),
    );
    let browser = FakeBrowser::with_pages(["<p>1</p>", "<p>2</p>"])
        .next_selector(".next")
        .failing_markup_on_page(1);

    let result = quick_scraper(llm)
        .scrape(
            browser,
            &product_job(json!({ "pagination": true, "max_pages": 3 })),
        )
        .await;

    assert_eq!(result.status, ScrapeStatus::PartialSuccess);
    assert_eq!(result.quality_report.total_items, 2);
    assert!(result.quality_report.errors[0].contains("INTERNAL_ERROR"));
}

#[tokio::test]
async fn interaction_failures_are_reported_but_do_not_stop_the_run() {
    init_test_tracing();
    let llm = Arc::new(ScriptedLlm::new().extraction_reply(
        json!({ "items": [{ "name": "a", "price": "free" }] }).to_string(),
    ));
    let browser = FakeBrowser::with_pages(["<p>1</p>"]).accepting("#accept-cookies");
    let job: ScrapeConfig = serde_json::from_value(json!({
        "url": "https://shop.example/list",
        "schema": { "products": [{ "name": "string", "price": "number" }] },
        "interactions": [
            { "type": "click", "selector": "#accept-cookies" },
            { "type": "click", "selector": "#newsletter-close" },
            { "type": "wait", "duration": 5 },
            { "type": "scroll", "direction": "bottom" }
        ]
    }))
    .unwrap();

    let result = quick_scraper(llm).scrape(browser.clone(), &job).await;

    assert_eq!(result.status, ScrapeStatus::Success);
    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings[0].contains("ELEMENT_NOT_FOUND"));
    assert!(result.warnings[1].contains("scroll"));
    assert_eq!(result.quality_report.complete_items, 0);
    assert_eq!(result.quality_report.missing_fields.get("price"), Some(&1));

    let calls = browser.calls();
    let markup_at = calls.iter().position(|c| c == "markup").unwrap();
    let last_click = calls.iter().rposition(|c| c.starts_with("click:")).unwrap();
    assert!(last_click < markup_at, "interactions run before extraction");
}

#[tokio::test]
async fn result_serializes_to_documented_shape() {
    init_test_tracing();
    let llm = Arc::new(ScriptedLlm::new().extraction_reply(products_reply(&["a"])));
    let result = quick_scraper(llm)
        .scrape(FakeBrowser::with_pages(["<p>1</p>"]), &product_job(json!({})))
        .await;

    let v = serde_json::to_value(&result).unwrap();
    assert_eq!(v["status"], "success");
    assert_eq!(v["data"]["items"][0]["name"], "a");
    assert_eq!(v["quality_report"]["total_items"], 1);
    assert!(v.get("error_message").is_none());
    assert!(v.get("warnings").is_none());
    assert!(v["data"].get("metadata").is_none());
}

#[tokio::test]
async fn declared_metadata_block_is_filled() {
    init_test_tracing();
    let job: ScrapeConfig = serde_json::from_value(json!({
        "url": "https://shop.example/list",
        "schema": {
            "products": [{ "name": "string", "price": "number" }],
            "metadata": { "source": "string" }
        }
    }))
    .unwrap();
    let llm = Arc::new(ScriptedLlm::new().extraction_reply(products_reply(&["a", "b"])));

    let result = quick_scraper(llm)
        .scrape(FakeBrowser::with_pages(["<p>1</p>"]), &job)
        .await;

    let meta = result.data.metadata.as_ref().unwrap();
    assert_eq!(meta.item_count, 2);
    assert!(meta.extracted_at <= chrono::Utc::now());
    let v = serde_json::to_value(&result).unwrap();
    assert!(v["data"]["metadata"]["extracted_at"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn list_nested_in_an_object_drives_item_shape() {
    init_test_tracing();
    let job: ScrapeConfig = serde_json::from_value(json!({
        "url": "https://shop.example/list",
        "schema": { "catalog": { "products": [{ "name": "string", "price": "number" }] } }
    }))
    .unwrap();
    let llm = Arc::new(ScriptedLlm::new().extraction_reply(products_reply(&["Boot"])));

    let result = quick_scraper(llm)
        .scrape(FakeBrowser::with_pages(["<p>1</p>"]), &job)
        .await;

    assert_eq!(result.status, ScrapeStatus::Success);
    assert_eq!(result.items().to_vec(), vec![json!({ "name": "Boot", "price": 10.0 })]);
    assert_eq!(result.quality_report.complete_items, 1);
}
