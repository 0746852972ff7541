//! Out-of-band swap engine for oobswap.
//!
//! This crate ties the pieces of one reconciliation pass together:
//! - [`directive`]: the `hx-swap-oob` marker grammar
//! - [`discover`]: splitting a response into primary content and OOB nodes
//! - [`resolve`]: finding the live targets of a directive
//! - [`execute`]: swap strategies and the swap/settle timing protocol
//! - [`schedule`]: where delayed swap and settle steps run
//! - [`reconcile`]: the end-to-end pass ([`Reconciler::reconcile`])

pub mod directive;
pub mod discover;
pub mod execute;
pub mod reconcile;
pub mod resolve;
pub mod schedule;

pub use directive::OobDirective;
pub use discover::{Discovery, discover};
pub use execute::{SwapExecutor, SwapResult};
pub use reconcile::{ReconcileFailure, Reconciler, Reconciliation};
pub use resolve::{TargetSet, resolve_targets};
pub use schedule::SwapScheduler;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use oobswap_document::{Document, DocumentHandle};
    use oobswap_shared::{OobError, SwapConfig, SwapStrategy};
    use tokio::time::sleep;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn todos_page() -> DocumentHandle {
        Document::parse(&load_fixture("html/todos.html")).into_handle()
    }

    fn text_of(doc: &DocumentHandle, id: &str) -> String {
        let doc = doc.borrow();
        let node = doc.element_by_id(id).expect("element by id");
        doc.text_content(node)
    }

    fn reconcile_fixture(
        doc: &DocumentHandle,
        name: &str,
    ) -> Result<Reconciliation, ReconcileFailure> {
        Reconciler::new(SwapConfig::default()).reconcile(
            &load_fixture(name),
            doc,
            Duration::ZERO,
        )
    }

    #[test]
    fn row_update_response() {
        let doc = todos_page();
        let result = reconcile_fixture(&doc, "responses/row-update.html").unwrap();

        assert_eq!(result.primary.text_content().trim(), "Todo 2 updated");
        let strategies: Vec<_> = result.swaps.iter().map(|s| s.strategy).collect();
        assert_eq!(
            strategies,
            [SwapStrategy::OuterHtml, SwapStrategy::InnerHtml, SwapStrategy::Delete]
        );

        let html = doc.borrow().to_html();
        assert!(html.contains(r#"<tr id="todo-2"><td>Write executor (done)</td></tr>"#));
        assert!(!html.contains("<template"));
        assert!(!html.contains("hx-swap-oob"));
        assert_eq!(text_of(&doc, "count"), "1 item left");

        let doc = doc.borrow();
        assert!(doc.element_by_id("flash").is_none());
        let row = doc.element_by_id("todo-2").unwrap();
        assert_eq!(doc.parent(row), doc.element_by_id("todos"));
    }

    #[test]
    fn alerts_response_with_selector_and_nesting() {
        let doc = todos_page();
        let result = reconcile_fixture(&doc, "responses/alerts.html").unwrap();

        assert!(result.primary.text_content().trim().is_empty());
        assert_eq!(result.swaps.len(), 4);
        assert_eq!(doc.borrow().select_all("ul.alerts > li.alert").unwrap().len(), 2);

        let main = {
            let doc = doc.borrow();
            let main = doc.element_by_id("main").unwrap();
            doc.inner_html(main)
        };
        assert!(main.contains("<p>Cleared</p>"));
        assert!(!main.contains("<table"));
        assert!(!main.contains("count"));
        assert_eq!(text_of(&doc, "count"), "0 items");
    }

    #[test]
    fn bad_selector_response() {
        let doc = todos_page();
        let failure = reconcile_fixture(&doc, "responses/bad-selector.html").unwrap_err();

        assert!(matches!(
            &failure.errors[..],
            [OobError::Selector { selector, .. }] if selector == "ul.alerts["
        ));
        assert_eq!(failure.partial.swaps.len(), 1);
        assert_eq!(text_of(&doc, "count"), "3 items");
        assert_eq!(doc.borrow().select_all("ul.alerts li").unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_response_drains_on_the_scheduler() {
        let doc = todos_page();
        let reconciler = Reconciler::with_scheduler(SwapConfig::default(), SwapScheduler::local());

        reconciler
            .scheduler()
            .run_until(async {
                let result = reconciler
                    .reconcile(
                        &load_fixture("responses/delayed.html"),
                        &doc,
                        reconciler.config().default_settle_delay,
                    )
                    .unwrap();
                assert!(result.swaps[0].timing.deferred);
                assert_eq!(result.swaps[0].timing.total(), Duration::from_millis(150));

                assert_eq!(text_of(&doc, "count"), "2 items");
                assert_eq!(text_of(&doc, "flash"), "Undo?");
                {
                    let doc = doc.borrow();
                    let flash = doc.element_by_id("flash").unwrap();
                    assert_eq!(
                        doc.attr(flash, "class"),
                        Some("notice htmx-added htmx-settling")
                    );
                }

                sleep(Duration::from_millis(60)).await;
                assert_eq!(text_of(&doc, "count"), "3 items");
                let doc = doc.borrow();
                let count = doc.element_by_id("count").unwrap();
                assert!(doc.has_class(count, "htmx-settling"));
            })
            .await;

        // remaining settle tasks
        reconciler.scheduler().settled().await;

        let doc = doc.borrow();
        let count = doc.element_by_id("count").unwrap();
        let flash = doc.element_by_id("flash").unwrap();
        assert_eq!(doc.attr(count, "class"), None);
        assert_eq!(doc.attr(flash, "class"), Some("notice"));
    }

    #[tokio::test]
    async fn delayed_response_without_a_scheduler_applies_inline() {
        let doc = todos_page();
        let result = reconcile_fixture(&doc, "responses/delayed.html").unwrap();

        assert!(result.swaps.iter().all(|s| !s.timing.deferred));
        assert_eq!(text_of(&doc, "count"), "3 items");
        assert!(!doc.borrow().to_html().contains("htmx-"));
    }
}
