//! Response dispatcher delivery tests.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use trawl_core::{ResponseDispatcher, TransportError};
use trawl_test_utils::RecordingTransport;

/// Long replies arrive in order, within the limit, and nothing is lost.
#[tokio::test]
async fn long_reply_is_segmented_in_order() {
    let transport = RecordingTransport::new();
    let dispatcher = ResponseDispatcher::new(Arc::new(transport.clone()))
        .with_parse_mode(Some("HTML".to_string()));
    let lines: Vec<String> = (0..400)
        .map(|index| format!("line {index:03} of a long crawl report"))
        .collect();
    let text = lines.join("\n");

    let sent = dispatcher.dispatch("chat", &text).await.expect("dispatch");

    let segments = transport.sent();
    assert_eq!(sent, segments.len());
    assert!(segments.len() > 1);
    assert!(segments.iter().all(|segment| segment.text.chars().count() <= 4096));
    assert!(segments.iter().all(|segment| segment.conversation_id == "chat"));
    assert!(
        segments
            .iter()
            .all(|segment| segment.parse_mode.as_deref() == Some("HTML"))
    );
    let rejoined = segments
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(rejoined, text);
}

/// Multi-byte text is cut on char boundaries.
#[tokio::test]
async fn multibyte_reply_respects_limit() {
    let transport = RecordingTransport::new();
    let dispatcher =
        ResponseDispatcher::new(Arc::new(transport.clone())).with_segment_limit(10);
    let text = "日本語のテキスト".repeat(5);

    dispatcher.dispatch("chat", &text).await.expect("dispatch");

    let segments = transport.sent();
    assert!(segments.iter().all(|segment| segment.text.chars().count() <= 10));
    let rejoined: String = segments.iter().map(|segment| segment.text.as_str()).collect();
    assert_eq!(rejoined, text);
}

/// An empty reply sends nothing.
#[tokio::test]
async fn empty_reply_sends_nothing() {
    let transport = RecordingTransport::new();
    let dispatcher = ResponseDispatcher::new(Arc::new(transport.clone()));

    assert_eq!(dispatcher.dispatch("chat", "").await.expect("dispatch"), 0);
    assert!(transport.sent().is_empty());
}

/// Delivery stops at the first transport failure.
#[tokio::test]
async fn transport_failure_stops_delivery() {
    let transport = RecordingTransport::failing_after(1);
    let dispatcher =
        ResponseDispatcher::new(Arc::new(transport.clone())).with_segment_limit(5);

    let err = dispatcher
        .dispatch("chat", "one\ntwo\nthree")
        .await
        .expect_err("transport failure");

    assert!(matches!(err, TransportError::Send(_)));
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(transport.sent()[0].text, "one");
}
