//! FeedConfig loading and sanitizing

mod common;

use std::sync::Arc;

use common::*;

#[test]
fn test_defaults() {
    let config = FeedConfig::default();
    assert_eq!(config.page_size, 10);
    assert_eq!(config.max_pages, 10);
    assert_eq!(config.trigger.root_margin, 100);
    assert_eq!(config.trigger.threshold, 1.0);
}

#[test]
fn test_partial_json_falls_back_to_defaults() -> Result<(), anyhow::Error> {
    let config: FeedConfig = serde_json::from_str(r#"{ "page_size": 25, "trigger": { "root_margin": 0 } }"#)?;
    assert_eq!(config.page_size, 25);
    assert_eq!(config.max_pages, 10);
    assert_eq!(config.trigger.root_margin, 0);
    assert_eq!(config.trigger.threshold, 1.0);
    Ok(())
}

#[test]
fn test_sanitized_pulls_values_into_range() {
    let config = FeedConfig {
        page_size: 0,
        max_pages: 0,
        trigger: TriggerConfig {
            root_margin: 40,
            threshold: -0.5,
        },
    }
    .sanitized();
    assert_eq!(config.page_size, 1);
    assert_eq!(config.max_pages, 1);
    assert_eq!(config.trigger.root_margin, 40);
    assert_eq!(config.trigger.threshold, 1.0);
}

/// A zero-page budget still allows the first page, then reports exhaustion.
#[tokio::test]
async fn test_controller_applies_sanitized_config() -> Result<(), anyhow::Error> {
    let feed = FeedController::new(Arc::new(instant_mock()), config(0, 0));
    assert_eq!(feed.config().page_size, 1);

    let outcome = feed.fetch_next_page().await?;
    assert_eq!(outcome, FetchOutcome { has_more: false, appended: 1 });
    assert_eq!(feed.phase(), FeedPhase::Exhausted);
    Ok(())
}
