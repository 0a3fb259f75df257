//! Structural page-state capture

use chrono::Utc;
use fidelity_common::{FormSnapshot, PageMetrics, PageState, StatusMessage};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::driver::PageHandle;
use crate::error::{ValidatorError, ValidatorResult};

/// In-page script returning title, forms, status messages and element counts
pub const CAPTURE_SCRIPT: &str = include_str!("../scripts/capture_page_state.js");

#[derive(Debug, Deserialize)]
struct CapturedPage {
    #[serde(default)]
    title: String,
    #[serde(default)]
    forms: Vec<FormSnapshot>,
    #[serde(default)]
    messages: Vec<StatusMessage>,
    #[serde(default)]
    metrics: PageMetrics,
}

/// Build a [`PageState`] from the value returned by [`CAPTURE_SCRIPT`]
pub fn parse_capture(url: impl Into<String>, raw: Value) -> ValidatorResult<PageState> {
    if !raw.is_object() {
        return Err(ValidatorError::CaptureParse(format!(
            "expected an object, got {}",
            raw
        )));
    }
    let page: CapturedPage =
        serde_json::from_value(raw).map_err(|e| ValidatorError::CaptureParse(e.to_string()))?;

    Ok(PageState {
        url: url.into(),
        title: page.title.trim().to_string(),
        captured_at: Utc::now(),
        forms: page.forms,
        messages: page.messages,
        metrics: page.metrics,
        error: None,
    })
}

/// Capture the current page
///
/// Never fails: when the page cannot be read, an error-flagged empty
/// snapshot is returned instead.
pub async fn capture_page_state(page: &dyn PageHandle, timeout: Duration) -> PageState {
    let url = match page.current_url().await {
        Ok(url) => url,
        Err(e) => {
            warn!("Page state capture failed, page URL unavailable: {}", e);
            return PageState::unavailable("", e.to_string());
        }
    };

    let raw = match tokio::time::timeout(timeout, page.evaluate(CAPTURE_SCRIPT)).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => {
            warn!("Page state capture failed for {}: {}", url, e);
            return PageState::unavailable(url, e.to_string());
        }
        Err(_) => {
            warn!("Page state capture timed out for {}", url);
            return PageState::unavailable(
                url,
                format!("capture timed out after {} ms", timeout.as_millis()),
            );
        }
    };

    match parse_capture(url.clone(), raw) {
        Ok(state) => {
            debug!(
                "Captured {}: {} form(s), {} message(s)",
                url,
                state.forms.len(),
                state.messages.len()
            );
            state
        }
        Err(e) => {
            warn!("Page state capture returned unusable data for {}: {}", url, e);
            PageState::unavailable(url, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_capture() {
        let raw = json!({
            "title": " Sign in ",
            "forms": [{
                "action": "/session",
                "method": "post",
                "elements": [
                    {"tag": "input", "type": "email", "name": "email", "id": "email", "required": true},
                    {"tag": "button", "type": "submit", "name": null, "id": null, "required": false}
                ]
            }],
            "messages": [{"text": "Please sign in", "class": "flash notice"}],
            "metrics": {"forms": 1, "inputs": 1, "buttons": 1, "links": 3}
        });

        let state = parse_capture("http://localhost/login", raw).unwrap();
        assert_eq!(state.title, "Sign in");
        assert_eq!(state.forms.len(), 1);
        assert_eq!(state.forms[0].elements[0].input_type.as_deref(), Some("email"));
        assert!(state.forms[0].elements[0].required);
        assert_eq!(state.metrics.links, 3);
        assert!(state.is_available());
    }

    #[test]
    fn test_parse_capture_tolerates_missing_sections() {
        let state = parse_capture("http://localhost/", json!({"title": "Home"})).unwrap();
        assert!(state.forms.is_empty());
        assert_eq!(state.metrics, PageMetrics::default());
    }

    #[test]
    fn test_parse_capture_rejects_non_object() {
        assert!(matches!(
            parse_capture("http://localhost/", json!(null)),
            Err(ValidatorError::CaptureParse(_))
        ));
    }

    #[test]
    fn test_capture_script_collects_metrics() {
        for key in ["forms:", "inputs:", "buttons:", "links:", "[role=\"alert\"]"] {
            assert!(CAPTURE_SCRIPT.contains(key), "missing {}", key);
        }
    }
}
