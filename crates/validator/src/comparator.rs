//! Page state comparison
//!
//! Diffs two independently captured [`PageState`] snapshots into
//! severity-classified discrepancies. URLs, capture times and screenshots
//! are never compared.

use fidelity_common::{Discrepancy, PageState, Severity};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// Compare `source` against `target`
///
/// Pure and infallible: a panic inside any check is replaced by a single
/// CRITICAL `comparison_error` discrepancy.
pub fn compare_page_states(source: &PageState, target: &PageState) -> Vec<Discrepancy> {
    guarded(|| diff_states(source, target))
}

pub(crate) fn guarded<F>(compare: F) -> Vec<Discrepancy>
where
    F: FnOnce() -> Vec<Discrepancy>,
{
    match panic::catch_unwind(AssertUnwindSafe(compare)) {
        Ok(discrepancies) => discrepancies,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!("Page state comparison failed: {}", reason);
            vec![Discrepancy::critical(
                "comparison_error",
                format!("Page state comparison failed: {}", reason),
            )
            .with_recommendation("Re-capture both pages and compare again")]
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn diff_states(source: &PageState, target: &PageState) -> Vec<Discrepancy> {
    let mut discrepancies = Vec::new();
    check_availability(source, target, &mut discrepancies);
    check_title(source, target, &mut discrepancies);
    check_forms(source, target, &mut discrepancies);
    check_messages(source, target, &mut discrepancies);
    check_metrics(source, target, &mut discrepancies);
    discrepancies
}

fn check_availability(source: &PageState, target: &PageState, out: &mut Vec<Discrepancy>) {
    let (side, reason) = match (&source.error, &target.error) {
        (Some(reason), None) => ("source", reason),
        (None, Some(reason)) => ("target", reason),
        _ => return,
    };
    out.push(
        Discrepancy::warning(
            "capture_unavailable",
            format!("The {} page state could not be captured: {}", side, reason),
        )
        .with_recommendation("Check that the page loads and re-run the capture"),
    );
}

fn check_title(source: &PageState, target: &PageState, out: &mut Vec<Discrepancy>) {
    if source.title.trim() == target.title.trim() {
        return;
    }
    out.push(
        Discrepancy::info(
            "title_mismatch",
            format!(
                "Page title differs: '{}' vs '{}'",
                source.title, target.title
            ),
        )
        .with_elements(source.title.clone(), target.title.clone())
        .with_recommendation("Align the page title with the source page"),
    );
}

fn check_forms(source: &PageState, target: &PageState, out: &mut Vec<Discrepancy>) {
    if source.forms.len() != target.forms.len() {
        out.push(
            Discrepancy::warning(
                "form_count_mismatch",
                format!(
                    "Source has {} form(s), target has {}",
                    source.forms.len(),
                    target.forms.len()
                ),
            )
            .with_recommendation("Verify every source form is implemented on the target page"),
        );
    }

    // Positional: forms rendered in a different order will be reported here.
    for (i, (src, tgt)) in source.forms.iter().zip(&target.forms).enumerate() {
        if src.elements.len() == tgt.elements.len() {
            continue;
        }
        let label = |action: &Option<String>| match action {
            Some(action) => format!("form[{}] action={}", i, action),
            None => format!("form[{}]", i),
        };
        out.push(
            Discrepancy::warning(
                "form_elements_mismatch",
                format!(
                    "Form {} has {} element(s) in source, {} in target",
                    i + 1,
                    src.elements.len(),
                    tgt.elements.len()
                ),
            )
            .with_elements(label(&src.action), label(&tgt.action))
            .with_recommendation("Compare the form fields and add any that are missing"),
        );
    }
}

fn check_messages(source: &PageState, target: &PageState, out: &mut Vec<Discrepancy>) {
    let source_texts = source.message_texts();
    let target_texts = target.message_texts();

    for text in source_texts.difference(&target_texts) {
        out.push(
            Discrepancy::warning(
                "missing_message",
                format!("Message shown by source is missing on target: '{}'", text),
            )
            .with_source_element(text.clone())
            .with_recommendation("Display the same status message on the target"),
        );
    }
    for text in target_texts.difference(&source_texts) {
        out.push(
            Discrepancy::info(
                "additional_message",
                format!("Target shows a message the source does not: '{}'", text),
            )
            .with_target_element(text.clone()),
        );
    }
}

fn check_metrics(source: &PageState, target: &PageState, out: &mut Vec<Discrepancy>) {
    for ((name, src), (_, tgt)) in source.metrics.entries().into_iter().zip(target.metrics.entries()) {
        if src == tgt {
            continue;
        }
        let severity = match name {
            "forms" | "inputs" => Severity::Warning,
            _ => Severity::Info,
        };
        out.push(
            Discrepancy::new(
                format!("{}_count_difference", name),
                severity,
                format!("{} count differs: source {}, target {}", name, src, tgt),
            )
            .with_elements(src.to_string(), tgt.to_string()),
        );
    }
}
