//! Engine selection and multi-engine result fusion.
//!
//! Single-engine mode runs exactly one backend, optionally falling back to
//! a second when the first returns nothing. Ensemble mode runs both and
//! merges by exact-bbox key, keeping the longer recognized text for
//! identical boxes (a proxy for completeness; deliberately not
//! confidence-weighted). Backend failures are absorbed here and downgrade
//! to the fallback engine or an empty span list.

use crate::extraction::PageImage;
use crate::ocr::backend::OcrBackend;
use crate::ocr::preprocess::preprocess_image;
use crate::ocr::types::OcrSpan;
use ahash::AHashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

/// Resolved engine plan for a job, built from the configured selection and
/// the backend registry.
#[derive(Clone)]
pub enum EnginePlan {
    Single {
        engine: Arc<dyn OcrBackend>,
        /// Tried when the selected engine yields zero results.
        fallback: Option<Arc<dyn OcrBackend>>,
    },
    Ensemble {
        primary: Arc<dyn OcrBackend>,
        secondary: Arc<dyn OcrBackend>,
    },
}

/// Recognize a page image under the given engine plan.
///
/// Never fails: preprocessing errors fall back to the raw image, backend
/// errors downgrade to the fallback engine or an empty result.
pub async fn recognize_page(plan: &EnginePlan, image: &PageImage) -> Vec<OcrSpan> {
    let prepared = match preprocess_image(image) {
        Ok(prepared) => prepared,
        Err(err) => {
            tracing::warn!(error = %err, "image preprocessing failed, using raw image");
            image.clone()
        }
    };

    match plan {
        EnginePlan::Single { engine, fallback } => {
            let spans = run_backend(engine.as_ref(), &prepared).await;
            if !spans.is_empty() {
                return spans;
            }
            match fallback {
                Some(fallback) => {
                    tracing::debug!(
                        engine = engine.name(),
                        fallback = fallback.name(),
                        "selected engine returned no results, running fallback"
                    );
                    run_backend(fallback.as_ref(), &prepared).await
                }
                None => spans,
            }
        }
        EnginePlan::Ensemble { primary, secondary } => {
            let primary_spans = run_backend(primary.as_ref(), &prepared).await;
            let secondary_spans = run_backend(secondary.as_ref(), &prepared).await;
            merge_ensemble(primary_spans, secondary_spans)
        }
    }
}

async fn run_backend(backend: &dyn OcrBackend, image: &PageImage) -> Vec<OcrSpan> {
    match backend.recognize(image).await {
        Ok(spans) => {
            tracing::debug!(engine = backend.name(), regions = spans.len(), "OCR pass finished");
            spans
        }
        Err(err) => {
            tracing::warn!(engine = backend.name(), error = %err, "OCR backend failed");
            Vec::new()
        }
    }
}

/// Merge two engines' results by exact bounding box.
///
/// Identical boxes keep the longer recognized text; distinct boxes from
/// either engine are all retained, in first-seen order.
fn merge_ensemble(primary: Vec<OcrSpan>, secondary: Vec<OcrSpan>) -> Vec<OcrSpan> {
    let mut merged: Vec<OcrSpan> = Vec::with_capacity(primary.len() + secondary.len());
    let mut by_bbox: AHashMap<(u32, u32, u32, u32), usize> = AHashMap::new();

    for span in primary.into_iter().chain(secondary) {
        match by_bbox.entry(span.bbox.key()) {
            Entry::Occupied(slot) => {
                let existing = &mut merged[*slot.get()];
                if span.text.chars().count() > existing.text.chars().count() {
                    *existing = span;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(span);
            }
        }
    }

    merged
}
