//! Batch translation and document reconstruction.
//!
//! Flattens every non-empty block across the document into one ordered
//! work list, translates it in fixed-size batches, and reassembles a new
//! document with identical structure and only the text replaced. The
//! (page, block) → work-index mapping is built during flattening and
//! reused during reassembly, so reconstruction is a single pass over the
//! document.
//!
//! Failure policy: a failed batch degrades to per-item calls; a failed
//! item keeps its original text. Translation is never fatal at item
//! granularity. Degraded paths are reported in [`TranslationOutcome`]
//! rather than inferred from logs.

use crate::backends::Backend;
use crate::config::JobConfig;
use crate::language::{matches_target_language, short_tag};
use crate::types::{Block, Page, StructuredDocument};
use crate::Result;
use ahash::AHashMap;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Trait for translation engines.
///
/// `translate_batch` must be order-preserving and return exactly one
/// output per input.
#[async_trait]
pub trait TranslationBackend: Backend {
    async fn translate_batch(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>>;
}

/// Result of translating a document, with the degraded paths made
/// explicit.
#[derive(Debug)]
pub struct TranslationOutcome {
    pub document: StructuredDocument,
    /// Blocks passed through because they were already in the target
    /// language.
    pub skipped_blocks: usize,
    /// Blocks that went through the per-item retry path or kept their
    /// original text after a failure.
    pub degraded_blocks: usize,
}

impl TranslationOutcome {
    pub fn is_degraded(&self) -> bool {
        self.degraded_blocks > 0
    }
}

/// Per-batch bookkeeping folded into the outcome.
#[derive(Debug, Default, Clone, Copy)]
struct BatchReport {
    skipped: usize,
    degraded: usize,
}

impl BatchReport {
    fn absorb(&mut self, other: BatchReport) {
        self.skipped += other.skipped;
        self.degraded += other.degraded;
    }
}

/// Translate a structured document, preserving structure exactly.
///
/// The returned document mirrors `document`'s page/block cardinality and
/// order, with block ids, types, and metadata unchanged; only `text`
/// differs. The source document is never mutated.
pub async fn translate_document(
    document: &StructuredDocument,
    backend: Arc<dyn TranslationBackend>,
    config: &JobConfig,
    max_batch_concurrency: Option<usize>,
) -> TranslationOutcome {
    // Single flattening pass; the origin map is reused at reassembly.
    let mut work_list: Vec<String> = Vec::new();
    let mut origin: AHashMap<(usize, usize), usize> = AHashMap::new();

    for (page_idx, page) in document.pages.iter().enumerate() {
        for (block_idx, block) in page.blocks.iter().enumerate() {
            if block.text.trim().is_empty() {
                continue;
            }
            origin.insert((page_idx, block_idx), work_list.len());
            work_list.push(block.text.clone());
        }
    }

    tracing::info!(
        pages = document.pages.len(),
        blocks = work_list.len(),
        target = %config.target_language,
        "translating document"
    );

    let (translated, report) =
        translate_work_list(&work_list, backend, config, max_batch_concurrency).await;

    let pages = document
        .pages
        .iter()
        .enumerate()
        .map(|(page_idx, page)| {
            let blocks = page
                .blocks
                .iter()
                .enumerate()
                .map(|(block_idx, block)| {
                    let text = origin
                        .get(&(page_idx, block_idx))
                        .map(|&work_idx| translated[work_idx].clone())
                        .unwrap_or_else(|| block.text.clone());
                    Block {
                        block_id: block.block_id.clone(),
                        block_type: block.block_type,
                        metadata: block.metadata.clone(),
                        text,
                    }
                })
                .collect();
            Page::new(page.page_index, blocks)
        })
        .collect();

    TranslationOutcome {
        document: StructuredDocument {
            document_id: document.document_id.clone(),
            language: short_tag(&config.target_language),
            pages,
            metadata: document.metadata.clone(),
        },
        skipped_blocks: report.skipped,
        degraded_blocks: report.degraded,
    }
}

/// Translate the flattened work list in batches.
///
/// Batches are independent and keyed back by work index, so concurrent
/// execution cannot change observable results.
async fn translate_work_list(
    work_list: &[String],
    backend: Arc<dyn TranslationBackend>,
    config: &JobConfig,
    max_batch_concurrency: Option<usize>,
) -> (Vec<String>, BatchReport) {
    if work_list.is_empty() {
        return (Vec::new(), BatchReport::default());
    }

    let batch_size = config.batch_size.max(1);
    let batch_count = work_list.len().div_ceil(batch_size);
    // Prefilled with originals: slots not reached by a batch (task
    // failure) degrade to untranslated text.
    let mut output = work_list.to_vec();
    let mut report = BatchReport::default();

    match max_batch_concurrency {
        Some(limit) if limit > 1 && batch_count > 1 => {
            let semaphore = Arc::new(Semaphore::new(limit));
            let mut tasks: JoinSet<(usize, Vec<String>, BatchReport)> = JoinSet::new();

            for (batch_idx, batch) in work_list.chunks(batch_size).enumerate() {
                let start = batch_idx * batch_size;
                let batch = batch.to_vec();
                let backend = Arc::clone(&backend);
                let config = config.clone();
                let semaphore = Arc::clone(&semaphore);
                tasks.spawn(async move {
                    let _permit = semaphore.acquire().await.expect("semaphore never closed");
                    let (translated, report) =
                        translate_batch_resilient(backend.as_ref(), &batch, &config).await;
                    (start, translated, report)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((start, translated, batch_report)) => {
                        report.absorb(batch_report);
                        for (offset, text) in translated.into_iter().enumerate() {
                            output[start + offset] = text;
                        }
                    }
                    Err(err) => {
                        // The affected slots keep their prefilled originals.
                        tracing::warn!(error = %err, "translation batch task failed");
                        report.degraded += batch_size;
                    }
                }
            }
        }
        _ => {
            for (batch_idx, batch) in work_list.chunks(batch_size).enumerate() {
                let start = batch_idx * batch_size;
                let (translated, batch_report) =
                    translate_batch_resilient(backend.as_ref(), batch, config).await;
                tracing::debug!(batch = batch_idx + 1, of = batch_count, "batch translated");
                report.absorb(batch_report);
                for (offset, text) in translated.into_iter().enumerate() {
                    output[start + offset] = text;
                }
            }
        }
    }

    (output, report)
}

/// Translate one batch, degrading on failure.
///
/// Items already in the target language pass through untranslated. A
/// backend failure (or a length-contract violation) retries each retained
/// item individually; items that still fail keep their original text.
async fn translate_batch_resilient(
    backend: &dyn TranslationBackend,
    batch: &[String],
    config: &JobConfig,
) -> (Vec<String>, BatchReport) {
    let mut output: Vec<Option<String>> = vec![None; batch.len()];
    let mut report = BatchReport::default();
    let mut retained_slots: Vec<usize> = Vec::new();
    let mut retained: Vec<String> = Vec::new();

    for (idx, text) in batch.iter().enumerate() {
        if config.skip_if_target_language && matches_target_language(text, &config.target_language) {
            tracing::debug!(index = idx, "text already in target language, skipping");
            output[idx] = Some(text.clone());
            report.skipped += 1;
        } else {
            retained_slots.push(idx);
            retained.push(text.clone());
        }
    }

    if !retained.is_empty() {
        let batch_result = backend
            .translate_batch(&retained, &config.source_language, &config.target_language)
            .await;

        match batch_result {
            Ok(translated) if translated.len() == retained.len() => {
                for (slot, text) in retained_slots.iter().zip(translated) {
                    output[*slot] = Some(text);
                }
            }
            Ok(translated) => {
                tracing::warn!(
                    expected = retained.len(),
                    got = translated.len(),
                    "backend violated the batch length contract, retrying items individually"
                );
                report.degraded += retained.len();
                translate_items_individually(backend, &retained_slots, &retained, config, &mut output)
                    .await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "batch translation failed, retrying items individually");
                report.degraded += retained.len();
                translate_items_individually(backend, &retained_slots, &retained, config, &mut output)
                    .await;
            }
        }
    }

    let output = output
        .into_iter()
        .zip(batch)
        .map(|(slot, original)| slot.unwrap_or_else(|| original.clone()))
        .collect();
    (output, report)
}

async fn translate_items_individually(
    backend: &dyn TranslationBackend,
    slots: &[usize],
    texts: &[String],
    config: &JobConfig,
    output: &mut [Option<String>],
) {
    for (slot, text) in slots.iter().zip(texts) {
        let item = std::slice::from_ref(text);
        match backend
            .translate_batch(item, &config.source_language, &config.target_language)
            .await
        {
            Ok(mut translated) if translated.len() == 1 => {
                output[*slot] = Some(translated.remove(0));
            }
            Ok(_) | Err(_) => {
                // Item-level failure keeps the original untranslated text.
                tracing::warn!(slot, "item translation failed, keeping original text");
                output[*slot] = Some(text.clone());
            }
        }
    }
}
