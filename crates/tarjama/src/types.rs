//! Structured document model shared by every pipeline stage.
//!
//! A [`StructuredDocument`] is produced once by segmentation, mutated in
//! place by the text normalizer, and mirrored (never mutated) by the
//! translation pipeline. Both terminal documents are attached to the job
//! record and are immutable thereafter.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Axis-aligned bounding box in source pixel/point space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// Vertical distance from this box's bottom edge to `other`'s top edge.
    /// Negative when the boxes overlap vertically.
    pub fn vertical_gap_to(&self, other: &BoundingBox) -> f32 {
        other.y1 - self.y2
    }

    /// Bit-exact key for ensemble fusion: two results merge only when their
    /// boxes are identical, so float comparison by bit pattern is intended.
    pub fn key(&self) -> (u32, u32, u32, u32) {
        (
            self.x1.to_bits(),
            self.y1.to_bits(),
            self.x2.to_bits(),
            self.y2.to_bits(),
        )
    }
}

/// Structural role of a block within its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Paragraph,
    Heading,
    TableCell,
    ListItem,
}

/// Table-cell coordinates within a source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub row: usize,
    pub col: usize,
    pub table_id: String,
}

/// Per-block metadata populated by segmentation.
///
/// Exactly one classification marker is authoritative per block type: a
/// heading block carries `is_heading`/`heading_level`, a list item carries
/// `list_level`, and a table cell always carries `table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BlockMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,

    #[serde(default)]
    pub is_heading: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_level: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableMetadata>,

    /// Mean OCR confidence in [0.0, 1.0] when the block came from OCR.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Smallest structural text unit within a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Unique within the document: `"{page_index}-{counter}"`.
    pub block_id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub metadata: BlockMetadata,
    pub text: String,
}

impl Block {
    /// Plain paragraph block with no positional metadata.
    pub fn paragraph(block_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            block_type: BlockType::Paragraph,
            metadata: BlockMetadata::default(),
            text: text.into(),
        }
    }

    /// Heading block; `level` defaults to 1 when the source style carried
    /// no parsable level.
    pub fn heading(block_id: impl Into<String>, text: impl Into<String>, level: u8) -> Self {
        Self {
            block_id: block_id.into(),
            block_type: BlockType::Heading,
            metadata: BlockMetadata {
                is_heading: true,
                heading_level: Some(level),
                ..BlockMetadata::default()
            },
            text: text.into(),
        }
    }

    /// List-item block at the given nesting level (0-based).
    pub fn list_item(block_id: impl Into<String>, text: impl Into<String>, level: u8) -> Self {
        Self {
            block_id: block_id.into(),
            block_type: BlockType::ListItem,
            metadata: BlockMetadata {
                list_level: Some(level),
                ..BlockMetadata::default()
            },
            text: text.into(),
        }
    }

    /// Table-cell block. Table cells always carry table coordinates.
    pub fn table_cell(
        block_id: impl Into<String>,
        text: impl Into<String>,
        row: usize,
        col: usize,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            block_id: block_id.into(),
            block_type: BlockType::TableCell,
            metadata: BlockMetadata {
                table: Some(TableMetadata {
                    row,
                    col,
                    table_id: table_id.into(),
                }),
                ..BlockMetadata::default()
            },
            text: text.into(),
        }
    }
}

/// Derives the canonical block id from page index and per-page counter.
pub fn block_id(page_index: usize, counter: usize) -> String {
    format!("{page_index}-{counter}")
}

/// One page of a document. Block order is reading order as produced by
/// segmentation and is never re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_index: usize,
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn new(page_index: usize, blocks: Vec<Block>) -> Self {
        Self { page_index, blocks }
    }
}

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source_filename: String,
    pub total_pages: usize,
    /// ISO-8601 UTC timestamp of extraction start.
    pub extraction_timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_seconds: Option<f64>,
}

/// Ordered pages plus document metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDocument {
    pub document_id: String,
    /// BCP-47-ish short tag, e.g. "ar" or "en".
    pub language: String,
    pub pages: Vec<Page>,
    pub metadata: DocumentMetadata,
}

impl StructuredDocument {
    /// Empty document created by the job state machine at extraction start.
    pub fn empty(source_filename: impl Into<String>, language: impl Into<String>, ocr_engine: Option<String>) -> Self {
        Self {
            document_id: Uuid::new_v4().to_string(),
            language: language.into(),
            pages: Vec::new(),
            metadata: DocumentMetadata {
                source_filename: source_filename.into(),
                total_pages: 0,
                extraction_timestamp: Utc::now().to_rfc3339(),
                ocr_engine,
                processing_time_seconds: None,
            },
        }
    }

    /// Replace the page sequence, keeping `total_pages` consistent.
    pub fn set_pages(&mut self, pages: Vec<Page>) {
        self.metadata.total_pages = pages.len();
        self.pages = pages;
    }

    pub fn stats(&self) -> DocumentStats {
        let total_blocks = self.pages.iter().map(|p| p.blocks.len()).sum();
        let total_characters = self
            .pages
            .iter()
            .flat_map(|p| p.blocks.iter())
            .map(|b| b.text.chars().count())
            .sum();
        DocumentStats {
            total_pages: self.pages.len(),
            total_blocks,
            total_characters,
        }
    }
}

/// Per-document aggregate counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub total_pages: usize,
    pub total_blocks: usize,
    pub total_characters: usize,
}

/// Final job statistics combining source and translated documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    pub total_pages: usize,
    pub total_blocks: usize,
    pub total_characters_source: usize,
    pub total_characters_target: usize,
}

impl JobStats {
    pub fn from_documents(source: &StructuredDocument, target: &StructuredDocument) -> Self {
        let source_stats = source.stats();
        let target_stats = target.stats();
        Self {
            total_pages: source_stats.total_pages,
            total_blocks: source_stats.total_blocks,
            total_characters_source: source_stats.total_characters,
            total_characters_target: target_stats.total_characters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_text_lengths(pages: &[&[usize]]) -> StructuredDocument {
        let mut doc = StructuredDocument::empty("test.pdf", "ar", None);
        let pages = pages
            .iter()
            .enumerate()
            .map(|(page_index, lengths)| {
                let blocks = lengths
                    .iter()
                    .enumerate()
                    .map(|(i, len)| Block::paragraph(block_id(page_index, i), "x".repeat(*len)))
                    .collect();
                Page::new(page_index, blocks)
            })
            .collect();
        doc.set_pages(pages);
        doc
    }

    #[test]
    fn test_bbox_union() {
        let a = BoundingBox::new(10.0, 0.0, 50.0, 20.0);
        let b = BoundingBox::new(5.0, 25.0, 60.0, 45.0);
        let u = a.union(&b);
        assert_eq!(u, BoundingBox::new(5.0, 0.0, 60.0, 45.0));
    }

    #[test]
    fn test_bbox_vertical_gap() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 20.0);
        let b = BoundingBox::new(0.0, 25.0, 100.0, 45.0);
        assert_eq!(a.vertical_gap_to(&b), 5.0);
    }

    #[test]
    fn test_bbox_key_is_bit_exact() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 20.0);
        let b = BoundingBox::new(0.0, 0.0, 100.0, 20.0);
        let c = BoundingBox::new(0.0, 0.0, 100.0, 20.000001);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_empty_document() {
        let doc = StructuredDocument::empty("scan.png", "ar", Some("paddle".to_string()));
        assert_eq!(doc.language, "ar");
        assert_eq!(doc.metadata.total_pages, 0);
        assert!(doc.pages.is_empty());
        assert_eq!(doc.metadata.ocr_engine.as_deref(), Some("paddle"));
    }

    #[test]
    fn test_set_pages_updates_total() {
        let mut doc = StructuredDocument::empty("a.pdf", "ar", None);
        doc.set_pages(vec![Page::new(0, vec![]), Page::new(1, vec![])]);
        assert_eq!(doc.metadata.total_pages, 2);
        assert_eq!(doc.metadata.total_pages, doc.pages.len());
    }

    #[test]
    fn test_stats_counts_blocks_and_characters() {
        let doc = doc_with_text_lengths(&[&[3, 5], &[7]]);
        let stats = doc.stats();
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.total_blocks, 3);
        assert_eq!(stats.total_characters, 15);
    }

    #[test]
    fn test_job_stats_combines_both_documents() {
        let source = doc_with_text_lengths(&[&[4]]);
        let target = doc_with_text_lengths(&[&[9]]);
        let stats = JobStats::from_documents(&source, &target);
        assert_eq!(stats.total_pages, 1);
        assert_eq!(stats.total_blocks, 1);
        assert_eq!(stats.total_characters_source, 4);
        assert_eq!(stats.total_characters_target, 9);
    }

    #[test]
    fn test_table_cell_always_has_table_metadata() {
        let cell = Block::table_cell("0-3", "cell text", 1, 2, "table-0");
        assert_eq!(cell.block_type, BlockType::TableCell);
        let table = cell.metadata.table.expect("table metadata");
        assert_eq!(table.row, 1);
        assert_eq!(table.col, 2);
    }

    #[test]
    fn test_list_item_carries_nesting_level() {
        let item = Block::list_item("0-5", "first bullet", 1);
        assert_eq!(item.block_type, BlockType::ListItem);
        assert_eq!(item.metadata.list_level, Some(1));
        assert!(item.metadata.table.is_none());
        assert!(!item.metadata.is_heading);
    }

    #[test]
    fn test_block_type_serializes_snake_case() {
        let json = serde_json::to_string(&BlockType::TableCell).unwrap();
        assert_eq!(json, "\"table_cell\"");
    }

    #[test]
    fn test_block_serde_roundtrip_uses_type_field() {
        let block = Block::heading("0-0", "Introduction", 2);
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "heading");
        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }
}
