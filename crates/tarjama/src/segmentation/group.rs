//! Spatial proximity grouping of positioned text fragments.
//!
//! Fragments are sorted by vertical position and folded into blocks: a
//! fragment whose top edge is within the proximity threshold of the open
//! block's bottom edge joins it, otherwise the open block is closed and a
//! new one starts. The last open block is always flushed.

use crate::config::SegmentationConfig;
use crate::types::{block_id, Block, BlockMetadata, BlockType, BoundingBox};
use std::cmp::Ordering;

/// A positioned text fragment entering grouping: an OCR span or a vector
/// PDF word/run.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub text: String,
    pub bbox: BoundingBox,
    /// OCR confidence, absent for vector text.
    pub confidence: Option<f32>,
    /// Declared font size, absent for OCR spans.
    pub font_size: Option<f32>,
}

/// An open block accumulating fragments.
struct OpenBlock {
    texts: Vec<String>,
    confidences: Vec<f32>,
    bbox: BoundingBox,
    max_font_size: Option<f32>,
}

impl OpenBlock {
    fn start(fragment: Fragment) -> Self {
        let mut block = Self {
            texts: Vec::new(),
            confidences: Vec::new(),
            bbox: fragment.bbox,
            max_font_size: None,
        };
        block.push(fragment);
        block
    }

    fn push(&mut self, fragment: Fragment) {
        self.bbox = self.bbox.union(&fragment.bbox);
        if let Some(conf) = fragment.confidence {
            self.confidences.push(conf);
        }
        if let Some(size) = fragment.font_size {
            self.max_font_size = Some(self.max_font_size.map_or(size, |m: f32| m.max(size)));
        }
        self.texts.push(fragment.text);
    }

    fn close(self, page_index: usize, counter: usize, config: &SegmentationConfig) -> Block {
        let text = self.texts.join(" ");
        let confidence = if self.confidences.is_empty() {
            None
        } else {
            Some(self.confidences.iter().sum::<f32>() / self.confidences.len() as f32)
        };

        let (block_type, is_heading, heading_level) =
            classify(self.max_font_size, &self.bbox, config);

        Block {
            block_id: block_id(page_index, counter),
            block_type,
            metadata: BlockMetadata {
                bbox: Some(self.bbox),
                is_heading,
                heading_level,
                confidence,
                ..BlockMetadata::default()
            },
            text,
        }
    }
}

/// Heading classification for spatially grouped blocks.
///
/// A block is a heading when its largest font size reaches the cutoff or
/// when it sits inside the top-of-page band. Levels are a two-tier step
/// function of font size; a band-only heading (no size information) is a
/// page title, level 1.
fn classify(
    max_font_size: Option<f32>,
    bbox: &BoundingBox,
    config: &SegmentationConfig,
) -> (BlockType, bool, Option<u8>) {
    let by_size = max_font_size.is_some_and(|size| size >= config.heading_size_cutoff);
    let by_position = bbox.y1 <= config.heading_top_band;

    if !by_size && !by_position {
        return (BlockType::Paragraph, false, None);
    }

    let level = match max_font_size {
        Some(size) if size >= config.heading_major_size => 1,
        Some(_) => 2,
        None => 1,
    };
    (BlockType::Heading, true, Some(level))
}

/// Group fragments into ordered blocks for one page.
///
/// `threshold` is the vertical-gap cutoff in the fragments' coordinate
/// space (pixels for OCR, points for vector text). Sorting is stable on
/// the top edge only, so same-line fragments keep their emission order.
pub fn group_fragments(
    mut fragments: Vec<Fragment>,
    page_index: usize,
    threshold: f32,
    config: &SegmentationConfig,
) -> Vec<Block> {
    if fragments.is_empty() {
        return Vec::new();
    }

    fragments.sort_by(|a, b| a.bbox.y1.partial_cmp(&b.bbox.y1).unwrap_or(Ordering::Equal));

    let mut blocks = Vec::new();
    let mut current: Option<OpenBlock> = None;
    let mut counter = 0;

    for fragment in fragments {
        if let Some(open) = current.as_mut() {
            if open.bbox.vertical_gap_to(&fragment.bbox) < threshold {
                open.push(fragment);
                continue;
            }
            let closed = current.take().expect("open block present");
            blocks.push(closed.close(page_index, counter, config));
            counter += 1;
        }
        current = Some(OpenBlock::start(fragment));
    }

    if let Some(open) = current {
        blocks.push(open.close(page_index, counter, config));
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(text: &str, y1: f32, y2: f32) -> Fragment {
        Fragment {
            text: text.to_string(),
            bbox: BoundingBox::new(0.0, y1, 100.0, y2),
            confidence: None,
            font_size: None,
        }
    }

    fn ocr_fragment(text: &str, y1: f32, y2: f32, confidence: f32) -> Fragment {
        Fragment {
            confidence: Some(confidence),
            ..fragment(text, y1, y2)
        }
    }

    fn config() -> SegmentationConfig {
        SegmentationConfig::default()
    }

    #[test]
    fn test_fragments_within_threshold_merge() {
        // gap of 5 < 30 merges into one block
        let blocks = group_fragments(
            vec![fragment("line one", 0.0, 20.0), fragment("line two", 25.0, 45.0)],
            0,
            30.0,
            &config(),
        );
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "line one line two");
        assert_eq!(blocks[0].metadata.bbox.unwrap(), BoundingBox::new(0.0, 0.0, 100.0, 45.0));
    }

    #[test]
    fn test_fragments_beyond_threshold_split() {
        // gap of 60 >= 30 yields two blocks
        let blocks = group_fragments(
            vec![fragment("first", 0.0, 20.0), fragment("second", 80.0, 100.0)],
            0,
            30.0,
            &config(),
        );
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "first");
        assert_eq!(blocks[1].text, "second");
    }

    #[test]
    fn test_blocks_get_sequential_page_scoped_ids() {
        let blocks = group_fragments(
            vec![fragment("a", 0.0, 20.0), fragment("b", 100.0, 120.0), fragment("c", 200.0, 220.0)],
            3,
            30.0,
            &config(),
        );
        let ids: Vec<&str> = blocks.iter().map(|b| b.block_id.as_str()).collect();
        assert_eq!(ids, vec!["3-0", "3-1", "3-2"]);
    }

    #[test]
    fn test_unsorted_fragments_are_sorted_by_top_edge() {
        let blocks = group_fragments(
            vec![fragment("below", 200.0, 220.0), fragment("above", 0.0, 20.0)],
            0,
            30.0,
            &config(),
        );
        assert_eq!(blocks[0].text, "above");
        assert_eq!(blocks[1].text, "below");
    }

    #[test]
    fn test_confidence_is_arithmetic_mean() {
        let blocks = group_fragments(
            vec![
                ocr_fragment("a", 100.0, 110.0, 0.8),
                ocr_fragment("b", 115.0, 125.0, 0.6),
            ],
            0,
            30.0,
            &config(),
        );
        assert_eq!(blocks.len(), 1);
        let confidence = blocks[0].metadata.confidence.unwrap();
        assert!((confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_heading_by_font_size() {
        let big = Fragment {
            font_size: Some(26.0),
            ..fragment("Title", 200.0, 230.0)
        };
        let blocks = group_fragments(vec![big], 0, 10.0, &config());
        assert_eq!(blocks[0].block_type, BlockType::Heading);
        assert_eq!(blocks[0].metadata.heading_level, Some(1));
    }

    #[test]
    fn test_heading_minor_tier() {
        let medium = Fragment {
            font_size: Some(18.0),
            ..fragment("Section", 200.0, 220.0)
        };
        let blocks = group_fragments(vec![medium], 0, 10.0, &config());
        assert_eq!(blocks[0].block_type, BlockType::Heading);
        assert_eq!(blocks[0].metadata.heading_level, Some(2));
    }

    #[test]
    fn test_heading_by_top_band() {
        let blocks = group_fragments(vec![fragment("Page title", 10.0, 30.0)], 0, 10.0, &config());
        assert_eq!(blocks[0].block_type, BlockType::Heading);
        assert_eq!(blocks[0].metadata.heading_level, Some(1));
    }

    #[test]
    fn test_body_text_stays_paragraph() {
        let body = Fragment {
            font_size: Some(11.0),
            ..fragment("body text", 300.0, 312.0)
        };
        let blocks = group_fragments(vec![body], 0, 10.0, &config());
        assert_eq!(blocks[0].block_type, BlockType::Paragraph);
        assert!(!blocks[0].metadata.is_heading);
        assert_eq!(blocks[0].metadata.heading_level, None);
    }

    #[test]
    fn test_empty_input_yields_no_blocks() {
        let blocks = group_fragments(vec![], 0, 30.0, &config());
        assert!(blocks.is_empty());
    }
}
