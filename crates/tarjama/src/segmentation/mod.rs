//! Segmentation engine.
//!
//! Converts raw extraction output (positioned words, OCR spans, styled
//! paragraphs and tables) into ordered, classified blocks per page. The
//! same spatial-proximity grouping runs over PDF text and OCR results;
//! scanned pages are rasterized and handed to OCR fusion when their vector
//! text is missing or too short.

pub mod group;
pub mod styled;

pub use group::{group_fragments, Fragment};
pub use styled::blocks_from_styled_elements;

use crate::config::SegmentationConfig;
use crate::extraction::{
    extract_page_with_fallback, DocumentSource, PageImage, PositionedWord, SourcePage,
};
use crate::ocr::{recognize_page, EnginePlan, OcrSpan};
use crate::types::Page;
use crate::{Result, TarjamaError};

/// Segmentation output for a whole document.
#[derive(Debug)]
pub struct SegmentedDocument {
    pub pages: Vec<Page>,
    /// True when at least one page went through OCR.
    pub ocr_used: bool,
}

/// Per-job segmentation driver.
pub struct SegmentationEngine<'a> {
    config: &'a SegmentationConfig,
    ocr_plan: Option<&'a EnginePlan>,
}

impl<'a> SegmentationEngine<'a> {
    pub fn new(config: &'a SegmentationConfig, ocr_plan: Option<&'a EnginePlan>) -> Self {
        Self { config, ocr_plan }
    }

    /// Segment every page of `source` in order.
    pub async fn segment_document(&self, source: &dyn DocumentSource) -> Result<SegmentedDocument> {
        let mut pages = Vec::with_capacity(source.page_count());
        let mut ocr_used = false;

        for index in 0..source.page_count() {
            let raw = extract_page_with_fallback(source, index)?;
            let (page, used_ocr) = self.segment_page(raw, source, index).await?;
            tracing::debug!(page = index, blocks = page.blocks.len(), ocr = used_ocr, "page segmented");
            ocr_used |= used_ocr;
            pages.push(page);
        }

        Ok(SegmentedDocument { pages, ocr_used })
    }

    async fn segment_page(
        &self,
        raw: SourcePage,
        source: &dyn DocumentSource,
        index: usize,
    ) -> Result<(Page, bool)> {
        match raw {
            SourcePage::Vector { words } => {
                let extracted_chars: usize = words.iter().map(|w| w.text.trim().chars().count()).sum();
                if extracted_chars >= self.config.min_vector_text_chars {
                    let fragments = words.into_iter().map(vector_fragment).collect();
                    let blocks = group_fragments(
                        fragments,
                        index,
                        self.config.vector_proximity_threshold,
                        self.config,
                    );
                    Ok((Page::new(index, blocks), false))
                } else {
                    // Too little embedded text to trust: treat as scanned.
                    let image = source.rasterize(index, self.config.raster_scale)?;
                    let page = self.ocr_page(image, index).await?;
                    Ok((page, true))
                }
            }
            SourcePage::Styled { elements } => {
                let blocks = blocks_from_styled_elements(&elements, index);
                Ok((Page::new(index, blocks), false))
            }
            SourcePage::Raster { image } => {
                let page = self.ocr_page(image, index).await?;
                Ok((page, true))
            }
        }
    }

    async fn ocr_page(&self, image: PageImage, index: usize) -> Result<Page> {
        let plan = self.ocr_plan.ok_or_else(|| {
            TarjamaError::extraction(format!(
                "page {index} requires OCR but no OCR engine is available"
            ))
        })?;

        let spans = recognize_page(plan, &image).await;
        if spans.is_empty() {
            tracing::warn!(page = index, "OCR produced no text for page");
        }

        let fragments = spans.into_iter().map(ocr_fragment).collect();
        let blocks = group_fragments(
            fragments,
            index,
            self.config.ocr_proximity_threshold,
            self.config,
        );
        Ok(Page::new(index, blocks))
    }
}

fn vector_fragment(word: PositionedWord) -> Fragment {
    Fragment {
        text: word.text,
        bbox: word.bbox,
        confidence: None,
        font_size: word.font_size,
    }
}

fn ocr_fragment(span: OcrSpan) -> Fragment {
    Fragment {
        text: span.text,
        bbox: span.bbox,
        confidence: Some(span.confidence),
        font_size: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::Backend;
    use crate::extraction::{FileType, RawDocument, StyledElement};
    use crate::ocr::OcrBackend;
    use crate::types::{BlockType, BoundingBox};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StaticOcr {
        spans: Vec<OcrSpan>,
    }

    impl Backend for StaticOcr {
        fn name(&self) -> &str {
            "static"
        }
    }

    #[async_trait]
    impl OcrBackend for StaticOcr {
        async fn recognize(&self, _image: &PageImage) -> Result<Vec<OcrSpan>> {
            Ok(self.spans.clone())
        }
    }

    fn word(text: &str, y1: f32, y2: f32) -> PositionedWord {
        PositionedWord {
            text: text.to_string(),
            bbox: BoundingBox::new(0.0, y1, 80.0, y2),
            font_size: Some(11.0),
        }
    }

    fn raster(width: u32, height: u32) -> PageImage {
        PageImage {
            width,
            height,
            pixels: vec![255; (width * height * 3) as usize],
            grayscale: false,
        }
    }

    fn ocr_plan_returning(spans: Vec<OcrSpan>) -> EnginePlan {
        EnginePlan::Single {
            engine: Arc::new(StaticOcr { spans }),
            fallback: None,
        }
    }

    #[tokio::test]
    async fn test_vector_page_with_enough_text_skips_ocr() {
        let config = SegmentationConfig::default();
        let engine = SegmentationEngine::new(&config, None);
        let doc = RawDocument {
            filename: "digital.pdf".to_string(),
            file_type: FileType::Pdf,
            pages: vec![SourcePage::Vector {
                words: vec![word("enough embedded", 100.0, 112.0), word("text here", 114.0, 126.0)],
            }],
            rasters: vec![],
        };

        let segmented = engine.segment_document(&doc).await.unwrap();
        assert!(!segmented.ocr_used);
        assert_eq!(segmented.pages.len(), 1);
        assert_eq!(segmented.pages[0].blocks.len(), 1);
        assert_eq!(segmented.pages[0].blocks[0].text, "enough embedded text here");
    }

    #[tokio::test]
    async fn test_sparse_vector_page_is_rasterized_and_ocrd() {
        let config = SegmentationConfig::default();
        let spans = vec![OcrSpan::new("scanned text", 0.95, BoundingBox::new(0.0, 100.0, 60.0, 120.0))];
        let plan = ocr_plan_returning(spans);
        let engine = SegmentationEngine::new(&config, Some(&plan));

        let doc = RawDocument {
            filename: "scan.pdf".to_string(),
            file_type: FileType::Pdf,
            // under the 10-char minimum
            pages: vec![SourcePage::Vector {
                words: vec![word("x1", 0.0, 10.0)],
            }],
            rasters: vec![Some(raster(4, 4))],
        };

        let segmented = engine.segment_document(&doc).await.unwrap();
        assert!(segmented.ocr_used);
        assert_eq!(segmented.pages[0].blocks[0].text, "scanned text");
        assert!(segmented.pages[0].blocks[0].metadata.confidence.is_some());
    }

    #[tokio::test]
    async fn test_raster_page_without_ocr_plan_fails_extraction() {
        let config = SegmentationConfig::default();
        let engine = SegmentationEngine::new(&config, None);
        let doc = RawDocument {
            filename: "scan.png".to_string(),
            file_type: FileType::Image,
            pages: vec![SourcePage::Raster { image: raster(4, 4) }],
            rasters: vec![],
        };

        let err = engine.segment_document(&doc).await.unwrap_err();
        assert!(matches!(err, TarjamaError::Extraction { .. }));
        assert!(err.to_string().contains("requires OCR"));
    }

    #[tokio::test]
    async fn test_styled_page_emits_structured_blocks() {
        let config = SegmentationConfig::default();
        let engine = SegmentationEngine::new(&config, None);
        let doc = RawDocument {
            filename: "report.docx".to_string(),
            file_type: FileType::Docx,
            pages: vec![SourcePage::Styled {
                elements: vec![
                    StyledElement::Paragraph {
                        text: "Summary".to_string(),
                        style: Some("Heading 1".to_string()),
                    },
                    StyledElement::Paragraph {
                        text: "Body paragraph.".to_string(),
                        style: None,
                    },
                    StyledElement::Table {
                        rows: vec![vec!["k".to_string(), "v".to_string()]],
                    },
                ],
            }],
            rasters: vec![],
        };

        let segmented = engine.segment_document(&doc).await.unwrap();
        assert!(!segmented.ocr_used);
        let blocks = &segmented.pages[0].blocks;
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].block_type, BlockType::Heading);
        assert_eq!(blocks[1].block_type, BlockType::Paragraph);
        assert_eq!(blocks[2].block_type, BlockType::TableCell);
        assert_eq!(blocks[3].block_type, BlockType::TableCell);
    }

    #[tokio::test]
    async fn test_empty_ocr_result_yields_empty_page_not_error() {
        let config = SegmentationConfig::default();
        let plan = ocr_plan_returning(vec![]);
        let engine = SegmentationEngine::new(&config, Some(&plan));
        let doc = RawDocument {
            filename: "blank.png".to_string(),
            file_type: FileType::Image,
            pages: vec![SourcePage::Raster { image: raster(4, 4) }],
            rasters: vec![],
        };

        let segmented = engine.segment_document(&doc).await.unwrap();
        assert!(segmented.ocr_used);
        assert!(segmented.pages[0].blocks.is_empty());
    }
}
