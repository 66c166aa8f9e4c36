//! Raw extraction inputs and the document-source seam.
//!
//! Low-level PDF/DOCX parsing is out of core scope; parsers plug in behind
//! [`DocumentSource`] and hand the pipeline positioned words, styled
//! elements, or raster images per page. [`RawDocument`] is a serde-backed
//! in-memory source used by fixtures and the CLI's dump input.

use crate::types::BoundingBox;
use crate::{Result, TarjamaError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported input document classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Pdf,
    Docx,
    Image,
}

impl FileType {
    /// Classify a file by extension; anything that is not PDF or DOCX is
    /// treated as an image input.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(FileType::Pdf),
            "docx" => Ok(FileType::Docx),
            "jpg" | "jpeg" | "png" | "tiff" | "tif" => Ok(FileType::Image),
            other => Err(TarjamaError::extraction(format!(
                "unsupported file type: {other:?} ({})",
                path.display()
            ))),
        }
    }
}

/// A text run with coordinates from a vector PDF page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedWord {
    pub text: String,
    pub bbox: BoundingBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
}

/// A body element from a styled document (DOCX).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StyledElement {
    Paragraph {
        text: String,
        /// Declared paragraph style name, e.g. "Heading 2".
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<String>,
    },
    Table {
        rows: Vec<Vec<String>>,
    },
}

/// Raster page pixels handed to OCR.
///
/// Row-major 8-bit samples: RGB triplets, or single-channel intensity when
/// `grayscale` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    #[serde(default)]
    pub grayscale: bool,
}

/// Raw extraction output for one page, before segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourcePage {
    /// Word/run-level text with coordinates.
    Vector { words: Vec<PositionedWord> },
    /// Whole-paragraph text with style hints, plus tables.
    Styled { elements: Vec<StyledElement> },
    /// Scanned page; text must come from OCR.
    Raster { image: PageImage },
}

/// Narrow interface over format-specific extraction.
///
/// Implementations wrap a parsed document and expose raw per-page inputs.
/// `page` is the preferred extraction strategy; `fallback_page` is a
/// simpler, format-native alternative tried once when the preferred
/// strategy fails.
pub trait DocumentSource: Send + Sync {
    fn file_type(&self) -> FileType;

    fn page_count(&self) -> usize;

    fn page(&self, index: usize) -> Result<SourcePage>;

    fn fallback_page(&self, index: usize) -> Result<SourcePage> {
        self.page(index)
    }

    /// Render the page to a raster image at the given upscale factor, for
    /// pages whose vector text is absent or too short.
    fn rasterize(&self, index: usize, scale: f32) -> Result<PageImage>;
}

/// Extract one page, falling back to the alternate strategy once.
///
/// A failure of both strategies is fatal for the job.
pub fn extract_page_with_fallback(source: &dyn DocumentSource, index: usize) -> Result<SourcePage> {
    match source.page(index) {
        Ok(page) => Ok(page),
        Err(primary_err) => {
            tracing::warn!(
                page = index,
                error = %primary_err,
                "preferred extraction strategy failed, trying fallback"
            );
            source.fallback_page(index).map_err(|fallback_err| {
                TarjamaError::extraction_with_source(
                    format!(
                        "both extraction strategies failed for page {index}: {primary_err}"
                    ),
                    fallback_err,
                )
            })
        }
    }
}

/// In-memory document source backed by serializable raw pages.
///
/// Used as the fixture format in tests and as the CLI's JSON dump input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    pub filename: String,
    pub file_type: FileType,
    pub pages: Vec<SourcePage>,
    /// Pre-rendered rasters for pages whose vector text is too short.
    /// Indexed by page; `None` means the page cannot be rasterized.
    #[serde(default)]
    pub rasters: Vec<Option<PageImage>>,
}

impl RawDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl DocumentSource for RawDocument {
    fn file_type(&self) -> FileType {
        self.file_type
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<SourcePage> {
        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| TarjamaError::extraction(format!("page {index} out of range")))
    }

    fn rasterize(&self, index: usize, _scale: f32) -> Result<PageImage> {
        if let SourcePage::Raster { image } = self.page(index)? {
            return Ok(image);
        }
        self.rasters
            .get(index)
            .cloned()
            .flatten()
            .ok_or_else(|| TarjamaError::extraction(format!("no raster available for page {index}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakySource {
        fail_primary: bool,
        fail_fallback: bool,
    }

    impl DocumentSource for FlakySource {
        fn file_type(&self) -> FileType {
            FileType::Pdf
        }

        fn page_count(&self) -> usize {
            1
        }

        fn page(&self, _index: usize) -> Result<SourcePage> {
            if self.fail_primary {
                Err(TarjamaError::extraction("primary strategy broke"))
            } else {
                Ok(SourcePage::Vector { words: vec![] })
            }
        }

        fn fallback_page(&self, _index: usize) -> Result<SourcePage> {
            if self.fail_fallback {
                Err(TarjamaError::extraction("fallback strategy broke"))
            } else {
                Ok(SourcePage::Styled { elements: vec![] })
            }
        }

        fn rasterize(&self, _index: usize, _scale: f32) -> Result<PageImage> {
            Err(TarjamaError::extraction("no raster"))
        }
    }

    #[test]
    fn test_file_type_from_path() {
        assert_eq!(FileType::from_path("doc.PDF").unwrap(), FileType::Pdf);
        assert_eq!(FileType::from_path("report.docx").unwrap(), FileType::Docx);
        assert_eq!(FileType::from_path("scan.jpeg").unwrap(), FileType::Image);
        assert!(FileType::from_path("notes.odt").is_err());
    }

    #[test]
    fn test_fallback_used_when_primary_fails() {
        let source = FlakySource {
            fail_primary: true,
            fail_fallback: false,
        };
        let page = extract_page_with_fallback(&source, 0).unwrap();
        assert!(matches!(page, SourcePage::Styled { .. }));
    }

    #[test]
    fn test_both_strategies_failing_is_fatal() {
        let source = FlakySource {
            fail_primary: true,
            fail_fallback: true,
        };
        let err = extract_page_with_fallback(&source, 0).unwrap_err();
        assert!(matches!(err, TarjamaError::Extraction { .. }));
        assert!(err.to_string().contains("both extraction strategies failed"));
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let source = FlakySource {
            fail_primary: false,
            fail_fallback: true,
        };
        let page = extract_page_with_fallback(&source, 0).unwrap();
        assert!(matches!(page, SourcePage::Vector { .. }));
    }

    #[test]
    fn test_raw_document_round_trip() {
        let raw = RawDocument {
            filename: "fixture.pdf".to_string(),
            file_type: FileType::Pdf,
            pages: vec![SourcePage::Vector {
                words: vec![PositionedWord {
                    text: "hello".to_string(),
                    bbox: BoundingBox::new(0.0, 0.0, 40.0, 12.0),
                    font_size: Some(11.0),
                }],
            }],
            rasters: vec![],
        };
        let json = serde_json::to_string(&raw).unwrap();
        let back = RawDocument::from_json(&json).unwrap();
        assert_eq!(back.page_count(), 1);
        assert!(matches!(back.page(0).unwrap(), SourcePage::Vector { .. }));
    }

    #[test]
    fn test_raw_document_rasterize_prefers_raster_page() {
        let image = PageImage {
            width: 2,
            height: 1,
            pixels: vec![0, 0, 0, 255, 255, 255],
            grayscale: false,
        };
        let raw = RawDocument {
            filename: "scan.png".to_string(),
            file_type: FileType::Image,
            pages: vec![SourcePage::Raster { image: image.clone() }],
            rasters: vec![],
        };
        assert_eq!(raw.rasterize(0, 2.0).unwrap(), image);
    }
}
