//! Block emission for styled (DOCX) document bodies.
//!
//! Styled sources carry the original document's structure directly:
//! paragraph style names decide heading classification, and tables are
//! emitted one block per non-empty cell in row-major order.

use crate::extraction::StyledElement;
use crate::types::{block_id, Block};

const HEADING_STYLE_PREFIX: &str = "Heading";

/// Parse a heading level from a style name like "Heading 2".
///
/// Returns `None` for non-heading styles; unparsable trailing text yields
/// the default level 1.
fn heading_level_from_style(style: &str) -> Option<u8> {
    if !style.starts_with(HEADING_STYLE_PREFIX) {
        return None;
    }
    let level = style
        .rsplit(' ')
        .next()
        .and_then(|tail| tail.parse::<u8>().ok())
        .unwrap_or(1);
    Some(level)
}

/// Convert styled body elements into ordered blocks for one page.
///
/// Empty paragraphs and empty table cells are skipped. Table ids are
/// scoped by the block counter at the table's position, so repeated
/// tables on a page stay distinct.
pub fn blocks_from_styled_elements(elements: &[StyledElement], page_index: usize) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut counter = 0;

    for element in elements {
        match element {
            StyledElement::Paragraph { text, style } => {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                let level = style.as_deref().and_then(heading_level_from_style);
                let block = match level {
                    Some(level) => Block::heading(block_id(page_index, counter), text, level),
                    None => Block::paragraph(block_id(page_index, counter), text),
                };
                blocks.push(block);
                counter += 1;
            }
            StyledElement::Table { rows } => {
                let table_id = format!("table-{counter}");
                for (row_idx, row) in rows.iter().enumerate() {
                    for (col_idx, cell) in row.iter().enumerate() {
                        let cell = cell.trim();
                        if cell.is_empty() {
                            continue;
                        }
                        blocks.push(Block::table_cell(
                            block_id(page_index, counter),
                            cell,
                            row_idx,
                            col_idx,
                            table_id.clone(),
                        ));
                        counter += 1;
                    }
                }
            }
        }
    }

    blocks
}
