//! Domain types for representing extracted presentation content.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Position of a paragraph within a presentation.
///
/// Ordering is lexicographic over (slide, shape, paragraph), which is the
/// order rows appear in a comparison report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockKey {
    /// 1-based slide number.
    pub slide: usize,
    /// 0-based index of the shape in the slide's shape tree.
    pub shape: usize,
    /// 0-based index of the paragraph within the shape's text frame.
    pub paragraph: usize,
}

impl BlockKey {
    pub fn new(slide: usize, shape: usize, paragraph: usize) -> Self {
        Self {
            slide,
            shape,
            paragraph,
        }
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.slide, self.shape, self.paragraph)
    }
}

/// A single paragraph of text extracted from a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub key: BlockKey,
    /// Paragraph text with surrounding whitespace removed. May be empty.
    pub text: String,
}

impl TextBlock {
    pub fn new(key: BlockKey, text: impl Into<String>) -> Self {
        Self {
            key,
            text: text.into(),
        }
    }
}

/// Represents an entire presentation with its extracted content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presentation {
    /// Original filename (without path).
    pub filename: String,

    /// Detected format of the source file.
    pub format: PresentationFormat,

    /// Number of slides in the deck, including slides without text.
    pub slide_count: usize,

    /// Text blocks in document order.
    pub blocks: Vec<TextBlock>,
}

impl Presentation {
    /// Create a new presentation with the given filename and format.
    pub fn new(filename: impl Into<String>, format: PresentationFormat) -> Self {
        Self {
            filename: filename.into(),
            format,
            slide_count: 0,
            blocks: Vec::new(),
        }
    }

    /// Add a block to the presentation.
    pub fn add_block(&mut self, block: TextBlock) {
        self.blocks.push(block);
    }

    /// Map of block key to text. A key seen twice keeps its last text.
    pub fn text_map(&self) -> BTreeMap<BlockKey, &str> {
        self.blocks
            .iter()
            .map(|b| (b.key, b.text.as_str()))
            .collect()
    }

    /// Number of blocks with non-empty text.
    pub fn non_empty_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| !b.text.is_empty()).count()
    }
}

/// The format of an uploaded presentation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationFormat {
    /// Modern PPTX (Office Open XML).
    Pptx,
    /// Legacy PPT (OLE/CFB binary). Detected only to be rejected.
    LegacyPpt,
}

impl PresentationFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "ppt" => Some(Self::LegacyPpt),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        // PPT is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
        if bytes.len() >= 8
            && bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
        {
            return Some(Self::LegacyPpt);
        }

        None
    }
}
