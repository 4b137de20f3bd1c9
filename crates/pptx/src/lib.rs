//! PPTX (Office Open XML) parser backend for paragraph extraction.
//!
//! Parses .pptx files which are ZIP archives containing XML documents.

pub mod parser;

pub use parser::{load_presentation, PptxParser};
