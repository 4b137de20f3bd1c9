//! PPTX file parser implementation.

use quick_xml::events::Event;
use quick_xml::Reader;
use slidecheck_core::{BlockKey, Error, Presentation, PresentationFormat, Result, TextBlock};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

/// Elements that python-pptx-compatible tooling counts as shapes when they
/// are direct children of a slide's shape tree.
const SHAPE_ELEMENTS: &[&[u8]] = &[
    b"sp",
    b"grpSp",
    b"graphicFrame",
    b"cxnSp",
    b"pic",
    b"contentPart",
];

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX file from a reader.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Presentation> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut presentation = Presentation::new(filename, PresentationFormat::Pptx);

        let slide_order = self.get_slide_order(&mut archive)?;
        presentation.slide_count = slide_order.len();

        for (idx, slide_path) in slide_order.iter().enumerate() {
            let content = self.read_file_from_archive(&mut archive, slide_path)?;
            let blocks = extract_blocks_from_xml(&content, idx + 1)?;
            log::debug!("Slide {} ({}): {} blocks", idx + 1, slide_path, blocks.len());
            for block in blocks {
                presentation.add_block(block);
            }
        }

        log::info!(
            "Parsed {}: {} slides, {} blocks",
            filename,
            presentation.slide_count,
            presentation.blocks.len()
        );

        Ok(presentation)
    }

    /// Get the ordered list of slide part paths.
    ///
    /// The authoritative order is `<p:sldIdLst>` in presentation.xml; when it
    /// is absent, slide relationships are sorted by their trailing number.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = self
            .read_optional_file(archive, "ppt/_rels/presentation.xml.rels")?
            .ok_or_else(|| {
                Error::CorruptedFile("not a PowerPoint deck (no ppt/_rels/presentation.xml.rels)".to_string())
            })?;
        let relationships = parse_relationships(&rels_content)?;

        let slide_rels: Vec<&Relationship> = relationships
            .iter()
            .filter(|r| r.rel_type.ends_with("/slide"))
            .collect();

        if let Some(presentation_xml) = self.read_optional_file(archive, "ppt/presentation.xml")? {
            let ids = parse_slide_id_list(&presentation_xml)?;
            if !ids.is_empty() {
                let by_id: HashMap<&str, &Relationship> =
                    slide_rels.iter().map(|r| (r.id.as_str(), *r)).collect();
                let mut ordered = Vec::with_capacity(ids.len());
                for id in &ids {
                    match by_id.get(id.as_str()) {
                        Some(rel) => ordered.push(resolve_target(&rel.target)),
                        None => log::warn!("Slide id {} has no relationship; skipping", id),
                    }
                }
                return Ok(ordered);
            }
        }

        let mut slides: Vec<(String, Option<usize>)> = slide_rels
            .iter()
            .map(|r| {
                let order_num = extract_slide_number(&r.target).or_else(|| extract_slide_number(&r.id));
                (resolve_target(&r.target), order_num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        self.read_optional_file(archive, path)?
            .ok_or_else(|| Error::ZipError(format!("File not found in archive '{}'", path)))
    }

    fn read_optional_file<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<Option<String>> {
        let mut file = match archive.by_name(path) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(Error::ZipError(format!("Failed to open '{}': {}", path, e)));
            }
        };

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(Some(content))
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Open a presentation from disk, detecting its format first.
///
/// Legacy binary .ppt files are recognised and rejected.
pub fn load_presentation(path: &Path) -> Result<Presentation> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = Vec::with_capacity(8);
    (&mut reader).take(8).read_to_end(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;

    let format = PresentationFormat::from_magic(&magic).or_else(|| {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(PresentationFormat::from_extension)
    });

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");

    match format {
        Some(PresentationFormat::Pptx) => PptxParser::new().parse(reader, filename),
        Some(PresentationFormat::LegacyPpt) => Err(Error::UnsupportedFormat(format!(
            "{} is a legacy .ppt file; save it as .pptx first",
            filename
        ))),
        None => Err(Error::UnsupportedFormat(format!(
            "{} is not a PowerPoint file",
            filename
        ))),
    }
}

/// A package relationship from a .rels part.
#[derive(Debug, Default)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut relationships = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship::default();
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        b"Id" => rel.id = value,
                        _ => {}
                    }
                }
                relationships.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Relationship ids of `<p:sldId>` entries, in presentation order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                for attr in e.attributes().flatten() {
                    let key = attr.key.as_ref();
                    // The relationship id is the namespaced r:id, not the numeric id.
                    if key.contains(&b':') && local_name(key) == b"id" {
                        ids.push(String::from_utf8_lossy(&attr.value).to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation.xml: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Shape currently being read from the shape tree.
#[derive(Debug)]
struct ShapeState {
    index: usize,
    depth: usize,
    is_text_shape: bool,
    in_text_body: bool,
    paragraphs: Vec<String>,
    paragraph: Option<String>,
    in_text_run: bool,
}

impl ShapeState {
    fn new(index: usize, depth: usize, name: &[u8]) -> Self {
        Self {
            index,
            depth,
            is_text_shape: name == b"sp",
            in_text_body: false,
            paragraphs: Vec::new(),
            paragraph: None,
            in_text_run: false,
        }
    }
}

/// Extract one block per paragraph of every text-bearing shape on a slide.
///
/// Shapes are indexed over all direct children of `<p:spTree>`, so pictures,
/// tables and groups consume an index without producing blocks.
pub fn extract_blocks_from_xml(xml_content: &str, slide_number: usize) -> Result<Vec<TextBlock>> {
    let mut blocks = Vec::new();
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(false);

    let mut depth = 0usize;
    let mut tree_depth: Option<usize> = None;
    let mut tree_done = false;
    let mut shape_count = 0usize;
    let mut current: Option<ShapeState> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("slide {}: {}", slide_number, e)))?;

        match event {
            Event::Start(ref e) => {
                let d = depth;
                depth += 1;
                let name = e.name();
                let name = local_name(name.as_ref());

                if tree_depth.is_none() && !tree_done && name == b"spTree" {
                    tree_depth = Some(d);
                    continue;
                }
                let Some(td) = tree_depth else { continue };

                if d == td + 1 && is_shape_element(name) {
                    current = Some(ShapeState::new(shape_count, d, name));
                    shape_count += 1;
                    continue;
                }
                if let Some(shape) = current.as_mut() {
                    open_shape_child(shape, d, name);
                }
            }
            Event::Empty(ref e) => {
                let d = depth;
                let name = e.name();
                let name = local_name(name.as_ref());
                let Some(td) = tree_depth else { continue };

                if d == td + 1 && is_shape_element(name) {
                    shape_count += 1;
                    continue;
                }
                if let Some(shape) = current.as_mut() {
                    if shape.in_text_body && d == shape.depth + 2 && name == b"p" {
                        shape.paragraphs.push(String::new());
                    } else if name == b"br" {
                        if let Some(text) = shape.paragraph.as_mut() {
                            text.push('\n');
                        }
                    }
                }
            }
            Event::Text(ref e) => {
                if let Some(shape) = current.as_mut() {
                    if shape.in_text_run {
                        if let Some(text) = shape.paragraph.as_mut() {
                            let unescaped = e
                                .unescape()
                                .map_err(|err| Error::XmlError(format!("slide {}: {}", slide_number, err)))?;
                            text.push_str(&unescaped);
                        }
                    }
                }
            }
            Event::CData(ref e) => {
                if let Some(shape) = current.as_mut() {
                    if shape.in_text_run {
                        if let Some(text) = shape.paragraph.as_mut() {
                            text.push_str(&String::from_utf8_lossy(e));
                        }
                    }
                }
            }
            Event::End(ref e) => {
                depth = depth.saturating_sub(1);
                let d = depth;
                let name = e.name();
                let name = local_name(name.as_ref());

                if tree_depth == Some(d) {
                    tree_depth = None;
                    tree_done = true;
                    continue;
                }

                let closes_shape = current.as_ref().map(|s| s.depth == d).unwrap_or(false);
                if closes_shape {
                    if let Some(shape) = current.take() {
                        finish_shape(shape, slide_number, &mut blocks);
                    }
                    continue;
                }

                if let Some(shape) = current.as_mut() {
                    close_shape_child(shape, d, name);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(blocks)
}

fn open_shape_child(shape: &mut ShapeState, d: usize, name: &[u8]) {
    if d == shape.depth + 1 && name == b"txBody" && shape.is_text_shape {
        shape.in_text_body = true;
    } else if shape.in_text_body && d == shape.depth + 2 && name == b"p" {
        shape.paragraph = Some(String::new());
    } else if shape.paragraph.is_some() && name == b"t" {
        shape.in_text_run = true;
    }
}

fn close_shape_child(shape: &mut ShapeState, d: usize, name: &[u8]) {
    if d == shape.depth + 1 && name == b"txBody" {
        shape.in_text_body = false;
    } else if shape.in_text_body && d == shape.depth + 2 && name == b"p" {
        if let Some(text) = shape.paragraph.take() {
            shape.paragraphs.push(text);
        }
        shape.in_text_run = false;
    } else if name == b"t" {
        shape.in_text_run = false;
    }
}

fn finish_shape(shape: ShapeState, slide_number: usize, blocks: &mut Vec<TextBlock>) {
    if !shape.is_text_shape {
        return;
    }
    for (para_idx, text) in shape.paragraphs.into_iter().enumerate() {
        blocks.push(TextBlock::new(
            BlockKey::new(slide_number, shape.index, para_idx),
            text.trim(),
        ));
    }
}

fn is_shape_element(name: &[u8]) -> bool {
    SHAPE_ELEMENTS.contains(&name)
}

/// Resolve a relationship target relative to the `ppt/` directory.
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let relative = target.trim_start_matches("./");
    format!("ppt/{}", relative)
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    // Remove common extensions first
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
