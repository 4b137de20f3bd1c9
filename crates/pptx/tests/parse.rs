//! End-to-end extraction from PPTX packages built in memory.

use slidecheck_core::{BlockKey, Error, PresentationFormat};
use slidecheck_pptx::{load_presentation, PptxParser};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

const SLIDE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const LAYOUT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";

fn slide_xml(paragraphs: &[&[&str]]) -> String {
    let mut shapes = String::new();
    for paras in paragraphs {
        shapes.push_str("<p:sp><p:nvSpPr><p:cNvPr id=\"2\" name=\"Text\"/></p:nvSpPr><p:txBody><a:bodyPr/>");
        for p in *paras {
            shapes.push_str(&format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", p));
        }
        shapes.push_str("</p:txBody></p:sp>");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr/><p:grpSpPr/>{}</p:spTree></p:cSld></p:sld>"#,
        shapes
    )
}

/// Build a package whose slide parts are listed in `sldIdLst` in the given
/// `order` (indices into `slides`).
fn build_pptx(slides: &[String], order: Option<&[usize]>) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();

    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    rels.push_str(&format!(
        r#"<Relationship Id="rId1" Type="{}" Target="slideMasters/slideMaster1.xml"/>"#,
        LAYOUT_REL
    ));
    for (i, _) in slides.iter().enumerate() {
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{}" Target="slides/slide{}.xml"/>"#,
            i + 2,
            SLIDE_REL,
            i + 1
        ));
    }
    rels.push_str("</Relationships>");

    zip.start_file("ppt/_rels/presentation.xml.rels", options).unwrap();
    zip.write_all(rels.as_bytes()).unwrap();

    if let Some(order) = order {
        let mut pres = String::from(
            r#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldIdLst>"#,
        );
        for (n, &i) in order.iter().enumerate() {
            pres.push_str(&format!(
                r#"<p:sldId id="{}" r:id="rId{}"/>"#,
                256 + n,
                i + 2
            ));
        }
        pres.push_str("</p:sldIdLst></p:presentation>");
        zip.start_file("ppt/presentation.xml", options).unwrap();
        zip.write_all(pres.as_bytes()).unwrap();
    }

    for (i, slide) in slides.iter().enumerate() {
        zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), options)
            .unwrap();
        zip.write_all(slide.as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

#[test]
fn test_blocks_are_keyed_by_slide_shape_paragraph() {
    let slides = vec![
        slide_xml(&[&["Title"], &["Point one", "Point two"]]),
        slide_xml(&[&["Thanks"]]),
    ];
    let bytes = build_pptx(&slides, Some(&[0, 1]));

    let pres = PptxParser::new()
        .parse(Cursor::new(bytes), "deck.pptx")
        .unwrap();

    assert_eq!(pres.filename, "deck.pptx");
    assert_eq!(pres.format, PresentationFormat::Pptx);
    assert_eq!(pres.slide_count, 2);

    let map = pres.text_map();
    assert_eq!(map[&BlockKey::new(1, 0, 0)], "Title");
    assert_eq!(map[&BlockKey::new(1, 1, 0)], "Point one");
    assert_eq!(map[&BlockKey::new(1, 1, 1)], "Point two");
    assert_eq!(map[&BlockKey::new(2, 0, 0)], "Thanks");
    assert_eq!(map.len(), 4);
}

#[test]
fn test_slide_order_follows_slide_id_list() {
    let slides = vec![slide_xml(&[&["first part"]]), slide_xml(&[&["second part"]])];
    let bytes = build_pptx(&slides, Some(&[1, 0]));

    let pres = PptxParser::new()
        .parse(Cursor::new(bytes), "reordered.pptx")
        .unwrap();

    let map = pres.text_map();
    assert_eq!(map[&BlockKey::new(1, 0, 0)], "second part");
    assert_eq!(map[&BlockKey::new(2, 0, 0)], "first part");
}

#[test]
fn test_fallback_order_without_presentation_part() {
    let slides: Vec<String> = (1..=11)
        .map(|n| slide_xml(&[&[format!("slide {}", n).as_str()]]))
        .collect();
    let bytes = build_pptx(&slides, None);

    let pres = PptxParser::new()
        .parse(Cursor::new(bytes), "numbered.pptx")
        .unwrap();

    assert_eq!(pres.slide_count, 11);
    let map = pres.text_map();
    assert_eq!(map[&BlockKey::new(2, 0, 0)], "slide 2");
    assert_eq!(map[&BlockKey::new(11, 0, 0)], "slide 11");
}

#[test]
fn test_not_a_zip() {
    let err = PptxParser::new()
        .parse(Cursor::new(b"definitely not a zip".to_vec()), "bad.pptx")
        .unwrap_err();
    assert!(matches!(err, Error::ZipError(_)));
}

#[test]
fn test_missing_slide_part() {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("ppt/_rels/presentation.xml.rels", FileOptions::default())
        .unwrap();
    zip.write_all(
        format!(
            r#"<Relationships><Relationship Id="rId2" Type="{}" Target="slides/slide1.xml"/></Relationships>"#,
            SLIDE_REL
        )
        .as_bytes(),
    )
    .unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let err = PptxParser::new()
        .parse(Cursor::new(bytes), "broken.pptx")
        .unwrap_err();
    assert!(matches!(err, Error::ZipError(_)));
}

#[test]
fn test_zip_without_presentation_part() {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("word/document.xml", FileOptions::default())
        .unwrap();
    zip.write_all(b"<w:document/>").unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let err = PptxParser::new()
        .parse(Cursor::new(bytes), "letter.docx")
        .unwrap_err();
    assert!(matches!(err, Error::CorruptedFile(_)));
}

#[test]
fn test_load_presentation_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("on-disk.pptx");
    std::fs::write(&path, build_pptx(&[slide_xml(&[&["Hi"]])], Some(&[0]))).unwrap();

    let pres = load_presentation(&path).unwrap();
    assert_eq!(pres.filename, "on-disk.pptx");
    assert_eq!(pres.text_map()[&BlockKey::new(1, 0, 0)], "Hi");
}

#[test]
fn test_load_presentation_rejects_legacy_and_unknown() {
    let dir = tempfile::tempdir().unwrap();

    let legacy = dir.path().join("old.ppt");
    let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    bytes.extend_from_slice(&[0u8; 64]);
    std::fs::write(&legacy, bytes).unwrap();
    assert!(matches!(
        load_presentation(&legacy),
        Err(Error::UnsupportedFormat(_))
    ));

    let text = dir.path().join("notes.txt");
    std::fs::write(&text, "plain text").unwrap();
    assert!(matches!(
        load_presentation(&text),
        Err(Error::UnsupportedFormat(_))
    ));
}
