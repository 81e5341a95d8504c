//! Minimal WordprocessingML writer
//!
//! Produces the three parts Word and the translation engine require:
//! `[Content_Types].xml`, `_rels/.rels` and `word/document.xml`.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::ConvertError;

const WORDPROCESSING_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Package `pages` as a DOCX: one paragraph per line, a page break
/// between pages.
pub fn write_docx(pages: &[String]) -> Result<Vec<u8>, ConvertError> {
    let document = document_xml(pages)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", RELS_XML.as_bytes()),
        ("word/document.xml", document.as_slice()),
    ] {
        zip.start_file(name, options).map_err(docx_error)?;
        zip.write_all(content).map_err(docx_error)?;
    }

    let cursor = zip.finish().map_err(docx_error)?;
    Ok(cursor.into_inner())
}

fn docx_error(err: impl std::fmt::Display) -> ConvertError {
    ConvertError::DocxWrite(err.to_string())
}

/// Body of `word/document.xml`.
pub fn document_xml(pages: &[String]) -> Result<Vec<u8>, ConvertError> {
    let mut writer = Writer::new(Vec::new());

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(docx_error)?;
    writer
        .write_event(Event::Start(
            BytesStart::new("w:document").with_attributes([("xmlns:w", WORDPROCESSING_NS)]),
        ))
        .map_err(docx_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("w:body")))
        .map_err(docx_error)?;

    for (index, page) in pages.iter().enumerate() {
        if index > 0 {
            write_page_break(&mut writer)?;
        }
        for line in page.lines() {
            write_paragraph(&mut writer, &xml_safe(line.trim_end()))?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("w:body")))
        .map_err(docx_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:document")))
        .map_err(docx_error)?;

    Ok(writer.into_inner())
}

fn write_paragraph(writer: &mut Writer<Vec<u8>>, text: &str) -> Result<(), ConvertError> {
    if text.is_empty() {
        return writer
            .write_event(Event::Empty(BytesStart::new("w:p")))
            .map_err(docx_error);
    }

    let events = [
        Event::Start(BytesStart::new("w:p")),
        Event::Start(BytesStart::new("w:r")),
        Event::Start(BytesStart::new("w:t").with_attributes([("xml:space", "preserve")])),
        Event::Text(BytesText::new(text)),
        Event::End(BytesEnd::new("w:t")),
        Event::End(BytesEnd::new("w:r")),
        Event::End(BytesEnd::new("w:p")),
    ];
    for event in events {
        writer.write_event(event).map_err(docx_error)?;
    }
    Ok(())
}

fn write_page_break(writer: &mut Writer<Vec<u8>>) -> Result<(), ConvertError> {
    let events = [
        Event::Start(BytesStart::new("w:p")),
        Event::Start(BytesStart::new("w:r")),
        Event::Empty(BytesStart::new("w:br").with_attributes([("w:type", "page")])),
        Event::End(BytesEnd::new("w:r")),
        Event::End(BytesEnd::new("w:p")),
    ];
    for event in events {
        writer.write_event(event).map_err(docx_error)?;
    }
    Ok(())
}

/// Drop characters XML 1.0 cannot carry.
fn xml_safe(line: &str) -> String {
    line.chars()
        .filter(|c| *c == '\t' || !c.is_control())
        .collect()
}
