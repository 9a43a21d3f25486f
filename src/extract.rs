//! Page-wise text extraction for uploaded documents (PDF, DOCX, PPTX).
//!
//! Extraction never returns partial text: either every page parses or the
//! caller gets an [`ExtractError`].

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;

use crate::error::ExtractError;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extracts text per page, in document order.
///
/// PDFs yield one entry per page and presentations one per slide. A Word
/// document has no stable page boundaries, so its body is a single entry.
pub fn extract_pages(bytes: &[u8], content_type: &str) -> Result<Vec<String>, ExtractError> {
    match content_type {
        MIME_PDF => extract_pdf_pages(bytes),
        MIME_DOCX => extract_docx(bytes).map(|body| vec![body]),
        MIME_PPTX => extract_pptx_slides(bytes),
        _ => Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        )),
    }
}

/// Joins page texts with a newline between pages.
///
/// Pages without text contribute nothing, not even a separator.
pub fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Picks a MIME type from the file extension, falling back to magic bytes.
pub fn detect_content_type(path: Option<&Path>, bytes: &[u8]) -> Option<&'static str> {
    let by_ext = path
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .and_then(|ext| match ext.as_str() {
            "pdf" => Some(MIME_PDF),
            "docx" => Some(MIME_DOCX),
            "pptx" => Some(MIME_PPTX),
            _ => None,
        });
    if by_ext.is_some() {
        return by_ext;
    }

    // Some producers put junk before the header; readers accept it within the first KiB.
    let head = &bytes[..bytes.len().min(1024)];
    if head.windows(5).any(|w| w == b"%PDF-") {
        return Some(MIME_PDF);
    }

    if bytes.starts_with(b"PK\x03\x04") {
        let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).ok()?;
        let names: Vec<&str> = archive.file_names().collect();
        if names.contains(&"word/document.xml") {
            return Some(MIME_DOCX);
        }
        if names.iter().any(|n| n.starts_with("ppt/")) {
            return Some(MIME_PPTX);
        }
    }

    None
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf(
            "parser aborted on malformed input".to_string(),
        )),
    }
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    collect_text_runs(&xml)
}

fn extract_pptx_slides(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    if slide_names.is_empty() {
        return Err(ExtractError::Ooxml("no slides found".to_string()));
    }
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut slides = Vec::with_capacity(slide_names.len());
    for name in slide_names {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        slides.push(collect_text_runs(&xml)?);
    }
    Ok(slides)
}

/// Collects `<*:t>` text runs, one line per `<*:p>` paragraph.
///
/// WordprocessingML (`w:t`, `w:p`) and DrawingML (`a:t`, `a:p`) share the
/// local names, so one walker serves both formats.
fn collect_text_runs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let is_text_run = e.local_name().as_ref() == b"t";
                if is_text_run {
                    if let Ok(Event::Text(te)) = reader.read_event_into(&mut buf) {
                        let text = te
                            .unescape()
                            .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                        out.push_str(&text);
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"p" && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    if out.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            for (name, body) in entries {
                zip.start_file(*name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn unsupported_content_type_returns_error() {
        let err = extract_pages(b"foo", "application/octet-stream").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedContentType(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_pages(b"not a pdf", MIME_PDF).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn invalid_zip_returns_error_for_docx() {
        let err = extract_pages(b"not a zip", MIME_DOCX).unwrap_err();
        assert!(matches!(err, ExtractError::Ooxml(_)));
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let doc = zip_with(&[(
            "word/document.xml",
            r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>First line</w:t></w:r></w:p><w:p><w:r><w:t xml:space="preserve">Second </w:t></w:r><w:r><w:t>line</w:t></w:r></w:p></w:body></w:document>"#,
        )]);
        let pages = extract_pages(&doc, MIME_DOCX).unwrap();
        assert_eq!(pages, vec!["First line\nSecond line".to_string()]);
    }

    #[test]
    fn pptx_slides_are_pages_in_numeric_order() {
        let slide = |t: &str| {
            format!(
                r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
                t
            )
        };
        let s1 = slide("one");
        let s2 = slide("two");
        let s10 = slide("ten");
        let deck = zip_with(&[
            ("ppt/slides/slide10.xml", &s10),
            ("ppt/slides/slide2.xml", &s2),
            ("ppt/slides/slide1.xml", &s1),
        ]);
        let pages = extract_pages(&deck, MIME_PPTX).unwrap();
        assert_eq!(pages, vec!["one", "two", "ten"]);
    }

    #[test]
    fn join_skips_empty_pages_without_separator() {
        let pages = vec![
            "alpha".to_string(),
            String::new(),
            "beta".to_string(),
            String::new(),
        ];
        assert_eq!(join_pages(&pages), "alpha\nbeta");
        assert_eq!(join_pages(&[String::new()]), "");
        assert_eq!(join_pages(&[]), "");
    }

    #[test]
    fn detect_by_extension_then_magic() {
        assert_eq!(
            detect_content_type(Some(Path::new("Guide.PDF")), b""),
            Some(MIME_PDF)
        );
        assert_eq!(detect_content_type(None, b"%PDF-1.4\n..."), Some(MIME_PDF));
        let doc = zip_with(&[("word/document.xml", "<w:document/>")]);
        assert_eq!(detect_content_type(None, &doc), Some(MIME_DOCX));
        let deck = zip_with(&[("ppt/slides/slide1.xml", "<p:sld/>")]);
        assert_eq!(
            detect_content_type(Some(Path::new("deck.bin")), &deck),
            Some(MIME_PPTX)
        );
        assert_eq!(detect_content_type(Some(Path::new("a.txt")), b"hello"), None);
    }
}
