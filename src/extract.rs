//! Plain text extraction for the document formats ingestion accepts.
//!
//! Text files are decoded lossily. PDF text comes from `pdf-extract`;
//! DOCX text is read from the `w:t` runs of `word/document.xml`, one line
//! per `w:p` paragraph so paragraph chunking still applies.

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::Event;

use crate::error::{Result, VaultError};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "docx"];

/// Upper bound on the decompressed size of `word/document.xml`.
const MAX_DOCUMENT_XML_BYTES: u64 = 50 * 1024 * 1024;

/// Lowercased extension of `path` if ingestion knows how to read it.
pub fn supported_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn extract_text(path: &Path, bytes: &[u8]) -> Result<String> {
    match supported_extension(path).as_deref() {
        Some("pdf") => extract_pdf(bytes),
        Some("docx") => extract_docx(bytes),
        Some(_) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        None => Err(VaultError::Extract(format!(
            "unsupported file type: {}",
            path.display()
        ))),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| VaultError::Extract(format!("PDF: {e}")))
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| docx_error(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| docx_error(e.to_string()))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_DOCUMENT_XML_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| docx_error(e.to_string()))?;
    if xml.len() as u64 >= MAX_DOCUMENT_XML_BYTES {
        return Err(docx_error("word/document.xml exceeds size limit".into()));
    }
    paragraph_text(&xml)
}

fn paragraph_text(xml: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => {
                if let Ok(Event::Text(te)) = reader.read_event_into(&mut buf) {
                    out.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"p" => out.push('\n'),
            Ok(Event::Eof) => break,
            Err(e) => return Err(docx_error(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn docx_error(msg: String) -> VaultError {
    VaultError::Extract(format!("DOCX: {msg}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::docx_with_paragraphs;
    use std::io::Write;

    #[test]
    fn test_docx_paragraphs_become_lines() {
        let bytes = docx_with_paragraphs(&["Rust engineer", "Built async &amp; services"]);
        let text = extract_text(Path::new("cv.docx"), &bytes).unwrap();
        assert_eq!(text, "Rust engineer\nBuilt async & services\n");
    }

    #[test]
    fn test_docx_without_document_xml_is_an_error() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = extract_text(Path::new("cv.docx"), &buf).unwrap_err();
        assert!(matches!(err, VaultError::Extract(_)));
    }

    #[test]
    fn test_invalid_pdf_is_an_error() {
        let err = extract_text(Path::new("cv.PDF"), b"not a pdf").unwrap_err();
        assert!(err.to_string().contains("PDF"));
    }

    #[test]
    fn test_text_files_are_decoded_lossily() {
        let text = extract_text(Path::new("notes.md"), b"caf\xff rust").unwrap();
        assert_eq!(text, "caf\u{fffd} rust");
    }

    #[test]
    fn test_supported_extension_is_case_insensitive() {
        assert_eq!(supported_extension(Path::new("a/CV.DOCX")).as_deref(), Some("docx"));
        assert_eq!(supported_extension(Path::new("photo.png")), None);
        assert_eq!(supported_extension(Path::new("Makefile")), None);
    }
}
