use crate::error::ExtractError;
use crate::models::{Document, DocumentFormat};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use tracing::warn;

const DOCX_BODY_PART: &str = "word/document.xml";

/// Turns a document into plain text. Implementations never fail: unreadable
/// input comes back as an empty string.
pub trait TextExtractor {
    fn extract(&self, document: &Document) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract(&self, document: &Document) -> String {
        match extract_document(document) {
            Ok(text) => text,
            Err(error) => {
                warn!(filename = %document.filename, %error, "document not readable");
                String::new()
            }
        }
    }
}

pub fn extract_document(document: &Document) -> Result<String, ExtractError> {
    match document.format {
        DocumentFormat::Pdf => extract_pdf_text(&document.bytes),
        DocumentFormat::Docx => extract_docx_text(&document.bytes),
        DocumentFormat::Text => Ok(String::from_utf8_lossy(&document.bytes).into_owned()),
        DocumentFormat::Zip => extract_zip_text(&document.bytes),
    }
}

pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let document =
        lopdf::Document::load_mem(bytes).map_err(|error| ExtractError::Pdf(error.to_string()))?;

    let pages = document
        .get_pages()
        .into_keys()
        .map(|page_no| document.extract_text(&[page_no]).unwrap_or_default())
        .collect::<Vec<_>>();

    Ok(pages.join("\n"))
}

pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name(DOCX_BODY_PART)?.read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_run_text = false;
    // Paragraphs nested in tables are not body text.
    let mut table_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(element) => match element.name().as_ref() {
                b"w:tbl" => table_depth += 1,
                b"w:p" if table_depth == 0 => {
                    in_paragraph = true;
                    current.clear();
                }
                b"w:t" => in_run_text = true,
                _ => {}
            },
            Event::End(element) => match element.name().as_ref() {
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                b"w:p" if in_paragraph => {
                    paragraphs.push(current.trim_end().to_string());
                    current.clear();
                    in_paragraph = false;
                }
                b"w:t" => in_run_text = false,
                _ => {}
            },
            Event::Empty(element) => match element.name().as_ref() {
                b"w:p" if table_depth == 0 => paragraphs.push(String::new()),
                b"w:tab" if in_paragraph => current.push('\t'),
                b"w:br" if in_paragraph => current.push('\n'),
                _ => {}
            },
            Event::Text(text) if in_paragraph && in_run_text => {
                let value = text
                    .decode()
                    .map_err(|error| ExtractError::Docx(error.to_string()))?;
                current.push_str(&value);
            }
            Event::GeneralRef(reference) if in_paragraph && in_run_text => {
                if let Some(ch) = reference
                    .resolve_char_ref()
                    .map_err(|error| ExtractError::Docx(error.to_string()))?
                {
                    current.push(ch);
                } else {
                    let name = reference
                        .decode()
                        .map_err(|error| ExtractError::Docx(error.to_string()))?;
                    if let Some(resolved) = quick_xml::escape::resolve_predefined_entity(&name) {
                        current.push_str(resolved);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

/// Extracts every `.pdf`/`.docx` entry of a ZIP archive and joins the texts.
/// Entries that cannot be read contribute nothing.
pub fn extract_zip_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let texts = zip_entries(bytes)?
        .iter()
        .map(|entry| DocumentExtractor.extract(entry))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>();

    Ok(texts.join("\n"))
}

/// Unpacks the qualifying entries of a ZIP archive into standalone documents.
pub fn zip_entries(bytes: &[u8]) -> Result<Vec<Document>, zip::result::ZipError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut documents = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        if entry.is_dir() || !is_resume_entry(&name) {
            continue;
        }

        let mut content = Vec::new();
        if let Err(error) = entry.read_to_end(&mut content) {
            warn!(entry = %name, %error, "skipping unreadable zip entry");
            continue;
        }
        documents.push(Document::new(name, content));
    }

    Ok(documents)
}

fn is_resume_entry(name: &str) -> bool {
    if name.starts_with("__MACOSX/") {
        return false;
    }
    matches!(
        DocumentFormat::from_filename(name),
        DocumentFormat::Pdf | DocumentFormat::Docx
    )
}
