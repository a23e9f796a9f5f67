//! Text-layer extraction with pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks while parsing. Each document is read on the blocking
//! pool so the Tokio workers driving inference calls never stall.

use crate::extract::source::resolve_source;
use crate::extract::{DocumentMetadata, ExtractError, ExtractionOutput, PageExtractor, RawPage};
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// [`PageExtractor`] reading the PDF text layer via pdfium.
///
/// Accepts local paths and `http(s)` URLs. Binds to the pdfium library named
/// by `PDFIUM_LIB_PATH`, then one next to the executable's working directory,
/// then the system library.
#[derive(Debug, Clone)]
pub struct PdfiumExtractor {
    password: Option<String>,
    download_timeout_secs: u64,
}

impl Default for PdfiumExtractor {
    fn default() -> Self {
        Self {
            password: None,
            download_timeout_secs: 120,
        }
    }
}

impl PdfiumExtractor {
    pub fn new(password: Option<String>, download_timeout_secs: u64) -> Self {
        Self {
            password,
            download_timeout_secs,
        }
    }

    /// Extract every page of `input`, propagating failures as [`ExtractError`].
    pub async fn extract_pages(
        &self,
        input: &str,
    ) -> Result<(Vec<RawPage>, DocumentMetadata), ExtractError> {
        let source = resolve_source(input, self.download_timeout_secs).await?;
        let path = source.path().to_path_buf();
        let password = self.password.clone();

        let result = tokio::task::spawn_blocking(move || {
            extract_blocking(&path, password.as_deref())
        })
        .await
        .map_err(|e| ExtractError::Internal(format!("Extraction task panicked: {e}")))?;

        // `source` must outlive the blocking read: it owns the temp file.
        drop(source);
        result
    }
}

#[async_trait]
impl PageExtractor for PdfiumExtractor {
    async fn extract(&self, path: &str) -> ExtractionOutput {
        match self.extract_pages(path).await {
            Ok((pages, metadata)) => ExtractionOutput {
                pages,
                metadata,
                error: None,
            },
            Err(e) => {
                warn!("Extraction failed for '{}': {}", path, e);
                ExtractionOutput::failed(e.to_string())
            }
        }
    }
}

fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}

fn extract_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<(Vec<RawPage>, DocumentMetadata), ExtractError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| load_error(pdf_path, password, e))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages from {}", pages.len(), pdf_path.display());

    let mut out = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let page_number = idx as u32 + 1;
        let text = page.text().map_err(|e| ExtractError::PageTextFailed {
            page: page_number,
            detail: e.to_string(),
        })?;
        let content = text.all();
        debug!("Page {} → {} chars", page_number, content.len());
        out.push(RawPage::new(page_number, content));
    }

    let metadata = read_metadata(&document, out.len());
    Ok((out, metadata))
}

fn load_error(pdf_path: &Path, password: Option<&str>, e: PdfiumError) -> ExtractError {
    let detail = format!("{e:?}");
    let path: PathBuf = pdf_path.to_path_buf();
    if detail.contains("Password") || detail.contains("password") {
        if password.is_some() {
            ExtractError::WrongPassword { path }
        } else {
            ExtractError::PasswordRequired { path }
        }
    } else {
        ExtractError::CorruptPdf { path, detail }
    }
}

fn read_metadata(document: &PdfDocument<'_>, page_count: usize) -> DocumentMetadata {
    let metadata = document.metadata();
    let get = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    DocumentMetadata {
        title: get(PdfDocumentMetadataTagType::Title),
        author: get(PdfDocumentMetadataTagType::Author),
        subject: get(PdfDocumentMetadataTagType::Subject),
        creator: get(PdfDocumentMetadataTagType::Creator),
        producer: get(PdfDocumentMetadataTagType::Producer),
        creation_date: get(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get(PdfDocumentMetadataTagType::ModificationDate),
        page_count,
        pdf_version: format!("{:?}", document.version()),
    }
}
