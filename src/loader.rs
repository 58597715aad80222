//! Reads every PDF in a directory into [`Document`]s.

use std::any::Any;
use std::fs;
use std::panic;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::{RagError, RagResult};

pub trait DocumentLoader: Send + Sync {
    fn load(&self, dir: &Path) -> RagResult<Vec<Document>>;
}

/// Loads `*.pdf` files (non-recursive, case-insensitive extension), one
/// document per file, in file-name order.
#[derive(Debug, Default, Clone)]
pub struct PdfDirectoryLoader;

impl DocumentLoader for PdfDirectoryLoader {
    fn load(&self, dir: &Path) -> RagResult<Vec<Document>> {
        let paths = pdf_paths(dir)?;

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = extract_pdf_text(&path)?;
            debug!(path = %path.display(), chars = text.chars().count(), "extracted pdf text");
            documents.push(Document::new(path, text));
        }

        if documents.is_empty() {
            warn!(dir = %dir.display(), "no PDF files found in the directory");
        } else {
            info!(
                dir = %dir.display(),
                count = documents.len(),
                "successfully loaded document(s)"
            );
        }
        Ok(documents)
    }
}

/// Lists the PDF files directly inside `dir`, sorted for determinism.
pub fn pdf_paths(dir: &Path) -> RagResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| RagError::io(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| RagError::io(dir, e))?.path();
        if path.is_file() && is_pdf(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// pdf-extract panics on some malformed files (missing `/MediaBox`,
/// fonts absent from `/Resources`); those panics become [`RagError::Pdf`].
fn extract_pdf_text(path: &Path) -> RagResult<String> {
    let bytes = fs::read(path).map_err(|e| RagError::io(path, e))?;
    let pdf_error = |message: String| {
        warn!(path = %path.display(), %message, "failed to extract pdf text");
        RagError::Pdf {
            path: path.to_path_buf(),
            message,
        }
    };

    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(pdf_error(e.to_string())),
        Err(payload) => Err(pdf_error(format!(
            "malformed document: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("extractor panicked")
}
