//! Plain text from PDF question papers.

use std::fs;
use std::panic;
use std::path::Path;

use tracing::debug;

use crate::error::LoadError;
use crate::extract::extract_questions;
use crate::models::Question;

/// Read a PDF and return its text.
///
/// `pdf-extract` panics on some malformed documents; that is reported as
/// [`LoadError::Pdf`] like any other extraction failure.
pub fn extract_pdf_text<P: AsRef<Path>>(path: P) -> Result<String, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let extracted = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes));
    let text = match extracted {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            return Err(LoadError::Pdf {
                path: path.display().to_string(),
                reason: e.to_string(),
            });
        }
        Err(_) => {
            return Err(LoadError::Pdf {
                path: path.display().to_string(),
                reason: "extractor panicked".to_string(),
            });
        }
    };

    debug!(path = %path.display(), chars = text.len(), "extracted paper text");
    Ok(text)
}

/// Extract exactly `count` questions from the paper at `path`.
pub fn questions_from_paper<P: AsRef<Path>>(path: P, count: usize) -> Result<Vec<Question>, LoadError> {
    let text = extract_pdf_text(path)?;
    Ok(extract_questions(&text, count))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_missing_paper() {
        let dir = tempfile::tempdir().unwrap();
        let result = extract_pdf_text(dir.path().join("paper.pdf"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_not_a_pdf() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Q1. What is 2+2?\nA) 3\n").unwrap();
        let result = questions_from_paper(file.path(), 2);
        assert!(matches!(result, Err(LoadError::Pdf { .. })));
    }
}
