//! Error taxonomy for document loading, caching and background rendering

/// Why a document could not be opened or a page could not be rasterized
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DocumentErrorCode {
    /// Parsed, but has no pages
    #[error("invalid document")]
    InvalidDocument,
    #[error("bad catalog")]
    BadCatalog,
    #[error("damaged content")]
    DamagedContent,
    #[error("permission denied")]
    PermissionDenied,
    #[error("i/o error")]
    Io,
    #[error("render error")]
    Render,
}

/// Open/parse failure reported to the user; the previous session stays intact
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct DocumentError {
    pub code: DocumentErrorCode,
    pub message: String,
}

impl DocumentError {
    pub fn new(code: DocumentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(DocumentErrorCode::InvalidDocument, message)
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::new(DocumentErrorCode::Render, message)
    }
}

/// Errors surfaced by the viewer core
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Decompressed data disagrees with what the rasterizer recorded
    #[error("cache corruption on page {page}: {detail}")]
    CacheCorruption { page: usize, detail: String },

    #[error("could not allocate {requested} bytes for {purpose}")]
    ResourceExhaustion {
        requested: usize,
        purpose: &'static str,
    },

    #[error("compression failed for page {page}: {source}")]
    Compression {
        page: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("background rasterizer: {0}")]
    Worker(String),
}

impl ViewerError {
    /// Fatal errors mean the store and cache can no longer be trusted
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Document(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_errors_are_recoverable() {
        let err: ViewerError = DocumentError::invalid("no pages").into();
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "invalid document: no pages");
    }

    #[test]
    fn error_codes_render_readable_names() {
        let err = DocumentError::new(DocumentErrorCode::PermissionDenied, "needs a password");
        assert_eq!(err.to_string(), "permission denied: needs a password");
        assert_eq!(DocumentErrorCode::Io.to_string(), "i/o error");
    }

    #[test]
    fn corruption_is_fatal() {
        let err = ViewerError::CacheCorruption {
            page: 3,
            detail: "short read".into(),
        };
        assert!(err.is_fatal());
    }
}
