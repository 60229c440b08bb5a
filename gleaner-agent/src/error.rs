use gleaner_common::GleanerError;

/// Why a page could not be turned into items.
#[derive(thiserror::Error, Debug)]
pub enum ExtractionError {
    /// The model could not be reached or refused the request.
    #[error("model call failed: {0}")]
    Oracle(#[from] GleanerError),

    /// The reply held no usable `{"items": [...]}` document.
    #[error("malformed extraction response: {0}")]
    Malformed(String),
}
