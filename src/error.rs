//! Error types for the md-tex2img library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`TexImgError`] — **Fatal**: the conversion cannot proceed at all
//!   (input missing, working folder unwritable, pdfium not loadable).
//!   Returned as `Err(TexImgError)` from the top-level `convert*` functions.
//!
//! * [`SnippetError`] — **Non-fatal**: a single snippet failed to compile or
//!   rasterise. Stored inside [`crate::output::SnippetStatus::Failed`]; the
//!   snippet's raw LaTeX is put back into the document instead of an image,
//!   so the output stays readable.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the md-tex2img library.
#[derive(Debug, Error)]
pub enum TexImgError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Markdown file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be read as UTF-8 text.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A LaTeX tag was opened but never closed, and strict tag checking is on.
    #[error("Unpaired LaTeX tag '{tag}' at byte {offset}\nClose the region or drop --strict-tags.")]
    UnmatchedTag { tag: String, offset: usize },

    // ── Working folder errors ─────────────────────────────────────────────
    /// The working folder could not be created or is not a directory.
    #[error("Working folder '{path}' is unavailable: {source}")]
    WorkDirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A generated `.tex` source could not be written.
    #[error("Failed to write snippet source '{path}': {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An intermediate artefact could not be removed during cleanup.
    #[error("Failed to remove '{path}' from the working folder: {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Some snippets were rendered but at least one failed.
    ///
    /// Returned by [`crate::output::ConversionOutput::into_result`] when
    /// the caller wants to treat any snippet failure as an error.
    #[error("{failed}/{total} LaTeX snippets failed to render")]
    PartialFailure {
        rendered: usize,
        failed: usize,
        total: usize,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// A compiled snippet PDF could not be opened.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium-render returned an error for the first page of a PDF.
    #[error("Rasterisation failed for '{path}': {detail}")]
    RasterisationFailed { path: PathBuf, detail: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
The rasteriser needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),
}

/// A non-fatal error for a single snippet.
///
/// The conversion carries on with the remaining snippets; this one falls
/// back to its raw LaTeX text during reinsertion.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum SnippetError {
    /// The generated `.tex` file disappeared before compilation.
    #[error("Snippet {ordinal}: source file not found: {path:?}")]
    SourceMissing { ordinal: usize, path: PathBuf },

    /// The compiler input does not have a `.tex` extension.
    #[error("Snippet {ordinal}: wrong file format for compiler input {path:?}")]
    WrongExtension { ordinal: usize, path: PathBuf },

    /// A PDF from an earlier run is in the way and could not be removed.
    #[error("Snippet {ordinal}: could not remove stale output {path:?}: {detail}")]
    StaleArtifact {
        ordinal: usize,
        path: PathBuf,
        detail: String,
    },

    /// The compiler executable could not be started at all.
    #[error("Snippet {ordinal}: could not run '{program}': {detail}")]
    CompilerUnavailable {
        ordinal: usize,
        program: String,
        detail: String,
    },

    /// No PDF was produced after every allowed attempt.
    #[error("Snippet {ordinal}: compilation produced no PDF after {attempts} attempt(s): {detail}")]
    CompileFailed {
        ordinal: usize,
        attempts: u32,
        detail: String,
    },

    /// The PDF could not be opened or its first page rendered.
    #[error("Snippet {ordinal}: rasterisation failed: {detail}")]
    RasterisationFailed { ordinal: usize, detail: String },

    /// The cropped PNG could not be written.
    #[error("Snippet {ordinal}: failed to save image {path:?}: {detail}")]
    ImageWriteFailed {
        ordinal: usize,
        path: PathBuf,
        detail: String,
    },
}

impl SnippetError {
    /// Ordinal of the snippet this error belongs to.
    pub fn ordinal(&self) -> usize {
        match self {
            SnippetError::SourceMissing { ordinal, .. }
            | SnippetError::WrongExtension { ordinal, .. }
            | SnippetError::StaleArtifact { ordinal, .. }
            | SnippetError::CompilerUnavailable { ordinal, .. }
            | SnippetError::CompileFailed { ordinal, .. }
            | SnippetError::RasterisationFailed { ordinal, .. }
            | SnippetError::ImageWriteFailed { ordinal, .. } => *ordinal,
        }
    }
}
