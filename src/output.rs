//! Per-snippet records and the final conversion result.
//!
//! A single ordered `Vec<SnippetRecord>` travels through the pipeline. Each
//! stage maps it in place order and sets [`SnippetStatus`] exactly once for
//! the records it touches, so the ordinal is the only correlation key the
//! pipeline ever needs.

use crate::error::{SnippetError, TexImgError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a snippet currently stands in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SnippetStatus {
    /// Source written, not yet compiled.
    Pending,
    /// The compiler produced a PDF.
    Compiled { pdf_path: PathBuf },
    /// The first page was rasterised, cropped and saved.
    Rasterized { image_path: PathBuf },
    /// A stage gave up on this snippet; it is reinserted as raw text.
    Failed { error: SnippetError },
}

/// One extracted LaTeX region and its artefacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetRecord {
    /// Zero-based position in first-to-last extraction order.
    pub ordinal: usize,
    /// Raw text between the two tags, exactly as it appeared in the input.
    pub source: String,
    /// Generated LaTeX document for this snippet.
    pub tex_path: PathBuf,
    pub status: SnippetStatus,
}

impl SnippetRecord {
    /// Return this record with a new status. Every stage transition goes
    /// through here.
    pub fn with_status(self, status: SnippetStatus) -> Self {
        Self { status, ..self }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SnippetStatus::Failed { .. })
    }

    /// Final image, if the snippet made it all the way through.
    pub fn image_path(&self) -> Option<&PathBuf> {
        match &self.status {
            SnippetStatus::Rasterized { image_path } => Some(image_path),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SnippetError> {
        match &self.status {
            SnippetStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Aggregate numbers for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_snippets: usize,
    pub rendered_snippets: usize,
    pub failed_snippets: usize,
    /// Intermediate files swept from the working folder.
    pub removed_artifacts: usize,
    pub total_duration_ms: u64,
    pub compile_duration_ms: u64,
    pub render_duration_ms: u64,
}

/// Result of a full conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The rewritten Markdown document.
    pub markdown: String,
    /// Every snippet in ordinal order with its final status.
    pub snippets: Vec<SnippetRecord>,
    /// Where the document was written, when it was written.
    pub output_path: Option<PathBuf>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Turn any snippet failure into an error.
    pub fn into_result(self) -> Result<Self, TexImgError> {
        if self.stats.failed_snippets > 0 {
            Err(TexImgError::PartialFailure {
                rendered: self.stats.rendered_snippets,
                failed: self.stats.failed_snippets,
                total: self.stats.total_snippets,
            })
        } else {
            Ok(self)
        }
    }

    /// Errors of every failed snippet, in ordinal order.
    pub fn failures(&self) -> impl Iterator<Item = &SnippetError> {
        self.snippets.iter().filter_map(SnippetRecord::error)
    }
}

/// What a scan-only pass found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub input: PathBuf,
    pub tag: String,
    /// Extracted regions in ordinal order.
    pub snippets: Vec<String>,
    /// Byte offset of an unpaired trailing tag, if any.
    pub unmatched_tag: Option<usize>,
}
