//! Snippet materialisation: wrap each region in a LaTeX document and write it.
//!
//! Snippet text is not escaped or validated. Broken LaTeX is written as-is
//! and fails in the compile stage, which is where failures are meant to
//! surface.

use crate::error::TexImgError;
use crate::output::{SnippetRecord, SnippetStatus};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File stem shared by every artefact of snippet `ordinal`.
pub fn artifact_stem(ordinal: usize) -> String {
    format!("tex_snip_{ordinal}")
}

/// Path of the generated LaTeX source for snippet `ordinal`.
pub fn tex_path_for(work_dir: &Path, ordinal: usize) -> PathBuf {
    work_dir.join(format!("{}.tex", artifact_stem(ordinal)))
}

/// Minimal standalone document around a snippet body.
#[derive(Debug, Clone, Default)]
pub struct DocumentTemplate {
    extra_packages: Vec<String>,
}

impl DocumentTemplate {
    pub fn new(extra_packages: &[String]) -> Self {
        Self {
            extra_packages: extra_packages.to_vec(),
        }
    }

    /// Render the full document for one snippet.
    pub fn render(&self, snippet: &str) -> String {
        let mut doc = String::from("\\documentclass{article}\n\\usepackage{amsmath}\n");
        for pkg in &self.extra_packages {
            doc.push_str(&format!("\\usepackage{{{pkg}}}\n"));
        }
        doc.push_str("\\pagestyle{empty}\n\\begin{document}\n");
        doc.push_str(&normalise_snippet(snippet));
        doc.push_str("\n\\end{document}");
        doc
    }
}

/// Unify line endings and strip the blank lines and spaces that surround a
/// region when its tags sit on their own lines.
pub fn normalise_snippet(snippet: &str) -> String {
    snippet
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim_matches('\n')
        .trim()
        .to_string()
}

/// Write one `.tex` file per snippet and return the pending records.
pub fn materialize(
    snippets: &[String],
    work_dir: &Path,
    template: &DocumentTemplate,
) -> Result<Vec<SnippetRecord>, TexImgError> {
    snippets
        .iter()
        .enumerate()
        .map(|(ordinal, source)| {
            let tex_path = tex_path_for(work_dir, ordinal);
            std::fs::write(&tex_path, template.render(source)).map_err(|e| {
                TexImgError::ArtifactWriteFailed {
                    path: tex_path.clone(),
                    source: e,
                }
            })?;
            debug!("Wrote {}", tex_path.display());

            Ok(SnippetRecord {
                ordinal,
                source: source.clone(),
                tex_path,
                status: SnippetStatus::Pending,
            })
        })
        .collect()
}
