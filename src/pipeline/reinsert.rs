//! Reinsertion: swap placeholders back out for images or raw LaTeX.
//!
//! Placeholders are identical to one another, so position is the only link
//! between a placeholder and its snippet. The scanner records the byte range
//! of every placeholder it inserted; record `n` is spliced into slot `n`.
//! Text between slots is copied untouched, including any placeholder-like
//! string that was already in the input.

use crate::output::{SnippetRecord, SnippetStatus};
use std::ops::Range;
use std::path::Path;
use tracing::{debug, warn};

/// Markdown image link with the ordinal as alt text.
pub fn image_link(ordinal: usize, image_path: &Path) -> String {
    let target = image_path.to_string_lossy().replace('\\', "/");
    format!("![{ordinal}]({target})")
}

/// Text that takes a record's placeholder.
fn replacement(record: &SnippetRecord) -> String {
    match &record.status {
        SnippetStatus::Rasterized { image_path } => image_link(record.ordinal, image_path),
        _ => record.source.clone(),
    }
}

/// Splice each record into its slot, left to right.
///
/// `slots` are the placeholder ranges recorded by the scanner, in ordinal
/// order. Records without a usable slot are not reinserted.
pub fn reinsert(text: &str, slots: &[Range<usize>], records: &[SnippetRecord]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for record in records {
        let slot = slots
            .get(record.ordinal)
            .filter(|slot| slot.start >= cursor && text.get((*slot).clone()).is_some());
        let Some(slot) = slot else {
            warn!(
                "No placeholder slot for snippet {}; {} snippet(s) not reinserted",
                record.ordinal,
                records.len().saturating_sub(record.ordinal)
            );
            break;
        };
        let value = replacement(record);
        debug!("Snippet {} → {}", record.ordinal, value);

        out.push_str(&text[cursor..slot.start]);
        out.push_str(&value);
        cursor = slot.end;
    }

    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnippetError;
    use crate::pipeline::scan::scan;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    const PH: &str = "[LATEX_SNIP]";

    fn rendered(ordinal: usize, source: &str) -> SnippetRecord {
        SnippetRecord {
            ordinal,
            source: source.into(),
            tex_path: PathBuf::from(format!("fig/tex_snip_{ordinal}.tex")),
            status: SnippetStatus::Rasterized {
                image_path: PathBuf::from(format!("fig/tex_snip_{ordinal}.png")),
            },
        }
    }

    fn failed(ordinal: usize, source: &str) -> SnippetRecord {
        SnippetRecord {
            ordinal,
            source: source.into(),
            tex_path: PathBuf::from(format!("fig/tex_snip_{ordinal}.tex")),
            status: SnippetStatus::Failed {
                error: SnippetError::CompileFailed {
                    ordinal,
                    attempts: 2,
                    detail: "exit status 1".into(),
                },
            },
        }
    }

    /// Ranges of every `PH` in `text`.
    fn slots_of(text: &str) -> Vec<Range<usize>> {
        text.match_indices(PH)
            .map(|(at, m)| at..at + m.len())
            .collect()
    }

    #[test]
    fn all_rendered() {
        let text = "A [LATEX_SNIP] B [LATEX_SNIP] C";
        let out = reinsert(text, &slots_of(text), &[rendered(0, "x"), rendered(1, "y")]);
        assert_eq!(out, "A ![0](fig/tex_snip_0.png) B ![1](fig/tex_snip_1.png) C");
    }

    #[test]
    fn failed_snippet_falls_back_to_raw_text_in_place() {
        let text = "[LATEX_SNIP]\n[LATEX_SNIP]\n[LATEX_SNIP]\n";
        let records = [rendered(0, "a"), rendered(1, "b"), failed(2, "\\bad{")];
        let out = reinsert(text, &slots_of(text), &records);
        assert_eq!(
            out,
            "![0](fig/tex_snip_0.png)\n![1](fig/tex_snip_1.png)\n\\bad{\n"
        );
    }

    #[test]
    fn raw_text_containing_placeholder_is_not_reconsumed() {
        let text = "[LATEX_SNIP] then [LATEX_SNIP]";
        let records = [failed(0, "odd [LATEX_SNIP] body"), rendered(1, "y")];
        let out = reinsert(text, &slots_of(text), &records);
        assert_eq!(out, "odd [LATEX_SNIP] body then ![1](fig/tex_snip_1.png)");
    }

    #[test]
    fn literal_placeholder_in_document_is_kept() {
        let doc = scan("lit [LATEX_SNIP] then [LATEX]good[LATEX] end", "[LATEX]", PH);
        let out = reinsert(&doc.text, &doc.slots, &[rendered(0, "good")]);
        assert_eq!(out, "lit [LATEX_SNIP] then ![0](fig/tex_snip_0.png) end");
    }

    #[test]
    fn missing_slot_stops_reinsertion() {
        let text = "A [LATEX_SNIP] B";
        let out = reinsert(text, &slots_of(text), &[rendered(0, "x"), rendered(1, "y")]);
        assert_eq!(out, "A ![0](fig/tex_snip_0.png) B");
    }

    #[test]
    fn no_records_leaves_text_alone() {
        assert_eq!(reinsert("plain", &[], &[]), "plain");
    }

    #[test]
    fn windows_separators_become_slashes() {
        assert_eq!(
            image_link(3, Path::new("fig\\tex_snip_3.png")),
            "![3](fig/tex_snip_3.png)"
        );
    }
}
