//! Tag scanning: pull LaTeX regions out of the document text.
//!
//! The same literal tag both opens and closes a region. Each
//! `tag … tag` pair is cut out and replaced with one placeholder, so the
//! document text and the snippet list line up purely by order.
//!
//! Each placeholder's byte range in the rewritten text is recorded in
//! [`ScannedDocument::slots`]; reinsertion splices at those ranges, so a
//! placeholder string that was already in the input is left alone.
//!
//! An unpaired trailing tag is left in the text untouched together with
//! everything after it; it is reported through
//! [`ScannedDocument::unmatched_tag`] so callers can decide whether that is
//! an error.

use std::ops::Range;
use tracing::{debug, warn};

/// The document after scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDocument {
    /// Input text with every tag pair replaced by the placeholder.
    pub text: String,
    /// Region contents in first-to-last order. Index == ordinal.
    pub snippets: Vec<String>,
    /// Byte range of each inserted placeholder in `text`. Index == ordinal.
    pub slots: Vec<Range<usize>>,
    /// Byte offset (in the original input) of a trailing tag without a partner.
    pub unmatched_tag: Option<usize>,
}

impl ScannedDocument {
    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Whether any LaTeX region was found.
    pub fn has_snippets(&self) -> bool {
        !self.snippets.is_empty()
    }
}

/// Extract every `tag … tag` region from `content`.
///
/// Scanning resumes right after each inserted placeholder, so a
/// placeholder that happens to contain the tag is never rescanned.
pub fn scan(content: &str, tag: &str, placeholder: &str) -> ScannedDocument {
    let mut text = String::with_capacity(content.len());
    let mut snippets = Vec::new();
    let mut slots = Vec::new();
    let mut unmatched_tag = None;
    let mut cursor = 0;

    if !tag.is_empty() {
        while let Some(rel_open) = content[cursor..].find(tag) {
            let open = cursor + rel_open;
            let body_start = open + tag.len();

            let Some(rel_close) = content[body_start..].find(tag) else {
                warn!(
                    "Unpaired tag '{}' at byte {}; trailing text left as-is",
                    tag, open
                );
                unmatched_tag = Some(open);
                break;
            };
            let body_end = body_start + rel_close;

            text.push_str(&content[cursor..open]);
            let slot_start = text.len();
            text.push_str(placeholder);
            slots.push(slot_start..text.len());
            snippets.push(content[body_start..body_end].to_string());
            cursor = body_end + tag.len();
        }
    }

    text.push_str(&content[cursor..]);
    debug!("Scanned {} LaTeX snippet(s)", snippets.len());

    ScannedDocument {
        text,
        snippets,
        slots,
        unmatched_tag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TAG: &str = "[LATEX]";
    const PH: &str = "[LATEX_SNIP]";

    #[test]
    fn no_tags_is_a_no_op() {
        let doc = scan("# Title\n\nplain text\n", TAG, PH);
        assert_eq!(doc.text, "# Title\n\nplain text\n");
        assert!(doc.snippets.is_empty());
        assert!(!doc.has_snippets());
        assert_eq!(doc.unmatched_tag, None);
    }

    #[test]
    fn extracts_pairs_in_order() {
        let input = "a [LATEX]x^2[LATEX] b [LATEX]\\frac{1}{2}[LATEX] c";
        let doc = scan(input, TAG, PH);
        assert_eq!(doc.snippets, vec!["x^2", "\\frac{1}{2}"]);
        assert_eq!(doc.text, "a [LATEX_SNIP] b [LATEX_SNIP] c");
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn even_tag_count_gives_half_as_many_placeholders() {
        let input = "[LATEX]1[LATEX][LATEX]2[LATEX]\n[LATEX]3[LATEX]";
        let doc = scan(input, TAG, PH);
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.text.matches(PH).count(), 3);
        assert_eq!(doc.text.matches(TAG).count(), 0);
    }

    #[test]
    fn empty_region_is_an_empty_snippet() {
        let doc = scan("before[LATEX][LATEX]after", TAG, PH);
        assert_eq!(doc.snippets, vec![String::new()]);
        assert_eq!(doc.text, "before[LATEX_SNIP]after");
    }

    #[test]
    fn unpaired_trailing_tag_is_left_in_place() {
        let input = "a [LATEX]x[LATEX] b [LATEX] dangling y";
        let doc = scan(input, TAG, PH);
        assert_eq!(doc.snippets, vec!["x"]);
        assert_eq!(doc.text, "a [LATEX_SNIP] b [LATEX] dangling y");
        assert_eq!(doc.unmatched_tag, Some(input.rfind(TAG).unwrap()));
    }

    #[test]
    fn single_tag_extracts_nothing() {
        let doc = scan("only [LATEX] one", TAG, PH);
        assert!(doc.is_empty());
        assert_eq!(doc.text, "only [LATEX] one");
        assert_eq!(doc.unmatched_tag, Some(5));
    }

    #[test]
    fn multiline_snippet_is_captured_verbatim() {
        let input = "[LATEX]\n\\begin{align}\na &= b\n\\end{align}\n[LATEX]";
        let doc = scan(input, TAG, PH);
        assert_eq!(doc.snippets[0], "\n\\begin{align}\na &= b\n\\end{align}\n");
    }

    #[test]
    fn placeholder_containing_tag_is_not_rescanned() {
        let doc = scan("LATEX a LATEX and LATEX b LATEX", "LATEX", PH);
        assert_eq!(doc.snippets, vec![" a ", " b "]);
        assert_eq!(doc.text, "[LATEX_SNIP] and [LATEX_SNIP]");
    }

    #[test]
    fn prefix_sharing_tags_are_not_special_cased() {
        // A longer tag like `[LATEX]X` still matches as the plain tag.
        let doc = scan("[LATEX]X a [LATEX]", TAG, PH);
        assert_eq!(doc.snippets, vec!["X a "]);
    }

    #[test]
    fn unicode_text_around_tags() {
        let doc = scan("π ≈ [LATEX]\\pi[LATEX] ✓", TAG, PH);
        assert_eq!(doc.text, "π ≈ [LATEX_SNIP] ✓");
        assert_eq!(doc.snippets, vec!["\\pi"]);
    }

    #[test]
    fn slots_point_at_inserted_placeholders_only() {
        let input = "lit [LATEX_SNIP] then [LATEX]good[LATEX] end";
        let doc = scan(input, TAG, PH);
        assert_eq!(doc.text, "lit [LATEX_SNIP] then [LATEX_SNIP] end");
        assert_eq!(doc.slots, vec![22..34]);
        assert_eq!(&doc.text[doc.slots[0].clone()], PH);
    }

    #[test]
    fn slots_track_multibyte_text() {
        let doc = scan("π [LATEX]a[LATEX] ✓ [LATEX]b[LATEX]", TAG, PH);
        assert_eq!(doc.slots.len(), 2);
        for slot in &doc.slots {
            assert_eq!(&doc.text[slot.clone()], PH);
        }
    }
}
