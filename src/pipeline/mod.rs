//! Pipeline stages for Markdown LaTeX-snippet rendering.
//!
//! Each submodule implements exactly one transformation step. Stages after
//! scanning take a `Vec<SnippetRecord>` and return a new one, so a record's
//! status only ever moves forward.
//!
//! ## Data Flow
//!
//! ```text
//! scan ──▶ materialize ──▶ compile ──▶ render ──▶ reinsert ──▶ persist
//! (tags)   (.tex files)    (pdflatex)  (pdfium    (links or   (write +
//!                                       + crop)    raw text)   cleanup)
//! ```
//!
//! 1. [`scan`]        — cut tagged snippets out, leaving placeholders
//! 2. [`materialize`] — wrap each snippet in a standalone document on disk
//! 3. [`compile`]     — run the TeX engine with a bounded retry policy
//! 4. [`render`]      — rasterise page 1 and trim it with [`crop`]
//! 5. [`reinsert`]    — put an image link (or the raw snippet) back in place
//! 6. [`persist`]     — atomic output write and working-folder cleanup

pub mod compile;
pub mod crop;
pub mod materialize;
pub mod persist;
pub mod reinsert;
pub mod render;
pub mod scan;
