//! # md-tex2img
//!
//! Render LaTeX snippets embedded in Markdown into cropped PNG images.
//!
//! Markdown renderers that don't understand LaTeX show it as raw source.
//! This crate finds every region wrapped in a pair of tags (`[LATEX]` by
//! default), compiles each one as a standalone document, rasterises the
//! first page, trims it to the ink plus a margin, and swaps the region for
//! an image link. Snippets that fail anywhere along the way stay in the
//! document as the raw text they came in as.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Scan         cut tag pairs out, leave placeholders
//!  ├─ 2. Materialize  fig/tex_snip_<n>.tex per snippet
//!  ├─ 3. Compile      pdflatex, bounded retries and timeout
//!  ├─ 4. Render       pdfium page 1 → crop to content + margin → PNG
//!  ├─ 5. Reinsert     ![n](fig/tex_snip_<n>.png) or raw LaTeX
//!  └─ 6. Persist      <stem>_medium.md, sweep non-images from fig/
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md_tex2img::{convert_to_file, ConversionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert_to_file("notes.md", "notes_medium.md", &config)?;
//!     eprintln!(
//!         "{}/{} snippets rendered",
//!         output.stats.rendered_snippets, output.stats.total_snippets
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mdtex2img` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! md-tex2img = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! A TeX engine on `PATH` (`pdflatex` unless configured otherwise) and a
//! pdfium shared library (see [`pipeline::render`]). Both can be swapped
//! out through [`TexCompiler`] and [`PageRasterizer`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_to_file, inspect};
pub use error::{SnippetError, TexImgError};
pub use output::{ConversionOutput, ConversionStats, ScanReport, SnippetRecord, SnippetStatus};
pub use pipeline::compile::{
    AttemptReport, CompileJob, OutputMode, PdfLatex, RetryPolicy, TexCompiler,
};
pub use pipeline::persist::output_path_for;
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
