//! Progress-callback trait for per-snippet conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline compiles and rasterises each snippet.
//!
//! # Example
//!
//! ```rust
//! use md_tex2img::{ConversionProgressCallback, ConversionConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_snippet_complete(&self, ordinal: usize, total: usize, image: &Path) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Snippet {}/{} → {}", ordinal + 1, total, image.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { rendered: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the conversion pipeline as it processes each snippet.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Ordinals are 0-based, matching the artifact names.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after scanning, before anything is compiled.
    fn on_conversion_start(&self, total_snippets: usize) {
        let _ = total_snippets;
    }

    /// Called just before a snippet is handed to the TeX engine.
    fn on_snippet_start(&self, ordinal: usize, total_snippets: usize) {
        let _ = (ordinal, total_snippets);
    }

    /// Called when a snippet's cropped PNG has been written.
    fn on_snippet_complete(&self, ordinal: usize, total_snippets: usize, image_path: &Path) {
        let _ = (ordinal, total_snippets, image_path);
    }

    /// Called when a snippet fails at any stage.
    ///
    /// # Arguments
    /// * `error` — human-readable error description
    fn on_snippet_error(&self, ordinal: usize, total_snippets: usize, error: &str) {
        let _ = (ordinal, total_snippets, error);
    }

    /// Called once after every snippet has been attempted.
    fn on_conversion_complete(&self, total_snippets: usize, rendered: usize) {
        let _ = (total_snippets, rendered);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
