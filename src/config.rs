//! Configuration types for LaTeX snippet rendering.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The compiler and rasteriser are
//! injectable trait objects so tests (and callers with unusual toolchains)
//! can replace the external collaborators without touching the pipeline.

use crate::error::TexImgError;
use crate::pipeline::compile::{RetryPolicy, TexCompiler};
use crate::pipeline::render::PageRasterizer;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Tag that opens and closes a LaTeX region.
pub const DEFAULT_TAG: &str = "[LATEX]";

/// Literal substituted for each extracted region until reinsertion.
pub const DEFAULT_PLACEHOLDER: &str = "[LATEX_SNIP]";

/// Folder holding generated sources, PDFs and final images.
pub const DEFAULT_WORK_DIR: &str = "fig";

/// Appended to the input file stem to name the output document.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_medium";

/// Configuration for a Markdown LaTeX-to-image conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use md_tex2img::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .tag("$$")
///     .work_dir("images")
///     .dpi(200)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Literal marking both the start and the end of a LaTeX region. Default: `[LATEX]`.
    pub tag: String,

    /// Literal substituted for each region between scanning and reinsertion.
    /// Default: `[LATEX_SNIP]`.
    pub placeholder: String,

    /// Working folder for `.tex`, `.pdf` and `.png` artefacts. Default: `fig`.
    ///
    /// Created on demand. Image links in the output document point into it.
    pub work_dir: PathBuf,

    /// Rasterisation DPI for the first PDF page. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Pixels of padding kept around the content bounding box. Default: 50.
    pub crop_margin: u32,

    /// Bias subtracted from the doubled background difference before the
    /// bounding box is taken. Suppresses anti-aliasing noise. Default: 50.
    pub noise_bias: u8,

    /// LaTeX compiler executable. Default: `pdflatex`.
    pub compiler_program: String,

    /// Compiler attempts per snippet. The first runs with captured output,
    /// the rest stream output for diagnostics. Default: 2.
    pub max_attempts: u32,

    /// Wall-clock limit for a single compiler attempt, in seconds. Default: 60.
    pub compile_timeout_secs: u64,

    /// Suffix appended to the input stem for the output file. Default: `_medium`.
    pub output_suffix: String,

    /// Extra `\usepackage{…}` lines added to every snippet document.
    pub extra_packages: Vec<String>,

    /// Leave `.tex`, `.pdf`, `.log` and `.aux` files in the working folder. Default: false.
    pub keep_intermediates: bool,

    /// Treat an unpaired trailing tag as a fatal error instead of leaving it
    /// in place. Default: false.
    pub strict_tags: bool,

    /// Explicit pdfium library file or directory. Falls back to
    /// `PDFIUM_LIB_PATH`, then the current directory, then the system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// Pre-constructed compiler. Takes precedence over `compiler_program`.
    pub compiler: Option<Arc<dyn TexCompiler>>,

    /// Pre-constructed rasteriser. Takes precedence over the pdfium default.
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Per-snippet progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            dpi: 300,
            crop_margin: 50,
            noise_bias: 50,
            compiler_program: "pdflatex".to_string(),
            max_attempts: 2,
            compile_timeout_secs: 60,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            extra_packages: Vec::new(),
            keep_intermediates: false,
            strict_tags: false,
            pdfium_library_path: None,
            compiler: None,
            rasterizer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("tag", &self.tag)
            .field("placeholder", &self.placeholder)
            .field("work_dir", &self.work_dir)
            .field("dpi", &self.dpi)
            .field("crop_margin", &self.crop_margin)
            .field("noise_bias", &self.noise_bias)
            .field("compiler_program", &self.compiler_program)
            .field("max_attempts", &self.max_attempts)
            .field("compile_timeout_secs", &self.compile_timeout_secs)
            .field("output_suffix", &self.output_suffix)
            .field("extra_packages", &self.extra_packages)
            .field("keep_intermediates", &self.keep_intermediates)
            .field("strict_tags", &self.strict_tags)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("compiler", &self.compiler.as_ref().map(|_| "<dyn TexCompiler>"))
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn PageRasterizer>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Retry policy derived from `max_attempts`.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
    }

    /// Per-attempt compiler deadline.
    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.config.tag = tag.into();
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.config.placeholder = placeholder.into();
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn crop_margin(mut self, px: u32) -> Self {
        self.config.crop_margin = px;
        self
    }

    pub fn noise_bias(mut self, bias: u8) -> Self {
        self.config.noise_bias = bias;
        self
    }

    pub fn compiler_program(mut self, program: impl Into<String>) -> Self {
        self.config.compiler_program = program.into();
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn compile_timeout_secs(mut self, secs: u64) -> Self {
        self.config.compile_timeout_secs = secs.max(1);
        self
    }

    pub fn output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.output_suffix = suffix.into();
        self
    }

    pub fn extra_package(mut self, package: impl Into<String>) -> Self {
        self.config.extra_packages.push(package.into());
        self
    }

    pub fn extra_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .extra_packages
            .extend(packages.into_iter().map(Into::into));
        self
    }

    pub fn keep_intermediates(mut self, v: bool) -> Self {
        self.config.keep_intermediates = v;
        self
    }

    pub fn strict_tags(mut self, v: bool) -> Self {
        self.config.strict_tags = v;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn compiler(mut self, compiler: Arc<dyn TexCompiler>) -> Self {
        self.config.compiler = Some(compiler);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, TexImgError> {
        let c = &self.config;
        if c.tag.is_empty() {
            return Err(TexImgError::InvalidConfig("Tag must not be empty".into()));
        }
        if c.placeholder.is_empty() {
            return Err(TexImgError::InvalidConfig(
                "Placeholder must not be empty".into(),
            ));
        }
        if c.tag == c.placeholder {
            return Err(TexImgError::InvalidConfig(format!(
                "Tag and placeholder must differ, both are '{}'",
                c.tag
            )));
        }
        if c.dpi < 72 || c.dpi > 600 {
            return Err(TexImgError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.max_attempts == 0 {
            return Err(TexImgError::InvalidConfig(
                "Compiler attempts must be ≥ 1".into(),
            ));
        }
        if c.output_suffix.is_empty() {
            return Err(TexImgError::InvalidConfig(
                "Output suffix must not be empty; the output would overwrite the input".into(),
            ));
        }
        if c.compiler_program.trim().is_empty() {
            return Err(TexImgError::InvalidConfig(
                "Compiler program must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
