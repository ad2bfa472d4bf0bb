//! Whole-document conversion entry points.
//!
//! [`convert`] runs every stage and returns the rewritten document without
//! touching the input; [`convert_to_file`] additionally writes it out and is
//! what the CLI uses. [`inspect`] stops after scanning.

use crate::config::ConversionConfig;
use crate::error::TexImgError;
use crate::output::{ConversionOutput, ConversionStats, ScanReport, SnippetRecord, SnippetStatus};
use crate::pipeline::compile::{compile_snippet, PdfLatex, TexCompiler};
use crate::pipeline::crop::CropSettings;
use crate::pipeline::materialize::{materialize, DocumentTemplate};
use crate::pipeline::render::{render_snippet, PageRasterizer, PdfiumRasterizer};
use crate::pipeline::{persist, reinsert, scan};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Render every tagged snippet in `input` and return the rewritten Markdown.
///
/// Images and (unless `keep_intermediates`) a swept working folder are
/// left on disk; the output document itself is not written.
///
/// # Returns
/// `Ok(ConversionOutput)` even if some snippets failed
/// (check `output.stats.failed_snippets` or call
/// [`ConversionOutput::into_result`]).
///
/// # Errors
/// Returns `Err(TexImgError)` only for fatal errors:
/// - input missing or unreadable
/// - unpaired tag with `strict_tags`
/// - working folder or `.tex` file cannot be written
/// - pdfium cannot be loaded
/// - cleanup fails
pub fn convert(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, TexImgError> {
    run(input.as_ref(), None, config)
}

/// Convert and write the result to `output_path` atomically.
///
/// The output file is protected from the working-folder sweep even when it
/// lives inside the working folder.
pub fn convert_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, TexImgError> {
    run(input.as_ref(), Some(output_path.as_ref()), config)
}

/// Report what a conversion would extract, without compiling anything.
///
/// No files are written.
pub fn inspect(input: impl AsRef<Path>, config: &ConversionConfig) -> Result<ScanReport, TexImgError> {
    let input = input.as_ref();
    let content = read_input(input)?;
    let scanned = scan::scan(&content, &config.tag, &config.placeholder);
    Ok(ScanReport {
        input: input.to_path_buf(),
        tag: config.tag.clone(),
        snippets: scanned.snippets,
        unmatched_tag: scanned.unmatched_tag,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn read_input(path: &Path) -> Result<String, TexImgError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TexImgError::FileNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => TexImgError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => TexImgError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

/// Injected compiler, or `pdflatex` (or the configured program).
fn resolve_compiler(config: &ConversionConfig) -> Arc<dyn TexCompiler> {
    match config.compiler {
        Some(ref compiler) => Arc::clone(compiler),
        None => Arc::new(PdfLatex::new(config.compiler_program.clone())),
    }
}

/// Injected rasteriser, or pdfium.
fn resolve_rasterizer(config: &ConversionConfig) -> Arc<dyn PageRasterizer> {
    match config.rasterizer {
        Some(ref rasterizer) => Arc::clone(rasterizer),
        None => Arc::new(PdfiumRasterizer::new(config.pdfium_library_path.clone())),
    }
}

fn report_failure(config: &ConversionConfig, record: &SnippetRecord, total: usize) {
    if let (Some(cb), Some(err)) = (&config.progress_callback, record.error()) {
        cb.on_snippet_error(record.ordinal, total, &err.to_string());
    }
}

fn run(
    input: &Path,
    output_path: Option<&Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, TexImgError> {
    let total_start = Instant::now();
    info!("Starting conversion: {}", input.display());

    // ── Step 1: Read and scan ────────────────────────────────────────────
    let content = read_input(input)?;
    let scanned = scan::scan(&content, &config.tag, &config.placeholder);

    if let (true, Some(offset)) = (config.strict_tags, scanned.unmatched_tag) {
        return Err(TexImgError::UnmatchedTag {
            tag: config.tag.clone(),
            offset,
        });
    }

    let total = scanned.len();
    info!("Found {} LaTeX snippet(s)", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total);
    }

    if scanned.is_empty() {
        // Nothing to render: the document goes out as it came in.
        if let Some(path) = output_path {
            persist::write_output(path, &scanned.text)?;
        }
        if let Some(ref cb) = config.progress_callback {
            cb.on_conversion_complete(0, 0);
        }
        return Ok(ConversionOutput {
            markdown: scanned.text,
            snippets: Vec::new(),
            output_path: output_path.map(Path::to_path_buf),
            stats: ConversionStats {
                total_duration_ms: total_start.elapsed().as_millis() as u64,
                ..Default::default()
            },
        });
    }

    // ── Step 2: Materialize ──────────────────────────────────────────────
    std::fs::create_dir_all(&config.work_dir).map_err(|e| TexImgError::WorkDirUnavailable {
        path: config.work_dir.clone(),
        source: e,
    })?;
    let template = DocumentTemplate::new(&config.extra_packages);
    let records = materialize(&scanned.snippets, &config.work_dir, &template)?;
    debug!("Materialized {} source file(s) in {}", records.len(), config.work_dir.display());

    // ── Step 3: Compile ──────────────────────────────────────────────────
    let compiler = resolve_compiler(config);
    let policy = config.retry_policy();
    let timeout = config.compile_timeout();

    let compile_start = Instant::now();
    let records: Vec<SnippetRecord> = records
        .into_iter()
        .map(|record| {
            if let Some(ref cb) = config.progress_callback {
                cb.on_snippet_start(record.ordinal, total);
            }
            let record = compile_snippet(compiler.as_ref(), record, &policy, timeout);
            report_failure(config, &record, total);
            record
        })
        .collect();
    let compile_duration_ms = compile_start.elapsed().as_millis() as u64;
    info!(
        "Compiled {}/{} snippet(s) in {}ms using {}",
        records
            .iter()
            .filter(|r| matches!(r.status, SnippetStatus::Compiled { .. }))
            .count(),
        total,
        compile_duration_ms,
        compiler.program()
    );

    // ── Step 4: Rasterise and crop ───────────────────────────────────────
    let rasterizer = resolve_rasterizer(config);
    let crop_settings = CropSettings {
        margin: config.crop_margin,
        noise_bias: config.noise_bias,
    };

    let render_start = Instant::now();
    let records = records
        .into_iter()
        .map(|record| {
            let was_compiled = matches!(record.status, SnippetStatus::Compiled { .. });
            let record = render_snippet(rasterizer.as_ref(), record, config.dpi, &crop_settings)?;
            if was_compiled {
                match (&config.progress_callback, record.image_path()) {
                    (Some(cb), Some(image)) => cb.on_snippet_complete(record.ordinal, total, image),
                    _ => report_failure(config, &record, total),
                }
            }
            Ok(record)
        })
        .collect::<Result<Vec<_>, TexImgError>>()?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let rendered = records.iter().filter(|r| r.image_path().is_some()).count();
    let failed = records.iter().filter(|r| r.is_failed()).count();
    info!("Rendered {}/{} snippet(s) in {}ms", rendered, total, render_duration_ms);

    // ── Step 5: Reinsert ─────────────────────────────────────────────────
    let markdown = reinsert::reinsert(&scanned.text, &scanned.slots, &records);

    // ── Step 6: Write and clean up ───────────────────────────────────────
    if let Some(path) = output_path {
        persist::write_output(path, &markdown)?;
    }

    let removed_artifacts = if config.keep_intermediates {
        debug!("Keeping intermediate files in {}", config.work_dir.display());
        0
    } else {
        let mut keep: Vec<&Path> = vec![input];
        keep.extend(output_path);
        persist::clean_work_dir(&config.work_dir, &keep)?.len()
    };

    if failed > 0 {
        warn!("{}/{} snippet(s) left as raw LaTeX", failed, total);
    }

    let stats = ConversionStats {
        total_snippets: total,
        rendered_snippets: rendered,
        failed_snippets: failed,
        removed_artifacts,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        compile_duration_ms,
        render_duration_ms,
    };

    info!(
        "Conversion complete: {}/{} snippets, {}ms total",
        rendered, total, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(total, rendered);
    }

    Ok(ConversionOutput {
        markdown,
        snippets: records,
        output_path: output_path.map(PathBuf::from),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert(dir.path().join("nope.md"), &ConversionConfig::default()).unwrap_err();
        assert!(matches!(err, TexImgError::FileNotFound { .. }));
    }

    #[test]
    fn directory_input_is_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = inspect(dir.path(), &ConversionConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            TexImgError::ReadFailed { .. } | TexImgError::PermissionDenied { .. }
        ));
    }

    #[test]
    fn document_without_tags_is_returned_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plain.md");
        std::fs::write(&input, "# Title\n\nNo maths here.\n").unwrap();
        let config = ConversionConfig::builder()
            .work_dir(dir.path().join("fig"))
            .build()
            .unwrap();

        let out = convert(&input, &config).unwrap();
        assert_eq!(out.markdown, "# Title\n\nNo maths here.\n");
        assert_eq!(out.stats.total_snippets, 0);
        // No working folder is created when there is nothing to render.
        assert!(!dir.path().join("fig").exists());
    }

    #[test]
    fn strict_tags_rejects_unpaired_tag() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("odd.md");
        std::fs::write(&input, "a [LATEX]x[LATEX] b [LATEX] c").unwrap();
        let config = ConversionConfig::builder()
            .work_dir(dir.path().join("fig"))
            .strict_tags(true)
            .build()
            .unwrap();

        let err = convert(&input, &config).unwrap_err();
        assert!(matches!(err, TexImgError::UnmatchedTag { offset: 20, .. }));
    }

    #[test]
    fn inspect_lists_snippets_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.md");
        std::fs::write(&input, "[LATEX]a[LATEX] and [LATEX]b[LATEX]").unwrap();
        let config = ConversionConfig::builder()
            .work_dir(dir.path().join("fig"))
            .build()
            .unwrap();

        let report = inspect(&input, &config).unwrap();
        assert_eq!(report.snippets, vec!["a", "b"]);
        assert_eq!(report.unmatched_tag, None);
        assert!(!dir.path().join("fig").exists());
    }
}
