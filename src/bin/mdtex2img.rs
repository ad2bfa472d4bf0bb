//! CLI binary for md-tex2img.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use md_tex2img::{
    convert_to_file, inspect, output_path_for, ConversionConfig, ConversionProgressCallback,
    ProgressCallback,
};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the run, one log line per snippet.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-snippet wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` reports the snippet count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} snippets  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
    }

    fn elapsed_secs(&self, ordinal: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&ordinal))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total: usize) {
        if total == 0 {
            return;
        }
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total} LaTeX snippet(s)…"))
        ));
    }

    fn on_snippet_start(&self, ordinal: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(ordinal, Instant::now());
        }
        self.bar.set_message(format!("snippet {ordinal}"));
    }

    fn on_snippet_complete(&self, ordinal: usize, total: usize, image_path: &Path) {
        let secs = self.elapsed_secs(ordinal);
        self.bar.println(format!(
            "  {} Snippet {:>3}/{:<3}  {}  {}",
            green("✓"),
            ordinal,
            total,
            dim(&image_path.display().to_string()),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_snippet_error(&self, ordinal: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(ordinal);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep one line per snippet.
        let first_line = error.lines().next().unwrap_or_default();
        let msg: String = if first_line.chars().count() > 80 {
            first_line.chars().take(79).chain(['…']).collect()
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} Snippet {:>3}/{:<3}  {}  {}",
            red("✗"),
            ordinal,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total: usize, rendered: usize) {
        self.bar.finish_and_clear();
        if total == 0 {
            return;
        }

        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} snippet(s) rendered",
                green("✔"),
                bold(&rendered.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} snippet(s) rendered  ({} left as LaTeX)",
                if rendered == 0 { red("✘") } else { cyan("⚠") },
                bold(&rendered.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render every [LATEX]…[LATEX] region; writes notes_medium.md and fig/*.png
  mdtex2img notes.md

  # Explicit output path and image folder
  mdtex2img notes.md -o site/notes.md --work-dir site/img

  # Extra packages for every snippet
  mdtex2img --package amssymb --package tikz paper.md

  # Different delimiters
  mdtex2img --tag '%%TEX%%' notes.md

  # List what would be rendered, without compiling
  mdtex2img --inspect-only notes.md

  # Machine-readable report; non-zero exit if any snippet fell back
  mdtex2img --json --fail-on-error notes.md > report.json

INPUT FORMAT:
  Some text
  [LATEX]
  \begin{align} a &= b + c \end{align}
  [LATEX]
  More text

  becomes

  Some text
  ![0](fig/tex_snip_0.png)
  More text

ENVIRONMENT VARIABLES:
  MDTEX2IMG_*             Every flag, e.g. MDTEX2IMG_DPI=600
  PDFIUM_LIB_PATH         Path to libpdfium (file or containing directory)
  RUST_LOG                Override log filtering (e.g. md_tex2img=debug)

REQUIREMENTS:
  A TeX engine on PATH (pdflatex by default) and the pdfium shared library.
"#;

/// Render LaTeX snippets embedded in Markdown into cropped PNG images.
#[derive(Parser, Debug)]
#[command(
    name = "mdtex2img",
    version,
    about = "Render LaTeX snippets embedded in Markdown into cropped PNG images",
    long_about = "Find every region wrapped in a pair of tags, compile it with a TeX engine, \
rasterise and crop the result, and replace the region with an image link. Regions that \
fail to render are left in the document as raw LaTeX.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown file to process.
    input: PathBuf,

    /// Output file (default: <stem>_medium.<ext> next to the input).
    #[arg(short, long, env = "MDTEX2IMG_OUTPUT")]
    output: Option<PathBuf>,

    /// Tag that both opens and closes a LaTeX region.
    #[arg(long, env = "MDTEX2IMG_TAG", default_value = "[LATEX]")]
    tag: String,

    /// Folder for generated sources and images.
    #[arg(long, env = "MDTEX2IMG_WORK_DIR", default_value = "fig")]
    work_dir: PathBuf,

    /// Rasterisation DPI (72–600).
    #[arg(long, env = "MDTEX2IMG_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Pixels of padding kept around the content.
    #[arg(long, env = "MDTEX2IMG_MARGIN", default_value_t = 50)]
    margin: u32,

    /// Per-channel difference (doubled) treated as background noise.
    #[arg(long, env = "MDTEX2IMG_NOISE_BIAS", default_value_t = 50)]
    noise_bias: u8,

    /// TeX engine to invoke.
    #[arg(long, env = "MDTEX2IMG_COMPILER", default_value = "pdflatex")]
    compiler: String,

    /// Compile attempts per snippet (first captured, then streamed).
    #[arg(long, env = "MDTEX2IMG_MAX_ATTEMPTS", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Seconds before a compile attempt is killed.
    #[arg(long, env = "MDTEX2IMG_COMPILE_TIMEOUT", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..))]
    compile_timeout: u64,

    /// Suffix appended to the input stem for the default output path.
    #[arg(long, env = "MDTEX2IMG_SUFFIX", default_value = "_medium")]
    suffix: String,

    /// Extra \usepackage for every snippet (repeatable).
    #[arg(long = "package", env = "MDTEX2IMG_PACKAGES", value_delimiter = ',')]
    packages: Vec<String>,

    /// Keep .tex/.pdf/.log files in the work folder.
    #[arg(long, env = "MDTEX2IMG_KEEP_INTERMEDIATES")]
    keep_intermediates: bool,

    /// Treat an unpaired tag as an error.
    #[arg(long, env = "MDTEX2IMG_STRICT_TAGS")]
    strict_tags: bool,

    /// List the snippets that would be rendered, no compilation.
    #[arg(long, env = "MDTEX2IMG_INSPECT_ONLY")]
    inspect_only: bool,

    /// Print a JSON report (ConversionOutput or ScanReport) on stdout.
    #[arg(long, env = "MDTEX2IMG_JSON")]
    json: bool,

    /// Exit non-zero if any snippet was left as raw LaTeX.
    #[arg(long, env = "MDTEX2IMG_FAIL_ON_ERROR")]
    fail_on_error: bool,

    /// Disable progress bar.
    #[arg(long, env = "MDTEX2IMG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MDTEX2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MDTEX2IMG_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose brings them all back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let report = inspect(&cli.input, &config)
            .with_context(|| format!("Failed to inspect {}", cli.input.display()))?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else {
            println!("File:         {}", report.input.display());
            println!("Tag:          {}", report.tag);
            println!("Snippets:     {}", report.snippets.len());
            if let Some(offset) = report.unmatched_tag {
                println!("Unpaired tag: byte {offset}");
            }
            for (ordinal, snippet) in report.snippets.iter().enumerate() {
                let first = snippet.trim().lines().next().unwrap_or_default();
                println!("  {ordinal:>3}  {}", dim(first));
            }
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| output_path_for(&cli.input, &cli.suffix));

    let output = convert_to_file(&cli.input, &output_path, &config)
        .with_context(|| format!("Conversion of {} failed", cli.input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet && !cli.json {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} snippets  {}ms  →  {}",
            if stats.failed_snippets == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.rendered_snippets,
            stats.total_snippets,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        if !show_progress {
            for failure in output.failures() {
                eprintln!("   {} {}", red("✗"), failure);
            }
        }
        if stats.removed_artifacts > 0 {
            eprintln!(
                "   {}",
                dim(&format!(
                    "removed {} intermediate file(s) from {}",
                    stats.removed_artifacts,
                    config.work_dir.display()
                ))
            );
        }
    }

    if cli.fail_on_error {
        output.into_result().context("Some snippets were not rendered")?;
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .tag(cli.tag.clone())
        .work_dir(cli.work_dir.clone())
        .dpi(cli.dpi)
        .crop_margin(cli.margin)
        .noise_bias(cli.noise_bias)
        .compiler_program(cli.compiler.clone())
        .max_attempts(cli.max_attempts)
        .compile_timeout_secs(cli.compile_timeout)
        .output_suffix(cli.suffix.clone())
        .extra_packages(cli.packages.iter().filter(|p| !p.trim().is_empty()).cloned())
        .keep_intermediates(cli.keep_intermediates)
        .strict_tags(cli.strict_tags);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn every_flag_has_an_env_fallback() {
        let cmd = Cli::command();
        for arg in cmd.get_arguments() {
            let id = arg.get_id().as_str();
            if arg.is_positional() || id == "help" || id == "version" {
                continue;
            }
            let env = arg
                .get_env()
                .unwrap_or_else(|| panic!("--{id} has no env fallback"));
            assert!(
                env.to_string_lossy().starts_with("MDTEX2IMG_"),
                "--{id} reads {env:?}"
            );
        }
    }

    #[test]
    fn inspect_only_parses() {
        let cli = Cli::try_parse_from(["mdtex2img", "--inspect-only", "notes.md"]).unwrap();
        assert!(cli.inspect_only);
        assert_eq!(cli.input, PathBuf::from("notes.md"));
    }
}
