//! Compiler invocation: turn each `.tex` source into a PDF.
//!
//! ## Retry Strategy
//!
//! The first attempt runs with the compiler's output captured and a single
//! newline on stdin, which dismisses the interactive prompt LaTeX shows on
//! recoverable errors. When no PDF appears, later attempts stream the
//! compiler output to stderr so the user can see what went wrong. Every
//! attempt is bounded by a deadline; a hung compiler is killed.
//!
//! Success is judged only by the expected `<job>.pdf` existing afterwards,
//! never by the exit status: pdflatex can exit non-zero after recovering
//! from an error and still write a PDF.

use crate::error::SnippetError;
use crate::output::{SnippetRecord, SnippetStatus};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const READER_GRACE: Duration = Duration::from_secs(2);

/// How the compiler's console output is handled for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collected in memory and only logged at debug level.
    Captured,
    /// Written straight to our stderr.
    Streamed,
}

/// Bounded number of compiler attempts per snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Output mode for the zero-based `attempt`.
    pub fn mode_for(&self, attempt: u32) -> OutputMode {
        if attempt == 0 {
            OutputMode::Captured
        } else {
            OutputMode::Streamed
        }
    }

    /// `(attempt, mode)` for every allowed attempt, in order.
    pub fn attempts(&self) -> impl Iterator<Item = (u32, OutputMode)> + '_ {
        (0..self.max_attempts).map(|a| (a, self.mode_for(a)))
    }
}

/// One compiler run: which source, under which job name, into which folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    pub source: PathBuf,
    /// Job name passed to the compiler; the PDF is named after it.
    pub job_name: String,
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

impl CompileJob {
    /// Job named after the source stem, writing next to the source.
    pub fn for_source(source: &Path, timeout: Duration) -> Self {
        let job_name = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output_dir = match source.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            source: source.to_path_buf(),
            job_name,
            output_dir,
            timeout,
        }
    }

    /// Where the compiler is expected to leave the PDF.
    pub fn expected_pdf(&self) -> PathBuf {
        self.output_dir.join(format!("{}.pdf", self.job_name))
    }
}

/// What a single attempt looked like from the outside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptReport {
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Captured console output; empty when streamed.
    pub output: String,
}

impl AttemptReport {
    /// One line for logs and [`SnippetError::CompileFailed`].
    pub fn summary(&self, timeout: Duration) -> String {
        let status = if self.timed_out {
            format!("timed out after {}s", timeout.as_secs())
        } else {
            match self.exit_code {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_string(),
            }
        };
        // LaTeX error lines start with "! ".
        match self.output.lines().find(|l| l.starts_with('!')) {
            Some(first_error) => format!("{status}: {}", first_error.trim()),
            None => status,
        }
    }
}

/// A LaTeX-to-PDF compiler.
///
/// Implementations run one attempt and report how it went; deciding whether
/// a PDF was produced and whether to retry is [`compile_snippet`]'s job.
pub trait TexCompiler: Send + Sync {
    /// Executable name, for messages.
    fn program(&self) -> &str;

    /// Run one attempt. `Err` means the compiler could not be started.
    fn run(&self, job: &CompileJob, mode: OutputMode) -> io::Result<AttemptReport>;
}

/// `pdflatex` (or any compiler accepting `-jobname` and `-output-directory`).
#[derive(Debug, Clone)]
pub struct PdfLatex {
    program: String,
}

impl Default for PdfLatex {
    fn default() -> Self {
        Self::new("pdflatex")
    }
}

impl PdfLatex {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, job: &CompileJob) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(format!("-jobname={}", job.job_name))
            .arg(format!("-output-directory={}", job.output_dir.display()))
            .arg(&job.source)
            .stdin(Stdio::piped());
        cmd
    }
}

impl TexCompiler for PdfLatex {
    fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, job: &CompileJob, mode: OutputMode) -> io::Result<AttemptReport> {
        let mut cmd = self.command(job);
        match mode {
            OutputMode::Captured => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::null());
            }
            OutputMode::Streamed => {
                cmd.stdout(Stdio::from(io::stderr())).stderr(Stdio::inherit());
            }
        }

        debug!("Running {:?}", cmd);
        let mut child = cmd.spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // The compiler may already have exited; a broken pipe is fine.
            let _ = stdin.write_all(b"\n");
        }

        // Drain stdout on a side thread so a chatty compiler never blocks on
        // a full pipe while we wait on it.
        let reader = child.stdout.take().map(|mut out| {
            let (tx, rx) = mpsc::channel();
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = out.read_to_end(&mut buf);
                let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
            });
            rx
        });

        let status = wait_with_deadline(&mut child, job.timeout)?;
        // Processes spawned by the compiler can keep the pipe open after it
        // exits or is killed; their output is abandoned after a short grace.
        let output = reader
            .and_then(|rx| rx.recv_timeout(READER_GRACE).ok())
            .unwrap_or_default();

        Ok(AttemptReport {
            exit_code: status.and_then(|s| s.code()),
            timed_out: status.is_none(),
            output,
        })
    }
}

/// Wait for `child`, killing it once `timeout` has elapsed.
///
/// Returns `None` when the deadline was hit.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn has_tex_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("tex"))
        .unwrap_or(false)
}

/// Compile one pending snippet. Records in any other state pass through.
///
/// Never returns an error: every failure becomes
/// [`SnippetStatus::Failed`] so the remaining snippets still get compiled.
pub fn compile_snippet(
    compiler: &dyn TexCompiler,
    record: SnippetRecord,
    policy: &RetryPolicy,
    timeout: Duration,
) -> SnippetRecord {
    if record.status != SnippetStatus::Pending {
        return record;
    }
    let ordinal = record.ordinal;
    let source = record.tex_path.clone();

    if !source.is_file() {
        warn!("File not found: {}", source.display());
        return record.with_status(SnippetStatus::Failed {
            error: SnippetError::SourceMissing {
                ordinal,
                path: source,
            },
        });
    }
    if !has_tex_extension(&source) {
        warn!("Wrong file format of compiler input {}", source.display());
        return record.with_status(SnippetStatus::Failed {
            error: SnippetError::WrongExtension {
                ordinal,
                path: source,
            },
        });
    }

    let job = CompileJob::for_source(&source, timeout);
    let expected = job.expected_pdf();
    // A PDF left over from an earlier run must not count as success.
    if expected.exists() {
        if let Err(e) = std::fs::remove_file(&expected) {
            warn!(
                "Snippet {}: cannot remove stale {}: {}",
                ordinal,
                expected.display(),
                e
            );
            return record.with_status(SnippetStatus::Failed {
                error: SnippetError::StaleArtifact {
                    ordinal,
                    path: expected,
                    detail: e.to_string(),
                },
            });
        }
    }

    let mut last_detail = String::from("compiler never ran");
    for (attempt, mode) in policy.attempts() {
        if attempt > 0 {
            warn!(
                "Snippet {}: no PDF after attempt {}; retrying with compiler output shown",
                ordinal, attempt
            );
        }

        match compiler.run(&job, mode) {
            Ok(report) => {
                if expected.is_file() {
                    info!("Snippet {}: wrote {}", ordinal, expected.display());
                    return record.with_status(SnippetStatus::Compiled { pdf_path: expected });
                }
                if !report.output.is_empty() {
                    debug!("Snippet {} compiler output:\n{}", ordinal, report.output);
                }
                last_detail = report.summary(timeout);
            }
            Err(e) => {
                warn!(
                    "Snippet {}: could not run '{}': {}",
                    ordinal,
                    compiler.program(),
                    e
                );
                return record.with_status(SnippetStatus::Failed {
                    error: SnippetError::CompilerUnavailable {
                        ordinal,
                        program: compiler.program().to_string(),
                        detail: e.to_string(),
                    },
                });
            }
        }
    }

    warn!("Snippet {}: compilation failed ({})", ordinal, last_detail);
    record.with_status(SnippetStatus::Failed {
        error: SnippetError::CompileFailed {
            ordinal,
            attempts: policy.max_attempts(),
            detail: last_detail,
        },
    })
}
