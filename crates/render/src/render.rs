use crate::error::{ErrorKind, Result};
use crate::{Renderer, Source};
use exn::ResultExt;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command as Process, Stdio};
use tracing::instrument;

/// Anything smaller than this cannot be a PDF document, whatever the exit
/// status says.
pub const MINIMUM_PDF_SIZE: usize = 100;

/// A fully resolved WeasyPrint invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: PathBuf,
    args: Vec<String>,
}
impl Command {
    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Shell-ish rendering for logs and error messages. Arguments containing
/// whitespace or quotes are debug-quoted; this is not meant to be pasted back
/// into a shell verbatim.
impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

impl Renderer {
    /// Builds the command line for rendering `source` into `output` (stdout
    /// when `None`).
    pub fn command(&self, source: &Source, output: Option<&Path>) -> Command {
        let mut args = self.options.to_args();
        args.push(source.argument());
        args.push(output.map_or_else(|| "-".to_string(), |p| p.display().to_string()));
        Command { program: self.executable.path().to_path_buf(), args }
    }

    /// Renders `source` and returns the PDF bytes.
    pub fn to_pdf(&self, source: impl Into<Source>) -> Result<Vec<u8>> {
        self.render(source.into(), None)
    }

    /// Renders `source` straight into the file at `path` and returns the PDF
    /// bytes read back from it.
    pub fn to_file(&self, source: impl Into<Source>, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        self.render(source.into(), Some(path.as_ref()))
    }

    #[instrument(skip_all, fields(source = source_kind(&source), output = ?output))]
    fn render(&self, source: Source, output: Option<&Path>) -> Result<Vec<u8>> {
        let source = self.apply_styles(source)?;
        let command = self.command(&source, output);
        tracing::debug!(command = %command, "Invoking weasyprint");

        let stdin = if source.is_html() { Stdio::piped() } else { Stdio::null() };
        let mut child = Process::new(command.program())
            .args(command.args())
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .or_raise(|| ErrorKind::Io)?;

        // Feed stdin from another thread; WeasyPrint may start writing to
        // stdout before it has finished reading, and both pipes are bounded.
        let result = std::thread::scope(|scope| {
            if let (Some(mut stdin), Source::Html(html)) = (child.stdin.take(), &source) {
                scope.spawn(move || {
                    if let Err(e) = stdin.write_all(html) {
                        tracing::debug!(error = %e, "WeasyPrint closed stdin early");
                    }
                });
            }
            child.wait_with_output()
        })
        .or_raise(|| ErrorKind::Io)?;

        if !result.status.success() {
            tracing::warn!(
                status = ?result.status.code(),
                stderr = %String::from_utf8_lossy(&result.stderr),
                "WeasyPrint exited unsuccessfully"
            );
            exn::bail!(ErrorKind::Failed { status: result.status.code(), command: command.to_string() });
        }
        let pdf = match output {
            Some(path) => std::fs::read(path).or_raise(|| ErrorKind::Io)?,
            None => result.stdout,
        };
        if pdf.len() < MINIMUM_PDF_SIZE {
            exn::bail!(ErrorKind::OutputTooSmall(pdf.len()));
        }
        tracing::debug!(bytes = pdf.len(), "Rendered PDF");
        Ok(pdf)
    }

    fn apply_styles(&self, source: Source) -> Result<Source> {
        if self.styles.is_empty() {
            return Ok(source);
        }
        match source {
            Source::Html(html) => Ok(Source::Html(self.styles.inject(&html))),
            _ => exn::bail!(ErrorKind::ImproperSource("stylesheets may only be added to an HTML source".to_string())),
        }
    }
}

fn source_kind(source: &Source) -> &'static str {
    match source {
        Source::Url(_) => "url",
        Source::File(_) => "file",
        Source::Html(_) => "html",
    }
}
