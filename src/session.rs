//! Interactive collect/render loop driven by line input.

use crate::collectors::{CollectError, Collector, MetricSource};
use crate::config::ExportConfig;
use crate::export::{export_file_name, export_to_dir, is_bare_file_name, ExportError};
use crate::render::Renderer;
use crate::snapshot::Snapshot;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const STOPPED_BANNER: &str = "--- System Monitor Stopped ---";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("system information collection failed: {0}")]
    Collect(#[from] CollectError),
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Refresh,
    Save,
    Quit,
}

impl Command {
    /// `None` is end of input.
    pub fn parse(line: Option<&str>) -> Self {
        match line.map(|l| l.trim().to_ascii_lowercase()) {
            None => Command::Quit,
            Some(l) if l == "q" => Command::Quit,
            Some(l) if l == "s" => Command::Save,
            Some(_) => Command::Refresh,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    Cancelled,
    Failed,
}

pub struct Session<S: MetricSource, R: BufRead, W: Write> {
    collector: Collector<S>,
    renderer: Renderer,
    export: ExportConfig,
    input: R,
    output: W,
}

impl<S: MetricSource, R: BufRead, W: Write> Session<S, R, W> {
    pub fn new(
        collector: Collector<S>,
        renderer: Renderer,
        export: ExportConfig,
        input: R,
        output: W,
    ) -> Self {
        Self {
            collector,
            renderer,
            export,
            input,
            output,
        }
    }

    /// Runs until the user quits or input ends. A collection failure ends the
    /// session with an error.
    pub fn run(&mut self) -> Result<(), SessionError> {
        info!("system monitor started");

        loop {
            let collection = self.collector.collect_with_diagnostics().map_err(|err| {
                error!(error = %err, "unexpected error while collecting system info");
                err
            })?;
            self.renderer.render(
                &collection.snapshot,
                &collection.diagnostics,
                &mut self.output,
            )?;

            write!(
                self.output,
                "Press enter to update.\nEnter 's' to save, 'q' to quit: "
            )?;
            self.output.flush()?;

            let line = self.read_line()?;
            match Command::parse(line.as_deref()) {
                Command::Refresh => debug!("refresh requested"),
                Command::Quit => break,
                Command::Save => {
                    writeln!(self.output, "{}", "=".repeat(50))?;
                    self.save(&collection.snapshot)?;
                    write!(self.output, "Press enter to continue...")?;
                    self.output.flush()?;
                    if self.read_line()?.is_none() {
                        break;
                    }
                }
            }
        }

        info!("system monitor stopped by user");
        writeln!(self.output, "\n{STOPPED_BANNER}")?;
        self.output.flush()?;
        Ok(())
    }

    /// Asks for a file name and a directory, retrying on request after a failed
    /// write. An empty directory answer with no configured default cancels.
    pub fn save(&mut self, snapshot: &Snapshot) -> Result<SaveOutcome, SessionError> {
        debug!("attempting to save snapshot as JSON");

        let name = loop {
            let Some(name) = self.prompt(&format!(
                "Enter your file name [{}]: ",
                self.export.file_name
            ))?
            else {
                return Ok(self.cancelled("File name entry")?);
            };
            if name.trim().is_empty() {
                break self.export.file_name.clone();
            }
            if is_bare_file_name(&name) {
                break name;
            }
            warn!(name = %name, "rejected file name with a path component");
            writeln!(
                self.output,
                "ERROR: '{}' must be a bare file name",
                name.trim()
            )?;
        };
        let file_name = export_file_name(&name);

        loop {
            let question = match &self.export.directory {
                Some(dir) => format!("Directory to save {file_name} in [{dir}]: "),
                None => format!("Directory to save {file_name} in (empty to cancel): "),
            };
            let answer = self.prompt(&question)?.unwrap_or_default();
            let dir = if !answer.trim().is_empty() {
                answer.trim().to_string()
            } else if let Some(default) = &self.export.directory {
                default.clone()
            } else {
                return Ok(self.cancelled("Directory selection")?);
            };

            match export_to_dir(snapshot, Path::new(&dir), &file_name) {
                Ok(path) => {
                    writeln!(self.output, "{file_name} was created at: {}", path.display())?;
                    return Ok(SaveOutcome::Saved(path));
                }
                Err(err) => {
                    warn!(directory = %dir, error = %err, "export failed");
                    writeln!(self.output, "ERROR: {err}")?;
                    if !err.is_retryable() || !self.confirm_retry(&err)? {
                        return Ok(SaveOutcome::Failed);
                    }
                    warn!("attempting alternative path");
                }
            }
        }
    }

    fn confirm_retry(&mut self, err: &ExportError) -> io::Result<bool> {
        let label = match err {
            ExportError::InvalidDirectory { .. } => "Invalid path!",
            ExportError::PermissionDenied { .. } => "Permission error!",
            _ => "Write failed!",
        };
        let answer = self.prompt(&format!("{label} Retry? (y/n): "))?;
        Ok(answer.is_some_and(|a| a.trim().eq_ignore_ascii_case("y")))
    }

    fn cancelled(&mut self, step: &str) -> io::Result<SaveOutcome> {
        info!(step, "save cancelled");
        writeln!(self.output, "{step} cancelled. Aborting save.")?;
        Ok(SaveOutcome::Cancelled)
    }

    fn prompt(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        self.read_line()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string()))
    }
}
