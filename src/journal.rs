use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::config::LibraryPaths;
use crate::types::AttributeKind;

/// Simple file journal of library mutations with buffered writes.
pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl Journal {
    /// Create a new journal in `~/logs/mv-organizer/mvorg_<timestamp>.log`.
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined or the file cannot be created.
    pub fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Failed to get home directory")?;
        Self::in_directory(&home_dir.join("logs").join(env!("CARGO_PKG_NAME")))
    }

    /// Create a new timestamped journal file in the given directory.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be created.
    pub fn in_directory(log_dir: &Path) -> Result<Self> {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }

        let log_path = log_dir.join(format!("mvorg_{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path: log_path,
        })
    }

    /// Path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log the library locations in use.
    pub fn log_init(&mut self, paths: &LibraryPaths) {
        let _ = writeln!(self.writer, "[{}] INIT", Self::timestamp());
        let _ = writeln!(self.writer, "  inbox: {}", paths.inbox.display());
        let _ = writeln!(self.writer, "  library: {}", paths.library.display());
        let _ = writeln!(self.writer, "  actors: {}", paths.actors.display());
        let _ = writeln!(self.writer, "  categories: {}", paths.categories.display());
        let _ = writeln!(self.writer, "  series: {}", paths.series.display());
        let _ = writeln!(self.writer, "  studios: {}", paths.studios.display());
        let _ = writeln!(self.writer, "  database: {}", paths.database.display());
        let _ = self.writer.flush();
    }

    /// Log a file moved between the inbox and the library.
    pub fn log_migrate(&mut self, filename: &str, from: &Path, to: &Path) {
        let _ = writeln!(
            self.writer,
            "[{}] MIGRATE \"{}\" | {} -> {}",
            Self::timestamp(),
            filename,
            from.display(),
            to.display()
        );
        let _ = self.writer.flush();
    }

    /// Log a movie file rename inside the library.
    pub fn log_rename(&mut self, old: &str, new: &str) {
        let _ = writeln!(self.writer, "[{}] RENAME  \"{}\" -> \"{}\"", Self::timestamp(), old, new);
        let _ = self.writer.flush();
    }

    /// Log a link maintenance failure that was skipped.
    pub fn log_link_failure(&mut self, kind: AttributeKind, entity: &str, error: &str) {
        let _ = writeln!(
            self.writer,
            "[{}] LINK    {} \"{}\" | {}",
            Self::timestamp(),
            kind,
            entity,
            error
        );
        let _ = self.writer.flush();
    }

    /// Log a deleted movie record.
    pub fn log_delete(&mut self, filename: &str) {
        let _ = writeln!(self.writer, "[{}] DELETE  \"{}\"", Self::timestamp(), filename);
        let _ = self.writer.flush();
    }

    /// Log an entity change.
    pub fn log_entity(&mut self, action: &str, kind: AttributeKind, name: &str) {
        let _ = writeln!(
            self.writer,
            "[{}] ENTITY  {} {} \"{}\"",
            Self::timestamp(),
            action.to_uppercase(),
            kind,
            name
        );
        let _ = self.writer.flush();
    }

    /// Log a summary line for bulk operations.
    pub fn log_summary(&mut self, operation: &str, summary: &str) {
        let _ = writeln!(
            self.writer,
            "[{}] {:<7} {}",
            Self::timestamp(),
            operation.to_uppercase(),
            summary
        );
        let _ = self.writer.flush();
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal").field("path", &self.path).finish()
    }
}
