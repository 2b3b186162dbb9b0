use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Append-only text log of gate denials, one file per day
/// (`AntiGrief_YYYY-MM-DD.txt`), timestamped lines, directory auto-created.
///
/// Appends are synchronous and best-effort: a failed write is reported
/// through the diagnostic logger and never reaches the caller.
pub struct DenialLog {
    dir: PathBuf,
    banner_written: bool,
}

impl DenialLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            banner_written: false,
        }
    }

    /// Path of today's log file. Computed per append so a session running
    /// across midnight rolls into the next day's file.
    fn file_path(&self) -> PathBuf {
        self.dir
            .join(format!("AntiGrief_{}.txt", Local::now().format("%Y-%m-%d")))
    }

    /// Append one timestamped line. Errors are swallowed and logged.
    pub fn append(&mut self, message: &str) {
        if let Err(e) = self.try_append(message) {
            log::warn!("Failed to write denial log: {}", e);
        }
    }

    fn try_append(&mut self, message: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_path())?;

        if !self.banner_written {
            writeln!(
                file,
                "\n==== AntiGrief log started {} ====",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            )?;
            self.banner_written = true;
        }

        writeln!(
            file,
            "[{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        )
    }
}
