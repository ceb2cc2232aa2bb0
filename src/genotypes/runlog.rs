//! Operator-facing run log with one timestamped line per lifecycle event.

use std::{fs::OpenOptions, io::Write, path::Path};

/// Timestamp format of the run log lines, e.g., `Monday 19-10-2026 01:02:03 PM`.
const TIMESTAMP_FORMAT: &str = "%A %d-%m-%Y %I:%M:%S %p";

/// Append-only run log.
///
/// Every event is also emitted via `tracing`; the file is optional.
#[derive(Default)]
pub struct RunLog {
    writer: Option<Box<dyn Write>>,
}

impl RunLog {
    /// Open the run log at `path` for appending, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Self, anyhow::Error> {
        let writer = match path {
            Some(path) => {
                let path = path.as_ref();
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        anyhow::anyhow!("could not create directory {:?}: {}", parent, e)
                    })?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| anyhow::anyhow!("could not open run log {:?}: {}", path, e))?;
                Some(Box::new(file) as Box<dyn Write>)
            }
            None => None,
        };
        Ok(Self { writer })
    }

    fn write(&mut self, level: &str, message: &str) -> Result<(), anyhow::Error> {
        if let Some(writer) = self.writer.as_mut() {
            writeln!(
                writer,
                "{}\t[{}]\t{}",
                chrono::Local::now().format(TIMESTAMP_FORMAT),
                level,
                message
            )?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Record one event.
    pub fn info(&mut self, message: &str) -> Result<(), anyhow::Error> {
        tracing::info!("{}", message);
        self.write("INFO", message)
    }

    /// Record a failure.
    pub fn error(&mut self, message: &str) -> Result<(), anyhow::Error> {
        tracing::error!("{}", message);
        self.write("ERROR", message)
    }
}
