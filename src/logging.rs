use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Per-run log sink. Every message goes through `tracing`; when a log file
/// was requested it is also appended there.
pub struct RunLog {
    file: Option<BufWriter<File>>,
}

impl RunLog {
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => {
                let f = File::create(p).with_context(|| format!("create log {}", p.display()))?;
                Some(BufWriter::new(f))
            }
            None => None,
        };
        Ok(Self { file })
    }

    pub fn disabled() -> Self {
        Self { file: None }
    }

    pub fn line(&mut self, message: &str) -> Result<()> {
        info!("{message}");
        self.append(message)
    }

    pub fn warn(&mut self, message: &str) -> Result<()> {
        warn!("{message}");
        self.append(message)
    }

    fn append(&mut self, message: &str) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{message}")?;
            file.flush()?;
        }
        Ok(())
    }
}
