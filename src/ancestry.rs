use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::MtagPrepError;
use crate::io::{TextWriter, open_text_reader};
use crate::logging::RunLog;
use crate::qc::{check_file_exists, check_non_empty};

/// Column names BOLT-LMM requires at the start of phenotype and covariate
/// files.
pub const CANONICAL_ID_COLUMNS: [&str; 2] = ["FID", "IID"];

const PROGRESS_EVERY: usize = 100_000;

/// Individual IDs retained by the ancestry filter.
#[derive(Debug, Clone, Default)]
pub struct KeepSet {
    ids: HashSet<String>,
}

impl KeepSet {
    /// Loads field 2 of every line with at least two whitespace-separated
    /// fields. Shorter lines are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        check_file_exists(path, "keep")?;
        let reader = open_text_reader(path)?;
        let mut ids = HashSet::new();
        for line in reader.lines() {
            let line = line.with_context(|| format!("read {}", path.display()))?;
            let mut fields = line.split_whitespace();
            if let (Some(_fid), Some(iid)) = (fields.next(), fields.next()) {
                ids.insert(iid.to_string());
            }
        }
        Ok(Self { ids })
    }

    pub fn contains(&self, iid: &str) -> bool {
        self.ids.contains(iid)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn get(&self, iid: &str) -> Option<&str> {
        self.ids.get(iid).map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for KeepSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows_in: usize,
    pub rows_kept: usize,
    pub rows_short: usize,
    pub header_rewritten: bool,
    /// Keep-list IDs that never appeared in the table.
    pub keep_missing: usize,
}

#[derive(Debug, Clone)]
pub struct TablePair {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub keep: PathBuf,
    pub tables: Vec<TablePair>,
    pub canonical_header: bool,
    pub log_file: Option<PathBuf>,
}

/// Rewrites the first two tab-separated header fields to `FID`/`IID` when
/// they differ. Returns the header to write and whether it changed.
pub fn normalize_header(header: &str) -> crate::error::Result<(String, bool)> {
    let mut parts: Vec<&str> = header.trim().split('\t').collect();
    if parts.len() < 2 {
        return Err(MtagPrepError::MissingColumn(format!(
            "header has {} field(s); expected at least {} {}",
            parts.len(),
            CANONICAL_ID_COLUMNS[0],
            CANONICAL_ID_COLUMNS[1]
        )));
    }
    if parts[0] == CANONICAL_ID_COLUMNS[0] && parts[1] == CANONICAL_ID_COLUMNS[1] {
        return Ok((header.to_string(), false));
    }
    parts[0] = CANONICAL_ID_COLUMNS[0];
    parts[1] = CANONICAL_ID_COLUMNS[1];
    Ok((parts.join("\t"), true))
}

/// Copies the header and every row whose second tab-separated field is in
/// `keep` from `input` to `output`, preserving input order.
pub fn filter_table(
    input: &Path,
    output: &Path,
    keep: &KeepSet,
    canonical_header: bool,
    log: &mut RunLog,
) -> Result<FilterReport> {
    check_file_exists(input, "input table")?;
    let mut lines = open_text_reader(input)?.lines();
    let header = match lines.next() {
        Some(line) => line.with_context(|| format!("read header of {}", input.display()))?,
        None => return Err(MtagPrepError::EmptyFile(input.display().to_string()).into()),
    };

    let (header, header_rewritten) = if canonical_header {
        let original = header.clone();
        let (fixed, changed) = normalize_header(&header)
            .with_context(|| format!("normalize header of {}", input.display()))?;
        if changed {
            let mut orig = original.trim().split('\t');
            log.line(&format!(
                "Adjusting header of {} to start with 'FID IID' (was '{} {}')",
                input.display(),
                orig.next().unwrap_or_default(),
                orig.next().unwrap_or_default()
            ))?;
        }
        (fixed, changed)
    } else {
        (header, false)
    };

    let mut writer = TextWriter::create(output)?;
    writeln!(writer, "{header}")?;

    let mut seen: HashSet<&str> = HashSet::new();
    let mut rows_in = 0usize;
    let mut rows_kept = 0usize;
    let mut rows_short = 0usize;
    for line in lines {
        let line = line.with_context(|| format!("read {}", input.display()))?;
        rows_in += 1;
        match line.trim().split('\t').nth(1) {
            Some(iid) => {
                if let Some(id) = keep.get(iid) {
                    writeln!(writer, "{line}")?;
                    rows_kept += 1;
                    seen.insert(id);
                }
            }
            None => rows_short += 1,
        }
        if rows_in % PROGRESS_EVERY == 0 {
            tracing::info!("Processed {rows_in} samples, kept {rows_kept}...");
        }
    }
    writer.finish()?;

    Ok(FilterReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        rows_in,
        rows_kept,
        rows_short,
        header_rewritten,
        keep_missing: keep.len().saturating_sub(seen.len()),
    })
}

/// Loads the keep-list once and filters every configured table.
pub fn filter_ancestry(config: &FilterConfig) -> Result<Vec<FilterReport>> {
    check_non_empty(&config.tables, "tables")?;
    let mut log = RunLog::open(config.log_file.as_deref())?;

    log.line(&format!("Reading sample IDs from: {}", config.keep.display()))?;
    let keep = KeepSet::load(&config.keep)?;
    log.line(&format!("  Samples to keep: {}", keep.len()))?;

    let mut reports = Vec::with_capacity(config.tables.len());
    for pair in &config.tables {
        log.line(&format!(
            "Filtering {} -> {}",
            pair.input.display(),
            pair.output.display()
        ))?;
        let report = filter_table(
            &pair.input,
            &pair.output,
            &keep,
            config.canonical_header,
            &mut log,
        )?;
        log.line(&format!(
            "  Complete: {} input -> {} kept",
            report.rows_in, report.rows_kept
        ))?;
        if report.rows_short > 0 {
            log.line(&format!(
                "  {} row(s) skipped with fewer than two fields",
                report.rows_short
            ))?;
        }
        if report.keep_missing > 0 {
            log.line(&format!(
                "  Note: {} keep-list sample(s) missing from {}",
                report.keep_missing,
                pair.input.display()
            ))?;
        }
        reports.push(report);
    }
    Ok(reports)
}
