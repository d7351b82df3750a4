use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::MtagPrepError;
use crate::io::open_text_reader;
use crate::qc::{check_file_exists, is_missing_token};

/// Counts rows of a tab-separated table with a non-missing value in each of
/// `columns`, returned in the order requested.
pub fn sample_sizes(table: &Path, columns: &[String]) -> Result<Vec<(String, u64)>> {
    check_file_exists(table, "phenotype table")?;
    let mut lines = open_text_reader(table)?.lines();
    let header = match lines.next() {
        Some(line) => line.with_context(|| format!("read header of {}", table.display()))?,
        None => return Err(MtagPrepError::EmptyFile(table.display().to_string()).into()),
    };
    let names: Vec<&str> = header.trim_end().split('\t').collect();

    let mut indices = Vec::with_capacity(columns.len());
    for col in columns {
        let idx = names
            .iter()
            .position(|h| h.trim() == col)
            .ok_or_else(|| MtagPrepError::MissingColumn(format!("{col} in {}", table.display())))?;
        indices.push(idx);
    }

    let mut counts = vec![0u64; columns.len()];
    for line in lines {
        let line = line.with_context(|| format!("read {}", table.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        for (count, idx) in counts.iter_mut().zip(&indices) {
            if let Some(value) = fields.get(*idx)
                && !is_missing_token(value)
            {
                *count += 1;
            }
        }
    }

    Ok(columns.iter().cloned().zip(counts).collect())
}

/// Number of rows with a non-missing value in `column`.
pub fn count_non_missing(table: &Path, column: &str) -> Result<u64> {
    let sizes = sample_sizes(table, &[column.to_string()])?;
    Ok(sizes.first().map(|(_, n)| *n).unwrap_or(0))
}
