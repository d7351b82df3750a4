use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::annotation::AnnotationLookup;
use crate::df_utils::{
    count_prefixed, count_underflow, f64_column, filter_incomplete, ratio, str_column,
};
use crate::io::{read_table, write_space_delimited};
use crate::logging::RunLog;
use crate::qc::check_file_exists;
use crate::schema::{BoltColumns, MTAG_COLUMNS};

/// Outcome of converting one BOLT-LMM stats file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub trait_label: String,
    pub output: PathBuf,
    pub sample_size: u64,
    pub rows_in: usize,
    pub rows_emitted: usize,
    pub rows_dropped: usize,
    pub rsid_rows: usize,
    pub coordinate_rows: usize,
    /// Input rows whose p-value was too small for f64 and is written as 0.
    pub p_underflow: usize,
}

impl ConversionReport {
    pub fn rsid_fraction(&self) -> f64 {
        if self.rows_emitted == 0 {
            0.0
        } else {
            self.rsid_rows as f64 / self.rows_emitted as f64
        }
    }
}

fn renamed(mut series: Series, name: &str) -> Column {
    series.rename(name.into());
    series.into()
}

/// Builds the nine MTAG columns from a BOLT-LMM table. Rows are not filtered
/// here; nulls mark values that are missing or could not be derived.
pub fn to_mtag_frame(
    df: &DataFrame,
    columns: &BoltColumns,
    lookup: &AnnotationLookup,
    sample_size: u64,
) -> Result<DataFrame> {
    let snp = str_column(df, &columns.snp)?;
    let snpid: StringChunked = snp
        .into_iter()
        .map(|v| v.map(|key| lookup.resolve(key).to_string()))
        .collect();

    let beta = f64_column(df, &columns.beta)?;
    let se = f64_column(df, &columns.se)?;

    let height = df.height();
    let n = Series::new("n".into(), vec![sample_size as i64; height]);

    let built = [
        renamed(snpid.into_series(), "snpid"),
        renamed(str_column(df, &columns.chr)?.into_series(), "chr"),
        renamed(str_column(df, &columns.bp)?.into_series(), "bpos"),
        renamed(str_column(df, &columns.allele1)?.into_series(), "a1"),
        renamed(str_column(df, &columns.allele0)?.into_series(), "a2"),
        renamed(f64_column(df, &columns.freq)?.into_series(), "freq"),
        ratio(&beta, &se, "z").into(),
        renamed(f64_column(df, &columns.p)?.into_series(), "pval"),
        n.into(),
    ];

    let mut out = df.clone();
    for column in built {
        out.with_column(column)?;
    }
    Ok(out.select(MTAG_COLUMNS)?)
}

/// Converts a BOLT-LMM stats file into an MTAG sumstats file.
pub fn convert_bolt_to_mtag(
    bolt_file: &Path,
    lookup: &AnnotationLookup,
    trait_label: &str,
    sample_size: u64,
    output: &Path,
    log: &mut RunLog,
) -> Result<ConversionReport> {
    check_file_exists(bolt_file, "bolt stats")?;
    log.line(&format!("Converting {trait_label}..."))?;
    log.line(&format!("  Input: {}", bolt_file.display()))?;
    log.line(&format!("  Output: {}", output.display()))?;
    log.line(&format!("  Sample size: {sample_size}"))?;

    let df = read_table(bolt_file)?;
    let headers: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let columns = BoltColumns::resolve(&headers, &bolt_file.display().to_string())?;
    for msg in &columns.info {
        log.line(&format!("  {msg}"))?;
    }

    let rows_in = df.height();
    log.line(&format!("  Variants in BOLT file: {rows_in}"))?;

    let p_underflow = count_underflow(
        &str_column(&df, &columns.p)?,
        &f64_column(&df, &columns.p)?,
    );
    if p_underflow > 0 {
        log.warn(&format!(
            "  {p_underflow} p-values in {} are below the f64 range and will be written as 0",
            columns.p
        ))?;
    }

    let mtag = to_mtag_frame(&df, &columns, lookup, sample_size)?;
    let (mtag, rows_dropped) = filter_incomplete(mtag, &MTAG_COLUMNS)?;
    if rows_dropped > 0 {
        log.line(&format!("  Removed {rows_dropped} variants with missing data"))?;
    }

    let rows_emitted = mtag.height();
    let rsid_rows = count_prefixed(&mtag, "snpid", "rs")?;
    let coordinate_rows = rows_emitted - rsid_rows;
    if rows_emitted > 0 {
        log.line(&format!(
            "  Variants with rsID: {rsid_rows} ({:.1}%)",
            100.0 * rsid_rows as f64 / rows_emitted as f64
        ))?;
        log.line(&format!(
            "  Variants with coordinates: {coordinate_rows} ({:.1}%)",
            100.0 * coordinate_rows as f64 / rows_emitted as f64
        ))?;
    } else {
        log.warn(&format!("  No complete variants left for {trait_label}"))?;
    }

    write_space_delimited(&mtag, output)
        .with_context(|| format!("write MTAG file for {trait_label}"))?;
    log.line(&format!("  Created: {} ({rows_emitted} variants)", output.display()))?;

    Ok(ConversionReport {
        trait_label: trait_label.to_string(),
        output: output.to_path_buf(),
        sample_size,
        rows_in,
        rows_emitted,
        rows_dropped,
        rsid_rows,
        coordinate_rows,
        p_underflow,
    })
}
