use anyhow::Result;
use polars::prelude::*;

pub fn f64_column(df: &DataFrame, col: &str) -> Result<Float64Chunked> {
    let series = df
        .column(col)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.clone())
}

pub fn str_column(df: &DataFrame, col: &str) -> Result<StringChunked> {
    let series = df
        .column(col)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series.str()?.clone())
}

/// `numerator / denominator` per row; undefined or infinite results are null.
pub fn ratio(numerator: &Float64Chunked, denominator: &Float64Chunked, name: &str) -> Series {
    let out: Float64Chunked = numerator
        .into_iter()
        .zip(denominator)
        .map(|(num, den)| match (num, den) {
            (Some(n), Some(d)) => Some(n / d).filter(|v| v.is_finite()),
            _ => None,
        })
        .collect();
    let mut series = out.into_series();
    series.rename(name.into());
    series
}

pub fn filter_missing(mut df: DataFrame, col: &str) -> Result<(DataFrame, usize)> {
    if df.column(col).is_err() {
        return Ok((df, 0));
    }
    let before = df.height();
    let series = df.column(col)?.as_materialized_series();
    let mask = match series.dtype() {
        DataType::Float64 => series.is_not_null() & series.f64()?.is_not_nan(),
        _ => series.is_not_null(),
    };
    df = df.filter(&mask)?;
    let removed = before.saturating_sub(df.height());
    Ok((df, removed))
}

/// Drops every row with a missing value in any of `cols`.
pub fn filter_incomplete(mut df: DataFrame, cols: &[&str]) -> Result<(DataFrame, usize)> {
    let mut removed = 0usize;
    for col in cols {
        let (df_tmp, n) = filter_missing(df, col)?;
        df = df_tmp;
        removed += n;
    }
    Ok((df, removed))
}

/// Number of non-null values in `col` that start with `prefix`.
pub fn count_prefixed(df: &DataFrame, col: &str, prefix: &str) -> Result<usize> {
    let values = str_column(df, col)?;
    Ok(values
        .into_iter()
        .flatten()
        .filter(|v| v.starts_with(prefix))
        .count())
}

/// Rows whose text holds a non-zero value that parsed to exactly zero, i.e.
/// magnitudes below the smallest representable f64.
pub fn count_underflow(text: &StringChunked, parsed: &Float64Chunked) -> usize {
    text.into_iter()
        .zip(parsed)
        .filter(|(raw, value)| match (raw, value) {
            (Some(raw), Some(v)) if *v == 0.0 => {
                let mantissa = raw.split(['e', 'E']).next().unwrap_or(*raw);
                mantissa.chars().any(|c| matches!(c, '1'..='9'))
            }
            _ => false,
        })
        .count()
}
