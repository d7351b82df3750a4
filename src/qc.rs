use std::path::Path;

use crate::error::{MtagPrepError, Result};

pub fn check_equal_length(
    left_len: usize,
    right_len: usize,
    left_name: &str,
    right_name: &str,
) -> Result<()> {
    if left_len != right_len {
        return Err(MtagPrepError::InvalidArgument(format!(
            "Length of {left_name} and {right_name} should be equal"
        )));
    }
    Ok(())
}

pub fn check_file_exists(path: &Path, name: &str) -> Result<()> {
    if !path.exists() {
        return Err(MtagPrepError::InvalidArgument(format!(
            "File {path:?} passed to {name} does not exist"
        )));
    }
    Ok(())
}

pub fn check_non_empty<T>(values: &[T], name: &str) -> Result<()> {
    if values.is_empty() {
        return Err(MtagPrepError::InvalidArgument(format!(
            "{name} must list at least one entry"
        )));
    }
    Ok(())
}

/// True for the tokens the pipeline treats as a missing value.
pub fn is_missing_token(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("NA")
        || trimmed.eq_ignore_ascii_case("NAN")
}
