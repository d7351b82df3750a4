use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use polars::prelude::*;
use tempfile::NamedTempFile;

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Opens a text file for line reading, decompressing `.gz` and `.bz2` by
/// extension.
pub fn open_text_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader: Box<dyn Read> = match extension(path).as_str() {
        "gz" => Box::new(MultiGzDecoder::new(file)),
        "bz2" => Box::new(BzDecoder::new(file)),
        _ => Box::new(file),
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Line-oriented output, gzip-compressed when the path ends in `.gz`.
///
/// The gzip header carries no timestamp or file name, so identical content
/// always produces identical bytes.
pub enum TextWriter {
    Plain(BufWriter<File>),
    Gzip(BufWriter<GzEncoder<File>>),
}

impl TextWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        if extension(path) == "gz" {
            let encoder = GzEncoder::new(file, Compression::default());
            Ok(TextWriter::Gzip(BufWriter::new(encoder)))
        } else {
            Ok(TextWriter::Plain(BufWriter::new(file)))
        }
    }

    /// Flushes buffers and writes the gzip trailer.
    pub fn finish(self) -> Result<()> {
        match self {
            TextWriter::Plain(mut w) => w.flush()?,
            TextWriter::Gzip(w) => {
                let encoder = w.into_inner().map_err(|e| e.into_error())?;
                encoder.finish()?;
            }
        }
        Ok(())
    }
}

impl Write for TextWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            TextWriter::Plain(w) => w.write(buf),
            TextWriter::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            TextWriter::Plain(w) => w.flush(),
            TextWriter::Gzip(w) => w.flush(),
        }
    }
}

/// Reads a delimited table with every column kept as a string. Missing
/// tokens (`""`, `NA`, `NaN`) become nulls; numeric casting is left to
/// the caller so that chromosome and position values pass through verbatim.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let ext = extension(path);
    if ext == "gz" || ext == "bz2" {
        let tmp = decompress_to_temp(path)?;
        return read_table_plain(tmp.path(), path);
    }
    read_table_plain(path, path)
}

fn read_table_plain(path: &Path, origin: &Path) -> Result<DataFrame> {
    let delimiter = detect_delimiter(path)?;
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(delimiter)
                .with_null_values(Some(NullValues::AllColumns(vec![
                    "".into(),
                    "NA".into(),
                    "NaN".into(),
                ])))
                .with_missing_is_null(true),
        )
        .with_ignore_errors(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("read {}", origin.display()))?;
    Ok(df)
}

fn detect_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut first = String::new();
    reader.read_line(&mut first)?;
    if first.trim().is_empty() {
        return Err(crate::error::MtagPrepError::EmptyFile(path.display().to_string()).into());
    }
    if first.contains('\t') {
        return Ok(b'\t');
    }
    if first.contains(',') {
        return Ok(b',');
    }
    Ok(b' ')
}

fn decompress_to_temp(path: &Path) -> Result<NamedTempFile> {
    let mut reader = open_text_reader(path)?;
    let mut tmp = NamedTempFile::new()?;
    std::io::copy(&mut reader, &mut tmp).with_context(|| format!("decompress {}", path.display()))?;
    tmp.flush()?;
    Ok(tmp)
}

/// Writes `df` space-delimited with a header row; nulls are rendered `NA`.
pub fn write_space_delimited(df: &DataFrame, path: &Path) -> Result<()> {
    let mut writer = TextWriter::create(path)?;
    let mut df = df.clone();
    CsvWriter::new(&mut writer)
        .include_header(true)
        .with_separator(b' ')
        .with_null_value("NA".into())
        .finish(&mut df)
        .with_context(|| format!("write {}", path.display()))?;
    writer.finish()
}
