#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

pub fn write_gz(path: &Path, lines: &[&str]) -> PathBuf {
    let file = File::create(path).expect("create fixture");
    let mut enc = GzEncoder::new(file, Compression::default());
    for line in lines {
        writeln!(enc, "{line}").expect("write fixture");
    }
    enc.finish().expect("finish gzip");
    path.to_path_buf()
}

pub fn write_plain(path: &Path, lines: &[&str]) -> PathBuf {
    let mut text = lines.join("\n");
    text.push('\n');
    fs::write(path, text).expect("write fixture");
    path.to_path_buf()
}

pub fn read_gz(path: &Path) -> String {
    let mut out = String::new();
    MultiGzDecoder::new(File::open(path).expect("open output"))
        .read_to_string(&mut out)
        .expect("decompress output");
    out
}

/// Parses a space-delimited MTAG file into header + rows.
pub fn read_mtag(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let text = fs::read_to_string(path).expect("read mtag output");
    let mut lines = text.lines();
    let header = lines
        .next()
        .expect("header")
        .split(' ')
        .map(str::to_string)
        .collect();
    let rows = lines
        .filter(|l| !l.is_empty())
        .map(|l| l.split(' ').map(str::to_string).collect())
        .collect();
    (header, rows)
}

pub const BOLT_HEADER: &str =
    "SNP\tCHR\tBP\tGENPOS\tALLELE1\tALLELE0\tA1FREQ\tINFO\tCHISQ_LINREG\tP_LINREG\tBETA\tSE\tCHISQ_BOLT_LMM_INF\tP_BOLT_LMM_INF\tCHISQ_BOLT_LMM\tP_BOLT_LMM";

#[allow(clippy::too_many_arguments)]
pub fn bolt_row(snp: &str, chr: &str, bp: &str, a1: &str, a0: &str, freq: &str, beta: &str, se: &str, p_inf: &str, p: &str) -> String {
    format!("{snp}\t{chr}\t{bp}\t0\t{a1}\t{a0}\t{freq}\t1\t4.0\t0.05\t{beta}\t{se}\t4.0\t{p_inf}\t4.0\t{p}")
}
