use crate::error::{MtagPrepError, Result};

/// Columns every BOLT-LMM stats file must provide.
pub const REQUIRED_BOLT_COLUMNS: [&str; 8] = [
    "SNP", "CHR", "BP", "ALLELE1", "ALLELE0", "A1FREQ", "BETA", "SE",
];

/// Recognized p-value columns, most preferred first.
pub const P_VALUE_COLUMNS: [&str; 2] = ["P_BOLT_LMM", "P_BOLT_LMM_INF"];

/// Output header expected by MTAG, in order.
pub const MTAG_COLUMNS: [&str; 9] = [
    "snpid", "chr", "bpos", "a1", "a2", "freq", "z", "pval", "n",
];

/// Names of the source columns as they appear in one BOLT-LMM file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoltColumns {
    pub snp: String,
    pub chr: String,
    pub bp: String,
    pub allele1: String,
    pub allele0: String,
    pub freq: String,
    pub beta: String,
    pub se: String,
    pub p: String,
    pub info: Vec<String>,
}

pub fn normalize_headers(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|h| h.trim().to_ascii_uppercase())
        .collect()
}

impl BoltColumns {
    /// Matches `headers` (case-insensitively) against the BOLT-LMM column
    /// names and keeps the original spelling for later lookups.
    pub fn resolve(headers: &[String], filename: &str) -> Result<Self> {
        let normalized = normalize_headers(headers);
        let find = |name: &str| {
            normalized
                .iter()
                .position(|h| h == name)
                .map(|i| headers[i].clone())
        };

        let require = |col: &str| {
            find(col).ok_or_else(|| MtagPrepError::MissingColumn(format!("{col} in {filename}")))
        };
        for col in REQUIRED_BOLT_COLUMNS {
            require(col)?;
        }

        let mut info = Vec::new();
        let p = match P_VALUE_COLUMNS.iter().find_map(|c| find(*c).map(|n| (*c, n))) {
            Some((canonical, name)) => {
                let others: Vec<&str> = P_VALUE_COLUMNS
                    .iter()
                    .copied()
                    .filter(|c| *c != canonical && find(*c).is_some())
                    .collect();
                if others.is_empty() {
                    info.push(format!("Interpreting the {name} column as the pval column."));
                } else {
                    info.push(format!(
                        "Interpreting the {name} column as the pval column; ignoring {}.",
                        others.join(", ")
                    ));
                }
                name
            }
            None => {
                return Err(MtagPrepError::MissingColumn(format!(
                    "{} in {filename}",
                    P_VALUE_COLUMNS.join(" or ")
                )));
            }
        };

        Ok(BoltColumns {
            snp: require("SNP")?,
            chr: require("CHR")?,
            bp: require("BP")?,
            allele1: require("ALLELE1")?,
            allele0: require("ALLELE0")?,
            freq: require("A1FREQ")?,
            beta: require("BETA")?,
            se: require("SE")?,
            p,
            info,
        })
    }
}
