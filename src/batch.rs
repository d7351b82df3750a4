use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::annotation::{AnnotationLookup, AnnotationSchema, IdPolicy, load_annotation_lookup};
use crate::convert::{ConversionReport, convert_bolt_to_mtag};
use crate::logging::RunLog;
use crate::qc::{check_equal_length, check_non_empty};
use crate::sample_size::sample_sizes;

/// Where the per-phenotype sample sizes come from.
#[derive(Debug, Clone)]
pub enum SampleSizeSource {
    /// Count non-missing values per phenotype column of the filtered table.
    PhenotypeTable(PathBuf),
    /// One value per phenotype, in the same order as `phenotypes`.
    Explicit(Vec<u64>),
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub results_dir: PathBuf,
    pub ancestry: String,
    pub output_dir: PathBuf,
    pub phenotypes: Vec<String>,
    pub covariate_sets: Vec<String>,
    pub sample_sizes: SampleSizeSource,
    pub annotation: PathBuf,
    pub annotation_schema: AnnotationSchema,
    pub id_policy: IdPolicy,
    pub log_file: Option<PathBuf>,
}

impl BatchConfig {
    pub fn results_subdir(&self, covariate_set: &str) -> PathBuf {
        self.results_dir.join(covariate_set).join(&self.ancestry)
    }

    pub fn bolt_stats_path(&self, phenotype: &str, covariate_set: &str) -> PathBuf {
        self.results_subdir(covariate_set)
            .join(format!("bolt_{phenotype}.{covariate_set}.stats.gz"))
    }

    pub fn mtag_output_path(&self, phenotype: &str, covariate_set: &str) -> PathBuf {
        self.output_dir
            .join(format!("{phenotype}.{covariate_set}.mtag.sumstats.txt"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub phenotype: String,
    pub covariate_set: String,
    pub reason: String,
}

/// Full outcome of a batch: every combination lands in exactly one list.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: Vec<ConversionReport>,
    pub failed: Vec<FailedItem>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, phenotype: &str, covariate_set: &str, reason: String) {
        self.failed.push(FailedItem {
            phenotype: phenotype.to_string(),
            covariate_set: covariate_set.to_string(),
            reason,
        });
    }
}

pub fn resolve_sample_sizes(
    config: &BatchConfig,
    log: &mut RunLog,
) -> Result<HashMap<String, u64>> {
    let pairs = match &config.sample_sizes {
        SampleSizeSource::PhenotypeTable(path) => {
            log.line(&format!("Determining sample sizes from {}", path.display()))?;
            sample_sizes(path, &config.phenotypes)?
        }
        SampleSizeSource::Explicit(values) => {
            check_equal_length(
                config.phenotypes.len(),
                values.len(),
                "phenotypes",
                "sample sizes",
            )?;
            config
                .phenotypes
                .iter()
                .cloned()
                .zip(values.iter().copied())
                .collect()
        }
    };
    for (pheno, n) in &pairs {
        log.line(&format!("  {pheno}: {n} samples"))?;
    }
    Ok(pairs.into_iter().collect())
}

/// Converts every (phenotype, covariate set) combination. A failing
/// combination is recorded and the batch moves on.
pub fn run_batch(
    config: &BatchConfig,
    lookup: &AnnotationLookup,
    sizes: &HashMap<String, u64>,
    log: &mut RunLog,
) -> Result<BatchReport> {
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("create {}", config.output_dir.display()))?;

    let mut report = BatchReport::default();
    for covar in &config.covariate_sets {
        log.line(&format!("Processing {covar}"))?;
        let results_dir = config.results_subdir(covar);
        let dir_missing = !results_dir.is_dir();
        if dir_missing {
            log.warn(&format!(
                "Results directory not found: {}",
                results_dir.display()
            ))?;
        }

        for pheno in &config.phenotypes {
            if dir_missing {
                report.fail(
                    pheno,
                    covar,
                    format!("results directory not found: {}", results_dir.display()),
                );
                continue;
            }
            let bolt_file = config.bolt_stats_path(pheno, covar);
            if !bolt_file.exists() {
                log.warn(&format!("File not found: {}", bolt_file.display()))?;
                report.fail(
                    pheno,
                    covar,
                    format!("stats file not found: {}", bolt_file.display()),
                );
                continue;
            }
            let Some(&n) = sizes.get(pheno) else {
                log.warn(&format!("No sample size for {pheno}"))?;
                report.fail(pheno, covar, format!("no sample size for {pheno}"));
                continue;
            };

            let output = config.mtag_output_path(pheno, covar);
            let label = format!("{pheno} + {covar}");
            match convert_bolt_to_mtag(&bolt_file, lookup, &label, n, &output, log) {
                Ok(item) => report.succeeded.push(item),
                Err(err) => {
                    log.warn(&format!("Error processing {label}: {err:#}"))?;
                    report.fail(pheno, covar, format!("{err:#}"));
                }
            }
        }
    }
    Ok(report)
}

fn log_created_files(dir: &Path, log: &mut RunLog) -> Result<()> {
    let mut names: Vec<(String, u64)> = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".mtag.sumstats.txt") {
            names.push((name, entry.metadata()?.len()));
        }
    }
    names.sort();
    log.line("Created files:")?;
    for (name, size) in names {
        log.line(&format!(
            "  {name} ({:.1} MB)",
            size as f64 / (1024.0 * 1024.0)
        ))?;
    }
    Ok(())
}

/// Loads the annotation lookup and sample sizes once, then runs the batch.
pub fn prepare_mtag_inputs(config: &BatchConfig) -> Result<BatchReport> {
    check_non_empty(&config.phenotypes, "phenotypes")?;
    check_non_empty(&config.covariate_sets, "covariate sets")?;
    let mut log = RunLog::open(config.log_file.as_deref())?;

    log.line("BOLT-LMM to MTAG format conversion")?;
    let lookup = load_annotation_lookup(
        &config.annotation,
        &config.annotation_schema,
        config.id_policy,
        &mut log,
    )?;
    let sizes = resolve_sample_sizes(config, &mut log)?;

    let report = run_batch(config, &lookup, &sizes, &mut log)?;

    log.line(&format!(
        "Conversion complete: {} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    ))?;
    for item in &report.failed {
        log.warn(&format!(
            "  {} + {}: {}",
            item.phenotype, item.covariate_set, item.reason
        ))?;
    }
    log.line(&format!("Output directory: {}", config.output_dir.display()))?;
    log_created_files(&config.output_dir, &mut log)?;
    Ok(report)
}
