use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use mtagprep::ancestry::{FilterConfig, TablePair, filter_ancestry};
use mtagprep::annotation::{
    AnnotationSchema, DEFAULT_ID_COLUMN, IdPolicy, load_annotation_lookup,
};
use mtagprep::batch::{BatchConfig, SampleSizeSource, prepare_mtag_inputs};
use mtagprep::convert::convert_bolt_to_mtag;
use mtagprep::logging::{RunLog, init_tracing};
use mtagprep::sample_size::sample_sizes;

#[derive(Parser)]
#[command(name = "mtagprep")]
#[command(about = "Prepare BOLT-LMM results and ancestry-filtered tables for MTAG", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaArg {
    Positional,
    ExistingVariation,
    InfoTag,
}

#[derive(clap::Args)]
struct AnnotationArgs {
    #[arg(long, required = true)]
    annotation: PathBuf,
    #[arg(long, value_enum, default_value = "existing-variation")]
    annotation_schema: SchemaArg,
    /// Identifier column (existing-variation) or INFO tag (info-tag).
    #[arg(long)]
    id_field: Option<String>,
    /// Only accept rs-prefixed identifiers.
    #[arg(long)]
    strict_ids: bool,
}

impl AnnotationArgs {
    fn schema(&self) -> AnnotationSchema {
        match self.annotation_schema {
            SchemaArg::Positional => AnnotationSchema::Positional,
            SchemaArg::ExistingVariation => AnnotationSchema::ExistingVariation {
                column: self
                    .id_field
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ID_COLUMN.to_string()),
            },
            SchemaArg::InfoTag => AnnotationSchema::InfoTag {
                tag: self.id_field.clone().unwrap_or_else(|| "RS".to_string()),
            },
        }
    }

    fn policy(&self) -> IdPolicy {
        if self.strict_ids {
            IdPolicy::Strict
        } else {
            IdPolicy::Permissive
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Keep only keep-list samples in phenotype/covariate tables.
    Filter {
        #[arg(long, required = true)]
        keep: PathBuf,
        /// Input tables, paired in order with --outputs.
        #[arg(long, required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[arg(long, required = true, num_args = 1..)]
        outputs: Vec<PathBuf>,
        /// Leave the first two header fields as they are.
        #[arg(long)]
        keep_header: bool,
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Count non-missing values per phenotype column.
    SampleSize {
        #[arg(long, required = true)]
        pheno: PathBuf,
        #[arg(long, required = true)]
        phenotypes: String,
    },
    /// Convert one BOLT-LMM stats file.
    Convert {
        #[arg(long, required = true)]
        bolt: PathBuf,
        #[arg(long, required = true)]
        n: u64,
        #[arg(long, required = true)]
        output: PathBuf,
        #[arg(long)]
        trait_name: Option<String>,
        #[command(flatten)]
        annotation: AnnotationArgs,
    },
    /// Convert every phenotype x covariate-set combination.
    Batch {
        #[arg(long, required = true)]
        results_dir: PathBuf,
        #[arg(long, default_value = "EUR")]
        ancestry: String,
        #[arg(long, required = true)]
        output_dir: PathBuf,
        #[arg(long, required = true)]
        phenotypes: String,
        #[arg(long, required = true)]
        covariate_sets: String,
        /// Filtered phenotype table used to count N.
        #[arg(long, conflicts_with = "n")]
        pheno: Option<PathBuf>,
        /// Comma-separated N per phenotype.
        #[arg(long)]
        n: Option<String>,
        #[command(flatten)]
        annotation: AnnotationArgs,
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Filter {
            keep,
            inputs,
            outputs,
            keep_header,
            log_file,
        } => {
            if inputs.len() != outputs.len() {
                anyhow::bail!(
                    "--inputs ({}) and --outputs ({}) must pair up",
                    inputs.len(),
                    outputs.len()
                );
            }
            let tables = inputs
                .into_iter()
                .zip(outputs)
                .map(|(input, output)| TablePair { input, output })
                .collect();
            let config = FilterConfig {
                keep,
                tables,
                canonical_header: !keep_header,
                log_file,
            };
            filter_ancestry(&config)?;
        }
        Command::SampleSize { pheno, phenotypes } => {
            let phenotypes = split_string_list(phenotypes);
            for (name, n) in sample_sizes(&pheno, &phenotypes)? {
                println!("{name}\t{n}");
            }
        }
        Command::Convert {
            bolt,
            n,
            output,
            trait_name,
            annotation,
        } => {
            let mut log = RunLog::disabled();
            let lookup = load_annotation_lookup(
                &annotation.annotation,
                &annotation.schema(),
                annotation.policy(),
                &mut log,
            )?;
            let label = trait_name.unwrap_or_else(|| {
                bolt.file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("trait")
                    .to_string()
            });
            convert_bolt_to_mtag(&bolt, &lookup, &label, n, &output, &mut log)?;
        }
        Command::Batch {
            results_dir,
            ancestry,
            output_dir,
            phenotypes,
            covariate_sets,
            pheno,
            n,
            annotation,
            log_file,
        } => {
            let sample_sizes = match (pheno, n) {
                (Some(path), _) => SampleSizeSource::PhenotypeTable(path),
                (None, Some(n)) => SampleSizeSource::Explicit(split_u64_list(n)?),
                (None, None) => anyhow::bail!("batch requires --pheno or --n"),
            };
            let config = BatchConfig {
                results_dir,
                ancestry,
                output_dir,
                phenotypes: split_string_list(phenotypes),
                covariate_sets: split_string_list(covariate_sets),
                sample_sizes,
                annotation_schema: annotation.schema(),
                id_policy: annotation.policy(),
                annotation: annotation.annotation,
                log_file,
            };
            let report = prepare_mtag_inputs(&config)?;
            if !report.is_complete() {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}

fn split_string_list(input: String) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn split_u64_list(input: String) -> anyhow::Result<Vec<u64>> {
    split_string_list(input)
        .into_iter()
        .map(|s| {
            s.parse::<u64>()
                .map_err(|e| anyhow::anyhow!("invalid sample size {s}: {e}"))
        })
        .collect()
}
