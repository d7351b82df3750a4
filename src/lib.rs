//! Preparation of BOLT-LMM summary statistics for MTAG.
//!
//! Two pipelines: [`ancestry`] restricts phenotype and covariate tables to
//! an ancestry keep-list, and [`batch`] converts BOLT-LMM stats files into
//! MTAG's nine-column format with identifiers resolved through
//! [`annotation`].

pub mod error;
pub mod logging;

pub mod df_utils;
pub mod io;
pub mod qc;
pub mod schema;

pub mod ancestry;
pub mod annotation;
pub mod batch;
pub mod convert;
pub mod sample_size;
