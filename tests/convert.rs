mod common;

use common::{BOLT_HEADER, bolt_row, read_mtag, write_gz, write_plain};
use mtagprep::annotation::AnnotationLookup;
use mtagprep::convert::convert_bolt_to_mtag;
use mtagprep::error::MtagPrepError;
use mtagprep::logging::RunLog;
use mtagprep::schema::{BoltColumns, MTAG_COLUMNS};

fn lookup() -> AnnotationLookup {
    AnnotationLookup::from_pairs([("1:756604:A:G", "rs3131962")])
}

#[test]
fn resolves_ids_with_fallback_and_derives_z() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bolt = write_gz(
        &dir.path().join("bolt_Loneliness.Day_NoPCs.stats.gz"),
        &[
            BOLT_HEADER,
            &bolt_row("1:756604:A:G", "1", "756604", "G", "A", "0.3", "0.02", "0.01", "0.04", "0.05"),
            &bolt_row("1:900000:C:T", "1", "900000", "T", "C", "0.1", "-0.5", "0.25", "0.2", "0.3"),
        ],
    );
    let out = dir.path().join("Loneliness.Day_NoPCs.mtag.sumstats.txt");
    let report = convert_bolt_to_mtag(
        &bolt,
        &lookup(),
        "Loneliness + Day_NoPCs",
        353000,
        &out,
        &mut RunLog::disabled(),
    )
    .expect("convert");

    let (header, rows) = read_mtag(&out);
    assert_eq!(header, MTAG_COLUMNS.to_vec());
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0][0], "rs3131962");
    assert_eq!(rows[0][1], "1");
    assert_eq!(rows[0][2], "756604");
    assert_eq!(rows[0][3], "G");
    assert_eq!(rows[0][4], "A");
    assert_eq!(rows[0][5].parse::<f64>().expect("freq"), 0.3);
    assert_eq!(rows[0][6].parse::<f64>().expect("z"), 2.0);
    assert_eq!(rows[0][7].parse::<f64>().expect("pval"), 0.05);
    assert_eq!(rows[0][8], "353000");

    assert_eq!(rows[1][0], "1:900000:C:T");
    assert_eq!(rows[1][6].parse::<f64>().expect("z"), -2.0);

    assert_eq!(report.rows_in, 2);
    assert_eq!(report.rows_emitted, 2);
    assert_eq!(report.rows_dropped, 0);
    assert_eq!(report.rsid_rows, 1);
    assert_eq!(report.coordinate_rows, 1);
    assert_eq!(report.rsid_fraction(), 0.5);
}

#[test]
fn incomplete_rows_are_dropped_and_counted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bolt = write_gz(
        &dir.path().join("bolt.stats.gz"),
        &[
            BOLT_HEADER,
            &bolt_row("1:1:A:G", "1", "1", "A", "G", "0.2", "0.1", "0.05", "0.1", "0.1"),
            &bolt_row("1:2:A:G", "1", "2", "A", "G", "0.2", "NA", "0.05", "0.1", "0.1"),
            &bolt_row("1:3:A:G", "1", "3", "A", "G", "0.2", "0.1", "0", "0.1", "0.1"),
            &bolt_row("1:4:A:G", "1", "4", "A", "G", "", "0.1", "0.05", "0.1", "0.1"),
            &bolt_row("1:5:A:G", "1", "5", "A", "G", "0.2", "0.1", "0.05", "0.1", "NA"),
            &bolt_row("1:6:A:G", "1", "6", "A", "G", "0.2", "0", "0", "0.1", "0.1"),
        ],
    );
    let out = dir.path().join("out.txt");
    let report = convert_bolt_to_mtag(&bolt, &lookup(), "t", 10, &out, &mut RunLog::disabled())
        .expect("convert");

    let (_, rows) = read_mtag(&out);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "1:1:A:G");
    assert!(rows.iter().flatten().all(|v| v != "NA" && !v.is_empty()));
    assert_eq!(report.rows_emitted, 1);
    assert_eq!(report.rows_dropped, 5);
    assert_eq!(report.rows_emitted + report.rows_dropped, report.rows_in);
}

#[test]
fn infinitesimal_p_is_used_only_when_it_is_the_sole_p_column() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bolt = write_plain(
        &dir.path().join("bolt.stats"),
        &[
            "SNP\tCHR\tBP\tALLELE1\tALLELE0\tA1FREQ\tBETA\tSE\tP_BOLT_LMM_INF",
            "1:1:A:G\t1\t1\tA\tG\t0.5\t0.3\t0.1\t0.001",
        ],
    );
    let out = dir.path().join("out.txt");
    convert_bolt_to_mtag(&bolt, &lookup(), "t", 5, &out, &mut RunLog::disabled())
        .expect("convert");
    let (_, rows) = read_mtag(&out);
    assert_eq!(rows[0][7].parse::<f64>().expect("pval"), 0.001);

    let headers: Vec<String> = BOLT_HEADER.split('\t').map(str::to_string).collect();
    let cols = BoltColumns::resolve(&headers, "bolt").expect("columns");
    assert_eq!(cols.p, "P_BOLT_LMM");
}

#[test]
fn missing_p_value_column_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bolt = write_plain(
        &dir.path().join("bolt.stats"),
        &[
            "SNP\tCHR\tBP\tALLELE1\tALLELE0\tA1FREQ\tBETA\tSE\tP_LINREG",
            "1:1:A:G\t1\t1\tA\tG\t0.5\t0.3\t0.1\t0.001",
        ],
    );
    let out = dir.path().join("out.txt");
    let err = convert_bolt_to_mtag(&bolt, &lookup(), "t", 5, &out, &mut RunLog::disabled())
        .expect_err("no p column");
    assert!(matches!(
        err.downcast_ref::<MtagPrepError>(),
        Some(MtagPrepError::MissingColumn(_))
    ));
    assert!(!out.exists());
}

#[test]
fn missing_required_column_names_the_column() {
    let headers: Vec<String> = ["SNP", "CHR", "BP", "ALLELE1", "ALLELE0", "A1FREQ", "BETA", "P_BOLT_LMM"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let err = BoltColumns::resolve(&headers, "bolt.stats.gz").expect_err("SE missing");
    assert_eq!(err.to_string(), "missing column: SE in bolt.stats.gz");
}

#[test]
fn column_matching_ignores_case() {
    let headers: Vec<String> = ["snp", "chr", "bp", "Allele1", "Allele0", "a1freq", "beta", "se", "p_bolt_lmm"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let cols = BoltColumns::resolve(&headers, "x").expect("columns");
    assert_eq!(cols.allele1, "Allele1");
    assert_eq!(cols.p, "p_bolt_lmm");
}

#[test]
fn single_row_input_is_converted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bolt = write_gz(
        &dir.path().join("bolt.stats.gz"),
        &[
            BOLT_HEADER,
            &bolt_row("1:756604:A:G", "1", "756604", "G", "A", "0.3", "0.02", "0.01", "0.04", "0.05"),
        ],
    );
    let out = dir.path().join("out.txt");
    let report = convert_bolt_to_mtag(&bolt, &lookup(), "t", 42, &out, &mut RunLog::disabled())
        .expect("convert");

    let (header, rows) = read_mtag(&out);
    assert_eq!(header, MTAG_COLUMNS.to_vec());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "rs3131962");
    assert_eq!(rows[0][6].parse::<f64>().expect("z"), 2.0);
    assert_eq!(rows[0][8], "42");
    assert_eq!(report.rows_in, 1);
    assert_eq!(report.rows_emitted, 1);
    assert_eq!(report.rows_dropped, 0);
}

#[test]
fn filtering_down_to_one_row_still_converts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bolt = write_gz(
        &dir.path().join("bolt.stats.gz"),
        &[
            BOLT_HEADER,
            &bolt_row("1:1:A:G", "1", "1", "A", "G", "NA", "0.1", "0.05", "0.1", "0.1"),
            &bolt_row("1:2:A:G", "1", "2", "A", "G", "0.2", "0.1", "0.05", "0.1", "0.1"),
        ],
    );
    let out = dir.path().join("out.txt");
    let report = convert_bolt_to_mtag(&bolt, &lookup(), "t", 10, &out, &mut RunLog::disabled())
        .expect("convert");

    let (_, rows) = read_mtag(&out);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "1:2:A:G");
    assert_eq!(report.rows_emitted, 1);
    assert_eq!(report.rows_dropped, 1);
    assert_eq!(report.rows_emitted + report.rows_dropped, report.rows_in);
}

#[test]
fn p_values_below_f64_range_are_counted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bolt = write_gz(
        &dir.path().join("bolt.stats.gz"),
        &[
            BOLT_HEADER,
            &bolt_row("1:1:A:G", "1", "1", "A", "G", "0.2", "0.9", "0.01", "1e-300", "1.2E-350"),
            &bolt_row("1:2:A:G", "1", "2", "A", "G", "0.2", "0.1", "0.05", "0.1", "0"),
            &bolt_row("1:3:A:G", "1", "3", "A", "G", "0.2", "0.1", "0.05", "0.1", "0.3"),
        ],
    );
    let out = dir.path().join("out.txt");
    let report = convert_bolt_to_mtag(&bolt, &lookup(), "t", 10, &out, &mut RunLog::disabled())
        .expect("convert");

    let (_, rows) = read_mtag(&out);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][7].parse::<f64>().expect("pval"), 0.0);
    assert_eq!(report.p_underflow, 1);
}
