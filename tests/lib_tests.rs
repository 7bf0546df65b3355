mod common;

use appsload::engine::{ShardRoute, decode, encode, judge, marked_path_for, parse_line};
use appsload::utils::config::ErrorBudget;
use appsload::{
    AppsFallback, BudgetBoundary, LoadCounters, ParseError, RouteError, Verdict,
};
use common::{GAID_ADDR, IDFA_ADDR, record, test_routes};
use std::path::PathBuf;

fn parse(line: &str) -> Result<appsload::InstallRecord, ParseError> {
    parse_line(line.as_bytes(), AppsFallback::KeepNumeric)
}

// --- parse_line ---

#[test]
fn test_parse_valid_line() {
    let rec = parse("idfa\t1rfw452y52g2gq4g\t55.55\t42.42\t1423,43,567,3,7,23").unwrap();
    assert_eq!(
        rec,
        record("idfa", "1rfw452y52g2gq4g", 55.55, 42.42, &[1423, 43, 567, 3, 7, 23])
    );
}

#[test]
fn test_parse_trims_line_and_entries() {
    let rec = parse("gaid\tabc\t1.5\t-2.5\t 7, 8 ,9\r\n").unwrap();
    assert_eq!(rec.apps, vec![7, 8, 9]);
    assert_eq!((rec.lat, rec.lon), (1.5, -2.5));
}

#[test]
fn test_parse_bad_coordinate_defaults_to_zero() {
    let rec = parse("idfa\tdev\tnorth\t42.42\t1,2").unwrap();
    assert_eq!((rec.lat, rec.lon), (0.0, 0.0));
    assert_eq!(rec.apps, vec![1, 2]);

    let rec = parse("idfa\tdev\t55.55\t\t1").unwrap();
    assert_eq!((rec.lat, rec.lon), (0.0, 0.0));
}

#[test]
fn test_parse_non_finite_coordinate_defaults_to_zero() {
    for line in [
        "idfa\tdev\tnan\t42.42\t1",
        "idfa\tdev\t55.55\tinf\t1",
        "idfa\tdev\t-inf\tNaN\t1",
    ] {
        let rec = parse(line).unwrap();
        assert_eq!((rec.lat, rec.lon), (0.0, 0.0), "{line}");
        assert_eq!(decode(&rec.key(), &encode(&rec)).unwrap(), rec);
    }
}

#[test]
fn test_parse_too_few_fields() {
    assert_eq!(
        parse("idfa\tdev\t55.55\t42.42"),
        Err(ParseError::MalformedLine { found: 4 })
    );
    assert_eq!(parse("garbage"), Err(ParseError::MalformedLine { found: 1 }));
}

#[test]
fn test_parse_too_many_fields() {
    assert_eq!(
        parse("idfa\tdev\t1\t2\t3\textra"),
        Err(ParseError::MalformedLine { found: 6 })
    );
}

#[test]
fn test_parse_missing_identity() {
    assert_eq!(parse("idfa\t\t1\t2\t3"), Err(ParseError::MissingIdentity));
    // The whole line is trimmed first, so a leading empty field disappears.
    assert_eq!(
        parse("\tdev\t1\t2\t3"),
        Err(ParseError::MalformedLine { found: 4 })
    );
}

#[test]
fn test_parse_invalid_utf8() {
    let line = b"idfa\t\xff\xfe\t1\t2\t3";
    assert_eq!(
        parse_line(line, AppsFallback::KeepNumeric),
        Err(ParseError::Encoding)
    );
}

#[test]
fn test_parse_apps_keeps_numeric_entries() {
    let rec = parse("idfa\tdev\t1\t2\t10,abc,20,,-3").unwrap();
    assert_eq!(rec.apps, vec![10, 20]);
}

#[test]
fn test_parse_apps_drop_all_fallback() {
    let rec = parse_line(b"idfa\tdev\t1\t2\t10,abc,20", AppsFallback::DropAll).unwrap();
    assert!(rec.apps.is_empty());
    let rec = parse_line(b"idfa\tdev\t1\t2\t10,20", AppsFallback::DropAll).unwrap();
    assert_eq!(rec.apps, vec![10, 20]);
}

// --- wire format ---

#[test]
fn test_wire_round_trip() {
    let records = [
        record("idfa", "1rfw452y52g2gq4g", 55.55, 42.42, &[1423, 43, 567, 3, 7, 23]),
        record("gaid", "7rfw452y52g2gq4g", -0.5, 180.0, &[7423, 424, 424]),
        record("dvid", "x", 0.0, 0.0, &[]),
    ];
    for rec in records {
        let back = decode(&rec.key(), &encode(&rec)).unwrap();
        assert_eq!(back, rec);
    }
}

#[test]
fn test_wire_bytes_match_proto2_layout() {
    let rec = record("idfa", "d", 0.5, 0.0, &[1, 2]);
    let mut expected = vec![0x08, 1, 0x08, 2, 0x11];
    expected.extend_from_slice(&0.5_f64.to_le_bytes());
    expected.push(0x19);
    expected.extend_from_slice(&0.0_f64.to_le_bytes());
    assert_eq!(encode(&rec), expected);
}

#[test]
fn test_decode_rejects_bad_key() {
    let rec = record("idfa", "d", 1.0, 1.0, &[1]);
    assert!(decode("no-colon", &encode(&rec)).is_err());
}

// --- routing ---

#[test]
fn test_route_known_device() {
    let routes = test_routes();
    let rec = record("gaid", "dev42", 1.0, 2.0, &[5]);
    let write = routes.route(&rec).unwrap();
    assert_eq!(write.shard, "gaid");
    assert_eq!(write.addr, GAID_ADDR);
    assert_eq!(write.key, "gaid:dev42");
    assert_eq!(decode(&write.key, &write.payload).unwrap(), rec);
}

#[test]
fn test_route_unknown_device() {
    let routes = test_routes();
    let rec = record("adid", "dev", 1.0, 2.0, &[5]);
    assert_eq!(
        routes.route(&rec),
        Err(RouteError::UnknownDeviceType {
            device_type: "adid".to_string()
        })
    );
}

#[test]
fn test_default_routes_cover_four_device_types() {
    let routes = ShardRoute::default();
    for dev in ["idfa", "gaid", "adid", "dvid"] {
        assert!(routes.addr_for(dev).is_some(), "{dev} has no shard");
    }
    assert_eq!(routes.len(), 4);
    assert_eq!(test_routes().addr_for("idfa"), Some(IDFA_ADDR));
}

// --- error budget ---

fn counters(processed: u64, write_errors: u64) -> LoadCounters {
    LoadCounters {
        processed,
        write_errors,
        ..LoadCounters::default()
    }
}

fn budget(boundary: BudgetBoundary) -> ErrorBudget {
    ErrorBudget {
        max_rate: 0.01,
        boundary,
    }
}

#[test]
fn test_error_rate_counts_all_error_kinds() {
    let c = LoadCounters {
        processed: 6,
        parse_errors: 2,
        route_errors: 1,
        write_errors: 1,
    };
    assert_eq!(c.errors(), 4);
    assert_eq!(c.error_rate(), 0.4);
    assert_eq!(LoadCounters::default().error_rate(), 0.0);
}

#[test]
fn test_budget_boundary_inclusive() {
    assert_eq!(counters(99, 1).error_rate(), 0.01);
    assert_eq!(
        judge(&counters(99, 1), &budget(BudgetBoundary::Inclusive)),
        Verdict::Accepted
    );
    assert_eq!(
        judge(&counters(98, 2), &budget(BudgetBoundary::Inclusive)),
        Verdict::Rejected
    );
}

#[test]
fn test_budget_boundary_exclusive() {
    assert_eq!(
        judge(&counters(99, 1), &budget(BudgetBoundary::Exclusive)),
        Verdict::Rejected
    );
    assert_eq!(
        judge(&counters(98, 2), &budget(BudgetBoundary::Exclusive)),
        Verdict::Rejected
    );
    assert_eq!(
        judge(&counters(1000, 1), &budget(BudgetBoundary::Exclusive)),
        Verdict::Accepted
    );
}

#[test]
fn test_budget_empty_file_is_accepted() {
    assert_eq!(
        judge(&LoadCounters::default(), &ErrorBudget::default()),
        Verdict::Accepted
    );
}

#[test]
fn test_counters_merge() {
    let mut a = counters(3, 1);
    a.merge(&LoadCounters {
        processed: 2,
        parse_errors: 5,
        route_errors: 0,
        write_errors: 0,
    });
    assert_eq!(a.processed, 5);
    assert_eq!(a.parse_errors, 5);
    assert_eq!(a.write_errors, 1);
}

// --- completion marking ---

#[test]
fn test_marked_path_for_prefixes_file_name() {
    let path = PathBuf::from("/data/appsinstalled/20170929000000.tsv.gz");
    assert_eq!(
        marked_path_for(&path, ".").unwrap(),
        PathBuf::from("/data/appsinstalled/.20170929000000.tsv.gz")
    );
    assert_eq!(
        marked_path_for(&path, ".rejected.").unwrap(),
        PathBuf::from("/data/appsinstalled/.rejected.20170929000000.tsv.gz")
    );
}

#[test]
fn test_self_check_passes() {
    appsload::engine::wire::self_check().unwrap();
}

#[test]
fn test_discover_skips_marked_files_and_dirs() {
    let dir = common::scratch_dir();
    common::write_gz(dir.path(), "b.tsv.gz", &["idfa\td\t1\t2\t3"]);
    common::write_gz(dir.path(), "a.tsv.gz", &["idfa\td\t1\t2\t3"]);
    common::write_gz(dir.path(), ".c.tsv.gz", &["idfa\td\t1\t2\t3"]);
    std::fs::create_dir(dir.path().join("d.tsv.gz")).unwrap();

    let pattern = format!("{}/*.tsv.gz", dir.path().display());
    let found = appsload::engine::discover_files(&pattern).unwrap();
    assert_eq!(
        found,
        vec![dir.path().join("a.tsv.gz"), dir.path().join("b.tsv.gz")]
    );
}

#[test]
fn test_discover_invalid_pattern() {
    assert!(appsload::engine::discover_files("/tmp/[unclosed").is_err());
}

#[test]
fn test_mark_file_renames_in_place() {
    let dir = common::scratch_dir();
    let path = common::write_gz(dir.path(), "x.tsv.gz", &["idfa\td\t1\t2\t3"]);
    let marked = appsload::engine::mark_file(&path, ".").unwrap();
    assert_eq!(marked, dir.path().join(".x.tsv.gz"));
    assert!(marked.exists());
    assert!(!path.exists());
    // Marking a file that is already gone fails instead of clobbering anything.
    assert!(appsload::engine::mark_file(&path, ".").is_err());
}
