mod common;

use chrono::NaiveDate;
use common::{column, dataset};
use scan_enrich::config::PipelineConfig;
use scan_enrich::dataset::Dataset;
use scan_enrich::error::ConfigError;
use scan_enrich::lookup::{MemoryReferences, LookupStatus};
use scan_enrich::pipeline::Pipeline;
use scan_enrich::report::SUMMARY_HEADERS;

const CONFIG: &str = r#"
columns: [App ID, Status, Severity, Scan Date]
drop_empty_rows: true
inject:
  - { name: Reviewer, value: Security Team }
  - { name: Remarks }
lookups:
  - target_column: Owner
    match_column: App ID
    reference: owners.csv
    key_column: Application ID
    value_column: App Owner
  - target_column: Location
    match_column: App ID
    reference: locations.csv
    key_column: Application ID
    value_column: Site
age: { date_column: Scan Date, target_column: Age }
classification:
  category_column: Severity
  label_column: Lifecycle
  rules:
    - { kind: threshold, category: Critical, column: Age, threshold: 30, above: Out of SLO, at_or_below: Ignore }
    - { kind: threshold, category: High, column: Age, threshold: 60, above: Out of SLO, at_or_below: Ignore }
    - { kind: threshold, category: Low, column: Age, threshold: 0, above: Ignore, at_or_below: Ignore, always_above: true }
    - { kind: keyword, column: Status, keyword: Outdated, value: EOL }
remap:
  source_column: Lifecycle
  target_column: SLO Breach
  values: { EOL: EOL, Out of SLO: 1, Ignore: 0 }
"#;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
}

fn input() -> Dataset {
    dataset(
        &["App ID", "Notes", "Status", "Severity", "Scan Date"],
        &[
            &["A1", "n", "Active", "Critical", "2025-05-21"],
            &["A2", "n", "Outdated System", "Low", "2025-06-29"],
            &["", "only notes", "", "", ""],
            &["A3", "n", "Active", "High", "2025-06-20 10:00:00"],
            &["A4", "n", "Active", "Informational", "bad date"],
        ],
    )
}

fn references() -> MemoryReferences {
    MemoryReferences::new().with(
        "owners.csv",
        dataset(
            &["Application ID", "App Owner"],
            &[&["A1", "Alice"], &["A2", "Bob"], &["A3", "Carol"]],
        ),
    )
}

fn pipeline() -> Pipeline {
    Pipeline::new(PipelineConfig::from_yaml_str(CONFIG).expect("config")).expect("pipeline")
}

#[test]
fn full_run_produces_classified_output() {
    let output = pipeline().run(&input(), &references(), today()).expect("run");
    let data = &output.dataset;

    assert_eq!(
        data.headers(),
        [
            "Reviewer",
            "Remarks",
            "App ID",
            "Status",
            "Severity",
            "Scan Date",
            "Owner",
            "Location",
            "Age",
            "Lifecycle",
            "SLO Breach",
        ]
    );
    assert_eq!(data.len(), 4);
    assert_eq!(column(data, "Reviewer"), ["Security Team"; 4]);
    assert_eq!(column(data, "Owner"), ["Alice", "Bob", "Carol", "ID not found"]);
    assert_eq!(column(data, "Location"), ["", "", "", ""]);
    assert_eq!(column(data, "Scan Date"), ["2025-05-21", "2025-06-29", "2025-06-20", "bad date"]);
    assert_eq!(column(data, "Age"), ["40", "1", "10", ""]);
    assert_eq!(column(data, "Lifecycle"), ["Out of SLO", "EOL", "Ignore", ""]);
    assert_eq!(column(data, "SLO Breach"), ["1", "EOL", "0", ""]);

    assert_eq!(output.report.input_rows, 5);
    assert_eq!(output.report.output_rows, 4);
    assert_eq!(output.report.projection.rows_dropped, 1);
    assert!(output.report.projection.missing_columns.is_empty());
}

#[test]
fn unmatched_export_reflects_state_after_lookups() {
    let output = pipeline().run(&input(), &references(), today()).expect("run");

    assert_eq!(output.unmatched.len(), 1);
    assert_eq!(output.unmatched.value(0, "App ID"), Some("A4"));
    assert_eq!(output.unmatched.value(0, "Owner"), Some("ID not found"));
    assert!(!output.unmatched.has_column("Age"));
    assert!(!output.unmatched.has_column("Lifecycle"));
}

#[test]
fn summary_lists_every_lookup_including_skipped_ones() {
    let output = pipeline().run(&input(), &references(), today()).expect("run");
    let summary = &output.summary;

    assert_eq!(summary.headers(), SUMMARY_HEADERS);
    assert_eq!(
        summary.row(0).expect("owner row"),
        ["Owner", "App ID", "owners.csv", "3", "1", "applied"]
    );
    let skipped = summary.row(1).expect("location row");
    assert_eq!(skipped[0], "Location");
    assert_eq!(skipped[3], "0");
    assert!(skipped[5].starts_with("skipped"));
    assert_eq!(output.lookups.summaries[0].status, LookupStatus::Applied);
    assert!(output.lookups.summaries[1].is_skipped());
}

#[test]
fn empty_config_passes_input_through() {
    let pipeline = Pipeline::new(PipelineConfig::default()).expect("pipeline");
    let output = pipeline
        .run(&input(), &MemoryReferences::new(), today())
        .expect("run");
    assert_eq!(output.dataset, input());
    assert!(output.unmatched.is_empty());
    assert!(output.summary.is_empty());
}

#[test]
fn config_round_trips_through_yaml() {
    let config = PipelineConfig::from_yaml_str(CONFIG).expect("config");
    let yaml = config.to_yaml_string().expect("serialize");
    assert_eq!(PipelineConfig::from_yaml_str(&yaml).expect("reparse"), config);
}

fn config_error(raw: &str) -> ConfigError {
    let err = PipelineConfig::from_yaml_str(raw).expect_err("config should be rejected");
    err.downcast_ref::<ConfigError>()
        .cloned()
        .unwrap_or_else(|| panic!("unexpected error: {err:#}"))
}

#[test]
fn duplicate_threshold_category_is_rejected() {
    let err = config_error(
        r#"
classification:
  category_column: Severity
  label_column: Lifecycle
  rules:
    - { kind: threshold, category: High, column: Age, threshold: 60, above: a, at_or_below: b }
    - { kind: threshold, category: HIGH, column: Age, threshold: 90, above: a, at_or_below: b }
"#,
    );
    assert_eq!(
        err,
        ConfigError::DuplicateCategory {
            category: "HIGH".into()
        }
    );
}

#[test]
fn blank_lookup_field_is_rejected() {
    let err = config_error(
        r#"
lookups:
  - { target_column: Owner, match_column: App ID, reference: '', key_column: k, value_column: v }
"#,
    );
    assert_eq!(
        err,
        ConfigError::EmptyLookupField {
            index: 1,
            field: "reference"
        }
    );
}

#[test]
fn unknown_top_level_keys_fail_to_parse() {
    let err = PipelineConfig::from_yaml_str("colums: [a]\n").expect_err("typo rejected");
    assert!(err.downcast_ref::<ConfigError>().is_none());
    assert!(format!("{err:#}").contains("colums"));
}

fn parse_error(raw: &str) -> String {
    let err = PipelineConfig::from_yaml_str(raw).expect_err("config should be rejected");
    assert!(err.downcast_ref::<ConfigError>().is_none());
    format!("{err:#}")
}

#[test]
fn misspelled_threshold_flag_fails_to_parse() {
    let message = parse_error(
        r#"
classification:
  category_column: Severity
  label_column: Lifecycle
  rules:
    - { kind: threshold, category: Low, column: Age, threshold: 0, above: Ignore, at_or_below: Ignore, always_abov: true }
"#,
    );
    assert!(message.contains("always_abov"), "{message}");
}

#[test]
fn misspelled_remap_values_fail_to_parse() {
    let message = parse_error(
        r#"
remap:
  source_column: Lifecycle
  value: { EOL: EOL }
"#,
    );
    assert!(message.contains("unknown field `value`"), "{message}");
}

#[test]
fn misspelled_nested_keys_fail_to_parse() {
    let lookup = parse_error(
        r#"
lookups:
  - { target_column: Owner, match_column: App ID, reference: o.csv, key_column: k, value_colum: v }
"#,
    );
    assert!(lookup.contains("value_colum"), "{lookup}");

    let age = parse_error("age: { date_column: Scan Date, target_column: Age, dayfirst: true }\n");
    assert!(age.contains("dayfirst"), "{age}");

    let inject = parse_error("inject:\n  - { name: Reviewer, vaule: x }\n");
    assert!(inject.contains("vaule"), "{inject}");
}

#[test]
fn remap_config_accepts_values_and_default() {
    let config = PipelineConfig::from_yaml_str(
        "remap: { source_column: Lifecycle, values: { EOL: 1 }, default: 0 }\n",
    )
    .expect("config");
    let table = config.remap.expect("remap").table();
    assert_eq!(table.resolve("EOL"), "1");
    assert_eq!(table.resolve("other"), "0");
}
