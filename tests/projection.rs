mod common;

use common::{column, dataset};
use proptest::prelude::*;
use scan_enrich::dataset::Dataset;
use scan_enrich::projection::project;

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn project_keeps_requested_order_and_skips_missing_columns() {
    let input = dataset(
        &["App ID", "Owner", "Severity", "Notes"],
        &[&["A1", "alice", "High", "x"], &["A2", "bob", "Low", "y"]],
    );
    let (projected, report) = project(&input, &names(&["Severity", "Ghost", "App ID"]), false);

    assert_eq!(projected.headers(), ["Severity", "App ID"]);
    assert_eq!(column(&projected, "App ID"), ["A1", "A2"]);
    assert_eq!(report.missing_columns, ["Ghost"]);
    assert_eq!(report.rows_dropped, 0);
}

#[test]
fn project_drops_rows_blank_in_every_retained_column() {
    let input = dataset(
        &["App ID", "Severity", "Notes"],
        &[
            &["A1", "High", ""],
            &["", "", "only notes"],
            &["", "  ", ""],
            &["A4", "", ""],
        ],
    );
    let (projected, report) = project(&input, &names(&["App ID", "Severity"]), true);

    assert_eq!(report.rows_dropped, 2);
    assert_eq!(column(&projected, "App ID"), ["A1", "A4"]);
}

#[test]
fn project_with_empty_column_list_keeps_everything() {
    let input = dataset(&["a", "b"], &[&["1", "2"], &["", ""]]);
    let (projected, report) = project(&input, &[], false);
    assert_eq!(projected, input);
    assert!(report.missing_columns.is_empty());

    let (dropped, report) = project(&input, &[], true);
    assert_eq!(dropped.len(), 1);
    assert_eq!(report.rows_dropped, 1);
}

#[test]
fn project_with_no_matching_columns_is_not_an_error() {
    let input = dataset(&["a"], &[&["1"]]);
    let (projected, report) = project(&input, &names(&["x", "y"]), false);
    assert!(projected.headers().is_empty());
    assert_eq!(projected.len(), 1);
    assert_eq!(report.missing_columns, ["x", "y"]);
}

fn arb_dataset() -> impl Strategy<Value = Dataset> {
    (1usize..5).prop_flat_map(|width| {
        let headers = (0..width).map(|i| format!("c{i}")).collect::<Vec<_>>();
        proptest::collection::vec(
            proptest::collection::vec(prop_oneof![Just(String::new()), "[a-z]{1,3}"], width),
            0..12,
        )
        .prop_map(move |rows| Dataset::from_rows(headers.clone(), rows))
    })
}

fn arb_request() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("c[0-6]", 0..6)
}

proptest! {
    #[test]
    fn projecting_twice_equals_projecting_once(
        input in arb_dataset(),
        request in arb_request(),
        drop_empty in any::<bool>(),
    ) {
        let (once, _) = project(&input, &request, drop_empty);
        let (twice, second) = project(&once, &request, drop_empty);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(second.rows_dropped, 0);
    }

    #[test]
    fn projection_never_adds_rows_and_only_drops_when_asked(
        input in arb_dataset(),
        request in arb_request(),
        drop_empty in any::<bool>(),
    ) {
        let (projected, report) = project(&input, &request, drop_empty);
        prop_assert!(projected.len() <= input.len());
        prop_assert_eq!(projected.len() + report.rows_dropped, input.len());
        if !drop_empty {
            prop_assert_eq!(projected.len(), input.len());
        }
    }
}
