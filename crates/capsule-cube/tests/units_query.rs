//! Component queries against real parquet fixtures written by `DuckDB`.

use std::path::Path;

use capsule_cube::{CubeError, Datacube, DatacubeLocator};
use duckdb::Connection;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use tempfile::TempDir;

/// Lay out `<root>/dynamicrouting_datacube_v1/consolidated/units.parquet`.
fn write_units_fixture(root: &Path) {
    let consolidated = root.join("dynamicrouting_datacube_v1").join("consolidated");
    std::fs::create_dir_all(&consolidated).expect("create consolidated dir");
    let path = consolidated.join("units.parquet");

    let conn = Connection::open_in_memory().expect("fixture connection");
    conn.execute_batch(&format!(
        "COPY (
            SELECT session_id, structure, location, CAST(activity_drift AS DOUBLE) AS activity_drift
            FROM (VALUES
                ('S1', 'MOp',  'A', 0.30),
                ('S1', 'MOp',  'B', -0.10),
                ('S1', 'MOp',  'C', 0.05),
                ('S1', 'MOp',  'D', 0.90),
                ('S1', 'MOp',  'E', NULL),
                ('S1', 'VISp', 'F', 0.20),
                ('S2', 'MOp',  'G', 0.40)
            ) AS t(session_id, structure, location, activity_drift)
        ) TO '{}' (FORMAT PARQUET)",
        path.display()
    ))
    .expect("write units parquet");
}

fn open_cube(temp: &TempDir) -> Datacube {
    write_units_fixture(temp.path());
    Datacube::open(DatacubeLocator::new([temp.path()])).expect("open cube")
}

#[test]
fn filter_counts_matching_rows() {
    let temp = TempDir::new().unwrap();
    let cube = open_cube(&temp);

    let count = cube
        .component("units")
        .unwrap()
        .filter_eq("session_id", "S1")
        .filter_eq("structure", "MOp")
        .count()
        .expect("count");

    assert_eq!(count, 5);
}

#[test]
fn full_sample_is_sorted_with_nulls_last() {
    let temp = TempDir::new().unwrap();
    let cube = open_cube(&temp);

    let frame = cube
        .component("units")
        .unwrap()
        .filter_eq("session_id", "S1")
        .filter_eq("structure", "MOp")
        .sample(5)
        .sort_by("activity_drift")
        .select(["location", "activity_drift"])
        .collect()
        .expect("collect");

    assert_eq!(frame.columns, ["location", "activity_drift"]);
    let locations: Vec<_> = frame.column("location").unwrap().into_iter().cloned().collect();
    assert_eq!(
        locations,
        vec![json!("B"), json!("C"), json!("A"), json!("D"), json!("E")]
    );
    assert_eq!(frame.rows[4][1], json!(null));
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(4)]
fn partial_sample_has_requested_size_and_order(#[case] n: usize) {
    let temp = TempDir::new().unwrap();
    let cube = open_cube(&temp);

    let frame = cube
        .component("units")
        .unwrap()
        .filter_eq("session_id", "S1")
        .filter_eq("structure", "MOp")
        .sample(n)
        .sort_by("activity_drift")
        .select(["location", "activity_drift"])
        .collect()
        .expect("collect");

    assert_eq!(frame.len(), n);

    let drifts: Vec<Option<f64>> = frame
        .column("activity_drift")
        .unwrap()
        .into_iter()
        .map(serde_json::Value::as_f64)
        .collect();
    let present: Vec<f64> = drifts.iter().flatten().copied().collect();
    assert!(present.windows(2).all(|w| w[0] <= w[1]), "sorted: {drifts:?}");
    // nulls only at the tail
    let first_null = drifts.iter().position(Option::is_none).unwrap_or(drifts.len());
    assert!(drifts[first_null..].iter().all(Option::is_none));

    for location in frame.column("location").unwrap() {
        assert!(["A", "B", "C", "D", "E"].contains(&location.as_str().unwrap()));
    }
}

#[test]
fn oversized_sample_is_rejected() {
    let temp = TempDir::new().unwrap();
    let cube = open_cube(&temp);

    let error = cube
        .component("units")
        .unwrap()
        .filter_eq("session_id", "S1")
        .filter_eq("structure", "VISp")
        .sample(2)
        .collect()
        .unwrap_err();

    assert!(matches!(
        error,
        CubeError::SampleTooLarge {
            requested: 2,
            available: 1
        }
    ));
}

#[test]
fn zero_sample_is_rejected() {
    let temp = TempDir::new().unwrap();
    let cube = open_cube(&temp);

    let error = cube.component("units").unwrap().sample(0).collect().unwrap_err();
    assert!(matches!(error, CubeError::SampleTooLarge { requested: 0, .. }));
}

#[test]
fn unfiltered_frame_has_all_source_columns() {
    let temp = TempDir::new().unwrap();
    let cube = open_cube(&temp);

    let frame = cube.frame("units").expect("frame");
    assert_eq!(
        frame.columns,
        ["session_id", "structure", "location", "activity_drift"]
    );
    assert_eq!(frame.len(), 7);
}

#[test]
fn missing_component_is_reported() {
    let temp = TempDir::new().unwrap();
    let cube = open_cube(&temp);

    let error = cube.component("trials").map(|_| ()).unwrap_err();
    assert!(matches!(
        error,
        CubeError::ComponentNotFound { component, .. } if component == "trials"
    ));
}
