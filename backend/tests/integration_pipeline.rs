//! End-to-end tests of the public pipeline API on local files.

use levelgrid::{
    expand_csv_file, process_rows, read_csv_rows, to_features, write_csv_rows, Cell,
    CoordinatePolicy, TransformConfig,
};

fn sheet() -> Vec<Vec<String>> {
    let rows: Vec<Vec<&str>> = vec![
        vec![
            "date", "region", "city", "value_1", "value_2", "value_3", "value_4", "value_5",
            "value_6", "value_7", "value_8", "value_9", "value_10", "long", "lat",
        ],
        vec![
            "2024-01-01", "east", "metro", "3", "0", "2", "1", "0", "0", "0", "0", "0", "0",
            "40.1", "-73.9",
        ],
        vec![
            "2024-01-01", "west", "harbor", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0",
            "41,2", "-74,0",
        ],
        vec![
            "2024-01-02", "north", "ridge", "1", "?", "0", "0", "0", "0", "0", "0", "0", "0",
            "39.0", "-75.0",
        ],
        vec![
            "2024-01-02", "south", "delta", "0", "1", "0", "0", "0", "0", "0", "0", "0", "2",
            "n/a", "-76.5",
        ],
    ];
    rows.into_iter()
        .map(|r| r.into_iter().map(String::from).collect())
        .collect()
}

#[test]
fn batch_matches_expected_layout() {
    let batch = process_rows(&sheet(), &TransformConfig::default());

    assert_eq!(batch.source_rows, 4);
    assert_eq!(batch.skipped_rows(), vec![4]);
    assert_eq!(batch.dropped_empty, 1);

    let cells = batch.to_cells(true);
    // header + 3 levels (row 2) + 2 levels (row 5)
    assert_eq!(cells.len(), 6);
    assert!(cells.iter().all(|r| r.len() == 15));

    fn bits(row: &[Cell]) -> Vec<Cell> {
        row[3..13].to_vec()
    }
    fn ints(v: [i64; 10]) -> Vec<Cell> {
        v.into_iter().map(Cell::Int).collect()
    }
    assert_eq!(bits(&cells[1]), ints([1, 0, 1, 1, 0, 0, 0, 0, 0, 0]));
    assert_eq!(bits(&cells[2]), ints([1, 0, 1, 0, 0, 0, 0, 0, 0, 0]));
    assert_eq!(bits(&cells[3]), ints([1, 0, 0, 0, 0, 0, 0, 0, 0, 0]));
    assert_eq!(bits(&cells[4]), ints([0, 1, 0, 0, 0, 0, 0, 0, 0, 1]));
    assert_eq!(bits(&cells[5]), ints([0, 0, 0, 0, 0, 0, 0, 0, 0, 1]));

    assert_eq!(cells[4][13], Cell::Null);
    assert_eq!(cells[4][14], Cell::Number(-76.5));
}

#[test]
fn passthrough_keeps_raw_coordinates() {
    let config = TransformConfig::default().with_coordinate_policy(CoordinatePolicy::Passthrough);
    let batch = process_rows(&sheet(), &config);

    let last = batch.rows.last().unwrap();
    assert_eq!(last.coordinates, vec![Cell::from("n/a"), Cell::from("-76.5")]);
}

#[test]
fn gis_features_exclude_header() {
    let batch = process_rows(&sheet(), &TransformConfig::default());
    let features = to_features(&batch.to_cells(false));

    assert_eq!(features.len(), 5);
    assert_eq!(features[0].attributes["city"], "metro");
    assert_eq!(features[0].geometry.x, serde_json::json!(40.1));
    assert_eq!(features[0].geometry.y, serde_json::json!(-73.9));
}

#[test]
fn csv_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.csv");
    let output = dir.path().join("output.csv");

    let raw: Vec<Vec<Cell>> = sheet()
        .into_iter()
        .map(|r| r.into_iter().map(Cell::Text).collect())
        .collect();
    write_csv_rows(std::fs::File::create(&input).unwrap(), &raw, ',').unwrap();

    let (batch, info) = expand_csv_file(&input, &TransformConfig::default()).unwrap();
    assert_eq!(info.row_count, 5);
    assert_eq!(batch.rows.len(), 5);

    write_csv_rows(std::fs::File::create(&output).unwrap(), &batch.to_cells(true), ',').unwrap();
    let written = read_csv_rows(&output).unwrap();

    assert_eq!(written.rows.len(), 6);
    assert_eq!(written.rows[0][0], "date");
    assert_eq!(written.rows[1][13], "40.1");
    assert_eq!(written.rows[4][13], "");
}
