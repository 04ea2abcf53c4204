//! Tests for M3: Frame Selection
//! Covers TC-3.1, TC-3.2, TC-3.3, TC-3.4
//!
//! Run individual tests with:
//! cargo test tc_3_1 -- --nocapture
//! cargo test m3_frame_selection -- --nocapture

use rframe::{
    ColumnType, Document, Frame, FrameError, IndexDescriptor, Label, Labels, MemoryCollection, TableSchema,
};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

fn schema() -> TableSchema {
    TableSchema::new("pmt_gains")
        .index(IndexDescriptor::value("detector"))
        .index(IndexDescriptor::interpolating("pmt"))
        .index(IndexDescriptor::interval("time"))
        .typed_column("gain", ColumnType::Number)
        .column("comments")
}

fn rows() -> Vec<Document> {
    let mut rows = Vec::new();
    for (i, detector) in ["tpc", "nveto"].iter().enumerate() {
        for pmt in 0..3 {
            for (left, right) in [(0, 100), (100, 200)] {
                rows.push(doc(json!({
                    "_id": format!("{detector}-{pmt}-{left}"),
                    "detector": detector,
                    "pmt": pmt,
                    "time": {"left": left, "right": right},
                    "gain": (i * 100 + pmt * 10) as f64 + left as f64 / 100.0,
                })));
            }
        }
    }
    rows.reverse();
    rows
}

fn setup_frame() -> Frame {
    let collection = Arc::new(MemoryCollection::from_documents("pmt_gains", rows()));
    Frame::from_collection(Arc::new(schema()), collection).unwrap()
}

mod tc_3_1_selection {
    use super::*;

    #[test]
    fn test_unconstrained_returns_all_sorted() {
        let frame = setup_frame();
        let records = frame.sel(&Labels::new()).unwrap();
        assert_eq!(records.len(), 12);

        let keys: Vec<(String, i64, i64)> = records
            .iter()
            .map(|r| {
                (
                    r["detector"].as_str().unwrap().to_string(),
                    r["pmt"].as_i64().unwrap(),
                    r["time"]["left"].as_i64().unwrap(),
                )
            })
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_records_have_declared_shape() {
        let frame = setup_frame();
        let record = frame.sel_record(&Labels::new().arg("tpc").arg(1).arg(150)).unwrap();
        let keys: Vec<&str> = record.keys().map(|k| k.as_str()).collect();
        // no _id, no absent comments
        assert_eq!(keys, vec!["detector", "pmt", "time", "gain"]);
        assert_eq!(record["gain"], 11.0);
    }

    #[test]
    fn test_positional_and_named_labels() {
        let frame = setup_frame();
        let by_position = frame.sel(&Labels::new().arg("nveto").arg(2)).unwrap();
        let by_name = frame.sel(&Labels::new().named("pmt", 2).named("detector", "nveto")).unwrap();
        assert_eq!(by_position, by_name);
        assert_eq!(by_position.len(), 2);

        let overridden = frame.sel(&Labels::new().arg("tpc").named("detector", "nveto")).unwrap();
        assert!(overridden.iter().all(|r| r["detector"] == "nveto"));
    }

    #[test]
    fn test_surplus_positional_labels_are_ignored() {
        let frame = setup_frame();
        let records = frame.sel(&Labels::new().arg("tpc").arg(0).arg(50).arg("extra")).unwrap();
        assert_eq!(records.len(), 1);
    }
}

mod tc_3_2_label_shapes {
    use super::*;

    #[test]
    fn test_lists_and_ranges_on_value_index() {
        let frame = setup_frame();
        let listed = frame.sel(&Labels::new().arg("tpc").arg(vec![0, 2])).unwrap();
        assert_eq!(listed.len(), 4);

        let ranged = frame.sel(&Labels::new().arg("tpc").arg(1..3)).unwrap();
        assert!(ranged.iter().all(|r| r["pmt"] != 0));
        assert_eq!(ranged.len(), 4);
    }

    #[test]
    fn test_interval_overlap_and_points() {
        let frame = setup_frame();
        let labels = |t: Label| Labels::new().arg("tpc").arg(0).arg(t);

        assert_eq!(frame.sel(&labels(Label::from((50, 150)))).unwrap().len(), 2);
        assert_eq!(frame.sel(&labels(Label::from((0, 100)))).unwrap().len(), 1);
        // right bound is exclusive for points
        let at_edge = frame.sel(&labels(Label::from(100))).unwrap();
        assert_eq!(at_edge.len(), 1);
        assert_eq!(at_edge[0]["time"]["left"], 100);
        assert_eq!(frame.sel(&labels(Label::from(250))).unwrap().len(), 0);
        assert_eq!(frame.sel(&labels(Label::from(150..))).unwrap().len(), 1);
    }

    #[test]
    fn test_interval_sequence() {
        let frame = setup_frame();
        let t = Label::List(vec![Label::from(10), Label::from(110)]);
        assert_eq!(frame.sel(&Labels::new().arg("tpc").arg(0).arg(t)).unwrap().len(), 2);
        let none = Label::List(Vec::new());
        assert_eq!(frame.sel(&Labels::new().arg(Label::Any).arg(Label::Any).arg(none)).unwrap().len(), 0);
    }

    #[test]
    fn test_named_column_filter() {
        let frame = setup_frame();
        let records = frame.sel(&Labels::new().named("gain", 101.0)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["detector"], "nveto");
    }

    #[test]
    fn test_unknown_named_label_is_column_not_found() {
        let frame = setup_frame();
        let err = frame.sel(&Labels::new().named("voltage", 1)).unwrap_err();
        match err {
            FrameError::ColumnNotFound { column, columns } => {
                assert_eq!(column, "voltage");
                assert_eq!(columns, vec!["gain", "comments"]);
            }
            other => panic!("unexpected error {other}"),
        }
    }
}

mod tc_3_3_aggregates {
    use super::*;

    #[test]
    fn test_head_unique_min_max() {
        let frame = setup_frame();
        assert_eq!(frame.head(3).unwrap().len(), 3);
        assert_eq!(frame.unique("detector").unwrap(), vec![json!("nveto"), json!("tpc")]);
        assert_eq!(frame.unique("pmt").unwrap(), vec![json!(0), json!(1), json!(2)]);
        assert_eq!(frame.min("gain").unwrap(), Some(json!(0.0)));
        assert_eq!(frame.max("gain").unwrap(), Some(json!(121.0)));
        assert_eq!(frame.max("comments").unwrap(), None);
    }

    #[test]
    fn test_column_view() {
        let frame = setup_frame();
        let gain = frame.column("gain").unwrap();
        let values = gain.sel_values(&Labels::new().arg("tpc").arg(2)).unwrap();
        assert_eq!(values, vec![json!(20.0), json!(21.0)]);

        let projected = gain.sel(&Labels::new().arg("tpc").arg(2).arg(5)).unwrap();
        assert_eq!(projected, vec![doc(json!({"detector": "tpc", "pmt": 2, "time": {"left": 0, "right": 100}, "gain": 20.0}))]);

        assert!(matches!(gain.sel_value(&Labels::new().arg("muveto")), Err(FrameError::EmptySelection)));
        assert_eq!(gain.min().unwrap(), Some(json!(0.0)));
        assert!(matches!(frame.column("voltage"), Err(FrameError::ColumnNotFound { .. })));
    }

    #[test]
    fn test_unique_keeps_values_with_equal_sort_keys() {
        let schema = TableSchema::new("flags")
            .index(IndexDescriptor::value("run"))
            .index(IndexDescriptor::interval("time"))
            .column("v");
        let collection = MemoryCollection::from_documents(
            "flags",
            vec![
                doc(json!({"run": 1, "time": {"left": 0, "right": 10}, "v": true})),
                doc(json!({"run": 2, "time": {"left": 0, "right": 5}, "v": 1})),
                doc(json!({"run": 3, "time": {"left": 0, "right": 10}, "v": true})),
            ],
        );
        let frame = Frame::from_collection(Arc::new(schema), Arc::new(collection)).unwrap();

        let times = frame.unique("time").unwrap();
        assert_eq!(times.len(), 2);
        assert!(times.contains(&json!({"left": 0, "right": 10})));
        assert!(times.contains(&json!({"left": 0, "right": 5})));

        let flags = frame.unique("v").unwrap();
        assert_eq!(flags.len(), 2);
        assert!(flags.contains(&json!(true)) && flags.contains(&json!(1)));
    }
}

mod tc_3_4_json_file_backend {
    use super::*;

    #[test_log::test]
    fn test_frame_over_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        let body = json!({"payload": {"rows": rows()}});
        write!(file, "{}", body).unwrap();

        let collection = MemoryCollection::from_json_file(file.path(), "payload.rows").unwrap();
        assert_eq!(collection.len(), 12);
        let frame = Frame::from_collection(Arc::new(schema()), Arc::new(collection)).unwrap();
        assert_eq!(frame.sel(&Labels::new().arg("tpc")).unwrap().len(), 6);
    }

    #[test]
    fn test_non_list_node_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", json!({"rows": {"a": 1}})).unwrap();
        assert!(matches!(
            MemoryCollection::from_json_file(file.path(), "rows"),
            Err(FrameError::Config(_))
        ));
        assert!(matches!(
            MemoryCollection::from_json_file(file.path(), "missing"),
            Err(FrameError::Config(_))
        ));
    }
}
