//! Tests for M5: loc / at Indexers
//! Covers TC-5.1, TC-5.2
//!
//! Run individual tests with:
//! cargo test tc_5_1 -- --nocapture
//! cargo test m5_indexers -- --nocapture

use rframe::{Document, Frame, FrameError, IndexDescriptor, Interval, Label, Labels, MemoryCollection, TableSchema};
use serde_json::{json, Value};
use std::sync::Arc;

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

fn single_index_frame() -> Frame {
    let schema = TableSchema::new("runs").index(IndexDescriptor::value("run")).column("col").column("mode");
    let collection = MemoryCollection::from_documents(
        "runs",
        vec![
            doc(json!({"run": 1, "col": "a", "mode": "bkg"})),
            doc(json!({"run": 2, "col": "b", "mode": "calib"})),
        ],
    );
    Frame::from_collection(Arc::new(schema), Arc::new(collection)).unwrap()
}

fn two_index_frame() -> Frame {
    let schema = TableSchema::new("maps")
        .index(IndexDescriptor::value("kind"))
        .index(IndexDescriptor::interval("time"))
        .column("value");
    let collection = MemoryCollection::from_documents(
        "maps",
        vec![
            doc(json!({"kind": "s1", "time": {"left": 0, "right": 5}, "value": 1})),
            doc(json!({"kind": "s1", "time": {"left": 5, "right": 9}, "value": 2})),
            doc(json!({"kind": "s2", "time": {"left": 0, "right": 9}, "value": 3})),
        ],
    );
    Frame::from_collection(Arc::new(schema), Arc::new(collection)).unwrap()
}

mod tc_5_1_loc {
    use super::*;

    #[test]
    fn test_call_is_sel() {
        let frame = two_index_frame();
        let labels = Labels::new().arg("s1");
        assert_eq!(frame.loc().call(&labels).unwrap(), frame.sel(&labels).unwrap());
    }

    #[test]
    fn test_column_second_element() {
        let frame = single_index_frame();
        let records = frame.loc().get((2, "mode")).unwrap();
        assert_eq!(records, vec![doc(json!({"run": 2, "mode": "calib"}))]);

        let records = frame.loc().get((Label::Any, vec!["col", "mode"])).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].len(), 3);
    }

    #[test]
    fn test_non_column_joins_index() {
        let frame = two_index_frame();
        // "s1" plus time 6: the second element is not a column
        let records = frame.loc().get(("s1", 6)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["value"], 2);

        // a tuple index followed by a column
        let records = frame.loc().get((("s1", 6), "value")).unwrap();
        assert_eq!(records, vec![doc(json!({"kind": "s1", "time": {"left": 5, "right": 9}, "value": 2}))]);
    }

    #[test]
    fn test_columns_plus_one_split() {
        // two columns, so a three-tuple ending in a column splits off that column
        let frame = single_index_frame();
        let records = frame.loc().get((1, "x", "mode")).unwrap();
        assert_eq!(records, vec![doc(json!({"run": 1, "mode": "bkg"}))]);

        // one column: a three-tuple is neither a pair nor columns + 1
        let frame = two_index_frame();
        let records = frame.loc().get(("s2", 3, "value")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].len(), 3);
    }

    #[test]
    fn test_unknown_string_is_an_index_label() {
        let frame = single_index_frame();
        let records = frame.loc().get((1, "nope")).unwrap();
        // "nope" joined the index tuple past the last field and is ignored
        assert_eq!(records.len(), 1);
    }
}

mod tc_5_2_at {
    use super::*;

    #[test]
    fn test_exact_lookup() {
        let frame = two_index_frame();
        assert_eq!(frame.at().get(("s1", 2), "value").unwrap(), json!(1));
        assert_eq!(frame.at().get(("s2", 8), "value").unwrap(), json!(3));
    }

    #[test]
    fn test_no_match_is_empty_selection() {
        let frame = single_index_frame();
        let index = Label::Tuple(vec![Label::from(5)]);
        assert!(matches!(frame.at().get(index, "col"), Err(FrameError::EmptySelection)));
    }

    #[test]
    fn test_wildcards_are_ill_defined() {
        let frame = single_index_frame();
        let index = Label::Tuple(vec![Label::from(..)]);
        assert!(matches!(frame.at().get(index, "col"), Err(FrameError::IllDefinedLocation(_))));
        assert!(matches!(frame.at().get(Label::Any, "col"), Err(FrameError::IllDefinedLocation(_))));
        assert!(matches!(frame.at().get(vec![1, 2], "col"), Err(FrameError::IllDefinedLocation(_))));
    }

    #[test]
    fn test_interval_pair_on_interval_field() {
        let frame = two_index_frame();
        assert_eq!(frame.at().get(("s1", (0, 5)), "value").unwrap(), json!(1));
        assert_eq!(frame.at().get(("s1", Interval::new(5, 9)), "value").unwrap(), json!(2));

        // open bounds are not a single location
        assert!(matches!(
            frame.at().get(("s1", (0, ..)), "value"),
            Err(FrameError::IllDefinedLocation(_))
        ));
    }

    #[test]
    fn test_pair_on_value_field_is_ill_defined() {
        let frame = single_index_frame();
        let index = Label::Tuple(vec![Label::from((1, 2))]);
        assert!(matches!(frame.at().get(index, "col"), Err(FrameError::IllDefinedLocation(_))));
    }

    #[test]
    fn test_under_defined_index() {
        let frame = two_index_frame();
        assert!(matches!(frame.at().get("s1", "value"), Err(FrameError::IllDefinedLocation(_))));
    }

    #[test]
    fn test_unknown_column_checked_first() {
        let frame = single_index_frame();
        let err = frame.at().get(Label::Any, "nope").unwrap_err();
        assert!(matches!(err, FrameError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_raw_key_and_call_form() {
        let frame = two_index_frame();
        let value = frame.at().lookup(&[Label::from(("s1", 7)), Label::from("value")]).unwrap();
        assert_eq!(value, json!(2));
        assert!(matches!(
            frame.at().lookup(&[Label::from("s1")]),
            Err(FrameError::IllDefinedLocation(_))
        ));

        let labels = Labels::new().named("time", 1).named("kind", "s2");
        assert_eq!(frame.value("value", &labels).unwrap(), json!(3));
    }
}
