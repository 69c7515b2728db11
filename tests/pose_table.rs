mod common;

use hal_overlay::{
    overlay::OverlayFrame,
    result::{InferenceResult, PoseTable},
};
use serde_json::json;

#[test]
fn integer_and_string_keys_resolve_to_same_row() {
    let mut table = PoseTable::new();
    table.insert("30", vec![1.0, 2.0]);
    table.insert(31u64, vec![3.0, 4.0]);

    assert_eq!(table.row(30u64), table.row("30"));
    assert_eq!(table.row(31u64), table.row("31"));
    assert_eq!(table.row(30u64), Some(&vec![1.0, 2.0]));
    assert!(table.row(32u64).is_none());
}

#[test]
fn float_style_keys_are_indexed() {
    let table: PoseTable = serde_json::from_value(json!({ "30.0": [1.0] })).unwrap();
    assert_eq!(table.row(30u64), Some(&vec![1.0]));
}

#[test]
fn null_cells_become_nan_and_serialize_back_as_null() {
    let table: PoseTable = serde_json::from_value(json!({ "0": [1.0, null] })).unwrap();
    let row = table.row(0u64).unwrap();
    assert_eq!(row[0], 1.0);
    assert!(row[1].is_nan());

    let back = serde_json::to_value(&table).unwrap();
    assert_eq!(back, json!({ "0": [1.0, null] }));
}

#[test]
fn pose_keys_zip_positionally() {
    let keys = vec!["A".to_string(), "B".to_string()];
    let frame = OverlayFrame::from_row(&keys, &[10.0, 20.0]);
    assert_eq!(frame.get("A"), Some(10.0));
    assert_eq!(frame.get("B"), Some(20.0));

    let swapped = vec!["B".to_string(), "A".to_string()];
    let frame = OverlayFrame::from_row(&swapped, &[20.0, 10.0]);
    assert_eq!(frame.get("A"), Some(10.0));
    assert_eq!(frame.get("B"), Some(20.0));
}

#[test]
fn non_numeric_cells_are_not_numeric() {
    let keys = vec!["A".to_string(), "B".to_string()];
    let frame = OverlayFrame::from_row(&keys, &[f64::NAN, 2.0]);
    assert!(frame.get("A").is_some());
    assert!(frame.numeric("A").is_none());
    assert!(frame.point("A", "B").is_none());
}

#[test]
fn result_document_parses() {
    let result = common::sample_result();
    let subject = result.active_subject().unwrap();
    assert_eq!(subject.pose_table.len(), 2);
    assert_eq!(subject.pose_keys.len(), 20);
    assert_eq!(result.video_metadata.as_ref().unwrap().fps, Some(30.0));
    assert_eq!(subject.right_metrics.as_ref().unwrap().n_reps, 12);
}

#[test]
fn sparse_document_parses() {
    let result: InferenceResult = serde_json::from_value(json!({
        "version": "0.5.1",
        "warnings": null,
        "subjects": [{ "pose_keys": null, "pose_df": null }]
    }))
    .unwrap();
    assert!(result.warnings.is_empty());
    assert!(result.video_metadata.is_none());
    let subject = result.active_subject().unwrap();
    assert!(subject.pose_table.is_empty());
    assert!(subject.right_prediction.is_none());
}

#[test]
fn integral_floats_decode_as_counts() {
    let result: InferenceResult = serde_json::from_value(json!({
        "version": "0.6.0",
        "video_metadata": { "fps": 29.97, "total_frames": 90.0, "width": 640.0, "height": 480.0 },
        "subjects": [{
            "subject_id": 1.0,
            "track_length": 45.0,
            "right_metrics": { "duty_cycle": 0.5, "frequency_hz": 1.2, "n_reps": 12.0 },
            "left_metrics": { "duty_cycle": null, "frequency_hz": null, "n_reps": 3.5 }
        }]
    }))
    .unwrap();

    let meta = result.video_metadata.as_ref().unwrap();
    assert_eq!(meta.total_frames, 90);
    assert_eq!((meta.width, meta.height), (Some(640), Some(480)));

    let subject = result.active_subject().unwrap();
    assert_eq!(subject.subject_id, Some(1));
    assert_eq!(subject.track_length, Some(45));
    assert_eq!(subject.right_metrics.as_ref().unwrap().n_reps, 12);

    // a fractional count is unusable, not fatal
    let left = subject.left_metrics.as_ref().unwrap();
    assert_eq!(left.n_reps, 0);
    assert_eq!(left.duty_cycle, 0.0);
}

#[test]
fn partial_metadata_decodes_field_by_field() {
    let only_fps: InferenceResult = serde_json::from_value(json!({
        "version": "0.6.0",
        "video_metadata": { "fps": 30.0 },
        "subjects": []
    }))
    .unwrap();
    let meta = only_fps.video_metadata.unwrap();
    assert_eq!(meta.fps, Some(30.0));
    assert_eq!((meta.width, meta.height, meta.total_frames), (None, None, 0));

    let null_fps: InferenceResult = serde_json::from_value(json!({
        "version": "0.6.0",
        "video_metadata": { "fps": null, "width": 640, "height": null },
        "subjects": []
    }))
    .unwrap();
    let meta = null_fps.video_metadata.unwrap();
    assert_eq!(meta.fps, None);
    assert_eq!((meta.width, meta.height), (Some(640), None));
}
