// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// YOLOv8 output decoding and non-maximum suppression.
//
// A YOLOv8 detection head produces a `[1, 4 + classes, anchors]` tensor. For
// every anchor the first four features are the box centre and size in model
// input pixels; the rest are per-class scores.

use std::cmp::Ordering;

use folio_core::detection::{BoundingBox, RawDetections};
use folio_core::error::{FolioError, Result};
use tracing::debug;

/// Thresholds and geometry for decoding one model output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloParams {
    /// Anchors whose best class score is not above this are dropped.
    pub conf_threshold: f32,
    /// Same-class boxes overlapping a kept box by more than this are dropped.
    pub iou_threshold: f32,
    /// Square side of the model input, in pixels.
    pub input_size: u32,
    /// Keep at most this many boxes per page after suppression.
    pub max_detections: Option<usize>,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            conf_threshold: 0.5,
            iou_threshold: 0.5,
            input_size: 640,
            max_detections: None,
        }
    }
}

/// Decode a flattened `[1, num_features, num_anchors]` output into page-space
/// detections, highest score first.
///
/// `page_size` is the `(width, height)` of the page raster the model input was
/// resized from; boxes are scaled back into that space.
pub fn decode_yolo_output(
    data: &[f32],
    num_features: usize,
    num_anchors: usize,
    params: &YoloParams,
    page_size: (u32, u32),
) -> Result<RawDetections> {
    if num_features < 5 {
        return Err(FolioError::Inference(format!(
            "model output has {num_features} features per anchor; expected 4 box values plus at least one class"
        )));
    }
    if data.len() != num_features * num_anchors {
        return Err(FolioError::Inference(format!(
            "model output has {} values, expected {} ({} features x {} anchors)",
            data.len(),
            num_features * num_anchors,
            num_features,
            num_anchors
        )));
    }

    let input = params.input_size as f32;
    let scale_x = page_size.0 as f32 / input;
    let scale_y = page_size.1 as f32 / input;
    let feature = |f: usize, anchor: usize| data[f * num_anchors + anchor];

    let mut candidates = Vec::new();
    for anchor in 0..num_anchors {
        let mut best_class = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for class_id in 0..num_features - 4 {
            let score = feature(4 + class_id, anchor);
            if score > best_score {
                best_score = score;
                best_class = class_id;
            }
        }

        if !(best_score > params.conf_threshold) {
            continue;
        }

        let bbox = BoundingBox::from_center(
            feature(0, anchor),
            feature(1, anchor),
            feature(2, anchor),
            feature(3, anchor),
        )
        .scaled(scale_x, scale_y);
        candidates.push((bbox, best_score, best_class));
    }

    let candidate_count = candidates.len();
    let mut kept = non_max_suppression(candidates, params.iou_threshold);
    if let Some(limit) = params.max_detections {
        kept.truncate(limit);
    }

    debug!(
        anchors = num_anchors,
        candidates = candidate_count,
        kept = kept.len(),
        "YOLO output decoded"
    );
    Ok(kept.into_iter().collect())
}

/// Greedy per-class non-maximum suppression.
///
/// Returns the surviving detections ordered by descending score. Ties keep
/// their input order.
pub fn non_max_suppression(
    mut detections: Vec<(BoundingBox, f32, usize)>,
    iou_threshold: f32,
) -> Vec<(BoundingBox, f32, usize)> {
    detections.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let mut keep: Vec<(BoundingBox, f32, usize)> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = keep.iter().any(|kept| {
            kept.2 == candidate.2 && kept.0.iou(&candidate.0) > iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lay anchors out feature-major, the way the model emits them.
    fn tensor(anchors: &[Vec<f32>]) -> (Vec<f32>, usize, usize) {
        let num_features = anchors[0].len();
        let num_anchors = anchors.len();
        let mut data = vec![0.0; num_features * num_anchors];
        for (a, values) in anchors.iter().enumerate() {
            for (f, value) in values.iter().enumerate() {
                data[f * num_anchors + a] = *value;
            }
        }
        (data, num_features, num_anchors)
    }

    fn params() -> YoloParams {
        YoloParams {
            conf_threshold: 0.5,
            iou_threshold: 0.5,
            input_size: 100,
            max_detections: None,
        }
    }

    #[test]
    fn best_class_wins_and_box_becomes_corners() {
        let (data, f, a) = tensor(&[vec![50.0, 40.0, 20.0, 10.0, 0.1, 0.8, 0.3]]);
        let detections = decode_yolo_output(&data, f, a, &params(), (100, 100)).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections.class_ids(), &[1]);
        assert_eq!(detections.scores(), &[0.8]);
        assert_eq!(detections.boxes()[0], BoundingBox::new(40.0, 35.0, 60.0, 45.0));
    }

    #[test]
    fn boxes_are_scaled_to_page_space() {
        let (data, f, a) = tensor(&[vec![50.0, 50.0, 20.0, 20.0, 0.9]]);
        let detections = decode_yolo_output(&data, f, a, &params(), (200, 400)).unwrap();
        assert_eq!(detections.boxes()[0], BoundingBox::new(80.0, 160.0, 120.0, 240.0));
    }

    #[test]
    fn scores_at_or_below_threshold_are_dropped() {
        let (data, f, a) = tensor(&[
            vec![10.0, 10.0, 4.0, 4.0, 0.5],
            vec![30.0, 30.0, 4.0, 4.0, 0.49],
            vec![60.0, 60.0, 4.0, 4.0, 0.51],
        ]);
        let detections = decode_yolo_output(&data, f, a, &params(), (100, 100)).unwrap();
        assert_eq!(detections.scores(), &[0.51]);
    }

    #[test]
    fn overlapping_same_class_boxes_are_suppressed() {
        let (data, f, a) = tensor(&[
            vec![50.0, 50.0, 20.0, 20.0, 0.7, 0.0],
            vec![51.0, 50.0, 20.0, 20.0, 0.9, 0.0],
            // Same place, other class: kept.
            vec![50.0, 50.0, 20.0, 20.0, 0.0, 0.8],
        ]);
        let detections = decode_yolo_output(&data, f, a, &params(), (100, 100)).unwrap();
        assert_eq!(detections.scores(), &[0.9, 0.8]);
        assert_eq!(detections.class_ids(), &[0, 1]);
    }

    #[test]
    fn distant_boxes_survive_in_score_order() {
        let (data, f, a) = tensor(&[
            vec![10.0, 10.0, 8.0, 8.0, 0.6],
            vec![80.0, 80.0, 8.0, 8.0, 0.95],
            vec![40.0, 40.0, 8.0, 8.0, 0.75],
        ]);
        let detections = decode_yolo_output(&data, f, a, &params(), (100, 100)).unwrap();
        assert_eq!(detections.scores(), &[0.95, 0.75, 0.6]);
    }

    #[test]
    fn max_detections_caps_output() {
        let (data, f, a) = tensor(&[
            vec![10.0, 10.0, 8.0, 8.0, 0.6],
            vec![80.0, 80.0, 8.0, 8.0, 0.95],
            vec![40.0, 40.0, 8.0, 8.0, 0.75],
        ]);
        let capped = YoloParams {
            max_detections: Some(2),
            ..params()
        };
        let detections = decode_yolo_output(&data, f, a, &capped, (100, 100)).unwrap();
        assert_eq!(detections.scores(), &[0.95, 0.75]);
    }

    #[test]
    fn no_anchors_gives_empty_set() {
        let detections = decode_yolo_output(&[], 6, 0, &params(), (100, 100)).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn wrong_length_is_inference_error() {
        let result = decode_yolo_output(&[0.0; 10], 6, 2, &params(), (100, 100));
        assert!(matches!(result, Err(FolioError::Inference(_))));
    }

    #[test]
    fn too_few_features_is_inference_error() {
        let result = decode_yolo_output(&[0.0; 8], 4, 2, &params(), (100, 100));
        assert!(matches!(result, Err(FolioError::Inference(_))));
    }

    #[test]
    fn nms_keeps_equal_scores_in_input_order() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(50.0, 50.0, 60.0, 60.0);
        let kept = non_max_suppression(vec![(a, 0.7, 0), (b, 0.7, 0)], 0.5);
        assert_eq!(kept, vec![(a, 0.7, 0), (b, 0.7, 0)]);
    }
}
