// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection data model: the model contract's parallel output sequences, the
// per-page tagging, and the serialized per-detection record.

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};
use crate::labels::ClassLabelTable;
use crate::types::PageNumber;

/// Axis-aligned box in page pixel space, corners `(x1, y1)` and `(x2, y2)`.
///
/// Coordinates are kept exactly as the model reported them: they are never
/// clamped to the page bounds. Serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from centre point and size, as emitted by YOLO-style heads.
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x1: cx - width / 2.0,
            y1: cy - height / 2.0,
            x2: cx + width / 2.0,
            y2: cy + height / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Scale x and y independently, e.g. from model input space to page space.
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            x1: self.x1 * sx,
            y1: self.y1 * sy,
            x2: self.x2 * sx,
            y2: self.y2 * sy,
        }
    }

    /// Intersection over union with another box.
    #[inline]
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x1, bbox.y1, bbox.x2, bbox.y2]
    }
}

/// One entry of a [`RawDetections`] set, with its position in model order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// Position in the order the model returned it.
    pub index: usize,
    pub bbox: BoundingBox,
    pub score: f32,
    pub class_id: usize,
}

/// What a detection model returns for one page: three equal-length parallel
/// sequences. The order is whatever the model produced and is preserved
/// everywhere downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetections {
    boxes: Vec<BoundingBox>,
    scores: Vec<f32>,
    class_ids: Vec<usize>,
}

impl RawDetections {
    /// Build from the three parallel sequences. Fails if their lengths differ.
    pub fn new(
        boxes: Vec<BoundingBox>,
        scores: Vec<f32>,
        class_ids: Vec<usize>,
    ) -> Result<Self> {
        if boxes.len() != scores.len() || boxes.len() != class_ids.len() {
            return Err(FolioError::Inference(format!(
                "model returned mismatched outputs: {} boxes, {} scores, {} class ids",
                boxes.len(),
                scores.len(),
                class_ids.len()
            )));
        }
        Ok(Self {
            boxes,
            scores,
            class_ids,
        })
    }

    /// A page with no detections.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn class_ids(&self) -> &[usize] {
        &self.class_ids
    }

    /// Iterate detections in model order.
    pub fn iter(&self) -> impl Iterator<Item = RawDetection> + '_ {
        self.boxes
            .iter()
            .zip(&self.scores)
            .zip(&self.class_ids)
            .enumerate()
            .map(|(index, ((bbox, score), class_id))| RawDetection {
                index,
                bbox: *bbox,
                score: *score,
                class_id: *class_id,
            })
    }
}

impl FromIterator<(BoundingBox, f32, usize)> for RawDetections {
    fn from_iter<T: IntoIterator<Item = (BoundingBox, f32, usize)>>(iter: T) -> Self {
        let mut detections = Self::default();
        for (bbox, score, class_id) in iter {
            detections.boxes.push(bbox);
            detections.scores.push(score);
            detections.class_ids.push(class_id);
        }
        detections
    }
}

/// A page's detections tagged with the page they belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDetections {
    pub page: PageNumber,
    pub detections: RawDetections,
}

impl PageDetections {
    pub fn new(page: PageNumber, detections: RawDetections) -> Self {
        Self { page, detections }
    }
}

/// One detection bound to its page: the unit of the export.
///
/// Serialized with exactly the fields `page`, `box`, `score`, `class_id`,
/// `class_name`, in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub page: PageNumber,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub score: f32,
    pub class_id: usize,
    pub class_name: String,
    /// Position of the detection within its page, in model order.
    #[serde(skip)]
    pub detection_index: usize,
}

impl DetectionRecord {
    /// Bind `detection` to `page`, resolving its class name.
    ///
    /// Fails with [`FolioError::InvalidScore`] if the score is outside [0, 1]
    /// (or NaN), and with [`FolioError::LabelLookup`] if the class id is not
    /// covered by `labels`.
    pub fn new(
        page: PageNumber,
        detection: &RawDetection,
        labels: &ClassLabelTable,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&detection.score) {
            return Err(FolioError::InvalidScore {
                page,
                score: detection.score,
            });
        }
        let class_name = labels.name(detection.class_id)?.to_owned();
        Ok(Self {
            page,
            bbox: detection.bbox,
            score: detection.score,
            class_id: detection.class_id,
            class_name,
            detection_index: detection.index,
        })
    }
}
