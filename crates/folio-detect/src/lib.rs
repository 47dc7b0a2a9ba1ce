// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-detect: The detection model boundary for the Folio pipeline.
//
// The pipeline only ever talks to a `DetectionModel`: one page raster in,
// boxes/scores/class ids out. The YOLO backend (feature "yolo") runs YOLOv8
// weights through `rten`; its output decoding lives in `decode` so it can be
// tested without model weights.

pub mod decode;
pub mod model;

#[cfg(feature = "yolo")]
pub mod yolo;

pub use decode::{YoloParams, decode_yolo_output, non_max_suppression};
pub use model::DetectionModel;

#[cfg(feature = "yolo")]
pub use yolo::YoloDetector;
