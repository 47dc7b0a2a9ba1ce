// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// YOLOv8 detector backed by the `rten` runtime.
//
// # Feature Gate
//
// This module is only available when the `yolo` feature is enabled:
//
// ```toml
// folio-detect = { path = "crates/folio-detect", features = ["yolo"] }
// ```
//
// # Model Setup
//
// `rten` loads `.rten` model files. Convert an exported YOLOv8 ONNX model with
// the `rten-convert` tool:
//
//   ```sh
//   pip install rten-convert
//   rten-convert detector.onnx models/detector.rten
//   ```
//
// The model must take a `[1, 3, S, S]` float input in [0, 1] and produce the
// standard `[1, 4 + classes, anchors]` detection head output.

use std::path::Path;

use folio_core::config::PipelineConfig;
use folio_core::detection::RawDetections;
use folio_core::error::{FolioError, Result};
use image::RgbImage;
use image::imageops::{self, FilterType};
use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::NdTensor;
use tracing::{debug, info, instrument};

use crate::decode::{YoloParams, decode_yolo_output};
use crate::model::DetectionModel;

/// A YOLOv8 detection model loaded into memory.
///
/// Loading is the expensive step. Keep one detector for the whole document
/// and call [`detect`](DetectionModel::detect) once per page.
///
/// **Important:** `rten` must be compiled in release mode. Debug builds are
/// 10-100x slower.
pub struct YoloDetector {
    model: Model,
    params: YoloParams,
    name: String,
}

impl YoloDetector {
    /// Load a model with the given confidence and IoU thresholds and the
    /// default 640 px input size.
    ///
    /// # Errors
    ///
    /// Returns [`FolioError::Input`] if the model file is missing or corrupt.
    pub fn load(model_path: impl AsRef<Path>, conf_threshold: f32, iou_threshold: f32) -> Result<Self> {
        Self::with_params(
            model_path,
            YoloParams {
                conf_threshold,
                iou_threshold,
                ..YoloParams::default()
            },
        )
    }

    /// Load a model with explicit decode parameters.
    #[instrument(skip_all, fields(path = %model_path.as_ref().display()))]
    pub fn with_params(model_path: impl AsRef<Path>, params: YoloParams) -> Result<Self> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(FolioError::Input(format!(
                "detection model not found at {}",
                path.display()
            )));
        }

        info!("Loading detection model");
        let model = Model::load_file(path).map_err(|err| {
            FolioError::Input(format!(
                "failed to load detection model from {}: {}",
                path.display(),
                err
            ))
        })?;

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolo".to_owned());

        info!(
            model = %name,
            input_size = params.input_size,
            conf = params.conf_threshold,
            iou = params.iou_threshold,
            "Detection model loaded"
        );
        Ok(Self {
            model,
            params,
            name,
        })
    }

    /// Load the model and thresholds named by the pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::with_params(
            &config.model_path,
            YoloParams {
                conf_threshold: config.conf_threshold,
                iou_threshold: config.iou_threshold,
                input_size: config.model_input_size,
                max_detections: config.max_detections,
            },
        )
    }

    pub fn params(&self) -> &YoloParams {
        &self.params
    }

    /// Resize to the square model input and lay the pixels out as a
    /// `[1, 3, S, S]` tensor scaled to [0, 1].
    fn preprocess(&self, image: &RgbImage) -> NdTensor<f32, 4> {
        let size = self.params.input_size;
        let resized = imageops::resize(image, size, size, FilterType::Triangle);

        let plane = (size as usize) * (size as usize);
        let mut data = vec![0.0f32; 3 * plane];
        for (i, pixel) in resized.pixels().enumerate() {
            for channel in 0..3 {
                data[channel * plane + i] = f32::from(pixel[channel]) / 255.0;
            }
        }

        NdTensor::from_data([1, 3, size as usize, size as usize], data)
    }
}

impl DetectionModel for YoloDetector {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn detect(&self, image: &RgbImage) -> Result<RawDetections> {
        let input = self.preprocess(image);

        let output = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|err| FolioError::Inference(format!("model run failed: {}", err)))?;

        let output: NdTensor<f32, 3> = output.try_into().map_err(|err| {
            FolioError::Inference(format!("model output is not a 3-d float tensor: {:?}", err))
        })?;

        let [batch, num_features, num_anchors] = output.shape();
        if batch != 1 {
            return Err(FolioError::Inference(format!(
                "expected a batch of 1, model returned {batch}"
            )));
        }
        debug!(num_features, num_anchors, "Model output received");

        decode_yolo_output(
            &output.to_vec(),
            num_features,
            num_anchors,
            &self.params,
            image.dimensions(),
        )
    }

    fn name(&self) -> &str {
        &self.name
    }
}
