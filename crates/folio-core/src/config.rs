// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};
use crate::labels::ClassLabelTable;

/// Everything a pipeline run needs, passed explicitly at construction.
///
/// Loaded from a JSON file (all fields optional, missing ones take their
/// defaults) and then overridden by command-line arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Document to annotate.
    pub input_path: PathBuf,
    /// Where the annotated PDF is written.
    pub output_document_path: PathBuf,
    /// Where the JSON detection export is written.
    pub output_export_path: PathBuf,
    /// Detection model weights.
    pub model_path: PathBuf,
    /// Class label table, indexed by class id.
    pub class_names: Vec<String>,
    /// Minimum score a detection needs to be reported by the model.
    pub conf_threshold: f32,
    /// IoU above which overlapping same-class boxes are suppressed.
    pub iou_threshold: f32,
    /// Rasterization resolution. Also used to size the output pages.
    pub raster_dpi: f32,
    /// Square input size the detection model expects, in pixels.
    pub model_input_size: u32,
    /// Upper bound on detections per page, if any.
    pub max_detections: Option<usize>,
    /// TrueType/OpenType font for box labels. Unset means the font bundled
    /// with `folio-document`.
    pub font_path: Option<PathBuf>,
    /// Run model inference across pages in parallel.
    pub parallel_inference: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::new(),
            output_document_path: PathBuf::new(),
            output_export_path: PathBuf::new(),
            model_path: PathBuf::from("models/detector.rten"),
            class_names: Vec::new(),
            conf_threshold: 0.5,
            iou_threshold: 0.5,
            raster_dpi: 200.0,
            model_input_size: 640,
            max_detections: None,
            font_path: None,
            parallel_inference: false,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            FolioError::Config(format!("failed to read {}: {}", path.display(), err))
        })?;
        Self::from_json_str(&text).map_err(|err| match err {
            FolioError::Config(msg) => FolioError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| FolioError::Config(err.to_string()))
    }

    /// The label table built from `class_names`.
    pub fn label_table(&self) -> Result<ClassLabelTable> {
        ClassLabelTable::new(self.class_names.iter().cloned())
    }

    /// Check that the configuration can drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.input_path.as_os_str().is_empty() {
            return Err(FolioError::Config("input_path is not set".into()));
        }
        if self.output_document_path.as_os_str().is_empty() {
            return Err(FolioError::Config("output_document_path is not set".into()));
        }
        if self.output_export_path.as_os_str().is_empty() {
            return Err(FolioError::Config("output_export_path is not set".into()));
        }
        if self.output_document_path == self.output_export_path {
            return Err(FolioError::Config(format!(
                "output document and export must be different files (both are {})",
                self.output_document_path.display()
            )));
        }
        if self.input_path == self.output_document_path {
            return Err(FolioError::Config(
                "output document would overwrite the input document".into(),
            ));
        }
        check_unit_interval("conf_threshold", self.conf_threshold)?;
        check_unit_interval("iou_threshold", self.iou_threshold)?;
        if !(self.raster_dpi.is_finite() && self.raster_dpi > 0.0) {
            return Err(FolioError::Config(format!(
                "raster_dpi must be positive, got {}",
                self.raster_dpi
            )));
        }
        if self.model_input_size == 0 {
            return Err(FolioError::Config("model_input_size must be positive".into()));
        }
        if self.max_detections == Some(0) {
            return Err(FolioError::Config(
                "max_detections must be positive when set".into(),
            ));
        }
        self.label_table()?;
        Ok(())
    }
}

fn check_unit_interval(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(FolioError::Config(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}
