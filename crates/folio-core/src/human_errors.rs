// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the command line.
//
// Every pipeline error is mapped to a one-line summary and a concrete next
// step. The technical detail stays in the log.

use crate::error::{ErrorClass, FolioError};

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// One-line summary.
    pub message: String,
    /// What to try next.
    pub suggestion: String,
    /// Taxonomy class of the underlying error.
    pub class: ErrorClass,
}

/// Convert a `FolioError` into a `HumanError`.
pub fn humanize_error(err: &FolioError) -> HumanError {
    let class = err.class();
    match err {
        // -- Input --
        FolioError::Input(detail) => HumanError {
            message: "The input could not be read.".into(),
            suggestion: format!("Check that the file exists and is readable. ({detail})"),
            class,
        },

        FolioError::Format(detail) => HumanError {
            message: "This document is damaged or not in a supported format.".into(),
            suggestion: format!(
                "Supported inputs are PDF, PNG, JPEG and TIFF. Try re-exporting the document as a PDF. ({detail})"
            ),
            class,
        },

        // -- Configuration --
        FolioError::Config(detail) => HumanError {
            message: "The configuration is invalid.".into(),
            suggestion: format!("Fix the configuration file and run again. ({detail})"),
            class,
        },

        FolioError::LabelLookup {
            class_id,
            table_len,
        } => HumanError {
            message: "The model reported a class the label table doesn't know.".into(),
            suggestion: format!(
                "The model emitted class_id {class_id} but class_names has only {table_len} entries. \
                 Make sure class_names lists every class the model was trained on, in order."
            ),
            class,
        },

        FolioError::InvalidScore { page, score } => HumanError {
            message: "The model returned an impossible confidence score.".into(),
            suggestion: format!(
                "Page {page} has a score of {score}. The model may be exporting logits instead of probabilities."
            ),
            class,
        },

        // -- Inference --
        FolioError::Inference(detail) => HumanError {
            message: "The detection model failed on a page.".into(),
            suggestion: format!(
                "Check that the model file matches the expected input size and output layout. ({detail})"
            ),
            class,
        },

        // -- Rendering --
        FolioError::Render(detail) => HumanError {
            message: "Drawing the annotations failed.".into(),
            suggestion: format!("The model may have produced an invalid box. ({detail})"),
            class,
        },

        FolioError::Validation(detail) => HumanError {
            message: "The run stopped because its results were inconsistent.".into(),
            suggestion: format!("This is a bug; please report it. ({detail})"),
            class,
        },

        // -- Output --
        FolioError::Output(detail) => HumanError {
            message: "The results could not be written.".into(),
            suggestion: format!(
                "Check that the output directory exists and there is free space. ({detail})"
            ),
            class,
        },

        FolioError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "A file or directory couldn't be found.".into(),
                    suggestion: "Check the paths given on the command line and in the configuration.".into(),
                    class,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Permission denied.".into(),
                    suggestion: "Check the permissions of the input file and the output directory.".into(),
                    class,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: format!("Try again; the disk may be full. ({io_err})"),
                    class,
                }
            }
        }

        FolioError::Serialization(detail) => HumanError {
            message: "The detection export could not be serialized.".into(),
            suggestion: format!("This is a bug; please report it. ({detail})"),
            class,
        },
    }
}
