// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use thiserror::Error;

use crate::types::PageNumber;

/// Top-level error type for all Folio operations.
///
/// Every variant is fatal to a pipeline run: no stage retries, and the first
/// error aborts the whole document.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Input errors --
    #[error("cannot read input: {0}")]
    Input(String),

    #[error("unsupported or corrupt document: {0}")]
    Format(String),

    // -- Configuration errors --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("class_id {class_id} has no label (label table has {table_len} entries)")]
    LabelLookup { class_id: usize, table_len: usize },

    #[error("score {score} on page {page} is outside [0, 1]")]
    InvalidScore { page: PageNumber, score: f32 },

    // -- Inference errors --
    #[error("inference failed: {0}")]
    Inference(String),

    // -- Rendering / assembly --
    #[error("rendering failed: {0}")]
    Render(String),

    #[error("validation failed: {0}")]
    Validation(String),

    // -- Output --
    #[error("cannot write output: {0}")]
    Output(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse error taxonomy used for exit reporting and human-readable messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or corrupt document, unreadable model file.
    Input,
    /// Label table or thresholds inconsistent with the model.
    Config,
    /// Model invocation failed on a page.
    Inference,
    /// Drawing or document assembly failed.
    Render,
    /// A pipeline invariant did not hold (page numbering, empty assembly).
    Validation,
    /// Writing the output document or export failed.
    Output,
}

impl FolioError {
    /// Classify the error into the pipeline taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Input(_) | Self::Format(_) => ErrorClass::Input,
            Self::Config(_) | Self::LabelLookup { .. } => ErrorClass::Config,
            Self::Inference(_) | Self::InvalidScore { .. } => ErrorClass::Inference,
            Self::Render(_) => ErrorClass::Render,
            Self::Validation(_) => ErrorClass::Validation,
            Self::Output(_) | Self::Io(_) | Self::Serialization(_) => ErrorClass::Output,
        }
    }

    /// Attach the page number to per-page failures so the abort message
    /// names the page that stopped the run.
    pub fn at_page(self, page: PageNumber) -> Self {
        match self {
            Self::Inference(msg) => Self::Inference(format!("page {page}: {msg}")),
            Self::Render(msg) => Self::Render(format!("page {page}: {msg}")),
            other => other,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;
