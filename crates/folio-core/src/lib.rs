// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio: Core types, error definitions, and pipeline configuration shared
// across all crates.

pub mod config;
pub mod detection;
pub mod error;
pub mod human_errors;
pub mod labels;
pub mod types;

pub use config::PipelineConfig;
pub use detection::*;
pub use error::{ErrorClass, FolioError};
pub use labels::ClassLabelTable;
pub use types::*;
