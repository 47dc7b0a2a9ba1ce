// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-pipeline: Runs a document through rasterization, detection,
// annotation, aggregation, assembly and export.

pub mod aggregate;
pub mod export;
pub mod orchestrator;

pub use aggregate::{ResultAggregator, order_pages};
pub use export::{ResultExporter, hash_bytes};
pub use orchestrator::{Pipeline, ProcessedDocument, RunSummary};
