// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document: Page-level document handling for the Folio pipeline.
//
// Turns an input document into page rasters, draws detection overlays onto
// those rasters, and assembles the annotated rasters into an output PDF.

pub mod annotate;
pub mod pdf;
pub mod raster;

// Re-export the primary structs so callers can use `folio_document::PageAnnotator` etc.
pub use annotate::{OverlayStyle, PageAnnotator};
pub use pdf::assembler::DocumentAssembler;
pub use pdf::inspect::PdfInspector;
pub use raster::{DocumentRasterizer, PageImage, Rasterizer};
