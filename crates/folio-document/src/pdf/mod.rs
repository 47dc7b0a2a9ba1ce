// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: assembling annotated pages into a PDF and inspecting the result.

pub mod assembler;
pub mod inspect;

pub use assembler::DocumentAssembler;
pub use inspect::PdfInspector;
