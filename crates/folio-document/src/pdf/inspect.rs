// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF inspector: open an existing PDF with the `lopdf` crate and report its
// structure (page count, page sizes) without rendering it.

use std::path::Path;

use folio_core::error::{FolioError, Result};
use lopdf::{Document, Object};
use tracing::{debug, instrument};

/// Read-only structural view of a PDF document.
///
/// Used to check assembled output (page count must equal the number of
/// annotated images) and by tests to look inside generated documents.
pub struct PdfInspector {
    /// The underlying lopdf document.
    document: Document,
}

impl PdfInspector {
    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| {
            FolioError::Format(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    /// Parse a PDF already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            FolioError::Format(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Media box width and height in points of the 1-indexed page, if the
    /// page declares one directly.
    pub fn page_size_pt(&self, page_number: u32) -> Option<(f32, f32)> {
        let pages = self.document.get_pages();
        let page_id = *pages.get(&page_number)?;
        let page = self.document.get_dictionary(page_id).ok()?;
        let media_box = match page.get(b"MediaBox").ok()? {
            Object::Array(values) => values,
            Object::Reference(id) => self.document.get_object(*id).ok()?.as_array().ok()?,
            _ => return None,
        };
        if media_box.len() != 4 {
            return None;
        }
        let coords: Vec<f32> = media_box.iter().filter_map(as_number).collect();
        if coords.len() != 4 {
            return None;
        }
        Some((coords[2] - coords[0], coords[3] - coords[1]))
    }
}

fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}
