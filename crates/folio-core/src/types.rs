// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Folio detection pipeline.

use serde::{Deserialize, Serialize};

/// 1-based page number as it appears in the export.
///
/// Pages are indexed from 0 internally; the number is derived once from the
/// rasterizer's output position and then carried explicitly alongside the
/// page's data, so reordered (parallel) processing never has to infer it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageNumber(u32);

impl PageNumber {
    /// Page number for the page at 0-based `index`.
    pub fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }

    /// Construct from a 1-based number. Returns `None` for 0.
    pub fn new(number: u32) -> Option<Self> {
        (number > 0).then_some(Self(number))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The 0-based index this page number was derived from.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl std::fmt::Display for PageNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported input document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Jpeg,
    Png,
    Tiff,
}

impl DocumentType {
    /// MIME type string, used in diagnostics.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Tiff => "image/tiff",
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Infer document type from a path's extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether documents of this type are decoded as a single raster page.
    pub fn is_raster(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn page_number_is_index_plus_one() {
        assert_eq!(PageNumber::from_index(0).get(), 1);
        assert_eq!(PageNumber::from_index(41).get(), 42);
        assert_eq!(PageNumber::from_index(41).index(), 41);
    }

    #[test]
    fn page_number_rejects_zero() {
        assert!(PageNumber::new(0).is_none());
        assert_eq!(PageNumber::new(3), Some(PageNumber::from_index(2)));
    }

    #[test]
    fn page_number_serializes_as_integer() {
        let json = serde_json::to_string(&PageNumber::from_index(4)).unwrap();
        assert_eq!(json, "5");
    }

    #[test]
    fn document_type_from_path() {
        assert_eq!(
            DocumentType::from_path(Path::new("scans/vertigo.PDF")),
            Some(DocumentType::Pdf)
        );
        assert_eq!(
            DocumentType::from_path(Path::new("page.jpeg")),
            Some(DocumentType::Jpeg)
        );
        assert_eq!(DocumentType::from_path(Path::new("notes.docx")), None);
        assert_eq!(DocumentType::from_path(Path::new("no_extension")), None);
    }

    #[test]
    fn only_pdf_is_paginated() {
        assert!(!DocumentType::Pdf.is_raster());
        assert!(DocumentType::Tiff.is_raster());
    }
}
