// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result aggregation: flatten per-page detections into one document-wide,
// page-ordered sequence of export records.

use folio_core::detection::{DetectionRecord, PageDetections};
use folio_core::error::{FolioError, Result};
use folio_core::labels::ClassLabelTable;
use tracing::{debug, instrument};

/// Sort per-page results by page number and check they cover exactly
/// pages `1..=expected_pages`, once each.
///
/// Inference may finish pages in any order; this is the reorder step that
/// restores document order before anything is drawn or exported.
pub fn order_pages(
    mut pages: Vec<PageDetections>,
    expected_pages: usize,
) -> Result<Vec<PageDetections>> {
    pages.sort_by_key(|page| page.page);
    check_numbering(&pages, expected_pages)?;
    Ok(pages)
}

fn check_numbering(pages: &[PageDetections], expected_pages: usize) -> Result<()> {
    if pages.len() != expected_pages {
        return Err(FolioError::Validation(format!(
            "have detections for {} pages, document has {}",
            pages.len(),
            expected_pages
        )));
    }
    for (index, page) in pages.iter().enumerate() {
        if page.page.index() != index {
            return Err(FolioError::Validation(format!(
                "page numbers are not contiguous: expected page {} at position {}, found page {}",
                index + 1,
                index,
                page.page
            )));
        }
    }
    Ok(())
}

/// Binds every detection to its page and class name.
pub struct ResultAggregator<'a> {
    labels: &'a ClassLabelTable,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(labels: &'a ClassLabelTable) -> Self {
        Self { labels }
    }

    /// Emit one record per detection, pages ascending and detections in model
    /// order within each page. No deduplication or cross-page merging.
    ///
    /// Fails if the pages are not exactly `1..=N`, or if any detection has an
    /// out-of-range score or an unknown class id.
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub fn aggregate(&self, pages: Vec<PageDetections>) -> Result<Vec<DetectionRecord>> {
        let expected = pages.len();
        let pages = order_pages(pages, expected)?;

        let total = pages.iter().map(|page| page.detections.len()).sum();
        let mut records = Vec::with_capacity(total);
        for page in &pages {
            for detection in page.detections.iter() {
                records.push(DetectionRecord::new(page.page, &detection, self.labels)?);
            }
        }

        debug!(records = records.len(), "Detections aggregated");
        Ok(records)
    }
}
