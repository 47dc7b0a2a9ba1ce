// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document assembler: reassemble annotated page rasters into one PDF using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use std::path::Path;

use folio_core::error::{FolioError, Result};
use image::RgbImage;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use crate::pdf::inspect::PdfInspector;

const MM_PER_INCH: f32 = 25.4;

/// Builds a multi-page PDF with one full-bleed raster image per page.
///
/// Page `i` of the output shows image `i` of the input, at the configured DPI,
/// so pages rasterized at that DPI come back at their original physical size.
pub struct DocumentAssembler {
    /// Resolution the images are placed at.
    dpi: f32,
    /// Title metadata embedded in the PDF /Info dictionary.
    title: Option<String>,
}

impl DocumentAssembler {
    /// Create an assembler placing images at `dpi`.
    pub fn new(dpi: f32) -> Self {
        Self { dpi, title: None }
    }

    /// Set a title for the PDF metadata.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    /// Page dimensions in printpdf's Mm units for an image of the given size.
    fn page_dimensions(&self, width_px: u32, height_px: u32) -> (Mm, Mm) {
        let to_mm = |px: u32| Mm(px as f32 / self.dpi * MM_PER_INCH);
        (to_mm(width_px), to_mm(height_px))
    }

    /// Assemble `images` into a PDF, one page per image, in order.
    ///
    /// Fails with [`FolioError::Validation`] when `images` is empty.
    #[instrument(skip_all, fields(pages = images.len(), dpi = self.dpi))]
    pub fn assemble(&self, images: &[RgbImage]) -> Result<Vec<u8>> {
        if images.is_empty() {
            return Err(FolioError::Validation(
                "cannot assemble a document from zero pages".into(),
            ));
        }

        let title = self.title.as_deref().unwrap_or("Folio annotated document");
        info!(pages = images.len(), title, "Assembling PDF");

        let mut doc = PdfDocument::new(title);
        let mut pages: Vec<PdfPage> = Vec::with_capacity(images.len());

        for (index, image) in images.iter().enumerate() {
            let (width, height) = image.dimensions();
            if width == 0 || height == 0 {
                return Err(FolioError::Render(format!(
                    "page {} has an empty raster ({}x{})",
                    index + 1,
                    width,
                    height
                )));
            }

            let raw = RawImage {
                pixels: RawImageData::U8(image.as_raw().clone()),
                width: width as usize,
                height: height as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            // The image fills the page exactly: origin at the bottom-left
            // corner, natural size at `dpi`.
            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: None,
                    scale_y: None,
                    dpi: Some(self.dpi),
                    rotate: None,
                },
            }];

            let (page_w, page_h) = self.page_dimensions(width, height);
            pages.push(PdfPage::new(page_w, page_h, ops));
            debug!(page = index + 1, width, height, "Page placed");
        }

        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings while saving");
        }

        let written = PdfInspector::from_bytes(&output)?.page_count();
        if written != images.len() {
            return Err(FolioError::Render(format!(
                "assembled PDF has {} pages, expected {}",
                written,
                images.len()
            )));
        }

        debug!(output_bytes = output.len(), "PDF assembled");
        Ok(output)
    }

    /// Assemble `images` and write the PDF to `path`.
    pub fn write_to_file(&self, images: &[RgbImage], path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.assemble(images)?;
        std::fs::write(path, &bytes).map_err(|err| {
            FolioError::Output(format!("failed to write {}: {}", path.display(), err))
        })?;
        info!("Wrote annotated PDF to {}", path.display());
        Ok(())
    }
}
