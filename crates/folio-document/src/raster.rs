// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document rasterizer: turn an input document into one RGB raster per page.
//
// PDFs are rendered through `pdfium-render` (behind the "pdfium" feature);
// single raster images (PNG, JPEG, TIFF) are decoded with `image` and treated
// as one-page documents.

use std::path::Path;

use folio_core::error::{FolioError, Result};
use folio_core::types::{DocumentType, PageNumber};
use image::RgbImage;
use tracing::{debug, info, instrument};

/// One rasterized page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 0-based position in the source document.
    index: usize,
    image: RgbImage,
}

impl PageImage {
    pub fn new(index: usize, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based page number used in the export.
    pub fn page_number(&self) -> PageNumber {
        PageNumber::from_index(self.index)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

/// Anything that can turn a document path into ordered page rasters.
pub trait Rasterizer {
    /// Rasterize every page of the document at `path`, in document order.
    fn rasterize(&self, path: &Path) -> Result<Vec<PageImage>>;
}

/// Production rasterizer: PDF via pdfium, raster images via `image`.
#[derive(Debug, Clone)]
pub struct DocumentRasterizer {
    /// Render resolution for PDF pages.
    dpi: f32,
}

impl Default for DocumentRasterizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DPI)
    }
}

impl DocumentRasterizer {
    /// Default PDF render resolution.
    pub const DEFAULT_DPI: f32 = 200.0;

    pub fn new(dpi: f32) -> Self {
        Self { dpi }
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    /// Decode a single raster image as a one-page document.
    fn decode_image(&self, bytes: &[u8], doc_type: DocumentType) -> Result<Vec<PageImage>> {
        let decoded = image::load_from_memory(bytes).map_err(|err| {
            FolioError::Format(format!(
                "failed to decode {} image: {}",
                doc_type.mime_type(),
                err
            ))
        })?;
        debug!(
            width = decoded.width(),
            height = decoded.height(),
            "Raster input decoded"
        );
        Ok(vec![PageImage::new(0, decoded.to_rgb8())])
    }

    #[cfg(feature = "pdfium")]
    fn render_pdf(&self, bytes: &[u8]) -> Result<Vec<PageImage>> {
        use pdfium_render::prelude::*;

        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|err| {
                FolioError::Input(format!("failed to bind pdfium library: {}", err))
            })?;
        let pdfium = Pdfium::new(bindings);

        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|err| FolioError::Format(format!("failed to parse PDF: {}", err)))?;

        // PDF user space is 72 points per inch.
        let scale = self.dpi / 72.0;
        let mut pages = Vec::new();

        for (index, page) in document.pages().iter().enumerate() {
            let pixel_width = (page.width().value * scale).round() as i32;
            let pixel_height = (page.height().value * scale).round() as i32;

            let bitmap = page
                .render_with_config(
                    &PdfRenderConfig::new()
                        .set_target_width(pixel_width)
                        .set_target_height(pixel_height)
                        .render_form_data(true)
                        .render_annotations(true),
                )
                .map_err(|err| {
                    FolioError::Format(format!("failed to render page {}: {}", index + 1, err))
                })?;

            debug!(page = index + 1, pixel_width, pixel_height, "Page rendered");
            pages.push(PageImage::new(index, bitmap.as_image().to_rgb8()));
        }

        Ok(pages)
    }

    #[cfg(not(feature = "pdfium"))]
    fn render_pdf(&self, _bytes: &[u8]) -> Result<Vec<PageImage>> {
        Err(FolioError::Format(
            "PDF rasterization is not available: folio-document was built without the `pdfium` feature"
                .into(),
        ))
    }
}

impl Rasterizer for DocumentRasterizer {
    #[instrument(skip_all, fields(path = %path.display(), dpi = self.dpi))]
    fn rasterize(&self, path: &Path) -> Result<Vec<PageImage>> {
        let bytes = std::fs::read(path).map_err(|err| {
            FolioError::Input(format!("failed to read {}: {}", path.display(), err))
        })?;

        let doc_type = DocumentType::from_path(path).ok_or_else(|| {
            FolioError::Format(format!(
                "{} is not a PDF, PNG, JPEG or TIFF file",
                path.display()
            ))
        })?;
        info!(format = doc_type.mime_type(), bytes = bytes.len(), "Rasterizing document");

        let pages = if doc_type.is_raster() {
            self.decode_image(&bytes, doc_type)?
        } else {
            if !bytes.starts_with(b"%PDF-") {
                return Err(FolioError::Format(format!(
                    "{} does not start with a PDF header",
                    path.display()
                )));
            }
            self.render_pdf(&bytes)?
        };

        if pages.is_empty() {
            return Err(FolioError::Format(format!(
                "{} has no pages",
                path.display()
            )));
        }

        info!(pages = pages.len(), "Document rasterized");
        Ok(pages)
    }
}
