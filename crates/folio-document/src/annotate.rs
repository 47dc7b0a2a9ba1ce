// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page annotator: draw detection boxes and "{class} {score}" labels onto a
// page raster using the `imageproc` drawing primitives and an `ab_glyph` font.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use folio_core::config::PipelineConfig;
use folio_core::detection::{BoundingBox, RawDetections};
use folio_core::error::{FolioError, Result};
use folio_core::labels::ClassLabelTable;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{debug, info, instrument};

/// DejaVu Sans Mono, compiled into the binary so labels never depend on the
/// fonts installed on the host. License in `assets/DejaVuSansMono.LICENSE`.
static BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Text anchors are kept this far inside the `i32` range so that glyph
/// offsets added by the text renderer cannot overflow.
const ANCHOR_LIMIT: i64 = (i32::MAX / 2) as i64;

/// Fixed drawing parameters for overlays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    /// Outline and label colour.
    pub color: [u8; 3],
    /// Outline width in pixels, growing inward from the box edge.
    pub thickness: u32,
    /// Label glyph height in pixels.
    pub font_scale: f32,
}

impl Default for OverlayStyle {
    /// Red 3 px outlines with 16 px labels.
    fn default() -> Self {
        Self {
            color: [255, 0, 0],
            thickness: 3,
            font_scale: 16.0,
        }
    }
}

/// Text drawn next to a box: class name and score to two decimals.
pub fn label_text(class_name: &str, score: f32) -> String {
    format!("{class_name} {score:.2}")
}

/// Draws detections onto page rasters.
///
/// Boxes are drawn at exactly the coordinates the model reported, in page
/// pixel space, with no rescaling. The caller must rasterize pages at the
/// resolution the detector reports boxes in.
pub struct PageAnnotator {
    style: OverlayStyle,
    font: FontArc,
}

impl PageAnnotator {
    pub fn new(style: OverlayStyle, font: FontArc) -> Self {
        Self { style, font }
    }

    /// Label with the font compiled into the crate.
    pub fn with_bundled_font(style: OverlayStyle) -> Result<Self> {
        let font = FontArc::try_from_slice(BUNDLED_FONT)
            .map_err(|_| FolioError::Render("bundled label font is corrupt".into()))?;
        Ok(Self::new(style, font))
    }

    /// Load the label font from `font_path`.
    #[instrument(skip_all, fields(path = %font_path.as_ref().display()))]
    pub fn from_font_path(style: OverlayStyle, font_path: impl AsRef<Path>) -> Result<Self> {
        let path = font_path.as_ref();
        let data = std::fs::read(path).map_err(|err| {
            FolioError::Config(format!("failed to read font {}: {}", path.display(), err))
        })?;
        let font = FontArc::try_from_vec(data).map_err(|_| {
            FolioError::Config(format!("failed to parse font file {}", path.display()))
        })?;
        info!("Loaded label font");
        Ok(Self::new(style, font))
    }

    /// Build from pipeline configuration: the configured font if set,
    /// otherwise the bundled one.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        match &config.font_path {
            Some(path) => Self::from_font_path(OverlayStyle::default(), path),
            None => Self::with_bundled_font(OverlayStyle::default()),
        }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Draw every detection onto `image`, in model order.
    ///
    /// All class names are resolved before anything is drawn, so a
    /// [`FolioError::LabelLookup`] leaves no half-annotated page behind.
    #[instrument(skip_all, fields(width = image.width(), height = image.height(), detections = detections.len()))]
    pub fn annotate(
        &self,
        mut image: RgbImage,
        detections: &RawDetections,
        labels: &ClassLabelTable,
    ) -> Result<RgbImage> {
        let mut overlays = Vec::with_capacity(detections.len());
        for detection in detections.iter() {
            let name = labels.name(detection.class_id)?;
            overlays.push((detection.bbox, label_text(name, detection.score)));
        }

        let color = Rgb(self.style.color);
        for (bbox, text) in &overlays {
            let (left, top) = draw_box(&mut image, bbox, self.style.thickness, color)?;
            draw_text_mut(
                &mut image,
                color,
                left,
                top,
                PxScale::from(self.style.font_scale),
                &self.font,
                text,
            );
        }

        debug!(drawn = overlays.len(), "Page annotated");
        Ok(image)
    }
}

/// Draw `bbox` as an outline `thickness` pixels wide, growing inward from the
/// box edge. Both corner pixels are part of the outline. Returns the rounded
/// top-left corner as the label anchor.
///
/// Box coordinates are any finite values; only the part of the outline that
/// lands on the page is drawn.
fn draw_box(
    image: &mut RgbImage,
    bbox: &BoundingBox,
    thickness: u32,
    color: Rgb<u8>,
) -> Result<(i32, i32)> {
    if !bbox.is_finite() {
        return Err(FolioError::Render(format!(
            "box has non-finite coordinates: {:?}",
            <[f32; 4]>::from(*bbox)
        )));
    }
    if bbox.x2 < bbox.x1 || bbox.y2 < bbox.y1 {
        return Err(FolioError::Render(format!(
            "box corners are inverted: {:?}",
            <[f32; 4]>::from(*bbox)
        )));
    }

    // Float to int casts saturate; the saturating steps below keep every
    // later step in range.
    let left = bbox.x1.round() as i64;
    let top = bbox.y1.round() as i64;
    let right = bbox.x2.round() as i64;
    let bottom = bbox.y2.round() as i64;

    for inset in 0..i64::from(thickness.max(1)) {
        let edges = Edges {
            left: left.saturating_add(inset),
            top: top.saturating_add(inset),
            right: right.saturating_sub(inset),
            bottom: bottom.saturating_sub(inset),
        };
        if edges.right < edges.left || edges.bottom < edges.top {
            break;
        }
        edges.draw(image, color);
    }

    Ok((anchor(left), anchor(top)))
}

fn anchor(coordinate: i64) -> i32 {
    coordinate.clamp(-ANCHOR_LIMIT, ANCHOR_LIMIT) as i32
}

/// One pixel-wide rectangle outline in page coordinates, inclusive on all sides.
struct Edges {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl Edges {
    /// Draw the four sides, each clipped to the page. A side lying off the
    /// page is not drawn, and no edge appears along the page border.
    fn draw(&self, image: &mut RgbImage, color: Rgb<u8>) {
        let width = i64::from(image.width());
        let height = i64::from(image.height());

        let x_from = self.left.max(0);
        let x_to = self.right.min(width - 1);
        let y_from = self.top.max(0);
        let y_to = self.bottom.min(height - 1);
        if x_from > x_to || y_from > y_to {
            return;
        }

        for y in [self.top, self.bottom] {
            if (0..height).contains(&y) {
                fill(image, x_from, y, x_to, y, color);
            }
        }
        for x in [self.left, self.right] {
            if (0..width).contains(&x) {
                fill(image, x, y_from, x, y_to, color);
            }
        }
    }
}

/// Fill the inclusive span `(x0, y0)..=(x1, y1)`, already clipped to the page.
fn fill(image: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let rect = Rect::at(x0 as i32, y0 as i32).of_size((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32);
    draw_filled_rect_mut(image, rect, color);
}
