// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The detection model contract.

use folio_core::detection::RawDetections;
use folio_core::error::Result;
use image::RgbImage;

/// A loaded object-detection model.
///
/// `detect` is called exactly once per page and must not keep state between
/// calls, so pages can be inferred in any order or in parallel. Boxes are
/// reported in the pixel space of the image passed in.
pub trait DetectionModel: Send + Sync {
    /// Run the model on one page raster.
    fn detect(&self, image: &RgbImage) -> Result<RawDetections>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

impl<M: DetectionModel + ?Sized> DetectionModel for Box<M> {
    fn detect(&self, image: &RgbImage) -> Result<RawDetections> {
        (**self).detect(image)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<M: DetectionModel + ?Sized> DetectionModel for &M {
    fn detect(&self, image: &RgbImage) -> Result<RawDetections> {
        (**self).detect(image)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
