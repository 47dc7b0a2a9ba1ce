// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline orchestrator: rasterize, detect per page, annotate, aggregate,
// assemble and export, aborting the whole document on the first failure.

use std::path::Path;

use folio_core::config::PipelineConfig;
use folio_core::detection::{DetectionRecord, PageDetections};
use folio_core::error::{FolioError, Result};
use folio_core::labels::ClassLabelTable;
use folio_detect::DetectionModel;
use folio_document::{DocumentAssembler, PageAnnotator, PageImage, Rasterizer};
use image::RgbImage;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::aggregate::{ResultAggregator, order_pages};
use crate::export::ResultExporter;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Pages in the input and in the output document.
    pub pages: usize,
    /// Records in the export.
    pub detections: usize,
    /// SHA-256 of the export file.
    pub export_sha256: String,
}

/// A fully processed document, held in memory, not yet written.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    /// Annotated page rasters, in document order.
    pub pages: Vec<RgbImage>,
    /// Every detection on every page, pages ascending.
    pub records: Vec<DetectionRecord>,
}

/// One configured run over one document.
pub struct Pipeline<R, M> {
    config: PipelineConfig,
    labels: ClassLabelTable,
    rasterizer: R,
    model: M,
    annotator: PageAnnotator,
    assembler: DocumentAssembler,
    exporter: ResultExporter,
}

impl<R: Rasterizer, M: DetectionModel> Pipeline<R, M> {
    /// Validate `config` and build the stages it describes.
    pub fn new(config: PipelineConfig, rasterizer: R, model: M) -> Result<Self> {
        config.validate()?;
        let labels = config.label_table()?;
        let annotator = PageAnnotator::from_config(&config)?;

        let mut assembler = DocumentAssembler::new(config.raster_dpi);
        if let Some(stem) = config.input_path.file_stem() {
            assembler.set_title(format!("{} (annotated)", stem.to_string_lossy()));
        }

        Ok(Self {
            config,
            labels,
            rasterizer,
            model,
            annotator,
            assembler,
            exporter: ResultExporter::new(),
        })
    }

    /// Replace the annotator built from the configuration.
    pub fn with_annotator(mut self, annotator: PageAnnotator) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage and write the annotated document and the export.
    ///
    /// Nothing is written until every page has been inferred, annotated and
    /// aggregated and the output document has been assembled in memory.
    #[instrument(skip_all, fields(
        input = %self.config.input_path.display(),
        model = self.model.name(),
    ))]
    pub fn run(&self) -> Result<RunSummary> {
        let processed = self.process()?;

        let document = self.assembler.assemble(&processed.pages)?;
        let export = self.exporter.to_bytes(&processed.records)?;

        write_output(&self.config.output_document_path, &document)?;
        info!(
            path = %self.config.output_document_path.display(),
            pages = processed.pages.len(),
            "Wrote annotated document"
        );
        let export_sha256 = self
            .exporter
            .write_bytes(&export, &self.config.output_export_path)?;

        Ok(RunSummary {
            pages: processed.pages.len(),
            detections: processed.records.len(),
            export_sha256,
        })
    }

    /// Rasterize, detect, annotate and aggregate without writing anything.
    pub fn process(&self) -> Result<ProcessedDocument> {
        let mut pages = self.rasterizer.rasterize(&self.config.input_path)?;
        pages.sort_by_key(PageImage::index);
        let page_count = pages.len();
        info!(pages = page_count, "Document rasterized");

        let detected = if self.config.parallel_inference {
            info!("Running inference in parallel");
            let model = &self.model;
            pages
                .par_iter()
                .map(|page| detect_page(model, page))
                .collect::<Result<Vec<_>>>()?
        } else {
            pages
                .iter()
                .map(|page| detect_page(&self.model, page))
                .collect::<Result<Vec<_>>>()?
        };
        let detected = order_pages(detected, page_count)?;

        let mut annotated = Vec::with_capacity(page_count);
        for (page, found) in pages.into_iter().zip(&detected) {
            if page.page_number() != found.page {
                return Err(FolioError::Validation(format!(
                    "rasterizer page {} does not match detections for page {}",
                    page.page_number(),
                    found.page
                )));
            }
            let image = self
                .annotator
                .annotate(page.into_image(), &found.detections, &self.labels)
                .map_err(|err| err.at_page(found.page))?;
            annotated.push(image);
        }
        info!(pages = annotated.len(), "Pages annotated");

        let records = ResultAggregator::new(&self.labels).aggregate(detected)?;
        info!(detections = records.len(), "Detections aggregated");

        Ok(ProcessedDocument {
            pages: annotated,
            records,
        })
    }
}

/// Invoke the model once on one page and tag the result with its page number.
fn detect_page<M: DetectionModel>(model: &M, page: &PageImage) -> Result<PageDetections> {
    let number = page.page_number();
    let detections = model
        .detect(page.image())
        .map_err(|err| err.at_page(number))?;
    debug!(page = %number, detections = detections.len(), "Page inferred");
    Ok(PageDetections::new(number, detections))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)
        .map_err(|err| FolioError::Output(format!("failed to write {}: {}", path.display(), err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use folio_core::detection::{BoundingBox, RawDetections};
    use folio_document::{OverlayStyle, PdfInspector};
    use image::Rgb;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const RED: Rgb<u8> = Rgb([255, 0, 0]);

    type Script = Vec<Vec<([f32; 4], f32, usize)>>;

    /// Serves in-memory pages. Pixel (0, 0) of page `i` has red channel `i`
    /// so the scripted model can tell pages apart.
    struct FakeRasterizer {
        pages: usize,
    }

    impl FakeRasterizer {
        fn page(index: usize) -> RgbImage {
            let mut image = RgbImage::from_pixel(100, 100, WHITE);
            image.put_pixel(0, 0, Rgb([index as u8, 255, 255]));
            image
        }
    }

    impl Rasterizer for FakeRasterizer {
        fn rasterize(&self, _path: &Path) -> Result<Vec<PageImage>> {
            Ok((0..self.pages)
                .map(|index| PageImage::new(index, Self::page(index)))
                .collect())
        }
    }

    /// Serves the same pages as `FakeRasterizer`, last page first.
    struct ReversedRasterizer {
        pages: usize,
    }

    impl Rasterizer for ReversedRasterizer {
        fn rasterize(&self, _path: &Path) -> Result<Vec<PageImage>> {
            Ok((0..self.pages)
                .rev()
                .map(|index| PageImage::new(index, FakeRasterizer::page(index)))
                .collect())
        }
    }

    /// Serves page 1 twice.
    struct DuplicatingRasterizer;

    impl Rasterizer for DuplicatingRasterizer {
        fn rasterize(&self, _path: &Path) -> Result<Vec<PageImage>> {
            Ok(vec![
                PageImage::new(0, FakeRasterizer::page(0)),
                PageImage::new(0, FakeRasterizer::page(0)),
            ])
        }
    }

    /// Returns the scripted detections for whichever page it is shown.
    struct ScriptedModel {
        script: Script,
        fail_on: Option<usize>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(script: Script) -> Self {
            Self {
                script,
                fail_on: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl DetectionModel for ScriptedModel {
        fn detect(&self, image: &RgbImage) -> Result<RawDetections> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let index = image.get_pixel(0, 0)[0] as usize;
            if self.fail_on == Some(index) {
                return Err(FolioError::Inference("tensor shape mismatch".into()));
            }
            Ok(self.script[index]
                .iter()
                .map(|(bbox, score, class_id)| (BoundingBox::from(*bbox), *score, *class_id))
                .collect())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn config(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            input_path: dir.join("archive.pdf"),
            output_document_path: dir.join("annotated.pdf"),
            output_export_path: dir.join("detections.json"),
            class_names: vec!["claudia".into(), "xochitl".into(), "maynez".into()],
            ..PipelineConfig::default()
        }
    }

    fn pipeline(
        config: PipelineConfig,
        pages: usize,
        model: ScriptedModel,
    ) -> Pipeline<FakeRasterizer, ScriptedModel> {
        Pipeline::new(config, FakeRasterizer { pages }, model).unwrap()
    }

    fn claudia_script() -> Script {
        vec![vec![([10.0, 10.0, 50.0, 50.0], 0.91, 0)], vec![]]
    }

    fn outputs(config: &PipelineConfig) -> [PathBuf; 2] {
        [
            config.output_document_path.clone(),
            config.output_export_path.clone(),
        ]
    }

    #[test]
    fn two_page_claudia_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let summary = pipeline(config.clone(), 2, ScriptedModel::new(claudia_script()))
            .run()
            .unwrap();

        assert_eq!(summary.pages, 2);
        assert_eq!(summary.detections, 1);

        let export = std::fs::read(&config.output_export_path).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&export).unwrap();
        let record = &parsed[0];
        assert_eq!(parsed.as_array().unwrap().len(), 1);
        assert_eq!(record["page"], 1);
        assert_eq!(record["class_id"], 0);
        assert_eq!(record["class_name"], "claudia");
        let bbox: Vec<f64> = record["box"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert_eq!(bbox, vec![10.0, 10.0, 50.0, 50.0]);
        assert_eq!(summary.export_sha256, crate::export::hash_bytes(&export));
        assert!(String::from_utf8(export).unwrap().contains("\"score\": 0.91"));

        assert_eq!(PdfInspector::open(&config.output_document_path).unwrap().page_count(), 2);
    }

    #[test]
    fn claudia_pages_are_annotated_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let processed = pipeline(config(dir.path()), 2, ScriptedModel::new(claudia_script()))
            .process()
            .unwrap();

        assert_eq!(processed.pages.len(), 2);
        assert_eq!(processed.pages[0].get_pixel(10, 10), &RED);
        assert_eq!(processed.pages[0].get_pixel(50, 50), &RED);
        assert_eq!(processed.pages[0].get_pixel(30, 40), &WHITE);
        let label_pixels = (13..48)
            .flat_map(|x| (13..30).map(move |y| (x, y)))
            .filter(|&(x, y)| processed.pages[0].get_pixel(x, y) != &WHITE)
            .count();
        assert!(label_pixels > 0, "label text missing");
        assert_eq!(processed.pages[1], FakeRasterizer::page(1));
    }

    #[test]
    fn custom_annotator_style_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let style = OverlayStyle {
            color: [0, 0, 255],
            thickness: 1,
            font_scale: 12.0,
        };
        let processed = pipeline(config(dir.path()), 2, ScriptedModel::new(claudia_script()))
            .with_annotator(PageAnnotator::with_bundled_font(style).unwrap())
            .process()
            .unwrap();

        let page = &processed.pages[0];
        assert_eq!(page.get_pixel(10, 30), &Rgb([0, 0, 255]));
        assert_eq!(page.get_pixel(11, 30), &WHITE);
    }

    #[test]
    fn out_of_order_pages_keep_their_own_detections() {
        let dir = tempfile::tempdir().unwrap();
        let processed = Pipeline::new(
            config(dir.path()),
            ReversedRasterizer { pages: 2 },
            ScriptedModel::new(claudia_script()),
        )
        .unwrap()
        .process()
        .unwrap();

        assert_eq!(processed.records.len(), 1);
        assert_eq!(processed.records[0].page.get(), 1);
        // Page 1 carries the box and comes first; page 2 is untouched.
        assert_eq!(processed.pages[0].get_pixel(0, 0), &Rgb([0, 255, 255]));
        assert_eq!(processed.pages[0].get_pixel(50, 50), &RED);
        assert_eq!(processed.pages[1], FakeRasterizer::page(1));
    }

    #[test]
    fn duplicate_page_index_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Pipeline::new(
            config(dir.path()),
            DuplicatingRasterizer,
            ScriptedModel::new(vec![vec![]; 2]),
        )
        .unwrap()
        .process();
        assert!(matches!(result, Err(FolioError::Validation(_))));
    }

    #[test]
    fn model_is_called_once_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let model = ScriptedModel::new(vec![vec![]; 4]);
        let pipeline = pipeline(config(dir.path()), 4, model);
        pipeline.process().unwrap();
        assert_eq!(pipeline.model.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn repeated_runs_export_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let pipeline = pipeline(config.clone(), 2, ScriptedModel::new(claudia_script()));

        let first = pipeline.run().unwrap();
        let first_bytes = std::fs::read(&config.output_export_path).unwrap();
        let second = pipeline.run().unwrap();
        let second_bytes = std::fs::read(&config.output_export_path).unwrap();

        assert_eq!(first_bytes, second_bytes);
        assert_eq!(first.export_sha256, second.export_sha256);
    }

    #[test]
    fn parallel_inference_matches_sequential() {
        let script: Script = (0..6)
            .map(|i| {
                let offset = i as f32 * 5.0;
                vec![
                    ([offset, offset, offset + 20.0, offset + 20.0], 0.8, i % 3),
                    ([60.0, 10.0, 90.0, 40.0], 0.55, (i + 1) % 3),
                ]
            })
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let sequential = pipeline(config(dir.path()), 6, ScriptedModel::new(script.clone()))
            .process()
            .unwrap();
        let parallel_config = PipelineConfig {
            parallel_inference: true,
            ..config(dir.path())
        };
        let parallel = pipeline(parallel_config, 6, ScriptedModel::new(script))
            .process()
            .unwrap();

        assert_eq!(sequential.records, parallel.records);
        assert_eq!(sequential.pages, parallel.pages);
        let exporter = ResultExporter::new();
        assert_eq!(
            exporter.to_bytes(&sequential.records).unwrap(),
            exporter.to_bytes(&parallel.records).unwrap()
        );
    }

    #[test]
    fn pages_without_detections_export_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let summary = pipeline(config.clone(), 3, ScriptedModel::new(vec![vec![]; 3]))
            .run()
            .unwrap();
        assert_eq!(summary.detections, 0);
        assert_eq!(std::fs::read(&config.output_export_path).unwrap(), b"[]");
        assert_eq!(PdfInspector::open(&config.output_document_path).unwrap().page_count(), 3);
    }

    #[test]
    fn unknown_class_aborts_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let script = vec![vec![], vec![([1.0, 1.0, 5.0, 5.0], 0.7, 9)]];
        let result = pipeline(config.clone(), 2, ScriptedModel::new(script)).run();

        assert!(matches!(
            result,
            Err(FolioError::LabelLookup {
                class_id: 9,
                table_len: 3
            })
        ));
        for path in outputs(&config) {
            assert!(!path.exists(), "{} should not exist", path.display());
        }
    }

    #[test]
    fn inference_failure_names_the_page() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut model = ScriptedModel::new(vec![vec![]; 3]);
        model.fail_on = Some(1);
        let err = pipeline(config.clone(), 3, model).run().unwrap_err();

        assert!(matches!(err, FolioError::Inference(_)));
        assert!(err.to_string().contains("page 2"), "{err}");
        for path in outputs(&config) {
            assert!(!path.exists());
        }
    }

    #[test]
    fn out_of_range_score_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![vec![([1.0, 1.0, 5.0, 5.0], 1.2, 0)]];
        let result = pipeline(config(dir.path()), 1, ScriptedModel::new(script)).run();
        assert!(matches!(result, Err(FolioError::InvalidScore { .. })));
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            class_names: Vec::new(),
            ..config(dir.path())
        };
        let result = Pipeline::new(config, FakeRasterizer { pages: 1 }, ScriptedModel::new(vec![vec![]]));
        assert!(matches!(result, Err(FolioError::Config(_))));
    }

    #[test]
    fn unwritable_output_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            output_document_path: dir.path().join("missing").join("annotated.pdf"),
            ..config(dir.path())
        };
        let result = pipeline(config, 1, ScriptedModel::new(vec![vec![]])).run();
        assert!(matches!(result, Err(FolioError::Output(_))));
    }
}
