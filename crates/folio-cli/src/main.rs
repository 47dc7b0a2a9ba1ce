// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio: batch object detection and visual annotation over scanned documents.
//
// Entry point. Initialises logging, builds the pipeline configuration from the
// optional config file and the command line, and runs one document.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use folio_core::config::PipelineConfig;
use folio_core::error::Result;
use folio_core::human_errors::humanize_error;
use folio_detect::YoloDetector;
use folio_document::DocumentRasterizer;
use folio_pipeline::Pipeline;

/// Detect labelled regions on every page of a document and write an
/// annotated PDF plus a JSON export of the detections.
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Document to annotate (PDF, PNG, JPEG or TIFF)
    input: PathBuf,

    /// Where to write the annotated PDF
    output_pdf: PathBuf,

    /// Where to write the JSON detection export
    output_json: PathBuf,

    /// JSON configuration file; command-line options override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Detection model (.rten)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Class names in class-id order, comma separated
    #[arg(long, value_delimiter = ',')]
    classes: Option<Vec<String>>,

    /// Confidence threshold
    #[arg(long)]
    conf: Option<f32>,

    /// IoU threshold for non-maximum suppression
    #[arg(long)]
    iou: Option<f32>,

    /// Rasterization resolution
    #[arg(long)]
    dpi: Option<f32>,

    /// Font for box labels
    #[arg(long)]
    font: Option<PathBuf>,

    /// Run inference on pages in parallel
    #[arg(long)]
    parallel: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// The configuration file (or defaults) with command-line overrides applied.
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        config.input_path = self.input.clone();
        config.output_document_path = self.output_pdf.clone();
        config.output_export_path = self.output_json.clone();

        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(classes) = &self.classes {
            config.class_names = classes.iter().map(|name| name.trim().to_owned()).collect();
        }
        if let Some(conf) = self.conf {
            config.conf_threshold = conf;
        }
        if let Some(iou) = self.iou {
            config.iou_threshold = iou;
        }
        if let Some(dpi) = self.dpi {
            config.raster_dpi = dpi;
        }
        if let Some(font) = &self.font {
            config.font_path = Some(font.clone());
        }
        if self.parallel {
            config.parallel_inference = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.pipeline_config()?;
    let model = YoloDetector::from_config(&config)?;
    let rasterizer = DocumentRasterizer::new(config.raster_dpi);

    let summary = Pipeline::new(config, rasterizer, model)?.run()?;
    tracing::info!(
        pages = summary.pages,
        detections = summary.detections,
        sha256 = %summary.export_sha256,
        "Run complete"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Folio starting");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, class = ?err.class(), "Run failed");
            let human = humanize_error(&err);
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}
