// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection export: the document-wide record sequence as a JSON array, plus
// a SHA-256 fingerprint of the exported bytes.

use std::path::Path;

use folio_core::detection::DetectionRecord;
use folio_core::error::{FolioError, Result};
use serde_json::ser::{PrettyFormatter, Serializer};
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
///
/// Exports are deterministic, so two runs over the same document with the
/// same model produce the same digest.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Serializes detection records as
/// `[{"page", "box", "score", "class_id", "class_name"}, ...]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultExporter;

impl ResultExporter {
    pub fn new() -> Self {
        Self
    }

    /// The export as bytes: a JSON array, four-space indented, records in
    /// the order given.
    pub fn to_bytes(&self, records: &[DetectionRecord]) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = Serializer::with_formatter(&mut buf, formatter);
        serde::Serialize::serialize(records, &mut serializer)?;
        Ok(buf)
    }

    /// Write already-serialized export bytes to `path` and return their digest.
    ///
    /// The write is not atomic; a failure leaves whatever reached the disk.
    #[instrument(skip_all, fields(path = %path.display(), bytes = bytes.len()))]
    pub fn write_bytes(&self, bytes: &[u8], path: &Path) -> Result<String> {
        std::fs::write(path, bytes).map_err(|err| {
            FolioError::Output(format!("failed to write {}: {}", path.display(), err))
        })?;
        let digest = hash_bytes(bytes);
        info!(sha256 = %digest, "Wrote detection export");
        Ok(digest)
    }

    /// Serialize `records` and write them to `path`, returning the digest.
    pub fn write_to_file(&self, records: &[DetectionRecord], path: impl AsRef<Path>) -> Result<String> {
        let bytes = self.to_bytes(records)?;
        self.write_bytes(&bytes, path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::detection::{BoundingBox, RawDetection};
    use folio_core::labels::ClassLabelTable;
    use folio_core::types::PageNumber;

    /// SHA-256 of the empty byte slice (well-known constant).
    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn claudia() -> DetectionRecord {
        let labels = ClassLabelTable::new(["claudia", "xochitl", "maynez"]).unwrap();
        let detection = RawDetection {
            index: 0,
            bbox: BoundingBox::new(10.0, 10.0, 50.0, 50.0),
            score: 0.91,
            class_id: 0,
        };
        DetectionRecord::new(PageNumber::from_index(0), &detection, &labels).unwrap()
    }

    #[test]
    fn hash_empty_input() {
        assert_eq!(hash_bytes(b""), EMPTY_SHA256);
    }

    #[test]
    fn no_records_export_as_empty_array() {
        let bytes = ResultExporter::new().to_bytes(&[]).unwrap();
        assert_eq!(bytes, b"[]");
    }

    #[test]
    fn records_are_indented_with_four_spaces() {
        let text = String::from_utf8(ResultExporter::new().to_bytes(&[claudia()]).unwrap()).unwrap();
        let expected = "[\n    {\n        \"page\": 1,\n        \"box\": [\n            10.0,\n            10.0,\n            50.0,\n            50.0\n        ],\n        \"score\": 0.91,\n        \"class_id\": 0,\n        \"class_name\": \"claudia\"\n    }\n]";
        assert_eq!(text, expected);
    }

    #[test]
    fn export_parses_back_to_the_same_records() {
        let records = vec![claudia(), claudia()];
        let bytes = ResultExporter::new().to_bytes(&records).unwrap();
        let parsed: Vec<DetectionRecord> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].class_name, "claudia");
        assert_eq!(parsed[0].bbox, records[0].bbox);
        assert_eq!(parsed[0].score, records[0].score);
    }

    #[test]
    fn write_returns_digest_of_written_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detections.json");
        let exporter = ResultExporter::new();
        let digest = exporter.write_to_file(&[claudia()], &path).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(digest, hash_bytes(&written));
        assert_eq!(written, exporter.to_bytes(&[claudia()]).unwrap());
    }

    #[test]
    fn write_to_missing_directory_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("detections.json");
        let result = ResultExporter::new().write_to_file(&[], &path);
        assert!(matches!(result, Err(FolioError::Output(_))));
    }
}
