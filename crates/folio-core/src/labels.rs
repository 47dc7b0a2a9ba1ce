// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Class label table: maps a model's integer class ids to display names.

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// Fixed ordered mapping `class_id -> name`.
///
/// The table must cover every class id the model can emit. A lookup past the
/// end is a hard [`FolioError::LabelLookup`], never a placeholder name: a miss
/// means the model and the label table disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ClassLabelTable {
    names: Vec<String>,
}

impl ClassLabelTable {
    /// Build a table from names in class-id order.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(FolioError::Config(
                "class label table must contain at least one name".into(),
            ));
        }
        if let Some(position) = names.iter().position(|name| name.trim().is_empty()) {
            return Err(FolioError::Config(format!(
                "class label for class_id {position} is blank"
            )));
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve `class_id` to its name.
    pub fn name(&self, class_id: usize) -> Result<&str> {
        self.names
            .get(class_id)
            .map(String::as_str)
            .ok_or(FolioError::LabelLookup {
                class_id,
                table_len: self.names.len(),
            })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl TryFrom<Vec<String>> for ClassLabelTable {
    type Error = FolioError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Self::new(names)
    }
}

impl From<ClassLabelTable> for Vec<String> {
    fn from(table: ClassLabelTable) -> Self {
        table.names
    }
}
