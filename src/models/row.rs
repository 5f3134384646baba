use serde::{Deserialize, Serialize};

/// Marker written in place of an output reference when an image failed.
pub const ERROR_SENTINEL: &str = "error";

/// One structurally valid data row of an uploaded table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    pub serial_number: String,
    pub product_label: String,
    /// Everything from the third field on, re-joined with commas.
    pub raw_url_text: String,
}

/// Outcome for a single image position within a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageOutcome {
    Stored(String),
    Failed,
}

impl ImageOutcome {
    pub fn as_output_ref(&self) -> &str {
        match self {
            ImageOutcome::Stored(public_ref) => public_ref,
            ImageOutcome::Failed => ERROR_SENTINEL,
        }
    }

    pub fn stored_ref(&self) -> Option<&str> {
        match self {
            ImageOutcome::Stored(public_ref) => Some(public_ref),
            ImageOutcome::Failed => None,
        }
    }
}

/// Per-row result; `outputs` is positionally aligned with `input_urls`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowResult {
    pub serial_number: String,
    pub product_label: String,
    pub input_urls: Vec<String>,
    pub outputs: Vec<ImageOutcome>,
}

impl RowResult {
    pub fn output_refs(&self) -> Vec<&str> {
        self.outputs.iter().map(ImageOutcome::as_output_ref).collect()
    }

    pub fn produced_artifacts(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().filter_map(ImageOutcome::stored_ref)
    }

    pub fn failed_count(&self) -> usize {
        self.outputs
            .iter()
            .filter(|outcome| matches!(outcome, ImageOutcome::Failed))
            .count()
    }
}
