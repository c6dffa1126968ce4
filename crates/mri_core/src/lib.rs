//! Upload-to-result pipeline for brain MRI tumor classification.
//!
//! The crate validates a candidate image, encodes a preview, submits the
//! image to a remote classifier and normalizes whatever comes back into a
//! ranked distribution over [`OutcomeClass`]. [`session::ClassificationSession`]
//! owns the state the presentation layer renders.

pub mod client;
pub mod config;
pub mod driver;
pub mod file;
pub mod normalize;
pub mod preview;
pub mod session;
pub mod validate;

pub use client::{HttpPredictionClient, PredictionService, RawResponse, TransportError};
pub use config::ClientConfig;
pub use driver::SessionDriver;
pub use file::CandidateFile;
pub use normalize::{FormatError, fallback, normalize};
pub use preview::{PreviewError, PreviewImage};
pub use session::{ClassificationSession, CycleToken, FallbackReason, Notice, SessionState};
pub use validate::{MAX_UPLOAD_BYTES, ValidationError, validate};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use walkdir::WalkDir;

/// Diagnostic category reported by the classifier.
///
/// Declaration order is the tie-break order when two classes share a
/// confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeClass {
    #[serde(rename = "No Tumor")]
    NoTumor,
    #[serde(rename = "Glioma Tumor")]
    GliomaTumor,
    #[serde(rename = "Meningioma Tumor")]
    MeningiomaTumor,
    #[serde(rename = "Pituitary Tumor")]
    PituitaryTumor,
}

impl OutcomeClass {
    pub const ALL: [OutcomeClass; 4] = [
        OutcomeClass::NoTumor,
        OutcomeClass::GliomaTumor,
        OutcomeClass::MeningiomaTumor,
        OutcomeClass::PituitaryTumor,
    ];

    /// Human-readable label, e.g. `Glioma Tumor`.
    pub fn label(self) -> &'static str {
        match self {
            OutcomeClass::NoTumor => "No Tumor",
            OutcomeClass::GliomaTumor => "Glioma Tumor",
            OutcomeClass::MeningiomaTumor => "Meningioma Tumor",
            OutcomeClass::PituitaryTumor => "Pituitary Tumor",
        }
    }

    /// snake_case key used by keyed prediction payloads, e.g. `glioma_tumor`.
    pub fn key(self) -> &'static str {
        match self {
            OutcomeClass::NoTumor => "no_tumor",
            OutcomeClass::GliomaTumor => "glioma_tumor",
            OutcomeClass::MeningiomaTumor => "meningioma_tumor",
            OutcomeClass::PituitaryTumor => "pituitary_tumor",
        }
    }

    fn index(self) -> usize {
        match self {
            OutcomeClass::NoTumor => 0,
            OutcomeClass::GliomaTumor => 1,
            OutcomeClass::MeningiomaTumor => 2,
            OutcomeClass::PituitaryTumor => 3,
        }
    }
}

impl fmt::Display for OutcomeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One class with its confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub class: OutcomeClass,
    /// Percentage in [0,100].
    pub confidence: f64,
}

/// Where a [`ClassificationResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrigin {
    /// Normalized from a response of the prediction service.
    Model,
    /// The fixed demo distribution shown when the service could not be used.
    Fallback,
}

impl fmt::Display for ResultOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultOrigin::Model => write!(f, "model"),
            ResultOrigin::Fallback => write!(f, "fallback"),
        }
    }
}

/// Ranked distribution over all four classes.
///
/// Always holds every [`OutcomeClass`] exactly once, sorted by descending
/// confidence, so the first entry is the primary prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    predictions: Vec<PredictionResult>,
    origin: ResultOrigin,
    uploaded_image: Option<PreviewImage>,
}

impl ClassificationResult {
    /// Builds a ranked result from percentages given in [`OutcomeClass::ALL`] order.
    pub(crate) fn ranked(scores: [f64; 4], origin: ResultOrigin) -> Self {
        let mut predictions: Vec<PredictionResult> = OutcomeClass::ALL
            .iter()
            .zip(scores)
            .map(|(&class, confidence)| PredictionResult { class, confidence })
            .collect();
        // sort_by is stable: equal confidences keep declaration order
        predictions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });
        Self {
            predictions,
            origin,
            uploaded_image: None,
        }
    }

    pub fn predictions(&self) -> &[PredictionResult] {
        &self.predictions
    }

    /// Highest-confidence entry.
    pub fn primary(&self) -> &PredictionResult {
        &self.predictions[0]
    }

    pub fn primary_prediction(&self) -> OutcomeClass {
        self.primary().class
    }

    pub fn confidence_of(&self, class: OutcomeClass) -> f64 {
        self.predictions
            .iter()
            .find(|p| p.class == class)
            .map(|p| p.confidence)
            .unwrap_or(0.0)
    }

    pub fn total_confidence(&self) -> f64 {
        self.predictions.iter().map(|p| p.confidence).sum()
    }

    pub fn origin(&self) -> ResultOrigin {
        self.origin
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == ResultOrigin::Fallback
    }

    pub fn uploaded_image(&self) -> Option<&PreviewImage> {
        self.uploaded_image.as_ref()
    }

    pub(crate) fn attach_image(&mut self, image: PreviewImage) {
        self.uploaded_image = Some(image);
    }

    /// Scores in declaration order, used for lookups by class index.
    pub fn scores(&self) -> [f64; 4] {
        let mut scores = [0.0; 4];
        for p in &self.predictions {
            scores[p.class.index()] = p.confidence;
        }
        scores
    }
}

/// List the sample images bundled in `dir` as upload candidates, sorted by
/// file name.
pub fn list_samples(dir: impl AsRef<Path>) -> Result<Vec<CandidateFile>> {
    let root = dir.as_ref();
    if !root.exists() {
        anyhow::bail!("Sample folder does not exist: {}", root.display());
    }
    if !root.is_dir() {
        anyhow::bail!("Sample path is not a directory: {}", root.display());
    }

    let mut samples = Vec::new();
    for entry in WalkDir::new(root).max_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("walkdir error: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() || !file::is_supported_image(path) {
            continue;
        }
        match CandidateFile::from_path(path) {
            Ok(candidate) => samples.push(candidate),
            Err(e) => tracing::warn!("Skipping sample {}: {e:#}", path.display()),
        }
    }

    Ok(samples)
}

/// Export a result to CSV with headers: rank,class,confidence,origin
pub fn export_csv(result: &ClassificationResult, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    wtr.write_record(["rank", "class", "confidence", "origin"])?;

    let origin = result.origin().to_string();
    for (idx, prediction) in result.predictions().iter().enumerate() {
        let rank = (idx + 1).to_string();
        let confidence = format!("{:.1}", prediction.confidence);
        wtr.write_record([
            rank.as_str(),
            prediction.class.label(),
            confidence.as_str(),
            origin.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
