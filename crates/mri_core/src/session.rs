//! Upload cycle state machine.
//!
//! ```text
//! Idle ──[select]──► Previewing ──[submit]──► Loading ──[ok]──────► Loaded
//!                                                     ──[failure]─► FallbackLoaded
//! Any ──[reset]──► Idle
//! Any ──[select]──► Previewing   (supersedes the running cycle)
//! ```
//!
//! Every accepted selection gets a fresh [`CycleToken`]. Outcomes carrying an
//! older token are dropped, so a slow response can never overwrite the
//! result of a newer upload.

use crate::client::{RawResponse, TransportError};
use crate::file::CandidateFile;
use crate::normalize::{self, FormatError};
use crate::preview::{PreviewError, PreviewImage};
use crate::validate::{self, ValidationError};
use crate::{ClassificationResult, OutcomeClass};
use std::fmt;

/// Identifies one upload cycle. Strictly increasing per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleToken(u64);

impl CycleToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Why a cycle ended on the demo distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The service could not be reached or answered with an error.
    Transport(String),
    /// The upload could not be read for submission.
    Unreadable(String),
    /// The service answered with a shape the normalizer does not know.
    Format(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Transport(msg) => write!(f, "service unavailable: {msg}"),
            FallbackReason::Unreadable(msg) => write!(f, "upload unreadable: {msg}"),
            FallbackReason::Format(msg) => write!(f, "unrecognized response: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// File accepted, jobs not yet started.
    Previewing {
        cycle: CycleToken,
        file_name: String,
        preview: Option<PreviewImage>,
    },
    /// Waiting for the prediction service.
    Loading {
        cycle: CycleToken,
        file_name: String,
        preview: Option<PreviewImage>,
    },
    Loaded {
        cycle: CycleToken,
        file_name: String,
        result: ClassificationResult,
    },
    FallbackLoaded {
        cycle: CycleToken,
        file_name: String,
        result: ClassificationResult,
        reason: FallbackReason,
    },
}

impl SessionState {
    pub fn cycle(&self) -> Option<CycleToken> {
        match self {
            SessionState::Idle => None,
            SessionState::Previewing { cycle, .. }
            | SessionState::Loading { cycle, .. }
            | SessionState::Loaded { cycle, .. }
            | SessionState::FallbackLoaded { cycle, .. } => Some(*cycle),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Previewing { .. } => "previewing",
            SessionState::Loading { .. } => "loading",
            SessionState::Loaded { .. } => "loaded",
            SessionState::FallbackLoaded { .. } => "fallback",
        }
    }
}

/// Advisory messages for the user; not part of the session state.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    InvalidType { file_name: String },
    FileTooLarge { file_name: String, size: u64 },
    ProcessingStarted { file_name: String },
    AnalysisComplete { class: OutcomeClass, confidence: f64 },
    /// The demo distribution is shown instead of a model result.
    ApiUnavailable,
    GenericFailure(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::InvalidType { file_name } => {
                write!(f, "{file_name} is not an image. Please choose a JPG or PNG scan.")
            }
            Notice::FileTooLarge { file_name, size } => write!(
                f,
                "{file_name} is {:.1} MB; the maximum is 10 MB.",
                *size as f64 / (1024.0 * 1024.0)
            ),
            Notice::ProcessingStarted { file_name } => write!(f, "Analyzing {file_name}..."),
            Notice::AnalysisComplete { class, confidence } => {
                write!(f, "Analysis complete: {class} ({confidence:.1}%)")
            }
            Notice::ApiUnavailable => {
                write!(f, "Prediction service unavailable. Showing demo results.")
            }
            Notice::GenericFailure(msg) => write!(f, "Something went wrong: {msg}"),
        }
    }
}

/// Owns the session state; the only place it changes.
#[derive(Debug, Default)]
pub struct ClassificationSession {
    state: SessionState,
    generation: u64,
    notices: Vec<Notice>,
}

impl ClassificationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.state,
            SessionState::Previewing { .. } | SessionState::Loading { .. }
        )
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        match &self.state {
            SessionState::Loaded { result, .. } | SessionState::FallbackLoaded { result, .. } => {
                Some(result)
            }
            _ => None,
        }
    }

    /// The preview of the current cycle, once it has resolved.
    pub fn image(&self) -> Option<&PreviewImage> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Previewing { preview, .. } | SessionState::Loading { preview, .. } => {
                preview.as_ref()
            }
            SessionState::Loaded { result, .. } | SessionState::FallbackLoaded { result, .. } => {
                result.uploaded_image()
            }
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Previewing { file_name, .. }
            | SessionState::Loading { file_name, .. }
            | SessionState::Loaded { file_name, .. }
            | SessionState::FallbackLoaded { file_name, .. } => Some(file_name),
        }
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn is_current(&self, cycle: CycleToken) -> bool {
        self.state.cycle() == Some(cycle)
    }

    /// Validate a selection and open a new cycle for it.
    ///
    /// A rejected file leaves the state untouched. An accepted one
    /// supersedes whatever cycle was running.
    pub fn select(&mut self, file: &CandidateFile) -> Result<CycleToken, ValidationError> {
        // the recorded size may predate a rewrite of the file on disk
        let current = file.refreshed().unwrap_or_else(|e| {
            tracing::debug!("Cannot re-stat {}: {e}", file.name());
            file.clone()
        });
        if let Err(err) = validate::validate(&current) {
            tracing::info!("Rejected {}: {err}", file.name());
            self.notices.push(match &err {
                ValidationError::NotAnImage { name, .. } => Notice::InvalidType {
                    file_name: name.clone(),
                },
                ValidationError::TooLarge { name, size, .. } => Notice::FileTooLarge {
                    file_name: name.clone(),
                    size: *size,
                },
            });
            return Err(err);
        }

        if self.is_loading()
            && let Some(previous) = self.state.cycle()
        {
            tracing::debug!(previous = previous.get(), "Superseding running cycle");
        }
        self.generation += 1;
        let cycle = CycleToken(self.generation);
        self.state = SessionState::Previewing {
            cycle,
            file_name: file.name().to_string(),
            preview: None,
        };
        Ok(cycle)
    }

    /// Mark the submission for `cycle` as started.
    pub fn begin_submission(&mut self, cycle: CycleToken) -> bool {
        let SessionState::Previewing {
            cycle: current,
            file_name,
            preview,
        } = &mut self.state
        else {
            return false;
        };
        if *current != cycle {
            return false;
        }
        let file_name = std::mem::take(file_name);
        let preview = preview.take();
        self.notices.push(Notice::ProcessingStarted {
            file_name: file_name.clone(),
        });
        self.state = SessionState::Loading {
            cycle,
            file_name,
            preview,
        };
        true
    }

    /// Attach a resolved preview. Returns false when `cycle` is stale.
    pub fn apply_preview(
        &mut self,
        cycle: CycleToken,
        outcome: Result<PreviewImage, PreviewError>,
    ) -> bool {
        if !self.is_current(cycle) {
            tracing::debug!(cycle = cycle.get(), "Dropping preview of superseded cycle");
            return false;
        }
        let image = match outcome {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!("Preview failed: {err}");
                self.notices.push(Notice::GenericFailure(err.to_string()));
                return true;
            }
        };
        match &mut self.state {
            SessionState::Previewing { preview, .. } | SessionState::Loading { preview, .. } => {
                *preview = Some(image);
            }
            SessionState::Loaded { result, .. } | SessionState::FallbackLoaded { result, .. } => {
                result.attach_image(image);
            }
            SessionState::Idle => return false,
        }
        true
    }

    /// Apply the service outcome for `cycle`. Returns false when `cycle` is
    /// stale or already finished.
    pub fn apply_submission(
        &mut self,
        cycle: CycleToken,
        outcome: Result<RawResponse, TransportError>,
    ) -> bool {
        if !self.is_current(cycle) || !self.is_loading() {
            tracing::debug!(cycle = cycle.get(), "Dropping response of superseded cycle");
            return false;
        }
        let (file_name, preview) = match &mut self.state {
            SessionState::Previewing {
                file_name, preview, ..
            }
            | SessionState::Loading {
                file_name, preview, ..
            } => (std::mem::take(file_name), preview.take()),
            _ => return false,
        };

        let normalized = outcome
            .map_err(|err| {
                if err.is_local() {
                    FallbackReason::Unreadable(err.to_string())
                } else {
                    FallbackReason::Transport(err.to_string())
                }
            })
            .and_then(|raw| {
                normalize::normalize(&raw)
                    .map_err(|FormatError::UnexpectedFormat(msg)| FallbackReason::Format(msg))
            });

        self.state = match normalized {
            Ok(mut result) => {
                if let Some(image) = preview {
                    result.attach_image(image);
                }
                let primary = *result.primary();
                tracing::info!(
                    file = %file_name,
                    class = %primary.class,
                    confidence = primary.confidence,
                    "Classification complete"
                );
                self.notices.push(Notice::AnalysisComplete {
                    class: primary.class,
                    confidence: primary.confidence,
                });
                SessionState::Loaded {
                    cycle,
                    file_name,
                    result,
                }
            }
            Err(reason) => {
                let mut result = normalize::fallback();
                if let Some(image) = preview {
                    result.attach_image(image);
                }
                tracing::warn!(file = %file_name, "Falling back to demo results: {reason}");
                self.notices.push(match &reason {
                    FallbackReason::Unreadable(msg) => Notice::GenericFailure(msg.clone()),
                    _ => Notice::ApiUnavailable,
                });
                SessionState::FallbackLoaded {
                    cycle,
                    file_name,
                    result,
                    reason,
                }
            }
        };
        true
    }

    /// Back to idle from any state. In-flight outcomes become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = SessionState::Idle;
    }
}
