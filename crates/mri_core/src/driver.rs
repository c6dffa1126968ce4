//! Runs preview and submission jobs off the UI thread.
//!
//! Workers never touch the session. They send their outcome, tagged with
//! the cycle it belongs to, over a channel that the owning thread drains
//! with [`SessionDriver::poll`].

use crate::client::{PredictionService, RawResponse, TransportError};
use crate::file::CandidateFile;
use crate::preview::{self, PreviewError, PreviewImage};
use crate::session::{ClassificationSession, CycleToken, Notice};
use crate::validate::ValidationError;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

/// Called after a worker posts an outcome, e.g. to request a repaint.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

enum JobOutcome {
    Preview(Result<PreviewImage, PreviewError>),
    Submission(Result<RawResponse, TransportError>),
}

struct CycleEvent {
    cycle: CycleToken,
    outcome: JobOutcome,
}

pub struct SessionDriver {
    session: ClassificationSession,
    service: Arc<dyn PredictionService>,
    tx: Sender<CycleEvent>,
    rx: Receiver<CycleEvent>,
    waker: Option<Waker>,
}

impl SessionDriver {
    pub fn new(service: Arc<dyn PredictionService>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            session: ClassificationSession::new(),
            service,
            tx,
            rx,
            waker: None,
        }
    }

    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Arc::new(waker));
        self
    }

    pub fn session(&self) -> &ClassificationSession {
        &self.session
    }

    /// Swap the prediction service, e.g. after the endpoint changed. Cycles
    /// already submitted keep the old one.
    pub fn set_service(&mut self, service: Arc<dyn PredictionService>) {
        self.service = service;
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.session.take_notices()
    }

    /// Validate `file` and, if accepted, start its preview and submission.
    pub fn select(&mut self, file: CandidateFile) -> Result<CycleToken, ValidationError> {
        let cycle = self.session.select(&file)?;
        tracing::debug!(cycle = cycle.get(), file = file.name(), "Starting upload cycle");

        let preview_file = file.clone();
        self.spawn(cycle, move || JobOutcome::Preview(preview::encode(&preview_file)));

        let service = Arc::clone(&self.service);
        self.spawn(cycle, move || JobOutcome::Submission(service.submit(&file)));

        self.session.begin_submission(cycle);
        Ok(cycle)
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    fn spawn(&self, cycle: CycleToken, job: impl FnOnce() -> JobOutcome + Send + 'static) {
        let tx = self.tx.clone();
        let waker = self.waker.clone();
        thread::spawn(move || {
            let outcome = job();
            // receiver gone means the driver was dropped
            if tx.send(CycleEvent { cycle, outcome }).is_ok()
                && let Some(wake) = waker
            {
                wake();
            }
        });
    }

    fn apply(&mut self, event: CycleEvent) -> bool {
        match event.outcome {
            JobOutcome::Preview(outcome) => self.session.apply_preview(event.cycle, outcome),
            JobOutcome::Submission(outcome) => self.session.apply_submission(event.cycle, outcome),
        }
    }

    /// Apply every outcome that has arrived. Returns true if any changed
    /// the session.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            changed |= self.apply(event);
        }
        changed
    }

    /// Block for the next outcome. `None` on timeout, otherwise whether it
    /// was applied.
    pub fn wait_for_event(&mut self, timeout: Duration) -> Option<bool> {
        let event = self.rx.recv_timeout(timeout).ok()?;
        Some(self.apply(event))
    }

    /// Block until the running cycle has a result or `timeout` passes
    /// without any outcome arriving.
    pub fn wait_until_settled(&mut self, timeout: Duration) -> bool {
        while self.session.is_loading() {
            if self.wait_for_event(timeout).is_none() {
                return false;
            }
        }
        true
    }
}
