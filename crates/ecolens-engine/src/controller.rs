use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, Result};
use ecolens_contracts::events::{EventWriter, LifecycleEvent};
use ecolens_contracts::{normalize, AnalysisPayload, ErrorKind, NormalizedResult};
use uuid::Uuid;

use crate::selection::{ImageCandidate, SelectedImage};
use crate::transport::{transport_error, Transport};

const WORKER_EXITED_MESSAGE: &str = "submission worker exited without a result";

/// Observable lifecycle of the current submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState<'a> {
    Idle,
    Ready,
    Submitting,
    Completed(&'a NormalizedResult),
}

impl RequestState<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Submitting => "submitting",
            Self::Completed(_) => "completed",
        }
    }
}

struct InFlight {
    image: SelectedImage,
    submission_id: String,
    started_at: Instant,
    outcome: Receiver<Result<AnalysisPayload>>,
}

enum Lifecycle {
    Idle,
    Ready(SelectedImage),
    Submitting(InFlight),
    Completed {
        image: SelectedImage,
        result: NormalizedResult,
    },
}

/// Owns one image selection at a time and at most one in-flight transport call.
///
/// Every non-idle state holds exactly one [`SelectedImage`], so exactly one
/// preview file is alive; dropping the selection removes it. Misuse such as
/// submitting without a selection is logged and otherwise ignored.
pub struct SubmissionController {
    transport: Arc<dyn Transport>,
    preview_dir: PathBuf,
    events: Option<EventWriter>,
    lifecycle: Lifecycle,
}

impl SubmissionController {
    pub fn new(transport: Arc<dyn Transport>, preview_dir: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            preview_dir: preview_dir.into(),
            events: None,
            lifecycle: Lifecycle::Idle,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    pub fn state(&self) -> RequestState<'_> {
        match &self.lifecycle {
            Lifecycle::Idle => RequestState::Idle,
            Lifecycle::Ready(_) => RequestState::Ready,
            Lifecycle::Submitting(_) => RequestState::Submitting,
            Lifecycle::Completed { result, .. } => RequestState::Completed(result),
        }
    }

    pub fn selected_image(&self) -> Option<&SelectedImage> {
        match &self.lifecycle {
            Lifecycle::Idle => None,
            Lifecycle::Ready(image) | Lifecycle::Completed { image, .. } => Some(image),
            Lifecycle::Submitting(in_flight) => Some(&in_flight.image),
        }
    }

    pub fn preview_path(&self) -> Option<&Path> {
        self.selected_image().map(SelectedImage::preview_path)
    }

    pub fn result(&self) -> Option<&NormalizedResult> {
        match &self.lifecycle {
            Lifecycle::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Returns `false` and leaves the state untouched when the candidate is
    /// not image media or its preview cannot be created.
    ///
    /// An accepted selection replaces the previous one from any state. A
    /// submission still in flight keeps running, but its outcome is dropped.
    pub fn select_image(&mut self, candidate: ImageCandidate) -> bool {
        if !candidate.is_image() {
            log::warn!(
                "ignoring selection of {} ({}): not image media",
                candidate.file_name,
                candidate.media_type
            );
            self.record(LifecycleEvent::ImageRejected {
                file_name: candidate.file_name,
                media_type: candidate.media_type,
            });
            return false;
        }

        let image = match SelectedImage::create(candidate, &self.preview_dir) {
            Ok(image) => image,
            Err(err) => {
                log::warn!("ignoring selection: {err:#}");
                return false;
            }
        };

        log::debug!(
            "selected {} ({}, {} bytes), preview at {}",
            image.file_name(),
            image.media_type(),
            image.byte_len(),
            image.preview_path().display()
        );
        self.record(LifecycleEvent::ImageSelected {
            file_name: image.file_name().to_string(),
            media_type: image.media_type().to_string(),
            bytes: image.byte_len() as u64,
            sha256: image.sha256().to_string(),
        });
        let previous = std::mem::replace(&mut self.lifecycle, Lifecycle::Ready(image));
        self.abandon(previous);
        true
    }

    /// Starts the transport call for the selected image. Only valid in `Ready`.
    pub fn submit(&mut self) {
        let image = match std::mem::replace(&mut self.lifecycle, Lifecycle::Idle) {
            Lifecycle::Ready(image) => image,
            other => {
                self.lifecycle = other;
                let state = self.state().name();
                log::warn!("{}: submit ignored while {state}", ErrorKind::InvalidState);
                self.record(LifecycleEvent::SubmissionIgnored {
                    state: state.to_string(),
                });
                return;
            }
        };

        let submission_id = Uuid::new_v4().to_string();
        let transport = Arc::clone(&self.transport);
        let upload = image.upload().clone();
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("ecolens-submit".to_string())
            .spawn(move || {
                let outcome = transport.describe(&upload);
                // The controller may have moved on; a closed channel is expected then.
                let _ = tx.send(outcome);
            });

        self.record(LifecycleEvent::SubmissionStarted {
            submission_id: submission_id.clone(),
            transport: self.transport.name().to_string(),
        });
        log::info!(
            "submission {submission_id} started via {}",
            self.transport.name()
        );
        self.lifecycle = Lifecycle::Submitting(InFlight {
            image,
            submission_id,
            started_at: Instant::now(),
            outcome: rx,
        });

        if let Err(err) = spawned {
            self.complete(Err(anyhow!(err).context("failed to start submission worker")));
        }
    }

    /// Applies the in-flight outcome if it has arrived. Never blocks.
    pub fn poll(&mut self) -> bool {
        let Lifecycle::Submitting(in_flight) = &self.lifecycle else {
            return false;
        };
        let outcome = match in_flight.outcome.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(anyhow!(WORKER_EXITED_MESSAGE)),
        };
        self.complete(outcome);
        true
    }

    /// Blocks until the in-flight submission completes; returns immediately otherwise.
    pub fn wait(&mut self) -> RequestState<'_> {
        if let Lifecycle::Submitting(in_flight) = &self.lifecycle {
            let outcome = in_flight
                .outcome
                .recv()
                .unwrap_or_else(|_| Err(anyhow!(WORKER_EXITED_MESSAGE)));
            self.complete(outcome);
        }
        self.state()
    }

    /// Back to `Idle`, releasing the selection, its preview and any result.
    pub fn reset(&mut self) {
        let previous = std::mem::replace(&mut self.lifecycle, Lifecycle::Idle);
        if matches!(previous, Lifecycle::Idle) {
            return;
        }
        self.abandon(previous);
        log::debug!("selection reset");
        self.record(LifecycleEvent::SelectionReset);
    }

    fn complete(&mut self, outcome: Result<AnalysisPayload>) {
        let in_flight = match std::mem::replace(&mut self.lifecycle, Lifecycle::Idle) {
            Lifecycle::Submitting(in_flight) => in_flight,
            other => {
                self.lifecycle = other;
                return;
            }
        };

        let result = match &outcome {
            Ok(payload) => normalize(Some(payload), None),
            Err(err) => {
                let failure = transport_error(err);
                log::warn!(
                    "submission {} transport failed: {}",
                    in_flight.submission_id,
                    failure.message
                );
                normalize(None, Some(&failure))
            }
        };
        let elapsed_ms = in_flight.started_at.elapsed().as_millis() as u64;
        log::info!(
            "submission {} completed in {elapsed_ms} ms ({})",
            in_flight.submission_id,
            if result.is_success() { "success" } else { "failure" }
        );
        self.record(LifecycleEvent::completed(
            &in_flight.submission_id,
            &result,
            elapsed_ms,
        ));
        self.lifecycle = Lifecycle::Completed {
            image: in_flight.image,
            result,
        };
    }

    fn abandon(&self, previous: Lifecycle) {
        if let Lifecycle::Submitting(in_flight) = previous {
            log::info!(
                "submission {} abandoned; its outcome will be discarded",
                in_flight.submission_id
            );
            self.record(LifecycleEvent::SubmissionAbandoned {
                submission_id: in_flight.submission_id,
            });
        }
    }

    fn record(&self, event: LifecycleEvent) {
        if let Some(events) = &self.events {
            if let Err(err) = events.record(&event) {
                log::warn!("failed to record lifecycle event: {err:#}");
            }
        }
    }
}
