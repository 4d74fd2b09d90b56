//! Upload session controller.
//!
//! Opens a session, drives every planned part through the
//! [`PartTransferClient`] with bounded concurrency, aggregates progress,
//! and finalizes or aborts. One controller handles exactly one upload.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use sluice_protocol::messages::{CompleteSessionRequest, StartSessionRequest};
use sluice_transfer::{ByteSource, ChunkDescriptor, plan};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::UploadError;
use crate::ledger::{Acknowledgement, PartLedger};
use crate::part::PartTransferClient;
use crate::progress::{ProgressReporter, progress_percent};
use crate::remote::{Coordinator, ObjectStore};
use crate::types::{
    PartResult, SessionState, UploadEvent, UploadOptions, UploadOutcome, UploadRequest,
    UploadSession,
};

/// Owns the state machine of a single upload.
pub struct UploadSessionController {
    coordinator: Arc<dyn Coordinator>,
    store: Arc<dyn ObjectStore>,
    options: UploadOptions,
    cancel: CancellationToken,
    reporter: ProgressReporter,
    events_rx: Option<mpsc::UnboundedReceiver<UploadEvent>>,
    state: SessionState,
    started: bool,
    session: Option<UploadSession>,
    ledger: Option<PartLedger>,
}

impl UploadSessionController {
    /// Creates a controller in the `Initializing` state.
    pub fn new(
        coordinator: Arc<dyn Coordinator>,
        store: Arc<dyn ObjectStore>,
        options: UploadOptions,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            coordinator,
            store,
            options,
            cancel: CancellationToken::new(),
            reporter: ProgressReporter::new(events_tx),
            events_rx: Some(events_rx),
            state: SessionState::Initializing,
            started: false,
            session: None,
            ledger: None,
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns a token that cancels this upload when triggered.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The coordinator session, once one was opened.
    pub fn session(&self) -> Option<&UploadSession> {
        self.session.as_ref()
    }

    /// Parts acknowledged so far, once a session was opened.
    pub fn ledger(&self) -> Option<&PartLedger> {
        self.ledger.as_ref()
    }

    /// Uploads `source` as `request.filename`.
    ///
    /// Emits exactly one terminal event. Any failure aborts the whole
    /// session; a second call fails with [`UploadError::SessionClosed`].
    pub async fn upload(
        &mut self,
        request: UploadRequest,
        source: Arc<dyn ByteSource>,
    ) -> Result<UploadOutcome, UploadError> {
        if self.started || self.state.is_terminal() {
            return Err(UploadError::SessionClosed);
        }
        self.started = true;

        let result = self.run(&request, source).await;
        match &result {
            Ok(outcome) => {
                self.transition(SessionState::Completed);
                info!(
                    upload_id = %outcome.upload_id,
                    location = %outcome.location,
                    parts = outcome.parts.len(),
                    "upload completed"
                );
                self.reporter.succeeded(outcome.location.clone());
            }
            Err(e) => {
                self.transition(SessionState::Aborted);
                error!(
                    filename = %request.filename,
                    upload_id = self.session.as_ref().map(|s| s.upload_id.as_str()),
                    error = %e,
                    "upload aborted"
                );
                self.reporter.failed(e.to_string());
            }
        }
        result
    }

    async fn run(
        &mut self,
        request: &UploadRequest,
        source: Arc<dyn ByteSource>,
    ) -> Result<UploadOutcome, UploadError> {
        self.check_cancelled()?;

        // Invalid input must not open a remote session.
        let chunks = plan(source.len(), self.options.chunk_size)?;
        let total_chunks = chunks.len() as u32;

        let req = StartSessionRequest {
            filename: request.filename.clone(),
            content_type: request.content_type.clone(),
            owner_id: request.owner_id.clone(),
        };
        let started = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
            resp = self.coordinator.start_session(req) => resp.map_err(UploadError::SessionStart)?,
        };

        info!(
            upload_id = %started.upload_id,
            storage_key = %started.storage_key,
            parts = total_chunks,
            bytes = source.len(),
            "upload session started"
        );

        let session = UploadSession {
            upload_id: started.upload_id,
            storage_key: started.storage_key,
            total_chunks,
            state: SessionState::Initializing,
        };
        self.session = Some(session.clone());
        self.ledger = Some(PartLedger::new(total_chunks));
        self.transition(SessionState::InProgress);

        self.dispatch(&session, &request.owner_id, source, chunks)
            .await?;

        let ledger = self.ledger.as_ref().ok_or_else(|| UploadError::MissingParts {
            missing: (1..=total_chunks).collect(),
        })?;
        if !ledger.is_complete() {
            return Err(UploadError::MissingParts {
                missing: ledger.missing(),
            });
        }
        let parts: Vec<PartResult> = ledger.parts().cloned().collect();

        self.check_cancelled()?;
        self.transition(SessionState::Finalizing);

        let req = CompleteSessionRequest {
            upload_id: session.upload_id.clone(),
            storage_key: session.storage_key.clone(),
            owner_id: request.owner_id.clone(),
        };
        let completed = self
            .coordinator
            .complete_session(req)
            .await
            .map_err(UploadError::Finalize)?;

        Ok(UploadOutcome {
            upload_id: session.upload_id,
            storage_key: completed.storage_key.unwrap_or(session.storage_key),
            location: completed.location,
            parts,
        })
    }

    /// Transfers every chunk with at most `concurrency` parts in flight.
    ///
    /// Results are folded into the ledger here, on the controller's own
    /// task, so the ledger has a single writer.
    async fn dispatch(
        &mut self,
        session: &UploadSession,
        owner_id: &str,
        source: Arc<dyn ByteSource>,
        chunks: Vec<ChunkDescriptor>,
    ) -> Result<(), UploadError> {
        let client = PartTransferClient::new(
            Arc::clone(&self.coordinator),
            Arc::clone(&self.store),
            self.options.retry.clone(),
            self.cancel.clone(),
        );
        let concurrency = self.options.concurrency.max(1);
        debug!(parts = chunks.len(), concurrency, "dispatching parts");

        let client = &client;
        let mut results = stream::iter(chunks)
            .map(move |chunk| {
                let source = Arc::clone(&source);
                async move {
                    let result = client.transfer_part(session, owner_id, source, chunk).await;
                    (chunk.part_number, result)
                }
            })
            .buffer_unordered(concurrency);

        let cancel = self.cancel.clone();
        loop {
            // Dropping `results` on return aborts every in-flight transfer.
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                next = results.next() => next,
            };
            let Some((part_number, result)) = next else {
                return Ok(());
            };
            match result {
                Ok(part) => {
                    self.acknowledge(part);
                }
                Err(UploadError::Cancelled) => return Err(UploadError::Cancelled),
                Err(cause) => {
                    warn!(part = part_number, error = %cause, "part failed after retries");
                    return Err(UploadError::PartFailure {
                        part_number,
                        cause: Box::new(cause),
                    });
                }
            }
        }
    }

    /// Records an acknowledged part and reports progress for new ones.
    pub(crate) fn acknowledge(&mut self, part: PartResult) -> Acknowledgement {
        let Some(ledger) = self.ledger.as_mut() else {
            return Acknowledgement::OutOfRange;
        };
        let part_number = part.part_number;
        let total = ledger.total();
        let outcome = ledger.record(part);
        match outcome {
            Acknowledgement::Recorded { acknowledged } => {
                let percent = progress_percent(acknowledged, total);
                debug!(part = part_number, acknowledged, total, percent, "progress");
                self.reporter
                    .progress(percent, format!("Uploaded part {part_number} of {total}"));
            }
            Acknowledgement::Duplicate => {
                debug!(part = part_number, "duplicate acknowledgement ignored");
            }
            Acknowledgement::OutOfRange => {
                warn!(part = part_number, total, "acknowledgement for unknown part ignored");
            }
        }
        outcome
    }

    fn transition(&mut self, state: SessionState) {
        debug!(from = ?self.state, to = ?state, "session state");
        self.state = state;
        if let Some(session) = self.session.as_mut() {
            session.state = state;
        }
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }
}
