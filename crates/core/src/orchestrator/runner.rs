//! Transfer orchestrator implementation.
//!
//! Drives uploads through `pending -> processing -> {complete, error}`:
//! - Admission: invalid files are dropped before anything is tracked
//! - Dispatch: one queue, items leave it in submission order
//! - Transfer: at most `max_concurrent_transfers` gateway calls in flight

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::gateway::Gateway;
use crate::metrics::{BATCHES_TOTAL, TRANSFERS_IN_FLIGHT, TRANSFERS_TOTAL, TRANSFER_DURATION};
use crate::preview::PreviewRegistry;
use crate::upload::{
    SourceFile, TrackedUpload, UpdateOutcome, UploadId, UploadList, UploadPhase, UploadStatus,
    UploadStore,
};

use super::admission::admit_batch;
use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, OrchestratorStatus, UploadUpdateCallback, ValidationError};

/// Completion tracking shared by every item of one batch.
struct BatchProgress {
    remaining: watch::Sender<usize>,
    active_batches: Arc<AtomicUsize>,
}

impl BatchProgress {
    /// Mark one item finished. The batch stops counting as active before
    /// waiters are woken.
    fn finish_one(&self) {
        self.remaining.send_modify(|r| {
            if *r > 0 {
                *r -= 1;
                if *r == 0 {
                    self.active_batches.fetch_sub(1, Ordering::SeqCst);
                }
            }
        });
    }
}

impl Drop for BatchProgress {
    fn drop(&mut self) {
        // Items dropped unfinished, e.g. the queue went away with the orchestrator.
        if *self.remaining.borrow() > 0 {
            self.active_batches.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Handle returned by [`TransferOrchestrator::submit_batch`].
#[derive(Debug)]
pub struct BatchHandle {
    ids: Vec<UploadId>,
    truncated: usize,
    rejected: Vec<ValidationError>,
    remaining: watch::Receiver<usize>,
}

impl BatchHandle {
    fn empty(truncated: usize, rejected: Vec<ValidationError>) -> Self {
        let (_tx, remaining) = watch::channel(0);
        Self {
            ids: Vec::new(),
            truncated,
            rejected,
            remaining,
        }
    }

    /// Ids of the tracked uploads, in submission order.
    pub fn ids(&self) -> &[UploadId] {
        &self.ids
    }

    /// Files dropped because the batch was over the size limit.
    pub fn truncated(&self) -> usize {
        self.truncated
    }

    /// Files refused by their own checks; none of them was tracked.
    pub fn rejected(&self) -> &[ValidationError] {
        &self.rejected
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Items of this batch not yet finished.
    pub fn remaining(&self) -> usize {
        *self.remaining.borrow()
    }

    /// Wait until every item of the batch has finished or been discarded.
    pub async fn wait(&mut self) {
        // A closed channel means the batch was dropped with nothing left to run.
        let _ = self.remaining.wait_for(|r| *r == 0).await;
    }
}

struct QueuedTransfer {
    id: UploadId,
    batch: Arc<BatchProgress>,
}

/// State shared with spawned transfer tasks.
#[derive(Clone)]
struct TransferContext {
    gateway: Arc<dyn Gateway>,
    store: Arc<UploadStore>,
    update_callback: Option<UploadUpdateCallback>,
    in_flight: Arc<AtomicUsize>,
}

impl TransferContext {
    fn notify(&self, id: &UploadId, phase: UploadPhase) {
        if let Some(callback) = &self.update_callback {
            callback(id, phase);
        }
    }

    async fn run(&self, job: QueuedTransfer) {
        let QueuedTransfer { id, batch } = job;
        if let Err(e) = self.transfer_one(&id).await {
            error!("Transfer of upload {} failed: {}", id, e);
        }
        batch.finish_one();
    }

    /// Send one upload to the gateway and record the outcome.
    async fn transfer_one(&self, id: &UploadId) -> Result<(), OrchestratorError> {
        let Some(upload) = self.store.get(id) else {
            debug!("Upload {} removed before its transfer started", id);
            TRANSFERS_TOTAL.with_label_values(&["discarded"]).inc();
            return Ok(());
        };

        if self.store.update_status(id, UploadStatus::Processing)? == UpdateOutcome::Stale {
            TRANSFERS_TOTAL.with_label_values(&["discarded"]).inc();
            return Ok(());
        }
        self.notify(id, UploadPhase::Processing);
        debug!("Sending {} ({} bytes) to gateway", upload.source.name(), upload.source.size());

        let start = Instant::now();
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        TRANSFERS_IN_FLIGHT.inc();
        let result = self.gateway.process(&upload.source).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        TRANSFERS_IN_FLIGHT.dec();

        let status = match result {
            Ok(image) => UploadStatus::Complete(Arc::new(image)),
            Err(e) => {
                warn!(
                    "Upload {} ({}) failed [{}]: {}",
                    id,
                    upload.source.name(),
                    e.kind(),
                    e
                );
                UploadStatus::Error(e.to_string())
            }
        };
        let phase = status.phase();
        TRANSFER_DURATION
            .with_label_values(&[phase.as_str()])
            .observe(start.elapsed().as_secs_f64());

        match self.store.update_status(id, status)? {
            UpdateOutcome::Applied => {
                TRANSFERS_TOTAL.with_label_values(&[phase.as_str()]).inc();
                self.notify(id, phase);
                info!("Upload {} ({}) is {}", id, upload.source.name(), phase);
            }
            UpdateOutcome::Stale => {
                debug!("Upload {} removed while in flight, discarding result", id);
                TRANSFERS_TOTAL.with_label_values(&["discarded"]).inc();
            }
        }
        Ok(())
    }
}

/// The transfer orchestrator - owns the upload collection and feeds the gateway.
pub struct TransferOrchestrator {
    config: OrchestratorConfig,
    gateway: Arc<dyn Gateway>,
    store: Arc<UploadStore>,
    previews: Arc<PreviewRegistry>,
    update_callback: Option<UploadUpdateCallback>,

    // Runtime state
    transfer_slots: Arc<Semaphore>,
    queue_tx: mpsc::UnboundedSender<QueuedTransfer>,
    queue_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<QueuedTransfer>>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    queued: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    active_batches: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl TransferOrchestrator {
    /// Create a new orchestrator. Nothing is sent until [`start`](Self::start).
    pub fn new(config: OrchestratorConfig, gateway: Arc<dyn Gateway>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let slots = config.max_concurrent_transfers.max(1);

        Self {
            config,
            gateway,
            store: Arc::new(UploadStore::new()),
            previews: Arc::new(PreviewRegistry::new()),
            update_callback: None,
            transfer_slots: Arc::new(Semaphore::new(slots)),
            queue_tx,
            queue_rx: Arc::new(Mutex::new(Some(queue_rx))),
            dispatcher: Mutex::new(None),
            queued: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            active_batches: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Register a callback for every phase change.
    pub fn with_update_callback(mut self, callback: UploadUpdateCallback) -> Self {
        self.update_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<UploadStore> {
        &self.store
    }

    pub fn previews(&self) -> &Arc<PreviewRegistry> {
        &self.previews
    }

    /// Current collection.
    pub fn snapshot(&self) -> UploadList {
        self.store.snapshot()
    }

    /// Subscribe to collection replacements.
    pub fn subscribe(&self) -> watch::Receiver<UploadList> {
        self.store.subscribe()
    }

    /// Start the dispatcher. Must be called inside a Tokio runtime.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        let Some(queue_rx) = self
            .queue_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            error!("Transfer queue unavailable, dispatcher not started");
            self.running.store(false, Ordering::SeqCst);
            return;
        };

        info!(
            "Starting transfer orchestrator ({} concurrent transfers)",
            self.config.max_concurrent_transfers.max(1)
        );
        let handle = self.spawn_dispatcher(queue_rx);
        *self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Stop dispatching. Queued items stay queued until the next start;
    /// transfers already sent finish on their own.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping transfer orchestrator");
        let _ = self.shutdown_tx.send(());

        let handle = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Dispatcher task ended abnormally: {}", e);
            }
        }
        info!("Transfer orchestrator stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// True while any accepted batch still has unfinished items.
    pub fn is_processing(&self) -> bool {
        self.active_batches.load(Ordering::SeqCst) > 0
    }

    /// Validate a batch, track its files as `pending` and queue them.
    ///
    /// A batch over the count limit is refused as a whole and leaves no
    /// trace. Individually invalid files are left out and reported on the
    /// handle while the rest of the batch proceeds.
    pub fn submit_batch(&self, files: Vec<SourceFile>) -> Result<BatchHandle, ValidationError> {
        let submitted = files.len();
        let admission = match admit_batch(&self.config, files) {
            Ok(admission) => admission,
            Err(e) => {
                warn!("Rejected batch of {} files: {}", submitted, e);
                BATCHES_TOTAL.with_label_values(&["rejected"]).inc();
                return Err(e);
            }
        };

        for rejection in &admission.rejected {
            warn!("Dropped file from batch: {}", rejection);
        }

        if admission.files.is_empty() {
            if !admission.rejected.is_empty() {
                BATCHES_TOTAL.with_label_values(&["rejected"]).inc();
            }
            return Ok(BatchHandle::empty(admission.truncated, admission.rejected));
        }

        let uploads: Vec<TrackedUpload> = admission
            .files
            .into_iter()
            .map(|file| {
                let preview = self.previews.create(&file);
                TrackedUpload::pending(file, preview)
            })
            .collect();
        let ids: Vec<UploadId> = uploads.iter().map(|u| u.id.clone()).collect();

        self.store.add(uploads);
        for id in &ids {
            self.notify(id, UploadPhase::Pending);
        }

        let (remaining_tx, remaining_rx) = watch::channel(ids.len());
        self.active_batches.fetch_add(1, Ordering::SeqCst);
        let batch = Arc::new(BatchProgress {
            remaining: remaining_tx,
            active_batches: Arc::clone(&self.active_batches),
        });

        for id in &ids {
            self.queued.fetch_add(1, Ordering::SeqCst);
            let job = QueuedTransfer {
                id: id.clone(),
                batch: Arc::clone(&batch),
            };
            if self.queue_tx.send(job).is_err() {
                self.queued.fetch_sub(1, Ordering::SeqCst);
                error!("{}: upload {} not queued", OrchestratorError::QueueClosed, id);
                batch.finish_one();
            }
        }

        let result = if !admission.rejected.is_empty() {
            info!(
                "Accepted {} of {} files, {} failed validation",
                ids.len(),
                submitted,
                admission.rejected.len()
            );
            "partial"
        } else if admission.truncated > 0 {
            info!(
                "Accepted {} of {} files, {} over the batch limit dropped",
                ids.len(),
                submitted,
                admission.truncated
            );
            "truncated"
        } else {
            info!("Accepted batch of {} files", ids.len());
            "accepted"
        };
        BATCHES_TOTAL.with_label_values(&[result]).inc();

        Ok(BatchHandle {
            ids,
            truncated: admission.truncated,
            rejected: admission.rejected,
            remaining: remaining_rx,
        })
    }

    /// Remove an upload and release its preview.
    ///
    /// An in-flight gateway call is not aborted; its result is discarded.
    pub fn remove(&self, id: &UploadId) -> bool {
        match self.store.remove(id) {
            Some(upload) => {
                self.previews.release(&upload.preview);
                info!("Removed upload {} ({})", id, upload.source.name());
                true
            }
            None => {
                debug!("Remove of unknown upload {}", id);
                false
            }
        }
    }

    /// Drop every upload and release every preview. Returns the number removed.
    pub fn teardown(&self) -> usize {
        let drained = self.store.clear();
        for upload in &drained {
            self.previews.release(&upload.preview);
        }
        if !drained.is_empty() {
            info!("Tore down {} uploads", drained.len());
        }
        drained.len()
    }

    /// Get current orchestrator status.
    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            running: self.is_running(),
            queued: self.queued.load(Ordering::SeqCst),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            active_batches: self.active_batches.load(Ordering::SeqCst),
            uploads: self.store.count_by_phase(),
            previews: self.previews.stats(),
        }
    }

    fn notify(&self, id: &UploadId, phase: UploadPhase) {
        if let Some(callback) = &self.update_callback {
            callback(id, phase);
        }
    }

    /// Spawn the dispatcher task.
    ///
    /// A slot is taken before an item is dequeued, so stopping never loses
    /// an item; the receiver is handed back for the next start.
    fn spawn_dispatcher(&self, mut queue_rx: mpsc::UnboundedReceiver<QueuedTransfer>) -> JoinHandle<()> {
        let ctx = TransferContext {
            gateway: Arc::clone(&self.gateway),
            store: Arc::clone(&self.store),
            update_callback: self.update_callback.clone(),
            in_flight: Arc::clone(&self.in_flight),
        };
        let slots = Arc::clone(&self.transfer_slots);
        let queued = Arc::clone(&self.queued);
        let queue_slot = Arc::clone(&self.queue_rx);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Transfer dispatcher started");
            loop {
                let permit: OwnedSemaphorePermit = tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    permit = Arc::clone(&slots).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                let job = tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    job = queue_rx.recv() => match job {
                        Some(job) => job,
                        None => break,
                    },
                };
                queued.fetch_sub(1, Ordering::SeqCst);

                let ctx = ctx.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    ctx.run(job).await;
                });
            }

            *queue_slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(queue_rx);
            info!("Transfer dispatcher stopped");
        })
    }
}

impl Drop for TransferOrchestrator {
    fn drop(&mut self) {
        let released = self.teardown();
        if released > 0 {
            debug!("Released {} previews on drop", released);
        }
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockGateway};
    use std::time::Duration;

    fn orchestrator(gateway: Arc<MockGateway>) -> TransferOrchestrator {
        TransferOrchestrator::new(OrchestratorConfig::default(), gateway)
    }

    #[tokio::test]
    async fn test_submit_tracks_pending_in_order() {
        let orch = orchestrator(Arc::new(MockGateway::new()));
        let handle = orch
            .submit_batch(vec![fixtures::png_file("a.png"), fixtures::png_file("b.png")])
            .unwrap();

        let list = orch.snapshot();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].source.name(), "a.png");
        assert_eq!(list[1].source.name(), "b.png");
        assert!(list.iter().all(|u| u.status.phase() == UploadPhase::Pending));
        assert_eq!(handle.ids(), &[list[0].id.clone(), list[1].id.clone()]);
        assert_eq!(orch.previews().outstanding(), 2);
        assert!(orch.is_processing());
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let orch = orchestrator(Arc::new(MockGateway::new()));
        let mut handle = orch.submit_batch(Vec::new()).unwrap();
        assert!(handle.is_empty());
        handle.wait().await;
        assert!(orch.snapshot().is_empty());
        assert!(!orch.is_processing());
    }

    #[tokio::test]
    async fn test_all_invalid_batch_leaves_no_trace() {
        let orch = orchestrator(Arc::new(MockGateway::new()));
        let before = orch.snapshot();
        let mut handle = orch
            .submit_batch(vec![
                fixtures::file("notes.txt", "text/plain", b"hello".to_vec()),
                fixtures::file("empty.png", "image/png", Vec::new()),
            ])
            .unwrap();

        assert!(handle.is_empty());
        let reasons: Vec<_> = handle.rejected().iter().map(|e| e.reason()).collect();
        assert_eq!(reasons, vec!["unsupported_type", "empty_file"]);
        assert!(Arc::ptr_eq(&before, &orch.snapshot()));
        assert_eq!(orch.previews().stats().created, 0);
        handle.wait().await;
    }

    #[tokio::test]
    async fn test_batch_completes_after_start() {
        let gateway = Arc::new(MockGateway::new());
        let orch = orchestrator(Arc::clone(&gateway));
        let mut handle = orch
            .submit_batch(vec![fixtures::png_file("a.png"), fixtures::png_file("b.png")])
            .unwrap();

        orch.start();
        tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .unwrap();

        let list = orch.snapshot();
        assert!(list.iter().all(|u| u.status.phase() == UploadPhase::Complete));
        assert_eq!(gateway.call_order(), vec!["a.png", "b.png"]);
        assert!(!orch.is_processing());
        assert_eq!(orch.status().queued, 0);
        orch.stop().await;
    }

    #[tokio::test]
    async fn test_gateway_failure_marks_error() {
        let gateway = Arc::new(MockGateway::new());
        gateway.fail_with(
            "bad.png",
            crate::gateway::GatewayError::ConnectionFailed("refused".to_string()),
        );
        let orch = orchestrator(Arc::clone(&gateway));
        let mut handle = orch
            .submit_batch(vec![fixtures::png_file("bad.png"), fixtures::png_file("ok.png")])
            .unwrap();
        orch.start();
        handle.wait().await;

        let list = orch.snapshot();
        assert_eq!(list[0].status.phase(), UploadPhase::Error);
        assert!(list[0].status.error_message().unwrap().contains("refused"));
        assert_eq!(list[1].status.phase(), UploadPhase::Complete);
        orch.stop().await;
    }

    #[tokio::test]
    async fn test_remove_releases_preview_once() {
        let orch = orchestrator(Arc::new(MockGateway::new()));
        let handle = orch.submit_batch(vec![fixtures::png_file("a.png")]).unwrap();
        let id = handle.ids()[0].clone();

        assert!(orch.remove(&id));
        assert!(!orch.remove(&id));
        let stats = orch.previews().stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.released, 1);
        assert_eq!(stats.outstanding, 0);
    }

    #[tokio::test]
    async fn test_stop_and_restart_keeps_queue() {
        let gateway = Arc::new(MockGateway::new());
        let orch = orchestrator(Arc::clone(&gateway));
        orch.start();
        orch.stop().await;
        assert!(!orch.is_running());

        let mut handle = orch.submit_batch(vec![fixtures::png_file("a.png")]).unwrap();
        tokio::task::yield_now().await;
        assert_eq!(orch.status().queued, 1);

        orch.start();
        handle.wait().await;
        assert_eq!(gateway.call_count(), 1);
        orch.stop().await;
    }

    #[tokio::test]
    async fn test_update_callback_sees_every_phase() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let orch = TransferOrchestrator::new(
            OrchestratorConfig::default(),
            Arc::new(MockGateway::new()),
        )
        .with_update_callback(Arc::new(move |_id: &UploadId, phase: UploadPhase| {
            sink.lock().unwrap().push(phase);
        }));

        let mut handle = orch.submit_batch(vec![fixtures::png_file("a.png")]).unwrap();
        orch.start();
        handle.wait().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                UploadPhase::Pending,
                UploadPhase::Processing,
                UploadPhase::Complete
            ]
        );
        orch.stop().await;
    }
}
