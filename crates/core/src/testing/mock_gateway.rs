//! Mock gateway for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};

use crate::gateway::{Gateway, GatewayError, ProcessedImage};
use crate::upload::SourceFile;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock implementation of the Gateway trait.
///
/// Provides controllable behavior for testing:
/// - Records the order calls start and finish in
/// - Per-file delays and pause gates released by the test
/// - Scripted failures per file name
/// - Highest number of concurrent calls seen
///
/// Successful calls echo the source bytes back as the optimized image.
#[derive(Debug)]
pub struct MockGateway {
    calls: watch::Sender<Vec<String>>,
    finished: Mutex<Vec<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failures: Mutex<HashMap<String, GatewayError>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        let (calls, _) = watch::channel(Vec::new());
        Self {
            calls,
            finished: Mutex::new(Vec::new()),
            delays: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Delay the answer for `name`.
    pub fn set_delay(&self, name: &str, delay: Duration) {
        lock(&self.delays).insert(name.to_string(), delay);
    }

    /// Hold calls for `name` until [`release`](Self::release).
    pub fn pause(&self, name: &str) {
        lock(&self.gates).insert(name.to_string(), Arc::new(Notify::new()));
    }

    /// Let a paused call for `name` answer. Works before the call arrives too.
    pub fn release(&self, name: &str) {
        if let Some(gate) = lock(&self.gates).get(name) {
            gate.notify_one();
        }
    }

    /// Answer calls for `name` with `error`.
    pub fn fail_with(&self, name: &str, error: GatewayError) {
        lock(&self.failures).insert(name.to_string(), error);
    }

    /// File names in the order calls started.
    pub fn call_order(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// File names in the order calls answered.
    pub fn finished_order(&self) -> Vec<String> {
        lock(&self.finished).clone()
    }

    /// Highest number of calls in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Wait until a call for `name` has started.
    pub async fn wait_for_call(&self, name: &str) {
        let mut rx = self.calls.subscribe();
        let _ = rx.wait_for(|calls| calls.iter().any(|c| c == name)).await;
    }

    /// Wait until at least `count` calls have started.
    pub async fn wait_for_calls(&self, count: usize) {
        let mut rx = self.calls.subscribe();
        let _ = rx.wait_for(|calls| calls.len() >= count).await;
    }
}

#[async_trait]
impl Gateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn process(&self, file: &SourceFile) -> Result<ProcessedImage, GatewayError> {
        let name = file.name().to_string();
        self.calls.send_modify(|calls| calls.push(name.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let gate = lock(&self.gates).get(&name).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let delay = lock(&self.delays).get(&name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        lock(&self.finished).push(name.clone());

        if let Some(error) = lock(&self.failures).get(&name).cloned() {
            return Err(error);
        }
        Ok(ProcessedImage::inline(
            file.name(),
            file.media_type(),
            file.size(),
            file.bytes(),
        ))
    }
}
