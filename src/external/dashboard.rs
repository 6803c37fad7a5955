//! Batched event push to the dashboard sink over HTTP
//!
//! Events are buffered on a bounded channel and flushed by a background
//! worker either when a batch fills (default 10) or on a timer (default
//! 5 s). A full buffer drops the event with a counter bump; the pipeline
//! never blocks on the dashboard.

use crate::errors::DashboardError;
use crate::metrics::metrics;
use crate::types::now_ms;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::{debug, warn};

/// Single dashboard event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardEvent {
    pub kind: String,
    pub payload: serde_json::Value,
    pub timestamp_ms: i64,
}

impl DashboardEvent {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp_ms: now_ms(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub url: String,
    /// Bearer token, sent when configured
    pub api_secret: Option<String>,
    pub batch_size: usize,
    pub flush_interval: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_secret: None,
            batch_size: 10,
            flush_interval: Duration::from_secs(5),
        }
    }
}

/// Event buffer capacity before pushes start dropping
const BUFFER_CAP: usize = 1000;

/// Per-request deadline
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the background push worker
pub struct DashboardSink {
    tx: mpsc::Sender<DashboardEvent>,
    stopping: Arc<AtomicBool>,
    worker: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl DashboardSink {
    /// Spawn the sink worker. The returned handle is cheap to share.
    pub fn spawn(config: DashboardConfig) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(BUFFER_CAP);
        let stopping = Arc::new(AtomicBool::new(false));

        let worker = tokio::spawn(run_worker(config, rx, Arc::clone(&stopping)));

        Arc::new(Self {
            tx,
            stopping,
            worker: parking_lot::Mutex::new(Some(worker)),
        })
    }

    /// Enqueue an event. Never blocks; a full buffer drops the event.
    pub fn push(&self, event: DashboardEvent) {
        if self.tx.try_send(event).is_err() {
            metrics().dashboard_events_dropped.inc();
            debug!("dashboard buffer full, event dropped");
        }
    }

    /// Flush remaining events and stop the worker
    pub async fn shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run_worker(
    config: DashboardConfig,
    mut rx: mpsc::Receiver<DashboardEvent>,
    stopping: Arc<AtomicBool>,
) {
    let client = match reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            warn!("dashboard client build failed, sink disabled: {e}");
            return;
        }
    };

    let mut batch: Vec<DashboardEvent> = Vec::with_capacity(config.batch_size);
    let mut interval = tokio::time::interval(config.flush_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        batch.push(event);
                        if batch.len() >= config.batch_size {
                            flush(&client, &config, &mut batch).await;
                        }
                    }
                    None => break,
                }
            }
            _ = interval.tick() => {
                if !batch.is_empty() {
                    flush(&client, &config, &mut batch).await;
                }
                if stopping.load(Ordering::SeqCst) {
                    break;
                }
            }
        }
    }

    // Drain whatever arrived while shutting down
    while let Ok(event) = rx.try_recv() {
        batch.push(event);
    }
    if !batch.is_empty() {
        flush(&client, &config, &mut batch).await;
    }
}

async fn flush(client: &reqwest::Client, config: &DashboardConfig, batch: &mut Vec<DashboardEvent>) {
    let events = std::mem::take(batch);
    let count = events.len();

    let strategy = ExponentialBackoff::from_millis(200).map(jitter).take(2);
    let result = Retry::spawn(strategy, || post_batch(client, config, &events)).await;

    match result {
        Ok(()) => debug!(count, "dashboard batch pushed"),
        Err(e) => {
            metrics()
                .dashboard_events_dropped
                .inc_by(count as u64);
            warn!("dashboard push failed, {count} events dropped: {e}");
        }
    }
}

async fn post_batch(
    client: &reqwest::Client,
    config: &DashboardConfig,
    events: &[DashboardEvent],
) -> Result<(), DashboardError> {
    let mut request = client.post(&config.url).json(&events);
    if let Some(secret) = &config.api_secret {
        request = request.bearer_auth(secret);
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(DashboardError::Rejected(response.status().as_u16()));
    }
    Ok(())
}
