//! Orchestrator-side half of the worker transport (O1, §4.7): spawns a
//! worker as a subprocess, frames newline-delimited JSON-RPC on its stdio,
//! multiplexes concurrent calls by correlation id, and respawns the worker
//! with exponential backoff when it goes unhealthy.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use notary402_types::rpc::{ListToolsResult, RpcOutcome, RpcRequest, RpcResponse};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, Semaphore, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use crate::error::TransportError;

/// The respawn backoff schedule: doubles from 1s up to a 30s cap.
const RESPAWN_BACKOFF: &[u64] = &[1, 2, 4, 8, 16, 30];

pub struct WorkerConfig {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub max_in_flight: usize,
    pub queue_capacity: usize,
}

struct Pending {
    sender: Option<oneshot::Sender<RpcOutcome>>,
}

struct Inner {
    config: WorkerConfig,
    next_id: AtomicU64,
    pending: DashMap<u64, Pending>,
    stdin_tx: Mutex<Option<tokio::sync::mpsc::UnboundedSender<String>>>,
    in_flight: Semaphore,
    waiting: std::sync::atomic::AtomicUsize,
    healthy: std::sync::atomic::AtomicBool,
    shutdown: CancellationToken,
}

/// A handle to a single running (or respawning) worker subprocess.
#[derive(Clone)]
pub struct WorkerHandle {
    inner: Arc<Inner>,
}

impl WorkerHandle {
    pub async fn spawn(config: WorkerConfig) -> Result<Self, TransportError> {
        let inner = Arc::new(Inner {
            in_flight: Semaphore::new(config.max_in_flight),
            waiting: std::sync::atomic::AtomicUsize::new(0),
            healthy: std::sync::atomic::AtomicBool::new(false),
            pending: DashMap::new(),
            next_id: AtomicU64::new(1),
            stdin_tx: Mutex::new(None),
            shutdown: CancellationToken::new(),
            config,
        });
        let handle = WorkerHandle { inner };
        handle.spawn_once().await?;
        handle.spawn_supervisor();
        Ok(handle)
    }

    async fn spawn_once(&self) -> Result<(), TransportError> {
        let mut command = Command::new(&self.inner.config.program);
        command
            .args(&self.inner.config.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true);
        let mut child: Child = command.spawn().map_err(TransportError::Spawn)?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        *self.inner.stdin_tx.lock().await = Some(tx);

        let mut stdin = stdin;
        tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if stdin.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if stdin.write_all(b"\n").await.is_err() {
                    break;
                }
            }
        });

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => inner.dispatch_line(&line),
                    Ok(None) => break,
                    Err(err) => {
                        warn!(worker = %inner.config.name, error = %err, "worker stdout read failed");
                        break;
                    }
                }
            }
            inner.mark_lost();
        });

        // A spawned child that immediately exits is caught by the reader
        // task hitting EOF; we don't block spawn() on waiting for the
        // child, matching the "respawns in the background" contract.
        tokio::spawn(async move {
            let _ = child.wait().await;
        });

        self.inner.healthy.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn spawn_supervisor(&self) {
        let handle = self.clone();
        tokio::spawn(async move {
            let mut attempt = 0usize;
            loop {
                tokio::select! {
                    _ = handle.inner.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(250)) => {}
                }
                if handle.inner.healthy.load(Ordering::SeqCst) {
                    attempt = 0;
                    continue;
                }
                let backoff = RESPAWN_BACKOFF[attempt.min(RESPAWN_BACKOFF.len() - 1)];
                warn!(worker = %handle.inner.config.name, backoff_secs = backoff, "respawning worker");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                if handle.inner.shutdown.is_cancelled() {
                    break;
                }
                match handle.spawn_once().await {
                    Ok(()) => attempt = 0,
                    Err(err) => {
                        error!(worker = %handle.inner.config.name, error = %err, "respawn failed");
                        attempt = (attempt + 1).min(RESPAWN_BACKOFF.len() - 1);
                    }
                }
            }
        });
    }

    /// Invokes a worker method, waiting at most `deadline` for a response.
    #[instrument(skip_all, fields(worker = %self.inner.config.name, method = method))]
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value, TransportError> {
        if self.inner.waiting.load(Ordering::SeqCst) >= self.inner.config.queue_capacity {
            return Err(TransportError::Overload);
        }
        self.inner.waiting.fetch_add(1, Ordering::SeqCst);
        let permit = self.inner.in_flight.acquire().await;
        self.inner.waiting.fetch_sub(1, Ordering::SeqCst);
        let _permit = permit.map_err(|_| TransportError::WorkerLost)?;

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(id, Pending { sender: Some(tx) });

        let request = RpcRequest {
            id,
            method: method.to_string(),
            params,
        };
        let line = serde_json::to_string(&request).map_err(TransportError::Decode)?;

        {
            let guard = self.inner.stdin_tx.lock().await;
            match guard.as_ref() {
                Some(sender) if sender.send(line).is_ok() => {}
                _ => {
                    self.inner.pending.remove(&id);
                    return Err(TransportError::WorkerLost);
                }
            }
        }

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(outcome)) => match outcome {
                RpcOutcome::Ok { result } => Ok(result),
                RpcOutcome::Err { error } => {
                    Err(TransportError::Remote(error.kind, error.message))
                }
            },
            Ok(Err(_)) => Err(TransportError::WorkerLost),
            Err(_) => {
                self.inner.pending.remove(&id);
                Err(TransportError::Timeout)
            }
        }
    }

    pub async fn list_tools(&self, deadline: Duration) -> Result<ListToolsResult, TransportError> {
        let value = self.call("list_tools", Value::Null, deadline).await?;
        serde_json::from_value(value).map_err(TransportError::Decode)
    }

    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    fn dispatch_line(&self, line: &str) {
        let response: RpcResponse = match serde_json::from_str(line) {
            Ok(response) => response,
            Err(err) => {
                debug!(worker = %self.config.name, error = %err, "dropping unparseable worker line");
                return;
            }
        };
        if let Some((_, mut pending)) = self.pending.remove(&response.id) {
            if let Some(sender) = pending.sender.take() {
                let _ = sender.send(response.outcome);
            }
        }
    }

    fn mark_lost(&self) {
        self.healthy.store(false, Ordering::SeqCst);
        for mut entry in self.pending.iter_mut() {
            if let Some(sender) = entry.sender.take() {
                let _ = sender.send(RpcOutcome::Err {
                    error: notary402_types::rpc::RpcError {
                        kind: notary402_types::ErrorKind::ErrDependency,
                        message: "worker lost".to_string(),
                    },
                });
            }
        }
        self.pending.clear();
    }
}
