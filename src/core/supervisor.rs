//! Worker subprocess lifecycle: spawn, handshake, respawn, teardown.
//!
//! The privileged shared-memory access lives in the worker; the host only
//! ever talks to it through the RPC client. The supervisor keeps exactly one
//! worker alive: it waits on the child's exit notification (no busy polling)
//! and respawns immediately, so calls in flight at the moment of death fail
//! with a transient unavailable error while calls after the respawn succeed.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};

use crate::core::service::{HardwareService, ReadingInfo, SensorInfo};
use crate::error::{BridgeError, Result};
use crate::ipc::proto::parse_announce;
use crate::ipc::{RpcClient, COOKIE_ENV, MAGIC_COOKIE};
use crate::platform::ProcessGroup;

/// Lifecycle states of the supervised worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    NotStarted,
    Starting,
    Running,
    Exited,
    Terminated,
}

/// How to launch and watch the worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Bound on waiting for the worker's listener announcement.
    pub handshake_timeout: Duration,
    /// Delay before retrying after a failed spawn or handshake.
    pub respawn_delay: Duration,
}

impl WorkerConfig {
    pub fn new(program: PathBuf) -> Self {
        WorkerConfig {
            program,
            args: Vec::new(),
            handshake_timeout: Duration::from_secs(10),
            respawn_delay: Duration::from_secs(1),
        }
    }
}

pub struct Supervisor {
    client: RwLock<Option<Arc<RpcClient>>>,
    state: RwLock<SupervisorState>,
    shutdown_tx: broadcast::Sender<()>,
    task: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Supervisor {
    /// Spawn the supervision task. The first worker launch happens
    /// immediately; queries issued before it completes fail as unavailable.
    pub fn start(config: WorkerConfig) -> Arc<Self> {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let supervisor = Arc::new(Supervisor {
            client: RwLock::new(None),
            state: RwLock::new(SupervisorState::NotStarted),
            shutdown_tx,
            task: tokio::sync::Mutex::new(None),
        });

        let handle = tokio::spawn(supervise(Arc::clone(&supervisor), config, shutdown_rx));
        *supervisor.task.try_lock().expect("task slot uncontended") = Some(handle);
        supervisor
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.read()
    }

    fn set_state(&self, state: SupervisorState) {
        *self.state.write() = state;
    }

    fn current_client(&self) -> Result<Arc<RpcClient>> {
        self.client
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| BridgeError::unavailable("worker is not running"))
    }

    /// Deterministic teardown: kill the worker, dispose its process group,
    /// and join the supervision task.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
    }
}

#[async_trait]
impl HardwareService for Supervisor {
    async fn poll_time(&self) -> Result<u64> {
        self.current_client()?.poll_time().await
    }

    async fn sensors(&self) -> Result<Vec<SensorInfo>> {
        self.current_client()?.sensors().await
    }

    async fn readings_for_sensor(&self, id: &str) -> Result<Vec<ReadingInfo>> {
        self.current_client()?.readings_for_sensor(id).await
    }
}

async fn supervise(
    supervisor: Arc<Supervisor>,
    config: WorkerConfig,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        supervisor.set_state(SupervisorState::Starting);
        // A shutdown request must interrupt even a hung spawn/handshake; the
        // half-spawned child is reaped by kill_on_drop + group disposal.
        let spawned = tokio::select! {
            spawned = spawn_worker(&config) => spawned,
            _ = shutdown.recv() => {
                supervisor.set_state(SupervisorState::Terminated);
                return;
            }
        };
        match spawned {
            Ok((mut child, mut group, client)) => {
                *supervisor.client.write() = Some(Arc::new(client));
                supervisor.set_state(SupervisorState::Running);
                log::info!("worker running (pid {:?})", child.id());

                tokio::select! {
                    status = child.wait() => {
                        *supervisor.client.write() = None;
                        group.dispose();
                        supervisor.set_state(SupervisorState::Exited);
                        match status {
                            Ok(code) => log::warn!("worker exited ({code}), respawning"),
                            Err(e) => log::warn!("worker wait failed: {e}, respawning"),
                        }
                        // Fall through to respawn immediately.
                    }
                    _ = shutdown.recv() => {
                        terminate(&supervisor, child, group).await;
                        return;
                    }
                }
            }
            Err(e) => {
                log::warn!("worker start failed: {e}, retrying in {:?}", config.respawn_delay);
                supervisor.set_state(SupervisorState::Exited);
                tokio::select! {
                    _ = sleep(config.respawn_delay) => {}
                    _ = shutdown.recv() => {
                        supervisor.set_state(SupervisorState::Terminated);
                        return;
                    }
                }
            }
        }
    }
}

async fn terminate(supervisor: &Supervisor, mut child: Child, mut group: ProcessGroup) {
    *supervisor.client.write() = None;
    if let Err(e) = child.kill().await {
        log::debug!("worker kill on shutdown: {e}");
    }
    group.dispose();
    supervisor.set_state(SupervisorState::Terminated);
    log::info!("worker terminated");
}

/// Launch the worker, bind it into a process group, and complete the
/// announcement + connection handshake.
async fn spawn_worker(config: &WorkerConfig) -> Result<(Child, ProcessGroup, RpcClient)> {
    let mut command = std::process::Command::new(&config.program);
    command.args(&config.args);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut command = Command::from(command);
    command
        .env(COOKIE_ENV, MAGIC_COOKIE)
        // stdin stays open for the worker's orphan watchdog; stdout carries
        // the announcement line, then worker log lines.
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| {
        BridgeError::unavailable(format!(
            "failed to spawn worker {}: {e}",
            config.program.display()
        ))
    })?;

    let mut group = ProcessGroup::new()?;
    if let Some(pid) = child.id() {
        if let Err(e) = group.add(pid) {
            log::warn!("could not bind worker into process group: {e}");
        }
    }

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| BridgeError::unavailable("worker stdout not captured"))?;
    let mut lines = BufReader::new(stdout).lines();

    let line = timeout(config.handshake_timeout, lines.next_line())
        .await
        .map_err(|_| BridgeError::protocol("timed out waiting for worker announcement"))??
        .ok_or_else(|| BridgeError::unavailable("worker exited before announcing its listener"))?;
    let addr = parse_announce(&line)?;

    // Keep draining stdout so the worker never blocks on a full pipe.
    tokio::spawn(async move {
        while let Ok(Some(line)) = lines.next_line().await {
            log::debug!("worker: {line}");
        }
    });

    let client = RpcClient::connect(&addr).await?;
    Ok((child, group, client))
}
