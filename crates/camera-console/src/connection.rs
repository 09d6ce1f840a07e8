//! Backend connection banner.
//!
//! [`ConnectionMonitor`] is the pure transition table; it never sleeps or
//! spawns. [`ConnectionSupervisor`] owns the only timers, runs the checks and
//! publishes every snapshot on a watch channel.

use async_trait::async_trait;
use camera_client::CameraBackend;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const RECONNECTED_DISPLAY: Duration = Duration::from_secs(3);
pub const BANNER_HIDE_DELAY: Duration = Duration::from_secs(2);

const CHECKING_MESSAGE: &str = "Checking backend connection...";
const CONNECTED_MESSAGE: &str = "Connected to backend";
const RECONNECTED_MESSAGE: &str = "Reconnected to backend";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionPhase {
    Checking,
    Connected,
    Disconnected { retry_count: u32 },
    Reconnected,
}

/// What the banner shows right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSnapshot {
    pub phase: ConnectionPhase,
    pub banner_visible: bool,
    pub message: String,
}

impl ConnectionSnapshot {
    pub fn is_connected(&self) -> bool {
        matches!(
            self.phase,
            ConnectionPhase::Connected | ConnectionPhase::Reconnected
        )
    }
}

/// One-shot banner timers. The generation ties a timer to the transition
/// that scheduled it so a superseded timer is ignored when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerTimer {
    Settle { generation: u64 },
    Hide { generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartPolling,
    StopPolling,
    Refresh,
    Schedule { timer: BannerTimer, after: Duration },
}

#[derive(Debug, Clone)]
pub struct ConnectionMonitor {
    phase: ConnectionPhase,
    banner_visible: bool,
    message: String,
    polling: bool,
    generation: u64,
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        Self {
            phase: ConnectionPhase::Checking,
            banner_visible: true,
            message: CHECKING_MESSAGE.to_string(),
            polling: false,
            generation: 0,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            phase: self.phase,
            banner_visible: self.banner_visible,
            message: self.message.clone(),
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn check_succeeded(&mut self) -> Vec<Command> {
        match self.phase {
            ConnectionPhase::Checking => {
                self.phase = ConnectionPhase::Connected;
                self.banner_visible = true;
                self.message = CONNECTED_MESSAGE.to_string();
                let generation = self.next_generation();
                vec![Command::Schedule {
                    timer: BannerTimer::Hide { generation },
                    after: BANNER_HIDE_DELAY,
                }]
            }
            ConnectionPhase::Disconnected { .. } => {
                self.phase = ConnectionPhase::Reconnected;
                self.banner_visible = true;
                self.message = RECONNECTED_MESSAGE.to_string();
                let generation = self.next_generation();
                let mut commands = Vec::with_capacity(3);
                if self.polling {
                    self.polling = false;
                    commands.push(Command::StopPolling);
                }
                commands.push(Command::Refresh);
                commands.push(Command::Schedule {
                    timer: BannerTimer::Settle { generation },
                    after: RECONNECTED_DISPLAY,
                });
                commands
            }
            ConnectionPhase::Connected | ConnectionPhase::Reconnected => Vec::new(),
        }
    }

    pub fn check_failed(&mut self) -> Vec<Command> {
        let retry_count = match self.phase {
            ConnectionPhase::Disconnected { retry_count } => retry_count + 1,
            _ => 1,
        };
        self.phase = ConnectionPhase::Disconnected { retry_count };
        self.banner_visible = true;
        self.message = format!(
            "Disconnected from backend. Retrying (attempt {})...",
            retry_count
        );
        // Any pending settle/hide timer is now stale.
        self.next_generation();

        if self.polling {
            Vec::new()
        } else {
            self.polling = true;
            vec![Command::StartPolling]
        }
    }

    pub fn timer_fired(&mut self, timer: BannerTimer) -> Vec<Command> {
        match timer {
            BannerTimer::Settle { generation }
                if generation == self.generation && self.phase == ConnectionPhase::Reconnected =>
            {
                self.phase = ConnectionPhase::Connected;
                self.message = CONNECTED_MESSAGE.to_string();
                let generation = self.next_generation();
                vec![Command::Schedule {
                    timer: BannerTimer::Hide { generation },
                    after: BANNER_HIDE_DELAY,
                }]
            }
            BannerTimer::Hide { generation }
                if generation == self.generation && self.phase == ConnectionPhase::Connected =>
            {
                self.banner_visible = false;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }
}

/// Invoked once per reconnection so callers can reload stale data.
#[async_trait]
pub trait ReconnectHandler: Send + Sync {
    async fn on_reconnect(&self);
}

/// Runs the connection monitor on a single background task.
pub struct ConnectionSupervisor {
    snapshots: watch::Receiver<ConnectionSnapshot>,
    recheck: mpsc::Sender<()>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ConnectionSupervisor {
    pub fn spawn(
        backend: Arc<dyn CameraBackend>,
        handler: Arc<dyn ReconnectHandler>,
        poll_interval: Duration,
    ) -> Self {
        let monitor = ConnectionMonitor::new();
        let (tx, snapshots) = watch::channel(monitor.snapshot());
        let (recheck, recheck_rx) = mpsc::channel(1);
        let token = CancellationToken::new();

        let driver = Driver {
            monitor,
            backend,
            handler,
            poll_interval,
            snapshots: tx,
            poll: None,
            timer: None,
        };
        let task = tokio::spawn(driver.run(recheck_rx, token.clone()));

        Self {
            snapshots,
            recheck,
            token,
            task,
        }
    }

    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            snapshots: self.snapshots.clone(),
            recheck: self.recheck.clone(),
        }
    }

    /// Cancels the timers and waits for the task to exit. A check that is
    /// already running is allowed to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(err) = self.task.await {
            warn!(error = %err, "connection supervisor task ended abnormally");
        }
    }
}

/// Cloneable view of a running supervisor for request handlers.
#[derive(Clone)]
pub struct ConnectionHandle {
    snapshots: watch::Receiver<ConnectionSnapshot>,
    recheck: mpsc::Sender<()>,
}

impl ConnectionHandle {
    pub fn subscribe(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Ask for an out-of-band check, e.g. after a request failed with a
    /// network error. Coalesces with a check that is already queued.
    pub fn request_check(&self) {
        let _ = self.recheck.try_send(());
    }
}

struct Driver {
    monitor: ConnectionMonitor,
    backend: Arc<dyn CameraBackend>,
    handler: Arc<dyn ReconnectHandler>,
    poll_interval: Duration,
    snapshots: watch::Sender<ConnectionSnapshot>,
    poll: Option<Interval>,
    timer: Option<(Instant, BannerTimer)>,
}

impl Driver {
    async fn run(mut self, mut recheck: mpsc::Receiver<()>, token: CancellationToken) {
        self.check().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tick(&mut self.poll) => {
                    debug!("polling backend");
                    self.check().await;
                }
                timer = fire(self.timer) => {
                    self.timer = None;
                    let commands = self.monitor.timer_fired(timer);
                    self.apply(commands);
                }
                request = recheck.recv() => match request {
                    Some(()) => self.check().await,
                    // Supervisor handle dropped.
                    None => break,
                },
            }
        }

        debug!("connection supervisor stopped");
    }

    async fn check(&mut self) {
        let commands = match self.backend.health_check().await {
            Ok(()) => {
                if matches!(self.monitor.phase(), ConnectionPhase::Disconnected { .. }) {
                    info!("backend reachable again");
                }
                self.monitor.check_succeeded()
            }
            Err(err) => {
                let commands = self.monitor.check_failed();
                if let ConnectionPhase::Disconnected { retry_count } = self.monitor.phase() {
                    warn!(retry_count, error = %err, "backend connection check failed");
                }
                commands
            }
        };
        self.apply(commands);
    }

    /// Arms timers and publishes the snapshot before a refresh is started on
    /// its own task.
    fn apply(&mut self, commands: Vec<Command>) {
        let mut refresh = false;
        for command in commands {
            match command {
                Command::StartPolling => {
                    // Replacing the handle drops any previous interval.
                    let mut interval =
                        time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.poll = Some(interval);
                }
                Command::StopPolling => self.poll = None,
                Command::Refresh => refresh = true,
                Command::Schedule { timer, after } => {
                    self.timer = Some((Instant::now() + after, timer));
                }
            }
        }

        let snapshot = self.monitor.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                info!(message = %snapshot.message, banner = snapshot.banner_visible, "connection state changed");
                *current = snapshot;
                true
            }
        });

        if refresh {
            let handler = self.handler.clone();
            tokio::spawn(async move { handler.on_reconnect().await });
        }
    }
}

async fn tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn fire(timer: Option<(Instant, BannerTimer)>) -> BannerTimer {
    match timer {
        Some((deadline, timer)) => {
            time::sleep_until(deadline).await;
            timer
        }
        None => std::future::pending().await,
    }
}
