//! # Maintenance Worker
//!
//! The only place the detection pipeline touches the disk.
//!
//! ## Architecture
//!
//! ```text
//!   Detector threads ──┐
//!   Host thread ───────┼──> [bounded command channel] ──> [Maintenance Thread] ──> Disk
//!   Sweep/save ticks ──┘          (try_send)               (single writer)
//! ```
//!
//! The worker wakes on three sources:
//! 1. **Sweep tick**: purge expired violations, evict idle profiles
//! 2. **Save tick**: write the reputation table if it changed
//! 3. **Commands**: on-demand saves and sweeps from any thread
//!
//! Requests never block the caller. A full queue drops the request and
//! logs a warning. Dropping the worker flushes the table and joins the thread.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::Serialize;
use warden_core::TelemetryStore;
use warden_shared::EntityId;

use crate::config::WardenConfig;
use crate::error::SecurityResult;
use crate::reputation::ReputationLedger;

/// Called on the maintenance thread with the entities an idle sweep evicted.
pub type EvictionHook = Box<dyn Fn(&[EntityId]) + Send>;

/// Work the maintenance thread can be asked to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    /// Save the reputation table even if it is unchanged.
    Save,
    /// Run a sweep now.
    Sweep,
}

/// Counters kept by the maintenance thread.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceStats {
    /// Completed sweeps.
    pub sweeps: u64,
    /// Successful saves.
    pub saves: u64,
    /// Failed saves.
    pub save_failures: u64,
    /// Requests dropped because the queue was full.
    pub dropped_requests: u64,
    /// Profiles evicted for idleness.
    pub evicted_profiles: u64,
    /// Violation records purged for age.
    pub purged_violations: u64,
    /// Time spent in the last save (microseconds).
    pub last_save_us: u64,
}

/// Cloneable handle for queueing maintenance work.
#[derive(Clone)]
pub struct MaintenanceHandle {
    commands: Sender<Command>,
    stats: Arc<Mutex<MaintenanceStats>>,
}

impl MaintenanceHandle {
    /// Queues a save. Returns `false` if the request was dropped.
    pub fn request_save(&self) -> bool {
        self.send(Command::Save)
    }

    /// Queues a sweep. Returns `false` if the request was dropped.
    pub fn request_sweep(&self) -> bool {
        self.send(Command::Sweep)
    }

    fn send(&self, command: Command) -> bool {
        match self.commands.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.stats.lock().dropped_requests += 1;
                tracing::warn!("Maintenance queue full, dropping {:?} request", command);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("Maintenance worker stopped, dropping {:?} request", command);
                false
            }
        }
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> MaintenanceStats {
        self.stats.lock().clone()
    }
}

/// State the maintenance thread works on.
struct Context {
    store: Arc<TelemetryStore>,
    ledger: Arc<ReputationLedger>,
    host_clock: Arc<AtomicU64>,
    data_path: PathBuf,
    retention_ms: u64,
    idle_timeout: Duration,
    on_evict: EvictionHook,
    stats: Arc<Mutex<MaintenanceStats>>,
}

/// Owner of the maintenance thread.
pub struct MaintenanceWorker {
    handle: MaintenanceHandle,
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MaintenanceWorker {
    /// Starts the maintenance thread.
    ///
    /// `host_clock` holds the newest host timestamp (ms); violation
    /// retention is measured against it. `on_evict` sees every batch of
    /// idle profiles a sweep removes.
    ///
    /// # Errors
    ///
    /// [`SecurityError::Persistence`](crate::SecurityError::Persistence) if
    /// the thread cannot be spawned.
    pub fn spawn(
        config: &WardenConfig,
        store: Arc<TelemetryStore>,
        ledger: Arc<ReputationLedger>,
        host_clock: Arc<AtomicU64>,
        on_evict: EvictionHook,
    ) -> SecurityResult<Self> {
        let (command_tx, command_rx) = bounded(config.save_queue_capacity);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let stats = Arc::new(Mutex::new(MaintenanceStats::default()));

        let retention_ms = u64::try_from(config.violation_retention().as_millis()).unwrap_or(u64::MAX);
        let context = Context {
            store,
            ledger,
            host_clock,
            data_path: config.data_path.clone(),
            retention_ms,
            idle_timeout: config.idle_timeout(),
            on_evict,
            stats: Arc::clone(&stats),
        };
        let sweep_interval = config.sweep_interval();
        let save_interval = config.save_interval();

        let thread = thread::Builder::new()
            .name("warden-maintenance".into())
            .spawn(move || {
                Self::run(&context, &command_rx, &shutdown_rx, sweep_interval, save_interval);
            })?;

        tracing::info!(
            "Maintenance worker started (sweep every {:?}, save every {:?})",
            sweep_interval,
            save_interval
        );

        Ok(Self {
            handle: MaintenanceHandle { commands: command_tx, stats },
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Handle for queueing work from other threads.
    #[must_use]
    pub fn handle(&self) -> MaintenanceHandle {
        self.handle.clone()
    }

    /// Stops the thread after a final flush and returns the counters.
    pub fn shutdown(mut self) -> MaintenanceStats {
        self.stop();
        self.handle.stats()
    }

    fn stop(&mut self) {
        // Disconnecting the shutdown channel wakes the thread.
        drop(self.shutdown.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Maintenance thread panicked");
            }
        }
    }

    /// Worker thread main loop.
    fn run(
        context: &Context,
        commands: &Receiver<Command>,
        shutdown: &Receiver<()>,
        sweep_interval: Duration,
        save_interval: Duration,
    ) {
        let sweep_tick = tick(sweep_interval);
        let save_tick = tick(save_interval);

        loop {
            select! {
                recv(commands) -> command => match command {
                    Ok(command) => context.execute(command),
                    Err(_) => break,
                },
                recv(sweep_tick) -> _ => context.sweep(),
                recv(save_tick) -> _ => {
                    if context.ledger.take_dirty() {
                        context.save();
                    }
                },
                recv(shutdown) -> _ => break,
            }
        }

        // Drain queued requests, then flush.
        while let Ok(command) = commands.try_recv() {
            context.execute(command);
        }
        if context.ledger.take_dirty() {
            context.save();
        }
        tracing::info!("Maintenance worker stopped");
    }
}

impl Drop for MaintenanceWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Context {
    fn execute(&self, command: Command) {
        match command {
            Command::Save => {
                self.ledger.take_dirty();
                self.save();
            }
            Command::Sweep => self.sweep(),
        }
    }

    fn sweep(&self) {
        let now_ms = self.host_clock.load(Ordering::Acquire);
        let purged = self.ledger.purge_expired(now_ms, self.retention_ms);
        let evicted = self.store.evict_idle(self.idle_timeout);
        if !evicted.is_empty() {
            (self.on_evict)(&evicted);
        }

        let mut stats = self.stats.lock();
        stats.sweeps += 1;
        stats.purged_violations += purged as u64;
        stats.evicted_profiles += evicted.len() as u64;
    }

    fn save(&self) {
        let start = Instant::now();
        match self.ledger.save_to(&self.data_path) {
            Ok(count) => {
                let elapsed = start.elapsed();
                let mut stats = self.stats.lock();
                stats.saves += 1;
                stats.last_save_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
                tracing::debug!("Saved {} reputation records in {:?}", count, elapsed);
            }
            Err(e) => {
                // Keep the changes pending for the next attempt.
                self.ledger.mark_dirty();
                self.stats.lock().save_failures += 1;
                tracing::error!("Failed to save reputation to {}: {}", self.data_path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reputation::Violation;

    fn config(dir: &std::path::Path) -> WardenConfig {
        WardenConfig {
            data_path: dir.join("reputation.dat"),
            sweep_interval_secs: 3_600,
            save_interval_secs: 3_600,
            save_queue_capacity: 1,
            ..WardenConfig::default()
        }
    }

    fn spawn(config: &WardenConfig) -> (MaintenanceWorker, Arc<ReputationLedger>, Arc<AtomicU64>) {
        let ledger = Arc::new(ReputationLedger::new());
        let clock = Arc::new(AtomicU64::new(0));
        let worker = MaintenanceWorker::spawn(
            config,
            Arc::new(TelemetryStore::new()),
            Arc::clone(&ledger),
            Arc::clone(&clock),
            Box::new(|_| {}),
        )
        .unwrap();
        (worker, ledger, clock)
    }

    #[test]
    fn test_flush_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let (worker, ledger, _) = spawn(&config);

        ledger.record_clean_interval("alex").unwrap();
        let stats = worker.shutdown();

        assert_eq!(stats.saves, 1);
        let reloaded = ReputationLedger::new();
        assert_eq!(reloaded.load_from(&config.data_path).unwrap(), 1);
        assert_eq!(reloaded.reputation("alex"), 51.0);
    }

    #[test]
    fn test_clean_ledger_not_saved_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let (worker, _, _) = spawn(&config);

        assert_eq!(worker.shutdown().saves, 0);
        assert!(!config.data_path.exists());
    }

    #[test]
    fn test_requested_sweep_purges_by_host_clock() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let (worker, ledger, clock) = spawn(&config);

        ledger
            .add_violation(Violation {
                identity: "steve".into(),
                check_name: "fly".into(),
                severity: 90.0,
                timestamp_ms: 0,
                details: String::new(),
            })
            .unwrap();
        clock.store(25 * 3_600 * 1_000, Ordering::Release);

        let handle = worker.handle();
        // Capacity 1: retry until the request is accepted.
        while !handle.request_sweep() {
            thread::yield_now();
        }
        let stats = worker.shutdown();

        assert_eq!(stats.sweeps, 1);
        assert_eq!(stats.purged_violations, 2);
        assert!(ledger.violations_for("steve").is_empty());
    }

    #[test]
    fn test_sweep_reports_evicted_entities() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.idle_timeout_secs = 1;

        let store = Arc::new(TelemetryStore::new());
        store.record_velocity(EntityId(7), warden_shared::Vec3::ZERO);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let worker = MaintenanceWorker::spawn(
            &config,
            Arc::clone(&store),
            Arc::new(ReputationLedger::new()),
            Arc::new(AtomicU64::new(0)),
            Box::new(move |entities| sink.lock().extend_from_slice(entities)),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(1_100));
        let handle = worker.handle();
        while !handle.request_sweep() {
            thread::yield_now();
        }
        let stats = worker.shutdown();

        assert_eq!(stats.evicted_profiles, 1);
        assert_eq!(*seen.lock(), vec![EntityId(7)]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_failure_is_counted() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the parent directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let mut config = config(dir.path());
        config.data_path = blocker.join("reputation.dat");
        let (worker, ledger, _) = spawn(&config);

        ledger.record_clean_interval("alex").unwrap();
        let stats = worker.shutdown();

        assert_eq!(stats.saves, 0);
        assert_eq!(stats.save_failures, 1);
        assert!(ledger.take_dirty());
    }
}
