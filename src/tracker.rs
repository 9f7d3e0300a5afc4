//! Tracking controller: owns the application state and serializes all
//! reconciliation through one worker
//!
//! Periodic polls and user-initiated relocations both mutate the history
//! store, so they flow through a single command loop instead of racing.
//! A poll cycle fetches devices and sensors jointly and aborts without
//! touching state when either fetch fails.

use crate::backend::{BackendError, PositionUpdate, PositioningBackend, RssiLogs};
use crate::config::{ConfigError, TrackerConfig};
use crate::core::{AnchorSet, Device};
use crate::history::{HistoryEntry, HistoryStore};
use crate::overlay::{project_device, project_map, OverlayProjection};
use crate::reconcile::{reconcile_devices, ReconcileOutcome};
use crate::validation::{screen_devices, screen_sensors};
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Errors surfaced to tracker callers
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Fetch or update failure; in-memory state is preserved unchanged and
    /// the next scheduled cycle retries.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// Rejected synchronously, before any network call is made
    #[error("invalid manual coordinates ({x}, {y}) for device {device_id}")]
    InvalidCoordinates {
        device_id: String,
        x: f64,
        y: f64,
    },
    #[error("unknown device {0}")]
    UnknownDevice(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The worker loop has shut down and can no longer serve commands
    #[error("tracker worker is gone")]
    WorkerGone,
}

/// What one poll cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub devices: usize,
    pub anchors: usize,
    /// Device and sensor records excluded by screening
    pub rejected_records: usize,
    pub outcome: ReconcileOutcome,
}

/// Commands served by the worker loop
#[derive(Debug)]
pub enum TrackerCommand {
    /// Manual relocation: validate, post, re-fetch, reconcile
    UpdatePosition {
        device_id: String,
        x: f64,
        y: f64,
        reply: oneshot::Sender<Result<CycleSummary, TrackerError>>,
    },
    /// Run one poll cycle out of schedule
    Poll {
        reply: oneshot::Sender<Result<CycleSummary, TrackerError>>,
    },
}

/// Cloneable sender for submitting commands to a running worker
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<TrackerCommand>,
}

impl TrackerHandle {
    pub async fn update_position(
        &self,
        device_id: &str,
        x: f64,
        y: f64,
    ) -> Result<CycleSummary, TrackerError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(TrackerCommand::UpdatePosition {
                device_id: device_id.to_string(),
                x,
                y,
                reply,
            })
            .await
            .map_err(|_| TrackerError::WorkerGone)?;
        response.await.map_err(|_| TrackerError::WorkerGone)?
    }

    pub async fn poll_now(&self) -> Result<CycleSummary, TrackerError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(TrackerCommand::Poll { reply })
            .await
            .map_err(|_| TrackerError::WorkerGone)?;
        response.await.map_err(|_| TrackerError::WorkerGone)?
    }
}

/// The application state and its owning controller
pub struct Tracker<B: PositioningBackend> {
    backend: B,
    config: TrackerConfig,
    store: HistoryStore,
    devices: Vec<Device>,
    anchors: AnchorSet,
    cycles_completed: u64,
}

impl<B: PositioningBackend> Tracker<B> {
    pub fn new(backend: B, config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        let store = HistoryStore::with_settings(config.history_capacity, config.dedup_tolerance_m);
        Ok(Self {
            backend,
            config,
            store,
            devices: Vec::new(),
            anchors: AnchorSet::new(),
            cycles_completed: 0,
        })
    }

    /// The authoritative device list as of the last successful cycle
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, device_id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == device_id)
    }

    pub fn anchors(&self) -> &AnchorSet {
        &self.anchors
    }

    pub fn history_for(&self, device_id: &str) -> &[HistoryEntry] {
        self.store.history_for(device_id)
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    /// Detail-view projection for one tracked device
    pub fn detail_overlay(&self, device_id: &str) -> Option<OverlayProjection> {
        self.device(device_id)
            .map(|d| project_device(d, &self.anchors, self.config.ring_segments))
    }

    /// Map-view projection of the whole fleet
    pub fn map_overlay(&self, highlight: Option<&str>) -> OverlayProjection {
        project_map(&self.devices, &self.anchors, highlight)
    }

    /// Server-owned signal history, passed through for display
    pub async fn device_rssi_logs(&self, device_id: &str) -> Result<RssiLogs, TrackerError> {
        Ok(self.backend.device_rssi_logs(device_id).await?)
    }

    /// Runs one poll cycle: fetch both snapshots jointly, screen, reconcile.
    ///
    /// Reconciliation never runs on a partial pair; if either fetch fails the
    /// whole cycle aborts and the previous state stays untouched.
    pub async fn poll_cycle(&mut self) -> Result<CycleSummary, TrackerError> {
        let (device_records, sensor_records) = tokio::try_join!(
            self.backend.fetch_devices(),
            self.backend.fetch_sensors()
        )?;

        let sensors = screen_sensors(sensor_records);
        for defect in &sensors.rejected {
            warn!(%defect, "sensor record rejected");
        }
        let screened = screen_devices(device_records);
        for defect in &screened.rejected {
            warn!(%defect, "device record rejected");
        }
        for defect in &screened.warnings {
            debug!(%defect, "measurement dropped");
        }

        let rejected_records = screened.rejected.len() + sensors.rejected.len();
        let (devices, outcome) =
            reconcile_devices(&self.devices, screened.accepted, &mut self.store);
        self.devices = devices;
        self.anchors = AnchorSet::from_anchors(sensors.accepted);

        if self.config.prune_departed {
            let live: HashSet<String> = self.devices.iter().map(|d| d.id.clone()).collect();
            self.store.prune_unseen(&live);
        }

        self.cycles_completed += 1;
        let summary = CycleSummary {
            devices: self.devices.len(),
            anchors: self.anchors.len(),
            rejected_records,
            outcome,
        };
        info!(
            cycle = self.cycles_completed,
            devices = summary.devices,
            anchors = summary.anchors,
            appended = outcome.appended,
            departed = outcome.departed,
            "poll cycle reconciled"
        );
        Ok(summary)
    }

    /// Manual relocation: validate input, post the override, then pull the
    /// authoritative snapshot so the backend's re-estimation lands in state.
    pub async fn update_device_position(
        &mut self,
        device_id: &str,
        x: f64,
        y: f64,
    ) -> Result<CycleSummary, TrackerError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(TrackerError::InvalidCoordinates {
                device_id: device_id.to_string(),
                x,
                y,
            });
        }
        if self.device(device_id).is_none() {
            return Err(TrackerError::UnknownDevice(device_id.to_string()));
        }

        self.backend
            .update_position(PositionUpdate {
                device_id: device_id.to_string(),
                x,
                y,
            })
            .await?;

        self.poll_cycle().await
    }

    /// Creates the command channel for a worker loop
    pub fn channel(capacity: usize) -> (TrackerHandle, mpsc::Receiver<TrackerCommand>) {
        let (tx, rx) = mpsc::channel(capacity);
        (TrackerHandle { tx }, rx)
    }

    /// The serialized reconciliation worker.
    ///
    /// Periodic polls and manual updates all execute inside this one loop, so
    /// the two flows can never interleave and history append order follows
    /// submission order. A timer tick that fires while a cycle is still
    /// running is skipped rather than queued; the first tick completes
    /// immediately, giving the initial load. With `poll_interval_secs` 0 the
    /// loop serves commands only. Returns the tracker once every handle is
    /// dropped.
    pub async fn run(mut self, mut commands: mpsc::Receiver<TrackerCommand>) -> Self {
        let mut ticker = periodic_ticker(self.config.poll_interval_secs);

        loop {
            tokio::select! {
                _ = next_tick(&mut ticker) => {
                    if let Err(error) = self.poll_cycle().await {
                        warn!(%error, "poll cycle failed; retrying on the next tick");
                    }
                }
                command = commands.recv() => match command {
                    Some(TrackerCommand::UpdatePosition { device_id, x, y, reply }) => {
                        let _ = reply.send(self.update_device_position(&device_id, x, y).await);
                    }
                    Some(TrackerCommand::Poll { reply }) => {
                        let _ = reply.send(self.poll_cycle().await);
                    }
                    None => break,
                },
            }
        }

        self
    }
}

fn periodic_ticker(poll_interval_secs: u64) -> Option<Interval> {
    (poll_interval_secs > 0).then(|| {
        let mut ticker = interval(Duration::from_secs(poll_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    })
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
