//! Action Router Implementation

use alerting::ActionKind;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::actuator::{Actuator, ActuatorCommand};
use crate::error::RouteError;
use crate::pending::{ActionStatus, PendingAction, RouteKey};

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// How long to wait for the actuator (default: 10s)
    pub actuator_timeout: Duration,
    /// Terminal actions kept for inspection
    pub archive_capacity: usize,
    /// Pump run time sent with every command (default: 5s)
    pub pump_duration: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            actuator_timeout: Duration::from_secs(10),
            archive_capacity: 1000,
            pump_duration: Duration::from_secs(5),
        }
    }
}

/// Accepted route. Resolves to the terminal [`PendingAction`].
#[derive(Debug)]
pub struct RouteHandle {
    pub action_id: Uuid,
    pub key: RouteKey,
    outcome: oneshot::Receiver<PendingAction>,
}

impl RouteHandle {
    /// Wait for the actuator outcome
    pub async fn outcome(self) -> Result<PendingAction, RouteError> {
        let action_id = self.action_id;
        self.outcome
            .await
            .map_err(|_| RouteError::WorkerLost(action_id))
    }
}

struct RouterInner {
    actuator: Arc<dyn Actuator>,
    config: RouterConfig,
    /// Issued commands by routing slot
    in_flight: DashMap<RouteKey, PendingAction>,
    /// Terminal commands, oldest first
    archive: Mutex<VecDeque<PendingAction>>,
}

/// Routes actions to the actuator, one in-flight command per slot.
///
/// Cloning yields another handle on the same registry.
#[derive(Clone)]
pub struct ActionRouter {
    inner: Arc<RouterInner>,
}

impl ActionRouter {
    /// Create a new router
    pub fn new(actuator: Arc<dyn Actuator>, config: RouterConfig) -> Self {
        info!(
            "Creating action router: timeout={}ms, archive={}, pump_duration={}s",
            config.actuator_timeout.as_millis(),
            config.archive_capacity,
            config.pump_duration.as_secs()
        );
        Self {
            inner: Arc::new(RouterInner {
                actuator,
                archive: Mutex::new(VecDeque::with_capacity(config.archive_capacity.min(1024))),
                config,
                in_flight: DashMap::new(),
            }),
        }
    }

    /// Route `action` for `alert_id` to `device`.
    ///
    /// The slot is registered and the worker spawned while the slot's
    /// shard lock is held, so two racing calls for the same slot cannot
    /// both issue a command. Must be called from within a tokio runtime.
    pub fn route(&self, alert_id: &str, action: ActionKind, device: &str) -> Result<RouteHandle, RouteError> {
        let key = RouteKey::new(device, action);

        match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let pending_id = entry.get().id;
                warn!(
                    "Route {} for alert {} rejected: {} already in flight",
                    key, alert_id, pending_id
                );
                Err(RouteError::AlreadyInFlight {
                    device: key.device,
                    action,
                    pending_id,
                })
            }
            Entry::Vacant(slot) => {
                let pending = PendingAction::issued(alert_id, &key, Utc::now());
                let action_id = pending.id;
                let registered = slot.insert(pending);

                let (tx, rx) = oneshot::channel();
                let inner = Arc::clone(&self.inner);
                let worker_key = key.clone();
                tokio::spawn(async move {
                    if let Some(finished) = inner.execute(worker_key, action_id).await {
                        // receiver may be gone; the archive still has the outcome
                        let _ = tx.send(finished);
                    }
                });
                drop(registered);

                info!("Issued {} for alert {} as {}", key, alert_id, action_id);
                Ok(RouteHandle {
                    action_id,
                    key,
                    outcome: rx,
                })
            }
        }
    }

    /// Issued command occupying the slot, if any
    pub fn in_flight(&self, device: &str, action: ActionKind) -> Option<PendingAction> {
        self.inner
            .in_flight
            .get(&RouteKey::new(device, action))
            .map(|p| p.clone())
    }

    /// Number of occupied slots
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Most recent terminal actions, newest first
    pub fn archived(&self, limit: usize) -> Vec<PendingAction> {
        self.inner
            .archive
            .lock()
            .map(|archive| archive.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Look up an action by id, in flight or archived
    pub fn find(&self, action_id: Uuid) -> Option<PendingAction> {
        if let Some(pending) = self
            .inner
            .in_flight
            .iter()
            .find(|entry| entry.value().id == action_id)
        {
            return Some(pending.value().clone());
        }

        self.inner
            .archive
            .lock()
            .ok()
            .and_then(|archive| archive.iter().rev().find(|p| p.id == action_id).cloned())
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }
}

impl RouterInner {
    /// Run the actuator call and release the slot
    async fn execute(&self, key: RouteKey, action_id: Uuid) -> Option<PendingAction> {
        let command = ActuatorCommand {
            device: key.device.clone(),
            action: key.action,
            duration: self.config.pump_duration,
        };

        let limit = self.config.actuator_timeout;
        let (status, failure) = match timeout(limit, self.actuator.send_command(&command)).await {
            Ok(Ok(())) => (ActionStatus::Acknowledged, None),
            Ok(Err(e)) => {
                warn!("Actuator failed {} ({}): {}", key, action_id, e);
                (ActionStatus::Failed, Some(e.to_string()))
            }
            Err(_) => {
                warn!("Actuator timed out {} ({}) after {}ms", key, action_id, limit.as_millis());
                (
                    ActionStatus::TimedOut,
                    Some(format!("no response within {}ms", limit.as_millis())),
                )
            }
        };

        let Some((_, mut pending)) = self.in_flight.remove_if(&key, |_, p| p.id == action_id) else {
            error!("Slot {} lost its pending action {}", key, action_id);
            return None;
        };
        pending.resolve(status, failure, Utc::now());
        debug!("Action {} resolved: {}", action_id, status);

        self.record(pending.clone());
        Some(pending)
    }

    fn record(&self, pending: PendingAction) {
        match self.archive.lock() {
            Ok(mut archive) => {
                while archive.len() >= self.config.archive_capacity.max(1) {
                    archive.pop_front();
                }
                archive.push_back(pending);
            }
            Err(e) => error!("Archive lock poisoned, dropping {}: {}", pending.id, e),
        }
    }
}
