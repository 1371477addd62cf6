//! Dispatch Coordinator Implementation

use action_router::{ActionRouter, ActionStatus, Actuator, RouteHandle};
use alerting::{ActionKind, Alert, AlertClassifier, AlertDeduplicator, AlertId};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use metrics::counter;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::DispatchError;
use crate::settings::DispatchConfig;
use crate::state::{ActionTicket, AlertDisposition, AlertEntry, AlertState, PresentationEvent};

/// What a sweep removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub dedup_evicted: usize,
    pub alerts_forgotten: usize,
}

struct CoordinatorInner {
    config: DispatchConfig,
    dedup: AlertDeduplicator,
    classifier: AlertClassifier,
    router: ActionRouter,
    /// State machine per alert id
    alerts: DashMap<AlertId, AlertEntry>,
    presenter: mpsc::Sender<PresentationEvent>,
    next_presentation: AtomicU64,
}

/// Drives each alert through dedupe, classify, present, route and record.
///
/// Two entry points, [`on_alert_received`](Self::on_alert_received) and
/// [`on_user_action`](Self::on_user_action), may be called concurrently
/// from any task. Transitions for one alert id happen under that id's
/// shard lock; unrelated alerts never wait on each other.
#[derive(Clone)]
pub struct DispatchCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl DispatchCoordinator {
    /// Create a coordinator and the receiving end of its presentation channel
    pub fn new(
        config: DispatchConfig,
        actuator: Arc<dyn Actuator>,
    ) -> (Self, mpsc::Receiver<PresentationEvent>) {
        info!(
            "Creating dispatch coordinator: dedup_window={}s ttl={}s actuator_timeout={}s default_device={}",
            config.dedup_window_secs,
            config.presentation_ttl_secs,
            config.actuator_timeout_secs,
            config.default_device
        );

        let (tx, rx) = mpsc::channel(config.presentation_buffer.max(1));
        let coordinator = Self {
            inner: Arc::new(CoordinatorInner {
                dedup: AlertDeduplicator::new(config.dedup_window()),
                classifier: AlertClassifier::new(),
                router: ActionRouter::new(actuator, config.router_config()),
                alerts: DashMap::new(),
                presenter: tx,
                next_presentation: AtomicU64::new(1),
                config,
            }),
        };
        (coordinator, rx)
    }

    /// Ingest an alert from the push transport.
    ///
    /// Never waits on the presentation channel. If the channel is full or
    /// closed the alert is not recorded, its dedup record is released and
    /// [`AlertDisposition::Dropped`] tells the transport to redeliver.
    pub fn on_alert_received(&self, alert: Alert) -> AlertDisposition {
        let inner = &self.inner;
        debug!("Alert {} received: type={}", alert.id(), alert.kind());

        if !inner.dedup.observe(alert.id(), alert.received_at()) {
            info!("Alert {} deduped", alert.id());
            return inner.count(AlertDisposition::Duplicate);
        }

        let alert_id = alert.id().to_string();
        let policy = inner.classifier.classify(&alert);
        let device = alert
            .device()
            .map(str::to_string)
            .unwrap_or_else(|| inner.config.default_device.clone());
        let presentation = inner.next_presentation.fetch_add(1, Ordering::Relaxed);

        let slot = inner.alerts.entry(alert_id.clone());
        if let Entry::Occupied(current) = &slot {
            if !current.get().state.is_terminal() {
                // dedup record aged out while the first delivery is still live
                warn!("Alert {} redelivered while {}, ignoring", alert_id, current.get().state);
                return inner.count(AlertDisposition::Duplicate);
            }
        }

        if !policy.should_notify {
            info!("Alert {} ({}) needs no notification", alert_id, alert.kind());
            slot.insert(AlertEntry {
                state: AlertState::Done,
                policy,
                device,
                received_at: alert.received_at(),
                presentation,
                pending_action: None,
            });
            return inner.count(AlertDisposition::Ignored);
        }

        let event = PresentationEvent::Present {
            alert_id: alert_id.clone(),
            title: alert.title().to_string(),
            body: alert.body().to_string(),
            actions: policy.available_actions.clone(),
            severity: policy.severity,
        };
        if let Err(e) = inner.presenter.try_send(event) {
            drop(slot);
            inner.dedup.forget(&alert_id);
            let reason = match e {
                TrySendError::Full(_) => "full",
                TrySendError::Closed(_) => "closed",
            };
            warn!("Presentation channel {}, alert {} dropped", reason, alert_id);
            return inner.count(AlertDisposition::Dropped);
        }

        slot.insert(AlertEntry {
            state: AlertState::Presented,
            policy,
            device,
            received_at: alert.received_at(),
            presentation,
            pending_action: None,
        });
        self.spawn_expiry(alert_id.clone(), presentation);

        info!("Alert {} presented", alert_id);
        inner.count(AlertDisposition::Presented)
    }

    /// Handle the action a user picked on a presented alert.
    ///
    /// The command is issued before this returns; its outcome arrives on
    /// the presentation channel.
    pub async fn on_user_action(&self, alert_id: &str, action: ActionKind) -> Result<ActionTicket, DispatchError> {
        let (ticket, handle) = {
            let mut entry = self
                .inner
                .alerts
                .get_mut(alert_id)
                .ok_or_else(|| DispatchError::UnknownAlert(alert_id.to_string()))?;

            match entry.state {
                AlertState::Presented => {}
                AlertState::Expired => {
                    info!("Late {} on expired alert {} rejected", action, alert_id);
                    return Err(DispatchError::Expired(alert_id.to_string()));
                }
                state => {
                    return Err(DispatchError::NotActionable {
                        alert_id: alert_id.to_string(),
                        state,
                    })
                }
            }

            if !entry.policy.offers(action) {
                return Err(DispatchError::ActionNotOffered {
                    alert_id: alert_id.to_string(),
                    action,
                });
            }

            let handle = self.inner.router.route(alert_id, action, &entry.device)?;
            entry.state = AlertState::AwaitingAction;
            entry.pending_action = Some(handle.action_id);

            let ticket = ActionTicket {
                alert_id: alert_id.to_string(),
                action_id: handle.action_id,
                action,
                device: entry.device.clone(),
            };
            (ticket, handle)
        };

        info!("Alert {}: {} issued as {}", alert_id, action, ticket.action_id);
        let inner = Arc::clone(&self.inner);
        let follow = ticket.clone();
        tokio::spawn(async move {
            inner.follow(follow, handle).await;
        });
        Ok(ticket)
    }

    /// Current state of an alert, if still tracked
    pub fn state(&self, alert_id: &str) -> Option<AlertState> {
        self.inner.alerts.get(alert_id).map(|entry| entry.state)
    }

    /// Evict stale dedup records and forget terminal alerts past the window
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let window = self.inner.config.dedup_window();
        let dedup_evicted = self.inner.dedup.sweep(now);

        let before = self.inner.alerts.len();
        self.inner
            .alerts
            .retain(|_, entry| !(entry.state.is_terminal() && now - entry.received_at >= window));
        let alerts_forgotten = before.saturating_sub(self.inner.alerts.len());

        if dedup_evicted > 0 || alerts_forgotten > 0 {
            info!(
                "Sweep evicted {} dedup records, forgot {} alerts",
                dedup_evicted, alerts_forgotten
            );
        }
        SweepReport {
            dedup_evicted,
            alerts_forgotten,
        }
    }

    /// Run [`sweep`](Self::sweep) every `sweep_interval` until aborted
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        let period = self.inner.config.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                coordinator.sweep(Utc::now());
            }
        })
    }

    /// Router holding in-flight and archived actions
    pub fn router(&self) -> &ActionRouter {
        &self.inner.router
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// Number of tracked alerts
    pub fn tracked(&self) -> usize {
        self.inner.alerts.len()
    }

    fn spawn_expiry(&self, alert_id: AlertId, presentation: u64) {
        let inner = Arc::clone(&self.inner);
        let ttl = self.inner.config.presentation_ttl();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            inner.expire(&alert_id, presentation).await;
        });
    }
}

impl CoordinatorInner {
    fn count(&self, disposition: AlertDisposition) -> AlertDisposition {
        counter!("plant_alert_alerts_total", "disposition" => disposition.as_str()).increment(1);
        disposition
    }

    async fn emit(&self, event: PresentationEvent) {
        if let Err(e) = self.presenter.send(event).await {
            warn!("Presentation channel closed, dropping event for {}", e.0.alert_id());
        }
    }

    /// TTL elapsed for one presentation
    async fn expire(&self, alert_id: &str, presentation: u64) {
        let expired = match self.alerts.get_mut(alert_id) {
            Some(mut entry) => {
                let live = matches!(entry.state, AlertState::Presented | AlertState::AwaitingAction);
                if entry.presentation == presentation && live {
                    if entry.state == AlertState::AwaitingAction {
                        // the command already sent is not recalled
                        info!("Alert {} expired with an action still in flight", alert_id);
                    }
                    entry.state = AlertState::Expired;
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        if expired {
            info!("Alert {} expired", alert_id);
            counter!("plant_alert_expired_total").increment(1);
            self.emit(PresentationEvent::Withdrawn {
                alert_id: alert_id.to_string(),
            })
            .await;
        }
    }

    /// Wait for the actuator outcome of a user action and record it
    async fn follow(&self, ticket: ActionTicket, handle: RouteHandle) {
        let (status, failure) = match handle.outcome().await {
            Ok(pending) => (pending.status, pending.failure),
            Err(e) => {
                error!("Lost outcome of {} for alert {}: {}", ticket.action_id, ticket.alert_id, e);
                (ActionStatus::Failed, Some(e.to_string()))
            }
        };
        counter!("plant_alert_actions_total", "status" => status.as_str()).increment(1);

        let routed = self.settle(&ticket, status);
        match status {
            ActionStatus::Acknowledged => info!("Alert {}: {} acknowledged", ticket.alert_id, ticket.action),
            _ => warn!(
                "Alert {}: {} ended {} ({})",
                ticket.alert_id,
                ticket.action,
                status,
                failure.as_deref().unwrap_or("no detail")
            ),
        }

        self.emit(PresentationEvent::ActionOutcome {
            alert_id: ticket.alert_id.clone(),
            action_id: ticket.action_id,
            action: ticket.action,
            device: ticket.device.clone(),
            status,
            failure,
        })
        .await;

        if routed {
            if let Some(mut entry) = self.alerts.get_mut(&ticket.alert_id) {
                if entry.state == AlertState::Routed && entry.pending_action == Some(ticket.action_id) {
                    entry.state = AlertState::Done;
                    debug!("Alert {} done", ticket.alert_id);
                }
            }
        }
    }

    /// Apply an actuator outcome to the alert. Returns `true` if routed.
    ///
    /// A failed or timed-out command hands the alert back to the user;
    /// an expired alert stays expired.
    fn settle(&self, ticket: &ActionTicket, status: ActionStatus) -> bool {
        let Some(mut entry) = self.alerts.get_mut(&ticket.alert_id) else {
            return false;
        };
        if entry.state != AlertState::AwaitingAction || entry.pending_action != Some(ticket.action_id) {
            return false;
        }

        if status == ActionStatus::Acknowledged {
            entry.state = AlertState::Routed;
            true
        } else {
            entry.state = AlertState::Presented;
            entry.pending_action = None;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_router::{MockActuator, MockResponse};
    use alerting::{AlertKind, Severity};
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;

    fn low_moisture(id: &str) -> Alert {
        Alert::new(id, AlertKind::LowMoisture, "Low moisture", "Plant 3 is dry", Utc::now())
            .with_device("device3")
    }

    fn setup(
        config: DispatchConfig,
        actuator: Arc<MockActuator>,
    ) -> (DispatchCoordinator, mpsc::Receiver<PresentationEvent>) {
        DispatchCoordinator::new(config, actuator)
    }

    async fn wait_for_state(coordinator: &DispatchCoordinator, alert_id: &str, state: AlertState) {
        for _ in 0..100 {
            if coordinator.state(alert_id) == Some(state) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "alert {} never reached {} (is {:?})",
            alert_id,
            state,
            coordinator.state(alert_id)
        );
    }

    #[tokio::test]
    async fn test_scenario_present_water_done() {
        let actuator = Arc::new(MockActuator::acking());
        let (coordinator, mut events) = setup(DispatchConfig::default(), actuator.clone());

        let disposition = coordinator.on_alert_received(low_moisture("a1"));
        assert_eq!(disposition, AlertDisposition::Presented);
        assert_eq!(
            events.recv().await.unwrap(),
            PresentationEvent::Present {
                alert_id: "a1".to_string(),
                title: "Low moisture".to_string(),
                body: "Plant 3 is dry".to_string(),
                actions: vec![ActionKind::Water],
                severity: Severity::High,
            }
        );
        assert_eq!(coordinator.state("a1"), Some(AlertState::Presented));

        let ticket = coordinator.on_user_action("a1", ActionKind::Water).await.unwrap();
        assert_eq!(ticket.device, "device3");

        match events.recv().await.unwrap() {
            PresentationEvent::ActionOutcome {
                alert_id,
                action_id,
                status,
                ..
            } => {
                assert_eq!(alert_id, "a1");
                assert_eq!(action_id, ticket.action_id);
                assert_eq!(status, ActionStatus::Acknowledged);
            }
            other => panic!("unexpected event {:?}", other),
        }
        wait_for_state(&coordinator, "a1", AlertState::Done).await;

        assert_eq!(actuator.calls(), 1);
        let archived = coordinator.router().archived(1);
        assert_eq!(archived[0].id, ticket.action_id);
        assert_eq!(archived[0].alert_id, "a1");
    }

    #[tokio::test]
    async fn test_scenario_duplicate_delivery() {
        let actuator = Arc::new(MockActuator::acking());
        let (coordinator, mut events) = setup(DispatchConfig::default(), actuator);

        assert_eq!(
            coordinator.on_alert_received(low_moisture("a1")),
            AlertDisposition::Presented
        );
        assert_eq!(
            coordinator.on_alert_received(low_moisture("a1")),
            AlertDisposition::Duplicate
        );

        assert!(matches!(events.recv().await, Some(PresentationEvent::Present { .. })));
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_duplicate_after_done_still_deduped() {
        let actuator = Arc::new(MockActuator::acking());
        let (coordinator, mut events) = setup(DispatchConfig::default(), actuator);

        coordinator.on_alert_received(low_moisture("a1"));
        events.recv().await.unwrap();
        coordinator.on_user_action("a1", ActionKind::Water).await.unwrap();
        events.recv().await.unwrap();
        wait_for_state(&coordinator, "a1", AlertState::Done).await;

        assert_eq!(
            coordinator.on_alert_received(low_moisture("a1")),
            AlertDisposition::Duplicate
        );
        assert_eq!(coordinator.state("a1"), Some(AlertState::Done));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redelivery_presents_once() {
        let actuator = Arc::new(MockActuator::acking());
        let (coordinator, mut events) = setup(DispatchConfig::default(), actuator);
        let alert = low_moisture("a1");

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = coordinator.clone();
                let alert = alert.clone();
                tokio::spawn(async move { coordinator.on_alert_received(alert) })
            })
            .collect();

        let mut presented = 0;
        let mut duplicates = 0;
        for task in tasks {
            match task.await.unwrap() {
                AlertDisposition::Presented => presented += 1,
                AlertDisposition::Duplicate => duplicates += 1,
                other => panic!("unexpected disposition {:?}", other),
            }
        }
        assert_eq!((presented, duplicates), (1, 7));

        assert!(matches!(events.recv().await, Some(PresentationEvent::Present { .. })));
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_scenario_other_type_done_silently() {
        let actuator = Arc::new(MockActuator::acking());
        let (coordinator, mut events) = setup(DispatchConfig::default(), actuator.clone());

        let alert = Alert::new("a2", AlertKind::from("high_temp"), "Hot", "42C", Utc::now());
        assert_eq!(
            coordinator.on_alert_received(alert),
            AlertDisposition::Ignored
        );

        assert_eq!(coordinator.state("a2"), Some(AlertState::Done));
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(actuator.calls(), 0);
        assert_eq!(
            coordinator.on_user_action("a2", ActionKind::Water).await,
            Err(DispatchError::NotActionable {
                alert_id: "a2".to_string(),
                state: AlertState::Done,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_expiry_rejects_late_action() {
        let actuator = Arc::new(MockActuator::acking());
        let (coordinator, mut events) = setup(DispatchConfig::default(), actuator.clone());

        coordinator.on_alert_received(low_moisture("a3"));
        assert!(matches!(events.recv().await, Some(PresentationEvent::Present { .. })));

        tokio::time::advance(Duration::from_secs(3601)).await;
        assert_eq!(
            events.recv().await.unwrap(),
            PresentationEvent::Withdrawn {
                alert_id: "a3".to_string()
            }
        );
        assert_eq!(coordinator.state("a3"), Some(AlertState::Expired));

        assert_eq!(
            coordinator.on_user_action("a3", ActionKind::Water).await,
            Err(DispatchError::Expired("a3".to_string()))
        );
        assert_eq!(actuator.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_does_not_recall_inflight_command() {
        let actuator = Arc::new(MockActuator::acking().gated());
        let config = DispatchConfig {
            presentation_ttl_secs: 60,
            actuator_timeout_secs: 600,
            ..Default::default()
        };
        let (coordinator, mut events) = setup(config, actuator.clone());

        coordinator.on_alert_received(low_moisture("a4"));
        events.recv().await.unwrap();
        let ticket = coordinator.on_user_action("a4", ActionKind::Water).await.unwrap();
        assert_eq!(coordinator.state("a4"), Some(AlertState::AwaitingAction));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(matches!(
            events.recv().await,
            Some(PresentationEvent::Withdrawn { .. })
        ));
        assert_eq!(coordinator.state("a4"), Some(AlertState::Expired));

        actuator.release(1);
        match events.recv().await.unwrap() {
            PresentationEvent::ActionOutcome { action_id, status, .. } => {
                assert_eq!(action_id, ticket.action_id);
                assert_eq!(status, ActionStatus::Acknowledged);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(coordinator.state("a4"), Some(AlertState::Expired));
        assert_eq!(actuator.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_returns_alert_for_explicit_retry() {
        let actuator = Arc::new(
            MockActuator::acking().with_script([MockResponse::Fail("pump jammed".to_string())]),
        );
        let (coordinator, mut events) = setup(DispatchConfig::default(), actuator.clone());

        coordinator.on_alert_received(low_moisture("a5"));
        events.recv().await.unwrap();
        coordinator.on_user_action("a5", ActionKind::Water).await.unwrap();

        match events.recv().await.unwrap() {
            PresentationEvent::ActionOutcome { status, failure, .. } => {
                assert_eq!(status, ActionStatus::Failed);
                assert_eq!(failure.as_deref(), Some("Actuator rejected command: pump jammed"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(coordinator.state("a5"), Some(AlertState::Presented));
        assert_eq!(actuator.calls(), 1);

        coordinator.on_user_action("a5", ActionKind::Water).await.unwrap();
        assert!(matches!(
            events.recv().await,
            Some(PresentationEvent::ActionOutcome {
                status: ActionStatus::Acknowledged,
                ..
            })
        ));
        wait_for_state(&coordinator, "a5", AlertState::Done).await;
        assert_eq!(actuator.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_actuator_timeout_surfaces_to_presenter() {
        let actuator = Arc::new(MockActuator::new(MockResponse::Hang));
        let (coordinator, mut events) = setup(DispatchConfig::default(), actuator);

        coordinator.on_alert_received(low_moisture("a6"));
        events.recv().await.unwrap();
        coordinator.on_user_action("a6", ActionKind::Water).await.unwrap();

        assert!(matches!(
            events.recv().await,
            Some(PresentationEvent::ActionOutcome {
                status: ActionStatus::TimedOut,
                ..
            })
        ));
        assert_eq!(coordinator.state("a6"), Some(AlertState::Presented));
        assert_eq!(coordinator.router().in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_double_tap_and_shared_device() {
        let actuator = Arc::new(MockActuator::acking().gated());
        let (coordinator, mut events) = setup(DispatchConfig::default(), actuator.clone());

        coordinator.on_alert_received(low_moisture("a7"));
        coordinator.on_alert_received(low_moisture("a8"));
        events.recv().await.unwrap();
        events.recv().await.unwrap();

        let ticket = coordinator.on_user_action("a7", ActionKind::Water).await.unwrap();
        assert_eq!(
            coordinator.on_user_action("a7", ActionKind::Water).await,
            Err(DispatchError::NotActionable {
                alert_id: "a7".to_string(),
                state: AlertState::AwaitingAction,
            })
        );
        assert_eq!(
            coordinator.on_user_action("a8", ActionKind::Water).await,
            Err(DispatchError::AlreadyInFlight {
                device: "device3".to_string(),
                action: ActionKind::Water,
                pending_id: ticket.action_id,
            })
        );
        assert_eq!(coordinator.state("a8"), Some(AlertState::Presented));

        actuator.release(1);
        events.recv().await.unwrap();

        // slot released: the other alert's action is now accepted
        actuator.release(1);
        coordinator.on_user_action("a8", ActionKind::Water).await.unwrap();
        assert!(matches!(
            events.recv().await,
            Some(PresentationEvent::ActionOutcome {
                status: ActionStatus::Acknowledged,
                ..
            })
        ));
        assert_eq!(actuator.calls(), 2);
    }

    #[tokio::test]
    async fn test_default_device_and_pump_duration() {
        let actuator = Arc::new(MockActuator::acking());
        let config = DispatchConfig {
            pump_duration_secs: 12,
            ..Default::default()
        };
        let (coordinator, mut events) = setup(config, actuator.clone());

        let alert = Alert::new("a9", AlertKind::LowMoisture, "Low moisture", "dry", Utc::now());
        coordinator.on_alert_received(alert);
        events.recv().await.unwrap();

        let ticket = coordinator.on_user_action("a9", ActionKind::Water).await.unwrap();
        assert_eq!(ticket.device, "pump");
        events.recv().await.unwrap();
        assert_eq!(actuator.commands()[0].device, "pump");
        assert_eq!(actuator.commands()[0].duration, Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_unknown_alert() {
        let (coordinator, _events) = setup(DispatchConfig::default(), Arc::new(MockActuator::acking()));

        assert_eq!(
            coordinator.on_user_action("nope", ActionKind::Water).await,
            Err(DispatchError::UnknownAlert("nope".to_string()))
        );
    }

    #[tokio::test]
    async fn test_sweep_forgets_terminal_alerts() {
        let (coordinator, mut events) = setup(DispatchConfig::default(), Arc::new(MockActuator::acking()));
        let received = Utc::now();

        let ignored = Alert::new("old", AlertKind::from("high_temp"), "", "", received);
        coordinator.on_alert_received(ignored);
        coordinator.on_alert_received(low_moisture("live"));
        events.recv().await.unwrap();

        let report = coordinator.sweep(received + chrono::Duration::hours(25));
        assert_eq!(report.dedup_evicted, 2);
        assert_eq!(report.alerts_forgotten, 1);
        assert_eq!(coordinator.state("old"), None);
        // non-terminal alerts are kept
        assert_eq!(coordinator.state("live"), Some(AlertState::Presented));
    }

    #[tokio::test]
    async fn test_full_presenter_drops_without_blocking() {
        let config = DispatchConfig {
            presentation_buffer: 1,
            ..Default::default()
        };
        let (coordinator, mut events) = setup(config, Arc::new(MockActuator::acking()));

        assert_eq!(
            coordinator.on_alert_received(low_moisture("p1")),
            AlertDisposition::Presented
        );
        // nobody drains: the second alert must not wait for room
        assert_eq!(
            coordinator.on_alert_received(low_moisture("p2")),
            AlertDisposition::Dropped
        );
        assert_eq!(coordinator.state("p2"), None);
        assert!(coordinator.on_user_action("p2", ActionKind::Water).await.is_err());

        // once the notifier catches up, the redelivery is presented
        assert!(matches!(events.recv().await, Some(PresentationEvent::Present { .. })));
        assert_eq!(
            coordinator.on_alert_received(low_moisture("p2")),
            AlertDisposition::Presented
        );
        assert_eq!(coordinator.state("p2"), Some(AlertState::Presented));
        assert_eq!(events.recv().await.unwrap().alert_id(), "p2");
    }

    #[tokio::test]
    async fn test_closed_presenter_drops_alert() {
        let (coordinator, events) = setup(DispatchConfig::default(), Arc::new(MockActuator::acking()));
        drop(events);

        assert_eq!(
            coordinator.on_alert_received(low_moisture("a1")),
            AlertDisposition::Dropped
        );
        assert_eq!(coordinator.state("a1"), None);
        // ignored alerts never touch the channel
        let ignored = Alert::new("a2", AlertKind::from("high_temp"), "", "", Utc::now());
        assert_eq!(coordinator.on_alert_received(ignored), AlertDisposition::Ignored);
    }

    #[tokio::test]
    async fn test_live_alert_not_replaced_after_dedup_window() {
        // validation forbids this; the coordinator still must not reset a live alert
        let config = DispatchConfig {
            dedup_window_secs: 1,
            ..Default::default()
        };
        let (coordinator, mut events) = setup(config, Arc::new(MockActuator::acking()));

        coordinator.on_alert_received(low_moisture("a1"));
        events.recv().await.unwrap();

        let late = Alert::new(
            "a1",
            AlertKind::LowMoisture,
            "Low moisture",
            "Plant 3 is dry",
            Utc::now() + chrono::Duration::seconds(5),
        );
        assert_eq!(coordinator.on_alert_received(late), AlertDisposition::Duplicate);
        assert_eq!(coordinator.state("a1"), Some(AlertState::Presented));
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_transient_states_are_never_reported() {
        let (coordinator, mut events) = setup(DispatchConfig::default(), Arc::new(MockActuator::acking()));

        coordinator.on_alert_received(low_moisture("a1"));
        coordinator.on_alert_received(low_moisture("a1"));
        let ignored = Alert::new("a2", AlertKind::from("high_temp"), "", "", Utc::now());
        coordinator.on_alert_received(ignored);
        events.recv().await.unwrap();

        for id in ["a1", "a2"] {
            let state = coordinator.state(id).unwrap();
            assert!(!matches!(
                state,
                AlertState::Received | AlertState::Deduped | AlertState::Classified
            ));
        }
    }
}
