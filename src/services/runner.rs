use crate::domain::{ContainerBackend, StatusSnapshot};
use crate::infra::Settings;
use crate::services::bridge::{BrokerBridge, TopicScheme};
use crate::services::reconciler::Reconciler;
use crate::services::session::MqttSession;
use crate::services::ContainerService;
use anyhow::Result;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServicePhase {
    Idle,
    Connecting,
    Running,
    Draining,
    Stopped,
}

/// Composes backend, reconciler and broker bridge into the run loop:
/// connect, start background message processing, poll on a fixed
/// interval, drain in order on interrupt.
pub struct Service {
    settings: Settings,
    containers: Arc<ContainerService>,
    known: Arc<RwLock<StatusSnapshot>>,
    reconciler: Reconciler,
    phase: ServicePhase,
}

impl Service {
    pub fn new(settings: Settings, backend: Arc<dyn ContainerBackend>) -> Self {
        let containers = Arc::new(ContainerService::new(backend, settings.filter.clone()));
        let known = Arc::new(RwLock::new(StatusSnapshot::new()));
        let reconciler = Reconciler::new(known.clone());
        Self {
            settings,
            containers,
            known,
            reconciler,
            phase: ServicePhase::Idle,
        }
    }

    /// The known-status snapshot shared with the stray-config handler.
    pub fn shared_snapshot(&self) -> Arc<RwLock<StatusSnapshot>> {
        self.known.clone()
    }

    pub fn containers(&self) -> Arc<ContainerService> {
        self.containers.clone()
    }

    pub async fn run(mut self) -> Result<()> {
        self.transition(ServicePhase::Connecting);
        let topics = TopicScheme::new(
            self.settings.discovery_prefix.clone(),
            self.settings.entity_prefix.clone(),
        );

        // A dead broker is fatal here; there is no retry policy at this layer.
        let session = MqttSession::connect(&self.settings.mqtt, topics.subscription()).await?;
        let client = session.client();

        let bridge = Arc::new(BrokerBridge::new(
            Arc::new(session.client()),
            topics,
            self.containers.clone(),
            self.known.clone(),
        ));

        // Inbound messages flow pump -> channel -> handler, independent of
        // the poll loop below.
        let (tx, mut rx) = mpsc::channel(64);
        let pump = session.spawn_pump(tx);
        let handler = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    bridge.handle_message(&message.topic, &message.payload).await;
                }
            })
        };

        self.transition(ServicePhase::Running);
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // A single failed poll must not terminate the service;
                    // the previous snapshot stays published.
                    if let Err(e) = self.poll_once(&bridge).await {
                        error!("poll cycle failed: {e:#}");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received");
                    break;
                }
            }
        }

        // Every drain step runs even if an earlier one failed.
        self.transition(ServicePhase::Draining);
        self.containers.close().await;
        if let Err(e) = client.disconnect().await {
            warn!("mqtt disconnect failed: {e}");
        }
        if tokio::time::timeout(DRAIN_TIMEOUT, pump).await.is_err() {
            warn!("message pump did not stop within {DRAIN_TIMEOUT:?}");
        }
        if tokio::time::timeout(DRAIN_TIMEOUT, handler).await.is_err() {
            warn!("command handler did not stop within {DRAIN_TIMEOUT:?}");
        }

        self.transition(ServicePhase::Stopped);
        Ok(())
    }

    /// One reconcile-and-publish cycle: fetch, diff against the last
    /// published generation, retract what disappeared, register what
    /// appeared, publish state for everything currently visible.
    ///
    /// The committed generation means "last published", so a failed
    /// publish must not be committed: the reconciler is repaired for that
    /// name and the next cycle retries the registration or retraction.
    /// Publish failures never abort the rest of the cycle.
    pub async fn poll_once(&self, bridge: &BrokerBridge) -> Result<()> {
        let current = self.containers.list_statuses().await?;
        let previous = self.known.read().unwrap().clone();
        let diff = self.reconciler.observe(&current);

        let running: Vec<&str> = current
            .iter()
            .filter(|(_, state)| state.is_running())
            .map(|(name, _)| name.as_str())
            .collect();
        info!("running: {}", running.join(","));

        for name in &diff.removed {
            if let Err(e) = bridge.retract_entity(name).await {
                error!("retraction for {name} failed, will retry next cycle: {e:#}");
                if let Some(state) = previous.get(name) {
                    self.reconciler.restore(name, state.clone());
                }
            }
        }

        let mut unregistered = Vec::new();
        for name in &diff.created {
            if let Err(e) = bridge.publish_entity(name).await {
                error!("discovery publish for {name} failed, will retry next cycle: {e:#}");
                self.reconciler.forget(name);
                unregistered.push(name.as_str());
            }
        }

        for (name, state) in &current {
            // No state publish for an entity whose registration is still
            // pending; it follows the retried registration next cycle.
            if unregistered.contains(&name.as_str()) {
                continue;
            }
            if let Err(e) = bridge.publish_state(name, state.switch_state()).await {
                error!("state publish for {name} failed: {e:#}");
            }
        }

        Ok(())
    }

    fn transition(&mut self, phase: ServicePhase) {
        info!("service {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}
