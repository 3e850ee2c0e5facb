use std::sync::Arc;
use std::time::Duration;

use codeswarm_store::{AgentStateStore, EventBus, EventStore};
use codeswarm_types::{SwarmEvent, Trigger};
use serde_json::json;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::Config;
use crate::Result;
use crate::executor::TurnExecutor;
use crate::gates::{CooldownGate, DepthTracker};

const DEPTH_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const DEPTH_ENTRY_TTL: Duration = Duration::from_secs(300);
const SUMMARY_LIMIT: usize = 200;

/// Bounded-concurrency consumer of the store's trigger queue.
///
/// For every trigger: the cooldown gate drops rapid-fire repeats per agent,
/// the depth gate caps cascades per (agent, correlation), and a semaphore
/// bounds simultaneous turns. The executor runs the turn itself; the runner
/// loads state before and persists it after, bracketing the turn with
/// lifecycle events on the bus.
pub struct AgentRunner {
    store: Arc<EventStore>,
    states: AgentStateStore,
    executor: Arc<dyn TurnExecutor>,
    bus: Option<EventBus>,
    swarm_id: String,
    cooldown: CooldownGate,
    depth: DepthTracker,
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl AgentRunner {
    pub fn new(
        store: Arc<EventStore>,
        states: AgentStateStore,
        executor: Arc<dyn TurnExecutor>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            states,
            executor,
            bus: None,
            swarm_id: config.swarm_id.clone(),
            cooldown: CooldownGate::new(config.trigger_cooldown()),
            depth: DepthTracker::new(config.max_trigger_depth),
            semaphore: Arc::new(Semaphore::new(config.max_concurrency)),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Attach a bus for lifecycle events (AgentStart / AgentComplete /
    /// AgentError).
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Clone of the shutdown token; cancelling it stops the main loop and
    /// drains in-flight turns. Cancelling twice is a no-op.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Main loop. Returns after the shutdown token fires (or the store is
    /// dropped), once all in-flight turns have finished.
    pub async fn run_forever(mut self) -> Result<()> {
        let mut triggers = self.store.take_triggers()?;
        info!(swarm_id = %self.swarm_id, "agent runner started");

        let sweeper_depth = self.depth.clone();
        let sweeper_token = self.shutdown.clone();
        self.tracker.spawn(async move {
            let mut tick = tokio::time::interval(DEPTH_SWEEP_INTERVAL);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = sweeper_token.cancelled() => break,
                    _ = tick.tick() => sweeper_depth.sweep_stale(DEPTH_ENTRY_TTL),
                }
            }
        });

        loop {
            let trigger = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                next = triggers.recv() => match next {
                    Some(trigger) => trigger,
                    // Store dropped; nothing more will arrive
                    None => break,
                },
            };

            let Trigger {
                agent_id,
                event_id,
                event,
            } = trigger;
            debug!(%agent_id, event_id, event_type = event.event_type(), "trigger received");

            if !self.cooldown.admit(&agent_id) {
                debug!(%agent_id, event_id, "trigger dropped by cooldown gate");
                continue;
            }

            let correlation_id = normalize_correlation_id(&event, event_id);
            if !self.depth.available(&agent_id, &correlation_id) {
                warn!(%agent_id, %correlation_id, "trigger dropped by depth gate");
                continue;
            }

            let context = self.turn_context();
            self.tracker
                .spawn(context.process(agent_id, event, correlation_id));
        }

        info!("agent runner stopping");
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        Ok(())
    }

    fn turn_context(&self) -> TurnContext {
        TurnContext {
            states: self.states.clone(),
            executor: Arc::clone(&self.executor),
            bus: self.bus.clone(),
            depth: self.depth.clone(),
            semaphore: Arc::clone(&self.semaphore),
            swarm_id: self.swarm_id.clone(),
        }
    }
}

/// Correlation key for cascade accounting: the event's own correlation id,
/// falling back to its row id.
fn normalize_correlation_id(event: &SwarmEvent, event_id: i64) -> String {
    if let Some(correlation_id) = &event.correlation_id {
        return correlation_id.clone();
    }
    if event_id > 0 {
        return event_id.to_string();
    }
    "base".to_string()
}

/// Everything one per-trigger task needs, detached from the runner so the
/// consume loop keeps going while turns run.
struct TurnContext {
    states: AgentStateStore,
    executor: Arc<dyn TurnExecutor>,
    bus: Option<EventBus>,
    depth: DepthTracker,
    semaphore: Arc<Semaphore>,
    swarm_id: String,
}

impl TurnContext {
    fn emit(&self, event: SwarmEvent) {
        if let Some(bus) = &self.bus {
            bus.emit(event.with_metadata(json!({ "graph_id": self.swarm_id })));
        }
    }

    async fn process(self, agent_id: String, event: SwarmEvent, correlation_id: String) {
        let _permit = match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        // Re-check under the lock: the map may have filled up while this
        // task waited for a permit. A breach here is noisy, unlike the
        // silent pre-spawn drop.
        let Some(_depth_guard) = self.depth.try_enter(&agent_id, &correlation_id) else {
            warn!(%agent_id, %correlation_id, "cascade depth limit reached mid-flight");
            self.emit(SwarmEvent::agent_error(
                &agent_id,
                format!("cascade depth limit reached for correlation {correlation_id}"),
            ));
            return;
        };

        let mut state = match self.states.load(&agent_id).await {
            Ok(Some(state)) => state,
            Ok(None) => {
                let path = self.states.state_path(&agent_id);
                error!(%agent_id, path = %path.display(), "agent state not found");
                self.emit(SwarmEvent::agent_error(
                    &agent_id,
                    format!("agent state not found at {}", path.display()),
                ));
                return;
            }
            Err(err) => {
                error!(%agent_id, error = %err, "failed to load agent state");
                self.emit(SwarmEvent::agent_error(&agent_id, err.to_string()));
                return;
            }
        };

        self.emit(SwarmEvent::agent_start(&agent_id, state.full_name.clone()));

        let outcome = self.executor.run_turn(&mut state, &event).await;

        // State is persisted on both paths, before the lifecycle event
        let persisted = self.states.save(state).await;
        if let Err(err) = &persisted {
            error!(%agent_id, error = %err, "failed to persist agent state");
        }

        match (outcome, persisted) {
            (Ok(outcome), Ok(_)) => {
                let summary: String = outcome.summary.chars().take(SUMMARY_LIMIT).collect();
                self.emit(SwarmEvent::agent_complete(&agent_id, summary));
            }
            (Ok(_), Err(err)) => {
                self.emit(SwarmEvent::agent_error(
                    &agent_id,
                    format!("failed to persist state: {err}"),
                ));
            }
            (Err(err), _) => {
                error!(%agent_id, error = ?err, "executor failed");
                self.emit(SwarmEvent::agent_error(&agent_id, format!("{err:#}")));
            }
        }
    }
}
