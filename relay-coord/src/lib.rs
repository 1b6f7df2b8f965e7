#![deny(missing_docs)]
//! In-process subagent coordinator for relay.
//!
//! [`Coordinator`] owns the set of registered agents, the bounded task
//! queue, and the event bus. It routes messages with per-message
//! timeouts, appends every request to the shared history *before*
//! delivery, drains the queue up to its concurrency bound, retries
//! failed tasks within their budget, and runs periodic health checks.
//! Agents never hold the coordinator — they get a sending capability
//! scoped to their own name, backed by a weak reference.

pub mod bus;
pub mod queue;

pub use bus::{event_handler_fn, EventBus, EventFuture, EventHandler};
pub use queue::{QueueStats, TaskQueue};

use async_trait::async_trait;
use relay0::agent::{Agent, AgentContext, AgentDescriptor, LifecycleState, MessageSender};
use relay0::config::CoreConfig;
use relay0::context::SharedContext;
use relay0::error::CoordError;
use relay0::id::{AgentId, MessageId, TaskId};
use relay0::message::{Message, MessageKind, OutboundMessage, DEFAULT_PRIORITY};
use relay0::task::{Task, TaskSpec};
use relay_context::ContextManager;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Sender name the coordinator stamps on task dispatch requests.
pub const COORDINATOR_NAME: &str = "coordinator";

/// How often terminal tasks are swept while the coordinator runs.
const CLEANUP_INTERVAL_MS: u64 = 5 * 60 * 1000;

/// How long terminal tasks are retained before a sweep removes them.
const TASK_RETENTION_MS: u64 = 60 * 60 * 1000;

/// Response-time samples kept for the running average.
const RESPONSE_SAMPLE_CAP: usize = 100;

/// A point-in-time view of the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorStats {
    /// Requests the coordinator attempted to deliver.
    pub messages_sent: u64,
    /// Replies received from agents.
    pub messages_received: u64,
    /// Deliveries that ended in a synthetic error (unknown recipient,
    /// timeout, handler failure, empty reply).
    pub messages_errored: u64,
    /// Task counts by status plus the concurrency bound.
    pub tasks: QueueStats,
    /// Mean reply latency over the in-memory sample, milliseconds.
    pub avg_response_ms: f64,
    /// Milliseconds since the coordinator was created.
    pub uptime_ms: u64,
}

struct AgentEntry {
    agent: Arc<dyn Agent>,
    state: LifecycleState,
}

#[derive(Default)]
struct Counters {
    sent: u64,
    received: u64,
    errored: u64,
    samples: VecDeque<u64>,
}

enum DeliverOutcome {
    Reply(Message),
    Empty,
    Failed { code: &'static str, message: String },
}

/// Router and scheduler: owns the agents, the task queue, and the
/// event bus.
///
/// Constructed as an `Arc` so agent contexts can hold weak sending
/// capabilities into it. Lifecycle: [`Coordinator::new`] →
/// [`Coordinator::start`] (periodic timers) → [`Coordinator::stop`]
/// (unregister agents, stop timers, drop subscribers, await in-flight
/// task executions).
pub struct Coordinator {
    config: CoreConfig,
    agents: tokio::sync::RwLock<std::collections::HashMap<String, AgentEntry>>,
    queue: TaskQueue,
    bus: Arc<EventBus>,
    context: Arc<ContextManager>,
    counters: Mutex<Counters>,
    seq: AtomicU64,
    started_at: std::time::Instant,
    started: AtomicBool,
    stopping: AtomicBool,
    timers: Mutex<Vec<tokio::task::JoinHandle<()>>>,
    executions: tokio::sync::Mutex<JoinSet<()>>,
}

impl Coordinator {
    /// Create a coordinator over the shared context manager.
    pub fn new(config: CoreConfig, context: Arc<ContextManager>) -> Arc<Self> {
        let max_concurrent = config.max_concurrent_tasks;
        Arc::new(Self {
            config,
            agents: tokio::sync::RwLock::new(std::collections::HashMap::new()),
            queue: TaskQueue::new(max_concurrent),
            bus: Arc::new(EventBus::new()),
            context,
            counters: Mutex::new(Counters::default()),
            seq: AtomicU64::new(0),
            started_at: std::time::Instant::now(),
            started: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            timers: Mutex::new(Vec::new()),
            executions: tokio::sync::Mutex::new(JoinSet::new()),
        })
    }

    /// The shared context manager.
    pub fn context(&self) -> &Arc<ContextManager> {
        &self.context
    }

    /// The event bus.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// A sending capability scoped to the given identity. Handed to
    /// the adapter layer so tools can dispatch to agents the same way
    /// agents message each other.
    pub fn sender_for(self: &Arc<Self>, identity: AgentId) -> Arc<dyn MessageSender> {
        Arc::new(ScopedSender {
            agent: identity,
            coord: Arc::downgrade(self),
        })
    }

    // ── agent lifecycle ────────────────────────────────────────────

    /// Register an agent under its own name.
    ///
    /// Builds the agent's context (scoped sender + shared context) and
    /// calls its `initialize`. On failure the agent is not installed
    /// and the error surfaces to the caller. On success the
    /// `agent.registered` event fires.
    pub async fn register_agent(self: &Arc<Self>, agent: Arc<dyn Agent>) -> Result<(), CoordError> {
        let name = agent.name().to_owned();
        {
            let mut agents = self.agents.write().await;
            if agents.contains_key(&name) {
                return Err(CoordError::AlreadyRegistered(name));
            }
            agents.insert(
                name.clone(),
                AgentEntry {
                    agent: agent.clone(),
                    state: LifecycleState::Registered,
                },
            );
        }

        let shared: Arc<dyn SharedContext> = self.context.clone();
        let ctx = AgentContext {
            agent: AgentId::new(&name),
            sender: self.sender_for(AgentId::new(&name)),
            context: shared,
        };

        match agent.initialize(ctx).await {
            Ok(()) => {
                if let Some(entry) = self.agents.write().await.get_mut(&name) {
                    entry.state = LifecycleState::Initialized;
                }
                debug!(agent = %name, "agent registered");
                self.bus
                    .emit("agent.registered", json!({"agent": name}))
                    .await;
                Ok(())
            }
            Err(e) => {
                self.agents.write().await.remove(&name);
                warn!(agent = %name, error = %e, "agent initialization failed");
                Err(CoordError::AgentError(e))
            }
        }
    }

    /// Remove an agent. Idempotent: unknown names are ignored. The
    /// agent's `shutdown` runs first; if it fails the removal still
    /// happens and the emitted reason becomes `"error"`.
    pub async fn unregister_agent(&self, name: &str, reason: Option<&str>) {
        let entry = {
            let mut agents = self.agents.write().await;
            if let Some(entry) = agents.get_mut(name) {
                entry.state = LifecycleState::ShuttingDown;
            }
            agents.remove(name)
        };
        let Some(entry) = entry else { return };

        let mut reason = reason.unwrap_or("requested").to_owned();
        if let Err(e) = entry.agent.shutdown().await {
            warn!(agent = %name, error = %e, "agent shutdown failed");
            reason = "error".to_owned();
        }
        debug!(agent = %name, reason = %reason, "agent unregistered");
        self.bus
            .emit(
                "agent.unregistered",
                json!({"agent": name, "reason": reason}),
            )
            .await;
    }

    /// Whether an agent is registered and initialized.
    pub async fn has_agent(&self, name: &str) -> bool {
        self.agents
            .read()
            .await
            .get(name)
            .is_some_and(|e| e.state == LifecycleState::Initialized)
    }

    /// Descriptors of every registered agent, sorted by name.
    pub async fn agents(&self) -> Vec<AgentDescriptor> {
        let agents = self.agents.read().await;
        let mut descriptors: Vec<AgentDescriptor> = agents
            .iter()
            .map(|(name, entry)| {
                AgentDescriptor::new(AgentId::new(name), entry.agent.capabilities().to_vec(), entry.state)
            })
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    // ── messaging ──────────────────────────────────────────────────

    /// Send a message on behalf of a sender and wait for the reply.
    ///
    /// The request is stamped (id, timestamp, default priority) and
    /// appended to history *before* delivery, so failed deliveries are
    /// still recorded. Unknown recipients, timeouts, handler failures
    /// and empty replies all come back as an error-kind message whose
    /// `correlation_id` is the request id.
    pub async fn send_message(
        self: &Arc<Self>,
        sender: AgentId,
        outbound: OutboundMessage,
    ) -> Message {
        let request = self.mint(sender, outbound);
        match self.deliver(&request).await {
            DeliverOutcome::Reply(reply) => reply,
            DeliverOutcome::Empty => synthetic_error(
                &request,
                "NO_RESPONSE",
                format!("agent {} returned no response", request.recipient),
            ),
            DeliverOutcome::Failed { code, message } => synthetic_error(&request, code, message),
        }
    }

    /// Deliver a draft to every initialized agent except the sender.
    /// Replies are collected in arrival order; agents that fail, time
    /// out, or stay silent contribute nothing.
    pub async fn broadcast_message(
        self: &Arc<Self>,
        sender: AgentId,
        outbound: OutboundMessage,
    ) -> Vec<Message> {
        let recipients: Vec<String> = {
            let agents = self.agents.read().await;
            agents
                .iter()
                .filter(|(name, entry)| {
                    entry.state == LifecycleState::Initialized && name.as_str() != sender.as_str()
                })
                .map(|(name, _)| name.clone())
                .collect()
        };

        let mut joins = JoinSet::new();
        for recipient in recipients {
            let mut draft = outbound.clone();
            draft.recipient = AgentId::new(recipient);
            let request = self.mint(sender.clone(), draft);
            let coord = Arc::clone(self);
            joins.spawn(async move {
                match coord.deliver(&request).await {
                    DeliverOutcome::Reply(reply) => Some(reply),
                    _ => None,
                }
            });
        }

        let mut replies = Vec::new();
        while let Some(result) = joins.join_next().await {
            if let Ok(Some(reply)) = result {
                replies.push(reply);
            }
        }
        replies
    }

    /// Stamp id, timestamp, and default priority onto a draft.
    fn mint(&self, sender: AgentId, outbound: OutboundMessage) -> Message {
        let id = MessageId::new(format!("m-{}", self.seq.fetch_add(1, Ordering::SeqCst)));
        let mut message = Message::request(id, sender, outbound.recipient, outbound.payload)
            .with_kind(outbound.kind)
            .with_priority(outbound.priority.unwrap_or(DEFAULT_PRIORITY));
        message.timeout = outbound.timeout;
        message
    }

    async fn deliver(self: &Arc<Self>, request: &Message) -> DeliverOutcome {
        self.context.add_to_history(request.clone()).await;
        {
            let mut counters = self.counters.lock().expect("counters poisoned");
            counters.sent += 1;
        }

        let agent = {
            let agents = self.agents.read().await;
            agents
                .get(request.recipient.as_str())
                .filter(|e| e.state == LifecycleState::Initialized)
                .map(|e| e.agent.clone())
        };
        let Some(agent) = agent else {
            self.count_error();
            return DeliverOutcome::Failed {
                code: "AGENT_NOT_FOUND",
                message: format!("agent not found: {}", request.recipient),
            };
        };

        let effective = request.timeout.unwrap_or(self.config.default_message_timeout);
        let started = std::time::Instant::now();

        // The handler runs in its own task: an expired wait abandons
        // the handle without cancelling the work, and the late reply
        // is discarded rather than appended to history.
        let handler_request = request.clone();
        let mut handle =
            tokio::spawn(async move { agent.handle_message(&handler_request).await });

        let joined = if effective.is_zero() {
            Ok((&mut handle).await)
        } else {
            tokio::time::timeout(effective.to_std(), &mut handle).await
        };

        match joined {
            Err(_elapsed) => {
                self.count_error();
                warn!(recipient = %request.recipient, %effective, "message delivery timed out");
                DeliverOutcome::Failed {
                    code: "TIMEOUT",
                    message: format!(
                        "delivery to {} timed out after {effective}",
                        request.recipient
                    ),
                }
            }
            Ok(Err(join_error)) => {
                self.count_error();
                warn!(recipient = %request.recipient, error = %join_error, "message handler aborted");
                DeliverOutcome::Failed {
                    code: "HANDLER_ERROR",
                    message: format!("handler aborted: {join_error}"),
                }
            }
            Ok(Ok(Err(agent_error))) => {
                self.count_error();
                DeliverOutcome::Failed {
                    code: "HANDLER_ERROR",
                    message: agent_error.to_string(),
                }
            }
            Ok(Ok(Ok(None))) => {
                self.count_error();
                DeliverOutcome::Empty
            }
            Ok(Ok(Ok(Some(reply)))) => {
                self.context.add_to_history(reply.clone()).await;
                let mut counters = self.counters.lock().expect("counters poisoned");
                counters.received += 1;
                if counters.samples.len() == RESPONSE_SAMPLE_CAP {
                    counters.samples.pop_front();
                }
                counters
                    .samples
                    .push_back(started.elapsed().as_millis() as u64);
                DeliverOutcome::Reply(reply)
            }
        }
    }

    fn count_error(&self) {
        self.counters.lock().expect("counters poisoned").errored += 1;
    }

    // ── tasks ──────────────────────────────────────────────────────

    /// Submit a task and return its id immediately. The queue drains
    /// in the background up to the concurrency bound; retries re-enter
    /// at the original priority without holding the caller.
    pub async fn submit_task(self: &Arc<Self>, spec: TaskSpec) -> Result<TaskId, CoordError> {
        let id = TaskId::new(format!("t-{}", self.seq.fetch_add(1, Ordering::SeqCst)));
        let task = Task::new(id.clone(), spec.task_type, spec.agent, spec.payload)
            .with_priority(spec.priority.unwrap_or(DEFAULT_PRIORITY))
            .with_max_retries(
                spec.max_retries
                    .unwrap_or(self.config.default_max_retries),
            );
        self.queue.enqueue(task)?;
        self.bus
            .emit("task.submitted", json!({"task": id.as_str()}))
            .await;
        self.drain().await;
        Ok(id)
    }

    /// A copy of one task's current state.
    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.queue.get(id)
    }

    /// Cancel a pending or running task.
    pub fn cancel_task(&self, id: &TaskId) -> Result<(), CoordError> {
        self.queue.cancel(id)
    }

    /// Dispatch pending tasks while capacity lasts. Each completion
    /// re-triggers the drain.
    fn drain<'a>(self: &'a Arc<Self>) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
        if self.stopping.load(Ordering::SeqCst) {
            return;
        }
        loop {
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }
            {
                // Reap finished executions so the set stays bounded.
                let mut executions = self.executions.lock().await;
                while executions.try_join_next().is_some() {}
            }
            if !self.queue.can_run_more() {
                break;
            }
            let Some(task) = self.queue.next_pending() else {
                break;
            };
            if self.queue.mark_running(&task.id).is_err() {
                continue;
            }
            let coord = Arc::clone(self);
            self.executions
                .lock()
                .await
                .spawn(async move { coord.execute_task(task).await });
        }
        })
    }

    async fn execute_task(self: &Arc<Self>, task: Task) {
        let mut payload = serde_json::Map::new();
        payload.insert("taskId".to_owned(), json!(task.id.as_str()));
        payload.insert("taskType".to_owned(), json!(task.task_type));
        match task.payload {
            serde_json::Value::Object(fields) => payload.extend(fields),
            serde_json::Value::Null => {}
            other => {
                payload.insert("payload".to_owned(), other);
            }
        }

        let outbound = OutboundMessage::request(
            task.agent.clone(),
            serde_json::Value::Object(payload),
        )
        .with_priority(task.priority);
        let reply = self
            .send_message(AgentId::new(COORDINATOR_NAME), outbound)
            .await;

        match reply.kind {
            MessageKind::Response => {
                if self.queue.mark_completed(&task.id, reply.payload).is_ok() {
                    self.bus
                        .emit("task.completed", json!({"task": task.id.as_str()}))
                        .await;
                }
            }
            _ => {
                let error = reply
                    .payload
                    .get("error")
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "task failed".to_owned());
                if self.queue.mark_failed(&task.id, error).is_ok() {
                    if self.queue.should_retry(&task.id) && self.queue.retry(&task.id).is_ok() {
                        debug!(task = %task.id, "task re-queued for retry");
                        self.bus
                            .emit("task.retried", json!({"task": task.id.as_str()}))
                            .await;
                    } else {
                        self.bus
                            .emit("task.failed", json!({"task": task.id.as_str()}))
                            .await;
                    }
                }
            }
        }

        self.drain().await;
    }

    // ── lifecycle ──────────────────────────────────────────────────

    /// Begin the periodic health-check and task-cleanup timers.
    /// Idempotent. A zero health-check interval disables that timer.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut timers = self.timers.lock().expect("timers poisoned");

        if !self.config.health_check_interval.is_zero() {
            let coord = Arc::downgrade(self);
            let period = self.config.health_check_interval.to_std();
            timers.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await; // the first tick is immediate
                loop {
                    ticker.tick().await;
                    let Some(coord) = coord.upgrade() else { break };
                    coord.run_health_checks().await;
                }
            }));
        }

        let coord = Arc::downgrade(self);
        timers.push(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_millis(CLEANUP_INTERVAL_MS));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(coord) = coord.upgrade() else { break };
                let removed = coord.queue.cleanup(TASK_RETENTION_MS);
                if removed > 0 {
                    debug!(removed, "cleaned up terminal tasks");
                }
            }
        }));
    }

    /// Probe every initialized agent once. Failures are logged, never
    /// fatal — an unhealthy agent stays registered.
    pub async fn run_health_checks(&self) {
        let agents: Vec<(String, Arc<dyn Agent>)> = {
            let agents = self.agents.read().await;
            agents
                .iter()
                .filter(|(_, e)| e.state == LifecycleState::Initialized)
                .map(|(name, e)| (name.clone(), e.agent.clone()))
                .collect()
        };
        for (name, agent) in agents {
            if agent.health_check().await {
                debug!(agent = %name, "health check ok");
            } else {
                warn!(agent = %name, "health check failed");
            }
        }
    }

    /// Stop the coordinator: unregister every agent, stop the timers,
    /// drop event subscribers, and await in-flight task executions.
    pub async fn stop(self: &Arc<Self>) {
        self.stopping.store(true, Ordering::SeqCst);

        let names: Vec<String> = self.agents.read().await.keys().cloned().collect();
        for name in names {
            self.unregister_agent(&name, Some("shutdown")).await;
        }

        for timer in self
            .timers
            .lock()
            .expect("timers poisoned")
            .drain(..)
        {
            timer.abort();
        }

        self.bus.remove_all().await;

        // Take the set so in-flight executions (whose drain re-trigger
        // may need the executions lock) can never deadlock the stop.
        let mut executions = std::mem::take(&mut *self.executions.lock().await);
        while executions.join_next().await.is_some() {}
        debug!("coordinator stopped");
    }

    // ── statistics ─────────────────────────────────────────────────

    /// Message counters, task counts, mean response time, and uptime.
    pub fn stats(&self) -> CoordinatorStats {
        let counters = self.counters.lock().expect("counters poisoned");
        let avg_response_ms = if counters.samples.is_empty() {
            0.0
        } else {
            counters.samples.iter().sum::<u64>() as f64 / counters.samples.len() as f64
        };
        CoordinatorStats {
            messages_sent: counters.sent,
            messages_received: counters.received,
            messages_errored: counters.errored,
            tasks: self.queue.stats(),
            avg_response_ms,
            uptime_ms: self.started_at.elapsed().as_millis() as u64,
        }
    }
}

fn synthetic_error(request: &Message, code: &str, message: String) -> Message {
    Message::error_to(
        request,
        json!({"error": {"code": code, "message": message}}),
    )
}

/// The sending capability handed to agents and the adapter layer:
/// fixes the sender identity and holds the coordinator weakly, so
/// dropping the coordinator breaks the cycle instead of leaking it.
struct ScopedSender {
    agent: AgentId,
    coord: Weak<Coordinator>,
}

#[async_trait]
impl MessageSender for ScopedSender {
    async fn send(&self, outbound: OutboundMessage) -> Message {
        match self.coord.upgrade() {
            Some(coord) => coord.send_message(self.agent.clone(), outbound).await,
            None => orphan_error(&self.agent, outbound),
        }
    }

    async fn broadcast(&self, outbound: OutboundMessage) -> Vec<Message> {
        match self.coord.upgrade() {
            Some(coord) => coord.broadcast_message(self.agent.clone(), outbound).await,
            None => vec![],
        }
    }
}

/// The error reply for a send after the coordinator is gone.
fn orphan_error(sender: &AgentId, outbound: OutboundMessage) -> Message {
    let request = Message::request(
        MessageId::new("m-orphaned"),
        sender.clone(),
        outbound.recipient,
        outbound.payload,
    );
    synthetic_error(
        &request,
        "AGENT_NOT_FOUND",
        "coordinator is no longer running".to_owned(),
    )
}
