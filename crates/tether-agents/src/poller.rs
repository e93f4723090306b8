//! Background-agent discovery and completion tracking
//!
//! Background agents give no "done" signal. The poller re-reads each running
//! agent's transcript on an interval and infers completion from silence: once
//! the line count has not grown for `stability_threshold` consecutive polls
//! (and the file has at least one line), the agent is marked completed.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tether_core::{Role, UiMessage, now_millis};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::events::PollerEvent;
use crate::source::TranscriptSource;
use crate::transcript::{Activity, count_lines, parse_transcript_at};

/// Default time between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Default number of consecutive idle polls that mean "finished"
pub const DEFAULT_STABILITY_THRESHOLD: u32 = 2;

/// Poller configuration
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub stability_threshold: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            stability_threshold: DEFAULT_STABILITY_THRESHOLD,
        }
    }
}

/// Lifecycle of a background agent; `Completed` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Running,
    Completed,
}

/// One asynchronously running sub-agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundAgent {
    pub agent_id: String,
    /// Correlates to the originating `tool_call` message
    pub tool_use_id: String,
    pub description: String,
    pub prompt: String,
    /// Append-only JSON-lines transcript
    pub output_file: String,
    pub launched_at: i64,
    pub status: AgentStatus,
    pub activity: Vec<Activity>,
    pub last_parsed_line_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl BackgroundAgent {
    /// Build an agent from a qualifying `tool_call` message
    pub fn from_message(message: &UiMessage) -> Option<Self> {
        if !message.is_background_agent_call() {
            return None;
        }
        let tool_use_id = message.tool_use_id()?.to_string();
        let result = message.tool_result.as_ref()?;
        let output_file = result.output_file.clone()?;
        Some(Self {
            agent_id: result
                .agent_id
                .clone()
                .unwrap_or_else(|| tool_use_id.clone()),
            description: message
                .tool_input_str("description")
                .unwrap_or_default()
                .to_string(),
            prompt: message
                .tool_input_str("prompt")
                .unwrap_or_default()
                .to_string(),
            tool_use_id,
            output_file,
            launched_at: message.timestamp,
            status: AgentStatus::Running,
            activity: Vec::new(),
            last_parsed_line_count: 0,
            result: None,
        })
    }

    pub fn is_running(&self) -> bool {
        self.status == AgentStatus::Running
    }
}

/// What a single read did to an agent
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Agent not running or nothing readable yet
    Ignored,
    /// New lines were parsed
    Grew { activities: Vec<Activity> },
    /// No growth; `idle_polls` consecutive idle polls so far
    Stable { idle_polls: u32 },
    /// The agent was just marked completed
    Completed,
}

/// Reconcile one transcript read against an agent.
///
/// `idle_polls` is the agent's consecutive no-growth counter. A poll that
/// sees growth never evaluates stability in the same cycle.
pub fn apply_poll(
    agent: &mut BackgroundAgent,
    idle_polls: &mut u32,
    content: &str,
    stability_threshold: u32,
    now: i64,
) -> PollOutcome {
    if !agent.is_running() || content.is_empty() {
        return PollOutcome::Ignored;
    }

    let total_lines = count_lines(content);
    if total_lines > agent.last_parsed_line_count {
        *idle_polls = 0;
        let parsed = parse_transcript_at(content, agent.last_parsed_line_count, now);
        agent.activity.extend(parsed.activities.iter().cloned());
        agent.last_parsed_line_count = total_lines;
        return PollOutcome::Grew {
            activities: parsed.activities,
        };
    }

    *idle_polls += 1;
    // An empty or not-yet-created transcript is never "done"
    if *idle_polls >= stability_threshold && total_lines > 0 {
        agent.result = parse_transcript_at(content, 0, now).last_assistant_text;
        agent.status = AgentStatus::Completed;
        return PollOutcome::Completed;
    }
    PollOutcome::Stable {
        idle_polls: *idle_polls,
    }
}

#[derive(Debug, Default)]
struct PollerState {
    agents: Vec<BackgroundAgent>,
    /// Tool-use ids already registered in this session
    registered: HashSet<String>,
    /// Consecutive idle polls per tool-use id
    idle_polls: HashMap<String, u32>,
    /// Tool-use ids with a transcript read outstanding
    in_flight: HashSet<String>,
    /// Bumped on reset so reads issued before it are discarded
    generation: u64,
}

/// A finished transcript read, tagged with the generation it was issued in
struct TranscriptRead {
    generation: u64,
    tool_use_id: String,
    result: tether_core::Result<String>,
}

struct PollTask {
    id: u64,
    cancel: CancellationToken,
    _handle: JoinHandle<()>,
}

struct PollerInner {
    config: PollerConfig,
    source: Arc<dyn TranscriptSource>,
    state: Mutex<PollerState>,
    task: Mutex<Option<PollTask>>,
    next_task_id: AtomicU64,
    event_tx: broadcast::Sender<PollerEvent>,
}

/// Tracks the background agents of the active session.
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct BackgroundAgentPoller {
    inner: Arc<PollerInner>,
}

impl BackgroundAgentPoller {
    /// Create a poller reading transcripts through `source`
    pub fn new(source: Arc<dyn TranscriptSource>, config: PollerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(PollerInner {
                config,
                source,
                state: Mutex::new(PollerState::default()),
                task: Mutex::new(None),
                next_task_id: AtomicU64::new(0),
                event_tx,
            }),
        }
    }

    /// Subscribe to poller events
    pub fn subscribe(&self) -> broadcast::Receiver<PollerEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn config(&self) -> &PollerConfig {
        &self.inner.config
    }

    /// Snapshot of all tracked agents, in discovery order
    pub fn agents(&self) -> Vec<BackgroundAgent> {
        self.inner.state.lock().agents.clone()
    }

    pub fn agent(&self, agent_id: &str) -> Option<BackgroundAgent> {
        self.inner
            .state
            .lock()
            .agents
            .iter()
            .find(|a| a.agent_id == agent_id)
            .cloned()
    }

    /// Whether any tracked agent is still running
    pub fn has_running(&self) -> bool {
        self.inner.state.lock().agents.iter().any(|a| a.is_running())
    }

    /// Whether a poll task is currently scheduled
    pub fn is_polling(&self) -> bool {
        self.inner.task.lock().is_some()
    }

    /// Register background agents found in `messages`.
    ///
    /// Safe to call on every message-list change: each tool-use id is
    /// registered at most once per session, even after dismissal. Starts the
    /// poll loop when there is something to poll and a Tokio runtime is
    /// available. Returns the ids of newly registered agents.
    pub fn discover(&self, messages: &[UiMessage]) -> Vec<String> {
        let mut registered = Vec::new();
        {
            let mut state = self.inner.state.lock();
            for message in messages.iter().filter(|m| m.role == Role::ToolCall) {
                let Some(agent) = BackgroundAgent::from_message(message) else {
                    continue;
                };
                if !state.registered.insert(agent.tool_use_id.clone()) {
                    continue;
                }
                tracing::debug!(
                    agent_id = %agent.agent_id,
                    output_file = %agent.output_file,
                    "registered background agent"
                );
                registered.push(agent.clone());
                state.agents.push(agent);
            }
        }

        for agent in &registered {
            self.emit(PollerEvent::Registered {
                agent: agent.clone(),
            });
        }
        if !registered.is_empty() {
            self.ensure_polling();
        }
        registered.into_iter().map(|a| a.agent_id).collect()
    }

    /// Remove an agent from the tracked list regardless of its status
    pub fn dismiss(&self, agent_id: &str) -> bool {
        let removed = {
            let mut state = self.inner.state.lock();
            let removed: Vec<String> = state
                .agents
                .iter()
                .filter(|a| a.agent_id == agent_id)
                .map(|a| a.tool_use_id.clone())
                .collect();
            state.agents.retain(|a| a.agent_id != agent_id);
            for tool_use_id in &removed {
                state.idle_polls.remove(tool_use_id);
                state.in_flight.remove(tool_use_id);
            }
            !removed.is_empty()
        };
        if removed {
            self.emit(PollerEvent::Dismissed {
                agent_id: agent_id.to_string(),
            });
        }
        removed
    }

    /// Drop all tracking state and cancel polling (session switch)
    pub fn reset(&self) {
        if let Some(task) = self.inner.task.lock().take() {
            task.cancel.cancel();
        }
        {
            let mut state = self.inner.state.lock();
            let generation = state.generation + 1;
            *state = PollerState {
                generation,
                ..Default::default()
            };
        }
        tracing::debug!("background agent tracking reset");
        self.emit(PollerEvent::Reset);
    }

    /// Run one poll cycle over every running agent.
    ///
    /// Reads are issued concurrently and each result is reconciled as soon as
    /// it arrives, against state read fresh at that moment. Agents whose
    /// previous read is still outstanding are skipped. Returns whether any
    /// agent is still running afterwards.
    pub async fn poll_once(&self) -> bool {
        let mut reads: FuturesUnordered<_> = self.start_reads().into_iter().collect();
        while let Some(read) = reads.next().await {
            self.finish_read(read);
        }
        self.has_running()
    }

    /// Issue one read per running agent that has none outstanding
    fn start_reads(&self) -> Vec<BoxFuture<'static, TranscriptRead>> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let generation = state.generation;
        let mut reads = Vec::new();
        for agent in state.agents.iter().filter(|a| a.is_running()) {
            if !state.in_flight.insert(agent.tool_use_id.clone()) {
                tracing::trace!(agent_id = %agent.agent_id, "previous transcript read still pending");
                continue;
            }
            let source = Arc::clone(&self.inner.source);
            let tool_use_id = agent.tool_use_id.clone();
            let output_file = agent.output_file.clone();
            reads.push(Box::pin(async move {
                let result = source.read(Path::new(&output_file)).await;
                TranscriptRead {
                    generation,
                    tool_use_id,
                    result,
                }
            }) as BoxFuture<'static, TranscriptRead>);
        }
        reads
    }

    fn finish_read(&self, read: TranscriptRead) {
        {
            let mut state = self.inner.state.lock();
            if state.generation != read.generation {
                return;
            }
            state.in_flight.remove(&read.tool_use_id);
        }
        let tool_use_id = read.tool_use_id;
        match read.result {
            Ok(content) => self.reconcile(read.generation, &tool_use_id, &content),
            Err(e) if e.is_transient() => {
                tracing::trace!(%tool_use_id, error = %e, "transcript not readable yet");
            }
            Err(e) => {
                tracing::debug!(%tool_use_id, error = %e, "transcript read failed");
            }
        }
    }

    fn reconcile(&self, generation: u64, tool_use_id: &str, content: &str) {
        let event = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if state.generation != generation {
                return;
            }
            let Some(agent) = state
                .agents
                .iter_mut()
                .find(|a| a.tool_use_id == tool_use_id)
            else {
                return;
            };
            let idle_polls = state.idle_polls.entry(tool_use_id.to_string()).or_default();
            match apply_poll(
                agent,
                idle_polls,
                content,
                self.inner.config.stability_threshold,
                now_millis(),
            ) {
                PollOutcome::Grew { activities } => {
                    tracing::debug!(
                        agent_id = %agent.agent_id,
                        lines = agent.last_parsed_line_count,
                        new_activities = activities.len(),
                        "background agent transcript grew"
                    );
                    (!activities.is_empty()).then(|| PollerEvent::Activity {
                        agent_id: agent.agent_id.clone(),
                        activities,
                    })
                }
                PollOutcome::Completed => {
                    tracing::debug!(agent_id = %agent.agent_id, "background agent completed");
                    Some(PollerEvent::Completed {
                        agent_id: agent.agent_id.clone(),
                        result: agent.result.clone(),
                    })
                }
                PollOutcome::Stable { idle_polls } => {
                    tracing::trace!(agent_id = %agent.agent_id, idle_polls, "no transcript growth");
                    None
                }
                PollOutcome::Ignored => None,
            }
        };
        if let Some(event) = event {
            self.emit(event);
        }
    }

    /// Start the poll loop unless one is already scheduled
    fn ensure_polling(&self) {
        let mut task = self.inner.task.lock();
        if task.is_some() || !self.has_running() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no async runtime, background agents must be polled manually");
            return;
        };
        let id = self.inner.next_task_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let handle = runtime.spawn(run_poll_loop(self.clone(), id, cancel.clone()));
        *task = Some(PollTask {
            id,
            cancel,
            _handle: handle,
        });
    }

    /// Called by the loop once nothing is running. Clears the task
    /// slot under its lock so a concurrent `discover` either sees the loop
    /// alive (and it re-checks here) or sees no loop and starts a new one.
    fn try_stop(&self, task_id: u64) -> bool {
        let mut task = self.inner.task.lock();
        if self.has_running() {
            return false;
        }
        if task.as_ref().is_some_and(|t| t.id == task_id) {
            *task = None;
        }
        true
    }

    fn emit(&self, event: PollerEvent) {
        let _ = self.inner.event_tx.send(event);
    }
}

async fn run_poll_loop(poller: BackgroundAgentPoller, task_id: u64, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(poller.inner.config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!(
        task_id,
        interval_ms = poller.inner.config.interval.as_millis() as u64,
        "poll loop started"
    );

    // Reads outlive the tick that issued them
    let mut reads: FuturesUnordered<BoxFuture<'static, TranscriptRead>> = FuturesUnordered::new();

    loop {
        // The first tick completes immediately
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => reads.extend(poller.start_reads()),
            Some(read) = reads.next(), if !reads.is_empty() => poller.finish_read(read),
        }

        if !poller.has_running() && poller.try_stop(task_id) {
            break;
        }
    }
    tracing::debug!("poll loop stopped");
}
