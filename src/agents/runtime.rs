//! Shared agent runtime: identity, thought log, tool registry and the
//! fallback reasoning loop
//!
//! Every specialist agent embeds an [`AgentContext`]. The context owns the
//! agent's memory and bounded thought ring, dispatches tool invocations,
//! and runs either a ReAct step through the wired LLM or the rule-based
//! fallback engine when no LLM is available.

use crate::bus::MessageBus;
use crate::errors::AgentError;
use crate::external::LlmService;
use crate::goals::GoalTracker;
use crate::memory::{AgentMemory, MemoryKind};
use crate::types::{now_ms, AgentKind, AgentStatusReport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Bounded ring of thoughts kept per agent
pub const MAX_THOUGHTS: usize = 1000;

/// Reasoning loop iteration cap
pub const DEFAULT_MAX_REASONING_STEPS: usize = 5;

/// Per-call LLM deadline before falling back to the rule engine
pub const DEFAULT_LLM_TIMEOUT_MS: u64 = 10_000;

/// Kind of a recorded thought
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThoughtKind {
    Observation,
    Reasoning,
    Action,
    Reflection,
}

/// Single entry of the agent's thought log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thought {
    pub timestamp_ms: i64,
    pub kind: ThoughtKind,
    pub content: String,
    pub confidence: Option<f64>,
}

/// Named capability an agent can invoke
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, input: serde_json::Value) -> anyhow::Result<serde_json::Value>;
}

/// Next step chosen by a reasoning engine
#[derive(Debug, Clone)]
pub struct ReasonedAction {
    pub tool: String,
    pub input: serde_json::Value,
    pub rationale: String,
    pub confidence: f64,
    /// Terminates the loop after this step
    pub is_final: bool,
}

/// Rule-based fallback engine used when no LLM is wired
pub trait Reasoner: Send + Sync {
    /// Pick the next tool given the objective and recent thought context.
    /// `None` means no decision; the loop ends.
    fn next_step(&self, objective: &str, recent: &[Thought]) -> Option<ReasonedAction>;
}

/// Counters exposed through `reasoner_stats()`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonerStats {
    /// Reasoning loops that reached a decision
    pub decisions: u64,
    /// Loops served by the rule-based fallback
    pub fallback_runs: u64,
    /// Total steps executed across all loops
    pub steps_total: u64,
    /// LLM calls that hit their deadline
    pub llm_timeouts: u64,
}

/// Per-agent runtime state embedded by each specialist agent
pub struct AgentContext {
    name: String,
    kind: AgentKind,
    bus: Arc<MessageBus>,
    goals: Arc<GoalTracker>,
    pub memory: AgentMemory,
    thoughts: VecDeque<Thought>,
    tools: HashMap<String, Arc<dyn Tool>>,
    running: Arc<AtomicBool>,
    llm: Option<Arc<dyn LlmService>>,
    reasoner: Option<Arc<dyn Reasoner>>,
    max_reasoning_steps: usize,
    llm_timeout_ms: u64,
    stats: ReasonerStats,
}

impl AgentContext {
    pub fn new(
        name: impl Into<String>,
        kind: AgentKind,
        bus: Arc<MessageBus>,
        goals: Arc<GoalTracker>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            bus,
            goals,
            memory: AgentMemory::new(),
            thoughts: VecDeque::with_capacity(64),
            tools: HashMap::new(),
            running: Arc::new(AtomicBool::new(true)),
            llm: None,
            reasoner: None,
            max_reasoning_steps: DEFAULT_MAX_REASONING_STEPS,
            llm_timeout_ms: DEFAULT_LLM_TIMEOUT_MS,
            stats: ReasonerStats::default(),
        }
    }

    pub fn with_llm(mut self, llm: Option<Arc<dyn LlmService>>) -> Self {
        self.llm = llm;
        self
    }

    pub fn with_reasoner(mut self, reasoner: Arc<dyn Reasoner>) -> Self {
        self.reasoner = Some(reasoner);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn goals(&self) -> &Arc<GoalTracker> {
        &self.goals
    }

    /// Shared running flag, checked each loop iteration and by the
    /// coordinator's health monitor
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Cooperative stop: the main loop exits at its next check
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Record a thought, trim the ring, and mirror observations and
    /// reflections into long-term memory
    pub fn think(&mut self, kind: ThoughtKind, content: impl Into<String>, confidence: Option<f64>) {
        let content = content.into();
        debug!(agent = %self.name, ?kind, "{content}");

        if matches!(kind, ThoughtKind::Observation | ThoughtKind::Reflection) {
            self.memory.remember_short(
                MemoryKind::Observation,
                serde_json::json!({ "thought": content }),
            );
        }

        if self.thoughts.len() >= MAX_THOUGHTS {
            self.thoughts.pop_front();
        }
        self.thoughts.push_back(Thought {
            timestamp_ms: now_ms(),
            kind,
            content,
            confidence,
        });
    }

    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Invoke a registered tool. Tool failures become reflection thoughts
    /// and are re-raised to the caller.
    pub async fn execute_action(
        &mut self,
        tool_name: &str,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, AgentError> {
        let tool = self
            .tools
            .get(tool_name)
            .cloned()
            .ok_or_else(|| AgentError::ToolNotFound(tool_name.to_string()))?;

        self.think(
            ThoughtKind::Action,
            format!("executing tool '{tool_name}'"),
            None,
        );

        match tool.execute(input).await {
            Ok(output) => Ok(output),
            Err(source) => {
                self.think(
                    ThoughtKind::Reflection,
                    format!("tool '{tool_name}' failed: {source}"),
                    None,
                );
                Err(AgentError::ToolFailed {
                    tool: tool_name.to_string(),
                    source,
                })
            }
        }
    }

    /// Run the reasoning loop on an objective.
    ///
    /// With an available LLM each iteration is one ReAct step (with a
    /// deadline; timeout falls back to the rule engine for that step).
    /// Without one, the rule-based engine drives the whole loop. Ends on
    /// a final step, a no-decision, or step exhaustion. Returns the last
    /// tool output.
    pub async fn reason(&mut self, objective: &str) -> Option<serde_json::Value> {
        let mut last_output = None;
        let mut used_fallback = false;

        for _step in 0..self.max_reasoning_steps {
            let action = match self.next_action(objective).await {
                NextAction::Step(action) => action,
                NextAction::FellBack(action) => {
                    used_fallback = true;
                    match action {
                        Some(action) => action,
                        None => break,
                    }
                }
                NextAction::Done => break,
            };

            self.stats.steps_total += 1;
            self.think(
                ThoughtKind::Reasoning,
                action.rationale.clone(),
                Some(action.confidence),
            );

            match self.execute_action(&action.tool, action.input.clone()).await {
                Ok(output) => {
                    last_output = Some(output);
                    if action.is_final {
                        break;
                    }
                }
                // Failure was logged as a reflection; try the next step
                Err(_) => continue,
            }
        }

        if used_fallback {
            self.stats.fallback_runs += 1;
        }
        if last_output.is_some() {
            self.stats.decisions += 1;
        }
        last_output
    }

    async fn next_action(&mut self, objective: &str) -> NextAction {
        let recent: Vec<Thought> = self.thoughts.iter().rev().take(5).rev().cloned().collect();

        if let Some(llm) = self.llm.clone() {
            if llm.is_available() {
                let prompt = build_prompt(objective, &recent);
                let tools = self.tool_names();
                let deadline = Duration::from_millis(self.llm_timeout_ms);
                match tokio::time::timeout(deadline, llm.reason(&prompt, &tools)).await {
                    Ok(Ok(step)) => {
                        return match step.action {
                            Some(llm_action) => NextAction::Step(ReasonedAction {
                                tool: llm_action.tool,
                                input: llm_action.input,
                                rationale: step.thought,
                                confidence: step.confidence,
                                is_final: false,
                            }),
                            None => {
                                self.think(ThoughtKind::Reasoning, step.thought, Some(step.confidence));
                                NextAction::Done
                            }
                        };
                    }
                    Ok(Err(e)) => {
                        self.think(
                            ThoughtKind::Reflection,
                            format!("llm reasoning failed, using rule engine: {e}"),
                            None,
                        );
                    }
                    Err(_) => {
                        self.stats.llm_timeouts += 1;
                        self.think(
                            ThoughtKind::Reflection,
                            format!(
                                "llm reasoning timed out after {}ms, using rule engine",
                                self.llm_timeout_ms
                            ),
                            None,
                        );
                    }
                }
                let fallback = self
                    .reasoner
                    .as_ref()
                    .and_then(|r| r.next_step(objective, &recent));
                return NextAction::FellBack(fallback);
            }
        }

        match self
            .reasoner
            .as_ref()
            .and_then(|r| r.next_step(objective, &recent))
        {
            Some(action) => NextAction::FellBack(Some(action)),
            None => NextAction::FellBack(None),
        }
    }

    /// Most recent thoughts, oldest first, up to `limit`
    pub fn thoughts(&self, limit: usize) -> Vec<Thought> {
        let skip = self.thoughts.len().saturating_sub(limit);
        self.thoughts.iter().skip(skip).cloned().collect()
    }

    pub fn thought_count(&self) -> usize {
        self.thoughts.len()
    }

    pub fn reasoner_stats(&self) -> ReasonerStats {
        self.stats
    }

    /// Build the status snapshot published on `agent.<name>.status.response`
    pub fn status(&self, detail: serde_json::Value) -> AgentStatusReport {
        AgentStatusReport {
            name: self.name.clone(),
            kind: self.kind,
            running: self.is_running(),
            thought_count: self.thoughts.len(),
            detail,
        }
    }
}

enum NextAction {
    Step(ReasonedAction),
    FellBack(Option<ReasonedAction>),
    Done,
}

fn build_prompt(objective: &str, recent: &[Thought]) -> String {
    let mut prompt = String::with_capacity(256);
    prompt.push_str("Objective: ");
    prompt.push_str(objective);
    if !recent.is_empty() {
        prompt.push_str("\nRecent thoughts:\n");
        for thought in recent {
            prompt.push_str("- ");
            prompt.push_str(&thought.content);
            prompt.push('\n');
        }
    }
    prompt
}

/// Uniform surface every specialist agent exposes
pub trait Agent {
    fn name(&self) -> &str;
    fn kind(&self) -> AgentKind;
    fn status(&self) -> AgentStatusReport;
    fn stop(&self);
}

/// Handle the coordinator keeps per spawned agent task
pub struct AgentHandle {
    pub name: String,
    pub kind: AgentKind,
    pub running: Arc<AtomicBool>,
    pub join: JoinHandle<()>,
}

impl AgentHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Flip the running flag; the agent loop notices on its next iteration
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// Catch loop-boundary panics: a fatal agent error flips the running flag
/// so the health monitor can report it, without tearing the process down.
pub async fn run_guarded<F>(name: String, running: Arc<AtomicBool>, fut: F)
where
    F: std::future::Future<Output = ()>,
{
    fut.await;
    if running.load(Ordering::Relaxed) {
        warn!(agent = %name, "agent loop exited unexpectedly");
        running.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::GoalTracker;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        async fn execute(&self, input: serde_json::Value) -> anyhow::Result<serde_json::Value> {
            Ok(input)
        }
    }

    struct FailTool;

    #[async_trait]
    impl Tool for FailTool {
        fn name(&self) -> &str {
            "fail"
        }

        async fn execute(&self, _input: serde_json::Value) -> anyhow::Result<serde_json::Value> {
            anyhow::bail!("deliberate failure")
        }
    }

    /// Scripted reasoner: emits `echo` steps, final on the given step
    struct ScriptedReasoner {
        final_on: usize,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl Reasoner for ScriptedReasoner {
        fn next_step(&self, _objective: &str, _recent: &[Thought]) -> Option<ReasonedAction> {
            let call = self.calls.fetch_add(1, Ordering::Relaxed);
            Some(ReasonedAction {
                tool: "echo".to_string(),
                input: serde_json::json!({ "step": call }),
                rationale: format!("step {call}"),
                confidence: 0.6,
                is_final: call >= self.final_on,
            })
        }
    }

    fn context() -> AgentContext {
        AgentContext::new(
            "test-agent",
            AgentKind::Scout,
            Arc::new(MessageBus::new()),
            Arc::new(GoalTracker::new()),
        )
    }

    #[test]
    fn test_thought_ring_is_bounded() {
        let mut ctx = context();
        for n in 0..(MAX_THOUGHTS + 10) {
            ctx.think(ThoughtKind::Observation, format!("t{n}"), None);
        }
        assert_eq!(ctx.thought_count(), MAX_THOUGHTS);
        let recent = ctx.thoughts(1);
        assert_eq!(recent[0].content, format!("t{}", MAX_THOUGHTS + 9));
    }

    #[tokio::test]
    async fn test_unknown_tool_fails() {
        let mut ctx = context();
        let result = ctx.execute_action("missing", serde_json::json!({})).await;
        assert!(matches!(result, Err(AgentError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn test_tool_error_records_reflection_and_reraises() {
        let mut ctx = context();
        ctx.register_tool(Arc::new(FailTool));

        let result = ctx.execute_action("fail", serde_json::json!({})).await;
        assert!(matches!(result, Err(AgentError::ToolFailed { .. })));

        let reflections: Vec<_> = ctx
            .thoughts(10)
            .into_iter()
            .filter(|t| t.kind == ThoughtKind::Reflection)
            .collect();
        assert_eq!(reflections.len(), 1);
        assert!(reflections[0].content.contains("deliberate failure"));
    }

    #[tokio::test]
    async fn test_rule_loop_stops_on_final_step() {
        let mut ctx = context().with_reasoner(Arc::new(ScriptedReasoner {
            final_on: 2,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }));
        ctx.register_tool(Arc::new(EchoTool));

        let output = ctx.reason("scan the launch").await;
        assert_eq!(output, Some(serde_json::json!({ "step": 2 })));

        let stats = ctx.reasoner_stats();
        assert_eq!(stats.decisions, 1);
        assert_eq!(stats.fallback_runs, 1);
        assert_eq!(stats.steps_total, 3);
        assert_eq!(stats.llm_timeouts, 0);
    }

    #[tokio::test]
    async fn test_rule_loop_exhausts_at_cap() {
        let mut ctx = context().with_reasoner(Arc::new(ScriptedReasoner {
            final_on: usize::MAX,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }));
        ctx.register_tool(Arc::new(EchoTool));

        ctx.reason("never decides").await;
        assert_eq!(
            ctx.reasoner_stats().steps_total,
            DEFAULT_MAX_REASONING_STEPS as u64
        );
    }

    #[tokio::test]
    async fn test_reason_without_engine_is_a_noop() {
        let mut ctx = context();
        assert!(ctx.reason("nothing to do").await.is_none());
        assert_eq!(ctx.reasoner_stats().decisions, 0);
    }

    #[test]
    fn test_stop_flips_running() {
        let ctx = context();
        let flag = ctx.running_flag();
        assert!(ctx.is_running());
        ctx.stop();
        assert!(!ctx.is_running());
        assert!(!flag.load(Ordering::Relaxed));
    }

    #[test]
    fn test_status_snapshot() {
        let mut ctx = context();
        ctx.think(ThoughtKind::Observation, "hello", None);
        let status = ctx.status(serde_json::json!({ "scans": 3 }));
        assert_eq!(status.name, "test-agent");
        assert_eq!(status.kind, AgentKind::Scout);
        assert!(status.running);
        assert_eq!(status.thought_count, 1);
        assert_eq!(status.detail["scans"], 3);
    }
}
