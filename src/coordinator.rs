//! Coordinator: constructs the component graph, wires system-wide
//! subscriptions, and drives the periodic housekeeping tasks
//!
//! The coordinator exclusively owns the bus, the goal tracker and every
//! agent instance. Timers (health monitor, outcome checker) are
//! independent cooperative tasks cancelled on `stop()`; learning state is
//! flushed to the store on shutdown.

use crate::agents::analyst::AnalystAgent;
use crate::agents::hunter::HunterAgent;
use crate::agents::runtime::{run_guarded, AgentHandle};
use crate::agents::scout::{ScoutAgent, ScoutConfig};
use crate::agents::trader::{PositionClosedFn, PositionOpenedFn, TraderAgent, TraderConfig};
use crate::bus::{topics, MessageBus, Payload};
use crate::config::AppConfig;
use crate::debate::DebateProtocol;
use crate::external::dashboard::{DashboardConfig, DashboardEvent, DashboardSink};
use crate::external::store::PositionStore;
use crate::external::{ChainClient, LlmService, MarketOracle, PriceStream};
use crate::goals::{Direction, Goal, GoalTracker, GoalType};
use crate::metrics::metrics;
use crate::types::{
    now_ms, AgentKind, DebateDecision, DebateResult, FeatureVector, InvestigationRequest,
    Prediction, Priority, Proposal, TradeSide, UserAlert, UserAlertLevel, WalletCheckResult,
};
use solana_sdk::pubkey::Pubkey;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Bus identity of the coordinator
pub const COORDINATOR_NAME: &str = "coordinator";

const HEALTH_FIRST_DELAY: Duration = Duration::from_secs(30);
const HEALTH_INTERVAL: Duration = Duration::from_secs(60);
const OUTCOME_FIRST_DELAY: Duration = Duration::from_secs(5 * 60);
const OUTCOME_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Predictions are outcome-checked once this old
const OUTCOME_MIN_AGE_MS: i64 = 24 * 60 * 60 * 1000;
const ORACLE_CALL_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_WALLET_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
/// Grace period for agent tasks to notice the stop flag
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Owns and wires the whole agent system
pub struct Coordinator {
    config: AppConfig,
    bus: Arc<MessageBus>,
    goals: Arc<GoalTracker>,
    chain: Arc<dyn ChainClient>,
    store: Option<Arc<dyn PositionStore>>,
    llm: Option<Arc<dyn LlmService>>,
    oracle: Option<Arc<dyn MarketOracle>>,
    price_stream: Option<Arc<dyn PriceStream>>,
    dashboard: Option<Arc<DashboardSink>>,
    debate: Option<Arc<TokioMutex<DebateProtocol>>>,
    agents: Vec<AgentHandle>,
    tasks: Vec<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    scout_names: Vec<String>,
    analyst_names: Vec<String>,
    hunter_names: Vec<String>,
    trader_names: Vec<String>,
    next_analyst: AtomicUsize,
    next_hunter: AtomicUsize,
    wallet_check_timeout: Duration,
}

impl Coordinator {
    pub fn new(config: AppConfig, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            config,
            bus: Arc::new(MessageBus::new()),
            goals: Arc::new(GoalTracker::new()),
            chain,
            store: None,
            llm: None,
            oracle: None,
            price_stream: None,
            dashboard: None,
            debate: None,
            agents: Vec::new(),
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(false)),
            scout_names: Vec::new(),
            analyst_names: Vec::new(),
            hunter_names: Vec::new(),
            trader_names: Vec::new(),
            next_analyst: AtomicUsize::new(0),
            next_hunter: AtomicUsize::new(0),
            wallet_check_timeout: DEFAULT_WALLET_CHECK_TIMEOUT,
        }
    }

    pub fn with_store(mut self, store: Option<Arc<dyn PositionStore>>) -> Self {
        self.store = store;
        self
    }

    pub fn with_llm(mut self, llm: Option<Arc<dyn LlmService>>) -> Self {
        self.llm = llm;
        self
    }

    pub fn with_oracle(mut self, oracle: Option<Arc<dyn MarketOracle>>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_price_stream(mut self, price_stream: Option<Arc<dyn PriceStream>>) -> Self {
        self.price_stream = price_stream;
        self
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn goals(&self) -> &Arc<GoalTracker> {
        &self.goals
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Agents that currently report running
    pub fn running_agent_count(&self) -> usize {
        self.agents.iter().filter(|a| a.is_running()).count()
    }

    /// Build pools, wire sinks, spawn agents and timers
    pub async fn start(&mut self) -> anyhow::Result<()> {
        self.config.validate()?;
        let llm_available = self.llm.as_ref().map(|l| l.is_available()).unwrap_or(false);
        info!(
            scouts = self.config.pools.scouts,
            analysts = self.config.pools.analysts,
            hunters = self.config.pools.hunters,
            traders = self.config.pools.traders,
            llm_available,
            "coordinator starting"
        );

        if self.config.workers.enable_sync {
            if let Some(url) = &self.config.workers.url {
                self.dashboard = Some(DashboardSink::spawn(DashboardConfig {
                    url: url.clone(),
                    api_secret: self.config.workers.api_secret.clone(),
                    batch_size: self.config.workers.batch_size,
                    flush_interval: Duration::from_secs(self.config.workers.flush_interval_secs),
                }));
            } else {
                warn!("workers sync enabled without a url, dashboard disabled");
            }
        }

        let mut debate =
            DebateProtocol::new(Arc::clone(&self.bus), self.llm.clone(), self.config.trading.max_position_size_sol);
        if let Some(store) = &self.store {
            match store.load_learning_state() {
                Ok(Some(weights)) => debate.load_weights(&weights),
                Ok(None) => {}
                Err(e) => warn!("learning state restore failed: {e}"),
            }
        }
        let debate = Arc::new(TokioMutex::new(debate));
        self.debate = Some(Arc::clone(&debate));

        self.scout_names = pool_names("scout", self.config.pools.scouts);
        self.analyst_names = pool_names("analyst", self.config.pools.analysts);
        self.hunter_names = pool_names("hunter", self.config.pools.hunters);
        self.trader_names = pool_names("trader", self.config.pools.traders);

        self.register_goals();
        self.spawn_agents();

        // System-wide subscriptions feed the dispatcher
        let (_, coordinator_rx) = self.bus.subscribe("agent.coordinator.*");
        let (_, debate_rx) = self.bus.subscribe(topics::DEBATE_REQUEST);
        let (_, alert_rx) = self.bus.subscribe("alert.*");
        let dispatcher = DispatcherContext {
            bus: Arc::clone(&self.bus),
            store: self.store.clone(),
            dashboard: self.dashboard.clone(),
            debate: Arc::clone(&debate),
            running: Arc::clone(&self.running),
            participants: self.debate_participants(),
            llm_available,
        };
        self.tasks.push(tokio::spawn(run_dispatcher(
            dispatcher,
            coordinator_rx,
            debate_rx,
            alert_rx,
        )));

        let health_watch: Vec<(String, Arc<AtomicBool>)> = self
            .agents
            .iter()
            .map(|a| (a.name.clone(), Arc::clone(&a.running)))
            .collect();
        self.tasks.push(tokio::spawn(run_health_monitor(
            Arc::clone(&self.running),
            health_watch,
            Arc::clone(&self.bus),
        )));

        if let (Some(store), Some(oracle)) = (self.store.clone(), self.oracle.clone()) {
            self.tasks.push(tokio::spawn(run_outcome_checker(
                Arc::clone(&self.running),
                store,
                oracle,
                Arc::clone(&debate),
            )));
        }

        self.running.store(true, Ordering::SeqCst);
        self.bus.publish_simple(
            topics::SYSTEM_STARTED,
            Payload::Opaque(serde_json::json!({ "agents": self.agents.len() })),
            COORDINATOR_NAME,
        );
        info!(agents = self.agents.len(), "system started");
        Ok(())
    }

    fn register_goals(&self) {
        for name in &self.scout_names {
            self.goals.register(
                name,
                Goal {
                    id: "flag_rate".to_string(),
                    goal_type: GoalType::Constraint,
                    metric: "flagged / scanned".to_string(),
                    target: 0.2,
                    current: 0.0,
                    weight: 1.0,
                    direction: Direction::Target,
                },
            );
        }
        for name in &self.trader_names {
            self.goals.register(
                name,
                Goal {
                    id: "win_rate".to_string(),
                    goal_type: GoalType::Primary,
                    metric: "winning trades / closed trades".to_string(),
                    target: 0.6,
                    current: 0.0,
                    weight: 2.0,
                    direction: Direction::Maximize,
                },
            );
        }
    }

    fn spawn_agents(&mut self) {
        for name in self.scout_names.clone() {
            let scout = ScoutAgent::new(
                &name,
                Arc::clone(&self.bus),
                Arc::clone(&self.goals),
                self.llm.clone(),
                self.analyst_names.clone(),
                ScoutConfig::default(),
            );
            let running = scout.running_flag();
            let join = tokio::spawn(run_guarded(
                name.clone(),
                Arc::clone(&running),
                scout.run(),
            ));
            self.agents.push(AgentHandle {
                name,
                kind: AgentKind::Scout,
                running,
                join,
            });
        }

        for name in self.analyst_names.clone() {
            let analyst = AnalystAgent::new(
                &name,
                Arc::clone(&self.bus),
                Arc::clone(&self.goals),
                self.llm.clone(),
                Arc::clone(&self.chain),
                self.hunter_names.clone(),
                self.trader_names.clone(),
                COORDINATOR_NAME.to_string(),
            );
            let running = analyst.running_flag();
            let join = tokio::spawn(run_guarded(
                name.clone(),
                Arc::clone(&running),
                analyst.run(),
            ));
            self.agents.push(AgentHandle {
                name,
                kind: AgentKind::Analyst,
                running,
                join,
            });
        }

        for name in self.hunter_names.clone() {
            let hunter = HunterAgent::new(
                &name,
                Arc::clone(&self.bus),
                Arc::clone(&self.goals),
                self.llm.clone(),
                self.store.clone(),
            );
            let running = hunter.running_flag();
            let join = tokio::spawn(run_guarded(
                name.clone(),
                Arc::clone(&running),
                hunter.run(),
            ));
            self.agents.push(AgentHandle {
                name,
                kind: AgentKind::Hunter,
                running,
                join,
            });
        }

        let on_opened: Option<PositionOpenedFn> = self.price_stream.clone().map(|stream| {
            Arc::new(move |pool: Pubkey, token: Pubkey| stream.watch(pool, token))
                as PositionOpenedFn
        });
        let on_closed: Option<PositionClosedFn> = self.price_stream.clone().map(|stream| {
            Arc::new(move |pool: Pubkey| stream.unwatch(&pool)) as PositionClosedFn
        });

        for name in self.trader_names.clone() {
            let trader = TraderAgent::new(
                &name,
                Arc::clone(&self.bus),
                Arc::clone(&self.goals),
                self.llm.clone(),
                Arc::clone(&self.chain),
                self.store.clone(),
                COORDINATOR_NAME.to_string(),
                TraderConfig {
                    trading_enabled: self.config.trading.enable_trading,
                    max_daily_trades: self.config.trading.max_daily_trades,
                    max_position_size_sol: self.config.trading.max_position_size_sol,
                    slippage_bps: self.config.trading.slippage_bps,
                    poll_interval: Duration::from_secs(30),
                    initial_balance_sol: self.config.trading.initial_balance_sol,
                },
            )
            .with_callbacks(on_opened.clone(), on_closed.clone())
            .with_strategies(self.config.strategy_book());
            let running = trader.running_flag();
            let join = tokio::spawn(run_guarded(
                name.clone(),
                Arc::clone(&running),
                trader.run(),
            ));
            self.agents.push(AgentHandle {
                name,
                kind: AgentKind::Trader,
                running,
                join,
            });
        }
    }

    fn debate_participants(&self) -> Vec<String> {
        self.analyst_names
            .iter()
            .chain(self.hunter_names.iter())
            .chain(self.trader_names.iter())
            .cloned()
            .collect()
    }

    /// Stop all agents and timers, flush learning state
    pub async fn stop(&mut self) {
        info!("coordinator stopping");
        self.bus.publish_simple(
            topics::SYSTEM_STOPPING,
            Payload::Opaque(serde_json::json!({})),
            COORDINATOR_NAME,
        );

        for handle in &self.agents {
            self.bus.send_to(
                &handle.name,
                "stop",
                Payload::Control(crate::bus::ControlCommand::Stop),
                COORDINATOR_NAME,
            );
            handle.request_stop();
        }

        if let (Some(store), Some(debate)) = (&self.store, &self.debate) {
            let weights = debate.lock().await.success_weights();
            if let Err(e) = store.save_learning_state(&weights) {
                warn!("learning state flush failed: {e}");
            }
        }

        self.running.store(false, Ordering::SeqCst);
        for task in self.tasks.drain(..) {
            task.abort();
        }

        for mut handle in self.agents.drain(..) {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle.join)
                .await
                .is_err()
            {
                warn!(agent = %handle.name, "agent did not stop in time, aborting");
                handle.join.abort();
            }
        }

        if let Some(dashboard) = &self.dashboard {
            dashboard.shutdown().await;
        }
        info!("coordinator stopped");
    }

    /// Manually queue a token for investigation
    pub fn analyze_token(&self, token: Pubkey, priority: Priority) {
        if self.analyst_names.is_empty() {
            warn!("analyze_token before start, no analysts available");
            return;
        }
        let idx = self.next_analyst.fetch_add(1, Ordering::Relaxed) % self.analyst_names.len();
        // Manual requests start unbiased; the evidence sets the score
        let request = InvestigationRequest {
            token,
            creator: None,
            pool_address: None,
            score: 0.0,
            flags: Vec::new(),
            features: FeatureVector::zeroed(),
            similar_tokens: Vec::new(),
            priority,
            source: "manual".to_string(),
            timestamp_ms: now_ms(),
        };
        self.bus.send_to(
            &self.analyst_names[idx],
            "investigate",
            Payload::Investigate(request),
            COORDINATOR_NAME,
        );
    }

    /// Request-response wallet check against a hunter. Returns the
    /// zeroed default when no reply lands inside the timeout.
    pub async fn check_wallet(&self, wallet: Pubkey) -> WalletCheckResult {
        if self.hunter_names.is_empty() {
            return WalletCheckResult::unknown(wallet);
        }

        let request_id = Uuid::new_v4();
        let (sub_id, mut rx) = self.bus.subscribe("agent.coordinator.wallet_check_result");

        let idx = self.next_hunter.fetch_add(1, Ordering::Relaxed) % self.hunter_names.len();
        self.bus.send_to(
            &self.hunter_names[idx],
            "check_wallet",
            Payload::WalletCheck {
                wallet,
                reply_to: COORDINATOR_NAME.to_string(),
                request_id,
            },
            COORDINATOR_NAME,
        );

        let deadline = tokio::time::Instant::now() + self.wallet_check_timeout;
        let result = loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break WalletCheckResult::unknown(wallet);
            }
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some(msg)) => {
                    if let Payload::WalletCheckReply {
                        request_id: id,
                        result,
                    } = &msg.payload
                    {
                        if *id == request_id {
                            break result.clone();
                        }
                    }
                }
                _ => break WalletCheckResult::unknown(wallet),
            }
        };

        self.bus.unsubscribe(sub_id);
        result
    }

    /// Run (or auto-approve) a debate over a proposal
    pub async fn trigger_debate(&self, proposal: Proposal) -> DebateResult {
        let llm_available = self.llm.as_ref().map(|l| l.is_available()).unwrap_or(false);
        if llm_available {
            if let Some(debate) = &self.debate {
                let participants = self.debate_participants();
                return debate.lock().await.run_debate(proposal, &participants).await;
            }
        }
        auto_approve(&self.bus, proposal)
    }
}

fn pool_names(kind: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{kind}-{i}")).collect()
}

/// Without an LLM, debates auto-approve at 0.5 confidence
fn auto_approve(bus: &MessageBus, proposal: Proposal) -> DebateResult {
    let result = DebateResult {
        proposal,
        decision: DebateDecision::Approved,
        confidence: 0.5,
        consensus_reasoning: "auto-approved: no llm available for debate rounds".to_string(),
        arguments: Vec::new(),
        counters: Vec::new(),
        votes: Vec::new(),
    };
    bus.publish_simple(
        topics::DEBATE_RESULT,
        Payload::DebateOutcome(result.clone()),
        COORDINATOR_NAME,
    );
    result
}

struct DispatcherContext {
    bus: Arc<MessageBus>,
    store: Option<Arc<dyn PositionStore>>,
    dashboard: Option<Arc<DashboardSink>>,
    debate: Arc<TokioMutex<DebateProtocol>>,
    running: Arc<AtomicBool>,
    participants: Vec<String>,
    llm_available: bool,
}

/// Coordinator message pump: verdict bookkeeping, trade completions,
/// debate requests and alert forwarding
async fn run_dispatcher(
    ctx: DispatcherContext,
    mut coordinator_rx: tokio::sync::mpsc::UnboundedReceiver<Arc<crate::bus::Message>>,
    mut debate_rx: tokio::sync::mpsc::UnboundedReceiver<Arc<crate::bus::Message>>,
    mut alert_rx: tokio::sync::mpsc::UnboundedReceiver<Arc<crate::bus::Message>>,
) {
    loop {
        tokio::select! {
            maybe_msg = coordinator_rx.recv() => match maybe_msg {
                Some(msg) => handle_coordinator_message(&ctx, &msg).await,
                None => break,
            },
            maybe_msg = debate_rx.recv() => match maybe_msg {
                Some(msg) => {
                    if let Payload::DebateRequest(proposal) = &msg.payload {
                        let should = ctx.debate.lock().await.should_debate(proposal);
                        if !should {
                            debug!(proposal = %proposal.id, "proposal below debate threshold");
                        } else if ctx.llm_available {
                            ctx.debate
                                .lock()
                                .await
                                .run_debate(proposal.clone(), &ctx.participants)
                                .await;
                        } else {
                            auto_approve(&ctx.bus, proposal.clone());
                        }
                    }
                }
                None => break,
            },
            maybe_msg = alert_rx.recv() => match maybe_msg {
                Some(msg) => {
                    if let Payload::Alert(alert) = &msg.payload {
                        push_dashboard(&ctx, "alert", serde_json::json!({
                            "kind": alert.kind,
                            "token": alert.token.map(|t| t.to_string()),
                            "wallet": alert.wallet.map(|w| w.to_string()),
                            "detail": alert.detail,
                        }));
                        ctx.bus.publish_simple(
                            topics::USER_ALERT,
                            Payload::UserNotice(UserAlert {
                                level: UserAlertLevel::Critical,
                                message: format!("{:?}: {}", alert.kind, alert.detail),
                                timestamp_ms: now_ms(),
                            }),
                            COORDINATOR_NAME,
                        );
                    }
                }
                None => break,
            },
        }

        if !ctx.running.load(Ordering::Relaxed) {
            break;
        }
    }
}

async fn handle_coordinator_message(ctx: &DispatcherContext, msg: &crate::bus::Message) {
    match &msg.payload {
        Payload::Report(report) => {
            if let Some(store) = &ctx.store {
                let prediction = Prediction {
                    token: report.token,
                    agent: msg.from.clone(),
                    verdict: report.verdict,
                    score: report.score,
                    confidence: report.confidence,
                    predicted_at_ms: report.timestamp_ms,
                    outcome: None,
                    checked_at_ms: None,
                };
                if let Err(e) = store.save_prediction(&prediction) {
                    warn!("prediction persist failed: {e}");
                }
            }
            push_dashboard(
                ctx,
                "investigation",
                serde_json::json!({
                    "token": report.token.to_string(),
                    "verdict": report.verdict.as_str(),
                    "score": report.score,
                    "confidence": report.confidence,
                }),
            );
        }
        Payload::Trade(notice) => {
            push_dashboard(
                ctx,
                "trade",
                serde_json::json!({
                    "token": notice.token.to_string(),
                    "side": notice.side,
                    "sol": notice.sol_amount,
                    "pnl": notice.pnl,
                    "reason": notice.reason,
                }),
            );

            if notice.side == TradeSide::Sell {
                if let Some(pnl) = notice.pnl {
                    ctx.debate
                        .lock()
                        .await
                        .update_agent_success(&msg.from, pnl >= 0.0);
                }

                // Emergency exits were caused by an alert; re-alerting here
                // would close the alert -> exit -> alert cycle
                if !notice.emergency {
                    let (level, word) = match notice.pnl {
                        Some(pnl) if pnl < 0.0 => (UserAlertLevel::Warning, "loss"),
                        _ => (UserAlertLevel::Info, "win"),
                    };
                    ctx.bus.publish_simple(
                        topics::USER_ALERT,
                        Payload::UserNotice(UserAlert {
                            level,
                            message: format!(
                                "trade closed ({word}): {} pnl {:+.6} SOL",
                                notice.token,
                                notice.pnl.unwrap_or(0.0)
                            ),
                            timestamp_ms: now_ms(),
                        }),
                        COORDINATOR_NAME,
                    );
                }
            }
        }
        // check_wallet replies are consumed by their own subscription
        Payload::WalletCheckReply { .. } => {}
        other => debug!("coordinator ignoring payload {other:?}"),
    }
}

fn push_dashboard(ctx: &DispatcherContext, kind: &str, payload: serde_json::Value) {
    if let Some(dashboard) = &ctx.dashboard {
        dashboard.push(DashboardEvent::new(kind, payload));
    }
}

/// Every 60 s (first check at 30 s) verify that every agent still
/// reports running. Stopped agents are surfaced, not restarted.
async fn run_health_monitor(
    running: Arc<AtomicBool>,
    agents: Vec<(String, Arc<AtomicBool>)>,
    bus: Arc<MessageBus>,
) {
    tokio::time::sleep(HEALTH_FIRST_DELAY).await;
    let mut interval = tokio::time::interval(HEALTH_INTERVAL);

    loop {
        interval.tick().await;
        if !running.load(Ordering::Relaxed) {
            break;
        }

        let mut alive = 0i64;
        for (name, flag) in &agents {
            if flag.load(Ordering::Relaxed) {
                alive += 1;
            } else {
                warn!(agent = %name, "health check: agent not running");
                bus.publish_simple(
                    topics::USER_ALERT,
                    Payload::UserNotice(UserAlert {
                        level: UserAlertLevel::Warning,
                        message: format!("agent {name} is not running"),
                        timestamp_ms: now_ms(),
                    }),
                    COORDINATOR_NAME,
                );
            }
        }
        metrics().agents_running.set(alive);
    }
}

/// Hourly (first pass at 5 min): classify predictions older than 24 h
/// through the market oracle, feed the learner, persist weights.
async fn run_outcome_checker(
    running: Arc<AtomicBool>,
    store: Arc<dyn PositionStore>,
    oracle: Arc<dyn MarketOracle>,
    debate: Arc<TokioMutex<DebateProtocol>>,
) {
    tokio::time::sleep(OUTCOME_FIRST_DELAY).await;
    let mut interval = tokio::time::interval(OUTCOME_INTERVAL);

    loop {
        interval.tick().await;
        if !running.load(Ordering::Relaxed) {
            break;
        }

        let cutoff = now_ms() - OUTCOME_MIN_AGE_MS;
        let pending = match store.pending_predictions(cutoff) {
            Ok(pending) => pending,
            Err(e) => {
                warn!("pending prediction scan failed: {e}");
                continue;
            }
        };
        if pending.is_empty() {
            continue;
        }
        info!(count = pending.len(), "outcome-checking aged predictions");

        for prediction in pending {
            match tokio::time::timeout(
                ORACLE_CALL_TIMEOUT,
                oracle.classify(&prediction.token, prediction.predicted_at_ms),
            )
            .await
            {
                Ok(Ok(outcome)) => {
                    if let Err(e) = store.record_outcome(&prediction.token, outcome, now_ms()) {
                        warn!("outcome persist failed: {e}");
                    }
                    debate
                        .lock()
                        .await
                        .update_agent_success(&prediction.agent, prediction.outcome_matches(outcome));
                }
                Ok(Err(e)) => warn!(token = %prediction.token, "oracle classify failed: {e}"),
                Err(_) => warn!(token = %prediction.token, "oracle classify timed out"),
            }
        }

        let weights = debate.lock().await.success_weights();
        if let Err(e) = store.save_learning_state(&weights) {
            warn!("learning weight persist failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{launch_event, MockChainClient};
    use crate::types::{Dex, ProposalAction};

    fn small_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.pools.scouts = 1;
        config.pools.analysts = 1;
        config.pools.hunters = 1;
        config.pools.traders = 1;
        config
    }

    #[tokio::test]
    async fn test_start_spawns_pools_and_stop_lands() {
        let chain = Arc::new(MockChainClient::new());
        let mut coordinator = Coordinator::new(small_config(), chain);
        coordinator.start().await.unwrap();

        assert!(coordinator.is_running());
        assert_eq!(coordinator.agents.len(), 4);
        // Give the spawned tasks a beat to come up
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(coordinator.running_agent_count(), 4);

        coordinator.stop().await;
        assert!(!coordinator.is_running());
        assert!(coordinator.agents.is_empty());
    }

    #[tokio::test]
    async fn test_launch_event_flows_to_discovery() {
        let chain = Arc::new(MockChainClient::new());
        let mut coordinator = Coordinator::new(small_config(), chain);
        coordinator.start().await.unwrap();

        let (_, mut discovery_rx) = coordinator.bus().subscribe(topics::DISCOVERY_NEW);
        coordinator.bus().publish_simple(
            "launch.detected",
            Payload::Launch(launch_event(Dex::PumpFun, Some(0.5))),
            "feed",
        );

        let msg = tokio::time::timeout(Duration::from_secs(2), discovery_rx.recv())
            .await
            .expect("scout emits discovery.new")
            .unwrap();
        assert!(matches!(msg.payload, Payload::ScanResult(_)));

        coordinator.stop().await;
    }

    #[tokio::test]
    async fn test_check_wallet_round_trip_and_timeout() {
        let chain = Arc::new(MockChainClient::new());
        let mut coordinator = Coordinator::new(small_config(), chain);

        // Before start: no hunters, immediate default
        let wallet = Pubkey::new_unique();
        let result = coordinator.check_wallet(wallet).await;
        assert!(!result.is_repeat);

        coordinator.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let result = coordinator.check_wallet(wallet).await;
        assert_eq!(result.wallet, wallet);
        assert!(!result.is_repeat);
        assert_eq!(result.rug_count, 0);

        coordinator.stop().await;
    }

    #[tokio::test]
    async fn test_trigger_debate_auto_approves_without_llm() {
        let chain = Arc::new(MockChainClient::new());
        let mut coordinator = Coordinator::new(small_config(), chain);
        coordinator.start().await.unwrap();

        let (_, mut result_rx) = coordinator.bus().subscribe(topics::DEBATE_RESULT);

        let proposal = Proposal {
            id: Uuid::new_v4(),
            agent: "trader-1".to_string(),
            action: ProposalAction::Buy,
            target: "TokenX".to_string(),
            amount_sol: Some(0.08),
            reasoning: "large entry".to_string(),
            confidence: 0.9,
            context: serde_json::json!({}),
            timestamp_ms: now_ms(),
        };
        let result = coordinator.trigger_debate(proposal).await;

        assert_eq!(result.decision, DebateDecision::Approved);
        assert_eq!(result.confidence, 0.5);
        assert!(result.votes.is_empty());
        assert!(result_rx.try_recv().is_ok());

        coordinator.stop().await;
    }

    #[tokio::test]
    async fn test_analyze_token_produces_report() {
        let chain = Arc::new(MockChainClient::new());
        let mut coordinator = Coordinator::new(small_config(), chain);
        coordinator.start().await.unwrap();

        let (_, mut report_rx) = coordinator
            .bus()
            .subscribe("agent.coordinator.investigation_complete");

        let token = Pubkey::new_unique();
        coordinator.analyze_token(token, Priority::High);

        let msg = tokio::time::timeout(Duration::from_secs(2), report_rx.recv())
            .await
            .expect("analyst completes manual investigation")
            .unwrap();
        match &msg.payload {
            Payload::Report(report) => assert_eq!(report.token, token),
            other => panic!("unexpected payload: {other:?}"),
        }

        coordinator.stop().await;
    }
}
