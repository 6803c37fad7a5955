//! Trader agent: opportunity evaluation and the position lifecycle
//!
//! Positions traverse `candidate → active → {sold, stopped, emergency}`
//! and never reopen. Streamed price updates drive the three exit
//! triggers (stop-loss, take-profit, max-hold); a polling fallback covers
//! a silent stream. At most five concurrent positions, one per token,
//! within a daily trade budget that resets on UTC date rollover.

use crate::agents::runtime::{Agent, AgentContext, ThoughtKind};
use crate::bus::{ControlCommand, Message, MessageBus, Payload};
use crate::errors::TradeError;
use crate::external::store::PositionStore;
use crate::external::{ChainClient, LlmService, SOL_MINT};
use crate::goals::GoalTracker;
use crate::memory::MemoryKind;
use crate::metrics::{metrics, Timer};
use crate::types::{
    now_ms, AgentKind, AgentStatusReport, AlertKind, AlertPayload, ExitReason, Opportunity,
    Position, PositionStatus, PriceUpdate, SizeTier, Strategy, TokenAnalysis, TradeDecision,
    TradeNotice, TradeSide,
};
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Concurrent position cap
pub const MAX_POSITIONS: usize = 5;

/// Trade history retained in memory
const TRADE_HISTORY_CAP: usize = 1000;

/// Reason string used for emergency exits; its reason code suppresses the
/// alert re-broadcast that caused it
pub const EMERGENCY_EXIT_REASON: &str = "Emergency exit - scammer detected";

/// Callback registering a pool with the price stream
pub type PositionOpenedFn = Arc<dyn Fn(Pubkey, Pubkey) + Send + Sync>;

/// Callback dropping a pool from the price stream
pub type PositionClosedFn = Arc<dyn Fn(Pubkey) + Send + Sync>;

#[derive(Clone)]
pub struct TraderConfig {
    /// Real submission through the chain client; simulation otherwise
    pub trading_enabled: bool,
    pub max_daily_trades: u32,
    pub max_position_size_sol: f64,
    pub slippage_bps: u16,
    /// Fallback polling cadence while the stream is silent
    pub poll_interval: Duration,
    pub initial_balance_sol: f64,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            trading_enabled: false,
            max_daily_trades: 10,
            max_position_size_sol: 0.1,
            slippage_bps: 100,
            poll_interval: Duration::from_secs(30),
            initial_balance_sol: 10.0,
        }
    }
}

/// Position-managing agent
pub struct TraderAgent {
    ctx: AgentContext,
    cfg: TraderConfig,
    chain: Arc<dyn ChainClient>,
    store: Option<Arc<dyn PositionStore>>,
    mailbox: mpsc::UnboundedReceiver<Arc<Message>>,
    price_rx: mpsc::UnboundedReceiver<Arc<Message>>,
    alert_rx: mpsc::UnboundedReceiver<Arc<Message>>,
    positions: DashMap<Pubkey, Position>,
    strategies: Vec<Strategy>,
    trade_history: Vec<TradeNotice>,
    wallet_balance_sol: f64,
    daily_trade_count: u32,
    last_trade_date: Option<NaiveDate>,
    win_count: u32,
    loss_count: u32,
    keypair: Option<Arc<Keypair>>,
    wallet: Pubkey,
    on_position_opened: Option<PositionOpenedFn>,
    on_position_closed: Option<PositionClosedFn>,
    coordinator: String,
    /// Creator linkage for emergency exits on scammer alerts
    token_creators: HashMap<Pubkey, Pubkey>,
    last_stream_update: Instant,
}

impl TraderAgent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        bus: Arc<MessageBus>,
        goals: Arc<GoalTracker>,
        llm: Option<Arc<dyn LlmService>>,
        chain: Arc<dyn ChainClient>,
        store: Option<Arc<dyn PositionStore>>,
        coordinator: String,
        cfg: TraderConfig,
    ) -> Self {
        let (_, mailbox) = bus.subscribe(&format!("agent.{name}.*"));
        let (_, price_rx) = bus.subscribe(crate::bus::topics::PRICE_UPDATE);
        let (_, alert_rx) = bus.subscribe("alert.*");

        Self {
            ctx: AgentContext::new(name, AgentKind::Trader, bus, goals).with_llm(llm),
            wallet_balance_sol: cfg.initial_balance_sol,
            cfg,
            chain,
            store,
            mailbox,
            price_rx,
            alert_rx,
            positions: DashMap::new(),
            strategies: Strategy::builtin(),
            trade_history: Vec::new(),
            daily_trade_count: 0,
            last_trade_date: None,
            win_count: 0,
            loss_count: 0,
            keypair: None,
            wallet: Pubkey::new_unique(),
            on_position_opened: None,
            on_position_closed: None,
            coordinator,
            token_creators: HashMap::new(),
            last_stream_update: Instant::now(),
        }
    }

    /// Wire the price-stream registration callbacks
    pub fn with_callbacks(
        mut self,
        on_opened: Option<PositionOpenedFn>,
        on_closed: Option<PositionClosedFn>,
    ) -> Self {
        self.on_position_opened = on_opened;
        self.on_position_closed = on_closed;
        self
    }

    pub fn with_keypair(mut self, keypair: Option<Arc<Keypair>>) -> Self {
        if let Some(keypair) = &keypair {
            self.wallet = keypair.pubkey();
        }
        self.keypair = keypair;
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Self {
        if !strategies.is_empty() {
            self.strategies = strategies;
        }
        self
    }

    pub fn running_flag(&self) -> Arc<std::sync::atomic::AtomicBool> {
        self.ctx.running_flag()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn win_loss(&self) -> (u32, u32) {
        (self.win_count, self.loss_count)
    }

    /// Reload active positions from the store and re-register their pools
    fn restore_positions(&mut self) {
        let Some(store) = &self.store else { return };
        match store.get_active() {
            Ok(active) => {
                for position in active {
                    if let Some(on_opened) = &self.on_position_opened {
                        on_opened(position.pool_address, position.token);
                    }
                    self.positions.insert(position.token, position);
                }
                if !self.positions.is_empty() {
                    info!(
                        agent = %self.ctx.name(),
                        count = self.positions.len(),
                        "restored active positions"
                    );
                }
                metrics().open_positions.set(self.positions.len() as i64);
            }
            Err(e) => warn!(agent = %self.ctx.name(), "position restore failed: {e}"),
        }
    }

    pub async fn run(mut self) {
        info!(agent = %self.ctx.name(), trading_enabled = self.cfg.trading_enabled, "trader starting");
        self.restore_positions();

        let mut poll = tokio::time::interval(self.cfg.poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while self.ctx.is_running() {
            tokio::select! {
                maybe_msg = self.mailbox.recv() => match maybe_msg {
                    Some(msg) => self.handle_message(msg).await,
                    None => break,
                },
                maybe_msg = self.price_rx.recv() => match maybe_msg {
                    Some(msg) => {
                        if let Payload::Price(update) = &msg.payload {
                            self.handle_price_update(update).await;
                        }
                    }
                    None => break,
                },
                maybe_msg = self.alert_rx.recv() => match maybe_msg {
                    Some(msg) => {
                        if let Payload::Alert(alert) = &msg.payload {
                            self.handle_alert(alert).await;
                        }
                    }
                    None => break,
                },
                _ = poll.tick() => {
                    if self.last_stream_update.elapsed() >= self.cfg.poll_interval {
                        self.poll_positions().await;
                    }
                }
            }
            tokio::task::yield_now().await;
        }

        info!(agent = %self.ctx.name(), "trader stopped");
    }

    async fn handle_message(&mut self, msg: Arc<Message>) {
        match &msg.payload {
            Payload::Opportunity(opportunity) => self.handle_opportunity(opportunity.clone()).await,
            Payload::SellRequest { token, reason } => {
                let reason = reason.clone();
                if let Err(e) = self.execute_sell(*token, &reason).await {
                    warn!(agent = %self.ctx.name(), "manual sell failed: {e}");
                }
            }
            Payload::Price(update) => self.handle_price_update(update).await,
            Payload::Control(ControlCommand::Stop) => self.ctx.stop(),
            Payload::StatusRequest => self.publish_status(),
            other => debug!(agent = %self.ctx.name(), "ignoring payload {other:?}"),
        }
    }

    async fn handle_opportunity(&mut self, opportunity: Opportunity) {
        let decision = self.evaluate_opportunity(&opportunity.token, &opportunity.analysis);
        self.ctx.think(
            ThoughtKind::Reasoning,
            format!("opportunity {}: {}", opportunity.token, decision.reasoning),
            None,
        );

        if !decision.should_buy {
            return;
        }
        let (Some(strategy), Some(size)) = (decision.strategy, decision.position_size_sol) else {
            return;
        };

        if let Some(creator) = opportunity.creator {
            self.token_creators.insert(opportunity.token, creator);
        }

        match self
            .execute_buy(&opportunity.token, opportunity.pool_address, &strategy, size)
            .await
        {
            Ok(position) => {
                self.ctx.think(
                    ThoughtKind::Action,
                    format!(
                        "opened {} at {:.9} SOL, stop {:.9}, target {:.9}",
                        position.token, position.entry_price, position.stop_loss, position.take_profit
                    ),
                    None,
                );
            }
            Err(e) => {
                self.ctx.think(
                    ThoughtKind::Reflection,
                    format!("buy of {} failed: {e}", opportunity.token),
                    None,
                );
                metrics().trades_failed.inc();
            }
        }
    }

    /// Pure evaluation of an opportunity against the strategy book.
    ///
    /// Rejections are reasoned refusals, never errors: invariant
    /// violations (duplicate token, position cap, daily budget) land here.
    pub fn evaluate_opportunity(&mut self, token: &Pubkey, analysis: &TokenAnalysis) -> TradeDecision {
        self.roll_daily_counter();

        if self.daily_trade_count >= self.cfg.max_daily_trades {
            return TradeDecision::rejected(format!(
                "daily trade limit reached ({})",
                self.cfg.max_daily_trades
            ));
        }
        if self.positions.contains_key(token) {
            return TradeDecision::rejected("position already open for this token");
        }
        if self.positions.len() >= MAX_POSITIONS {
            return TradeDecision::rejected(format!(
                "max concurrent positions reached ({MAX_POSITIONS})"
            ));
        }

        for strategy in &self.strategies {
            if analysis.score > strategy.entry.max_score {
                continue;
            }
            if analysis.liquidity_sol < strategy.entry.min_liquidity_sol {
                continue;
            }
            let bundled = analysis.bundle.as_ref().map_or(false, |b| b.detected);
            if bundled && !strategy.entry.bundles_allowed {
                continue;
            }
            if !strategy
                .entry
                .security_requirements
                .iter()
                .all(|req| req.satisfied_by(analysis))
            {
                continue;
            }

            let tier = SizeTier::from_risk_score(analysis.score);
            if tier == SizeTier::Skip {
                return TradeDecision::rejected("risk score too high for any position size");
            }
            let size = (strategy.position_size_sol * tier.multiplier())
                .min(self.cfg.max_position_size_sol);
            if self.wallet_balance_sol < size {
                return TradeDecision::rejected(format!(
                    "balance {:.3} SOL below position size {size:.3}",
                    self.wallet_balance_sol
                ));
            }

            return TradeDecision {
                should_buy: true,
                strategy: Some(strategy.name.clone()),
                position_size_sol: Some(size),
                reasoning: format!("{} matched with {tier:?} sizing ({size:.3} SOL)", strategy.name),
            };
        }

        TradeDecision::rejected("no strategy matched entry conditions")
    }

    /// Open a position. In simulation the signature is synthetic
    /// (`sim_` prefix) and nothing is submitted on chain.
    pub async fn execute_buy(
        &mut self,
        token: &Pubkey,
        pool_address: Pubkey,
        strategy_name: &str,
        size_sol: f64,
    ) -> Result<Position, TradeError> {
        let timer = Timer::new();
        let strategy = self
            .strategies
            .iter()
            .find(|s| s.name == strategy_name)
            .cloned()
            .unwrap_or_else(|| Strategy::builtin().remove(0));

        let quote = self
            .chain
            .quote(&SOL_MINT, token, size_sol, self.cfg.slippage_bps)
            .await
            .map_err(|e| TradeError::SwapFailed(e.to_string()))?
            .ok_or(TradeError::QuoteUnavailable(*token))?;

        let signature = if self.cfg.trading_enabled {
            let outcome = self
                .chain
                .execute_swap(&quote, &self.wallet, self.keypair.as_deref())
                .await
                .map_err(|e| TradeError::SwapFailed(e.to_string()))?;
            if !outcome.success {
                return Err(TradeError::SwapFailed(
                    outcome.error.unwrap_or_else(|| "unknown".to_string()),
                ));
            }
            outcome
                .signature
                .unwrap_or_else(|| format!("sim_{}", Uuid::new_v4()))
        } else {
            format!("sim_{}", Uuid::new_v4())
        };

        let entry_price = quote.price;
        let mut position = Position {
            id: Uuid::new_v4().to_string(),
            token: *token,
            entry_price,
            current_price: entry_price,
            amount: quote.out_amount,
            sol_invested: size_sol,
            entry_time_ms: now_ms(),
            strategy: strategy.name.clone(),
            stop_loss: entry_price * (1.0 - strategy.exit.stop_loss_percent / 100.0),
            take_profit: entry_price * (1.0 + strategy.exit.take_profit_percent / 100.0),
            pnl: 0.0,
            pnl_percent: 0.0,
            status: PositionStatus::Active,
            pool_address,
            exit_reason: None,
            exit_time_ms: None,
            tx_signature: signature.clone(),
        };
        position.refresh_pnl();

        let today = Utc::now().date_naive();
        self.daily_trade_count += 1;
        self.last_trade_date = Some(today);
        self.wallet_balance_sol -= size_sol;

        self.positions.insert(*token, position.clone());
        metrics().trades_total.inc();
        metrics().open_positions.set(self.positions.len() as i64);

        if let Some(store) = &self.store {
            if let Err(e) = store.create(&position) {
                warn!(agent = %self.ctx.name(), "position persist failed: {e}");
            }
        }
        if let Some(on_opened) = &self.on_position_opened {
            on_opened(pool_address, *token);
        }

        self.ctx.memory.remember(
            MemoryKind::Action,
            ["trade", "buy", strategy.name.as_str()],
            serde_json::json!({
                "token": token.to_string(),
                "sol": size_sol,
                "price": entry_price,
                "signature": signature,
            }),
        );

        let notice = TradeNotice {
            token: *token,
            side: TradeSide::Buy,
            sol_amount: size_sol,
            price: entry_price,
            pnl: None,
            reason: None,
            strategy: Some(strategy.name.clone()),
            signature,
            emergency: false,
            timestamp_ms: now_ms(),
        };
        self.record_trade(notice.clone());
        let name = self.ctx.name().to_string();
        let topic = crate::bus::topics::agent(&name, "trade_executed");
        self.ctx
            .bus()
            .publish_simple(&topic, Payload::Trade(notice), &name);

        timer.observe_duration(&metrics().trade_latency);
        Ok(position)
    }

    /// Close a position for `reason`. Accounting is in-memory first;
    /// store and chain failures degrade to the simulated path.
    pub async fn execute_sell(&mut self, token: Pubkey, reason: &str) -> Result<(), TradeError> {
        let timer = Timer::new();
        let (_, mut position) = self
            .positions
            .remove(&token)
            .ok_or(TradeError::PositionNotFound(token))?;

        let quote = self
            .chain
            .quote(&token, &SOL_MINT, position.amount, self.cfg.slippage_bps)
            .await
            .ok()
            .flatten();

        let (sol_received, exit_price) = match &quote {
            Some(q) => (q.out_amount, q.price),
            None => (
                position.current_price * position.amount,
                position.current_price,
            ),
        };

        let signature = if self.cfg.trading_enabled && quote.is_some() {
            match self
                .chain
                .execute_swap(quote.as_ref().expect("checked"), &self.wallet, self.keypair.as_deref())
                .await
            {
                Ok(outcome) if outcome.success => outcome
                    .signature
                    .unwrap_or_else(|| format!("sim_{}", Uuid::new_v4())),
                Ok(outcome) => {
                    self.ctx.think(
                        ThoughtKind::Reflection,
                        format!(
                            "sell submission failed ({}), closing as simulated",
                            outcome.error.unwrap_or_else(|| "unknown".to_string())
                        ),
                        None,
                    );
                    format!("sim_{}", Uuid::new_v4())
                }
                Err(e) => {
                    self.ctx.think(
                        ThoughtKind::Reflection,
                        format!("sell submission error ({e}), closing as simulated"),
                        None,
                    );
                    format!("sim_{}", Uuid::new_v4())
                }
            }
        } else {
            format!("sim_{}", Uuid::new_v4())
        };

        let exit_reason = ExitReason::from_reason_text(reason);
        position.status = match exit_reason {
            ExitReason::StopLoss => PositionStatus::Stopped,
            ExitReason::Emergency => PositionStatus::Emergency,
            _ => PositionStatus::Sold,
        };
        position.exit_reason = Some(exit_reason);
        position.exit_time_ms = Some(now_ms());
        position.current_price = exit_price;
        position.pnl = sol_received - position.sol_invested;
        position.pnl_percent = if position.sol_invested > 0.0 {
            position.pnl / position.sol_invested * 100.0
        } else {
            0.0
        };

        self.wallet_balance_sol += sol_received;
        if position.pnl >= 0.0 {
            self.win_count += 1;
            metrics().trades_success.inc();
        } else {
            self.loss_count += 1;
            metrics().trades_failed.inc();
        }
        if exit_reason == ExitReason::Emergency {
            metrics().emergency_exits_total.inc();
        }
        metrics().open_positions.set(self.positions.len() as i64);

        if let Some(store) = &self.store {
            if let Err(e) = store.close(
                &position.id,
                position.status,
                exit_reason,
                position.exit_time_ms.unwrap_or_else(now_ms),
                exit_price,
            ) {
                warn!(agent = %self.ctx.name(), "position close persist failed: {e}");
            }
        }
        if let Some(on_closed) = &self.on_position_closed {
            on_closed(position.pool_address);
        }

        let outcome_tag = if position.pnl >= 0.0 { "win" } else { "loss" };
        self.ctx.memory.remember(
            MemoryKind::Outcome,
            ["trade", "sell", outcome_tag],
            serde_json::json!({
                "token": token.to_string(),
                "pnl": position.pnl,
                "reason": reason,
            }),
        );

        self.ctx.think(
            ThoughtKind::Action,
            format!(
                "closed {} ({reason}): pnl {:+.6} SOL ({:+.1}%)",
                token, position.pnl, position.pnl_percent
            ),
            None,
        );

        let win_rate = if self.win_count + self.loss_count > 0 {
            self.win_count as f64 / (self.win_count + self.loss_count) as f64
        } else {
            0.0
        };
        self.ctx.goals().update(self.ctx.name(), "win_rate", win_rate);

        let notice = TradeNotice {
            token,
            side: TradeSide::Sell,
            sol_amount: sol_received,
            price: exit_price,
            pnl: Some(position.pnl),
            reason: Some(reason.to_string()),
            strategy: Some(position.strategy.clone()),
            signature,
            emergency: exit_reason == ExitReason::Emergency,
            timestamp_ms: now_ms(),
        };
        self.record_trade(notice.clone());

        let name = self.ctx.name().to_string();
        self.ctx
            .bus()
            .send_to(&self.coordinator, "trade_complete", Payload::Trade(notice.clone()), &name);
        let topic = crate::bus::topics::agent(&name, "trade_executed");
        self.ctx
            .bus()
            .publish_simple(&topic, Payload::Trade(notice), &name);

        timer.observe_duration(&metrics().trade_latency);
        Ok(())
    }

    /// React to one streamed price update: refresh pnl, persist, then
    /// test the three exit triggers in order.
    pub async fn handle_price_update(&mut self, update: &PriceUpdate) {
        self.last_stream_update = Instant::now();

        let trigger = {
            let Some(mut entry) = self.positions.get_mut(&update.token) else {
                return;
            };
            entry.current_price = update.price;
            entry.refresh_pnl();

            if let Some(store) = &self.store {
                if let Err(e) =
                    store.update_price(&entry.id, update.price, entry.pnl, entry.pnl_percent)
                {
                    debug!(agent = %self.ctx.name(), "price persist failed: {e}");
                }
            }

            let max_hold_ms = self
                .strategies
                .iter()
                .find(|s| s.name == entry.strategy)
                .map(|s| s.exit.max_hold_time_ms)
                .unwrap_or(i64::MAX);

            if update.price <= entry.stop_loss {
                Some("Stop-loss triggered")
            } else if update.price >= entry.take_profit {
                Some("Take-profit triggered")
            } else if now_ms() - entry.entry_time_ms >= max_hold_ms {
                Some("Max hold time reached")
            } else {
                None
            }
        };

        if let Some(reason) = trigger {
            if let Err(e) = self.execute_sell(update.token, reason).await {
                warn!(agent = %self.ctx.name(), "triggered sell failed: {e}");
            }
        }
    }

    /// Polling fallback: fetch a quote per open position and run the same
    /// triggers the stream would have
    async fn poll_positions(&mut self) {
        let snapshot: Vec<(Pubkey, Pubkey, f64)> = self
            .positions
            .iter()
            .map(|entry| (entry.token, entry.pool_address, entry.amount))
            .collect();
        if snapshot.is_empty() {
            return;
        }

        debug!(agent = %self.ctx.name(), count = snapshot.len(), "stream silent, polling prices");
        for (token, pool_address, amount) in snapshot {
            let price = match self
                .chain
                .quote(&token, &SOL_MINT, amount, self.cfg.slippage_bps)
                .await
            {
                Ok(Some(quote)) => quote.price,
                Ok(None) => continue,
                Err(e) => {
                    debug!(agent = %self.ctx.name(), "poll quote failed for {token}: {e}");
                    continue;
                }
            };

            let update = PriceUpdate {
                pool_address,
                token,
                price,
                liquidity_sol: 0.0,
                timestamp_ms: now_ms(),
            };
            self.handle_price_update(&update).await;
            // handle_price_update marked the stream live; polling must not
            if let Some(past) = Instant::now().checked_sub(self.cfg.poll_interval) {
                self.last_stream_update = past;
            }
        }
    }

    /// Emergency exit on scammer or high-risk alerts, matched by token or
    /// by creator-wallet linkage
    async fn handle_alert(&mut self, alert: &AlertPayload) {
        let mut matching: Vec<Pubkey> = Vec::new();

        match alert.kind {
            AlertKind::Scammer | AlertKind::Emergency => {
                for entry in self.positions.iter() {
                    let token = entry.token;
                    let by_token = alert.token == Some(token);
                    let by_creator = alert
                        .wallet
                        .map(|w| self.token_creators.get(&token) == Some(&w))
                        .unwrap_or(false);
                    if by_token || by_creator {
                        matching.push(token);
                    }
                }
            }
            AlertKind::HighRiskToken => {
                if let Some(token) = alert.token {
                    if self.positions.contains_key(&token) {
                        matching.push(token);
                    }
                }
            }
            AlertKind::BundleDetected => {}
        }

        for token in matching {
            self.ctx.think(
                ThoughtKind::Action,
                format!("emergency exit for {token} on {:?} alert", alert.kind),
                None,
            );
            if let Err(e) = self.execute_sell(token, EMERGENCY_EXIT_REASON).await {
                warn!(agent = %self.ctx.name(), "emergency sell failed: {e}");
            }
        }
    }

    /// Reset the daily budget iff the UTC date moved past `last_trade_date`
    fn roll_daily_counter(&mut self) {
        let today = Utc::now().date_naive();
        if self.last_trade_date != Some(today) {
            if self.last_trade_date.is_some() && self.daily_trade_count > 0 {
                self.ctx.think(
                    ThoughtKind::Observation,
                    format!(
                        "UTC date rolled over, resetting daily trade counter from {}",
                        self.daily_trade_count
                    ),
                    None,
                );
            }
            self.daily_trade_count = 0;
            self.last_trade_date = Some(today);
        }
    }

    fn record_trade(&mut self, notice: TradeNotice) {
        if self.trade_history.len() >= TRADE_HISTORY_CAP {
            self.trade_history.remove(0);
        }
        self.trade_history.push(notice);
    }

    fn publish_status(&mut self) {
        let report = self.status();
        let topic = crate::bus::topics::agent(self.ctx.name(), "status.response");
        self.ctx
            .bus()
            .publish_simple(&topic, Payload::Status(report), self.ctx.name());
    }
}

impl Agent for TraderAgent {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Trader
    }

    fn status(&self) -> AgentStatusReport {
        self.ctx.status(serde_json::json!({
            "positions": self.positions.len(),
            "balance_sol": self.wallet_balance_sol,
            "daily_trades": self.daily_trade_count,
            "wins": self.win_count,
            "losses": self.loss_count,
            "trading_enabled": self.cfg.trading_enabled,
        }))
    }

    fn stop(&self) {
        self.ctx.stop();
    }
}
