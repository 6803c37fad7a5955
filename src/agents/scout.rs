//! Scout agent: first-pass scan of token launches
//!
//! Consumes `LaunchEvent`s from its direct address and the discovery
//! source, derives the 29-slot feature vector from the event alone (no
//! RPC on this path), and emits `discovery.new` plus a directed
//! investigation when the launch looks suspicious.

use crate::agents::runtime::{Agent, AgentContext, ThoughtKind};
use crate::bus::{topics, ControlCommand, Message, MessageBus, Payload};
use crate::errors::AgentError;
use crate::external::LlmService;
use crate::goals::GoalTracker;
use crate::memory::MemoryKind;
use crate::metrics::metrics;
use crate::types::{
    feature, now_ms, AgentKind, AgentStatusReport, Dex, FeatureVector, InvestigationRequest,
    LaunchEvent, Priority, RiskFlag, ScanResult,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Suspicion score at which a launch is always routed to an analyst
pub const DEFAULT_FLAG_THRESHOLD: f64 = 50.0;

/// Scan quota per minute; launches beyond it are refused
pub const DEFAULT_MAX_SCANS_PER_MINUTE: u32 = 30;

/// Minimum slot distance between two processed launches
pub const DEFAULT_MIN_SLOT_INTERVAL: u64 = 10;

#[derive(Debug, Clone)]
pub struct ScoutConfig {
    pub flag_threshold: f64,
    pub max_scans_per_minute: u32,
    pub min_slot_interval: u64,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            flag_threshold: DEFAULT_FLAG_THRESHOLD,
            max_scans_per_minute: DEFAULT_MAX_SCANS_PER_MINUTE,
            min_slot_interval: DEFAULT_MIN_SLOT_INTERVAL,
        }
    }
}

/// Build the feature vector, flags and coarse suspicion score from a
/// launch event alone.
///
/// Pure: the same event always produces the same output. Holder-shaped
/// slots stay neutral until an analyst observes chain state.
pub fn quick_scan_from_launch(event: &LaunchEvent) -> ScanResult {
    let mut features = FeatureVector::zeroed();
    let mut flags = Vec::new();
    let mut score: f64 = 0.0;
    let mut suspicious = false;

    if let Some(liquidity) = event.liquidity_sol {
        features.set(
            feature::LIQUIDITY_LOG,
            (1.0 + liquidity).ln() / (1.0 + 1000.0f64).ln(),
        );

        if liquidity < 1.0 {
            flags.push(RiskFlag::LowLiquidity);
            features.set(feature::LOW_LIQUIDITY, 1.0);
            suspicious = true;
            score += 30.0;
        }

        if event.dex == Dex::PumpFun && (1.0..2.0).contains(&liquidity) {
            flags.push(RiskFlag::PumpMicro);
            features.set(feature::MICRO_LIQUIDITY, 1.0);
            score += 10.0;
        }

        if event.dex.is_raydium() && liquidity >= 5.0 {
            flags.push(RiskFlag::RaydiumEstablished);
            score -= 10.0;
        }
    }

    match event.dex {
        Dex::PumpFun => {
            features.set(feature::DEX_PUMP_FUN, 1.0);
            // Pump.fun tokens have mint and freeze authority revoked by
            // construction
            features.set(feature::MINT_DISABLED, 1.0);
            features.set(feature::FREEZE_DISABLED, 1.0);
        }
        dex if dex.is_raydium() => {
            features.set(feature::DEX_RAYDIUM, 1.0);
        }
        _ => {}
    }

    if event.graduated_from == Some(Dex::PumpFun) {
        flags.push(RiskFlag::Graduated);
        features.set(feature::GRADUATED, 1.0);

        if let Some(curve_ms) = event.bonding_curve_time_ms {
            features.set(feature::BONDING_CURVE_TIME, curve_ms as f64 / 3_600_000.0);
            if curve_ms < 5 * 60 * 1000 {
                flags.push(RiskFlag::FastGraduation);
                features.set(feature::FAST_GRADUATION, 1.0);
                score += 15.0;
            } else if curve_ms >= 60 * 60 * 1000 {
                flags.push(RiskFlag::OrganicGraduation);
                features.set(feature::ORGANIC_GRADUATION, 1.0);
                score -= 5.0;
            }
        }
    }

    // Creator history is unknown on the hot path; stay neutral
    features.set(feature::CREATOR_HISTORY, 0.5);

    if let Some(name) = &event.token_name {
        features.set(feature::NAME_PRESENT, 1.0);
        features.set(feature::NAME_LENGTH, name.len() as f64 / 32.0);
    }
    if event.token_symbol.is_some() {
        features.set(feature::SYMBOL_PRESENT, 1.0);
    }
    if event.pool_address != solana_sdk::pubkey::Pubkey::default() {
        features.set(feature::POOL_KNOWN, 1.0);
    }

    let score = score.clamp(0.0, 100.0);
    features.set(feature::RISK_PRIOR, score / 100.0);

    ScanResult {
        token: event.token,
        creator: event.creator,
        pool_address: event.pool_address,
        dex: event.dex,
        slot: event.slot,
        features,
        flags,
        score,
        suspicious,
        liquidity_sol: event.liquidity_sol,
        timestamp_ms: event.timestamp_ms,
    }
}

/// Launch-event scanner agent
pub struct ScoutAgent {
    ctx: AgentContext,
    cfg: ScoutConfig,
    mailbox: mpsc::UnboundedReceiver<Arc<Message>>,
    launch_rx: mpsc::UnboundedReceiver<Arc<Message>>,
    limiter: DefaultDirectRateLimiter,
    analysts: Vec<String>,
    next_analyst: usize,
    scan_count: u64,
    flagged_count: u64,
    last_slot: u64,
}

impl ScoutAgent {
    pub fn new(
        name: &str,
        bus: Arc<MessageBus>,
        goals: Arc<GoalTracker>,
        llm: Option<Arc<dyn LlmService>>,
        analysts: Vec<String>,
        cfg: ScoutConfig,
    ) -> Self {
        let (_, mailbox) = bus.subscribe(&format!("agent.{name}.*"));
        let (_, launch_rx) = bus.subscribe("launch.*");

        let quota = Quota::per_minute(
            NonZeroU32::new(cfg.max_scans_per_minute.max(1)).expect("non-zero scan quota"),
        );

        Self {
            ctx: AgentContext::new(name, AgentKind::Scout, bus, goals).with_llm(llm),
            cfg,
            mailbox,
            launch_rx,
            limiter: RateLimiter::direct(quota),
            analysts,
            next_analyst: 0,
            scan_count: 0,
            flagged_count: 0,
            last_slot: 0,
        }
    }

    /// Share of scans that got flagged
    pub fn flag_rate(&self) -> f64 {
        if self.scan_count == 0 {
            0.0
        } else {
            self.flagged_count as f64 / self.scan_count as f64
        }
    }

    pub fn running_flag(&self) -> Arc<std::sync::atomic::AtomicBool> {
        self.ctx.running_flag()
    }

    /// Main loop. Yields every iteration so peers make progress.
    pub async fn run(mut self) {
        info!(agent = %self.ctx.name(), "scout starting");
        self.ctx
            .think(ThoughtKind::Observation, "scout online, watching launches", None);

        while self.ctx.is_running() {
            tokio::select! {
                maybe_msg = self.mailbox.recv() => match maybe_msg {
                    Some(msg) => self.handle_message(msg),
                    None => break,
                },
                maybe_msg = self.launch_rx.recv() => match maybe_msg {
                    Some(msg) => self.handle_message(msg),
                    None => break,
                },
            }
            tokio::task::yield_now().await;
        }

        info!(agent = %self.ctx.name(), "scout stopped");
    }

    fn handle_message(&mut self, msg: Arc<Message>) {
        match &msg.payload {
            Payload::Launch(event) => {
                if let Err(e) = self.process_launch(event) {
                    debug!(agent = %self.ctx.name(), "launch refused: {e}");
                }
            }
            Payload::Control(ControlCommand::Stop) => self.ctx.stop(),
            Payload::StatusRequest => self.publish_status(),
            // Protocol violation: drop and keep the loop alive
            other => debug!(agent = %self.ctx.name(), "ignoring payload {other:?}"),
        }
    }

    fn process_launch(&mut self, event: &LaunchEvent) -> Result<(), AgentError> {
        if self.limiter.check().is_err() {
            metrics().scans_rate_limited.inc();
            self.ctx.think(
                ThoughtKind::Reflection,
                "scan quota exhausted, refusing launch",
                None,
            );
            return Err(AgentError::RateLimited("scan quota exhausted".into()));
        }

        if self.last_slot != 0 && event.slot.saturating_sub(self.last_slot) < self.cfg.min_slot_interval
        {
            metrics().scans_rate_limited.inc();
            return Err(AgentError::RateLimited(format!(
                "slot interval below {} since last scan",
                self.cfg.min_slot_interval
            )));
        }

        self.scan_count += 1;
        self.last_slot = event.slot;
        metrics().tokens_scanned_total.inc();

        let result = quick_scan_from_launch(event);
        self.ctx.think(
            ThoughtKind::Observation,
            format!(
                "scanned {} on {:?}: score {:.0}, flags {:?}",
                result.token, result.dex, result.score, result.flags
            ),
            None,
        );

        self.ctx.memory.remember(
            MemoryKind::Observation,
            ["scan"],
            serde_json::json!({
                "token": result.token.to_string(),
                "score": result.score,
                "suspicious": result.suspicious,
            }),
        );

        let flagged = result.suspicious || result.score >= self.cfg.flag_threshold;

        self.ctx.bus().publish_simple(
            topics::DISCOVERY_NEW,
            Payload::ScanResult(result.clone()),
            self.ctx.name(),
        );
        let scan_topic = topics::agent(self.ctx.name(), "scan_result");
        self.ctx.bus().publish_simple(
            &scan_topic,
            Payload::ScanResult(result.clone()),
            self.ctx.name(),
        );

        if flagged {
            self.flagged_count += 1;
            metrics().tokens_flagged_total.inc();
            self.dispatch_investigation(&result);
        }

        let flag_rate = self.flag_rate();
        self.ctx
            .goals()
            .update(self.ctx.name(), "flag_rate", flag_rate);

        Ok(())
    }

    fn dispatch_investigation(&mut self, result: &ScanResult) {
        let Some(analyst) = self.pick_analyst() else {
            warn!(agent = %self.ctx.name(), "no analysts configured, dropping flagged launch");
            return;
        };

        let priority = if result.score >= 80.0 {
            Priority::Critical
        } else if result.score >= 65.0 {
            Priority::High
        } else if result.score >= self.cfg.flag_threshold {
            Priority::Normal
        } else {
            Priority::Low
        };

        let request = InvestigationRequest {
            token: result.token,
            creator: Some(result.creator),
            pool_address: Some(result.pool_address),
            score: result.score,
            flags: result.flags.clone(),
            features: result.features.clone(),
            similar_tokens: Vec::new(),
            priority,
            source: self.ctx.name().to_string(),
            timestamp_ms: now_ms(),
        };

        self.ctx.think(
            ThoughtKind::Action,
            format!(
                "routing {} to {analyst} at {:?} priority",
                result.token, priority
            ),
            None,
        );
        self.ctx.bus().send_to(
            &analyst,
            "investigate",
            Payload::Investigate(request),
            self.ctx.name(),
        );
    }

    fn pick_analyst(&mut self) -> Option<String> {
        if self.analysts.is_empty() {
            return None;
        }
        let analyst = self.analysts[self.next_analyst % self.analysts.len()].clone();
        self.next_analyst = self.next_analyst.wrapping_add(1);
        Some(analyst)
    }

    fn publish_status(&mut self) {
        let report = self.status();
        let topic = topics::agent(self.ctx.name(), "status.response");
        self.ctx
            .bus()
            .publish_simple(&topic, Payload::Status(report), self.ctx.name());
    }
}

impl Agent for ScoutAgent {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Scout
    }

    fn status(&self) -> AgentStatusReport {
        self.ctx.status(serde_json::json!({
            "scan_count": self.scan_count,
            "flagged_count": self.flagged_count,
            "flag_rate": self.flag_rate(),
            "last_slot": self.last_slot,
        }))
    }

    fn stop(&self) {
        self.ctx.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use solana_sdk::pubkey::Pubkey;

    fn launch(dex: Dex, liquidity: Option<f64>) -> LaunchEvent {
        LaunchEvent {
            token: Pubkey::new_unique(),
            creator: Pubkey::new_unique(),
            slot: 1_000,
            timestamp_ms: 1_700_000_000_000,
            dex,
            pool_address: Pubkey::new_unique(),
            liquidity_sol: liquidity,
            token_name: Some("TEST".to_string()),
            token_symbol: Some("TST".to_string()),
            graduated_from: None,
            bonding_curve_time_ms: None,
        }
    }

    #[test]
    fn test_scan_is_pure() {
        let event = launch(Dex::PumpFun, Some(0.5));
        let first = quick_scan_from_launch(&event);
        let second = quick_scan_from_launch(&event);
        assert_eq!(first.features, second.features);
        assert_eq!(first.score, second.score);
        assert_eq!(first.flags, second.flags);
    }

    #[test]
    fn test_micro_liquidity_pump_is_flagged() {
        let result = quick_scan_from_launch(&launch(Dex::PumpFun, Some(0.5)));
        assert!(result.suspicious);
        assert!(result.flags.contains(&RiskFlag::LowLiquidity));
        assert!(result.score >= 30.0);
        // Pump.fun always reports revoked authorities
        assert_eq!(result.features.get(feature::MINT_DISABLED), 1.0);
        assert_eq!(result.features.get(feature::FREEZE_DISABLED), 1.0);
    }

    #[test]
    fn test_pump_micro_band() {
        let result = quick_scan_from_launch(&launch(Dex::PumpFun, Some(1.5)));
        assert!(result.flags.contains(&RiskFlag::PumpMicro));
        assert!(!result.flags.contains(&RiskFlag::LowLiquidity));
        assert_eq!(result.score, 10.0);
    }

    #[test]
    fn test_raydium_established_reward() {
        let result = quick_scan_from_launch(&launch(Dex::RaydiumAmm, Some(50.0)));
        assert!(result.flags.contains(&RiskFlag::RaydiumEstablished));
        // Reward cannot push the score below zero
        assert_eq!(result.score, 0.0);
        assert!(!result.suspicious);
    }

    #[test]
    fn test_fast_graduation_penalty() {
        let mut event = launch(Dex::RaydiumAmm, Some(3.0));
        event.graduated_from = Some(Dex::PumpFun);
        event.bonding_curve_time_ms = Some(2 * 60 * 1000);

        let result = quick_scan_from_launch(&event);
        assert!(result.flags.contains(&RiskFlag::Graduated));
        assert!(result.flags.contains(&RiskFlag::FastGraduation));
        assert_eq!(result.score, 15.0);
    }

    #[test]
    fn test_organic_graduation_reward() {
        let mut event = launch(Dex::RaydiumAmm, Some(50.0));
        event.graduated_from = Some(Dex::PumpFun);
        event.bonding_curve_time_ms = Some(2 * 60 * 60 * 1000);

        let result = quick_scan_from_launch(&event);
        assert!(result.flags.contains(&RiskFlag::OrganicGraduation));
        assert!(result.flags.contains(&RiskFlag::RaydiumEstablished));
        assert_eq!(result.score, 0.0); // -10 - 5, clamped at zero
    }

    #[test]
    fn test_vector_contract() {
        let result = quick_scan_from_launch(&launch(Dex::PumpFun, Some(0.2)));
        assert_eq!(result.features.as_slice().len(), feature::COUNT);
        assert!(result.features.is_normalized());
    }

    proptest! {
        #[test]
        fn prop_score_and_vector_stay_bounded(
            dex_idx in 0usize..5,
            liquidity in proptest::option::of(0.0f64..10_000.0),
            graduated in proptest::bool::ANY,
            curve_ms in proptest::option::of(0i64..86_400_000),
        ) {
            let dex = [Dex::PumpFun, Dex::RaydiumAmm, Dex::RaydiumClmm, Dex::Meteora, Dex::Unknown][dex_idx];
            let mut event = launch(dex, liquidity);
            if graduated {
                event.graduated_from = Some(Dex::PumpFun);
                event.bonding_curve_time_ms = curve_ms;
            }

            let result = quick_scan_from_launch(&event);
            prop_assert!((0.0..=100.0).contains(&result.score));
            prop_assert!(result.features.is_normalized());
            prop_assert_eq!(result.features.as_slice().len(), feature::COUNT);
        }
    }

    #[tokio::test]
    async fn test_suspicious_launch_reaches_analyst() {
        let bus = Arc::new(MessageBus::new());
        let goals = Arc::new(GoalTracker::new());
        let (_, mut analyst_rx) = bus.subscribe("agent.analyst-1.investigate");
        let (_, mut discovery_rx) = bus.subscribe(topics::DISCOVERY_NEW);

        let scout = ScoutAgent::new(
            "scout-1",
            Arc::clone(&bus),
            goals,
            None,
            vec!["analyst-1".to_string()],
            ScoutConfig::default(),
        );
        let running = scout.running_flag();
        let handle = tokio::spawn(scout.run());

        bus.publish_simple(
            "launch.detected",
            Payload::Launch(launch(Dex::PumpFun, Some(0.5))),
            "feed",
        );

        let msg = tokio::time::timeout(std::time::Duration::from_secs(1), analyst_rx.recv())
            .await
            .expect("flagged launch routed")
            .unwrap();
        match &msg.payload {
            Payload::Investigate(req) => {
                assert!(req.flags.contains(&RiskFlag::LowLiquidity));
                assert!(req.score >= 30.0);
                assert_eq!(req.source, "scout-1");
            }
            other => panic!("unexpected payload: {other:?}"),
        }

        // discovery.new is always emitted
        assert!(discovery_rx.recv().await.is_some());

        running.store(false, std::sync::atomic::Ordering::Relaxed);
        // Wake the loop so it notices the flag
        bus.publish_simple("launch.detected", Payload::Opaque(serde_json::json!({})), "feed");
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
    }

    #[tokio::test]
    async fn test_slot_interval_gating() {
        let bus = Arc::new(MessageBus::new());
        let goals = Arc::new(GoalTracker::new());
        let mut scout = ScoutAgent::new(
            "scout-1",
            Arc::clone(&bus),
            goals,
            None,
            vec!["analyst-1".to_string()],
            ScoutConfig::default(),
        );

        let mut first = launch(Dex::PumpFun, Some(0.5));
        first.slot = 1_000;
        assert!(scout.process_launch(&first).is_ok());

        // 5 slots later: below the minimum interval, refused
        let mut second = launch(Dex::PumpFun, Some(0.5));
        second.slot = 1_005;
        assert!(matches!(
            scout.process_launch(&second),
            Err(AgentError::RateLimited(_))
        ));

        // Far enough ahead: accepted
        let mut third = launch(Dex::PumpFun, Some(0.5));
        third.slot = 1_020;
        assert!(scout.process_launch(&third).is_ok());
        assert_eq!(scout.scan_count, 2);
        assert_eq!(scout.flagged_count, 2);
    }
}
