//! Hunter agent: scammer profiles, wallet network graph and watchlist
//!
//! Profiles are created on the first suspicious hand-off from an analyst
//! and only ever advance: rug counts grow, `last_seen` moves forward.
//! The wallet network is an undirected adjacency map fed by coordinated
//! wallets the analyst observed (bundles); traversal is depth-bounded.

use crate::agents::runtime::{Agent, AgentContext, ThoughtKind};
use crate::bus::{ControlCommand, Message, MessageBus, Payload};
use crate::external::store::PositionStore;
use crate::external::LlmService;
use crate::goals::GoalTracker;
use crate::memory::MemoryKind;
use crate::metrics::metrics;
use crate::types::{
    now_ms, AgentKind, AgentStatusReport, AlertKind, AlertPayload, InvestigationReport,
    ScammerPattern, ScammerProfile, Verdict, WalletCheckResult,
};
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Watchlist bound; additions past it are refused
pub const MAX_WATCHLIST_SIZE: usize = 1000;

/// Profiles at or above this confidence trigger a scammer alert
pub const MIN_CONFIDENCE_FOR_ALERT: f64 = 0.7;

/// Network traversal depth bound
pub const MAX_NETWORK_DEPTH: usize = 3;

/// Answer to a repeat-offender query
#[derive(Debug, Clone)]
pub struct RepeatOffenderCheck {
    pub is_repeat: bool,
    pub rug_count: u32,
    pub profile: Option<ScammerProfile>,
}

/// Classify a profile into a behaviour pattern with evidence
pub fn detect_pattern(profile: &ScammerProfile) -> (ScammerPattern, Vec<String>, f64) {
    let rugs = profile.rugged_tokens.len();
    let connected = profile.connected_wallets.len();

    if rugs >= 2 {
        let confidence = (0.5 + 0.15 * rugs as f64).min(0.95);
        return (
            ScammerPattern::RugPuller,
            vec![format!("{rugs} rugged tokens attributed to this wallet")],
            confidence,
        );
    }

    if connected >= 3 {
        let confidence = (0.6 + 0.05 * connected as f64).min(0.9);
        return (
            ScammerPattern::BundleCoordinator,
            vec![format!("{connected} coordinated wallets in network")],
            confidence,
        );
    }

    if profile.tokens.len() >= 5 && rugs == 0 {
        return (
            ScammerPattern::WashTrader,
            vec![format!(
                "{} tokens launched with no confirmed rugs",
                profile.tokens.len()
            )],
            0.5,
        );
    }

    (
        ScammerPattern::Unknown,
        Vec::new(),
        (0.3 + 0.1 * rugs as f64).min(0.6),
    )
}

/// Scammer-tracking agent
pub struct HunterAgent {
    ctx: AgentContext,
    mailbox: mpsc::UnboundedReceiver<Arc<Message>>,
    profiles: HashMap<Pubkey, ScammerProfile>,
    watchlist: HashSet<Pubkey>,
    network: HashMap<Pubkey, HashSet<Pubkey>>,
    store: Option<Arc<dyn PositionStore>>,
    tracked_count: u64,
}

impl HunterAgent {
    pub fn new(
        name: &str,
        bus: Arc<MessageBus>,
        goals: Arc<GoalTracker>,
        llm: Option<Arc<dyn LlmService>>,
        store: Option<Arc<dyn PositionStore>>,
    ) -> Self {
        let (_, mailbox) = bus.subscribe(&format!("agent.{name}.*"));
        let mut hunter = Self {
            ctx: AgentContext::new(name, AgentKind::Hunter, bus, goals).with_llm(llm),
            mailbox,
            profiles: HashMap::new(),
            watchlist: HashSet::new(),
            network: HashMap::new(),
            store,
            tracked_count: 0,
        };
        hunter.restore_profiles();
        hunter
    }

    /// Reload persisted profiles; the store is recovery, not truth
    fn restore_profiles(&mut self) {
        let Some(store) = &self.store else { return };
        match store.load_scammer_profiles() {
            Ok(profiles) => {
                for profile in profiles {
                    self.watchlist.insert(profile.wallet);
                    self.profiles.insert(profile.wallet, profile);
                }
                if !self.profiles.is_empty() {
                    info!(
                        agent = %self.ctx.name(),
                        count = self.profiles.len(),
                        "restored scammer profiles"
                    );
                }
            }
            Err(e) => warn!(agent = %self.ctx.name(), "profile restore failed: {e}"),
        }
    }

    pub fn running_flag(&self) -> Arc<std::sync::atomic::AtomicBool> {
        self.ctx.running_flag()
    }

    pub async fn run(mut self) {
        info!(agent = %self.ctx.name(), "hunter starting");

        while self.ctx.is_running() {
            tokio::select! {
                maybe_msg = self.mailbox.recv() => match maybe_msg {
                    Some(msg) => self.handle_message(msg),
                    None => break,
                },
            }
            tokio::task::yield_now().await;
        }

        info!(agent = %self.ctx.name(), "hunter stopped");
    }

    fn handle_message(&mut self, msg: Arc<Message>) {
        match &msg.payload {
            Payload::TrackScammer {
                token,
                wallet,
                report,
            } => {
                if let Some(wallet) = wallet {
                    self.track_scammer(*token, *wallet, report);
                } else {
                    debug!(agent = %self.ctx.name(), token = %token, "track request without creator wallet");
                }
            }
            Payload::WalletCheck {
                wallet,
                reply_to,
                request_id,
            } => self.answer_wallet_check(*wallet, reply_to, *request_id),
            Payload::Control(ControlCommand::Stop) => self.ctx.stop(),
            Payload::StatusRequest => self.publish_status(),
            other => debug!(agent = %self.ctx.name(), "ignoring payload {other:?}"),
        }
    }

    /// Repeat-offender lookup over the in-memory profile set
    pub fn check_repeat_offender(&self, wallet: &Pubkey) -> RepeatOffenderCheck {
        match self.profiles.get(wallet) {
            Some(profile) => RepeatOffenderCheck {
                is_repeat: !profile.rugged_tokens.is_empty(),
                rug_count: profile.rugged_tokens.len() as u32,
                profile: Some(profile.clone()),
            },
            None => RepeatOffenderCheck {
                is_repeat: false,
                rug_count: 0,
                profile: None,
            },
        }
    }

    /// Record an undirected edge between two coordinated wallets
    pub fn add_to_network(&mut self, a: Pubkey, b: Pubkey) {
        if a == b {
            return;
        }
        self.network.entry(a).or_default().insert(b);
        self.network.entry(b).or_default().insert(a);
    }

    /// Wallets reachable within `MAX_NETWORK_DEPTH` hops, excluding the root
    pub fn connected_wallets(&self, wallet: &Pubkey) -> HashSet<Pubkey> {
        let mut seen: HashSet<Pubkey> = HashSet::new();
        let mut frontier: VecDeque<(Pubkey, usize)> = VecDeque::new();
        frontier.push_back((*wallet, 0));
        seen.insert(*wallet);

        while let Some((current, depth)) = frontier.pop_front() {
            if depth >= MAX_NETWORK_DEPTH {
                continue;
            }
            if let Some(neighbours) = self.network.get(&current) {
                for neighbour in neighbours {
                    if seen.insert(*neighbour) {
                        frontier.push_back((*neighbour, depth + 1));
                    }
                }
            }
        }

        seen.remove(wallet);
        seen
    }

    /// Create or advance a profile from an analyst hand-off.
    ///
    /// Monotonic: `last_seen_ms` only moves forward, `rugged_tokens` only
    /// grows, and entries are append-unique.
    pub fn track_scammer(&mut self, token: Pubkey, wallet: Pubkey, report: &InvestigationReport) {
        let now = now_ms();
        let profile = self.profiles.entry(wallet).or_insert_with(|| ScammerProfile {
            wallet,
            pattern: ScammerPattern::Unknown,
            confidence: 0.0,
            tokens: Vec::new(),
            rugged_tokens: Vec::new(),
            first_seen_ms: now,
            last_seen_ms: now,
            total_victims: 0,
            estimated_profit_sol: 0.0,
            connected_wallets: Vec::new(),
            evidence: Vec::new(),
        });

        profile.last_seen_ms = profile.last_seen_ms.max(now);
        if !profile.tokens.contains(&token) {
            profile.tokens.push(token);
        }
        if report.verdict == Verdict::Scam && !profile.rugged_tokens.contains(&token) {
            profile.rugged_tokens.push(token);
        }
        profile.evidence.push(report.summary.clone());

        // Bundled wallets observed by the analyst join the network
        let bundle_wallets: Vec<Pubkey> = report
            .bundle_analysis
            .iter()
            .flat_map(|b| b.bundles.iter())
            .flat_map(|b| b.wallets.iter().copied())
            .collect();
        if !bundle_wallets.is_empty() {
            let victims = bundle_wallets.len() as u64;
            let profile = self.profiles.get_mut(&wallet).expect("profile just inserted");
            profile.total_victims += victims;
            for bundle_wallet in bundle_wallets {
                self.add_to_network(wallet, bundle_wallet);
            }
        }

        let connected: Vec<Pubkey> = self.connected_wallets(&wallet).into_iter().collect();
        let profile = self.profiles.get_mut(&wallet).expect("profile just inserted");
        profile.connected_wallets = connected;

        let (pattern, evidence, confidence) = detect_pattern(profile);
        profile.pattern = pattern;
        profile.confidence = confidence;
        profile.evidence.extend(evidence);

        let snapshot = profile.clone();
        self.tracked_count += 1;

        if self.watchlist.len() < MAX_WATCHLIST_SIZE {
            self.watchlist.insert(wallet);
            metrics().watchlist_size.set(self.watchlist.len() as i64);
        } else if !self.watchlist.contains(&wallet) {
            warn!(agent = %self.ctx.name(), "watchlist full, wallet not added");
        }

        self.ctx.think(
            ThoughtKind::Observation,
            format!(
                "tracking {wallet}: {:?} at {:.2} confidence, {} rugs",
                snapshot.pattern,
                snapshot.confidence,
                snapshot.rugged_tokens.len()
            ),
            Some(snapshot.confidence),
        );
        self.ctx.memory.remember(
            MemoryKind::Observation,
            ["scammer", "track"],
            serde_json::json!({
                "wallet": wallet.to_string(),
                "token": token.to_string(),
                "rug_count": snapshot.rugged_tokens.len(),
            }),
        );

        if snapshot.confidence >= MIN_CONFIDENCE_FOR_ALERT {
            self.ctx.bus().broadcast_alert(
                AlertKind::Scammer,
                AlertPayload {
                    kind: AlertKind::Scammer,
                    token: Some(token),
                    wallet: Some(wallet),
                    detail: format!(
                        "{:?} with {} rugged tokens",
                        snapshot.pattern,
                        snapshot.rugged_tokens.len()
                    ),
                    timestamp_ms: now,
                },
                self.ctx.name(),
            );
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.save_scammer_profile(&snapshot) {
                warn!(agent = %self.ctx.name(), "profile persist failed: {e}");
            }
        }
    }

    fn answer_wallet_check(&mut self, wallet: Pubkey, reply_to: &str, request_id: Uuid) {
        let check = self.check_repeat_offender(&wallet);
        let result = WalletCheckResult {
            wallet,
            is_repeat: check.is_repeat,
            rug_count: check.rug_count,
            pattern: check.profile.as_ref().map(|p| p.pattern),
        };

        self.ctx.think(
            ThoughtKind::Action,
            format!(
                "wallet check for {wallet}: repeat={}, rugs={}",
                result.is_repeat, result.rug_count
            ),
            None,
        );

        let name = self.ctx.name().to_string();
        self.ctx.bus().send_to(
            reply_to,
            "wallet_check_result",
            Payload::WalletCheckReply { request_id, result },
            &name,
        );
    }

    fn publish_status(&mut self) {
        let report = self.status();
        let topic = crate::bus::topics::agent(self.ctx.name(), "status.response");
        self.ctx
            .bus()
            .publish_simple(&topic, Payload::Status(report), self.ctx.name());
    }
}

impl Agent for HunterAgent {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Hunter
    }

    fn status(&self) -> AgentStatusReport {
        self.ctx.status(serde_json::json!({
            "profiles": self.profiles.len(),
            "watchlist": self.watchlist.len(),
            "network_wallets": self.network.len(),
            "tracked_count": self.tracked_count,
        }))
    }

    fn stop(&self) {
        self.ctx.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Finding, Severity};

    fn hunter(bus: Arc<MessageBus>) -> HunterAgent {
        HunterAgent::new("hunter-1", bus, Arc::new(GoalTracker::new()), None, None)
    }

    fn scam_report(token: Pubkey, creator: Option<Pubkey>) -> InvestigationReport {
        InvestigationReport {
            token,
            creator,
            verdict: Verdict::Scam,
            confidence: 90.0,
            score: 85.0,
            summary: "SCAM at score 85".to_string(),
            findings: vec![Finding {
                category: "creator".to_string(),
                severity: Severity::Critical,
                detail: "prior rugs".to_string(),
                score_delta: 40.0,
            }],
            bundle_analysis: None,
            recommendation: "AVOID".to_string(),
            timestamp_ms: now_ms(),
        }
    }

    #[test]
    fn test_track_creates_profile() {
        let mut agent = hunter(Arc::new(MessageBus::new()));
        let wallet = Pubkey::new_unique();
        let token = Pubkey::new_unique();

        agent.track_scammer(token, wallet, &scam_report(token, Some(wallet)));

        let check = agent.check_repeat_offender(&wallet);
        assert!(check.is_repeat);
        assert_eq!(check.rug_count, 1);
        let profile = check.profile.unwrap();
        assert_eq!(profile.tokens, vec![token]);
        assert_eq!(profile.rugged_tokens, vec![token]);
    }

    #[test]
    fn test_rug_count_is_monotonic_and_unique() {
        let mut agent = hunter(Arc::new(MessageBus::new()));
        let wallet = Pubkey::new_unique();
        let first = Pubkey::new_unique();
        let second = Pubkey::new_unique();

        agent.track_scammer(first, wallet, &scam_report(first, Some(wallet)));
        let seen_after_first = agent.profiles[&wallet].last_seen_ms;

        // Same token again: no double count
        agent.track_scammer(first, wallet, &scam_report(first, Some(wallet)));
        assert_eq!(agent.check_repeat_offender(&wallet).rug_count, 1);

        agent.track_scammer(second, wallet, &scam_report(second, Some(wallet)));
        let check = agent.check_repeat_offender(&wallet);
        assert_eq!(check.rug_count, 2);
        assert!(agent.profiles[&wallet].last_seen_ms >= seen_after_first);

        // Two rugs classify as a rug puller
        assert_eq!(check.profile.unwrap().pattern, ScammerPattern::RugPuller);
    }

    #[test]
    fn test_unknown_wallet_is_clean() {
        let agent = hunter(Arc::new(MessageBus::new()));
        let check = agent.check_repeat_offender(&Pubkey::new_unique());
        assert!(!check.is_repeat);
        assert_eq!(check.rug_count, 0);
        assert!(check.profile.is_none());
    }

    #[test]
    fn test_network_is_symmetric() {
        let mut agent = hunter(Arc::new(MessageBus::new()));
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();

        agent.add_to_network(a, b);
        assert!(agent.network[&a].contains(&b));
        assert!(agent.network[&b].contains(&a));

        // Self edges are refused
        agent.add_to_network(a, a);
        assert!(!agent.network[&a].contains(&a));
    }

    #[test]
    fn test_traversal_depth_bound() {
        let mut agent = hunter(Arc::new(MessageBus::new()));
        let chain: Vec<Pubkey> = (0..6).map(|_| Pubkey::new_unique()).collect();
        for pair in chain.windows(2) {
            agent.add_to_network(pair[0], pair[1]);
        }

        let reachable = agent.connected_wallets(&chain[0]);
        // Three hops out: indices 1..=3
        assert!(reachable.contains(&chain[1]));
        assert!(reachable.contains(&chain[2]));
        assert!(reachable.contains(&chain[3]));
        assert!(!reachable.contains(&chain[4]));
        assert!(!reachable.contains(&chain[5]));
    }

    #[test]
    fn test_pattern_detection_tiers() {
        let base = ScammerProfile {
            wallet: Pubkey::new_unique(),
            pattern: ScammerPattern::Unknown,
            confidence: 0.0,
            tokens: Vec::new(),
            rugged_tokens: Vec::new(),
            first_seen_ms: 0,
            last_seen_ms: 0,
            total_victims: 0,
            estimated_profit_sol: 0.0,
            connected_wallets: Vec::new(),
            evidence: Vec::new(),
        };

        let mut rugger = base.clone();
        rugger.rugged_tokens = (0..4).map(|_| Pubkey::new_unique()).collect();
        let (pattern, _, confidence) = detect_pattern(&rugger);
        assert_eq!(pattern, ScammerPattern::RugPuller);
        assert!((0.0..=0.95).contains(&confidence));

        let mut coordinator = base.clone();
        coordinator.connected_wallets = (0..5).map(|_| Pubkey::new_unique()).collect();
        assert_eq!(
            detect_pattern(&coordinator).0,
            ScammerPattern::BundleCoordinator
        );

        let mut wash = base.clone();
        wash.tokens = (0..6).map(|_| Pubkey::new_unique()).collect();
        assert_eq!(detect_pattern(&wash).0, ScammerPattern::WashTrader);

        assert_eq!(detect_pattern(&base).0, ScammerPattern::Unknown);
    }

    #[test]
    fn test_repeat_offender_alert_broadcast() {
        let bus = Arc::new(MessageBus::new());
        let (_, mut alert_rx) = bus.subscribe("alert.scammer");
        let mut agent = hunter(Arc::clone(&bus));

        let wallet = Pubkey::new_unique();
        let first = Pubkey::new_unique();
        let second = Pubkey::new_unique();
        agent.track_scammer(first, wallet, &scam_report(first, Some(wallet)));
        agent.track_scammer(second, wallet, &scam_report(second, Some(wallet)));

        // Second rug lifts confidence past the alert floor
        let mut saw_alert = false;
        while let Ok(msg) = alert_rx.try_recv() {
            if let Payload::Alert(alert) = &msg.payload {
                if alert.wallet == Some(wallet) {
                    saw_alert = true;
                }
            }
        }
        assert!(saw_alert);
    }

    #[tokio::test]
    async fn test_wallet_check_round_trip() {
        let bus = Arc::new(MessageBus::new());
        let (_, mut reply_rx) = bus.subscribe("agent.coordinator.wallet_check_result");

        let agent = hunter(Arc::clone(&bus));
        let running = agent.running_flag();
        let handle = tokio::spawn(agent.run());

        let wallet = Pubkey::new_unique();
        let request_id = Uuid::new_v4();
        bus.send_to(
            "hunter-1",
            "check_wallet",
            Payload::WalletCheck {
                wallet,
                reply_to: "coordinator".to_string(),
                request_id,
            },
            "coordinator",
        );

        let msg = tokio::time::timeout(std::time::Duration::from_secs(1), reply_rx.recv())
            .await
            .expect("hunter replies")
            .unwrap();
        match &msg.payload {
            Payload::WalletCheckReply { request_id: id, result } => {
                assert_eq!(*id, request_id);
                assert_eq!(result.wallet, wallet);
                assert!(!result.is_repeat);
            }
            other => panic!("unexpected payload: {other:?}"),
        }

        running.store(false, std::sync::atomic::Ordering::Relaxed);
        bus.send_to(
            "hunter-1",
            "stop",
            Payload::Control(ControlCommand::Stop),
            "coordinator",
        );
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
    }
}
