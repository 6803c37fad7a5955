//! Analyst agent: priority-ordered investigations and verdicts
//!
//! Work arrives as `InvestigationRequest`s on the agent's address, queues
//! up to a bound, and is processed one at a time in priority order. An
//! investigation assembles evidence from the chain collaborator (holders,
//! creator history, bundles) on top of the scout's flags, scores it, and
//! dispatches the verdict: hunters are told to track scammers, traders
//! are offered clean tokens.

use crate::agents::runtime::{Agent, AgentContext, ThoughtKind};
use crate::bus::{ControlCommand, Message, MessageBus, Payload};
use crate::external::{ChainClient, HolderInfo, LlmService};
use crate::goals::GoalTracker;
use crate::memory::MemoryKind;
use crate::metrics::{metrics, Timer};
use crate::types::{
    now_ms, AgentKind, AgentStatusReport, AlertKind, AlertPayload, Bundle, BundleAnalysis, Finding,
    InvestigationReport, InvestigationRequest, Opportunity, RiskFlag, Severity, TokenAnalysis,
    Verdict,
};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Investigation queue bound; further requests are dropped with a log
pub const QUEUE_CAP: usize = 50;

/// Safe verdicts below this score become trader opportunities
pub const OPPORTUNITY_MAX_SCORE: f64 = 30.0;

/// Bundle bucket resolution in supply percent
const BUNDLE_BUCKET_PERCENT: f64 = 0.1;

/// Wallets per bucket before the bucket counts as a bundle
const BUNDLE_MIN_WALLETS: usize = 3;

/// Gini coefficient of a distribution, clamped to `[0, 1]`.
///
/// `0` for `n <= 1` or a zero mean. The raw formula can drift slightly
/// outside the unit interval at very small `n`, hence the clamp.
pub fn gini(values: &[f64]) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if mean == 0.0 {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| (i + 1) as f64 * x)
        .sum();

    let n_f = n as f64;
    let raw = (2.0 * weighted) / (n_f * n_f * mean) - (n_f + 1.0) / n_f;
    raw.clamp(0.0, 1.0)
}

/// Group non-LP holders into 0.1% supply buckets; buckets holding at
/// least three wallets are coordinated bundles.
pub fn analyze_bundles(holders: &[HolderInfo]) -> BundleAnalysis {
    let mut buckets: HashMap<i64, Vec<&HolderInfo>> = HashMap::new();
    for holder in holders.iter().filter(|h| !h.is_lp) {
        let bucket = (holder.percent / BUNDLE_BUCKET_PERCENT).round() as i64;
        buckets.entry(bucket).or_default().push(holder);
    }

    let mut bundles = Vec::new();
    let mut control_percent = 0.0;
    for (bucket, members) in buckets {
        if members.len() >= BUNDLE_MIN_WALLETS {
            let total: f64 = members.iter().map(|h| h.percent).sum();
            control_percent += total;
            bundles.push(Bundle {
                percent_bucket: bucket as f64 * BUNDLE_BUCKET_PERCENT,
                wallets: members.iter().map(|h| h.wallet).collect(),
                total_percent: total,
            });
        }
    }
    bundles.sort_by(|a, b| {
        b.total_percent
            .partial_cmp(&a.total_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    BundleAnalysis {
        detected: !bundles.is_empty(),
        bundles,
        control_percent,
    }
}

/// What the analyst remembers about a creator wallet across investigations
#[derive(Debug, Clone)]
pub struct ScammerSummary {
    pub wallet: Pubkey,
    pub rugged_tokens: Vec<Pubkey>,
    pub last_verdict: Verdict,
    pub last_seen_ms: i64,
}

/// Priority-queue investigator
pub struct AnalystAgent {
    ctx: AgentContext,
    chain: Arc<dyn ChainClient>,
    mailbox: mpsc::UnboundedReceiver<Arc<Message>>,
    queue: Vec<InvestigationRequest>,
    completed: HashMap<Pubkey, InvestigationReport>,
    scammer_db: HashMap<Pubkey, ScammerSummary>,
    is_investigating: bool,
    investigations_done: u64,
    hunters: Vec<String>,
    traders: Vec<String>,
    coordinator: String,
    next_hunter: usize,
    next_trader: usize,
}

impl AnalystAgent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        bus: Arc<MessageBus>,
        goals: Arc<GoalTracker>,
        llm: Option<Arc<dyn LlmService>>,
        chain: Arc<dyn ChainClient>,
        hunters: Vec<String>,
        traders: Vec<String>,
        coordinator: String,
    ) -> Self {
        let (_, mailbox) = bus.subscribe(&format!("agent.{name}.*"));
        Self {
            ctx: AgentContext::new(name, AgentKind::Analyst, bus, goals).with_llm(llm),
            chain,
            mailbox,
            queue: Vec::new(),
            completed: HashMap::new(),
            scammer_db: HashMap::new(),
            is_investigating: false,
            investigations_done: 0,
            hunters,
            traders,
            coordinator,
            next_hunter: 0,
            next_trader: 0,
        }
    }

    pub fn running_flag(&self) -> Arc<std::sync::atomic::AtomicBool> {
        self.ctx.running_flag()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Main loop: drain the mailbox, then either investigate the highest
    /// priority request or wait for work.
    pub async fn run(mut self) {
        info!(agent = %self.ctx.name(), "analyst starting");

        while self.ctx.is_running() {
            while let Ok(msg) = self.mailbox.try_recv() {
                self.handle_message(msg);
            }

            if let Some(request) = self.next_request() {
                self.is_investigating = true;
                self.investigate(request).await;
                self.is_investigating = false;
            } else {
                tokio::select! {
                    maybe_msg = self.mailbox.recv() => match maybe_msg {
                        Some(msg) => self.handle_message(msg),
                        None => break,
                    },
                    _ = tokio::time::sleep(Duration::from_millis(200)) => {}
                }
            }

            tokio::task::yield_now().await;
        }

        info!(agent = %self.ctx.name(), "analyst stopped");
    }

    fn handle_message(&mut self, msg: Arc<Message>) {
        match &msg.payload {
            Payload::Investigate(request) => self.enqueue(request.clone()),
            Payload::Control(ControlCommand::Stop) => self.ctx.stop(),
            Payload::StatusRequest => self.publish_status(),
            Payload::Opaque(value) if msg.topic.ends_with(".query") => {
                self.handle_query(value);
            }
            other => debug!(agent = %self.ctx.name(), "ignoring payload {other:?}"),
        }
    }

    /// Queue a request, dropping when the backlog is at the bound
    pub fn enqueue(&mut self, request: InvestigationRequest) {
        if self.queue.len() >= QUEUE_CAP {
            metrics().investigations_dropped.inc();
            warn!(
                agent = %self.ctx.name(),
                token = %request.token,
                "investigation queue full, request dropped"
            );
            return;
        }
        self.queue.push(request);
        metrics()
            .investigation_queue_depth
            .set(self.queue.len() as i64);
    }

    /// Sort by priority (critical first), FIFO within a priority, pop head
    pub fn next_request(&mut self) -> Option<InvestigationRequest> {
        if self.queue.is_empty() {
            return None;
        }
        self.queue
            .sort_by_key(|r| (r.priority.rank(), r.timestamp_ms));
        let request = self.queue.remove(0);
        metrics()
            .investigation_queue_depth
            .set(self.queue.len() as i64);
        Some(request)
    }

    async fn investigate(&mut self, request: InvestigationRequest) {
        let timer = Timer::new();
        let token = request.token;
        self.ctx.think(
            ThoughtKind::Observation,
            format!(
                "investigating {token} from {} at {:?} priority, inbound score {:.0}",
                request.source, request.priority, request.score
            ),
            None,
        );

        let mut findings: Vec<Finding> = Vec::new();
        let mut score = request.score;
        let mut creator = request.creator;
        let mut mint_disabled = request.features.get(crate::types::feature::MINT_DISABLED) >= 1.0;
        let mut freeze_disabled =
            request.features.get(crate::types::feature::FREEZE_DISABLED) >= 1.0;
        // Invert the scout's log scaling as the degraded fallback
        let mut liquidity_sol = (request.features.get(crate::types::feature::LIQUIDITY_LOG)
            * (1.0 + 1000.0f64).ln())
        .exp_m1()
        .max(0.0);
        let mut mint_checked_on_chain = false;

        // Step 1: token data from RPC. Transient failures degrade to the
        // scout-provided features.
        match self.chain.token_data(&token).await {
            Ok(data) => {
                mint_disabled = data.mint_disabled;
                freeze_disabled = data.freeze_disabled;
                liquidity_sol = data.liquidity_sol;
                mint_checked_on_chain = true;

                self.ctx.think(
                    ThoughtKind::Observation,
                    format!(
                        "token data: liquidity {:.2} SOL, mint_disabled={}, freeze_disabled={}",
                        data.liquidity_sol, data.mint_disabled, data.freeze_disabled
                    ),
                    None,
                );

                if !data.mint_disabled {
                    score += 20.0;
                    findings.push(Finding {
                        category: "authority".to_string(),
                        severity: Severity::Critical,
                        detail: "mint authority still active".to_string(),
                        score_delta: 20.0,
                    });
                }
                if !data.freeze_disabled {
                    score += 15.0;
                    findings.push(Finding {
                        category: "authority".to_string(),
                        severity: Severity::Critical,
                        detail: "freeze authority still active".to_string(),
                        score_delta: 15.0,
                    });
                }
                if data.liquidity_sol < 1.0 {
                    score += 10.0;
                    findings.push(Finding {
                        category: "liquidity".to_string(),
                        severity: Severity::High,
                        detail: format!(
                            "on-chain liquidity {:.2} SOL below 1 SOL",
                            data.liquidity_sol
                        ),
                        score_delta: 10.0,
                    });
                }
            }
            Err(e) => {
                self.ctx.think(
                    ThoughtKind::Reflection,
                    format!("token data unavailable, continuing on scout features: {e}"),
                    None,
                );
            }
        }

        let holders = match self.chain.holders(&token).await {
            Ok(holders) => holders,
            Err(e) => {
                self.ctx.think(
                    ThoughtKind::Reflection,
                    format!("holder list unavailable: {e}"),
                    None,
                );
                Vec::new()
            }
        };

        if creator.is_none() {
            creator = self.chain.token_creator(&token).await.ok();
        }

        // Step 2: bundle detection over non-LP holders
        let bundle_analysis = if holders.is_empty() {
            None
        } else {
            let analysis = analyze_bundles(&holders);
            if analysis.detected {
                self.ctx.think(
                    ThoughtKind::Observation,
                    format!(
                        "{} bundles controlling {:.1}% of supply",
                        analysis.bundles.len(),
                        analysis.control_percent
                    ),
                    None,
                );
                if analysis.control_percent > 30.0 {
                    score += 20.0;
                    findings.push(Finding {
                        category: "bundle".to_string(),
                        severity: Severity::Critical,
                        detail: format!(
                            "coordinated bundles control {:.1}% of supply",
                            analysis.control_percent
                        ),
                        score_delta: 20.0,
                    });
                    self.ctx.bus().broadcast_alert(
                        AlertKind::BundleDetected,
                        AlertPayload {
                            kind: AlertKind::BundleDetected,
                            token: Some(token),
                            wallet: None,
                            detail: format!(
                                "bundles control {:.1}% of supply",
                                analysis.control_percent
                            ),
                            timestamp_ms: now_ms(),
                        },
                        self.ctx.name(),
                    );
                } else if analysis.control_percent > 15.0 {
                    score += 10.0;
                    findings.push(Finding {
                        category: "bundle".to_string(),
                        severity: Severity::High,
                        detail: format!(
                            "coordinated bundles control {:.1}% of supply",
                            analysis.control_percent
                        ),
                        score_delta: 10.0,
                    });
                }
            }
            Some(analysis)
        };

        // Step 3: holder concentration
        if !holders.is_empty() {
            let mut non_lp: Vec<f64> = holders
                .iter()
                .filter(|h| !h.is_lp)
                .map(|h| h.percent)
                .collect();
            non_lp.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

            let holder_gini = gini(&non_lp);
            let top_whale = non_lp.first().copied().unwrap_or(0.0);
            let top10: f64 = non_lp.iter().take(10).sum();

            self.ctx.think(
                ThoughtKind::Observation,
                format!(
                    "holder concentration: gini {holder_gini:.2}, top {top_whale:.1}%, top10 {top10:.1}%"
                ),
                None,
            );

            if top_whale > 50.0 {
                score += 15.0;
                findings.push(Finding {
                    category: "concentration".to_string(),
                    severity: Severity::Critical,
                    detail: format!("single wallet holds {top_whale:.1}% of supply"),
                    score_delta: 15.0,
                });
            }
            if top10 > 90.0 {
                score += 10.0;
                findings.push(Finding {
                    category: "concentration".to_string(),
                    severity: Severity::High,
                    detail: format!("top 10 wallets hold {top10:.1}% of supply"),
                    score_delta: 10.0,
                });
            }
        }

        // Step 4: creator history
        let mut creator_rug_count = 0u32;
        if let Some(creator_wallet) = creator {
            match self.chain.profile_wallet(&creator_wallet).await {
                Ok(profile) => {
                    creator_rug_count = profile.rug_count;
                    if profile.rug_count > 0 {
                        score += 40.0;
                        findings.push(Finding {
                            category: "creator".to_string(),
                            severity: Severity::Critical,
                            detail: format!(
                                "creator {creator_wallet} has {} prior rugs",
                                profile.rug_count
                            ),
                            score_delta: 40.0,
                        });
                    }
                }
                Err(e) => {
                    self.ctx.think(
                        ThoughtKind::Reflection,
                        format!("creator profile unavailable: {e}"),
                        None,
                    );
                }
            }
        }

        // Step 5: replay inbound flags as findings
        for flag in &request.flags {
            let (severity, delta, detail) = match flag {
                RiskFlag::MintActive if !mint_checked_on_chain => {
                    (Severity::Critical, 20.0, "mint authority reported active")
                }
                RiskFlag::FreezeActive if !mint_checked_on_chain => {
                    (Severity::Critical, 15.0, "freeze authority reported active")
                }
                RiskFlag::LowLiquidity => (Severity::Medium, 0.0, "launched with dust liquidity"),
                RiskFlag::PumpMicro => (Severity::Low, 0.0, "pump.fun micro launch"),
                RiskFlag::FastGraduation => {
                    (Severity::Medium, 0.0, "graduated off the curve in minutes")
                }
                RiskFlag::Graduated => (Severity::Info, 0.0, "graduated from a bonding curve"),
                _ => continue,
            };
            score += delta;
            findings.push(Finding {
                category: "flag".to_string(),
                severity,
                detail: format!("{flag}: {detail}"),
                score_delta: delta,
            });
        }

        // Step 6: similarity to known scams
        for similar in &request.similar_tokens {
            if let Some(report) = self.completed.get(similar) {
                if report.verdict == Verdict::Scam {
                    score += 15.0;
                    findings.push(Finding {
                        category: "similarity".to_string(),
                        severity: Severity::High,
                        detail: format!("similar to confirmed scam {similar}"),
                        score_delta: 15.0,
                    });
                }
            }
        }

        let score = score.clamp(0.0, 100.0);
        let verdict = Verdict::from_score(score);
        let confidence = (60.0 + 5.0 * findings.len() as f64).min(95.0);

        let recommendation = match verdict {
            Verdict::Scam | Verdict::Dangerous => {
                "AVOID - high rug probability, do not enter".to_string()
            }
            Verdict::Suspicious => "CAUTION - monitor before considering entry".to_string(),
            Verdict::Safe => "Eligible for entry within strategy limits".to_string(),
        };

        let report = InvestigationReport {
            token,
            creator,
            verdict,
            confidence,
            score,
            summary: format!(
                "{verdict} at score {score:.0} with {} findings",
                findings.len()
            ),
            findings,
            bundle_analysis,
            recommendation,
            timestamp_ms: now_ms(),
        };

        self.ctx.think(
            ThoughtKind::Reasoning,
            format!("verdict {verdict} ({score:.0}/100, confidence {confidence:.0}%)"),
            Some(confidence / 100.0),
        );

        self.ctx.memory.remember(
            MemoryKind::Outcome,
            ["investigation", verdict.as_str()],
            serde_json::json!({
                "token": token.to_string(),
                "score": score,
                "verdict": verdict.as_str(),
            }),
        );

        if let Some(creator_wallet) = creator {
            if matches!(verdict, Verdict::Scam | Verdict::Dangerous) {
                let entry = self
                    .scammer_db
                    .entry(creator_wallet)
                    .or_insert(ScammerSummary {
                        wallet: creator_wallet,
                        rugged_tokens: Vec::new(),
                        last_verdict: verdict,
                        last_seen_ms: now_ms(),
                    });
                if verdict == Verdict::Scam && !entry.rugged_tokens.contains(&token) {
                    entry.rugged_tokens.push(token);
                }
                entry.last_verdict = verdict;
                entry.last_seen_ms = now_ms();
            }
        }

        self.investigations_done += 1;
        metrics().investigations_total.inc();
        if verdict == Verdict::Scam {
            metrics().scams_detected_total.inc();
        }
        timer.observe_duration(&metrics().investigation_latency);

        self.completed.insert(token, report.clone());
        self.dispatch_verdict(&request, report, liquidity_sol, mint_disabled, freeze_disabled, creator_rug_count);
    }

    /// Route the finished report: coordinator always, hunter on scammer
    /// verdicts, trader on clean low-score tokens.
    fn dispatch_verdict(
        &mut self,
        request: &InvestigationRequest,
        report: InvestigationReport,
        liquidity_sol: f64,
        mint_disabled: bool,
        freeze_disabled: bool,
        creator_rug_count: u32,
    ) {
        let name = self.ctx.name().to_string();
        self.ctx.bus().send_to(
            &self.coordinator,
            "investigation_complete",
            Payload::Report(report.clone()),
            &name,
        );

        match report.verdict {
            Verdict::Scam | Verdict::Dangerous => {
                if let Some(hunter) = round_robin(&self.hunters, &mut self.next_hunter) {
                    self.ctx.bus().send_to(
                        &hunter,
                        "track_scammer",
                        Payload::TrackScammer {
                            token: report.token,
                            wallet: report.creator,
                            report: report.clone(),
                        },
                        &name,
                    );
                }

                let alert_kind = if report.creator.is_some() && report.verdict == Verdict::Scam {
                    AlertKind::Scammer
                } else {
                    AlertKind::HighRiskToken
                };
                self.ctx.bus().broadcast_alert(
                    alert_kind,
                    AlertPayload {
                        kind: alert_kind,
                        token: Some(report.token),
                        wallet: report.creator,
                        detail: report.summary.clone(),
                        timestamp_ms: now_ms(),
                    },
                    &name,
                );
            }
            Verdict::Safe if report.score < OPPORTUNITY_MAX_SCORE => {
                if let Some(trader) = round_robin(&self.traders, &mut self.next_trader) {
                    let opportunity = Opportunity {
                        token: report.token,
                        creator: report.creator,
                        pool_address: request.pool_address.unwrap_or_default(),
                        analysis: TokenAnalysis {
                            score: report.score,
                            liquidity_sol,
                            bundle: report.bundle_analysis.clone(),
                            mint_disabled,
                            freeze_disabled,
                            creator_rug_count,
                        },
                        source: name.clone(),
                        timestamp_ms: now_ms(),
                    };
                    self.ctx.bus().send_to(
                        &trader,
                        "opportunity",
                        Payload::Opportunity(opportunity),
                        &name,
                    );
                }
            }
            _ => {}
        }
    }

    fn handle_query(&mut self, value: &serde_json::Value) {
        let response = value
            .get("token")
            .and_then(|t| t.as_str())
            .and_then(|s| s.parse::<Pubkey>().ok())
            .and_then(|token| self.completed.get(&token).cloned());

        let topic = crate::bus::topics::agent(self.ctx.name(), "query.response");
        let payload = match response {
            Some(report) => Payload::Report(report),
            None => Payload::Opaque(serde_json::Value::Null),
        };
        self.ctx
            .bus()
            .publish_simple(&topic, payload, self.ctx.name());
    }

    fn publish_status(&mut self) {
        let report = self.status();
        let topic = crate::bus::topics::agent(self.ctx.name(), "status.response");
        self.ctx
            .bus()
            .publish_simple(&topic, Payload::Status(report), self.ctx.name());
    }
}

fn round_robin(pool: &[String], cursor: &mut usize) -> Option<String> {
    if pool.is_empty() {
        return None;
    }
    let pick = pool[*cursor % pool.len()].clone();
    *cursor = cursor.wrapping_add(1);
    Some(pick)
}

impl Agent for AnalystAgent {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Analyst
    }

    fn status(&self) -> AgentStatusReport {
        self.ctx.status(serde_json::json!({
            "queue_len": self.queue.len(),
            "is_investigating": self.is_investigating,
            "investigations_done": self.investigations_done,
            "known_scammers": self.scammer_db.len(),
        }))
    }

    fn stop(&self) {
        self.ctx.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{rug_shaped_holders, MockChainClient};
    use crate::types::{feature, FeatureVector, Priority};
    use crate::external::{TokenData, WalletProfile};
    use proptest::prelude::*;

    fn request(token: Pubkey, score: f64, priority: Priority) -> InvestigationRequest {
        InvestigationRequest {
            token,
            creator: Some(Pubkey::new_unique()),
            pool_address: Some(Pubkey::new_unique()),
            score,
            flags: vec![RiskFlag::LowLiquidity],
            features: FeatureVector::zeroed(),
            similar_tokens: Vec::new(),
            priority,
            source: "scout-1".to_string(),
            timestamp_ms: now_ms(),
        }
    }

    fn analyst(bus: Arc<MessageBus>, chain: Arc<MockChainClient>) -> AnalystAgent {
        AnalystAgent::new(
            "analyst-1",
            bus,
            Arc::new(GoalTracker::new()),
            None,
            chain,
            vec!["hunter-1".to_string()],
            vec!["trader-1".to_string()],
            "coordinator".to_string(),
        )
    }

    #[test]
    fn test_gini_degenerate_inputs() {
        assert_eq!(gini(&[]), 0.0);
        assert_eq!(gini(&[42.0]), 0.0);
        assert_eq!(gini(&[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_gini_equal_distribution_is_zero() {
        let g = gini(&[5.0, 5.0, 5.0, 5.0]);
        assert!(g.abs() < 1e-9);
    }

    #[test]
    fn test_gini_extreme_inequality() {
        let mut values = vec![0.0; 99];
        values.push(100.0);
        let g = gini(&values);
        assert!(g > 0.95 && g <= 1.0);
    }

    proptest! {
        #[test]
        fn prop_gini_stays_in_unit_interval(values in proptest::collection::vec(0.0f64..1e6, 0..50)) {
            let g = gini(&values);
            prop_assert!((0.0..=1.0).contains(&g));
        }
    }

    #[test]
    fn test_bundle_detection() {
        let holders = rug_shaped_holders(60.0, 7.0, 5);
        let analysis = analyze_bundles(&holders);
        assert!(analysis.detected);
        assert_eq!(analysis.bundles.len(), 1);
        assert_eq!(analysis.bundles[0].wallets.len(), 5);
        assert!((analysis.control_percent - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_bundle_requires_three_wallets() {
        let holders = rug_shaped_holders(60.0, 7.0, 2);
        let analysis = analyze_bundles(&holders);
        assert!(!analysis.detected);
        assert_eq!(analysis.control_percent, 0.0);
    }

    #[test]
    fn test_lp_excluded_from_bundles() {
        let holders = vec![
            HolderInfo { wallet: Pubkey::new_unique(), percent: 2.0, is_lp: true },
            HolderInfo { wallet: Pubkey::new_unique(), percent: 2.0, is_lp: true },
            HolderInfo { wallet: Pubkey::new_unique(), percent: 2.0, is_lp: true },
        ];
        assert!(!analyze_bundles(&holders).detected);
    }

    #[test]
    fn test_priority_ordering_critical_first() {
        let bus = Arc::new(MessageBus::new());
        let mut agent = analyst(bus, Arc::new(MockChainClient::new()));

        let low = request(Pubkey::new_unique(), 20.0, Priority::Low);
        let critical = request(Pubkey::new_unique(), 90.0, Priority::Critical);
        let low_token = low.token;
        let critical_token = critical.token;

        agent.enqueue(low);
        agent.enqueue(critical);

        assert_eq!(agent.next_request().unwrap().token, critical_token);
        assert_eq!(agent.next_request().unwrap().token, low_token);
        assert!(agent.next_request().is_none());
    }

    #[test]
    fn test_queue_bound_drops_excess() {
        let bus = Arc::new(MessageBus::new());
        let mut agent = analyst(bus, Arc::new(MockChainClient::new()));

        for _ in 0..(QUEUE_CAP + 5) {
            agent.enqueue(request(Pubkey::new_unique(), 50.0, Priority::Normal));
        }
        assert_eq!(agent.queue_len(), QUEUE_CAP);
    }

    #[tokio::test]
    async fn test_micro_pump_with_rug_holders_is_scam() {
        let bus = Arc::new(MessageBus::new());
        let chain = Arc::new(MockChainClient::new());
        let (_, mut coordinator_rx) = bus.subscribe("agent.coordinator.investigation_complete");
        let (_, mut hunter_rx) = bus.subscribe("agent.hunter-1.track_scammer");
        let (_, mut alert_rx) = bus.subscribe("alert.*");

        let token = Pubkey::new_unique();
        chain.set_token_data(TokenData {
            token,
            name: None,
            symbol: None,
            supply: 1e9,
            decimals: 6,
            mint_disabled: true,
            freeze_disabled: true,
            created_at_ms: now_ms(),
            liquidity_sol: 0.5,
        });
        chain.set_holders(token, rug_shaped_holders(60.0, 7.0, 5));

        let mut agent = analyst(Arc::clone(&bus), chain);
        // Scout scored the micro-liquidity pump at 30
        agent.investigate(request(token, 30.0, Priority::High)).await;

        let msg = coordinator_rx.try_recv().unwrap();
        let report = match &msg.payload {
            Payload::Report(report) => report.clone(),
            other => panic!("unexpected payload: {other:?}"),
        };

        assert_eq!(report.verdict, Verdict::Scam);
        assert!(report.score >= 80.0);
        assert!(report.recommendation.contains("AVOID"));
        assert!(report.bundle_analysis.as_ref().unwrap().detected);
        assert_eq!(report.confidence, (60.0 + 5.0 * report.findings.len() as f64).min(95.0));

        // Hunter hand-off and alert broadcast happen on scam verdicts
        assert!(hunter_rx.try_recv().is_ok());
        assert!(alert_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_clean_token_becomes_opportunity() {
        let bus = Arc::new(MessageBus::new());
        let chain = Arc::new(MockChainClient::new());
        let (_, mut trader_rx) = bus.subscribe("agent.trader-1.opportunity");

        let token = Pubkey::new_unique();
        // Defaults: healthy liquidity, authorities revoked, clean creator
        let mut req = request(token, 5.0, Priority::Normal);
        req.flags.clear();

        let mut agent = analyst(Arc::clone(&bus), chain);
        agent.investigate(req).await;

        let msg = trader_rx.try_recv().expect("safe token offered to trader");
        match &msg.payload {
            Payload::Opportunity(opp) => {
                assert_eq!(opp.token, token);
                assert!(opp.analysis.score < OPPORTUNITY_MAX_SCORE);
                assert!(opp.analysis.mint_disabled);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repeat_rugger_creator_is_critical() {
        let bus = Arc::new(MessageBus::new());
        let chain = Arc::new(MockChainClient::new());

        let token = Pubkey::new_unique();
        let creator = Pubkey::new_unique();
        chain.set_creator(token, creator);
        chain.set_profile(WalletProfile {
            wallet: creator,
            age_days: 4,
            token_count: 12,
            rug_count: 3,
            funded_by: None,
        });

        let mut req = request(token, 30.0, Priority::High);
        req.creator = Some(creator);

        let mut agent = analyst(Arc::clone(&bus), chain);
        agent.investigate(req).await;

        let report = agent.completed.get(&token).unwrap();
        // 30 base + 40 creator history pushes past the scam line
        assert!(report.score >= 70.0);
        assert!(report
            .findings
            .iter()
            .any(|f| f.category == "creator" && f.severity == Severity::Critical));
        assert!(agent.scammer_db.contains_key(&creator));
    }

    #[tokio::test]
    async fn test_investigation_without_holder_data_still_lands() {
        let bus = Arc::new(MessageBus::new());
        let chain = Arc::new(MockChainClient::new());
        let (_, mut coordinator_rx) = bus.subscribe("agent.coordinator.investigation_complete");

        let mut agent = analyst(Arc::clone(&bus), chain);
        // No scripted holders: steps 2 and 3 are skipped, verdict still lands
        let token = Pubkey::new_unique();
        agent.investigate(request(token, 45.0, Priority::Normal)).await;

        let msg = coordinator_rx.try_recv().unwrap();
        match &msg.payload {
            Payload::Report(report) => {
                assert_eq!(report.token, token);
                assert_eq!(report.verdict, Verdict::from_score(report.score));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_liquidity_fallback_inverts_log_scaling() {
        let mut features = FeatureVector::zeroed();
        let liquidity = 7.5f64;
        features.set(feature::LIQUIDITY_LOG, (1.0 + liquidity).ln() / (1.0 + 1000.0f64).ln());

        let recovered = (features.get(feature::LIQUIDITY_LOG) * (1.0 + 1000.0f64).ln()).exp_m1();
        assert!((recovered - liquidity).abs() < 1e-6);
    }
}
