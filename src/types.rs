//! Common types used throughout the agent runtime

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use uuid::Uuid;

/// Current wall-clock time as epoch milliseconds.
///
/// All persisted and bus-visible timestamps use this representation.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Message and work-item priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Priority {
    /// Scheduling rank: lower sorts first. Critical work is processed
    /// before everything else.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// Venue a token launched on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dex {
    PumpFun,
    RaydiumAmm,
    RaydiumClmm,
    Meteora,
    Unknown,
}

impl Dex {
    pub fn is_raydium(self) -> bool {
        matches!(self, Dex::RaydiumAmm | Dex::RaydiumClmm)
    }
}

/// Token launch observed by the discovery source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchEvent {
    /// Token mint address
    pub token: Pubkey,

    /// Creator wallet
    pub creator: Pubkey,

    /// Slot the launch was observed in
    pub slot: u64,

    /// Observation timestamp (epoch millis)
    pub timestamp_ms: i64,

    /// Venue
    pub dex: Dex,

    /// Pool account
    pub pool_address: Pubkey,

    /// Initial liquidity in SOL, when the source knows it
    pub liquidity_sol: Option<f64>,

    pub token_name: Option<String>,
    pub token_symbol: Option<String>,

    /// Set when the token graduated from a bonding curve venue
    pub graduated_from: Option<Dex>,

    /// Time spent on the bonding curve before graduation (millis)
    pub bonding_curve_time_ms: Option<i64>,
}

/// Named slots of the scout/analyst feature contract.
///
/// The scout fills the launch-derived slots (0-12, 21-25, 28) from the
/// event alone; the holder-shaped slots (13-20, 26-27) stay neutral until
/// an investigation observes chain state. Every component is kept in
/// `[0, 1]`.
pub mod feature {
    pub const LIQUIDITY_LOG: usize = 0;
    pub const LOW_LIQUIDITY: usize = 1;
    pub const MICRO_LIQUIDITY: usize = 2;
    pub const DEX_PUMP_FUN: usize = 3;
    pub const DEX_RAYDIUM: usize = 4;
    pub const GRADUATED: usize = 5;
    pub const FAST_GRADUATION: usize = 6;
    pub const ORGANIC_GRADUATION: usize = 7;
    pub const BONDING_CURVE_TIME: usize = 8;
    pub const LAUNCH_AGE: usize = 9;
    pub const CREATOR_HISTORY: usize = 10;
    pub const MINT_DISABLED: usize = 11;
    pub const FREEZE_DISABLED: usize = 12;
    pub const TOP_HOLDER_PCT: usize = 13;
    pub const TOP5_PCT: usize = 14;
    pub const TOP10_PCT: usize = 15;
    pub const HOLDER_GINI: usize = 16;
    pub const HOLDER_COUNT: usize = 17;
    pub const LP_SHARE: usize = 18;
    pub const BUNDLE_CONTROL: usize = 19;
    pub const BUNDLE_COUNT: usize = 20;
    pub const NAME_PRESENT: usize = 21;
    pub const SYMBOL_PRESENT: usize = 22;
    pub const NAME_LENGTH: usize = 23;
    pub const SLOT_DELTA: usize = 24;
    pub const POOL_KNOWN: usize = 25;
    pub const CREATOR_FUNDING_AGE: usize = 26;
    pub const SIMILAR_SCAM_RATIO: usize = 27;
    pub const RISK_PRIOR: usize = 28;

    /// Fixed feature vector length
    pub const COUNT: usize = 29;
}

/// Fixed-length normalized feature vector shared between scout and analyst
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; feature::COUNT]);

impl FeatureVector {
    pub fn zeroed() -> Self {
        Self([0.0; feature::COUNT])
    }

    /// Set a slot, clamping the value into `[0, 1]`
    pub fn set(&mut self, slot: usize, value: f64) {
        if slot < feature::COUNT {
            self.0[slot] = value.clamp(0.0, 1.0);
        }
    }

    pub fn get(&self, slot: usize) -> f64 {
        self.0.get(slot).copied().unwrap_or(0.0)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// True when every component sits in `[0, 1]`
    pub fn is_normalized(&self) -> bool {
        self.0.iter().all(|v| (0.0..=1.0).contains(v) && v.is_finite())
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Risk flags raised by the scout or observed on chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskFlag {
    LowLiquidity,
    PumpMicro,
    RaydiumEstablished,
    Graduated,
    FastGraduation,
    OrganicGraduation,
    MintActive,
    FreezeActive,
    TopHolderConcentration,
    BundleDetected,
    CreatorHistory,
}

impl RiskFlag {
    /// Wire name used in messages and logs
    pub fn as_str(self) -> &'static str {
        match self {
            RiskFlag::LowLiquidity => "LOW_LIQUIDITY",
            RiskFlag::PumpMicro => "PUMP_MICRO",
            RiskFlag::RaydiumEstablished => "RAYDIUM_ESTABLISHED",
            RiskFlag::Graduated => "GRADUATED",
            RiskFlag::FastGraduation => "FAST_GRADUATION",
            RiskFlag::OrganicGraduation => "ORGANIC_GRADUATION",
            RiskFlag::MintActive => "MINT_ACTIVE",
            RiskFlag::FreezeActive => "FREEZE_ACTIVE",
            RiskFlag::TopHolderConcentration => "TOP_HOLDER_CONCENTRATION",
            RiskFlag::BundleDetected => "BUNDLE_DETECTED",
            RiskFlag::CreatorHistory => "CREATOR_HISTORY",
        }
    }
}

impl std::fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scout output for a single launch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub token: Pubkey,
    pub creator: Pubkey,
    pub pool_address: Pubkey,
    pub dex: Dex,
    pub slot: u64,
    pub features: FeatureVector,
    pub flags: Vec<RiskFlag>,
    /// Coarse suspicion score in `[0, 100]`
    pub score: f64,
    pub suspicious: bool,
    pub liquidity_sol: Option<f64>,
    pub timestamp_ms: i64,
}

/// Work item handed to an analyst
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationRequest {
    pub token: Pubkey,
    pub creator: Option<Pubkey>,
    pub pool_address: Option<Pubkey>,
    pub score: f64,
    pub flags: Vec<RiskFlag>,
    pub features: FeatureVector,
    pub similar_tokens: Vec<Pubkey>,
    pub priority: Priority,
    pub source: String,
    pub timestamp_ms: i64,
}

/// Analyst's final classification of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Safe,
    Suspicious,
    Dangerous,
    Scam,
}

impl Verdict {
    /// Verdict thresholds over the 0-100 risk score
    pub fn from_score(score: f64) -> Self {
        if score < 40.0 {
            Verdict::Safe
        } else if score < 60.0 {
            Verdict::Suspicious
        } else if score < 80.0 {
            Verdict::Dangerous
        } else {
            Verdict::Scam
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Safe => "SAFE",
            Verdict::Suspicious => "SUSPICIOUS",
            Verdict::Dangerous => "DANGEROUS",
            Verdict::Scam => "SCAM",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// Single piece of evidence accumulated during an investigation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub category: String,
    pub severity: Severity,
    pub detail: String,
    /// Contribution to the total risk score
    pub score_delta: f64,
}

/// Group of non-LP holders sitting at (near-)identical supply percentages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    /// Supply percent bucket the wallets cluster at (0.1% resolution)
    pub percent_bucket: f64,
    pub wallets: Vec<Pubkey>,
    pub total_percent: f64,
}

/// Outcome of bundle detection over the holder set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleAnalysis {
    pub detected: bool,
    pub bundles: Vec<Bundle>,
    /// Total supply percent controlled by bundled wallets
    pub control_percent: f64,
}

/// Full investigation report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationReport {
    pub token: Pubkey,
    pub creator: Option<Pubkey>,
    pub verdict: Verdict,
    /// `min(95, 60 + 5 * findings)`
    pub confidence: f64,
    /// Clamped to `[0, 100]`
    pub score: f64,
    pub summary: String,
    pub findings: Vec<Finding>,
    pub bundle_analysis: Option<BundleAnalysis>,
    pub recommendation: String,
    pub timestamp_ms: i64,
}

/// Condensed token view the trader evaluates opportunities against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAnalysis {
    /// Risk score in `[0, 100]`
    pub score: f64,
    pub liquidity_sol: f64,
    pub bundle: Option<BundleAnalysis>,
    pub mint_disabled: bool,
    pub freeze_disabled: bool,
    pub creator_rug_count: u32,
}

/// Behaviour pattern a profiled wallet matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScammerPattern {
    RugPuller,
    BundleCoordinator,
    WashTrader,
    Unknown,
}

/// Long-lived profile of a suspected scammer wallet.
///
/// Mutations are monotonic: `rugged_tokens` only grows, `last_seen_ms`
/// only advances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScammerProfile {
    pub wallet: Pubkey,
    pub pattern: ScammerPattern,
    pub confidence: f64,
    pub tokens: Vec<Pubkey>,
    pub rugged_tokens: Vec<Pubkey>,
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
    pub total_victims: u64,
    pub estimated_profit_sol: f64,
    pub connected_wallets: Vec<Pubkey>,
    pub evidence: Vec<String>,
}

/// Terminal and non-terminal position states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Active,
    Sold,
    Stopped,
    Emergency,
}

/// Persisted exit reason, derived from the textual sell reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Emergency,
    Manual,
}

impl ExitReason {
    /// Map a human-readable sell reason onto the persisted reason code
    pub fn from_reason_text(reason: &str) -> Self {
        let lower = reason.to_lowercase();
        if lower.contains("stop-loss") {
            ExitReason::StopLoss
        } else if lower.contains("take-profit") {
            ExitReason::TakeProfit
        } else if lower.contains("emergency") || lower.contains("scammer") {
            ExitReason::Emergency
        } else {
            // "hold time" and every other manual close
            ExitReason::Manual
        }
    }
}

/// Open or closed trading position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub token: Pubkey,
    pub entry_price: f64,
    pub current_price: f64,
    /// Token amount held
    pub amount: f64,
    pub sol_invested: f64,
    pub entry_time_ms: i64,
    pub strategy: String,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub pnl: f64,
    pub pnl_percent: f64,
    pub status: PositionStatus,
    pub pool_address: Pubkey,
    pub exit_reason: Option<ExitReason>,
    pub exit_time_ms: Option<i64>,
    pub tx_signature: String,
}

impl Position {
    /// Recompute pnl from the current price. `pnl = price·amount − invested`.
    pub fn refresh_pnl(&mut self) {
        self.pnl = self.current_price * self.amount - self.sol_invested;
        self.pnl_percent = if self.sol_invested > 0.0 {
            self.pnl / self.sol_invested * 100.0
        } else {
            0.0
        };
    }

    /// Position invariant: stop below entry, target above entry
    pub fn bounds_valid(&self) -> bool {
        self.stop_loss < self.entry_price && self.entry_price < self.take_profit
    }
}

/// Security conditions a strategy can require of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityRequirement {
    MintDisabled,
    FreezeDisabled,
    CleanCreator,
}

impl SecurityRequirement {
    /// Check the requirement against an analysis snapshot
    pub fn satisfied_by(self, analysis: &TokenAnalysis) -> bool {
        match self {
            SecurityRequirement::MintDisabled => analysis.mint_disabled,
            SecurityRequirement::FreezeDisabled => analysis.freeze_disabled,
            SecurityRequirement::CleanCreator => analysis.creator_rug_count == 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryConditions {
    pub max_score: f64,
    pub min_liquidity_sol: f64,
    pub bundles_allowed: bool,
    pub security_requirements: Vec<SecurityRequirement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitConditions {
    /// e.g. 30.0 for +30%
    pub take_profit_percent: f64,
    /// e.g. 15.0 for -15%
    pub stop_loss_percent: f64,
    pub max_hold_time_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

/// Trading strategy profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub entry: EntryConditions,
    pub exit: ExitConditions,
    /// Base position size in SOL before risk tiering
    pub position_size_sol: f64,
    pub risk_tolerance: RiskTolerance,
}

impl Strategy {
    /// The three built-in profiles, ordered by evaluation preference
    pub fn builtin() -> Vec<Strategy> {
        vec![
            Strategy {
                name: "SAFE_EARLY".to_string(),
                entry: EntryConditions {
                    max_score: 30.0,
                    min_liquidity_sol: 5.0,
                    bundles_allowed: false,
                    security_requirements: vec![
                        SecurityRequirement::MintDisabled,
                        SecurityRequirement::FreezeDisabled,
                        SecurityRequirement::CleanCreator,
                    ],
                },
                exit: ExitConditions {
                    take_profit_percent: 30.0,
                    stop_loss_percent: 15.0,
                    max_hold_time_ms: 24 * 60 * 60 * 1000,
                },
                position_size_sol: 0.05,
                risk_tolerance: RiskTolerance::Low,
            },
            Strategy {
                name: "MOMENTUM".to_string(),
                entry: EntryConditions {
                    max_score: 45.0,
                    min_liquidity_sol: 10.0,
                    bundles_allowed: false,
                    security_requirements: vec![SecurityRequirement::MintDisabled],
                },
                exit: ExitConditions {
                    take_profit_percent: 50.0,
                    stop_loss_percent: 20.0,
                    max_hold_time_ms: 8 * 60 * 60 * 1000,
                },
                position_size_sol: 0.075,
                risk_tolerance: RiskTolerance::Medium,
            },
            Strategy {
                name: "SNIPER".to_string(),
                entry: EntryConditions {
                    max_score: 60.0,
                    min_liquidity_sol: 1.0,
                    bundles_allowed: true,
                    security_requirements: vec![],
                },
                exit: ExitConditions {
                    take_profit_percent: 100.0,
                    stop_loss_percent: 25.0,
                    max_hold_time_ms: 4 * 60 * 60 * 1000,
                },
                position_size_sol: 0.1,
                risk_tolerance: RiskTolerance::High,
            },
        ]
    }
}

/// Position sizing tier derived from the analysis risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeTier {
    Full,
    Half,
    Quarter,
    Skip,
}

impl SizeTier {
    pub fn from_risk_score(score: f64) -> Self {
        if score >= 80.0 {
            SizeTier::Skip
        } else if score >= 60.0 {
            SizeTier::Quarter
        } else if score >= 40.0 {
            SizeTier::Half
        } else {
            SizeTier::Full
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            SizeTier::Full => 1.0,
            SizeTier::Half => 0.5,
            SizeTier::Quarter => 0.25,
            SizeTier::Skip => 0.0,
        }
    }
}

/// Result of evaluating an opportunity against the strategy book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeDecision {
    pub should_buy: bool,
    pub strategy: Option<String>,
    pub position_size_sol: Option<f64>,
    pub reasoning: String,
}

impl TradeDecision {
    pub fn rejected(reasoning: impl Into<String>) -> Self {
        Self {
            should_buy: false,
            strategy: None,
            position_size_sol: None,
            reasoning: reasoning.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Trade completion notice published on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeNotice {
    pub token: Pubkey,
    pub side: TradeSide,
    pub sol_amount: f64,
    pub price: f64,
    pub pnl: Option<f64>,
    pub reason: Option<String>,
    pub strategy: Option<String>,
    pub signature: String,
    /// Emergency exits suppress the alert re-broadcast (they were caused
    /// by one)
    pub emergency: bool,
    pub timestamp_ms: i64,
}

/// Opportunity hand-off from analyst to trader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub token: Pubkey,
    pub creator: Option<Pubkey>,
    pub pool_address: Pubkey,
    pub analysis: TokenAnalysis,
    pub source: String,
    pub timestamp_ms: i64,
}

/// Debate-worthy action proposed by an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalAction {
    Buy,
    Sell,
    Ignore,
    Track,
    Alert,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub agent: String,
    pub action: ProposalAction,
    pub target: String,
    pub amount_sol: Option<f64>,
    pub reasoning: String,
    pub confidence: f64,
    pub context: serde_json::Value,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    Approve,
    Reject,
    Abstain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateArgument {
    pub agent: String,
    pub content: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateVote {
    pub agent: String,
    pub vote: VoteChoice,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebateDecision {
    Approved,
    Rejected,
    Deferred,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateResult {
    pub proposal: Proposal,
    pub decision: DebateDecision,
    pub confidence: f64,
    pub consensus_reasoning: String,
    pub arguments: Vec<DebateArgument>,
    pub counters: Vec<DebateArgument>,
    pub votes: Vec<DebateVote>,
}

/// Streamed pool price update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub pool_address: Pubkey,
    pub token: Pubkey,
    pub price: f64,
    pub liquidity_sol: f64,
    pub timestamp_ms: i64,
}

/// Broadcast alert categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Scammer,
    HighRiskToken,
    BundleDetected,
    Emergency,
}

impl AlertKind {
    /// Topic suffix under `alert.`
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::Scammer => "scammer",
            AlertKind::HighRiskToken => "high_risk_token",
            AlertKind::BundleDetected => "bundle_detected",
            AlertKind::Emergency => "emergency",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub kind: AlertKind,
    pub token: Option<Pubkey>,
    pub wallet: Option<Pubkey>,
    pub detail: String,
    pub timestamp_ms: i64,
}

/// Severity of a user-facing alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserAlertLevel {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAlert {
    pub level: UserAlertLevel,
    pub message: String,
    pub timestamp_ms: i64,
}

/// Post-hoc market classification of a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketOutcome {
    Rug,
    Dump,
    Moon,
    Stable,
}

/// Verdict awaiting an outcome check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub token: Pubkey,
    /// Analyst that produced the verdict; outcomes feed its success score
    pub agent: String,
    pub verdict: Verdict,
    pub score: f64,
    pub confidence: f64,
    pub predicted_at_ms: i64,
    pub outcome: Option<MarketOutcome>,
    pub checked_at_ms: Option<i64>,
}

impl Prediction {
    /// A scam/dangerous verdict is confirmed by a rug or dump; a safe
    /// verdict by a stable or mooning market.
    pub fn outcome_matches(&self, outcome: MarketOutcome) -> bool {
        match self.verdict {
            Verdict::Scam | Verdict::Dangerous => {
                matches!(outcome, MarketOutcome::Rug | MarketOutcome::Dump)
            }
            Verdict::Safe => matches!(outcome, MarketOutcome::Stable | MarketOutcome::Moon),
            Verdict::Suspicious => !matches!(outcome, MarketOutcome::Moon),
        }
    }
}

/// Reply to a wallet check request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletCheckResult {
    pub wallet: Pubkey,
    pub is_repeat: bool,
    pub rug_count: u32,
    pub pattern: Option<ScammerPattern>,
}

impl WalletCheckResult {
    /// Default returned when the hunter does not reply in time
    pub fn unknown(wallet: Pubkey) -> Self {
        Self {
            wallet,
            is_repeat: false,
            rug_count: 0,
            pattern: None,
        }
    }
}

/// Agent families hosted by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Scout,
    Analyst,
    Hunter,
    Trader,
}

impl AgentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Scout => "scout",
            AgentKind::Analyst => "analyst",
            AgentKind::Hunter => "hunter",
            AgentKind::Trader => "trader",
        }
    }
}

/// Status snapshot an agent publishes on request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatusReport {
    pub name: String,
    pub kind: AgentKind,
    pub running: bool,
    pub thought_count: usize,
    pub detail: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_thresholds() {
        assert_eq!(Verdict::from_score(0.0), Verdict::Safe);
        assert_eq!(Verdict::from_score(39.9), Verdict::Safe);
        assert_eq!(Verdict::from_score(40.0), Verdict::Suspicious);
        assert_eq!(Verdict::from_score(59.9), Verdict::Suspicious);
        assert_eq!(Verdict::from_score(60.0), Verdict::Dangerous);
        assert_eq!(Verdict::from_score(79.9), Verdict::Dangerous);
        assert_eq!(Verdict::from_score(80.0), Verdict::Scam);
        assert_eq!(Verdict::from_score(100.0), Verdict::Scam);
    }

    #[test]
    fn test_priority_rank_ordering() {
        let mut priorities = vec![
            Priority::Low,
            Priority::Critical,
            Priority::Normal,
            Priority::High,
        ];
        priorities.sort_by_key(|p| p.rank());
        assert_eq!(
            priorities,
            vec![
                Priority::Critical,
                Priority::High,
                Priority::Normal,
                Priority::Low
            ]
        );
    }

    #[test]
    fn test_exit_reason_from_text() {
        assert_eq!(
            ExitReason::from_reason_text("Stop-loss triggered"),
            ExitReason::StopLoss
        );
        assert_eq!(
            ExitReason::from_reason_text("Take-profit triggered"),
            ExitReason::TakeProfit
        );
        assert_eq!(
            ExitReason::from_reason_text("Emergency exit - scammer detected"),
            ExitReason::Emergency
        );
        assert_eq!(
            ExitReason::from_reason_text("Max hold time reached"),
            ExitReason::Manual
        );
    }

    #[test]
    fn test_feature_vector_clamps() {
        let mut fv = FeatureVector::zeroed();
        fv.set(feature::LIQUIDITY_LOG, 3.5);
        fv.set(feature::LOW_LIQUIDITY, -0.5);
        assert_eq!(fv.get(feature::LIQUIDITY_LOG), 1.0);
        assert_eq!(fv.get(feature::LOW_LIQUIDITY), 0.0);
        assert!(fv.is_normalized());
        assert_eq!(fv.as_slice().len(), feature::COUNT);
    }

    #[test]
    fn test_size_tier_boundaries() {
        assert_eq!(SizeTier::from_risk_score(85.0), SizeTier::Skip);
        assert_eq!(SizeTier::from_risk_score(80.0), SizeTier::Skip);
        assert_eq!(SizeTier::from_risk_score(79.9), SizeTier::Quarter);
        assert_eq!(SizeTier::from_risk_score(60.0), SizeTier::Quarter);
        assert_eq!(SizeTier::from_risk_score(59.9), SizeTier::Half);
        assert_eq!(SizeTier::from_risk_score(40.0), SizeTier::Half);
        assert_eq!(SizeTier::from_risk_score(39.9), SizeTier::Full);
        assert_eq!(SizeTier::from_risk_score(0.0), SizeTier::Full);
    }

    #[test]
    fn test_builtin_strategies_are_sound() {
        let strategies = Strategy::builtin();
        assert_eq!(strategies.len(), 3);
        for s in &strategies {
            assert!(s.exit.take_profit_percent > 0.0, "{}", s.name);
            assert!(
                s.exit.stop_loss_percent > 0.0 && s.exit.stop_loss_percent < 100.0,
                "{}",
                s.name
            );
            assert!(s.exit.max_hold_time_ms > 0, "{}", s.name);
            assert!(s.position_size_sol > 0.0, "{}", s.name);
        }
        // SNIPER holds at most 4 hours
        let sniper = strategies.iter().find(|s| s.name == "SNIPER").unwrap();
        assert_eq!(sniper.exit.max_hold_time_ms, 4 * 60 * 60 * 1000);
    }

    #[test]
    fn test_position_pnl_identity() {
        let mut position = Position {
            id: "p1".to_string(),
            token: Pubkey::new_unique(),
            entry_price: 0.0001,
            current_price: 0.00012,
            amount: 1_000.0,
            sol_invested: 0.1,
            entry_time_ms: now_ms(),
            strategy: "SAFE_EARLY".to_string(),
            stop_loss: 0.000085,
            take_profit: 0.00013,
            pnl: 0.0,
            pnl_percent: 0.0,
            status: PositionStatus::Active,
            pool_address: Pubkey::new_unique(),
            exit_reason: None,
            exit_time_ms: None,
            tx_signature: "sim_test".to_string(),
        };
        position.refresh_pnl();
        assert!((position.pnl - (0.00012 * 1_000.0 - 0.1)).abs() < 1e-12);
        assert!(position.bounds_valid());
    }

    #[test]
    fn test_prediction_outcome_matching() {
        let prediction = Prediction {
            token: Pubkey::new_unique(),
            agent: "analyst-1".to_string(),
            verdict: Verdict::Scam,
            score: 85.0,
            confidence: 90.0,
            predicted_at_ms: now_ms(),
            outcome: None,
            checked_at_ms: None,
        };
        assert!(prediction.outcome_matches(MarketOutcome::Rug));
        assert!(!prediction.outcome_matches(MarketOutcome::Moon));
    }
}
