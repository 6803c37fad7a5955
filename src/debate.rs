//! Structured multi-round consensus on high-impact proposals
//!
//! Round order is fixed: arguments, counters, votes, synthesis. Votes are
//! weighted by each agent's success history; ties break on the 0.6
//! confidence line. Results land on `debate.result` and in a bounded
//! history.

use crate::bus::{topics, MessageBus, Payload};
use crate::external::LlmService;
use crate::metrics::{metrics, Timer};
use crate::types::{
    DebateArgument, DebateDecision, DebateResult, DebateVote, Proposal, ProposalAction, VoteChoice,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// A debate needs at least this many voices
pub const MIN_PARTICIPANTS: usize = 2;

/// Tie-break line: at or above approves, below rejects
pub const APPROVE_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Bounded debate history
pub const HISTORY_CAP: usize = 100;

/// Success score assigned to agents without history
pub const DEFAULT_SUCCESS_SCORE: f64 = 0.5;

/// Orchestrates agreement rounds over the bus
pub struct DebateProtocol {
    bus: Arc<MessageBus>,
    llm: Option<Arc<dyn LlmService>>,
    agent_success: HashMap<String, f64>,
    history: VecDeque<DebateResult>,
    /// BUY proposals at or above this size (SOL) must be debated
    buy_size_threshold_sol: f64,
}

impl DebateProtocol {
    pub fn new(
        bus: Arc<MessageBus>,
        llm: Option<Arc<dyn LlmService>>,
        max_position_size_sol: f64,
    ) -> Self {
        Self {
            bus,
            llm,
            agent_success: HashMap::new(),
            history: VecDeque::new(),
            buy_size_threshold_sol: max_position_size_sol * 0.5,
        }
    }

    /// High-impact trigger: large BUYs and emergency SELLs
    pub fn should_debate(&self, proposal: &Proposal) -> bool {
        match proposal.action {
            ProposalAction::Buy => proposal
                .amount_sol
                .map_or(false, |amount| amount >= self.buy_size_threshold_sol),
            ProposalAction::Sell => proposal
                .context
                .get("emergency")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Run the full round sequence and publish the result
    pub async fn run_debate(&mut self, proposal: Proposal, participants: &[String]) -> DebateResult {
        let timer = Timer::new();
        metrics().debates_total.inc();

        if participants.len() < MIN_PARTICIPANTS {
            let result = DebateResult {
                proposal,
                decision: DebateDecision::Deferred,
                confidence: 0.0,
                consensus_reasoning: format!(
                    "deferred: {} participants, need {MIN_PARTICIPANTS}",
                    participants.len()
                ),
                arguments: Vec::new(),
                counters: Vec::new(),
                votes: Vec::new(),
            };
            self.finish(result.clone());
            return result;
        }

        // Round 1: one argument per participant
        let mut arguments = Vec::with_capacity(participants.len());
        for agent in participants {
            arguments.push(self.argue(agent, &proposal).await);
        }

        // Round 2: each counters a peer's argument
        let mut counters = Vec::with_capacity(participants.len());
        for (idx, agent) in participants.iter().enumerate() {
            let peer_count = arguments.len();
            let target = if peer_count > 1 {
                let offset = 1 + fastrand::usize(0..peer_count - 1);
                &arguments[(idx + offset) % peer_count]
            } else {
                &arguments[idx]
            };
            counters.push(self.counter(agent, &proposal, target).await);
        }

        // Round 3: votes
        let mut votes = Vec::with_capacity(participants.len());
        for agent in participants {
            votes.push(self.vote(agent, &proposal));
        }

        // Synthesis: success-weighted tally
        let mut approve_weight = 0.0;
        let mut reject_weight = 0.0;
        let mut abstain_weight = 0.0;
        let mut weighted_confidence = 0.0;
        let mut total_weight = 0.0;
        for vote in &votes {
            let weight = self.success_score(&vote.agent);
            total_weight += weight;
            weighted_confidence += vote.confidence * weight;
            match vote.vote {
                VoteChoice::Approve => approve_weight += weight,
                VoteChoice::Reject => reject_weight += weight,
                VoteChoice::Abstain => abstain_weight += weight,
            }
        }
        let confidence = if total_weight > 0.0 {
            weighted_confidence / total_weight
        } else {
            0.0
        };

        let decision = if abstain_weight > approve_weight + reject_weight {
            DebateDecision::Deferred
        } else if approve_weight > reject_weight {
            DebateDecision::Approved
        } else if reject_weight > approve_weight {
            DebateDecision::Rejected
        } else if confidence >= APPROVE_CONFIDENCE_THRESHOLD {
            DebateDecision::Approved
        } else {
            DebateDecision::Rejected
        };

        let consensus_reasoning = format!(
            "{decision:?} with approve {approve_weight:.2} / reject {reject_weight:.2} / abstain {abstain_weight:.2}, confidence {confidence:.2}"
        );
        info!(
            proposal = %proposal.id,
            action = ?proposal.action,
            ?decision,
            "debate settled"
        );

        let result = DebateResult {
            proposal,
            decision,
            confidence,
            consensus_reasoning,
            arguments,
            counters,
            votes,
        };
        self.finish(result.clone());
        timer.observe_duration(&metrics().debate_latency);
        result
    }

    fn finish(&mut self, result: DebateResult) {
        self.bus.publish_simple(
            topics::DEBATE_RESULT,
            Payload::DebateOutcome(result.clone()),
            "debate",
        );
        if self.history.len() >= HISTORY_CAP {
            self.history.pop_front();
        }
        self.history.push_back(result);
    }

    async fn argue(&self, agent: &str, proposal: &Proposal) -> DebateArgument {
        if let Some(llm) = &self.llm {
            if llm.is_available() {
                let prompt = format!(
                    "As {agent}, give a one-paragraph argument on whether to {:?} {} ({}).",
                    proposal.action, proposal.target, proposal.reasoning
                );
                if let Ok(step) = llm.reason(&prompt, &[]).await {
                    return DebateArgument {
                        agent: agent.to_string(),
                        content: step.thought,
                        confidence: step.confidence,
                    };
                }
                debug!(agent, "llm argument failed, using rule-based template");
            }
        }

        // Rule-based template keyed off the proposer's own confidence
        let stance = if proposal.confidence >= 0.5 {
            "supports"
        } else {
            "doubts"
        };
        DebateArgument {
            agent: agent.to_string(),
            content: format!(
                "{agent} {stance} {:?} on {}: {}",
                proposal.action, proposal.target, proposal.reasoning
            ),
            confidence: (0.4 + 0.4 * proposal.confidence).clamp(0.0, 1.0),
        }
    }

    async fn counter(
        &self,
        agent: &str,
        proposal: &Proposal,
        target: &DebateArgument,
    ) -> DebateArgument {
        if let Some(llm) = &self.llm {
            if llm.is_available() {
                let prompt = format!(
                    "As {agent}, counter this argument about {:?} {}: {}",
                    proposal.action, proposal.target, target.content
                );
                if let Ok(step) = llm.reason(&prompt, &[]).await {
                    return DebateArgument {
                        agent: agent.to_string(),
                        content: step.thought,
                        confidence: step.confidence,
                    };
                }
            }
        }

        DebateArgument {
            agent: agent.to_string(),
            content: format!(
                "{agent} challenges {}: the confidence of {:.2} may not survive adverse liquidity",
                target.agent, target.confidence
            ),
            confidence: (1.0 - target.confidence * 0.5).clamp(0.0, 1.0),
        }
    }

    fn vote(&self, agent: &str, proposal: &Proposal) -> DebateVote {
        let vote = if proposal.confidence >= APPROVE_CONFIDENCE_THRESHOLD {
            VoteChoice::Approve
        } else if proposal.confidence < 0.4 {
            VoteChoice::Reject
        } else {
            VoteChoice::Abstain
        };
        DebateVote {
            agent: agent.to_string(),
            vote,
            confidence: self.success_score(agent),
        }
    }

    fn success_score(&self, agent: &str) -> f64 {
        self.agent_success
            .get(agent)
            .copied()
            .unwrap_or(DEFAULT_SUCCESS_SCORE)
    }

    /// EWMA update of an agent's success history
    pub fn update_agent_success(&mut self, agent: &str, success: bool) {
        let entry = self
            .agent_success
            .entry(agent.to_string())
            .or_insert(DEFAULT_SUCCESS_SCORE);
        let observed = if success { 1.0 } else { 0.0 };
        *entry = 0.9 * *entry + 0.1 * observed;
    }

    /// Serializable success weights for the learning flush
    pub fn success_weights(&self) -> serde_json::Value {
        serde_json::json!(self.agent_success)
    }

    /// Restore success weights persisted by a previous run
    pub fn load_weights(&mut self, weights: &serde_json::Value) {
        if let Some(map) = weights.as_object() {
            for (agent, value) in map {
                if let Some(score) = value.as_f64() {
                    self.agent_success.insert(agent.clone(), score);
                }
            }
        }
    }

    pub fn history(&self, limit: usize) -> Vec<DebateResult> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::now_ms;
    use uuid::Uuid;

    fn proposal(action: ProposalAction, amount: Option<f64>, confidence: f64) -> Proposal {
        Proposal {
            id: Uuid::new_v4(),
            agent: "trader-1".to_string(),
            action,
            target: "TokenX".to_string(),
            amount_sol: amount,
            reasoning: "momentum entry".to_string(),
            confidence,
            context: serde_json::json!({}),
            timestamp_ms: now_ms(),
        }
    }

    fn protocol() -> DebateProtocol {
        DebateProtocol::new(Arc::new(MessageBus::new()), None, 0.1)
    }

    #[test]
    fn test_should_debate_large_buys_only() {
        let debate = protocol();
        assert!(debate.should_debate(&proposal(ProposalAction::Buy, Some(0.06), 0.8)));
        assert!(!debate.should_debate(&proposal(ProposalAction::Buy, Some(0.01), 0.8)));
        assert!(!debate.should_debate(&proposal(ProposalAction::Buy, None, 0.8)));
        assert!(!debate.should_debate(&proposal(ProposalAction::Track, Some(1.0), 0.8)));
    }

    #[test]
    fn test_should_debate_emergency_sells() {
        let debate = protocol();
        let mut sell = proposal(ProposalAction::Sell, None, 0.9);
        assert!(!debate.should_debate(&sell));
        sell.context = serde_json::json!({ "emergency": true });
        assert!(debate.should_debate(&sell));
    }

    #[tokio::test]
    async fn test_confident_proposal_is_approved() {
        let mut debate = protocol();
        let participants = vec![
            "analyst-1".to_string(),
            "hunter-1".to_string(),
            "trader-1".to_string(),
        ];

        let result = debate
            .run_debate(proposal(ProposalAction::Buy, Some(0.08), 0.9), &participants)
            .await;

        assert_eq!(result.decision, DebateDecision::Approved);
        assert_eq!(result.arguments.len(), 3);
        assert_eq!(result.counters.len(), 3);
        assert_eq!(result.votes.len(), 3);
        assert!(result
            .votes
            .iter()
            .all(|v| v.vote == VoteChoice::Approve));
    }

    #[tokio::test]
    async fn test_weak_proposal_is_rejected() {
        let mut debate = protocol();
        let participants = vec!["analyst-1".to_string(), "trader-1".to_string()];

        let result = debate
            .run_debate(proposal(ProposalAction::Buy, Some(0.08), 0.2), &participants)
            .await;

        assert_eq!(result.decision, DebateDecision::Rejected);
    }

    #[tokio::test]
    async fn test_uncertain_proposal_is_deferred() {
        let mut debate = protocol();
        let participants = vec!["analyst-1".to_string(), "trader-1".to_string()];

        // Mid confidence: all voters abstain
        let result = debate
            .run_debate(proposal(ProposalAction::Buy, Some(0.08), 0.5), &participants)
            .await;

        assert_eq!(result.decision, DebateDecision::Deferred);
    }

    #[tokio::test]
    async fn test_single_participant_is_deferred() {
        let mut debate = protocol();
        let result = debate
            .run_debate(
                proposal(ProposalAction::Buy, Some(0.08), 0.9),
                &["trader-1".to_string()],
            )
            .await;
        assert_eq!(result.decision, DebateDecision::Deferred);
        assert!(result.arguments.is_empty());
    }

    #[tokio::test]
    async fn test_result_published_and_history_bounded() {
        let bus = Arc::new(MessageBus::new());
        let (_, mut result_rx) = bus.subscribe(topics::DEBATE_RESULT);
        let mut debate = DebateProtocol::new(Arc::clone(&bus), None, 0.1);
        let participants = vec!["a".to_string(), "b".to_string()];

        for _ in 0..(HISTORY_CAP + 5) {
            debate
                .run_debate(proposal(ProposalAction::Buy, Some(0.08), 0.9), &participants)
                .await;
        }

        assert_eq!(debate.history(usize::MAX).len(), HISTORY_CAP);
        assert!(result_rx.try_recv().is_ok());
    }

    #[test]
    fn test_success_ewma_and_weight_roundtrip() {
        let mut debate = protocol();
        assert_eq!(debate.success_score("trader-1"), DEFAULT_SUCCESS_SCORE);

        debate.update_agent_success("trader-1", true);
        let after_win = debate.success_score("trader-1");
        assert!((after_win - 0.55).abs() < 1e-9);

        debate.update_agent_success("trader-1", false);
        assert!((debate.success_score("trader-1") - 0.495).abs() < 1e-9);

        let weights = debate.success_weights();
        let mut restored = protocol();
        restored.load_weights(&weights);
        assert!((restored.success_score("trader-1") - 0.495).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_success_weights_shift_outcomes() {
        let mut debate = protocol();
        // trader-1 has a miserable record: its approve barely counts
        for _ in 0..20 {
            debate.update_agent_success("trader-1", false);
        }
        for _ in 0..20 {
            debate.update_agent_success("analyst-1", true);
        }

        // analyst (high weight) votes approve, trader (low weight) approves
        // too; the tally is still an approval but dominated by the analyst
        let result = debate
            .run_debate(
                proposal(ProposalAction::Buy, Some(0.08), 0.9),
                &["analyst-1".to_string(), "trader-1".to_string()],
            )
            .await;
        assert_eq!(result.decision, DebateDecision::Approved);
        let analyst_vote = result.votes.iter().find(|v| v.agent == "analyst-1").unwrap();
        let trader_vote = result.votes.iter().find(|v| v.agent == "trader-1").unwrap();
        assert!(analyst_vote.confidence > trader_vote.confidence);
    }
}
