//! Topic-addressable message bus with wildcard routing and bounded history
//!
//! Agents never share state directly; every cross-agent interaction is a
//! `Message` published here. Topics are dotted paths (`agent.scout-1.launch`),
//! subscriptions are exact topics, prefix wildcards (`agent.scout-1.*`,
//! `agent.*`) or the global `*` sink. Delivery is at-most-once, best-effort,
//! in-process: a subscriber that went away is pruned, never an error to the
//! publisher.

use crate::metrics::metrics;
use crate::types::{
    now_ms, AgentStatusReport, AlertKind, AlertPayload, DebateResult, InvestigationReport,
    InvestigationRequest, LaunchEvent, Opportunity, PriceUpdate, Priority, Proposal, ScanResult,
    TradeNotice, UserAlert, WalletCheckResult,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

/// Well-known topic names and prefixes
pub mod topics {
    pub const DISCOVERY_NEW: &str = "discovery.new";
    pub const PRICE_UPDATE: &str = "price.update";
    pub const SYSTEM_STARTED: &str = "system.started";
    pub const SYSTEM_STOPPING: &str = "system.stopping";
    pub const DEBATE_REQUEST: &str = "debate.request";
    pub const DEBATE_RESULT: &str = "debate.result";
    pub const USER_ALERT: &str = "user.alert";

    /// Direct agent address: `agent.<name>.<kind>`
    pub fn agent(name: &str, kind: &str) -> String {
        format!("agent.{name}.{kind}")
    }

    /// Alert broadcast topic: `alert.<kind>`
    pub fn alert(kind: &str) -> String {
        format!("alert.{kind}")
    }
}

/// Lifecycle commands deliverable to any agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlCommand {
    Stop,
    Pause,
    Resume,
}

/// Typed message payload, one variant per well-known topic family.
///
/// Subscribers match on the variant they accept and drop the rest;
/// `Opaque` carries user-defined payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    Launch(LaunchEvent),
    ScanResult(ScanResult),
    Investigate(InvestigationRequest),
    Report(InvestigationReport),
    Opportunity(Opportunity),
    Price(PriceUpdate),
    TrackScammer {
        token: Pubkey,
        wallet: Option<Pubkey>,
        report: InvestigationReport,
    },
    WalletCheck {
        wallet: Pubkey,
        reply_to: String,
        request_id: Uuid,
    },
    WalletCheckReply {
        request_id: Uuid,
        result: WalletCheckResult,
    },
    Trade(TradeNotice),
    Alert(AlertPayload),
    UserNotice(UserAlert),
    DebateRequest(Proposal),
    DebateOutcome(DebateResult),
    StatusRequest,
    Status(AgentStatusReport),
    Control(ControlCommand),
    SellRequest {
        token: Pubkey,
        reason: String,
    },
    Opaque(serde_json::Value),
}

/// Immutable bus message. Stamped once at publish time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub topic: String,
    pub from: String,
    pub to: Option<String>,
    pub payload: Payload,
    pub timestamp_ms: i64,
    /// Transport QoS hint only; delivery order within a topic stays FIFO
    pub priority: Priority,
}

/// Bounded message history size
pub const HISTORY_CAP: usize = 1000;

pub type SubscriptionId = u64;

struct Subscriber {
    id: SubscriptionId,
    tx: mpsc::UnboundedSender<Arc<Message>>,
}

/// In-process publish/subscribe hub.
///
/// The subscriber table is the only shared mutable structure in the system
/// and is guarded here; history reads hand out snapshot copies.
pub struct MessageBus {
    subscribers: RwLock<HashMap<String, Vec<Subscriber>>>,
    history: Mutex<VecDeque<Arc<Message>>>,
    next_sub_id: AtomicU64,
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::with_capacity(HISTORY_CAP)),
            next_sub_id: AtomicU64::new(1),
        }
    }

    /// Publish a message. Returns the stamped message id.
    ///
    /// Fan-out covers the exact topic, every wildcard prefix level
    /// (`a.b.c` also reaches `a.b.*` and `a.*`), partial-segment globs
    /// (`agent.scout-*.scan_result`), and the global `*` sink. A matching
    /// subscription receives the message exactly once.
    pub fn publish(
        &self,
        topic: &str,
        payload: Payload,
        from: &str,
        to: Option<&str>,
        priority: Priority,
    ) -> Uuid {
        let message = Arc::new(Message {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            from: from.to_string(),
            to: to.map(str::to_string),
            payload,
            timestamp_ms: now_ms(),
            priority,
        });

        {
            let mut history = self.history.lock();
            if history.len() >= HISTORY_CAP {
                history.pop_front();
            }
            history.push_back(Arc::clone(&message));
        }

        metrics().bus_messages_total.inc();
        trace!(topic, from, "bus publish");

        let mut dead: Vec<(String, SubscriptionId)> = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for (pattern, subs) in subscribers.iter() {
                if !Self::pattern_matches(pattern, topic) {
                    continue;
                }
                for sub in subs {
                    if sub.tx.send(Arc::clone(&message)).is_err() {
                        dead.push((pattern.clone(), sub.id));
                    }
                }
            }
        }

        if !dead.is_empty() {
            let mut subscribers = self.subscribers.write();
            for (pattern, id) in dead {
                debug!(%pattern, id, "pruning closed bus subscription");
                metrics().bus_messages_dropped.inc();
                if let Some(subs) = subscribers.get_mut(&pattern) {
                    subs.retain(|s| s.id != id);
                    if subs.is_empty() {
                        subscribers.remove(&pattern);
                    }
                }
            }
        }

        message.id
    }

    /// Publish with default priority and no direct addressee
    pub fn publish_simple(&self, topic: &str, payload: Payload, from: &str) -> Uuid {
        self.publish(topic, payload, from, None, Priority::Normal)
    }

    /// Direct-address an agent: publishes to `agent.<agent>.<kind>`
    pub fn send_to(&self, agent: &str, kind: &str, payload: Payload, from: &str) -> Uuid {
        self.publish(
            &topics::agent(agent, kind),
            payload,
            from,
            Some(agent),
            Priority::Normal,
        )
    }

    /// Broadcast a critical alert on `alert.<kind>`
    pub fn broadcast_alert(&self, kind: AlertKind, payload: AlertPayload, from: &str) -> Uuid {
        self.publish(
            &topics::alert(kind.as_str()),
            Payload::Alert(payload),
            from,
            None,
            Priority::Critical,
        )
    }

    /// Subscribe to an exact topic, a `<prefix>.*` wildcard, or `*`.
    ///
    /// The returned receiver sees matching messages in publish order.
    pub fn subscribe(
        &self,
        pattern: &str,
    ) -> (SubscriptionId, mpsc::UnboundedReceiver<Arc<Message>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .entry(pattern.to_string())
            .or_default()
            .push(Subscriber { id, tx });
        (id, rx)
    }

    /// Drop a subscription. Idempotent.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|_, subs| {
            subs.retain(|s| s.id != id);
            !subs.is_empty()
        });
    }

    /// Number of live subscriptions whose pattern matches `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers
            .read()
            .iter()
            .filter(|(pattern, _)| Self::pattern_matches(pattern, topic))
            .map(|(_, subs)| subs.len())
            .sum()
    }

    /// Most recent messages, oldest first, up to `limit`
    pub fn history(&self, limit: usize) -> Vec<Arc<Message>> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    /// Drop the retained history. Diagnostics only.
    pub fn clear(&self) {
        self.history.lock().clear();
    }

    /// Whether a subscription pattern covers a concrete topic.
    ///
    /// A trailing `*` segment swallows any non-empty suffix; a mid-path
    /// `*` matches one segment; a segment ending in `*` (`scout-*`)
    /// matches one segment with that prefix.
    fn pattern_matches(pattern: &str, topic: &str) -> bool {
        if pattern == "*" || pattern == topic {
            return true;
        }

        let pattern_segments: Vec<&str> = pattern.split('.').collect();
        let topic_segments: Vec<&str> = topic.split('.').collect();

        for (i, segment) in pattern_segments.iter().enumerate() {
            if *segment == "*" {
                if i == pattern_segments.len() - 1 {
                    return topic_segments.len() > i;
                }
                if topic_segments.len() <= i {
                    return false;
                }
                continue;
            }
            let matched = match topic_segments.get(i) {
                Some(topic_segment) => match segment.strip_suffix('*') {
                    Some(prefix) => topic_segment.starts_with(prefix),
                    None => topic_segment == segment,
                },
                None => false,
            };
            if !matched {
                return false;
            }
        }

        pattern_segments.len() == topic_segments.len()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(n: u64) -> Payload {
        Payload::Opaque(serde_json::json!({ "n": n }))
    }

    #[test]
    fn test_wildcard_fanout_exactly_once() {
        let bus = MessageBus::new();
        let (_, mut exact_rx) = bus.subscribe("agent.scout-1.scan_result");
        let (_, mut pool_rx) = bus.subscribe("agent.scout-*.scan_result");
        let (_, mut prefix_rx) = bus.subscribe("agent.scout-1.*");
        let (_, mut global_rx) = bus.subscribe("*");

        bus.publish_simple("agent.scout-1.scan_result", opaque(1), "test");

        assert!(exact_rx.try_recv().is_ok());
        assert!(pool_rx.try_recv().is_ok());
        assert!(prefix_rx.try_recv().is_ok());
        assert!(global_rx.try_recv().is_ok());

        // Each subscription was notified exactly once
        assert!(exact_rx.try_recv().is_err());
        assert!(pool_rx.try_recv().is_err());
        assert!(prefix_rx.try_recv().is_err());
        assert!(global_rx.try_recv().is_err());
    }

    #[test]
    fn test_segment_glob_scoping() {
        let bus = MessageBus::new();
        let (_, mut pool_rx) = bus.subscribe("agent.scout-*.scan_result");

        // Other agent kinds and other suffixes stay out
        bus.publish_simple("agent.trader-1.scan_result", opaque(1), "test");
        bus.publish_simple("agent.scout-1.launch", opaque(2), "test");
        assert!(pool_rx.try_recv().is_err());

        bus.publish_simple("agent.scout-7.scan_result", opaque(3), "test");
        assert!(pool_rx.try_recv().is_ok());
    }

    #[test]
    fn test_multi_segment_wildcard() {
        let bus = MessageBus::new();
        let (_, mut rx) = bus.subscribe("agent.*");

        bus.publish_simple("agent.scout-1.scan_result", opaque(1), "test");

        let msg = rx.try_recv().expect("agent.* covers multi-segment suffix");
        assert_eq!(msg.topic, "agent.scout-1.scan_result");
    }

    #[test]
    fn test_wildcard_does_not_match_bare_prefix() {
        let bus = MessageBus::new();
        let (_, mut rx) = bus.subscribe("agent.*");

        bus.publish_simple("agent", opaque(1), "test");
        assert!(rx.try_recv().is_err());

        // A different root must not leak either
        bus.publish_simple("agentx.foo", opaque(2), "test");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_fifo_within_topic() {
        let bus = MessageBus::new();
        let (_, mut rx) = bus.subscribe("discovery.new");

        for n in 0..10u64 {
            bus.publish_simple("discovery.new", opaque(n), "test");
        }

        for expected in 0..10u64 {
            let msg = rx.try_recv().unwrap();
            match &msg.payload {
                Payload::Opaque(v) => assert_eq!(v["n"], expected),
                other => panic!("unexpected payload: {other:?}"),
            }
        }
    }

    #[test]
    fn test_send_to_addresses_agent() {
        let bus = MessageBus::new();
        let (_, mut rx) = bus.subscribe("agent.trader-1.opportunity");

        bus.send_to("trader-1", "opportunity", opaque(7), "analyst-1");

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.topic, "agent.trader-1.opportunity");
        assert_eq!(msg.to.as_deref(), Some("trader-1"));
        assert_eq!(msg.from, "analyst-1");
    }

    #[test]
    fn test_broadcast_alert_is_critical() {
        let bus = MessageBus::new();
        let (_, mut rx) = bus.subscribe("alert.*");

        bus.broadcast_alert(
            AlertKind::Scammer,
            AlertPayload {
                kind: AlertKind::Scammer,
                token: None,
                wallet: Some(Pubkey::new_unique()),
                detail: "repeat offender".to_string(),
                timestamp_ms: now_ms(),
            },
            "hunter-1",
        );

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.topic, "alert.scammer");
        assert_eq!(msg.priority, Priority::Critical);
    }

    #[test]
    fn test_history_bounded() {
        let bus = MessageBus::new();
        for n in 0..(HISTORY_CAP as u64 + 50) {
            bus.publish_simple("discovery.new", opaque(n), "test");
        }

        let history = bus.history(usize::MAX);
        assert_eq!(history.len(), HISTORY_CAP);
        // Oldest entries were evicted
        match &history[0].payload {
            Payload::Opaque(v) => assert_eq!(v["n"], 50),
            other => panic!("unexpected payload: {other:?}"),
        }

        bus.clear();
        assert!(bus.history(10).is_empty());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = MessageBus::new();
        let (id, mut rx) = bus.subscribe("discovery.new");

        bus.publish_simple("discovery.new", opaque(1), "test");
        assert!(rx.try_recv().is_ok());

        bus.unsubscribe(id);
        bus.publish_simple("discovery.new", opaque(2), "test");
        assert!(rx.try_recv().is_err());
        assert_eq!(bus.subscriber_count("discovery.new"), 0);
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let bus = MessageBus::new();
        {
            let (_, _rx) = bus.subscribe("discovery.new");
        } // receiver dropped

        assert_eq!(bus.subscriber_count("discovery.new"), 1);
        // The next publish notices the closed channel and prunes it
        bus.publish_simple("discovery.new", opaque(1), "test");
        assert_eq!(bus.subscriber_count("discovery.new"), 0);
    }

    #[test]
    fn test_subscriber_count_counts_wildcards() {
        let bus = MessageBus::new();
        let (_, _a) = bus.subscribe("agent.scout-1.scan_result");
        let (_, _b) = bus.subscribe("agent.scout-1.*");
        let (_, _c) = bus.subscribe("agent.scout-*.scan_result");
        let (_, _d) = bus.subscribe("agent.*");
        let (_, _e) = bus.subscribe("*");
        let (_, _f) = bus.subscribe("alert.*");

        assert_eq!(bus.subscriber_count("agent.scout-1.scan_result"), 5);
        assert_eq!(bus.subscriber_count("alert.scammer"), 2);
    }

    #[tokio::test]
    async fn test_async_delivery() {
        let bus = Arc::new(MessageBus::new());
        let (_, mut rx) = bus.subscribe("discovery.new");

        let publisher = Arc::clone(&bus);
        tokio::spawn(async move {
            publisher.publish_simple("discovery.new", opaque(42), "test");
        });

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.topic, "discovery.new");
    }
}
