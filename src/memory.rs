//! Two-tier per-agent memory: short-term log and tagged long-term store
//!
//! Each agent exclusively owns its memory; no locking is needed. Entries
//! are immutable once recorded. Long-term entries are searchable by tag,
//! kind and time window.

use crate::types::now_ms;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Kind of remembered event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Observation,
    Action,
    Outcome,
}

/// Immutable memory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub timestamp_ms: i64,
    pub kind: MemoryKind,
    pub tags: BTreeSet<String>,
    pub payload: serde_json::Value,
}

/// Counts returned by [`AgentMemory::stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub short_term: usize,
    pub long_term: usize,
    pub observations: usize,
    pub actions: usize,
    pub outcomes: usize,
}

/// Default short-term window
pub const DEFAULT_SHORT_CAP: usize = 100;

/// Long-term entry cap; oldest entries are evicted past this
pub const LONG_TERM_CAP: usize = 10_000;

/// Per-agent append-only memory.
///
/// No vector-index backend is wired in this build, so similarity search
/// degrades to tag search, which is the only query path.
pub struct AgentMemory {
    short_term: VecDeque<MemoryRecord>,
    long_term: VecDeque<MemoryRecord>,
    short_cap: usize,
}

impl AgentMemory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SHORT_CAP)
    }

    pub fn with_capacity(short_cap: usize) -> Self {
        Self {
            short_term: VecDeque::with_capacity(short_cap.min(1024)),
            long_term: VecDeque::new(),
            short_cap: short_cap.max(1),
        }
    }

    /// Record an entry in both tiers
    pub fn remember<I, S>(&mut self, kind: MemoryKind, tags: I, payload: serde_json::Value)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let record = MemoryRecord {
            timestamp_ms: now_ms(),
            kind,
            tags: tags.into_iter().map(Into::into).collect(),
            payload,
        };
        self.push_short(record.clone());
        self.push_long(record);
    }

    /// Record an entry in the short-term log only
    pub fn remember_short(&mut self, kind: MemoryKind, payload: serde_json::Value) {
        self.push_short(MemoryRecord {
            timestamp_ms: now_ms(),
            kind,
            tags: BTreeSet::new(),
            payload,
        });
    }

    fn push_short(&mut self, record: MemoryRecord) {
        if self.short_term.len() >= self.short_cap {
            self.short_term.pop_front();
        }
        self.short_term.push_back(record);
    }

    fn push_long(&mut self, record: MemoryRecord) {
        if self.long_term.len() >= LONG_TERM_CAP {
            self.long_term.pop_front();
        }
        self.long_term.push_back(record);
    }

    /// Last `n` short-term entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<&MemoryRecord> {
        let skip = self.short_term.len().saturating_sub(n);
        self.short_term.iter().skip(skip).collect()
    }

    /// Long-term entries carrying the given tag, oldest first
    pub fn by_tag(&self, tag: &str) -> Vec<&MemoryRecord> {
        self.long_term
            .iter()
            .filter(|r| r.tags.contains(tag))
            .collect()
    }

    /// Long-term entries of the given kind, oldest first
    pub fn by_kind(&self, kind: MemoryKind) -> Vec<&MemoryRecord> {
        self.long_term.iter().filter(|r| r.kind == kind).collect()
    }

    /// Long-term entries inside `[from_ms, to_ms]`
    pub fn in_window(&self, from_ms: i64, to_ms: i64) -> Vec<&MemoryRecord> {
        self.long_term
            .iter()
            .filter(|r| r.timestamp_ms >= from_ms && r.timestamp_ms <= to_ms)
            .collect()
    }

    pub fn stats(&self) -> MemoryStats {
        let mut observations = 0;
        let mut actions = 0;
        let mut outcomes = 0;
        for record in &self.long_term {
            match record.kind {
                MemoryKind::Observation => observations += 1,
                MemoryKind::Action => actions += 1,
                MemoryKind::Outcome => outcomes += 1,
            }
        }
        MemoryStats {
            short_term: self.short_term.len(),
            long_term: self.long_term.len(),
            observations,
            actions,
            outcomes,
        }
    }
}

impl Default for AgentMemory {
    fn default() -> Self {
        Self::new()
    }
}
