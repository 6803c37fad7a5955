//! Error taxonomies and retry policies shared across the runtime

use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use thiserror::Error;

/// Errors raised inside an agent's runtime
#[derive(Debug, Error)]
pub enum AgentError {
    /// Action referenced a tool that was never registered
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Tool executor returned an error
    #[error("tool '{tool}' failed: {source}")]
    ToolFailed {
        tool: String,
        #[source]
        source: anyhow::Error,
    },

    /// LLM reasoning call exceeded its deadline
    #[error("llm reasoning timed out after {0}ms")]
    LlmTimeout(u64),

    /// Work queue is at capacity, request dropped
    #[error("queue full ({0} entries), request dropped")]
    QueueFull(usize),

    /// Self-imposed rate limit refused the work item
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Agent is shutting down
    #[error("agent stopped")]
    Stopped,
}

/// Errors raised by the trader's position lifecycle.
///
/// These map to the "invariant violation" class: the operation is rejected
/// with a reasoned refusal, the agent keeps running.
#[derive(Debug, Error)]
pub enum TradeError {
    #[error("daily trade limit reached ({0})")]
    DailyLimitReached(u32),

    #[error("position already open for token {0}")]
    DuplicatePosition(Pubkey),

    #[error("max concurrent positions reached ({0})")]
    MaxPositionsReached(usize),

    #[error("insufficient balance: need {need} SOL, have {have} SOL")]
    InsufficientBalance { need: f64, have: f64 },

    #[error("no quote available for token {0}")]
    QuoteUnavailable(Pubkey),

    #[error("swap failed: {0}")]
    SwapFailed(String),

    #[error("no position open for token {0}")]
    PositionNotFound(Pubkey),
}

/// Persistence failures. Logged and never allowed to block in-memory state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record not found: {0}")]
    NotFound(String),
}

/// Dashboard push failures
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("dashboard rejected batch with status {0}")]
    Rejected(u16),

    #[error("event buffer full, event dropped")]
    Overflow,
}

/// Exponential backoff with jitter for retry loops on transient external
/// failures (RPC and HTTP timeouts, 5xx).
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    current_attempt: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy
    pub fn new(initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            current_attempt: 0,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Get the next backoff duration with jitter (±20%)
    pub fn next_backoff(&mut self) -> Duration {
        let backoff_ms = (self.initial_backoff_ms * 2_u64.pow(self.current_attempt))
            .min(self.max_backoff_ms);

        self.current_attempt += 1;

        let jitter = (backoff_ms / 5).max(1);
        let jitter_amount = fastrand::i64(-(jitter as i64)..=jitter as i64);
        let final_backoff = (backoff_ms as i64 + jitter_amount).max(0) as u64;

        Duration::from_millis(final_backoff)
    }

    /// Reset the backoff to initial state
    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }

    /// Get current attempt number
    pub fn attempt(&self) -> u32 {
        self.current_attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_growth() {
        let mut backoff = ExponentialBackoff::new(100, 5000);

        let delay1 = backoff.next_backoff();
        assert!(delay1.as_millis() >= 80 && delay1.as_millis() <= 120); // 100ms ± 20%

        let delay2 = backoff.next_backoff();
        assert!(delay2.as_millis() >= 160 && delay2.as_millis() <= 240); // 200ms ± 20%

        backoff.reset();
        let delay3 = backoff.next_backoff();
        assert!(delay3.as_millis() >= 80 && delay3.as_millis() <= 120);
    }

    #[test]
    fn test_backoff_max_limit() {
        let mut backoff = ExponentialBackoff::new(1000, 5000);

        for _ in 0..10 {
            let delay = backoff.next_backoff();
            assert!(delay.as_millis() <= 6000); // 5000ms + jitter
        }
    }

    #[test]
    fn test_trade_error_display() {
        let err = TradeError::InsufficientBalance {
            need: 0.1,
            have: 0.05,
        };
        assert!(err.to_string().contains("0.1"));
        assert!(err.to_string().contains("0.05"));
    }
}
