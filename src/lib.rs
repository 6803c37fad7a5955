//! Argus - autonomous multi-agent coordination runtime for a real-time
//! token-risk pipeline
//!
//! Specialist agents (scout, analyst, hunter, trader) run as cooperative
//! tasks, communicate through a topic-addressable message bus, and drive
//! the pipeline discovery -> investigation -> scammer profiling ->
//! position management. The coordinator owns the component graph and the
//! periodic housekeeping timers.

// Message bus and typed payloads
pub mod bus;

// Shared domain types
pub mod types;

// Error taxonomies and retry policies
pub mod errors;

// Per-agent memory tiers
pub mod memory;

// Goal tracking
pub mod goals;

// Prometheus metrics registry
pub mod metrics;

// Specialist agents and the shared runtime
pub mod agents;

// Multi-agent consensus protocol
pub mod debate;

// Component graph owner and periodic timers
pub mod coordinator;

// Configuration loading
pub mod config;

// External collaborator traits, persistence, dashboard sink
pub mod external;

// Test-only mock collaborators (gated inside the module)
pub mod test_utils;

// Re-export commonly used types
pub use bus::{Message, MessageBus, Payload};
pub use config::AppConfig;
pub use coordinator::Coordinator;
pub use solana_sdk::pubkey::Pubkey;
