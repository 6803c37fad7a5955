// Specialist agents and the shared runtime
pub mod runtime; // AgentContext: thoughts, tools, reasoning loop, lifecycle flags
pub mod scout; // Launch scanning, 29-slot features, suspicion scoring
pub mod analyst; // Priority investigation queue, evidence, verdicts
pub mod hunter; // Scammer profiles, wallet network, watchlist
pub mod trader; // Opportunity evaluation, position lifecycle, exit triggers

// Re-export the agent surface
pub use analyst::AnalystAgent;
pub use hunter::HunterAgent;
pub use runtime::{Agent, AgentContext, AgentHandle, Thought, ThoughtKind, Tool};
pub use scout::ScoutAgent;
pub use trader::TraderAgent;
